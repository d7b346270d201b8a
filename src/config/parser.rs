//! Configuration parsing from CLI arguments and environment variables

use crate::{
    cli::Cli,
    config::env::EnvManager,
    error::{AppError, Result},
    models::Config,
    types::SendPolicy,
};

/// Configuration parser that combines CLI arguments with environment variables
pub struct ConfigParser {
    cli: Cli,
    load_dotenv: bool,
}

impl ConfigParser {
    /// Create a new configuration parser with CLI arguments
    pub fn new(cli: Cli) -> Self {
        Self { cli, load_dotenv: true }
    }

    /// Skip reading `.env` from the working directory
    pub fn without_env_file(mut self) -> Self {
        self.load_dotenv = false;
        self
    }

    /// Parse and build the complete configuration
    pub fn parse(&self) -> Result<Config> {
        self.cli.validate().map_err(AppError::config)?;

        let mut config = Config::default();

        if self.load_dotenv {
            EnvManager::load_env_file()?;
        }

        config.merge_from_env()?;
        self.apply_cli_overrides(&mut config);
        config.validate()?;

        Ok(config)
    }

    /// Apply CLI argument overrides to configuration
    fn apply_cli_overrides(&self, config: &mut Config) {
        if let Some(url) = &self.cli.url {
            config.target_url = url.clone();
        }

        if let Some(interval) = self.cli.interval {
            config.interval_us = interval;
        }

        if let Some(timeout) = self.cli.timeout {
            config.timeout_ms = timeout;
        }

        if let Some(resolve) = &self.cli.resolve {
            config.resolve = resolve.clone();
        }

        if let Some(buffer) = self.cli.buffer {
            config.sample_buffer = buffer;
        }

        if self.cli.drop_samples {
            config.send_policy = SendPolicy::DropNewest;
        }

        if let Some(format) = self.cli.log_format {
            config.log_format = format;
        }

        if self.cli.no_color {
            config.enable_color = false;
        }

        // CLI-only flags
        config.verbose = self.cli.verbose;
        config.debug = self.cli.debug;
    }
}

/// Convenience function to load complete configuration from CLI arguments
pub fn load_config(cli: Cli) -> Result<Config> {
    ConfigParser::new(cli).parse()
}

/// Display configuration summary for debug purposes
pub fn display_config_summary(config: &Config) -> String {
    let mut summary = Vec::new();

    summary.push(format!("Target URL: {}", config.target_url));
    summary.push(format!("Interval: {}us", config.interval_us));
    if config.timeout_ms == 0 {
        summary.push("Timeout: none".to_string());
    } else {
        summary.push(format!("Timeout: {}ms", config.timeout_ms));
    }
    if !config.resolve.is_empty() {
        summary.push(format!("Resolve: {}", config.resolve));
    }
    summary.push(format!("Sample Buffer: {}", config.sample_buffer));
    summary.push(format!("Send Policy: {}", config.send_policy.as_str()));
    summary.push(format!("Log Format: {:?}", config.log_format));
    summary.push(format!("Color Output: {}", config.enable_color));
    summary.push(format!("Verbose: {}", config.verbose));
    summary.push(format!("Debug: {}", config.debug));

    summary.join("\n")
}
