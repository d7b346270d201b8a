//! Environment variable handling and .env file management

use crate::error::{AppError, Result};
use crate::logging::LogFormat;
use crate::types::SendPolicy;
use std::path::Path;

/// Environment variable configuration manager
pub struct EnvManager;

impl EnvManager {
    /// Load .env from the current directory if it exists
    ///
    /// Returns whether a file was loaded.
    pub fn load_env_file() -> Result<bool> {
        Self::load_env_file_from(Path::new(".env"))
    }

    /// Load a specific env file if it exists
    pub fn load_env_file_from(path: &Path) -> Result<bool> {
        if !path.exists() {
            return Ok(false);
        }

        dotenv::from_path(path)?;
        Ok(true)
    }

    /// Create example .env file content
    pub fn create_example_env_content() -> String {
        r#"# HTTP Latency Probe Configuration
#
# Values here are used as defaults and can be overridden by command-line
# arguments.

# Target URL probed on every tick (the request id is appended as ?<id>)
# TARGET_URL=http://localhost:9999/ping

# Tick interval in microseconds
# INTERVAL_US=1000000

# Request timeout in milliseconds, 0 disables it
# TIMEOUT_MS=5000

# Pin connections to an address and force the Host header (host:port:address)
# RESOLVE=example.com:443:203.0.113.5

# Capacity of the latency sample channel
# SAMPLE_BUFFER=1024

# What to do when the sample channel is full: block or drop-newest
# SEND_POLICY=block

# Output format: console, json or compact
# LOG_FORMAT=console

# Enable colored output (true/false)
# ENABLE_COLOR=true
"#.to_string()
    }

    /// Save example .env file to disk
    pub fn save_example_env_file(path: &Path) -> Result<()> {
        std::fs::write(path, Self::create_example_env_content())?;
        Ok(())
    }

    /// Validate environment variable format before parsing
    pub fn validate_env_var(key: &str, value: &str) -> Result<()> {
        match key {
            "TARGET_URL" => {
                url::Url::parse(value.trim())
                    .map_err(|e| AppError::config(format!("Invalid TARGET_URL '{}': {}", value, e)))?;
            }
            "INTERVAL_US" => {
                let interval: u64 = value.trim().parse()
                    .map_err(|e| AppError::config(format!("Invalid INTERVAL_US value '{}': {}", value, e)))?;
                if interval == 0 {
                    return Err(AppError::config("INTERVAL_US must be greater than 0"));
                }
            }
            "TIMEOUT_MS" => {
                value.trim().parse::<u64>()
                    .map_err(|e| AppError::config(format!("Invalid TIMEOUT_MS value '{}': {}", value, e)))?;
            }
            "RESOLVE" => {
                if !value.trim().is_empty() {
                    crate::requester::ResolveOverride::parse(value.trim())?;
                }
            }
            "SAMPLE_BUFFER" => {
                let buffer: usize = value.trim().parse()
                    .map_err(|e| AppError::config(format!("Invalid SAMPLE_BUFFER value '{}': {}", value, e)))?;
                if buffer == 0 {
                    return Err(AppError::config("SAMPLE_BUFFER must be at least 1"));
                }
            }
            "SEND_POLICY" => {
                value.parse::<SendPolicy>()
                    .map_err(|e| AppError::config(format!("Invalid SEND_POLICY value '{}': {}", value, e)))?;
            }
            "LOG_FORMAT" => {
                value.parse::<LogFormat>()
                    .map_err(|e| AppError::config(format!("Invalid LOG_FORMAT value '{}': {}", value, e)))?;
            }
            "ENABLE_COLOR" => {
                value.trim().parse::<bool>()
                    .map_err(|e| AppError::config(format!("Invalid ENABLE_COLOR value '{}': {}", value, e)))?;
            }
            _ => {
                // Unknown environment variable, ignore
            }
        }

        Ok(())
    }

    /// Get list of all supported environment variables with descriptions
    pub fn get_supported_env_vars() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            ("TARGET_URL", "URL probed on every tick", "http://localhost:9999/ping"),
            ("INTERVAL_US", "Tick interval in microseconds", "1000000"),
            ("TIMEOUT_MS", "Request timeout in milliseconds (0 = none)", "5000"),
            ("RESOLVE", "Connection override host:port:address", "example.com:443:203.0.113.5"),
            ("SAMPLE_BUFFER", "Capacity of the latency sample channel", "1024"),
            ("SEND_POLICY", "block or drop-newest", "block"),
            ("LOG_FORMAT", "console, json or compact", "console"),
            ("ENABLE_COLOR", "Enable colored output", "true"),
        ]
    }

    /// Display environment variable help
    pub fn display_env_help() -> String {
        let mut help = String::new();
        help.push_str("Supported Environment Variables:\n\n");

        for (var, description, example) in Self::get_supported_env_vars() {
            help.push_str(&format!("  {:<14} {}\n", var, description));
            help.push_str(&format!("  {:<14} Example: {}\n\n", "", example));
        }

        help.push_str("Configuration Priority (highest to lowest):\n");
        help.push_str("  1. Command-line arguments\n");
        help.push_str("  2. Environment variables\n");
        help.push_str("  3. .env file values\n");
        help.push_str("  4. Default values\n");

        help
    }

    /// Validate all currently set environment variables
    pub fn validate_current_env() -> Vec<String> {
        let mut warnings = Vec::new();

        for (var_name, _, _) in Self::get_supported_env_vars() {
            if let Ok(value) = std::env::var(var_name) {
                if let Err(e) = Self::validate_env_var(var_name, &value) {
                    warnings.push(format!("Warning: {}", e));
                }
            }
        }

        warnings
    }
}
