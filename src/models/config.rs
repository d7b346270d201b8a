//! Configuration data model and validation

use crate::logging::LogFormat;
use crate::requester::{ResolveOverride, RequesterSettings};
use crate::types::{AppError, Result, SendPolicy};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Target URL probed on every tick
    #[serde(default)]
    pub target_url: String,

    /// Tick interval in microseconds
    #[serde(default = "default_interval_us")]
    pub interval_us: u64,

    /// Per-request timeout in milliseconds, 0 disables it
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Resolve override in `host:port:ip` form, empty when unused
    #[serde(default)]
    pub resolve: String,

    /// Capacity of the latency sample channel
    #[serde(default = "default_sample_buffer")]
    pub sample_buffer: usize,

    /// Behaviour when the sample channel is full
    #[serde(default)]
    pub send_policy: SendPolicy,

    /// Output format for request event lines and diagnostics
    #[serde(default)]
    pub log_format: LogFormat,

    /// Enable colored terminal output
    #[serde(default = "default_enable_color")]
    pub enable_color: bool,

    /// Enable verbose output
    #[serde(default)]
    pub verbose: bool,

    /// Enable debug output
    #[serde(default)]
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_url: String::new(),
            interval_us: default_interval_us(),
            timeout_ms: default_timeout_ms(),
            resolve: String::new(),
            sample_buffer: default_sample_buffer(),
            send_policy: SendPolicy::default(),
            log_format: LogFormat::default(),
            enable_color: default_enable_color(),
            verbose: false,
            debug: false,
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Tick interval as Duration
    pub fn interval(&self) -> Duration {
        Duration::from_micros(self.interval_us)
    }

    /// Request timeout as Duration, `None` when disabled
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }

    /// Validate the configuration and return the first hard error
    pub fn validate(&self) -> Result<()> {
        if self.target_url.is_empty() {
            return Err(AppError::config("Target URL must be set (--url or TARGET_URL)"));
        }

        match url::Url::parse(&self.target_url) {
            Ok(parsed) => {
                if parsed.scheme() != "http" && parsed.scheme() != "https" {
                    return Err(AppError::config(format!(
                        "Target URL must use http or https: {}", self.target_url
                    )));
                }
            }
            Err(e) => {
                return Err(AppError::config(format!("Invalid target URL '{}': {}", self.target_url, e)));
            }
        }

        if self.interval_us == 0 {
            return Err(AppError::config("Interval must be greater than 0"));
        }

        if self.sample_buffer == 0 {
            return Err(AppError::config("Sample buffer must hold at least one sample"));
        }

        if !self.resolve.is_empty() {
            ResolveOverride::parse(&self.resolve)?;
        }

        Ok(())
    }

    /// Requester settings derived from this configuration
    pub fn requester_settings(&self) -> RequesterSettings {
        RequesterSettings::new(self.interval_us, self.timeout_ms, self.target_url.clone())
            .with_resolve(self.resolve.clone())
            .with_send_policy(self.send_policy)
    }

    /// Merge environment variables into this configuration
    pub fn merge_from_env(&mut self) -> Result<()> {
        if let Ok(target_url) = std::env::var("TARGET_URL") {
            self.target_url = target_url.trim().to_string();
        }

        if let Ok(interval) = std::env::var("INTERVAL_US") {
            self.interval_us = interval.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid INTERVAL_US value '{}': {}", interval, e)))?;
        }

        if let Ok(timeout) = std::env::var("TIMEOUT_MS") {
            self.timeout_ms = timeout.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid TIMEOUT_MS value '{}': {}", timeout, e)))?;
        }

        if let Ok(resolve) = std::env::var("RESOLVE") {
            self.resolve = resolve.trim().to_string();
        }

        if let Ok(buffer) = std::env::var("SAMPLE_BUFFER") {
            self.sample_buffer = buffer.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid SAMPLE_BUFFER value '{}': {}", buffer, e)))?;
        }

        if let Ok(policy) = std::env::var("SEND_POLICY") {
            self.send_policy = policy.parse()
                .map_err(|e| AppError::config(format!("Invalid SEND_POLICY value '{}': {}", policy, e)))?;
        }

        if let Ok(format) = std::env::var("LOG_FORMAT") {
            self.log_format = format.parse()
                .map_err(|e| AppError::config(format!("Invalid LOG_FORMAT value '{}': {}", format, e)))?;
        }

        if let Ok(enable_color) = std::env::var("ENABLE_COLOR") {
            self.enable_color = enable_color.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid ENABLE_COLOR value '{}': {}", enable_color, e)))?;
        }

        Ok(())
    }
}

// Default value functions for serde
fn default_interval_us() -> u64 {
    crate::defaults::DEFAULT_INTERVAL_US
}

fn default_timeout_ms() -> u64 {
    crate::defaults::DEFAULT_TIMEOUT_MS
}

fn default_sample_buffer() -> usize {
    crate::defaults::DEFAULT_SAMPLE_BUFFER
}

fn default_enable_color() -> bool {
    crate::defaults::DEFAULT_ENABLE_COLOR
}
