//! Configuration validation utilities and rules

use crate::{
    error::Result,
    models::Config,
    requester::ResolveOverride,
    types::SendPolicy,
};

/// Configuration validator producing hard errors and soft warnings
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate configuration with comprehensive checks
    pub fn validate_comprehensive(config: &Config) -> Result<Vec<ValidationWarning>> {
        config.validate()?;

        let mut warnings = Vec::new();
        warnings.extend(Self::validate_target_url(config));
        warnings.extend(Self::validate_timing(config));
        warnings.extend(Self::validate_sample_delivery(config));
        warnings.extend(Self::validate_resolve(config)?);

        Ok(warnings)
    }

    fn validate_target_url(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if let Ok(parsed) = url::Url::parse(&config.target_url) {
            if parsed.query().is_some() {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Warning,
                    format!(
                        "URL '{}' already has a query; the request id is appended after another '?'",
                        config.target_url
                    ),
                ));
            }

            if parsed.scheme() == "http" {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Info,
                    format!("URL '{}' uses plain HTTP; latency excludes TLS setup", config.target_url),
                ));
            }

            if let Some(url::Host::Ipv4(ip)) = parsed.host() {
                if ip.is_private() || ip.is_loopback() {
                    warnings.push(ValidationWarning::new(
                        ValidationLevel::Info,
                        format!("URL '{}' targets private/local network", config.target_url),
                    ));
                }
            }
        }

        warnings
    }

    fn validate_timing(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if config.interval_us < 1_000 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!(
                    "Interval of {}us is below one millisecond; the interval is in microseconds",
                    config.interval_us
                ),
            ));
        }

        if config.timeout_ms == 0 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                "No request timeout; a hung request stalls the loop until the server answers".to_string(),
            ));
        } else if config.timeout_ms.saturating_mul(1_000) > config.interval_us {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!(
                    "Timeout of {}ms exceeds the {}us interval; ticks are skipped while a request is in flight",
                    config.timeout_ms, config.interval_us
                ),
            ));
        }

        warnings
    }

    fn validate_sample_delivery(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if config.send_policy == SendPolicy::Block && config.sample_buffer < 16 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!(
                    "Sample buffer of {} is small; a slow consumer stalls the request loop",
                    config.sample_buffer
                ),
            ));
        }

        warnings
    }

    fn validate_resolve(config: &Config) -> Result<Vec<ValidationWarning>> {
        let mut warnings = Vec::new();
        if config.resolve.is_empty() {
            return Ok(warnings);
        }

        let resolve = ResolveOverride::parse(&config.resolve)?;
        if let Ok(parsed) = url::Url::parse(&config.target_url) {
            if let Some(host) = parsed.host_str() {
                if host != resolve.host() {
                    warnings.push(ValidationWarning::new(
                        ValidationLevel::Warning,
                        format!(
                            "Host header '{}' differs from URL host '{}'; TLS still verifies against the URL host",
                            resolve.host(), host
                        ),
                    ));
                }
            }
        }

        warnings.push(ValidationWarning::new(
            ValidationLevel::Info,
            format!("All connections are dialed to {}", resolve.dial_target()),
        ));

        Ok(warnings)
    }
}

/// Validation warning levels
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationLevel {
    Info,
    Warning,
}

impl ValidationLevel {
    /// Get display string for level
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
        }
    }
}

/// Configuration validation warning
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub level: ValidationLevel,
    pub message: String,
}

impl ValidationWarning {
    /// Create a new validation warning
    pub fn new(level: ValidationLevel, message: String) -> Self {
        Self { level, message }
    }

    /// Format warning for display
    pub fn format(&self, use_color: bool) -> String {
        if use_color {
            use colored::Colorize;
            let label = match self.level {
                ValidationLevel::Info => self.level.as_str().blue(),
                ValidationLevel::Warning => self.level.as_str().yellow(),
            };
            format!("[{}] {}", label, self.message)
        } else {
            format!("[{}] {}", self.level.as_str(), self.message)
        }
    }
}

/// Convenience function for comprehensive configuration validation
pub fn validate_config(config: &Config) -> Result<Vec<ValidationWarning>> {
    ConfigValidator::validate_comprehensive(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Config {
        Config {
            target_url: "https://example.com/ping".to_string(),
            interval_us: 1_000_000,
            timeout_ms: 500,
            sample_buffer: 1024,
            ..Default::default()
        }
    }

    fn messages(config: &Config) -> Vec<String> {
        validate_config(config).unwrap().into_iter().map(|w| w.message).collect()
    }

    #[test]
    fn test_clean_config_has_no_warnings() {
        assert!(messages(&base()).is_empty());
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let config = Config { target_url: String::new(), ..base() };
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_plain_http_is_noted() {
        let config = Config { target_url: "http://example.com/ping".to_string(), ..base() };
        let found = validate_config(&config).unwrap();
        assert!(found.iter().any(|w| w.level == ValidationLevel::Info && w.message.contains("plain HTTP")));
    }

    #[test]
    fn test_query_in_url_warns() {
        let config = Config { target_url: "https://example.com/ping?a=1".to_string(), ..base() };
        assert!(messages(&config).iter().any(|m| m.contains("already has a query")));
    }

    #[test]
    fn test_timing_warnings() {
        let sub_ms = Config { interval_us: 500, ..base() };
        assert!(messages(&sub_ms).iter().any(|m| m.contains("microseconds")));

        let no_timeout = Config { timeout_ms: 0, ..base() };
        assert!(messages(&no_timeout).iter().any(|m| m.contains("No request timeout")));

        let overlapping = Config { timeout_ms: 2_000, ..base() };
        assert!(messages(&overlapping).iter().any(|m| m.contains("ticks are skipped")));
    }

    #[test]
    fn test_small_buffer_only_matters_when_blocking() {
        let blocking = Config { sample_buffer: 4, ..base() };
        assert!(messages(&blocking).iter().any(|m| m.contains("Sample buffer")));

        let dropping = Config { sample_buffer: 4, send_policy: SendPolicy::DropNewest, ..base() };
        assert!(!messages(&dropping).iter().any(|m| m.contains("Sample buffer")));
    }

    #[test]
    fn test_resolve_warnings() {
        let config = Config { resolve: "other.example:443:203.0.113.5".to_string(), ..base() };
        let found = messages(&config);
        assert!(found.iter().any(|m| m.contains("differs from URL host")));
        assert!(found.iter().any(|m| m.contains("dialed to 203.0.113.5:443")));
    }

    #[test]
    fn test_warning_format() {
        let warning = ValidationWarning::new(ValidationLevel::Warning, "careful".to_string());
        assert_eq!(warning.format(false), "[WARNING] careful");
    }
}
