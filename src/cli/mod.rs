//! Command-line interface

use crate::logging::LogFormat;
use clap::Parser;

/// HTTP latency probe - ticks GET requests against one target and reports
/// latency samples, slow responses and failures
#[derive(Parser, Debug, Clone)]
#[command(name = "hprobe")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Target URL to probe (request ids are appended as `?<id>`)
    #[arg(short, long)]
    pub url: Option<String>,

    /// Tick interval in microseconds
    #[arg(short, long)]
    pub interval: Option<u64>,

    /// Request timeout in milliseconds, 0 disables it
    #[arg(short, long)]
    pub timeout: Option<u64>,

    /// Pin every connection to an address and force the Host header
    #[arg(long, value_name = "HOST:PORT:ADDRESS")]
    pub resolve: Option<String>,

    /// Capacity of the latency sample channel
    #[arg(long, value_name = "SAMPLES")]
    pub buffer: Option<usize>,

    /// Drop samples instead of stalling when the consumer falls behind
    #[arg(long)]
    pub drop_samples: bool,

    /// Output format for event lines and diagnostics (console, json, compact)
    #[arg(long, value_parser = parse_log_format)]
    pub log_format: Option<LogFormat>,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Enable verbose output
    #[arg(long)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,

    /// Stop after this many samples, 0 runs until Ctrl-C
    #[arg(short = 'n', long, default_value_t = 0)]
    pub count: u64,

    /// Print an example .env file and exit
    #[arg(long)]
    pub print_env: bool,
}

impl Cli {
    /// Validate CLI arguments for conflicts and requirements
    pub fn validate(&self) -> Result<(), String> {
        if let Some(url) = &self.url {
            if url.trim().is_empty() {
                return Err("--url must not be empty".to_string());
            }
        }

        if self.buffer == Some(0) {
            return Err("--buffer must hold at least one sample".to_string());
        }

        if self.interval == Some(0) {
            return Err("--interval must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Check if colors should be enabled
    pub fn use_colors(&self) -> bool {
        !self.no_color && supports_color()
    }

    /// Get configuration summary for display
    pub fn get_config_summary(&self) -> String {
        let mut summary = String::new();

        summary.push_str("Command-line overrides:\n");
        if let Some(url) = &self.url {
            summary.push_str(&format!("  URL: {}\n", url));
        }
        if let Some(interval) = self.interval {
            summary.push_str(&format!("  Interval: {}us\n", interval));
        }
        if let Some(timeout) = self.timeout {
            summary.push_str(&format!("  Timeout: {}ms\n", timeout));
        }
        if let Some(resolve) = &self.resolve {
            summary.push_str(&format!("  Resolve: {}\n", resolve));
        }
        if self.count > 0 {
            summary.push_str(&format!("  Stop after: {} samples\n", self.count));
        }
        summary.push_str(&format!("  Verbose mode: {}\n", self.verbose));
        summary.push_str(&format!("  Debug mode: {}\n", self.debug));

        summary
    }
}

fn parse_log_format(s: &str) -> Result<LogFormat, String> {
    s.parse::<LogFormat>().map_err(|e| e.to_string())
}

/// Check if the terminal supports color output
fn supports_color() -> bool {
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }
    !matches!(std::env::var("TERM").as_deref(), Ok("dumb"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing_defaults() {
        let cli = Cli::parse_from(["hprobe"]);
        assert!(cli.url.is_none());
        assert!(cli.interval.is_none());
        assert!(cli.timeout.is_none());
        assert!(!cli.drop_samples);
        assert_eq!(cli.count, 0);
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_cli_parsing_full() {
        let cli = Cli::parse_from([
            "hprobe",
            "--url", "http://localhost:9999/ping",
            "--interval", "1000",
            "--timeout", "2000",
            "--resolve", "example.com:443:203.0.113.5",
            "--buffer", "10",
            "--drop-samples",
            "--log-format", "json",
            "-n", "5",
        ]);

        assert_eq!(cli.url.as_deref(), Some("http://localhost:9999/ping"));
        assert_eq!(cli.interval, Some(1_000));
        assert_eq!(cli.timeout, Some(2_000));
        assert_eq!(cli.resolve.as_deref(), Some("example.com:443:203.0.113.5"));
        assert_eq!(cli.buffer, Some(10));
        assert!(cli.drop_samples);
        assert_eq!(cli.log_format, Some(LogFormat::Json));
        assert_eq!(cli.count, 5);
    }

    #[test]
    fn test_cli_rejects_unknown_log_format() {
        assert!(Cli::try_parse_from(["hprobe", "--log-format", "xml"]).is_err());
    }

    #[test]
    fn test_cli_validation() {
        assert!(Cli::parse_from(["hprobe", "--buffer", "0"]).validate().is_err());
        assert!(Cli::parse_from(["hprobe", "--interval", "0"]).validate().is_err());
        assert!(Cli::parse_from(["hprobe", "--url", " "]).validate().is_err());
    }

    #[test]
    fn test_no_color_flag() {
        assert!(!Cli::parse_from(["hprobe", "--no-color"]).use_colors());
    }

    #[test]
    fn test_config_summary() {
        let cli = Cli::parse_from(["hprobe", "--url", "http://a/ping", "-n", "3"]);
        let summary = cli.get_config_summary();
        assert!(summary.contains("URL: http://a/ping"));
        assert!(summary.contains("Stop after: 3 samples"));
    }
}
