//! HTTP Latency Probe
//!
//! Fires one GET request per tick against a single target URL and reports
//! the wall-clock latency of every attempt as nanoseconds on a channel.
//! Slow responses and transport failures are written as event lines.
//! Connections can be pinned to a fixed address while the original Host
//! header is preserved.

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod requester;
pub mod types;

// Re-export commonly used types
pub use error::{AppError, Result};
pub use models::Config;
pub use requester::{Requester, RequesterSettings, StopHandle};

/// Application version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");

/// Build metadata set by build.rs, absent when built without it
pub const BUILD_TIME: Option<&str> = option_env!("BUILD_TIME");
pub const GIT_COMMIT: Option<&str> = option_env!("GIT_COMMIT");

/// Default configuration values
pub mod defaults {
    /// One tick per second
    pub const DEFAULT_INTERVAL_US: u64 = 1_000_000;
    pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;
    pub const DEFAULT_SAMPLE_BUFFER: usize = 1024;
    pub const DEFAULT_ENABLE_COLOR: bool = true;
}

/// One-line version string with whatever build metadata is available
pub fn version_line() -> String {
    let mut line = format!("{} v{}", PKG_NAME, VERSION);
    if let Some(commit) = GIT_COMMIT {
        line.push_str(&format!(" ({})", commit));
    }
    if let Some(built) = BUILD_TIME {
        line.push_str(&format!(" built {}", built));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_line_names_package() {
        let line = version_line();
        assert!(line.starts_with(&format!("{} v{}", PKG_NAME, VERSION)));
    }
}
