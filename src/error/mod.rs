//! Error handling for the latency probe
//!
//! Errors fall in two classes. Network failures (connect, timeout, DNS) are
//! recoverable: the requester logs them and keeps ticking. Local failures
//! (malformed request, unreadable body, bad configuration) are fatal and end
//! the run with an exit code.

use thiserror::Error;

/// Custom error types for the latency probe
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network connectivity errors
    #[error("Network error: {0}")]
    Network(String),

    /// HTTP request errors
    #[error("HTTP request error: {0}")]
    HttpRequest(String),

    /// Timeout errors
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// I/O errors (file operations, etc.)
    #[error("I/O error: {0}")]
    Io(String),

    /// Parsing errors (URLs, JSON, etc.)
    #[error("Parsing error: {0}")]
    Parse(String),

    /// Unrecoverable failure inside the request loop
    #[error("Fatal error: {0}")]
    Fatal(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a new network error
    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network(message.into())
    }

    /// Create a new HTTP request error
    pub fn http_request<S: Into<String>>(message: S) -> Self {
        Self::HttpRequest(message.into())
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(message: S) -> Self {
        Self::Timeout(message.into())
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io(message.into())
    }

    /// Create a new parsing error
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse(message.into())
    }

    /// Create a new fatal loop error
    pub fn fatal<S: Into<String>>(message: S) -> Self {
        Self::Fatal(message.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    /// Get error category for logging and reporting
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG",
            Self::Network(_) => "NETWORK",
            Self::HttpRequest(_) => "HTTP",
            Self::Timeout(_) => "TIMEOUT",
            Self::Io(_) => "IO",
            Self::Parse(_) => "PARSE",
            Self::Fatal(_) => "FATAL",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Check if error is recoverable (the loop may carry on after it)
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Network(_) | Self::HttpRequest(_) | Self::Timeout(_) => true,
            Self::Config(_) | Self::Parse(_) | Self::Io(_) => false,
            Self::Fatal(_) | Self::Internal(_) => false,
        }
    }

    /// Check if error must terminate a running requester
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_) | Self::Internal(_))
    }

    /// Get exit code for this error type
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Parse(_) => 1,
            Self::Network(_) | Self::HttpRequest(_) => 2,
            Self::Timeout(_) => 3,
            Self::Io(_) => 5,
            Self::Fatal(_) => 6,
            Self::Internal(_) => 99,
        }
    }

    /// The message without its category prefix
    pub fn message(&self) -> &str {
        match self {
            Self::Config(m)
            | Self::Network(m)
            | Self::HttpRequest(m)
            | Self::Timeout(m)
            | Self::Io(m)
            | Self::Parse(m)
            | Self::Fatal(m)
            | Self::Internal(m) => m,
        }
    }

    /// Format error for console display with color coding
    pub fn format_for_console(&self, use_color: bool) -> String {
        let category = self.category();
        let message = self.to_string();

        if use_color {
            use colored::Colorize;
            match self {
                Self::Config(_) | Self::Parse(_) => {
                    format!("[{}] {}", category.red().bold(), message.red())
                }
                Self::Network(_) | Self::HttpRequest(_) => {
                    format!("[{}] {}", category.yellow().bold(), message.yellow())
                }
                Self::Timeout(_) => {
                    format!("[{}] {}", category.blue().bold(), message.blue())
                }
                Self::Io(_) => {
                    format!("[{}] {}", category.cyan().bold(), message.cyan())
                }
                Self::Fatal(_) | Self::Internal(_) => {
                    format!("[{}] {}", category.bright_red().bold(), message.bright_red())
                }
            }
        } else {
            format!("[{}] {}", category, message)
        }
    }

    /// Describe a transport error including its source chain
    ///
    /// reqwest's top-level message ("error sending request for url ...") hides
    /// the actual cause, so the causes are appended the way they nest.
    pub fn describe_transport(error: &reqwest::Error) -> String {
        let mut message = error.to_string();
        let mut source = std::error::Error::source(error);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        message
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::io(error.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::timeout(Self::describe_transport(&error))
        } else if error.is_connect() || error.is_request() {
            Self::network(Self::describe_transport(&error))
        } else {
            Self::http_request(Self::describe_transport(&error))
        }
    }
}

impl From<dotenv::Error> for AppError {
    fn from(error: dotenv::Error) -> Self {
        Self::config(format!("Environment file error: {}", error))
    }
}

/// Custom Result type for the application
pub type Result<T> = std::result::Result<T, AppError>;

/// Error reporter for user feedback on the way out of the binary
pub struct ErrorReporter {
    pub use_color: bool,
    pub verbose: bool,
}

impl ErrorReporter {
    /// Create a new error reporter
    pub fn new(use_color: bool, verbose: bool) -> Self {
        Self { use_color, verbose }
    }

    /// Report an error to the user
    pub fn report_error(&self, error: &AppError) {
        eprintln!("{}", self.format_error(error));
    }

    /// Render the report without printing it
    pub fn format_error(&self, error: &AppError) -> String {
        let mut report = error.format_for_console(self.use_color);

        if self.verbose {
            let hint = match error {
                AppError::Config(_) | AppError::Parse(_) => {
                    Some("Check the --url, --interval, --timeout and --resolve values or your .env file.")
                }
                AppError::Fatal(_) => {
                    Some("The request loop hit a local failure and stopped; network errors never end the loop.")
                }
                AppError::Internal(_) => Some("This is likely a bug. Please report it with the error details."),
                _ => None,
            };

            if let Some(hint) = hint {
                report.push_str("\n\n");
                report.push_str(hint);
            }
        }

        report
    }
}
