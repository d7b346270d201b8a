//! Logging for the latency probe
//!
//! Two kinds of output go through this module:
//! - request event lines (`error` and `slow`), written unconditionally to
//!   stdout in the fixed pipe-separated layout operators grep for, or as one
//!   JSON object per line when the JSON format is selected
//! - leveled diagnostics (startup, dial overrides, dropped samples), filtered
//!   by the configured minimum level
//!
//! Output goes to a [`LogSink`] so tests can capture it.

use crate::error::{AppError, Result};
use crate::models::Config;
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Timestamp layout of request event lines
pub const EVENT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    /// Trace level - most detailed
    Trace = 0,
    /// Debug level - detailed information for debugging
    Debug = 1,
    /// Info level - general application information
    Info = 2,
    /// Warning level - potentially harmful situations
    Warn = 3,
    /// Error level - error events but application can continue
    Error = 4,
    /// Fatal level - severe error events that cause application termination
    Fatal = 5,
}

impl LogLevel {
    /// Get log level name as string
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Fatal => "FATAL",
        }
    }

    /// Get ANSI color code for console output
    pub fn color_code(&self) -> &'static str {
        match self {
            LogLevel::Trace => "\x1b[37m",    // White
            LogLevel::Debug => "\x1b[36m",    // Cyan
            LogLevel::Info => "\x1b[32m",     // Green
            LogLevel::Warn => "\x1b[33m",     // Yellow
            LogLevel::Error => "\x1b[31m",    // Red
            LogLevel::Fatal => "\x1b[35m",    // Magenta
        }
    }

    /// Reset ANSI color code
    pub fn reset_code() -> &'static str {
        "\x1b[0m"
    }
}

impl std::str::FromStr for LogLevel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "TRACE" => Ok(LogLevel::Trace),
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            "FATAL" => Ok(LogLevel::Fatal),
            _ => Err(AppError::parse(format!("Invalid log level: {}", s))),
        }
    }
}

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable console format
    #[default]
    Console,
    /// JSON format for structured logging
    Json,
    /// Compact single-line format
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "console" | "text" => Ok(LogFormat::Console),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            _ => Err(AppError::parse(format!("Invalid log format: {}", s))),
        }
    }
}

/// Output stream a line is destined for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStream {
    Stdout,
    Stderr,
}

/// Destination for formatted log lines
pub trait LogSink: Send + Sync {
    /// Write one complete line (without trailing newline)
    fn write_line(&self, stream: LogStream, line: &str);
}

/// Sink writing to the process stdout/stderr
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl LogSink for ConsoleSink {
    fn write_line(&self, stream: LogStream, line: &str) {
        match stream {
            LogStream::Stdout => {
                let _ = writeln!(io::stdout().lock(), "{}", line);
            }
            LogStream::Stderr => {
                let _ = writeln!(io::stderr().lock(), "{}", line);
            }
        }
    }
}

/// Sink keeping every line in memory, used to observe output in tests
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<(LogStream, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All captured lines in write order
    pub fn lines(&self) -> Vec<(LogStream, String)> {
        self.lines.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Captured stdout lines only
    pub fn stdout_lines(&self) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|(stream, _)| *stream == LogStream::Stdout)
            .map(|(_, line)| line)
            .collect()
    }
}

impl LogSink for MemorySink {
    fn write_line(&self, stream: LogStream, line: &str) {
        self.lines
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((stream, line.to_string()));
    }
}

/// Log entry structure for structured logging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Timestamp when log entry was created
    pub timestamp: DateTime<Utc>,
    /// Log level
    pub level: LogLevel,
    /// Log message
    pub message: String,
    /// Logger name/component
    pub logger: String,
    /// Additional structured fields
    pub fields: HashMap<String, serde_json::Value>,
}

/// Shared logging context for session tracking
#[derive(Debug, Default)]
struct LogContext {
    /// Global correlation ID for the session
    session_id: Option<String>,
}

/// Logger implementation with multiple output formats
#[derive(Clone)]
pub struct Logger {
    /// Minimum log level to output
    min_level: LogLevel,
    /// Whether to use colored output
    use_color: bool,
    /// Output format
    format: LogFormat,
    /// Logger name
    name: String,
    /// Shared context storage
    context: Arc<RwLock<LogContext>>,
    /// Where lines end up
    sink: Arc<dyn LogSink>,
}

impl Logger {
    /// Create a new logger
    pub fn new(name: String) -> Self {
        Self {
            min_level: LogLevel::Info,
            use_color: true,
            format: LogFormat::Console,
            name,
            context: Arc::new(RwLock::new(LogContext::default())),
            sink: Arc::new(ConsoleSink),
        }
    }

    /// Create a logger with specific configuration
    pub fn with_config(name: String, config: &Config) -> Self {
        let min_level = if config.debug {
            LogLevel::Debug
        } else if config.verbose {
            LogLevel::Info
        } else {
            LogLevel::Warn
        };

        Self {
            min_level,
            use_color: config.enable_color,
            format: config.log_format,
            name,
            context: Arc::new(RwLock::new(LogContext::default())),
            sink: Arc::new(ConsoleSink),
        }
    }

    /// Route output to another sink
    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Set minimum log level
    pub fn set_level(&mut self, level: LogLevel) {
        self.min_level = level;
    }

    /// Set output format
    pub fn set_format(&mut self, format: LogFormat) {
        self.format = format;
    }

    /// Enable or disable colored output
    pub fn set_color(&mut self, use_color: bool) {
        self.use_color = use_color;
    }

    pub fn format(&self) -> LogFormat {
        self.format
    }

    /// Set session correlation ID
    pub async fn set_session_id(&self, session_id: String) {
        let mut context = self.context.write().await;
        context.session_id = Some(session_id);
    }

    /// Create a log entry builder
    pub fn log(&self, level: LogLevel, message: &str) -> LogEntryBuilder<'_> {
        LogEntryBuilder::new(self, level, message.to_string())
    }

    pub fn debug(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Debug, message)
    }

    pub fn info(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Info, message)
    }

    pub fn warn(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Warn, message)
    }

    pub fn error(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Error, message)
    }

    pub fn fatal(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Fatal, message)
    }

    /// Check if a log level would be output
    pub fn would_log(&self, level: LogLevel) -> bool {
        level >= self.min_level
    }

    /// Write a line as-is to stdout, bypassing level filtering
    pub fn write_raw(&self, line: &str) {
        self.sink.write_line(LogStream::Stdout, line);
    }

    /// Write log entry to output
    async fn write_entry(&self, mut entry: LogEntry) {
        if entry.level < self.min_level {
            return;
        }

        let context = self.context.read().await;
        if let Some(session_id) = &context.session_id {
            entry.fields.insert("session_id".to_string(), serde_json::Value::String(session_id.clone()));
        }
        drop(context);

        let output = match self.format {
            LogFormat::Console => self.format_console(&entry),
            LogFormat::Json => self.format_json(&entry),
            LogFormat::Compact => self.format_compact(&entry),
        };

        // Diagnostics stay off stdout so the event lines remain greppable
        self.sink.write_line(LogStream::Stderr, &output);
    }

    /// Format log entry for console output
    fn format_console(&self, entry: &LogEntry) -> String {
        let timestamp = entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f");
        let level_str = entry.level.as_str();

        let formatted_level = if self.use_color {
            format!("{}{:>5}{}", entry.level.color_code(), level_str, LogLevel::reset_code())
        } else {
            format!("{:>5}", level_str)
        };

        let mut output = format!("{} {} [{}] {}",
            timestamp,
            formatted_level,
            entry.logger,
            entry.message
        );

        let mut fields: Vec<(&String, &serde_json::Value)> = entry.fields
            .iter()
            .filter(|(k, _)| k.as_str() != "session_id")
            .collect();
        if !fields.is_empty() {
            fields.sort_by(|a, b| a.0.cmp(b.0));
            let fields_str: Vec<String> = fields.iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            output.push_str(&format!(" {{{}}}", fields_str.join(", ")));
        }

        output
    }

    /// Format log entry as JSON
    fn format_json(&self, entry: &LogEntry) -> String {
        match serde_json::to_string(entry) {
            Ok(json) => json,
            Err(_) => format!("{{\"error\": \"Failed to serialize log entry\", \"message\": \"{}\"}}", entry.message),
        }
    }

    /// Format log entry in compact format
    fn format_compact(&self, entry: &LogEntry) -> String {
        let timestamp = entry.timestamp.format("%H:%M:%S");
        format!("{} {} {}: {}",
            timestamp,
            entry.level.as_str().chars().next().unwrap_or('?'),
            entry.logger,
            entry.message
        )
    }
}

/// Builder pattern for creating log entries
pub struct LogEntryBuilder<'a> {
    logger: &'a Logger,
    entry: LogEntry,
}

impl<'a> LogEntryBuilder<'a> {
    fn new(logger: &'a Logger, level: LogLevel, message: String) -> Self {
        Self {
            logger,
            entry: LogEntry {
                timestamp: Utc::now(),
                level,
                message,
                logger: logger.name.clone(),
                fields: HashMap::new(),
            },
        }
    }

    /// Add a structured field
    pub fn field<T: Serialize>(mut self, key: &str, value: T) -> Self {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.entry.fields.insert(key.to_string(), json_value);
        }
        self
    }

    /// Add error information
    pub fn error_info(self, error: &AppError) -> Self {
        self.field("error_category", error.category())
            .field("error_fatal", error.is_fatal())
            .field("error_exit_code", error.exit_code())
    }

    /// Finalize and write the log entry
    pub async fn log(self) {
        self.logger.write_entry(self.entry).await;
    }
}

/// A request outcome worth telling the operator about
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum RequestEvent {
    /// Transport-level failure of one attempt
    Error {
        timestamp: String,
        elapsed_ms: u128,
        message: String,
    },
    /// Completed request above the slow threshold
    Slow {
        timestamp: String,
        elapsed_ms: u128,
        body: String,
        request_id: u64,
    },
}

impl RequestEvent {
    /// Event for a failed attempt, stamped with the current local time
    pub fn error(elapsed: Duration, message: impl Into<String>) -> Self {
        Self::error_at(Local::now(), elapsed, message)
    }

    pub fn error_at(at: DateTime<Local>, elapsed: Duration, message: impl Into<String>) -> Self {
        RequestEvent::Error {
            timestamp: at.format(EVENT_TIMESTAMP_FORMAT).to_string(),
            elapsed_ms: elapsed.as_millis(),
            message: message.into(),
        }
    }

    /// Event for a slow response, stamped with the current local time
    pub fn slow(elapsed: Duration, body: impl Into<String>, request_id: u64) -> Self {
        Self::slow_at(Local::now(), elapsed, body, request_id)
    }

    pub fn slow_at(at: DateTime<Local>, elapsed: Duration, body: impl Into<String>, request_id: u64) -> Self {
        RequestEvent::Slow {
            timestamp: at.format(EVENT_TIMESTAMP_FORMAT).to_string(),
            elapsed_ms: elapsed.as_millis(),
            body: body.into(),
            request_id,
        }
    }

    /// Pipe-separated line layout
    pub fn to_line(&self) -> String {
        match self {
            RequestEvent::Error { timestamp, elapsed_ms, message } => {
                format!("{} | error | {:>6}ms | {}", timestamp, elapsed_ms, message)
            }
            RequestEvent::Slow { timestamp, elapsed_ms, body, request_id } => {
                format!("{} | slow | {:>6}ms | {} | {}", timestamp, elapsed_ms, body, request_id)
            }
        }
    }
}

/// Specialized logger for the request loop
#[derive(Clone)]
pub struct RequestLogger {
    logger: Logger,
}

impl RequestLogger {
    /// Create a request logger on top of a configured logger
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }

    /// Logger writing to stdout/stderr at warn level, for callers without config
    pub fn console() -> Self {
        let mut logger = Logger::new("REQ".to_string());
        logger.set_level(LogLevel::Warn);
        Self { logger }
    }

    /// Emit a request event; these are never filtered by level
    pub fn log_event(&self, event: &RequestEvent) {
        let line = match self.logger.format() {
            LogFormat::Json => serde_json::to_string(event).unwrap_or_else(|_| event.to_line()),
            LogFormat::Console | LogFormat::Compact => event.to_line(),
        };
        self.logger.write_raw(&line);
    }

    /// Log a recoverable transport-level failure
    pub fn log_request_error(&self, elapsed: Duration, error: &AppError) {
        self.log_event(&RequestEvent::error(elapsed, error.message()));
    }

    /// Log a response above the slow threshold
    pub fn log_slow_request(&self, elapsed: Duration, body: &str, request_id: u64) {
        self.log_event(&RequestEvent::slow(elapsed, body, request_id));
    }

    /// Log a sample that did not fit into the channel
    pub async fn log_sample_dropped(&self, nanos: i64) {
        self.logger.warn("Latency sample dropped, channel full")
            .field("sample_ns", nanos)
            .log()
            .await;
    }

    /// Log a connection redirected by a resolve override
    pub async fn log_dial(&self, original: &str, modified: &str) {
        self.logger.debug(&format!("address original = {}", original)).log().await;
        self.logger.debug(&format!("address modified = {}", modified)).log().await;
    }

    /// Log the end of the loop
    pub async fn log_stopped(&self, ticks: u64, slow: u64, failed: u64) {
        self.logger.info("Requester stopped")
            .field("ticks", ticks)
            .field("slow", slow)
            .field("failed", failed)
            .log()
            .await;
    }

    /// Log a failure that ends the loop
    pub async fn log_fatal(&self, error: &AppError) {
        self.logger.fatal(&error.to_string())
            .error_info(error)
            .log()
            .await;
    }
}

/// Creates loggers sharing one session id and sink
pub struct LoggerFactory {
    config: Config,
    session_id: String,
    sink: Arc<dyn LogSink>,
}

impl LoggerFactory {
    /// Create a factory writing to the console
    pub fn new(config: Config) -> Self {
        Self::with_sink(config, Arc::new(ConsoleSink))
    }

    /// Create a factory writing to a custom sink
    pub fn with_sink(config: Config, sink: Arc<dyn LogSink>) -> Self {
        Self {
            config,
            session_id: Uuid::new_v4().to_string(),
            sink,
        }
    }

    /// General application logger
    pub async fn create_app_logger(&self) -> Logger {
        self.create_logger("APP").await
    }

    /// Logger for the request loop
    pub async fn create_request_logger(&self) -> RequestLogger {
        RequestLogger::new(self.create_logger("REQ").await)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn create_logger(&self, name: &str) -> Logger {
        let logger = Logger::with_config(name.to_string(), &self.config).with_sink(self.sink.clone());
        logger.set_session_id(self.session_id.clone()).await;
        logger
    }
}
