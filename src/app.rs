//! Main application orchestration and execution

use crate::{
    cli::Cli,
    config::{load_config, validate_config, display_config_summary, EnvManager},
    error::{AppError, Result},
    logging::{ConsoleSink, LogSink, LoggerFactory},
    requester::Requester,
};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Main application struct that drives one requester and drains its samples
pub struct App {
    cli: Cli,
    sink: Arc<dyn LogSink>,
}

/// What the drain loop saw before it stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub samples: u64,
    pub interrupted: bool,
}

impl App {
    /// Create a new application instance with CLI configuration
    pub fn new(cli: Cli) -> Result<Self> {
        cli.validate().map_err(AppError::config)?;
        Ok(Self { cli, sink: Arc::new(ConsoleSink) })
    }

    /// Route every log and event line to another sink
    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Run until Ctrl-C or until the requested number of samples arrived
    pub async fn run(self) -> Result<RunSummary> {
        self.run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
    }

    /// Run until `shutdown` resolves or the sample count is reached
    pub async fn run_until<F>(self, shutdown: F) -> Result<RunSummary>
    where
        F: Future<Output = ()>,
    {
        if self.cli.print_env {
            self.sink.write_line(
                crate::logging::LogStream::Stdout,
                EnvManager::create_example_env_content().trim_end(),
            );
            return Ok(RunSummary { samples: 0, interrupted: false });
        }

        let config = load_config(self.cli.clone())?;
        let warnings = validate_config(&config)?;

        let factory = LoggerFactory::with_sink(config.clone(), self.sink.clone());
        let logger = factory.create_app_logger().await;
        let request_logger = factory.create_request_logger().await;

        logger.info(&crate::version_line()).log().await;
        if config.debug {
            for line in display_config_summary(&config).lines() {
                logger.debug(line).log().await;
            }
        }
        for warning in &warnings {
            logger
                .warn(&warning.message)
                .field("level", warning.level.as_str())
                .log()
                .await;
        }
        for warning in EnvManager::validate_current_env() {
            logger.warn(&warning).log().await;
        }

        let (tx, mut rx) = mpsc::channel(config.sample_buffer);
        let requester = Requester::with_logger(config.requester_settings(), tx, request_logger)?;
        let stop = requester.stop_handle();
        let task = tokio::spawn(requester.run());

        logger
            .info("Probing started")
            .field("url", &config.target_url)
            .field("interval_us", config.interval_us)
            .field("timeout_ms", config.timeout_ms)
            .log()
            .await;

        let limit = self.cli.count;
        let mut summary = RunSummary { samples: 0, interrupted: false };
        let mut sender_gone = false;
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                sample = rx.recv() => match sample {
                    Some(nanos) => {
                        summary.samples += 1;
                        logger
                            .debug("Latency sample")
                            .field("sample", summary.samples)
                            .field("latency_ns", nanos)
                            .log()
                            .await;
                        if limit > 0 && summary.samples >= limit {
                            break;
                        }
                    }
                    None => {
                        sender_gone = true;
                        break;
                    }
                },
                _ = &mut shutdown => {
                    summary.interrupted = true;
                    logger.info("Shutdown requested").log().await;
                    break;
                }
            }
        }

        if !sender_gone {
            // Keep draining so a blocked send cannot hold up the stop ack
            let stopping = stop.stop();
            tokio::pin!(stopping);
            loop {
                tokio::select! {
                    _ = &mut stopping => break,
                    sample = rx.recv() => if sample.is_none() { break },
                }
            }
        }

        task.await
            .map_err(|e| AppError::internal(format!("Requester task failed: {}", e)))??;

        logger
            .info("Probing finished")
            .field("samples", summary.samples)
            .field("interrupted", summary.interrupted)
            .log()
            .await;

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_support::{clear_env, ENV_LOCK};
    use crate::logging::MemorySink;
    use clap::Parser;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["hprobe"];
        argv.extend_from_slice(args);
        Cli::parse_from(argv)
    }

    #[test]
    fn test_new_rejects_invalid_cli() {
        assert!(App::new(cli(&["--buffer", "0"])).is_err());
        assert!(App::new(cli(&["--url", "http://localhost/ping"])).is_ok());
    }

    #[tokio::test]
    async fn test_print_env_writes_template() {
        let sink = Arc::new(MemorySink::new());
        let app = App::new(cli(&["--print-env"])).unwrap().with_sink(sink.clone());

        let summary = app.run_until(std::future::pending()).await.unwrap();

        assert_eq!(summary.samples, 0);
        let out = sink.stdout_lines().join("\n");
        assert!(out.contains("TARGET_URL="));
        assert!(out.contains("RESOLVE="));
    }

    #[tokio::test]
    async fn test_run_stops_after_count() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ping"))
            .respond_with(ResponseTemplate::new(200).set_body_string("pong"))
            .mount(&server)
            .await;

        let url = format!("{}/ping", server.uri());
        let sink = Arc::new(MemorySink::new());
        let app = App::new(cli(&["--url", &url, "--interval", "20000", "-n", "3"]))
            .unwrap()
            .with_sink(sink.clone());

        let summary = app.run_until(std::future::pending()).await.unwrap();

        assert_eq!(summary, RunSummary { samples: 3, interrupted: false });
        assert!(sink.stdout_lines().is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_future_interrupts_run() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        let sink = Arc::new(MemorySink::new());
        let app = App::new(cli(&["--url", "http://127.0.0.1:9/ping", "--interval", "10000000"]))
            .unwrap()
            .with_sink(sink);

        let summary = app
            .run_until(tokio::time::sleep(std::time::Duration::from_millis(50)))
            .await
            .unwrap();

        assert_eq!(summary, RunSummary { samples: 0, interrupted: true });
    }

    #[tokio::test]
    async fn test_missing_url_is_config_error() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        let app = App::new(cli(&[])).unwrap();
        let result = app.run_until(std::future::pending()).await;
        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
