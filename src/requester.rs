//! Periodic HTTP requester and latency measurement
//!
//! A [`Requester`] fires one GET per tick against its target, measures the
//! round trip, and pushes the elapsed nanoseconds onto a channel. Transport
//! failures and slow responses are reported as request event lines; local
//! failures end the loop with a fatal [`AppError`].
//!
//! ```no_run
//! # use http_latency_probe::requester::{Requester, RequesterSettings};
//! # async fn demo() -> http_latency_probe::Result<()> {
//! let (samples_tx, mut samples_rx) = tokio::sync::mpsc::channel(16);
//! let settings = RequesterSettings::new(1_000_000, 2_000, "http://localhost:9999/ping");
//! let requester = Requester::new(settings, samples_tx)?;
//! let stop = requester.stop_handle();
//!
//! let task = tokio::spawn(requester.run());
//! let first = samples_rx.recv().await;
//! stop.stop().await;
//! task.await.ok();
//! # let _ = first; Ok(()) }
//! ```

pub mod resolve;


pub use resolve::{DialOverride, ResolveOverride};

use crate::{
    error::{AppError, Result},
    logging::RequestLogger,
    types::{SendPolicy, TickOutcome},
};
use rand::Rng;
use reqwest::{header::HeaderMap, Client, Request, Response};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::{
    sync::{mpsc, oneshot},
    time::{self, MissedTickBehavior},
};
use url::Url;

/// Responses slower than this many milliseconds are logged with their body
pub const SLOW_REQUEST_MS: u128 = 500;

/// Connect timeout of the requester's connection pool
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// TCP keep-alive of the requester's connection pool
pub const TCP_KEEPALIVE: Duration = Duration::from_secs(30);

/// Immutable requester configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequesterSettings {
    /// Tick interval, applied as microseconds
    pub interval_us: u64,
    /// Per-request timeout in milliseconds, 0 disables it
    pub timeout_ms: u64,
    /// Target URL; the request id is appended as `?<id>`
    pub url: String,
    /// `host:port:address` override, empty when unused
    pub resolve: String,
    /// Behaviour when the sample channel is full
    pub send_policy: SendPolicy,
}

impl RequesterSettings {
    pub fn new(interval_us: u64, timeout_ms: u64, url: impl Into<String>) -> Self {
        Self {
            interval_us,
            timeout_ms,
            url: url.into(),
            resolve: String::new(),
            send_policy: SendPolicy::Block,
        }
    }

    pub fn with_resolve(mut self, resolve: impl Into<String>) -> Self {
        self.resolve = resolve.into();
        self
    }

    pub fn with_send_policy(mut self, policy: SendPolicy) -> Self {
        self.send_policy = policy;
        self
    }

    pub fn interval(&self) -> Duration {
        Duration::from_micros(self.interval_us)
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }
}

/// Handle used to stop a running requester
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: mpsc::Sender<oneshot::Sender<()>>,
}

impl StopHandle {
    /// Ask the loop to stop and wait until it has acknowledged
    ///
    /// The loop only looks at the stop signal between requests, so an
    /// in-flight request finishes first. Returns immediately if the loop has
    /// already returned; waits for it to start if it never did.
    pub async fn stop(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(ack_tx).await.is_err() {
            return;
        }
        let _ = ack_rx.await;
    }
}

/// Ticking HTTP requester
pub struct Requester {
    settings: RequesterSettings,
    client: Client,
    dial: Option<Arc<dyn DialOverride>>,
    host_headers: Option<HeaderMap>,
    samples: mpsc::Sender<i64>,
    stop_tx: mpsc::Sender<oneshot::Sender<()>>,
    stop_rx: mpsc::Receiver<oneshot::Sender<()>>,
    logger: RequestLogger,
}

impl Requester {
    /// Create a requester logging to the console
    pub fn new(settings: RequesterSettings, samples: mpsc::Sender<i64>) -> Result<Self> {
        Self::with_logger(settings, samples, RequestLogger::console())
    }

    /// Create a requester with an explicit logger
    ///
    /// A non-empty `settings.resolve` is parsed into a [`ResolveOverride`]; a
    /// malformed one is a configuration error.
    pub fn with_logger(
        settings: RequesterSettings,
        samples: mpsc::Sender<i64>,
        logger: RequestLogger,
    ) -> Result<Self> {
        let dial: Option<Arc<dyn DialOverride>> = if settings.resolve.is_empty() {
            None
        } else {
            Some(Arc::new(ResolveOverride::parse(&settings.resolve)?))
        };
        Self::with_dial_override(settings, samples, logger, dial)
    }

    /// Create a requester with an injected dial strategy
    ///
    /// `settings.resolve` is ignored; `dial` alone decides where connections go.
    pub fn with_dial_override(
        settings: RequesterSettings,
        samples: mpsc::Sender<i64>,
        logger: RequestLogger,
        dial: Option<Arc<dyn DialOverride>>,
    ) -> Result<Self> {
        let mut builder = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .tcp_keepalive(TCP_KEEPALIVE);
        if let Some(dial) = &dial {
            builder = dial.configure(builder, logger.clone());
        }
        let client = builder
            .build()
            .map_err(|e| AppError::config(format!("Failed to create HTTP client: {}", e)))?;

        let host_headers = match dial.as_ref().and_then(|d| d.host_header()) {
            Some(host) => Some(resolve::host_header_map(host)?),
            None => None,
        };

        let (stop_tx, stop_rx) = mpsc::channel(1);

        Ok(Self {
            settings,
            client,
            dial,
            host_headers,
            samples,
            stop_tx,
            stop_rx,
            logger,
        })
    }

    pub fn settings(&self) -> &RequesterSettings {
        &self.settings
    }

    /// Host header forced onto requests, if a dial override provides one
    pub fn host_header(&self) -> Option<&str> {
        self.dial.as_ref().and_then(|d| d.host_header())
    }

    /// Handle able to stop this requester once it runs
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle { tx: self.stop_tx.clone() }
    }

    /// Run the tick loop until stopped
    ///
    /// The first request fires one interval after the call. Ticks that come
    /// due while a request is in flight are skipped, never queued. Returns an
    /// error only for fatal failures; network errors are logged and the loop
    /// carries on.
    pub async fn run(mut self) -> Result<()> {
        let period = self.settings.interval();
        if period.is_zero() {
            let error = AppError::fatal("Tick interval must be greater than 0");
            self.logger.log_fatal(&error).await;
            return Err(error);
        }

        let mut ticker = time::interval_at(time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut tally = TickTally::default();

        loop {
            tokio::select! {
                biased;
                ack = self.stop_rx.recv() => {
                    if let Some(ack) = ack {
                        let _ = ack.send(());
                    }
                    self.logger.log_stopped(tally.ticks, tally.slow, tally.failed).await;
                    return Ok(());
                }
                _ = ticker.tick() => {
                    match self.tick().await {
                        Ok(outcome) => tally.record(outcome),
                        Err(error) => {
                            self.logger.log_fatal(&error).await;
                            return Err(error);
                        }
                    }
                }
            }
        }
    }

    /// Fire one request, emit its sample and report it
    pub(crate) async fn tick(&self) -> Result<TickOutcome> {
        let request_id = next_request_id();
        let request = self.build_request(request_id)?;

        if let Some(dial) = &self.dial {
            // IP literals never reach the resolver, so the redirect is reported here
            if matches!(request.url().host(), Some(url::Host::Ipv4(_)) | Some(url::Host::Ipv6(_))) {
                let (original, modified) = dial.describe_dial();
                self.logger.log_dial(&original, &modified).await;
            }
        }

        let started = Instant::now();
        let outcome = self.client.execute(request).await;
        let elapsed = started.elapsed();

        self.emit_sample(elapsed_nanos(elapsed)).await?;

        let response = match outcome {
            Ok(response) => response,
            Err(error) => {
                let error = AppError::from(error);
                if !error.is_recoverable() {
                    return Err(error);
                }
                self.logger.log_request_error(elapsed, &error);
                return Ok(TickOutcome::Failed);
            }
        };

        if elapsed.as_millis() > SLOW_REQUEST_MS {
            let body = read_body(response).await?;
            self.logger.log_slow_request(elapsed, &body, request_id);
            return Ok(TickOutcome::Slow);
        }

        // Dropping the response here releases its connection every iteration
        Ok(TickOutcome::Completed)
    }

    /// Build the GET for one tick
    pub(crate) fn build_request(&self, request_id: u64) -> Result<Request> {
        let raw = format!("{}?{}", self.settings.url, request_id);
        let mut url = Url::parse(&raw)
            .map_err(|e| AppError::fatal(format!("Failed to build request for '{}': {}", raw, e)))?;

        if let Some(dial) = &self.dial {
            dial.rewrite_url(&mut url)?;
        }

        let mut builder = self.client.get(url);
        if let Some(timeout) = self.settings.timeout() {
            builder = builder.timeout(timeout);
        }

        let mut request = builder
            .build()
            .map_err(|e| AppError::fatal(format!("Failed to build request for '{}': {}", raw, e)))?;

        if let Some(headers) = &self.host_headers {
            // Replaces the request's own map only; client defaults such as
            // `accept` are still merged in by reqwest when the request is sent
            *request.headers_mut() = headers.clone();
        }

        Ok(request)
    }

    async fn emit_sample(&self, nanos: i64) -> Result<()> {
        match self.settings.send_policy {
            SendPolicy::Block => self
                .samples
                .send(nanos)
                .await
                .map_err(|_| AppError::internal("Latency sample receiver was dropped")),
            SendPolicy::DropNewest => match self.samples.try_send(nanos) {
                Ok(()) => Ok(()),
                Err(mpsc::error::TrySendError::Full(dropped)) => {
                    self.logger.log_sample_dropped(dropped).await;
                    Ok(())
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    Err(AppError::internal("Latency sample receiver was dropped"))
                }
            },
        }
    }
}

/// Per-outcome tick counters reported when the loop stops
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct TickTally {
    ticks: u64,
    slow: u64,
    failed: u64,
}

impl TickTally {
    fn record(&mut self, outcome: TickOutcome) {
        self.ticks += 1;
        match outcome {
            TickOutcome::Completed => {}
            TickOutcome::Slow => self.slow += 1,
            TickOutcome::Failed => self.failed += 1,
        }
    }
}

async fn read_body(response: Response) -> Result<String> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| AppError::fatal(format!("Failed to read response body: {}", AppError::describe_transport(&e))))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Non-negative pseudo-random request id
fn next_request_id() -> u64 {
    rand::thread_rng().gen_range(0..=i64::MAX as u64)
}

fn elapsed_nanos(elapsed: Duration) -> i64 {
    i64::try_from(elapsed.as_nanos()).unwrap_or(i64::MAX)
}
