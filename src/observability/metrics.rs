use anyhow::Result;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use tracing::info;
use std::sync::Arc;
use tokio::sync::OnceCell;


// Declare the static OnceCell to hold the Metrics.
static METRICS_INSTANCE: OnceCell<Arc<Metrics>> = OnceCell::const_new();

/// Asynchronously initializes and gets a reference to the static `Metrics`.
pub async fn get_metrics() -> &'static Arc<Metrics> {
    METRICS_INSTANCE.get_or_init(|| async {
        info!("Initializing Metrics ...");
        Metrics::new()}
    ).await
}

/// Synchronous access for code paths that cannot await (event delivery).
/// Returns `None` until the first `get_metrics().await`.
pub fn try_metrics() -> Option<&'static Arc<Metrics>> {
    METRICS_INSTANCE.get()
}


#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Authenticating transport
    pub requests: IntCounterVec,
    pub request_duration: HistogramVec,
    pub auth_failures: IntCounter,
    pub retry_exhausted: IntCounter,

    // Refresh coordinator
    pub refresh_attempts: IntCounter,
    pub refresh_failures: IntCounterVec,
    pub refresh_duration: HistogramVec,
    pub queued_calls: IntGauge,
    pub replayed_calls: IntCounterVec,

    // Event bus
    pub events_emitted: IntCounterVec,
    pub listener_panics: IntCounter,

    // Config/runtime
    pub config_validation_errors: IntCounter,
}

impl Metrics {
    fn new() -> Arc<Self> {
        let registry = Registry::new_custom(Some("bearerrelay".into()), None).unwrap();

        let metrics: Arc<Metrics> = Arc::new(Self {
            // Transport
            requests: IntCounterVec::new(Opts::new("requests_total", "Outbound requests by method and outcome"),&["method", "outcome"],).unwrap(),
            request_duration: HistogramVec::new(HistogramOpts::new("request_duration_seconds", "Outbound request duration seconds").buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),&["method"],).unwrap(),
            auth_failures: IntCounter::new("auth_failures_total", "Responses rejecting the presented credential").unwrap(),
            retry_exhausted: IntCounter::new("retry_exhausted_total", "Requests rejected again after one refresh-and-retry cycle").unwrap(),

            // Refresh
            refresh_attempts: IntCounter::new("refresh_attempts_total", "Refresh endpoint calls").unwrap(),
            refresh_failures: IntCounterVec::new(Opts::new("refresh_failures_total", "Refresh failures by reason"),&["reason"],).unwrap(),
            refresh_duration: HistogramVec::new(HistogramOpts::new("refresh_duration_seconds", "Refresh call duration seconds").buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),&["outcome"],).unwrap(),
            queued_calls: IntGauge::new("queued_calls", "Calls parked behind an in-flight refresh").unwrap(),
            replayed_calls: IntCounterVec::new(Opts::new("replayed_calls_total", "Queued calls drained after a refresh"),&["outcome"],).unwrap(),

            // Events
            events_emitted: IntCounterVec::new(Opts::new("events_emitted_total", "Auth lifecycle events published"),&["event"],).unwrap(),
            listener_panics: IntCounter::new("listener_panics_total", "Event listeners that panicked during delivery").unwrap(),

            // Config/runtime
            config_validation_errors: IntCounter::new("config_validation_errors_total","Validation errors during config load",).unwrap(),

            registry,
        });

        // Register all metrics in the registry
        let reg = &metrics.registry;
        reg.register(Box::new(metrics.requests.clone())).unwrap();
        reg.register(Box::new(metrics.request_duration.clone())).unwrap();
        reg.register(Box::new(metrics.auth_failures.clone())).unwrap();
        reg.register(Box::new(metrics.retry_exhausted.clone())).unwrap();
        reg.register(Box::new(metrics.refresh_attempts.clone())).unwrap();
        reg.register(Box::new(metrics.refresh_failures.clone())).unwrap();
        reg.register(Box::new(metrics.refresh_duration.clone())).unwrap();
        reg.register(Box::new(metrics.queued_calls.clone())).unwrap();
        reg.register(Box::new(metrics.replayed_calls.clone())).unwrap();
        reg.register(Box::new(metrics.events_emitted.clone())).unwrap();
        reg.register(Box::new(metrics.listener_panics.clone())).unwrap();
        reg.register(Box::new(metrics.config_validation_errors.clone())).unwrap();

        metrics
    }
}

/// Render the registry in the text exposition format
pub async fn encode() -> Result<String> {
    let metrics = get_metrics().await;
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&metrics.registry.gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}
