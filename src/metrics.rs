use std::time::{Duration, Instant};

use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};
use tracing::info;

const LABELS: &[&str] = &["method", "path", "status"];

/// Request-duration collectors of one relay API instance, held in a
/// registry of its own.
#[derive(Clone)]
pub struct RequestMetrics {
    registry: Registry,
    duration: HistogramVec,
    total: IntCounterVec,
}

impl RequestMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let buckets = vec![0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];
        let duration = HistogramVec::new(
            HistogramOpts::new(
                "relaybot_request_duration_seconds",
                "HTTP request duration in seconds",
            )
            .buckets(buckets),
            LABELS,
        )?;
        let total = IntCounterVec::new(
            Opts::new("relaybot_requests_total", "Total HTTP requests by status"),
            LABELS,
        )?;

        let registry = Registry::new();
        registry.register(Box::new(duration.clone()))?;
        registry.register(Box::new(total.clone()))?;

        Ok(Self {
            registry,
            duration,
            total,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record(&self, method: &str, path: &str, status: u16, elapsed: Duration) {
        let status = status.to_string();
        let labels = [method, path, status.as_str()];
        self.duration
            .with_label_values(&labels)
            .observe(elapsed.as_secs_f64());
        self.total.with_label_values(&labels).inc();
    }
}

/// Axum middleware: time each request and record it.
pub async fn track_duration(
    State(metrics): State<RequestMetrics>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    // Label by route template, not raw path
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let start = Instant::now();

    let response = next.run(request).await;

    let elapsed = start.elapsed();
    let status = response.status().as_u16();
    metrics.record(method.as_str(), &path, status, elapsed);
    info!(
        target: "relaybot::metrics",
        %method,
        path = %path,
        status,
        duration_ms = elapsed.as_secs_f64() * 1000.0,
        "request_duration"
    );

    response
}
