//! Observability handle threaded through the gateway and the service
//!
//! Instead of process-wide tracer singletons, every component receives an
//! `Arc<dyn Telemetry>` at construction time. The default implementation
//! emits `tracing` spans and `metrics` counters.
//!
//! # Metrics
//!
//! - `consultation_llm_requests_total`: Counter of provider calls by dialect
//! - `consultation_llm_errors_total`: Counter of provider failures by category
//! - `consultation_errors_total`: Counter of other failures (input, session, storage) by category
//! - `consultation_llm_duration_seconds`: Histogram of provider call duration
//! - `consultation_exchanges_total`: Counter of persisted exchanges

use crate::error::{categorize, ErrorCategory};
use metrics::{histogram, increment_counter};
use std::sync::Arc;
use std::time::Duration;

/// Start-span / record-error capability
pub trait Telemetry: Send + Sync {
    /// Open a span for one operation
    fn start_span(&self, name: &'static str) -> tracing::Span;

    /// Record a failure against the current operation
    fn record_error(&self, operation: &'static str, err: &anyhow::Error);

    /// Record one outbound provider call
    fn record_llm_call(&self, dialect: &'static str, elapsed: Duration) {
        let _ = (dialect, elapsed);
    }

    /// Record one persisted exchange
    fn record_exchange(&self) {}
}

/// Counter a failure of `category` is recorded under
fn error_counter(category: ErrorCategory) -> &'static str {
    match category {
        ErrorCategory::ConfigurationMissing
        | ErrorCategory::UpstreamRejected
        | ErrorCategory::Timeout
        | ErrorCategory::RateLimited
        | ErrorCategory::MalformedResponse => "consultation_llm_errors_total",
        ErrorCategory::InvalidInput
        | ErrorCategory::SessionNotFound
        | ErrorCategory::Storage
        | ErrorCategory::Internal => "consultation_errors_total",
    }
}

/// Default telemetry backed by `tracing` and `metrics`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTelemetry;

impl TracingTelemetry {
    /// Shared handle to the default telemetry
    pub fn shared() -> Arc<dyn Telemetry> {
        Arc::new(Self)
    }
}

impl Telemetry for TracingTelemetry {
    fn start_span(&self, name: &'static str) -> tracing::Span {
        tracing::info_span!("consultation", operation = name)
    }

    fn record_error(&self, operation: &'static str, err: &anyhow::Error) {
        let category = categorize(err);
        increment_counter!(error_counter(category), "category" => category.as_str());
        match category {
            ErrorCategory::InvalidInput | ErrorCategory::SessionNotFound => {
                tracing::debug!(operation, %category, "{:#}", err)
            }
            _ => tracing::error!(operation, %category, "{:#}", err),
        }
    }

    fn record_llm_call(&self, dialect: &'static str, elapsed: Duration) {
        increment_counter!("consultation_llm_requests_total", "dialect" => dialect);
        histogram!(
            "consultation_llm_duration_seconds",
            elapsed.as_secs_f64(),
            "dialect" => dialect
        );
    }

    fn record_exchange(&self) {
        increment_counter!("consultation_exchanges_total");
    }
}

/// Initializes the metrics exporter for Prometheus
///
/// Only has an effect when compiled with the `prometheus` feature; it is
/// still safe to call otherwise.
pub fn init_metrics_exporter() {
    #[cfg(feature = "prometheus")]
    {
        use metrics_exporter_prometheus::PrometheusBuilder;
        let builder = PrometheusBuilder::new();
        let _ = builder.install().map_err(|e| {
            tracing::warn!("Failed to install Prometheus exporter: {}", e);
        });
    }
}
