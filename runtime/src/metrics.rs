//! Prometheus metrics for the booking engine.
//!
//! Business counters for fare quotes, payment events, dispatch decisions and
//! notification delivery, plus a dispatch latency histogram.
//!
//! # Example
//!
//! ```rust,no_run
//! use transfer_runtime::metrics::MetricsServer;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//! let text = server.render();
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

pub use metrics::{counter, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus recorder plus the address its scrape endpoint is served on.
pub struct MetricsServer {
    addr: SocketAddr,
    handle: Option<PrometheusHandle>,
}

impl MetricsServer {
    /// Create a new metrics server.
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr, handle: None }
    }

    /// Address the scrape endpoint should listen on
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Installs the global recorder and registers metric descriptions.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built or installed.
    ///
    /// # Note
    ///
    /// If a recorder is already installed (e.g. in tests) this logs a warning
    /// and leaves the handle empty.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        register_business_metrics();

        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                self.handle = Some(handle);
                tracing::info!(addr = %self.addr, "Metrics recorder installed");
                Ok(())
            }
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            }
        }
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus format.
    ///
    /// Returns `None` if the recorder was not installed by this server.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Registers descriptions for every business metric.
pub fn register_business_metrics() {
    describe_counter!(
        "transfer_fare_quotes_total",
        "Fare quotes computed, by price source"
    );
    describe_counter!(
        "transfer_bookings_created_total",
        "Bookings created, by checkout outcome"
    );
    describe_counter!(
        "transfer_payment_events_total",
        "Payment provider events processed, by kind and outcome"
    );
    describe_counter!(
        "transfer_dispatch_total",
        "Dispatch attempts, by method and outcome"
    );
    describe_histogram!(
        "transfer_dispatch_duration_seconds",
        "Time taken to select and bind a driver"
    );
    describe_counter!(
        "transfer_notifications_total",
        "Notification deliveries, by type and outcome"
    );
}

/// Fare metrics recorder.
pub struct FareMetrics;

impl FareMetrics {
    /// Record a computed quote.
    pub fn record_quote(source: &'static str) {
        counter!("transfer_fare_quotes_total", "source" => source).increment(1);
    }
}

/// Booking metrics recorder.
pub struct BookingMetrics;

impl BookingMetrics {
    /// Record a created booking.
    pub fn record_created(checkout: &'static str) {
        counter!("transfer_bookings_created_total", "checkout" => checkout).increment(1);
    }
}

/// Payment event metrics recorder.
pub struct PaymentMetrics;

impl PaymentMetrics {
    /// Record a processed (or rejected) event.
    pub fn record_event(kind: String, outcome: &'static str) {
        counter!("transfer_payment_events_total", "kind" => kind, "outcome" => outcome).increment(1);
    }
}

/// Dispatch metrics recorder.
pub struct DispatchMetrics;

impl DispatchMetrics {
    /// Record a dispatch outcome.
    pub fn record(method: &'static str, outcome: &'static str, duration: Duration) {
        counter!("transfer_dispatch_total", "method" => method, "outcome" => outcome).increment(1);
        histogram!("transfer_dispatch_duration_seconds").record(duration.as_secs_f64());
    }
}

/// Notification metrics recorder.
pub struct NotificationMetrics;

impl NotificationMetrics {
    /// Record one channel delivery.
    pub fn record(notification_type: &'static str, outcome: &'static str) {
        counter!(
            "transfer_notifications_total",
            "type" => notification_type,
            "outcome" => outcome
        )
        .increment(1);
    }
}
