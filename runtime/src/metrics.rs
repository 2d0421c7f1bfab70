//! Metrics for observability and monitoring.
//!
//! Metrics are emitted through the `metrics` facade at the call sites
//! (store, controller reducer). This module describes them and offers a
//! Prometheus exporter for hosts that want to render them.
//!
//! # Example
//!
//! ```rust,no_run
//! use composable_fetch_runtime::metrics::MetricsExporter;
//!
//! let mut exporter = MetricsExporter::new();
//! exporter.install()?;
//!
//! if let Some(text) = exporter.render() {
//!     println!("{text}");
//! }
//! # Ok::<(), composable_fetch_runtime::metrics::MetricsError>(())
//! ```

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};
use thiserror::Error;

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

/// Histogram buckets for `*duration_seconds` metrics, from 1ms to 10s
const DURATION_BUCKETS: &[f64] = &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

/// Prometheus recorder with text rendering.
#[derive(Default)]
pub struct MetricsExporter {
    handle: Option<PrometheusHandle>,
}

impl MetricsExporter {
    /// Create an exporter; nothing is recorded until [`install`](Self::install).
    #[must_use]
    pub const fn new() -> Self {
        Self { handle: None }
    }

    /// Describe every metric and install the Prometheus recorder globally.
    ///
    /// Only one recorder can exist per process. When another one is
    /// already installed (another exporter, a test harness), this succeeds
    /// without a handle and [`render`](Self::render) returns `None`.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError`] if the histogram buckets are rejected or
    /// the recorder cannot be installed.
    pub fn install(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        let recorder = PrometheusBuilder::new()
            .set_buckets_for_metric(Matcher::Suffix("duration_seconds".into()), DURATION_BUCKETS)
            .map_err(|error| MetricsError::Build(error.to_string()))?;

        match recorder.install_recorder() {
            Ok(handle) => {
                tracing::info!("Prometheus recorder installed");
                self.handle = Some(handle);
            },
            Err(BuildError::FailedToSetGlobalRecorder(_)) => {
                tracing::warn!("A metrics recorder is already installed; exporter left inactive");
            },
            Err(error) => return Err(MetricsError::Install(error.to_string())),
        }
        Ok(())
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus text format.
    ///
    /// Returns `None` if this exporter did not install the recorder.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

impl std::fmt::Debug for MetricsExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsExporter")
            .field("installed", &self.handle.is_some())
            .finish()
    }
}

/// Register all metric descriptions.
pub fn register_metrics() {
    // Store
    describe_counter!("store.actions.total", "Total number of actions reduced by stores");
    describe_counter!(
        "store.effects.executed",
        "Effects executed by stores, labelled by effect type"
    );
    describe_histogram!(
        "store.reducer.duration_seconds",
        "Time spent inside the reducer per action"
    );
    describe_counter!(
        "store.shutdown.rejected_actions",
        "Actions rejected because the store was closed"
    );
    describe_counter!("store.shutdown.initiated", "Stores closed for new actions");
    describe_counter!("store.shutdown.completed", "Shutdowns that drained all effects");
    describe_counter!("store.shutdown.timeout", "Shutdowns that timed out with effects pending");

    // Fetch controller
    describe_counter!("fetch.trigger.total", "Total number of operation invocations");
    describe_counter!(
        "fetch.response.total",
        "Settled operation calls, labelled by classified outcome"
    );
    describe_counter!(
        "fetch.response.stale",
        "Responses dropped because a newer request had been issued"
    );
    describe_histogram!(
        "fetch.operation.duration_seconds",
        "Time from invoking the operation until it settled"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exporter_starts_uninstalled() {
        let exporter = MetricsExporter::new();
        assert!(exporter.handle().is_none());
        assert!(exporter.render().is_none());
    }

    #[tokio::test]
    async fn exporter_renders_fetch_metrics() {
        let mut exporter = MetricsExporter::new();
        assert!(exporter.install().is_ok());

        metrics::counter!("fetch.trigger.total").increment(1);
        metrics::counter!("fetch.response.total", "outcome" => "success").increment(1);

        // Another test may have installed the recorder first.
        if let Some(rendered) = exporter.render() {
            assert!(rendered.contains("fetch_trigger_total"));
            assert!(rendered.contains("fetch_response_total"));
        }
    }
}
