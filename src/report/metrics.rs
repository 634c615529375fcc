//! Metrics sink and its Prometheus implementation

use std::path::Path;

#[cfg(test)]
use mockall::automock;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

use crate::report::error::ReportError;

/// Receives counts from the orchestrator as a pass progresses.
///
/// Calls are fire-and-forget: implementations must not fail the caller.
#[cfg_attr(test, automock)]
pub trait MetricsSink: Send + Sync {
    /// Number of containers in scope for the current pass
    fn set_monitored(&self, count: usize);

    /// A container was replaced with a newer image
    fn record_update(&self, container: &str);

    /// The pass finished after updating `updated` containers
    fn record_pass(&self, updated: usize);
}

/// Prometheus metrics labeled with the runtime host
pub struct PrometheusMetrics {
    registry: Registry,
    monitored: IntGauge,
    updates: IntCounterVec,
    passes: IntCounter,
    last_pass_updated: IntGauge,
}

impl PrometheusMetrics {
    pub fn new(host: &str) -> Result<Self, ReportError> {
        let registry = Registry::new();

        let monitored = IntGauge::with_opts(
            Opts::new(
                "argus_monitored_containers",
                "Containers in scope during the last pass",
            )
            .const_label("host", host),
        )?;
        let updates = IntCounterVec::new(
            Opts::new(
                "argus_container_updates_total",
                "Containers replaced with a newer image",
            )
            .const_label("host", host),
            &["container"],
        )?;
        let passes = IntCounter::with_opts(
            Opts::new("argus_passes_total", "Completed update passes").const_label("host", host),
        )?;
        let last_pass_updated = IntGauge::with_opts(
            Opts::new(
                "argus_last_pass_updated_containers",
                "Containers updated by the last pass",
            )
            .const_label("host", host),
        )?;

        registry.register(Box::new(monitored.clone()))?;
        registry.register(Box::new(updates.clone()))?;
        registry.register(Box::new(passes.clone()))?;
        registry.register(Box::new(last_pass_updated.clone()))?;

        Ok(Self {
            registry,
            monitored,
            updates,
            passes,
            last_pass_updated,
        })
    }

    /// Prometheus text exposition of every metric
    pub fn encode(&self) -> Result<String, ReportError> {
        let families = self.registry.gather();
        let mut output = Vec::new();
        TextEncoder::new().encode(&families, &mut output)?;
        Ok(String::from_utf8_lossy(&output).into_owned())
    }

    /// Write the text exposition to `path`, replacing its contents
    pub fn write_to(&self, path: &Path) -> Result<(), ReportError> {
        let text = self.encode()?;
        std::fs::write(path, text).map_err(|source| ReportError::MetricsFile {
            path: path.display().to_string(),
            source,
        })
    }
}

impl MetricsSink for PrometheusMetrics {
    fn set_monitored(&self, count: usize) {
        self.monitored.set(count as i64);
    }

    fn record_update(&self, container: &str) {
        self.updates
            .with_label_values(&[container.trim_start_matches('/')])
            .inc();
    }

    fn record_pass(&self, updated: usize) {
        self.passes.inc();
        self.last_pass_updated.set(updated as i64);
    }
}
