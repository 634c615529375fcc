use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Webhook {url} responded with status {status}")]
    Rejected { url: String, status: u16 },

    #[error("{failed} of {total} webhook deliveries failed")]
    PartialDelivery { failed: usize, total: usize },

    #[error("Failed to write metrics to {path}: {source}")]
    MetricsFile {
        path: String,
        source: std::io::Error,
    },

    #[error("Prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}
