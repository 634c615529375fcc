//! Pass reporting
//!
//! - [`error`]: Error types for reporters and metrics
//! - [`metrics`]: `MetricsSink` trait and Prometheus implementation
//! - [`sink`]: `Reporter` trait
//! - [`webhook`]: Chat and generic webhook notifications

pub mod error;
pub mod metrics;
pub mod sink;
pub mod webhook;
