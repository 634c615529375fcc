//! Reporter trait: receives the summary of each completed pass

#[cfg(test)]
use mockall::automock;

use crate::report::error::ReportError;
use crate::update::orchestrator::PassSummary;

/// A sink notified once at the end of every pass.
///
/// Failures are logged by the caller and never affect the pass result or
/// other reporters.
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait Reporter: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    async fn report(&self, summary: &PassSummary) -> Result<(), ReportError>;
}
