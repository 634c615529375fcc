//! Monitoring set resolution from include/exclude name filters

use indexmap::IndexSet;
use thiserror::Error;

use crate::runtime::types::RunningContainerInfo;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Containers cannot be both monitored and ignored: {}", .names.join(", "))]
    OverlappingFilters { names: Vec<String> },
}

/// Container names to monitor and to ignore
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonitoringFilters {
    pub include: IndexSet<String>,
    pub exclude: IndexSet<String>,
}

impl MonitoringFilters {
    pub fn new<I, E>(include: I, exclude: E) -> Self
    where
        I: IntoIterator<Item = String>,
        E: IntoIterator<Item = String>,
    {
        Self {
            include: include.into_iter().map(|n| normalize_name(&n).to_string()).collect(),
            exclude: exclude.into_iter().map(|n| normalize_name(&n).to_string()).collect(),
        }
    }

    /// Fails when a name is both included and excluded
    pub fn validate(&self) -> Result<(), ConfigError> {
        let overlap: Vec<String> = self
            .include
            .intersection(&self.exclude)
            .cloned()
            .collect();

        if overlap.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::OverlappingFilters { names: overlap })
        }
    }

    fn admits(&self, name: &str) -> bool {
        let name = normalize_name(name);
        (self.include.is_empty() || self.include.contains(name)) && !self.exclude.contains(name)
    }
}

/// Runtime names may carry a leading `/`
fn normalize_name(name: &str) -> &str {
    name.trim_start_matches('/')
}

/// Select the containers in scope for this pass, preserving listing order
pub fn resolve(
    all_running: Vec<RunningContainerInfo>,
    filters: &MonitoringFilters,
) -> Result<Vec<RunningContainerInfo>, ConfigError> {
    filters.validate()?;

    Ok(all_running
        .into_iter()
        .filter(|container| filters.admits(container.name()))
        .collect())
}
