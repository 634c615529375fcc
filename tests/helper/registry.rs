//! Tag lister and reporter test doubles

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use argus::report::error::ReportError;
use argus::report::sink::Reporter;
use argus::runtime::types::Credentials;
use argus::update::orchestrator::PassSummary;
use argus::version::error::RegistryError;
use argus::version::registry::TagLister;

/// Tag lister serving fixed tag lists per repository
#[derive(Default)]
pub struct FakeTagLister {
    tags: HashMap<String, Vec<String>>,
}

impl FakeTagLister {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tags(mut self, repository: &str, tags: &[&str]) -> Self {
        self.tags.insert(
            repository.to_string(),
            tags.iter().map(|t| t.to_string()).collect(),
        );
        self
    }
}

#[async_trait]
impl TagLister for FakeTagLister {
    async fn list_tags(
        &self,
        _registry_base: &str,
        repository: &str,
        _credentials: Option<Credentials>,
    ) -> Result<Vec<String>, RegistryError> {
        self.tags
            .get(repository)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(repository.to_string()))
    }
}

/// Reporter keeping every summary it receives
#[derive(Default)]
pub struct RecordingReporter {
    summaries: Mutex<Vec<(usize, usize)>>,
}

impl RecordingReporter {
    /// `(monitored, updated)` per reported pass
    pub fn reported(&self) -> Vec<(usize, usize)> {
        self.summaries.lock().unwrap().clone()
    }
}

#[async_trait]
impl Reporter for RecordingReporter {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn report(&self, summary: &PassSummary) -> Result<(), ReportError> {
        self.summaries
            .lock()
            .unwrap()
            .push((summary.monitored, summary.updated()));
        Ok(())
    }
}
