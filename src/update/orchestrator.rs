//! Update pass orchestration
//!
//! One pass lists running containers, narrows them to the monitoring set and
//! walks each one through inspect, resolve, pull, compare and (when a newer
//! image was pulled) stop, remove, create, start. Containers are processed one
//! at a time in listing order. A failure ends that container's pipeline only.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::report::metrics::MetricsSink;
use crate::report::sink::Reporter;
use crate::runtime::containers::{ContainerStore, derive_relaunch_config};
use crate::runtime::error::{ContainerError, ContainerOperation, ImageError};
use crate::runtime::images::ImageStore;
use crate::runtime::reference::ImageReference;
use crate::runtime::types::{ContainerSnapshot, Credentials, ImageDescriptor, RunningContainerInfo};
use crate::update::filter::{ConfigError, MonitoringFilters, resolve};
use crate::version::comparator::should_update;
use crate::version::policy::VersionPolicy;
use crate::version::resolver::TagResolver;

/// Errors that end one container's pipeline
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("{0}")]
    Inspect(#[source] ImageError),

    #[error("{0}")]
    Pull(#[source] ImageError),

    #[error("{0}")]
    Stop(#[source] ContainerError),

    #[error("{0}")]
    Remove(#[source] ContainerError),

    /// The old container is gone and its replacement is not running
    #[error("Old container was removed but the replacement failed to {stage}: {source}")]
    PartialReplacement {
        stage: ContainerOperation,
        source: ContainerError,
    },
}

impl UpdateError {
    pub fn is_partial_replacement(&self) -> bool {
        matches!(self, UpdateError::PartialReplacement { .. })
    }

    /// Step that failed after the old container was already removed
    pub fn replacement_stage(&self) -> Option<ContainerOperation> {
        match self {
            UpdateError::PartialReplacement { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// Errors that abort a whole pass before any container is touched
#[derive(Debug, Error)]
pub enum PassError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Runtime(#[from] ContainerError),
}

/// A successful replacement
#[derive(Debug, Clone)]
pub struct UpdateOutcome {
    pub old_image: ImageDescriptor,
    pub new_image: ImageDescriptor,
    /// Snapshot of the replaced container
    pub container: ContainerSnapshot,
    pub updated_at: DateTime<Utc>,
}

impl UpdateOutcome {
    pub fn container_name(&self) -> &str {
        &self.container.name
    }
}

/// A container whose pipeline ended in failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateFailure {
    pub container: String,
    pub image: String,
    pub error: String,
    pub partial_replacement: bool,
    /// Set when the replacement failed after the old container was removed
    pub replacement_stage: Option<ContainerOperation>,
}

/// Result of one pass, handed to every reporter
#[derive(Debug, Clone)]
pub struct PassSummary {
    /// Runtime endpoint the pass ran against
    pub host: String,
    pub monitored: usize,
    pub outcomes: Vec<UpdateOutcome>,
    pub failures: Vec<UpdateFailure>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl PassSummary {
    pub fn updated(&self) -> usize {
        self.outcomes.len()
    }
}

#[derive(Debug, Clone, Default)]
pub struct UpdateOptions {
    /// Remove the superseded image after a successful replacement
    pub cleanup: bool,
    pub policy: VersionPolicy,
    pub credentials: Option<Credentials>,
    pub filters: MonitoringFilters,
    /// Host label used in reports and metrics
    pub host: String,
}

pub struct Updater {
    containers: ContainerStore,
    images: ImageStore,
    tags: TagResolver,
    options: UpdateOptions,
    reporters: Vec<Arc<dyn Reporter>>,
    metrics: Option<Arc<dyn MetricsSink>>,
}

impl Updater {
    pub fn new(
        containers: ContainerStore,
        images: ImageStore,
        tags: TagResolver,
        options: UpdateOptions,
    ) -> Self {
        Self {
            containers,
            images,
            tags,
            options,
            reporters: Vec::new(),
            metrics: None,
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporters.push(reporter);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Run one complete pass over the monitored containers
    pub async fn run_pass(&self) -> Result<PassSummary, PassError> {
        let started_at = Utc::now();

        self.options.filters.validate().inspect_err(|e| {
            error!("Refusing to run update pass: {}", e);
        })?;

        let running = self.containers.list_running().await.inspect_err(|e| {
            error!("Failed to list running containers: {}", e);
        })?;
        let in_scope = resolve(running, &self.options.filters)?;

        if in_scope.is_empty() {
            info!("No running containers to monitor");
        }
        if let Some(metrics) = &self.metrics {
            metrics.set_monitored(in_scope.len());
        }

        let monitored = in_scope.len();
        let mut outcomes = Vec::new();
        let mut failures = Vec::new();

        for container in in_scope {
            let name = container.name().to_string();
            let image = container.snapshot.image.clone();

            match self.update_container(container).await {
                Ok(Some(outcome)) => {
                    if let Some(metrics) = &self.metrics {
                        metrics.record_update(&name);
                    }
                    outcomes.push(outcome);
                }
                Ok(None) => {}
                Err(e) => {
                    log_failure(&name, &image, &e);
                    failures.push(UpdateFailure {
                        container: name,
                        image,
                        error: e.to_string(),
                        partial_replacement: e.is_partial_replacement(),
                        replacement_stage: e.replacement_stage(),
                    });
                }
            }
        }

        let summary = PassSummary {
            host: self.options.host.clone(),
            monitored,
            outcomes,
            failures,
            started_at,
            finished_at: Utc::now(),
        };

        info!(
            monitored = summary.monitored,
            updated = summary.updated(),
            failed = summary.failures.len(),
            "Update pass finished"
        );

        if let Some(metrics) = &self.metrics {
            metrics.record_pass(summary.updated());
        }
        self.notify(&summary).await;

        Ok(summary)
    }

    /// Hand the summary to every reporter; a failing reporter affects no other
    async fn notify(&self, summary: &PassSummary) {
        for reporter in &self.reporters {
            let _ = reporter.report(summary).await.inspect_err(|e| {
                error!(reporter = reporter.name(), "Failed to report update pass: {}", e);
            });
        }
    }

    /// Returns `Ok(None)` when the container already runs the newest image
    async fn update_container(
        &self,
        container: RunningContainerInfo,
    ) -> Result<Option<UpdateOutcome>, UpdateError> {
        let RunningContainerInfo { snapshot, handle } = container;
        info!(container = %snapshot.name, image = %snapshot.image, "Checking container");

        let current = self
            .images
            .inspect(&snapshot.image)
            .await
            .map_err(UpdateError::Inspect)?;

        let reference = ImageReference::parse(&snapshot.image);
        let tag = self
            .tags
            .fetch_updated_tag(&current, &reference.tag, self.options.policy)
            .await
            .unwrap_or_else(|| reference.tag.clone());

        let latest = self
            .images
            .pull(&reference.repository, &tag, self.options.credentials.as_ref())
            .await
            .map_err(UpdateError::Pull)?;

        if !should_update(&current.id, &latest.id) {
            debug!(container = %snapshot.name, image = %snapshot.image, "Already running the newest image");
            return Ok(None);
        }

        let new_image = latest
            .preferred_tag()
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}:{}", reference.repository, tag));
        let config = derive_relaunch_config(&snapshot, &new_image);

        info!(
            container = %snapshot.name,
            old = %current.id,
            new = %latest.id,
            "Replacing container with {}", new_image
        );

        self.containers
            .stop(&handle)
            .await
            .map_err(UpdateError::Stop)?;
        self.containers
            .remove(handle)
            .await
            .map_err(UpdateError::Remove)?;

        let replacement = self.containers.create(&config).await.map_err(|source| {
            UpdateError::PartialReplacement {
                stage: ContainerOperation::Create,
                source,
            }
        })?;
        self.containers
            .start(&replacement)
            .await
            .map_err(|source| UpdateError::PartialReplacement {
                stage: ContainerOperation::Start,
                source,
            })?;

        info!(container = %snapshot.name, image = %new_image, "Container updated");

        if self.options.cleanup {
            self.remove_superseded(&current, &latest).await;
        }

        Ok(Some(UpdateOutcome {
            old_image: current,
            new_image: latest,
            container: snapshot,
            updated_at: Utc::now(),
        }))
    }

    /// Remove the image a replaced container used to run.
    ///
    /// Tags that moved to the new image are left alone; an image with no
    /// remaining tags is dangling and skipped.
    async fn remove_superseded(&self, old: &ImageDescriptor, new: &ImageDescriptor) {
        let stale = ImageDescriptor {
            repo_tags: old
                .repo_tags
                .iter()
                .filter(|tag| !new.repo_tags.contains(tag))
                .cloned()
                .collect(),
            ..old.clone()
        };

        if stale.repo_tags.is_empty() {
            debug!(image = %old.id, "Superseded image has no tags of its own, leaving it");
            return;
        }

        match self.images.remove(&stale).await {
            Ok(()) => info!("Removed superseded image {:?}", stale.repo_tags),
            Err(e) => warn!("Failed to remove superseded image: {}", e),
        }
    }
}

fn log_failure(container: &str, image: &str, err: &UpdateError) {
    match err {
        UpdateError::Inspect(_) | UpdateError::Pull(_) => {
            warn!(container = %container, image = %image, "Skipping container: {}", err);
        }
        UpdateError::Stop(_) | UpdateError::Remove(_) => {
            error!(container = %container, image = %image, "Failed to replace container: {}", err);
        }
        UpdateError::PartialReplacement { stage, .. } => {
            error!(
                container = %container,
                image = %image,
                stage = %stage,
                partial_replacement = true,
                "Container {} is no longer running: {}", container, err
            );
        }
    }
}
