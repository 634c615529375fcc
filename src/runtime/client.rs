//! Container runtime trait consumed by the image and container stores

#[cfg(test)]
use mockall::automock;

use crate::runtime::error::RuntimeError;
use crate::runtime::types::{
    ContainerSnapshot, Credentials, ImageDescriptor, ListedContainer, PullStatus, RelaunchConfig,
};

/// Operations the agent needs from a container runtime
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Lists containers in the running state
    async fn list_running(&self) -> Result<Vec<ListedContainer>, RuntimeError>;

    /// Inspects a container by id
    async fn inspect_container(&self, id: &str) -> Result<ContainerSnapshot, RuntimeError>;

    /// Inspects an image by reference (tag, digest reference or id)
    async fn inspect_image(&self, reference: &str) -> Result<ImageDescriptor, RuntimeError>;

    /// Pulls `repository:tag`, resolving only once the pull has completed
    async fn pull_image(
        &self,
        repository: &str,
        tag: &str,
        credentials: Option<Credentials>,
    ) -> Result<PullStatus, RuntimeError>;

    /// Deletes an image by reference
    async fn remove_image(&self, reference: &str) -> Result<(), RuntimeError>;

    /// Creates a container and returns its id
    async fn create_container(&self, config: &RelaunchConfig) -> Result<String, RuntimeError>;

    async fn start_container(&self, id: &str) -> Result<(), RuntimeError>;

    async fn stop_container(&self, id: &str) -> Result<(), RuntimeError>;

    async fn remove_container(&self, id: &str) -> Result<(), RuntimeError>;
}
