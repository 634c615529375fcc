//! Container store: list, create and control containers through the runtime

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::runtime::client::ContainerRuntime;
use crate::runtime::error::{ContainerError, ContainerOperation};
use crate::runtime::types::{ContainerHandle, ContainerSnapshot, RelaunchConfig, RunningContainerInfo};

/// Image name fragment identifying the agent's own container
pub const DEFAULT_SELF_IMAGE: &str = "argus";

pub struct ContainerStore {
    runtime: Arc<dyn ContainerRuntime>,
    self_image: String,
}

impl ContainerStore {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, self_image: &str) -> Self {
        Self {
            runtime,
            self_image: self_image.to_string(),
        }
    }

    fn is_self(&self, image: &str) -> bool {
        !self.self_image.is_empty() && image.contains(&self.self_image)
    }

    /// List running containers, excluding the agent's own container.
    ///
    /// A container that vanishes between listing and inspection is skipped.
    pub async fn list_running(&self) -> Result<Vec<RunningContainerInfo>, ContainerError> {
        let listed = self
            .runtime
            .list_running()
            .await
            .map_err(|e| ContainerError::new(ContainerOperation::List, "running", e))?;

        let mut running = Vec::with_capacity(listed.len());
        for container in listed {
            if self.is_self(&container.image) {
                debug!(image = %container.image, "Skipping the agent's own container");
                continue;
            }

            let snapshot = match self.runtime.inspect_container(&container.id).await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!(id = %container.id, "Failed to inspect listed container: {}", e);
                    continue;
                }
            };

            // The configured image may differ from the listed one for retagged images
            if self.is_self(&snapshot.image) {
                debug!(image = %snapshot.image, "Skipping the agent's own container");
                continue;
            }

            running.push(RunningContainerInfo {
                handle: ContainerHandle::new(snapshot.id.clone()),
                snapshot,
            });
        }

        Ok(running)
    }

    pub async fn create(&self, config: &RelaunchConfig) -> Result<ContainerHandle, ContainerError> {
        let id = self
            .runtime
            .create_container(config)
            .await
            .map_err(|e| ContainerError::new(ContainerOperation::Create, &config.name, e))?;

        info!(container = %config.name, id = %id, "Created container");
        Ok(ContainerHandle::new(id))
    }

    pub async fn start(&self, handle: &ContainerHandle) -> Result<(), ContainerError> {
        self.runtime
            .start_container(handle.id())
            .await
            .map_err(|e| ContainerError::new(ContainerOperation::Start, handle.id(), e))?;
        info!(id = %handle.id(), "Started container");
        Ok(())
    }

    pub async fn stop(&self, handle: &ContainerHandle) -> Result<(), ContainerError> {
        self.runtime
            .stop_container(handle.id())
            .await
            .map_err(|e| ContainerError::new(ContainerOperation::Stop, handle.id(), e))?;
        info!(id = %handle.id(), "Stopped container");
        Ok(())
    }

    /// Remove a container; the handle is consumed whether or not removal succeeds
    pub async fn remove(&self, handle: ContainerHandle) -> Result<(), ContainerError> {
        self.runtime
            .remove_container(handle.id())
            .await
            .map_err(|e| ContainerError::new(ContainerOperation::Remove, handle.id(), e))?;
        info!(id = %handle.id(), "Removed container");
        Ok(())
    }
}

/// Creation parameters for a replacement of `snapshot` running `new_image`.
///
/// Everything except the image is copied verbatim.
pub fn derive_relaunch_config(snapshot: &ContainerSnapshot, new_image: &str) -> RelaunchConfig {
    RelaunchConfig {
        name: snapshot.name.clone(),
        image: new_image.to_string(),
        command: snapshot.command.clone(),
        env: snapshot.env.clone(),
        entrypoint: snapshot.entrypoint.clone(),
        labels: snapshot.labels.clone(),
        host_config: snapshot.host_config.clone(),
        working_dir: snapshot.working_dir.clone(),
        user: snapshot.user.clone(),
    }
}
