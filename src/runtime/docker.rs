//! Docker Engine runtime on top of bollard

use std::collections::HashMap;

use bollard::auth::DockerCredentials;
use bollard::container::{
    Config, CreateContainerOptions, InspectContainerOptions, ListContainersOptions,
    RemoveContainerOptions, StartContainerOptions, StopContainerOptions,
};
use bollard::image::{CreateImageOptions, RemoveImageOptions};
use bollard::models::{ContainerInspectResponse, ImageInspect};
use bollard::{API_DEFAULT_VERSION, Docker};
use futures::StreamExt;
use tracing::{debug, info};

use crate::runtime::client::ContainerRuntime;
use crate::runtime::error::RuntimeError;
use crate::runtime::types::{
    ContainerSnapshot, Credentials, ImageDescriptor, ListedContainer, PullStatus, RelaunchConfig,
};

/// Seconds bollard waits on a single API request
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Status line the engine emits when a pull found nothing new
const UP_TO_DATE_STATUS: &str = "Image is up to date";

/// Container runtime backed by a Docker Engine API endpoint
pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    pub fn new(docker: Docker) -> Self {
        Self { docker }
    }

    /// Connect to `unix://`, `tcp://` or `http(s)://` hosts
    pub fn connect(host: &str) -> Result<Self, RuntimeError> {
        let connection = if let Some(path) = host.strip_prefix("unix://") {
            Docker::connect_with_socket(path, REQUEST_TIMEOUT_SECS, API_DEFAULT_VERSION)
        } else if let Some(address) = host.strip_prefix("tcp://") {
            Docker::connect_with_http(
                &format!("http://{}", address),
                REQUEST_TIMEOUT_SECS,
                API_DEFAULT_VERSION,
            )
        } else if host.starts_with("http://") || host.starts_with("https://") {
            Docker::connect_with_http(host, REQUEST_TIMEOUT_SECS, API_DEFAULT_VERSION)
        } else {
            Docker::connect_with_local_defaults()
        };
        let docker = connection.map_err(|e| RuntimeError::Connection(format!("Failed to connect to {}: {}", host, e)))?;

        info!("Connected to container runtime at {}", host);
        Ok(Self::new(docker))
    }
}

/// Convert an inspect response into a snapshot, rejecting incomplete responses
pub fn snapshot_from_inspect(
    response: ContainerInspectResponse,
) -> Result<ContainerSnapshot, RuntimeError> {
    let id = response
        .id
        .ok_or_else(|| RuntimeError::InvalidResponse("container without id".into()))?;
    let name = response
        .name
        .map(|name| name.trim_start_matches('/').to_string())
        .ok_or_else(|| RuntimeError::InvalidResponse(format!("container {} without name", id)))?;
    let config = response.config.ok_or_else(|| {
        RuntimeError::InvalidResponse(format!("container {} without config", name))
    })?;
    let image = config.image.ok_or_else(|| {
        RuntimeError::InvalidResponse(format!("container {} without image", name))
    })?;

    Ok(ContainerSnapshot {
        id,
        name,
        image,
        image_id: response.image.unwrap_or_default(),
        command: config.cmd,
        env: config.env,
        entrypoint: config.entrypoint,
        labels: config.labels,
        host_config: response.host_config,
        working_dir: config.working_dir,
        user: config.user,
    })
}

/// Convert an image inspect response into a descriptor
pub fn image_from_inspect(response: ImageInspect) -> Result<ImageDescriptor, RuntimeError> {
    let id = response
        .id
        .ok_or_else(|| RuntimeError::InvalidResponse("image without id".into()))?;

    Ok(ImageDescriptor {
        id,
        repo_tags: response.repo_tags.unwrap_or_default(),
        repo_digests: response.repo_digests.unwrap_or_default(),
    })
}

/// Build the engine's create-container body from a relaunch configuration
pub fn create_config(config: &RelaunchConfig) -> Config<String> {
    Config {
        image: Some(config.image.clone()),
        cmd: config.command.clone(),
        env: config.env.clone(),
        entrypoint: config.entrypoint.clone(),
        labels: config.labels.clone(),
        host_config: config.host_config.clone(),
        working_dir: config.working_dir.clone(),
        user: config.user.clone(),
        ..Default::default()
    }
}

#[async_trait::async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn list_running(&self) -> Result<Vec<ListedContainer>, RuntimeError> {
        let options = ListContainersOptions::<String> {
            all: false,
            filters: HashMap::from([("status".to_string(), vec!["running".to_string()])]),
            ..Default::default()
        };

        let containers = self.docker.list_containers(Some(options)).await?;

        Ok(containers
            .into_iter()
            .filter_map(|summary| {
                Some(ListedContainer {
                    id: summary.id?,
                    image: summary.image.unwrap_or_default(),
                })
            })
            .collect())
    }

    async fn inspect_container(&self, id: &str) -> Result<ContainerSnapshot, RuntimeError> {
        let response = self
            .docker
            .inspect_container(id, None::<InspectContainerOptions>)
            .await?;
        snapshot_from_inspect(response)
    }

    async fn inspect_image(&self, reference: &str) -> Result<ImageDescriptor, RuntimeError> {
        let response = self.docker.inspect_image(reference).await?;
        image_from_inspect(response)
    }

    async fn pull_image(
        &self,
        repository: &str,
        tag: &str,
        credentials: Option<Credentials>,
    ) -> Result<PullStatus, RuntimeError> {
        let options = CreateImageOptions {
            from_image: repository.to_string(),
            tag: tag.to_string(),
            ..Default::default()
        };
        let credentials = credentials.map(|c| DockerCredentials {
            username: Some(c.username),
            password: Some(c.password),
            ..Default::default()
        });

        let mut stream = self.docker.create_image(Some(options), None, credentials);
        let mut status = PullStatus::Downloaded;

        // The pull is only complete once the progress stream ends
        while let Some(item) = stream.next().await {
            let info = item?;
            if let Some(error) = info.error {
                return Err(RuntimeError::InvalidResponse(error));
            }
            if let Some(line) = info.status {
                debug!(image = %repository, tag = %tag, "Pull progress: {}", line);
                if line.contains(UP_TO_DATE_STATUS) {
                    status = PullStatus::UpToDate;
                }
            }
        }

        Ok(status)
    }

    async fn remove_image(&self, reference: &str) -> Result<(), RuntimeError> {
        self.docker
            .remove_image(reference, None::<RemoveImageOptions>, None)
            .await?;
        Ok(())
    }

    async fn create_container(&self, config: &RelaunchConfig) -> Result<String, RuntimeError> {
        let options = CreateContainerOptions {
            name: config.name.clone(),
            platform: None,
        };
        let response = self
            .docker
            .create_container(Some(options), create_config(config))
            .await?;

        for warning in &response.warnings {
            debug!(container = %config.name, "Create warning: {}", warning);
        }
        Ok(response.id)
    }

    async fn start_container(&self, id: &str) -> Result<(), RuntimeError> {
        self.docker
            .start_container(id, None::<StartContainerOptions<String>>)
            .await?;
        Ok(())
    }

    async fn stop_container(&self, id: &str) -> Result<(), RuntimeError> {
        self.docker
            .stop_container(id, None::<StopContainerOptions>)
            .await?;
        Ok(())
    }

    async fn remove_container(&self, id: &str) -> Result<(), RuntimeError> {
        self.docker
            .remove_container(id, None::<RemoveContainerOptions>)
            .await?;
        Ok(())
    }
}
