//! Typed records exchanged with the container runtime

use std::collections::HashMap;

use bollard::models::HostConfig;

/// Private-registry credentials used for pulls and tag listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Credentials are only usable when both parts are configured
    pub fn from_parts(username: Option<&str>, password: Option<&str>) -> Option<Self> {
        match (username, password) {
            (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
                Some(Self {
                    username: username.to_string(),
                    password: password.to_string(),
                })
            }
            _ => None,
        }
    }
}

/// A pulled or inspected image
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImageDescriptor {
    /// Content digest (`sha256:...`)
    pub id: String,
    /// `repository:tag` aliases pointing at this image
    pub repo_tags: Vec<String>,
    /// `repository@sha256:...` references pointing at this image
    pub repo_digests: Vec<String>,
}

impl ImageDescriptor {
    /// Two images are the same version iff their content digests are equal
    pub fn same_version(&self, other: &ImageDescriptor) -> bool {
        self.id == other.id
    }

    /// Alias used as the image of a relaunched container
    pub fn preferred_tag(&self) -> Option<&str> {
        self.repo_tags.first().map(String::as_str)
    }

    /// Alias used when deleting the image
    pub fn last_tag(&self) -> Option<&str> {
        self.repo_tags.last().map(String::as_str)
    }

    /// Digest-qualified reference (`repository@sha256:...`), if the image came from a registry
    pub fn digest_reference(&self) -> Option<&str> {
        self.repo_digests.first().map(String::as_str)
    }
}

/// Point-in-time inspection of a container
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ContainerSnapshot {
    pub id: String,
    /// Runtime name with the leading `/` stripped
    pub name: String,
    /// Image reference the container was configured with (e.g. "nginx:1.25")
    pub image: String,
    /// Digest of the image the container is running
    pub image_id: String,
    pub command: Option<Vec<String>>,
    pub env: Option<Vec<String>>,
    pub entrypoint: Option<Vec<String>>,
    pub labels: Option<HashMap<String, String>>,
    pub host_config: Option<HostConfig>,
    pub working_dir: Option<String>,
    pub user: Option<String>,
}

/// Live handle to one container instance.
///
/// Not `Clone`: removing a container consumes its handle.
#[derive(Debug, PartialEq, Eq)]
pub struct ContainerHandle {
    id: String,
}

impl ContainerHandle {
    pub(crate) fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// A running container: its snapshot plus the handle that controls it
#[derive(Debug)]
pub struct RunningContainerInfo {
    pub snapshot: ContainerSnapshot,
    pub handle: ContainerHandle,
}

impl RunningContainerInfo {
    pub fn name(&self) -> &str {
        &self.snapshot.name
    }
}

/// Creation parameters for a replacement container
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RelaunchConfig {
    pub name: String,
    pub image: String,
    pub command: Option<Vec<String>>,
    pub env: Option<Vec<String>>,
    pub entrypoint: Option<Vec<String>>,
    pub labels: Option<HashMap<String, String>>,
    pub host_config: Option<HostConfig>,
    pub working_dir: Option<String>,
    pub user: Option<String>,
}

/// Container entry returned by the runtime's listing call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedContainer {
    pub id: String,
    pub image: String,
}

/// Result of a completed pull
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullStatus {
    /// New layers were downloaded
    Downloaded,
    /// The runtime already had the newest image for this tag
    UpToDate,
}
