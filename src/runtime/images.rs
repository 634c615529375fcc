//! Image store: inspect, pull and delete images through the runtime

use std::sync::Arc;

use tracing::{debug, info};

use crate::runtime::client::ContainerRuntime;
use crate::runtime::error::{ImageError, RuntimeError};
use crate::runtime::types::{Credentials, ImageDescriptor, PullStatus};

pub struct ImageStore {
    runtime: Arc<dyn ContainerRuntime>,
}

impl ImageStore {
    pub fn new(runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self { runtime }
    }

    /// Inspect an image by reference
    pub async fn inspect(&self, reference: &str) -> Result<ImageDescriptor, ImageError> {
        self.runtime
            .inspect_image(reference)
            .await
            .map_err(|e| match e {
                RuntimeError::NotFound(_) => ImageError::NotFound {
                    reference: reference.to_string(),
                },
                source => ImageError::Inspect {
                    reference: reference.to_string(),
                    source,
                },
            })
    }

    /// Pull `repository:tag` and return the pulled image.
    ///
    /// Waits for the pull to finish before re-inspecting the reference, so the
    /// returned digest is that of the complete image.
    pub async fn pull(
        &self,
        repository: &str,
        tag: &str,
        credentials: Option<&Credentials>,
    ) -> Result<ImageDescriptor, ImageError> {
        let reference = format!("{}:{}", repository, tag);

        let status = self
            .runtime
            .pull_image(repository, tag, credentials.cloned())
            .await
            .map_err(|source| ImageError::Pull {
                reference: reference.clone(),
                source,
            })?;

        match status {
            PullStatus::UpToDate => debug!("Image {} is already up to date locally", reference),
            PullStatus::Downloaded => info!("Pulled image {}", reference),
        }

        self.runtime
            .inspect_image(&reference)
            .await
            .map_err(|source| ImageError::Pull { reference, source })
    }

    /// Delete an image by its last known tag alias
    pub async fn remove(&self, image: &ImageDescriptor) -> Result<(), ImageError> {
        let reference = image.last_tag().ok_or_else(|| ImageError::NoTag {
            id: image.id.clone(),
        })?;

        self.runtime
            .remove_image(reference)
            .await
            .map_err(|source| ImageError::Remove {
                reference: reference.to_string(),
                source,
            })
    }
}
