//! Update target resolution
//!
//! Decides which tag of an image's repository should be pulled, asking the
//! registry for its tags only when a semantic-version policy is active.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::runtime::reference::{split_registry, strip_digest};
use crate::runtime::types::{Credentials, ImageDescriptor};
use crate::version::policy::VersionPolicy;
use crate::version::registry::TagLister;
use crate::version::semver::{LATEST_TAG, select_tag};

/// Resolves the tag an image should be updated to
pub struct TagResolver {
    lister: Arc<dyn TagLister>,
    default_registry: String,
    credentials: Option<Credentials>,
}

impl TagResolver {
    pub fn new(
        lister: Arc<dyn TagLister>,
        default_registry: &str,
        credentials: Option<Credentials>,
    ) -> Self {
        Self {
            lister,
            default_registry: default_registry.trim_end_matches('/').to_string(),
            credentials,
        }
    }

    /// Base URL and in-registry path for a repository name
    fn registry_for<'a>(&self, repository: &'a str) -> (String, &'a str) {
        match split_registry(repository) {
            (Some(host), path) => {
                let scheme = if host.starts_with("localhost") || host.starts_with("127.0.0.1") {
                    "http"
                } else {
                    "https"
                };
                (format!("{}://{}", scheme, host), path)
            }
            (None, path) => (self.default_registry.clone(), path),
        }
    }

    /// Returns the tag to pull for `image`, currently running as `current_tag`.
    ///
    /// - `Latest` policy: always `latest`, without asking the registry
    /// - `None` if the image has no digest reference to derive a repository from
    /// - `latest` if the registry fails or knows no tags
    pub async fn fetch_updated_tag(
        &self,
        image: &ImageDescriptor,
        current_tag: &str,
        policy: VersionPolicy,
    ) -> Option<String> {
        if !policy.is_semantic() {
            return Some(LATEST_TAG.to_string());
        }

        let repository = strip_digest(image.digest_reference()?);
        if repository.is_empty() {
            return None;
        }

        let (registry_base, path) = self.registry_for(repository);
        let tags = match self
            .lister
            .list_tags(&registry_base, path, self.credentials.clone())
            .await
        {
            Ok(tags) => tags,
            Err(e) => {
                warn!(
                    repository = %repository,
                    "Registry client error, falling back to {}: {}", LATEST_TAG, e
                );
                return Some(LATEST_TAG.to_string());
            }
        };

        if tags.is_empty() {
            debug!(repository = %repository, "Registry returned no tags");
            return Some(LATEST_TAG.to_string());
        }

        let selected = select_tag(current_tag, &tags, policy);
        debug!(
            repository = %repository,
            current = %current_tag,
            selected = %selected,
            policy = %policy,
            "Resolved update tag"
        );
        Some(selected)
    }
}
