//! Registry trait for listing the tags of an image repository

#[cfg(test)]
use mockall::automock;

use crate::runtime::types::Credentials;
use crate::version::error::RegistryError;

/// Trait for fetching the tags published for a repository
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait TagLister: Send + Sync {
    /// Lists every tag of a repository
    ///
    /// # Arguments
    /// * `registry_base` - Base URL of the registry (e.g., "https://registry-1.docker.io")
    /// * `repository` - Repository path inside that registry (e.g., "library/nginx")
    /// * `credentials` - Optional private-registry credentials
    ///
    /// # Returns
    /// * `Ok(Vec<String>)` - All tags, in the order the registry returns them
    /// * `Err(RegistryError)` - If the request or authentication fails
    async fn list_tags(
        &self,
        registry_base: &str,
        repository: &str,
        credentials: Option<Credentials>,
    ) -> Result<Vec<String>, RegistryError>;
}
