//! Docker Registry HTTP API v2 tag listing

use regex::Regex;
use reqwest::{StatusCode, Url};
use reqwest::header::{HeaderMap, LINK, RETRY_AFTER, WWW_AUTHENTICATE};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::runtime::types::Credentials;
use crate::version::error::RegistryError;
use crate::version::registry::TagLister;

/// Default registry queried for images without a registry host
pub const DEFAULT_REGISTRY_BASE: &str = "https://registry-1.docker.io";

/// Upper bound on followed `Link: rel="next"` pages
const MAX_PAGES: usize = 50;

/// Response from `GET /v2/<name>/tags/list`
#[derive(Debug, Deserialize)]
struct TagList {
    #[serde(default)]
    tags: Option<Vec<String>>,
}

/// Response from a bearer token service
#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: Option<String>,
    access_token: Option<String>,
}

/// Authentication scheme requested by the registry
#[derive(Debug, Clone, PartialEq, Eq)]
enum Challenge {
    Bearer {
        realm: String,
        service: Option<String>,
        scope: Option<String>,
    },
    Basic,
}

/// Tag lister for registries speaking the Docker Registry HTTP API v2
pub struct DockerRegistry {
    client: reqwest::Client,
    /// Regex for one `key="value"` pair of a `WWW-Authenticate` header
    challenge_param_re: Regex,
    /// Regex for the target of a `Link: <...>; rel="next"` header
    next_link_re: Regex,
}

impl DockerRegistry {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent("argus")
                .build()
                .expect("Failed to create HTTP client"),
            challenge_param_re: Regex::new(r#"(\w+)="([^"]*)""#).unwrap(),
            next_link_re: Regex::new(r#"<([^>]+)>\s*;\s*rel="?next"?"#).unwrap(),
        }
    }

    /// Docker Hub keeps official images under `library/`
    fn normalize_repository(registry_base: &str, repository: &str) -> String {
        let is_docker_hub = registry_base.contains("docker.io");
        if is_docker_hub && !repository.contains('/') {
            format!("library/{}", repository)
        } else {
            repository.to_string()
        }
    }

    fn parse_challenge(&self, headers: &HeaderMap) -> Option<Challenge> {
        let header = headers.get(WWW_AUTHENTICATE)?.to_str().ok()?;
        let (scheme, params) = header.split_once(' ').unwrap_or((header, ""));

        if scheme.eq_ignore_ascii_case("basic") {
            return Some(Challenge::Basic);
        }
        if !scheme.eq_ignore_ascii_case("bearer") {
            return None;
        }

        let mut realm = None;
        let mut service = None;
        let mut scope = None;
        for captures in self.challenge_param_re.captures_iter(params) {
            let value = captures[2].to_string();
            match &captures[1] {
                "realm" => realm = Some(value),
                "service" => service = Some(value),
                "scope" => scope = Some(value),
                _ => {}
            }
        }

        Some(Challenge::Bearer {
            realm: realm?,
            service,
            scope,
        })
    }

    fn next_page(&self, registry_base: &str, headers: &HeaderMap) -> Option<String> {
        let link = headers.get(LINK)?.to_str().ok()?;
        let target = self.next_link_re.captures(link)?.get(1)?.as_str();

        if target.starts_with("http://") || target.starts_with("https://") {
            Some(target.to_string())
        } else {
            Some(format!("{}{}", registry_base.trim_end_matches('/'), target))
        }
    }

    async fn fetch_token(
        &self,
        realm: &str,
        service: Option<&str>,
        scope: Option<&str>,
        credentials: Option<&Credentials>,
    ) -> Result<String, RegistryError> {
        let params: Vec<(&str, &str)> = [("service", service), ("scope", scope)]
            .into_iter()
            .filter_map(|(key, value)| value.map(|value| (key, value)))
            .collect();
        let url = Url::parse_with_params(realm, &params).map_err(|e| {
            RegistryError::InvalidResponse(format!("invalid token realm {}: {}", realm, e))
        })?;

        let mut request = self.client.get(url);
        if let Some(credentials) = credentials {
            request = request.basic_auth(&credentials.username, Some(&credentials.password));
        }

        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(RegistryError::Unauthorized(format!(
                "token service {} returned {}",
                realm, status
            )));
        }
        if !status.is_success() {
            return Err(RegistryError::InvalidResponse(format!(
                "Unexpected token service status: {}",
                status
            )));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            warn!("Failed to parse token service response: {}", e);
            RegistryError::InvalidResponse(e.to_string())
        })?;

        token
            .token
            .or(token.access_token)
            .ok_or_else(|| RegistryError::InvalidResponse("token response without token".into()))
    }

    /// Sends one tag-list request, answering an auth challenge at most once
    async fn get_page(
        &self,
        url: &str,
        repository: &str,
        credentials: Option<&Credentials>,
        bearer: &mut Option<String>,
    ) -> Result<reqwest::Response, RegistryError> {
        let send = |token: Option<&str>, basic: bool| {
            let mut request = self.client.get(url);
            match (token, credentials) {
                (Some(token), _) => request = request.bearer_auth(token),
                (None, Some(credentials)) if basic => {
                    request =
                        request.basic_auth(&credentials.username, Some(&credentials.password))
                }
                _ => {}
            }
            request.send()
        };

        let response = send(bearer.as_deref(), false).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let response = match self.parse_challenge(response.headers()) {
            Some(Challenge::Bearer {
                realm,
                service,
                scope,
            }) => {
                debug!("Requesting registry token from {}", realm);
                let token = self
                    .fetch_token(&realm, service.as_deref(), scope.as_deref(), credentials)
                    .await?;
                let response = send(Some(&token), false).await?;
                *bearer = Some(token);
                response
            }
            Some(Challenge::Basic) if credentials.is_some() => send(None, true).await?,
            _ => {
                return Err(RegistryError::Unauthorized(repository.to_string()));
            }
        };

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(RegistryError::Unauthorized(repository.to_string()));
        }
        Ok(response)
    }
}

impl Default for DockerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl TagLister for DockerRegistry {
    async fn list_tags(
        &self,
        registry_base: &str,
        repository: &str,
        credentials: Option<Credentials>,
    ) -> Result<Vec<String>, RegistryError> {
        let repository = Self::normalize_repository(registry_base, repository);
        let mut url = Some(format!(
            "{}/v2/{}/tags/list",
            registry_base.trim_end_matches('/'),
            repository
        ));
        let mut bearer = None;
        let mut tags = Vec::new();
        let mut pages = 0;

        while let Some(page_url) = url.take() {
            let response = self
                .get_page(&page_url, &repository, credentials.as_ref(), &mut bearer)
                .await?;
            let status = response.status();

            if status == StatusCode::NOT_FOUND {
                return Err(RegistryError::NotFound(repository));
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                let retry_after = response
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse().ok());
                return Err(RegistryError::RateLimited {
                    retry_after_secs: retry_after,
                });
            }

            if !status.is_success() {
                warn!("Registry returned status {}: {}", status, page_url);
                return Err(RegistryError::InvalidResponse(format!(
                    "Unexpected status: {}",
                    status
                )));
            }

            pages += 1;
            if pages < MAX_PAGES {
                url = self.next_page(registry_base, response.headers());
            }

            let page: TagList = response.json().await.map_err(|e| {
                warn!("Failed to parse tag list response: {}", e);
                RegistryError::InvalidResponse(e.to_string())
            })?;
            tags.extend(page.tags.unwrap_or_default());
        }

        debug!("Fetched {} tags for {}", tags.len(), repository);
        Ok(tags)
    }
}
