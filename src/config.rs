use std::path::{Path, PathBuf};

use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

use crate::runtime::types::Credentials;
use crate::update::filter::MonitoringFilters;
use crate::version::policy::VersionPolicy;

// =============================================================================
// Defaults
// =============================================================================

/// Default runtime endpoint
pub const DEFAULT_DOCKER_HOST: &str = "unix:///var/run/docker.sock";

/// Default seconds between update passes (5 minutes)
pub const DEFAULT_INTERVAL_SECS: u64 = 300;

/// Default log level when neither `RUST_LOG` nor the config sets one
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Config file name inside the config directory
pub const CONFIG_FILE_NAME: &str = "config.json";

/// tcp, http and https endpoints with a hostname, `localhost` or an IPv4 address
const REMOTE_HOST_PATTERN: &str = r"(?i)^(?:tcp|https?)://(?:(?:[A-Z0-9](?:[A-Z0-9-]{0,61}[A-Z0-9])?\.)+(?:[A-Z]{2,6}\.?|[A-Z0-9-]{2,}\.?)|localhost|\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3})(?::\d+)?(?:/?|[/?]\S+)$";

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },

    #[error("allowMajor and patchOnly cannot both be enabled")]
    ConflictingPolicy,

    #[error("Invalid docker host '{0}': expected unix://, tcp://, http:// or https://")]
    InvalidHost(String),

    #[error("Interval must be greater than zero")]
    InvalidInterval,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Agent configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct AgentConfig {
    /// Run a single pass and exit
    pub run_once: bool,
    /// Remove superseded images after a successful update
    pub cleanup: bool,
    pub docker_host: String,
    /// Seconds between passes
    pub interval: u64,
    /// Container names to monitor; empty means all
    pub monitor: Vec<String>,
    /// Container names to ignore
    pub ignore: Vec<String>,
    pub repo_user: Option<String>,
    pub repo_pass: Option<String>,
    pub semver: bool,
    pub allow_major: bool,
    pub patch_only: bool,
    /// Registry used for repositories without a registry host
    pub registry_base: String,
    /// Image name fragment identifying the agent's own container
    pub self_image: String,
    pub webhook_urls: Vec<String>,
    pub pushover_app_token: Option<String>,
    pub pushover_user_key: Option<String>,
    pub pushover_device: Option<String>,
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    /// Prometheus text file rewritten after every pass
    pub metrics_file: Option<PathBuf>,
    pub log_level: String,
    pub log_format: LogFormat,
    pub log_file: Option<PathBuf>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            run_once: false,
            cleanup: false,
            docker_host: DEFAULT_DOCKER_HOST.to_string(),
            interval: DEFAULT_INTERVAL_SECS,
            monitor: Vec::new(),
            ignore: Vec::new(),
            repo_user: None,
            repo_pass: None,
            semver: false,
            allow_major: false,
            patch_only: false,
            registry_base: crate::version::registries::DEFAULT_REGISTRY_BASE.to_string(),
            self_image: crate::runtime::containers::DEFAULT_SELF_IMAGE.to_string(),
            webhook_urls: Vec::new(),
            pushover_app_token: None,
            pushover_user_key: None,
            pushover_device: None,
            telegram_bot_token: None,
            telegram_chat_id: None,
            metrics_file: None,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_format: LogFormat::Text,
            log_file: None,
        }
    }
}

impl AgentConfig {
    /// Load from `path`, or from the default config file when it exists.
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigLoadError> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default_path = default_config_path();
                if default_path.is_file() {
                    Self::from_file(&default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigLoadError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigLoadError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigLoadError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        self.version_policy()?;
        if !is_valid_host(&self.docker_host) {
            return Err(ConfigLoadError::InvalidHost(self.docker_host.clone()));
        }
        if self.interval == 0 {
            return Err(ConfigLoadError::InvalidInterval);
        }
        Ok(())
    }

    pub fn version_policy(&self) -> Result<VersionPolicy, ConfigLoadError> {
        VersionPolicy::from_flags(self.semver, self.allow_major, self.patch_only)
            .ok_or(ConfigLoadError::ConflictingPolicy)
    }

    pub fn credentials(&self) -> Option<Credentials> {
        Credentials::from_parts(self.repo_user.as_deref(), self.repo_pass.as_deref())
    }

    pub fn filters(&self) -> MonitoringFilters {
        MonitoringFilters::new(
            self.monitor.iter().filter(|n| !n.is_empty()).cloned(),
            self.ignore.iter().filter(|n| !n.is_empty()).cloned(),
        )
    }
}

/// `unix://` sockets, or remote endpoints matching the tcp/http(s) pattern
pub fn is_valid_host(host: &str) -> bool {
    if let Some(path) = host.strip_prefix("unix://") {
        return !path.is_empty();
    }
    Regex::new(REMOTE_HOST_PATTERN).unwrap().is_match(host)
}

/// Returns the config directory for argus.
/// Uses $XDG_CONFIG_HOME/argus if XDG_CONFIG_HOME is set,
/// otherwise falls back to ~/.config/argus,
/// or ./argus if neither is available.
pub fn config_dir() -> PathBuf {
    config_dir_with_env(std::env::var("XDG_CONFIG_HOME").ok(), dirs::home_dir())
}

/// Returns the path to the default config file.
pub fn default_config_path() -> PathBuf {
    config_dir().join(CONFIG_FILE_NAME)
}

fn config_dir_with_env(xdg_config_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let config_dir = xdg_config_home
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".config")))
        .unwrap_or_else(|| PathBuf::from("."));

    config_dir.join("argus")
}
