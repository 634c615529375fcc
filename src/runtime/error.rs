use std::fmt;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Docker API error: {0}")]
    Docker(bollard::errors::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Connection error: {0}")]
    Connection(String),
}

impl From<bollard::errors::Error> for RuntimeError {
    fn from(err: bollard::errors::Error) -> Self {
        match err {
            bollard::errors::Error::DockerResponseServerError {
                status_code: 404,
                message,
            } => RuntimeError::NotFound(message),
            other => RuntimeError::Docker(other),
        }
    }
}

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Image {reference} not found")]
    NotFound { reference: String },

    #[error("Failed to inspect image {reference}: {source}")]
    Inspect {
        reference: String,
        source: RuntimeError,
    },

    #[error("Failed to pull image {reference}: {source}")]
    Pull {
        reference: String,
        source: RuntimeError,
    },

    #[error("Image {id} has no tag to remove it by")]
    NoTag { id: String },

    #[error("Failed to remove image {reference}: {source}")]
    Remove {
        reference: String,
        source: RuntimeError,
    },
}

/// Container lifecycle operation, used for error context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerOperation {
    List,
    Create,
    Start,
    Stop,
    Remove,
}

impl fmt::Display for ContainerOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContainerOperation::List => "list",
            ContainerOperation::Create => "create",
            ContainerOperation::Start => "start",
            ContainerOperation::Stop => "stop",
            ContainerOperation::Remove => "remove",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
#[error("Failed to {operation} container {target}: {source}")]
pub struct ContainerError {
    pub operation: ContainerOperation,
    /// Container name or id the operation targeted
    pub target: String,
    #[source]
    pub source: RuntimeError,
}

impl ContainerError {
    pub fn new(operation: ContainerOperation, target: &str, source: RuntimeError) -> Self {
        Self {
            operation,
            target: target.to_string(),
            source,
        }
    }
}
