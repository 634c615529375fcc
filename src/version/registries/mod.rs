//! Registry implementations for listing image tags

pub mod docker;

pub use docker::{DEFAULT_REGISTRY_BASE, DockerRegistry};
