//! Container runtime layer
//!
//! Everything the agent does to containers and images goes through the
//! [`client::ContainerRuntime`] trait. [`docker::DockerRuntime`] implements it
//! against the Docker Engine API; tests substitute a mock.
//!
//! # Modules
//!
//! - [`client`]: `ContainerRuntime` trait
//! - [`containers`]: Listing and lifecycle of running containers
//! - [`docker`]: Docker Engine implementation (bollard)
//! - [`error`]: Runtime, image and container error types
//! - [`images`]: Inspect, pull and delete images
//! - [`reference`]: Image reference parsing
//! - [`types`]: Records exchanged with the runtime

pub mod client;
pub mod containers;
pub mod docker;
pub mod error;
pub mod images;
pub mod reference;
pub mod types;
