//! Container auto-update agent
//!
//! Polls a container runtime, pulls newer images for running containers and
//! replaces outdated containers with the same runtime configuration.

pub mod agent;
pub mod config;
pub mod logging;
pub mod report;
pub mod runtime;
pub mod update;
pub mod version;
