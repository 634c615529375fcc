//! Update passes
//!
//! - [`filter`]: Narrows running containers to the monitoring set
//! - [`orchestrator`]: Runs a pass and replaces outdated containers

pub mod filter;
pub mod orchestrator;
