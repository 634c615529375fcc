//! Version decision layer
//!
//! Decides whether a container's image is outdated and which tag it should
//! move to.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  TagLister  │────▶│ TagResolver │────▶│   semver    │
//! │ (registry)  │     │  (policy)   │     │(tag choice) │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!                                                │
//!                                                ▼
//!                                         ┌─────────────┐
//!                                         │ comparator  │
//!                                         │  (digest)   │
//!                                         └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`comparator`]: Digest comparison deciding whether to replace a container
//! - [`error`]: Error types for registry operations
//! - [`policy`]: Version-selection policy
//! - [`registry`]: `TagLister` trait for listing repository tags
//! - [`registries`]: Concrete registry implementations (Docker Registry v2)
//! - [`resolver`]: Update tag resolution under a policy
//! - [`semver`]: Semantic-version tag selection

pub mod comparator;
pub mod error;
pub mod policy;
pub mod registries;
pub mod registry;
pub mod resolver;
pub mod semver;
