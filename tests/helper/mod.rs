//! Test helpers for update pass tests

#![allow(dead_code)]

pub mod registry;
pub mod runtime;

use std::sync::Arc;

use argus::runtime::client::ContainerRuntime;
use argus::runtime::containers::{ContainerStore, DEFAULT_SELF_IMAGE};
use argus::runtime::images::ImageStore;
use argus::update::orchestrator::{UpdateOptions, Updater};
use argus::version::registries::DEFAULT_REGISTRY_BASE;
use argus::version::registry::TagLister;
use argus::version::resolver::TagResolver;

pub use registry::{FakeTagLister, RecordingReporter};
pub use runtime::{Call, FakeRuntime, image};

/// Updater over `runtime` with the default self image and registry
pub fn create_updater(
    runtime: Arc<FakeRuntime>,
    lister: FakeTagLister,
    options: UpdateOptions,
) -> Updater {
    let runtime: Arc<dyn ContainerRuntime> = runtime;
    let lister: Arc<dyn TagLister> = Arc::new(lister);
    Updater::new(
        ContainerStore::new(runtime.clone(), DEFAULT_SELF_IMAGE),
        ImageStore::new(runtime),
        TagResolver::new(lister, DEFAULT_REGISTRY_BASE, None),
        options,
    )
}
