//! In-memory container runtime for pass-level tests

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use argus::runtime::client::ContainerRuntime;
use argus::runtime::error::RuntimeError;
use argus::runtime::types::{
    ContainerSnapshot, Credentials, ImageDescriptor, ListedContainer, PullStatus, RelaunchConfig,
};

/// Runtime call recorded by [`FakeRuntime`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Pull(String),
    Stop(String),
    RemoveContainer(String),
    Create { name: String, image: String },
    Start(String),
    RemoveImage(String),
}

impl Call {
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Call::Pull(_))
    }
}

struct FakeContainer {
    snapshot: ContainerSnapshot,
    running: bool,
}

#[derive(Default)]
struct State {
    containers: Vec<FakeContainer>,
    /// Local images by reference
    images: HashMap<String, ImageDescriptor>,
    /// Images a pull of `repository:tag` downloads
    remote: HashMap<String, ImageDescriptor>,
    failing_pulls: HashSet<String>,
    calls: Vec<Call>,
    created: usize,
}

#[derive(Default)]
pub struct FakeRuntime {
    state: Mutex<State>,
}

pub fn image(id: &str, tags: &[&str], digests: &[&str]) -> ImageDescriptor {
    ImageDescriptor {
        id: id.to_string(),
        repo_tags: tags.iter().map(|t| t.to_string()).collect(),
        repo_digests: digests.iter().map(|d| d.to_string()).collect(),
    }
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// A running container whose configured image is `reference`, resolving locally to `image`
    pub fn with_container(self, id: &str, name: &str, reference: &str, image: ImageDescriptor) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.containers.push(FakeContainer {
                snapshot: ContainerSnapshot {
                    id: id.to_string(),
                    name: name.to_string(),
                    image: reference.to_string(),
                    image_id: image.id.clone(),
                    env: Some(vec![format!("NAME={}", name)]),
                    ..Default::default()
                },
                running: true,
            });
            state.images.insert(reference.to_string(), image);
        }
        self
    }

    /// Make a pull of `reference` (`repository:tag`) yield `image`
    pub fn with_remote(self, reference: &str, image: ImageDescriptor) -> Self {
        self.state
            .lock()
            .unwrap()
            .remote
            .insert(reference.to_string(), image);
        self
    }

    pub fn with_failing_pull(self, reference: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing_pulls
            .insert(reference.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Names and images of running containers, in creation order
    pub fn running(&self) -> Vec<(String, String)> {
        self.state
            .lock()
            .unwrap()
            .containers
            .iter()
            .filter(|c| c.running)
            .map(|c| (c.snapshot.name.clone(), c.snapshot.image.clone()))
            .collect()
    }

    fn record(&self, call: Call) {
        self.state.lock().unwrap().calls.push(call);
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn list_running(&self) -> Result<Vec<ListedContainer>, RuntimeError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .containers
            .iter()
            .filter(|c| c.running)
            .map(|c| ListedContainer {
                id: c.snapshot.id.clone(),
                image: c.snapshot.image.clone(),
            })
            .collect())
    }

    async fn inspect_container(&self, id: &str) -> Result<ContainerSnapshot, RuntimeError> {
        let state = self.state.lock().unwrap();
        state
            .containers
            .iter()
            .find(|c| c.snapshot.id == id)
            .map(|c| c.snapshot.clone())
            .ok_or_else(|| RuntimeError::NotFound(id.to_string()))
    }

    async fn inspect_image(&self, reference: &str) -> Result<ImageDescriptor, RuntimeError> {
        let state = self.state.lock().unwrap();
        state
            .images
            .get(reference)
            .cloned()
            .ok_or_else(|| RuntimeError::NotFound(reference.to_string()))
    }

    async fn pull_image(
        &self,
        repository: &str,
        tag: &str,
        _credentials: Option<Credentials>,
    ) -> Result<PullStatus, RuntimeError> {
        let reference = format!("{}:{}", repository, tag);
        self.record(Call::Pull(reference.clone()));

        let mut state = self.state.lock().unwrap();
        if state.failing_pulls.contains(&reference) {
            return Err(RuntimeError::Connection(format!("pull of {} failed", reference)));
        }
        match state.remote.get(&reference).cloned() {
            Some(image) => {
                state.images.insert(reference, image);
                Ok(PullStatus::Downloaded)
            }
            None if state.images.contains_key(&reference) => Ok(PullStatus::UpToDate),
            None => Err(RuntimeError::NotFound(reference)),
        }
    }

    async fn remove_image(&self, reference: &str) -> Result<(), RuntimeError> {
        self.record(Call::RemoveImage(reference.to_string()));
        self.state.lock().unwrap().images.remove(reference);
        Ok(())
    }

    async fn create_container(&self, config: &RelaunchConfig) -> Result<String, RuntimeError> {
        self.record(Call::Create {
            name: config.name.clone(),
            image: config.image.clone(),
        });

        let mut state = self.state.lock().unwrap();
        state.created += 1;
        let id = format!("new-{}", state.created);
        let image_id = state
            .images
            .get(&config.image)
            .map(|image| image.id.clone())
            .unwrap_or_default();
        state.containers.push(FakeContainer {
            snapshot: ContainerSnapshot {
                id: id.clone(),
                name: config.name.clone(),
                image: config.image.clone(),
                image_id,
                command: config.command.clone(),
                env: config.env.clone(),
                entrypoint: config.entrypoint.clone(),
                labels: config.labels.clone(),
                host_config: config.host_config.clone(),
                working_dir: config.working_dir.clone(),
                user: config.user.clone(),
            },
            running: false,
        });
        Ok(id)
    }

    async fn start_container(&self, id: &str) -> Result<(), RuntimeError> {
        self.record(Call::Start(id.to_string()));
        self.set_running(id, true)
    }

    async fn stop_container(&self, id: &str) -> Result<(), RuntimeError> {
        self.record(Call::Stop(id.to_string()));
        self.set_running(id, false)
    }

    async fn remove_container(&self, id: &str) -> Result<(), RuntimeError> {
        self.record(Call::RemoveContainer(id.to_string()));
        let mut state = self.state.lock().unwrap();
        let before = state.containers.len();
        state.containers.retain(|c| c.snapshot.id != id);
        if state.containers.len() == before {
            return Err(RuntimeError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

impl FakeRuntime {
    fn set_running(&self, id: &str, running: bool) -> Result<(), RuntimeError> {
        let mut state = self.state.lock().unwrap();
        let container = state
            .containers
            .iter_mut()
            .find(|c| c.snapshot.id == id)
            .ok_or_else(|| RuntimeError::NotFound(id.to_string()))?;
        container.running = running;
        Ok(())
    }
}
