//! Agent wiring and poll loop

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::config::AgentConfig;
use crate::report::metrics::PrometheusMetrics;
use crate::report::webhook::{PushoverSettings, TelegramSettings, WebhookReporter};
use crate::runtime::client::ContainerRuntime;
use crate::runtime::containers::ContainerStore;
use crate::runtime::docker::DockerRuntime;
use crate::runtime::images::ImageStore;
use crate::update::orchestrator::{PassSummary, UpdateOptions, Updater};
use crate::version::registries::DockerRegistry;
use crate::version::registry::TagLister;
use crate::version::resolver::TagResolver;

pub struct Agent {
    updater: Updater,
    metrics: Option<(Arc<PrometheusMetrics>, PathBuf)>,
    interval: Duration,
    run_once: bool,
}

impl Agent {
    /// Build an agent from a validated configuration
    pub fn new(
        config: &AgentConfig,
        runtime: Arc<dyn ContainerRuntime>,
        lister: Arc<dyn TagLister>,
    ) -> anyhow::Result<Self> {
        let credentials = config.credentials();
        let options = UpdateOptions {
            cleanup: config.cleanup,
            policy: config.version_policy()?,
            credentials: credentials.clone(),
            filters: config.filters(),
            host: config.docker_host.clone(),
        };

        let mut updater = Updater::new(
            ContainerStore::new(runtime.clone(), &config.self_image),
            ImageStore::new(runtime),
            TagResolver::new(lister, &config.registry_base, credentials),
            options,
        );

        if let Some(reporter) = webhook_reporter(config) {
            updater = updater.with_reporter(Arc::new(reporter));
        }

        let metrics = match &config.metrics_file {
            Some(path) => {
                let metrics = Arc::new(PrometheusMetrics::new(&config.docker_host)?);
                updater = updater.with_metrics(metrics.clone());
                Some((metrics, path.clone()))
            }
            None => None,
        };

        Ok(Self {
            updater,
            metrics,
            interval: Duration::from_secs(config.interval),
            run_once: config.run_once,
        })
    }

    /// Run one pass, logging a pass-level failure instead of returning it
    pub async fn run_pass(&self) -> Option<PassSummary> {
        let summary = self
            .updater
            .run_pass()
            .await
            .inspect_err(|e| error!("Update pass aborted: {}", e))
            .ok();

        if let Some((metrics, path)) = &self.metrics {
            let _ = metrics
                .write_to(path)
                .inspect_err(|e| warn!("Failed to export metrics: {}", e));
        }

        summary
    }

    /// Run passes until `shutdown` resolves, or once in run-once mode.
    ///
    /// `shutdown` is only observed between passes.
    pub async fn run_until<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        if self.run_once {
            self.run_pass().await;
            return;
        }

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping");
                    break;
                }
                _ = ticker.tick() => {
                    self.run_pass().await;
                }
            }
        }
    }
}

fn webhook_reporter(config: &AgentConfig) -> Option<WebhookReporter> {
    if config.webhook_urls.is_empty() {
        return None;
    }

    let mut reporter = WebhookReporter::new(config.webhook_urls.clone());
    if let (Some(app_token), Some(user_key)) =
        (&config.pushover_app_token, &config.pushover_user_key)
    {
        reporter = reporter.with_pushover(PushoverSettings {
            app_token: app_token.clone(),
            user_key: user_key.clone(),
            device: config.pushover_device.clone(),
        });
    }
    if let (Some(bot_token), Some(chat_id)) =
        (&config.telegram_bot_token, &config.telegram_chat_id)
    {
        reporter = reporter.with_telegram(TelegramSettings {
            bot_token: bot_token.clone(),
            chat_id: chat_id.clone(),
        });
    }
    Some(reporter)
}

/// Connect to the configured runtime and run until Ctrl-C
pub async fn run(config: AgentConfig) -> anyhow::Result<()> {
    config.validate()?;

    let runtime = Arc::new(DockerRuntime::connect(&config.docker_host)?);
    let agent = Agent::new(&config, runtime, Arc::new(DockerRegistry::new()))?;

    info!(
        host = %config.docker_host,
        interval = config.interval,
        run_once = config.run_once,
        "Starting argus"
    );

    agent
        .run_until(async {
            let _ = tokio::signal::ctrl_c()
                .await
                .inspect_err(|e| error!("Failed to listen for Ctrl-C: {}", e));
        })
        .await;

    Ok(())
}
