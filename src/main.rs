use std::path::PathBuf;

use argus::config::{AgentConfig, LogFormat};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "argus")]
#[command(version, about = "Keeps running Docker containers on their newest images")]
struct Cli {
    /// JSON config file (defaults to $XDG_CONFIG_HOME/argus/config.json)
    #[arg(long, env = "ARGUS_CONFIG")]
    config: Option<PathBuf>,

    /// Run a single update pass and exit
    #[arg(short = 'r', long)]
    run_once: bool,

    /// Remove outdated images after updating a container
    #[arg(short = 'c', long)]
    cleanup: bool,

    /// Docker host: unix:///path, tcp://host:port or http(s)://host:port
    #[arg(short = 'u', long, env = "DOCKER_HOST")]
    host: Option<String>,

    /// Seconds between update passes
    #[arg(short = 'i', long)]
    interval: Option<u64>,

    /// Container names to monitor, comma separated (defaults to all)
    #[arg(short = 'm', long, value_delimiter = ',')]
    monitor: Vec<String>,

    /// Container names to ignore, comma separated
    #[arg(short = 'n', long, value_delimiter = ',')]
    ignore: Vec<String>,

    /// Private registry username
    #[arg(long, env = "REPO_USER")]
    user: Option<String>,

    /// Private registry password
    #[arg(long, env = "REPO_PASS", hide_env_values = true)]
    pass: Option<String>,

    /// Follow semantic-version tags instead of `latest`
    #[arg(long)]
    semver: bool,

    /// Allow updates to a new major version (with --semver)
    #[arg(long)]
    allow_major: bool,

    /// Only allow patch updates (with --semver)
    #[arg(long)]
    patch_only: bool,

    /// Registry for images without a registry host
    #[arg(long)]
    registry: Option<String>,

    /// Image name fragment identifying the agent's own container
    #[arg(long)]
    self_image: Option<String>,

    /// Webhook URLs to notify after each pass, comma separated
    #[arg(long, env = "WEBHOOK_URLS", value_delimiter = ',')]
    webhook_urls: Vec<String>,

    #[arg(long, env = "PUSHOVER_APP_TOKEN", hide_env_values = true)]
    pushover_app_token: Option<String>,

    #[arg(long, env = "PUSHOVER_USER_KEY", hide_env_values = true)]
    pushover_user_key: Option<String>,

    #[arg(long, env = "PUSHOVER_DEVICE")]
    pushover_device: Option<String>,

    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    telegram_bot_token: Option<String>,

    #[arg(long, env = "TELEGRAM_CHAT_ID")]
    telegram_chat_id: Option<String>,

    /// Write Prometheus metrics to this file after every pass
    #[arg(long)]
    metrics_file: Option<PathBuf>,

    /// error, warn, info, verbose, debug or trace
    #[arg(short = 'l', long)]
    log_level: Option<String>,

    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,

    /// Also write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Cli {
    /// Flags and environment take precedence over the config file
    fn apply(self, config: &mut AgentConfig) {
        config.run_once |= self.run_once;
        config.cleanup |= self.cleanup;
        config.semver |= self.semver;
        config.allow_major |= self.allow_major;
        config.patch_only |= self.patch_only;

        if !self.monitor.is_empty() {
            config.monitor = self.monitor;
        }
        if !self.ignore.is_empty() {
            config.ignore = self.ignore;
        }
        if !self.webhook_urls.is_empty() {
            config.webhook_urls = self.webhook_urls;
        }

        override_with(&mut config.docker_host, self.host);
        override_with(&mut config.interval, self.interval);
        override_with(&mut config.registry_base, self.registry);
        override_with(&mut config.self_image, self.self_image);
        override_with(&mut config.log_level, self.log_level);
        override_with(&mut config.log_format, self.log_format);

        config.repo_user = self.user.or(config.repo_user.take());
        config.repo_pass = self.pass.or(config.repo_pass.take());
        config.pushover_app_token = self.pushover_app_token.or(config.pushover_app_token.take());
        config.pushover_user_key = self.pushover_user_key.or(config.pushover_user_key.take());
        config.pushover_device = self.pushover_device.or(config.pushover_device.take());
        config.telegram_bot_token = self.telegram_bot_token.or(config.telegram_bot_token.take());
        config.telegram_chat_id = self.telegram_chat_id.or(config.telegram_chat_id.take());
        config.metrics_file = self.metrics_file.or(config.metrics_file.take());
        config.log_file = self.log_file.or(config.log_file.take());
    }
}

fn override_with<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AgentConfig::load(cli.config.as_deref())?;
    cli.apply(&mut config);

    let _log_guard = argus::logging::init(
        &config.log_level,
        config.log_format,
        config.log_file.as_deref(),
    )?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(argus::agent::run(config))
}
