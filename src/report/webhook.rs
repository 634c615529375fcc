//! Webhook notifications for Slack, Discord, Pushover, Telegram and generic endpoints

use serde_json::{Value, json};
use tracing::{debug, error, info};

use crate::report::error::ReportError;
use crate::report::sink::Reporter;
use crate::update::orchestrator::PassSummary;

/// Embed color used for Discord notifications
const DISCORD_COLOR: u32 = 15258703;

/// Payload shape, detected from the webhook URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookKind {
    Slack,
    Discord,
    Pushover,
    Telegram,
    Generic,
}

impl WebhookKind {
    pub fn detect(url: &str) -> Self {
        if url.contains("slack") {
            WebhookKind::Slack
        } else if url.contains("discord") {
            WebhookKind::Discord
        } else if url.contains("pushover") {
            WebhookKind::Pushover
        } else if url.contains("telegram") {
            WebhookKind::Telegram
        } else {
            WebhookKind::Generic
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushoverSettings {
    pub app_token: String,
    pub user_key: String,
    pub device: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TelegramSettings {
    pub bot_token: String,
    pub chat_id: String,
}

pub struct WebhookReporter {
    client: reqwest::Client,
    urls: Vec<String>,
    pushover: Option<PushoverSettings>,
    telegram: Option<TelegramSettings>,
}

impl WebhookReporter {
    pub fn new(urls: Vec<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent("argus")
                .build()
                .expect("Failed to create HTTP client"),
            urls,
            pushover: None,
            telegram: None,
        }
    }

    pub fn with_pushover(mut self, settings: PushoverSettings) -> Self {
        self.pushover = Some(settings);
        self
    }

    pub fn with_telegram(mut self, settings: TelegramSettings) -> Self {
        self.telegram = Some(settings);
        self
    }

    /// Telegram URLs end with the bot path prefix; the token and method are appended
    fn target_url(&self, kind: WebhookKind, url: &str) -> String {
        match (kind, &self.telegram) {
            (WebhookKind::Telegram, Some(telegram)) => {
                format!("{}{}/sendMessage", url, telegram.bot_token)
            }
            _ => url.to_string(),
        }
    }

    fn payload(&self, kind: WebhookKind, summary: &PassSummary) -> Value {
        match kind {
            WebhookKind::Slack => json!({ "text": summary_text(summary) }),
            WebhookKind::Discord => discord_payload(summary),
            WebhookKind::Pushover => {
                let settings = self.pushover.clone().unwrap_or_default();
                json!({
                    "token": settings.app_token,
                    "user": settings.user_key,
                    "device": settings.device,
                    "title": "Argus has updated containers!",
                    "message": summary_text(summary),
                })
            }
            WebhookKind::Telegram => {
                let chat_id = self
                    .telegram
                    .as_ref()
                    .map(|t| t.chat_id.clone())
                    .unwrap_or_default();
                json!({ "chat_id": chat_id, "text": summary_text(summary) })
            }
            WebhookKind::Generic => generic_payload(summary),
        }
    }

    async fn post(&self, url: &str, payload: &Value) -> Result<(), ReportError> {
        let response = self.client.post(url).json(payload).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReportError::Rejected {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

/// Plain-text body shared by the chat webhooks
fn summary_text(summary: &PassSummary) -> String {
    let mut text = format!(
        "Socket: {}\nContainers Monitored: {}\nContainers Updated: {}\n",
        summary.host,
        summary.monitored,
        summary.updated()
    );
    for outcome in &summary.outcomes {
        text.push_str(&format!(
            "{} updated: Old SHA: {} | New SHA {}\n",
            outcome.container_name(),
            outcome.old_image.id,
            outcome.new_image.id
        ));
    }
    text
}

fn discord_payload(summary: &PassSummary) -> Value {
    let mut fields = vec![
        json!({ "name": "Socket:", "value": summary.host }),
        json!({ "name": "Containers Monitored:", "value": summary.monitored.to_string() }),
        json!({ "name": "Containers Updated:", "value": summary.updated().to_string() }),
    ];
    fields.extend(summary.outcomes.iter().map(|outcome| {
        json!({
            "name": outcome.container_name(),
            "value": format!(
                "Old SHA: {} | New SHA {}",
                outcome.old_image.id, outcome.new_image.id
            ),
        })
    }));

    json!({
        "username": "Webhook Messenger",
        "embeds": [{
            "title": "Argus has updated containers",
            "description": "Breakdown:",
            "color": DISCORD_COLOR,
            "fields": fields,
        }],
    })
}

fn generic_payload(summary: &PassSummary) -> Value {
    let updated: Vec<Value> = summary
        .outcomes
        .iter()
        .map(|outcome| {
            json!({
                "container": outcome.container_name(),
                "oldImage": outcome.old_image.id,
                "newImage": outcome.new_image.id,
                "updatedAt": outcome.updated_at,
            })
        })
        .collect();
    let failed: Vec<Value> = summary
        .failures
        .iter()
        .map(|failure| {
            json!({
                "container": failure.container,
                "image": failure.image,
                "error": failure.error,
                "partialReplacement": failure.partial_replacement,
            })
        })
        .collect();

    json!({
        "host": summary.host,
        "monitored": summary.monitored,
        "updated": summary.updated(),
        "containers": updated,
        "failures": failed,
        "startedAt": summary.started_at,
        "finishedAt": summary.finished_at,
    })
}

#[async_trait::async_trait]
impl Reporter for WebhookReporter {
    fn name(&self) -> &'static str {
        "webhook"
    }

    /// Posts to every URL in turn; one failing URL does not stop the others
    async fn report(&self, summary: &PassSummary) -> Result<(), ReportError> {
        let mut failed = 0;

        for url in &self.urls {
            let kind = WebhookKind::detect(url);
            let target = self.target_url(kind, url);
            let payload = self.payload(kind, summary);
            debug!("Posting {:?} webhook to {}", kind, url);

            match self.post(&target, &payload).await {
                Ok(()) => info!("Delivered webhook notification to {}", url),
                Err(e) => {
                    error!("Webhook {} error: {}", url, e);
                    failed += 1;
                }
            }
        }

        if failed > 0 {
            return Err(ReportError::PartialDelivery {
                failed,
                total: self.urls.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::types::{ContainerSnapshot, ImageDescriptor};
    use crate::update::orchestrator::UpdateOutcome;
    use chrono::Utc;
    use mockito::{Matcher, Server};
    use rstest::rstest;

    fn summary() -> PassSummary {
        let now = Utc::now();
        PassSummary {
            host: "unix:///var/run/docker.sock".to_string(),
            monitored: 3,
            outcomes: vec![UpdateOutcome {
                old_image: ImageDescriptor {
                    id: "sha256:old".to_string(),
                    ..Default::default()
                },
                new_image: ImageDescriptor {
                    id: "sha256:new".to_string(),
                    ..Default::default()
                },
                container: ContainerSnapshot {
                    name: "web".to_string(),
                    ..Default::default()
                },
                updated_at: now,
            }],
            failures: vec![],
            started_at: now,
            finished_at: now,
        }
    }

    #[rstest]
    #[case("https://hooks.slack.com/services/T0/B0/X", WebhookKind::Slack)]
    #[case("https://discord.com/api/webhooks/1/abc", WebhookKind::Discord)]
    #[case("https://api.pushover.net/1/messages.json", WebhookKind::Pushover)]
    #[case("https://api.telegram.org/bot", WebhookKind::Telegram)]
    #[case("https://example.com/hooks/argus", WebhookKind::Generic)]
    fn detect_kind_from_url(#[case] url: &str, #[case] expected: WebhookKind) {
        assert_eq!(WebhookKind::detect(url), expected);
    }

    #[test]
    fn summary_text_lists_every_update() {
        let text = summary_text(&summary());

        assert_eq!(
            text,
            "Socket: unix:///var/run/docker.sock\nContainers Monitored: 3\nContainers Updated: 1\nweb updated: Old SHA: sha256:old | New SHA sha256:new\n"
        );
    }

    #[test]
    fn discord_payload_has_one_field_per_update() {
        let payload = discord_payload(&summary());
        let fields = payload["embeds"][0]["fields"].as_array().unwrap();

        assert_eq!(fields.len(), 4);
        assert_eq!(fields[1]["value"], "3");
        assert_eq!(fields[3]["name"], "web");
    }

    #[tokio::test]
    async fn report_posts_slack_payload() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("POST", "/services/slack/T0")
            .match_header("content-type", "application/json")
            .match_body(Matcher::PartialJson(json!({
                "text": summary_text(&summary()),
            })))
            .with_status(200)
            .create_async()
            .await;

        let reporter = WebhookReporter::new(vec![format!("{}/services/slack/T0", server.url())]);
        reporter.report(&summary()).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn report_appends_telegram_token_and_method() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("POST", "/telegram/bot123:abc/sendMessage")
            .match_body(Matcher::PartialJson(json!({ "chat_id": "42" })))
            .with_status(200)
            .create_async()
            .await;

        let reporter = WebhookReporter::new(vec![format!("{}/telegram/bot", server.url())])
            .with_telegram(TelegramSettings {
                bot_token: "123:abc".to_string(),
                chat_id: "42".to_string(),
            });
        reporter.report(&summary()).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn report_sends_pushover_credentials() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("POST", "/pushover/1/messages.json")
            .match_body(Matcher::PartialJson(json!({
                "token": "app",
                "user": "user",
                "title": "Argus has updated containers!",
            })))
            .with_status(200)
            .create_async()
            .await;

        let reporter =
            WebhookReporter::new(vec![format!("{}/pushover/1/messages.json", server.url())])
                .with_pushover(PushoverSettings {
                    app_token: "app".to_string(),
                    user_key: "user".to_string(),
                    device: None,
                });
        reporter.report(&summary()).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn failing_url_does_not_stop_later_urls() {
        let mut server = Server::new_async().await;

        let failing = server
            .mock("POST", "/hooks/broken")
            .with_status(500)
            .create_async()
            .await;
        let working = server
            .mock("POST", "/hooks/argus")
            .match_body(Matcher::PartialJson(json!({
                "host": "unix:///var/run/docker.sock",
                "monitored": 3,
                "updated": 1,
            })))
            .with_status(204)
            .create_async()
            .await;

        let reporter = WebhookReporter::new(vec![
            format!("{}/hooks/broken", server.url()),
            format!("{}/hooks/argus", server.url()),
        ]);
        let result = reporter.report(&summary()).await;

        failing.assert_async().await;
        working.assert_async().await;
        assert!(matches!(
            result,
            Err(ReportError::PartialDelivery { failed: 1, total: 2 })
        ));
    }
}
