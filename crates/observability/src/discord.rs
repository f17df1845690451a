use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::SecondsFormat;
use reqwest::Client;
use serde_json::json;
use url::Url;

use super::notifier::{NotificationEvent, NotificationProvider};

const DISCORD_CONTENT_LIMIT: usize = 2_000;
const TRUNCATION_SUFFIX: &str = "\n… (truncated)";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(3);

pub(crate) struct DiscordWebhookProvider {
    webhook_url: Url,
    client: Client,
}

impl DiscordWebhookProvider {
    pub(crate) fn new(webhook_url: Url) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            webhook_url,
            client,
        })
    }
}

pub(crate) fn format_content(event: &NotificationEvent) -> String {
    let mut lines = vec![format!(
        "**{}** `{}` `{}` `{}`",
        event.service_name,
        event.stage,
        event.component,
        event.level.as_str()
    )];

    let location = event
        .location
        .as_deref()
        .map(|loc| format!(" `{loc}`"))
        .unwrap_or_default();
    lines.push(format!(
        "`{}` `{}`{}",
        event.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
        event.target,
        location
    ));

    if let Some(message) = event.message.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
        lines.push(format!("> {message}"));
    }

    if !event.fields.is_empty() {
        lines.extend(event.fields.iter().map(|(k, v)| format!("- `{k}` = `{v}`")));
    }

    for span in event.spans.iter().filter(|span| !span.fields.is_empty()) {
        lines.push(format!("span `{}`:", span.name));
        lines.extend(span.fields.iter().map(|(k, v)| format!("- `{k}` = `{v}`")));
    }

    truncate(lines.join("\n"))
}

fn truncate(content: String) -> String {
    if content.chars().count() <= DISCORD_CONTENT_LIMIT {
        return content;
    }
    let keep = DISCORD_CONTENT_LIMIT - TRUNCATION_SUFFIX.chars().count();
    let mut truncated: String = content.chars().take(keep).collect();
    truncated.push_str(TRUNCATION_SUFFIX);
    truncated
}

#[async_trait]
impl NotificationProvider for DiscordWebhookProvider {
    async fn send(&self, event: &NotificationEvent) -> Result<()> {
        let response = self
            .client
            .post(self.webhook_url.clone())
            .json(&json!({ "content": format_content(event) }))
            .send()
            .await
            // reqwest errors include the URL, which carries the webhook token.
            .map_err(|err| {
                if err.is_timeout() {
                    anyhow!("discord webhook request timed out")
                } else {
                    anyhow!("discord webhook request failed")
                }
            })?;

        if response.status().is_success() {
            return Ok(());
        }
        Err(anyhow!(
            "discord webhook returned status {}",
            response.status()
        ))
    }

    fn provider_name(&self) -> &'static str {
        "discord"
    }
}
