use crate::error::{NotifyError, Result};
use crate::plugin::ChannelPlugin;
use crate::utils::{slack_text, truncate_string, MAX_BODY_LENGTH};
use crate::NotificationChannel;
use async_trait::async_trait;
use poolwatch_common::types::{format_timestamp, AlertEvent};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing;

const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Posts alerts to an incoming-webhook URL (Slack-compatible by default).
pub struct WebhookChannel {
    url: String,
    client: reqwest::Client,
    body_template: Option<String>,
}

impl WebhookChannel {
    pub fn new(url: &str, body_template: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url: url.to_string(),
            client,
            body_template,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub(crate) fn render_body(&self, alert: &AlertEvent) -> String {
        if let Some(template) = &self.body_template {
            template
                .replace("{{title}}", &alert.title)
                .replace("{{body}}", &alert.body)
                .replace("{{kind}}", alert.kind.as_str())
                .replace("{{severity}}", &alert.severity.to_string())
                .replace("{{timestamp}}", &format_timestamp(alert.timestamp))
                .replace("{{text}}", &alert.render_text())
        } else {
            serde_json::json!({ "text": slack_text(alert) }).to_string()
        }
    }
}

#[async_trait]
impl NotificationChannel for WebhookChannel {
    async fn send(&self, alert: &AlertEvent) -> Result<()> {
        let body = self.render_body(alert);
        let resp = self
            .client
            .post(self.url.as_str())
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }

        let resp_body = match resp.text().await {
            Ok(text) => truncate_string(&text, MAX_BODY_LENGTH),
            Err(e) => format!("[Failed to read response body: {e}]"),
        };
        tracing::warn!(status = %status, kind = %alert.kind, "Webhook returned non-success status");
        Err(NotifyError::ApiError {
            service: "webhook".to_string(),
            status: status.as_u16(),
            body: resp_body,
        })
    }

    fn channel_name(&self) -> &str {
        "webhook"
    }
}

// Plugin

#[derive(Deserialize)]
struct WebhookConfig {
    url: String,
    body_template: Option<String>,
    timeout_secs: Option<u64>,
}

pub struct WebhookPlugin;

impl WebhookPlugin {
    fn parse(config: &Value) -> Result<WebhookConfig> {
        let cfg: WebhookConfig = serde_json::from_value(config.clone())
            .map_err(|e| NotifyError::InvalidConfig(format!("webhook: {e}")))?;
        if !(cfg.url.starts_with("http://") || cfg.url.starts_with("https://")) {
            return Err(NotifyError::InvalidConfig(format!(
                "webhook: url must be http(s), got '{}'",
                cfg.url
            )));
        }
        if cfg.body_template.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(NotifyError::InvalidConfig(
                "webhook: body_template is empty".to_string(),
            ));
        }
        Ok(cfg)
    }
}

impl ChannelPlugin for WebhookPlugin {
    fn name(&self) -> &str {
        "webhook"
    }

    fn validate_config(&self, config: &Value) -> Result<()> {
        Self::parse(config).map(|_| ())
    }

    fn create_channel(&self, config: &Value) -> Result<Box<dyn NotificationChannel>> {
        let cfg = Self::parse(config)?;
        let timeout = Duration::from_secs(cfg.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));
        Ok(Box::new(WebhookChannel::new(
            &cfg.url,
            cfg.body_template,
            timeout,
        )?))
    }

    fn redact_config(&self, config: &Value) -> Value {
        // Incoming-webhook URLs embed their secret in the path.
        let mut redacted = config.clone();
        if let Some(url) = redacted.get_mut("url") {
            *url = Value::String("***".to_string());
        }
        redacted
    }
}
