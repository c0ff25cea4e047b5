use crate::error::Result;
use crate::plugin::ChannelPlugin;
use crate::NotificationChannel;
use async_trait::async_trait;
use poolwatch_common::types::{AlertEvent, Severity};
use serde_json::Value;

/// Writes alerts to the process log. Used when no webhook is configured
/// and by the replay tool.
pub struct LogChannel;

#[async_trait]
impl NotificationChannel for LogChannel {
    async fn send(&self, alert: &AlertEvent) -> Result<()> {
        let text = alert.render_text();
        match alert.severity {
            Severity::Critical => tracing::error!(kind = %alert.kind, "{text}"),
            Severity::Warning => tracing::warn!(kind = %alert.kind, "{text}"),
            Severity::Info => tracing::info!(kind = %alert.kind, "{text}"),
        }
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "log"
    }
}

pub struct LogPlugin;

impl ChannelPlugin for LogPlugin {
    fn name(&self) -> &str {
        "log"
    }

    fn validate_config(&self, _config: &Value) -> Result<()> {
        Ok(())
    }

    fn create_channel(&self, _config: &Value) -> Result<Box<dyn NotificationChannel>> {
        Ok(Box::new(LogChannel))
    }
}
