use anyhow::{bail, Context, Result};
use poolwatch_alert::{CooldownScope, EngineConfig};
use poolwatch_common::types::Severity;
use poolwatch_ingest::tail::TailOptions;
use poolwatch_notify::channels::log::LogChannel;
use poolwatch_notify::manager::{ChannelRoute, NotificationManager};
use poolwatch_notify::plugin::ChannelRegistry;
use poolwatch_notify::NotificationChannel;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "config/watcher.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct WatcherConfig {
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
    /// Baseline pool. Required, from the file or `ACTIVE_POOL`.
    #[serde(default)]
    pub active_pool: Option<String>,
    #[serde(default = "default_error_rate_threshold")]
    pub error_rate_threshold: f64,
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
    #[serde(default)]
    pub cooldown_scope: CooldownScope,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_wait_interval_secs")]
    pub wait_interval_secs: u64,
    /// Shortcut for a webhook channel; `SLACK_WEBHOOK_URL` overrides it.
    #[serde(default)]
    pub slack_webhook_url: Option<String>,
    #[serde(default)]
    pub channels: Vec<ChannelConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelConfig {
    #[serde(default)]
    pub name: Option<String>,
    pub channel_type: String,
    #[serde(default = "default_min_severity")]
    pub min_severity: Severity,
    #[serde(default)]
    pub config: serde_json::Value,
}

fn default_log_file() -> PathBuf {
    PathBuf::from("/var/log/nginx/access.log")
}

fn default_error_rate_threshold() -> f64 {
    2.0
}

fn default_window_size() -> usize {
    200
}

fn default_cooldown_secs() -> u64 {
    300
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_wait_interval_secs() -> u64 {
    2
}

fn default_min_severity() -> Severity {
    Severity::Info
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            log_file: default_log_file(),
            active_pool: None,
            error_rate_threshold: default_error_rate_threshold(),
            window_size: default_window_size(),
            cooldown_secs: default_cooldown_secs(),
            cooldown_scope: CooldownScope::default(),
            poll_interval_ms: default_poll_interval_ms(),
            wait_interval_secs: default_wait_interval_secs(),
            slack_webhook_url: None,
            channels: Vec::new(),
        }
    }
}

impl WatcherConfig {
    /// Loads the TOML file (when given or present at the default path),
    /// applies environment overrides, and validates the result.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(Path::new(path))?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_PATH))?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Environment variables win over file values.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("LOG_FILE") {
            self.log_file = PathBuf::from(v);
        }
        if let Some(v) = lookup("ACTIVE_POOL") {
            self.active_pool = Some(v);
        }
        if let Some(v) = lookup("ERROR_RATE_THRESHOLD") {
            self.error_rate_threshold = v
                .trim()
                .parse()
                .with_context(|| format!("ERROR_RATE_THRESHOLD is not a number: {v}"))?;
        }
        if let Some(v) = lookup("WINDOW_SIZE") {
            self.window_size = v
                .trim()
                .parse()
                .with_context(|| format!("WINDOW_SIZE is not a count: {v}"))?;
        }
        if let Some(v) = lookup("ALERT_COOLDOWN_SEC") {
            self.cooldown_secs = v
                .trim()
                .parse()
                .with_context(|| format!("ALERT_COOLDOWN_SEC is not a number of seconds: {v}"))?;
        }
        if let Some(v) = lookup("COOLDOWN_SCOPE") {
            self.cooldown_scope = v.trim().parse().map_err(anyhow::Error::msg)?;
        }
        if let Some(v) = lookup("SLACK_WEBHOOK_URL") {
            if !v.trim().is_empty() {
                self.slack_webhook_url = Some(v);
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        match self.active_pool.as_deref() {
            None => bail!("active_pool is not set (config file or ACTIVE_POOL)"),
            Some(pool) if pool.trim().is_empty() => bail!("active_pool is empty"),
            Some(_) => {}
        }
        if self.window_size == 0 {
            bail!("window_size must be greater than zero");
        }
        if !(0.0..=100.0).contains(&self.error_rate_threshold) {
            bail!(
                "error_rate_threshold must be a percentage in [0, 100], got {}",
                self.error_rate_threshold
            );
        }
        Ok(())
    }

    pub fn active_pool(&self) -> &str {
        self.active_pool.as_deref().unwrap_or_default()
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            active_pool: self.active_pool().to_string(),
            error_rate_threshold: self.error_rate_threshold,
            window_size: self.window_size,
            cooldown_secs: self.cooldown_secs,
            cooldown_scope: self.cooldown_scope,
        }
    }

    pub fn tail_options(&self) -> TailOptions {
        TailOptions {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            wait_interval: Duration::from_secs(self.wait_interval_secs),
            from_start: false,
        }
    }

    /// Instantiates every configured channel. Falls back to the log channel
    /// when nothing is configured so alerts stay visible.
    pub fn build_notifier(&self, registry: &ChannelRegistry) -> Result<NotificationManager> {
        let mut channels: Vec<Box<dyn NotificationChannel>> = Vec::new();
        let mut routes = Vec::new();

        for (index, channel) in self.channels.iter().enumerate() {
            let name = channel.name.as_deref().unwrap_or(&channel.channel_type);
            let created = registry
                .create_channel(&channel.channel_type, &channel.config)
                .with_context(|| format!("creating channel '{name}'"))?;
            if let Some(plugin) = registry.get_plugin(&channel.channel_type) {
                tracing::info!(
                    channel = name,
                    channel_type = %channel.channel_type,
                    min_severity = %channel.min_severity,
                    config = %plugin.redact_config(&channel.config),
                    "Notification channel configured"
                );
            }
            channels.push(created);
            routes.push(ChannelRoute {
                min_severity: channel.min_severity,
                channel_index: index,
            });
        }

        if let Some(url) = &self.slack_webhook_url {
            let config = serde_json::json!({ "url": url });
            let created = registry
                .create_channel("webhook", &config)
                .context("creating channel from SLACK_WEBHOOK_URL")?;
            tracing::info!(channel = "slack", "Notification channel configured");
            routes.push(ChannelRoute {
                min_severity: Severity::Info,
                channel_index: channels.len(),
            });
            channels.push(created);
        }

        if channels.is_empty() {
            tracing::warn!("No notification channel configured, alerts go to the log only");
            return Ok(NotificationManager::broadcast(vec![Box::new(LogChannel)]));
        }

        Ok(NotificationManager::new(channels, routes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_overrides() {
        let config = WatcherConfig::from_toml_str("active_pool = \"blue\"").unwrap();
        assert_eq!(config.log_file, PathBuf::from("/var/log/nginx/access.log"));
        assert_eq!(config.error_rate_threshold, 2.0);
        assert_eq!(config.window_size, 200);
        assert_eq!(config.cooldown_secs, 300);
        assert_eq!(config.cooldown_scope, CooldownScope::Shared);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn env_overrides_file() {
        let mut config = WatcherConfig::from_toml_str(
            r#"
            active_pool = "blue"
            window_size = 50
            cooldown_scope = "per_kind"
            "#,
        )
        .unwrap();
        config
            .apply_env(env(&[
                ("ACTIVE_POOL", "green"),
                ("ERROR_RATE_THRESHOLD", "5.5"),
                ("WINDOW_SIZE", "10"),
                ("ALERT_COOLDOWN_SEC", "60"),
                ("LOG_FILE", "/tmp/access.log"),
                ("SLACK_WEBHOOK_URL", "https://hooks.slack.com/services/x"),
            ]))
            .unwrap();

        assert_eq!(config.active_pool(), "green");
        assert_eq!(config.error_rate_threshold, 5.5);
        assert_eq!(config.window_size, 10);
        assert_eq!(config.cooldown_secs, 60);
        assert_eq!(config.cooldown_scope, CooldownScope::PerKind);
        assert_eq!(config.log_file, PathBuf::from("/tmp/access.log"));
        assert!(config.slack_webhook_url.is_some());

        let engine = config.engine_config();
        assert_eq!(engine.active_pool, "green");
        assert_eq!(engine.window_size, 10);
    }

    #[test]
    fn bad_env_number_is_an_error() {
        let mut config = WatcherConfig::default();
        let err = config
            .apply_env(env(&[("WINDOW_SIZE", "lots")]))
            .unwrap_err();
        assert!(err.to_string().contains("WINDOW_SIZE"));
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut config = WatcherConfig::default();
        assert!(config.validate().is_err());

        config.active_pool = Some("blue".into());
        assert!(config.validate().is_ok());

        config.window_size = 0;
        assert!(config.validate().is_err());
        config.window_size = 10;

        config.error_rate_threshold = 150.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn channels_parse_and_build() {
        let config = WatcherConfig::from_toml_str(
            r#"
            active_pool = "blue"

            [[channels]]
            name = "ops"
            channel_type = "webhook"
            min_severity = "warning"
            config = { url = "https://hooks.example.com/ops", timeout_secs = 5 }

            [[channels]]
            channel_type = "log"
            "#,
        )
        .unwrap();
        assert_eq!(config.channels.len(), 2);
        assert_eq!(config.channels[0].min_severity, Severity::Warning);

        let notifier = config.build_notifier(&ChannelRegistry::default()).unwrap();
        assert_eq!(notifier.channels().len(), 2);
        assert_eq!(notifier.routes()[0].min_severity, Severity::Warning);
    }

    #[test]
    fn invalid_channel_config_fails_startup() {
        let config = WatcherConfig::from_toml_str(
            r#"
            active_pool = "blue"

            [[channels]]
            channel_type = "webhook"
            "#,
        )
        .unwrap();
        let err = config
            .build_notifier(&ChannelRegistry::default())
            .err()
            .expect("webhook without url must fail");
        assert!(err.to_string().contains("creating channel"));
    }

    #[test]
    fn falls_back_to_log_channel() {
        let config = WatcherConfig::from_toml_str("active_pool = \"blue\"").unwrap();
        let notifier = config.build_notifier(&ChannelRegistry::default()).unwrap();
        assert_eq!(notifier.channels().len(), 1);
        assert_eq!(notifier.channels()[0].channel_name(), "log");
    }

    #[test]
    fn slack_url_adds_webhook_channel() {
        let mut config = WatcherConfig::from_toml_str("active_pool = \"blue\"").unwrap();
        config.slack_webhook_url = Some("https://hooks.slack.com/services/T/B/X".into());
        let notifier = config.build_notifier(&ChannelRegistry::default()).unwrap();
        assert_eq!(notifier.channels().len(), 1);
        assert_eq!(notifier.channels()[0].channel_name(), "webhook");
    }
}
