use crate::completeness::FieldCompletenessTracker;
use crate::cooldown::CooldownScope;
use crate::state::{AlertState, ErrorState, PoolTransition};
use crate::window::RollingWindow;
use chrono::{DateTime, Utc};
use poolwatch_common::types::{AlertEvent, AlertKind, Field, LogRecord};
use tracing;

const RUNBOOK_ACTION: &str = "See runbook.md for response procedures";

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Baseline pool; leaving it is a failover, returning is a recovery.
    pub active_pool: String,
    /// Error-rate percentage above which the rate counts as elevated.
    pub error_rate_threshold: f64,
    pub window_size: usize,
    pub cooldown_secs: u64,
    pub cooldown_scope: CooldownScope,
}

impl EngineConfig {
    pub fn new(active_pool: impl Into<String>) -> Self {
        Self {
            active_pool: active_pool.into(),
            error_rate_threshold: 2.0,
            window_size: 200,
            cooldown_secs: 300,
            cooldown_scope: CooldownScope::Shared,
        }
    }
}

/// Stateful alert decision engine.
///
/// Owns every piece of mutable state; callers only feed it records and
/// deliver what it returns.
pub struct AlertEngine {
    config: EngineConfig,
    window: RollingWindow,
    completeness: FieldCompletenessTracker,
    state: AlertState,
}

impl AlertEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            window: RollingWindow::new(config.window_size),
            completeness: FieldCompletenessTracker::new(),
            state: AlertState::new(
                config.active_pool.clone(),
                config.cooldown_scope,
                config.cooldown_secs,
            ),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn window(&self) -> &RollingWindow {
        &self.window
    }

    pub fn completeness(&self) -> &FieldCompletenessTracker {
        &self.completeness
    }

    pub fn state(&self) -> &AlertState {
        &self.state
    }

    /// Updates all counters with `record` and returns the alerts it triggers,
    /// in evaluation order.
    pub fn process_record(&mut self, record: &LogRecord, now: DateTime<Utc>) -> Vec<AlertEvent> {
        let mut events = Vec::new();

        self.completeness.record(&record.fields_present);
        if self.completeness.should_alert() && self.try_mark(AlertKind::DataQuality, now) {
            events.push(self.data_quality_alert(now));
        }

        if record.is_unreachable() {
            if self.try_mark(AlertKind::UnreachableEndpoint, now) {
                events.push(unreachable_alert(record, now));
            }
            return events;
        }

        self.window.push(record.status);
        let error_rate = self.window.error_rate();
        tracing::debug!(
            status = record.status,
            error_rate,
            pool = %record.pool,
            "Record processed"
        );

        if record.is_server_error()
            && !record.fields_present.contains(Field::UpstreamStatus)
            && self.try_mark(AlertKind::HeaderAnomaly, now)
        {
            events.push(header_anomaly_alert(record, now));
        }

        if record.has_known_pool() && record.pool != self.state.last_pool {
            let transition = PoolTransition::classify(
                self.state.active_pool(),
                &self.state.last_pool,
                &record.pool,
            );
            let kind = transition.alert_kind();
            if self.try_mark(kind, now) {
                events.push(self.pool_alert(kind, &record.pool, now));
            }
            // Moves even when suppressed so a stale transition is never replayed.
            self.state.last_pool = record.pool.clone();
        }

        let threshold = self.config.error_rate_threshold;
        match self.state.last_error_state {
            ErrorState::Normal if error_rate > threshold => {
                if self.try_mark(AlertKind::ErrorRateElevated, now) {
                    events.push(self.error_rate_alert(
                        AlertKind::ErrorRateElevated,
                        error_rate,
                        &record.pool,
                        now,
                    ));
                    self.state.last_error_state = ErrorState::Elevated;
                }
            }
            ErrorState::Elevated if error_rate <= threshold => {
                if self.try_mark(AlertKind::ErrorRateRecovered, now) {
                    events.push(self.error_rate_alert(
                        AlertKind::ErrorRateRecovered,
                        error_rate,
                        &record.pool,
                        now,
                    ));
                    self.state.last_error_state = ErrorState::Normal;
                }
            }
            _ => {}
        }

        events
    }

    /// Claims the cooldown for `kind`. Returns false while it is still running;
    /// kinds that bypass the cooldown are always admitted and leave it alone.
    pub(crate) fn try_mark(&mut self, kind: AlertKind, now: DateTime<Utc>) -> bool {
        if kind.bypasses_cooldown() {
            return true;
        }
        if !self.state.cooldown.is_ready(kind, now) {
            tracing::debug!(
                kind = %kind,
                last_alert = %self.state.cooldown.last_sent(kind),
                "Alert suppressed (cooldown)"
            );
            return false;
        }
        self.state.cooldown.mark_sent(kind, now);
        true
    }

    fn pool_alert(&self, kind: AlertKind, pool: &str, now: DateTime<Utc>) -> AlertEvent {
        let last = &self.state.last_pool;
        AlertEvent::new(kind, format!("Pool switched from {last} → {pool}"), now)
            .with_field("From", last.as_str())
            .with_field("To", pool)
            .with_field("Active Pool", self.state.active_pool())
            .stamped()
    }

    fn error_rate_alert(
        &self,
        kind: AlertKind,
        error_rate: f64,
        pool: &str,
        now: DateTime<Utc>,
    ) -> AlertEvent {
        let threshold = self.config.error_rate_threshold;
        let body = if kind == AlertKind::ErrorRateElevated {
            format!("Error rate has exceeded threshold: {error_rate:.2}% (threshold: {threshold}%)")
        } else {
            format!("Error rate is back under threshold: {error_rate:.2}% (threshold: {threshold}%)")
        };
        let event = AlertEvent::new(kind, body, now)
            .with_field("Error Rate", format!("{error_rate:.2}%"))
            .with_field("Threshold", format!("{threshold}%"))
            .with_field("Window Size", format!("{} requests", self.window.capacity()))
            .with_field("Current Pool", pool)
            .stamped();
        if kind == AlertKind::ErrorRateElevated {
            event.with_field("Action", RUNBOOK_ACTION)
        } else {
            event
        }
    }

    fn data_quality_alert(&self, now: DateTime<Utc>) -> AlertEvent {
        let total = self.completeness.total_records();
        let missing = self.completeness.missing_records();
        let required = Field::REQUIRED.map(Field::as_str).join(", ");
        AlertEvent::new(
            AlertKind::DataQuality,
            format!("{missing} of {total} log lines are missing required fields"),
            now,
        )
        .with_field("Missing Ratio", format!("{:.2}", self.completeness.missing_ratio()))
        .with_field("Records Checked", total.to_string())
        .with_field("Records Missing Fields", missing.to_string())
        .with_field("Required Fields", required)
        .stamped()
    }
}

fn unreachable_alert(record: &LogRecord, now: DateTime<Utc>) -> AlertEvent {
    AlertEvent::new(
        AlertKind::UnreachableEndpoint,
        format!("No upstream in pool {} answered the request", record.pool),
        now,
    )
    .with_field("Pool", record.pool.as_str())
    .with_field("Upstream Status", "000")
    .stamped()
}

fn header_anomaly_alert(record: &LogRecord, now: DateTime<Utc>) -> AlertEvent {
    let missing = record
        .fields_present
        .missing()
        .into_iter()
        .map(Field::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    AlertEvent::new(
        AlertKind::HeaderAnomaly,
        format!(
            "Status {} was logged without an upstream_status field",
            record.status
        ),
        now,
    )
    .with_field("Status", record.status.to_string())
    .with_field("Pool", record.pool.as_str())
    .with_field("Missing Fields", missing)
    .stamped()
}
