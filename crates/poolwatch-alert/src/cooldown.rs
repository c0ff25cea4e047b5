use chrono::{DateTime, Duration, Utc};
use poolwatch_common::types::AlertKind;
use serde::Deserialize;
use std::collections::HashMap;

/// How cooldown-governed alerts share their clock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CooldownScope {
    /// One clock for every kind: any sent alert silences all others.
    #[default]
    Shared,
    /// One clock per [`AlertKind`].
    PerKind,
}

impl std::str::FromStr for CooldownScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "shared" => Ok(Self::Shared),
            "per_kind" | "per-kind" => Ok(Self::PerKind),
            _ => Err(format!("unknown cooldown scope: {s}")),
        }
    }
}

/// Last-sent timestamps for alerts that respect the cooldown.
///
/// Clocks start at the Unix epoch so the first alert always passes.
#[derive(Debug, Clone)]
pub struct CooldownClock {
    scope: CooldownScope,
    period: Duration,
    shared: DateTime<Utc>,
    per_kind: HashMap<AlertKind, DateTime<Utc>>,
}

impl CooldownClock {
    pub fn new(scope: CooldownScope, period_secs: u64) -> Self {
        Self {
            scope,
            period: Duration::seconds(
                i64::try_from(period_secs)
                    .unwrap_or(i64::MAX)
                    .min(i64::MAX / 1_000),
            ),
            shared: DateTime::UNIX_EPOCH,
            per_kind: HashMap::new(),
        }
    }

    pub fn scope(&self) -> CooldownScope {
        self.scope
    }

    pub fn last_sent(&self, kind: AlertKind) -> DateTime<Utc> {
        match self.scope {
            CooldownScope::Shared => self.shared,
            CooldownScope::PerKind => self
                .per_kind
                .get(&kind)
                .copied()
                .unwrap_or(DateTime::UNIX_EPOCH),
        }
    }

    /// Most recent send across all clocks.
    pub fn latest(&self) -> DateTime<Utc> {
        match self.scope {
            CooldownScope::Shared => self.shared,
            CooldownScope::PerKind => self
                .per_kind
                .values()
                .max()
                .copied()
                .unwrap_or(DateTime::UNIX_EPOCH),
        }
    }

    /// Strictly more than the cooldown period has passed since the last send.
    pub fn is_ready(&self, kind: AlertKind, now: DateTime<Utc>) -> bool {
        now - self.last_sent(kind) > self.period
    }

    pub fn mark_sent(&mut self, kind: AlertKind, now: DateTime<Utc>) {
        match self.scope {
            CooldownScope::Shared => self.shared = now,
            CooldownScope::PerKind => {
                self.per_kind.insert(kind, now);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_clock_blocks_every_kind() {
        let now = Utc::now();
        let mut clock = CooldownClock::new(CooldownScope::Shared, 300);
        assert!(clock.is_ready(AlertKind::Failover, now));

        clock.mark_sent(AlertKind::Failover, now);
        assert!(!clock.is_ready(AlertKind::ErrorRateElevated, now + Duration::seconds(10)));
        assert!(!clock.is_ready(AlertKind::Failover, now + Duration::seconds(300)));
        assert!(clock.is_ready(AlertKind::ErrorRateElevated, now + Duration::seconds(301)));
    }

    #[test]
    fn per_kind_clocks_are_independent() {
        let now = Utc::now();
        let mut clock = CooldownClock::new(CooldownScope::PerKind, 300);
        clock.mark_sent(AlertKind::Failover, now);
        assert!(!clock.is_ready(AlertKind::Failover, now + Duration::seconds(5)));
        assert!(clock.is_ready(AlertKind::ErrorRateElevated, now + Duration::seconds(5)));
        assert_eq!(clock.last_sent(AlertKind::Recovery), DateTime::UNIX_EPOCH);
        assert_eq!(clock.latest(), now);
    }

    #[test]
    fn zero_period_still_requires_time_to_pass() {
        let now = Utc::now();
        let mut clock = CooldownClock::new(CooldownScope::Shared, 0);
        clock.mark_sent(AlertKind::Failover, now);
        assert!(!clock.is_ready(AlertKind::Failover, now));
        assert!(clock.is_ready(AlertKind::Failover, now + Duration::milliseconds(1)));
    }

    #[test]
    fn parses_scope_names() {
        assert_eq!("shared".parse::<CooldownScope>(), Ok(CooldownScope::Shared));
        assert_eq!("per_kind".parse::<CooldownScope>(), Ok(CooldownScope::PerKind));
        assert!("global".parse::<CooldownScope>().is_err());
    }
}
