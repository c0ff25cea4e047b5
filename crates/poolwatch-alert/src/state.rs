use crate::cooldown::{CooldownClock, CooldownScope};
use chrono::{DateTime, Utc};
use poolwatch_common::types::AlertKind;

/// Error-rate latch. Moves only when the matching alert is actually sent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorState {
    #[default]
    Normal,
    Elevated,
}

impl std::fmt::Display for ErrorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorState::Normal => write!(f, "normal"),
            ErrorState::Elevated => write!(f, "elevated"),
        }
    }
}

/// Classification of a pool transition relative to the baseline pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolTransition {
    /// Left the baseline pool.
    Failover,
    /// Came back to the baseline pool.
    Recovery,
    /// Moved between two non-baseline pools.
    Switch,
}

impl PoolTransition {
    pub fn classify(active: &str, last: &str, next: &str) -> Self {
        if last == active && next != active {
            PoolTransition::Failover
        } else if last != active && next == active {
            PoolTransition::Recovery
        } else {
            PoolTransition::Switch
        }
    }

    pub fn alert_kind(self) -> AlertKind {
        match self {
            PoolTransition::Failover => AlertKind::Failover,
            PoolTransition::Recovery => AlertKind::Recovery,
            PoolTransition::Switch => AlertKind::PoolSwitch,
        }
    }
}

/// What the engine remembers between records.
#[derive(Debug, Clone)]
pub struct AlertState {
    active_pool: String,
    pub(crate) last_pool: String,
    pub(crate) last_error_state: ErrorState,
    pub(crate) cooldown: CooldownClock,
}

impl AlertState {
    pub fn new(active_pool: impl Into<String>, scope: CooldownScope, cooldown_secs: u64) -> Self {
        let active_pool = active_pool.into();
        Self {
            last_pool: active_pool.clone(),
            active_pool,
            last_error_state: ErrorState::Normal,
            cooldown: CooldownClock::new(scope, cooldown_secs),
        }
    }

    pub fn active_pool(&self) -> &str {
        &self.active_pool
    }

    pub fn last_pool(&self) -> &str {
        &self.last_pool
    }

    pub fn last_error_state(&self) -> ErrorState {
        self.last_error_state
    }

    /// Last time a cooldown-governed alert was sent.
    pub fn last_alert_timestamp(&self) -> DateTime<Utc> {
        self.cooldown.latest()
    }

    pub fn cooldown(&self) -> &CooldownClock {
        &self.cooldown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_transitions_against_baseline() {
        assert_eq!(PoolTransition::classify("blue", "blue", "green"), PoolTransition::Failover);
        assert_eq!(PoolTransition::classify("blue", "green", "blue"), PoolTransition::Recovery);
        assert_eq!(PoolTransition::classify("blue", "green", "red"), PoolTransition::Switch);
    }

    #[test]
    fn initial_state_sits_on_baseline() {
        let state = AlertState::new("blue", CooldownScope::Shared, 300);
        assert_eq!(state.last_pool(), "blue");
        assert_eq!(state.active_pool(), "blue");
        assert_eq!(state.last_error_state(), ErrorState::Normal);
        assert_eq!(state.last_alert_timestamp(), DateTime::UNIX_EPOCH);
    }
}
