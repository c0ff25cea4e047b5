use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Pool value used when a line carries no `pool=` token.
pub const UNKNOWN_POOL: &str = "unknown";

/// Pool value nginx writes when the variable was empty.
pub const EMPTY_POOL: &str = "-";

/// A field the parser looks for in an access-log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Pool,
    UpstreamStatus,
    Request,
}

impl Field {
    /// Fields every well-formed line must carry.
    pub const REQUIRED: [Field; 3] = [Field::Pool, Field::UpstreamStatus, Field::Request];

    fn bit(self) -> u8 {
        match self {
            Field::Pool => 0b001,
            Field::UpstreamStatus => 0b010,
            Field::Request => 0b100,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Field::Pool => "pool",
            Field::UpstreamStatus => "upstream_status",
            Field::Request => "request",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of [`Field`]s seen on one line.
///
/// # Examples
///
/// ```
/// use poolwatch_common::types::{Field, FieldSet};
///
/// let mut set = FieldSet::default();
/// set.insert(Field::Pool);
/// assert!(set.contains(Field::Pool));
/// assert!(!set.is_complete());
/// assert_eq!(set.missing(), vec![Field::UpstreamStatus, Field::Request]);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FieldSet(u8);

impl FieldSet {
    pub fn all() -> Self {
        Field::REQUIRED.into_iter().collect()
    }

    pub fn insert(&mut self, field: Field) {
        self.0 |= field.bit();
    }

    pub fn contains(&self, field: Field) -> bool {
        self.0 & field.bit() != 0
    }

    /// True when every field in [`Field::REQUIRED`] is present.
    pub fn is_complete(&self) -> bool {
        Field::REQUIRED.iter().all(|f| self.contains(*f))
    }

    pub fn missing(&self) -> Vec<Field> {
        Field::REQUIRED
            .into_iter()
            .filter(|f| !self.contains(*f))
            .collect()
    }
}

impl FromIterator<Field> for FieldSet {
    fn from_iter<I: IntoIterator<Item = Field>>(iter: I) -> Self {
        let mut set = FieldSet::default();
        for field in iter {
            set.insert(field);
        }
        set
    }
}

/// One parsed access-log line. Transient: consumed once by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub pool: String,
    /// Upstream status; `0` means no upstream answered.
    pub status: u16,
    pub fields_present: FieldSet,
}

impl LogRecord {
    pub fn is_server_error(&self) -> bool {
        is_server_error(self.status)
    }

    pub fn is_unreachable(&self) -> bool {
        self.status == 0
    }

    /// Whether the pool value names a real backend group.
    pub fn has_known_pool(&self) -> bool {
        !self.pool.is_empty() && self.pool != UNKNOWN_POOL && self.pool != EMPTY_POOL
    }
}

/// `5xx` status codes count as errors for the rolling error rate.
pub fn is_server_error(status: u16) -> bool {
    (500..600).contains(&status)
}

/// Alert severity level, ordered from lowest to highest.
///
/// # Examples
///
/// ```
/// use poolwatch_common::types::Severity;
///
/// let sev: Severity = "warning".parse().unwrap();
/// assert_eq!(sev, Severity::Warning);
/// assert_eq!(sev.to_string(), "warning");
/// assert!(Severity::Critical > Severity::Info);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "warning" => Ok(Severity::Warning),
            "critical" => Ok(Severity::Critical),
            _ => Err(format!("unknown severity: {s}")),
        }
    }
}

/// Every transition the alert engine can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    UnreachableEndpoint,
    HeaderAnomaly,
    Failover,
    Recovery,
    PoolSwitch,
    ErrorRateElevated,
    ErrorRateRecovered,
    DataQuality,
}

impl AlertKind {
    pub const ALL: [AlertKind; 8] = [
        AlertKind::UnreachableEndpoint,
        AlertKind::HeaderAnomaly,
        AlertKind::Failover,
        AlertKind::Recovery,
        AlertKind::PoolSwitch,
        AlertKind::ErrorRateElevated,
        AlertKind::ErrorRateRecovered,
        AlertKind::DataQuality,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AlertKind::UnreachableEndpoint => "unreachable_endpoint",
            AlertKind::HeaderAnomaly => "header_anomaly",
            AlertKind::Failover => "failover",
            AlertKind::Recovery => "recovery",
            AlertKind::PoolSwitch => "pool_switch",
            AlertKind::ErrorRateElevated => "error_rate_elevated",
            AlertKind::ErrorRateRecovered => "error_rate_recovered",
            AlertKind::DataQuality => "data_quality",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            AlertKind::UnreachableEndpoint => "Upstream Unreachable",
            AlertKind::HeaderAnomaly => "Header Anomaly Detected",
            AlertKind::Failover => "Failover Detected",
            AlertKind::Recovery => "Recovery Detected",
            AlertKind::PoolSwitch => "Pool Switch Detected",
            AlertKind::ErrorRateElevated => "Error Rate Detected",
            AlertKind::ErrorRateRecovered => "Error Rate Recovered",
            AlertKind::DataQuality => "Log Data Quality Degraded",
        }
    }

    pub fn severity(self) -> Severity {
        match self {
            AlertKind::UnreachableEndpoint
            | AlertKind::Failover
            | AlertKind::ErrorRateElevated => Severity::Critical,
            AlertKind::HeaderAnomaly | AlertKind::PoolSwitch | AlertKind::DataQuality => {
                Severity::Warning
            }
            AlertKind::Recovery | AlertKind::ErrorRateRecovered => Severity::Info,
        }
    }

    /// Kinds that fire regardless of the cooldown clock and never move it.
    pub fn bypasses_cooldown(self) -> bool {
        matches!(
            self,
            AlertKind::UnreachableEndpoint | AlertKind::HeaderAnomaly | AlertKind::DataQuality
        )
    }
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An alert decided by the engine, ready for delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub kind: AlertKind,
    pub severity: Severity,
    pub title: String,
    pub body: String,
    /// Extra `key: value` lines, kept in insertion order.
    pub fields: Vec<(String, String)>,
    pub timestamp: DateTime<Utc>,
}

impl AlertEvent {
    pub fn new(kind: AlertKind, body: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind,
            severity: kind.severity(),
            title: kind.title().to_string(),
            body: body.into(),
            fields: Vec::new(),
            timestamp,
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((key.into(), value.into()));
        self
    }

    /// Appends the `Timestamp` field every outbound alert carries.
    pub fn stamped(self) -> Self {
        let ts = format_timestamp(self.timestamp);
        self.with_field("Timestamp", ts)
    }

    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Renders the outbound message: title line, body line, then one
    /// `key: value` line per field.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::Utc;
    /// use poolwatch_common::types::{AlertEvent, AlertKind};
    ///
    /// let event = AlertEvent::new(AlertKind::Failover, "Pool switched from blue → green", Utc::now())
    ///     .with_field("From", "blue");
    /// assert_eq!(
    ///     event.render_text(),
    ///     "Failover Detected\nPool switched from blue → green\nFrom: blue"
    /// );
    /// ```
    pub fn render_text(&self) -> String {
        let mut text = format!("{}\n{}", self.title, self.body);
        for (key, value) in &self.fields {
            text.push('\n');
            text.push_str(key);
            text.push_str(": ");
            text.push_str(value);
        }
        text
    }
}

/// RFC 3339 with microseconds and a `Z` suffix.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}
