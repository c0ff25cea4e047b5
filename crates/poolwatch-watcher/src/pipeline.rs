use chrono::{DateTime, Utc};
use poolwatch_alert::AlertEngine;
use poolwatch_ingest::{parse_line, LogSource, ParseError};
use poolwatch_notify::manager::NotificationManager;
use std::time::Duration;

/// Pause before reading again after the source reported an I/O error.
const SOURCE_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Characters of a raw line echoed into debug logs.
const LINE_PREVIEW_CHARS: usize = 100;

/// What happened to one input line.
#[derive(Debug, PartialEq, Eq)]
pub enum LineOutcome {
    /// Blank after trimming.
    Skipped,
    /// Rejected by the parser; no state changed.
    Dropped(ParseError),
    Processed { alerts: usize, delivered: usize },
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunStats {
    pub lines: u64,
    pub skipped: u64,
    pub dropped: u64,
    pub alerts: u64,
    pub delivered: u64,
}

/// The ingestion loop: one line is parsed, evaluated and its alerts
/// delivered before the next line is read.
pub struct Watcher {
    engine: AlertEngine,
    notifier: NotificationManager,
    stats: RunStats,
}

impl Watcher {
    pub fn new(engine: AlertEngine, notifier: NotificationManager) -> Self {
        Self {
            engine,
            notifier,
            stats: RunStats::default(),
        }
    }

    pub fn engine(&self) -> &AlertEngine {
        &self.engine
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub async fn handle_line(&mut self, line: &str) -> LineOutcome {
        self.handle_line_at(line, Utc::now()).await
    }

    pub async fn handle_line_at(&mut self, line: &str, now: DateTime<Utc>) -> LineOutcome {
        self.stats.lines += 1;
        let line = line.trim();
        if line.is_empty() {
            self.stats.skipped += 1;
            return LineOutcome::Skipped;
        }

        tracing::debug!(
            line = %line.chars().take(LINE_PREVIEW_CHARS).collect::<String>(),
            "Processing"
        );

        let record = match parse_line(line) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(error = %e, "Parse error, line dropped");
                self.stats.dropped += 1;
                return LineOutcome::Dropped(e);
            }
        };

        let events = self.engine.process_record(&record, now);
        let mut delivered = 0;
        for event in &events {
            delivered += self.notifier.notify(event).await;
        }

        self.stats.alerts += events.len() as u64;
        self.stats.delivered += delivered as u64;
        LineOutcome::Processed {
            alerts: events.len(),
            delivered,
        }
    }

    /// Reads `source` until it ends. Live sources never end, so this only
    /// returns for finite sources; source I/O errors are logged and retried.
    pub async fn run<S>(&mut self, source: &mut S) -> RunStats
    where
        S: LogSource + ?Sized,
    {
        tracing::info!(source = %source.describe(), "Monitoring");
        loop {
            match source.next_line().await {
                Ok(Some(line)) => {
                    self.handle_line(&line).await;
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::error!(error = %e, "Log source read failed, retrying");
                    tokio::time::sleep(SOURCE_RETRY_DELAY).await;
                }
            }
        }
        tracing::info!(
            lines = self.stats.lines,
            dropped = self.stats.dropped,
            alerts = self.stats.alerts,
            delivered = self.stats.delivered,
            "Log source exhausted"
        );
        self.stats.clone()
    }
}
