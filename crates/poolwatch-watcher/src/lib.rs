//! Host side of poolwatch: configuration and the single-threaded loop that
//! reads access-log lines, runs them through the alert engine and hands the
//! resulting alerts to the notification channels.

pub mod config;
pub mod pipeline;

pub use config::WatcherConfig;
pub use pipeline::{LineOutcome, RunStats, Watcher};

/// Installs the `tracing` subscriber; `RUST_LOG` overrides the default level.
pub fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("poolwatch=info".parse()?))
        .init();
    Ok(())
}
