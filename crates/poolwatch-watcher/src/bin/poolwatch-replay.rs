//! Replays a saved access log through the alert engine and prints every
//! alert to the log instead of delivering it.
//!
//! Usage: `poolwatch-replay <access.log> [config.toml]`
//!
//! Alerts are timed by the wall clock, so set `ALERT_COOLDOWN_SEC=0` to see
//! every transition the log contains.

use anyhow::{bail, Context, Result};
use poolwatch_alert::AlertEngine;
use poolwatch_ingest::source::LinesSource;
use poolwatch_notify::channels::log::LogChannel;
use poolwatch_notify::manager::NotificationManager;
use poolwatch_watcher::{init_tracing, Watcher, WatcherConfig};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing()?;

    let mut args = std::env::args().skip(1);
    let Some(log_path) = args.next() else {
        bail!("usage: poolwatch-replay <access.log> [config.toml]");
    };
    let config = WatcherConfig::load(args.next().as_deref())?;

    let text = tokio::fs::read_to_string(&log_path)
        .await
        .with_context(|| format!("reading {log_path}"))?;
    let mut source = LinesSource::from_text(&text);

    let notifier = NotificationManager::broadcast(vec![Box::new(LogChannel)]);
    let mut watcher = Watcher::new(AlertEngine::new(config.engine_config()), notifier);
    let stats = watcher.run(&mut source).await;

    let engine = watcher.engine();
    println!("lines:          {}", stats.lines);
    println!("skipped:        {}", stats.skipped);
    println!("dropped:        {}", stats.dropped);
    println!("alerts:         {}", stats.alerts);
    println!("error rate:     {:.2}%", engine.window().error_rate());
    println!("missing ratio:  {:.2}", engine.completeness().missing_ratio());
    println!("last pool:      {}", engine.state().last_pool());
    println!("error state:    {}", engine.state().last_error_state());
    Ok(())
}
