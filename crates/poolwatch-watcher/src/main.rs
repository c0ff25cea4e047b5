use anyhow::Result;
use poolwatch_alert::AlertEngine;
use poolwatch_ingest::tail::FileTail;
use poolwatch_notify::plugin::ChannelRegistry;
use poolwatch_watcher::{init_tracing, Watcher, WatcherConfig};
use tokio::signal;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing()?;

    let config_path = std::env::args().nth(1);
    let config = WatcherConfig::load(config_path.as_deref())?;

    tracing::info!(
        log_file = %config.log_file.display(),
        active_pool = %config.active_pool(),
        error_rate_threshold = config.error_rate_threshold,
        window_size = config.window_size,
        cooldown_secs = config.cooldown_secs,
        cooldown_scope = ?config.cooldown_scope,
        "poolwatch starting"
    );

    let notifier = config.build_notifier(&ChannelRegistry::default())?;
    let mut watcher = Watcher::new(AlertEngine::new(config.engine_config()), notifier);

    tokio::select! {
        source = FileTail::follow(&config.log_file, config.tail_options()) => {
            let mut source = source?;
            tokio::select! {
                _ = watcher.run(&mut source) => {}
                _ = signal::ctrl_c() => {
                    tracing::info!("Shutting down gracefully");
                }
            }
        }
        _ = signal::ctrl_c() => {
            tracing::info!("Shutting down before the log file appeared");
        }
    }

    let stats = watcher.stats();
    tracing::info!(
        lines = stats.lines,
        dropped = stats.dropped,
        alerts = stats.alerts,
        delivered = stats.delivered,
        "poolwatch stopped"
    );
    Ok(())
}
