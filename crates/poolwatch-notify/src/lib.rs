//! Alert delivery with pluggable channels.
//!
//! Alert events are routed to one or more [`NotificationChannel`]
//! implementations based on severity. Delivery is fire-and-forget: a failed
//! send is logged by the [`manager::NotificationManager`] and never reaches
//! the caller as an error.

pub mod channels;
pub mod error;
pub mod manager;
pub mod plugin;
pub mod utils;


use async_trait::async_trait;
use poolwatch_common::types::AlertEvent;

/// A notification delivery channel that sends alert events to an external
/// service (e.g. a chat webhook) or to the process log.
///
/// Implementations are created by the corresponding [`plugin::ChannelPlugin`]
/// and registered in the notification manager's routing table.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Delivers the alert event through this channel. No retries.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is unreachable or answers with a
    /// non-success status.
    async fn send(&self, alert: &AlertEvent) -> error::Result<()>;

    /// Returns the channel type name (e.g., `"webhook"`, `"log"`).
    fn channel_name(&self) -> &str;
}
