use crate::NotificationChannel;
use poolwatch_common::types::{AlertEvent, Severity};
use tracing;

/// Sends alerts of at least `min_severity` to the channel at `channel_index`.
pub struct ChannelRoute {
    pub min_severity: Severity,
    pub channel_index: usize,
}

impl ChannelRoute {
    pub fn should_send(&self, event_severity: Severity) -> bool {
        event_severity >= self.min_severity
    }
}

/// Fans an alert out to every routed channel.
///
/// Delivery failures are logged and swallowed; they never propagate to the
/// ingestion loop.
pub struct NotificationManager {
    channels: Vec<Box<dyn NotificationChannel>>,
    routes: Vec<ChannelRoute>,
}

impl NotificationManager {
    pub fn new(channels: Vec<Box<dyn NotificationChannel>>, routes: Vec<ChannelRoute>) -> Self {
        Self { channels, routes }
    }

    /// Routes every alert to every channel.
    pub fn broadcast(channels: Vec<Box<dyn NotificationChannel>>) -> Self {
        let routes = (0..channels.len())
            .map(|channel_index| ChannelRoute {
                min_severity: Severity::Info,
                channel_index,
            })
            .collect();
        Self::new(channels, routes)
    }

    /// Delivers `event` inline and returns how many channels accepted it.
    pub async fn notify(&self, event: &AlertEvent) -> usize {
        let mut delivered = 0;
        for route in &self.routes {
            if !route.should_send(event.severity) {
                continue;
            }

            let Some(channel) = self.channels.get(route.channel_index) else {
                tracing::warn!(index = route.channel_index, "Route points at a missing channel");
                continue;
            };

            match channel.send(event).await {
                Ok(()) => {
                    delivered += 1;
                    tracing::info!(
                        channel = channel.channel_name(),
                        kind = %event.kind,
                        title = %event.title,
                        "Alert sent"
                    );
                }
                Err(e) => {
                    tracing::error!(
                        channel = channel.channel_name(),
                        kind = %event.kind,
                        error = %e,
                        "Failed to send notification"
                    );
                }
            }
        }
        delivered
    }

    pub fn channels(&self) -> &[Box<dyn NotificationChannel>] {
        &self.channels
    }

    pub fn routes(&self) -> &[ChannelRoute] {
        &self.routes
    }
}
