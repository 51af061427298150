//! Network connectivity monitor.

use crate::context::SystemContext;
use crate::module::Module;
use portunus_core::{Event, Result};
use portunus_hardware::Connectivity;
use std::sync::Arc;
use tokio::time::MissedTickBehavior;
use tracing::info;

/// Polls the network link and publishes `ConnectivityUp` /
/// `ConnectivityDown` on transitions. The link is assumed down at start, so
/// a link that is already up produces `ConnectivityUp` on the first poll.
/// Signal strength is mirrored into the device status on every poll.
pub struct ConnectivityMonitor {
    link: Arc<dyn Connectivity>,
}

impl ConnectivityMonitor {
    pub fn new(link: Arc<dyn Connectivity>) -> Self {
        Self { link }
    }
}

impl Module for ConnectivityMonitor {
    fn name(&self) -> &'static str {
        "connectivity"
    }

    fn start(&mut self, ctx: &SystemContext) -> Result<()> {
        let link = Arc::clone(&self.link);
        let ctx_task = ctx.clone();
        let shutdown = ctx.shutdown_token();
        let period = ctx.config.connectivity.poll_interval();

        ctx.spawn("connectivity", async move {
            let mut connected = false;
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let now_connected = link.is_connected();
                let rssi = if now_connected {
                    link.signal_strength()
                } else {
                    None
                };
                ctx_task.status.set_signal_strength(rssi);

                if now_connected == connected {
                    continue;
                }
                connected = now_connected;
                info!(connected, rssi, "Connectivity changed");

                let now = ctx_task.now_us();
                let event = if connected {
                    Event::connectivity_up(now)
                } else {
                    Event::connectivity_down(now)
                };
                let _ = ctx_task.publish(event).await;
            }
        })
    }
}
