//! Door position monitor.

use crate::context::SystemContext;
use crate::module::Module;
use portunus_core::{Event, Result};
use portunus_hardware::DoorSensor;
use std::sync::Arc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Polls the reed switch and publishes `DoorOpened` / `DoorClosed` on
/// transitions only. The level read at start is the baseline and produces
/// no event.
pub struct DoorSensorMonitor {
    sensor: Arc<dyn DoorSensor>,
}

impl DoorSensorMonitor {
    pub fn new(sensor: Arc<dyn DoorSensor>) -> Self {
        Self { sensor }
    }
}

impl Module for DoorSensorMonitor {
    fn name(&self) -> &'static str {
        "door_sensor"
    }

    fn start(&mut self, ctx: &SystemContext) -> Result<()> {
        if !ctx.config.door.enabled {
            debug!("Door sensor disabled");
            return Ok(());
        }

        let sensor = Arc::clone(&self.sensor);
        let ctx_task = ctx.clone();
        let shutdown = ctx.shutdown_token();
        let period = ctx.config.door.poll_interval();

        ctx.spawn("door_sensor", async move {
            let mut last_open = sensor.door_sensor_level();
            ctx_task.status.set_door_open(last_open);

            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let open = sensor.door_sensor_level();
                if open == last_open {
                    continue;
                }
                last_open = open;
                ctx_task.status.set_door_open(open);
                info!(open, "Door state changed");

                let now = ctx_task.now_us();
                let event = if open {
                    Event::door_opened(now)
                } else {
                    Event::door_closed(now)
                };
                let _ = ctx_task.publish(event).await;
            }
        })
    }
}
