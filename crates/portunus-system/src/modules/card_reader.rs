//! Card reader module: owns the MFRC522 and its poll task.

use crate::context::SystemContext;
use crate::module::Module;
use portunus_core::{Error, Event, Result};
use portunus_hardware::{Delay, RegisterBus};
use portunus_rfid::{CardPoller, Mfrc522, PollOutcome};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Brings the reader up in `initialize` and moves it into the poll task in
/// `start`.
///
/// The poll task reads at the configured interval, debounces repeated reads
/// of the same card and publishes `CardScanned` for each new presentation.
/// An empty field is silent; any other driver failure is logged, recorded as
/// the last error and polling continues.
pub struct CardReader<B, D> {
    reader: Option<Mfrc522<B, D>>,
}

impl<B, D> CardReader<B, D>
where
    B: RegisterBus + 'static,
    D: Delay + 'static,
{
    pub fn new(reader: Mfrc522<B, D>) -> Self {
        Self {
            reader: Some(reader),
        }
    }
}

impl<B, D> Module for CardReader<B, D>
where
    B: RegisterBus + 'static,
    D: Delay + 'static,
{
    fn name(&self) -> &'static str {
        "card_reader"
    }

    fn initialize(&mut self) -> Result<()> {
        let reader = self
            .reader
            .as_mut()
            .ok_or_else(|| Error::AlreadyInitialized("card reader".to_string()))?;
        reader.initialize()?;
        Ok(())
    }

    fn start(&mut self, ctx: &SystemContext) -> Result<()> {
        let reader = self
            .reader
            .take()
            .ok_or_else(|| Error::AlreadyInitialized("card reader poll task".to_string()))?;

        let config = ctx.config.reader.clone();
        let mut poller = CardPoller::new(reader, config.dedupe_window());
        let ctx_task = ctx.clone();
        let shutdown = ctx.shutdown_token();

        ctx.spawn("card_poll", async move {
            info!(
                interval_ms = config.poll_interval_ms,
                dedupe_ms = config.dedupe_window_ms,
                "Card polling started"
            );
            loop {
                // Register traffic blocks on the serial bus.
                let now = Instant::now();
                let step = tokio::task::spawn_blocking(move || {
                    let outcome = poller.poll_once(now);
                    (poller, outcome)
                })
                .await;
                let outcome = match step {
                    Ok((returned, outcome)) => {
                        poller = returned;
                        outcome
                    }
                    Err(e) => {
                        error!(error = %e, "Card poll step aborted");
                        break;
                    }
                };
                match &outcome {
                    PollOutcome::Scanned(uid) => {
                        info!(uid = %uid, "Card scanned");
                        let event = Event::card_scanned(
                            ctx_task.now_us(),
                            *uid,
                            ctx_task.uptime.now_ms(),
                        );
                        let _ = ctx_task.publish(event).await;
                    }
                    PollOutcome::Suppressed(uid) => debug!(uid = %uid, "Repeated read suppressed"),
                    PollOutcome::Idle => {}
                    PollOutcome::Failed(e) => {
                        warn!(error = %e, code = e.code(), "Card read failed");
                        ctx_task.status.record_error(e);
                    }
                }

                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(outcome.pause(&config)) => {}
                }
            }
            debug!("Card polling stopped");
        })
    }
}
