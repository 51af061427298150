//! Remote status reporting.
//!
//! Subscribes to `CardScanned`, `AccessRequest` and `Feedback`. The
//! subscriber callbacks run on the consumer task, so they only copy the
//! event into the reporter's own bounded queue with `try_send`; a full queue
//! drops the record with a warning. A separate drain task is the only place
//! that talks to the [`ReportSink`].
//!
//! A heartbeat task produces one [`Heartbeat`] per interval while the
//! network is up. Heartbeats go through the same queue, so records reach the
//! sink in the order they were produced.

use crate::context::SystemContext;
use crate::module::Module;
use crate::reporting::{EventRecord, Heartbeat, ReportRecord, ReportSink};
use portunus_core::{Error, EventKind, Result};
use portunus_hardware::Connectivity;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use uuid::Uuid;

const REPORTED_KINDS: [EventKind; 3] = [
    EventKind::CardScanned,
    EventKind::AccessRequest,
    EventKind::Feedback,
];

/// Heartbeat and event reporter.
pub struct Reporter {
    sink: Arc<dyn ReportSink>,
    link: Arc<dyn Connectivity>,
    boot_id: Uuid,
    started: bool,
}

impl Reporter {
    pub fn new(sink: Arc<dyn ReportSink>, link: Arc<dyn Connectivity>) -> Self {
        Self {
            sink,
            link,
            boot_id: Uuid::new_v4(),
            started: false,
        }
    }

    /// Identifier of this process run, carried by every record.
    pub fn boot_id(&self) -> Uuid {
        self.boot_id
    }
}

fn enqueue(tx: &mpsc::Sender<ReportRecord>, record: ReportRecord) {
    match tx.try_send(record) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => warn!("Report queue full, record dropped"),
        Err(TrySendError::Closed(_)) => debug!("Report queue closed"),
    }
}

impl Module for Reporter {
    fn name(&self) -> &'static str {
        "reporter"
    }

    fn start(&mut self, ctx: &SystemContext) -> Result<()> {
        if self.started {
            return Err(Error::AlreadyInitialized("reporter".to_string()));
        }

        let settings = ctx.config.reporting.clone();
        if settings.queue_length == 0 {
            return Err(Error::QueueCreateFailed(
                "report queue length must be non-zero".to_string(),
            ));
        }
        let (tx, mut rx) = mpsc::channel::<ReportRecord>(settings.queue_length);

        for kind in REPORTED_KINDS {
            let tx = tx.clone();
            let module_id = settings.module_id.clone();
            let boot_id = self.boot_id;
            ctx.subscribe(kind, move |event| {
                let record = EventRecord::from_event(&module_id, boot_id, event);
                enqueue(&tx, ReportRecord::Event(record));
            })?;
        }

        let sink = Arc::clone(&self.sink);
        let status = ctx.status.clone();
        let shutdown = ctx.shutdown_token();
        ctx.spawn("report_sink", async move {
            loop {
                let record = tokio::select! {
                    _ = shutdown.cancelled() => break,
                    record = rx.recv() => match record {
                        Some(record) => record,
                        None => break,
                    },
                };
                if let Err(e) = sink.deliver(&record) {
                    warn!(error = %e, "Report delivery failed");
                    status.record_error(&e);
                }
            }

            // Flush what was already queued.
            while let Ok(record) = rx.try_recv() {
                if let Err(e) = sink.deliver(&record) {
                    warn!(error = %e, "Report delivery failed during shutdown");
                }
            }
            debug!("Report sink stopped");
        })?;

        let link = Arc::clone(&self.link);
        let ctx_task = ctx.clone();
        let shutdown = ctx.shutdown_token();
        let boot_id = self.boot_id;
        let period = settings.heartbeat_interval();
        ctx.spawn("heartbeat", async move {
            let mut seq: u64 = 0;
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                if !link.is_connected() {
                    debug!("Offline, heartbeat skipped");
                    continue;
                }

                seq += 1;
                let beat = Heartbeat::new(
                    &settings.module_id,
                    boot_id,
                    seq,
                    ctx_task.now_us() / 1_000,
                    &ctx_task.status.snapshot(),
                );
                debug!(seq, "Heartbeat");
                enqueue(&tx, ReportRecord::Heartbeat(beat));
            }
        })?;

        self.started = true;
        info!(boot_id = %self.boot_id, module_id = %ctx.config.reporting.module_id, "Reporter started");
        Ok(())
    }
}
