//! Status records for the remote service.
//!
//! The endpoint reports two kinds of record:
//!
//! - [`Heartbeat`]: periodic device status.
//! - [`EventRecord`]: a copy of a card or feedback event.
//!
//! Both are serialised as tagged JSON. Delivery is pluggable through
//! [`ReportSink`]; the transport that carries records off the device lives
//! behind that trait.
//!
//! ```
//! use portunus_system::reporting::{MemorySink, ReportSink, ReportRecord, Heartbeat};
//! use portunus_system::device_state::DeviceSnapshot;
//! use uuid::Uuid;
//!
//! let sink = MemorySink::new();
//! let beat = Heartbeat::new("door-01", Uuid::nil(), 1, 30_000, &DeviceSnapshot::default());
//! sink.deliver(&ReportRecord::Heartbeat(beat)).unwrap();
//!
//! let json = serde_json::to_value(&sink.records()[0]).unwrap();
//! assert_eq!(json["type"], "heartbeat");
//! assert_eq!(json["seq"], 1);
//! ```

use crate::device_state::DeviceSnapshot;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use portunus_core::{Error, Event, EventKind, FeedbackKind, Result, constants::FW_VERSION};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Periodic device status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heartbeat {
    pub module_id: String,
    /// Random per process start, so the server can tell reboots apart.
    pub boot_id: Uuid,
    pub seq: u64,
    pub uptime_ms: u64,
    pub fw_version: String,
    pub wifi_rssi: Option<i32>,
    pub strike_unlocked: bool,
    pub door_open: bool,
    pub last_error: u32,
    pub sent_at: DateTime<Utc>,
}

impl Heartbeat {
    pub fn new(
        module_id: &str,
        boot_id: Uuid,
        seq: u64,
        uptime_ms: u64,
        status: &DeviceSnapshot,
    ) -> Self {
        Self {
            module_id: module_id.to_string(),
            boot_id,
            seq,
            uptime_ms,
            fw_version: FW_VERSION.to_string(),
            wifi_rssi: status.signal_strength,
            strike_unlocked: status.strike_unlocked,
            door_open: status.door_open,
            last_error: status.last_error,
            sent_at: Utc::now(),
        }
    }
}

/// Copy of one bus event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub module_id: String,
    pub boot_id: Uuid,
    pub kind: EventKind,
    pub timestamp_us: u64,
    pub args: [u32; 3],
    /// Card UID in `04:A3:2B:11` form.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<FeedbackKind>,
    pub recorded_at: DateTime<Utc>,
}

impl EventRecord {
    pub fn from_event(module_id: &str, boot_id: Uuid, event: &Event) -> Self {
        Self {
            module_id: module_id.to_string(),
            boot_id,
            kind: event.kind,
            timestamp_us: event.timestamp_us,
            args: event.args,
            uid: event.uid.map(|uid| uid.to_string()),
            feedback: event.feedback_kind(),
            recorded_at: Utc::now(),
        }
    }
}

/// Anything sent to the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReportRecord {
    Heartbeat(Heartbeat),
    Event(EventRecord),
}

/// Destination for report records.
///
/// Called from the reporter's drain task, never from the bus consumer. A
/// slow sink only backs up the report queue.
pub trait ReportSink: Send + Sync {
    fn deliver(&self, record: &ReportRecord) -> Result<()>;
}

/// Logs each record as JSON through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl ReportSink for LogSink {
    fn deliver(&self, record: &ReportRecord) -> Result<()> {
        let json = serde_json::to_string(record).map_err(|e| Error::ReportFailed(e.to_string()))?;
        info!(target: "portunus::report", "{}", json);
        Ok(())
    }
}

/// Writes one JSON document per line.
pub struct JsonLinesSink<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl<W: Write + Send> ReportSink for JsonLinesSink<W> {
    fn deliver(&self, record: &ReportRecord) -> Result<()> {
        let mut writer = self.writer.lock();
        serde_json::to_writer(&mut *writer, record)
            .map_err(|e| Error::ReportFailed(e.to_string()))?;
        writeln!(writer)
            .and_then(|_| writer.flush())
            .map_err(|e| Error::ReportFailed(e.to_string()))
    }
}

/// Keeps every record in memory.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<ReportRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<ReportRecord> {
        self.records.lock().clone()
    }

    pub fn heartbeats(&self) -> Vec<Heartbeat> {
        self.records
            .lock()
            .iter()
            .filter_map(|r| match r {
                ReportRecord::Heartbeat(h) => Some(h.clone()),
                ReportRecord::Event(_) => None,
            })
            .collect()
    }

    pub fn events(&self) -> Vec<EventRecord> {
        self.records
            .lock()
            .iter()
            .filter_map(|r| match r {
                ReportRecord::Event(e) => Some(e.clone()),
                ReportRecord::Heartbeat(_) => None,
            })
            .collect()
    }
}

impl ReportSink for MemorySink {
    fn deliver(&self, record: &ReportRecord) -> Result<()> {
        self.records.lock().push(record.clone());
        Ok(())
    }
}
