//! Event record exchanged between every component.
//!
//! An [`Event`] is the sole cross-component data contract: a discriminant, a
//! monotonic timestamp, three scalar arguments and an optional UID. It is
//! `Copy` plain data, so publishing an event moves a fixed-size value through
//! the bus and never transfers ownership of heap memory.
//!
//! # Argument conventions
//!
//! | Kind | `arg0` | `arg1` | `uid` |
//! |------|--------|--------|-------|
//! | `CardScanned` | uptime ms | | card |
//! | `DoorOpened` / `DoorClosed` | 1 / 0 | | |
//! | `AccessRequest` | uptime ms | | card |
//! | `AuthResult` | 1 granted / 0 denied | unlock ms | optional |
//! | `UnlockRequested` | unlock ms | | |
//! | `Feedback` | [`FeedbackKind`] code | | |

use crate::{Result, Uid, error::Error};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Event discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum EventKind {
    Boot = 0,
    ConnectivityUp,
    ConnectivityDown,
    CardScanned,
    DoorOpened,
    DoorClosed,
    AccessRequest,
    AuthResult,
    UnlockRequested,
    LockRequested,
    Feedback,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventKind::Boot => "Boot",
            EventKind::ConnectivityUp => "ConnectivityUp",
            EventKind::ConnectivityDown => "ConnectivityDown",
            EventKind::CardScanned => "CardScanned",
            EventKind::DoorOpened => "DoorOpened",
            EventKind::DoorClosed => "DoorClosed",
            EventKind::AccessRequest => "AccessRequest",
            EventKind::AuthResult => "AuthResult",
            EventKind::UnlockRequested => "UnlockRequested",
            EventKind::LockRequested => "LockRequested",
            EventKind::Feedback => "Feedback",
        };
        f.write_str(name)
    }
}

/// User-facing feedback requested by the policy layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum FeedbackKind {
    Armed = 0,
    Online,
    Offline,
    AccessGranted,
    AccessDenied,
    Error,
}

impl FeedbackKind {
    /// Wire code carried in `arg0`.
    pub fn code(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u32> for FeedbackKind {
    type Error = Error;

    fn try_from(code: u32) -> Result<Self> {
        Ok(match code {
            0 => Self::Armed,
            1 => Self::Online,
            2 => Self::Offline,
            3 => Self::AccessGranted,
            4 => Self::AccessDenied,
            5 => Self::Error,
            other => {
                return Err(Error::InvalidArgument(format!(
                    "Unknown feedback code {other}"
                )));
            }
        })
    }
}

/// Fixed-size event record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    /// Discriminant.
    pub kind: EventKind,

    /// Monotonic uptime in microseconds when the event was created.
    pub timestamp_us: u64,

    /// Discriminant-dependent scalar arguments.
    pub args: [u32; 3],

    /// Card identifier for card-related events.
    pub uid: Option<Uid>,
}

impl Event {
    /// Create an event with no arguments.
    pub fn new(kind: EventKind, timestamp_us: u64) -> Self {
        Self {
            kind,
            timestamp_us,
            args: [0; 3],
            uid: None,
        }
    }

    /// Set `arg0`.
    pub fn with_arg0(mut self, value: u32) -> Self {
        self.args[0] = value;
        self
    }

    /// Set `arg1`.
    pub fn with_arg1(mut self, value: u32) -> Self {
        self.args[1] = value;
        self
    }

    /// Attach a UID.
    pub fn with_uid(mut self, uid: Uid) -> Self {
        self.uid = Some(uid);
        self
    }

    pub fn boot(timestamp_us: u64) -> Self {
        Self::new(EventKind::Boot, timestamp_us)
    }

    pub fn connectivity_up(timestamp_us: u64) -> Self {
        Self::new(EventKind::ConnectivityUp, timestamp_us)
    }

    pub fn connectivity_down(timestamp_us: u64) -> Self {
        Self::new(EventKind::ConnectivityDown, timestamp_us)
    }

    /// A card read by the poll task, stamped with uptime in milliseconds.
    pub fn card_scanned(timestamp_us: u64, uid: Uid, uptime_ms: u32) -> Self {
        Self::new(EventKind::CardScanned, timestamp_us)
            .with_uid(uid)
            .with_arg0(uptime_ms)
    }

    pub fn door_opened(timestamp_us: u64) -> Self {
        Self::new(EventKind::DoorOpened, timestamp_us).with_arg0(1)
    }

    pub fn door_closed(timestamp_us: u64) -> Self {
        Self::new(EventKind::DoorClosed, timestamp_us).with_arg0(0)
    }

    /// Result of a remote access decision.
    pub fn auth_result(timestamp_us: u64, granted: bool, unlock_ms: u32) -> Self {
        Self::new(EventKind::AuthResult, timestamp_us)
            .with_arg0(u32::from(granted))
            .with_arg1(unlock_ms)
    }

    pub fn unlock_requested(timestamp_us: u64, unlock_ms: u32) -> Self {
        Self::new(EventKind::UnlockRequested, timestamp_us).with_arg0(unlock_ms)
    }

    pub fn lock_requested(timestamp_us: u64) -> Self {
        Self::new(EventKind::LockRequested, timestamp_us)
    }

    pub fn feedback(timestamp_us: u64, kind: FeedbackKind) -> Self {
        Self::new(EventKind::Feedback, timestamp_us).with_arg0(kind.code())
    }

    /// Copy of this event re-tagged with another discriminant.
    ///
    /// Arguments and UID are preserved, which is how a `CardScanned` is
    /// republished as an `AccessRequest`.
    pub fn retagged(self, kind: EventKind) -> Self {
        Self { kind, ..self }
    }

    /// Feedback kind, for `Feedback` events.
    pub fn feedback_kind(&self) -> Option<FeedbackKind> {
        (self.kind == EventKind::Feedback)
            .then(|| FeedbackKind::try_from(self.args[0]).ok())
            .flatten()
    }

    /// Unlock duration, for `UnlockRequested` events.
    pub fn unlock_ms(&self) -> Option<u32> {
        (self.kind == EventKind::UnlockRequested).then_some(self.args[0])
    }

    /// Grant flag and unlock duration, for `AuthResult` events.
    pub fn auth_decision(&self) -> Option<(bool, u32)> {
        (self.kind == EventKind::AuthResult).then_some((self.args[0] != 0, self.args[1]))
    }
}
