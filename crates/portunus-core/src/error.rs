//! System-wide error taxonomy.
//!
//! Errors are grouped by the layer they originate from so that the source of
//! a failure can be identified from its numeric code alone:
//!
//! | Origin  | Code range | Examples |
//! |---------|------------|----------|
//! | Driver  | `0x1000`   | `NoCard`, `Collision`, `ReadFailure` |
//! | Service | `0x2000`   | `QueueFull`, `TooManySubscribers` |
//! | Module  | `0x3000`   | `InvalidArgument`, `OperationTimedOut` |
//!
//! Driver errors are expected in normal operation and are handled locally by
//! the card poll task. Service errors report bus and task lifecycle problems.

use thiserror::Error;

/// Layer an [`Error`] originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorOrigin {
    /// Card reader chip and its serial bus.
    Driver,
    /// Event bus and task lifecycle.
    Service,
    /// Reactive modules and configuration.
    Module,
}

/// Base code for driver errors.
pub const ERR_BASE_DRIVER: u32 = 0x1000;
/// Base code for service errors.
pub const ERR_BASE_SERVICE: u32 = 0x2000;
/// Base code for module errors.
pub const ERR_BASE_MODULE: u32 = 0x3000;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // Driver errors
    /// No card answered the request. This is the idle steady state.
    #[error("No card in reader field")]
    NoCard,

    #[error("Anti-collision failure (multiple cards in field)")]
    Collision,

    #[error("Card read failed: {0}")]
    ReadFailure(String),

    #[error("Reader operation timed out: {0}")]
    Timeout(String),

    #[error("Reader not detected (version register 0x{version:02X})")]
    DeviceNotFound { version: u8 },

    #[error("Serial bus transfer failed: {0}")]
    BusTransfer(String),

    // Service errors
    #[error("Event queue full")]
    QueueFull,

    #[error("Failed to create event queue: {0}")]
    QueueCreateFailed(String),

    #[error("Subscriber table full ({capacity} entries)")]
    TooManySubscribers { capacity: usize },

    #[error("Failed to start task: {0}")]
    TaskCreateFailed(String),

    #[error("{0} already initialized")]
    AlreadyInitialized(String),

    #[error("{0} not initialized")]
    NotInitialized(String),

    // Module errors
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Operation timed out after {duration_ms}ms")]
    OperationTimedOut { duration_ms: u64 },

    #[error("Report delivery failed: {0}")]
    ReportFailed(String),
}

impl Error {
    /// Layer this error originates from.
    pub fn origin(&self) -> ErrorOrigin {
        match self {
            Self::NoCard
            | Self::Collision
            | Self::ReadFailure(_)
            | Self::Timeout(_)
            | Self::DeviceNotFound { .. }
            | Self::BusTransfer(_) => ErrorOrigin::Driver,
            Self::QueueFull
            | Self::QueueCreateFailed(_)
            | Self::TooManySubscribers { .. }
            | Self::TaskCreateFailed(_)
            | Self::AlreadyInitialized(_)
            | Self::NotInitialized(_) => ErrorOrigin::Service,
            Self::InvalidArgument(_)
            | Self::OperationTimedOut { .. }
            | Self::ReportFailed(_) => ErrorOrigin::Module,
        }
    }

    /// Stable numeric code, recorded as the device's last error.
    pub fn code(&self) -> u32 {
        match self {
            Self::BusTransfer(_) => ERR_BASE_DRIVER + 0x02,
            Self::DeviceNotFound { .. } => ERR_BASE_DRIVER + 0x03,
            Self::ReadFailure(_) => ERR_BASE_DRIVER + 0x04,
            Self::Collision => ERR_BASE_DRIVER + 0x05,
            Self::NoCard => ERR_BASE_DRIVER + 0x06,
            Self::Timeout(_) => ERR_BASE_DRIVER + 0x07,
            Self::QueueFull => ERR_BASE_SERVICE + 0x01,
            Self::QueueCreateFailed(_) => ERR_BASE_SERVICE + 0x02,
            Self::TooManySubscribers { .. } => ERR_BASE_SERVICE + 0x04,
            Self::TaskCreateFailed(_) => ERR_BASE_SERVICE + 0x05,
            Self::AlreadyInitialized(_) => ERR_BASE_SERVICE + 0x06,
            Self::NotInitialized(_) => ERR_BASE_SERVICE + 0x07,
            Self::InvalidArgument(_) => ERR_BASE_MODULE + 0x01,
            Self::OperationTimedOut { .. } => ERR_BASE_MODULE + 0x02,
            Self::ReportFailed(_) => ERR_BASE_MODULE + 0x03,
        }
    }

    /// Whether this error is the expected "nothing to read" condition.
    pub fn is_no_card(&self) -> bool {
        matches!(self, Self::NoCard)
    }

    /// Whether a failure of this kind must abort system bring-up.
    pub fn is_fatal_at_startup(&self) -> bool {
        matches!(
            self,
            Self::QueueCreateFailed(_) | Self::TaskCreateFailed(_) | Self::InvalidArgument(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
