//! Core constants for the Portunus door access endpoint.
//!
//! Defaults here mirror the values the firmware ships with. Every timing and
//! sizing value can be overridden through [`SystemConfig`](crate::SystemConfig);
//! these constants are only the fallbacks used by `Default` implementations.
//!
//! # Usage
//!
//! ```
//! use portunus_core::constants::*;
//! use std::time::Duration;
//!
//! assert!(UID_VALID_LENGTHS.contains(&7));
//! let window = Duration::from_millis(DEFAULT_DEDUPE_WINDOW_MS);
//! assert_eq!(window.as_secs(), 2);
//! ```

// ============================================================================
// Credentials
// ============================================================================

/// Longest MIFARE UID (triple size), in bytes.
pub const UID_MAX_LEN: usize = 10;

/// UID size classes: single (4), double (7) and triple (10) size.
pub const UID_VALID_LENGTHS: [usize; 3] = [4, 7, UID_MAX_LEN];

// ============================================================================
// Card polling
// ============================================================================

/// Interval between two reader polls.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Window during which the same UID is treated as one physical presence.
pub const DEFAULT_DEDUPE_WINDOW_MS: u64 = 2_000;

/// Extra pause after a successful read so a resting card is not hammered.
pub const DEFAULT_REREAD_DELAY_MS: u64 = 500;

// ============================================================================
// Event bus
// ============================================================================

/// Event queue depth.
pub const DEFAULT_EVENT_QUEUE_LENGTH: usize = 16;

/// Maximum time a producer blocks on a full queue.
pub const DEFAULT_EVENT_QUEUE_TIMEOUT_MS: u64 = 50;

/// Subscriber table capacity.
pub const DEFAULT_MAX_SUBSCRIBERS: usize = 16;

/// Maximum number of modules a registry accepts.
pub const MAX_MODULES: usize = 8;

// ============================================================================
// Policy and actuation
// ============================================================================

/// Default strike unlock duration when access is granted locally.
pub const DEFAULT_UNLOCK_DURATION_MS: u32 = 3_000;

/// Door sensor poll interval.
pub const DEFAULT_DOOR_POLL_INTERVAL_MS: u64 = 100;

/// Connectivity monitor poll interval.
pub const DEFAULT_CONNECTIVITY_POLL_INTERVAL_MS: u64 = 500;

// ============================================================================
// Reporting
// ============================================================================

/// Heartbeat interval.
pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 30_000;

/// Depth of the reporter's private queue.
pub const DEFAULT_REPORT_QUEUE_LENGTH: usize = 32;

/// Module identifier reported when none is configured.
pub const DEFAULT_MODULE_ID: &str = "door-01";

/// Firmware version string.
pub const FW_VERSION: &str = env!("CARGO_PKG_VERSION");
