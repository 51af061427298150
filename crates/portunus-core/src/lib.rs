pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod types;

pub use config::SystemConfig;
pub use error::{Error, ErrorOrigin, Result};
pub use event::{Event, EventKind, FeedbackKind};
pub use types::*;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
