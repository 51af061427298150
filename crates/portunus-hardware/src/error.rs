//! Error types for hardware operations.
//!
//! These cover failures of the transport underneath the card reader driver
//! (serial bus transfers). GPIO wrappers for the strike, indicator and door
//! sensor are non-failing and never produce these.

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors a [`RegisterBus`](crate::RegisterBus) transfer can report.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// Bus transfer failed.
    #[error("Communication error: {message}")]
    CommunicationError { message: String },
}

impl HardwareError {
    /// Create a new communication error.
    pub fn communication(message: impl Into<String>) -> Self {
        Self::CommunicationError {
            message: message.into(),
        }
    }
}

/// Bus failures surface as driver-level transfer errors.
impl From<HardwareError> for portunus_core::Error {
    fn from(err: HardwareError) -> Self {
        portunus_core::Error::BusTransfer(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portunus_core::ErrorOrigin;

    #[test]
    fn test_communication_error() {
        let error = HardwareError::communication("SPI transfer aborted");
        assert_eq!(error.to_string(), "Communication error: SPI transfer aborted");
    }

    #[test]
    fn test_converts_to_driver_error() {
        let error: portunus_core::Error = HardwareError::communication("no ack").into();
        assert!(matches!(error, portunus_core::Error::BusTransfer(_)));
        assert_eq!(error.origin(), ErrorOrigin::Driver);
    }
}
