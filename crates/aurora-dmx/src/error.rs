//! Error types for DMX output
use thiserror::Error;

/// Errors raised by a transport (serial device, file, ...)
#[derive(Error, Debug)]
pub enum TransportError {
    /// Device missing or could not be opened
    #[error("transport unavailable: {0}")]
    Unavailable(String),

    /// The transport has no such line control (break, baud)
    #[error("{link} does not support {operation}")]
    Unsupported {
        link: String,
        operation: &'static str,
    },

    /// Serial driver error (open, baud, break)
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// I/O error while talking to the device
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// DMX output errors
#[derive(Error, Debug)]
pub enum DmxError {
    /// DMX address outside 0..512
    #[error("DMX address out of range: {address}")]
    AddressOutOfRange { address: usize },

    /// Branch index beyond the topology
    #[error("unit index {index} out of range (topology has {len} branches)")]
    UnitIndexOutOfRange { index: usize, len: usize },

    /// Transmission queue full, frame dropped
    #[error("universe {link} queue full ({capacity} frames), frame dropped")]
    Backpressure { link: usize, capacity: usize },

    /// Sender for this universe has shut down
    #[error("universe {link} queue closed")]
    QueueClosed { link: usize },

    /// Sender thread could not be started
    #[error("failed to spawn sender thread: {0}")]
    Spawn(std::io::Error),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Result type for DMX operations
pub type Result<T> = std::result::Result<T, DmxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DmxError::Backpressure {
            link: 1,
            capacity: 10,
        };
        assert_eq!(
            err.to_string(),
            "universe 1 queue full (10 frames), frame dropped"
        );
    }

    #[test]
    fn test_transport_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: DmxError = TransportError::from(io).into();
        assert!(err.to_string().contains("gone"));
    }
}
