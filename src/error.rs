//! Error types for the ecowitt-gateway library.

use thiserror::Error;

/// The main error type for gateway operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Response frame failed validation.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// Sensor ID table is too short to be a valid reply.
    #[error("invalid data length: sensor table needs more than 200 bytes, got {len}")]
    InvalidDataLength { len: usize },

    /// Connect or socket I/O failure.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// Command timed out waiting for response.
    #[error("command timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The payload decoder rejected a validated response.
    #[error("decode error: {message}")]
    Decode { message: String },

    /// Byte does not name a known command.
    #[error("unknown command code: 0x{0:02x}")]
    UnknownCommand(u8),
}

/// Frame validation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    /// Connection closed before any data arrived.
    #[error("no response")]
    NoResponse,

    /// Response too short to carry the preamble and command byte.
    #[error("invalid response: need at least 3 bytes, got {len}")]
    InvalidResponse { len: usize },

    /// Echoed command byte does not match the request.
    #[error("unexpected command: expected 0x{expected:02x}, got 0x{got:02x}")]
    UnexpectedCommand { expected: u8, got: u8 },

    /// Request payload does not fit a one-byte size field.
    #[error("frame too large: {size} byte payload exceeds maximum {max}")]
    TooLarge { size: usize, max: usize },

    /// Trailing checksum byte disagrees with the computed one.
    #[error("checksum mismatch: expected 0x{expected:02x}, got 0x{got:02x}")]
    ChecksumMismatch { expected: u8, got: u8 },
}

impl Error {
    /// Creates a decode error from anything printable.
    pub(crate) fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }
}

/// Result type alias for gateway operations.
pub type Result<T> = std::result::Result<T, Error>;
