//! Frame building and validation for the gateway protocol.
//!
//! Requests and responses share one layout:
//! ```text
//! ┌───────────┬─────────┬────────┬──────────────┬──────────┐
//! │ 0xFF 0xFF │ command │  size  │   payload    │ checksum │
//! │  2 bytes  │ 1 byte  │ 1 byte │ size-3 bytes │  1 byte  │
//! └───────────┴─────────┴────────┴──────────────┴──────────┘
//! ```
//!
//! `size` counts the command, size and checksum bytes plus the payload. The
//! checksum is the additive sum of everything between the preamble and
//! itself. Live and rain data responses widen `size` to two big-endian bytes.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::FrameError;
use crate::protocol::checksum::checksum;
use crate::protocol::command::CommandCode;

/// Preamble byte, sent twice at the start of every frame.
pub const PREAMBLE: u8 = 0xFF;

/// Minimum response size (preamble + command byte).
pub const MIN_RESPONSE_SIZE: usize = 3;

/// Largest request payload a one-byte size can describe.
pub const MAX_PAYLOAD_SIZE: usize = u8::MAX as usize - 3;

/// Offset of the first payload byte in a frame with a one-byte size.
pub const PAYLOAD_OFFSET: usize = 4;

/// Offset of the first payload byte in a frame with a two-byte size.
pub const WIDE_PAYLOAD_OFFSET: usize = 5;

/// Builds a request frame for `command`.
///
/// An empty payload produces the bare five-byte frame. Payloads longer than
/// [`MAX_PAYLOAD_SIZE`] are rejected with [`FrameError::TooLarge`].
pub fn build(command: CommandCode, payload: &[u8]) -> Result<Bytes, FrameError> {
    let size = u8::try_from(payload.len() + 3).map_err(|_| FrameError::TooLarge {
        size: payload.len(),
        max: MAX_PAYLOAD_SIZE,
    })?;

    let mut buf = BytesMut::with_capacity(payload.len() + 5);
    buf.put_u8(PREAMBLE);
    buf.put_u8(PREAMBLE);
    buf.put_u8(command.into());
    buf.put_u8(size);
    buf.put_slice(payload);
    let sum = checksum(&buf[2..]);
    buf.put_u8(sum);
    Ok(buf.freeze())
}

/// Validates a response against the command that produced it.
///
/// `None` means the connection closed before any data arrived. On success the
/// response is returned unchanged; use [`payload`] to slice out the body.
pub fn validate(response: Option<&[u8]>, expected: CommandCode) -> Result<&[u8], FrameError> {
    let response = response.ok_or(FrameError::NoResponse)?;

    if response.len() < MIN_RESPONSE_SIZE {
        return Err(FrameError::InvalidResponse {
            len: response.len(),
        });
    }

    let expected = u8::from(expected);
    if response[2] != expected {
        return Err(FrameError::UnexpectedCommand {
            expected,
            got: response[2],
        });
    }

    let last = response.len() - 1;
    let computed = checksum(&response[2..last]);
    if response[last] != computed {
        return Err(FrameError::ChecksumMismatch {
            expected: computed,
            got: response[last],
        });
    }

    Ok(response)
}

/// Returns the payload region of a validated response.
///
/// Empty if the frame is too short to carry one.
#[must_use]
pub fn payload(response: &[u8], command: CommandCode) -> &[u8] {
    let start = if command.has_wide_size() {
        WIDE_PAYLOAD_OFFSET
    } else {
        PAYLOAD_OFFSET
    };
    let end = response.len().saturating_sub(1);
    response.get(start..end).unwrap_or_default()
}
