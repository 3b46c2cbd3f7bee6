//! Payload limits

use static_assertions::const_assert;
use thiserror::Error;

/// Maximum payload size for IPC messages, in bytes
pub const MAX_MESSAGE_BYTES: usize = 128;

// Message lengths are stored as a u16.
const_assert!(MAX_MESSAGE_BYTES <= u16::MAX as usize);

/// Payload did not fit in a message
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("payload of {len} bytes exceeds the {max}-byte message limit", max = MAX_MESSAGE_BYTES)]
pub struct PayloadTooLarge {
    /// Length of the rejected payload
    pub len: usize,
}

impl PayloadTooLarge {
    /// Checks `payload` against [`MAX_MESSAGE_BYTES`]
    pub fn check(payload: &[u8]) -> Result<(), PayloadTooLarge> {
        if payload.len() > MAX_MESSAGE_BYTES {
            return Err(PayloadTooLarge { len: payload.len() });
        }
        Ok(())
    }
}
