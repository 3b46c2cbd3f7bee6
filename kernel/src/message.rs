//! Message envelope

use crate::Capability;
use core_types::Endpoint;
use ipc::{Kind, PayloadTooLarge, MAX_MESSAGE_BYTES};
use std::fmt;

/// Fixed-size IPC envelope
///
/// Messages are copied by value into and out of mailboxes. There is no
/// shared payload ownership and no heap allocation.
///
/// The fields are public so receivers can decode without ceremony, which
/// also means `len` can hold garbage; [`Message::payload`] never trusts it.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Message {
    /// Sending endpoint, or [`Endpoint::UNKNOWN`] for anonymous sends
    pub from: Endpoint,
    /// Destination endpoint
    pub to: Endpoint,
    /// Application-defined opcode
    pub kind: Kind,
    /// Number of meaningful bytes in `data`
    pub len: u16,
    /// Payload buffer
    pub data: [u8; MAX_MESSAGE_BYTES],
    /// Capability transferred to the receiver (invalid if none)
    pub cap: Capability,
}

impl Message {
    /// An empty message with no payload and no capability
    pub const EMPTY: Message = Message {
        from: Endpoint::UNKNOWN,
        to: Endpoint::UNKNOWN,
        kind: Kind::new(0),
        len: 0,
        data: [0; MAX_MESSAGE_BYTES],
        cap: Capability::INVALID,
    };

    /// Builds a message by copying `payload` into the fixed buffer
    pub fn new(
        from: Endpoint,
        to: Endpoint,
        kind: Kind,
        payload: &[u8],
        cap: Capability,
    ) -> Result<Self, PayloadTooLarge> {
        PayloadTooLarge::check(payload)?;

        let mut msg = Message {
            from,
            to,
            kind,
            len: payload.len() as u16,
            cap,
            ..Message::EMPTY
        };
        msg.data[..payload.len()].copy_from_slice(payload);
        Ok(msg)
    }

    /// Returns the meaningful part of the payload
    ///
    /// `len` is clamped to [`MAX_MESSAGE_BYTES`], so a corrupted length can
    /// never read past the buffer.
    pub fn payload(&self) -> &[u8] {
        let len = usize::from(self.len).min(MAX_MESSAGE_BYTES);
        &self.data[..len]
    }

    /// Returns true if the message carries a capability
    pub fn has_cap(&self) -> bool {
        self.cap.is_valid()
    }
}

impl Default for Message {
    fn default() -> Self {
        Message::EMPTY
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("kind", &self.kind)
            .field("len", &self.len)
            .field("payload", &self.payload())
            .field("cap", &self.cap)
            .finish()
    }
}
