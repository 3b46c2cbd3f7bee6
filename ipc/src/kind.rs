//! Message opcodes

use serde::{Deserialize, Serialize};
use std::fmt;

/// Application-defined message opcode
///
/// The kernel neither interprets nor validates the kind; the opcode space is
/// owned by the protocol definitions of the services that exchange messages.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Kind(u16);

impl Kind {
    /// Creates a kind from a raw opcode
    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    /// Returns the raw opcode
    pub const fn as_u16(self) -> u16 {
        self.0
    }
}

impl From<u16> for Kind {
    fn from(raw: u16) -> Self {
        Self(raw)
    }
}

impl From<Kind> for u16 {
    fn from(kind: Kind) -> Self {
        kind.0
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "kind:{}", self.0)
    }
}
