//! Endpoint access rights

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Operations a capability permits on its endpoint
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Rights: u8 {
        /// Push messages into the endpoint's mailbox
        const SEND = 1 << 0;
        /// Pop messages from the endpoint's mailbox
        const RECV = 1 << 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rights_bits() {
        assert_eq!(Rights::SEND.bits(), 1);
        assert_eq!(Rights::RECV.bits(), 2);
        assert_eq!(Rights::all(), Rights::SEND | Rights::RECV);
        assert_eq!(Rights::from_bits_truncate(0xFF), Rights::all());
    }

    #[test]
    fn test_rights_intersection() {
        let both = Rights::SEND | Rights::RECV;
        assert_eq!(both & Rights::RECV, Rights::RECV);
        assert!((Rights::SEND & Rights::RECV).is_empty());
    }
}
