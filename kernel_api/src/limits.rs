//! Fixed kernel limits
//!
//! These sizes are part of the contract with clients: they are compile-time
//! constants, tables never grow, and slots are never recycled.

use static_assertions::const_assert;

/// Number of slots in the endpoint table
pub const MAX_ENDPOINTS: usize = 32;

/// Number of slots in the task table
pub const MAX_TASKS: usize = 32;

/// Capacity of every endpoint's mailbox, in messages
pub const MAILBOX_SLOTS: usize = 8;

// Endpoint and task ids are stored as u8; task ids start at 1.
const_assert!(MAX_ENDPOINTS <= u8::MAX as usize + 1);
const_assert!(MAX_TASKS < u8::MAX as usize);
const_assert!(MAILBOX_SLOTS > 0);

pub use ipc::MAX_MESSAGE_BYTES;
