//! Identifiers for kernel table slots

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies an IPC destination
///
/// An endpoint is the index of a mailbox slot in the kernel's endpoint table.
/// Endpoints are allocated sequentially and are never freed or reused.
/// Endpoint 0 doubles as the "unknown sender" marker in anonymous messages.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Endpoint(u8);

impl Endpoint {
    /// The endpoint recorded as `from` when the sender is anonymous
    pub const UNKNOWN: Endpoint = Endpoint(0);

    /// Creates an endpoint from a raw table index
    pub const fn new(index: u8) -> Self {
        Self(index)
    }

    /// Returns the raw table index
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Returns the raw value
    pub const fn as_u8(self) -> u8 {
        self.0
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ep:{}", self.0)
    }
}

/// Identifier for a task
///
/// Task ids are handed out sequentially by the kernel starting at 1.
/// [`TaskId::INVALID`] is returned nowhere by the kernel but is the natural
/// "no task" value for client-side tables indexed by task id.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TaskId(u8);

impl TaskId {
    /// Sentinel id that never names a running task
    pub const INVALID: TaskId = TaskId(0);

    /// Creates a task id from a raw value
    pub const fn new(id: u8) -> Self {
        Self(id)
    }

    /// Returns the raw value
    pub const fn as_u8(self) -> u8 {
        self.0
    }

    /// Returns the value as an index for client-side per-task tables
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Checks whether this id can name a task
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task:{}", self.0)
    }
}
