//! Kernel error types

use ipc::PayloadTooLarge;
use thiserror::Error;

/// Reasons a send can fail
///
/// Capability-layer rejections are checked by the task context before the
/// kernel is touched; the remaining variants come from the router. None of
/// these are retried by the kernel; see [`SendError::is_retryable`] for the
/// one condition a caller may reasonably back off on.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq, Hash)]
pub enum SendError {
    /// The sender's own capability is invalid
    #[error("invalid from capability")]
    InvalidFromCap,

    /// The destination capability is invalid
    #[error("invalid to capability")]
    InvalidToCap,

    /// The sender's own capability lacks the send right
    #[error("from capability has no send right")]
    FromNoSendRight,

    /// The destination capability lacks the send right
    #[error("to capability has no send right")]
    ToNoSendRight,

    /// The destination endpoint does not exist or its mailbox is closed
    #[error("no such endpoint")]
    NoEndpoint,

    /// The payload exceeds the fixed message size
    #[error("payload too large")]
    PayloadTooLarge,

    /// The destination mailbox is full
    #[error("queue full")]
    QueueFull,
}

impl SendError {
    /// Returns true if trying again later can succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, SendError::QueueFull)
    }
}

impl From<PayloadTooLarge> for SendError {
    fn from(_: PayloadTooLarge) -> Self {
        SendError::PayloadTooLarge
    }
}

/// Errors that can occur when registering tasks with the kernel
#[derive(Debug, Error)]
pub enum KernelError {
    /// Every slot of the task table is taken
    #[error("task table full ({0} tasks)")]
    TaskTableFull(usize),

    /// The host refused to start a thread for the task
    #[error("failed to spawn task {name}: {source}")]
    SpawnFailed {
        name: String,
        #[source]
        source: std::io::Error,
    },
}
