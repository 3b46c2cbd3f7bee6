//! # Kernel API
//!
//! This crate defines the contract between tasks and the Spark kernel that is
//! independent of how the kernel is implemented.
//!
//! ## Philosophy
//!
//! The kernel provides **mechanisms**, not policies:
//! - Endpoint allocation (never freed, never reused)
//! - Message passing (bounded, fail-fast, copy-in/copy-out)
//! - Time as an injected tick count (no wall clock inside the kernel)
//! - Capability transfer (explicit authority)
//!
//! Retry policy, logging of failures and what to do after a panic all belong
//! to the callers.
//!
//! ## Contents
//!
//! - [`SendError`]: every way a send can fail
//! - [`KernelError`]: failures of task registration
//! - [`limits`]: the fixed table sizes clients may rely on
//! - [`TickDriver`]: the single interface through which time enters the kernel

pub mod error;
pub mod limits;
pub mod tick;

pub use error::{KernelError, SendError};
pub use limits::{MAILBOX_SLOTS, MAX_ENDPOINTS, MAX_TASKS};
pub use tick::TickDriver;
