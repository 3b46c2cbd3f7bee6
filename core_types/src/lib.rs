//! # Core Types
//!
//! This crate defines the fundamental types shared by the Spark kernel and
//! everything that talks to it.
//!
//! ## Philosophy
//!
//! - **Naming is not access**: an [`Endpoint`] is only an index. Acting on it
//!   takes a capability, and only the kernel hands those out.
//! - **Small and copyable**: every type here is a plain value with no destructor.
//!
//! ## Key Types
//!
//! - [`Rights`]: the `SEND` / `RECV` bitmask a capability carries
//! - [`Endpoint`]: index of a mailbox slot in the kernel's endpoint table
//! - [`TaskId`]: index of a task slot in the kernel's task table

pub mod ids;
pub mod rights;

pub use ids::{Endpoint, TaskId};
pub use rights::Rights;
