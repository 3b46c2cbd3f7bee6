//! # Inter-Process Communication (IPC)
//!
//! This crate defines Spark's message-passing primitives.
//!
//! ## Philosophy
//!
//! - **Messages, not shared memory**: all communication is an explicit copy
//! - **Fixed size**: every message is the same size, so mailboxes never allocate
//! - **Opaque opcodes**: the kernel routes on endpoints only; [`Kind`] belongs to
//!   whoever defines the service protocol
//!
//! ## Contents
//!
//! - [`Kind`]: the application-defined 16-bit opcode
//! - [`MAX_MESSAGE_BYTES`]: the payload limit every envelope shares
//! - [`PayloadTooLarge`]: what an oversized payload is rejected with
//!
//! The envelope itself lives in the kernel crate, next to the capability it
//! can carry.
//!
//! Larger transfers belong in shared buffers with a notify protocol on top,
//! not in mailbox copies.

pub mod kind;
pub mod payload;

pub use kind::Kind;
pub use payload::{PayloadTooLarge, MAX_MESSAGE_BYTES};
