//! # Spark Host Runtime
//!
//! This crate runs the Spark kernel as an ordinary host process.
//!
//! ## Responsibilities
//!
//! The host runtime:
//! - Boots the kernel with the logger and heartbeat services
//! - Installs a panic handler that writes the panic record to the host log
//! - Drives the tick clock at a fixed rate from the wall clock
//! - Shuts the kernel down and joins every task on exit
//!
//! ## Non-Responsibilities
//!
//! The host does NOT:
//! - Retry or log failed sends on behalf of tasks
//! - Restart tasks after a panic
//! - Render a display or read input

pub mod config;
pub mod runtime;
pub mod services;

pub use config::{parse_args, print_usage, CliAction, HostRuntimeConfig};
pub use runtime::{log_panic, HostRuntime, HostRuntimeError};
pub use services::{log_line, Heartbeat, LoggerService, Transcript, MSG_LOG_LINE};
