//! Resilience Test Utilities
//!
//! This crate provides shared utilities for end-to-end kernel tests.
//!
//! ## Test Philosophy
//!
//! - **Fail fast, never hang**: Every blocking wait in a test has a bound
//! - **No capability escalation**: Authority only narrows as it moves
//! - **Backpressure is visible**: A full mailbox is reported, never hidden
//! - **Panics are contained**: One task's panic leaves the others running

use core_types::{Rights, TaskId};
use kernel::test_utils::leaked_gate;
use kernel::{named, Capability, Context, Kernel, PanicGate};
use kernel_api::KernelError;
use std::time::Duration;

/// Upper bound for any single wait in these tests
pub const TIMEOUT: Duration = Duration::from_secs(5);

/// Bootstrap helper for tests
///
/// Creates a kernel wired to a private panic gate, so tests can observe
/// panics without touching the process-wide gate.
pub fn test_bootstrap() -> (Kernel, &'static PanicGate) {
    let gate = leaked_gate();
    (Kernel::with_panic_gate(gate), gate)
}

/// Spawns a service that answers every message on `ep`
///
/// Each request must carry a reply capability; the service echoes kind and
/// payload to it. Requests without one are dropped. Exits when `ep` closes.
pub fn spawn_echo_service(kernel: &Kernel, ep: Capability) -> Result<TaskId, KernelError> {
    kernel.add_task(named("echo", move |ctx: Context| {
        while let Some(msg) = ctx.recv(ep) {
            if msg.has_cap() {
                let _ = ctx.send_to(msg.cap, msg.kind, msg.payload());
            }
        }
    }))
}

/// Allocates an endpoint with both rights
pub fn duplex_endpoint(kernel: &Kernel) -> Capability {
    kernel.new_endpoint(Rights::SEND | Rights::RECV)
}
