//! Test utilities for kernel and resilience tests
//!
//! Helpers for driving the kernel from test code: filling mailboxes to force
//! backpressure, pumping the tick clock from a background thread, and
//! waiting for conditions with an upper bound so a broken test fails instead
//! of hanging.

use crate::{Capability, Context, Kernel, PanicGate};
use ipc::Kind;
use kernel_api::MAILBOX_SLOTS;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Kind used for filler messages
pub const FILLER_KIND: Kind = Kind::new(0xFFFF);

/// Sends filler messages to `cap` until its mailbox reports full
///
/// Returns how many messages were queued. Stops at the first error.
pub fn fill_mailbox(ctx: &Context, cap: Capability) -> usize {
    let mut sent = 0;
    // Never more than the capacity, even if a receiver is draining.
    while sent < MAILBOX_SLOTS {
        match ctx.send_to(cap, FILLER_KIND, &[]) {
            Ok(()) => sent += 1,
            Err(_) => break,
        }
    }
    sent
}

/// Background thread advancing a kernel's tick clock at a fixed period
///
/// Stops when dropped.
pub struct TickPump {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl TickPump {
    /// Starts advancing `kernel` by one tick every `period`
    pub fn start(kernel: &Kernel, period: Duration) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let handle = {
            let kernel = kernel.clone();
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                while !stop.load(Ordering::Acquire) {
                    thread::sleep(period);
                    kernel.tick_to(kernel.now_tick() + 1);
                }
            })
        };
        Self {
            stop,
            handle: Some(handle),
        }
    }

    /// Stops the pump and waits for its thread
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for TickPump {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Polls `condition` until it holds or `timeout` elapses
///
/// Returns whether the condition held.
pub fn wait_until<F: FnMut() -> bool>(timeout: Duration, mut condition: F) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(1));
    }
}

/// Returns a fresh panic gate that lives for the rest of the process
///
/// Lets tests observe task panics without touching the process-wide gate.
pub fn leaked_gate() -> &'static PanicGate {
    Box::leak(Box::new(PanicGate::new()))
}
