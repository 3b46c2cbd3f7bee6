//! Task-local view of the kernel
//!
//! Every kernel operation a task performs goes through its [`Context`]. The
//! context is where capabilities are checked; the kernel itself only checks
//! that endpoints exist.

use crate::mailbox::Receiver;
use crate::{Capability, Kernel, Message};
use core_types::{Endpoint, Rights, TaskId};
use ipc::Kind;
use kernel_api::SendError;

/// Per-task handle to the kernel
#[derive(Debug, Clone)]
pub struct Context {
    kernel: Kernel,
    task_id: TaskId,
}

impl Context {
    pub(crate) fn new(kernel: Kernel, task_id: TaskId) -> Self {
        Self { kernel, task_id }
    }

    /// Returns the id of the task this context belongs to
    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Returns the kernel behind this context
    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    /// Sends a message from the endpoint of `from` to the endpoint of `to`
    pub fn send(
        &self,
        from: Capability,
        to: Capability,
        kind: Kind,
        payload: &[u8],
    ) -> Result<(), SendError> {
        self.send_cap(from, to, kind, payload, Capability::INVALID)
    }

    /// Like [`Context::send`], transferring `xfer` to the receiver
    ///
    /// Both capabilities must be valid and carry the send right. They are
    /// checked in order (`from` first) and nothing reaches the kernel unless
    /// both pass.
    pub fn send_cap(
        &self,
        from: Capability,
        to: Capability,
        kind: Kind,
        payload: &[u8],
        xfer: Capability,
    ) -> Result<(), SendError> {
        if !from.is_valid() {
            return Err(SendError::InvalidFromCap);
        }
        if !from.can_send() {
            return Err(SendError::FromNoSendRight);
        }
        check_to(to)?;
        self.kernel
            .send(from.endpoint(), to.endpoint(), kind, payload, xfer)
    }

    /// Sends an anonymous message; the receiver sees [`Endpoint::UNKNOWN`]
    pub fn send_to(&self, to: Capability, kind: Kind, payload: &[u8]) -> Result<(), SendError> {
        self.send_to_cap(to, kind, payload, Capability::INVALID)
    }

    /// Like [`Context::send_to`], transferring `xfer` to the receiver
    pub fn send_to_cap(
        &self,
        to: Capability,
        kind: Kind,
        payload: &[u8],
        xfer: Capability,
    ) -> Result<(), SendError> {
        check_to(to)?;
        self.kernel
            .send(Endpoint::UNKNOWN, to.endpoint(), kind, payload, xfer)
    }

    /// Anonymous send that waits out a full mailbox
    ///
    /// Attempts immediately. Only [`SendError::QueueFull`] is retried: after
    /// each full attempt the task sleeps until the tick clock advances, for
    /// at most `tick_limit` advances. With `tick_limit == 0` this is a single
    /// attempt.
    pub fn send_to_cap_retry(
        &self,
        to: Capability,
        kind: Kind,
        payload: &[u8],
        xfer: Capability,
        tick_limit: u32,
    ) -> Result<(), SendError> {
        let mut waited = 0;
        loop {
            // Sampled before the attempt so an advance during it is not lost.
            let seen = self.now_tick();
            match self.send_to_cap(to, kind, payload, xfer) {
                Err(SendError::QueueFull) if waited < tick_limit => {
                    self.wait_tick(seen);
                    waited += 1;
                }
                result => return result,
            }
        }
    }

    /// Returns a receive handle for the endpoint of `cap`
    ///
    /// `None` if `cap` lacks the receive right or names no endpoint.
    pub fn recv_chan(&self, cap: Capability) -> Option<Receiver> {
        if !cap.can_recv() {
            return None;
        }
        self.kernel.mailbox(cap.endpoint()).map(Receiver::new)
    }

    /// Blocks until a message arrives on the endpoint of `cap`
    ///
    /// `None` if the capability is unusable or the mailbox is closed and
    /// drained.
    pub fn recv(&self, cap: Capability) -> Option<Message> {
        self.recv_chan(cap)?.recv()
    }

    /// Returns the next message on the endpoint of `cap` without blocking
    pub fn try_recv(&self, cap: Capability) -> Option<Message> {
        self.recv_chan(cap)?.try_recv()
    }

    /// Allocates a new endpoint
    pub fn new_endpoint(&self, rights: Rights) -> Capability {
        self.kernel.new_endpoint(rights)
    }

    /// Returns the current tick
    pub fn now_tick(&self) -> u64 {
        self.kernel.now_tick()
    }

    /// Blocks until the tick is strictly greater than `after`
    pub fn wait_tick(&self, after: u64) -> u64 {
        self.kernel.wait_tick(after)
    }

    /// Blocks until the next tick advance
    pub fn block_on_tick(&self) -> u64 {
        self.wait_tick(self.now_tick())
    }
}

fn check_to(to: Capability) -> Result<(), SendError> {
    if !to.is_valid() {
        return Err(SendError::InvalidToCap);
    }
    if !to.can_send() {
        return Err(SendError::ToNoSendRight);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{fill_mailbox, wait_until, TickPump};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    const PING: Kind = Kind::new(1);

    fn setup() -> (Kernel, Context, Capability) {
        let kernel = Kernel::new();
        let ctx = kernel.context(TaskId::new(1));
        let ep = ctx.new_endpoint(Rights::SEND | Rights::RECV);
        (kernel, ctx, ep)
    }

    #[test]
    fn test_send_checks_from_before_to() {
        let (_kernel, ctx, ep) = setup();
        let send_only = ep.restrict(Rights::SEND);
        let recv_only = ep.restrict(Rights::RECV);

        assert_eq!(
            ctx.send(Capability::INVALID, Capability::INVALID, PING, b""),
            Err(SendError::InvalidFromCap)
        );
        assert_eq!(
            ctx.send(recv_only, Capability::INVALID, PING, b""),
            Err(SendError::FromNoSendRight)
        );
        assert_eq!(
            ctx.send(send_only, Capability::INVALID, PING, b""),
            Err(SendError::InvalidToCap)
        );
        assert_eq!(
            ctx.send(send_only, recv_only, PING, b""),
            Err(SendError::ToNoSendRight)
        );
        assert_eq!(ctx.send(send_only, send_only, PING, b"hi"), Ok(()));
    }

    #[test]
    fn test_rejected_send_does_not_enqueue() {
        let (_kernel, ctx, ep) = setup();
        let recv_only = ep.restrict(Rights::RECV);
        assert!(ctx.send(recv_only, ep, PING, b"x").is_err());
        assert!(ctx.send_to(recv_only, PING, b"x").is_err());
        assert!(ctx.try_recv(ep).is_none());
    }

    #[test]
    fn test_send_records_from_endpoint() {
        let (_kernel, ctx, ep) = setup();
        let other = ctx.new_endpoint(Rights::SEND);
        ctx.send(other, ep, PING, b"hi").unwrap();

        let msg = ctx.recv(ep).unwrap();
        assert_eq!(msg.from, other.endpoint());
        assert_eq!(msg.to, ep.endpoint());
        assert_eq!(msg.payload(), b"hi");
    }

    #[test]
    fn test_send_to_is_anonymous() {
        let (_kernel, ctx, ep) = setup();
        ctx.send_to(ep.restrict(Rights::SEND), PING, b"").unwrap();
        assert_eq!(ctx.try_recv(ep).unwrap().from, Endpoint::UNKNOWN);
    }

    #[test]
    fn test_capability_transfer() {
        let (_kernel, ctx, ep) = setup();
        let reply = ctx.new_endpoint(Rights::SEND | Rights::RECV);
        ctx.send_to_cap(ep, PING, b"", reply.restrict(Rights::SEND))
            .unwrap();

        let msg = ctx.recv(ep).unwrap();
        assert!(msg.has_cap());
        assert_eq!(msg.cap.endpoint(), reply.endpoint());
        assert!(msg.cap.can_send());
        assert!(!msg.cap.can_recv());

        ctx.send_to(msg.cap, Kind::new(2), b"pong").unwrap();
        assert_eq!(ctx.try_recv(reply).unwrap().payload(), b"pong");
    }

    #[test]
    fn test_recv_requires_recv_right() {
        let (_kernel, ctx, ep) = setup();
        ctx.send_to(ep, PING, b"").unwrap();
        assert!(ctx.recv_chan(ep.restrict(Rights::SEND)).is_none());
        assert!(ctx.try_recv(ep.restrict(Rights::SEND)).is_none());
        assert!(ctx.recv(Capability::INVALID).is_none());
        assert!(ctx.try_recv(ep.restrict(Rights::RECV)).is_some());
    }

    #[test]
    fn test_full_mailbox_then_drain() {
        let (_kernel, ctx, ep) = setup();
        fill_mailbox(&ctx, ep);
        assert_eq!(ctx.send_to(ep, PING, b""), Err(SendError::QueueFull));

        ctx.try_recv(ep).unwrap();
        assert_eq!(ctx.send_to(ep, PING, b""), Ok(()));
    }

    #[test]
    fn test_retry_with_zero_limit_does_not_block() {
        let (_kernel, ctx, ep) = setup();
        fill_mailbox(&ctx, ep);

        let start = Instant::now();
        let result = ctx.send_to_cap_retry(ep, PING, b"", Capability::INVALID, 0);
        assert_eq!(result, Err(SendError::QueueFull));
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[test]
    fn test_retry_gives_up_after_limit() {
        let (kernel, ctx, ep) = setup();
        fill_mailbox(&ctx, ep);

        let _pump = TickPump::start(&kernel, Duration::from_millis(1));
        let result = ctx.send_to_cap_retry(ep, PING, b"", Capability::INVALID, 1);
        assert_eq!(result, Err(SendError::QueueFull));
    }

    #[test]
    fn test_retry_succeeds_after_drain() {
        let (kernel, ctx, ep) = setup();
        fill_mailbox(&ctx, ep);

        let drainer = {
            let ctx = ctx.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(5));
                ctx.try_recv(ep).is_some()
            })
        };
        let _pump = TickPump::start(&kernel, Duration::from_millis(1));
        let result = ctx.send_to_cap_retry(ep, PING, b"late", Capability::INVALID, 500);

        assert!(drainer.join().unwrap());
        assert_eq!(result, Ok(()));
    }

    #[test]
    fn test_retry_does_not_retry_other_errors() {
        let (_kernel, ctx, ep) = setup();
        let oversized = [0u8; ipc::MAX_MESSAGE_BYTES + 1];
        let result = ctx.send_to_cap_retry(ep, PING, &oversized, Capability::INVALID, 10);
        assert_eq!(result, Err(SendError::PayloadTooLarge));
        assert_eq!(
            ctx.send_to_cap_retry(Capability::INVALID, PING, b"", Capability::INVALID, 10),
            Err(SendError::InvalidToCap)
        );
    }

    #[test]
    fn test_block_on_tick_waits_for_advance() {
        let (kernel, ctx, _ep) = setup();
        kernel.tick_to(4);
        let woke = Arc::new(AtomicBool::new(false));
        let waiter = {
            let ctx = ctx.clone();
            let woke = Arc::clone(&woke);
            thread::spawn(move || {
                let tick = ctx.block_on_tick();
                woke.store(true, Ordering::SeqCst);
                tick
            })
        };

        thread::sleep(Duration::from_millis(20));
        assert!(!woke.load(Ordering::SeqCst));
        kernel.tick_to(5);
        assert!(wait_until(Duration::from_secs(5), || woke.load(Ordering::SeqCst)));
        assert_eq!(waiter.join().unwrap(), 5);
    }
}
