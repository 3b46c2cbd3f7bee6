//! Bounded mailbox for a single endpoint.
//!
//! A fixed ring of [`MAILBOX_SLOTS`] messages. Push never blocks; pop blocks
//! until a message arrives or the mailbox is closed. FIFO per mailbox.

use crate::Message;
use kernel_api::MAILBOX_SLOTS;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

/// Queue error types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    /// All slots are occupied
    Full,
    /// The mailbox no longer accepts messages
    Closed,
}

#[derive(Debug)]
struct Ring {
    slots: [Message; MAILBOX_SLOTS],
    head: usize,
    len: usize,
    closed: bool,
}

impl Ring {
    fn pop(&mut self) -> Option<Message> {
        if self.len == 0 {
            return None;
        }
        let msg = self.slots[self.head];
        self.head = (self.head + 1) % MAILBOX_SLOTS;
        self.len -= 1;
        Some(msg)
    }
}

/// Fixed-capacity FIFO of messages bound to one endpoint.
#[derive(Debug)]
pub struct Mailbox {
    ring: Mutex<Ring>,
    ready: Condvar,
}

impl Mailbox {
    /// Creates an empty, open mailbox.
    pub fn new() -> Self {
        Self {
            ring: Mutex::new(Ring {
                slots: [Message::EMPTY; MAILBOX_SLOTS],
                head: 0,
                len: 0,
                closed: false,
            }),
            ready: Condvar::new(),
        }
    }

    fn ring(&self) -> MutexGuard<'_, Ring> {
        self.ring.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the configured capacity.
    pub fn capacity(&self) -> usize {
        MAILBOX_SLOTS
    }

    /// Returns the number of queued messages.
    pub fn len(&self) -> usize {
        self.ring().len
    }

    /// Returns whether the mailbox is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns whether the mailbox has been closed.
    pub fn is_closed(&self) -> bool {
        self.ring().closed
    }

    /// Enqueues a message without blocking.
    pub fn push(&self, msg: Message) -> Result<(), QueueError> {
        let mut ring = self.ring();
        if ring.closed {
            return Err(QueueError::Closed);
        }
        if ring.len >= MAILBOX_SLOTS {
            return Err(QueueError::Full);
        }
        let tail = (ring.head + ring.len) % MAILBOX_SLOTS;
        ring.slots[tail] = msg;
        ring.len += 1;
        drop(ring);

        self.ready.notify_one();
        Ok(())
    }

    /// Dequeues the next message, blocking while the mailbox is empty.
    ///
    /// Returns `None` once the mailbox is closed and drained.
    pub fn pop(&self) -> Option<Message> {
        let mut ring = self.ring();
        loop {
            if let Some(msg) = ring.pop() {
                return Some(msg);
            }
            if ring.closed {
                return None;
            }
            ring = self
                .ready
                .wait(ring)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Dequeues the next message if one is queued.
    pub fn try_pop(&self) -> Option<Message> {
        self.ring().pop()
    }

    /// Closes the mailbox and wakes every blocked receiver.
    ///
    /// Messages already queued remain available. Closing twice is harmless.
    pub fn close(&self) {
        self.ring().closed = true;
        self.ready.notify_all();
    }
}

impl Default for Mailbox {
    fn default() -> Self {
        Self::new()
    }
}

/// Receive handle for one mailbox.
///
/// Obtained through [`crate::Context::recv_chan`], which performs the rights
/// check once. Iterating yields messages until the mailbox is closed and
/// drained.
#[derive(Debug, Clone)]
pub struct Receiver {
    mailbox: Arc<Mailbox>,
}

impl Receiver {
    pub(crate) fn new(mailbox: Arc<Mailbox>) -> Self {
        Self { mailbox }
    }

    /// Blocks until a message is available or the mailbox closes.
    pub fn recv(&self) -> Option<Message> {
        self.mailbox.pop()
    }

    /// Returns the next message without blocking.
    pub fn try_recv(&self) -> Option<Message> {
        self.mailbox.try_pop()
    }

    /// Returns whether the underlying mailbox has been closed.
    pub fn is_closed(&self) -> bool {
        self.mailbox.is_closed()
    }
}

impl Iterator for Receiver {
    type Item = Message;

    fn next(&mut self) -> Option<Message> {
        self.recv()
    }
}
