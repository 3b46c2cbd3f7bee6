//! # Host Services
//!
//! The tasks the host runner boots: a logger that owns the log endpoint and
//! a heartbeat that writes to it once per interval.

use ipc::Kind;
use kernel::{Capability, Context, Task};
use kernel_api::SendError;
use log::{info, warn};
use std::sync::{Arc, Mutex, PoisonError};

/// One line of text for the logger
pub const MSG_LOG_LINE: Kind = Kind::new(1);

/// Tick advances a client waits out a full logger before dropping a line
pub const LOG_RETRY_TICKS: u32 = 100;

/// Lines the logger has written, shared with the host
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    lines: Arc<Mutex<Vec<String>>>,
}

impl Transcript {
    /// Creates an empty transcript
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, line: String) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line);
    }

    /// Returns a copy of every line written so far
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the number of lines written so far
    pub fn len(&self) -> usize {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns whether nothing has been written
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Drains the log endpoint and writes every line to the host log
///
/// Messages of other kinds are ignored. Exits when the endpoint is closed.
pub struct LoggerService {
    ep: Capability,
    transcript: Transcript,
}

impl LoggerService {
    /// Creates a logger reading from `ep`, which needs the receive right
    pub fn new(ep: Capability, transcript: Transcript) -> Self {
        Self { ep, transcript }
    }
}

impl Task for LoggerService {
    fn run(self: Box<Self>, ctx: Context) {
        let Some(rx) = ctx.recv_chan(self.ep) else {
            warn!("logger: {} cannot receive", self.ep);
            return;
        };
        for msg in rx {
            if msg.kind != MSG_LOG_LINE {
                continue;
            }
            let line = String::from_utf8_lossy(msg.payload()).into_owned();
            info!(target: "spark", "{}", line);
            self.transcript.push(line);
        }
    }

    fn name(&self) -> &str {
        "logger"
    }
}

/// Writes `text` to a logger endpoint, waiting out a full mailbox
///
/// Text longer than a message is truncated.
pub fn log_line(ctx: &Context, logger: Capability, text: &str) -> Result<(), SendError> {
    let bytes = text.as_bytes();
    let len = bytes.len().min(ipc::MAX_MESSAGE_BYTES);
    ctx.send_to_cap_retry(
        logger,
        MSG_LOG_LINE,
        &bytes[..len],
        Capability::INVALID,
        LOG_RETRY_TICKS,
    )
}

/// Sends a heartbeat line to the logger every `every` ticks
///
/// Exits once the logger endpoint is gone.
pub struct Heartbeat {
    logger: Capability,
    every: u64,
}

impl Heartbeat {
    /// Creates a heartbeat writing to `logger` (send right required)
    pub fn new(logger: Capability, every: u64) -> Self {
        Self {
            logger,
            every: every.max(1),
        }
    }
}

impl Task for Heartbeat {
    fn run(self: Box<Self>, ctx: Context) {
        let mut beats: u64 = 0;
        // Counted from boot, not from when this thread got scheduled.
        let mut last: u64 = 0;
        loop {
            last = ctx.wait_tick(last.saturating_add(self.every - 1));
            beats += 1;
            match log_line(&ctx, self.logger, &format!("heartbeat {} at tick {}", beats, last)) {
                Ok(()) => {}
                Err(SendError::QueueFull) => {
                    warn!("heartbeat: logger busy, dropped beat {}", beats)
                }
                Err(_) => return,
            }
        }
    }

    fn name(&self) -> &str {
        "heartbeat"
    }
}
