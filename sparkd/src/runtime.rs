//! # Host Runtime
//!
//! Boots the kernel, starts the host services and drives the tick clock
//! from the host's wall clock.

use crate::config::HostRuntimeConfig;
use crate::services::{Heartbeat, LoggerService, Transcript};
use core_types::{Rights, TaskId};
use kernel::{Capability, Kernel, PanicGate, PanicInfo};
use kernel_api::{KernelError, TickDriver};
use log::{debug, error, info};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Upper bound on how long shutdown keeps ticking for tasks to exit
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Host runtime error types
#[derive(Debug, Error)]
pub enum HostRuntimeError {
    #[error("Kernel error: {0}")]
    Kernel(#[from] KernelError),

    #[error("Failed to read config file {path}: {source}")]
    ConfigRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Endpoint table exhausted during boot")]
    NoEndpoint,

    #[error("Task {task_id} panicked: {value}")]
    Panicked { task_id: TaskId, value: String },
}

/// Logs a panic record line by line, skipping blank stack lines
pub fn log_panic(info: &PanicInfo) {
    error!("Spark Panic: task={} panic={}", info.task_id.as_u8(), info.value);
    for line in info.stack.lines().filter(|line| !line.trim().is_empty()) {
        error!("{}", line);
    }
}

/// Host runtime
pub struct HostRuntime {
    /// Configuration
    config: HostRuntimeConfig,
    /// Kernel
    kernel: Kernel,
    /// Send capability for the logger endpoint
    logger: Capability,
    /// Lines written by the logger service
    transcript: Transcript,
    /// Ticks driven so far
    ticks: u64,
}

impl HostRuntime {
    /// Creates a runtime that reports panics to the process-wide gate
    ///
    /// Installs [`log_panic`] as the process-wide panic handler.
    pub fn new(config: HostRuntimeConfig) -> Result<Self, HostRuntimeError> {
        kernel::set_panic_handler(log_panic);
        Self::boot(config, Kernel::new())
    }

    /// Creates a runtime whose tasks report panics to `gate`
    ///
    /// The gate's handler is left as is.
    pub fn with_panic_gate(
        config: HostRuntimeConfig,
        gate: &'static PanicGate,
    ) -> Result<Self, HostRuntimeError> {
        Self::boot(config, Kernel::with_panic_gate(gate))
    }

    fn boot(config: HostRuntimeConfig, kernel: Kernel) -> Result<Self, HostRuntimeError> {
        config.validate()?;

        let log_ep = kernel.new_endpoint(Rights::SEND | Rights::RECV);
        if !log_ep.is_valid() {
            return Err(HostRuntimeError::NoEndpoint);
        }

        let transcript = Transcript::new();
        let logger = log_ep.restrict(Rights::SEND);
        kernel.add_task(LoggerService::new(
            log_ep.restrict(Rights::RECV),
            transcript.clone(),
        ))?;
        kernel.add_task(Heartbeat::new(logger, config.heartbeat_interval()))?;

        info!(
            "booted {} tasks on {} endpoints at {} Hz",
            kernel.task_count(),
            kernel.endpoint_count(),
            config.hz
        );

        Ok(Self {
            config,
            kernel,
            logger,
            transcript,
            ticks: 0,
        })
    }

    /// Runs the tick loop
    ///
    /// Returns when:
    /// - The configured tick count is reached (if non-zero)
    /// - A task panics
    pub fn run(&mut self) -> Result<(), HostRuntimeError> {
        let period = Duration::from_secs(1) / self.config.hz;
        let mut next = Instant::now() + period;

        loop {
            if self.config.ticks > 0 && self.ticks >= self.config.ticks {
                break;
            }

            if let Some(info) = self.kernel.panic_gate().info() {
                return Err(HostRuntimeError::Panicked {
                    task_id: info.task_id,
                    value: info.value.clone(),
                });
            }

            let now = Instant::now();
            if next > now {
                thread::sleep(next - now);
            }
            next += period;

            self.step();
        }

        debug!("tick loop finished after {} ticks", self.ticks);
        Ok(())
    }

    /// Advances the kernel clock by one tick
    pub fn step(&mut self) {
        self.kernel.advance(1);
        self.ticks += 1;
    }

    /// Closes every endpoint and waits for the tasks to exit
    ///
    /// The clock keeps moving while tasks wind down so those sleeping on a
    /// tick notice the closed endpoints. Each step spans a full heartbeat
    /// interval, so the heartbeat wakes on the first step however long its
    /// interval is. Returns the number of tasks joined, or 0 if some task was
    /// still running after the grace period.
    pub fn shutdown(&mut self) -> usize {
        self.kernel.shutdown();

        let period = Duration::from_secs(1) / self.config.hz;
        let step = self.config.heartbeat_interval();
        let deadline = Instant::now() + SHUTDOWN_GRACE;
        while self.kernel.running_tasks() > 0 {
            if Instant::now() >= deadline {
                error!(
                    "{} tasks still running after shutdown",
                    self.kernel.running_tasks()
                );
                return 0;
            }
            self.kernel.advance(step);
            thread::sleep(period.min(Duration::from_millis(1)));
        }

        let joined = self.kernel.wait_for_tasks();
        info!("shut down after {} ticks", self.ticks);
        joined
    }

    /// Returns the kernel
    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    /// Returns a send capability for the logger
    pub fn logger(&self) -> Capability {
        self.logger
    }

    /// Returns the lines written by the logger
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Returns the number of ticks driven so far
    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    /// Returns the configuration
    pub fn config(&self) -> &HostRuntimeConfig {
        &self.config
    }
}
