//! # Spark Kernel
//!
//! Capability-based IPC microkernel for the Spark operating system.
//!
//! ## Model
//!
//! - A fixed table of [`MAX_ENDPOINTS`] endpoints, each backed by a bounded
//!   [`Mailbox`]. Endpoints are allocated in order and never freed.
//! - A fixed table of [`MAX_TASKS`] tasks. Each task runs on its own thread
//!   with a [`Context`] bound to its id.
//! - A tick clock that only moves when a driver calls [`Kernel::tick_to`].
//! - A panic gate that records the first task panic.
//!
//! ## Philosophy
//!
//! **Mechanism, not policy.**
//!
//! Sends fail fast and report why. The kernel does not retry, log or drop
//! a failed send on the caller's behalf; [`Context::send_to_cap_retry`] is the
//! one place a bounded retry lives, and it is opt-in.
//!
//! Capabilities are checked by [`Context`]; the kernel only checks that the
//! destination exists.

pub mod capability;
pub mod context;
pub mod mailbox;
pub mod message;
pub mod panic_mode;
pub mod task;
pub mod test_utils;
pub mod tick;

pub use capability::Capability;
pub use context::Context;
pub use mailbox::{Mailbox, QueueError, Receiver};
pub use message::Message;
pub use panic_mode::{in_panic_mode, panic_info, set_panic_handler, PanicGate, PanicInfo};
pub use task::{named, Task};
pub use tick::TickClock;

use core_types::{Endpoint, Rights, TaskId};
use ipc::Kind;
use kernel_api::{KernelError, SendError, TickDriver, MAX_ENDPOINTS, MAX_TASKS};
use log::{debug, error, warn};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

/// Handle to a running kernel
///
/// Cheap to clone; every clone refers to the same tables and clock.
#[derive(Clone)]
pub struct Kernel {
    inner: Arc<Inner>,
}

struct Inner {
    tables: Mutex<Tables>,
    clock: TickClock,
    panic_gate: &'static PanicGate,
}

struct Tables {
    endpoints: [Option<Arc<Mailbox>>; MAX_ENDPOINTS],
    endpoint_count: usize,
    tasks: [Option<TaskSlot>; MAX_TASKS],
    task_count: usize,
}

struct TaskSlot {
    name: String,
    handle: Option<JoinHandle<()>>,
}

impl Kernel {
    /// Creates a kernel that reports task panics to the process-wide gate
    pub fn new() -> Self {
        Self::with_panic_gate(panic_mode::global())
    }

    /// Creates a kernel that reports task panics to `gate`
    pub fn with_panic_gate(gate: &'static PanicGate) -> Self {
        Self {
            inner: Arc::new(Inner {
                tables: Mutex::new(Tables {
                    endpoints: std::array::from_fn(|_| None),
                    endpoint_count: 0,
                    tasks: std::array::from_fn(|_| None),
                    task_count: 0,
                }),
                clock: TickClock::new(),
                panic_gate: gate,
            }),
        }
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.inner
            .tables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the gate task panics are reported to
    pub fn panic_gate(&self) -> &'static PanicGate {
        self.inner.panic_gate
    }

    /// Allocates the next endpoint with a fresh mailbox
    ///
    /// Returns a capability carrying `rights` for it, or the invalid
    /// capability once the table is full. A slot is consumed even when
    /// `rights` is empty.
    pub fn new_endpoint(&self, rights: Rights) -> Capability {
        let mut tables = self.tables();
        let index = tables.endpoint_count;
        if index >= MAX_ENDPOINTS {
            drop(tables);
            warn!("endpoint table full ({} endpoints)", MAX_ENDPOINTS);
            return Capability::INVALID;
        }
        tables.endpoints[index] = Some(Arc::new(Mailbox::new()));
        tables.endpoint_count += 1;

        // MAX_ENDPOINTS fits in a u8.
        Capability::mint(Endpoint::new(index as u8), rights)
    }

    /// Registers a task and starts it on its own thread
    ///
    /// Task ids start at 1. A panic escaping `run` is reported to the panic
    /// gate; the kernel and other tasks keep running.
    pub fn add_task<T: Task>(&self, task: T) -> Result<TaskId, KernelError> {
        self.add_boxed_task(Box::new(task))
    }

    /// Registers an already boxed task
    pub fn add_boxed_task(&self, task: Box<dyn Task>) -> Result<TaskId, KernelError> {
        let mut tables = self.tables();
        let index = tables.task_count;
        if index >= MAX_TASKS {
            return Err(KernelError::TaskTableFull(MAX_TASKS));
        }

        // MAX_TASKS < u8::MAX, so index + 1 fits.
        let id = TaskId::new(index as u8 + 1);
        let name = task.name().to_owned();
        let ctx = Context::new(self.clone(), id);
        let gate = self.inner.panic_gate;

        let handle = thread::Builder::new()
            .name(format!("{}-{}", name, id.as_u8()))
            .spawn(move || run_task(task, ctx, gate))
            .map_err(|source| KernelError::SpawnFailed {
                name: name.clone(),
                source,
            })?;

        tables.tasks[index] = Some(TaskSlot {
            name: name.clone(),
            handle: Some(handle),
        });
        tables.task_count += 1;
        drop(tables);

        debug!("started task {} ({})", id, name);
        Ok(id)
    }

    /// Binds a context for `task_id` without registering a task
    ///
    /// For bring-up code and tests that act on behalf of a task.
    pub fn context(&self, task_id: TaskId) -> Context {
        Context::new(self.clone(), task_id)
    }

    pub(crate) fn mailbox(&self, ep: Endpoint) -> Option<Arc<Mailbox>> {
        self.tables().endpoints.get(ep.index())?.clone()
    }

    /// Routes a message to the mailbox of `to`
    ///
    /// No capability checks happen here. The kernel lock is released before
    /// the payload is looked at or the mailbox is touched. A missing or
    /// closed destination is reported ahead of an oversized payload.
    pub fn send(
        &self,
        from: Endpoint,
        to: Endpoint,
        kind: Kind,
        payload: &[u8],
        xfer: Capability,
    ) -> Result<(), SendError> {
        let mailbox = self.mailbox(to).ok_or(SendError::NoEndpoint)?;
        if mailbox.is_closed() {
            return Err(SendError::NoEndpoint);
        }
        let msg = Message::new(from, to, kind, payload, xfer)?;
        mailbox.push(msg).map_err(|err| match err {
            QueueError::Full => SendError::QueueFull,
            QueueError::Closed => SendError::NoEndpoint,
        })
    }

    /// Closes the mailbox of `ep`, waking its blocked receivers
    ///
    /// The endpoint stays allocated; later sends report
    /// [`SendError::NoEndpoint`]. Returns false if `ep` does not exist.
    pub fn close_endpoint(&self, ep: Endpoint) -> bool {
        match self.mailbox(ep) {
            Some(mailbox) => {
                mailbox.close();
                true
            }
            None => false,
        }
    }

    /// Closes every mailbox
    pub fn shutdown(&self) {
        let mailboxes: Vec<Arc<Mailbox>> =
            self.tables().endpoints.iter().flatten().cloned().collect();
        for mailbox in &mailboxes {
            mailbox.close();
        }
        debug!("closed {} endpoints", mailboxes.len());
    }

    /// Joins every task thread started so far
    ///
    /// Returns the number of threads joined. Tasks blocked on a receive only
    /// return once their mailbox is closed; see [`Kernel::shutdown`].
    pub fn wait_for_tasks(&self) -> usize {
        let handles: Vec<JoinHandle<()>> = self
            .tables()
            .tasks
            .iter_mut()
            .flatten()
            .filter_map(|slot| slot.handle.take())
            .collect();
        let count = handles.len();
        for handle in handles {
            // Task panics are caught inside the thread.
            let _ = handle.join();
        }
        count
    }

    /// Returns the number of allocated endpoints
    pub fn endpoint_count(&self) -> usize {
        self.tables().endpoint_count
    }

    /// Returns the number of registered tasks
    pub fn task_count(&self) -> usize {
        self.tables().task_count
    }

    /// Returns the number of task threads that have not finished
    pub fn running_tasks(&self) -> usize {
        self.tables()
            .tasks
            .iter()
            .flatten()
            .filter_map(|slot| slot.handle.as_ref())
            .filter(|handle| !handle.is_finished())
            .count()
    }

    /// Returns the name of a registered task
    pub fn task_name(&self, id: TaskId) -> Option<String> {
        let index = id.index().checked_sub(1)?;
        let tables = self.tables();
        let name = tables.tasks.get(index)?.as_ref().map(|slot| slot.name.clone());
        name
    }

    /// Advances the clock to `seq`; ignored unless it moves time forward
    pub fn tick_to(&self, seq: u64) -> bool {
        self.inner.clock.tick_to(seq)
    }

    /// Returns the current tick
    pub fn now_tick(&self) -> u64 {
        self.inner.clock.now()
    }

    /// Blocks until the tick is strictly greater than `after`
    pub fn wait_tick(&self, after: u64) -> u64 {
        self.inner.clock.wait(after)
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new()
    }
}

impl TickDriver for Kernel {
    fn tick_to(&self, seq: u64) -> bool {
        Kernel::tick_to(self, seq)
    }

    fn now_tick(&self) -> u64 {
        Kernel::now_tick(self)
    }
}

impl std::fmt::Debug for Kernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tables = self.tables();
        f.debug_struct("Kernel")
            .field("endpoints", &tables.endpoint_count)
            .field("tasks", &tables.task_count)
            .field("tick", &self.inner.clock.now())
            .finish()
    }
}

fn run_task(task: Box<dyn Task>, ctx: Context, gate: &'static PanicGate) {
    let id = ctx.task_id();
    let name = task.name().to_owned();
    match panic_mode::catch_task_panic(move || task.run(ctx)) {
        Ok(()) => debug!("task {} ({}) exited", id, name),
        Err(panic) => {
            error!("task {} ({}) panicked: {}", id, name, panic.value);
            gate.record(id, panic);
        }
    }
}
