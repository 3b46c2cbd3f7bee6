//! Panic mode
//!
//! The first task panic puts the system into panic mode: the gate records who
//! panicked, what the payload was and a stack trace, then invokes the
//! installed handler exactly once. Later panics are ignored. Panic mode does
//! not stop other tasks; deciding what happens next is up to the handler.
//!
//! A process-wide gate backs the free functions in this module. Kernels use it
//! unless built with [`crate::Kernel::with_panic_gate`].

use core_types::TaskId;
use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Once, OnceLock, PoisonError, RwLock};

/// Details of the panic that put the system into panic mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanicInfo {
    /// Task whose `run` panicked
    pub task_id: TaskId,
    /// Panic payload rendered as text
    pub value: String,
    /// Stack trace captured at the panic site
    pub stack: String,
}

type Handler = Arc<dyn Fn(&PanicInfo) + Send + Sync>;

/// One-shot panic record
pub struct PanicGate {
    active: AtomicBool,
    info: OnceLock<PanicInfo>,
    handler: RwLock<Option<Handler>>,
}

impl PanicGate {
    /// Creates a gate that has not fired
    pub const fn new() -> Self {
        Self {
            active: AtomicBool::new(false),
            info: OnceLock::new(),
            handler: RwLock::new(None),
        }
    }

    /// Returns true once the gate has fired
    pub fn in_panic_mode(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Installs the handler, replacing any previous one
    ///
    /// The handler runs on the thread of the panicking task and must not
    /// panic itself.
    pub fn set_handler<F>(&self, handler: F)
    where
        F: Fn(&PanicInfo) + Send + Sync + 'static,
    {
        *self.handler.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(handler));
    }

    /// Returns the recorded panic, if the gate has fired
    ///
    /// Briefly `None` after [`PanicGate::in_panic_mode`] turns true, while the
    /// winning trigger is still capturing the stack.
    pub fn info(&self) -> Option<&PanicInfo> {
        self.info.get()
    }

    /// Fires the gate
    ///
    /// Only the first call has any effect; it records the panic and invokes
    /// the handler. Returns true for that call and false for every other.
    pub fn trigger(&self, task_id: TaskId, value: impl Into<String>) -> bool {
        self.record(
            task_id,
            TaskPanic {
                value: value.into(),
                stack: None,
            },
        )
    }

    /// Fires the gate with a panic caught on a task thread
    ///
    /// Uses the stack captured at the panic site, or the current stack when
    /// there is none.
    pub(crate) fn record(&self, task_id: TaskId, panic: TaskPanic) -> bool {
        if self
            .active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        let info = self.info.get_or_init(|| PanicInfo {
            task_id,
            value: panic.value,
            stack: panic
                .stack
                .unwrap_or_else(|| Backtrace::force_capture().to_string()),
        });

        let handler = self
            .handler
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(handler) = handler {
            handler(info);
        }
        true
    }
}

impl Default for PanicGate {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PanicGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PanicGate")
            .field("active", &self.in_panic_mode())
            .field("info", &self.info())
            .finish_non_exhaustive()
    }
}

static GLOBAL_PANIC: PanicGate = PanicGate::new();

/// Returns the process-wide gate
pub fn global() -> &'static PanicGate {
    &GLOBAL_PANIC
}

/// Reports whether the process is in panic mode
pub fn in_panic_mode() -> bool {
    GLOBAL_PANIC.in_panic_mode()
}

/// Installs the process-wide panic handler (last writer wins)
pub fn set_panic_handler<F>(handler: F)
where
    F: Fn(&PanicInfo) + Send + Sync + 'static,
{
    GLOBAL_PANIC.set_handler(handler);
}

/// Returns the first recorded panic, if any
pub fn panic_info() -> Option<&'static PanicInfo> {
    GLOBAL_PANIC.info()
}

thread_local! {
    static CAPTURING: Cell<bool> = const { Cell::new(false) };
    static CAPTURED_STACK: RefCell<Option<String>> = const { RefCell::new(None) };
}

fn install_stack_hook() {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if CAPTURING.with(Cell::get) {
                let stack = Backtrace::force_capture().to_string();
                CAPTURED_STACK.with(|slot| {
                    if let Ok(mut slot) = slot.try_borrow_mut() {
                        *slot = Some(stack);
                    }
                });
            }
            previous(info);
        }));
    });
}

/// A panic caught on a task thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TaskPanic {
    /// Panic payload rendered as text
    pub(crate) value: String,
    /// Stack at the panic site, if the hook saw it
    pub(crate) stack: Option<String>,
}

/// Runs `f`, converting an unwinding panic into its payload and stack
///
/// The thread's captured stack is taken out on every return, so nothing is
/// left behind for a later panic on the same thread.
pub(crate) fn catch_task_panic<F: FnOnce()>(f: F) -> Result<(), TaskPanic> {
    install_stack_hook();
    CAPTURING.with(|c| c.set(true));
    let result = panic::catch_unwind(AssertUnwindSafe(f));
    CAPTURING.with(|c| c.set(false));
    let stack = CAPTURED_STACK.with(|slot| {
        slot.try_borrow_mut()
            .ok()
            .and_then(|mut slot| slot.take())
    });
    result.map_err(|payload| TaskPanic {
        value: render_payload(payload),
        stack,
    })
}

fn render_payload(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Box<dyn Any>".to_owned()
    }
}
