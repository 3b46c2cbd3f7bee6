//! Task contract

use crate::Context;

/// Independently scheduled unit of userland code
///
/// The kernel runs every registered task on its own thread and hands it a
/// [`Context`] bound to the task's id. Returning from `run` ends the task.
/// Plain closures taking a `Context` are tasks too.
pub trait Task: Send + 'static {
    /// Runs the task to completion
    fn run(self: Box<Self>, ctx: Context);

    /// Name used for the task thread and in log output
    fn name(&self) -> &str {
        "task"
    }
}

impl<F> Task for F
where
    F: FnOnce(Context) + Send + 'static,
{
    fn run(self: Box<Self>, ctx: Context) {
        (*self)(ctx)
    }
}

/// A closure with a name
pub struct Named<F> {
    name: String,
    body: F,
}

/// Wraps a closure so it shows up under `name`
pub fn named<F>(name: impl Into<String>, body: F) -> Named<F>
where
    F: FnOnce(Context) + Send + 'static,
{
    Named {
        name: name.into(),
        body,
    }
}

impl<F> Task for Named<F>
where
    F: FnOnce(Context) + Send + 'static,
{
    fn run(self: Box<Self>, ctx: Context) {
        (self.body)(ctx)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
