//! Cancelable scheduled-task capability.
//!
//! The session and drift logic never touch timers directly; they ask a
//! `Scheduler` for a handle and cancel it before re-arming. Production code
//! uses `TokioScheduler`, tests use `ManualScheduler` with a `ManualClock`.

mod clock;
mod manual;
mod tokio_scheduler;

use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;

pub use clock::{Clock, ManualClock, SystemClock};
pub use manual::ManualScheduler;
pub use tokio_scheduler::TokioScheduler;

pub type TaskFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;
pub type TaskFn = Arc<dyn Fn() -> TaskFuture + Send + Sync + 'static>;

/// Wraps an async closure into a `TaskFn`.
pub fn task<F, Fut>(f: F) -> TaskFn
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move || Box::pin(f()) as TaskFuture)
}

#[derive(Debug, Clone)]
pub struct TaskHandle {
    name: &'static str,
    token: CancellationToken,
}

impl TaskHandle {
    pub(crate) fn new(name: &'static str, token: CancellationToken) -> Self {
        Self { name, token }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Safe to call any number of times.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

pub trait Scheduler: Send + Sync {
    fn schedule_repeating(&self, name: &'static str, every: Duration, task: TaskFn) -> TaskHandle;

    fn schedule_once(&self, name: &'static str, after: Duration, task: TaskFn) -> TaskHandle;
}

/// Slot holding at most one live task. Re-arming always cancels the old one.
#[derive(Debug, Default)]
pub struct TaskSlot {
    handle: Option<TaskHandle>,
}

impl TaskSlot {
    pub fn replace(&mut self, handle: TaskHandle) {
        if let Some(previous) = self.handle.replace(handle) {
            previous.cancel();
        }
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.cancel();
        }
    }

    pub fn is_armed(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_cancelled())
            .unwrap_or(false)
    }
}
