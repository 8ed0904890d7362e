use std::{sync::Mutex, time::Duration};

use tokio_util::sync::CancellationToken;

use super::{Scheduler, TaskFn, TaskHandle};

struct ManualTask {
    name: &'static str,
    repeating: bool,
    delay: Duration,
    token: CancellationToken,
    task: TaskFn,
}

/// Scheduler whose tasks only run when a test fires them.
#[derive(Default)]
pub struct ManualScheduler {
    tasks: Mutex<Vec<ManualTask>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_tasks<T>(&self, f: impl FnOnce(&mut Vec<ManualTask>) -> T) -> T {
        let mut guard = match self.tasks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.retain(|task| !task.token.is_cancelled());
        f(&mut guard)
    }

    /// Live (not cancelled, not yet fired) tasks registered under `name`.
    pub fn live(&self, name: &str) -> usize {
        self.with_tasks(|tasks| tasks.iter().filter(|task| task.name == name).count())
    }

    /// Fires one tick of every live repeating task named `name`.
    pub async fn tick(&self, name: &str) -> usize {
        let due: Vec<TaskFn> = self.with_tasks(|tasks| {
            tasks
                .iter()
                .filter(|task| task.repeating && task.name == name)
                .map(|task| task.task.clone())
                .collect()
        });

        for task in &due {
            task().await;
        }
        due.len()
    }

    /// Fires every live one-shot task named `name` whose delay is within `elapsed`.
    pub async fn fire_once(&self, name: &str, elapsed: Duration) -> usize {
        let due: Vec<TaskFn> = self.with_tasks(|tasks| {
            let mut fired = Vec::new();
            tasks.retain(|task| {
                let is_due = !task.repeating && task.name == name && task.delay <= elapsed;
                if is_due {
                    fired.push(task.task.clone());
                }
                !is_due
            });
            fired
        });

        for task in &due {
            task().await;
        }
        due.len()
    }

    fn push(&self, name: &'static str, repeating: bool, delay: Duration, task: TaskFn) -> TaskHandle {
        let token = CancellationToken::new();
        self.with_tasks(|tasks| {
            tasks.push(ManualTask {
                name,
                repeating,
                delay,
                token: token.clone(),
                task,
            })
        });
        TaskHandle::new(name, token)
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_repeating(&self, name: &'static str, every: Duration, task: TaskFn) -> TaskHandle {
        self.push(name, true, every, task)
    }

    fn schedule_once(&self, name: &'static str, after: Duration, task: TaskFn) -> TaskHandle {
        self.push(name, false, after, task)
    }
}
