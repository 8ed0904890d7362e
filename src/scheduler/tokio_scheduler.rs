use std::time::Duration;

use log::debug;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::{Scheduler, TaskFn, TaskHandle};

/// Runs tasks on the ambient tokio runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn schedule_repeating(&self, name: &'static str, every: Duration, task: TaskFn) -> TaskHandle {
        let token = CancellationToken::new();
        let cancel = token.clone();

        tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + every, every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        debug!("repeating task '{name}' cancelled");
                        break;
                    }
                    _ = ticker.tick() => {
                        task().await;
                    }
                }
            }
        });

        TaskHandle::new(name, token)
    }

    fn schedule_once(&self, name: &'static str, after: Duration, task: TaskFn) -> TaskHandle {
        let token = CancellationToken::new();
        let cancel = token.clone();

        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("one-shot task '{name}' cancelled");
                }
                _ = time::sleep(after) => {
                    task().await;
                }
            }
        });

        TaskHandle::new(name, token)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use super::*;
    use crate::scheduler::task;

    #[tokio::test(start_paused = true)]
    async fn repeating_task_stops_after_cancel() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let handle = TokioScheduler.schedule_repeating(
            "count",
            Duration::from_secs(60),
            task(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            }),
        );

        time::sleep(Duration::from_secs(185)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 3);

        handle.cancel();
        time::sleep(Duration::from_secs(300)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_one_shot_never_fires() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let handle = TokioScheduler.schedule_once(
            "once",
            Duration::from_secs(30),
            task(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            }),
        );

        time::sleep(Duration::from_secs(10)).await;
        handle.cancel();
        time::sleep(Duration::from_secs(60)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
