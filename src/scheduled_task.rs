use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use chrono::{DateTime, Utc};
use rocket::tokio::{
    self,
    sync::Notify,
    task::{JoinError, JoinHandle},
    time::Duration,
};

/// A task scheduled for a specific point in the future.
/// It executes automatically at that point, or can be cancelled or triggered early.
pub struct ScheduledTask<T> {
    handle: JoinHandle<T>,
    early_trigger: Arc<Notify>,
}

impl<T> ScheduledTask<T>
where
    T: Send + 'static,
{
    /// Schedule the given task to execute at time `run_at`.
    /// If `run_at` is in the past, the task executes immediately.
    pub fn new<Fut>(task: Fut, run_at: DateTime<Utc>) -> Self
    where
        Fut: Future<Output = T> + Send + 'static,
    {
        let early_trigger = Arc::new(Notify::new());

        // The deadline wait races against the early trigger. The payload
        // runs on its own task, so cancelling the wait can never interrupt
        // a payload that has already started.
        let trigger = early_trigger.clone();
        let delay = duration_until(run_at);
        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = trigger.notified() => {}
            }
            match tokio::spawn(task).await {
                Ok(value) => value,
                // The payload is never aborted, so a failed join is a panic.
                Err(e) => std::panic::resume_unwind(e.into_panic()),
            }
        });

        Self {
            handle,
            early_trigger,
        }
    }

    /// Cancel the task. Returns true iff it had already completed before we could cancel it.
    ///
    /// Only the deadline wait is aborted; a payload that has already started
    /// always runs to completion in the background.
    pub async fn cancel(self) -> bool {
        self.handle.abort();
        self.handle.await.is_ok()
    }

    /// Run the task now instead of waiting for its scheduled time.
    pub fn trigger_now(&self) {
        self.early_trigger.notify_one();
    }
}

/// Implement `Future` for `ScheduledTask` so we can directly `await` it.
impl<T> Future for ScheduledTask<T> {
    type Output = Result<T, JoinError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.handle).poll(cx)
    }
}

/// How long from now until `datetime`, saturating to zero for past datetimes.
fn duration_until(datetime: DateTime<Utc>) -> Duration {
    let millis = datetime.timestamp_millis() - Utc::now().timestamp_millis();
    Duration::from_millis(u64::try_from(millis).unwrap_or(0))
}
