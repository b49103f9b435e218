// Debounce channels
//
// Each debounced concern (auto-validation, auto-persist, per-field
// commits) owns its own Debouncer handle, so independent engine
// instances never share timer state. Scheduling supersedes any pending
// timer: only the latest scheduled job fires. A flush runs the pending
// job immediately (the blur contract); a fired or flushed job never
// runs twice.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;

/// Work scheduled on a debounce channel.
pub type Job = Arc<dyn Fn() + Send + Sync + 'static>;

pub struct Debouncer {
    delay: Duration,
    pending: Option<Pending>,
}

struct Pending {
    handle: JoinHandle<()>,
    job: Job,
    fired: Arc<AtomicBool>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule `job` to run after the quiet period, superseding any
    /// pending timer. Must be called from within a tokio runtime.
    pub fn schedule(&mut self, job: Job) {
        self.cancel();
        let fired = Arc::new(AtomicBool::new(false));
        let task_job = Arc::clone(&job);
        let task_fired = Arc::clone(&fired);
        let delay = self.delay;
        let handle = tokio::spawn(async move {
            sleep(delay).await;
            if !task_fired.swap(true, Ordering::SeqCst) {
                task_job();
            }
        });
        self.pending = Some(Pending { handle, job, fired });
    }

    /// Run the pending job immediately, if one is still pending, and
    /// cancel its timer.
    pub fn flush(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.handle.abort();
            if !pending.fired.swap(true, Ordering::SeqCst) {
                (pending.job)();
            }
        }
    }

    /// Drop the pending job without running it.
    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.fired.store(true, Ordering::SeqCst);
            pending.handle.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|p| !p.fired.load(Ordering::SeqCst))
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
