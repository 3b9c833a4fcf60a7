use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use crate::JobId;

/// Delayed tasks grouped by job, each group sharing one cancellation token.
///
/// Only the delay is cancellable: once a task has started its work (for
/// example a status request) it runs to completion, and the receiver is
/// expected to drop results for jobs it no longer tracks.
pub struct TaskScheduler {
    runtime: Handle,
    jobs: HashMap<JobId, CancellationToken>,
    animation: Option<CancellationToken>,
}

impl TaskScheduler {
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            jobs: HashMap::new(),
            animation: None,
        }
    }

    pub fn schedule<F>(&mut self, job_id: JobId, delay: Duration, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = self.jobs.entry(job_id).or_default().clone();
        self.runtime.spawn(async move {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
            task.await;
        });
    }

    /// Cancels every pending task of the job. Returns false if none was known.
    pub fn cancel_job(&mut self, job_id: JobId) -> bool {
        match self.jobs.remove(&job_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Starts `task`, cancelling the previous animation first. The task must
    /// stop on its own once the token it is given is cancelled.
    pub fn start_animation<F, Fut>(&mut self, task: F)
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.stop_animation();
        let token = CancellationToken::new();
        self.animation = Some(token.clone());
        self.runtime.spawn(task(token));
    }

    pub fn stop_animation(&mut self) {
        if let Some(token) = self.animation.take() {
            token.cancel();
        }
    }

    pub fn tracked_jobs(&self) -> usize {
        self.jobs.len()
    }
}

impl Drop for TaskScheduler {
    fn drop(&mut self) {
        self.stop_animation();
        for (_, token) in self.jobs.drain() {
            token.cancel();
        }
    }
}
