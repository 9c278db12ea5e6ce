//! Per-provider work queue with concurrency and rate limits.

use crate::{CancelFlag, ExecutionContext, Executor, JobRecordManager, QueueConfig};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use scout_core::{Error, Provider};
use std::collections::{HashMap, VecDeque};
use std::num::NonZeroU32;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Queue-level execution state of one job.
///
/// Diagnostics only: distinct from the Job document's own status, which
/// remains the source of truth for clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueJobState {
    /// Waiting for a worker
    Queued,
    /// Handed to the executor
    Running,
    /// Executor finished without error
    Done,
    /// Executor failed terminally or retries were exhausted
    Failed,
    /// Removed or abandoned after a cancel request
    Cancelled,
}

impl QueueJobState {
    const fn is_finished(self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::Cancelled)
    }
}

/// Outcome of a cancellation request. Cancellation is idempotent and never
/// errors for unknown or already-finished jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The job was still queued and has been removed
    Removed,
    /// The job is in flight; best-effort intent was signalled
    Signalled,
    /// Unknown or already-finished job; nothing to do
    Noop,
}

struct JobEntry {
    state: QueueJobState,
    payload: serde_json::Value,
    cancel: CancelFlag,
    finished_at: Option<Instant>,
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<String>,
    entries: HashMap<String, JobEntry>,
    finished: VecDeque<String>,
}

struct QueueShared {
    provider: Provider,
    config: QueueConfig,
    state: Mutex<QueueState>,
    notify: Notify,
    limiter: DirectLimiter,
    executor: Arc<dyn Executor>,
    records: JobRecordManager,
}

/// One provider's independent work queue.
///
/// `concurrency` worker tasks pull admitted jobs in submission order, wait
/// on a sliding-window rate limiter, and run the registered executor with
/// the queue's retry policy. Enqueueing is idempotent on job id.
pub struct ProviderQueue {
    shared: Arc<QueueShared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl ProviderQueue {
    /// Create the queue and spawn its workers
    #[must_use]
    pub fn start(
        provider: Provider,
        config: QueueConfig,
        executor: Arc<dyn Executor>,
        records: JobRecordManager,
    ) -> Self {
        let quota = Quota::per_minute(
            NonZeroU32::new(config.rate_limit_per_minute).unwrap_or(NonZeroU32::MIN),
        );
        let concurrency = config.concurrency.max(1);
        let shared = Arc::new(QueueShared {
            provider,
            config,
            state: Mutex::new(QueueState::default()),
            notify: Notify::new(),
            limiter: RateLimiter::direct(quota),
            executor,
            records,
        });

        let workers = (0..concurrency)
            .map(|_| {
                let shared = Arc::clone(&shared);
                tokio::spawn(async move { worker_loop(shared).await })
            })
            .collect();

        Self {
            shared,
            workers: Mutex::new(workers),
        }
    }

    /// Enqueue work keyed by job id. Re-submission with a known id is a
    /// no-op rather than a duplicate.
    pub fn submit(&self, job_id: impl Into<String>, payload: serde_json::Value) {
        let job_id = job_id.into();
        {
            let mut state = self.shared.lock_state();
            if state.entries.contains_key(&job_id) {
                debug!(provider = %self.shared.provider, job = %job_id, "duplicate submit ignored");
                return;
            }
            state.entries.insert(
                job_id.clone(),
                JobEntry {
                    state: QueueJobState::Queued,
                    payload,
                    cancel: CancelFlag::new(),
                    finished_at: None,
                },
            );
            state.pending.push_back(job_id.clone());
        }
        debug!(provider = %self.shared.provider, job = %job_id, "job enqueued");
        self.shared.notify.notify_one();
    }

    /// Cancel a job: removal if still queued, best-effort signal if in
    /// flight, no-op otherwise.
    pub async fn cancel(&self, job_id: &str) -> CancelOutcome {
        let outcome = {
            let mut state = self.shared.lock_state();
            match state.entries.get_mut(job_id) {
                None => CancelOutcome::Noop,
                Some(entry) => match entry.state {
                    QueueJobState::Queued => {
                        entry.state = QueueJobState::Cancelled;
                        entry.finished_at = Some(Instant::now());
                        state.pending.retain(|id| id != job_id);
                        state.finished.push_back(job_id.to_string());
                        Self::prune_finished(&mut state, &self.shared.config);
                        CancelOutcome::Removed
                    }
                    QueueJobState::Running => {
                        entry.cancel.raise();
                        CancelOutcome::Signalled
                    }
                    _ => CancelOutcome::Noop,
                },
            }
        };

        if outcome == CancelOutcome::Removed {
            // Produce the terminal Job record for the never-started job.
            self.shared.settle_cancelled(job_id).await;
        }
        outcome
    }

    /// Queue-level state of a job, if still within retention
    #[must_use]
    pub fn status(&self, job_id: &str) -> Option<QueueJobState> {
        self.shared
            .lock_state()
            .entries
            .get(job_id)
            .map(|entry| entry.state)
    }

    /// Number of jobs waiting for a worker
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.shared.lock_state().pending.len()
    }

    /// Stop the workers. Pending entries are dropped; job documents remain.
    pub fn shutdown(&self) {
        let mut workers = self
            .workers
            .lock()
            .expect("queue worker list mutex poisoned");
        for worker in workers.drain(..) {
            worker.abort();
        }
    }

    fn prune_finished(state: &mut QueueState, config: &QueueConfig) {
        let ttl = config.retention.finished_ttl;
        loop {
            let expired = state.finished.front().is_some_and(|id| {
                state
                    .entries
                    .get(id)
                    .and_then(|entry| entry.finished_at)
                    .is_some_and(|at| at.elapsed() > ttl)
            });
            if state.finished.len() > config.retention.max_finished || expired {
                if let Some(id) = state.finished.pop_front() {
                    state.entries.remove(&id);
                }
            } else {
                break;
            }
        }
    }
}

impl Drop for ProviderQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for ProviderQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.lock_state();
        f.debug_struct("ProviderQueue")
            .field("provider", &self.shared.provider)
            .field("pending", &state.pending.len())
            .field("known", &state.entries.len())
            .finish()
    }
}

impl QueueShared {
    fn lock_state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().expect("queue state mutex poisoned")
    }

    /// Pop the next queued job, marking it running. Leaves a wakeup behind
    /// when more work remains so sibling workers are not left sleeping.
    fn take_next(&self) -> Option<(String, serde_json::Value, CancelFlag)> {
        let mut state = self.lock_state();
        while let Some(job_id) = state.pending.pop_front() {
            let Some(entry) = state.entries.get_mut(&job_id) else {
                continue;
            };
            if entry.state != QueueJobState::Queued {
                continue;
            }
            entry.state = QueueJobState::Running;
            let work = (job_id, entry.payload.clone(), entry.cancel.clone());
            if !state.pending.is_empty() {
                self.notify.notify_one();
            }
            return Some(work);
        }
        None
    }

    fn finish(&self, job_id: &str, terminal: QueueJobState) {
        debug_assert!(terminal.is_finished());
        let mut state = self.lock_state();
        if let Some(entry) = state.entries.get_mut(job_id) {
            entry.state = terminal;
            entry.finished_at = Some(Instant::now());
        }
        state.finished.push_back(job_id.to_string());
        ProviderQueue::prune_finished(&mut state, &self.config);
    }

    async fn settle_cancelled(&self, job_id: &str) {
        match self.records.mark_cancelled(job_id).await {
            Ok(_) => {}
            // Already terminal (e.g. the executor finished first): fine.
            Err(Error::InvalidTransition { .. }) => {}
            Err(err) => {
                warn!(job = %job_id, error = %err, "failed to record cancellation");
            }
        }
    }

    async fn settle_failed(&self, job_id: &str, error: &Error) {
        match self.records.mark_failed(job_id, error.to_string()).await {
            Ok(_) => {}
            // The executor may have marked the job failed itself.
            Err(Error::InvalidTransition { .. }) => {}
            Err(err) => {
                warn!(job = %job_id, error = %err, "failed to record executor failure");
            }
        }
    }

    async fn run(&self, job_id: String, payload: serde_json::Value, cancel: CancelFlag) {
        // Cancelled while waiting for the rate limiter.
        if cancel.is_raised() {
            self.settle_cancelled(&job_id).await;
            self.finish(&job_id, QueueJobState::Cancelled);
            return;
        }

        let ctx = ExecutionContext {
            job_id: job_id.clone(),
            provider: self.provider,
            payload,
            records: self.records.clone(),
            cancel: cancel.clone(),
        };

        let mut attempt = 0;
        let outcome = loop {
            match self.executor.execute(&ctx).await {
                Ok(()) => break Ok(()),
                Err(err)
                    if err.is_retryable()
                        && attempt < self.config.retry.max_retries
                        && !cancel.is_raised() =>
                {
                    let backoff = self.config.retry.backoff_for(attempt);
                    warn!(
                        provider = %self.provider,
                        job = %job_id,
                        attempt,
                        backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "transient executor failure, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(err) => break Err(err),
            }
        };

        match outcome {
            Ok(()) => {
                // "Finished normally after a cancel request" is a valid,
                // non-error outcome.
                self.finish(&job_id, QueueJobState::Done);
            }
            Err(err) => {
                self.settle_failed(&job_id, &err).await;
                self.finish(&job_id, QueueJobState::Failed);
            }
        }
    }
}

async fn worker_loop(shared: Arc<QueueShared>) {
    loop {
        let work = loop {
            if let Some(work) = shared.take_next() {
                break work;
            }
            shared.notify.notified().await;
        };
        shared.limiter.until_ready().await;
        let (job_id, payload, cancel) = work;
        shared.run(job_id, payload, cancel).await;
    }
}
