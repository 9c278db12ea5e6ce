//! The seam between queue workers and external scan executors.

use crate::JobRecordManager;
use async_trait::async_trait;
use scout_core::{Provider, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Best-effort cancellation signal shared between a queue and an executor.
///
/// The queue raises the flag on cancel requests for in-flight jobs; an
/// executor *may* observe it between units of work. An executor that
/// finishes normally after the flag is raised is a legitimate outcome, not
/// an error.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag {
    raised: Arc<AtomicBool>,
}

impl CancelFlag {
    /// Create an unraised flag
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation intent
    pub fn raise(&self) {
        self.raised.store(true, Ordering::Release);
    }

    /// Returns true if cancellation has been requested
    #[must_use]
    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Acquire)
    }
}

/// Everything an executor needs to run one job and report back
#[derive(Clone)]
pub struct ExecutionContext {
    /// The job being executed
    pub job_id: String,

    /// Provider this work belongs to
    pub provider: Provider,

    /// Opaque payload supplied at submission
    pub payload: serde_json::Value,

    /// Callback surface: `mark_running`, `update_progress`,
    /// `upsert_finding`, `mark_done`, `mark_failed`. Executors never write
    /// storage directly.
    pub records: JobRecordManager,

    /// Best-effort cancellation signal
    pub cancel: CancelFlag,
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("job_id", &self.job_id)
            .field("provider", &self.provider)
            .field("cancelled", &self.cancel.is_raised())
            .finish_non_exhaustive()
    }
}

/// One scan executor, registered per provider queue.
///
/// Implementations wrap the external scan tooling (out of scope here) and
/// report through `ctx.records`. Returning
/// [`Error::TransientExecutor`](scout_core::Error::TransientExecutor)
/// triggers the queue's retry policy; any other error is terminal and is
/// recorded as a `failed` job.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Execute one job attempt
    async fn execute(&self, ctx: &ExecutionContext) -> Result<()>;
}
