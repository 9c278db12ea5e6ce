use super::{Metadata, Provider};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One unit of dispatched work, retained forever as audit trail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Client-visible id; the idempotency and cancellation handle
    pub id: String,

    /// Task type that will execute this job
    pub provider: Provider,

    /// Target asset reference
    pub asset_id: String,

    /// Denormalized target name
    pub target: String,

    /// Lifecycle status
    pub status: JobStatus,

    /// Progress in percent, 0-100
    #[serde(default)]
    pub progress: u8,

    /// Human-readable status message
    #[serde(default)]
    pub message: Option<String>,

    /// Error text for failed jobs
    #[serde(default)]
    pub error: Option<String>,

    /// Creation time (admission)
    pub created_at: DateTime<Utc>,

    /// When the executor started
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,

    /// When the job reached a terminal state
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,

    /// Free-form metadata, e.g. the chosen scan mode
    #[serde(default)]
    pub metadata: Metadata,
}

impl Job {
    /// Create a pending job for an admitted target
    #[must_use]
    pub fn pending(
        id: impl Into<String>,
        provider: Provider,
        asset_id: impl Into<String>,
        target: impl Into<String>,
        metadata: Metadata,
    ) -> Self {
        Self {
            id: id.into(),
            provider,
            asset_id: asset_id.into(),
            target: target.into(),
            status: JobStatus::Pending,
            progress: 0,
            message: None,
            error: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
            metadata,
        }
    }
}

/// Job lifecycle states
///
/// Valid transitions: `Pending -> Running -> {Done, Failed, Cancelled}`,
/// plus `Pending -> {Failed, Cancelled}` for jobs that never start.
/// `Running -> Running` is the progress-update path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Created, waiting in a queue
    Pending,
    /// Handed to an executor
    Running,
    /// Finished successfully
    Done,
    /// Finished with an error
    Failed,
    /// Cancelled before completion
    Cancelled,
}

impl JobStatus {
    /// Returns true for the three trailing states
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::Cancelled)
    }

    /// Returns true if a transition to `next` is allowed by the lifecycle
    /// state machine. No transition is defined out of a terminal state.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        match self {
            Self::Pending => matches!(next, Self::Running | Self::Failed | Self::Cancelled),
            Self::Running => matches!(
                next,
                Self::Running | Self::Done | Self::Failed | Self::Cancelled
            ),
            Self::Done | Self::Failed | Self::Cancelled => false,
        }
    }

    /// Stable lowercase name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Done => "done",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
