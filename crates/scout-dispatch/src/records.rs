//! Job record manager: the single writer of job and finding state.

use chrono::Utc;
use scout_core::{
    Asset, Error, Finding, Job, JobStatus, Metadata, Metric, Provider, Result,
};
use scout_store::Store;
use std::sync::Arc;
use tracing::{debug, info};

/// Progress value stamped when a job starts running
const RUNNING_PROGRESS_FLOOR: u8 = 10;

/// Owns the job lifecycle state machine and the finding dedup contract.
///
/// Both the admission path (job creation) and external executors (progress,
/// status, and result updates) write through this type; nothing else
/// mutates job or finding documents. Every write here is what the change
/// feed observes — this component knows nothing about real-time delivery.
#[derive(Clone)]
pub struct JobRecordManager {
    store: Arc<dyn Store>,
}

impl JobRecordManager {
    /// Create a manager over the given store
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Create a `pending` job record for an admitted target
    pub async fn create(
        &self,
        asset: &Asset,
        provider: Provider,
        job_id: impl Into<String>,
        metadata: Metadata,
    ) -> Result<Job> {
        let job = Job::pending(job_id, provider, &asset.id, &asset.name, metadata);
        self.store.insert_job(job.clone()).await?;
        info!(job = %job.id, provider = %provider, target = %job.target, "job created");
        Ok(job)
    }

    /// Transition `pending -> running`, stamping the start time and the
    /// progress floor. Calling this on an already-running job is a no-op,
    /// so a retried executor can safely re-announce itself.
    pub async fn mark_running(&self, job_id: &str) -> Result<Job> {
        let mut job = self.load(job_id).await?;
        if job.status == JobStatus::Running {
            return Ok(job);
        }
        self.check_transition(&job, JobStatus::Running)?;

        job.status = JobStatus::Running;
        job.started_at = Some(Utc::now());
        job.progress = job.progress.max(RUNNING_PROGRESS_FLOOR);
        self.store.update_job(job.clone()).await?;
        debug!(job = %job_id, "job running");
        Ok(job)
    }

    /// Record progress on a running job. The percent is clamped to 0-100;
    /// a `progress` metric sample is appended for the pull channel.
    pub async fn update_progress(&self, job_id: &str, percent: u8) -> Result<Job> {
        let mut job = self.load(job_id).await?;
        if job.status != JobStatus::Running {
            return Err(self.transition_error(&job, JobStatus::Running));
        }

        job.progress = percent.min(100);
        self.store.update_job(job.clone()).await?;
        self.store
            .append_metric(Metric::job_progress(job_id, job.progress))
            .await?;
        Ok(job)
    }

    /// Transition to `done`, stamping the finish time and merging result
    /// metadata into the job document
    pub async fn mark_done(
        &self,
        job_id: &str,
        message: impl Into<String>,
        metadata: Metadata,
    ) -> Result<Job> {
        let mut job = self.load(job_id).await?;
        self.check_transition(&job, JobStatus::Done)?;

        job.status = JobStatus::Done;
        job.progress = 100;
        job.message = Some(message.into());
        job.finished_at = Some(Utc::now());
        for (key, value) in metadata {
            job.metadata.insert(key, value);
        }
        self.store.update_job(job.clone()).await?;
        info!(job = %job_id, "job done");
        Ok(job)
    }

    /// Transition to `failed` with error text.
    ///
    /// Also the path taken when the gate or dispatcher errors after the
    /// record exists but before an executor ever starts, so observers are
    /// never left waiting on a job that will not run.
    pub async fn mark_failed(&self, job_id: &str, error: impl Into<String>) -> Result<Job> {
        let mut job = self.load(job_id).await?;
        self.check_transition(&job, JobStatus::Failed)?;

        job.status = JobStatus::Failed;
        job.error = Some(error.into());
        job.finished_at = Some(Utc::now());
        self.store.update_job(job.clone()).await?;
        info!(job = %job_id, error = job.error.as_deref().unwrap_or(""), "job failed");
        Ok(job)
    }

    /// Transition to `cancelled`
    pub async fn mark_cancelled(&self, job_id: &str) -> Result<Job> {
        let mut job = self.load(job_id).await?;
        self.check_transition(&job, JobStatus::Cancelled)?;

        job.status = JobStatus::Cancelled;
        job.finished_at = Some(Utc::now());
        self.store.update_job(job.clone()).await?;
        info!(job = %job_id, "job cancelled");
        Ok(job)
    }

    /// Create-or-update a finding keyed by `(asset_id, provider,
    /// fingerprint)`.
    ///
    /// The sole integrity guarantee preventing duplicate findings when a
    /// retried executor re-reports results it already reported once.
    pub async fn upsert_finding(&self, mut finding: Finding) -> Result<Finding> {
        finding.last_seen = Utc::now();
        let stored = self.store.upsert_finding(finding).await?;
        debug!(
            target = %stored.target,
            provider = %stored.provider,
            fingerprint = %stored.fingerprint,
            "finding upserted"
        );
        Ok(stored)
    }

    /// Read a job record
    pub async fn job(&self, job_id: &str) -> Result<Option<Job>> {
        self.store.job(job_id).await
    }

    async fn load(&self, job_id: &str) -> Result<Job> {
        self.store
            .job(job_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("job {job_id}")))
    }

    fn check_transition(&self, job: &Job, next: JobStatus) -> Result<()> {
        if job.status.can_transition_to(next) {
            Ok(())
        } else {
            Err(self.transition_error(job, next))
        }
    }

    fn transition_error(&self, job: &Job, next: JobStatus) -> Error {
        Error::InvalidTransition {
            job_id: job.id.clone(),
            from: job.status.to_string(),
            to: next.to_string(),
        }
    }
}

impl std::fmt::Debug for JobRecordManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobRecordManager").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scout_core::{MetricEntity, Severity};
    use scout_store::MemoryStore;

    fn manager() -> (JobRecordManager, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (JobRecordManager::new(store.clone()), store)
    }

    async fn pending_job(records: &JobRecordManager, id: &str) {
        let asset = Asset::new("a1", "example.com");
        records
            .create(&asset, Provider::Zap, id, Metadata::new())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_full_lifecycle() {
        let (records, _) = manager();
        pending_job(&records, "zap-1").await;

        let job = records.mark_running("zap-1").await.unwrap();
        assert_eq!(job.status, JobStatus::Running);
        assert_eq!(job.progress, 10);
        assert!(job.started_at.is_some());

        let job = records.update_progress("zap-1", 50).await.unwrap();
        assert_eq!(job.progress, 50);

        let mut meta = Metadata::new();
        meta.insert("findingsCount".into(), 2.into());
        let job = records.mark_done("zap-1", "done", meta).await.unwrap();
        assert_eq!(job.status, JobStatus::Done);
        assert_eq!(job.progress, 100);
        assert_eq!(job.metadata["findingsCount"], 2);
        assert!(job.finished_at.is_some());
    }

    #[tokio::test]
    async fn test_no_transition_out_of_terminal() {
        let (records, _) = manager();
        pending_job(&records, "zap-1").await;
        records.mark_running("zap-1").await.unwrap();
        records.mark_done("zap-1", "done", Metadata::new()).await.unwrap();

        for result in [
            records.mark_running("zap-1").await,
            records.mark_failed("zap-1", "late failure").await,
            records.mark_cancelled("zap-1").await,
            records.update_progress("zap-1", 99).await,
        ] {
            assert!(matches!(result, Err(Error::InvalidTransition { .. })));
        }

        // The stored document is untouched.
        let job = records.job("zap-1").await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Done);
        assert!(job.error.is_none());
    }

    #[tokio::test]
    async fn test_mark_running_is_idempotent() {
        let (records, _) = manager();
        pending_job(&records, "zap-1").await;

        let first = records.mark_running("zap-1").await.unwrap();
        records.update_progress("zap-1", 40).await.unwrap();
        let second = records.mark_running("zap-1").await.unwrap();

        assert_eq!(second.status, JobStatus::Running);
        assert_eq!(second.started_at, first.started_at);
        // Progress is not rewound by a re-announcement.
        assert_eq!(second.progress, 40);
    }

    #[tokio::test]
    async fn test_progress_clamped_and_sampled() {
        let (records, store) = manager();
        pending_job(&records, "zap-1").await;
        records.mark_running("zap-1").await.unwrap();

        let job = records.update_progress("zap-1", 250).await.unwrap();
        assert_eq!(job.progress, 100);

        let sample = store
            .latest_metric(&MetricEntity::Job("zap-1".into()), "progress")
            .await
            .unwrap()
            .unwrap();
        assert!((sample.value - 100.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_progress_requires_running() {
        let (records, _) = manager();
        pending_job(&records, "zap-1").await;
        assert!(matches!(
            records.update_progress("zap-1", 10).await,
            Err(Error::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn test_duplicate_finding_report_stores_one_document() {
        let (records, store) = manager();
        let now = Utc::now();
        let report = |severity| Finding {
            asset_id: "a1".into(),
            target: "example.com".into(),
            provider: Provider::Zap,
            category: "injection".into(),
            title: "SQL injection".into(),
            description: "login form parameter".into(),
            severity,
            score: Some(8.6),
            evidence: None,
            fingerprint: "zap:sqli:/login:user".into(),
            first_seen: now,
            last_seen: now,
            metadata: Metadata::new(),
        };

        // Executor crashes after reporting, retries, reports again.
        records.upsert_finding(report(Severity::High)).await.unwrap();
        records.upsert_finding(report(Severity::High)).await.unwrap();

        let all = store.findings_for_asset("a1").await.unwrap();
        assert_eq!(all.len(), 1);
    }
}
