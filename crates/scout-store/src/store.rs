use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use scout_core::{Asset, ChangeRecord, Finding, FindingKey, Job, Metric, MetricEntity, Result};
use tokio::sync::broadcast;

/// Durable collections used by the orchestration core.
///
/// The Job Record Manager is the sole writer of job and finding documents;
/// everything above the store relies on per-document atomicity plus the
/// keyed finding upsert, so implementations need no cross-document
/// transactions.
#[async_trait]
pub trait Store: Send + Sync {
    // Assets

    /// Register an asset. Fails with `Conflict` on duplicate id or name.
    async fn insert_asset(&self, asset: Asset) -> Result<()>;

    /// Look up an asset by id.
    async fn asset(&self, id: &str) -> Result<Option<Asset>>;

    /// Look up an asset by fully-qualified name.
    async fn asset_by_name(&self, name: &str) -> Result<Option<Asset>>;

    /// Record completed ownership verification. Set-once: a second call is
    /// a no-op that preserves the original timestamp.
    async fn set_asset_verified(&self, id: &str, when: DateTime<Utc>) -> Result<()>;

    // Jobs

    /// Create a job record. Fails with `Conflict` on duplicate id.
    async fn insert_job(&self, job: Job) -> Result<()>;

    /// Look up a job by id.
    async fn job(&self, id: &str) -> Result<Option<Job>>;

    /// Replace a job document. Fails with `NotFound` for unknown ids.
    async fn update_job(&self, job: Job) -> Result<()>;

    // Findings

    /// Create-or-update keyed by `(asset_id, provider, fingerprint)` and
    /// return the stored document. `first_seen` survives re-observation.
    async fn upsert_finding(&self, finding: Finding) -> Result<Finding>;

    /// Look up a finding by its dedup key.
    async fn finding(&self, key: &FindingKey) -> Result<Option<Finding>>;

    /// All findings recorded against an asset.
    async fn findings_for_asset(&self, asset_id: &str) -> Result<Vec<Finding>>;

    // Metrics

    /// Append a time-series sample. Implementations apply the rolling
    /// retention window on write, so the collection stays bounded.
    async fn append_metric(&self, metric: Metric) -> Result<()>;

    /// Most recent sample for an entity and metric name, if any.
    async fn latest_metric(&self, entity: &MetricEntity, name: &str) -> Result<Option<Metric>>;

    /// Drop samples older than `max_age`, returning how many were removed.
    async fn prune_metrics(&self, max_age: Duration) -> Result<usize>;

    // Change streams

    /// Subscribe to job collection mutations in application order.
    ///
    /// Fails with `StreamUnavailable` when the deployment does not support
    /// streaming change notifications; callers degrade gracefully.
    fn watch_jobs(&self) -> Result<broadcast::Receiver<ChangeRecord<Job>>>;

    /// Subscribe to finding collection mutations in application order.
    fn watch_findings(&self) -> Result<broadcast::Receiver<ChangeRecord<Finding>>>;
}
