//! In-memory reference store.

use crate::Store;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use scout_core::{
    Asset, ChangeOp, ChangeRecord, Error, Finding, FindingKey, Job, Metric, MetricEntity, Result,
    METRIC_RETENTION_DAYS,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// In-memory [`Store`] implementation.
///
/// Mutations take a per-collection write lock, so every document write is
/// atomic and change records are published in application order. Cloning is
/// cheap and shares the underlying collections.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

struct Inner {
    assets: RwLock<HashMap<String, Asset>>,
    asset_names: RwLock<HashMap<String, String>>,
    jobs: RwLock<HashMap<String, Job>>,
    findings: RwLock<HashMap<FindingKey, Finding>>,
    metrics: RwLock<Vec<Metric>>,
    job_changes: broadcast::Sender<ChangeRecord<Job>>,
    finding_changes: broadcast::Sender<ChangeRecord<Finding>>,
    streams_enabled: bool,
}

impl MemoryStore {
    /// Create a store with change streams enabled
    #[must_use]
    pub fn new() -> Self {
        Self::with_streams(true)
    }

    /// Create a store that rejects change-stream subscriptions, matching a
    /// deployment mode without streaming change notifications
    #[must_use]
    pub fn without_change_streams() -> Self {
        Self::with_streams(false)
    }

    fn with_streams(streams_enabled: bool) -> Self {
        let (job_changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        let (finding_changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                assets: RwLock::new(HashMap::new()),
                asset_names: RwLock::new(HashMap::new()),
                jobs: RwLock::new(HashMap::new()),
                findings: RwLock::new(HashMap::new()),
                metrics: RwLock::new(Vec::new()),
                job_changes,
                finding_changes,
                streams_enabled,
            }),
        }
    }

    fn publish_job_change(&self, record: ChangeRecord<Job>) {
        // No receivers is not an error: at-most-once, no replay.
        let _ = self.inner.job_changes.send(record);
    }

    fn publish_finding_change(&self, record: ChangeRecord<Finding>) {
        let _ = self.inner.finding_changes.send(record);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("streams_enabled", &self.inner.streams_enabled)
            .field("job_watchers", &self.inner.job_changes.receiver_count())
            .finish()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_asset(&self, asset: Asset) -> Result<()> {
        let mut assets = self.inner.assets.write().await;
        let mut names = self.inner.asset_names.write().await;

        if assets.contains_key(&asset.id) {
            return Err(Error::Conflict(format!("asset id {}", asset.id)));
        }
        if names.contains_key(&asset.name) {
            return Err(Error::Conflict(format!("asset name {}", asset.name)));
        }

        debug!(asset = %asset.id, name = %asset.name, "asset registered");
        names.insert(asset.name.clone(), asset.id.clone());
        assets.insert(asset.id.clone(), asset);
        Ok(())
    }

    async fn asset(&self, id: &str) -> Result<Option<Asset>> {
        Ok(self.inner.assets.read().await.get(id).cloned())
    }

    async fn asset_by_name(&self, name: &str) -> Result<Option<Asset>> {
        let names = self.inner.asset_names.read().await;
        let Some(id) = names.get(name) else {
            return Ok(None);
        };
        Ok(self.inner.assets.read().await.get(id).cloned())
    }

    async fn set_asset_verified(&self, id: &str, when: DateTime<Utc>) -> Result<()> {
        let mut assets = self.inner.assets.write().await;
        let asset = assets
            .get_mut(id)
            .ok_or_else(|| Error::not_found(format!("asset {id}")))?;
        if asset.verified_at.is_none() {
            asset.verified_at = Some(when);
        }
        Ok(())
    }

    async fn insert_job(&self, job: Job) -> Result<()> {
        let mut jobs = self.inner.jobs.write().await;
        if jobs.contains_key(&job.id) {
            return Err(Error::Conflict(format!("job id {}", job.id)));
        }
        let record = ChangeRecord::with_document(ChangeOp::Insert, &job.id, job.clone());
        jobs.insert(job.id.clone(), job);
        // Published under the write lock: a concurrent writer must not be
        // able to apply later but publish earlier.
        self.publish_job_change(record);
        Ok(())
    }

    async fn job(&self, id: &str) -> Result<Option<Job>> {
        Ok(self.inner.jobs.read().await.get(id).cloned())
    }

    async fn update_job(&self, job: Job) -> Result<()> {
        let mut jobs = self.inner.jobs.write().await;
        if !jobs.contains_key(&job.id) {
            return Err(Error::not_found(format!("job {}", job.id)));
        }
        let record = ChangeRecord::with_document(ChangeOp::Update, &job.id, job.clone());
        jobs.insert(job.id.clone(), job);
        // Published under the write lock, see insert_job.
        self.publish_job_change(record);
        Ok(())
    }

    async fn upsert_finding(&self, finding: Finding) -> Result<Finding> {
        let key = finding.key();
        let mut findings = self.inner.findings.write().await;
        let stored = match findings.get_mut(&key) {
            Some(existing) => {
                let first_seen = existing.first_seen;
                let mut updated = finding;
                updated.first_seen = first_seen;
                *existing = updated.clone();
                self.publish_finding_change(ChangeRecord::with_document(
                    ChangeOp::Update,
                    &key.fingerprint,
                    updated.clone(),
                ));
                updated
            }
            None => {
                findings.insert(key.clone(), finding.clone());
                self.publish_finding_change(ChangeRecord::with_document(
                    ChangeOp::Insert,
                    &key.fingerprint,
                    finding.clone(),
                ));
                finding
            }
        };
        Ok(stored)
    }

    async fn finding(&self, key: &FindingKey) -> Result<Option<Finding>> {
        Ok(self.inner.findings.read().await.get(key).cloned())
    }

    async fn findings_for_asset(&self, asset_id: &str) -> Result<Vec<Finding>> {
        let findings = self.inner.findings.read().await;
        Ok(findings
            .values()
            .filter(|f| f.asset_id == asset_id)
            .cloned()
            .collect())
    }

    async fn append_metric(&self, metric: Metric) -> Result<()> {
        // Rolling expiry is applied opportunistically on the write path so
        // the collection stays bounded without a dedicated sweeper.
        let cutoff = Utc::now() - Duration::days(METRIC_RETENTION_DAYS);
        let mut metrics = self.inner.metrics.write().await;
        metrics.retain(|m| m.recorded_at >= cutoff);
        metrics.push(metric);
        Ok(())
    }

    async fn latest_metric(&self, entity: &MetricEntity, name: &str) -> Result<Option<Metric>> {
        let metrics = self.inner.metrics.read().await;
        Ok(metrics
            .iter()
            .filter(|m| &m.entity == entity && m.name == name)
            .max_by_key(|m| m.recorded_at)
            .cloned())
    }

    async fn prune_metrics(&self, max_age: Duration) -> Result<usize> {
        let cutoff = Utc::now() - max_age;
        let mut metrics = self.inner.metrics.write().await;
        let before = metrics.len();
        metrics.retain(|m| m.recorded_at >= cutoff);
        Ok(before - metrics.len())
    }

    fn watch_jobs(&self) -> Result<broadcast::Receiver<ChangeRecord<Job>>> {
        if !self.inner.streams_enabled {
            return Err(Error::StreamUnavailable(
                "store deployed without change streams".to_string(),
            ));
        }
        Ok(self.inner.job_changes.subscribe())
    }

    fn watch_findings(&self) -> Result<broadcast::Receiver<ChangeRecord<Finding>>> {
        if !self.inner.streams_enabled {
            return Err(Error::StreamUnavailable(
                "store deployed without change streams".to_string(),
            ));
        }
        Ok(self.inner.finding_changes.subscribe())
    }
}
