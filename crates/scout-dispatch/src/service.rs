//! Scan service: the single entry point composing gate, records, and
//! dispatcher.

use crate::{AdmissionGate, CancelOutcome, Dispatcher, JobRecordManager};
use scout_core::{Metadata, Provider, Result};
use scout_store::Store;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{error, info};

/// Receipt for one created-and-enqueued job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobTicket {
    /// The created job document's id
    pub job_id: String,

    /// The provider queue it was handed to
    pub provider: Provider,
}

/// Submit and cancel scans.
///
/// `submit` checks admission for *every* requested provider before creating
/// anything, so a rejected request leaves no job documents and no queue
/// entries behind.
pub struct ScanService {
    gate: AdmissionGate,
    records: JobRecordManager,
    dispatcher: Dispatcher,
    seq: AtomicU64,
}

impl ScanService {
    /// Compose a service over the given store and dispatcher
    #[must_use]
    pub fn new(store: Arc<dyn Store>, dispatcher: Dispatcher) -> Self {
        Self {
            gate: AdmissionGate::new(store.clone()),
            records: JobRecordManager::new(store),
            dispatcher,
            seq: AtomicU64::new(0),
        }
    }

    /// Request scans of `target` by the given providers.
    ///
    /// All-or-nothing admission: every provider must pass the gate and have
    /// a registered queue before the first job record is created.
    ///
    /// # Errors
    ///
    /// `NotFound`, `VerificationRequired`, or `UnknownProvider` from the
    /// admission phase; store errors from job creation.
    pub async fn submit(
        &self,
        target: &str,
        providers: &[Provider],
        options: Metadata,
    ) -> Result<Vec<JobTicket>> {
        // Admission phase: no side effects until every check passes.
        let mut admitted = Vec::with_capacity(providers.len());
        for &provider in providers {
            let asset = self.gate.admit(target, provider).await?;
            if !self.dispatcher.providers().contains(&provider) {
                return Err(scout_core::Error::UnknownProvider {
                    provider: provider.to_string(),
                });
            }
            admitted.push((provider, asset));
        }

        let mut tickets = Vec::with_capacity(admitted.len());
        for (provider, asset) in admitted {
            let job_id = self.next_job_id(provider);
            let payload = serde_json::json!({
                "target": asset.name,
                "assetId": asset.id,
                "options": options,
            });
            self.records
                .create(&asset, provider, &job_id, options.clone())
                .await?;

            if let Err(err) = self.dispatcher.submit(provider, &job_id, payload) {
                // The record exists but will never run; fail it so
                // observers are not left waiting.
                error!(job = %job_id, error = %err, "enqueue failed after job creation");
                self.records
                    .mark_failed(&job_id, format!("enqueue failed: {err}"))
                    .await?;
                return Err(err);
            }
            tickets.push(JobTicket { job_id, provider });
        }

        info!(target = %target, jobs = tickets.len(), "scan request accepted");
        Ok(tickets)
    }

    /// Cancel a previously submitted job.
    ///
    /// # Errors
    ///
    /// `UnknownProvider` if the provider has no registered queue.
    pub async fn cancel(&self, provider: Provider, job_id: &str) -> Result<CancelOutcome> {
        self.dispatcher.cancel(provider, job_id).await
    }

    /// The callback surface handed to executors and gateways
    #[must_use]
    pub fn records(&self) -> &JobRecordManager {
        &self.records
    }

    /// The underlying dispatcher, for status queries and shutdown
    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    fn next_job_id(&self, provider: Provider) -> String {
        let millis = chrono::Utc::now().timestamp_millis();
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        format!("{provider}-{millis}-{seq}")
    }
}

impl std::fmt::Debug for ScanService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanService").finish_non_exhaustive()
    }
}
