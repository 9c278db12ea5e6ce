//! Dispatcher: one independent queue per registered provider.

use crate::{CancelOutcome, Executor, JobRecordManager, ProviderQueue, QueueConfig, QueueJobState};
use scout_core::{Error, Provider, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Registers executors and their queue limits before the dispatcher starts
#[derive(Default)]
pub struct DispatcherBuilder {
    registrations: Vec<(Provider, QueueConfig, Arc<dyn Executor>)>,
}

impl DispatcherBuilder {
    /// Create an empty builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider with the default limits for its capability class
    #[must_use]
    pub fn provider(self, provider: Provider, executor: Arc<dyn Executor>) -> Self {
        self.provider_with_config(provider, QueueConfig::for_provider(provider), executor)
    }

    /// Register a provider with explicit queue limits
    #[must_use]
    pub fn provider_with_config(
        mut self,
        provider: Provider,
        config: QueueConfig,
        executor: Arc<dyn Executor>,
    ) -> Self {
        self.registrations.push((provider, config, executor));
        self
    }

    /// Spawn the queues and their workers
    #[must_use]
    pub fn build(self, records: JobRecordManager) -> Dispatcher {
        let queues = self
            .registrations
            .into_iter()
            .map(|(provider, config, executor)| {
                info!(
                    provider = %provider,
                    concurrency = config.concurrency,
                    rate_limit_per_minute = config.rate_limit_per_minute,
                    "provider queue starting"
                );
                let queue = ProviderQueue::start(provider, config, executor, records.clone());
                (provider, queue)
            })
            .collect();
        Dispatcher { queues }
    }
}

impl std::fmt::Debug for DispatcherBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatcherBuilder")
            .field("registrations", &self.registrations.len())
            .finish()
    }
}

/// Routes submissions and cancellations to per-provider queues.
///
/// Queues never share workers or limits; a backlog of intrusive scans never
/// delays passive lookups.
pub struct Dispatcher {
    queues: HashMap<Provider, ProviderQueue>,
}

impl Dispatcher {
    /// Hand a job to its provider's queue.
    ///
    /// # Errors
    ///
    /// `UnknownProvider` if no executor was registered for `provider`.
    pub fn submit(
        &self,
        provider: Provider,
        job_id: impl Into<String>,
        payload: serde_json::Value,
    ) -> Result<()> {
        let queue = self.queue(provider)?;
        queue.submit(job_id, payload);
        Ok(())
    }

    /// Cancel a job on its provider's queue.
    ///
    /// # Errors
    ///
    /// `UnknownProvider` if no executor was registered for `provider`;
    /// unknown *jobs* are a `Noop`, never an error.
    pub async fn cancel(&self, provider: Provider, job_id: &str) -> Result<CancelOutcome> {
        Ok(self.queue(provider)?.cancel(job_id).await)
    }

    /// Queue-level state of a job, if its provider is registered and the
    /// entry is still within retention
    #[must_use]
    pub fn status(&self, provider: Provider, job_id: &str) -> Option<QueueJobState> {
        self.queues
            .get(&provider)
            .and_then(|queue| queue.status(job_id))
    }

    /// Providers with a registered queue
    #[must_use]
    pub fn providers(&self) -> Vec<Provider> {
        self.queues.keys().copied().collect()
    }

    /// Stop all queue workers
    pub fn shutdown(&self) {
        for queue in self.queues.values() {
            queue.shutdown();
        }
    }

    fn queue(&self, provider: Provider) -> Result<&ProviderQueue> {
        self.queues
            .get(&provider)
            .ok_or_else(|| Error::UnknownProvider {
                provider: provider.to_string(),
            })
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("providers", &self.providers())
            .finish()
    }
}
