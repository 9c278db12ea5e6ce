//! Security reconnaissance job orchestration: consent-gated admission,
//! per-provider dispatch, and real-time result propagation.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use scout::{DispatcherBuilder, Metadata, Provider, ScanService};
//! use scout::{ChangeFeed, EventBus, Gateway, JobRecordManager, MemoryStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> scout::Result<()> {
//!     let store: Arc<dyn scout::Store> = Arc::new(MemoryStore::new());
//!
//!     // Real-time propagation: store writes -> event bus -> clients.
//!     let bus = EventBus::new();
//!     let _feed = ChangeFeed::attach(&store, &bus);
//!     let gateway = Gateway::new();
//!     let _pump = gateway.start_pump(&bus);
//!
//!     // Admission and dispatch.
//!     let dispatcher = DispatcherBuilder::new()
//!         .provider(Provider::Subdomains, my_subdomains_executor())
//!         .provider(Provider::Zap, my_zap_executor())
//!         .build(JobRecordManager::new(store.clone()));
//!     let service = ScanService::new(store, dispatcher);
//!
//!     let tickets = service
//!         .submit("example.com", &[Provider::Subdomains], Metadata::new())
//!         .await?;
//!     println!("queued: {}", tickets[0].job_id);
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/scout/0.3.0")]

// Re-export core types
pub use scout_core::*;

// Re-export storage
pub use scout_store::{MemoryStore, Store};

// Re-export admission and dispatch
pub use scout_dispatch::{
    AdmissionGate, CancelFlag, CancelOutcome, Dispatcher, DispatcherBuilder, ExecutionContext,
    Executor, JobRecordManager, JobTicket, ProviderQueue, QueueConfig, QueueJobState,
    RetentionConfig, RetryConfig, ScanService,
};

// Re-export real-time propagation
pub use scout_gateway::{
    progress_stream, ChangeFeed, DomainEvent, EventBus, Gateway, ServerMessage, StreamFrame,
    DEFAULT_POLL_PERIOD,
};

// Re-export runtime for convenience
pub use serde;
pub use serde_json;
pub use tokio;

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use futures_util::StreamExt;
    use std::sync::Arc;
    use std::time::Duration;

    /// Executor standing in for a real scan wrapper: announces itself,
    /// reports one finding, finishes.
    struct FakeZap;

    #[async_trait]
    impl Executor for FakeZap {
        async fn execute(&self, ctx: &ExecutionContext) -> Result<()> {
            ctx.records.mark_running(&ctx.job_id).await?;
            ctx.records.update_progress(&ctx.job_id, 70).await?;

            let now = Utc::now();
            ctx.records
                .upsert_finding(Finding {
                    asset_id: ctx.payload["assetId"].as_str().unwrap_or_default().into(),
                    target: ctx.payload["target"].as_str().unwrap_or_default().into(),
                    provider: ctx.provider,
                    category: "injection".into(),
                    title: "SQL injection".into(),
                    description: "login form parameter".into(),
                    severity: Severity::High,
                    score: Some(8.6),
                    evidence: None,
                    fingerprint: "zap:sqli:/login:user".into(),
                    first_seen: now,
                    last_seen: now,
                    metadata: Metadata::new(),
                })
                .await?;

            ctx.records
                .mark_done(&ctx.job_id, "scan complete", Metadata::new())
                .await?;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_submit_to_push_delivery_end_to_end() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let mut asset = Asset::new("a1", "example.com");
        asset.verified_at = Some(Utc::now());
        store.insert_asset(asset).await.unwrap();

        let bus = EventBus::new();
        let _feed = ChangeFeed::attach(&store, &bus);
        let gateway = Gateway::new();
        let _pump = gateway.start_pump(&bus);
        let mut client = gateway.register("ui-1").await;

        let dispatcher = DispatcherBuilder::new()
            .provider(Provider::Zap, Arc::new(FakeZap))
            .build(JobRecordManager::new(store.clone()));
        let service = ScanService::new(store.clone(), dispatcher);

        let tickets = service
            .submit("example.com", &[Provider::Zap], Metadata::new())
            .await
            .unwrap();
        let job_id = tickets[0].job_id.clone();

        // The push channel replays the whole lifecycle: pending insert,
        // running, progress, the finding, and exactly one done update.
        let mut done_updates = 0;
        let mut findings = 0;
        while done_updates == 0 {
            let message = tokio::time::timeout(Duration::from_secs(5), client.recv())
                .await
                .expect("push channel stalled")
                .expect("gateway closed");
            match message {
                ServerMessage::JobUpdate { job } => {
                    assert_eq!(job.id, job_id);
                    if job.status == JobStatus::Done {
                        assert_eq!(job.progress, 100);
                        done_updates += 1;
                    }
                }
                ServerMessage::FindingNew { finding } => {
                    assert_eq!(finding.title, "SQL injection");
                    findings += 1;
                }
                other => panic!("unexpected push message: {other:?}"),
            }
        }
        assert_eq!(findings, 1);

        // The pull channel replays the recorded progress sample.
        let mut frames = Box::pin(progress_stream(
            store.clone(),
            job_id.clone(),
            Duration::from_millis(5),
        ));
        assert_eq!(
            frames.next().await,
            Some(StreamFrame::Connected { job_id: job_id.clone() })
        );
        let Some(StreamFrame::Progress { value, .. }) = frames.next().await else {
            panic!("expected a progress frame");
        };
        assert!((value - 70.0).abs() < f64::EPSILON);
    }
}
