//! Fan-out gateway: routes domain events to connected clients.

use crate::{DomainEvent, EventBus, ServerMessage};
use chrono::Utc;
use scout_core::{ChangeOp, Provider};
use scout_dispatch::{CancelOutcome, Dispatcher};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

struct Inner {
    clients: RwLock<HashMap<String, mpsc::UnboundedSender<ServerMessage>>>,
    rooms: RwLock<HashMap<String, HashSet<String>>>,
}

/// Tracks connected clients and job-id rooms, and fans domain events out
/// with per-event scoping:
///
/// - job updates and new findings go to every connected client;
/// - job log lines go only to clients subscribed to that job's room;
/// - cancel acknowledgements and request errors go only to the requester.
///
/// Delivery is best-effort over unbounded per-client channels; a client
/// whose channel is gone is dropped on the next send that reaches it.
#[derive(Clone)]
pub struct Gateway {
    inner: Arc<Inner>,
}

impl Gateway {
    /// Create a gateway with no connected clients
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                clients: RwLock::new(HashMap::new()),
                rooms: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Connect a client, returning its message stream. Reconnecting under
    /// the same id replaces the previous channel.
    pub async fn register(&self, client_id: impl Into<String>) -> mpsc::UnboundedReceiver<ServerMessage> {
        let client_id = client_id.into();
        let (tx, rx) = mpsc::unbounded_channel();
        let previous = self.inner.clients.write().await.insert(client_id.clone(), tx);
        if previous.is_some() {
            debug!(client = %client_id, "client reconnected, previous channel replaced");
        }
        rx
    }

    /// Disconnect a client and drop all of its room subscriptions
    pub async fn unregister(&self, client_id: &str) {
        self.inner.clients.write().await.remove(client_id);
        let mut rooms = self.inner.rooms.write().await;
        rooms.retain(|_, members| {
            members.remove(client_id);
            !members.is_empty()
        });
    }

    /// Subscribe a client to a job's log room
    pub async fn join(&self, client_id: impl Into<String>, job_id: impl Into<String>) {
        self.inner
            .rooms
            .write()
            .await
            .entry(job_id.into())
            .or_default()
            .insert(client_id.into());
    }

    /// Remove a client from a job's log room
    pub async fn leave(&self, client_id: &str, job_id: &str) {
        let mut rooms = self.inner.rooms.write().await;
        if let Some(members) = rooms.get_mut(job_id) {
            members.remove(client_id);
            if members.is_empty() {
                rooms.remove(job_id);
            }
        }
    }

    /// Number of connected clients
    pub async fn client_count(&self) -> usize {
        self.inner.clients.read().await.len()
    }

    /// Send to every connected client
    pub async fn broadcast(&self, message: ServerMessage) {
        let dead: Vec<String> = {
            let clients = self.inner.clients.read().await;
            clients
                .iter()
                .filter(|(_, tx)| tx.send(message.clone()).is_err())
                .map(|(id, _)| id.clone())
                .collect()
        };
        for client_id in dead {
            warn!(client = %client_id, "dropping disconnected client");
            self.unregister(&client_id).await;
        }
    }

    /// Send to one client. Returns false if the client is not connected.
    pub async fn send_to(&self, client_id: &str, message: ServerMessage) -> bool {
        let delivered = self
            .inner
            .clients
            .read()
            .await
            .get(client_id)
            .is_some_and(|tx| tx.send(message).is_ok());
        if !delivered {
            debug!(client = %client_id, "directed message undeliverable");
        }
        delivered
    }

    /// Deliver one scan log line to the job's room members only
    pub async fn publish_log(&self, job_id: &str, log: impl Into<String>) {
        let members: Vec<String> = {
            let rooms = self.inner.rooms.read().await;
            rooms
                .get(job_id)
                .map(|members| members.iter().cloned().collect())
                .unwrap_or_default()
        };
        let log = log.into();
        let timestamp = Utc::now();
        for client_id in members {
            self.send_to(
                &client_id,
                ServerMessage::JobLog {
                    job_id: job_id.to_string(),
                    log: log.clone(),
                    timestamp,
                },
            )
            .await;
        }
    }

    /// Forward a client's cancel request to the dispatcher and report back
    /// to that client only.
    ///
    /// A successful removal or signal is acknowledged with `job:cancelled`;
    /// a no-op (unknown or already-finished job) sends nothing; a dispatch
    /// error becomes a generic `error` message for the requester.
    pub async fn cancel_job(
        &self,
        client_id: &str,
        dispatcher: &Dispatcher,
        provider: Provider,
        job_id: &str,
    ) {
        match dispatcher.cancel(provider, job_id).await {
            Ok(CancelOutcome::Removed | CancelOutcome::Signalled) => {
                self.notify_cancelled(client_id, job_id).await;
            }
            Ok(CancelOutcome::Noop) => {}
            Err(err) => {
                warn!(client = %client_id, job = %job_id, error = %err, "cancel request failed");
                self.notify_error(client_id, "cancel failed").await;
            }
        }
    }

    /// Acknowledge a cancel request to its requester only
    pub async fn notify_cancelled(&self, client_id: &str, job_id: impl Into<String>) -> bool {
        self.send_to(
            client_id,
            ServerMessage::JobCancelled {
                job_id: job_id.into(),
            },
        )
        .await
    }

    /// Report a request-scoped failure to its requester only
    pub async fn notify_error(&self, client_id: &str, message: impl Into<String>) -> bool {
        self.send_to(
            client_id,
            ServerMessage::Error {
                message: message.into(),
            },
        )
        .await
    }

    /// Start forwarding bus events to connected clients.
    ///
    /// Job changes become `job:update` broadcasts; finding *inserts* become
    /// `finding:new` broadcasts. Finding updates (re-observations) and
    /// deletes are not pushed.
    #[must_use]
    pub fn start_pump(&self, bus: &EventBus) -> JoinHandle<()> {
        let gateway = self.clone();
        let mut rx = bus.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(DomainEvent::Job(record)) => {
                        if let Some(job) = record.document {
                            gateway.broadcast(ServerMessage::JobUpdate { job }).await;
                        }
                    }
                    Ok(DomainEvent::Finding(record)) => {
                        if record.op == ChangeOp::Insert {
                            if let Some(finding) = record.document {
                                gateway
                                    .broadcast(ServerMessage::FindingNew { finding })
                                    .await;
                            }
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "gateway pump lagged, events dropped");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}

impl Default for Gateway {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use scout_core::{ChangeRecord, Finding, Job, JobStatus, Metadata, Provider, Severity};

    fn done_job() -> Job {
        let mut job = Job::pending("zap-1", Provider::Zap, "a1", "example.com", Metadata::new());
        job.status = JobStatus::Done;
        job.progress = 100;
        job
    }

    fn finding() -> Finding {
        let now = Utc::now();
        Finding {
            asset_id: "a1".into(),
            target: "example.com".into(),
            provider: Provider::Zap,
            category: "xss".into(),
            title: "Reflected XSS".into(),
            description: "search parameter".into(),
            severity: Severity::Medium,
            score: None,
            evidence: None,
            fingerprint: "zap:xss:/search:q".into(),
            first_seen: now,
            last_seen: now,
            metadata: Metadata::new(),
        }
    }

    #[tokio::test]
    async fn test_job_updates_broadcast_to_all_clients() {
        let bus = EventBus::new();
        let gateway = Gateway::new();
        let _pump = gateway.start_pump(&bus);
        let mut alpha = gateway.register("alpha").await;
        let mut beta = gateway.register("beta").await;

        bus.publish(DomainEvent::Job(ChangeRecord::with_document(
            scout_core::ChangeOp::Update,
            "zap-1",
            done_job(),
        )));

        for rx in [&mut alpha, &mut beta] {
            let ServerMessage::JobUpdate { job } = rx.recv().await.unwrap() else {
                panic!("expected job:update");
            };
            assert_eq!(job.status, JobStatus::Done);
        }
        // Exactly one message each.
        assert!(alpha.try_recv().is_err());
        assert!(beta.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_finding_updates_are_not_pushed() {
        let bus = EventBus::new();
        let gateway = Gateway::new();
        let _pump = gateway.start_pump(&bus);
        let mut rx = gateway.register("alpha").await;

        bus.publish(DomainEvent::Finding(ChangeRecord::with_document(
            scout_core::ChangeOp::Update,
            "zap-1",
            finding(),
        )));
        bus.publish(DomainEvent::Finding(ChangeRecord::with_document(
            scout_core::ChangeOp::Insert,
            "zap-1",
            finding(),
        )));

        // Only the insert arrives.
        let ServerMessage::FindingNew { finding } = rx.recv().await.unwrap() else {
            panic!("expected finding:new");
        };
        assert_eq!(finding.title, "Reflected XSS");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_log_lines_stay_in_the_room() {
        let gateway = Gateway::new();
        let mut member = gateway.register("member").await;
        let mut outsider = gateway.register("outsider").await;
        gateway.join("member", "zap-1").await;

        gateway.publish_log("zap-1", "spider: 40 urls").await;

        let ServerMessage::JobLog { job_id, log, .. } = member.recv().await.unwrap() else {
            panic!("expected job:log");
        };
        assert_eq!(job_id, "zap-1");
        assert_eq!(log, "spider: 40 urls");
        assert!(outsider.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_cancel_acknowledged_to_requester_only() {
        let gateway = Gateway::new();
        let mut requester = gateway.register("requester").await;
        let mut other = gateway.register("other").await;

        assert!(gateway.notify_cancelled("requester", "zap-1").await);

        let ServerMessage::JobCancelled { job_id } = requester.recv().await.unwrap() else {
            panic!("expected job:cancelled");
        };
        assert_eq!(job_id, "zap-1");
        assert!(other.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_cancel_request_reported_to_requester_only() {
        use scout_dispatch::{
            DispatcherBuilder, ExecutionContext, Executor, JobRecordManager, QueueJobState,
        };
        use scout_store::MemoryStore;
        use std::time::Duration;

        struct SlowExecutor;

        #[async_trait::async_trait]
        impl Executor for SlowExecutor {
            async fn execute(&self, ctx: &ExecutionContext) -> scout_core::Result<()> {
                for _ in 0..100 {
                    if ctx.cancel.is_raised() {
                        return Ok(());
                    }
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
                Ok(())
            }
        }

        let records = JobRecordManager::new(Arc::new(MemoryStore::new()));
        let dispatcher = DispatcherBuilder::new()
            .provider(Provider::Zap, Arc::new(SlowExecutor))
            .build(records);
        let gateway = Gateway::new();
        let mut requester = gateway.register("requester").await;
        let mut other = gateway.register("other").await;

        // Unknown job: a no-op, and nothing is pushed to anyone.
        gateway
            .cancel_job("requester", &dispatcher, Provider::Zap, "zap-9")
            .await;
        assert!(requester.try_recv().is_err());

        dispatcher
            .submit(Provider::Zap, "zap-1", serde_json::Value::Null)
            .unwrap();
        for _ in 0..200 {
            if dispatcher.status(Provider::Zap, "zap-1") == Some(QueueJobState::Running) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        gateway
            .cancel_job("requester", &dispatcher, Provider::Zap, "zap-1")
            .await;
        let ServerMessage::JobCancelled { job_id } = requester.recv().await.unwrap() else {
            panic!("expected job:cancelled");
        };
        assert_eq!(job_id, "zap-1");
        assert!(other.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unregister_clears_room_membership() {
        let gateway = Gateway::new();
        let _rx = gateway.register("member").await;
        gateway.join("member", "zap-1").await;

        gateway.unregister("member").await;
        assert_eq!(gateway.client_count().await, 0);

        // No receivers and no rooms left; logging is a quiet no-op.
        gateway.publish_log("zap-1", "late line").await;
        assert!(!gateway.notify_error("member", "gone").await);
    }
}
