//! Change feed: forwards store change streams onto the event bus.

use crate::{DomainEvent, EventBus};
use scout_core::{ChangeRecord, Error};
use scout_store::Store;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Tails the store's job and finding change streams and republishes each
/// record as a typed [`DomainEvent`].
///
/// Deployments without change-stream support degrade gracefully: `attach`
/// still succeeds, logs a warning per unavailable stream, and the pull
/// channel remains the only delivery path. A lagged forwarder drops the
/// missed records and keeps going; job documents remain the durable record
/// of anything a subscriber missed.
pub struct ChangeFeed {
    handles: Vec<JoinHandle<()>>,
}

impl ChangeFeed {
    /// Subscribe to the store's change streams and start forwarding
    #[must_use]
    pub fn attach(store: &Arc<dyn Store>, bus: &EventBus) -> Self {
        let mut handles = Vec::with_capacity(2);

        match store.watch_jobs() {
            Ok(rx) => handles.push(Self::forward(rx, bus.clone(), DomainEvent::Job, "jobs")),
            Err(Error::StreamUnavailable(reason)) => {
                warn!(stream = "jobs", %reason, "change stream unavailable, push channel degraded");
            }
            Err(err) => {
                warn!(stream = "jobs", error = %err, "change stream subscription failed");
            }
        }

        match store.watch_findings() {
            Ok(rx) => handles.push(Self::forward(rx, bus.clone(), DomainEvent::Finding, "findings")),
            Err(Error::StreamUnavailable(reason)) => {
                warn!(stream = "findings", %reason, "change stream unavailable, push channel degraded");
            }
            Err(err) => {
                warn!(stream = "findings", error = %err, "change stream subscription failed");
            }
        }

        Self { handles }
    }

    /// Whether any stream is being forwarded
    #[must_use]
    pub fn is_live(&self) -> bool {
        !self.handles.is_empty()
    }

    /// Stop the forwarder tasks
    pub fn shutdown(&mut self) {
        for handle in self.handles.drain(..) {
            handle.abort();
        }
    }

    fn forward<T>(
        mut rx: broadcast::Receiver<ChangeRecord<T>>,
        bus: EventBus,
        wrap: fn(ChangeRecord<T>) -> DomainEvent,
        stream: &'static str,
    ) -> JoinHandle<()>
    where
        T: Clone + Send + 'static,
    {
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(record) => bus.publish(wrap(record)),
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(stream, missed, "change feed lagged, records dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!(stream, "change stream closed");
                        break;
                    }
                }
            }
        })
    }
}

impl Drop for ChangeFeed {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for ChangeFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeFeed")
            .field("live", &self.is_live())
            .finish()
    }
}
