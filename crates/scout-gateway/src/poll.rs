//! Pull channel: a lazy streaming snapshot poll for one job's progress.

use crate::StreamFrame;
use chrono::{DateTime, Utc};
use futures_util::stream::{self, Stream};
use scout_core::{MetricEntity, PROGRESS_METRIC};
use scout_store::Store;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Interval;
use tracing::warn;

/// Default tick for progress streams
pub const DEFAULT_POLL_PERIOD: Duration = Duration::from_secs(2);

enum Phase {
    Greet,
    Poll {
        ticker: Interval,
        last_sent: Option<DateTime<Utc>>,
    },
}

struct PollState {
    store: Arc<dyn Store>,
    job_id: String,
    phase: Phase,
}

/// Observe one job's progress by polling its latest `progress` metric.
///
/// The first frame is always `Connected`; afterwards each tick queries the
/// most recent progress sample for the job and emits it only if it is newer
/// than the last one sent. No sample yet means a silent tick, not an error,
/// and a failed query is logged and skipped rather than ending the stream.
///
/// The stream is lazy: nothing is queried until it is polled, and dropping
/// it stops all querying immediately. There is no dangling timer past the
/// consumer's disconnect.
pub fn progress_stream(
    store: Arc<dyn Store>,
    job_id: impl Into<String>,
    period: Duration,
) -> impl Stream<Item = StreamFrame> {
    let state = PollState {
        store,
        job_id: job_id.into(),
        phase: Phase::Greet,
    };

    stream::unfold(state, move |mut state| async move {
        loop {
            match &mut state.phase {
                Phase::Greet => {
                    let frame = StreamFrame::Connected {
                        job_id: state.job_id.clone(),
                    };
                    state.phase = Phase::Poll {
                        ticker: tokio::time::interval(period),
                        last_sent: None,
                    };
                    return Some((frame, state));
                }
                Phase::Poll { ticker, last_sent } => {
                    ticker.tick().await;
                    let entity = MetricEntity::Job(state.job_id.clone());
                    match state.store.latest_metric(&entity, PROGRESS_METRIC).await {
                        Ok(Some(sample))
                            if last_sent.map_or(true, |sent| sample.recorded_at > sent) =>
                        {
                            *last_sent = Some(sample.recorded_at);
                            let frame = StreamFrame::Progress {
                                job_id: state.job_id.clone(),
                                value: sample.value,
                                timestamp: sample.recorded_at,
                            };
                            return Some((frame, state));
                        }
                        // No sample yet, or nothing newer: silent tick.
                        Ok(_) => {}
                        Err(err) => {
                            warn!(job = %state.job_id, error = %err, "progress poll failed");
                        }
                    }
                }
            }
        }
    })
}
