//! Wire messages for the push and pull delivery channels.

use chrono::{DateTime, Utc};
use scout_core::{Finding, Job};
use serde::{Deserialize, Serialize};

/// One event pushed to connected gateway clients.
///
/// Serialized as `{"event": "...", "data": {...}}` so clients can route on
/// the event name without inspecting the payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerMessage {
    /// A job document changed; broadcast to every client
    #[serde(rename = "job:update")]
    JobUpdate {
        /// The full updated document
        job: Job,
    },

    /// A new finding was recorded; broadcast to every client
    #[serde(rename = "finding:new")]
    FindingNew {
        /// The inserted document
        finding: Finding,
    },

    /// One log line from a running scan; sent only to the job's room
    #[serde(rename = "job:log")]
    JobLog {
        /// Job the line belongs to
        #[serde(rename = "jobId")]
        job_id: String,

        /// Raw log line
        log: String,

        /// When the line was attributed
        timestamp: DateTime<Utc>,
    },

    /// Acknowledges a successful cancel request; sent only to the requester
    #[serde(rename = "job:cancelled")]
    JobCancelled {
        /// The cancelled job
        #[serde(rename = "jobId")]
        job_id: String,
    },

    /// A request-scoped failure; sent only to the requester
    #[serde(rename = "error")]
    Error {
        /// Human-readable description
        message: String,
    },
}

/// One frame of the streaming snapshot poll
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamFrame {
    /// First frame: the stream is established
    Connected {
        /// Job being observed
        #[serde(rename = "jobId")]
        job_id: String,
    },

    /// A progress sample newer than the last one sent
    Progress {
        /// Job being observed
        #[serde(rename = "jobId")]
        job_id: String,

        /// Sample value, in percent
        value: f64,

        /// When the sample was recorded
        timestamp: DateTime<Utc>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_tag_on_event_name() {
        let msg = ServerMessage::JobLog {
            job_id: "zap-1".into(),
            log: "spider: 40 urls".into(),
            timestamp: Utc::now(),
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["event"], "job:log");
        assert_eq!(value["data"]["jobId"], "zap-1");
        assert_eq!(value["data"]["log"], "spider: 40 urls");
    }

    #[test]
    fn test_progress_frame_shape() {
        let frame = StreamFrame::Progress {
            job_id: "zap-1".into(),
            value: 50.0,
            timestamp: Utc::now(),
        };
        let value = serde_json::to_value(&frame).unwrap();
        assert_eq!(value["type"], "progress");
        assert_eq!(value["jobId"], "zap-1");
        assert!((value["value"].as_f64().unwrap() - 50.0).abs() < f64::EPSILON);
    }
}
