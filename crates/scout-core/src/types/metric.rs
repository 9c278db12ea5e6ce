use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metric name used for job progress samples consumed by the pull channel
pub const PROGRESS_METRIC: &str = "progress";

/// Default rolling retention window for metric samples
pub const METRIC_RETENTION_DAYS: i64 = 14;

/// Entity a metric sample is tagged to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum MetricEntity {
    /// A dispatched job
    Job(String),
    /// A scan target
    Asset(String),
    /// The system as a whole
    System,
}

/// A time-series sample; append-only with rolling expiry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metric {
    /// Tagged entity
    pub entity: MetricEntity,

    /// Metric name, e.g. [`PROGRESS_METRIC`]
    pub name: String,

    /// Sample value
    pub value: f64,

    /// Optional unit, e.g. "percent"
    #[serde(default)]
    pub unit: Option<String>,

    /// Sample time
    pub recorded_at: DateTime<Utc>,
}

impl Metric {
    /// A `progress` sample for a job, in percent
    #[must_use]
    pub fn job_progress(job_id: impl Into<String>, percent: u8) -> Self {
        Self {
            entity: MetricEntity::Job(job_id.into()),
            name: PROGRESS_METRIC.to_string(),
            value: f64::from(percent),
            unit: Some("percent".to_string()),
            recorded_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_progress_sample() {
        let metric = Metric::job_progress("zap-1", 50);
        assert_eq!(metric.entity, MetricEntity::Job("zap-1".into()));
        assert_eq!(metric.name, PROGRESS_METRIC);
        assert!((metric.value - 50.0).abs() < f64::EPSILON);
    }
}
