use super::{Metadata, Provider};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity of a finding, ordered from least to most severe
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational observation
    #[default]
    Info,
    /// Low severity
    Low,
    /// Medium severity
    Medium,
    /// High severity
    High,
    /// Critical severity
    Critical,
}

impl Severity {
    /// Stable lowercase name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deduplication key for findings: one stored document per key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FindingKey {
    /// Target asset reference
    pub asset_id: String,
    /// Reporting provider
    pub provider: Provider,
    /// Deterministic fingerprint of the finding's defining attributes
    pub fingerprint: String,
}

/// One discovered fact about a target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    /// Target asset reference
    pub asset_id: String,

    /// Denormalized target name
    pub target: String,

    /// Provider that reported the finding
    pub provider: Provider,

    /// Coarse category, e.g. "exposed-path" or "injection"
    pub category: String,

    /// Short title
    pub title: String,

    /// Longer description
    #[serde(default)]
    pub description: String,

    /// Severity rating
    #[serde(default)]
    pub severity: Severity,

    /// Optional numeric score (e.g. CVSS)
    #[serde(default)]
    pub score: Option<f64>,

    /// Optional evidence reference (request/response capture, file path)
    #[serde(default)]
    pub evidence: Option<String>,

    /// Deduplication fingerprint
    pub fingerprint: String,

    /// First time this observation was reported
    pub first_seen: DateTime<Utc>,

    /// Most recent report of this observation
    pub last_seen: DateTime<Utc>,

    /// Free-form metadata, refreshed on re-observation
    #[serde(default)]
    pub metadata: Metadata,
}

impl Finding {
    /// The (target, provider, fingerprint) idempotency key
    #[must_use]
    pub fn key(&self) -> FindingKey {
        FindingKey {
            asset_id: self.asset_id.clone(),
            provider: self.provider,
            fingerprint: self.fingerprint.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Info < Severity::Low);
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn test_key_fields() {
        let now = Utc::now();
        let finding = Finding {
            asset_id: "a1".into(),
            target: "example.com".into(),
            provider: Provider::Zap,
            category: "injection".into(),
            title: "SQL injection".into(),
            description: String::new(),
            severity: Severity::High,
            score: Some(8.6),
            evidence: None,
            fingerprint: "zap:sqli:/login:user".into(),
            first_seen: now,
            last_seen: now,
            metadata: Metadata::new(),
        };
        let key = finding.key();
        assert_eq!(key.provider, Provider::Zap);
        assert_eq!(key.fingerprint, "zap:sqli:/login:user");
    }
}
