use super::Metadata;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// A scan target: domain, subdomain, or bare IP under an owner's scope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    /// Stable identifier
    pub id: String,

    /// Fully-qualified name; unique across the store
    pub name: String,

    /// Parent domain for subdomains
    #[serde(default)]
    pub parent: Option<String>,

    /// Whether the asset is in active scope
    #[serde(default = "default_active")]
    pub active: bool,

    /// Known IP addresses
    #[serde(default)]
    pub ips: Vec<IpAddr>,

    /// Registered owner handle
    #[serde(default)]
    pub owner: Option<String>,

    /// Token issued for the ownership-proof flow
    #[serde(default)]
    pub consent_token: Option<String>,

    /// When ownership verification completed; `None` means unverified
    #[serde(default)]
    pub verified_at: Option<DateTime<Utc>>,

    /// Registration time
    pub created_at: DateTime<Utc>,

    /// Free-form metadata
    #[serde(default)]
    pub metadata: Metadata,
}

const fn default_active() -> bool {
    true
}

impl Asset {
    /// Create a new active, unverified asset
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            parent: None,
            active: true,
            ips: Vec::new(),
            owner: None,
            consent_token: None,
            verified_at: None,
            created_at: Utc::now(),
            metadata: Metadata::new(),
        }
    }

    /// Returns true if ownership verification has completed
    #[must_use]
    pub const fn is_verified(&self) -> bool {
        self.verified_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_asset_is_unverified() {
        let asset = Asset::new("a1", "example.com");
        assert!(!asset.is_verified());
        assert!(asset.active);
        assert!(asset.ips.is_empty());
    }

    #[test]
    fn test_asset_serde_defaults() {
        let json = r#"{"id":"a1","name":"example.com","created_at":"2026-01-01T00:00:00Z"}"#;
        let asset: Asset = serde_json::from_str(json).unwrap();
        assert!(asset.active);
        assert!(asset.verified_at.is_none());
        assert!(asset.metadata.is_empty());
    }
}
