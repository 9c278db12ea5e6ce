use serde::{Deserialize, Serialize};

/// A named task type with its own queue, concurrency limit, and rate limit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provider {
    /// Passive subdomain enumeration from public sources
    Subdomains,
    /// WHOIS registration lookup
    Whois,
    /// DNS record resolution
    Dns,
    /// Directory brute-forcing against the live web service
    Dirsearch,
    /// Web vulnerability scanning (active probing)
    Zap,
    /// CDN origin IP discovery (probes candidate origins directly)
    OriginFinder,
}

/// Capability classification that drives the admission gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Reconnaissance only; never touches the target's live service
    Passive,
    /// Actively probes the target; requires ownership verification
    Intrusive,
}

impl Provider {
    /// Every configured provider, in queue-registration order
    pub const ALL: [Self; 6] = [
        Self::Subdomains,
        Self::Whois,
        Self::Dns,
        Self::Dirsearch,
        Self::Zap,
        Self::OriginFinder,
    ];

    /// Static capability table: the security-relevant classification is
    /// declared here per provider, never inferred from naming.
    #[must_use]
    pub const fn kind(self) -> ProviderKind {
        match self {
            Self::Subdomains | Self::Whois | Self::Dns => ProviderKind::Passive,
            Self::Dirsearch | Self::Zap | Self::OriginFinder => ProviderKind::Intrusive,
        }
    }

    /// Returns true if this provider actively probes the target
    #[must_use]
    pub const fn is_intrusive(self) -> bool {
        matches!(self.kind(), ProviderKind::Intrusive)
    }

    /// Stable string name used in job ids and wire payloads
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Subdomains => "subdomains",
            Self::Whois => "whois",
            Self::Dns => "dns",
            Self::Dirsearch => "dirsearch",
            Self::Zap => "zap",
            Self::OriginFinder => "origin-finder",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Provider {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "subdomains" => Ok(Self::Subdomains),
            "whois" => Ok(Self::Whois),
            "dns" => Ok(Self::Dns),
            "dirsearch" => Ok(Self::Dirsearch),
            "zap" => Ok(Self::Zap),
            "origin-finder" => Ok(Self::OriginFinder),
            other => Err(crate::Error::UnknownProvider {
                provider: other.to_string(),
            }),
        }
    }
}
