//! Consent-based admission gate for scan jobs.

use scout_core::{Asset, Error, Provider, Result};
use scout_store::Store;
use std::sync::Arc;
use tracing::{debug, warn};

/// Decides whether a job may be created for a (target, provider) pair.
///
/// Intrusive providers are a hard authorization boundary: they require the
/// target asset to carry a completed ownership verification. Classification
/// comes from the static capability table on [`Provider`], never from the
/// submitted name, so an alias cannot bypass the check.
///
/// The gate reads one snapshot of the asset and has no side effects.
/// Verification timestamps are set-once and never revoked, so a concurrent
/// verification write can only cause a conservative rejection — never an
/// unsafe admission.
#[derive(Clone)]
pub struct AdmissionGate {
    store: Arc<dyn Store>,
}

impl AdmissionGate {
    /// Create a gate over the given store
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Resolve the target and check consent requirements.
    ///
    /// `target` may be an asset id or a fully-qualified name. Returns the
    /// resolved asset for job creation on success.
    ///
    /// # Errors
    ///
    /// `NotFound` if the target is not in scope; `VerificationRequired` if
    /// the provider is intrusive and the asset is unverified.
    pub async fn admit(&self, target: &str, provider: Provider) -> Result<Asset> {
        let asset = match self.store.asset(target).await? {
            Some(asset) => asset,
            None => self
                .store
                .asset_by_name(target)
                .await?
                .ok_or_else(|| Error::not_found(format!("asset {target}")))?,
        };

        if provider.is_intrusive() && !asset.is_verified() {
            warn!(target = %asset.name, provider = %provider, "intrusive scan refused: target unverified");
            return Err(Error::VerificationRequired {
                target: asset.name,
            });
        }

        debug!(target = %asset.name, provider = %provider, "admission granted");
        Ok(asset)
    }
}

impl std::fmt::Debug for AdmissionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionGate").finish_non_exhaustive()
    }
}
