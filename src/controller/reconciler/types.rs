//! # Types
//!
//! Core types for the reconciler.

use crate::config::ControllerConfig;
use crate::provider::BitwardenError;
use kube_runtime::controller::Action;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failure escaping a reconciliation
///
/// Only raised when the `BitwardenSecret` itself cannot be read. Sync failures
/// are recorded on the resource status instead (see `SyncError`).
#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("Reconciliation failed: {0}")]
    ReconciliationFailed(#[from] anyhow::Error),
}

/// Failure of one sync attempt
///
/// The display string becomes the `FailedSync` condition message.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Error pulling authorization token secret - {0}")]
    AuthSecret(#[source] anyhow::Error),

    #[error("Error pulling authorization token secret - key '{key}' not found in Secret '{secret}'")]
    AuthTokenKeyMissing { secret: String, key: String },

    #[error(
        "Error pulling Secret Manager secrets from API => API: {api_url} -- Identity: {identity_api_url} -- State: {state_path} -- OrgId: {organization_id} - {source}"
    )]
    Pull {
        api_url: String,
        identity_api_url: String,
        state_path: String,
        organization_id: String,
        #[source]
        source: BitwardenError,
    },

    #[error("Failed to read Secret {namespace}/{name} - {source}")]
    ReadSecret {
        namespace: String,
        name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to set controller reference - BitwardenSecret {0} has no name or uid")]
    OwnerReference(String),

    #[error("Creation of K8s secret failed. - {0}")]
    CreateSecret(#[source] anyhow::Error),

    #[error("Error setting annotations for {namespace}/{name} - {source}")]
    Annotations {
        namespace: String,
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to update {namespace}/{name} - {source}")]
    UpdateSecret {
        namespace: String,
        name: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Result of one reconciliation
#[derive(Debug)]
pub enum SyncOutcome {
    /// The `BitwardenSecret` no longer exists
    Deleted,
    /// Invoked inside the sync guard window; treated as an echo of our own status write
    Suppressed,
    /// The service reported no changes since the watermark
    Unchanged,
    /// The target Secret was written; `keys` of its entries came from this delta
    Synced { keys: usize },
    /// The attempt failed and `FailedSync` was recorded
    Failed(SyncError),
}

impl SyncOutcome {
    /// Next action for the controller
    ///
    /// Every outcome except deletion requeues after the refresh interval,
    /// failures included.
    #[must_use]
    pub fn action(&self, refresh_interval: Duration) -> Action {
        match self {
            SyncOutcome::Deleted => Action::await_change(),
            _ => Action::requeue(refresh_interval),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncOutcome::Deleted => "deleted",
            SyncOutcome::Suppressed => "suppressed",
            SyncOutcome::Unchanged => "unchanged",
            SyncOutcome::Synced { .. } => "synced",
            SyncOutcome::Failed(_) => "failed",
        }
    }
}

/// Reconciler settings derived from `ControllerConfig`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilerSettings {
    /// Requeue delay after every reconciliation
    pub refresh_interval: Duration,
    /// Directory passed to the client login for session caching
    pub state_path: Option<PathBuf>,
}

impl From<&ControllerConfig> for ReconcilerSettings {
    fn from(config: &ControllerConfig) -> Self {
        Self {
            refresh_interval: config.refresh_interval(),
            state_path: config.state_path.clone(),
        }
    }
}
