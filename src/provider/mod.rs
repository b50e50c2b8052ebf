//! # Provider Modules
//!
//! Seams between the sync engine and the external secrets service.
//!
//! - `BitwardenClientFactory` hands out a fresh client per delta pull
//! - `BitwardenClient` performs the access token login and the delta sync
//!
//! The production implementation lives in `bitwarden`; tests substitute
//! in-memory fakes through the same traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::Path;
use thiserror::Error;

pub mod bitwarden;

use bitwarden::access_token::AccessTokenError;
use bitwarden::crypto::CryptoError;

#[derive(Debug, Error)]
pub enum BitwardenError {
    #[error("invalid access token: {0}")]
    AccessToken(#[from] AccessTokenError),
    #[error("decryption error: {0}")]
    Crypto(#[from] CryptoError),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("identity service returned {status}: {body}")]
    Identity { status: u16, body: String },
    #[error("Secrets Manager API returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("invalid response payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("organization id '{0}' is not a UUID")]
    InvalidOrganizationId(String),
    #[error("client is not logged in")]
    NotAuthenticated,
}

/// Result of a delta sync
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecretsSync {
    /// Whether anything changed since the requested watermark
    pub has_changes: bool,
    /// All secrets visible to the machine account when `has_changes` is set
    pub secrets: Vec<SyncedSecret>,
}

/// A decrypted secret returned by the sync endpoint
#[derive(Clone, PartialEq, Eq)]
pub struct SyncedSecret {
    /// Stable Bitwarden secret ID
    pub id: String,
    /// Human-readable secret name
    pub key: String,
    pub value: String,
}

impl fmt::Debug for SyncedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncedSecret")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("value", &"***")
            .finish()
    }
}

/// Constructs Bitwarden clients
///
/// One client is created per delta pull and closed before the pull returns.
pub trait BitwardenClientFactory: Send + Sync {
    type Client: BitwardenClient;

    fn get_client(&self) -> Result<Self::Client, BitwardenError>;

    /// API base URL, reported in diagnostics
    fn api_url(&self) -> &str;

    /// Identity base URL, reported in diagnostics
    fn identity_api_url(&self) -> &str;
}

/// An authenticated Bitwarden Secrets Manager session
#[async_trait]
pub trait BitwardenClient: Send + Sync {
    /// Log in with a machine account access token
    ///
    /// `state_path` is a directory where the client may cache its session.
    async fn access_token_login(
        &mut self,
        access_token: &str,
        state_path: Option<&Path>,
    ) -> Result<(), BitwardenError>;

    /// Secrets changed since `last_synced`
    ///
    /// `None` requests the full secret set.
    async fn sync_secrets(
        &self,
        organization_id: &str,
        last_synced: Option<DateTime<Utc>>,
    ) -> Result<SecretsSync, BitwardenError>;

    /// Release the session
    fn close(self);
}
