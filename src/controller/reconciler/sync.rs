//! # Delta Pull
//!
//! One authenticated round-trip to Bitwarden per reconciliation.

use crate::provider::{BitwardenClient, BitwardenClientFactory, BitwardenError};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::error;

/// Secrets changed since the watermark, keyed by Bitwarden ID
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncDelta {
    pub has_changes: bool,
    pub values: BTreeMap<String, Vec<u8>>,
}

/// Pull the delta for `organization_id` since `since`
///
/// A fresh client is created, logged in, queried and closed on every call. No
/// values are returned alongside an error.
///
/// # Errors
/// Returns the client creation, login or sync error
pub async fn pull_deltas<F: BitwardenClientFactory>(
    factory: &F,
    organization_id: &str,
    access_token: &str,
    state_path: Option<&Path>,
    since: Option<DateTime<Utc>>,
) -> Result<SyncDelta, BitwardenError> {
    let mut client = factory.get_client().inspect_err(|e| {
        error!(error = %e, "Failed to create client");
    })?;

    let result = login_and_sync(&mut client, organization_id, access_token, state_path, since).await;
    client.close();
    result
}

async fn login_and_sync<C: BitwardenClient>(
    client: &mut C,
    organization_id: &str,
    access_token: &str,
    state_path: Option<&Path>,
    since: Option<DateTime<Utc>>,
) -> Result<SyncDelta, BitwardenError> {
    client
        .access_token_login(access_token, state_path)
        .await
        .inspect_err(|e| error!(error = %e, "Failed to authenticate"))?;

    let response = client
        .sync_secrets(organization_id, since)
        .await
        .inspect_err(|e| error!(error = %e, "Failed to get secrets since last sync."))?;

    let values = response
        .secrets
        .into_iter()
        .map(|secret| (secret.id, secret.value.into_bytes()))
        .collect();

    Ok(SyncDelta {
        has_changes: response.has_changes,
        values,
    })
}
