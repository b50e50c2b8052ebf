//! Bitwarden identity and Secrets Manager response payloads.
//!
//! Only the fields the operator reads are modelled; unknown fields are ignored.

use serde::Deserialize;

/// Response from `POST {identity}/connect/token`
#[derive(Deserialize)]
pub(super) struct TokenResponse {
    /// Bearer token for the Secrets Manager API
    pub access_token: String,
    /// Token lifetime in seconds
    pub expires_in: i64,
    /// `EncString` under the access token key, decrypting to `AccessTokenPayload`
    pub encrypted_payload: String,
}

/// Decrypted `encrypted_payload`
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AccessTokenPayload {
    /// Base64 64-byte organization key
    pub encryption_key: String,
}

/// Response from `GET {api}/organizations/{id}/secrets/sync`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SecretsSyncResponse {
    pub has_changes: bool,
    #[serde(default)]
    pub secrets: Option<SecretsList>,
}

#[derive(Debug, Deserialize)]
pub(super) struct SecretsList {
    #[serde(default, alias = "secrets")]
    pub data: Vec<SecretResponse>,
}

/// One secret; `key`, `value` and `note` are `EncString`s under the organization key
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SecretResponse {
    pub id: String,
    pub key: String,
    pub value: String,
}
