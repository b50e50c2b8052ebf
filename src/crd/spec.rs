//! # BitwardenSecret Spec
//!
//! Main CRD specification types.

use serde::{Deserialize, Serialize};

/// BitwardenSecret Custom Resource Definition
///
/// Declares which Bitwarden organization to pull from, where the machine
/// account access token lives, and which Kubernetes Secret receives the values.
///
/// # Example
///
/// ```yaml
/// apiVersion: k8s.bitwarden.com/v1
/// kind: BitwardenSecret
/// metadata:
///   name: app-secrets
///   namespace: default
/// spec:
///   organizationId: 2f3e1b8c-5b1a-4d8e-9c64-0c2b8f0f1d11
///   secretName: app-secrets
///   authToken:
///     secretName: bw-auth-token
///     secretKey: token
///   map:
///     - bwSecretId: 8a4e3c11-92d4-4a3f-b8c1-3c6a9f0e2b77
///       secretKeyName: API_KEY
/// ```
#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "BitwardenSecret",
    group = "k8s.bitwarden.com",
    version = "v1",
    namespaced,
    status = "crate::crd::BitwardenSecretStatus",
    shortname = "bws",
    printcolumn = r#"{"name":"Secret", "type":"string", "jsonPath":".spec.secretName"}, {"name":"Last Sync", "type":"string", "jsonPath":".status.lastSuccessfulSyncTime"}, {"name":"Synced", "type":"string", "jsonPath":".status.conditions[?(@.type==\"SuccessfulSync\")].status"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct BitwardenSecretSpec {
    /// Bitwarden organization ID to pull secrets from
    pub organization_id: String,
    /// Name of the Kubernetes Secret the values are written to
    pub secret_name: String,
    /// Kubernetes Secret holding the machine account access token
    pub auth_token: AuthToken,
    /// Optional mapping from Bitwarden secret IDs to Secret keys
    /// When absent every synced secret is written under its Bitwarden ID
    #[serde(default, rename = "map", skip_serializing_if = "Option::is_none")]
    pub secret_map: Option<Vec<SecretMap>>,
}

/// Reference to the Secret key holding the access token
///
/// The Secret must live in the same namespace as the BitwardenSecret.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthToken {
    /// Name of the Secret
    pub secret_name: String,
    /// Key within the Secret
    pub secret_key: String,
}

/// One entry of the key-map
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretMap {
    /// Bitwarden secret ID
    pub bw_secret_id: String,
    /// Key name in the target Secret
    pub secret_key_name: String,
}
