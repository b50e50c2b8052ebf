//! # CRD Validation Tests
//!
//! Tests for the BitwardenSecret CRD to catch schema drift early.
//! Sample manifests are deserialized the way the API server hands them to the
//! controller, and the generated CRD is checked for the fields users rely on.

use bitwarden_secrets_operator::crd::{BitwardenSecret, BitwardenSecretStatus, SecretMap};
use kube::core::CustomResourceExt;

/// Manifest with every field set
#[test]
fn test_bitwarden_secret_with_map() {
    let yaml = r#"
apiVersion: k8s.bitwarden.com/v1
kind: BitwardenSecret
metadata:
  name: app-secrets
  namespace: apps
spec:
  organizationId: 2f3e1b8c-5b1a-4d8e-9c64-0c2b8f0f1d11
  secretName: app-secrets
  authToken:
    secretName: bw-auth-token
    secretKey: token
  map:
    - bwSecretId: 8a4e3c11-92d4-4a3f-b8c1-3c6a9f0e2b77
      secretKeyName: API_KEY
    - bwSecretId: 0c1d2e3f-4a5b-4c6d-8e7f-9a0b1c2d3e4f
      secretKeyName: DB_PASSWORD
"#;

    let resource: BitwardenSecret =
        serde_yaml::from_str(yaml).expect("Should deserialize BitwardenSecret with map");

    assert_eq!(resource.metadata.name.as_deref(), Some("app-secrets"));
    assert_eq!(resource.metadata.namespace.as_deref(), Some("apps"));
    assert_eq!(
        resource.spec.organization_id,
        "2f3e1b8c-5b1a-4d8e-9c64-0c2b8f0f1d11"
    );
    assert_eq!(resource.spec.secret_name, "app-secrets");
    assert_eq!(resource.spec.auth_token.secret_name, "bw-auth-token");
    assert_eq!(resource.spec.auth_token.secret_key, "token");

    let map = resource.spec.secret_map.expect("map should be present");
    assert_eq!(map.len(), 2);
    assert_eq!(
        map[0],
        SecretMap {
            bw_secret_id: "8a4e3c11-92d4-4a3f-b8c1-3c6a9f0e2b77".to_string(),
            secret_key_name: "API_KEY".to_string(),
        }
    );
    assert!(resource.status.is_none());
}

/// Minimal manifest: no key-map, every Bitwarden ID passes through
#[test]
fn test_minimal_bitwarden_secret() {
    let yaml = r#"
apiVersion: k8s.bitwarden.com/v1
kind: BitwardenSecret
metadata:
  name: minimal
spec:
  organizationId: org
  secretName: target
  authToken:
    secretName: auth
    secretKey: token
"#;

    let resource: BitwardenSecret =
        serde_yaml::from_str(yaml).expect("Should deserialize minimal BitwardenSecret");

    assert!(resource.spec.secret_map.is_none());
    assert!(resource.metadata.namespace.is_none());
}

/// Missing required fields are rejected
#[test]
fn test_missing_auth_token_is_rejected() {
    let yaml = r#"
apiVersion: k8s.bitwarden.com/v1
kind: BitwardenSecret
metadata:
  name: broken
spec:
  organizationId: org
  secretName: target
"#;

    let result: Result<BitwardenSecret, _> = serde_yaml::from_str(yaml);
    assert!(result.is_err(), "authToken is required");
}

/// Status written by the controller reads back with conditions intact
#[test]
fn test_status_with_conditions() {
    let yaml = r#"
lastSuccessfulSyncTime: "2025-03-01T09:00:00.000Z"
conditions:
  - type: FailedSync
    status: "False"
    reason: ReconciliationFailed
    message: Error pulling authorization token secret - not found
    lastTransitionTime: "2025-03-01T08:55:00.000Z"
  - type: SuccessfulSync
    status: "True"
    reason: ReconciliationComplete
    message: Completed sync for apps/app-secrets
    lastTransitionTime: "2025-03-01T09:00:00.000Z"
    observedGeneration: 3
"#;

    let status: BitwardenSecretStatus =
        serde_yaml::from_str(yaml).expect("Should deserialize status");

    assert!(status.last_successful_sync().is_some());
    assert_eq!(status.conditions.len(), 2);
    let success = status.condition("SuccessfulSync").unwrap();
    assert!(success.is_true());
    assert_eq!(success.observed_generation, Some(3));
    assert!(!status.condition("FailedSync").unwrap().is_true());
}

/// The generated CRD exposes the status subresource and the printer columns
#[test]
fn test_generated_crd_schema() {
    let crd = BitwardenSecret::crd();
    let version = &crd.spec.versions[0];

    assert_eq!(version.name, "v1");
    assert!(version.served);
    assert!(version.storage);
    assert!(version
        .subresources
        .as_ref()
        .and_then(|s| s.status.as_ref())
        .is_some());

    let columns: Vec<_> = version
        .additional_printer_columns
        .as_ref()
        .map(|c| c.iter().map(|col| col.name.as_str()).collect())
        .unwrap_or_default();
    assert_eq!(columns, vec!["Secret", "Last Sync", "Synced"]);

    let yaml = serde_yaml::to_string(&crd).expect("CRD should serialize");
    for field in ["organizationId", "secretName", "authToken", "bwSecretId", "secretKeyName"] {
        assert!(yaml.contains(field), "schema should mention {field}");
    }
}
