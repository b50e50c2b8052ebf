//! # Error Handling Tests
//!
//! These tests verify:
//! - Every sync failure renders the message recorded in the `FailedSync` condition
//! - Errors escaping reconcile retry on the fixed refresh cadence
//! - Client errors keep status code and body in the message

use bitwarden_secrets_operator::config::ControllerConfig;
use bitwarden_secrets_operator::controller::reconciler::{
    ReconcilerError, ReconcilerSettings, SyncError, SyncOutcome,
};
use bitwarden_secrets_operator::crd::{AuthToken, BitwardenSecret, BitwardenSecretSpec};
use bitwarden_secrets_operator::provider::BitwardenError;
use bitwarden_secrets_operator::runtime::error_policy::handle_reconciliation_error;
use kube_runtime::controller::Action;
use std::time::Duration;

fn resource() -> BitwardenSecret {
    let mut obj = BitwardenSecret::new(
        "bw-sync",
        BitwardenSecretSpec {
            organization_id: "org".to_string(),
            secret_name: "app-secrets".to_string(),
            auth_token: AuthToken {
                secret_name: "bw-auth".to_string(),
                secret_key: "token".to_string(),
            },
            secret_map: None,
        },
    );
    obj.metadata.namespace = Some("apps".to_string());
    obj
}

#[test]
fn test_sync_error_messages() {
    let cases = vec![
        (
            SyncError::AuthSecret(anyhow::anyhow!("secrets \"bw-auth\" not found")),
            "Error pulling authorization token secret - secrets \"bw-auth\" not found",
        ),
        (
            SyncError::AuthTokenKeyMissing {
                secret: "bw-auth".to_string(),
                key: "token".to_string(),
            },
            "Error pulling authorization token secret - key 'token' not found in Secret 'bw-auth'",
        ),
        (
            SyncError::CreateSecret(anyhow::anyhow!("forbidden")),
            "Creation of K8s secret failed. - forbidden",
        ),
        (
            SyncError::UpdateSecret {
                namespace: "apps".to_string(),
                name: "app-secrets".to_string(),
                source: anyhow::anyhow!("conflict"),
            },
            "Failed to update apps/app-secrets - conflict",
        ),
        (
            SyncError::OwnerReference("apps/bw-sync".to_string()),
            "Failed to set controller reference - BitwardenSecret apps/bw-sync has no name or uid",
        ),
    ];

    for (error, expected) in cases {
        assert_eq!(error.to_string(), expected);
    }
}

#[test]
fn test_pull_error_carries_client_status() {
    let error = SyncError::Pull {
        api_url: "https://api.test".to_string(),
        identity_api_url: "https://identity.test".to_string(),
        state_path: "/tmp/bw-state".to_string(),
        organization_id: "org".to_string(),
        source: BitwardenError::Api {
            status: 401,
            body: "unauthorized".to_string(),
        },
    };

    let message = error.to_string();
    assert!(message.starts_with("Error pulling Secret Manager secrets from API => API: https://api.test"));
    assert!(message.ends_with("Secrets Manager API returned 401: unauthorized"));
}

#[test]
fn test_failed_outcome_still_requeues() {
    let refresh = Duration::from_secs(180);
    let outcome = SyncOutcome::Failed(SyncError::OwnerReference("apps/bw-sync".to_string()));
    assert_eq!(outcome.as_str(), "failed");
    assert_eq!(outcome.action(refresh), Action::requeue(refresh));
}

#[test]
fn test_repeated_escaping_errors_use_fixed_interval() {
    let settings = ReconcilerSettings::from(&ControllerConfig::default());
    let obj = resource();

    // No backoff growth across consecutive failures
    for attempt in 0..5 {
        let error = ReconcilerError::ReconciliationFailed(anyhow::anyhow!("attempt {attempt}"));
        assert_eq!(
            handle_reconciliation_error(&obj, &error, &settings),
            Action::requeue(settings.refresh_interval)
        );
    }
}

#[test]
fn test_reconciler_error_wraps_context() {
    let error = ReconcilerError::from(
        anyhow::anyhow!("connection refused").context("Error looking up BitwardenSecret"),
    );
    assert_eq!(
        error.to_string(),
        "Reconciliation failed: Error looking up BitwardenSecret"
    );
}
