//! # Sync Command
//!
//! Requests an immediate reconcile by stamping an annotation on the resource.
//! The controller watches every change to `BitwardenSecret` resources, so any
//! metadata update triggers a reconciliation.

use anyhow::{Context, Result};
use bitwarden_secrets_operator::constants::{ANNOTATION_SYNC_REQUESTED_AT, DEFAULT_NAMESPACE};
use bitwarden_secrets_operator::crd::BitwardenSecret;
use chrono::{SecondsFormat, Utc};
use kube::{
    api::{Api, Patch, PatchParams},
    Client,
};
use serde_json::json;

pub async fn sync_command(client: Client, name: String, namespace: Option<String>) -> Result<()> {
    let ns = namespace.as_deref().unwrap_or(DEFAULT_NAMESPACE);
    let api: Api<BitwardenSecret> = Api::namespaced(client, ns);

    println!("Requesting sync for BitwardenSecret '{ns}/{name}'...");

    let requested_at = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    let patch = json!({
        "metadata": {
            "annotations": {
                ANNOTATION_SYNC_REQUESTED_AT: requested_at
            }
        }
    });

    api.patch(&name, &PatchParams::default(), &Patch::Merge(&patch))
        .await
        .with_context(|| format!("Failed to annotate BitwardenSecret '{ns}/{name}'"))?;

    println!("  Sync requested at {requested_at}");
    println!("  Check progress with: bwsctl status bitwardensecret {name} --namespace {ns}");

    Ok(())
}
