//! # List Command

use anyhow::{Context, Result};
use bitwarden_secrets_operator::constants::CONDITION_SUCCESSFUL_SYNC;
use bitwarden_secrets_operator::crd::BitwardenSecret;
use kube::{api::Api, api::ListParams, Client};

/// List BitwardenSecret resources in one or all namespaces
pub async fn list_command(client: Client, namespace: Option<String>) -> Result<()> {
    let api: Api<BitwardenSecret> = if let Some(ns) = &namespace {
        println!("Listing BitwardenSecret resources in namespace '{ns}'...");
        Api::namespaced(client, ns)
    } else {
        println!("Listing BitwardenSecret resources in all namespaces...");
        Api::all(client)
    };

    let resources = api
        .list(&ListParams::default())
        .await
        .context("Failed to list BitwardenSecret resources")?;

    if resources.items.is_empty() {
        println!("No BitwardenSecret resources found.");
        return Ok(());
    }

    println!(
        "\n{:<30} {:<20} {:<30} {:<26} {:<8}",
        "NAME", "NAMESPACE", "SECRET", "LAST SYNC", "SYNCED"
    );
    println!("{}", "-".repeat(118));

    for resource in resources.items {
        let name = resource.metadata.name.as_deref().unwrap_or("<unknown>");
        let ns = resource.metadata.namespace.as_deref().unwrap_or("<unknown>");
        let secret = &resource.spec.secret_name;

        let status = resource.status.as_ref();
        let last_sync = status
            .and_then(|s| s.last_successful_sync_time.as_deref())
            .unwrap_or("-");
        let synced = status
            .and_then(|s| s.condition(CONDITION_SUCCESSFUL_SYNC))
            .map_or("Unknown", |c| c.status.as_str());

        println!("{name:<30} {ns:<20} {secret:<30} {last_sync:<26} {synced:<8}");
    }

    Ok(())
}
