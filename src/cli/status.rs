//! # Status Command
//!
//! Shows the spec, sync state and conditions of a BitwardenSecret resource,
//! plus the sync annotations on the Secret it owns.

use anyhow::{Context, Result};
use bitwarden_secrets_operator::constants::DEFAULT_NAMESPACE;
use bitwarden_secrets_operator::controller::reconciler::annotations;
use bitwarden_secrets_operator::crd::BitwardenSecret;
use k8s_openapi::api::core::v1::Secret;
use kube::{api::Api, Client};

pub async fn status_command(client: Client, name: String, namespace: Option<String>) -> Result<()> {
    let ns = namespace.as_deref().unwrap_or(DEFAULT_NAMESPACE);

    println!("Status for BitwardenSecret '{ns}/{name}'");
    println!();

    let api: Api<BitwardenSecret> = Api::namespaced(client.clone(), ns);
    let resource = api
        .get(&name)
        .await
        .with_context(|| format!("Failed to get BitwardenSecret '{ns}/{name}'"))?;

    println!("Resource Information:");
    println!("  Name: {name}");
    println!("  Namespace: {ns}");
    if let Some(uid) = &resource.metadata.uid {
        println!("  UID: {uid}");
    }

    let spec = &resource.spec;
    println!();
    println!("Spec:");
    println!("  Organization ID: {}", spec.organization_id);
    println!("  Target Secret: {}", spec.secret_name);
    println!(
        "  Auth Token: {}/{}",
        spec.auth_token.secret_name, spec.auth_token.secret_key
    );
    match &spec.secret_map {
        Some(map) => {
            println!("  Key Map:");
            for entry in map {
                println!("    {} -> {}", entry.bw_secret_id, entry.secret_key_name);
            }
        }
        None => println!("  Key Map: <none, all secrets passed through>"),
    }

    let secrets: Api<Secret> = Api::namespaced(client, ns);
    let target = secrets
        .get_opt(&spec.secret_name)
        .await
        .with_context(|| format!("Failed to get Secret '{ns}/{}'", spec.secret_name))?;
    println!();
    println!("Target Secret:");
    for line in target_secret_summary(target.as_ref()) {
        println!("  {line}");
    }

    println!();
    println!("Status:");
    let Some(status) = &resource.status else {
        println!("  <not yet reconciled>");
        return Ok(());
    };
    println!(
        "  Last Successful Sync: {}",
        status.last_successful_sync_time.as_deref().unwrap_or("never")
    );

    if !status.conditions.is_empty() {
        println!();
        println!("Conditions:");
        for condition in &status.conditions {
            println!("  - Type: {}", condition.r#type);
            println!("    Status: {}", condition.status);
            if let Some(reason) = &condition.reason {
                println!("    Reason: {reason}");
            }
            if let Some(message) = &condition.message {
                println!("    Message: {message}");
            }
            if let Some(time) = &condition.last_transition_time {
                println!("    Last Transition: {time}");
            }
        }
    }

    Ok(())
}

/// Lines describing the owned Secret as the controller last wrote it
fn target_secret_summary(secret: Option<&Secret>) -> Vec<String> {
    let Some(secret) = secret else {
        return vec!["<not created yet>".to_string()];
    };

    let keys = secret.data.as_ref().map_or(0, |d| d.len());
    let sync_time = annotations::sync_time(secret).map_or_else(
        || "<not recorded>".to_string(),
        |t| t.to_rfc3339_opts(chrono::SecondsFormat::Nanos, true),
    );
    let key_map = match annotations::custom_map(secret) {
        Ok(Some(map)) => format!("{} entries", map.len()),
        Ok(None) => "<none>".to_string(),
        Err(e) => format!("<unreadable: {e}>"),
    };

    vec![
        format!("Keys: {keys}"),
        format!("Sync Time: {sync_time}"),
        format!("Recorded Key Map: {key_map}"),
    ]
}
