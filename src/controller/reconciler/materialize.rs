//! # Secret Materializer
//!
//! Builds the target Secret on first sync and merges delta values into it.

use crate::constants::LABEL_BW_SECRET;
use crate::controller::reconciler::types::SyncError;
use crate::crd::BitwardenSecret;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use kube::Resource;
use std::collections::BTreeMap;

/// Empty `Opaque` Secret owned by `declaration`
///
/// Carries the provenance label and an empty annotation map.
///
/// # Errors
/// `SyncError::OwnerReference` when the declaration lacks a name or uid
pub fn new_secret(declaration: &BitwardenSecret, namespace: &str) -> Result<Secret, SyncError> {
    let owner = declaration
        .controller_owner_ref(&())
        .ok_or_else(|| SyncError::OwnerReference(resource_id(declaration, namespace)))?;
    let uid = owner.uid.clone();

    Ok(Secret {
        metadata: ObjectMeta {
            name: Some(declaration.spec.secret_name.clone()),
            namespace: Some(namespace.to_string()),
            labels: Some(BTreeMap::from([(LABEL_BW_SECRET.to_string(), uid)])),
            annotations: Some(BTreeMap::new()),
            owner_references: Some(vec![owner]),
            ..ObjectMeta::default()
        },
        type_: Some("Opaque".to_string()),
        data: Some(BTreeMap::new()),
        ..Secret::default()
    })
}

/// Insert or overwrite each changed key; other keys are left as they are
pub fn merge_values(secret: &mut Secret, values: BTreeMap<String, Vec<u8>>) {
    let data = secret.data.get_or_insert_with(BTreeMap::new);
    for (key, value) in values {
        data.insert(key, ByteString(value));
    }
}

fn resource_id(declaration: &BitwardenSecret, namespace: &str) -> String {
    format!(
        "{}/{}",
        namespace,
        declaration.metadata.name.as_deref().unwrap_or("unknown")
    )
}
