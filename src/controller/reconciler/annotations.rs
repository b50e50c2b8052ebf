//! # Sync Metadata
//!
//! Annotations stamped on the target Secret after each sync:
//!
//! - `k8s.bitwarden.com/sync-time` - RFC3339 UTC with nanoseconds
//! - `k8s.bitwarden.com/custom-map` - indented JSON of the active key-map,
//!   removed when no map is configured

use crate::constants::{ANNOTATION_CUSTOM_MAP, ANNOTATION_SYNC_TIME};
use crate::crd::SecretMap;
use chrono::{DateTime, SecondsFormat, Utc};
use k8s_openapi::api::core::v1::Secret;
use std::collections::BTreeMap;

/// Stamp sync time and key-map annotations
///
/// # Errors
/// Returns the serialization error if the key-map cannot be encoded; the
/// Secret is left untouched in that case.
pub fn set_sync_annotations(
    secret: &mut Secret,
    secret_map: Option<&[SecretMap]>,
    now: DateTime<Utc>,
) -> Result<(), serde_json::Error> {
    let custom_map = secret_map.map(serde_json::to_string_pretty).transpose()?;

    let annotations = secret
        .metadata
        .annotations
        .get_or_insert_with(BTreeMap::new);
    annotations.insert(
        ANNOTATION_SYNC_TIME.to_string(),
        now.to_rfc3339_opts(SecondsFormat::Nanos, true),
    );
    match custom_map {
        Some(custom_map) => {
            annotations.insert(ANNOTATION_CUSTOM_MAP.to_string(), custom_map);
        }
        None => {
            annotations.remove(ANNOTATION_CUSTOM_MAP);
        }
    }
    Ok(())
}

/// Key-map recorded on the Secret, if any
///
/// # Errors
/// Returns an error if the annotation is not a valid key-map
pub fn custom_map(secret: &Secret) -> Result<Option<Vec<SecretMap>>, serde_json::Error> {
    secret
        .metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get(ANNOTATION_CUSTOM_MAP))
        .map(|raw| serde_json::from_str(raw))
        .transpose()
}

/// Sync time recorded on the Secret, if present and parseable
#[must_use]
pub fn sync_time(secret: &Secret) -> Option<DateTime<Utc>> {
    secret
        .metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get(ANNOTATION_SYNC_TIME))
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|t| t.with_timezone(&Utc))
}
