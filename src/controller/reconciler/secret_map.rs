//! # Key Remapper
//!
//! Narrows and renames the accumulated Secret data through the key-map.

use crate::crd::SecretMap;
use k8s_openapi::api::core::v1::Secret;
use std::collections::BTreeMap;

/// Apply the key-map to the Secret data
///
/// Without a map the data is left as is. With a map the data is rebuilt from
/// the mapped entries only; entries whose Bitwarden ID is absent are skipped.
/// The map is applied over the full accumulated data, not just the delta.
pub fn apply_secret_map(secret: &mut Secret, secret_map: Option<&[SecretMap]>) {
    let Some(secret_map) = secret_map else {
        return;
    };

    let current = secret.data.take().unwrap_or_default();
    let mapped = secret_map
        .iter()
        .filter_map(|entry| {
            current
                .get(&entry.bw_secret_id)
                .map(|value| (entry.secret_key_name.clone(), value.clone()))
        })
        .collect::<BTreeMap<_, _>>();
    secret.data = Some(mapped);
}

/// Number of target keys a delta writes once the key-map is applied
#[must_use]
pub fn delta_key_count<V>(
    values: &BTreeMap<String, V>,
    secret_map: Option<&[SecretMap]>,
) -> usize {
    match secret_map {
        None => values.len(),
        Some(secret_map) => secret_map
            .iter()
            .filter(|entry| values.contains_key(&entry.bw_secret_id))
            .count(),
    }
}
