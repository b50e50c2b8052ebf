//! # Client State
//!
//! Per-machine-account session cache under the configured state path.
//!
//! The file `<state path>/<client id>.json` holds the bearer token (encrypted
//! under the access token key), its expiry and the identity service's
//! `encrypted_payload`. A valid file lets the next login skip the identity
//! round-trip. Anything unreadable is ignored and replaced after a fresh login.

use super::crypto::{EncString, SymmetricKey};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;
use zeroize::Zeroizing;

const STATE_VERSION: u32 = 1;

/// Sessions expiring within this margin are not reused
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ClientState {
    version: u32,
    /// Bearer token as an `EncString` under the access token key
    access_token: String,
    expires_at: DateTime<Utc>,
    /// Identity `encrypted_payload`, an `EncString` under the access token key
    encrypted_payload: String,
}

/// Session material recovered from a state file
pub(super) struct RestoredSession {
    pub bearer: Zeroizing<String>,
    pub expires_at: DateTime<Utc>,
    pub encrypted_payload: String,
}

impl ClientState {
    pub fn seal(
        bearer: &str,
        expires_at: DateTime<Utc>,
        encrypted_payload: &str,
        key: &SymmetricKey,
    ) -> Result<Self, super::crypto::CryptoError> {
        Ok(Self {
            version: STATE_VERSION,
            access_token: EncString::encrypt(bearer.as_bytes(), key)?.to_string(),
            expires_at,
            encrypted_payload: encrypted_payload.to_string(),
        })
    }

    /// Decrypt the cached session if it is still usable at `now`
    pub fn open(&self, key: &SymmetricKey, now: DateTime<Utc>) -> Option<RestoredSession> {
        if self.version != STATE_VERSION {
            debug!(version = self.version, "Ignoring state file with unknown version");
            return None;
        }
        if self.expires_at <= now + Duration::seconds(EXPIRY_MARGIN_SECS) {
            debug!(expires_at = %self.expires_at, "Cached session expired");
            return None;
        }
        let bearer = self
            .access_token
            .parse::<EncString>()
            .and_then(|enc| enc.decrypt_to_string(key))
            .map_err(|e| debug!(error = %e, "Cached session does not match access token"))
            .ok()?;
        Some(RestoredSession {
            bearer: Zeroizing::new(bearer),
            expires_at: self.expires_at,
            encrypted_payload: self.encrypted_payload.clone(),
        })
    }
}

pub(super) fn state_file(dir: &Path, client_id: &Uuid) -> PathBuf {
    dir.join(format!("{client_id}.json"))
}

pub(super) async fn load(path: &Path) -> Option<ClientState> {
    let contents = match tokio::fs::read(path).await {
        Ok(contents) => contents,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "No usable state file");
            return None;
        }
    };
    serde_json::from_slice(&contents)
        .map_err(|e| debug!(path = %path.display(), error = %e, "Malformed state file"))
        .ok()
}

/// Write atomically through a sibling temp file
pub(super) async fn save(path: &Path, state: &ClientState) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let contents = serde_json::to_vec_pretty(state).map_err(std::io::Error::other)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, contents).await?;
    tokio::fs::rename(&tmp, path).await
}

pub(super) async fn remove(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            debug!(path = %path.display(), error = %e, "Failed to remove state file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_seal_and_open() {
        let key = SymmetricKey::generate();
        let state =
            ClientState::seal("bearer-token", now() + Duration::hours(1), "2.x|y|z", &key).unwrap();
        let session = state.open(&key, now()).unwrap();
        assert_eq!(session.bearer.as_str(), "bearer-token");
        assert_eq!(session.encrypted_payload, "2.x|y|z");
    }

    #[test]
    fn test_open_rejects_expired_session() {
        let key = SymmetricKey::generate();
        let state =
            ClientState::seal("bearer", now() + Duration::seconds(30), "2.x|y|z", &key).unwrap();
        assert!(state.open(&key, now()).is_none());
    }

    #[test]
    fn test_open_rejects_other_key() {
        let key = SymmetricKey::generate();
        let state =
            ClientState::seal("bearer", now() + Duration::hours(1), "2.x|y|z", &key).unwrap();
        assert!(state.open(&SymmetricKey::generate(), now()).is_none());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = state_file(&dir.path().join("nested"), &Uuid::nil());
        let key = SymmetricKey::generate();
        let state =
            ClientState::seal("bearer", now() + Duration::hours(1), "2.x|y|z", &key).unwrap();

        save(&path, &state).await.unwrap();
        let loaded = load(&path).await.unwrap();
        assert_eq!(loaded.open(&key, now()).unwrap().bearer.as_str(), "bearer");

        remove(&path).await;
        assert!(load(&path).await.is_none());
    }

    #[tokio::test]
    async fn test_load_ignores_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        tokio::fs::write(&path, b"not json").await.unwrap();
        assert!(load(&path).await.is_none());
    }
}
