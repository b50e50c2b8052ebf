//! Bitwarden Secrets Manager REST Client
//!
//! Native REST implementation of the machine account flow:
//!
//! 1. `POST {identity}/connect/token` with the client credentials grant
//! 2. Decrypt `encrypted_payload` with the access token key to obtain the
//!    organization key
//! 3. `GET {api}/organizations/{id}/secrets/sync` with the bearer token and
//!    decrypt every returned secret with the organization key
//!
//! Sessions are cached under the state path (see `state`).

use super::access_token::AccessToken;
use super::crypto::{EncString, SymmetricKey};
use super::requests::TokenRequest;
use super::responses::{AccessTokenPayload, SecretsSyncResponse, TokenResponse};
use super::state::{self, ClientState};
use crate::constants::{DEFAULT_HTTP_CONNECT_TIMEOUT_SECS, DEFAULT_HTTP_TIMEOUT_SECS};
use crate::observability::metrics;
use crate::provider::{
    BitwardenClient, BitwardenClientFactory, BitwardenError, SecretsSync, SyncedSecret,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use reqwest::{Client, StatusCode};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;
use zeroize::Zeroizing;

/// Production client factory
///
/// Holds the shared HTTP connection pool; every `get_client` call returns an
/// unauthenticated client bound to the configured endpoints.
#[derive(Clone)]
pub struct BitwardenSecretsManager {
    http_client: Client,
    api_url: String,
    identity_api_url: String,
}

impl std::fmt::Debug for BitwardenSecretsManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitwardenSecretsManager")
            .field("api_url", &self.api_url)
            .field("identity_api_url", &self.identity_api_url)
            .finish_non_exhaustive()
    }
}

impl BitwardenSecretsManager {
    /// Create a factory for the given API and identity base URLs
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built
    pub fn new(
        api_url: impl Into<String>,
        identity_api_url: impl Into<String>,
    ) -> Result<Self, BitwardenError> {
        // rustls is selected in Cargo.toml
        let http_client = Client::builder()
            .connect_timeout(std::time::Duration::from_secs(
                DEFAULT_HTTP_CONNECT_TIMEOUT_SECS,
            ))
            .timeout(std::time::Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS))
            .user_agent(concat!("bitwarden-secrets-operator/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http_client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            identity_api_url: identity_api_url.into().trim_end_matches('/').to_string(),
        })
    }
}

impl BitwardenClientFactory for BitwardenSecretsManager {
    type Client = BitwardenRestClient;

    fn get_client(&self) -> Result<Self::Client, BitwardenError> {
        Ok(BitwardenRestClient {
            http_client: self.http_client.clone(),
            api_url: self.api_url.clone(),
            identity_api_url: self.identity_api_url.clone(),
            session: None,
        })
    }

    fn api_url(&self) -> &str {
        &self.api_url
    }

    fn identity_api_url(&self) -> &str {
        &self.identity_api_url
    }
}

/// Authenticated session material
struct Session {
    bearer: Zeroizing<String>,
    organization_key: SymmetricKey,
    state_file: Option<PathBuf>,
}

/// Bitwarden Secrets Manager REST client
pub struct BitwardenRestClient {
    http_client: Client,
    api_url: String,
    identity_api_url: String,
    session: Option<Session>,
}

impl std::fmt::Debug for BitwardenRestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitwardenRestClient")
            .field("api_url", &self.api_url)
            .field("identity_api_url", &self.identity_api_url)
            .field("authenticated", &self.session.is_some())
            .finish_non_exhaustive()
    }
}

impl BitwardenRestClient {
    /// Exchange the client credentials for a bearer token
    async fn request_token(&self, token: &AccessToken) -> Result<TokenResponse, BitwardenError> {
        let url = format!("{}/connect/token", self.identity_api_url);
        let form = TokenRequest::client_credentials(token.client_id.to_string(), token.client_secret());

        let start = Instant::now();
        let response = self.http_client.post(&url).form(&form).send().await;
        metrics::observe_bitwarden_request("login", start.elapsed().as_secs_f64());

        let response = response.inspect_err(|_| metrics::increment_bitwarden_request_errors("login"))?;
        let status = response.status();
        if !status.is_success() {
            metrics::increment_bitwarden_request_errors("login");
            let body = response.text().await.unwrap_or_default();
            return Err(BitwardenError::Identity {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }

    /// Session restored from the state file, if one is usable
    async fn restore_session(&self, path: &Path, token: &AccessToken) -> Option<Session> {
        let cached = state::load(path).await?;
        let restored = cached.open(token.encryption_key(), Utc::now())?;
        let organization_key =
            decrypt_organization_key(&restored.encrypted_payload, token.encryption_key())
                .map_err(|e| debug!(error = %e, "Cached payload could not be decrypted"))
                .ok()?;
        debug!(
            client_id = %token.client_id,
            expires_at = %restored.expires_at,
            "Reusing cached Bitwarden session"
        );
        Some(Session {
            bearer: restored.bearer,
            organization_key,
            state_file: Some(path.to_path_buf()),
        })
    }
}

#[async_trait]
impl BitwardenClient for BitwardenRestClient {
    async fn access_token_login(
        &mut self,
        access_token: &str,
        state_path: Option<&Path>,
    ) -> Result<(), BitwardenError> {
        let token: AccessToken = access_token.parse()?;
        let state_file = state_path.map(|dir| state::state_file(dir, &token.client_id));

        if let Some(path) = &state_file {
            if let Some(session) = self.restore_session(path, &token).await {
                self.session = Some(session);
                return Ok(());
            }
        }

        let response = self.request_token(&token).await?;
        let organization_key =
            decrypt_organization_key(&response.encrypted_payload, token.encryption_key())?;
        let expires_at = Utc::now() + Duration::seconds(response.expires_in);

        if let Some(path) = &state_file {
            match ClientState::seal(
                &response.access_token,
                expires_at,
                &response.encrypted_payload,
                token.encryption_key(),
            ) {
                Ok(cached) => {
                    if let Err(e) = state::save(path, &cached).await {
                        warn!(path = %path.display(), error = %e, "Failed to write Bitwarden state file");
                    }
                }
                Err(e) => warn!(error = %e, "Failed to seal Bitwarden state"),
            }
        }

        info!(client_id = %token.client_id, "Logged in to Bitwarden Secrets Manager");
        self.session = Some(Session {
            bearer: Zeroizing::new(response.access_token),
            organization_key,
            state_file,
        });
        Ok(())
    }

    async fn sync_secrets(
        &self,
        organization_id: &str,
        last_synced: Option<DateTime<Utc>>,
    ) -> Result<SecretsSync, BitwardenError> {
        let session = self.session.as_ref().ok_or(BitwardenError::NotAuthenticated)?;
        let organization_id = Uuid::parse_str(organization_id)
            .map_err(|_| BitwardenError::InvalidOrganizationId(organization_id.to_string()))?;

        let url = format!(
            "{}/organizations/{}/secrets/sync",
            self.api_url, organization_id
        );
        let mut request = self.http_client.get(&url).bearer_auth(session.bearer.as_str());
        if let Some(since) = last_synced {
            request = request.query(&[(
                "lastSyncedDate",
                since.to_rfc3339_opts(SecondsFormat::Millis, true),
            )]);
        }

        let start = Instant::now();
        let response = request.send().await;
        metrics::observe_bitwarden_request("sync", start.elapsed().as_secs_f64());

        let response = response.inspect_err(|_| metrics::increment_bitwarden_request_errors("sync"))?;
        let status = response.status();
        if !status.is_success() {
            metrics::increment_bitwarden_request_errors("sync");
            if status == StatusCode::UNAUTHORIZED {
                // The cached bearer was revoked; force a fresh login next time
                if let Some(path) = &session.state_file {
                    state::remove(path).await;
                }
            }
            let body = response.text().await.unwrap_or_default();
            return Err(BitwardenError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body: SecretsSyncResponse = response.json().await?;
        let secrets = body
            .secrets
            .map(|list| list.data)
            .unwrap_or_default()
            .into_iter()
            .map(|secret| {
                Ok(SyncedSecret {
                    key: decrypt_field(&secret.key, &session.organization_key)?,
                    value: decrypt_field(&secret.value, &session.organization_key)?,
                    id: secret.id,
                })
            })
            .collect::<Result<Vec<_>, BitwardenError>>()?;

        debug!(
            has_changes = body.has_changes,
            count = secrets.len(),
            "Bitwarden sync response"
        );
        Ok(SecretsSync {
            has_changes: body.has_changes,
            secrets,
        })
    }

    fn close(self) {
        // Session keys and the bearer zeroize on drop
        drop(self);
    }
}

fn decrypt_organization_key(
    encrypted_payload: &str,
    token_key: &SymmetricKey,
) -> Result<SymmetricKey, BitwardenError> {
    let payload = encrypted_payload.parse::<EncString>()?.decrypt(token_key)?;
    let payload: AccessTokenPayload = serde_json::from_slice(&payload)?;
    let payload_key = Zeroizing::new(payload.encryption_key);
    Ok(SymmetricKey::from_base64(&payload_key)?)
}

fn decrypt_field(value: &str, key: &SymmetricKey) -> Result<String, BitwardenError> {
    Ok(value.parse::<EncString>()?.decrypt_to_string(key)?)
}
