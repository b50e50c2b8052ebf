//! # Access Token
//!
//! Parsing of machine account access tokens:
//!
//! ```text
//! 0.<client id uuid>.<client secret>:<base64 16-byte seed>
//! ```
//!
//! The seed never leaves the process; it derives the key that decrypts the
//! `encrypted_payload` returned by the identity service.

use super::crypto::{CryptoError, SymmetricKey};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;
use zeroize::Zeroizing;

const SUPPORTED_VERSION: &str = "0";
const SEED_LEN: usize = 16;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccessTokenError {
    #[error("access token is malformed: {0}")]
    Malformed(&'static str),
    #[error("unsupported access token version '{0}'")]
    UnsupportedVersion(String),
    #[error("access token client id is not a UUID")]
    InvalidClientId,
    #[error("access token encryption key must be 16 base64-encoded bytes")]
    InvalidEncryptionKey,
    #[error("access token key derivation failed: {0}")]
    KeyDerivation(#[from] CryptoError),
}

/// Parsed machine account access token
pub struct AccessToken {
    pub client_id: Uuid,
    client_secret: Zeroizing<String>,
    encryption_key: SymmetricKey,
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .finish_non_exhaustive()
    }
}

impl AccessToken {
    #[must_use]
    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    /// Key derived from the token seed
    #[must_use]
    pub fn encryption_key(&self) -> &SymmetricKey {
        &self.encryption_key
    }
}

impl FromStr for AccessToken {
    type Err = AccessTokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (credentials, seed) = s
            .trim()
            .split_once(':')
            .ok_or(AccessTokenError::Malformed("missing ':' separator"))?;

        let mut parts = credentials.splitn(3, '.');
        let (Some(version), Some(client_id), Some(client_secret)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(AccessTokenError::Malformed(
                "expected <version>.<client id>.<client secret>",
            ));
        };

        if version != SUPPORTED_VERSION {
            return Err(AccessTokenError::UnsupportedVersion(version.to_string()));
        }
        let client_id =
            Uuid::parse_str(client_id).map_err(|_| AccessTokenError::InvalidClientId)?;
        if client_secret.is_empty() {
            return Err(AccessTokenError::Malformed("empty client secret"));
        }

        let seed = Zeroizing::new(
            STANDARD
                .decode(seed)
                .map_err(|_| AccessTokenError::InvalidEncryptionKey)?,
        );
        if seed.len() != SEED_LEN {
            return Err(AccessTokenError::InvalidEncryptionKey);
        }

        Ok(Self {
            client_id,
            client_secret: Zeroizing::new(client_secret.to_string()),
            encryption_key: SymmetricKey::derive_from_access_token_seed(&seed)?,
        })
    }
}
