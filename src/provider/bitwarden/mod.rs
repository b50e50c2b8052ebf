//! # Bitwarden Secrets Manager
//!
//! Native client for Bitwarden Secrets Manager (no SDK dependency).
//!
//! - `access_token` - machine account token parsing and key derivation
//! - `crypto` - symmetric keys and `EncString` encryption/decryption
//! - `client` - identity login and delta sync over REST
//! - `state` - cached sessions under the state path

pub mod access_token;
mod client;
pub mod crypto;
mod requests;
mod responses;
mod state;

pub use access_token::AccessToken;
pub use client::{BitwardenRestClient, BitwardenSecretsManager};
pub use crypto::{EncString, SymmetricKey};
