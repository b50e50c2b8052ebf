//! # Custom Resource Definitions
//!
//! CRD types for the Bitwarden Secrets Operator.
//!
//! ## Module Structure
//!
//! - `spec.rs` - `BitwardenSecret` specification, auth token reference and key-map
//! - `status.rs` - Status types for tracking sync state and conditions

mod spec;
mod status;

// Re-export all public types
pub use spec::{AuthToken, BitwardenSecret, BitwardenSecretSpec, SecretMap};
pub use status::{BitwardenSecretStatus, Condition};
