//! # Reconciler
//!
//! Keeps the target Secret of each `BitwardenSecret` in sync with Bitwarden
//! Secrets Manager.
//!
//! ## Module Structure
//!
//! - `reconcile.rs` - Sync loop and controller entry point
//! - `sync.rs` - Delta pull through a fresh Bitwarden client
//! - `materialize.rs` - Target Secret creation and key-level merge
//! - `secret_map.rs` - Key-map narrowing and renaming
//! - `annotations.rs` - Sync time and key-map annotations
//! - `store.rs` - Cluster access traits and the API server implementation
//! - `clock.rs` - Time source
//! - `types.rs` - Errors, outcomes and settings

pub mod annotations;
pub mod clock;
pub mod materialize;
mod reconcile;
pub mod secret_map;
pub mod store;
pub mod sync;
mod types;

pub use clock::{Clock, SystemClock};
pub use reconcile::{reconcile, ClusterReconciler, Reconciler};
pub use store::{DeclarationStore, KubeStore, SecretStore};
pub use sync::{pull_deltas, SyncDelta};
pub use types::{ReconcilerError, ReconcilerSettings, SyncError, SyncOutcome};
