//! # Prelude
//!
//! Re-exports commonly used types and traits for convenience.
//!
//! ```rust
//! use bitwarden_secrets_operator::prelude::*;
//! ```

// CRD types
pub use crate::crd::*;

// Provider seams and the production client
pub use crate::provider::bitwarden::BitwardenSecretsManager;
pub use crate::provider::{
    BitwardenClient, BitwardenClientFactory, BitwardenError, SecretsSync, SyncedSecret,
};

// Reconciler types
pub use crate::controller::reconciler::{
    reconcile, Clock, ClusterReconciler, DeclarationStore, KubeStore, Reconciler,
    ReconcilerError, ReconcilerSettings, SecretStore, SyncError, SyncOutcome, SystemClock,
};

// Config types
pub use crate::config::ControllerConfig;
