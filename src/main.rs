//! # Bitwarden Secrets Operator
//!
//! A Kubernetes controller that syncs Bitwarden Secrets Manager secrets into
//! Kubernetes Secrets.
//!
//! ## Overview
//!
//! For every `BitwardenSecret` resource the controller:
//!
//! 1. **Reads the access token** from the referenced auth Secret
//! 2. **Pulls changes** from Bitwarden Secrets Manager since the last successful sync
//! 3. **Writes the target Secret**, merging new values and applying the optional key-map
//! 4. **Records status** (`SuccessfulSync` / `FailedSync` conditions and the sync watermark)
//!
//! and polls again after the refresh interval.
//!
//! ## Features
//!
//! - **Delta sync**: Only changed secrets are pulled after the first sync
//! - **Key-map**: Rename Bitwarden secret IDs to Secret keys, or pass all through
//! - **Owner references**: Deleting a `BitwardenSecret` deletes its Secret
//! - **Prometheus metrics**: Exposes metrics for monitoring and observability
//! - **Health checks**: HTTP endpoints for liveness and readiness checks

use anyhow::Result;
use bitwarden_secrets_operator::runtime::{initialization, watch_loop};

#[tokio::main]
async fn main() -> Result<()> {
    let init = initialization::initialize().await?;

    watch_loop::run_watch_loop(
        init.client,
        init.reconciler,
        init.server_state,
        init.config.watch_restart_delay(),
    )
    .await
}
