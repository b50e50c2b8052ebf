//! # Reconciliation
//!
//! Sync loop for a single `BitwardenSecret`:
//!
//! 1. Skip when inside the sync guard window after the last successful sync
//!    (the invocation is the watch echo of our own status write)
//! 2. Read the access token from the auth Secret
//! 3. Pull the delta since shortly before the last successful sync
//! 4. Create the target Secret if needed, merge the delta, apply the key-map
//!    and stamp the sync annotations
//! 5. Record `SuccessfulSync` and advance the watermark, or `FailedSync`
//!
//! Every path except deletion requeues after the refresh interval.

use crate::constants::{
    CONDITION_FAILED_SYNC, CONDITION_SUCCESSFUL_SYNC, DEFAULT_NAMESPACE,
    REASON_RECONCILIATION_COMPLETE, REASON_RECONCILIATION_FAILED, SYNC_GUARD_WINDOW_MILLIS,
    SYNC_LOOKBACK_MILLIS,
};
use crate::controller::reconciler::annotations::set_sync_annotations;
use crate::controller::reconciler::clock::{Clock, SystemClock};
use crate::controller::reconciler::materialize::{merge_values, new_secret};
use crate::controller::reconciler::secret_map::{apply_secret_map, delta_key_count};
use crate::controller::reconciler::store::{DeclarationStore, KubeStore, SecretStore};
use crate::controller::reconciler::sync::pull_deltas;
use crate::controller::reconciler::types::{
    ReconcilerError, ReconcilerSettings, SyncError, SyncOutcome,
};
use crate::crd::{BitwardenSecret, BitwardenSecretStatus, Condition};
use crate::observability::metrics;
use crate::provider::bitwarden::BitwardenSecretsManager;
use crate::provider::BitwardenClientFactory;
use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use kube::ResourceExt;
use kube_runtime::controller::Action;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn, Instrument};

/// Reconciler wired to the cluster and the Bitwarden REST client
pub type ClusterReconciler = Reconciler<KubeStore, BitwardenSecretsManager, SystemClock>;

pub struct Reconciler<S, F, C = SystemClock> {
    store: S,
    factory: F,
    clock: C,
    settings: ReconcilerSettings,
}

impl<S, F, C> std::fmt::Debug for Reconciler<S, F, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl<S, F, C> Reconciler<S, F, C>
where
    S: DeclarationStore + SecretStore,
    F: BitwardenClientFactory,
    C: Clock,
{
    pub fn new(store: S, factory: F, clock: C, settings: ReconcilerSettings) -> Self {
        Self {
            store,
            factory,
            clock,
            settings,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &ReconcilerSettings {
        &self.settings
    }

    /// Reconcile the `BitwardenSecret` `namespace/name`
    ///
    /// # Errors
    /// Only when the resource itself cannot be read. Sync failures are
    /// recorded as `FailedSync` and returned as `SyncOutcome::Failed`.
    pub async fn reconcile(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<SyncOutcome, ReconcilerError> {
        let start = Instant::now();
        metrics::increment_reconciliations();

        let outcome = self.reconcile_inner(namespace, name).await;

        metrics::observe_reconciliation_duration(start.elapsed().as_secs_f64());
        if matches!(outcome, Ok(SyncOutcome::Failed(_))) {
            metrics::increment_reconciliation_errors();
        }
        outcome
    }

    async fn reconcile_inner(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<SyncOutcome, ReconcilerError> {
        let Some(declaration) = self
            .store
            .get_declaration(namespace, name)
            .await
            .context("Error looking up BitwardenSecret")?
        else {
            info!("{}/{} was deleted.", namespace, name);
            return Ok(SyncOutcome::Deleted);
        };

        let mut status = declaration.status.clone().unwrap_or_default();
        let last_sync = status.last_successful_sync();

        if let Some(last_sync) = last_sync {
            if self.clock.now() < last_sync + Duration::milliseconds(SYNC_GUARD_WINDOW_MILLIS) {
                debug!(
                    last_sync = %last_sync,
                    "Inside sync guard window, treating as status echo"
                );
                metrics::increment_syncs_skipped();
                return Ok(SyncOutcome::Suppressed);
            }
        }

        info!("Syncing {}/{}", namespace, name);
        let generation = declaration.metadata.generation;

        match self.sync(&declaration, namespace, name, last_sync).await {
            Ok(written) => {
                let now = self.clock.now();
                let (message, outcome) = match written {
                    Some(keys) => {
                        metrics::increment_secrets_synced(keys);
                        (
                            format!("Completed sync for {}/{}", namespace, name),
                            SyncOutcome::Synced { keys },
                        )
                    }
                    None => (
                        format!("No changes to {}/{}", namespace, name),
                        SyncOutcome::Unchanged,
                    ),
                };
                info!("{}", message);
                status.set_condition(
                    Condition::new(
                        CONDITION_SUCCESSFUL_SYNC,
                        true,
                        REASON_RECONCILIATION_COMPLETE,
                        message,
                        generation,
                    ),
                    now,
                );
                status.record_successful_sync(now);
                self.write_status(namespace, name, &status).await;
                Ok(outcome)
            }
            Err(e) => {
                error!(error = %e, "Sync of {}/{} failed", namespace, name);
                status.set_condition(
                    Condition::new(
                        CONDITION_FAILED_SYNC,
                        false,
                        REASON_RECONCILIATION_FAILED,
                        e.to_string(),
                        generation,
                    ),
                    self.clock.now(),
                );
                self.write_status(namespace, name, &status).await;
                Ok(SyncOutcome::Failed(e))
            }
        }
    }

    /// One sync attempt; `Ok(None)` when the service reported no changes
    async fn sync(
        &self,
        declaration: &BitwardenSecret,
        namespace: &str,
        name: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Option<usize>, SyncError> {
        let spec = &declaration.spec;
        let access_token = self.read_access_token(declaration, namespace).await?;

        // Re-delivered values merge to the same data
        let query_since = since.map(|t| t - Duration::milliseconds(SYNC_LOOKBACK_MILLIS));
        let state_path = self.settings.state_path.as_deref();
        let delta = pull_deltas(
            &self.factory,
            &spec.organization_id,
            &access_token,
            state_path,
            query_since,
        )
        .await
        .map_err(|source| SyncError::Pull {
            api_url: self.factory.api_url().to_string(),
            identity_api_url: self.factory.identity_api_url().to_string(),
            state_path: state_path
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            organization_id: spec.organization_id.clone(),
            source,
        })?;

        if !delta.has_changes {
            debug!("No changes reported since {:?}", query_since);
            return Ok(None);
        }

        let mut secret = match self
            .store
            .get_secret(namespace, &spec.secret_name)
            .await
            .map_err(|source| SyncError::ReadSecret {
                namespace: namespace.to_string(),
                name: spec.secret_name.clone(),
                source,
            })? {
            Some(secret) => secret,
            None => {
                let shell = new_secret(declaration, namespace)?;
                info!(secret = %spec.secret_name, "Creating target Secret");
                self.store
                    .create_secret(namespace, &shell)
                    .await
                    .map_err(SyncError::CreateSecret)?
            }
        };

        let secret_map = spec.secret_map.as_deref();
        let keys = delta_key_count(&delta.values, secret_map);
        merge_values(&mut secret, delta.values);
        apply_secret_map(&mut secret, secret_map);
        set_sync_annotations(&mut secret, secret_map, self.clock.now()).map_err(|source| {
            SyncError::Annotations {
                namespace: namespace.to_string(),
                name: name.to_string(),
                source,
            }
        })?;

        self.store
            .replace_secret(namespace, &secret)
            .await
            .map_err(|source| SyncError::UpdateSecret {
                namespace: namespace.to_string(),
                name: spec.secret_name.clone(),
                source,
            })?;
        Ok(Some(keys))
    }

    async fn read_access_token(
        &self,
        declaration: &BitwardenSecret,
        namespace: &str,
    ) -> Result<String, SyncError> {
        let auth = &declaration.spec.auth_token;
        let secret = self
            .store
            .get_secret(namespace, &auth.secret_name)
            .await
            .map_err(SyncError::AuthSecret)?
            .ok_or_else(|| {
                SyncError::AuthSecret(anyhow::anyhow!(
                    "Secret {}/{} not found",
                    namespace,
                    auth.secret_name
                ))
            })?;

        let token = secret
            .data
            .as_ref()
            .and_then(|data| data.get(&auth.secret_key))
            .ok_or_else(|| SyncError::AuthTokenKeyMissing {
                secret: auth.secret_name.clone(),
                key: auth.secret_key.clone(),
            })?;

        String::from_utf8(token.0.clone())
            .map(|token| token.trim().to_string())
            .map_err(|e| SyncError::AuthSecret(e.into()))
    }

    /// Status writes are best effort; the next poll re-evaluates the condition
    async fn write_status(&self, namespace: &str, name: &str, status: &BitwardenSecretStatus) {
        if let Err(e) = self.store.update_status(namespace, name, status).await {
            warn!(error = %e, "Failed to update status of {}/{}", namespace, name);
        }
    }
}

/// Controller entry point for one `BitwardenSecret` event
///
/// # Errors
/// Returns `ReconcilerError` when the resource cannot be read; the error
/// policy decides the retry.
pub async fn reconcile<S, F, C>(
    obj: Arc<BitwardenSecret>,
    ctx: Arc<Reconciler<S, F, C>>,
) -> Result<Action, ReconcilerError>
where
    S: DeclarationStore + SecretStore,
    F: BitwardenClientFactory,
    C: Clock,
{
    let name = obj.name_any();
    let namespace = obj
        .namespace()
        .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());

    let span = tracing::info_span!(
        "controller.reconcile",
        resource.name = name.as_str(),
        resource.namespace = namespace.as_str(),
    );

    async move {
        let outcome = ctx.reconcile(&namespace, &name).await?;
        debug!(outcome = outcome.as_str(), "Reconciliation finished");
        Ok::<_, ReconcilerError>(outcome.action(ctx.settings().refresh_interval))
    }
    .instrument(span)
    .await
}
