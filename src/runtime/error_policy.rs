//! # Error Policy
//!
//! Handling for errors escaping reconciliation and for watch stream errors.

use crate::controller::reconciler::{
    Clock, DeclarationStore, Reconciler, ReconcilerError, ReconcilerSettings, SecretStore,
};
use crate::crd::BitwardenSecret;
use crate::observability;
use crate::provider::BitwardenClientFactory;
use kube::ResourceExt;
use kube_runtime::controller::Action;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};

/// Requeue after the refresh interval
///
/// Sync failures never reach this point; they are recorded on the status and
/// requeued by the reconciler itself. Only lookup failures of the
/// `BitwardenSecret` land here, and they retry on the same fixed cadence.
pub fn handle_reconciliation_error(
    obj: &BitwardenSecret,
    error: &ReconcilerError,
    settings: &ReconcilerSettings,
) -> Action {
    let name = obj.name_any();
    let namespace = obj.namespace().unwrap_or_default();

    let error_span = tracing::span!(
        tracing::Level::ERROR,
        "controller.watch.reconciliation_error",
        resource.name = name.as_str(),
        resource.namespace = namespace.as_str(),
        error = %error
    );
    let _error_guard = error_span.enter();

    error!("Reconciliation error for {}/{}: {:?}", namespace, name, error);
    observability::metrics::increment_reconciliation_errors();

    Action::requeue(settings.refresh_interval)
}

/// Log a watch stream error
///
/// Expected errors (expired resource version, deleted objects) pass straight
/// through; anything else pauses the stream for `restart_delay`.
pub async fn handle_watch_stream_error(error_string: &str, restart_delay: Duration) {
    let is_not_found = error_string.contains("ObjectNotFound")
        || error_string.contains("404")
        || error_string.contains("not found");
    let is_410 = error_string.contains("410")
        || error_string.contains("too old resource version")
        || error_string.contains("Expired")
        || error_string.contains("Gone");

    if is_410 {
        warn!("Watch resource version expired (410), watch will restart");
    } else if is_not_found {
        warn!(
            "Resource not found (404), the object may have been deleted or the CRD is missing: {}",
            error_string
        );
    } else {
        error!("Controller stream error: {}", error_string);
        tokio::time::sleep(restart_delay).await;
    }
}

/// Shared-context adapter used by `Controller::run`
pub fn error_policy<S, F, C>(
    obj: Arc<BitwardenSecret>,
    error: &ReconcilerError,
    ctx: Arc<Reconciler<S, F, C>>,
) -> Action
where
    S: DeclarationStore + SecretStore,
    F: BitwardenClientFactory,
    C: Clock,
{
    handle_reconciliation_error(&obj, error, ctx.settings())
}
