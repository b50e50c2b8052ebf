//! # Watch Loop
//!
//! Controller watch loop that monitors `BitwardenSecret` resources (and the
//! Secrets they own) and triggers reconciliation on changes.

use crate::controller::reconciler::{reconcile, ClusterReconciler};
use crate::controller::server::ServerState;
use crate::crd::BitwardenSecret;
use crate::runtime::error_policy::{error_policy, handle_watch_stream_error};
use futures::StreamExt;
use k8s_openapi::api::core::v1::Secret;
use kube::api::Api;
use kube::Client;
use kube_runtime::{watcher, Controller};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Run the controller until SIGINT or SIGTERM is received
///
/// `shutdown_on_signal` drains in-flight reconciliations and ends the stream
/// on either signal. The same signals mark the health server not ready. A stream
/// that ends without a shutdown request within `restart_delay` is restarted.
///
/// # Errors
/// Currently infallible; the signature leaves room for startup checks.
pub async fn run_watch_loop(
    client: Client,
    reconciler: Arc<ClusterReconciler>,
    server_state: Arc<ServerState>,
    restart_delay: Duration,
) -> Result<(), anyhow::Error> {
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let shutdown_state = Arc::clone(&server_state);
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Received shutdown signal, draining in-flight reconciliations");
        shutdown_state.set_ready(false);
        let _ = shutdown_tx.send(true);
    });

    loop {
        let declarations: Api<BitwardenSecret> = Api::all(client.clone());
        let secrets: Api<Secret> = Api::all(client.clone());

        info!("Starting controller watch loop...");
        Controller::new(declarations, watcher::Config::default().any_semantic())
            .owns(secrets, watcher::Config::default())
            .shutdown_on_signal()
            .run(reconcile, error_policy, Arc::clone(&reconciler))
            .for_each(|result| async move {
                match result {
                    Ok((object, _)) => {
                        debug!(resource = %object, "watch.event.success");
                    }
                    Err(e) => {
                        handle_watch_stream_error(&format!("{e:?}"), restart_delay).await;
                    }
                }
            })
            .await;

        // The controller and the signal task observe the same signal; give the
        // task the restart delay to record it before deciding to restart
        if shutdown_requested_within(&mut shutdown_rx, restart_delay).await {
            info!("Shutdown requested, exiting watch loop");
            break;
        }

        warn!(
            "Controller watch stream ended without a shutdown request, restarting after {}s",
            restart_delay.as_secs()
        );
    }

    info!("Controller stopped gracefully");
    Ok(())
}

/// Whether shutdown is (or becomes) requested within `delay`
pub async fn shutdown_requested_within(
    shutdown: &mut watch::Receiver<bool>,
    delay: Duration,
) -> bool {
    let observed = tokio::time::timeout(delay, shutdown.wait_for(|requested| *requested))
        .await
        .map(|result| result.is_ok());
    match observed {
        Ok(true) => true,
        Ok(false) => {
            // Signal task is gone; keep the restart cadence
            tokio::time::sleep(delay).await;
            false
        }
        Err(_) => false,
    }
}

/// Resolves on the first SIGINT or SIGTERM
async fn shutdown_signal() {
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                warn!(error = %e, "Failed to listen for SIGINT");
                std::future::pending::<()>().await;
            }
        }
        () = terminate_signal() => {}
    }
}

#[cfg(unix)]
async fn terminate_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            warn!(error = %e, "Failed to listen for SIGTERM");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate_signal() {
    std::future::pending::<()>().await;
}
