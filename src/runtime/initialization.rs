//! # Initialization
//!
//! Process startup for the operator binary.

use crate::config::ControllerConfig;
use crate::controller::reconciler::{
    ClusterReconciler, KubeStore, Reconciler, ReconcilerSettings, SystemClock,
};
use crate::controller::server::{start_server, ServerState};
use crate::observability;
use crate::provider::bitwarden::BitwardenSecretsManager;
use anyhow::{Context, Result};
use kube::Client;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Everything the watch loop needs
pub struct InitializationResult {
    /// Kubernetes client
    pub client: Client,
    /// Reconciler context shared by all reconciliations
    pub reconciler: Arc<ClusterReconciler>,
    /// Readiness flag shared with the health server
    pub server_state: Arc<ServerState>,
    /// Configuration loaded from the environment
    pub config: ControllerConfig,
}

impl fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InitializationResult")
            .field("server_ready", &self.server_state.is_ready())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Bring the operator up to the point where the watch loop can start
///
/// Order matters: the crypto provider precedes any TLS client, and the health
/// server binds before the Kubernetes client so `/healthz` answers while the
/// API server is still being contacted.
///
/// # Errors
/// Fails on metric registration, health server startup, Kubernetes client
/// creation or an unusable Bitwarden endpoint configuration
pub async fn initialize() -> Result<InitializationResult> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bitwarden_secrets_operator=info".into()),
        )
        .init();

    info!(
        build_timestamp = env!("BUILD_TIMESTAMP"),
        build_datetime = env!("BUILD_DATETIME"),
        git_hash = env!("BUILD_GIT_HASH"),
        "Starting Bitwarden Secrets Operator"
    );

    let config = ControllerConfig::from_env();
    info!(
        api_url = %config.api_url,
        identity_api_url = %config.identity_api_url,
        state_path = ?config.state_path,
        refresh_interval_secs = config.refresh_interval_secs,
        "Loaded configuration"
    );

    observability::metrics::register_metrics()?;

    let server_state = Arc::new(ServerState::new());
    let health_state = Arc::clone(&server_state);
    let port = config.metrics_port;
    let server = tokio::spawn(async move {
        if let Err(e) = start_server(port, health_state).await {
            error!(port, error = %e, "Health server stopped");
        }
    });
    await_health_server(&server_state, &server, &config).await?;

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let factory = BitwardenSecretsManager::new(&config.api_url, &config.identity_api_url)
        .context("Failed to create Bitwarden client factory")?;

    let reconciler = Arc::new(Reconciler::new(
        KubeStore::new(client.clone()),
        factory,
        SystemClock,
        ReconcilerSettings::from(&config),
    ));

    info!("Operator initialized");

    Ok(InitializationResult {
        client,
        reconciler,
        server_state,
        config,
    })
}

/// Poll until the health server has bound its port
async fn await_health_server(
    state: &ServerState,
    server: &tokio::task::JoinHandle<()>,
    config: &ControllerConfig,
) -> Result<()> {
    let poll_interval = config.server_poll_interval();
    let bound = async {
        while !state.is_ready() {
            if server.is_finished() {
                anyhow::bail!("Health server exited before binding port {}", config.metrics_port);
            }
            tokio::time::sleep(poll_interval).await;
        }
        Ok(())
    };

    tokio::time::timeout(config.server_startup_timeout(), bound)
        .await
        .with_context(|| {
            format!(
                "Health server did not bind port {} within {}s",
                config.metrics_port,
                config.server_startup_timeout().as_secs()
            )
        })??;
    debug!(port = config.metrics_port, "Health server ready");
    Ok(())
}
