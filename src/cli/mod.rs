//! # BWSCTL CLI
//!
//! Command-line interface for the Bitwarden Secrets Operator.
//!
//! ## Usage
//!
//! ```bash
//! # List all BitwardenSecret resources
//! bwsctl list bitwardensecret
//!
//! # Show status of a BitwardenSecret
//! bwsctl status bws app-secrets --namespace apps
//!
//! # Request an immediate sync
//! bwsctl sync bws app-secrets
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use kube::Client;

mod list;
mod status;
mod sync;

/// Bitwarden Secrets Operator CLI
#[derive(Parser)]
#[command(name = "bwsctl")]
#[command(
    about = "Bitwarden Secrets Operator CLI",
    long_about = None,
    after_help = "\
Available resource types:
  bitwardensecret (or 'bws') - BitwardenSecret resource

Examples:
  bwsctl list bitwardensecret
  bwsctl sync bws app-secrets
  bwsctl status bitwardensecret app-secrets --namespace default
"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Kubernetes namespace (defaults to 'default')
    #[arg(short, long, global = true)]
    namespace: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List BitwardenSecret resources
    List {
        /// Resource type
        #[arg(value_enum, value_name = "RESOURCE_TYPE")]
        resource_type: ResourceType,
    },
    /// Show status of a BitwardenSecret resource
    Status {
        /// Resource type
        #[arg(value_enum, value_name = "RESOURCE_TYPE")]
        resource_type: ResourceType,

        /// Name of the BitwardenSecret resource
        #[arg(value_name = "NAME")]
        name: String,
    },
    /// Request an immediate sync of a BitwardenSecret resource
    Sync {
        /// Resource type
        #[arg(value_enum, value_name = "RESOURCE_TYPE")]
        resource_type: ResourceType,

        /// Name of the BitwardenSecret resource
        #[arg(value_name = "NAME")]
        name: String,
    },
}

/// Resource types supported by bwsctl
#[derive(Clone, Copy, ValueEnum)]
enum ResourceType {
    /// Short form: 'bws'
    #[value(name = "bitwardensecret", alias = "bws")]
    BitwardenSecret,
}

#[tokio::main]
async fn main() -> Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bwsctl=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client. Ensure kubeconfig is configured.")?;

    match cli.command {
        Commands::List {
            resource_type: ResourceType::BitwardenSecret,
        } => list::list_command(client, cli.namespace).await,
        Commands::Status {
            resource_type: ResourceType::BitwardenSecret,
            name,
        } => status::status_command(client, name, cli.namespace).await,
        Commands::Sync {
            resource_type: ResourceType::BitwardenSecret,
            name,
        } => sync::sync_command(client, name, cli.namespace).await,
    }
}
