//! # CRD Generator
//!
//! Prints the `BitwardenSecret` CustomResourceDefinition as YAML.
//!
//! ## Usage
//!
//! ```bash
//! # Generate CRD YAML
//! cargo run --bin crdgen > config/crd/bases/k8s.bitwarden.com_bitwardensecrets.yaml
//!
//! # Generate and apply directly
//! cargo run --bin crdgen | kubectl apply -f -
//! ```

use anyhow::{Context, Result};
use bitwarden_secrets_operator::crd::BitwardenSecret;
use kube::core::CustomResourceExt;

fn main() -> Result<()> {
    let yaml = serde_yaml::to_string(&BitwardenSecret::crd())
        .context("Failed to serialize BitwardenSecret CRD")?;
    print!("{yaml}");
    Ok(())
}
