//! # Stores
//!
//! Cluster access used by the reconciler.
//!
//! `DeclarationStore` reads `BitwardenSecret` resources and writes their status;
//! `SecretStore` reads and writes core `Secret` objects. `KubeStore` implements
//! both against the API server.

use crate::constants::FIELD_MANAGER;
use crate::crd::{BitwardenSecret, BitwardenSecretStatus};
use anyhow::Result;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Api, Patch, PatchParams, PostParams};
use kube::Client;
use serde_json::json;

#[async_trait]
pub trait DeclarationStore: Send + Sync {
    /// `None` when the resource no longer exists
    async fn get_declaration(&self, namespace: &str, name: &str)
        -> Result<Option<BitwardenSecret>>;

    async fn update_status(
        &self,
        namespace: &str,
        name: &str,
        status: &BitwardenSecretStatus,
    ) -> Result<()>;
}

#[async_trait]
pub trait SecretStore: Send + Sync {
    /// `None` when the Secret does not exist
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>>;

    async fn create_secret(&self, namespace: &str, secret: &Secret) -> Result<Secret>;

    async fn replace_secret(&self, namespace: &str, secret: &Secret) -> Result<Secret>;
}

/// API server backed store
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl std::fmt::Debug for KubeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeStore").finish_non_exhaustive()
    }
}

impl KubeStore {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DeclarationStore for KubeStore {
    async fn get_declaration(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<BitwardenSecret>> {
        let api: Api<BitwardenSecret> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn update_status(
        &self,
        namespace: &str,
        name: &str,
        status: &BitwardenSecretStatus,
    ) -> Result<()> {
        let api: Api<BitwardenSecret> = Api::namespaced(self.client.clone(), namespace);
        let patch = json!({ "status": status });
        api.patch_status(
            name,
            &PatchParams::apply(FIELD_MANAGER),
            &Patch::Merge(&patch),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl SecretStore for KubeStore {
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn create_secret(&self, namespace: &str, secret: &Secret) -> Result<Secret> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.create(&PostParams::default(), secret).await?)
    }

    async fn replace_secret(&self, namespace: &str, secret: &Secret) -> Result<Secret> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let name = secret
            .metadata
            .name
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("Secret has no name"))?;
        Ok(api.replace(name, &PostParams::default(), secret).await?)
    }
}
