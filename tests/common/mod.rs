//! Common test utilities
//!
//! In-memory fakes for the reconciler seams (cluster stores, Bitwarden client
//! factory, clock) plus shared initialization.

#![allow(dead_code, reason = "each test binary uses a subset of the helpers")]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bitwarden_secrets_operator::controller::reconciler::{
    Clock, DeclarationStore, Reconciler, ReconcilerSettings, SecretStore,
};
use bitwarden_secrets_operator::crd::{
    AuthToken, BitwardenSecret, BitwardenSecretSpec, BitwardenSecretStatus, SecretMap,
};
use bitwarden_secrets_operator::provider::{
    BitwardenClient, BitwardenClientFactory, BitwardenError, SecretsSync, SyncedSecret,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Once};

static RUSTLS_INIT: Once = Once::new();

/// Install the ring provider once per test binary
pub fn init_rustls() {
    RUSTLS_INIT.call_once(|| {
        rustls::crypto::ring::default_provider()
            .install_default()
            .expect("Failed to install rustls crypto provider");
    });
}

pub const NAMESPACE: &str = "apps";
pub const NAME: &str = "bw-sync";
pub const UID: &str = "6f0c7c3e-1c1f-4b8e-9d7a-3f1f2b5c9e01";
pub const ORG_ID: &str = "org-1";
pub const TARGET_SECRET: &str = "app-secrets";
pub const AUTH_SECRET: &str = "bw-auth";
pub const AUTH_KEY: &str = "token";
pub const ACCESS_TOKEN: &str = "0.token-for-tests";
pub const API_URL: &str = "https://api.test";
pub const IDENTITY_URL: &str = "https://identity.test";
pub const STATE_PATH: &str = "/tmp/bw-state";

type Key = (String, String);

fn key(namespace: &str, name: &str) -> Key {
    (namespace.to_string(), name.to_string())
}

/// In-memory cluster implementing both stores
#[derive(Clone, Default)]
pub struct FakeCluster {
    inner: Arc<Mutex<ClusterState>>,
}

#[derive(Default)]
struct ClusterState {
    declarations: HashMap<Key, BitwardenSecret>,
    secrets: HashMap<Key, Secret>,
    creates: usize,
    replaces: usize,
    status_writes: usize,
    fail_declaration_lookup: bool,
    fail_status_writes: bool,
    fail_creates: bool,
    fail_replaces: bool,
    failing_secret_reads: HashSet<String>,
}

impl FakeCluster {
    pub fn insert_declaration(&self, declaration: BitwardenSecret) {
        let namespace = declaration.metadata.namespace.clone().unwrap_or_default();
        let name = declaration.metadata.name.clone().unwrap_or_default();
        self.inner
            .lock()
            .unwrap()
            .declarations
            .insert(key(&namespace, &name), declaration);
    }

    pub fn declaration(&self) -> Option<BitwardenSecret> {
        self.inner
            .lock()
            .unwrap()
            .declarations
            .get(&key(NAMESPACE, NAME))
            .cloned()
    }

    pub fn status(&self) -> BitwardenSecretStatus {
        self.declaration()
            .and_then(|d| d.status)
            .unwrap_or_default()
    }

    pub fn set_secret_map(&self, secret_map: Option<Vec<SecretMap>>) {
        let mut state = self.inner.lock().unwrap();
        let declaration = state
            .declarations
            .get_mut(&key(NAMESPACE, NAME))
            .expect("declaration exists");
        declaration.spec.secret_map = secret_map;
    }

    pub fn remove_declaration(&self) {
        self.inner
            .lock()
            .unwrap()
            .declarations
            .remove(&key(NAMESPACE, NAME));
    }

    pub fn insert_secret(&self, secret: Secret) {
        let namespace = secret.metadata.namespace.clone().unwrap_or_default();
        let name = secret.metadata.name.clone().unwrap_or_default();
        self.inner
            .lock()
            .unwrap()
            .secrets
            .insert(key(&namespace, &name), secret);
    }

    pub fn remove_secret(&self, name: &str) {
        self.inner
            .lock()
            .unwrap()
            .secrets
            .remove(&key(NAMESPACE, name));
    }

    pub fn secret(&self, name: &str) -> Option<Secret> {
        self.inner
            .lock()
            .unwrap()
            .secrets
            .get(&key(NAMESPACE, name))
            .cloned()
    }

    /// Target Secret data decoded as UTF-8
    pub fn target_data(&self) -> BTreeMap<String, String> {
        self.secret(TARGET_SECRET)
            .and_then(|s| s.data)
            .unwrap_or_default()
            .into_iter()
            .map(|(k, v)| (k, String::from_utf8(v.0).unwrap()))
            .collect()
    }

    pub fn creates(&self) -> usize {
        self.inner.lock().unwrap().creates
    }

    pub fn replaces(&self) -> usize {
        self.inner.lock().unwrap().replaces
    }

    pub fn status_writes(&self) -> usize {
        self.inner.lock().unwrap().status_writes
    }

    pub fn fail_declaration_lookup(&self, fail: bool) {
        self.inner.lock().unwrap().fail_declaration_lookup = fail;
    }

    pub fn fail_status_writes(&self, fail: bool) {
        self.inner.lock().unwrap().fail_status_writes = fail;
    }

    pub fn fail_creates(&self, fail: bool) {
        self.inner.lock().unwrap().fail_creates = fail;
    }

    pub fn fail_replaces(&self, fail: bool) {
        self.inner.lock().unwrap().fail_replaces = fail;
    }

    /// Make reads of the Secret `name` fail with an API error
    pub fn fail_secret_reads(&self, name: &str, fail: bool) {
        let mut state = self.inner.lock().unwrap();
        if fail {
            state.failing_secret_reads.insert(name.to_string());
        } else {
            state.failing_secret_reads.remove(name);
        }
    }
}

#[async_trait]
impl DeclarationStore for FakeCluster {
    async fn get_declaration(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<BitwardenSecret>> {
        let state = self.inner.lock().unwrap();
        if state.fail_declaration_lookup {
            return Err(anyhow!("connection refused"));
        }
        Ok(state.declarations.get(&key(namespace, name)).cloned())
    }

    async fn update_status(
        &self,
        namespace: &str,
        name: &str,
        status: &BitwardenSecretStatus,
    ) -> Result<()> {
        let mut state = self.inner.lock().unwrap();
        if state.fail_status_writes {
            return Err(anyhow!("status subresource unavailable"));
        }
        let declaration = state
            .declarations
            .get_mut(&key(namespace, name))
            .ok_or_else(|| anyhow!("BitwardenSecret {namespace}/{name} not found"))?;
        declaration.status = Some(status.clone());
        state.status_writes += 1;
        Ok(())
    }
}

#[async_trait]
impl SecretStore for FakeCluster {
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>> {
        let state = self.inner.lock().unwrap();
        if state.failing_secret_reads.contains(name) {
            return Err(anyhow!("etcdserver: request timed out"));
        }
        Ok(state.secrets.get(&key(namespace, name)).cloned())
    }

    async fn create_secret(&self, namespace: &str, secret: &Secret) -> Result<Secret> {
        let mut state = self.inner.lock().unwrap();
        if state.fail_creates {
            return Err(anyhow!("secrets is forbidden"));
        }
        let name = secret.metadata.name.clone().unwrap_or_default();
        let key = key(namespace, &name);
        if state.secrets.contains_key(&key) {
            return Err(anyhow!("secrets \"{name}\" already exists"));
        }
        state.secrets.insert(key, secret.clone());
        state.creates += 1;
        Ok(secret.clone())
    }

    async fn replace_secret(&self, namespace: &str, secret: &Secret) -> Result<Secret> {
        let mut state = self.inner.lock().unwrap();
        if state.fail_replaces {
            return Err(anyhow!("the object has been modified"));
        }
        let name = secret.metadata.name.clone().unwrap_or_default();
        let key = key(namespace, &name);
        if !state.secrets.contains_key(&key) {
            return Err(anyhow!("secrets \"{name}\" not found"));
        }
        state.secrets.insert(key, secret.clone());
        state.replaces += 1;
        Ok(secret.clone())
    }
}

/// Scripted Bitwarden service shared by every client of a `FakeFactory`
#[derive(Default)]
pub struct FakeBitwarden {
    pub has_changes: bool,
    /// Returned by the next syncs, keyed by secret ID
    pub delta: BTreeMap<String, String>,
    pub fail_client: bool,
    pub fail_login: bool,
    pub fail_sync: bool,
    pub logins: Vec<(String, Option<PathBuf>)>,
    pub syncs: Vec<(String, Option<DateTime<Utc>>)>,
    pub clients_created: usize,
    pub clients_closed: usize,
}

#[derive(Clone, Default)]
pub struct FakeFactory {
    pub service: Arc<Mutex<FakeBitwarden>>,
}

impl FakeFactory {
    pub fn respond_with(&self, has_changes: bool, delta: &[(&str, &str)]) {
        let mut service = self.service.lock().unwrap();
        service.has_changes = has_changes;
        service.delta = delta
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut FakeBitwarden) -> R) -> R {
        f(&mut self.service.lock().unwrap())
    }
}

impl BitwardenClientFactory for FakeFactory {
    type Client = FakeClient;

    fn get_client(&self) -> Result<Self::Client, BitwardenError> {
        let mut service = self.service.lock().unwrap();
        if service.fail_client {
            return Err(BitwardenError::NotAuthenticated);
        }
        service.clients_created += 1;
        Ok(FakeClient {
            service: self.service.clone(),
            logged_in: false,
        })
    }

    fn api_url(&self) -> &str {
        API_URL
    }

    fn identity_api_url(&self) -> &str {
        IDENTITY_URL
    }
}

pub struct FakeClient {
    service: Arc<Mutex<FakeBitwarden>>,
    logged_in: bool,
}

#[async_trait]
impl BitwardenClient for FakeClient {
    async fn access_token_login(
        &mut self,
        access_token: &str,
        state_path: Option<&Path>,
    ) -> Result<(), BitwardenError> {
        let mut service = self.service.lock().unwrap();
        service
            .logins
            .push((access_token.to_string(), state_path.map(Path::to_path_buf)));
        if service.fail_login {
            return Err(BitwardenError::Identity {
                status: 400,
                body: "invalid_client".to_string(),
            });
        }
        self.logged_in = true;
        Ok(())
    }

    async fn sync_secrets(
        &self,
        organization_id: &str,
        last_synced: Option<DateTime<Utc>>,
    ) -> Result<SecretsSync, BitwardenError> {
        if !self.logged_in {
            return Err(BitwardenError::NotAuthenticated);
        }
        let mut service = self.service.lock().unwrap();
        service
            .syncs
            .push((organization_id.to_string(), last_synced));
        if service.fail_sync {
            return Err(BitwardenError::Api {
                status: 500,
                body: "internal error".to_string(),
            });
        }
        let secrets = if service.has_changes {
            service
                .delta
                .iter()
                .map(|(id, value)| SyncedSecret {
                    id: id.clone(),
                    key: format!("name-of-{id}"),
                    value: value.clone(),
                })
                .collect()
        } else {
            Vec::new()
        };
        Ok(SecretsSync {
            has_changes: service.has_changes,
            secrets,
        })
    }

    fn close(self) {
        self.service.lock().unwrap().clients_closed += 1;
    }
}

/// Manually advanced clock
#[derive(Clone)]
pub struct FakeClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap())),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for FakeClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

pub fn declaration(secret_map: Option<Vec<SecretMap>>) -> BitwardenSecret {
    let mut declaration = BitwardenSecret::new(
        NAME,
        BitwardenSecretSpec {
            organization_id: ORG_ID.to_string(),
            secret_name: TARGET_SECRET.to_string(),
            auth_token: AuthToken {
                secret_name: AUTH_SECRET.to_string(),
                secret_key: AUTH_KEY.to_string(),
            },
            secret_map,
        },
    );
    declaration.metadata.namespace = Some(NAMESPACE.to_string());
    declaration.metadata.uid = Some(UID.to_string());
    declaration.metadata.generation = Some(1);
    declaration
}

pub fn auth_secret(token: &str) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(AUTH_SECRET.to_string()),
            namespace: Some(NAMESPACE.to_string()),
            ..ObjectMeta::default()
        },
        data: Some(BTreeMap::from([(
            AUTH_KEY.to_string(),
            ByteString(token.as_bytes().to_vec()),
        )])),
        ..Secret::default()
    }
}

pub fn map_entry(id: &str, key: &str) -> SecretMap {
    SecretMap {
        bw_secret_id: id.to_string(),
        secret_key_name: key.to_string(),
    }
}

/// Reconciler over fakes, with handles to inspect them
pub struct Harness {
    pub cluster: FakeCluster,
    pub bitwarden: FakeFactory,
    pub clock: FakeClock,
    pub reconciler: Reconciler<FakeCluster, FakeFactory, FakeClock>,
}

impl Harness {
    /// Declaration and auth Secret in place, no target Secret yet
    pub fn new(secret_map: Option<Vec<SecretMap>>) -> Self {
        let cluster = FakeCluster::default();
        cluster.insert_declaration(declaration(secret_map));
        cluster.insert_secret(auth_secret(ACCESS_TOKEN));

        let bitwarden = FakeFactory::default();
        let clock = FakeClock::new();
        let reconciler = Reconciler::new(
            cluster.clone(),
            bitwarden.clone(),
            clock.clone(),
            ReconcilerSettings {
                refresh_interval: std::time::Duration::from_secs(300),
                state_path: Some(PathBuf::from(STATE_PATH)),
            },
        );

        Self {
            cluster,
            bitwarden,
            clock,
            reconciler,
        }
    }
}
