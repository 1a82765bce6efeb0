use std::{
    collections::BTreeMap,
    sync::atomic::{AtomicU64, Ordering},
};

use k8s_openapi::{api::core::v1::Secret, ByteString};
use snafu::OptionExt;
use tokio::sync::Mutex;

use crate::client::{
    AlreadyExistsSnafu, MissingObjectKeySnafu, NotFoundSnafu, Result, SecretClient,
};

type SecretKey = (String, String);

/// An in-process [`SecretClient`] for testing purposes.
///
/// It mimics the API server closely enough for keyring tests: creation stamps
/// a uid and a resource version, every data replacement bumps the resource
/// version, and all operations are serialized.
#[derive(Default)]
pub struct InMemorySecretClient {
    secrets: Mutex<BTreeMap<SecretKey, Secret>>,
    revision: AtomicU64,
    writes: AtomicU64,
}

impl InMemorySecretClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// All Secrets currently stored in `namespace`, ordered by name.
    pub async fn list(&self, namespace: &str) -> Vec<Secret> {
        self.secrets
            .lock()
            .await
            .iter()
            .filter(|((secret_namespace, _), _)| secret_namespace == namespace)
            .map(|(_, secret)| secret.clone())
            .collect()
    }

    /// Number of successful creates and data replacements so far.
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    fn next_revision(&self) -> String {
        (self.revision.fetch_add(1, Ordering::SeqCst) + 1).to_string()
    }
}

#[async_trait::async_trait]
impl SecretClient for InMemorySecretClient {
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>> {
        Ok(self
            .secrets
            .lock()
            .await
            .get(&(namespace.to_owned(), name.to_owned()))
            .cloned())
    }

    async fn create_secret(&self, secret: &Secret) -> Result<Secret> {
        let namespace = secret
            .metadata
            .namespace
            .clone()
            .context(MissingObjectKeySnafu { key: "namespace" })?;
        let name = secret
            .metadata
            .name
            .clone()
            .context(MissingObjectKeySnafu { key: "name" })?;

        let mut secrets = self.secrets.lock().await;
        let key = (namespace, name);
        if secrets.contains_key(&key) {
            let (namespace, name) = key;
            return AlreadyExistsSnafu { namespace, name }.fail();
        }

        let revision = self.next_revision();
        let mut created = secret.clone();
        created.metadata.uid = Some(format!("uid-{revision}"));
        created.metadata.resource_version = Some(revision);
        secrets.insert(key, created.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);

        Ok(created)
    }

    async fn replace_secret_data(
        &self,
        namespace: &str,
        name: &str,
        data: BTreeMap<String, ByteString>,
    ) -> Result<Secret> {
        let mut secrets = self.secrets.lock().await;
        let secret = secrets
            .get_mut(&(namespace.to_owned(), name.to_owned()))
            .context(NotFoundSnafu { namespace, name })?;

        secret.data = Some(data);
        secret.metadata.resource_version = Some(self.next_revision());
        self.writes.fetch_add(1, Ordering::SeqCst);

        Ok(secret.clone())
    }

    async fn delete_secret(&self, namespace: &str, name: &str) -> Result<bool> {
        Ok(self
            .secrets
            .lock()
            .await
            .remove(&(namespace.to_owned(), name.to_owned()))
            .is_some())
    }
}
