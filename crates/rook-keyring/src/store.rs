//! Persistence of rendered keyrings as Secrets.
//!
//! A [`KeyringStore`] is scoped to one namespace and one owner. It creates the
//! Secret of an identity on first use and afterwards only ever replaces its
//! data, so owner references, labels and the type tag set at creation stay
//! untouched.
use std::collections::BTreeMap;

use k8s_openapi::{
    api::core::v1::Secret, apimachinery::pkg::apis::meta::v1::OwnerReference, ByteString,
};
use snafu::{OptionExt, ResultExt, Snafu};
use tracing::{debug, instrument};

use crate::{
    builder::meta::ObjectMetaBuilder,
    client::{self, SecretClient},
    constants::{KEYRING_DATA_KEY, ROOK_SECRET_TYPE},
    role::RoleIdentity,
};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("keyring Secret {namespace}/{name} does not exist"))]
    NotFound { namespace: String, name: String },

    #[snafu(display("failed to access keyring Secret {namespace}/{name}"))]
    StoreIo {
        source: client::Error,
        namespace: String,
        name: String,
    },

    #[snafu(display("keyring Secret {namespace}/{name} has no readable \"keyring\" entry"))]
    MissingKeyringData { namespace: String, name: String },
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether retrying the same call later may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::StoreIo { source, .. } => source.is_retryable(),
            Self::NotFound { .. } | Self::MissingKeyringData { .. } => false,
        }
    }
}

/// What [`KeyringStore::create_or_update`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Created,
    Updated,
    Unchanged,
}

/// Create-or-update, get and delete of keyring Secrets in one namespace.
pub struct KeyringStore<C> {
    client: C,
    namespace: String,
    owner: OwnerReference,
}

impl<C: SecretClient> KeyringStore<C> {
    pub fn new(client: C, namespace: impl Into<String>, owner: OwnerReference) -> Self {
        Self {
            client,
            namespace: namespace.into(),
            owner,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Stores `keyring` as the only data entry of the identity's Secret.
    ///
    /// Creates the Secret (with owner reference, labels and type tag) if it
    /// does not exist yet. An existing Secret only gets its data replaced,
    /// and not even that if it already holds exactly `keyring`. A create that
    /// loses a race against a concurrent caller falls back to the update, an
    /// update of a Secret deleted in the meantime falls back to a create.
    #[instrument(
        skip(self, keyring),
        fields(k8s.secret.namespace = %self.namespace, keyring.identity = %identity)
    )]
    pub async fn create_or_update(
        &self,
        identity: &RoleIdentity,
        keyring: &str,
    ) -> Result<Outcome> {
        match self.fetch(&identity.secret_name()).await? {
            Some(existing) => self.update(identity, &existing, keyring).await,
            None => self.create(identity, keyring).await,
        }
    }

    /// Returns the identity's Secret, or [`Error::NotFound`] if there is none.
    pub async fn get(&self, identity: &RoleIdentity) -> Result<Secret> {
        let name = identity.secret_name();
        self.fetch(&name).await?.context(NotFoundSnafu {
            namespace: &self.namespace,
            name,
        })
    }

    /// Returns the keyring text stored for the identity.
    pub async fn keyring(&self, identity: &RoleIdentity) -> Result<String> {
        let secret = self.get(identity).await?;
        keyring_data(&secret).context(MissingKeyringDataSnafu {
            namespace: &self.namespace,
            name: identity.secret_name(),
        })
    }

    /// Deletes the identity's Secret. Returns `false` if it did not exist.
    #[instrument(
        skip(self),
        fields(k8s.secret.namespace = %self.namespace, keyring.identity = %identity)
    )]
    pub async fn delete(&self, identity: &RoleIdentity) -> Result<bool> {
        let name = identity.secret_name();
        let deleted = self
            .client
            .delete_secret(&self.namespace, &name)
            .await
            .context(StoreIoSnafu {
                namespace: &self.namespace,
                name: &name,
            })?;
        debug!(k8s.secret.name = %name, deleted, "deleted keyring secret");
        Ok(deleted)
    }

    async fn fetch(&self, name: &str) -> Result<Option<Secret>> {
        self.client
            .get_secret(&self.namespace, name)
            .await
            .context(StoreIoSnafu {
                namespace: &self.namespace,
                name,
            })
    }

    async fn create(&self, identity: &RoleIdentity, keyring: &str) -> Result<Outcome> {
        let name = identity.secret_name();

        match self.client.create_secret(&self.build_secret(identity, keyring)).await {
            Ok(_) => {
                debug!(k8s.secret.name = %name, "created keyring secret");
                Ok(Outcome::Created)
            }
            Err(client::Error::AlreadyExists { .. }) => {
                debug!(
                    k8s.secret.name = %name,
                    "keyring secret was created concurrently, updating it instead"
                );
                let existing = self.fetch(&name).await?.context(NotFoundSnafu {
                    namespace: &self.namespace,
                    name: &name,
                })?;
                self.update(identity, &existing, keyring).await
            }
            Err(source) => Err(source).context(StoreIoSnafu {
                namespace: &self.namespace,
                name,
            }),
        }
    }

    async fn update(
        &self,
        identity: &RoleIdentity,
        existing: &Secret,
        keyring: &str,
    ) -> Result<Outcome> {
        let name = identity.secret_name();

        let has_only_keyring = existing.data.as_ref().is_some_and(|data| data.len() == 1);
        if has_only_keyring && keyring_data(existing).as_deref() == Some(keyring) {
            debug!(k8s.secret.name = %name, "keyring secret is up to date");
            return Ok(Outcome::Unchanged);
        }

        match self
            .client
            .replace_secret_data(&self.namespace, &name, keyring_data_map(keyring))
            .await
        {
            Ok(_) => {
                debug!(k8s.secret.name = %name, "updated keyring secret");
                Ok(Outcome::Updated)
            }
            // Deleted since it was read. Recreating it does not fall back to
            // another update, a second race is left to the caller's retry.
            Err(client::Error::NotFound { .. }) => {
                debug!(
                    k8s.secret.name = %name,
                    "keyring secret was deleted concurrently, recreating it"
                );
                self.client
                    .create_secret(&self.build_secret(identity, keyring))
                    .await
                    .context(StoreIoSnafu {
                        namespace: &self.namespace,
                        name: &name,
                    })?;
                Ok(Outcome::Created)
            }
            Err(source) => Err(source).context(StoreIoSnafu {
                namespace: &self.namespace,
                name,
            }),
        }
    }

    fn build_secret(&self, identity: &RoleIdentity, keyring: &str) -> Secret {
        Secret {
            metadata: ObjectMetaBuilder::new()
                .name(identity.secret_name())
                .namespace(&self.namespace)
                .ownerreference(self.owner.clone())
                .with_keyring_labels(identity)
                .build(),
            type_: Some(ROOK_SECRET_TYPE.to_owned()),
            data: Some(keyring_data_map(keyring)),
            ..Secret::default()
        }
    }
}

/// The keyring text of a Secret, if it has a UTF-8 `keyring` entry.
pub fn keyring_data(secret: &Secret) -> Option<String> {
    let ByteString(bytes) = secret.data.as_ref()?.get(KEYRING_DATA_KEY)?;
    String::from_utf8(bytes.clone()).ok()
}

fn keyring_data_map(keyring: &str) -> BTreeMap<String, ByteString> {
    BTreeMap::from([(
        KEYRING_DATA_KEY.to_owned(),
        ByteString(keyring.as_bytes().to_vec()),
    )])
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    use super::*;
    use crate::{client::InMemorySecretClient, role::Role};

    /// Misses the Secret on the next read only, like a caller that lost the
    /// race against a concurrent create.
    #[derive(Default)]
    struct StaleReadClient {
        inner: InMemorySecretClient,
        stale: AtomicBool,
    }

    #[async_trait::async_trait]
    impl SecretClient for StaleReadClient {
        async fn get_secret(
            &self,
            namespace: &str,
            name: &str,
        ) -> client::Result<Option<Secret>> {
            if self.stale.swap(false, Ordering::SeqCst) {
                return Ok(None);
            }
            self.inner.get_secret(namespace, name).await
        }

        async fn create_secret(&self, secret: &Secret) -> client::Result<Secret> {
            self.inner.create_secret(secret).await
        }

        async fn replace_secret_data(
            &self,
            namespace: &str,
            name: &str,
            data: BTreeMap<String, ByteString>,
        ) -> client::Result<Secret> {
            self.inner.replace_secret_data(namespace, name, data).await
        }

        async fn delete_secret(&self, namespace: &str, name: &str) -> client::Result<bool> {
            self.inner.delete_secret(namespace, name).await
        }
    }

    /// Loses the Secret right before its data is replaced, like an owner
    /// being garbage collected mid update.
    #[derive(Default)]
    struct DeletingClient {
        inner: InMemorySecretClient,
    }

    #[async_trait::async_trait]
    impl SecretClient for DeletingClient {
        async fn get_secret(
            &self,
            namespace: &str,
            name: &str,
        ) -> client::Result<Option<Secret>> {
            self.inner.get_secret(namespace, name).await
        }

        async fn create_secret(&self, secret: &Secret) -> client::Result<Secret> {
            self.inner.create_secret(secret).await
        }

        async fn replace_secret_data(
            &self,
            namespace: &str,
            name: &str,
            data: BTreeMap<String, ByteString>,
        ) -> client::Result<Secret> {
            self.inner.delete_secret(namespace, name).await?;
            self.inner.replace_secret_data(namespace, name, data).await
        }

        async fn delete_secret(&self, namespace: &str, name: &str) -> client::Result<bool> {
            self.inner.delete_secret(namespace, name).await
        }
    }

    const NAMESPACE: &str = "rook-ceph";

    fn owner() -> OwnerReference {
        OwnerReference {
            api_version: "ceph.rook.io/v1".to_owned(),
            kind: "CephCluster".to_owned(),
            name: "rook-ceph".to_owned(),
            uid: "c0ffee".to_owned(),
            ..OwnerReference::default()
        }
    }

    fn store() -> KeyringStore<InMemorySecretClient> {
        KeyringStore::new(InMemorySecretClient::new(), NAMESPACE, owner())
    }

    #[tokio::test]
    async fn create_sets_metadata_once() {
        let store = store();
        let osd = RoleIdentity::instance(Role::Osd, "1").unwrap();

        assert_eq!(
            store.create_or_update(&osd, "first").await.unwrap(),
            Outcome::Created
        );
        assert_eq!(
            store.create_or_update(&osd, "second").await.unwrap(),
            Outcome::Updated
        );

        let secret = store.get(&osd).await.unwrap();
        assert_eq!(secret.metadata.name.as_deref(), Some("rook-ceph-osd-1-keyring"));
        assert_eq!(secret.metadata.namespace.as_deref(), Some(NAMESPACE));
        assert_eq!(secret.metadata.owner_references, Some(vec![owner()]));
        assert_eq!(secret.type_.as_deref(), Some(ROOK_SECRET_TYPE));
        assert_eq!(keyring_data(&secret).as_deref(), Some("second"));
        assert_eq!(store.client().list(NAMESPACE).await.len(), 1);
    }

    #[tokio::test]
    async fn identical_keyring_is_not_rewritten() {
        let store = store();
        let admin = RoleIdentity::admin();

        store.create_or_update(&admin, "same").await.unwrap();
        assert_eq!(
            store.create_or_update(&admin, "same").await.unwrap(),
            Outcome::Unchanged
        );
        assert_eq!(store.client().writes(), 1);
    }

    #[tokio::test]
    async fn stray_data_keys_are_dropped_on_update() {
        let store = store();
        let admin = RoleIdentity::admin();
        let mut data = keyring_data_map("same");
        data.insert("stray".to_owned(), ByteString(b"x".to_vec()));
        store
            .client()
            .create_secret(&Secret {
                metadata: ObjectMeta {
                    name: Some(admin.secret_name()),
                    namespace: Some(NAMESPACE.to_owned()),
                    ..ObjectMeta::default()
                },
                data: Some(data),
                ..Secret::default()
            })
            .await
            .unwrap();

        assert_eq!(
            store.create_or_update(&admin, "same").await.unwrap(),
            Outcome::Updated
        );
        let secret = store.get(&admin).await.unwrap();
        assert_eq!(secret.data.map(|data| data.len()), Some(1));
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let store = store();
        let error = store.get(&RoleIdentity::admin()).await.unwrap_err();

        assert!(error.is_not_found());
        assert!(!error.is_retryable());
    }

    #[tokio::test]
    async fn keyring_without_data_entry() {
        let store = store();
        let admin = RoleIdentity::admin();
        store
            .client()
            .create_secret(&Secret {
                metadata: ObjectMeta {
                    name: Some(admin.secret_name()),
                    namespace: Some(NAMESPACE.to_owned()),
                    ..ObjectMeta::default()
                },
                ..Secret::default()
            })
            .await
            .unwrap();

        assert!(matches!(
            store.keyring(&admin).await,
            Err(Error::MissingKeyringData { .. })
        ));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = store();
        let mgr = RoleIdentity::instance(Role::Mgr, "a").unwrap();
        store.create_or_update(&mgr, "key").await.unwrap();

        assert!(store.delete(&mgr).await.unwrap());
        assert!(!store.delete(&mgr).await.unwrap());
        assert!(store.get(&mgr).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn lost_create_race_updates_instead() {
        let store = KeyringStore::new(StaleReadClient::default(), NAMESPACE, owner());
        let admin = RoleIdentity::admin();
        store.create_or_update(&admin, "old").await.unwrap();
        let created = store.get(&admin).await.unwrap();

        store.client().stale.store(true, Ordering::SeqCst);
        assert_eq!(
            store.create_or_update(&admin, "new").await.unwrap(),
            Outcome::Updated
        );

        let secrets = store.client().inner.list(NAMESPACE).await;
        assert_eq!(secrets.len(), 1);
        assert_eq!(keyring_data(&secrets[0]).as_deref(), Some("new"));
        assert_eq!(secrets[0].metadata.uid, created.metadata.uid);
    }

    #[tokio::test]
    async fn secret_deleted_during_update_is_recreated() {
        let store = KeyringStore::new(DeletingClient::default(), NAMESPACE, owner());
        let osd = RoleIdentity::instance(Role::Osd, "5").unwrap();
        store.create_or_update(&osd, "old").await.unwrap();

        assert_eq!(
            store.create_or_update(&osd, "new").await.unwrap(),
            Outcome::Created
        );

        let secret = store.get(&osd).await.unwrap();
        assert_eq!(keyring_data(&secret).as_deref(), Some("new"));
        assert_eq!(secret.metadata.owner_references, Some(vec![owner()]));
        assert_eq!(secret.type_.as_deref(), Some(ROOK_SECRET_TYPE));
        assert_eq!(store.client().inner.list(NAMESPACE).await.len(), 1);
    }
}
