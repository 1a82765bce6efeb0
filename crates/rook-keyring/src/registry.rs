//! One uniform handle per keyring identity.
//!
//! ```no_run
//! # async fn reconcile(client: kube::Client, owner: k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference) -> Result<(), rook_keyring::registry::Error> {
//! use rook_keyring::{client::KubeSecretClient, cluster::ClusterInfo, registry::KeyringRegistry};
//!
//! let cluster_info = ClusterInfo::new("rook-ceph").with_secret("AQBbz0ZeAAAAABAAqlv/5ZMwWt3Rgdd+mAwZxw==");
//! let keyrings = KeyringRegistry::new(KubeSecretClient::new(client, None), &cluster_info, owner);
//!
//! keyrings.admin().create_or_update(&cluster_info).await?;
//! let mount = keyrings.admin().volume_mount();
//! # Ok(())
//! # }
//! ```
use k8s_openapi::{
    api::core::v1::{Secret, Volume, VolumeMount},
    apimachinery::pkg::apis::meta::v1::OwnerReference,
};
use kube::Resource;
use snafu::{ResultExt, Snafu};

use crate::{
    builder::meta::{self, OwnerReferenceBuilder},
    client::SecretClient,
    cluster::ClusterInfo,
    keyring, role,
    role::RoleIdentity,
    store::{self, KeyringStore, Outcome},
    volume,
};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("invalid keyring identity"))]
    Role { source: role::Error },

    #[snafu(display("failed to render the {identity} keyring"))]
    Render {
        source: keyring::Error,
        identity: String,
    },

    #[snafu(display("failed to store the {identity} keyring"))]
    Store {
        source: store::Error,
        identity: String,
    },

    #[snafu(display("failed to build the owner reference for keyring Secrets"))]
    OwnerReference { source: meta::Error },
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Store { source, .. } if source.is_not_found())
    }

    /// Whether the calling reconciliation should be retried later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store { source, .. } if source.is_retryable())
    }
}

/// Hands out a [`KeyringHandle`] for every identity of one cluster.
///
/// The registry owns the store client, so nothing is shared between clusters.
pub struct KeyringRegistry<C> {
    store: KeyringStore<C>,
}

impl<C: SecretClient> KeyringRegistry<C> {
    pub fn new(client: C, cluster_info: &ClusterInfo, owner: OwnerReference) -> Self {
        Self {
            store: KeyringStore::new(client, &cluster_info.namespace, owner),
        }
    }

    /// Like [`Self::new`], with the owner reference pointing at `owner`
    /// (usually the `CephCluster`). The reference blocks owner deletion until
    /// the Secrets are garbage collected.
    pub fn from_owner_resource<T: Resource<DynamicType = ()>>(
        client: C,
        cluster_info: &ClusterInfo,
        owner: &T,
    ) -> Result<Self> {
        let owner = OwnerReferenceBuilder::new()
            .initialize_from_resource(owner)
            .block_owner_deletion(true)
            .controller(true)
            .build()
            .context(OwnerReferenceSnafu)?;
        Ok(Self::new(client, cluster_info, owner))
    }

    pub fn get(&self, identity: RoleIdentity) -> KeyringHandle<'_, C> {
        KeyringHandle {
            identity,
            store: &self.store,
        }
    }

    pub fn admin(&self) -> KeyringHandle<'_, C> {
        self.get(RoleIdentity::admin())
    }

    /// Looks up a handle by role token, e.g. from a daemon type string.
    pub fn role(&self, token: &str, instance: Option<String>) -> Result<KeyringHandle<'_, C>> {
        let identity = RoleIdentity::parse(token, instance).context(RoleSnafu)?;
        Ok(self.get(identity))
    }

    pub fn store(&self) -> &KeyringStore<C> {
        &self.store
    }
}

/// The lifecycle of one identity's keyring: storing it and exposing it to
/// containers.
pub struct KeyringHandle<'a, C> {
    identity: RoleIdentity,
    store: &'a KeyringStore<C>,
}

impl<C: SecretClient> KeyringHandle<'_, C> {
    pub fn identity(&self) -> &RoleIdentity {
        &self.identity
    }

    /// Renders the keyring with the cluster's current admin credential and
    /// stores it.
    ///
    /// This is the entry point for the cluster-wide keyrings. Instance
    /// scoped daemons receive their own key, see
    /// [`Self::create_or_update_with_key`].
    pub async fn create_or_update(&self, cluster_info: &ClusterInfo) -> Result<Outcome> {
        self.create_or_update_with_key(&cluster_info.ceph_cred.secret)
            .await
    }

    pub async fn create_or_update_with_key(&self, secret: &str) -> Result<Outcome> {
        let rendered = keyring::render(&self.identity, secret).with_context(|_| RenderSnafu {
            identity: self.identity.to_string(),
        })?;
        self.store
            .create_or_update(&self.identity, &rendered)
            .await
            .with_context(|_| StoreSnafu {
                identity: self.identity.to_string(),
            })
    }

    pub async fn get(&self) -> Result<Secret> {
        self.store
            .get(&self.identity)
            .await
            .with_context(|_| StoreSnafu {
                identity: self.identity.to_string(),
            })
    }

    /// The stored keyring text.
    pub async fn keyring(&self) -> Result<String> {
        self.store
            .keyring(&self.identity)
            .await
            .with_context(|_| StoreSnafu {
                identity: self.identity.to_string(),
            })
    }

    pub async fn delete(&self) -> Result<bool> {
        self.store
            .delete(&self.identity)
            .await
            .with_context(|_| StoreSnafu {
                identity: self.identity.to_string(),
            })
    }

    pub fn volume(&self) -> Volume {
        volume::volume(&self.identity)
    }

    pub fn volume_mount(&self) -> VolumeMount {
        volume::volume_mount(&self.identity)
    }

    pub fn file_path(&self) -> String {
        volume::file_path(&self.identity)
    }
}

#[cfg(test)]
mod tests {
    use k8s_openapi::api::core::v1::ConfigMap;

    use super::*;
    use crate::{client::InMemorySecretClient, role::Role};

    fn owner_config_map(uid: Option<&str>) -> ConfigMap {
        serde_yaml::from_str(&format!(
            "
            apiVersion: v1
            kind: ConfigMap
            metadata:
              name: rook-ceph
              namespace: rook-ceph
              {uid}
            ",
            uid = uid.map(|uid| format!("uid: {uid}")).unwrap_or_default()
        ))
        .unwrap()
    }

    #[test]
    fn owner_reference_from_resource() {
        let registry = KeyringRegistry::from_owner_resource(
            InMemorySecretClient::new(),
            &ClusterInfo::new("rook-ceph"),
            &owner_config_map(Some("12345")),
        );

        assert!(registry.is_ok());
    }

    #[test]
    fn owner_reference_needs_uid() {
        let registry = KeyringRegistry::from_owner_resource(
            InMemorySecretClient::new(),
            &ClusterInfo::new("rook-ceph"),
            &owner_config_map(None),
        );

        assert!(matches!(registry, Err(Error::OwnerReference { .. })));
    }

    #[test]
    fn role_lookup_by_token() {
        let registry = KeyringRegistry::new(
            InMemorySecretClient::new(),
            &ClusterInfo::new("rook-ceph"),
            OwnerReference::default(),
        );

        let handle = registry.role("osd", Some("4".to_owned())).unwrap();
        assert_eq!(
            handle.identity(),
            &RoleIdentity::instance(Role::Osd, "4").unwrap()
        );

        assert!(matches!(
            registry.role("nfs", None),
            Err(Error::Role {
                source: role::Error::UnsupportedRole { .. }
            })
        ));
    }

    #[tokio::test]
    async fn empty_credential_is_a_render_error() {
        let registry = KeyringRegistry::new(
            InMemorySecretClient::new(),
            &ClusterInfo::new("rook-ceph"),
            OwnerReference::default(),
        );

        let error = registry
            .admin()
            .create_or_update(&ClusterInfo::new("rook-ceph"))
            .await
            .unwrap_err();

        assert!(matches!(error, Error::Render { .. }));
        assert!(!error.is_retryable());
        assert!(registry.store().client().list("rook-ceph").await.is_empty());
    }
}
