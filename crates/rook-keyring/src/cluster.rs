//! Connection details of the Ceph cluster a keyring is issued for.

/// Credentials of the cluster's admin principal, as handed out by the
/// credential authority. The secret is opaque to this crate.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CephCred {
    pub username: String,
    pub secret: String,
}

// The secret must never end up in logs.
impl std::fmt::Debug for CephCred {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CephCred")
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Per-call view of the cluster: where its resources live and which admin
/// credential is current.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClusterInfo {
    /// Namespace the cluster's Secrets are written to.
    pub namespace: String,

    /// Name of the owning `CephCluster` resource.
    pub name: String,

    pub fsid: String,

    pub ceph_cred: CephCred,
}

impl ClusterInfo {
    pub fn new(namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        Self {
            name: namespace.clone(),
            namespace,
            fsid: String::new(),
            ceph_cred: CephCred {
                username: "client.admin".to_owned(),
                secret: String::new(),
            },
        }
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.ceph_cred.secret = secret.into();
        self
    }
}
