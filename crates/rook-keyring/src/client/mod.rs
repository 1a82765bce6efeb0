//! Access to the Secrets keyrings are persisted in.
//!
//! [`SecretClient`] is the seam between the keyring store and the platform.
//! [`KubeSecretClient`] talks to a Kubernetes API server,
//! [`InMemorySecretClient`] keeps everything in process and is meant for tests.
use std::collections::BTreeMap;

use k8s_openapi::{api::core::v1::Secret, ByteString};
use snafu::Snafu;

mod k8s;
mod memory;

pub use self::{k8s::KubeSecretClient, memory::InMemorySecretClient};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("Secret {namespace}/{name} already exists"))]
    AlreadyExists { namespace: String, name: String },

    #[snafu(display("Secret {namespace}/{name} does not exist"))]
    NotFound { namespace: String, name: String },

    #[snafu(display("failed to {operation} Secret {namespace}/{name}"))]
    Kube {
        source: kube::Error,
        operation: &'static str,
        namespace: String,
        name: String,
    },

    #[snafu(display("failed to build the data patch for Secret {namespace}/{name}"))]
    SerializePatch {
        source: serde_json::Error,
        namespace: String,
        name: String,
    },

    #[snafu(display("Secret is missing key {key:?}"))]
    MissingObjectKey { key: &'static str },
}

impl Error {
    /// Whether retrying may succeed: transport and availability problems, and
    /// conflicts with a concurrent writer.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Kube { .. } | Self::AlreadyExists { .. } | Self::NotFound { .. }
        )
    }
}

/// CRUD operations on namespaced Secrets, reduced to what the keyring
/// lifecycle needs.
///
/// Implementations must make every write atomic: a concurrent reader sees a
/// Secret either before or after a call, never a mix of both.
#[async_trait::async_trait]
pub trait SecretClient: Send + Sync {
    /// Returns `None` if no Secret with that name exists.
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>>;

    /// Creates the Secret in the namespace set in its metadata.
    /// Fails with [`Error::AlreadyExists`] on a name clash.
    async fn create_secret(&self, secret: &Secret) -> Result<Secret>;

    /// Replaces the complete `data` map of an existing Secret, leaving every
    /// other field as it is. Fails with [`Error::NotFound`] if it is absent.
    async fn replace_secret_data(
        &self,
        namespace: &str,
        name: &str,
        data: BTreeMap<String, ByteString>,
    ) -> Result<Secret>;

    /// Returns `false` if there was nothing to delete.
    async fn delete_secret(&self, namespace: &str, name: &str) -> Result<bool>;
}
