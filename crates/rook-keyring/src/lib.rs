//! Lifecycle of the Ceph keyrings a Rook cluster's daemons authenticate with.
//!
//! Keyrings are rendered per [`role::RoleIdentity`], persisted as Kubernetes
//! Secrets owned by the cluster resource and mounted into containers under a
//! path derived from the same identity. [`registry::KeyringRegistry`] is the
//! entry point for reconcilers.
pub mod builder;
pub mod cli;
pub mod client;
pub mod cluster;
pub mod constants;
pub mod keyring;
pub mod logging;
pub mod registry;
pub mod role;
pub mod store;
pub mod volume;

// External re-exports
pub use k8s_openapi;
pub use kube;
