//! Command line arguments of the `rook-keyring` binary.
//!
//! The argument groups are plain `clap` structs so operators embedding the
//! keyring store can flatten them into their own CLI.
use clap::{Args, Parser, Subcommand};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use snafu::{OptionExt, ResultExt, Snafu};

use crate::{
    builder::meta::{self, OwnerReferenceBuilder},
    constants::DEFAULT_FIELD_MANAGER,
    role::{self, RoleIdentity},
};

type Result<T, E = Error> = std::result::Result<T, E>;

pub const LOG_ENV: &str = "ROOK_KEYRING_LOG";
pub const APP_NAME: &str = "rook-keyring";

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("invalid keyring identity"))]
    Identity { source: role::Error },

    #[snafu(display("environment variable {variable:?} holding the Ceph secret is not set"))]
    MissingSecret { variable: String },

    #[snafu(display("invalid owner reference"))]
    Owner { source: meta::Error },
}

#[derive(Debug, PartialEq, Eq, Parser)]
#[command(name = APP_NAME, author, version, about = "Manage Rook Ceph keyring Secrets")]
pub struct Opts {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Print the keyring of an identity rendered with a given secret.
    Render(RenderArguments),

    /// Print the Secret name, volume name and in-container path of an identity's keyring.
    Paths(IdentityArguments),

    /// Create or update an identity's keyring Secret in the cluster.
    Apply(ApplyArguments),

    /// Print the principal stored in an identity's keyring Secret.
    Show(ShowArguments),
}

/// Selects the identity a keyring belongs to.
#[derive(Debug, PartialEq, Eq, Args)]
pub struct IdentityArguments {
    /// Role token, one of admin, mon, osd, mds, mgr, rgw, crash
    #[arg(long, short = 'r')]
    pub role: String,

    /// Instance id for instance scoped roles, e.g. `3` for osd.3
    #[arg(long, short = 'i')]
    pub instance: Option<String>,
}

impl IdentityArguments {
    pub fn identity(&self) -> Result<RoleIdentity> {
        RoleIdentity::parse(&self.role, self.instance.clone()).context(IdentitySnafu)
    }
}

/// Where the opaque Ceph secret is read from. It is never accepted as a
/// flag value to keep it out of process listings.
#[derive(Debug, PartialEq, Eq, Args)]
pub struct SecretArguments {
    /// Name of the environment variable holding the Ceph secret
    #[arg(long, default_value = "CEPH_SECRET")]
    pub secret_env: String,
}

impl SecretArguments {
    pub fn read_secret(&self) -> Result<String> {
        std::env::var(&self.secret_env)
            .ok()
            .context(MissingSecretSnafu {
                variable: &self.secret_env,
            })
    }
}

/// Options for the Kubernetes backed secret client.
#[derive(Debug, PartialEq, Eq, Args)]
pub struct KeyringClientOptions {
    /// Field manager recorded for every write
    #[arg(long, env, default_value = DEFAULT_FIELD_MANAGER)]
    pub field_manager: String,

    /// Namespace the keyring Secrets live in
    #[arg(long, short = 'n', env = "ROOK_NAMESPACE", default_value = "rook-ceph")]
    pub namespace: String,
}

/// The resource keyring Secrets are garbage collected with.
#[derive(Debug, PartialEq, Eq, Args)]
pub struct OwnerArguments {
    #[arg(long, default_value = "ceph.rook.io/v1")]
    pub owner_api_version: String,

    #[arg(long, default_value = "CephCluster")]
    pub owner_kind: String,

    #[arg(long)]
    pub owner_name: String,

    #[arg(long)]
    pub owner_uid: String,
}

impl OwnerArguments {
    pub fn owner_reference(&self) -> Result<OwnerReference> {
        OwnerReferenceBuilder::new()
            .api_version(&self.owner_api_version)
            .kind(&self.owner_kind)
            .name(&self.owner_name)
            .uid(&self.owner_uid)
            .block_owner_deletion(true)
            .controller(true)
            .build()
            .context(OwnerSnafu)
    }
}

#[derive(Debug, PartialEq, Eq, Args)]
pub struct RenderArguments {
    #[command(flatten)]
    pub identity: IdentityArguments,

    #[command(flatten)]
    pub secret: SecretArguments,
}

#[derive(Debug, PartialEq, Eq, Args)]
pub struct ApplyArguments {
    #[command(flatten)]
    pub identity: IdentityArguments,

    #[command(flatten)]
    pub secret: SecretArguments,

    #[command(flatten)]
    pub owner: OwnerArguments,

    #[command(flatten)]
    pub client: KeyringClientOptions,
}

#[derive(Debug, PartialEq, Eq, Args)]
pub struct ShowArguments {
    #[command(flatten)]
    pub identity: IdentityArguments,

    #[command(flatten)]
    pub client: KeyringClientOptions,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::role::Role;

    #[test]
    fn parse_render() {
        let opts = Opts::parse_from(["rook-keyring", "render", "--role", "osd", "-i", "3"]);

        assert_eq!(
            opts.command,
            Command::Render(RenderArguments {
                identity: IdentityArguments {
                    role: "osd".to_owned(),
                    instance: Some("3".to_owned()),
                },
                secret: SecretArguments {
                    secret_env: "CEPH_SECRET".to_owned(),
                },
            })
        );
    }

    #[test]
    fn parse_apply() {
        let opts = Opts::parse_from([
            "rook-keyring",
            "apply",
            "--role",
            "admin",
            "--owner-name",
            "my-cluster",
            "--owner-uid",
            "1234",
            "--namespace",
            "test-ns",
        ]);

        let owner = match &opts.command {
            Command::Apply(args) => {
                assert_eq!(args.client.namespace, "test-ns");
                args.owner.owner_reference().unwrap()
            }
            other => unreachable!("parsed unexpected command {other:?}"),
        };
        assert_eq!(owner.kind, "CephCluster");
        assert_eq!(owner.name, "my-cluster");
        assert_eq!(owner.controller, Some(true));
    }

    #[test]
    fn unsupported_role() {
        let args = IdentityArguments {
            role: "nfs".to_owned(),
            instance: None,
        };

        assert!(matches!(
            args.identity(),
            Err(Error::Identity {
                source: role::Error::UnsupportedRole { .. }
            })
        ));
    }

    #[test]
    fn identity_from_arguments() {
        let args = IdentityArguments {
            role: "mgr".to_owned(),
            instance: Some("b".to_owned()),
        };

        assert_eq!(
            args.identity().unwrap(),
            RoleIdentity::instance(Role::Mgr, "b").unwrap()
        );
    }

    #[test]
    fn missing_secret_variable() {
        let args = SecretArguments {
            secret_env: "ROOK_KEYRING_TEST_UNSET_VARIABLE".to_owned(),
        };

        assert!(matches!(
            args.read_secret(),
            Err(Error::MissingSecret { .. })
        ));
    }
}
