//! Ceph daemon roles and the identities keyrings are issued for.
//!
//! Every role has one row in a static table ([`RoleSpec`]) describing its
//! principal and capability grants. A [`RoleIdentity`] pairs a role with an
//! optional instance id and is the single source all names are derived from:
//! the Secret name, the volume name, the mount directory and the file name.
//! None of these are ever stored separately.
use std::{fmt, str::FromStr, sync::LazyLock};

use regex::Regex;
use snafu::{ensure, OptionExt, Snafu};
use strum::{EnumIter, IntoEnumIterator};

use crate::constants::{
    ADMIN_KEYRING_FILE_NAME, KEYRING_FILE_EXTENSION, KEYRING_MOUNT_BASE_DIR,
    KEYRING_STORE_SUFFIX, RESOURCE_PREFIX, SECRET_NAME_SUFFIX,
};

type Result<T, E = Error> = std::result::Result<T, E>;

/// Maximum length of a DNS label (RFC 1123), which every volume name must be.
const RFC_1123_LABEL_MAX_LENGTH: usize = 63;
const RFC_1123_LABEL_FMT: &str = "[a-z0-9]([-a-z0-9]*[a-z0-9])?";

static RFC_1123_LABEL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("^{RFC_1123_LABEL_FMT}$")).expect("failed to compile RFC 1123 label regex")
});

#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum Error {
    #[snafu(display("unsupported keyring role {token:?}"))]
    UnsupportedRole { token: String },

    #[snafu(display("role {role} is instance scoped and requires an instance id"))]
    MissingInstance { role: Role },

    #[snafu(display("role {role} is cluster wide and does not accept instance id {instance:?}"))]
    UnexpectedInstance { role: Role, instance: String },

    #[snafu(display(
        "instance id {instance:?} for role {role} is invalid: it must consist of lowercase \
         alphanumeric characters or '-', start and end with an alphanumeric character, and be at \
         most {} characters long",
        max_instance_length(*role)
    ))]
    InvalidInstance { role: Role, instance: String },
}

/// Whether a role holds one keyring per cluster or one per daemon instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scope {
    ClusterWide,
    Instance,
}

/// The naming and template row of a [`Role`].
#[derive(Debug)]
pub struct RoleSpec {
    /// Principal of a cluster-wide role, or the prefix an instance id is
    /// appended to (separated by `.`).
    pub principal: &'static str,

    /// Capability grants in the order they are rendered.
    pub caps: &'static [(&'static str, &'static str)],

    pub scope: Scope,
}

static ADMIN: RoleSpec = RoleSpec {
    principal: "client.admin",
    caps: &[
        ("mds", "allow *"),
        ("mon", "allow *"),
        ("osd", "allow *"),
        ("mgr", "allow *"),
    ],
    scope: Scope::ClusterWide,
};

static MON: RoleSpec = RoleSpec {
    principal: "mon.",
    caps: &[("mon", "allow *")],
    scope: Scope::ClusterWide,
};

static OSD: RoleSpec = RoleSpec {
    principal: "osd",
    caps: &[
        ("mgr", "allow profile osd"),
        ("mon", "allow profile osd"),
        ("osd", "allow *"),
    ],
    scope: Scope::Instance,
};

static MDS: RoleSpec = RoleSpec {
    principal: "mds",
    caps: &[
        ("mds", "allow"),
        ("mon", "allow profile mds"),
        ("osd", "allow *"),
    ],
    scope: Scope::Instance,
};

static MGR: RoleSpec = RoleSpec {
    principal: "mgr",
    caps: &[
        ("mds", "allow *"),
        ("mon", "allow profile mgr"),
        ("osd", "allow *"),
    ],
    scope: Scope::Instance,
};

static RGW: RoleSpec = RoleSpec {
    principal: "client.rgw",
    caps: &[("mon", "allow rw"), ("osd", "allow rwx")],
    scope: Scope::Instance,
};

static CRASH: RoleSpec = RoleSpec {
    principal: "client.crash",
    caps: &[("mgr", "allow profile crash"), ("mon", "allow profile crash")],
    scope: Scope::ClusterWide,
};

/// A class of cluster participant that needs its own keyring.
///
/// The string form (see [`Role::token`]) is used in every derived name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter)]
pub enum Role {
    Admin,
    Mon,
    Osd,
    Mds,
    Mgr,
    Rgw,
    Crash,
}

impl Role {
    pub fn spec(self) -> &'static RoleSpec {
        match self {
            Self::Admin => &ADMIN,
            Self::Mon => &MON,
            Self::Osd => &OSD,
            Self::Mds => &MDS,
            Self::Mgr => &MGR,
            Self::Rgw => &RGW,
            Self::Crash => &CRASH,
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Mon => "mon",
            Self::Osd => "osd",
            Self::Mds => "mds",
            Self::Mgr => "mgr",
            Self::Rgw => "rgw",
            Self::Crash => "crash",
        }
    }

    pub fn scope(self) -> Scope {
        self.spec().scope
    }

    pub fn is_instance_scoped(self) -> bool {
        self.scope() == Scope::Instance
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(token: &str) -> Result<Self> {
        Self::iter()
            .find(|role| role.token() == token)
            .context(UnsupportedRoleSnafu { token })
    }
}

/// The identity a keyring is issued for.
///
/// Admin, mon and crash keyrings are shared by the whole cluster, all other
/// roles are issued per daemon instance (e.g. `osd.3`, `mgr.a`).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RoleIdentity {
    role: Role,
    instance: Option<String>,
}

impl RoleIdentity {
    pub fn admin() -> Self {
        Self {
            role: Role::Admin,
            instance: None,
        }
    }

    /// Identity of a cluster-wide role.
    pub fn cluster_wide(role: Role) -> Result<Self> {
        Self::new(role, None)
    }

    /// Identity of a single daemon of an instance-scoped role.
    pub fn instance(role: Role, instance: impl Into<String>) -> Result<Self> {
        Self::new(role, Some(instance.into()))
    }

    /// Validates that the presence of `instance` matches the role's scope.
    pub fn new(role: Role, instance: Option<String>) -> Result<Self> {
        match (role.scope(), instance) {
            (Scope::ClusterWide, None) => Ok(Self {
                role,
                instance: None,
            }),
            (Scope::ClusterWide, Some(instance)) => {
                UnexpectedInstanceSnafu { role, instance }.fail()
            }
            (Scope::Instance, None) => MissingInstanceSnafu { role }.fail(),
            (Scope::Instance, Some(instance)) => {
                ensure!(
                    is_valid_instance(role, &instance),
                    InvalidInstanceSnafu { role, instance }
                );
                Ok(Self {
                    role,
                    instance: Some(instance),
                })
            }
        }
    }

    /// Parses a role token and builds the identity in one go.
    pub fn parse(token: &str, instance: Option<String>) -> Result<Self> {
        Self::new(token.parse()?, instance)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn instance_id(&self) -> Option<&str> {
        self.instance.as_deref()
    }

    /// `<role>` or `<role>-<instance>`, the token every resource name is built from.
    pub fn resource_token(&self) -> String {
        match &self.instance {
            None => self.role.token().to_owned(),
            Some(instance) => format!("{}-{instance}", self.role.token()),
        }
    }

    /// The Ceph principal the keyring section is written for.
    pub fn principal(&self) -> String {
        let prefix = self.role.spec().principal;
        match &self.instance {
            None => prefix.to_owned(),
            Some(instance) => format!("{prefix}.{instance}"),
        }
    }

    /// Name of the Secret holding this identity's keyring.
    pub fn secret_name(&self) -> String {
        format!(
            "{RESOURCE_PREFIX}-{token}-{SECRET_NAME_SUFFIX}",
            token = self.resource_token()
        )
    }

    /// Name of the keyring file inside the mount directory.
    pub fn file_name(&self) -> String {
        match self.role {
            Role::Admin => ADMIN_KEYRING_FILE_NAME.to_owned(),
            _ => format!("{}.{KEYRING_FILE_EXTENSION}", self.resource_token()),
        }
    }

    /// Name shared by the volume and the volume mount.
    ///
    /// Always a valid DNS label, instance ids are limited accordingly.
    pub fn volume_name(&self) -> String {
        format!("{}-{KEYRING_STORE_SUFFIX}", self.resource_token())
    }

    pub fn mount_dir(&self) -> String {
        format!("{KEYRING_MOUNT_BASE_DIR}/{}/", self.volume_name())
    }
}

impl fmt::Display for RoleIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.instance {
            None => write!(f, "{}", self.role),
            Some(instance) => write!(f, "{}.{instance}", self.role),
        }
    }
}

/// The longest instance id of `role` whose volume name
/// `<role>-<instance>-keyring-store` still fits into a DNS label.
pub fn max_instance_length(role: Role) -> usize {
    RFC_1123_LABEL_MAX_LENGTH - role.token().len() - KEYRING_STORE_SUFFIX.len() - 2
}

fn is_valid_instance(role: Role, instance: &str) -> bool {
    instance.len() <= max_instance_length(role) && RFC_1123_LABEL_REGEX.is_match(instance)
}
