//! Naming constants shared by the secret store and the volume binder.
//!
//! Everything that ends up in a Secret name, a volume name or a path inside a
//! container is derived from these values together with a
//! [`RoleIdentity`](crate::role::RoleIdentity).

/// Prefix of every keyring Secret, e.g. `rook-ceph-admin-keyring`.
pub const RESOURCE_PREFIX: &str = "rook-ceph";

/// Suffix of every keyring Secret name.
pub const SECRET_NAME_SUFFIX: &str = "keyring";

/// Secret `type` tag carried by every keyring Secret, regardless of role.
pub const ROOK_SECRET_TYPE: &str = "kubernetes.io/rook";

/// The single data key of a keyring Secret.
pub const KEYRING_DATA_KEY: &str = "keyring";

/// File name of the admin keyring inside its mount directory.
pub const ADMIN_KEYRING_FILE_NAME: &str = "keyring";

/// Extension used for every non-admin keyring file.
pub const KEYRING_FILE_EXTENSION: &str = "keyring";

/// Base directory under which keyring volumes are mounted.
pub const KEYRING_MOUNT_BASE_DIR: &str = "/etc/ceph";

/// Suffix of the volume (and mount directory) holding a keyring.
pub const KEYRING_STORE_SUFFIX: &str = "keyring-store";

/// Field manager used for writes unless configured otherwise.
pub const DEFAULT_FIELD_MANAGER: &str = "rook-ceph-operator";

pub const LABEL_MANAGED_BY: &str = "app.kubernetes.io/managed-by";
pub const LABEL_COMPONENT: &str = "app.kubernetes.io/component";
pub const LABEL_KEYRING_ROLE: &str = "keyring.rook.io/role";
pub const LABEL_KEYRING_INSTANCE: &str = "keyring.rook.io/instance";

pub const COMPONENT_KEYRING: &str = "keyring";
