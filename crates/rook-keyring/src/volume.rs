//! Volumes and mounts exposing a keyring Secret inside a container.
//!
//! Everything here is derived from a [`RoleIdentity`] alone and performs no
//! I/O, so container specs can be assembled before the Secret exists.
use std::path::Path;

use k8s_openapi::api::core::v1::{Volume, VolumeMount};

use crate::{
    builder::volume::{SecretVolumeBuilder, VolumeMountBuilder},
    constants::KEYRING_DATA_KEY,
    role::RoleIdentity,
};

/// Keyrings are only readable by the daemon's user.
const KEYRING_FILE_MODE: i32 = 0o400;

/// The volume projecting the keyring data entry of the identity's Secret
/// to its file name.
pub fn volume(identity: &RoleIdentity) -> Volume {
    SecretVolumeBuilder::new(identity.volume_name(), identity.secret_name())
        .with_item(KEYRING_DATA_KEY, identity.file_name())
        .default_mode(KEYRING_FILE_MODE)
        .build()
}

/// The read-only mount of [`volume`], sharing its name.
pub fn volume_mount(identity: &RoleIdentity) -> VolumeMount {
    VolumeMountBuilder::new(identity.volume_name(), identity.mount_dir())
        .read_only(true)
        .build()
}

/// Absolute path of the keyring file inside a container that has
/// [`volume_mount`] attached, e.g. for passing `--keyring` to a daemon.
pub fn file_path(identity: &RoleIdentity) -> String {
    Path::new(&identity.mount_dir())
        .join(identity.file_name())
        .to_string_lossy()
        .into_owned()
}

pub fn admin_volume() -> Volume {
    volume(&RoleIdentity::admin())
}

pub fn admin_volume_mount() -> VolumeMount {
    volume_mount(&RoleIdentity::admin())
}

pub fn admin_keyring_file_path() -> String {
    file_path(&RoleIdentity::admin())
}
