use k8s_openapi::api::core::v1::{KeyToPath, SecretVolumeSource, Volume, VolumeMount};

/// A builder to build [`Volume`] objects backed by a Secret.
#[derive(Clone, Default)]
pub struct SecretVolumeBuilder {
    name: String,
    secret_name: String,
    items: Vec<KeyToPath>,
    default_mode: Option<i32>,
}

impl SecretVolumeBuilder {
    pub fn new(name: impl Into<String>, secret_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            secret_name: secret_name.into(),
            ..Self::default()
        }
    }

    /// Projects the Secret data entry `key` to the file `path` inside the volume.
    /// Once any item is set, only the listed keys are projected.
    pub fn with_item(&mut self, key: impl Into<String>, path: impl Into<String>) -> &mut Self {
        self.items.push(KeyToPath {
            key: key.into(),
            path: path.into(),
            mode: None,
        });
        self
    }

    pub fn default_mode(&mut self, default_mode: i32) -> &mut Self {
        self.default_mode = Some(default_mode);
        self
    }

    /// Consumes the Builder and returns a constructed Volume
    pub fn build(&self) -> Volume {
        Volume {
            name: self.name.clone(),
            secret: Some(SecretVolumeSource {
                secret_name: Some(self.secret_name.clone()),
                items: (!self.items.is_empty()).then(|| self.items.clone()),
                default_mode: self.default_mode,
                ..SecretVolumeSource::default()
            }),
            ..Volume::default()
        }
    }
}

/// A builder to build [`VolumeMount`] objects.
#[derive(Clone, Default)]
pub struct VolumeMountBuilder {
    mount_path: String,
    name: String,
    read_only: Option<bool>,
}

impl VolumeMountBuilder {
    pub fn new(name: impl Into<String>, mount_path: impl Into<String>) -> Self {
        Self {
            mount_path: mount_path.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn read_only(&mut self, read_only: bool) -> &mut Self {
        self.read_only = Some(read_only);
        self
    }

    /// Consumes the Builder and returns a constructed VolumeMount
    pub fn build(&self) -> VolumeMount {
        VolumeMount {
            mount_path: self.mount_path.clone(),
            name: self.name.clone(),
            read_only: self.read_only,
            ..VolumeMount::default()
        }
    }
}
