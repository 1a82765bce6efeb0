use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::{Resource, ResourceExt};
use snafu::{OptionExt, Snafu};

use crate::{
    constants::{
        COMPONENT_KEYRING, DEFAULT_FIELD_MANAGER, LABEL_COMPONENT, LABEL_KEYRING_INSTANCE,
        LABEL_KEYRING_ROLE, LABEL_MANAGED_BY,
    },
    role::RoleIdentity,
};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum Error {
    #[snafu(display("owner reference is missing key {key:?}"))]
    MissingObjectKey { key: &'static str },
}

/// A builder to build [`ObjectMeta`] objects for keyring Secrets.
///
/// Note: This builder only supports a single `OwnerReference`.
#[derive(Clone, Default)]
pub struct ObjectMetaBuilder {
    name: Option<String>,
    namespace: Option<String>,
    ownerreference: Option<OwnerReference>,
    labels: Option<BTreeMap<String, String>>,
}

impl ObjectMetaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = Some(name.into());
        self
    }

    pub fn namespace(&mut self, namespace: impl Into<String>) -> &mut Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn ownerreference(&mut self, ownerreference: OwnerReference) -> &mut Self {
        self.ownerreference = Some(ownerreference);
        self
    }

    /// This adds a single label to the existing labels.
    /// It'll override a label with the same key.
    pub fn with_label(
        &mut self,
        label_key: impl Into<String>,
        label_value: impl Into<String>,
    ) -> &mut Self {
        self.labels
            .get_or_insert_with(BTreeMap::new)
            .insert(label_key.into(), label_value.into());
        self
    }

    /// Sets the labels every keyring Secret carries so they can be selected
    /// per role and instance.
    pub fn with_keyring_labels(&mut self, identity: &RoleIdentity) -> &mut Self {
        self.with_label(LABEL_MANAGED_BY, DEFAULT_FIELD_MANAGER)
            .with_label(LABEL_COMPONENT, COMPONENT_KEYRING)
            .with_label(LABEL_KEYRING_ROLE, identity.role().token());
        if let Some(instance) = identity.instance_id() {
            self.with_label(LABEL_KEYRING_INSTANCE, instance);
        }
        self
    }

    pub fn build(&self) -> ObjectMeta {
        ObjectMeta {
            name: self.name.clone(),
            namespace: self.namespace.clone(),
            owner_references: self
                .ownerreference
                .as_ref()
                .map(|ownerreference| vec![ownerreference.clone()]),
            labels: self.labels.clone(),
            ..ObjectMeta::default()
        }
    }
}

/// A builder to build [`OwnerReference`] objects.
///
/// Of special interest is the [`Self::initialize_from_resource()`] function.
#[derive(Clone, Default)]
pub struct OwnerReferenceBuilder {
    api_version: Option<String>,
    block_owner_deletion: Option<bool>,
    controller: Option<bool>,
    kind: Option<String>,
    name: Option<String>,
    uid: Option<String>,
}

impl OwnerReferenceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn api_version(&mut self, api_version: impl Into<String>) -> &mut Self {
        self.api_version = Some(api_version.into());
        self
    }

    pub fn block_owner_deletion(&mut self, block_owner_deletion: bool) -> &mut Self {
        self.block_owner_deletion = Some(block_owner_deletion);
        self
    }

    pub fn controller(&mut self, controller: bool) -> &mut Self {
        self.controller = Some(controller);
        self
    }

    pub fn kind(&mut self, kind: impl Into<String>) -> &mut Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = Some(name.into());
        self
    }

    pub fn uid(&mut self, uid: impl Into<String>) -> &mut Self {
        self.uid = Some(uid.into());
        self
    }

    pub fn uid_opt(&mut self, uid: impl Into<Option<String>>) -> &mut Self {
        self.uid = uid.into();
        self
    }

    /// Initializes the builder so the `OwnerReference` points to the passed
    /// resource, typically the `CephCluster` the keyrings belong to.
    ///
    /// This will _not_ set `controller` or `block_owner_deletion`.
    pub fn initialize_from_resource<T: Resource<DynamicType = ()>>(
        &mut self,
        resource: &T,
    ) -> &mut Self {
        self.api_version(T::api_version(&()))
            .kind(T::kind(&()))
            .name(resource.name_any())
            .uid_opt(resource.meta().uid.clone());
        self
    }

    pub fn build(&self) -> Result<OwnerReference> {
        Ok(OwnerReference {
            api_version: self
                .api_version
                .clone()
                .context(MissingObjectKeySnafu { key: "api_version" })?,
            block_owner_deletion: self.block_owner_deletion,
            controller: self.controller,
            kind: self
                .kind
                .clone()
                .context(MissingObjectKeySnafu { key: "kind" })?,
            name: self
                .name
                .clone()
                .context(MissingObjectKeySnafu { key: "name" })?,
            uid: self
                .uid
                .clone()
                .context(MissingObjectKeySnafu { key: "uid" })?,
        })
    }
}
