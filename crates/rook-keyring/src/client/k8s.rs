use std::collections::BTreeMap;

use k8s_openapi::{api::core::v1::Secret, ByteString};
use kube::{
    api::{DeleteParams, Patch, PatchParams, PostParams},
    Api, Client,
};
use snafu::{OptionExt, ResultExt};

use crate::{
    client::{
        AlreadyExistsSnafu, KubeSnafu, MissingObjectKeySnafu, NotFoundSnafu, Result,
        SecretClient, SerializePatchSnafu,
    },
    constants::DEFAULT_FIELD_MANAGER,
};

const CONFLICT: u16 = 409;
const NOT_FOUND: u16 = 404;

/// A [`SecretClient`] backed by the Kubernetes API.
///
/// It wraps an underlying [`kube::Client`] and writes under a fixed field
/// manager.
#[derive(Clone)]
pub struct KubeSecretClient {
    client: Client,
    post_params: PostParams,
    patch_params: PatchParams,
    delete_params: DeleteParams,
}

impl KubeSecretClient {
    pub fn new(client: Client, field_manager: Option<String>) -> Self {
        let field_manager =
            Some(field_manager.unwrap_or_else(|| DEFAULT_FIELD_MANAGER.to_owned()));
        Self {
            client,
            post_params: PostParams {
                field_manager: field_manager.clone(),
                ..PostParams::default()
            },
            patch_params: PatchParams {
                field_manager,
                ..PatchParams::default()
            },
            delete_params: DeleteParams::default(),
        }
    }

    fn api(&self, namespace: &str) -> Api<Secret> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait::async_trait]
impl SecretClient for KubeSecretClient {
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>> {
        self.api(namespace)
            .get_opt(name)
            .await
            .context(KubeSnafu {
                operation: "get",
                namespace,
                name,
            })
    }

    async fn create_secret(&self, secret: &Secret) -> Result<Secret> {
        let namespace = secret
            .metadata
            .namespace
            .as_deref()
            .context(MissingObjectKeySnafu { key: "namespace" })?;
        let name = secret
            .metadata
            .name
            .as_deref()
            .context(MissingObjectKeySnafu { key: "name" })?;

        match self.api(namespace).create(&self.post_params, secret).await {
            Err(kube::Error::Api(error)) if error.code == CONFLICT => {
                AlreadyExistsSnafu { namespace, name }.fail()
            }
            result => result.context(KubeSnafu {
                operation: "create",
                namespace,
                name,
            }),
        }
    }

    async fn replace_secret_data(
        &self,
        namespace: &str,
        name: &str,
        data: BTreeMap<String, ByteString>,
    ) -> Result<Secret> {
        // A single JSON patch operation is applied atomically by the API
        // server. `add` on an existing member replaces it.
        let patch: json_patch::Patch = serde_json::to_value(&data)
            .and_then(|data| {
                serde_json::from_value(serde_json::json!([
                    { "op": "add", "path": "/data", "value": data }
                ]))
            })
            .context(SerializePatchSnafu { namespace, name })?;

        match self
            .api(namespace)
            .patch(name, &self.patch_params, &Patch::Json::<()>(patch))
            .await
        {
            Err(kube::Error::Api(error)) if error.code == NOT_FOUND => {
                NotFoundSnafu { namespace, name }.fail()
            }
            result => result.context(KubeSnafu {
                operation: "patch",
                namespace,
                name,
            }),
        }
    }

    async fn delete_secret(&self, namespace: &str, name: &str) -> Result<bool> {
        match self.api(namespace).delete(name, &self.delete_params).await {
            Ok(_) => Ok(true),
            Err(kube::Error::Api(error)) if error.code == NOT_FOUND => Ok(false),
            Err(source) => Err(source).context(KubeSnafu {
                operation: "delete",
                namespace,
                name,
            }),
        }
    }
}
