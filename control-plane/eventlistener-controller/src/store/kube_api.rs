use std::fmt::Debug;
use std::marker::PhantomData;

use async_trait::async_trait;
use k8s_openapi::NamespaceResourceScope;
use kube::api::{Api, PostParams};
use kube::{Client, Resource, ResourceExt};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::trace;

use super::{Lookup, ObjectStore, StoreError, StoreResult};

/// [`ObjectStore`] backed by the Kubernetes API server.
#[derive(Clone)]
pub struct KubeStore<K> {
    client: Client,
    field_manager: String,
    _marker: PhantomData<fn() -> K>,
}

impl<K> KubeStore<K> {
    pub fn new(client: Client, field_manager: impl Into<String>) -> Self {
        Self {
            client,
            field_manager: field_manager.into(),
            _marker: PhantomData,
        }
    }

    fn post_params(&self) -> PostParams {
        PostParams {
            dry_run: false,
            field_manager: Some(self.field_manager.clone()),
        }
    }
}

impl<K> KubeStore<K>
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>,
{
    fn api(&self, namespace: &str) -> Api<K> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn namespace_of<K: Resource>(obj: &K) -> StoreResult<String> {
    obj.namespace().ok_or_else(|| {
        StoreError::Invalid(format!("{} has no namespace", obj.name_any()))
    })
}

#[async_trait]
impl<K> Lookup<K> for KubeStore<K>
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + DeserializeOwned
        + Debug
        + Send
        + Sync
        + 'static,
{
    async fn get(&self, namespace: &str, name: &str) -> StoreResult<Option<K>> {
        trace!(%namespace, %name, kind = %K::kind(&()), "kube store: get");
        Ok(self.api(namespace).get_opt(name).await?)
    }
}

#[async_trait]
impl<K> ObjectStore<K> for KubeStore<K>
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + Serialize
        + DeserializeOwned
        + Debug
        + Send
        + Sync
        + 'static,
{
    async fn create(&self, obj: &K) -> StoreResult<K> {
        let namespace = namespace_of(obj)?;
        trace!(%namespace, name = %obj.name_any(), kind = %K::kind(&()), "kube store: create");
        Ok(self.api(&namespace).create(&self.post_params(), obj).await?)
    }

    async fn update(&self, obj: &K) -> StoreResult<K> {
        let namespace = namespace_of(obj)?;
        let name = obj.name_any();
        trace!(%namespace, %name, kind = %K::kind(&()), "kube store: replace");
        Ok(self
            .api(&namespace)
            .replace(&name, &self.post_params(), obj)
            .await?)
    }
}
