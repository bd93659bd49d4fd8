use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use kube::{Resource, ResourceExt};
use tokio::sync::RwLock;

use super::{Lookup, ObjectStore, StoreError, StoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Get,
    Create,
    Update,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreCall {
    pub op: StoreOp,
    pub namespace: String,
    pub name: String,
}

type Key = (String, String);

/// In-process object store with the API server's write semantics that
/// matter to reconciliation: create refuses existing names, update
/// refuses stale resourceVersions, and every write bumps the version.
///
/// Every call made through [`Lookup`] / [`ObjectStore`] is recorded so
/// callers can assert exactly which store traffic a pass produced.
#[derive(Clone)]
pub struct MemoryStore<K> {
    objects: Arc<RwLock<BTreeMap<Key, K>>>,
    calls: Arc<RwLock<Vec<StoreCall>>>,
    faults: Arc<RwLock<HashMap<StoreOp, String>>>,
    version: Arc<AtomicU64>,
}

impl<K> Default for MemoryStore<K> {
    fn default() -> Self {
        Self {
            objects: Arc::new(RwLock::new(BTreeMap::new())),
            calls: Arc::new(RwLock::new(Vec::new())),
            faults: Arc::new(RwLock::new(HashMap::new())),
            version: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl<K> MemoryStore<K>
where
    K: Resource + Clone + Send + Sync,
{
    pub fn new() -> Self {
        Self::default()
    }

    fn key_of(obj: &K) -> Key {
        (obj.namespace().unwrap_or_default(), obj.name_any())
    }

    fn next_version(&self) -> String {
        (self.version.fetch_add(1, Ordering::SeqCst) + 1).to_string()
    }

    /// Stamp server-managed metadata the way the API server would.
    fn stamp(&self, obj: &mut K) {
        let version = self.next_version();
        let meta = obj.meta_mut();
        if meta.uid.is_none() {
            meta.uid = Some(format!("uid-{version}"));
        }
        meta.resource_version = Some(version);
    }

    /// Place an object directly, as if another actor had created it.
    /// Not recorded as a call.
    pub async fn seed(&self, mut obj: K) -> K {
        self.stamp(&mut obj);
        self.objects
            .write()
            .await
            .insert(Self::key_of(&obj), obj.clone());
        obj
    }

    /// Read an object without recording a call.
    pub async fn peek(&self, namespace: &str, name: &str) -> Option<K> {
        self.objects
            .read()
            .await
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    /// Modify a stored object out of band, bumping its resourceVersion.
    /// Returns false when no such object exists.
    pub async fn mutate(
        &self,
        namespace: &str,
        name: &str,
        f: impl FnOnce(&mut K),
    ) -> bool {
        let mut objects = self.objects.write().await;
        match objects.get_mut(&(namespace.to_string(), name.to_string())) {
            Some(obj) => {
                f(obj);
                obj.meta_mut().resource_version = Some(self.next_version());
                true
            }
            None => false,
        }
    }

    /// Make every subsequent `op` fail with [`StoreError::Unavailable`].
    pub async fn fail(&self, op: StoreOp, message: impl Into<String>) {
        self.faults.write().await.insert(op, message.into());
    }

    pub async fn heal(&self, op: StoreOp) {
        self.faults.write().await.remove(&op);
    }

    pub async fn calls(&self) -> Vec<StoreCall> {
        self.calls.read().await.clone()
    }

    pub async fn count(&self, op: StoreOp) -> usize {
        self.calls.read().await.iter().filter(|c| c.op == op).count()
    }

    /// Number of create and update calls recorded.
    pub async fn writes(&self) -> usize {
        self.calls
            .read()
            .await
            .iter()
            .filter(|c| c.op != StoreOp::Get)
            .count()
    }

    pub async fn clear_calls(&self) {
        self.calls.write().await.clear();
    }

    async fn record(
        &self,
        op: StoreOp,
        namespace: &str,
        name: &str,
    ) -> StoreResult<()> {
        self.calls.write().await.push(StoreCall {
            op,
            namespace: namespace.to_string(),
            name: name.to_string(),
        });
        match self.faults.read().await.get(&op) {
            Some(message) => Err(StoreError::Unavailable(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl<K> Lookup<K> for MemoryStore<K>
where
    K: Resource + Clone + Send + Sync,
{
    async fn get(&self, namespace: &str, name: &str) -> StoreResult<Option<K>> {
        self.record(StoreOp::Get, namespace, name).await?;
        Ok(self.peek(namespace, name).await)
    }
}

#[async_trait]
impl<K> ObjectStore<K> for MemoryStore<K>
where
    K: Resource + Clone + Send + Sync,
{
    async fn create(&self, obj: &K) -> StoreResult<K> {
        let key = Self::key_of(obj);
        self.record(StoreOp::Create, &key.0, &key.1).await?;
        let mut objects = self.objects.write().await;
        if objects.contains_key(&key) {
            return Err(StoreError::AlreadyExists(format!(
                "{}/{}",
                key.0, key.1
            )));
        }
        let mut stored = obj.clone();
        stored.meta_mut().resource_version = None;
        self.stamp(&mut stored);
        objects.insert(key, stored.clone());
        Ok(stored)
    }

    async fn update(&self, obj: &K) -> StoreResult<K> {
        let key = Self::key_of(obj);
        self.record(StoreOp::Update, &key.0, &key.1).await?;
        let mut objects = self.objects.write().await;
        let Some(current) = objects.get(&key) else {
            return Err(StoreError::NotFound(format!("{}/{}", key.0, key.1)));
        };
        let sent = obj.meta().resource_version.as_deref();
        if sent.is_some() && sent != current.meta().resource_version.as_deref()
        {
            return Err(StoreError::Conflict(format!(
                "{}/{} was modified; resourceVersion {} is stale",
                key.0,
                key.1,
                sent.unwrap_or_default()
            )));
        }
        let mut stored = obj.clone();
        stored.meta_mut().uid = current.meta().uid.clone();
        stored.meta_mut().resource_version =
            Some(self.next_version());
        objects.insert(key, stored.clone());
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::ConfigMap;
    use kube::core::ObjectMeta;
    use std::collections::BTreeMap;

    fn config_map(name: &str, value: &str) -> ConfigMap {
        ConfigMap {
            metadata: ObjectMeta {
                name: Some(name.into()),
                namespace: Some("ns".into()),
                ..Default::default()
            },
            data: Some(BTreeMap::from([("k".to_string(), value.to_string())])),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_stamps_metadata_and_rejects_duplicates() {
        let store = MemoryStore::<ConfigMap>::new();
        let created = store.create(&config_map("a", "1")).await.unwrap();
        assert!(created.metadata.uid.is_some());
        assert_eq!(created.metadata.resource_version.as_deref(), Some("1"));

        let err = store.create(&config_map("a", "2")).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
        assert_eq!(store.count(StoreOp::Create).await, 2);
    }

    #[tokio::test]
    async fn update_with_stale_version_conflicts() {
        let store = MemoryStore::<ConfigMap>::new();
        let read = store.seed(config_map("a", "1")).await;
        assert!(store.mutate("ns", "a", |cm| cm.data = None).await);

        let err = store.update(&read).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn update_bumps_version_and_keeps_uid() {
        let store = MemoryStore::<ConfigMap>::new();
        let mut read = store.seed(config_map("a", "1")).await;
        read.data = Some(BTreeMap::from([("k".into(), "2".into())]));

        let updated = store.update(&read).await.unwrap();
        assert_eq!(updated.metadata.uid, read.metadata.uid);
        assert_ne!(
            updated.metadata.resource_version,
            read.metadata.resource_version
        );
        let stored = store.peek("ns", "a").await.unwrap();
        assert_eq!(stored.data.unwrap()["k"], "2");
    }

    #[tokio::test]
    async fn injected_faults_surface_until_healed() {
        let store = MemoryStore::<ConfigMap>::new();
        store.fail(StoreOp::Get, "etcd timeout").await;
        assert!(matches!(
            store.get("ns", "a").await,
            Err(StoreError::Unavailable(_))
        ));
        store.heal(StoreOp::Get).await;
        assert!(store.get("ns", "a").await.unwrap().is_none());
        assert_eq!(store.count(StoreOp::Get).await, 2);
    }
}
