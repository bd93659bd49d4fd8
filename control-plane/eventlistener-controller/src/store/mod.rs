//! Object store seams used by the reconciler.
//!
//! The reconciler never talks to the API server directly: it reads the
//! parent through a [`Lookup`] and drives each child kind through an
//! [`ObjectStore`]. Production wiring uses [`KubeStore`] and the
//! controller's reflector cache; tests use [`MemoryStore`].

mod error;
mod kube_api;
mod memory;

use async_trait::async_trait;
use kube::Resource;
use kube::runtime::reflector::{ObjectRef, Store};

pub use error::{StoreError, StoreResult};
pub use kube_api::KubeStore;
pub use memory::{MemoryStore, StoreCall, StoreOp};

/// Read access to namespaced objects. A missing object is `Ok(None)`,
/// never an error.
#[async_trait]
pub trait Lookup<K>: Send + Sync {
    async fn get(&self, namespace: &str, name: &str) -> StoreResult<Option<K>>;
}

/// Read/write access for objects the controller owns.
#[async_trait]
pub trait ObjectStore<K>: Lookup<K> {
    /// Create `obj`; fails with [`StoreError::AlreadyExists`] when taken.
    async fn create(&self, obj: &K) -> StoreResult<K>;
    /// Replace the stored object. `obj` carries the resourceVersion it
    /// was read at; a stale version fails with [`StoreError::Conflict`].
    async fn update(&self, obj: &K) -> StoreResult<K>;
}

/// The controller's watch cache doubles as the parent lookup. Returned
/// objects are private copies; the cached original is never handed out.
#[async_trait]
impl<K> Lookup<K> for Store<K>
where
    K: Resource<DynamicType = ()> + Clone + Send + Sync + 'static,
{
    async fn get(&self, namespace: &str, name: &str) -> StoreResult<Option<K>> {
        let key = ObjectRef::<K>::new(name).within(namespace);
        Ok(Store::get(self, &key).map(|cached| (*cached).clone()))
    }
}
