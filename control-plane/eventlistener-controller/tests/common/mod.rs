#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use eventlistener_controller::controller::{DesiredStateBuilder, Reconciler};
use eventlistener_controller::crd::{EventListener, EventListenerSpec};
use eventlistener_controller::store::{MemoryStore, StoreOp};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;

// DNS-1123 safe numeric suffix for unique names
pub const DIGITS: [char; 10] =
    ['0', '1', '2', '3', '4', '5', '6', '7', '8', '9'];
pub fn uniq(prefix: &str) -> String {
    format!("{prefix}-{}", nanoid::nanoid!(6, &DIGITS))
}

pub const IMAGE: &str = "ghcr.io/tektoncd/triggers/eventlistenersink:v0.1";

pub fn listener(ns: &str, name: &str) -> EventListener {
    let mut el = EventListener::new(
        name,
        EventListenerSpec {
            service_account_name: Some("tekton-triggers".into()),
            triggers: vec![],
        },
    );
    el.metadata.namespace = Some(ns.to_string());
    el.metadata.labels = Some(BTreeMap::from([(
        "team".to_string(),
        "platform".to_string(),
    )]));
    el
}

/// Reconciler wired to in-memory stores, with handles to inspect them.
pub struct Harness {
    pub parents: MemoryStore<EventListener>,
    pub deployments: MemoryStore<Deployment>,
    pub services: MemoryStore<Service>,
    pub reconciler: Reconciler,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_image(IMAGE)
    }

    pub fn with_image(image: &str) -> Self {
        let parents = MemoryStore::new();
        let deployments = MemoryStore::new();
        let services = MemoryStore::new();
        let reconciler = Reconciler::new(
            Arc::new(parents.clone()),
            Arc::new(deployments.clone()),
            Arc::new(services.clone()),
            DesiredStateBuilder::new(image),
        );
        Self {
            parents,
            deployments,
            services,
            reconciler,
        }
    }

    /// Store the parent the way the API server would (uid, resourceVersion).
    pub async fn add_listener(&self, el: EventListener) -> EventListener {
        self.parents.seed(el).await
    }

    pub async fn clear_calls(&self) {
        self.parents.clear_calls().await;
        self.deployments.clear_calls().await;
        self.services.clear_calls().await;
    }

    pub async fn child_writes(&self) -> usize {
        self.deployments.writes().await + self.services.writes().await
    }

    pub async fn total_calls(&self) -> usize {
        self.parents.calls().await.len()
            + self.deployments.calls().await.len()
            + self.services.calls().await.len()
    }

    pub async fn updates(&self) -> (usize, usize) {
        (
            self.deployments.count(StoreOp::Update).await,
            self.services.count(StoreOp::Update).await,
        )
    }
}
