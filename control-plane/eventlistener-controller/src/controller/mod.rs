use std::sync::Arc;

use futures_util::StreamExt;
use k8s_openapi::api::{apps::v1::Deployment, core::v1::Service};
use kube::{
    Client, ResourceExt,
    api::Api,
    runtime::{Controller, controller::Action, watcher::Config},
};
use tokio::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::ControllerConfig;
use crate::crd::EventListener;
use crate::store::{KubeStore, StoreError};

pub mod converge;
pub mod desired;
pub mod labels;
pub mod reconcile;

pub use converge::{ChildResource, Convergence, ServerOwnedField, converge};
pub use desired::{DesiredChildren, DesiredStateBuilder};
pub use reconcile::{ChildOutcomes, KeyError, PassOutcome, Reconciler, split_key};

#[derive(thiserror::Error, Debug)]
pub enum ReconcileErr {
    #[error("failed to get EventListener {namespace}/{name}: {source}")]
    ParentLookup {
        namespace: String,
        name: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to {op} {kind} {namespace}/{name}: {source}")]
    Child {
        op: &'static str,
        kind: String,
        namespace: String,
        name: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to serialize {kind} spec: {source}")]
    Serialization {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

pub struct ControllerContext {
    pub reconciler: Reconciler,
    pub cfg: ControllerConfig,
}

/// Work-queue key for an EventListener.
pub fn object_key(el: &EventListener) -> String {
    format!("{}/{}", el.namespace().unwrap_or_default(), el.name_any())
}

pub async fn run_controller(
    client: Client,
    cfg: ControllerConfig,
) -> anyhow::Result<()> {
    let (listeners, deployments, services): (
        Api<EventListener>,
        Api<Deployment>,
        Api<Service>,
    ) = match cfg.watch_namespace.as_deref() {
        Some(ns) => (
            Api::namespaced(client.clone(), ns),
            Api::namespaced(client.clone(), ns),
            Api::namespaced(client.clone(), ns),
        ),
        None => (
            Api::all(client.clone()),
            Api::all(client.clone()),
            Api::all(client.clone()),
        ),
    };

    let controller = Controller::new(listeners, Config::default());
    // The watch cache serves parent lookups, like an informer lister.
    let parents = controller.store();
    let reconciler = Reconciler::new(
        Arc::new(parents),
        Arc::new(KubeStore::<Deployment>::new(
            client.clone(),
            cfg.field_manager.clone(),
        )),
        Arc::new(KubeStore::<Service>::new(client, cfg.field_manager.clone())),
        DesiredStateBuilder::new(cfg.el_image.clone()),
    );
    info!(
        image = %cfg.el_image,
        namespace = cfg.watch_namespace.as_deref().unwrap_or("<all>"),
        "EventListener controller starting"
    );
    let ctx = Arc::new(ControllerContext { reconciler, cfg });

    controller
        .owns(deployments, Config::default())
        .owns(services, Config::default())
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(|res| async move {
            match res {
                Ok((obj_ref, action)) => {
                    debug!(%obj_ref, ?action, "reconciled")
                }
                Err(e) => error!(error = ?e, "reconcile error"),
            }
        })
        .await;

    info!("EventListener controller stopped");
    Ok(())
}

async fn reconcile(
    obj: Arc<EventListener>,
    ctx: Arc<ControllerContext>,
) -> Result<Action, ReconcileErr> {
    let outcome = ctx.reconciler.reconcile_key(&object_key(&obj)).await?;
    debug!(?outcome, "pass complete");
    Ok(Action::requeue(Duration::from_secs(ctx.cfg.resync_secs)))
}

fn error_policy(
    obj: Arc<EventListener>,
    error: &ReconcileErr,
    ctx: Arc<ControllerContext>,
) -> Action {
    warn!(key = %object_key(&obj), %error, "pass failed; requeueing");
    Action::requeue(Duration::from_secs(ctx.cfg.error_requeue_secs))
}
