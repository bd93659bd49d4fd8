//! Get → compare → create-or-update for one child kind.
//!
//! Every child kind goes through [`converge`]; what differs per kind is
//! captured by [`ChildResource`]: where the mutable spec lives and which
//! of its fields the API server owns.

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{Service, ServiceSpec};
use kube::{Resource, ResourceExt};
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::{debug, info, instrument, trace};

use super::ReconcileErr;
use crate::store::{ObjectStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convergence {
    Created,
    Updated,
    Unchanged,
}

/// A spec field the API server will not let a client change once it is
/// stored. `carry` copies the live value into the desired spec when the
/// live value is non-empty and reports whether it did.
pub struct ServerOwnedField<S: 'static> {
    pub name: &'static str,
    pub carry: fn(live: &S, desired: &mut S) -> bool,
}

/// A child kind the controller converges.
///
/// Only `spec` takes part in comparison and update; metadata and status
/// on the live object belong to the store and are written back as read.
pub trait ChildResource:
    Resource<DynamicType = ()> + Clone + Send + Sync + 'static
{
    type Spec: Serialize + Clone + Send + Sync + 'static;

    fn spec(&self) -> Option<&Self::Spec>;
    fn spec_mut(&mut self) -> &mut Option<Self::Spec>;

    fn server_owned_fields() -> &'static [ServerOwnedField<Self::Spec>] {
        &[]
    }
}

// apps/v1 rejects any selector change after creation.
static DEPLOYMENT_SERVER_OWNED: [ServerOwnedField<DeploymentSpec>; 1] =
    [ServerOwnedField {
        name: "selector",
        carry: carry_selector,
    }];

fn carry_selector(live: &DeploymentSpec, desired: &mut DeploymentSpec) -> bool {
    let selector = &live.selector;
    let set = selector.match_labels.as_ref().is_some_and(|l| !l.is_empty())
        || selector
            .match_expressions
            .as_ref()
            .is_some_and(|e| !e.is_empty());
    if set {
        desired.selector = selector.clone();
    }
    set
}

impl ChildResource for Deployment {
    type Spec = DeploymentSpec;

    fn spec(&self) -> Option<&DeploymentSpec> {
        self.spec.as_ref()
    }
    fn spec_mut(&mut self) -> &mut Option<DeploymentSpec> {
        &mut self.spec
    }
    fn server_owned_fields() -> &'static [ServerOwnedField<DeploymentSpec>] {
        &DEPLOYMENT_SERVER_OWNED
    }
}

static SERVICE_SERVER_OWNED: [ServerOwnedField<ServiceSpec>; 2] = [
    ServerOwnedField {
        name: "clusterIP",
        carry: carry_cluster_ip,
    },
    ServerOwnedField {
        name: "clusterIPs",
        carry: carry_cluster_ips,
    },
];

fn carry_cluster_ip(live: &ServiceSpec, desired: &mut ServiceSpec) -> bool {
    match live.cluster_ip.as_deref() {
        Some(ip) if !ip.is_empty() => {
            desired.cluster_ip = Some(ip.to_string());
            true
        }
        _ => false,
    }
}

fn carry_cluster_ips(live: &ServiceSpec, desired: &mut ServiceSpec) -> bool {
    match live.cluster_ips.as_ref() {
        Some(ips) if !ips.is_empty() => {
            desired.cluster_ips = Some(ips.clone());
            true
        }
        _ => false,
    }
}

impl ChildResource for Service {
    type Spec = ServiceSpec;

    fn spec(&self) -> Option<&ServiceSpec> {
        self.spec.as_ref()
    }
    fn spec_mut(&mut self) -> &mut Option<ServiceSpec> {
        &mut self.spec
    }
    fn server_owned_fields() -> &'static [ServerOwnedField<ServiceSpec>] {
        &SERVICE_SERVER_OWNED
    }
}

/// Copy server-owned values from `live` into `desired`. Returns the
/// names of the fields that were carried.
pub fn carry_server_owned<K: ChildResource>(
    live: &K,
    desired: &mut K,
) -> Vec<&'static str> {
    let (Some(live_spec), Some(desired_spec)) =
        (live.spec(), desired.spec_mut().as_mut())
    else {
        return Vec::new();
    };
    let mut carried = Vec::new();
    for field in K::server_owned_fields() {
        if (field.carry)(live_spec, desired_spec) {
            carried.push(field.name);
        }
    }
    carried
}

fn spec_fingerprint<K: ChildResource>(
    obj: &K,
) -> Result<JsonValue, ReconcileErr> {
    serde_json::to_value(obj.spec()).map_err(|source| {
        ReconcileErr::Serialization {
            kind: K::kind(&()).into_owned(),
            source,
        }
    })
}

/// True when every value `desired` sets is present and equal in `live`.
///
/// Objects recurse only into the keys `desired` carries, so fields the
/// API server defaults (`strategy`, `sessionAffinity`, `targetPort`...)
/// never count as drift. Arrays must have equal length and match
/// element-wise, so an added or dropped port or container still does.
pub fn json_contains(desired: &JsonValue, live: &JsonValue) -> bool {
    match (desired, live) {
        (JsonValue::Object(want), JsonValue::Object(have)) => {
            want.iter().all(|(key, value)| match have.get(key) {
                Some(found) => json_contains(value, found),
                None => value.is_null(),
            })
        }
        (JsonValue::Array(want), JsonValue::Array(have)) => {
            want.len() == have.len()
                && want.iter().zip(have).all(|(w, h)| json_contains(w, h))
        }
        _ => desired == live,
    }
}

/// Compare the mutable spec of two objects, scoped to the fields the
/// desired object sets.
pub fn specs_match<K: ChildResource>(
    desired: &K,
    live: &K,
) -> Result<bool, ReconcileErr> {
    Ok(json_contains(
        &spec_fingerprint(desired)?,
        &spec_fingerprint(live)?,
    ))
}

/// Drive one child toward `desired`.
///
/// Absent → create. Present → carry server-owned fields, compare specs,
/// and replace the live spec only on a real difference. Store errors are
/// returned as-is for the caller to surface; nothing is retried here.
#[instrument(skip_all, fields(kind = %K::kind(&()), ns = ?desired.namespace(), name = %desired.name_any()))]
pub async fn converge<K: ChildResource>(
    store: &dyn ObjectStore<K>,
    mut desired: K,
) -> Result<Convergence, ReconcileErr> {
    let namespace = desired.namespace().unwrap_or_default();
    let name = desired.name_any();
    let fail = |op: &'static str| {
        let namespace = namespace.clone();
        let name = name.clone();
        move |source: StoreError| ReconcileErr::Child {
            op,
            kind: K::kind(&()).into_owned(),
            namespace,
            name,
            source,
        }
    };

    let Some(mut live) = store.get(&namespace, &name).await.map_err(fail("get"))?
    else {
        store.create(&desired).await.map_err(fail("create"))?;
        info!(%namespace, %name, "converge: created");
        return Ok(Convergence::Created);
    };

    let carried = carry_server_owned(&live, &mut desired);
    if !carried.is_empty() {
        debug!(?carried, "converge: carried server-owned fields");
    }

    if specs_match(&desired, &live)? {
        trace!("converge: live spec matches desired");
        return Ok(Convergence::Unchanged);
    }

    *live.spec_mut() = desired.spec_mut().take();
    store.update(&live).await.map_err(fail("update"))?;
    info!(%namespace, %name, "converge: updated");
    Ok(Convergence::Updated)
}
