use std::sync::Arc;

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use tracing::{error, info, instrument, warn};

use super::converge::{Convergence, converge};
use super::desired::DesiredStateBuilder;
use super::ReconcileErr;
use crate::crd::EventListener;
use crate::store::{Lookup, ObjectStore};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("expected <namespace>/<name>, got {0:?}")]
    Shape(String),
    #[error("{part} {value:?} is not a valid DNS-1123 name")]
    InvalidSegment { part: &'static str, value: String },
}

/// Split a work-queue key into `(namespace, name)`.
///
/// EventListeners are namespaced, so both parts are required. The
/// namespace must be a DNS-1123 label and the name a DNS-1123 subdomain.
pub fn split_key(key: &str) -> Result<(&str, &str), KeyError> {
    let Some((namespace, name)) = key.split_once('/') else {
        return Err(KeyError::Shape(key.to_string()));
    };
    if name.contains('/') {
        return Err(KeyError::Shape(key.to_string()));
    }
    if !is_dns1123_label(namespace) {
        return Err(KeyError::InvalidSegment {
            part: "namespace",
            value: namespace.to_string(),
        });
    }
    if !is_dns1123_subdomain(name) {
        return Err(KeyError::InvalidSegment {
            part: "name",
            value: name.to_string(),
        });
    }
    Ok((namespace, name))
}

fn is_dns1123_label(s: &str) -> bool {
    let bytes = s.as_bytes();
    !bytes.is_empty()
        && bytes.len() <= 63
        && bytes[0].is_ascii_alphanumeric()
        && bytes[bytes.len() - 1].is_ascii_alphanumeric()
        && bytes
            .iter()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'-')
}

fn is_dns1123_subdomain(s: &str) -> bool {
    s.len() <= 253 && s.split('.').all(is_dns1123_label)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildOutcomes {
    pub deployment: Convergence,
    pub service: Convergence,
}

/// How a pass ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// The key could not be parsed; redelivery would not help.
    MalformedKey,
    /// The EventListener is gone; its children go with it via owner refs.
    ParentGone,
    Converged(ChildOutcomes),
}

/// One reconcile pass per key: resolve the key, load the EventListener,
/// then converge its Deployment and its Service.
///
/// Holds no per-key state, so concurrent passes for different keys need
/// no coordination.
pub struct Reconciler {
    parents: Arc<dyn Lookup<EventListener>>,
    deployments: Arc<dyn ObjectStore<Deployment>>,
    services: Arc<dyn ObjectStore<Service>>,
    builder: DesiredStateBuilder,
}

impl Reconciler {
    pub fn new(
        parents: Arc<dyn Lookup<EventListener>>,
        deployments: Arc<dyn ObjectStore<Deployment>>,
        services: Arc<dyn ObjectStore<Service>>,
        builder: DesiredStateBuilder,
    ) -> Self {
        Self {
            parents,
            deployments,
            services,
            builder,
        }
    }

    pub fn builder(&self) -> &DesiredStateBuilder {
        &self.builder
    }

    #[instrument(skip_all, fields(key = %key))]
    pub async fn reconcile_key(
        &self,
        key: &str,
    ) -> Result<PassOutcome, ReconcileErr> {
        info!("event-listener-reconcile");
        let (namespace, name) = match split_key(key) {
            Ok(parts) => parts,
            Err(e) => {
                error!(error = %e, "invalid resource key; dropping");
                return Ok(PassOutcome::MalformedKey);
            }
        };

        let parent = match self.parents.get(namespace, name).await {
            Ok(Some(el)) => el,
            Ok(None) => {
                info!(%namespace, %name, "EventListener in work queue no longer exists");
                return Ok(PassOutcome::ParentGone);
            }
            Err(source) => {
                error!(%namespace, %name, error = %source, "error retrieving EventListener");
                return Err(ReconcileErr::ParentLookup {
                    namespace: namespace.to_string(),
                    name: name.to_string(),
                    source,
                });
            }
        };

        self.converge_children(&parent)
            .await
            .map(PassOutcome::Converged)
    }

    /// Converge the Deployment, then the Service. Both are always
    /// attempted; the first failure is the one returned.
    pub async fn converge_children(
        &self,
        el: &EventListener,
    ) -> Result<ChildOutcomes, ReconcileErr> {
        let desired = self.builder.build(el);
        let deployment =
            converge(self.deployments.as_ref(), desired.deployment).await;
        let service = converge(self.services.as_ref(), desired.service).await;

        match (deployment, service) {
            (Ok(deployment), Ok(service)) => Ok(ChildOutcomes {
                deployment,
                service,
            }),
            (Err(first), service) => {
                if let Err(second) = service {
                    warn!(error = %second, "service convergence failed as well");
                }
                Err(first)
            }
            (Ok(_), Err(e)) => Err(e),
        }
    }
}
