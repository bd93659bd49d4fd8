use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, PodSpec, PodTemplateSpec, Service, ServicePort,
    ServiceSpec,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{
    LabelSelector, OwnerReference,
};
use kube::core::ObjectMeta;
use kube::{Resource, ResourceExt};

use super::labels::{identity_selector, propagate_labels};
use crate::EVENT_LISTENER_PORT;
use crate::crd::EventListener;

pub const CONTAINER_NAME: &str = "event-listener";

/// Children one EventListener should have, computed fresh every pass.
#[derive(Clone, Debug)]
pub struct DesiredChildren {
    pub deployment: Deployment,
    pub service: Service,
}

/// Maps an EventListener to its desired Deployment and Service.
///
/// Pure: the image reference is fixed at construction and nothing else
/// outside the EventListener influences the result, so equal inputs
/// always render equal children.
#[derive(Clone, Debug)]
pub struct DesiredStateBuilder {
    image: String,
}

impl DesiredStateBuilder {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
        }
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn build(&self, el: &EventListener) -> DesiredChildren {
        let name = el.name_any();
        let namespace = el.namespace().unwrap_or_default();
        let labels = propagate_labels(el.labels(), &name);
        let metadata = ObjectMeta {
            name: Some(name.clone()),
            namespace: Some(namespace.clone()),
            labels: Some(labels.clone()),
            owner_references: Some(vec![owner_reference(el)]),
            ..Default::default()
        };

        let container = Container {
            name: CONTAINER_NAME.to_string(),
            image: Some(self.image.clone()),
            ports: Some(vec![ContainerPort {
                container_port: EVENT_LISTENER_PORT,
                ..Default::default()
            }]),
            args: Some(vec![
                "-el-name".to_string(),
                name.clone(),
                "-el-namespace".to_string(),
                namespace,
                "-port".to_string(),
                EVENT_LISTENER_PORT.to_string(),
            ]),
            ..Default::default()
        };

        let deployment = Deployment {
            metadata: metadata.clone(),
            spec: Some(DeploymentSpec {
                selector: LabelSelector {
                    match_labels: Some(identity_selector(&name)),
                    ..Default::default()
                },
                template: PodTemplateSpec {
                    metadata: Some(ObjectMeta {
                        labels: Some(labels),
                        ..Default::default()
                    }),
                    spec: Some(PodSpec {
                        service_account_name: el
                            .spec
                            .service_account_name
                            .clone(),
                        containers: vec![container],
                        ..Default::default()
                    }),
                },
                ..Default::default()
            }),
            ..Default::default()
        };

        let service = Service {
            metadata,
            spec: Some(ServiceSpec {
                selector: Some(identity_selector(&name)),
                type_: Some("ClusterIP".to_string()),
                ports: Some(vec![ServicePort {
                    protocol: Some("TCP".to_string()),
                    port: EVENT_LISTENER_PORT,
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        };

        DesiredChildren {
            deployment,
            service,
        }
    }
}

/// Controller reference so the API server garbage-collects children
/// together with their EventListener.
fn owner_reference(el: &EventListener) -> OwnerReference {
    OwnerReference {
        api_version: EventListener::api_version(&()).into_owned(),
        kind: EventListener::kind(&()).into_owned(),
        name: el.name_any(),
        uid: el.uid().unwrap_or_default(),
        controller: Some(true),
        block_owner_deletion: Some(true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::EventListenerSpec;
    use std::collections::BTreeMap;

    fn listener() -> EventListener {
        let mut el = EventListener::new(
            "github",
            EventListenerSpec {
                service_account_name: Some("tekton-triggers".into()),
                triggers: vec![],
            },
        );
        el.metadata.namespace = Some("ci".into());
        el.metadata.uid = Some("el-uid-1".into());
        el.metadata.labels =
            Some(BTreeMap::from([("team".to_string(), "infra".to_string())]));
        el
    }

    #[test]
    fn children_share_parent_identity_and_owner() {
        let out = DesiredStateBuilder::new("el:v1").build(&listener());
        for meta in [&out.deployment.metadata, &out.service.metadata] {
            assert_eq!(meta.name.as_deref(), Some("github"));
            assert_eq!(meta.namespace.as_deref(), Some("ci"));
            let owners = meta.owner_references.as_ref().unwrap();
            assert_eq!(owners.len(), 1);
            assert_eq!(owners[0].kind, "EventListener");
            assert_eq!(owners[0].api_version, "triggers.tekton.dev/v1alpha1");
            assert_eq!(owners[0].name, "github");
            assert_eq!(owners[0].uid, "el-uid-1");
            assert_eq!(owners[0].controller, Some(true));
            let labels = meta.labels.as_ref().unwrap();
            assert_eq!(labels["app"], "github");
            assert_eq!(labels["team"], "infra");
        }
    }

    #[test]
    fn deployment_runs_configured_image_with_sink_args() {
        let out = DesiredStateBuilder::new("el:v1").build(&listener());
        let spec = out.deployment.spec.unwrap();
        let pod = spec.template.spec.unwrap();
        assert_eq!(pod.service_account_name.as_deref(), Some("tekton-triggers"));
        assert_eq!(pod.containers.len(), 1);
        let c = &pod.containers[0];
        assert_eq!(c.name, "event-listener");
        assert_eq!(c.image.as_deref(), Some("el:v1"));
        assert_eq!(c.ports.as_ref().unwrap()[0].container_port, 8082);
        assert_eq!(
            c.args.as_deref().unwrap(),
            &["-el-name", "github", "-el-namespace", "ci", "-port", "8082"]
        );
        let selector = spec.selector.match_labels.unwrap();
        assert_eq!(
            selector,
            BTreeMap::from([("app".to_string(), "github".to_string())])
        );
        let pod_labels = spec.template.metadata.unwrap().labels.unwrap();
        assert_eq!(pod_labels["team"], "infra");
        for (k, v) in &selector {
            assert_eq!(pod_labels.get(k), Some(v));
        }
    }

    #[test]
    fn service_selects_deployment_pods_on_port_8082() {
        let out = DesiredStateBuilder::new("el:v1").build(&listener());
        let svc = out.service.spec.unwrap();
        assert_eq!(svc.type_.as_deref(), Some("ClusterIP"));
        assert!(svc.cluster_ip.is_none());
        let ports = svc.ports.unwrap();
        assert_eq!(ports.len(), 1);
        assert_eq!(ports[0].port, 8082);
        assert_eq!(ports[0].protocol.as_deref(), Some("TCP"));

        let pod_labels = out
            .deployment
            .spec
            .unwrap()
            .template
            .metadata
            .unwrap()
            .labels
            .unwrap();
        for (k, v) in svc.selector.unwrap() {
            assert_eq!(pod_labels.get(&k), Some(&v));
        }
    }

    #[test]
    fn equal_parents_render_identical_children() {
        let builder = DesiredStateBuilder::new("el:v1");
        let a = builder.build(&listener());
        let b = builder.build(&listener().clone());
        assert_eq!(
            serde_json::to_value(&a.deployment).unwrap(),
            serde_json::to_value(&b.deployment).unwrap()
        );
        assert_eq!(
            serde_json::to_value(&a.service).unwrap(),
            serde_json::to_value(&b.service).unwrap()
        );
    }

    #[test]
    fn missing_service_account_is_left_unset() {
        let mut el = listener();
        el.spec.service_account_name = None;
        let out = DesiredStateBuilder::new("el:v1").build(&el);
        let pod = out.deployment.spec.unwrap().template.spec.unwrap();
        assert!(pod.service_account_name.is_none());
    }
}
