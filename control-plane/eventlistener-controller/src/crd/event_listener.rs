use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(
    CustomResource, Deserialize, Serialize, Clone, Debug, JsonSchema, Default,
)]
#[kube(
    group = "triggers.tekton.dev",
    version = "v1alpha1",
    kind = "EventListener",
    plural = "eventlisteners",
    shortname = "el",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct EventListenerSpec {
    /// Service account the sink pods run as
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_name: Option<String>,
    /// Triggers served by the sink. Passed through untouched; the sink
    /// resolves them itself at request time.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub triggers: Vec<EventListenerTrigger>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct EventListenerTrigger {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binding: Option<TriggerRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<TriggerRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<TriggerParam>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct TriggerRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, JsonSchema, Default)]
pub struct TriggerParam {
    pub name: String,
    pub value: String,
}
