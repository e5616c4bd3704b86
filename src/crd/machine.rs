//! Machine Custom Resource Definition.
//!
//! Defines the Machine CRD consumed by the admission webhooks. A Machine
//! describes a desired compute instance; the platform-specific portion of
//! the spec travels as an opaque payload in `providerSpec.value` and is
//! only interpreted by the webhook codec.

use k8s_openapi::apimachinery::pkg::runtime::RawExtension;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Well-known label identifying the cluster that owns a Machine.
pub const MACHINE_CLUSTER_ID_LABEL: &str = "machine.openshift.io/cluster-api-cluster";

/// Machine is the declarative description of a single compute instance.
///
/// Example:
/// ```yaml
/// apiVersion: machine.openshift.io/v1beta1
/// kind: Machine
/// metadata:
///   generateName: worker-
///   labels:
///     machine.openshift.io/cluster-api-cluster: my-cluster
/// spec:
///   providerSpec:
///     value:
///       ami:
///         id: ami-0123456789
/// ```
#[derive(CustomResource, Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "machine.openshift.io",
    version = "v1beta1",
    kind = "Machine",
    plural = "machines",
    status = "MachineStatus",
    namespaced,
    derive = "PartialEq",
    printcolumn = r#"{"name":"Phase", "type":"string", "jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct MachineSpec {
    /// Hooks that pause machine deletion until cleared by their owner.
    #[serde(default, skip_serializing_if = "LifecycleHooks::is_empty")]
    pub lifecycle_hooks: LifecycleHooks,

    /// Platform-specific machine configuration.
    #[serde(default)]
    pub provider_spec: ProviderSpec,
}

/// Observed state of a Machine. Populated by the machine controller; the
/// admission webhooks never touch it.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MachineStatus {
    /// Current lifecycle phase of the machine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,

    /// Terminal error encountered while provisioning, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Lifecycle hooks registered on a Machine, grouped by the deletion stage
/// they gate.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleHooks {
    /// Hooks that must clear before the machine's node is drained.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pre_drain: Vec<LifecycleHook>,

    /// Hooks that must clear before the instance is terminated.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pre_terminate: Vec<LifecycleHook>,
}

impl LifecycleHooks {
    pub fn is_empty(&self) -> bool {
        self.pre_drain.is_empty() && self.pre_terminate.is_empty()
    }
}

/// A named marker that pauses machine deletion until its owner removes it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleHook {
    /// Unique name of the hook within its stage.
    pub name: String,

    /// Identity of the controller responsible for clearing the hook.
    pub owner: String,
}

impl fmt::Display for LifecycleHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{Name:{} Owner:{}}}", self.name, self.owner)
    }
}

/// Envelope for the platform-specific configuration. The payload is opaque
/// to the API server; only the webhook codec understands its schema.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSpec {
    /// Encoded provider configuration for the machine's platform.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "preserve_arbitrary")]
    pub value: Option<RawExtension>,
}

/// Schema hook marking the provider-spec payload as free-form so the CRD
/// schema does not prune its fields.
fn preserve_arbitrary(_gen: &mut schemars::gen::SchemaGenerator) -> schemars::schema::Schema {
    let mut obj = schemars::schema::SchemaObject::default();
    obj.extensions.insert(
        "x-kubernetes-preserve-unknown-fields".to_string(),
        serde_json::json!(true),
    );
    schemars::schema::Schema::Object(obj)
}

impl Machine {
    /// The `cluster-id` label value, if any.
    pub fn cluster_id_label(&self) -> Option<&str> {
        self.metadata
            .labels
            .as_ref()
            .and_then(|l| l.get(MACHINE_CLUSTER_ID_LABEL))
            .map(String::as_str)
    }

    /// Whether the machine is marked for deletion.
    pub fn marked_for_deletion(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }
}
