//! GCP provider-spec payload.

use k8s_openapi::api::core::v1::LocalObjectReference;
use serde::{Deserialize, Serialize};

/// Disk types accepted by GCP, in rendered order.
pub const GCP_DISK_TYPES: [&str; 2] = ["pd-ssd", "pd-standard"];

/// Minimum GCP disk size in GB.
pub const GCP_MIN_DISK_SIZE_GB: i64 = 16;

/// Maximum GCP disk size in GB.
pub const GCP_MAX_DISK_SIZE_GB: i64 = 65536;

/// GPU model that only ships pre-attached to the A2 machine family.
pub const GCP_A100_GPU: &str = "nvidia-tesla-a100";

/// Machine-type prefix of the A2 family (pre-attached GPUs).
pub const GCP_A2_MACHINE_PREFIX: &str = "a2-";

/// Accepted `onHostMaintenance` values; `Terminate` is mandatory whenever
/// GPUs are attached.
pub const GCP_HOST_MAINTENANCE_MIGRATE: &str = "Migrate";
pub const GCP_HOST_MAINTENANCE_TERMINATE: &str = "Terminate";

pub const GCP_RESTART_POLICY_ALWAYS: &str = "Always";
pub const GCP_RESTART_POLICY_NEVER: &str = "Never";

/// Configuration for a machine backed by a GCE instance.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GcpMachineProviderSpec {
    /// GCP region, e.g. `us-central1`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub region: String,

    /// Zone within `region`, e.g. `us-central1-a`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub zone: String,

    /// Project the instance is created in.
    #[serde(default, rename = "projectID", skip_serializing_if = "String::is_empty")]
    pub project_id: String,

    /// GCE machine type, e.g. `n1-standard-4`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub machine_type: String,

    /// Network interfaces attached to the instance.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub network_interfaces: Vec<GcpNetworkInterface>,

    /// Disks attached to the instance.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disks: Vec<GcpDisk>,

    /// Service account the instance runs as; exactly one is expected.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub service_accounts: Vec<GcpServiceAccount>,

    /// Network tags applied to the instance.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Secret carrying the ignition user data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_data_secret: Option<LocalObjectReference>,

    /// Secret carrying the cloud credentials.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials_secret: Option<LocalObjectReference>,

    /// Guest accelerators attached to the instance; at most one entry.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub gpus: Vec<GcpGpuConfig>,

    /// `Migrate` or `Terminate`; must be `Terminate` when GPUs are attached.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub on_host_maintenance: String,

    /// `Always` or `Never`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub restart_policy: String,
}

/// A network interface attached to an instance.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GcpNetworkInterface {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub network: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub subnetwork: String,
}

/// A disk attached to an instance.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GcpDisk {
    #[serde(default)]
    pub auto_delete: bool,

    #[serde(default)]
    pub boot: bool,

    #[serde(default)]
    pub size_gb: i64,

    /// `pd-ssd` or `pd-standard`.
    #[serde(default, rename = "type", skip_serializing_if = "String::is_empty")]
    pub r#type: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub image: String,
}

/// Service account identity and OAuth scopes.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GcpServiceAccount {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub email: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<String>,
}

/// A guest accelerator request.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GcpGpuConfig {
    #[serde(default)]
    pub count: i32,

    #[serde(default, rename = "type", skip_serializing_if = "String::is_empty")]
    pub r#type: String,
}

impl GcpMachineProviderSpec {
    /// Whether the machine type belongs to the A2 family, which ships with
    /// pre-attached GPUs.
    pub fn is_a2_machine_type(&self) -> bool {
        self.machine_type.starts_with(GCP_A2_MACHINE_PREFIX)
    }

    /// Whether the instance will have GPUs, either requested explicitly or
    /// implied by the A2 machine family.
    pub fn has_gpus(&self) -> bool {
        !self.gpus.is_empty() || self.is_a2_machine_type()
    }
}
