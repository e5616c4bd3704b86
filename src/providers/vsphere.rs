//! vSphere provider-spec payload.

use k8s_openapi::api::core::v1::LocalObjectReference;
use serde::{Deserialize, Serialize};

/// Minimum vCPU count below which nodes may not boot.
pub const VSPHERE_MIN_CPU: i32 = 2;

/// Recommended minimum memory in MiB.
pub const VSPHERE_MIN_MEMORY_MIB: i64 = 2048;

/// Recommended minimum disk size in GiB.
pub const VSPHERE_MIN_DISK_GIB: i32 = 120;

/// Configuration for a machine backed by a vSphere VM.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VSphereMachineProviderSpec {
    /// Name of the VM template the machine is cloned from.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub template: String,

    /// vCenter placement of the VM.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace: Option<Workspace>,

    /// Virtual network devices attached to the VM.
    #[serde(default, skip_serializing_if = "NetworkSpec::is_empty")]
    pub network: NetworkSpec,

    /// Number of virtual CPUs.
    #[serde(default, rename = "numCPUs", skip_serializing_if = "is_zero_i32")]
    pub num_cpus: i32,

    /// Memory size in MiB.
    #[serde(default, rename = "memoryMiB", skip_serializing_if = "is_zero_i64")]
    pub memory_mib: i64,

    /// Root disk size in GiB.
    #[serde(default, rename = "diskGiB", skip_serializing_if = "is_zero_i32")]
    pub disk_gib: i32,

    /// Secret carrying the ignition user data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_data_secret: Option<LocalObjectReference>,

    /// Secret carrying the vCenter credentials.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials_secret: Option<LocalObjectReference>,
}

fn is_zero_i32(v: &i32) -> bool {
    *v == 0
}

fn is_zero_i64(v: &i64) -> bool {
    *v == 0
}

/// vCenter placement: server, datacenter and optional folder/datastore.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub server: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub datacenter: String,

    /// Absolute VM folder path; must live under `/<datacenter>/vm/`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub folder: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub datastore: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub resource_pool: String,
}

/// Network devices for a VM.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub devices: Vec<NetworkDeviceSpec>,
}

impl NetworkSpec {
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

/// A single virtual network device.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkDeviceSpec {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub network_name: String,
}
