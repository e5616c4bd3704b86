//! Azure provider-spec payload.

use k8s_openapi::api::core::v1::SecretReference;
use serde::{Deserialize, Serialize};

/// Azure cloud environment running US government regions.
pub const AZURE_US_GOVERNMENT_CLOUD: &str = "AzureUSGovernmentCloud";

/// Azure public cloud environment.
pub const AZURE_PUBLIC_CLOUD: &str = "AzurePublicCloud";

/// Exclusive upper bound for `osDisk.diskSizeGB`.
pub const AZURE_MAX_DISK_SIZE_GB: i32 = 32768;

/// Configuration for a machine backed by an Azure VM.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureMachineProviderSpec {
    /// Azure region the VM is created in.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub location: String,

    /// VM size, e.g. `Standard_D4s_V3`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub vm_size: String,

    /// Virtual network hosting the VM's NIC. Requires `subnet`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub vnet: String,

    /// Subnet within `vnet`. Requires `vnet`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub subnet: String,

    /// Resource group owning the virtual network.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub network_resource_group: String,

    /// Resource group the VM is created in.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub resource_group: String,

    /// Managed identity assigned to the VM.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub managed_identity: String,

    /// OS image, referenced either by resource ID or by marketplace
    /// coordinates (publisher/offer/sku/version).
    #[serde(default, skip_serializing_if = "Image::is_empty")]
    pub image: Image,

    /// Secret carrying the ignition user data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_data_secret: Option<SecretReference>,

    /// Secret carrying the cloud credentials.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials_secret: Option<SecretReference>,

    /// Operating system disk configuration.
    #[serde(default, skip_serializing_if = "OsDisk::is_empty")]
    pub os_disk: OsDisk,

    /// Whether the VM gets a public IP address.
    #[serde(default, rename = "publicIP", skip_serializing_if = "std::ops::Not::not")]
    pub public_ip: bool,

    /// Spot VM settings; presence requests a spot instance.
    #[serde(
        default,
        rename = "spotVMOptions",
        skip_serializing_if = "Option::is_none"
    )]
    pub spot_vm_options: Option<SpotVmOptions>,
}

/// OS image reference.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub publisher: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub offer: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sku: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,

    #[serde(default, rename = "resourceID", skip_serializing_if = "String::is_empty")]
    pub resource_id: String,
}

impl Image {
    pub fn is_empty(&self) -> bool {
        self == &Image::default()
    }

    /// Whether any marketplace coordinate is set alongside `resourceID`.
    pub fn has_marketplace_fields(&self) -> bool {
        !self.publisher.is_empty()
            || !self.offer.is_empty()
            || !self.sku.is_empty()
            || !self.version.is_empty()
    }
}

/// Operating system disk settings.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OsDisk {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub os_type: String,

    #[serde(default, rename = "diskSizeGB")]
    pub disk_size_gb: i32,

    #[serde(default, skip_serializing_if = "ManagedDiskParameters::is_empty")]
    pub managed_disk: ManagedDiskParameters,
}

impl OsDisk {
    pub fn is_empty(&self) -> bool {
        self == &OsDisk::default()
    }
}

/// Managed disk settings for the OS disk.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedDiskParameters {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub storage_account_type: String,
}

impl ManagedDiskParameters {
    pub fn is_empty(&self) -> bool {
        self.storage_account_type.is_empty()
    }
}

/// Spot VM settings.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotVmOptions {
    /// Maximum hourly price; unset accepts the current spot price.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<String>,
}
