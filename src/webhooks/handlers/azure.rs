//! Azure machine validation and defaulting.
//!
//! Validation rule order: VM size, vnet/subnet pairing, image, user data
//! secret, credentials secret (existence is a warning), OS disk size,
//! disconnected-install public IP policy, GovCloud spot warning.

use k8s_openapi::api::core::v1::SecretReference;

use crate::crd::Machine;
use crate::providers::{
    AzureMachineProviderSpec, Image, AZURE_MAX_DISK_SIZE_GB, AZURE_US_GOVERNMENT_CLOUD,
};
use crate::webhooks::admission::AdmissionContext;
use crate::webhooks::codec;
use crate::webhooks::config::AdmissionConfig;
use crate::webhooks::fields::{FieldError, Findings};

use super::{
    check_credentials_secret, invalid_provider_spec, provider_spec_value_required,
    DEFAULT_SECRET_NAMESPACE, DEFAULT_USER_DATA_SECRET,
};

/// Default name of the Azure credentials secret.
pub const DEFAULT_AZURE_CREDENTIALS_SECRET: &str = "azure-cloud-credentials";

/// Default Azure VM size.
pub const DEFAULT_AZURE_VM_SIZE: &str = "Standard_D4s_V3";

pub fn default_vnet(cluster_id: &str) -> String {
    format!("{}-vnet", cluster_id)
}

pub fn default_subnet(cluster_id: &str) -> String {
    format!("{}-worker-subnet", cluster_id)
}

pub fn default_resource_group(cluster_id: &str) -> String {
    format!("{}-rg", cluster_id)
}

pub fn default_managed_identity(cluster_id: &str) -> String {
    format!("{}-identity", cluster_id)
}

pub fn default_image_resource_id(cluster_id: &str) -> String {
    format!(
        "/resourceGroups/{}-rg/providers/Microsoft.Compute/images/{}",
        cluster_id, cluster_id
    )
}

/// Validate an Azure provider spec.
pub async fn validate(machine: &Machine, ctx: &AdmissionContext<'_>) -> Findings {
    let mut findings = Findings::default();
    let spec: AzureMachineProviderSpec =
        match codec::decode(machine.spec.provider_spec.value.as_ref()) {
            Ok(Some(spec)) => spec,
            Ok(None) => {
                findings.error(provider_spec_value_required());
                return findings;
            }
            Err(err) => {
                findings.error(invalid_provider_spec(err));
                return findings;
            }
        };

    if spec.vm_size.is_empty() {
        findings.error(FieldError::required(
            "providerSpec.vmSize",
            "vmSize should be set to one of the supported Azure VM sizes",
        ));
    }

    if !spec.vnet.is_empty() && spec.subnet.is_empty() {
        findings.error(FieldError::required(
            "providerSpec.subnet",
            "must provide a subnet when a virtual network is specified",
        ));
    }
    if !spec.subnet.is_empty() && spec.vnet.is_empty() {
        findings.error(FieldError::required(
            "providerSpec.vnet",
            "must provide a virtual network when supplying subnets",
        ));
    }

    validate_image(&spec.image, &mut findings);

    match &spec.user_data_secret {
        None => findings.error(FieldError::required(
            "providerSpec.userDataSecret",
            "userDataSecret must be provided",
        )),
        Some(secret) if secret.name.as_deref().unwrap_or("").is_empty() => {
            findings.error(FieldError::required(
                "providerSpec.userDataSecret.name",
                "name must be provided",
            ));
        }
        Some(_) => {}
    }

    match &spec.credentials_secret {
        None => findings.error(FieldError::required(
            "providerSpec.credentialsSecret",
            "credentialsSecret must be provided",
        )),
        Some(secret) => {
            let namespace = secret.namespace.as_deref().unwrap_or("");
            let name = secret.name.as_deref().unwrap_or("");
            if namespace.is_empty() {
                findings.error(FieldError::required(
                    "providerSpec.credentialsSecret.namespace",
                    "namespace must be provided",
                ));
            }
            if name.is_empty() {
                findings.error(FieldError::required(
                    "providerSpec.credentialsSecret.name",
                    "name must be provided",
                ));
            } else if !namespace.is_empty() {
                // The reference carries its own namespace; the lookup uses
                // it rather than the machine's.
                check_credentials_secret(
                    &mut findings,
                    ctx.secrets,
                    "providerSpec.credentialsSecret",
                    name,
                    namespace,
                )
                .await;
            }
        }
    }

    let disk_size = spec.os_disk.disk_size_gb;
    if disk_size <= 0 || disk_size >= AZURE_MAX_DISK_SIZE_GB {
        findings.error(FieldError::invalid(
            "providerSpec.osDisk.diskSizeGB",
            disk_size,
            "diskSizeGB must be greater than zero and less than 32768",
        ));
    }

    if !ctx.config.dns.public_zone_present && spec.public_ip {
        findings.error(FieldError::forbidden(
            "providerSpec.publicIP",
            "publicIP is not allowed in Azure disconnected installation",
        ));
    }

    if spec.spot_vm_options.is_some() {
        let cloud_name = ctx
            .config
            .platform_status
            .azure
            .as_ref()
            .map(|azure| azure.cloud_name.as_str())
            .unwrap_or("");
        if cloud_name == AZURE_US_GOVERNMENT_CLOUD {
            findings.warn("spot VMs may not be supported when using GovCloud region");
        }
    }

    findings
}

fn validate_image(image: &Image, findings: &mut Findings) {
    if image.is_empty() {
        findings.error(FieldError::required(
            "providerSpec.image",
            "an image reference must be provided",
        ));
        return;
    }

    if !image.resource_id.is_empty() {
        if image.has_marketplace_fields() {
            findings.error(FieldError::required(
                "providerSpec.image.resourceID",
                "resourceID is already specified, other fields such as [Offer, Publisher, SKU, Version] should not be set",
            ));
        }
        return;
    }

    if image.offer.is_empty() {
        findings.error(FieldError::required(
            "providerSpec.image.Offer",
            "Offer must be provided",
        ));
    }
    if image.sku.is_empty() {
        findings.error(FieldError::required(
            "providerSpec.image.SKU",
            "SKU must be provided",
        ));
    }
    if image.version.is_empty() {
        findings.error(FieldError::required(
            "providerSpec.image.Version",
            "Version must be provided",
        ));
    }
    if image.publisher.is_empty() {
        findings.error(FieldError::required(
            "providerSpec.image.Publisher",
            "Publisher must be provided",
        ));
    }
}

/// Fill defaults for fields the spec leaves unset. Secret references keep
/// any name or namespace the user already provided.
pub fn apply_defaults(spec: &mut AzureMachineProviderSpec, config: &AdmissionConfig) {
    let cluster_id = config.cluster_id.as_str();

    if spec.vm_size.is_empty() {
        spec.vm_size = DEFAULT_AZURE_VM_SIZE.to_string();
    }

    // vnet and subnet are only defaulted as a pair
    if spec.vnet.is_empty() && spec.subnet.is_empty() {
        spec.vnet = default_vnet(cluster_id);
        spec.subnet = default_subnet(cluster_id);
    }

    if spec.network_resource_group.is_empty() {
        spec.network_resource_group = default_resource_group(cluster_id);
    }
    if spec.resource_group.is_empty() {
        spec.resource_group = default_resource_group(cluster_id);
    }
    if spec.managed_identity.is_empty() {
        spec.managed_identity = default_managed_identity(cluster_id);
    }

    if spec.image.is_empty() {
        spec.image.resource_id = default_image_resource_id(cluster_id);
    }

    match &mut spec.user_data_secret {
        None => {
            spec.user_data_secret = Some(SecretReference {
                name: Some(DEFAULT_USER_DATA_SECRET.to_string()),
                namespace: Some(DEFAULT_SECRET_NAMESPACE.to_string()),
            });
        }
        Some(secret) => {
            if secret.name.as_deref().unwrap_or("").is_empty() {
                secret.name = Some(DEFAULT_USER_DATA_SECRET.to_string());
            }
            if secret.namespace.as_deref().unwrap_or("").is_empty() {
                secret.namespace = Some(DEFAULT_SECRET_NAMESPACE.to_string());
            }
        }
    }

    match &mut spec.credentials_secret {
        None => {
            spec.credentials_secret = Some(SecretReference {
                name: Some(DEFAULT_AZURE_CREDENTIALS_SECRET.to_string()),
                namespace: Some(DEFAULT_SECRET_NAMESPACE.to_string()),
            });
        }
        Some(secret) => {
            if secret.name.as_deref().unwrap_or("").is_empty() {
                secret.name = Some(DEFAULT_AZURE_CREDENTIALS_SECRET.to_string());
            }
            if secret.namespace.as_deref().unwrap_or("").is_empty() {
                secret.namespace = Some(DEFAULT_SECRET_NAMESPACE.to_string());
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::crd::MachineSpec;
    use crate::providers::{OsDisk, PlatformType, SpotVmOptions, AZURE_PUBLIC_CLOUD};
    use crate::webhooks::config::{
        AzurePlatformStatus, DnsConfig, FixedSecretReader, PlatformStatus,
    };

    const NAMESPACE: &str = "azure-validation-test";

    fn valid_spec() -> AzureMachineProviderSpec {
        AzureMachineProviderSpec {
            vm_size: "vmSize".to_string(),
            image: Image {
                resource_id: "resourceID".to_string(),
                ..Default::default()
            },
            user_data_secret: Some(SecretReference {
                name: Some("name".to_string()),
                ..Default::default()
            }),
            credentials_secret: Some(SecretReference {
                name: Some("name".to_string()),
                namespace: Some(NAMESPACE.to_string()),
            }),
            os_disk: OsDisk {
                disk_size_gb: 1,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn test_config(cloud_name: &str, public_zone: bool) -> AdmissionConfig {
        AdmissionConfig {
            platform: PlatformType::Azure,
            cluster_id: "clusterID".to_string(),
            platform_status: PlatformStatus {
                azure: Some(AzurePlatformStatus {
                    cloud_name: cloud_name.to_string(),
                }),
                ..Default::default()
            },
            dns: DnsConfig {
                public_zone_present: public_zone,
            },
        }
    }

    fn machine_with(spec: &AzureMachineProviderSpec) -> Machine {
        let mut machine = Machine::new("test", MachineSpec::default());
        machine.metadata.namespace = Some(NAMESPACE.to_string());
        machine.spec.provider_spec.value = Some(codec::encode(spec).unwrap());
        machine
    }

    async fn run_validate(spec: &AzureMachineProviderSpec) -> Findings {
        run_validate_with(spec, test_config(AZURE_PUBLIC_CLOUD, true)).await
    }

    async fn run_validate_with(
        spec: &AzureMachineProviderSpec,
        config: AdmissionConfig,
    ) -> Findings {
        let secrets = FixedSecretReader::new().with_secret(NAMESPACE, "name");
        let machine = machine_with(spec);
        let ctx = AdmissionContext {
            config: &config,
            secrets: &secrets,
            machine_namespace: NAMESPACE,
        };
        validate(&machine, &ctx).await
    }

    #[tokio::test]
    async fn test_all_required_fields_succeeds() {
        let findings = run_validate(&valid_spec()).await;
        assert!(findings.is_allowed());
        assert!(findings.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_missing_vm_size_fails() {
        let mut spec = valid_spec();
        spec.vm_size = String::new();
        let findings = run_validate(&spec).await;
        assert_eq!(
            findings.message().unwrap(),
            "providerSpec.vmSize: Required value: vmSize should be set to one of the supported Azure VM sizes"
        );
    }

    #[tokio::test]
    async fn test_vnet_without_subnet_fails() {
        let mut spec = valid_spec();
        spec.vnet = "vnet".to_string();
        spec.network_resource_group = "nrg".to_string();
        let findings = run_validate(&spec).await;
        assert_eq!(
            findings.message().unwrap(),
            "providerSpec.subnet: Required value: must provide a subnet when a virtual network is specified"
        );
    }

    #[tokio::test]
    async fn test_subnet_without_vnet_fails() {
        let mut spec = valid_spec();
        spec.subnet = "subnet".to_string();
        spec.network_resource_group = "nrg".to_string();
        let findings = run_validate(&spec).await;
        assert_eq!(
            findings.message().unwrap(),
            "providerSpec.vnet: Required value: must provide a virtual network when supplying subnets"
        );
    }

    #[tokio::test]
    async fn test_missing_image_fails() {
        let mut spec = valid_spec();
        spec.image = Image::default();
        let findings = run_validate(&spec).await;
        assert_eq!(
            findings.message().unwrap(),
            "providerSpec.image: Required value: an image reference must be provided"
        );
    }

    #[tokio::test]
    async fn test_resource_id_with_marketplace_fields_fails() {
        let mut spec = valid_spec();
        spec.image = Image {
            resource_id: "rid".to_string(),
            sku: "sku-rand".to_string(),
            offer: "base-offer".to_string(),
            version: "1".to_string(),
            publisher: "test".to_string(),
        };
        let findings = run_validate(&spec).await;
        assert_eq!(
            findings.message().unwrap(),
            "providerSpec.image.resourceID: Required value: resourceID is already specified, other fields such as [Offer, Publisher, SKU, Version] should not be set"
        );
    }

    #[tokio::test]
    async fn test_marketplace_image_missing_fields_fail_individually() {
        let cases = [
            (
                Image {
                    version: "1".to_string(),
                    sku: "sku-rand".to_string(),
                    publisher: "test".to_string(),
                    ..Default::default()
                },
                "providerSpec.image.Offer: Required value: Offer must be provided",
            ),
            (
                Image {
                    offer: "base-offer".to_string(),
                    version: "1".to_string(),
                    publisher: "test".to_string(),
                    ..Default::default()
                },
                "providerSpec.image.SKU: Required value: SKU must be provided",
            ),
            (
                Image {
                    sku: "sku-rand".to_string(),
                    offer: "base-offer".to_string(),
                    publisher: "test".to_string(),
                    ..Default::default()
                },
                "providerSpec.image.Version: Required value: Version must be provided",
            ),
            (
                Image {
                    sku: "sku-rand".to_string(),
                    offer: "base-offer".to_string(),
                    version: "1".to_string(),
                    ..Default::default()
                },
                "providerSpec.image.Publisher: Required value: Publisher must be provided",
            ),
        ];

        for (image, expected) in cases {
            let mut spec = valid_spec();
            spec.image = image;
            let findings = run_validate(&spec).await;
            assert_eq!(findings.message().unwrap(), expected);
        }
    }

    #[tokio::test]
    async fn test_complete_marketplace_image_succeeds() {
        let mut spec = valid_spec();
        spec.image = Image {
            sku: "sku-rand".to_string(),
            offer: "base-offer".to_string(),
            version: "1".to_string(),
            publisher: "test".to_string(),
            ..Default::default()
        };
        let findings = run_validate(&spec).await;
        assert!(findings.is_allowed());
    }

    #[tokio::test]
    async fn test_missing_user_data_secret_fails() {
        let mut spec = valid_spec();
        spec.user_data_secret = None;
        let findings = run_validate(&spec).await;
        assert_eq!(
            findings.message().unwrap(),
            "providerSpec.userDataSecret: Required value: userDataSecret must be provided"
        );
    }

    #[tokio::test]
    async fn test_missing_user_data_secret_name_fails() {
        let mut spec = valid_spec();
        spec.user_data_secret = Some(SecretReference::default());
        let findings = run_validate(&spec).await;
        assert_eq!(
            findings.message().unwrap(),
            "providerSpec.userDataSecret.name: Required value: name must be provided"
        );
    }

    #[tokio::test]
    async fn test_missing_credentials_secret_fails() {
        let mut spec = valid_spec();
        spec.credentials_secret = None;
        let findings = run_validate(&spec).await;
        assert_eq!(
            findings.message().unwrap(),
            "providerSpec.credentialsSecret: Required value: credentialsSecret must be provided"
        );
    }

    #[tokio::test]
    async fn test_missing_credentials_secret_namespace_fails() {
        let mut spec = valid_spec();
        spec.credentials_secret = Some(SecretReference {
            name: Some("name".to_string()),
            ..Default::default()
        });
        let findings = run_validate(&spec).await;
        assert_eq!(
            findings.message().unwrap(),
            "providerSpec.credentialsSecret.namespace: Required value: namespace must be provided"
        );
    }

    #[tokio::test]
    async fn test_missing_credentials_secret_name_fails() {
        let mut spec = valid_spec();
        spec.credentials_secret = Some(SecretReference {
            namespace: Some(NAMESPACE.to_string()),
            ..Default::default()
        });
        let findings = run_validate(&spec).await;
        assert_eq!(
            findings.message().unwrap(),
            "providerSpec.credentialsSecret.name: Required value: name must be provided"
        );
    }

    #[tokio::test]
    async fn test_nonexistent_credentials_secret_warns() {
        let mut spec = valid_spec();
        spec.credentials_secret = Some(SecretReference {
            name: Some("does-not-exist".to_string()),
            namespace: Some(NAMESPACE.to_string()),
        });
        let findings = run_validate(&spec).await;
        assert!(findings.is_allowed());
        assert_eq!(
            findings.warnings,
            vec![
                "providerSpec.credentialsSecret: Invalid value: \"does-not-exist\": not found. Expected CredentialsSecret to exist"
            ]
        );
    }

    #[tokio::test]
    async fn test_zero_disk_size_fails() {
        let mut spec = valid_spec();
        spec.os_disk = OsDisk {
            os_type: "osType".to_string(),
            ..Default::default()
        };
        let findings = run_validate(&spec).await;
        assert_eq!(
            findings.message().unwrap(),
            "providerSpec.osDisk.diskSizeGB: Invalid value: 0: diskSizeGB must be greater than zero and less than 32768"
        );
    }

    #[tokio::test]
    async fn test_oversized_disk_fails() {
        let mut spec = valid_spec();
        spec.os_disk.disk_size_gb = AZURE_MAX_DISK_SIZE_GB;
        let findings = run_validate(&spec).await;
        assert!(!findings.is_allowed());
    }

    #[tokio::test]
    async fn test_disconnected_install_forbids_public_ip() {
        let mut spec = valid_spec();
        spec.os_disk.disk_size_gb = 128;
        spec.public_ip = true;
        let findings = run_validate_with(&spec, test_config(AZURE_PUBLIC_CLOUD, false)).await;
        assert_eq!(
            findings.message().unwrap(),
            "providerSpec.publicIP: Forbidden: publicIP is not allowed in Azure disconnected installation"
        );
    }

    #[tokio::test]
    async fn test_disconnected_install_without_public_ip_succeeds() {
        let mut spec = valid_spec();
        spec.os_disk.disk_size_gb = 128;
        let findings = run_validate_with(&spec, test_config(AZURE_PUBLIC_CLOUD, false)).await;
        assert!(findings.is_allowed());
    }

    #[tokio::test]
    async fn test_gov_cloud_spot_vms_warn() {
        let mut spec = valid_spec();
        spec.spot_vm_options = Some(SpotVmOptions::default());
        let findings =
            run_validate_with(&spec, test_config(AZURE_US_GOVERNMENT_CLOUD, true)).await;
        assert!(findings.is_allowed());
        assert_eq!(
            findings.warnings,
            vec!["spot VMs may not be supported when using GovCloud region"]
        );
    }

    #[tokio::test]
    async fn test_public_cloud_spot_vms_silent() {
        let mut spec = valid_spec();
        spec.spot_vm_options = Some(SpotVmOptions::default());
        let findings = run_validate_with(&spec, test_config(AZURE_PUBLIC_CLOUD, true)).await;
        assert!(findings.is_allowed());
        assert!(findings.warnings.is_empty());
    }

    #[test]
    fn test_defaults_fill_absent_fields() {
        let mut spec = AzureMachineProviderSpec::default();
        apply_defaults(&mut spec, &test_config(AZURE_PUBLIC_CLOUD, true));

        assert_eq!(spec.vm_size, DEFAULT_AZURE_VM_SIZE);
        assert_eq!(spec.vnet, "clusterID-vnet");
        assert_eq!(spec.subnet, "clusterID-worker-subnet");
        assert_eq!(spec.network_resource_group, "clusterID-rg");
        assert_eq!(spec.resource_group, "clusterID-rg");
        assert_eq!(spec.managed_identity, "clusterID-identity");
        assert_eq!(
            spec.image.resource_id,
            "/resourceGroups/clusterID-rg/providers/Microsoft.Compute/images/clusterID"
        );

        let user_data = spec.user_data_secret.unwrap();
        assert_eq!(user_data.name.as_deref(), Some(DEFAULT_USER_DATA_SECRET));
        assert_eq!(user_data.namespace.as_deref(), Some(DEFAULT_SECRET_NAMESPACE));

        let credentials = spec.credentials_secret.unwrap();
        assert_eq!(
            credentials.name.as_deref(),
            Some(DEFAULT_AZURE_CREDENTIALS_SECRET)
        );
        assert_eq!(
            credentials.namespace.as_deref(),
            Some(DEFAULT_SECRET_NAMESPACE)
        );
    }

    #[test]
    fn test_defaults_do_not_override_image() {
        let image = Image {
            offer: "test-offer".to_string(),
            sku: "test-sku".to_string(),
            publisher: "base-publisher".to_string(),
            version: "1".to_string(),
            ..Default::default()
        };
        let mut spec = AzureMachineProviderSpec {
            image: image.clone(),
            ..Default::default()
        };
        apply_defaults(&mut spec, &test_config(AZURE_PUBLIC_CLOUD, true));
        assert_eq!(spec.image, image);
    }

    #[test]
    fn test_defaults_do_not_override_network_resource_group() {
        let mut spec = AzureMachineProviderSpec {
            network_resource_group: "nrg".to_string(),
            ..Default::default()
        };
        apply_defaults(&mut spec, &test_config(AZURE_PUBLIC_CLOUD, true));
        assert_eq!(spec.network_resource_group, "nrg");
    }

    #[test]
    fn test_defaults_preserve_partial_secret_references() {
        let mut spec = AzureMachineProviderSpec {
            user_data_secret: Some(SecretReference {
                name: Some("foo".to_string()),
                ..Default::default()
            }),
            credentials_secret: Some(SecretReference {
                namespace: Some("foo".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        apply_defaults(&mut spec, &test_config(AZURE_PUBLIC_CLOUD, true));

        let user_data = spec.user_data_secret.unwrap();
        assert_eq!(user_data.name.as_deref(), Some("foo"));
        assert_eq!(user_data.namespace.as_deref(), Some(DEFAULT_SECRET_NAMESPACE));

        let credentials = spec.credentials_secret.unwrap();
        assert_eq!(
            credentials.name.as_deref(),
            Some(DEFAULT_AZURE_CREDENTIALS_SECRET)
        );
        assert_eq!(credentials.namespace.as_deref(), Some("foo"));
    }

    #[test]
    fn test_defaults_only_fill_vnet_subnet_together() {
        let mut spec = AzureMachineProviderSpec {
            vnet: "vnet".to_string(),
            ..Default::default()
        };
        apply_defaults(&mut spec, &test_config(AZURE_PUBLIC_CLOUD, true));
        assert_eq!(spec.vnet, "vnet");
        assert!(spec.subnet.is_empty());
    }

    #[test]
    fn test_defaults_are_idempotent() {
        let mut spec = AzureMachineProviderSpec::default();
        apply_defaults(&mut spec, &test_config(AZURE_PUBLIC_CLOUD, true));
        let once = spec.clone();
        apply_defaults(&mut spec, &test_config(AZURE_PUBLIC_CLOUD, true));
        assert_eq!(spec, once);
    }
}
