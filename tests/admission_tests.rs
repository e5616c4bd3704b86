//! End-to-end admission scenarios exercising the full engine: defaulting,
//! platform validation, and cross-platform policies through the
//! orchestrator entry point.

use std::sync::Arc;

use k8s_openapi::api::core::v1::{LocalObjectReference, SecretReference};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;

use machine_admission_webhook::crd::{
    LifecycleHook, LifecycleHooks, Machine, MachineSpec, MACHINE_CLUSTER_ID_LABEL,
};
use machine_admission_webhook::providers::{
    AwsMachineProviderConfig, AwsResourceReference, AzureMachineProviderSpec, GcpMachineProviderSpec,
    OsDisk, Placement, PlatformType, VSphereMachineProviderSpec,
};
use machine_admission_webhook::webhooks::codec;
use machine_admission_webhook::webhooks::config::{
    AdmissionConfig, AwsPlatformStatus, DnsConfig, FixedSecretReader, GcpPlatformStatus,
    PlatformStatus,
};
use machine_admission_webhook::webhooks::Operation;
use machine_admission_webhook::MachineAdmission;

const NAMESPACE: &str = "admission-test";

fn admission_for(platform: PlatformType, cluster_id: &str, disconnected: bool) -> MachineAdmission {
    let config = AdmissionConfig {
        platform,
        cluster_id: cluster_id.to_string(),
        platform_status: PlatformStatus {
            aws: Some(AwsPlatformStatus {
                region: "region".to_string(),
            }),
            gcp: Some(GcpPlatformStatus {
                project_id: "gcp-project-id".to_string(),
            }),
            ..Default::default()
        },
        dns: DnsConfig {
            public_zone_present: !disconnected,
        },
    };
    let secrets = FixedSecretReader::new()
        .with_secret(NAMESPACE, "aws-cloud-credentials")
        .with_secret(NAMESPACE, "gcp-cloud-credentials")
        .with_secret(NAMESPACE, "vsphere-cloud-credentials")
        .with_secret("openshift-machine-api", "azure-cloud-credentials");
    MachineAdmission::new(config, Arc::new(secrets))
}

fn machine_with_payload<T: serde::Serialize>(spec: &T) -> Machine {
    let mut machine = Machine::new("machine-creation", MachineSpec::default());
    machine.metadata.namespace = Some(NAMESPACE.to_string());
    machine.spec.provider_spec.value =
        Some(codec::encode(spec).expect("provider spec must encode"));
    machine
}

fn valid_aws_spec() -> AwsMachineProviderConfig {
    AwsMachineProviderConfig {
        ami: AwsResourceReference {
            id: Some("ami".to_string()),
            ..Default::default()
        },
        instance_type: "m5.large".to_string(),
        user_data_secret: Some(LocalObjectReference {
            name: "worker-user-data".to_string(),
        }),
        credentials_secret: Some(LocalObjectReference {
            name: "aws-cloud-credentials".to_string(),
        }),
        placement: Placement {
            region: "region".to_string(),
            ..Default::default()
        },
        ..Default::default()
    }
}

#[tokio::test]
async fn aws_minimal_create_is_defaulted_and_allowed() {
    let admission = admission_for(PlatformType::Aws, "aws-cluster", false);
    let spec = AwsMachineProviderConfig {
        ami: AwsResourceReference {
            id: Some("ami".to_string()),
            ..Default::default()
        },
        ..Default::default()
    };
    let machine = machine_with_payload(&spec);

    let verdict = admission.admit(Operation::Create, &machine, None).await;
    assert!(verdict.allowed(), "errors: {:?}", verdict.errors);
    assert!(verdict
        .warnings
        .iter()
        .any(|w| w.starts_with("providerSpec.subnet:")));
    assert!(verdict
        .warnings
        .iter()
        .any(|w| w.starts_with("providerSpec.iamInstanceProfile:")));

    let mutated = verdict.mutated.expect("defaulting must mutate");
    let labels = mutated.metadata.labels.expect("labels must be set");
    assert_eq!(
        labels.get(MACHINE_CLUSTER_ID_LABEL).map(String::as_str),
        Some("aws-cluster")
    );

    let defaulted: AwsMachineProviderConfig =
        codec::decode(mutated.spec.provider_spec.value.as_ref())
            .expect("payload must decode")
            .expect("payload must be present");
    assert_eq!(defaulted.placement.region, "region");
    assert_eq!(
        defaulted.user_data_secret.unwrap().name.as_str(),
        "worker-user-data"
    );
    assert_eq!(
        defaulted.credentials_secret.unwrap().name.as_str(),
        "aws-cloud-credentials"
    );
}

#[tokio::test]
async fn nil_provider_spec_value_is_denied() {
    for platform in [
        PlatformType::Aws,
        PlatformType::Azure,
        PlatformType::Gcp,
        PlatformType::VSphere,
    ] {
        let admission = admission_for(platform, "cluster", false);
        let machine = Machine::new("machine-creation", MachineSpec::default());

        let verdict = admission.admit(Operation::Create, &machine, None).await;
        assert!(!verdict.allowed());
        assert_eq!(
            verdict.message().unwrap(),
            "providerSpec.value: Required value: a value must be provided"
        );
    }
}

#[tokio::test]
async fn azure_disconnected_install_denies_public_ip() {
    let admission = admission_for(PlatformType::Azure, "azure-cluster", true);
    let spec = AzureMachineProviderSpec {
        os_disk: OsDisk {
            disk_size_gb: 128,
            ..Default::default()
        },
        public_ip: true,
        ..Default::default()
    };
    let machine = machine_with_payload(&spec);

    let verdict = admission.admit(Operation::Create, &machine, None).await;
    assert!(!verdict.allowed());
    assert_eq!(
        verdict.message().unwrap(),
        "providerSpec.publicIP: Forbidden: publicIP is not allowed in Azure disconnected installation"
    );
}

#[tokio::test]
async fn azure_disconnected_install_without_public_ip_is_allowed() {
    let admission = admission_for(PlatformType::Azure, "azure-cluster", true);
    let spec = AzureMachineProviderSpec {
        os_disk: OsDisk {
            disk_size_gb: 128,
            ..Default::default()
        },
        ..Default::default()
    };
    let machine = machine_with_payload(&spec);

    let verdict = admission.admit(Operation::Create, &machine, None).await;
    assert!(verdict.allowed(), "errors: {:?}", verdict.errors);
}

#[tokio::test]
async fn azure_create_defaults_cluster_derived_names() {
    let admission = admission_for(PlatformType::Azure, "azure-cluster", false);
    let spec = AzureMachineProviderSpec {
        os_disk: OsDisk {
            disk_size_gb: 128,
            ..Default::default()
        },
        ..Default::default()
    };
    let machine = machine_with_payload(&spec);

    let verdict = admission.admit(Operation::Create, &machine, None).await;
    assert!(verdict.allowed(), "errors: {:?}", verdict.errors);

    let mutated = verdict.mutated.expect("defaulting must mutate");
    let defaulted: AzureMachineProviderSpec =
        codec::decode(mutated.spec.provider_spec.value.as_ref())
            .unwrap()
            .unwrap();
    assert_eq!(defaulted.vnet, "azure-cluster-vnet");
    assert_eq!(defaulted.subnet, "azure-cluster-worker-subnet");
    assert_eq!(defaulted.resource_group, "azure-cluster-rg");
}

#[tokio::test]
async fn gcp_zone_outside_region_is_denied() {
    let admission = admission_for(PlatformType::Gcp, "gcp-cluster", false);
    let spec = GcpMachineProviderSpec {
        region: "region".to_string(),
        zone: "zone".to_string(),
        ..Default::default()
    };
    let machine = machine_with_payload(&spec);

    let verdict = admission.admit(Operation::Create, &machine, None).await;
    assert!(!verdict.allowed());
    assert_eq!(
        verdict.message().unwrap(),
        "providerSpec.zone: Invalid value: \"zone\": zone not in configured region (region)"
    );
}

#[tokio::test]
async fn gcp_create_with_region_and_zone_is_allowed() {
    let admission = admission_for(PlatformType::Gcp, "gcp-cluster", false);
    let spec = GcpMachineProviderSpec {
        region: "region".to_string(),
        zone: "region-zone".to_string(),
        ..Default::default()
    };
    let machine = machine_with_payload(&spec);

    let verdict = admission.admit(Operation::Create, &machine, None).await;
    assert!(verdict.allowed(), "errors: {:?}", verdict.errors);

    // Defaulting fills the topology; the engine reports the missing
    // service account as advisory only.
    assert!(verdict
        .warnings
        .iter()
        .any(|w| w.starts_with("providerSpec.serviceAccounts:")));
}

#[tokio::test]
async fn vsphere_empty_spec_reports_bracketed_error_list() {
    let admission = admission_for(PlatformType::VSphere, "vsphere-cluster", false);
    let machine = machine_with_payload(&VSphereMachineProviderSpec::default());

    let verdict = admission.admit(Operation::Create, &machine, None).await;
    assert!(!verdict.allowed());
    assert_eq!(
        verdict.message().unwrap(),
        "[providerSpec.template: Required value: template must be provided, providerSpec.workspace: Required value: workspace must be provided, providerSpec.network.devices: Required value: at least 1 network device must be provided]"
    );
}

#[tokio::test]
async fn unknown_platform_is_allowed_with_warning() {
    let admission = admission_for(
        PlatformType::Other("BareMetal".to_string()),
        "cluster",
        false,
    );
    let machine = machine_with_payload(&serde_json::json!({"anything": "goes"}));

    let verdict = admission.admit(Operation::Create, &machine, None).await;
    assert!(verdict.allowed());
    assert_eq!(
        verdict.warnings,
        vec!["platform BareMetal not recognized; machine not validated"]
    );
}

fn deleting_machine(hooks: LifecycleHooks) -> Machine {
    let mut machine = machine_with_payload(&valid_aws_spec());
    machine.spec.lifecycle_hooks = hooks;
    machine.metadata.deletion_timestamp = Some(Time(Default::default()));
    machine
}

#[tokio::test]
async fn adding_lifecycle_hook_after_deletion_is_denied() {
    let admission = admission_for(PlatformType::Aws, "aws-cluster", false);
    let old = deleting_machine(LifecycleHooks::default());
    let new = deleting_machine(LifecycleHooks {
        pre_drain: vec![LifecycleHook {
            name: "pre-drain".to_string(),
            owner: "pre-drain-owner".to_string(),
        }],
        ..Default::default()
    });

    let verdict = admission.admit(Operation::Update, &new, Some(&old)).await;
    assert!(!verdict.allowed());
    assert_eq!(
        verdict.message().unwrap(),
        "spec.lifecycleHooks.preDrain: Forbidden: pre-drain hooks are immutable when machine is marked for deletion: the following hooks are new or changed: [{Name:pre-drain Owner:pre-drain-owner}]"
    );
}

#[tokio::test]
async fn removing_lifecycle_hook_after_deletion_is_allowed() {
    let admission = admission_for(PlatformType::Aws, "aws-cluster", false);
    let old = deleting_machine(LifecycleHooks {
        pre_drain: vec![LifecycleHook {
            name: "pre-drain".to_string(),
            owner: "pre-drain-owner".to_string(),
        }],
        ..Default::default()
    });
    let new = deleting_machine(LifecycleHooks::default());

    let verdict = admission.admit(Operation::Update, &new, Some(&old)).await;
    assert!(verdict.allowed(), "errors: {:?}", verdict.errors);
}

#[tokio::test]
async fn adding_lifecycle_hook_before_deletion_is_allowed() {
    let admission = admission_for(PlatformType::Aws, "aws-cluster", false);
    let old = machine_with_payload(&valid_aws_spec());
    let mut new = machine_with_payload(&valid_aws_spec());
    new.spec.lifecycle_hooks.pre_drain = vec![LifecycleHook {
        name: "pre-drain".to_string(),
        owner: "pre-drain-owner".to_string(),
    }];

    let verdict = admission.admit(Operation::Update, &new, Some(&old)).await;
    assert!(verdict.allowed(), "errors: {:?}", verdict.errors);
}

#[tokio::test]
async fn update_removing_required_field_is_denied() {
    let admission = admission_for(PlatformType::Aws, "aws-cluster", false);
    let old = machine_with_payload(&valid_aws_spec());
    let mut broken = valid_aws_spec();
    broken.instance_type = String::new();
    let new = machine_with_payload(&broken);

    let verdict = admission.admit(Operation::Update, &new, Some(&old)).await;
    assert!(!verdict.allowed());
    assert_eq!(
        verdict.message().unwrap(),
        "providerSpec.instanceType: Required value: expected providerSpec.instanceType to be populated"
    );
}

#[tokio::test]
async fn azure_update_preserves_user_supplied_secret_names() {
    let admission = admission_for(PlatformType::Azure, "azure-cluster", false);
    let spec = AzureMachineProviderSpec {
        vm_size: "vmSize".to_string(),
        image: machine_admission_webhook::providers::Image {
            resource_id: "rid".to_string(),
            ..Default::default()
        },
        user_data_secret: Some(SecretReference {
            name: Some("custom-user-data".to_string()),
            ..Default::default()
        }),
        credentials_secret: Some(SecretReference {
            name: Some("azure-cloud-credentials".to_string()),
            namespace: Some("openshift-machine-api".to_string()),
        }),
        os_disk: OsDisk {
            disk_size_gb: 128,
            ..Default::default()
        },
        ..Default::default()
    };
    let machine = machine_with_payload(&spec);

    let verdict = admission.admit(Operation::Create, &machine, None).await;
    assert!(verdict.allowed(), "errors: {:?}", verdict.errors);

    let mutated = verdict.mutated.expect("namespace defaulting must mutate");
    let defaulted: AzureMachineProviderSpec =
        codec::decode(mutated.spec.provider_spec.value.as_ref())
            .unwrap()
            .unwrap();
    assert_eq!(
        defaulted.user_data_secret.unwrap().name.as_deref(),
        Some("custom-user-data")
    );
}

#[tokio::test]
async fn verdicts_are_deterministic() {
    let admission = admission_for(PlatformType::VSphere, "vsphere-cluster", false);
    let machine = machine_with_payload(&VSphereMachineProviderSpec::default());

    let first = admission.admit(Operation::Create, &machine, None).await;
    let second = admission.admit(Operation::Create, &machine, None).await;
    assert_eq!(first.message(), second.message());
    assert_eq!(first.warnings, second.warnings);
}
