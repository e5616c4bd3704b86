//! GCP machine validation and defaulting.
//!
//! Validation rule order: region, zone (suppressed while region is
//! missing), machine type, network interfaces, disks, service accounts,
//! user data secret, credentials secret (existence is a warning), GPUs,
//! host maintenance and restart policies.

use k8s_openapi::api::core::v1::LocalObjectReference;

use crate::crd::Machine;
use crate::providers::{
    GcpDisk, GcpMachineProviderSpec, GcpNetworkInterface, GCP_A100_GPU, GCP_DISK_TYPES,
    GCP_HOST_MAINTENANCE_MIGRATE, GCP_HOST_MAINTENANCE_TERMINATE, GCP_MAX_DISK_SIZE_GB,
    GCP_MIN_DISK_SIZE_GB, GCP_RESTART_POLICY_ALWAYS, GCP_RESTART_POLICY_NEVER,
};
use crate::webhooks::admission::AdmissionContext;
use crate::webhooks::codec;
use crate::webhooks::config::AdmissionConfig;
use crate::webhooks::fields::{FieldError, Findings};

use super::{
    check_credentials_secret, invalid_provider_spec, provider_spec_value_required,
    DEFAULT_USER_DATA_SECRET,
};

/// Default name of the GCP credentials secret.
pub const DEFAULT_GCP_CREDENTIALS_SECRET: &str = "gcp-cloud-credentials";

/// Default GCE machine type.
pub const DEFAULT_GCP_MACHINE_TYPE: &str = "n1-standard-4";

/// Default boot disk size in GB.
pub const DEFAULT_GCP_DISK_SIZE_GB: i64 = 128;

/// Default boot disk type.
pub const DEFAULT_GCP_DISK_TYPE: &str = "pd-ssd";

/// Default boot disk image.
pub const DEFAULT_GCP_DISK_IMAGE: &str =
    "projects/rhcos-cloud/global/images/rhcos-44-81-202004250133-0-gcp-x86-64";

/// Default GPU count for accelerator entries that leave it unset.
pub const DEFAULT_GCP_GPU_COUNT: i32 = 1;

pub fn default_network(cluster_id: &str) -> String {
    format!("{}-network", cluster_id)
}

pub fn default_subnetwork(cluster_id: &str) -> String {
    format!("{}-worker-subnet", cluster_id)
}

pub fn default_tags(cluster_id: &str) -> Vec<String> {
    vec![format!("{}-worker", cluster_id)]
}

/// Validate a GCP provider spec.
pub async fn validate(machine: &Machine, ctx: &AdmissionContext<'_>) -> Findings {
    let mut findings = Findings::default();
    let spec: GcpMachineProviderSpec =
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

    if spec.region.is_empty() {
        findings.error(FieldError::required("providerSpec.region", "region is required"));
    } else if !spec.zone.starts_with(&format!("{}-", spec.region)) {
        findings.error(FieldError::invalid(
            "providerSpec.zone",
            spec.zone.as_str(),
            format!("zone not in configured region ({})", spec.region),
        ));
    }

    if spec.machine_type.is_empty() {
        findings.error(FieldError::required(
            "providerSpec.machineType",
            "machineType should be set to one of the supported GCP machine types",
        ));
    }

    validate_network_interfaces(&spec.network_interfaces, &mut findings);
    validate_disks(&spec.disks, &mut findings);
    validate_service_accounts(&spec, &mut findings);

    match &spec.user_data_secret {
        None => findings.error(FieldError::required(
            "providerSpec.userDataSecret",
            "userDataSecret must be provided",
        )),
        Some(secret) if secret.name.as_str().is_empty() => {
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
            let name = secret.name.as_str();
            if name.is_empty() {
                findings.error(FieldError::required(
                    "providerSpec.credentialsSecret.name",
                    "name must be provided",
                ));
            } else {
                check_credentials_secret(
                    &mut findings,
                    ctx.secrets,
                    "providerSpec.credentialsSecret",
                    name,
                    ctx.machine_namespace,
                )
                .await;
            }
        }
    }

    validate_gpus(&spec, &mut findings);

    let maintenance = spec.on_host_maintenance.as_str();
    if !maintenance.is_empty()
        && maintenance != GCP_HOST_MAINTENANCE_MIGRATE
        && maintenance != GCP_HOST_MAINTENANCE_TERMINATE
    {
        findings.error(FieldError::invalid(
            "providerSpec.onHostMaintenance",
            maintenance,
            "onHostMaintenance must be either Migrate or Terminate.",
        ));
    }

    let restart = spec.restart_policy.as_str();
    if !restart.is_empty()
        && restart != GCP_RESTART_POLICY_ALWAYS
        && restart != GCP_RESTART_POLICY_NEVER
    {
        findings.error(FieldError::invalid(
            "providerSpec.restartPolicy",
            restart,
            "restartPolicy must be either Never or Always.",
        ));
    }

    if spec.has_gpus() && maintenance != GCP_HOST_MAINTENANCE_TERMINATE {
        findings.error(FieldError::forbidden(
            "providerSpec.onHostMaintenance",
            "When GPUs are specified or using machineType with pre-attached GPUs(A2 machine family), onHostMaintenance must be set to Terminate.",
        ));
    }

    findings
}

fn validate_network_interfaces(interfaces: &[GcpNetworkInterface], findings: &mut Findings) {
    if interfaces.is_empty() {
        findings.error(FieldError::required(
            "providerSpec.networkInterfaces",
            "at least 1 network interface is required",
        ));
        return;
    }

    for (i, interface) in interfaces.iter().enumerate() {
        if interface.network.is_empty() {
            findings.error(FieldError::required(
                format!("providerSpec.networkInterfaces[{}].network", i),
                "network is required",
            ));
        }
        if interface.subnetwork.is_empty() {
            findings.error(FieldError::required(
                format!("providerSpec.networkInterfaces[{}].subnetwork", i),
                "subnetwork is required",
            ));
        }
    }
}

fn validate_disks(disks: &[GcpDisk], findings: &mut Findings) {
    if disks.is_empty() {
        findings.error(FieldError::required(
            "providerSpec.disks",
            "at least 1 disk is required",
        ));
        return;
    }

    for (i, disk) in disks.iter().enumerate() {
        if disk.size_gb < GCP_MIN_DISK_SIZE_GB {
            findings.error(FieldError::invalid(
                format!("providerSpec.disks[{}].sizeGb", i),
                disk.size_gb,
                "must be at least 16GB in size",
            ));
        } else if disk.size_gb > GCP_MAX_DISK_SIZE_GB {
            findings.error(FieldError::invalid(
                format!("providerSpec.disks[{}].sizeGb", i),
                disk.size_gb,
                "exceeding maximum GCP disk size limit, must be below 65536",
            ));
        }

        if !disk.r#type.is_empty() && !GCP_DISK_TYPES.contains(&disk.r#type.as_str()) {
            findings.error(FieldError::unsupported(
                format!("providerSpec.disks[{}].type", i),
                disk.r#type.as_str(),
                &GCP_DISK_TYPES,
            ));
        }
    }
}

fn validate_service_accounts(spec: &GcpMachineProviderSpec, findings: &mut Findings) {
    match spec.service_accounts.as_slice() {
        [] => findings.warn(
            "providerSpec.serviceAccounts: no service account provided: nodes may be unable to join the cluster",
        ),
        [account] => {
            if account.email.is_empty() {
                findings.error(FieldError::required(
                    "providerSpec.serviceAccounts[0].email",
                    "email is required",
                ));
            }
            if account.scopes.is_empty() {
                findings.error(FieldError::required(
                    "providerSpec.serviceAccounts[0].scopes",
                    "at least 1 scope is required",
                ));
            }
        }
        many => findings.error(FieldError::invalid(
            "providerSpec.serviceAccounts",
            format!("{} service accounts supplied", many.len()),
            "exactly 1 service account must be supplied",
        )),
    }
}

fn validate_gpus(spec: &GcpMachineProviderSpec, findings: &mut Findings) {
    if spec.gpus.len() > 1 {
        findings.error(FieldError::too_many("providerSpec.gpus", spec.gpus.len(), 1));
        return;
    }

    let Some(gpu) = spec.gpus.first() else {
        return;
    };

    if spec.is_a2_machine_type() {
        findings.error(FieldError::invalid(
            "providerSpec.gpus",
            gpu.r#type.as_str(),
            "A2 machine types have already attached gpus, additional gpus cannot be specified",
        ));
    } else if gpu.r#type.is_empty() {
        findings.error(FieldError::required("providerSpec.gpus.Type", "Type is required"));
    } else if gpu.r#type == GCP_A100_GPU {
        findings.error(FieldError::invalid(
            "providerSpec.gpus.Type",
            gpu.r#type.as_str(),
            "nvidia-tesla-a100 gpus, are only attached to the A2 machine types",
        ));
    }
}

/// Fill defaults for fields the spec leaves unset. Existing disks are
/// preserved field by field; only absent subfields are filled.
pub fn apply_defaults(spec: &mut GcpMachineProviderSpec, config: &AdmissionConfig) {
    let cluster_id = config.cluster_id.as_str();

    if spec.machine_type.is_empty() {
        spec.machine_type = DEFAULT_GCP_MACHINE_TYPE.to_string();
    }

    if spec.network_interfaces.is_empty() {
        spec.network_interfaces = vec![GcpNetworkInterface {
            network: default_network(cluster_id),
            subnetwork: default_subnetwork(cluster_id),
        }];
    }

    if spec.disks.is_empty() {
        spec.disks = vec![GcpDisk {
            auto_delete: true,
            boot: true,
            size_gb: DEFAULT_GCP_DISK_SIZE_GB,
            ..Default::default()
        }];
    }
    for disk in &mut spec.disks {
        if disk.r#type.is_empty() {
            disk.r#type = DEFAULT_GCP_DISK_TYPE.to_string();
        }
        if disk.image.is_empty() {
            disk.image = DEFAULT_GCP_DISK_IMAGE.to_string();
        }
    }

    if spec.tags.is_empty() {
        spec.tags = default_tags(cluster_id);
    }

    if spec.user_data_secret.is_none() {
        spec.user_data_secret = Some(LocalObjectReference {
            name: DEFAULT_USER_DATA_SECRET.to_string(),
        });
    }

    if spec.credentials_secret.is_none() {
        spec.credentials_secret = Some(LocalObjectReference {
            name: DEFAULT_GCP_CREDENTIALS_SECRET.to_string(),
        });
    }

    for gpu in &mut spec.gpus {
        if gpu.count == 0 {
            gpu.count = DEFAULT_GCP_GPU_COUNT;
        }
    }
}
