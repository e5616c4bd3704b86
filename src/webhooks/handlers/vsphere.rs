//! vSphere machine validation and defaulting.
//!
//! Validation rule order: template, workspace (server required,
//! datacenter/folder advisory checks), network devices, CPU/memory/disk
//! sizing warnings, user data secret, credentials secret (existence is a
//! warning).

use k8s_openapi::api::core::v1::LocalObjectReference;

use crate::crd::Machine;
use crate::providers::{
    VSphereMachineProviderSpec, Workspace, VSPHERE_MIN_CPU, VSPHERE_MIN_DISK_GIB,
    VSPHERE_MIN_MEMORY_MIB,
};
use crate::webhooks::admission::AdmissionContext;
use crate::webhooks::codec;
use crate::webhooks::fields::{FieldError, Findings};

use super::{
    check_credentials_secret, invalid_provider_spec, provider_spec_value_required,
    DEFAULT_USER_DATA_SECRET,
};

/// Default name of the vSphere credentials secret.
pub const DEFAULT_VSPHERE_CREDENTIALS_SECRET: &str = "vsphere-cloud-credentials";

/// Validate a vSphere provider spec.
pub async fn validate(machine: &Machine, ctx: &AdmissionContext<'_>) -> Findings {
    let mut findings = Findings::default();
    let spec: VSphereMachineProviderSpec =
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

    if spec.template.is_empty() {
        findings.error(FieldError::required(
            "providerSpec.template",
            "template must be provided",
        ));
    }

    match &spec.workspace {
        None => findings.error(FieldError::required(
            "providerSpec.workspace",
            "workspace must be provided",
        )),
        Some(workspace) => validate_workspace(workspace, &mut findings),
    }

    if spec.network.devices.is_empty() {
        findings.error(FieldError::required(
            "providerSpec.network.devices",
            "at least 1 network device must be provided",
        ));
    }
    for (i, device) in spec.network.devices.iter().enumerate() {
        if device.network_name.is_empty() {
            findings.error(FieldError::required(
                format!("providerSpec.network.devices[{}].networkName", i),
                "networkName must be provided",
            ));
        }
    }

    if spec.num_cpus < VSPHERE_MIN_CPU {
        findings.warn(format!(
            "providerSpec.numCPUs: {} is missing or less than the minimum value ({}): nodes may not boot correctly",
            spec.num_cpus, VSPHERE_MIN_CPU
        ));
    }
    if spec.memory_mib < VSPHERE_MIN_MEMORY_MIB {
        findings.warn(format!(
            "providerSpec.memoryMiB: {} is missing or less than the recommended minimum value ({}): nodes may not boot correctly",
            spec.memory_mib, VSPHERE_MIN_MEMORY_MIB
        ));
    }
    if spec.disk_gib < VSPHERE_MIN_DISK_GIB {
        findings.warn(format!(
            "providerSpec.diskGiB: {} is missing or less than the recommended minimum ({}): nodes may fail to start if disk size is too low",
            spec.disk_gib, VSPHERE_MIN_DISK_GIB
        ));
    }

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

    findings
}

fn validate_workspace(workspace: &Workspace, findings: &mut Findings) {
    if workspace.server.is_empty() {
        findings.error(FieldError::required(
            "providerSpec.workspace.server",
            "server must be provided",
        ));
    }

    if workspace.datacenter.is_empty() {
        findings.warn(
            "providerSpec.workspace.datacenter: datacenter is unset: if more than one datacenter is present, VMs cannot be created",
        );
    }

    if !workspace.folder.is_empty() && !workspace.datacenter.is_empty() {
        let expected_prefix = format!("/{}/vm/", workspace.datacenter);
        if !workspace.folder.starts_with(&expected_prefix) {
            findings.error(FieldError::invalid(
                "providerSpec.workspace.folder",
                workspace.folder.as_str(),
                format!(
                    "folder must be absolute path: expected prefix \"{}\"",
                    expected_prefix
                ),
            ));
        }
    }
}

/// Fill defaults for fields the spec leaves unset.
pub fn apply_defaults(
    spec: &mut VSphereMachineProviderSpec,
    _config: &crate::webhooks::config::AdmissionConfig,
) {
    if spec.user_data_secret.is_none() {
        spec.user_data_secret = Some(LocalObjectReference {
            name: DEFAULT_USER_DATA_SECRET.to_string(),
        });
    }

    if spec.credentials_secret.is_none() {
        spec.credentials_secret = Some(LocalObjectReference {
            name: DEFAULT_VSPHERE_CREDENTIALS_SECRET.to_string(),
        });
    }
}
