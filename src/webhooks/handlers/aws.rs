//! AWS machine validation and defaulting.
//!
//! Validation rule order: AMI (with arn/filters warnings), placement
//! region, instance type, user data secret, credentials secret (existence
//! is a warning), tenancy, duplicated tags.

use k8s_openapi::api::core::v1::LocalObjectReference;
use std::collections::HashMap;

use crate::crd::Machine;
use crate::providers::{AwsMachineProviderConfig, TagSpecification, AWS_TENANCIES};
use crate::webhooks::admission::AdmissionContext;
use crate::webhooks::codec;
use crate::webhooks::fields::{FieldError, Findings};

use super::{
    check_credentials_secret, invalid_provider_spec, provider_spec_value_required,
    DEFAULT_USER_DATA_SECRET,
};

/// Default name of the AWS credentials secret.
pub const DEFAULT_AWS_CREDENTIALS_SECRET: &str = "aws-cloud-credentials";

/// Default instance types per architecture.
pub const DEFAULT_AWS_X86_INSTANCE_TYPE: &str = "m5.large";
pub const DEFAULT_AWS_ARM_INSTANCE_TYPE: &str = "m6g.large";

/// Instance type used when the spec leaves it unset, matching the
/// architecture the webhook runs on.
pub fn default_instance_type() -> &'static str {
    if cfg!(target_arch = "aarch64") {
        DEFAULT_AWS_ARM_INSTANCE_TYPE
    } else {
        DEFAULT_AWS_X86_INSTANCE_TYPE
    }
}

/// Validate an AWS provider spec.
pub async fn validate(machine: &Machine, ctx: &AdmissionContext<'_>) -> Findings {
    let mut findings = Findings::default();
    let spec: AwsMachineProviderConfig =
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

    if spec.ami.arn.is_some() {
        findings.warn(
            "can't use providerSpec.ami.arn, only providerSpec.ami.id can be used to reference AMI",
        );
    }
    if !spec.ami.filters.is_empty() {
        findings.warn(
            "can't use providerSpec.ami.filters, only providerSpec.ami.id can be used to reference AMI",
        );
    }
    if spec.ami.id.is_none() {
        findings.error(FieldError::required(
            "providerSpec.ami",
            "expected providerSpec.ami.id to be populated",
        ));
    }

    if spec.placement.region.is_empty() {
        findings.error(FieldError::required(
            "providerSpec.placement.region",
            "expected providerSpec.placement.region to be populated",
        ));
    }

    if spec.instance_type.is_empty() {
        findings.error(FieldError::required(
            "providerSpec.instanceType",
            "expected providerSpec.instanceType to be populated",
        ));
    }

    if spec.user_data_secret.is_none() {
        findings.error(FieldError::required(
            "providerSpec.userDataSecret",
            "expected providerSpec.userDataSecret to be populated",
        ));
    }

    match &spec.credentials_secret {
        None => findings.error(FieldError::required(
            "providerSpec.credentialsSecret",
            "expected providerSpec.credentialsSecret to be populated",
        )),
        Some(secret) => {
            let name = secret.name.as_str();
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

    if spec.subnet.is_empty() {
        findings.warn(
            "providerSpec.subnet: No subnet has been provided. Instances may be created in an unexpected subnet and may not join the cluster.",
        );
    }

    if spec.iam_instance_profile.is_none() {
        findings.warn(
            "providerSpec.iamInstanceProfile: no IAM instance profile provided: nodes may be unable to join the cluster",
        );
    }

    let tenancy = spec.placement.tenancy.as_str();
    if !tenancy.is_empty() && !AWS_TENANCIES.contains(&tenancy) {
        findings.error(FieldError::invalid(
            "providerSpec.tenancy",
            tenancy,
            "Invalid providerSpec.tenancy, the only allowed options are: default, dedicated, host",
        ));
    }

    let duplicates = duplicated_tag_names(&spec.tags);
    if !duplicates.is_empty() {
        findings.warn(format!(
            "providerSpec.tags: duplicated tag names ({}): only the first value will be used.",
            duplicates.join(",")
        ));
    }

    findings
}

/// Fill defaults for fields the spec leaves unset.
pub fn apply_defaults(
    spec: &mut AwsMachineProviderConfig,
    config: &crate::webhooks::config::AdmissionConfig,
) {
    if spec.instance_type.is_empty() {
        spec.instance_type = default_instance_type().to_string();
    }

    if spec.placement.region.is_empty() {
        if let Some(aws) = &config.platform_status.aws {
            spec.placement.region = aws.region.clone();
        }
    }

    if spec.user_data_secret.is_none() {
        spec.user_data_secret = Some(LocalObjectReference {
            name: DEFAULT_USER_DATA_SECRET.to_string(),
        });
    }

    if spec.credentials_secret.is_none() {
        spec.credentials_secret = Some(LocalObjectReference {
            name: DEFAULT_AWS_CREDENTIALS_SECRET.to_string(),
        });
    }
}

/// Tag names appearing more than once, case sensitively, in first-seen
/// order.
fn duplicated_tag_names(tags: &[TagSpecification]) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for tag in tags {
        *counts.entry(tag.name.as_str()).or_default() += 1;
    }

    let mut duplicates = Vec::new();
    for tag in tags {
        if counts.get(tag.name.as_str()).copied().unwrap_or_default() > 1
            && !duplicates.contains(&tag.name)
        {
            duplicates.push(tag.name.clone());
        }
    }
    duplicates
}
