//! Platform handler registry.
//!
//! The registry is the only route from a platform identifier to
//! platform-specific logic. The set of handlers is closed at compile time:
//! lookup resolves the four supported platforms and collapses everything
//! else into a pass-through bundle whose validator warns and whose
//! defaulter does nothing.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::crd::Machine;
use crate::providers::{
    AwsMachineProviderConfig, AzureMachineProviderSpec, GcpMachineProviderSpec, PlatformType,
    VSphereMachineProviderSpec,
};
use crate::webhooks::admission::AdmissionContext;
use crate::webhooks::codec;
use crate::webhooks::config::AdmissionConfig;
use crate::webhooks::fields::{FieldError, Findings};
use crate::webhooks::handlers::{self, invalid_provider_spec, provider_spec_value_required};

/// Validator/defaulter bundle for one platform.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlatformHandlers {
    Aws,
    Azure,
    Gcp,
    VSphere,
    /// Pass-through bundle for platforms this webhook does not handle.
    NoOp { platform: String },
}

impl PlatformHandlers {
    /// Resolve the handler bundle for a platform.
    pub fn lookup(platform: &PlatformType) -> Self {
        match platform {
            PlatformType::Aws => PlatformHandlers::Aws,
            PlatformType::Azure => PlatformHandlers::Azure,
            PlatformType::Gcp => PlatformHandlers::Gcp,
            PlatformType::VSphere => PlatformHandlers::VSphere,
            PlatformType::Other(name) => PlatformHandlers::NoOp {
                platform: name.clone(),
            },
        }
    }

    /// Run the platform's validation rules against the machine.
    pub async fn validate(&self, machine: &Machine, ctx: &AdmissionContext<'_>) -> Findings {
        match self {
            PlatformHandlers::Aws => handlers::aws::validate(machine, ctx).await,
            PlatformHandlers::Azure => handlers::azure::validate(machine, ctx).await,
            PlatformHandlers::Gcp => handlers::gcp::validate(machine, ctx).await,
            PlatformHandlers::VSphere => handlers::vsphere::validate(machine, ctx).await,
            PlatformHandlers::NoOp { platform } => {
                let mut findings = Findings::default();
                findings.warn(format!(
                    "platform {} not recognized; machine not validated",
                    platform
                ));
                findings
            }
        }
    }

    /// Apply the platform's defaults in place, re-encoding the payload only
    /// when a defaulting rule fired.
    pub fn apply_defaults(&self, machine: &mut Machine, config: &AdmissionConfig) -> Findings {
        match self {
            PlatformHandlers::Aws => default_in_place::<AwsMachineProviderConfig>(machine, |spec| {
                handlers::aws::apply_defaults(spec, config)
            }),
            PlatformHandlers::Azure => {
                default_in_place::<AzureMachineProviderSpec>(machine, |spec| {
                    handlers::azure::apply_defaults(spec, config)
                })
            }
            PlatformHandlers::Gcp => default_in_place::<GcpMachineProviderSpec>(machine, |spec| {
                handlers::gcp::apply_defaults(spec, config)
            }),
            PlatformHandlers::VSphere => {
                default_in_place::<VSphereMachineProviderSpec>(machine, |spec| {
                    handlers::vsphere::apply_defaults(spec, config)
                })
            }
            PlatformHandlers::NoOp { .. } => Findings::default(),
        }
    }
}

/// Decode the payload, run the defaulter, and write the payload back only
/// when the typed spec changed. An untouched payload stays byte-identical.
fn default_in_place<T>(machine: &mut Machine, apply: impl FnOnce(&mut T)) -> Findings
where
    T: DeserializeOwned + Serialize + Clone + PartialEq,
{
    let mut findings = Findings::default();
    let original: T = match codec::decode(machine.spec.provider_spec.value.as_ref()) {
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

    let mut defaulted = original.clone();
    apply(&mut defaulted);

    if defaulted != original {
        match codec::encode(&defaulted) {
            Ok(raw) => machine.spec.provider_spec.value = Some(raw),
            Err(err) => findings.error(FieldError::internal(
                "providerSpec.value",
                err.to_string(),
            )),
        }
    }
    findings
}
