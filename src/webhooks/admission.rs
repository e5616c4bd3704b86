//! Admission orchestrator.
//!
//! Single entry point for a Machine admission decision. The pipeline per
//! request is: provider-spec presence check, then for CREATE defaulting →
//! cluster-ID labeling → validation, for UPDATE validation → lifecycle-hook
//! policy. Rule errors accumulate; only a missing or undecodable payload
//! short-circuits.

use std::sync::Arc;

use kube::core::admission::Operation;

use crate::crd::Machine;
use crate::webhooks::config::{AdmissionConfig, SecretReader};
use crate::webhooks::fields::{join_errors, FieldError, Findings};
use crate::webhooks::handlers::provider_spec_value_required;
use crate::webhooks::policies;
use crate::webhooks::registry::PlatformHandlers;

/// Per-request view handed to the platform handlers.
pub struct AdmissionContext<'a> {
    pub config: &'a AdmissionConfig,
    pub secrets: &'a dyn SecretReader,
    /// Namespace of the machine under admission; credentials lookups on
    /// platforms with namespace-less secret references resolve here.
    pub machine_namespace: &'a str,
}

/// Outcome of one admission decision.
#[derive(Clone, Debug)]
pub struct AdmissionVerdict {
    /// Accumulated field errors, in rule-emission order.
    pub errors: Vec<FieldError>,
    /// Accumulated warnings; never affect the verdict.
    pub warnings: Vec<String>,
    /// The defaulted machine, present only when defaulting or labeling
    /// actually changed the object.
    pub mutated: Option<Machine>,
}

impl AdmissionVerdict {
    fn new(findings: Findings, mutated: Option<Machine>) -> Self {
        Self {
            errors: findings.errors,
            warnings: findings.warnings,
            mutated,
        }
    }

    /// A request is allowed iff no errors were emitted.
    pub fn allowed(&self) -> bool {
        self.errors.is_empty()
    }

    /// Rendered denial message: a single error stands alone, several are
    /// bracket-joined in emission order.
    pub fn message(&self) -> Option<String> {
        if self.errors.is_empty() {
            None
        } else {
            Some(join_errors(&self.errors))
        }
    }
}

/// The Machine admission engine. Stateless across requests; one instance
/// serves every webhook request concurrently.
pub struct MachineAdmission {
    config: AdmissionConfig,
    secrets: Arc<dyn SecretReader>,
}

impl MachineAdmission {
    pub fn new(config: AdmissionConfig, secrets: Arc<dyn SecretReader>) -> Self {
        Self { config, secrets }
    }

    pub fn config(&self) -> &AdmissionConfig {
        &self.config
    }

    /// Decide admission for a machine.
    ///
    /// CREATE runs the defaulter before the validator so defaulted fields
    /// satisfy the required-value rules; UPDATE validates the object as
    /// submitted and applies the lifecycle-hook policy against the old
    /// object. DELETE and CONNECT are always allowed.
    pub async fn admit(
        &self,
        operation: Operation,
        machine: &Machine,
        old_machine: Option<&Machine>,
    ) -> AdmissionVerdict {
        if matches!(operation, Operation::Delete | Operation::Connect) {
            return AdmissionVerdict::new(Findings::default(), None);
        }

        if machine.spec.provider_spec.value.is_none() {
            let mut findings = Findings::default();
            findings.error(provider_spec_value_required());
            return AdmissionVerdict::new(findings, None);
        }

        let handlers = PlatformHandlers::lookup(&self.config.platform);
        let namespace = machine.metadata.namespace.as_deref().unwrap_or("");
        let ctx = AdmissionContext {
            config: &self.config,
            secrets: self.secrets.as_ref(),
            machine_namespace: namespace,
        };

        match operation {
            Operation::Create => {
                let mut mutated = machine.clone();
                let mut findings = handlers.apply_defaults(&mut mutated, &self.config);
                if !findings.is_allowed() {
                    // Decode failure short-circuits
                    return AdmissionVerdict::new(findings, None);
                }

                policies::cluster_id::apply(&mut mutated, &self.config.cluster_id);
                findings.merge(handlers.validate(&mutated, &ctx).await);

                let mutated = (mutated != *machine).then_some(mutated);
                AdmissionVerdict::new(findings, mutated)
            }
            _ => {
                let mut findings = handlers.validate(machine, &ctx).await;
                if let Some(old) = old_machine {
                    findings.merge(policies::lifecycle_hooks::validate(old, machine));
                }
                AdmissionVerdict::new(findings, None)
            }
        }
    }
}
