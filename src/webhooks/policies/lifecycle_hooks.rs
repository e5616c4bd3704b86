//! Lifecycle-hook immutability policy.
//!
//! Only enforced on UPDATE operations, and only once the machine is marked
//! for deletion. Hooks gate deletion stages, so adding or changing one on
//! a deleting machine could stall teardown indefinitely; removing hooks is
//! always permitted.

use crate::crd::{LifecycleHook, Machine};
use crate::webhooks::fields::{FieldError, Findings};

/// Validate that no lifecycle hook is new or changed while the machine is
/// marked for deletion.
pub fn validate(old: &Machine, new: &Machine) -> Findings {
    let mut findings = Findings::default();

    if !old.marked_for_deletion() && !new.marked_for_deletion() {
        return findings;
    }

    check_hooks(
        "preDrain",
        "pre-drain",
        &old.spec.lifecycle_hooks.pre_drain,
        &new.spec.lifecycle_hooks.pre_drain,
        &mut findings,
    );
    check_hooks(
        "preTerminate",
        "pre-terminate",
        &old.spec.lifecycle_hooks.pre_terminate,
        &new.spec.lifecycle_hooks.pre_terminate,
        &mut findings,
    );

    findings
}

fn check_hooks(
    field: &str,
    label: &str,
    old: &[LifecycleHook],
    new: &[LifecycleHook],
    findings: &mut Findings,
) {
    let changed: Vec<&LifecycleHook> = new.iter().filter(|hook| !old.contains(hook)).collect();
    if changed.is_empty() {
        return;
    }

    let rendered: Vec<String> = changed.iter().map(|hook| hook.to_string()).collect();
    findings.error(FieldError::forbidden(
        format!("spec.lifecycleHooks.{}", field),
        format!(
            "{} hooks are immutable when machine is marked for deletion: the following hooks are new or changed: [{}]",
            label,
            rendered.join(" ")
        ),
    ));
}
