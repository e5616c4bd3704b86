//! Cluster-ID labeling policy.
//!
//! Applied during defaulting on CREATE: machines without a cluster-ID
//! label are stamped with the owning cluster's identity. A label the user
//! already set, even to a different cluster, is never overwritten.

use crate::crd::{Machine, MACHINE_CLUSTER_ID_LABEL};

/// Ensure the machine carries a non-empty cluster-ID label. Returns true
/// when the machine was modified.
pub fn apply(machine: &mut Machine, cluster_id: &str) -> bool {
    let labels = machine.metadata.labels.get_or_insert_with(Default::default);
    match labels.get(MACHINE_CLUSTER_ID_LABEL) {
        Some(existing) if !existing.is_empty() => false,
        _ => {
            labels.insert(MACHINE_CLUSTER_ID_LABEL.to_string(), cluster_id.to_string());
            true
        }
    }
}
