//! Cross-platform policies for Machine admission.
//!
//! These apply regardless of the cluster's platform, after the platform
//! handler has run:
//! - `cluster_id`: stamps the cluster-ID label during defaulting on CREATE
//! - `lifecycle_hooks`: forbids new or changed hooks once the machine is
//!   marked for deletion (UPDATE only)

pub mod cluster_id;
pub mod lifecycle_hooks;
