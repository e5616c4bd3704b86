//! Typed provider-spec payloads.
//!
//! One module per supported platform. Each type mirrors the wire schema of
//! the provider spec carried in `Machine.spec.providerSpec.value`; fields
//! the webhooks do not touch round-trip through decode/encode unchanged.

mod aws;
mod azure;
mod gcp;
mod vsphere;

pub use aws::*;
pub use azure::*;
pub use gcp::*;
pub use vsphere::*;

use std::fmt;

/// The platform a cluster runs on. Determines which validation rules and
/// defaults apply to a Machine's provider spec.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlatformType {
    Aws,
    Azure,
    Gcp,
    VSphere,
    /// A platform this webhook has no handlers for. Machines are admitted
    /// with a warning and left untouched.
    Other(String),
}

impl PlatformType {
    /// Parse the platform identifier reported by the cluster infrastructure.
    pub fn parse(s: &str) -> Self {
        match s {
            "AWS" => PlatformType::Aws,
            "Azure" => PlatformType::Azure,
            "GCP" => PlatformType::Gcp,
            "VSphere" => PlatformType::VSphere,
            other => PlatformType::Other(other.to_string()),
        }
    }
}

impl fmt::Display for PlatformType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformType::Aws => write!(f, "AWS"),
            PlatformType::Azure => write!(f, "Azure"),
            PlatformType::Gcp => write!(f, "GCP"),
            PlatformType::VSphere => write!(f, "VSphere"),
            PlatformType::Other(s) => write!(f, "{}", s),
        }
    }
}
