//! Per-cluster admission configuration and the cluster-state reader.
//!
//! The configuration is immutable for the lifetime of the webhook server;
//! the reader is the only component that touches the cluster at admission
//! time, and only to answer "does this secret exist".

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::{Api, Client};
use thiserror::Error;

use crate::providers::PlatformType;

/// Immutable configuration shared by every admission request.
#[derive(Clone, Debug)]
pub struct AdmissionConfig {
    /// Platform the cluster runs on; selects the handler bundle.
    pub platform: PlatformType,

    /// Identity of the owning cluster, written to the cluster-ID label on
    /// create when the label is unset.
    pub cluster_id: String,

    /// Platform-specific cluster configuration used during defaulting.
    pub platform_status: PlatformStatus,

    /// Cluster DNS posture.
    pub dns: DnsConfig,
}

/// Per-platform configuration records owned by the cluster.
#[derive(Clone, Debug, Default)]
pub struct PlatformStatus {
    pub aws: Option<AwsPlatformStatus>,
    pub azure: Option<AzurePlatformStatus>,
    pub gcp: Option<GcpPlatformStatus>,
}

#[derive(Clone, Debug, Default)]
pub struct AwsPlatformStatus {
    /// Region machines default into when the spec leaves it unset.
    pub region: String,
}

#[derive(Clone, Debug, Default)]
pub struct AzurePlatformStatus {
    /// Azure cloud environment name, e.g. `AzureUSGovernmentCloud`.
    pub cloud_name: String,
}

#[derive(Clone, Debug, Default)]
pub struct GcpPlatformStatus {
    /// Project machines are created in.
    pub project_id: String,
}

/// Cluster DNS configuration. A missing public zone marks a disconnected
/// installation and enables the restricted-network policies.
#[derive(Clone, Debug, Default)]
pub struct DnsConfig {
    pub public_zone_present: bool,
}

/// Errors surfaced by the cluster-state reader.
#[derive(Debug, Error)]
pub enum SecretReaderError {
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),
}

/// Read-only lookup capability for referenced secrets. Lookups may block
/// on I/O; this is the engine's only suspension point, and dropping the
/// request future cancels an in-flight lookup.
#[async_trait]
pub trait SecretReader: Send + Sync {
    /// Whether the named secret exists. `Ok(false)` is an expected outcome
    /// (the secret may be created after the machine is admitted).
    async fn secret_exists(&self, namespace: &str, name: &str)
        -> Result<bool, SecretReaderError>;
}

/// Reader backed by the live cluster.
#[derive(Clone)]
pub struct KubeSecretReader {
    client: Client,
}

impl KubeSecretReader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SecretReader for KubeSecretReader {
    async fn secret_exists(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<bool, SecretReaderError> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?.is_some())
    }
}

/// Reader over a fixed set of secrets. Used by tests and offline tooling.
#[derive(Clone, Debug, Default)]
pub struct FixedSecretReader {
    secrets: std::collections::BTreeSet<(String, String)>,
}

impl FixedSecretReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a secret as existing in `namespace`.
    pub fn with_secret(mut self, namespace: &str, name: &str) -> Self {
        self.secrets
            .insert((namespace.to_string(), name.to_string()));
        self
    }
}

#[async_trait]
impl SecretReader for FixedSecretReader {
    async fn secret_exists(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<bool, SecretReaderError> {
        Ok(self
            .secrets
            .contains(&(namespace.to_string(), name.to_string())))
    }
}
