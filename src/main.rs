//! machine-admission-webhook - Admission webhooks for Machine resources.
//!
//! This is the main entry point that:
//! - Initializes structured logging
//! - Creates the Kubernetes client
//! - Builds the per-cluster admission configuration from the environment
//! - Starts the health server and, when certificates are present, the
//!   webhook server

use std::path::Path;
use std::sync::Arc;

use kube::Client;
use tokio::signal;
use tracing::{error, info, warn};

use machine_admission_webhook::health::{run_health_server, HealthState};
use machine_admission_webhook::providers::PlatformType;
use machine_admission_webhook::webhooks::config::{
    AdmissionConfig, AwsPlatformStatus, AzurePlatformStatus, DnsConfig, GcpPlatformStatus,
    KubeSecretReader, PlatformStatus,
};
use machine_admission_webhook::{
    run_webhook_server, MachineAdmission, WEBHOOK_CERT_PATH, WEBHOOK_KEY_PATH,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("machine_admission_webhook=info".parse()?)
                .add_directive("kube=info".parse()?),
        )
        .json()
        .init();

    info!("Starting machine-admission-webhook");

    // Create Kubernetes client
    let client = Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    let config = admission_config_from_env();
    info!(
        platform = %config.platform,
        cluster_id = %config.cluster_id,
        public_zone = config.dns.public_zone_present,
        "Loaded admission configuration"
    );

    // Create shared health state
    let health_state = Arc::new(HealthState::new());

    // Start health server immediately (probes should work before TLS is ready)
    let health_handle = {
        let health_state = health_state.clone();
        tokio::spawn(async move {
            if let Err(e) = run_health_server(health_state).await {
                error!("Health server error: {}", e);
            }
        })
    };

    // Admission is stateless; every replica serves traffic without leader
    // election.
    let webhook_handle = if Path::new(WEBHOOK_CERT_PATH).exists()
        && Path::new(WEBHOOK_KEY_PATH).exists()
    {
        info!("TLS certificates found, starting webhook server");
        let secrets = Arc::new(KubeSecretReader::new(client));
        let admission = MachineAdmission::new(config, secrets);
        health_state.set_ready(true).await;
        let health = health_state.clone();
        Some(tokio::spawn(async move {
            if let Err(e) =
                run_webhook_server(admission, Some(health), WEBHOOK_CERT_PATH, WEBHOOK_KEY_PATH)
                    .await
            {
                error!("Webhook server error: {}", e);
            }
        }))
    } else {
        warn!("Webhook certificates not found, webhook server disabled");
        None
    };

    // Wait for any task to complete (or fail), or shutdown signal
    tokio::select! {
        result = health_handle => {
            if let Err(e) = result {
                error!("Health server task panicked: {}", e);
            }
        }
        result = async {
            match webhook_handle {
                Some(handle) => handle.await,
                None => std::future::pending().await,
            }
        } => {
            if let Err(e) = result {
                error!("Webhook server task panicked: {}", e);
            }
        }
        // Handle graceful shutdown on SIGTERM or SIGINT
        _ = shutdown_signal() => {
            info!("Received shutdown signal, shutting down");
            health_state.set_ready(false).await;
        }
    }

    info!("Webhook stopped");
    Ok(())
}

/// Build the admission configuration from the environment.
///
/// The hosting control plane owns the cluster's infrastructure and DNS
/// records; they are handed to the webhook as plain settings:
/// - `PLATFORM_TYPE`: `AWS`, `Azure`, `GCP` or `VSphere`
/// - `CLUSTER_ID`: identity written to the cluster-ID label
/// - `AWS_REGION`, `AZURE_CLOUD_NAME`, `GCP_PROJECT_ID`: per-platform status
/// - `DNS_PUBLIC_ZONE`: `false` marks a disconnected installation
fn admission_config_from_env() -> AdmissionConfig {
    let platform = std::env::var("PLATFORM_TYPE")
        .map(|v| PlatformType::parse(&v))
        .unwrap_or_else(|_| {
            warn!("PLATFORM_TYPE not set, machines will not be validated");
            PlatformType::Other(String::new())
        });

    let cluster_id = std::env::var("CLUSTER_ID").unwrap_or_else(|_| {
        warn!("CLUSTER_ID not set, using empty cluster ID");
        String::new()
    });

    let platform_status = PlatformStatus {
        aws: std::env::var("AWS_REGION")
            .ok()
            .map(|region| AwsPlatformStatus { region }),
        azure: std::env::var("AZURE_CLOUD_NAME")
            .ok()
            .map(|cloud_name| AzurePlatformStatus { cloud_name }),
        gcp: std::env::var("GCP_PROJECT_ID")
            .ok()
            .map(|project_id| GcpPlatformStatus { project_id }),
    };

    let public_zone_present = std::env::var("DNS_PUBLIC_ZONE")
        .map(|v| v != "false")
        .unwrap_or(true);

    AdmissionConfig {
        platform,
        cluster_id,
        platform_status,
        dns: DnsConfig {
            public_zone_present,
        },
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
///
/// Note: Signal handler setup failures are fatal - the webhook cannot shut
/// down gracefully without them. Using expect() here is intentional.
#[allow(clippy::expect_used)]
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
