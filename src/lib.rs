//! machine-admission-webhook library crate
//!
//! This module exports the Machine CRD, the typed provider specs, the
//! admission engine, and the webhook/health servers.

pub mod crd;
pub mod health;
pub mod providers;
pub mod webhooks;

pub use health::HealthState;
pub use webhooks::{
    run_webhook_server, AdmissionConfig, AdmissionVerdict, MachineAdmission, WebhookError,
    WEBHOOK_CERT_PATH, WEBHOOK_KEY_PATH, WEBHOOK_PORT,
};
