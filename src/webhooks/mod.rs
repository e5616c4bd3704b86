//! Machine admission webhooks.
//!
//! The engine is a fan-out/fan-in pipeline keyed on the cluster's platform
//! type: the registry resolves a validator/defaulter bundle, the codec
//! translates the opaque provider-spec payload, the handlers run the
//! platform's field rules, and the cross-platform policies layer on top.
//! The server module wires the engine to the admission HTTP transport.

pub mod admission;
pub mod codec;
pub mod config;
pub mod fields;
pub mod handlers;
pub mod policies;
pub mod registry;
mod server;

pub use admission::{AdmissionContext, AdmissionVerdict, MachineAdmission};
pub use config::{AdmissionConfig, DnsConfig, PlatformStatus, SecretReader};
pub use fields::{FieldError, FieldErrorKind, Findings};
pub use server::{
    create_webhook_router, run_webhook_server, WebhookError, WebhookState, MUTATE_MACHINE_PATH,
    VALIDATE_MACHINE_PATH, WEBHOOK_CERT_PATH, WEBHOOK_KEY_PATH, WEBHOOK_PORT,
};

// Re-export kube-rs admission types for contract testing
pub use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview, Operation};
