//! Admission webhook server.
//!
//! Provides HTTP endpoints for the Machine admission webhooks.
//!
//! To enable webhooks:
//! 1. Deploy cert-manager for TLS certificates
//! 2. Create the MutatingWebhookConfiguration and
//!    ValidatingWebhookConfiguration pointing at this service
//! 3. Mount the TLS certificate secret to the operator pod at /etc/webhook/certs/
//!
//! The webhook server starts automatically when certificates are present.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::post, Json, Router};
use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview, Operation};
use kube::core::DynamicObject;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::crd::Machine;
use crate::health::HealthState;
use crate::webhooks::admission::{AdmissionVerdict, MachineAdmission};

/// Default path to webhook TLS certificate
pub const WEBHOOK_CERT_PATH: &str = "/etc/webhook/certs/tls.crt";
/// Default path to webhook TLS private key
pub const WEBHOOK_KEY_PATH: &str = "/etc/webhook/certs/tls.key";
/// Default webhook server port
pub const WEBHOOK_PORT: u16 = 9443;

/// Path served by the mutating (defaulting) webhook
pub const MUTATE_MACHINE_PATH: &str = "/mutate-machine";
/// Path served by the validating webhook
pub const VALIDATE_MACHINE_PATH: &str = "/validate-machine";

/// Shared state for webhook handlers
pub struct WebhookState {
    admission: MachineAdmission,
    health: Option<Arc<HealthState>>,
}

impl WebhookState {
    pub fn new(admission: MachineAdmission, health: Option<Arc<HealthState>>) -> Self {
        Self { admission, health }
    }
}

/// Errors that can occur when running the webhook server
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("TLS configuration error: {0}")]
    TlsConfig(String),

    #[error("Webhook server error: {0}")]
    Server(String),
}

/// Create the webhook router
pub fn create_webhook_router(state: Arc<WebhookState>) -> Router {
    Router::new()
        .route(MUTATE_MACHINE_PATH, post(mutate_machine))
        .route(VALIDATE_MACHINE_PATH, post(validate_machine))
        .with_state(state)
}

/// Extract the typed admission request from a review, or produce the 400
/// response to send back.
fn extract_request(
    review: AdmissionReview<Machine>,
) -> Result<AdmissionRequest<Machine>, (StatusCode, Json<AdmissionReview<DynamicObject>>)> {
    review.try_into().map_err(|err| {
        error!(error = %err, "Failed to extract admission request");
        (
            StatusCode::BAD_REQUEST,
            Json(
                AdmissionResponse::invalid(format!("Invalid AdmissionReview: {}", err))
                    .into_review(),
            ),
        )
    })
}

/// Build the response for a verdict: deny with the joined error message, or
/// allow carrying any warnings.
fn respond(request: &AdmissionRequest<Machine>, verdict: &AdmissionVerdict) -> AdmissionResponse {
    let mut response = AdmissionResponse::from(request);
    if let Some(message) = verdict.message() {
        warn!(uid = %request.uid, message = %message, "Admission request denied");
        return response.deny(message);
    }
    if !verdict.warnings.is_empty() {
        response.warnings = Some(verdict.warnings.clone());
    }
    response
}

/// Mutating webhook: defaults Machines on create.
async fn mutate_machine(
    State(state): State<Arc<WebhookState>>,
    Json(review): Json<AdmissionReview<Machine>>,
) -> impl IntoResponse {
    let request = match extract_request(review) {
        Ok(request) => request,
        Err(response) => return response,
    };
    if let Some(health) = &state.health {
        health.metrics.observe_request("mutate");
    }

    debug!(
        uid = %request.uid,
        operation = ?request.operation,
        namespace = ?request.namespace,
        name = ?request.name,
        "Processing mutating admission request"
    );

    // Defaulting only applies on CREATE; everything else passes through.
    let machine = match (&request.operation, &request.object) {
        (Operation::Create, Some(machine)) => machine.clone(),
        _ => {
            return (
                StatusCode::OK,
                Json(AdmissionResponse::from(&request).into_review()),
            );
        }
    };

    let verdict = state
        .admission
        .admit(Operation::Create, &machine, None)
        .await;
    let mut response = respond(&request, &verdict);

    if verdict.allowed() {
        if let Some(mutated) = &verdict.mutated {
            response = match compute_patch(&machine, mutated)
                .map_err(|err| err.to_string())
                .and_then(|patch| response.with_patch(patch).map_err(|err| err.to_string()))
            {
                Ok(response) => response,
                Err(err) => {
                    error!(uid = %request.uid, error = %err, "Failed to compute defaulting patch");
                    return (
                        StatusCode::OK,
                        Json(
                            AdmissionResponse::from(&request)
                                .deny("failed to compute defaulting patch")
                                .into_review(),
                        ),
                    );
                }
            };
        }
        info!(uid = %request.uid, mutated = verdict.mutated.is_some(), "Machine defaulted");
    }

    (StatusCode::OK, Json(response.into_review()))
}

/// Validating webhook: validates Machines on create and update.
async fn validate_machine(
    State(state): State<Arc<WebhookState>>,
    Json(review): Json<AdmissionReview<Machine>>,
) -> impl IntoResponse {
    let request = match extract_request(review) {
        Ok(request) => request,
        Err(response) => return response,
    };
    if let Some(health) = &state.health {
        health.metrics.observe_request("validate");
    }

    debug!(
        uid = %request.uid,
        operation = ?request.operation,
        namespace = ?request.namespace,
        name = ?request.name,
        "Processing validating admission request"
    );

    // DELETE operations are always allowed
    if request.operation == Operation::Delete {
        info!(uid = %request.uid, "Admission request allowed (DELETE)");
        return (
            StatusCode::OK,
            Json(AdmissionResponse::from(&request).into_review()),
        );
    }

    let machine = match &request.object {
        Some(machine) => machine.clone(),
        None => {
            error!(uid = %request.uid, "Missing object in request");
            return (
                StatusCode::OK,
                Json(
                    AdmissionResponse::from(&request)
                        .deny("missing object in request")
                        .into_review(),
                ),
            );
        }
    };
    let old_machine = request.old_object.clone();

    let verdict = state
        .admission
        .admit(request.operation.clone(), &machine, old_machine.as_ref())
        .await;

    if verdict.allowed() {
        info!(uid = %request.uid, warnings = verdict.warnings.len(), "Admission request allowed");
    }
    // Validating responses never carry a patch; the mutating webhook owns
    // mutation.
    let response = respond(&request, &verdict);

    (StatusCode::OK, Json(response.into_review()))
}

/// JSON Patch turning the submitted machine into the defaulted one.
fn compute_patch(
    original: &Machine,
    mutated: &Machine,
) -> Result<json_patch::Patch, serde_json::Error> {
    let original = serde_json::to_value(original)?;
    let mutated = serde_json::to_value(mutated)?;
    Ok(json_patch::diff(&original, &mutated))
}

/// Run the webhook server with TLS
///
/// Binds to 0.0.0.0:9443 and serves the mutating and validating Machine
/// endpoints. TLS certificates are loaded from the paths specified.
pub async fn run_webhook_server(
    admission: MachineAdmission,
    health: Option<Arc<HealthState>>,
    cert_path: &str,
    key_path: &str,
) -> Result<(), WebhookError> {
    use axum_server::tls_rustls::RustlsConfig;
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let state = Arc::new(WebhookState::new(admission, health));
    let app = create_webhook_router(state);

    let config = RustlsConfig::from_pem_file(PathBuf::from(cert_path), PathBuf::from(key_path))
        .await
        .map_err(|e| WebhookError::TlsConfig(e.to_string()))?;

    let addr = SocketAddr::from(([0, 0, 0, 0], WEBHOOK_PORT));
    info!(port = WEBHOOK_PORT, "Webhook server listening with TLS");

    axum_server::bind_rustls(addr, config)
        .serve(app.into_make_service())
        .await
        .map_err(|e| WebhookError::Server(e.to_string()))?;

    Ok(())
}
