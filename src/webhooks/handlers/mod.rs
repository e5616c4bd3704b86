//! Per-platform validation and defaulting handlers.
//!
//! Each platform module exposes `validate` (field rules, errors and
//! warnings in documented order) and `apply_defaults` (fills absent fields
//! only). Platform policy lives here and nowhere else; cross-platform
//! rules live in `super::policies`.

pub mod aws;
pub mod azure;
pub mod gcp;
pub mod vsphere;

use crate::webhooks::codec::CodecError;
use crate::webhooks::config::SecretReader;
use crate::webhooks::fields::{FieldError, FieldErrorKind, Findings};

/// Default name of the secret carrying worker ignition user data.
pub const DEFAULT_USER_DATA_SECRET: &str = "worker-user-data";

/// Namespace the credential secrets are provisioned into.
pub const DEFAULT_SECRET_NAMESPACE: &str = "openshift-machine-api";

/// The single error reported when `providerSpec.value` is absent.
pub(crate) fn provider_spec_value_required() -> FieldError {
    FieldError::required("providerSpec.value", "a value must be provided")
}

/// The error reported when the payload does not parse into the platform's
/// schema.
pub(crate) fn invalid_provider_spec(err: CodecError) -> FieldError {
    FieldError {
        path: "providerSpec.value".to_string(),
        kind: FieldErrorKind::Invalid,
        bad_value: None,
        detail: err.to_string(),
    }
}

/// Look up a referenced credentials secret. Absence is a warning, never an
/// error: the secret may legitimately be created after the machine is
/// admitted. Reader failures deny with an internal error.
pub(crate) async fn check_credentials_secret(
    findings: &mut Findings,
    secrets: &dyn SecretReader,
    path: &str,
    name: &str,
    namespace: &str,
) {
    match secrets.secret_exists(namespace, name).await {
        Ok(true) => {}
        Ok(false) => findings.warn(
            FieldError::invalid(path, name, "not found. Expected CredentialsSecret to exist")
                .to_string(),
        ),
        Err(err) => findings.error(FieldError::internal(
            path,
            format!("could not check if secret exists: {}", err),
        )),
    }
}
