//! Codec for the opaque provider-spec payload.
//!
//! The payload in `Machine.spec.providerSpec.value` is the only part of a
//! Machine whose schema depends on the platform. This module is the sole
//! boundary that reads or writes it: handlers decode into their typed spec,
//! defaulters encode the mutated spec back. Encoding is deterministic
//! (object keys are emitted in sorted order), so decode/encode round-trips
//! are stable for fields the defaulters do not touch.

use k8s_openapi::apimachinery::pkg::runtime::RawExtension;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Errors produced while translating the opaque payload.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The payload does not parse into the platform's schema.
    #[error("could not decode provider spec: {0}")]
    Decode(#[source] serde_json::Error),

    /// The typed spec could not be re-encoded.
    #[error("could not encode provider spec: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Decode the payload into a platform-typed spec. `None` means the payload
/// is absent, which callers report as the provider-spec presence error.
pub fn decode<T: DeserializeOwned>(value: Option<&RawExtension>) -> Result<Option<T>, CodecError> {
    match value {
        None => Ok(None),
        Some(raw) => serde_json::from_value(raw.0.clone())
            .map(Some)
            .map_err(CodecError::Decode),
    }
}

/// Encode a typed spec back into the opaque payload.
pub fn encode<T: Serialize>(spec: &T) -> Result<RawExtension, CodecError> {
    serde_json::to_value(spec)
        .map(RawExtension)
        .map_err(CodecError::Encode)
}
