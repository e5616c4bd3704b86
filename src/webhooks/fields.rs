//! Structured field errors and the findings accumulator.
//!
//! Every validation rule reports through these types. Errors render as
//! `<path>: <Kind>: <detail>`; an aggregate of several errors renders as a
//! bracketed, comma-separated list in emission order. Warnings are plain
//! strings and never affect the admission verdict.

use serde_json::Value;
use std::fmt;

/// Classification of a field error, mirroring the rendered kind label.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldErrorKind {
    Required,
    Invalid,
    Forbidden,
    Unsupported,
    TooLong,
    TooMany,
    /// Infrastructure failure (decode, cluster-state reader) surfaced as a
    /// deny. Not produced by ordinary field rules.
    Internal,
}

impl FieldErrorKind {
    fn label(self) -> &'static str {
        match self {
            FieldErrorKind::Required => "Required value",
            FieldErrorKind::Invalid => "Invalid value",
            FieldErrorKind::Forbidden => "Forbidden",
            FieldErrorKind::Unsupported => "Unsupported value",
            FieldErrorKind::TooLong => "Too long",
            FieldErrorKind::TooMany => "Too many",
            FieldErrorKind::Internal => "Internal error",
        }
    }
}

/// A single validation failure attached to a dotted field path.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldError {
    /// Dotted/indexed path, e.g. `providerSpec.network.devices[1].networkName`.
    pub path: String,
    pub kind: FieldErrorKind,
    /// The offending value, rendered in its JSON form (`"zone"`, `0`).
    pub bad_value: Option<Value>,
    pub detail: String,
}

impl FieldError {
    pub fn required(path: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: FieldErrorKind::Required,
            bad_value: None,
            detail: detail.into(),
        }
    }

    pub fn invalid(
        path: impl Into<String>,
        bad_value: impl Into<Value>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            kind: FieldErrorKind::Invalid,
            bad_value: Some(bad_value.into()),
            detail: detail.into(),
        }
    }

    pub fn forbidden(path: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: FieldErrorKind::Forbidden,
            bad_value: None,
            detail: detail.into(),
        }
    }

    pub fn unsupported(
        path: impl Into<String>,
        bad_value: impl Into<Value>,
        supported: &[&str],
    ) -> Self {
        let rendered: Vec<String> = supported.iter().map(|v| format!("\"{}\"", v)).collect();
        Self {
            path: path.into(),
            kind: FieldErrorKind::Unsupported,
            bad_value: Some(bad_value.into()),
            detail: format!("supported values: {}", rendered.join(", ")),
        }
    }

    pub fn too_many(path: impl Into<String>, actual: usize, max: usize) -> Self {
        Self {
            path: path.into(),
            kind: FieldErrorKind::TooMany,
            bad_value: Some(Value::from(actual)),
            detail: format!("must have at most {} items", max),
        }
    }

    pub fn internal(path: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: FieldErrorKind::Internal,
            bad_value: None,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.bad_value {
            Some(value) => write!(
                f,
                "{}: {}: {}: {}",
                self.path,
                self.kind.label(),
                value,
                self.detail
            ),
            None => write!(f, "{}: {}: {}", self.path, self.kind.label(), self.detail),
        }
    }
}

/// Render a list of field errors the way the admission response reports
/// them: a single error stands alone, several are bracket-joined in
/// emission order.
pub fn join_errors(errors: &[FieldError]) -> String {
    match errors {
        [single] => single.to_string(),
        many => {
            let rendered: Vec<String> = many.iter().map(FieldError::to_string).collect();
            format!("[{}]", rendered.join(", "))
        }
    }
}

/// Append-only accumulator for the errors and warnings a rule set emits.
/// Rules never short-circuit: each platform handler runs every rule and
/// the emission order is part of its contract.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Findings {
    pub errors: Vec<FieldError>,
    pub warnings: Vec<String>,
}

impl Findings {
    pub fn error(&mut self, error: FieldError) {
        self.errors.push(error);
    }

    pub fn warn(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// Append another finding set, preserving emission order.
    pub fn merge(&mut self, other: Findings) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    /// A request is allowed iff no errors were emitted.
    pub fn is_allowed(&self) -> bool {
        self.errors.is_empty()
    }

    /// Rendered error message for the admission response, if any.
    pub fn message(&self) -> Option<String> {
        if self.errors.is_empty() {
            None
        } else {
            Some(join_errors(&self.errors))
        }
    }
}
