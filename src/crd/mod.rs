//! Custom Resource Definitions (CRDs) for the machine admission webhooks.
//!
//! - `Machine`: declarative compute instance with an opaque provider spec

mod machine;

pub use machine::*;
