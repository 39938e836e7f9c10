//! # metalhead-shared
//!
//! Domain model shared by every MetalHead Underground crate: the entities the
//! backend owns, the structured error kinds it reports, and the input rules
//! forms check before calling it.

pub mod constants;
pub mod error;
pub mod types;
pub mod validation;

pub use error::{BlockedScope, ErrorKind, PrincipalError, ValidationError, ValidationIssue};
pub use types::*;
