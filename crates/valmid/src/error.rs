//! Error types for the validation middleware.

use crate::pipeline::Stage;
use http::StatusCode;
use thiserror::Error;
use valmid_extract::{BinderError, BindingError};
use valmid_validate::{RuleError, ValidationErrors};

/// A request rejected by the middleware.
///
/// This is what an error handler receives.
#[derive(Debug, Error)]
pub enum Error {
    /// The request could not be turned into the input value.
    #[error(transparent)]
    Binding(#[from] BindingError),

    /// The input value broke one or more rules.
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
}

impl Error {
    /// Returns the stage the request failed in.
    #[must_use]
    pub const fn stage(&self) -> Stage {
        match self {
            Self::Binding(_) => Stage::Assembling,
            Self::Validation(_) => Stage::Validating,
        }
    }

    /// Returns the binding error, if this is one.
    #[must_use]
    pub const fn as_binding(&self) -> Option<&BindingError> {
        match self {
            Self::Binding(e) => Some(e),
            Self::Validation(_) => None,
        }
    }

    /// Returns the validation errors, if this is one.
    #[must_use]
    pub const fn as_validation(&self) -> Option<&ValidationErrors> {
        match self {
            Self::Binding(_) => None,
            Self::Validation(e) => Some(e),
        }
    }

    /// Suggested status: the binding error's own, or 400 for validation.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Binding(e) => e.status_code(),
            Self::Validation(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Machine-readable code for JSON error bodies.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Binding(e) => e.error_code(),
            Self::Validation(_) => "VALIDATION_FAILED",
        }
    }
}

/// A malformed schema, reported when the schema or the middleware is built.
///
/// Routes must not be registered when this is returned.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// A field's source declaration, type or default is malformed.
    #[error("invalid field binding: {0}")]
    Binding(#[from] BinderError),

    /// A rule declaration is malformed or names a rule the validator lacks.
    #[error("invalid validation rules: {0}")]
    Rules(#[from] RuleError),

    /// The declared fields cannot produce the input type.
    #[error("schema does not fit {input} at '{path}': {details}")]
    InputMismatch {
        /// Name of the input type.
        input: &'static str,
        /// Where decoding failed; `.` for the input itself.
        path: String,
        /// The decoder's message.
        details: String,
    },
}
