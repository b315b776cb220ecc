//! Binding error type.
//!
//! A [`BindingError`] is produced while turning a request into an input
//! value: a required field had no source, a raw value did not convert to
//! the field's type, or the body could not be read as JSON.

use crate::source::{SourceDecl, SourceKind};
use http::StatusCode;
use std::fmt;

/// Error raised while binding request data to an input shape.
///
/// Binding stops at the first failure, so a single error always names a
/// single field (or the body).
///
/// # Example
///
/// ```rust
/// use valmid_extract::{BindingError, SourceKind};
/// use http::StatusCode;
///
/// let err = BindingError::invalid_value(SourceKind::Path, "id", "abc", "integer");
/// assert_eq!(err.field(), Some("id"));
/// assert_eq!(err.value(), Some("abc"));
/// assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
/// assert!(err.to_string().contains("\"abc\""));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingError {
    source_kind: Option<SourceKind>,
    kind: BindingErrorKind,
    field: Option<String>,
    value: Option<String>,
    message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BindingErrorKind {
    /// Required field resolved from none of its sources
    Missing,
    /// Raw value could not be converted to the field type
    InvalidValue,
    /// Body was not valid JSON
    MalformedBody,
    /// Body exceeded the configured limit
    PayloadTooLarge,
    /// Assembled fields did not decode into the input type
    DecodeFailed,
}

impl BindingError {
    /// Creates an error for a required field that no source provided.
    #[must_use]
    pub fn missing(field: impl Into<String>, decl: &SourceDecl) -> Self {
        let field = field.into();
        Self {
            source_kind: decl.sources().first().map(|(kind, _)| *kind),
            kind: BindingErrorKind::Missing,
            message: format!("missing required field '{field}' ({decl})"),
            field: Some(field),
            value: None,
        }
    }

    /// Creates an error for a raw value that failed type conversion.
    #[must_use]
    pub fn invalid_value(
        source: SourceKind,
        field: impl Into<String>,
        value: impl Into<String>,
        expected: &str,
    ) -> Self {
        let field = field.into();
        let value = value.into();
        Self {
            source_kind: Some(source),
            kind: BindingErrorKind::InvalidValue,
            message: format!(
                "invalid {source} value {value:?} for field '{field}': expected {expected}"
            ),
            field: Some(field),
            value: Some(value),
        }
    }

    /// Creates an error for a body that is not valid JSON.
    #[must_use]
    pub fn malformed_body(field: impl Into<String>, details: impl fmt::Display) -> Self {
        let field = field.into();
        Self {
            source_kind: Some(SourceKind::Body),
            kind: BindingErrorKind::MalformedBody,
            message: format!("malformed JSON body for field '{field}': {details}"),
            field: Some(field),
            value: None,
        }
    }

    /// Creates an error for a body larger than the configured limit.
    #[must_use]
    pub fn payload_too_large(max_size: usize, actual_size: usize) -> Self {
        Self {
            source_kind: Some(SourceKind::Body),
            kind: BindingErrorKind::PayloadTooLarge,
            message: format!("payload too large: max {max_size} bytes, got {actual_size} bytes"),
            field: None,
            value: None,
        }
    }

    /// Creates an error for assembled fields that do not fit the input type.
    #[must_use]
    pub fn decode_failed(details: impl fmt::Display) -> Self {
        Self {
            source_kind: None,
            kind: BindingErrorKind::DecodeFailed,
            message: format!("failed to decode input: {details}"),
            field: None,
            value: None,
        }
    }

    /// Creates an error for a value at `path` that does not fit the input type.
    #[must_use]
    pub fn decode_failed_at(
        source: Option<SourceKind>,
        path: impl Into<String>,
        details: impl fmt::Display,
    ) -> Self {
        let path = path.into();
        Self {
            source_kind: source,
            kind: BindingErrorKind::DecodeFailed,
            message: format!("failed to decode field '{path}': {details}"),
            field: Some(path),
            value: None,
        }
    }

    /// Returns the source kind the error relates to, if any.
    #[must_use]
    pub fn source_kind(&self) -> Option<SourceKind> {
        self.source_kind
    }

    /// Returns the offending field name, if known.
    ///
    /// Decode failures give the full path, e.g. `body.name`.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    /// Returns the raw value that failed to convert, if any.
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Returns true if a required field was absent.
    #[must_use]
    pub fn is_missing(&self) -> bool {
        self.kind == BindingErrorKind::Missing
    }

    /// Returns the HTTP status code a handler would normally answer with.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self.kind {
            BindingErrorKind::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            BindingErrorKind::Missing
            | BindingErrorKind::InvalidValue
            | BindingErrorKind::MalformedBody
            | BindingErrorKind::DecodeFailed => StatusCode::BAD_REQUEST,
        }
    }

    /// Returns a stable machine-readable code.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self.kind {
            BindingErrorKind::Missing => "MISSING_FIELD",
            BindingErrorKind::InvalidValue => "INVALID_VALUE",
            BindingErrorKind::MalformedBody => "MALFORMED_BODY",
            BindingErrorKind::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            BindingErrorKind::DecodeFailed => "DECODE_FAILED",
        }
    }
}

impl fmt::Display for BindingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for BindingError {}
