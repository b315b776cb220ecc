//! Source declarations.
//!
//! Every bound field carries a declaration telling the binder where its
//! value comes from. Declarations are written as `;`-separated directives:
//!
//! ```text
//! path=id                       URL path parameter
//! query=page                    query string parameter (may repeat)
//! header=X-Token                request header
//! form=field                    URL-encoded form field (may repeat)
//! body=json                     whole JSON body, bound to a nested field
//! query=token;header=X-Token    try the query first, then the header
//! query=page;default=1          literal used when no source has a value
//! query=id;required             binding fails when no source has a value
//! ```
//!
//! Declarations are parsed once when a schema is built. Anything the parser
//! does not recognise is a [`SourceError`], so a typo in a declaration stops
//! route registration instead of surfacing per request.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Where a raw value can be taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// Path parameter matched by the router
    Path,
    /// Query string parameter
    Query,
    /// Request header
    Header,
    /// URL-encoded form field
    Form,
    /// Entire JSON body
    Body,
}

impl SourceKind {
    /// Returns the directive name of this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Query => "query",
            Self::Header => "header",
            Self::Form => "form",
            Self::Body => "body",
        }
    }

    fn from_directive(name: &str) -> Option<Self> {
        match name {
            "path" => Some(Self::Path),
            "query" => Some(Self::Query),
            "header" => Some(Self::Header),
            "form" => Some(Self::Form),
            "body" => Some(Self::Body),
            _ => None,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Malformed source declaration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// The declaration has no directives, or an empty one between `;`.
    #[error("empty directive in source declaration '{declaration}'")]
    EmptyDirective {
        /// The full declaration text.
        declaration: String,
    },

    /// The directive name is not a source kind or flag.
    #[error("unknown source directive '{directive}'")]
    UnknownDirective {
        /// The unrecognised directive name.
        directive: String,
    },

    /// A source kind or `default` was written without `=value`.
    #[error("directive '{directive}' requires a value")]
    MissingArgument {
        /// The directive missing its value.
        directive: String,
    },

    /// A flag that takes no value was given one.
    #[error("directive '{directive}' does not take a value")]
    UnexpectedArgument {
        /// The directive that was given a value.
        directive: String,
    },

    /// A flag appears more than once.
    #[error("directive '{directive}' given more than once")]
    DuplicateDirective {
        /// The repeated directive.
        directive: String,
    },

    /// Only `body=json` is supported.
    #[error("unsupported body format '{format}', expected 'json'")]
    UnsupportedBodyFormat {
        /// The requested format.
        format: String,
    },

    /// A header key that is not a valid header name.
    #[error("invalid header name '{name}'")]
    InvalidHeaderName {
        /// The rejected header name.
        name: String,
    },

    /// `body=json` cannot be combined with other sources or a default.
    #[error("body source cannot be combined with other sources or a default")]
    BodyNotExclusive,

    /// Only flags, no source to read from.
    #[error("source declaration names no source")]
    NoSources,
}

/// A parsed source declaration.
///
/// # Example
///
/// ```rust
/// use valmid_extract::{SourceDecl, SourceKind};
///
/// let decl: SourceDecl = "query=token;header=X-Token".parse().unwrap();
/// assert_eq!(
///     decl.sources(),
///     &[
///         (SourceKind::Query, "token".to_string()),
///         (SourceKind::Header, "X-Token".to_string()),
///     ]
/// );
/// assert!(!decl.is_required());
/// assert_eq!(decl.default_literal(), None);
///
/// assert!("cookie=session".parse::<SourceDecl>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDecl {
    sources: Vec<(SourceKind, String)>,
    required: bool,
    default: Option<String>,
}

impl SourceDecl {
    /// Returns the `(kind, key)` pairs in the order they are tried.
    #[must_use]
    pub fn sources(&self) -> &[(SourceKind, String)] {
        &self.sources
    }

    /// Returns true if binding fails when no source has a value.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Returns the `default=` literal, if declared.
    #[must_use]
    pub fn default_literal(&self) -> Option<&str> {
        self.default.as_deref()
    }

    /// Returns true if this declaration binds the JSON body.
    #[must_use]
    pub fn is_body(&self) -> bool {
        matches!(self.sources.as_slice(), [(SourceKind::Body, _)])
    }
}

impl FromStr for SourceDecl {
    type Err = SourceError;

    fn from_str(declaration: &str) -> Result<Self, Self::Err> {
        let mut sources = Vec::new();
        let mut required = false;
        let mut default = None;

        for directive in declaration.split(';') {
            let directive = directive.trim();
            if directive.is_empty() {
                return Err(SourceError::EmptyDirective {
                    declaration: declaration.to_string(),
                });
            }

            let (name, arg) = match directive.split_once('=') {
                Some((name, arg)) => (name.trim(), Some(arg.trim())),
                None => (directive, None),
            };

            match name {
                "required" => {
                    if arg.is_some() {
                        return Err(SourceError::UnexpectedArgument {
                            directive: name.to_string(),
                        });
                    }
                    if required {
                        return Err(SourceError::DuplicateDirective {
                            directive: name.to_string(),
                        });
                    }
                    required = true;
                }
                "default" => {
                    // An empty default is legal and binds the empty string.
                    let Some(arg) = arg else {
                        return Err(SourceError::MissingArgument {
                            directive: name.to_string(),
                        });
                    };
                    if default.is_some() {
                        return Err(SourceError::DuplicateDirective {
                            directive: name.to_string(),
                        });
                    }
                    default = Some(arg.to_string());
                }
                _ => {
                    let kind = SourceKind::from_directive(name).ok_or_else(|| {
                        SourceError::UnknownDirective {
                            directive: name.to_string(),
                        }
                    })?;
                    let key = match arg {
                        Some(key) if !key.is_empty() => key,
                        _ => {
                            return Err(SourceError::MissingArgument {
                                directive: name.to_string(),
                            })
                        }
                    };
                    match kind {
                        SourceKind::Body if key != "json" => {
                            return Err(SourceError::UnsupportedBodyFormat {
                                format: key.to_string(),
                            });
                        }
                        SourceKind::Header
                            if http::HeaderName::from_bytes(key.as_bytes()).is_err() =>
                        {
                            return Err(SourceError::InvalidHeaderName {
                                name: key.to_string(),
                            });
                        }
                        _ => {}
                    }
                    sources.push((kind, key.to_string()));
                }
            }
        }

        if sources.is_empty() {
            return Err(SourceError::NoSources);
        }
        let has_body = sources.iter().any(|(kind, _)| *kind == SourceKind::Body);
        if has_body && (sources.len() > 1 || default.is_some()) {
            return Err(SourceError::BodyNotExclusive);
        }

        Ok(Self {
            sources,
            required,
            default,
        })
    }
}

impl fmt::Display for SourceDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut directives: Vec<String> = self
            .sources
            .iter()
            .map(|(kind, key)| format!("{kind}={key}"))
            .collect();
        if let Some(default) = &self.default {
            directives.push(format!("default={default}"));
        }
        if self.required {
            directives.push("required".to_string());
        }
        f.write_str(&directives.join(";"))
    }
}
