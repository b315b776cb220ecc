//! Input assembly.
//!
//! A [`Binder`] holds the bound fields of one input shape, in declaration
//! order. For each request it resolves every field, applies defaults and
//! required-ness, converts raw text to the declared type and decodes the
//! resulting map into the input type.

use crate::convert::FieldType;
use crate::error::BindingError;
use crate::resolve::resolve;
use crate::source::{SourceDecl, SourceError};
use crate::ExtractionContext;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

/// Default maximum body size accepted by the binder (1 MB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 1024 * 1024;

/// Malformed field declaration, detected when the binder is built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BinderError {
    /// The source declaration did not parse.
    #[error("field '{field}': {source}")]
    Source {
        /// The field being declared.
        field: String,
        /// The parse failure.
        #[source]
        source: SourceError,
    },

    /// The `default=` literal is not a valid value of the field type.
    #[error("field '{field}': default {literal:?} is not a valid {expected}")]
    InvalidDefault {
        /// The field being declared.
        field: String,
        /// The offending literal.
        literal: String,
        /// The declared field type.
        expected: FieldType,
    },

    /// `body=json` paired with a non-body type, or the reverse.
    #[error("field '{field}': {expected} type does not match source '{declaration}'")]
    TypeMismatch {
        /// The field being declared.
        field: String,
        /// The declared field type.
        expected: FieldType,
        /// The source declaration.
        declaration: String,
    },

    /// Two fields share a name.
    #[error("field '{field}' declared more than once")]
    DuplicateField {
        /// The repeated name.
        field: String,
    },

    /// More than one field binds the JSON body.
    #[error("field '{field}' binds the body, but '{existing}' already does")]
    MultipleBodies {
        /// The second body field.
        field: String,
        /// The body field declared first.
        existing: String,
    },
}

/// One field of an input shape: its name, type and source declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldBinding {
    name: String,
    ty: FieldType,
    decl: SourceDecl,
    default: Option<Value>,
}

impl FieldBinding {
    /// Parses a field declaration.
    ///
    /// `name` is the serialized name of the field in the input type.
    ///
    /// # Example
    ///
    /// ```rust
    /// use valmid_extract::{FieldBinding, FieldType};
    ///
    /// let page = FieldBinding::new("page", FieldType::INTEGER, "query=page;default=1").unwrap();
    /// assert_eq!(page.default_value(), Some(&serde_json::json!(1)));
    ///
    /// assert!(FieldBinding::new("page", FieldType::INTEGER, "query=page;default=one").is_err());
    /// ```
    pub fn new(
        name: impl Into<String>,
        ty: FieldType,
        declaration: &str,
    ) -> Result<Self, BinderError> {
        let name = name.into();
        let decl: SourceDecl = declaration.parse().map_err(|source| BinderError::Source {
            field: name.clone(),
            source,
        })?;

        if decl.is_body() != (ty == FieldType::Body) {
            return Err(BinderError::TypeMismatch {
                field: name,
                expected: ty,
                declaration: declaration.to_string(),
            });
        }

        let default = match decl.default_literal() {
            Some(literal) => {
                let converted = match ty {
                    FieldType::List(_) if literal.is_empty() => Ok(ty.zero()),
                    FieldType::List(_) => ty.convert(&literal.split(',').collect::<Vec<_>>())
                        .map_err(|_| ()),
                    _ => ty.convert(&[literal]).map_err(|_| ()),
                };
                Some(converted.map_err(|()| BinderError::InvalidDefault {
                    field: name.clone(),
                    literal: literal.to_string(),
                    expected: ty,
                })?)
            }
            None => None,
        };

        Ok(Self {
            name,
            ty,
            decl,
            default,
        })
    }

    /// Returns the field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared type.
    #[must_use]
    pub fn field_type(&self) -> FieldType {
        self.ty
    }

    /// Returns the parsed source declaration.
    #[must_use]
    pub fn declaration(&self) -> &SourceDecl {
        &self.decl
    }

    /// Returns the converted default value, if declared.
    #[must_use]
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    fn bind(&self, ctx: &ExtractionContext) -> Result<Value, BindingError> {
        if self.ty == FieldType::Body {
            return self.bind_body(ctx);
        }

        match resolve(&self.decl, ctx) {
            Some(resolved) => self.ty.convert(&resolved.values).map_err(|raw| {
                BindingError::invalid_value(resolved.kind, &self.name, raw, &self.ty.to_string())
            }),
            None => match &self.default {
                Some(default) => Ok(default.clone()),
                None if self.decl.is_required() => {
                    Err(BindingError::missing(&self.name, &self.decl))
                }
                None => Ok(self.ty.zero()),
            },
        }
    }

    fn bind_body(&self, ctx: &ExtractionContext) -> Result<Value, BindingError> {
        let body = ctx.body();
        if body.iter().all(u8::is_ascii_whitespace) {
            return if self.decl.is_required() {
                Err(BindingError::missing(&self.name, &self.decl))
            } else {
                Ok(Value::Null)
            };
        }
        serde_json::from_slice(body).map_err(|e| BindingError::malformed_body(&self.name, e))
    }
}

/// The bound fields of one input shape.
///
/// # Example
///
/// ```rust
/// use valmid_extract::{Binder, ExtractionContext, FieldBinding, FieldType};
/// use bytes::Bytes;
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct ListItems {
///     page: i64,
///     tags: Vec<String>,
/// }
///
/// let mut binder = Binder::new();
/// binder.add(FieldBinding::new("page", FieldType::INTEGER, "query=page;default=1").unwrap()).unwrap();
/// binder.add(FieldBinding::new("tags", FieldType::List(valmid_extract::Scalar::String), "query=tag").unwrap()).unwrap();
///
/// let request = http::Request::builder()
///     .uri("/items?tag=a&tag=b")
///     .body(Bytes::new())
///     .unwrap();
/// let ctx = ExtractionContext::from_request(request);
///
/// let items: ListItems = binder.bind(&ctx, 1024).unwrap();
/// assert_eq!(items.page, 1);
/// assert_eq!(items.tags, vec!["a", "b"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Binder {
    fields: Vec<FieldBinding>,
}

impl Binder {
    /// Creates an empty binder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a field.
    ///
    /// Rejects duplicate names and a second body field.
    pub fn add(&mut self, field: FieldBinding) -> Result<(), BinderError> {
        if self.fields.iter().any(|f| f.name == field.name) {
            return Err(BinderError::DuplicateField { field: field.name });
        }
        if field.ty == FieldType::Body {
            if let Some(existing) = self.body_field() {
                return Err(BinderError::MultipleBodies {
                    field: field.name,
                    existing: existing.name.clone(),
                });
            }
        }
        self.fields.push(field);
        Ok(())
    }

    /// Returns the fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[FieldBinding] {
        &self.fields
    }

    /// Returns the field bound to the JSON body, if any.
    #[must_use]
    pub fn body_field(&self) -> Option<&FieldBinding> {
        self.fields.iter().find(|f| f.ty == FieldType::Body)
    }

    /// Resolves every field into a JSON object keyed by field name.
    ///
    /// Stops at the first failure.
    pub fn assemble(
        &self,
        ctx: &ExtractionContext,
        max_body_size: usize,
    ) -> Result<Map<String, Value>, BindingError> {
        let body_len = ctx.body().len();
        if body_len > max_body_size {
            return Err(BindingError::payload_too_large(max_body_size, body_len));
        }

        let mut map = Map::with_capacity(self.fields.len());
        for field in &self.fields {
            let value = field.bind(ctx)?;
            map.insert(field.name.clone(), value);
        }
        Ok(map)
    }

    /// Assembles the fields and decodes them into `T`.
    ///
    /// A decode failure names the path of the offending value, such as
    /// `body.name` or `tags[1]`.
    pub fn bind<T: DeserializeOwned>(
        &self,
        ctx: &ExtractionContext,
        max_body_size: usize,
    ) -> Result<T, BindingError> {
        let map = self.assemble(ctx, max_body_size)?;
        serde_path_to_error::deserialize(Value::Object(map)).map_err(|e| {
            let path = e.path().to_string();
            match self.field_at(&path) {
                Some(field) => {
                    let kind = field.decl.sources().first().map(|(kind, _)| *kind);
                    BindingError::decode_failed_at(kind, path, e.inner())
                }
                None => BindingError::decode_failed(e.inner()),
            }
        })
    }

    /// Returns the field a decode path starts in.
    fn field_at(&self, path: &str) -> Option<&FieldBinding> {
        let head = path.split(['.', '[']).next()?;
        self.fields.iter().find(|f| f.name == head)
    }
}
