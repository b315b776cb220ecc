//! Input schemas.
//!
//! A [`Schema`] describes how to build one input type from a request: where
//! each field comes from, what type it has and which rules it must satisfy.
//! It is built once, checked up front and shared by every request.
//!
//! # Example
//!
//! ```rust
//! use serde::{Deserialize, Serialize};
//! use valmid::{FieldType, Schema};
//!
//! #[derive(Debug, Default, Clone, Serialize, Deserialize)]
//! struct Body {
//!     name: String,
//! }
//!
//! #[derive(Debug, Default, Clone, Serialize, Deserialize)]
//! struct UpdateUser {
//!     id: i64,
//!     token: String,
//!     page: i64,
//!     body: Option<Body>,
//! }
//!
//! let schema = Schema::<UpdateUser>::builder()
//!     .field("id", FieldType::INTEGER, "path=id", "gt=0")
//!     .field("token", FieldType::STRING, "query=access_token;header=X-Token;required", "")
//!     .field("page", FieldType::INTEGER, "query=page;default=1", "gte=1")
//!     .body("body", "body=json", "required", |body| body.field("name", "required,min=3"))
//!     .build()?;
//!
//! assert_eq!(schema.binder().fields().len(), 4);
//! # Ok::<(), valmid::SchemaError>(())
//! ```

use crate::error::{Error, SchemaError};
use crate::input::Input;
use std::fmt;
use serde_json::{Map, Value};
use std::marker::PhantomData;
use valmid_extract::{Binder, BindingError, ExtractionContext, FieldBinding, FieldType};
use valmid_validate::{StructRules, StructRulesBuilder, Validator};

/// The binding and validation schema for an input type `T`.
pub struct Schema<T> {
    binder: Binder,
    rules: StructRules,
    _input: PhantomData<fn() -> T>,
}

impl<T> fmt::Debug for Schema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("input", &std::any::type_name::<T>())
            .field("binder", &self.binder)
            .field("rules", &self.rules)
            .finish()
    }
}

impl<T: Input> Schema<T> {
    /// Starts a schema builder.
    #[must_use]
    pub fn builder() -> SchemaBuilder<T> {
        SchemaBuilder {
            binder: Binder::new(),
            rules: StructRules::builder(),
            error: None,
            _input: PhantomData,
        }
    }

    /// Returns the field bindings.
    #[must_use]
    pub fn binder(&self) -> &Binder {
        &self.binder
    }

    /// Returns the validation rules.
    #[must_use]
    pub fn rules(&self) -> &StructRules {
        &self.rules
    }

    /// Builds the input from a request.
    pub fn decode(&self, ctx: &ExtractionContext, max_body_size: usize) -> Result<T, BindingError> {
        self.binder.bind(ctx, max_body_size)
    }

    /// Runs the rules against a decoded input.
    ///
    /// Validation sees the input as it serializes, so serde renames apply
    /// to field names and violation paths alike.
    pub fn validate(&self, validator: &Validator, input: &T) -> Result<(), Error> {
        if self.rules.is_empty() {
            return Ok(());
        }
        let value = serde_json::to_value(input).map_err(BindingError::decode_failed)?;
        validator.validate(&self.rules, &value)?;
        Ok(())
    }
}

/// Builder for [`Schema`].
///
/// The first malformed declaration is kept and returned by
/// [`build`](Self::build).
pub struct SchemaBuilder<T> {
    binder: Binder,
    rules: StructRulesBuilder,
    error: Option<SchemaError>,
    _input: PhantomData<fn() -> T>,
}

impl<T> fmt::Debug for SchemaBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaBuilder")
            .field("binder", &self.binder)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl<T: Input> SchemaBuilder<T> {
    /// Adds a field bound from path, query, header or form sources.
    pub fn field(self, name: &str, ty: FieldType, source: &str, rules: &str) -> Self {
        self.bind(name, ty, source)
            .map_rules(|r| r.field(name, rules))
    }

    /// Adds the field bound to the JSON body, with rules for the body's own
    /// fields.
    pub fn body(
        self,
        name: &str,
        source: &str,
        rules: &str,
        fields: impl FnOnce(StructRulesBuilder) -> StructRulesBuilder,
    ) -> Self {
        self.bind(name, FieldType::Body, source)
            .map_rules(|r| r.nested(name, rules, fields))
    }

    fn bind(mut self, name: &str, ty: FieldType, source: &str) -> Self {
        if self.error.is_some() {
            return self;
        }
        let added = FieldBinding::new(name, ty, source).and_then(|field| self.binder.add(field));
        if let Err(e) = added {
            self.error = Some(e.into());
        }
        self
    }

    fn map_rules(mut self, f: impl FnOnce(StructRulesBuilder) -> StructRulesBuilder) -> Self {
        self.rules = f(self.rules);
        self
    }

    /// Finishes the schema.
    ///
    /// Besides the declarations themselves, checks that `T` decodes from
    /// what the declared fields can produce: every field of `T` without a
    /// serde default must be declared, with a compatible type.
    pub fn build(self) -> Result<Schema<T>, SchemaError> {
        if let Some(e) = self.error {
            return Err(e);
        }
        let rules = self.rules.build()?;
        check_input::<T>(&self.binder)?;
        Ok(Schema {
            binder: self.binder,
            rules,
            _input: PhantomData,
        })
    }
}

/// Decodes `T` from a sample value of every declared field.
///
/// Lists get one element so their element type is checked too. The body
/// field takes whatever `T::default()` holds there, since its shape is not
/// declared.
fn check_input<T: Input>(binder: &Binder) -> Result<(), SchemaError> {
    let defaults = serde_json::to_value(T::default()).ok();
    let sample: Map<String, Value> = binder
        .fields()
        .iter()
        .map(|field| {
            let value = match field.field_type() {
                FieldType::Body => defaults
                    .as_ref()
                    .and_then(|d| d.get(field.name()))
                    .cloned()
                    .unwrap_or(Value::Null),
                FieldType::List(scalar) => Value::Array(vec![scalar.zero()]),
                ty @ FieldType::Scalar(_) => ty.zero(),
            };
            (field.name().to_string(), value)
        })
        .collect();

    serde_path_to_error::deserialize::<_, T>(Value::Object(sample))
        .map(drop)
        .map_err(|e| SchemaError::InputMismatch {
            input: std::any::type_name::<T>(),
            path: e.path().to_string(),
            details: e.into_inner().to_string(),
        })
}
