//! # Valmid
//!
//! Decode, validate and dispatch middleware for typed HTTP request inputs.
//!
//! A [`Schema`] declares, per field of an input type, where the value comes
//! from (path, query, header, form or JSON body), its type, and the rules it
//! must satisfy. [`middleware`] turns the schema into a [`ValidationLayer`]
//! that wraps any [`Handler`]: requests whose input binds and validates reach
//! the handler with the value attached, everything else goes to the error
//! handler.
//!
//! ## Crates
//!
//! | Crate | Purpose |
//! |-------|---------|
//! | `valmid-extract` | Field sources, defaults, type conversion, binding |
//! | `valmid-validate` | Rule declarations and the validation engine |
//! | `valmid` | Schemas, the pipeline, the registry and result access |
//!
//! ## Example
//!
//! ```rust
//! use serde::{Deserialize, Serialize};
//! use valmid::{handler_fn, FieldType, Handler, Options, Params, Request, Response, ResponseExt, Schema};
//! use bytes::Bytes;
//! use http::StatusCode;
//! use http_body_util::Full;
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
//!     body: Option<Body>,
//! }
//!
//! let schema = Schema::<UpdateUser>::builder()
//!     .field("id", FieldType::INTEGER, "path=id", "gt=0")
//!     .field("token", FieldType::STRING, "query=access_token;header=X-Token;required", "")
//!     .body("body", "body=json", "required", |body| body.field("name", "required,min=3"))
//!     .build()?;
//!
//! let update = valmid::middleware(schema, Options::new())?.wrap(handler_fn(
//!     |request: Request| async move {
//!         let input: UpdateUser = valmid::get(&request);
//!         let name = input.body.map(|b| b.name).unwrap_or_default();
//!         Response::text(StatusCode::OK, &format!("{} {}", input.id, name))
//!     },
//! ));
//!
//! // The router puts matched path parameters into the request extensions.
//! let mut request = http::Request::builder()
//!     .method("POST")
//!     .uri("/users/42")
//!     .header("X-Token", "secret")
//!     .body(Full::new(Bytes::from(r#"{"name":"John"}"#)))
//!     .unwrap();
//! request.extensions_mut().insert([("id", "42")].into_iter().collect::<Params>());
//!
//! # tokio_test::block_on(async {
//! let response = update.call(request).await;
//! assert_eq!(response.status(), StatusCode::OK);
//! # });
//! # Ok::<(), valmid::SchemaError>(())
//! ```
//!
//! ## Errors
//!
//! Malformed schemas fail when they are built or wrapped in middleware, with
//! a [`SchemaError`]; routes should not be registered then. Request failures
//! are an [`Error`] handed to the error handler: the middleware's own
//! override from [`Options::error_handler`], or the process-wide one set with
//! [`set_error_handler`]. The built-in handler replies `400 Bad Request` with
//! the error text.

#![doc(html_root_url = "https://docs.rs/valmid/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod handler;
pub mod input;
pub mod pipeline;
pub mod registry;
pub mod schema;
pub mod types;

pub use config::{ConfigError, ValmidConfig};
pub use error::{Error, SchemaError};
pub use handler::{handler_fn, BoxFuture, Handler, HandlerFn};
pub use input::{get, try_get, Input, Validated};
pub use pipeline::{middleware, Options, Stage, ValidateInput, ValidationLayer};
pub use registry::{set_error_handler, set_validator, ErrorHandler, Registry};
pub use schema::{Schema, SchemaBuilder};
pub use types::{Request, Response, ResponseExt};

pub use valmid_extract::{BindingError, FieldType, Params, Scalar, SourceKind};
pub use valmid_validate::{RuleError, RuleFn, StructRulesBuilder, ValidationErrors, Validator, Violation};
