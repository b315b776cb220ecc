//! # Valmid Extract
//!
//! Declarative binding of HTTP request data to typed input values.
//!
//! Each field of an input shape is declared with a name, a [`FieldType`] and
//! a source declaration. The [`Binder`] resolves every field against a
//! request, applies defaults and required-ness, converts raw text to the
//! declared type and decodes the result with `serde`.
//!
//! ## Sources
//!
//! | Directive | Source | Repeats |
//! |-----------|--------|---------|
//! | `path=<key>` | [`Params`] placed in the request extensions by the router | no |
//! | `query=<key>` | URL query string | yes |
//! | `header=<name>` | request header | yes |
//! | `form=<key>` | URL-encoded body, then query string | yes |
//! | `body=json` | whole JSON body, bound to one nested field | no |
//!
//! Sources are tried in declared order and the first one with any value wins,
//! an empty value included. `required` and `default=<literal>` apply only when
//! no source has a value.
//!
//! ## Example
//!
//! ```rust
//! use valmid_extract::{Binder, ExtractionContext, FieldBinding, FieldType};
//! use bytes::Bytes;
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Search {
//!     token: String,
//!     page: i64,
//! }
//!
//! let mut binder = Binder::new();
//! binder.add(FieldBinding::new("token", FieldType::STRING, "query=token;header=X-Token;required")?)?;
//! binder.add(FieldBinding::new("page", FieldType::INTEGER, "query=page;default=1")?)?;
//!
//! let request = http::Request::builder()
//!     .uri("/search")
//!     .header("X-Token", "secret")
//!     .body(Bytes::new())?;
//! let ctx = ExtractionContext::from_request(request);
//!
//! let search: Search = binder.bind(&ctx, valmid_extract::DEFAULT_MAX_BODY_SIZE)?;
//! assert_eq!(search.token, "secret");
//! assert_eq!(search.page, 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Errors
//!
//! Malformed declarations are reported as [`BinderError`] when the binder is
//! built. Request-time failures are [`BindingError`]s; binding stops at the
//! first one.

#![doc(html_root_url = "https://docs.rs/valmid-extract/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod binder;
mod context;
mod convert;
mod error;
mod params;
mod resolve;
mod source;

pub use binder::{Binder, BinderError, FieldBinding, DEFAULT_MAX_BODY_SIZE};
pub use context::ExtractionContext;
pub use convert::{FieldType, Scalar};
pub use error::BindingError;
pub use params::Params;
pub use resolve::{resolve, Resolved};
pub use source::{SourceDecl, SourceError, SourceKind};
