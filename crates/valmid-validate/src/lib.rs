//! # Valmid Validate
//!
//! Declarative, tag-style validation rules for JSON values.
//!
//! Rules are declared per field as a comma-separated list such as
//! `required,min=3` and evaluated against a [`serde_json::Value`]. Anything
//! that serializes with `serde` can therefore be validated.
//!
//! ## Built-in rules
//!
//! | Rule | Meaning |
//! |------|---------|
//! | `required` | not the zero value (`null`, `""`, `0`, `false`, `[]`) |
//! | `omitempty` | skip the remaining rules when the value is zero |
//! | `min`, `max`, `len` | bounds on string characters, sequence length or number |
//! | `gt`, `gte`, `lt`, `lte` | strict and inclusive variants of the bounds |
//! | `eq`, `ne` | equality with the parameter |
//! | `oneof` | one of a space-separated set |
//! | `email`, `alpha`, `alphanum`, `numeric` | string formats |
//! | `contains`, `startswith`, `endswith` | substring checks |
//! | `dive` | apply the rest of the list to each sequence element |
//!
//! Custom rules are added with [`Validator::register_rule`].
//!
//! ## Null values
//!
//! A `null` value (an absent optional field, or an `Option` that is `None`)
//! fails `required` and passes every other built-in rule; custom rules
//! receive the null and decide for themselves. This differs from
//! `go-playground/validator`, where a nil pointer fails any rule not
//! guarded by `omitempty`. Here
//! `omitempty` is only needed to skip rules on zero values such as `""`
//! or `0`; optional fields can carry format rules as they are.
//!
//! ```rust
//! use valmid_validate::{StructRules, Validator};
//! use serde_json::json;
//!
//! let rules = StructRules::builder()
//!     .field("nickname", "min=3,alpha")
//!     .field("email", "required,email")
//!     .build()?;
//!
//! let errors = Validator::new()
//!     .validate(&rules, &json!({ "nickname": null, "email": null }))
//!     .unwrap_err();
//!
//! assert_eq!(errors.len(), 1);
//! assert_eq!(errors.violations()[0].path(), "email");
//! assert_eq!(errors.violations()[0].rule(), "required");
//! # Ok::<(), valmid_validate::RuleError>(())
//! ```
//!
//! ## Example
//!
//! ```rust
//! use valmid_validate::{StructRules, Validator};
//! use serde_json::json;
//!
//! let rules = StructRules::builder()
//!     .field("tags", "dive,required")
//!     .nested("body", "required", |body| body.field("name", "required,min=3"))
//!     .build()?;
//!
//! let validator = Validator::new();
//! validator.check(&rules)?;
//!
//! let errors = validator
//!     .validate(&rules, &json!({ "tags": ["a", ""], "body": { "name": "Jo" } }))
//!     .unwrap_err();
//!
//! let paths: Vec<&str> = errors.violations().iter().map(|v| v.path()).collect();
//! assert_eq!(paths, vec!["tags[1]", "body.name"]);
//! # Ok::<(), valmid_validate::RuleError>(())
//! ```

#![doc(html_root_url = "https://docs.rs/valmid-validate/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod builtin;
mod engine;
mod error;
mod rule;
mod structure;

pub use builtin::is_zero;
pub use engine::{RuleFn, Validator};
pub use error::{RuleError, ValidationErrors, Violation};
pub use rule::{Rule, RuleSet};
pub use structure::{FieldRules, StructRules, StructRulesBuilder};
