//! Validation error types.

use crate::rule::Rule;
use std::fmt;
use thiserror::Error;

/// Malformed rule declaration, detected before any request is served.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    /// An empty entry between commas.
    #[error("empty rule in '{rules}'")]
    EmptyRule {
        /// The full rule declaration.
        rules: String,
    },

    /// A rule name with characters outside `[A-Za-z0-9_]`.
    #[error("invalid rule name '{name}'")]
    InvalidName {
        /// The rejected name.
        name: String,
    },

    /// No built-in or registered rule has this name.
    #[error("unknown rule '{rule}'")]
    UnknownRule {
        /// The unknown rule name.
        rule: String,
    },

    /// The rule needs `=param`.
    #[error("rule '{rule}' requires a parameter")]
    MissingParam {
        /// The rule missing its parameter.
        rule: String,
    },

    /// The rule takes no parameter.
    #[error("rule '{rule}' does not take a parameter")]
    UnexpectedParam {
        /// The rule given a parameter.
        rule: String,
    },

    /// The parameter is not of the expected form.
    #[error("rule '{rule}' has invalid parameter '{param}': expected {expected}")]
    InvalidParam {
        /// The rule name.
        rule: String,
        /// The rejected parameter.
        param: String,
        /// What the rule accepts.
        expected: &'static str,
    },

    /// A custom rule tried to take a built-in name.
    #[error("rule name '{name}' is reserved")]
    ReservedName {
        /// The reserved name.
        name: String,
    },

    /// A rule error inside a named field.
    #[error("field '{field}': {source}")]
    Field {
        /// The field whose rules are malformed.
        field: String,
        /// The underlying error.
        #[source]
        source: Box<RuleError>,
    },
}

impl RuleError {
    pub(crate) fn in_field(self, field: &str) -> Self {
        Self::Field {
            field: field.to_string(),
            source: Box::new(self),
        }
    }
}

/// One failed rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    path: String,
    rule: String,
    param: Option<String>,
}

impl Violation {
    pub(crate) fn new(path: impl Into<String>, rule: &Rule) -> Self {
        Self {
            path: path.into(),
            rule: rule.name().to_string(),
            param: rule.param().map(str::to_string),
        }
    }

    /// Returns the path of the failing value, e.g. `body.name` or `tags[2]`.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the name of the failed rule.
    #[must_use]
    pub fn rule(&self) -> &str {
        &self.rule
    }

    /// Returns the rule parameter, if any.
    #[must_use]
    pub fn param(&self) -> Option<&str> {
        self.param.as_deref()
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.param {
            Some(param) => write!(f, "'{}' failed on the '{}={}' rule", self.path, self.rule, param),
            None => write!(f, "'{}' failed on the '{}' rule", self.path, self.rule),
        }
    }
}

/// Every rule violation found in one validation pass.
///
/// # Example
///
/// ```rust
/// use valmid_validate::{StructRules, Validator};
/// use serde_json::json;
///
/// let rules = StructRules::builder()
///     .field("id", "gt=0")
///     .field("name", "required,min=3")
///     .build()
///     .unwrap();
///
/// let errors = Validator::new()
///     .validate(&rules, &json!({ "id": 0, "name": "Jo" }))
///     .unwrap_err();
///
/// assert_eq!(errors.len(), 2);
/// assert_eq!(errors.violations()[0].path(), "id");
/// assert_eq!(errors.violations()[1].rule(), "min");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    violations: Vec<Violation>,
}

impl ValidationErrors {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a violation.
    pub fn push(&mut self, violation: Violation) {
        self.violations.push(violation);
    }

    /// Returns true if nothing was violated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Returns the number of violations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// Returns the violations in the order they were found.
    #[must_use]
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Returns `Ok(())` if empty, otherwise `Err(self)`.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("validation failed: ")?;
        for (i, violation) in self.violations.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{violation}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl IntoIterator for ValidationErrors {
    type Item = Violation;
    type IntoIter = std::vec::IntoIter<Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.violations.into_iter()
    }
}
