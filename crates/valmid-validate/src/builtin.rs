//! Built-in rules.

use crate::error::RuleError;
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

static EMAIL: OnceLock<Regex> = OnceLock::new();
static NUMERIC: OnceLock<Regex> = OnceLock::new();

fn email_regex() -> &'static Regex {
    EMAIL.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$")
            .expect("valid regex")
    })
}

fn numeric_regex() -> &'static Regex {
    NUMERIC.get_or_init(|| Regex::new(r"^[-+]?[0-9]+(?:\.[0-9]+)?$").expect("valid regex"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Param {
    None,
    Number,
    Text,
}

/// The rules every [`Validator`](crate::Validator) knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Builtin {
    Required,
    OmitEmpty,
    Min,
    Max,
    Len,
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    OneOf,
    Email,
    Alpha,
    AlphaNum,
    Numeric,
    Contains,
    StartsWith,
    EndsWith,
}

impl Builtin {
    pub(crate) fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "required" => Self::Required,
            "omitempty" => Self::OmitEmpty,
            "min" => Self::Min,
            "max" => Self::Max,
            "len" => Self::Len,
            "eq" => Self::Eq,
            "ne" => Self::Ne,
            "gt" => Self::Gt,
            "gte" => Self::Gte,
            "lt" => Self::Lt,
            "lte" => Self::Lte,
            "oneof" => Self::OneOf,
            "email" => Self::Email,
            "alpha" => Self::Alpha,
            "alphanum" => Self::AlphaNum,
            "numeric" => Self::Numeric,
            "contains" => Self::Contains,
            "startswith" => Self::StartsWith,
            "endswith" => Self::EndsWith,
            _ => return None,
        })
    }

    fn param_kind(self) -> Param {
        match self {
            Self::Required
            | Self::OmitEmpty
            | Self::Email
            | Self::Alpha
            | Self::AlphaNum
            | Self::Numeric => Param::None,
            Self::Min | Self::Max | Self::Len | Self::Gt | Self::Gte | Self::Lt | Self::Lte => {
                Param::Number
            }
            Self::Eq
            | Self::Ne
            | Self::OneOf
            | Self::Contains
            | Self::StartsWith
            | Self::EndsWith => Param::Text,
        }
    }

    pub(crate) fn check_param(self, name: &str, param: Option<&str>) -> Result<(), RuleError> {
        match (self.param_kind(), param) {
            (Param::None, None) => Ok(()),
            (Param::None, Some(_)) => Err(RuleError::UnexpectedParam {
                rule: name.to_string(),
            }),
            (_, None) | (_, Some("")) => Err(RuleError::MissingParam {
                rule: name.to_string(),
            }),
            (Param::Number, Some(param)) => match param.parse::<f64>() {
                Ok(n) if n.is_finite() => Ok(()),
                _ => Err(RuleError::InvalidParam {
                    rule: name.to_string(),
                    param: param.to_string(),
                    expected: "a number",
                }),
            },
            (Param::Text, Some(_)) => Ok(()),
        }
    }

    /// Evaluates the rule. `omitempty` is handled by the engine and always
    /// passes here. Apart from `required`, a null value passes every rule.
    pub(crate) fn eval(self, value: &Value, param: Option<&str>) -> bool {
        match self {
            Self::Required => value.is_object() || !is_zero(value),
            Self::OmitEmpty => true,
            _ if value.is_null() => true,
            Self::Min => compare(value, param, |m, p| m >= p),
            Self::Max => compare(value, param, |m, p| m <= p),
            Self::Len => compare(value, param, |m, p| m == p),
            Self::Gt => compare(value, param, |m, p| m > p),
            Self::Gte => compare(value, param, |m, p| m >= p),
            Self::Lt => compare(value, param, |m, p| m < p),
            Self::Lte => compare(value, param, |m, p| m <= p),
            Self::Eq => equals(value, param.unwrap_or_default()),
            Self::Ne => !equals(value, param.unwrap_or_default()),
            Self::OneOf => {
                let param = param.unwrap_or_default();
                param.split_whitespace().any(|candidate| equals(value, candidate))
            }
            Self::Email => text(value, |s| email_regex().is_match(s)),
            Self::Alpha => text(value, |s| {
                !s.is_empty() && s.chars().all(|c| c.is_ascii_alphabetic())
            }),
            Self::AlphaNum => text(value, |s| {
                !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric())
            }),
            Self::Numeric => value.is_number() || text(value, |s| numeric_regex().is_match(s)),
            Self::Contains => text(value, |s| s.contains(param.unwrap_or_default())),
            Self::StartsWith => text(value, |s| s.starts_with(param.unwrap_or_default())),
            Self::EndsWith => text(value, |s| s.ends_with(param.unwrap_or_default())),
        }
    }
}

/// Returns true for the zero value of each JSON kind: null, `""`, `0`,
/// `false` and `[]`. Objects are never zero.
#[must_use]
pub fn is_zero(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(_) => false,
    }
}

/// Character count for strings, length for arrays and objects, the value
/// itself for numbers.
fn measure(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) => Some(s.chars().count() as f64),
        Value::Array(items) => Some(items.len() as f64),
        Value::Object(map) => Some(map.len() as f64),
        Value::Number(n) => n.as_f64(),
        Value::Null | Value::Bool(_) => None,
    }
}

fn compare(value: &Value, param: Option<&str>, op: impl Fn(f64, f64) -> bool) -> bool {
    let bound = param.and_then(|p| p.parse::<f64>().ok());
    match (measure(value), bound) {
        (Some(m), Some(p)) => op(m, p),
        _ => false,
    }
}

fn equals(value: &Value, param: &str) -> bool {
    match value {
        Value::String(s) => s == param,
        Value::Number(n) => match (n.as_f64(), param.parse::<f64>()) {
            (Some(n), Ok(p)) => n == p,
            _ => false,
        },
        Value::Bool(b) => match param {
            "true" => *b,
            "false" => !*b,
            _ => false,
        },
        Value::Array(items) => param.parse::<usize>().is_ok_and(|p| items.len() == p),
        Value::Null | Value::Object(_) => false,
    }
}

fn text(value: &Value, check: impl Fn(&str) -> bool) -> bool {
    value.as_str().is_some_and(check)
}
