//! Conversion of raw text into typed field values.
//!
//! Raw values arrive as strings (path segments, query pairs, header values,
//! form fields). Each bound field declares a [`FieldType`], and conversion
//! produces the JSON value the input type is later decoded from.

use serde_json::{Number, Value};
use std::fmt;

/// Scalar value types a raw string can be converted into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scalar {
    /// Text, taken verbatim
    String,
    /// Signed 64-bit integer
    Integer,
    /// Unsigned 64-bit integer
    Unsigned,
    /// Finite 64-bit float
    Float,
    /// Boolean (`1 t T TRUE true True 0 f F FALSE false False`)
    Boolean,
}

impl Scalar {
    /// Converts one raw string.
    ///
    /// Returns `None` if the text is not a valid value of this type.
    #[must_use]
    pub fn convert(self, raw: &str) -> Option<Value> {
        match self {
            Self::String => Some(Value::String(raw.to_string())),
            Self::Integer => raw.parse::<i64>().ok().map(Value::from),
            Self::Unsigned => raw.parse::<u64>().ok().map(Value::from),
            Self::Float => raw
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number),
            Self::Boolean => match raw {
                "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(Value::Bool(true)),
                "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(Value::Bool(false)),
                _ => None,
            },
        }
    }

    /// Returns the zero value of this type.
    #[must_use]
    pub fn zero(self) -> Value {
        match self {
            Self::String => Value::String(String::new()),
            Self::Integer | Self::Unsigned => Value::from(0),
            Self::Float => Value::from(0.0),
            Self::Boolean => Value::Bool(false),
        }
    }

    /// Returns a short name used in error messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Unsigned => "unsigned integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
        }
    }
}

/// Declared type of a bound field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// Single value; the first raw value is used when a key repeats.
    Scalar(Scalar),
    /// Sequence of values, one per raw value, in request order.
    List(Scalar),
    /// Nested structure decoded from the JSON body.
    Body,
}

impl FieldType {
    /// `String` scalar.
    pub const STRING: Self = Self::Scalar(Scalar::String);
    /// `i64` scalar.
    pub const INTEGER: Self = Self::Scalar(Scalar::Integer);
    /// `u64` scalar.
    pub const UNSIGNED: Self = Self::Scalar(Scalar::Unsigned);
    /// `f64` scalar.
    pub const FLOAT: Self = Self::Scalar(Scalar::Float);
    /// `bool` scalar.
    pub const BOOLEAN: Self = Self::Scalar(Scalar::Boolean);

    /// Returns the zero value of this type.
    ///
    /// An absent body is `null`, which decodes into `Option::None`.
    #[must_use]
    pub fn zero(self) -> Value {
        match self {
            Self::Scalar(scalar) => scalar.zero(),
            Self::List(_) => Value::Array(Vec::new()),
            Self::Body => Value::Null,
        }
    }

    /// Converts raw values into a typed value.
    ///
    /// `raw` is never empty when produced by the resolver. On failure the
    /// offending raw string is returned.
    pub fn convert<'a, S: AsRef<str>>(self, raw: &'a [S]) -> Result<Value, &'a str> {
        match self {
            Self::Scalar(scalar) => {
                let Some(first) = raw.first() else {
                    return Ok(scalar.zero());
                };
                let first = first.as_ref();
                scalar.convert(first).ok_or(first)
            }
            Self::List(scalar) => raw
                .iter()
                .map(|item| {
                    let item = item.as_ref();
                    scalar.convert(item).ok_or(item)
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Self::Body => Err(raw.first().map_or("", |item| item.as_ref())),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(scalar) => f.write_str(scalar.name()),
            Self::List(scalar) => write!(f, "list of {}", scalar.name()),
            Self::Body => f.write_str("JSON body"),
        }
    }
}
