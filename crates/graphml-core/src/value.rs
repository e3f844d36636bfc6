use serde::{Deserialize, Serialize};
use std::fmt;

use crate::schema::DataType;
use crate::serde_f64;

/// Attribute value as it crosses the codec boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum TypedValue {
    String(String),
    Bool(bool),
    Int(i64),
    Float(
        #[serde(
            serialize_with = "serde_f64::ser_f64_compact",
            deserialize_with = "serde_f64::de_f64"
        )]
        f64,
    ),
}

impl TypedValue {
    /// Datatype the writer declares for a column holding this value.
    pub fn datatype(&self) -> DataType {
        match self {
            TypedValue::String(_) => DataType::String,
            TypedValue::Bool(_) => DataType::Boolean,
            TypedValue::Int(_) => DataType::Long,
            TypedValue::Float(_) => DataType::Double,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            TypedValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            TypedValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            TypedValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            TypedValue::Float(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<&str> for TypedValue {
    fn from(value: &str) -> Self {
        TypedValue::String(value.to_string())
    }
}

impl From<String> for TypedValue {
    fn from(value: String) -> Self {
        TypedValue::String(value)
    }
}

impl From<bool> for TypedValue {
    fn from(value: bool) -> Self {
        TypedValue::Bool(value)
    }
}

impl From<i64> for TypedValue {
    fn from(value: i64) -> Self {
        TypedValue::Int(value)
    }
}

impl From<f64> for TypedValue {
    fn from(value: f64) -> Self {
        TypedValue::Float(value)
    }
}

/// Text form written inside `<data>`.
impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypedValue::String(s) => f.write_str(s),
            TypedValue::Bool(b) => write!(f, "{b}"),
            TypedValue::Int(i) => write!(f, "{i}"),
            TypedValue::Float(v) => f.write_str(&fmt_double(*v)),
        }
    }
}

/// Formats a double so it always reads back as a floating literal:
/// whole numbers keep a `.0`, non-finite values use `NaN`/`Infinity`.
pub fn fmt_double(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CoerceError {
    #[error("invalid integer: {0}")]
    InvalidInt(#[from] std::num::ParseIntError),

    #[error("invalid floating point number: {0}")]
    InvalidFloat(#[from] std::num::ParseFloatError),
}

/// Converts trimmed `<data>` text to the value its key declares.
///
/// Booleans are permissive: anything other than a case-insensitive `true`
/// is `false`. Dates are not interpreted and stay text. A missing datatype
/// behaves like `string`.
pub fn coerce(text: &str, datatype: Option<DataType>) -> Result<TypedValue, CoerceError> {
    let value = match datatype {
        None | Some(DataType::String) | Some(DataType::Date) => TypedValue::String(text.to_string()),
        Some(DataType::Boolean) => TypedValue::Bool(text.eq_ignore_ascii_case("true")),
        Some(DataType::Double) | Some(DataType::Float) => TypedValue::Float(text.parse::<f64>()?),
        Some(DataType::Int) | Some(DataType::Long) => TypedValue::Int(text.parse::<i64>()?),
    };
    Ok(value)
}
