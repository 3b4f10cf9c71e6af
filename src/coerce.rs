//! Coercion of decoded values into the four semantic column types.
//!
//! The rule matrix is fixed:
//!
//! | target     | accepted source kinds                                       |
//! |------------|-------------------------------------------------------------|
//! | `Text`     | string, bytes, null, boolean, int, long, float, double      |
//! | `Category` | enum                                                        |
//! | `Integer`  | boolean, int, long                                          |
//! | `Real`     | boolean, int, long, float, double                           |
//!
//! Floating point values render as the shortest decimal string that parses back to the same
//! value at the source width (`0.1f32` → `"0.1"`, `2.0` → `"2"`, `NaN`, `inf`, `-inf`).

use std::{fmt, str::FromStr};

use arrow_schema::DataType;

use crate::{
    error::{CoercionError, ConfigError},
    schema::ValueKind,
    value::Value,
};

/// Semantic type of an output column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "String", into = "&'static str")
)]
pub enum TargetType {
    /// Variable-length UTF-8 text.
    Text,
    /// Ordinal position of an enum symbol.
    Category,
    /// 64-bit signed integer.
    Integer,
    /// 64-bit floating point.
    Real,
}

impl TargetType {
    /// Configuration name of this target (`string`, `category`, `integer`, `double`).
    pub const fn name(self) -> &'static str {
        match self {
            TargetType::Text => "string",
            TargetType::Category => "category",
            TargetType::Integer => "integer",
            TargetType::Real => "double",
        }
    }

    /// Arrow storage type for columns of this target.
    pub fn data_type(self) -> DataType {
        match self {
            TargetType::Text => DataType::Utf8,
            TargetType::Category | TargetType::Integer => DataType::Int64,
            TargetType::Real => DataType::Float64,
        }
    }

    /// Whether a value of runtime kind `kind` can be coerced into this target.
    #[allow(clippy::match_same_arms)]
    pub const fn accepts(self, kind: ValueKind) -> bool {
        use ValueKind as K;
        match self {
            TargetType::Text => matches!(
                kind,
                K::String | K::Bytes | K::Null | K::Boolean | K::Int | K::Long | K::Float | K::Double
            ),
            TargetType::Category => matches!(kind, K::Enum),
            TargetType::Integer => matches!(kind, K::Boolean | K::Int | K::Long),
            TargetType::Real => {
                matches!(kind, K::Boolean | K::Int | K::Long | K::Float | K::Double)
            }
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TargetType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" | "text" => Ok(TargetType::Text),
            "category" => Ok(TargetType::Category),
            "integer" => Ok(TargetType::Integer),
            "double" | "real" => Ok(TargetType::Real),
            other => Err(ConfigError::UnknownTarget {
                name: other.to_owned(),
            }),
        }
    }
}

impl TryFrom<String> for TargetType {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TargetType> for &'static str {
    fn from(t: TargetType) -> Self {
        t.name()
    }
}

/// A coerced value ready to be written into a column.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// Value for a `Text` column.
    Text(String),
    /// Value for a `Category` column.
    Category(i64),
    /// Value for an `Integer` column.
    Integer(i64),
    /// Value for a `Real` column.
    Real(f64),
}

impl Scalar {
    /// Target type of the column this scalar belongs in.
    pub const fn target(&self) -> TargetType {
        match self {
            Scalar::Text(_) => TargetType::Text,
            Scalar::Category(_) => TargetType::Category,
            Scalar::Integer(_) => TargetType::Integer,
            Scalar::Real(_) => TargetType::Real,
        }
    }
}

/// Coerce `value` into `target`.
///
/// # Errors
/// Returns `CoercionError::Unsupported` when the value's runtime kind has no rule for `target`.
pub fn coerce(value: &Value, target: TargetType) -> Result<Scalar, CoercionError> {
    let value = value.resolved();
    let scalar = match target {
        TargetType::Text => to_text(value).map(Scalar::Text),
        TargetType::Category => to_category(value).map(Scalar::Category),
        TargetType::Integer => to_integer(value).map(Scalar::Integer),
        TargetType::Real => to_real(value).map(Scalar::Real),
    };
    scalar.ok_or_else(|| CoercionError::Unsupported {
        kind: value.kind(),
        target,
    })
}

fn to_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
        Value::Null => "null".to_owned(),
        Value::Boolean(b) => b.to_string(),
        Value::Int(v) => v.to_string(),
        Value::Long(v) => v.to_string(),
        Value::Float(v) => v.to_string(),
        Value::Double(v) => v.to_string(),
        _ => return None,
    };
    Some(text)
}

fn to_category(value: &Value) -> Option<i64> {
    match value {
        Value::Enum { index, .. } => Some(i64::from(*index)),
        _ => None,
    }
}

fn to_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Boolean(b) => Some(i64::from(*b)),
        Value::Int(v) => Some(i64::from(*v)),
        Value::Long(v) => Some(*v),
        _ => None,
    }
}

#[allow(clippy::cast_precision_loss)]
fn to_real(value: &Value) -> Option<f64> {
    match value {
        Value::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Int(v) => Some(f64::from(*v)),
        Value::Long(v) => Some(*v as f64),
        Value::Float(v) => Some(f64::from(*v)),
        Value::Double(v) => Some(*v),
        _ => None,
    }
}
