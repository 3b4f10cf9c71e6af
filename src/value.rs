//! Decoded record values handed to the projection driver.
//!
//! Notes on mapping from Avro:
//! - Logical types backed by a primitive decode to that primitive (`date` → `Int`,
//!   `timestamp-micros` → `Long`, `uuid` → `String`).
//! - Unions keep their branch index, but [`Value::kind`] and [`Value::resolved`] look through
//!   them so coercion sees the selected branch.
//! - Record fields are positional and follow the declared field order.

use crate::schema::ValueKind;

/// One decoded value of a record stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// `null`.
    Null,
    /// `boolean`.
    Boolean(bool),
    /// `int`.
    Int(i32),
    /// `long`.
    Long(i64),
    /// `float`.
    Float(f32),
    /// `double`.
    Double(f64),
    /// `bytes`.
    Bytes(Vec<u8>),
    /// `string`.
    String(String),
    /// `enum`: ordinal position and symbol.
    Enum {
        /// Ordinal position of the symbol in the declared symbol list.
        index: u32,
        /// The symbol itself.
        symbol: String,
    },
    /// `fixed`.
    Fixed(Vec<u8>),
    /// `array`.
    Array(Vec<Value>),
    /// `map`, entries sorted by key.
    Map(Vec<(String, Value)>),
    /// A union value with its selected branch.
    Union {
        /// Index of the selected branch in the union schema.
        branch: u32,
        /// The branch value.
        value: Box<Value>,
    },
    /// `record`: field values in declaration order.
    Record(Vec<(String, Value)>),
    /// A logical value with no primitive counterpart.
    Other,
}

impl Value {
    /// Construct a record value from `(name, value)` pairs.
    pub fn record<N: Into<String>>(fields: impl IntoIterator<Item = (N, Value)>) -> Self {
        Value::Record(fields.into_iter().map(|(n, v)| (n.into(), v)).collect())
    }

    /// Construct an enum value.
    pub fn enumeration(index: u32, symbol: impl Into<String>) -> Self {
        Value::Enum {
            index,
            symbol: symbol.into(),
        }
    }

    /// Wrap `value` as branch `branch` of a union.
    pub fn union(branch: u32, value: Value) -> Self {
        Value::Union {
            branch,
            value: Box::new(value),
        }
    }

    /// This value with any union wrappers removed.
    pub fn resolved(&self) -> &Value {
        let mut current = self;
        while let Value::Union { value, .. } = current {
            current = value;
        }
        current
    }

    /// Runtime kind of the value, looking through unions.
    pub fn kind(&self) -> ValueKind {
        match self.resolved() {
            Value::Null => ValueKind::Null,
            Value::Boolean(_) => ValueKind::Boolean,
            Value::Int(_) => ValueKind::Int,
            Value::Long(_) => ValueKind::Long,
            Value::Float(_) => ValueKind::Float,
            Value::Double(_) => ValueKind::Double,
            Value::Bytes(_) => ValueKind::Bytes,
            Value::String(_) => ValueKind::String,
            Value::Enum { .. } => ValueKind::Enum,
            Value::Fixed(_) => ValueKind::Fixed,
            Value::Array(_) => ValueKind::Array,
            Value::Map(_) => ValueKind::Map,
            Value::Record(_) => ValueKind::Record,
            Value::Other => ValueKind::Other,
            Value::Union { .. } => unreachable!("resolved() strips unions"),
        }
    }

    /// Field at `position` when this value (after union resolution) is a record.
    pub fn field_at(&self, position: usize) -> Option<&Value> {
        match self.resolved() {
            Value::Record(fields) => fields.get(position).map(|(_, v)| v),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}
