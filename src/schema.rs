//! Record schema tree consumed by the path resolver.
//!
//! A [`SchemaNode`] mirrors the declared structure of a record stream: records are ordered,
//! named field lists; every other node is a leaf tagged with its [`ValueKind`]. Enum leaves
//! also carry their symbols so category columns can report them.

use std::fmt;

/// Type tag shared by schema nodes and decoded values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// Avro `null`.
    Null,
    /// Avro `boolean`.
    Boolean,
    /// Avro `int` (32-bit signed).
    Int,
    /// Avro `long` (64-bit signed).
    Long,
    /// Avro `float` (32-bit IEEE 754).
    Float,
    /// Avro `double` (64-bit IEEE 754).
    Double,
    /// Avro `bytes`.
    Bytes,
    /// Avro `string`.
    String,
    /// Avro `enum`.
    Enum,
    /// Avro `fixed`.
    Fixed,
    /// Avro `array`.
    Array,
    /// Avro `map`.
    Map,
    /// Avro union.
    Union,
    /// Avro `record`.
    Record,
    /// Any logical type without a primitive counterpart (decimal, duration, ...).
    Other,
}

impl ValueKind {
    /// Avro type name of this kind.
    pub const fn name(self) -> &'static str {
        match self {
            ValueKind::Null => "null",
            ValueKind::Boolean => "boolean",
            ValueKind::Int => "int",
            ValueKind::Long => "long",
            ValueKind::Float => "float",
            ValueKind::Double => "double",
            ValueKind::Bytes => "bytes",
            ValueKind::String => "string",
            ValueKind::Enum => "enum",
            ValueKind::Fixed => "fixed",
            ValueKind::Array => "array",
            ValueKind::Map => "map",
            ValueKind::Union => "union",
            ValueKind::Record => "record",
            ValueKind::Other => "other",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A named child of a record node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaField {
    /// Field name, matched exactly by path segments.
    pub name: String,
    /// Declared schema of the field.
    pub schema: SchemaNode,
}

impl SchemaField {
    /// Construct a field.
    pub fn new(name: impl Into<String>, schema: impl Into<SchemaNode>) -> Self {
        Self {
            name: name.into(),
            schema: schema.into(),
        }
    }
}

/// A node of the declared record schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaNode {
    /// Ordered, named field list.
    Record {
        /// Record type name.
        name: String,
        /// Fields in declaration order.
        fields: Vec<SchemaField>,
    },
    /// Enumerated type with its symbols in ordinal order.
    Enum {
        /// Enum type name.
        name: String,
        /// Symbols; a value's ordinal indexes into this list.
        symbols: Vec<String>,
    },
    /// Union of alternative schemas.
    Union(Vec<SchemaNode>),
    /// Any other leaf.
    Leaf(ValueKind),
}

impl SchemaNode {
    /// Construct a record node from `(name, schema)` pairs.
    pub fn record<N, S>(name: impl Into<String>, fields: impl IntoIterator<Item = (N, S)>) -> Self
    where
        N: Into<String>,
        S: Into<SchemaNode>,
    {
        SchemaNode::Record {
            name: name.into(),
            fields: fields
                .into_iter()
                .map(|(n, s)| SchemaField::new(n, s))
                .collect(),
        }
    }

    /// Construct an enum node.
    pub fn enumeration<S: Into<String>>(
        name: impl Into<String>,
        symbols: impl IntoIterator<Item = S>,
    ) -> Self {
        SchemaNode::Enum {
            name: name.into(),
            symbols: symbols.into_iter().map(Into::into).collect(),
        }
    }

    /// The kind tag of this node.
    pub fn kind(&self) -> ValueKind {
        match self {
            SchemaNode::Record { .. } => ValueKind::Record,
            SchemaNode::Enum { .. } => ValueKind::Enum,
            SchemaNode::Union(_) => ValueKind::Union,
            SchemaNode::Leaf(kind) => *kind,
        }
    }

    /// Child fields when this node is a record.
    pub fn fields(&self) -> Option<&[SchemaField]> {
        match self {
            SchemaNode::Record { fields, .. } => Some(fields),
            _ => None,
        }
    }

    /// Enum symbols when this node is an enum.
    pub fn symbols(&self) -> Option<&[String]> {
        match self {
            SchemaNode::Enum { symbols, .. } => Some(symbols),
            _ => None,
        }
    }

    /// Position of the first child field named `name`, if this node is a record.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields()?.iter().position(|f| f.name == name)
    }
}

impl From<ValueKind> for SchemaNode {
    fn from(kind: ValueKind) -> Self {
        SchemaNode::Leaf(kind)
    }
}
