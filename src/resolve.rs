//! Compilation of named field paths into positional paths.
//!
//! Paths are resolved once per session. Every segment must name a field of the record reached
//! by the previous segments; the last segment may land on any node. The resolved positions let
//! the driver walk each record by index instead of by name.
//!
//! ```text
//! // 0 ─ id: long                     "id"          → [0]
//! // 1 ─ tags: record
//! //     ├─ 0 ─ color: enum           "tags.color"  → [1, 0]
//! //     └─ 1 ─ weight: double        "tags.weight" → [1, 1]
//! ```

use crate::{
    coerce::TargetType,
    error::SchemaError,
    schema::{SchemaNode, ValueKind},
    value::Value,
};

/// A requested output column: where to find it and what to coerce it into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldProjection {
    /// Name of the output column.
    pub output: String,
    /// Field names from the schema root to the leaf.
    pub path: Vec<String>,
    /// Semantic type of the output column.
    pub target: TargetType,
}

impl FieldProjection {
    /// Construct a projection.
    pub fn new<S: Into<String>>(
        output: impl Into<String>,
        path: impl IntoIterator<Item = S>,
        target: TargetType,
    ) -> Self {
        Self {
            output: output.into(),
            path: path.into_iter().map(Into::into).collect(),
            target,
        }
    }
}

/// A projection resolved against a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledPath {
    output: String,
    target: TargetType,
    positions: Vec<usize>,
    leaf: ValueKind,
    symbols: Option<Vec<String>>,
}

impl CompiledPath {
    /// Output column name.
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Declared target type.
    pub fn target(&self) -> TargetType {
        self.target
    }

    /// Field position at each depth.
    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    /// Declared kind of the leaf node.
    pub fn leaf(&self) -> ValueKind {
        self.leaf
    }

    /// Symbols of the leaf when it is an enum.
    pub fn symbols(&self) -> Option<&[String]> {
        self.symbols.as_deref()
    }

    /// Walk `record` along this path and return the leaf value.
    ///
    /// # Errors
    /// Returns the depth at which the walk met a non-record value or a missing position.
    pub fn locate<'r>(&self, record: &'r Value) -> Result<&'r Value, usize> {
        let mut current = record;
        for (depth, &position) in self.positions.iter().enumerate() {
            current = current.field_at(position).ok_or(depth)?;
        }
        Ok(current)
    }
}

/// Compile every projection against `schema`, preserving input order.
///
/// # Errors
/// Returns the first `SchemaError` encountered.
pub fn compile(
    schema: &SchemaNode,
    projections: &[FieldProjection],
) -> Result<Vec<CompiledPath>, SchemaError> {
    projections
        .iter()
        .map(|p| compile_one(schema, p))
        .collect()
}

/// Compile a single projection against `schema`.
///
/// # Errors
/// - `SchemaError::EmptyPath` if the path has no segments.
/// - `SchemaError::NotARecord` if a segment is looked up inside a non-record node.
/// - `SchemaError::UnknownField` if a segment names no field of the current record.
pub fn compile_one(
    schema: &SchemaNode,
    projection: &FieldProjection,
) -> Result<CompiledPath, SchemaError> {
    if projection.path.is_empty() {
        return Err(SchemaError::EmptyPath {
            output: projection.output.clone(),
        });
    }

    let mut node = schema;
    let mut positions = Vec::with_capacity(projection.path.len());
    for segment in &projection.path {
        let Some(fields) = node.fields() else {
            return Err(SchemaError::NotARecord {
                output: projection.output.clone(),
                segment: segment.clone(),
                kind: node.kind(),
            });
        };
        let position = fields
            .iter()
            .position(|f| &f.name == segment)
            .ok_or_else(|| SchemaError::UnknownField {
                output: projection.output.clone(),
                segment: segment.clone(),
            })?;
        positions.push(position);
        node = &fields[position].schema;
    }

    Ok(CompiledPath {
        output: projection.output.clone(),
        target: projection.target,
        positions,
        leaf: node.kind(),
        symbols: node.symbols().map(<[String]>::to_vec),
    })
}
