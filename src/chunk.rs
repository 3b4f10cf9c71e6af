//! Fixed-capacity typed column buffers and the finished chunk type.
//!
//! A [`Chunk`] owns one buffer per output column, each sized to the chunk capacity when it is
//! allocated. Writes are positional sets; nothing grows. [`Chunk::finalize`] shrinks the
//! logical length of every column to the filled row count: numeric columns are zero-copy
//! slices of their capacity-sized buffers, text columns are packed into Arrow's contiguous
//! UTF-8 layout.

use std::{collections::HashMap, sync::Arc};

use arrow_array::{Array, ArrayRef, Float64Array, Int64Array, RecordBatch, StringArray};
use arrow_buffer::ScalarBuffer;
use arrow_schema::{Field, Schema, SchemaRef};

use crate::{
    coerce::{Scalar, TargetType},
    error::ChunkError,
    resolve::CompiledPath,
};

/// Field metadata key under which category columns list their enum symbols.
pub const SYMBOLS_METADATA_KEY: &str = "avro.symbols";

/// Declaration of one output column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    /// Output column name.
    pub name: String,
    /// Semantic type of the column.
    pub target: TargetType,
    /// Enum symbols for category columns, when known.
    pub symbols: Option<Vec<String>>,
}

impl ColumnSpec {
    /// Construct a column without symbols.
    pub fn new(name: impl Into<String>, target: TargetType) -> Self {
        Self {
            name: name.into(),
            target,
            symbols: None,
        }
    }

    fn field(&self) -> Field {
        let field = Field::new(self.name.clone(), self.target.data_type(), false);
        match (&self.symbols, self.target) {
            (Some(symbols), TargetType::Category) => field.with_metadata(HashMap::from([(
                SYMBOLS_METADATA_KEY.to_string(),
                symbols.join(","),
            )])),
            _ => field,
        }
    }
}

impl From<&CompiledPath> for ColumnSpec {
    fn from(path: &CompiledPath) -> Self {
        Self {
            name: path.output().to_owned(),
            target: path.target(),
            symbols: path.symbols().map(<[String]>::to_vec),
        }
    }
}

/// Column names, types and the Arrow schema shared by every chunk of a session.
#[derive(Debug, Clone)]
pub struct ChunkLayout {
    columns: Vec<ColumnSpec>,
    schema: SchemaRef,
    by_name: HashMap<String, usize>,
}

impl ChunkLayout {
    /// Build a layout from column declarations, in order.
    pub fn new(columns: Vec<ColumnSpec>) -> Self {
        let fields: Vec<Field> = columns.iter().map(ColumnSpec::field).collect();
        let by_name = columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name.clone(), i))
            .collect();
        Self {
            schema: Arc::new(Schema::new(fields)),
            columns,
            by_name,
        }
    }

    /// Build a layout with one column per compiled path.
    pub fn from_compiled(paths: &[CompiledPath]) -> Self {
        Self::new(paths.iter().map(ColumnSpec::from).collect())
    }

    /// Arrow schema of finished chunks.
    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    /// Column declarations in order.
    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    /// Index of the column named `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }
}

enum ColumnBuffer {
    Text(Vec<String>),
    Int64(Vec<i64>),
    Float64(Vec<f64>),
}

impl ColumnBuffer {
    fn with_capacity(target: TargetType, capacity: usize) -> Self {
        match target {
            TargetType::Text => ColumnBuffer::Text(vec![String::new(); capacity]),
            TargetType::Category | TargetType::Integer => ColumnBuffer::Int64(vec![0; capacity]),
            TargetType::Real => ColumnBuffer::Float64(vec![0.0; capacity]),
        }
    }

    fn finish(self, filled: usize) -> ArrayRef {
        match self {
            ColumnBuffer::Text(slots) => {
                Arc::new(StringArray::from_iter_values(&slots[..filled]))
            }
            ColumnBuffer::Int64(values) => Arc::new(Int64Array::new(
                ScalarBuffer::from(values).slice(0, filled),
                None,
            )),
            ColumnBuffer::Float64(values) => Arc::new(Float64Array::new(
                ScalarBuffer::from(values).slice(0, filled),
                None,
            )),
        }
    }
}

/// A batch of output rows under construction.
pub struct Chunk {
    layout: Arc<ChunkLayout>,
    columns: Vec<ColumnBuffer>,
    capacity: usize,
}

impl Chunk {
    /// Allocate one buffer of `capacity` slots per column of `layout`.
    pub fn new(layout: Arc<ChunkLayout>, capacity: usize) -> Self {
        let columns = layout
            .columns
            .iter()
            .map(|c| ColumnBuffer::with_capacity(c.target, capacity))
            .collect();
        Self {
            layout,
            columns,
            capacity,
        }
    }

    /// Capacity fixed at allocation.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Layout shared with the session.
    pub fn layout(&self) -> &Arc<ChunkLayout> {
        &self.layout
    }

    /// Set row `index` of the column named `name`.
    ///
    /// # Errors
    /// Returns `ChunkError::UnknownColumn` for an unknown name, otherwise see
    /// [`Chunk::write_at`].
    pub fn write(&mut self, name: &str, index: usize, value: Scalar) -> Result<(), ChunkError> {
        let column = self
            .layout
            .index_of(name)
            .ok_or_else(|| ChunkError::UnknownColumn {
                name: name.to_owned(),
            })?;
        self.write_at(column, index, value)
    }

    /// Set row `index` of column number `column`.
    ///
    /// # Errors
    /// - `ChunkError::OutOfBounds` if `index >= capacity`.
    /// - `ChunkError::KindMismatch` if the scalar's target differs from the column's.
    pub fn write_at(&mut self, column: usize, index: usize, value: Scalar) -> Result<(), ChunkError> {
        if index >= self.capacity {
            return Err(ChunkError::OutOfBounds {
                index,
                capacity: self.capacity,
            });
        }
        let spec = self
            .layout
            .columns
            .get(column)
            .ok_or_else(|| ChunkError::UnknownColumn {
                name: format!("#{column}"),
            })?;
        if value.target() != spec.target {
            return Err(ChunkError::KindMismatch {
                column: spec.name.clone(),
                expected: spec.target,
                got: value.target(),
            });
        }
        match (&mut self.columns[column], value) {
            (ColumnBuffer::Text(slots), Scalar::Text(s)) => slots[index] = s,
            (ColumnBuffer::Int64(values), Scalar::Category(v) | Scalar::Integer(v)) => {
                values[index] = v;
            }
            (ColumnBuffer::Float64(values), Scalar::Real(v)) => values[index] = v,
            _ => unreachable!("buffer kind follows column target"),
        }
        Ok(())
    }

    /// Truncate every column to `filled` rows and assemble the finished chunk.
    ///
    /// # Errors
    /// Returns `ChunkError::OutOfBounds` if `filled` exceeds the capacity.
    pub fn finalize(self, filled: usize) -> Result<ProjectedChunk, ChunkError> {
        if filled > self.capacity {
            return Err(ChunkError::OutOfBounds {
                index: filled,
                capacity: self.capacity,
            });
        }
        let arrays: Vec<ArrayRef> = self
            .columns
            .into_iter()
            .map(|c| c.finish(filled))
            .collect();
        let batch = RecordBatch::try_new(Arc::clone(&self.layout.schema), arrays).map_err(|e| {
            ChunkError::Arrow {
                message: e.to_string(),
            }
        })?;
        Ok(ProjectedChunk {
            layout: self.layout,
            batch,
        })
    }
}

/// A finished chunk: one Arrow column per output name, all with the same row count.
#[derive(Debug, Clone)]
pub struct ProjectedChunk {
    layout: Arc<ChunkLayout>,
    batch: RecordBatch,
}

impl ProjectedChunk {
    /// Number of rows in every column.
    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    /// The underlying record batch.
    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    /// Consume the chunk into its record batch.
    pub fn into_batch(self) -> RecordBatch {
        self.batch
    }

    /// Column named `name` as a type-erased Arrow array.
    pub fn column(&self, name: &str) -> Option<&ArrayRef> {
        self.layout.index_of(name).map(|i| self.batch.column(i))
    }

    fn typed<A: Array + 'static>(&self, name: &str, target: TargetType) -> Option<&A> {
        let index = self.layout.index_of(name)?;
        if self.layout.columns[index].target != target {
            return None;
        }
        self.batch.column(index).as_any().downcast_ref::<A>()
    }

    /// Text column named `name`.
    pub fn text(&self, name: &str) -> Option<&StringArray> {
        self.typed(name, TargetType::Text)
    }

    /// Category ordinals of the column named `name`.
    pub fn categories(&self, name: &str) -> Option<&Int64Array> {
        self.typed(name, TargetType::Category)
    }

    /// Integer column named `name`.
    pub fn integers(&self, name: &str) -> Option<&Int64Array> {
        self.typed(name, TargetType::Integer)
    }

    /// Real column named `name`.
    pub fn reals(&self, name: &str) -> Option<&Float64Array> {
        self.typed(name, TargetType::Real)
    }

    /// Enum symbols of the category column named `name`.
    pub fn symbols(&self, name: &str) -> Option<&[String]> {
        let index = self.layout.index_of(name)?;
        self.layout.columns[index].symbols.as_deref()
    }
}
