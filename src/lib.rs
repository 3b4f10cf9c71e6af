#![deny(missing_docs)]
//! Schema-driven columnar projection of Avro-style record streams.
//!
//! A [`ProjectionSession`] resolves a set of named field paths against the schema of a
//! [`RecordSource`] once, then pulls records in fixed-size chunks. Each selected leaf is
//! coerced to one of four output types ([`TargetType`]) and written into Arrow columns, so
//! every emitted [`ProjectedChunk`] wraps a `RecordBatch` with one column per output name.

#[cfg(feature = "avro")]
mod avro;
mod chunk;
mod coerce;
mod config;
mod error;
mod resolve;
mod schema;
mod session;
mod source;
mod value;

// Re-export Arrow crates so downstream users can read chunks without depending on Arrow
// directly.
pub use arrow_array;
pub use arrow_buffer;
pub use arrow_schema;

#[cfg(feature = "avro")]
pub use avro::AvroFileSource;
pub use chunk::{Chunk, ChunkLayout, ColumnSpec, ProjectedChunk, SYMBOLS_METADATA_KEY};
pub use coerce::{Scalar, TargetType, coerce};
pub use config::{DEFAULT_CHUNK_SIZE, FieldPath, ProjectionConfig, infer_target};
pub use error::{
    ChunkError, CoercionError, ConfigError, ProjectionError, SchemaError, SourceError,
};
pub use resolve::{CompiledPath, FieldProjection, compile, compile_one};
pub use schema::{SchemaField, SchemaNode, ValueKind};
pub use session::ProjectionSession;
pub use source::{ChainSource, MemorySource, RecordSource};
pub use value::Value;
