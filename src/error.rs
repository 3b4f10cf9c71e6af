//! Error types for projection setup and streaming.

use thiserror::Error;

use crate::{coerce::TargetType, schema::ValueKind};

/// Errors raised while validating a session configuration, before any record is read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The configured chunk size was zero.
    #[error("chunk size must be a positive integer")]
    ZeroChunkSize,

    /// The path map and the type map do not name the same outputs.
    #[error(
        "types must have the same keys as paths (no path for {missing_paths:?}, no type for {missing_types:?})"
    )]
    KeyMismatch {
        /// Output names present in the type map but absent from the path map.
        missing_paths: Vec<String>,
        /// Output names present in the path map but absent from the type map.
        missing_types: Vec<String>,
    },

    /// A projection path had no segments.
    #[error("path for \"{output}\" cannot have zero length")]
    EmptyPath {
        /// Output name of the offending projection.
        output: String,
    },

    /// Two projections share one output name.
    #[error("output name \"{output}\" is used more than once")]
    DuplicateOutput {
        /// The repeated output name.
        output: String,
    },

    /// No projections were configured.
    #[error("at least one field must be selected")]
    NoProjections,

    /// A target type name was not one of the supported spellings.
    #[error("unknown target type \"{name}\" (expected string, category, integer or double)")]
    UnknownTarget {
        /// The rejected type name.
        name: String,
    },

    /// Default projection inference found a field with no natural target type.
    #[error("cannot infer a target type for field \"{field}\" of type {kind}")]
    Uninferable {
        /// Top-level field name.
        field: String,
        /// Declared kind of that field.
        kind: ValueKind,
    },

    /// Default projection inference requires a record at the schema root.
    #[error("top level of schema must describe a record, not {kind}")]
    RootNotRecord {
        /// Declared kind of the schema root.
        kind: ValueKind,
    },
}

/// Errors raised by the path resolver while compiling projections against a schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// A path tried to descend into a node that is not a record.
    #[error("invalid path for \"{output}\": cannot look up \"{segment}\" inside {kind}")]
    NotARecord {
        /// Output name of the offending projection.
        output: String,
        /// Path segment that could not be resolved.
        segment: String,
        /// Kind of the node the segment was looked up in.
        kind: ValueKind,
    },

    /// A path segment named a field absent from the current record.
    #[error("unrecognized name \"{segment}\" in schema for \"{output}\"")]
    UnknownField {
        /// Output name of the offending projection.
        output: String,
        /// The unknown field name.
        segment: String,
    },

    /// A projection path had no segments.
    #[error("path for \"{output}\" cannot have zero length")]
    EmptyPath {
        /// Output name of the offending projection.
        output: String,
    },
}

/// A value could not be represented under the requested target type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoercionError {
    /// No rule exists for this (source kind, target type) pair.
    #[error("cannot cast Avro type {kind} into {target}")]
    Unsupported {
        /// Runtime kind of the source value.
        kind: ValueKind,
        /// Requested target type.
        target: TargetType,
    },
}

/// Misuse of the chunked column writer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChunkError {
    /// No column with this output name exists in the chunk layout.
    #[error("no column named \"{name}\" in chunk")]
    UnknownColumn {
        /// The requested output name.
        name: String,
    },

    /// A positional write or finalize went past the fixed capacity.
    #[error("index {index} out of bounds for chunk capacity {capacity}")]
    OutOfBounds {
        /// Offending index (or filled count).
        index: usize,
        /// Capacity fixed when the chunk was allocated.
        capacity: usize,
    },

    /// A scalar of one target type was written into a column of another.
    #[error("column \"{column}\" stores {expected} values, got {got}")]
    KindMismatch {
        /// Output name of the column.
        column: String,
        /// Target type of the column.
        expected: TargetType,
        /// Target type of the written scalar.
        got: TargetType,
    },

    /// Arrow rejected the assembled batch.
    #[error("arrow error: {message}")]
    Arrow {
        /// Message reported by arrow-rs.
        message: String,
    },
}

/// Errors reported by a record source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Underlying I/O failure (open, read or close).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The container could not be decoded.
    #[error("Avro file reading error: {message}")]
    Decode {
        /// Message reported by the decoder.
        message: String,
    },

    /// Chained sources do not all share one schema.
    #[error("source {index} does not have the same schema as the first source")]
    SchemaMismatch {
        /// Position of the first mismatching source.
        index: usize,
    },

    /// A locator pattern is not a valid glob.
    #[error("invalid file name pattern \"{pattern}\": {message}")]
    Pattern {
        /// The rejected pattern.
        pattern: String,
        /// Reason reported by the pattern parser.
        message: String,
    },

    /// A locator pattern matched no file.
    #[error("no files matched the file name pattern \"{pattern}\"")]
    NoMatch {
        /// The pattern that matched nothing.
        pattern: String,
    },

    /// A chain was constructed without any source.
    #[error("no record sources were supplied")]
    NoSources,

    /// The source was read after it had been closed.
    #[error("record source is closed")]
    Closed,
}

impl SourceError {
    /// Create a decode error from any displayable decoder error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }
}

/// Any failure that aborts a projection session.
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// Invalid session configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A projection path does not resolve against the schema.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// The record source failed.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// A record's shape diverges from the schema its paths were compiled against.
    #[error("Avro file reading error: non-record at depth {depth} of \"{output}\" in record {record}")]
    MalformedRecord {
        /// Output name whose path could not be walked.
        output: String,
        /// Zero-based index of the record within the stream.
        record: u64,
        /// Path depth at which the walk failed.
        depth: usize,
    },

    /// A leaf value could not be coerced to its declared target type.
    #[error("field \"{output}\" of record {record}: {source}")]
    Coercion {
        /// Output name of the failing projection.
        output: String,
        /// Zero-based index of the record within the stream.
        record: u64,
        /// The coercion failure.
        source: CoercionError,
    },

    /// The chunk writer was misused.
    #[error(transparent)]
    Chunk(#[from] ChunkError),
}
