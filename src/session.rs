//! The projection driver: a pull-based state machine emitting one chunk per call.
//!
//! A session owns its record source for its whole lifetime and releases it exactly once: at
//! end of stream, on the first fatal error, on [`ProjectionSession::close`], or when dropped.

use std::{collections::HashSet, sync::Arc};

use crate::{
    chunk::{Chunk, ChunkLayout, ProjectedChunk},
    coerce::coerce,
    error::{ConfigError, ProjectionError, SourceError},
    resolve::{CompiledPath, FieldProjection, compile},
    schema::SchemaNode,
    source::RecordSource,
    value::Value,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    /// More records may follow.
    Ready,
    /// The source ran dry and the final partial chunk has been returned.
    Drained,
    /// End of stream has been reported.
    Finished,
    /// A fatal error has been reported.
    Failed,
}

/// Streams projected, coerced chunks out of a record source.
pub struct ProjectionSession<S: RecordSource> {
    source: S,
    chunk_size: usize,
    paths: Vec<CompiledPath>,
    layout: Arc<ChunkLayout>,
    state: SessionState,
    records_read: u64,
    closed: bool,
}

impl<S: RecordSource> ProjectionSession<S> {
    /// Compile `projections` against the source's schema and prepare to stream.
    ///
    /// The source is closed before any error is returned.
    ///
    /// # Errors
    /// - `ConfigError` for a zero chunk size, no projections or duplicate output names.
    /// - `SchemaError` if a path does not resolve against the schema.
    pub fn new(
        mut source: S,
        chunk_size: usize,
        projections: Vec<FieldProjection>,
    ) -> Result<Self, ProjectionError> {
        match Self::prepare(source.schema(), chunk_size, &projections) {
            Ok(paths) => {
                tracing::debug!(
                    chunk_size,
                    outputs = ?paths.iter().map(CompiledPath::output).collect::<Vec<_>>(),
                    "compiled projection paths"
                );
                let layout = Arc::new(ChunkLayout::from_compiled(&paths));
                Ok(Self {
                    source,
                    chunk_size,
                    paths,
                    layout,
                    state: SessionState::Ready,
                    records_read: 0,
                    closed: false,
                })
            }
            Err(err) => {
                if let Err(close_err) = source.close() {
                    tracing::warn!(error = %close_err, "failed to close source after setup error");
                }
                Err(err)
            }
        }
    }

    fn prepare(
        schema: &SchemaNode,
        chunk_size: usize,
        projections: &[FieldProjection],
    ) -> Result<Vec<CompiledPath>, ProjectionError> {
        if chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize.into());
        }
        if projections.is_empty() {
            return Err(ConfigError::NoProjections.into());
        }
        let mut seen = HashSet::with_capacity(projections.len());
        if let Some(dup) = projections.iter().find(|p| !seen.insert(p.output.as_str())) {
            return Err(ConfigError::DuplicateOutput {
                output: dup.output.clone(),
            }
            .into());
        }
        Ok(compile(schema, projections)?)
    }

    /// Schema of the underlying source.
    pub fn schema(&self) -> &SchemaNode {
        self.source.schema()
    }

    /// Compiled paths in output column order.
    pub fn compiled_paths(&self) -> &[CompiledPath] {
        &self.paths
    }

    /// Layout shared by every emitted chunk.
    pub fn layout(&self) -> &Arc<ChunkLayout> {
        &self.layout
    }

    /// Configured rows per chunk.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Records consumed so far.
    pub fn records_read(&self) -> u64 {
        self.records_read
    }

    /// Whether end of stream or a fatal error has been reported.
    pub fn is_finished(&self) -> bool {
        matches!(self.state, SessionState::Finished | SessionState::Failed)
    }

    /// Produce the next chunk, or `None` at end of stream.
    ///
    /// A chunk holds exactly `chunk_size` rows unless the source ran out, in which case it holds
    /// the remaining rows. An exhausted source with no pending rows yields `None` directly, so
    /// no empty chunk is ever emitted. After `None` or an error, every call returns `None`.
    ///
    /// # Errors
    /// - `SourceError` if reading or closing the source fails.
    /// - `ProjectionError::MalformedRecord` if a record does not have the declared shape.
    /// - `ProjectionError::Coercion` if a leaf cannot be coerced to its target type.
    pub fn next_chunk(&mut self) -> Result<Option<ProjectedChunk>, ProjectionError> {
        match self.state {
            SessionState::Ready => {}
            SessionState::Drained => {
                self.state = SessionState::Finished;
                return Ok(None);
            }
            SessionState::Finished | SessionState::Failed => return Ok(None),
        }
        match self.fill_chunk() {
            Ok(chunk) => Ok(chunk),
            Err(err) => {
                self.state = SessionState::Failed;
                if let Err(close_err) = self.release() {
                    tracing::warn!(error = %close_err, "failed to close source after error");
                }
                Err(err)
            }
        }
    }

    fn fill_chunk(&mut self) -> Result<Option<ProjectedChunk>, ProjectionError> {
        // Allocated on the first record so an exhausted source costs no buffers.
        let mut chunk: Option<Chunk> = None;
        let mut filled = 0;
        while filled < self.chunk_size {
            let Some(record) = self.source.read_next()? else {
                self.release()?;
                let Some(chunk) = chunk else {
                    self.state = SessionState::Finished;
                    tracing::trace!(records = self.records_read, "end of stream");
                    return Ok(None);
                };
                self.state = SessionState::Drained;
                tracing::trace!(rows = filled, "emitting final chunk");
                return Ok(Some(chunk.finalize(filled)?));
            };
            let current = chunk
                .get_or_insert_with(|| Chunk::new(Arc::clone(&self.layout), self.chunk_size));
            self.project_record(&record, current, filled)?;
            filled += 1;
            self.records_read += 1;
        }
        tracing::trace!(rows = filled, "emitting chunk");
        chunk.map(|c| c.finalize(filled)).transpose().map_err(Into::into)
    }

    fn project_record(
        &self,
        record: &Value,
        chunk: &mut Chunk,
        row: usize,
    ) -> Result<(), ProjectionError> {
        for (column, path) in self.paths.iter().enumerate() {
            let leaf = path
                .locate(record)
                .map_err(|depth| ProjectionError::MalformedRecord {
                    output: path.output().to_owned(),
                    record: self.records_read,
                    depth,
                })?;
            let scalar = coerce(leaf, path.target()).map_err(|source| {
                ProjectionError::Coercion {
                    output: path.output().to_owned(),
                    record: self.records_read,
                    source,
                }
            })?;
            chunk.write_at(column, row, scalar)?;
        }
        Ok(())
    }

    fn release(&mut self) -> Result<(), SourceError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.source.close()
    }

    /// Stop streaming and release the source.
    ///
    /// # Errors
    /// Returns the source's close error, if any.
    pub fn close(mut self) -> Result<(), SourceError> {
        self.state = SessionState::Finished;
        self.release()
    }
}

impl<S: RecordSource> Iterator for ProjectionSession<S> {
    type Item = Result<ProjectedChunk, ProjectionError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_chunk().transpose()
    }
}

impl<S: RecordSource> Drop for ProjectionSession<S> {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            tracing::warn!(error = %err, "failed to close source on drop");
        }
    }
}

#[cfg(feature = "avro")]
impl ProjectionSession<crate::source::ChainSource<crate::avro::AvroFileSource>> {
    /// Open the Avro files matching the glob `config.locator` and start a session over them.
    ///
    /// Matching files are read in path order and must share one schema.
    ///
    /// # Errors
    /// Returns configuration, pattern, I/O, decode or schema errors; no records are read.
    pub fn open(config: &crate::config::ProjectionConfig) -> Result<Self, ProjectionError> {
        let projections = config.projections()?;
        let source = crate::avro::AvroFileSource::open_glob(&config.locator)?;
        Self::new(source, config.chunk_size, projections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{coerce::TargetType, schema::ValueKind, source::MemorySource};

    fn schema() -> SchemaNode {
        SchemaNode::record("r", [("n", ValueKind::Long), ("s", ValueKind::String)])
    }

    fn records(n: i64) -> Vec<Value> {
        (0..n)
            .map(|i| Value::record([("n", Value::from(i)), ("s", Value::from(format!("r{i}")))]))
            .collect()
    }

    fn session(n: i64, chunk: usize) -> ProjectionSession<MemorySource> {
        ProjectionSession::new(
            MemorySource::new(schema(), records(n)),
            chunk,
            vec![
                FieldProjection::new("n", ["n"], TargetType::Integer),
                FieldProjection::new("s", ["s"], TargetType::Text),
            ],
        )
        .unwrap()
    }

    #[test]
    fn rows_continue_across_chunks() {
        let mut s = session(5, 2);
        let sizes: Vec<_> = s.by_ref().map(|c| c.unwrap().num_rows()).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
        assert_eq!(s.records_read(), 5);
        assert!(s.is_finished());
        assert!(s.next_chunk().unwrap().is_none());
    }

    #[test]
    fn values_land_in_row_order() {
        let mut s = session(3, 2);
        let second = {
            s.next_chunk().unwrap().unwrap();
            s.next_chunk().unwrap().unwrap()
        };
        assert_eq!(second.integers("n").unwrap().value(0), 2);
        assert_eq!(second.text("s").unwrap().value(0), "r2");
    }

    #[test]
    fn duplicate_outputs_rejected() {
        let err = ProjectionSession::new(
            MemorySource::new(schema(), []),
            1,
            vec![
                FieldProjection::new("x", ["n"], TargetType::Integer),
                FieldProjection::new("x", ["s"], TargetType::Text),
            ],
        )
        .err()
        .unwrap();
        assert!(matches!(
            err,
            ProjectionError::Config(ConfigError::DuplicateOutput { .. })
        ));
    }

    #[test]
    fn zero_chunk_size_rejected() {
        let err = ProjectionSession::new(
            MemorySource::new(schema(), []),
            0,
            vec![FieldProjection::new("n", ["n"], TargetType::Integer)],
        )
        .err()
        .unwrap();
        assert!(matches!(
            err,
            ProjectionError::Config(ConfigError::ZeroChunkSize)
        ));
    }
}
