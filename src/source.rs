//! Record sources: the seam between the projector and a container decoder.

use std::collections::VecDeque;

use crate::{error::SourceError, schema::SchemaNode, value::Value};

/// A forward-only stream of decoded records sharing one declared schema.
pub trait RecordSource {
    /// Schema every record of this source conforms to.
    fn schema(&self) -> &SchemaNode;

    /// Read the next record, or `None` once the stream is exhausted.
    ///
    /// # Errors
    /// Returns a `SourceError` if the underlying container cannot be read.
    fn read_next(&mut self) -> Result<Option<Value>, SourceError>;

    /// Release the underlying resource.
    ///
    /// # Errors
    /// Returns a `SourceError` if releasing fails.
    fn close(&mut self) -> Result<(), SourceError>;
}

impl<S: RecordSource + ?Sized> RecordSource for Box<S> {
    fn schema(&self) -> &SchemaNode {
        (**self).schema()
    }

    fn read_next(&mut self) -> Result<Option<Value>, SourceError> {
        (**self).read_next()
    }

    fn close(&mut self) -> Result<(), SourceError> {
        (**self).close()
    }
}

/// Records held in memory.
#[derive(Debug, Clone)]
pub struct MemorySource {
    schema: SchemaNode,
    records: VecDeque<Value>,
    closed: bool,
}

impl MemorySource {
    /// Create a source yielding `records` in order.
    pub fn new(schema: SchemaNode, records: impl IntoIterator<Item = Value>) -> Self {
        Self {
            schema,
            records: records.into_iter().collect(),
            closed: false,
        }
    }

    /// Records not yet read.
    pub fn remaining(&self) -> usize {
        self.records.len()
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl RecordSource for MemorySource {
    fn schema(&self) -> &SchemaNode {
        &self.schema
    }

    fn read_next(&mut self) -> Result<Option<Value>, SourceError> {
        if self.closed {
            return Err(SourceError::Closed);
        }
        Ok(self.records.pop_front())
    }

    fn close(&mut self) -> Result<(), SourceError> {
        self.closed = true;
        self.records.clear();
        Ok(())
    }
}

/// Several sources with identical schemas read back to back as one stream.
///
/// Each inner source is closed as soon as it is exhausted; [`RecordSource::close`] closes the
/// ones not yet reached.
pub struct ChainSource<S> {
    sources: VecDeque<S>,
    schema: SchemaNode,
}

impl<S: RecordSource> ChainSource<S> {
    /// Chain `sources` in order.
    ///
    /// # Errors
    /// - `SourceError::NoSources` if `sources` is empty.
    /// - `SourceError::SchemaMismatch` if a source's schema differs from the first one's; every
    ///   source is closed before returning.
    pub fn new(sources: impl IntoIterator<Item = S>) -> Result<Self, SourceError> {
        let mut sources: VecDeque<S> = sources.into_iter().collect();
        let schema = sources
            .front()
            .map(|s| s.schema().clone())
            .ok_or(SourceError::NoSources)?;
        if let Some(index) = sources.iter().position(|s| s.schema() != &schema) {
            for source in &mut sources {
                if let Err(err) = source.close() {
                    tracing::warn!(error = %err, "failed to close chained source");
                }
            }
            return Err(SourceError::SchemaMismatch { index });
        }
        Ok(Self { sources, schema })
    }

    /// Sources not yet exhausted.
    pub fn remaining(&self) -> usize {
        self.sources.len()
    }
}

impl<S: RecordSource> RecordSource for ChainSource<S> {
    fn schema(&self) -> &SchemaNode {
        &self.schema
    }

    fn read_next(&mut self) -> Result<Option<Value>, SourceError> {
        loop {
            let Some(current) = self.sources.front_mut() else {
                return Ok(None);
            };
            if let Some(record) = current.read_next()? {
                return Ok(Some(record));
            }
            if let Some(mut finished) = self.sources.pop_front() {
                finished.close()?;
            }
        }
    }

    fn close(&mut self) -> Result<(), SourceError> {
        let mut first_err = None;
        for mut source in self.sources.drain(..) {
            if let Err(err) = source.close() {
                first_err.get_or_insert(err);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}
