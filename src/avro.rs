//! Avro object container files as a [`RecordSource`].
//!
//! Block framing, codecs and sync markers are handled by `apache-avro`; this module only maps
//! its writer schema and decoded values onto [`SchemaNode`] and [`Value`].

use std::{
    collections::HashMap,
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use apache_avro::{Reader, Schema, schema::Name, types::Value as AvroValue};

use crate::{
    error::SourceError,
    schema::{SchemaField, SchemaNode, ValueKind},
    source::{ChainSource, RecordSource},
    value::Value,
};

/// Records decoded from one Avro object container.
pub struct AvroFileSource<R: Read = BufReader<File>> {
    reader: Option<Reader<'static, R>>,
    schema: SchemaNode,
    canonical: String,
}

impl AvroFileSource {
    /// Open the container file at `path`.
    ///
    /// # Errors
    /// Returns `SourceError::Io` if the file cannot be opened and `SourceError::Decode` if its
    /// header is not a valid Avro container header.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        tracing::debug!(path = %path.display(), "opened avro container");
        Self::from_reader(BufReader::new(file))
    }

    /// Open several container files and read them back to back.
    ///
    /// # Errors
    /// Fails on the first file that cannot be opened, or with `SourceError::SchemaMismatch` if
    /// the files do not all share one schema.
    pub fn open_all<P: AsRef<Path>>(
        paths: impl IntoIterator<Item = P>,
    ) -> Result<ChainSource<Self>, SourceError> {
        let sources = paths
            .into_iter()
            .map(Self::open)
            .collect::<Result<Vec<_>, _>>()?;
        ChainSource::new(sources)
    }

    /// Open every file matching the glob `pattern`, in path order, as one stream.
    ///
    /// A plain path without metacharacters matches itself when it exists.
    ///
    /// # Errors
    /// - `SourceError::Pattern` if `pattern` is not a valid glob.
    /// - `SourceError::NoMatch` if no file matches.
    /// - Otherwise as [`AvroFileSource::open_all`].
    pub fn open_glob(pattern: &str) -> Result<ChainSource<Self>, SourceError> {
        let entries = glob::glob(pattern).map_err(|e| SourceError::Pattern {
            pattern: pattern.to_owned(),
            message: e.to_string(),
        })?;
        let paths = entries
            .map(|entry| entry.map_err(glob::GlobError::into_error))
            .collect::<Result<Vec<_>, _>>()?;
        if paths.is_empty() {
            return Err(SourceError::NoMatch {
                pattern: pattern.to_owned(),
            });
        }
        tracing::debug!(pattern, files = paths.len(), "expanded avro locator");
        Self::open_all(paths)
    }
}

impl<R: Read> AvroFileSource<R> {
    /// Read a container from any byte stream.
    ///
    /// # Errors
    /// Returns `SourceError::Decode` if the header cannot be decoded.
    pub fn from_reader(input: R) -> Result<Self, SourceError> {
        let reader = Reader::new(input).map_err(|e| SourceError::decode(e.to_string()))?;
        let writer_schema = reader.writer_schema();
        let schema = SchemaConverter::default().convert(writer_schema);
        let canonical = writer_schema.canonical_form();
        Ok(Self {
            reader: Some(reader),
            schema,
            canonical,
        })
    }

    /// Parsing canonical form of the writer schema, as JSON text.
    pub fn canonical_schema(&self) -> &str {
        &self.canonical
    }
}

impl<R: Read> RecordSource for AvroFileSource<R> {
    fn schema(&self) -> &SchemaNode {
        &self.schema
    }

    fn read_next(&mut self) -> Result<Option<Value>, SourceError> {
        let reader = self.reader.as_mut().ok_or(SourceError::Closed)?;
        match reader.next() {
            None => Ok(None),
            Some(Ok(value)) => Ok(Some(convert_value(value))),
            Some(Err(err)) => Err(SourceError::decode(err.to_string())),
        }
    }

    fn close(&mut self) -> Result<(), SourceError> {
        self.reader = None;
        Ok(())
    }
}

// Named types are defined before they are referenced, so a single pass resolves references.
// A reference to a record still being converted (a recursive type) stays opaque.
#[derive(Default)]
struct SchemaConverter {
    named: HashMap<Name, SchemaNode>,
}

impl SchemaConverter {
    fn convert(&mut self, schema: &Schema) -> SchemaNode {
        match schema {
            Schema::Null => ValueKind::Null.into(),
            Schema::Boolean => ValueKind::Boolean.into(),
            Schema::Int | Schema::Date | Schema::TimeMillis => ValueKind::Int.into(),
            Schema::Long
            | Schema::TimeMicros
            | Schema::TimestampMillis
            | Schema::TimestampMicros
            | Schema::TimestampNanos
            | Schema::LocalTimestampMillis
            | Schema::LocalTimestampMicros
            | Schema::LocalTimestampNanos => ValueKind::Long.into(),
            Schema::Float => ValueKind::Float.into(),
            Schema::Double => ValueKind::Double.into(),
            Schema::Bytes => ValueKind::Bytes.into(),
            // Arbitrary-precision decimals have no fixed scale, so they surface as decimal text.
            Schema::String | Schema::Uuid | Schema::BigDecimal => ValueKind::String.into(),
            // Decimal values decode to their unscaled two's-complement bytes whatever the
            // backing type, so a fixed-backed decimal is still a bytes leaf.
            Schema::Decimal(decimal) => {
                self.convert(&decimal.inner);
                ValueKind::Bytes.into()
            }
            Schema::Duration => ValueKind::Fixed.into(),
            Schema::Fixed(fixed) => {
                let node = SchemaNode::from(ValueKind::Fixed);
                self.named.insert(fixed.name.clone(), node.clone());
                node
            }
            Schema::Array(_) => ValueKind::Array.into(),
            Schema::Map(_) => ValueKind::Map.into(),
            Schema::Union(union) => {
                SchemaNode::Union(union.variants().iter().map(|v| self.convert(v)).collect())
            }
            Schema::Enum(e) => {
                let node = SchemaNode::Enum {
                    name: e.name.name.clone(),
                    symbols: e.symbols.clone(),
                };
                self.named.insert(e.name.clone(), node.clone());
                node
            }
            Schema::Record(record) => {
                let fields = record
                    .fields
                    .iter()
                    .map(|f| SchemaField::new(f.name.clone(), self.convert(&f.schema)))
                    .collect();
                let node = SchemaNode::Record {
                    name: record.name.name.clone(),
                    fields,
                };
                self.named.insert(record.name.clone(), node.clone());
                node
            }
            Schema::Ref { name } => self
                .named
                .get(name)
                .cloned()
                .unwrap_or(SchemaNode::Leaf(ValueKind::Record)),
            _ => ValueKind::Other.into(),
        }
    }
}

fn convert_value(value: AvroValue) -> Value {
    match value {
        AvroValue::Null => Value::Null,
        AvroValue::Boolean(b) => Value::Boolean(b),
        AvroValue::Int(v) | AvroValue::Date(v) | AvroValue::TimeMillis(v) => Value::Int(v),
        AvroValue::Long(v)
        | AvroValue::TimeMicros(v)
        | AvroValue::TimestampMillis(v)
        | AvroValue::TimestampMicros(v)
        | AvroValue::TimestampNanos(v)
        | AvroValue::LocalTimestampMillis(v)
        | AvroValue::LocalTimestampMicros(v)
        | AvroValue::LocalTimestampNanos(v) => Value::Long(v),
        AvroValue::Float(v) => Value::Float(v),
        AvroValue::Double(v) => Value::Double(v),
        AvroValue::Bytes(b) => Value::Bytes(b),
        AvroValue::String(s) => Value::String(s),
        AvroValue::Uuid(u) => Value::String(u.to_string()),
        AvroValue::BigDecimal(d) => Value::String(d.to_string()),
        AvroValue::Decimal(d) => Vec::<u8>::try_from(&d).map_or(Value::Other, Value::Bytes),
        AvroValue::Duration(d) => Value::Fixed(<[u8; 12]>::from(d).to_vec()),
        AvroValue::Fixed(_, b) => Value::Fixed(b),
        AvroValue::Enum(index, symbol) => Value::Enum { index, symbol },
        AvroValue::Union(branch, inner) => Value::union(branch, convert_value(*inner)),
        AvroValue::Array(items) => Value::Array(items.into_iter().map(convert_value).collect()),
        AvroValue::Map(entries) => {
            let mut entries: Vec<_> = entries
                .into_iter()
                .map(|(k, v)| (k, convert_value(v)))
                .collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Map(entries)
        }
        AvroValue::Record(fields) => Value::Record(
            fields
                .into_iter()
                .map(|(name, v)| (name, convert_value(v)))
                .collect(),
        ),
        _ => Value::Other,
    }
}
