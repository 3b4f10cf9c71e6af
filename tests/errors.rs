use std::{cell::Cell, rc::Rc};

use avro_columns::{
    CoercionError, ConfigError, FieldProjection, MemorySource, ProjectionError,
    ProjectionSession, RecordSource, SchemaError, SchemaNode, SourceError, TargetType, Value,
    ValueKind,
};

/// Wraps a source and counts how often it is closed.
struct CountingSource {
    inner: MemorySource,
    closes: Rc<Cell<usize>>,
    fail_read_at: Option<usize>,
    reads: usize,
}

impl CountingSource {
    fn new(records: Vec<Value>) -> (Self, Rc<Cell<usize>>) {
        let closes = Rc::new(Cell::new(0));
        let source = Self {
            inner: MemorySource::new(schema(), records),
            closes: Rc::clone(&closes),
            fail_read_at: None,
            reads: 0,
        };
        (source, closes)
    }

    fn failing_at(mut self, read: usize) -> Self {
        self.fail_read_at = Some(read);
        self
    }
}

impl RecordSource for CountingSource {
    fn schema(&self) -> &SchemaNode {
        self.inner.schema()
    }

    fn read_next(&mut self) -> Result<Option<Value>, SourceError> {
        if self.fail_read_at == Some(self.reads) {
            return Err(SourceError::decode("truncated block"));
        }
        self.reads += 1;
        self.inner.read_next()
    }

    fn close(&mut self) -> Result<(), SourceError> {
        self.closes.set(self.closes.get() + 1);
        self.inner.close()
    }
}

// id: long, name: string, tags: {color: enum[red, blue]}
fn schema() -> SchemaNode {
    SchemaNode::record(
        "Event",
        [
            ("id", SchemaNode::from(ValueKind::Long)),
            ("name", SchemaNode::from(ValueKind::String)),
            (
                "tags",
                SchemaNode::record(
                    "Tags",
                    [("color", SchemaNode::enumeration("Color", ["red", "blue"]))],
                ),
            ),
        ],
    )
}

fn event(id: i64) -> Value {
    Value::record([
        ("id", Value::from(id)),
        ("name", Value::from(format!("e{id}"))),
        (
            "tags",
            Value::record([("color", Value::enumeration(0, "red"))]),
        ),
    ])
}

fn events(n: i64) -> Vec<Value> {
    (0..n).map(event).collect()
}

fn id_only() -> Vec<FieldProjection> {
    vec![FieldProjection::new("id", ["id"], TargetType::Integer)]
}

#[test]
fn unknown_field_fails_at_setup() {
    let (source, closes) = CountingSource::new(events(3));
    let err = ProjectionSession::new(
        source,
        2,
        vec![FieldProjection::new("x", ["tags", "size"], TargetType::Real)],
    )
    .err()
    .unwrap();
    match err {
        ProjectionError::Schema(SchemaError::UnknownField { output, segment }) => {
            assert_eq!(output, "x");
            assert_eq!(segment, "size");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(closes.get(), 1);
}

#[test]
fn descending_into_a_leaf_fails_at_setup() {
    let (source, closes) = CountingSource::new(events(1));
    let err = ProjectionSession::new(
        source,
        2,
        vec![FieldProjection::new("x", ["id", "low"], TargetType::Integer)],
    )
    .err()
    .unwrap();
    assert!(matches!(
        err,
        ProjectionError::Schema(SchemaError::NotARecord {
            kind: ValueKind::Long,
            ..
        })
    ));
    assert_eq!(closes.get(), 1);
}

#[test]
fn empty_path_fails_at_setup() {
    let (source, _) = CountingSource::new(vec![]);
    let err = ProjectionSession::new(
        source,
        1,
        vec![FieldProjection::new("x", Vec::<String>::new(), TargetType::Text)],
    )
    .err()
    .unwrap();
    assert!(matches!(
        err,
        ProjectionError::Schema(SchemaError::EmptyPath { .. })
    ));
}

#[test]
fn no_projections_fails_at_setup() {
    let (source, closes) = CountingSource::new(vec![]);
    let err = ProjectionSession::new(source, 1, vec![]).err().unwrap();
    assert!(matches!(
        err,
        ProjectionError::Config(ConfigError::NoProjections)
    ));
    assert_eq!(closes.get(), 1);
}

#[test]
fn category_on_non_enum_fails_the_record() {
    let (source, closes) = CountingSource::new(events(3));
    let mut s = ProjectionSession::new(
        source,
        2,
        vec![FieldProjection::new("n", ["name"], TargetType::Category)],
    )
    .unwrap();
    let err = s.next_chunk().unwrap_err();
    match err {
        ProjectionError::Coercion {
            output,
            record,
            source,
        } => {
            assert_eq!(output, "n");
            assert_eq!(record, 0);
            assert_eq!(
                source,
                CoercionError::Unsupported {
                    kind: ValueKind::String,
                    target: TargetType::Category,
                }
            );
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(closes.get(), 1);
    assert!(s.is_finished());
    assert!(s.next_chunk().unwrap().is_none());
    drop(s);
    assert_eq!(closes.get(), 1);
}

#[test]
fn record_shape_divergence_is_malformed() {
    let mut records = events(2);
    records.push(Value::record([
        ("id", Value::from(9_i64)),
        ("name", Value::from("bad")),
        ("tags", Value::from("not a record")),
    ]));
    let (source, closes) = CountingSource::new(records);
    let mut s = ProjectionSession::new(
        source,
        10,
        vec![FieldProjection::new("c", ["tags", "color"], TargetType::Category)],
    )
    .unwrap();
    let err = s.next_chunk().unwrap_err();
    assert!(matches!(
        err,
        ProjectionError::MalformedRecord {
            record: 2,
            depth: 1,
            ..
        }
    ));
    assert_eq!(closes.get(), 1);
}

#[test]
fn read_failure_propagates_and_releases() {
    let (source, closes) = CountingSource::new(events(5));
    let mut s = ProjectionSession::new(source.failing_at(3), 2, id_only()).unwrap();
    assert_eq!(s.next_chunk().unwrap().unwrap().num_rows(), 2);
    let err = s.next_chunk().unwrap_err();
    assert!(matches!(
        err,
        ProjectionError::Source(SourceError::Decode { .. })
    ));
    assert_eq!(closes.get(), 1);
    assert!(s.next().is_none());
}

#[test]
fn source_closed_once_at_end_of_stream() {
    let (source, closes) = CountingSource::new(events(4));
    let mut s = ProjectionSession::new(source, 4, id_only()).unwrap();
    assert_eq!(s.next_chunk().unwrap().unwrap().num_rows(), 4);
    assert_eq!(closes.get(), 0);
    assert!(s.next_chunk().unwrap().is_none());
    assert_eq!(closes.get(), 1);
    s.close().unwrap();
    assert_eq!(closes.get(), 1);
}

#[test]
fn explicit_close_mid_stream() {
    let (source, closes) = CountingSource::new(events(10));
    let mut s = ProjectionSession::new(source, 3, id_only()).unwrap();
    s.next_chunk().unwrap().unwrap();
    s.close().unwrap();
    assert_eq!(closes.get(), 1);
}

#[test]
fn dropping_a_live_session_closes_the_source() {
    let (source, closes) = CountingSource::new(events(10));
    let mut s = ProjectionSession::new(source, 3, id_only()).unwrap();
    s.next_chunk().unwrap().unwrap();
    drop(s);
    assert_eq!(closes.get(), 1);
}

#[test]
fn error_messages_name_the_output() {
    let (source, _) = CountingSource::new(events(1));
    let err = ProjectionSession::new(
        source,
        1,
        vec![FieldProjection::new("tag", ["tags", "size"], TargetType::Text)],
    )
    .err()
    .unwrap();
    let message = err.to_string();
    assert!(message.contains("tag"), "{message}");
    assert!(message.contains("size"), "{message}");
}
