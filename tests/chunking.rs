use arrow_array::Array;
use avro_columns::{
    FieldProjection, MemorySource, ProjectionSession, SchemaNode, TargetType, Value, ValueKind,
};

// id: long
// tags: record
//   color: enum[red, blue]
//   weight: double
fn schema() -> SchemaNode {
    SchemaNode::record(
        "Event",
        [
            ("id", SchemaNode::from(ValueKind::Long)),
            (
                "tags",
                SchemaNode::record(
                    "Tags",
                    [
                        ("color", SchemaNode::enumeration("Color", ["red", "blue"])),
                        ("weight", SchemaNode::from(ValueKind::Double)),
                    ],
                ),
            ),
        ],
    )
}

fn event(id: i64) -> Value {
    let color = (id % 2) as u32;
    let symbol = if color == 0 { "red" } else { "blue" };
    Value::record([
        ("id", Value::from(id)),
        (
            "tags",
            Value::record([
                ("color", Value::enumeration(color, symbol)),
                ("weight", Value::from(id as f64 * 0.5)),
            ]),
        ),
    ])
}

fn projections() -> Vec<FieldProjection> {
    vec![
        FieldProjection::new("id", ["id"], TargetType::Integer),
        FieldProjection::new("c", ["tags", "color"], TargetType::Category),
        FieldProjection::new("w", ["tags", "weight"], TargetType::Real),
    ]
}

fn session(n: i64, chunk_size: usize) -> ProjectionSession<MemorySource> {
    let source = MemorySource::new(schema(), (0..n).map(event));
    ProjectionSession::new(source, chunk_size, projections()).unwrap()
}

fn chunk_sizes(n: i64, chunk_size: usize) -> Vec<usize> {
    session(n, chunk_size)
        .map(|chunk| chunk.unwrap().num_rows())
        .collect()
}

#[test]
fn five_records_in_chunks_of_three() {
    let mut s = session(5, 3);

    let first = s.next_chunk().unwrap().unwrap();
    assert_eq!(first.num_rows(), 3);
    assert_eq!(&first.integers("id").unwrap().values()[..], &[0, 1, 2]);
    assert_eq!(&first.categories("c").unwrap().values()[..], &[0, 1, 0]);
    assert_eq!(&first.reals("w").unwrap().values()[..], &[0.0, 0.5, 1.0]);
    assert_eq!(first.symbols("c").unwrap(), ["red", "blue"]);

    let second = s.next_chunk().unwrap().unwrap();
    assert_eq!(second.num_rows(), 2);
    assert_eq!(&second.integers("id").unwrap().values()[..], &[3, 4]);
    assert_eq!(second.reals("w").unwrap().len(), 2);

    assert!(s.next_chunk().unwrap().is_none());
    assert!(s.next_chunk().unwrap().is_none());
    assert!(s.is_finished());
}

#[test]
fn chunk_count_is_ceiling_of_n_over_k() {
    for n in 1..=12_i64 {
        for k in 1..=n as usize {
            let sizes = chunk_sizes(n, k);
            let n = n as usize;
            assert_eq!(sizes.len(), n.div_ceil(k), "n={n} k={k}");
            assert!(sizes[..sizes.len() - 1].iter().all(|&rows| rows == k));
            let last = if n % k == 0 { k } else { n % k };
            assert_eq!(*sizes.last().unwrap(), last, "n={n} k={k}");
            assert_eq!(sizes.iter().sum::<usize>(), n);
        }
    }
}

#[test]
fn exact_multiple_has_no_trailing_empty_chunk() {
    assert_eq!(chunk_sizes(6, 3), vec![3, 3]);
    assert_eq!(chunk_sizes(4, 4), vec![4]);
}

#[test]
fn chunk_larger_than_stream() {
    assert_eq!(chunk_sizes(2, 100), vec![2]);
}

#[test]
fn empty_stream_yields_end_of_stream_only() {
    let mut s = session(0, 3);
    assert!(s.next_chunk().unwrap().is_none());
    assert!(s.next_chunk().unwrap().is_none());
    assert_eq!(s.records_read(), 0);
}

#[test]
fn chunks_share_one_arrow_schema() {
    let s = session(4, 3);
    let expected = s.layout().schema().clone();
    let batches: Vec<_> = s.map(|c| c.unwrap().into_batch()).collect();
    assert_eq!(batches.len(), 2);
    for batch in &batches {
        assert_eq!(batch.schema(), expected);
        assert_eq!(batch.num_columns(), 3);
    }
    let names: Vec<_> = expected.fields().iter().map(|f| f.name().clone()).collect();
    assert_eq!(names, vec!["id", "c", "w"]);
}

#[test]
fn compiling_twice_is_identical() {
    let a = session(1, 1);
    let b = session(1, 1);
    assert_eq!(a.compiled_paths(), b.compiled_paths());
    assert_eq!(a.compiled_paths()[1].positions(), &[1, 0]);
}

#[test]
fn nullable_strings_render_null_literal() {
    let schema = SchemaNode::record(
        "r",
        [(
            "note",
            SchemaNode::Union(vec![ValueKind::Null.into(), ValueKind::String.into()]),
        )],
    );
    let records = [
        Value::record([("note", Value::union(1, Value::from("hi")))]),
        Value::record([("note", Value::union(0, Value::Null))]),
    ];
    let mut s = ProjectionSession::new(
        MemorySource::new(schema, records),
        10,
        vec![FieldProjection::new("note", ["note"], TargetType::Text)],
    )
    .unwrap();
    let chunk = s.next_chunk().unwrap().unwrap();
    let notes = chunk.text("note").unwrap();
    assert_eq!(notes.value(0), "hi");
    assert_eq!(notes.value(1), "null");
}
