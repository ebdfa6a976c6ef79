use cmdsnap::{FieldTag, Snapshot, SnapshotError, Structure, Value};
use proptest::prelude::*;

fn sample_snapshot() -> Snapshot {
    Snapshot {
        ret: 3,
        halted: false,
        argv: vec!["grep".into(), "-n".into(), "needle".into()],
        stdin: b"hay\nneedle\n".to_vec(),
        stdout: b"2:needle\n".to_vec(),
        stderr: Vec::new(),
    }
}

#[test]
fn snapshot_round_trips_through_bytes() {
    let snap = sample_snapshot();
    let bytes = snap.to_bytes().unwrap();
    assert_eq!(Snapshot::from_bytes(&bytes).unwrap(), snap);
    assert_eq!(
        Structure::from_bytes(&bytes).unwrap(),
        snap.to_structure(),
        "decoded structure must keep keys, tags, values and order"
    );
}

#[test]
fn text_list_keeps_each_item_length() {
    let s = Structure::new().with(
        FieldTag::TextList,
        "argv",
        Value::TextList(vec!["a".into(), "bb".into(), "ccc".into()]),
    );
    let bytes = s.to_bytes().unwrap();

    let mut expected = vec![b':', b'l', b' ', 0, 0, 0, 4];
    expected.extend_from_slice(b"argv");
    expected.extend_from_slice(&[0, 0, 0, 3]);
    expected.extend_from_slice(&[0, 0, 0, 1, b'a']);
    expected.extend_from_slice(&[0, 0, 0, 2, b'b', b'b']);
    expected.extend_from_slice(&[0, 0, 0, 3, b'c', b'c', b'c']);
    expected.extend_from_slice(&[b':', b'E', b' ', 0, 0, 0, 0]);
    assert_eq!(bytes, expected);

    let decoded = Structure::from_bytes(&bytes).unwrap();
    assert_eq!(decoded.text_list("argv").unwrap(), ["a", "bb", "ccc"]);
}

#[test]
fn every_strict_prefix_is_truncated_input() {
    let bytes = sample_snapshot().to_bytes().unwrap();
    for cut in 0..bytes.len() {
        match Structure::from_bytes(&bytes[..cut]) {
            Err(SnapshotError::TruncatedInput(_)) => {}
            other => panic!("prefix of {cut}/{} bytes decoded to {other:?}", bytes.len()),
        }
    }
}

#[test]
fn unknown_tag_in_stream_is_rejected() {
    let mut bytes = sample_snapshot().to_bytes().unwrap();
    assert_eq!(bytes[1], b'i');
    bytes[1] = b'q';
    assert!(matches!(
        Structure::from_bytes(&bytes),
        Err(SnapshotError::UnknownTag(b'q'))
    ));
}

#[test]
fn desynchronized_stream_is_malformed() {
    let mut bytes = sample_snapshot().to_bytes().unwrap();
    bytes[0] = 0;
    assert!(matches!(
        Structure::from_bytes(&bytes),
        Err(SnapshotError::MalformedField {
            what: "field start",
            ..
        })
    ));
}

fn value_strategy() -> impl Strategy<Value = (FieldTag, Value)> {
    prop_oneof![
        any::<i32>().prop_map(|n| (FieldTag::Integer, Value::Integer(i64::from(n)))),
        proptest::collection::vec(any::<u8>(), 0..64)
            .prop_map(|b| (FieldTag::Bytes, Value::Bytes(b))),
        ".{0,16}".prop_map(|s| (FieldTag::Text, Value::Text(s))),
        proptest::collection::vec(".{0,8}", 0..6)
            .prop_map(|items| (FieldTag::TextList, Value::TextList(items))),
    ]
}

proptest! {
    #[test]
    fn arbitrary_structures_round_trip(
        params in proptest::collection::vec(("[a-z]{0,8}", value_strategy()), 0..12)
    ) {
        let mut s = Structure::new();
        for (key, (tag, value)) in params {
            s.push(tag, key, value);
        }
        let bytes = s.to_bytes().unwrap();
        prop_assert_eq!(Structure::from_bytes(&bytes).unwrap(), s);
    }

    #[test]
    fn arbitrary_snapshots_round_trip(
        ret in any::<i32>(),
        halted in any::<bool>(),
        argv in proptest::collection::vec(".{0,12}", 1..5),
        stdin in proptest::collection::vec(any::<u8>(), 0..128),
        stdout in proptest::collection::vec(any::<u8>(), 0..128),
        stderr in proptest::collection::vec(any::<u8>(), 0..128),
    ) {
        let snap = Snapshot { ret, halted, argv, stdin, stdout, stderr };
        prop_assert_eq!(Snapshot::from_bytes(&snap.to_bytes().unwrap()).unwrap(), snap);
    }
}
