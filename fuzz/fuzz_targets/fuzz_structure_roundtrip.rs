#![no_main]

use arbitrary::Arbitrary;
use cmdsnap::{FieldTag, Structure, Value};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
enum FuzzValue {
    Integer(i32),
    Bytes(Vec<u8>),
    Text(String),
    TextList(Vec<String>),
}

fuzz_target!(|params: Vec<(String, FuzzValue)>| {
    let mut structure = Structure::new();
    for (key, value) in params {
        let (tag, value) = match value {
            FuzzValue::Integer(n) => (FieldTag::Integer, Value::Integer(i64::from(n))),
            FuzzValue::Bytes(b) => (FieldTag::Bytes, Value::Bytes(b)),
            FuzzValue::Text(s) => (FieldTag::Text, Value::Text(s)),
            FuzzValue::TextList(items) => (FieldTag::TextList, Value::TextList(items)),
        };
        structure.push(tag, key, value);
    }

    let bytes = structure.to_bytes().expect("in-range values always encode");
    let decoded = Structure::from_bytes(&bytes).expect("encoded structure must decode");
    assert_eq!(decoded, structure);

    for cut in 0..bytes.len() {
        assert!(Structure::from_bytes(&bytes[..cut]).is_err());
    }
});
