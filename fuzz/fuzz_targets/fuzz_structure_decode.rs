#![no_main]

use cmdsnap::{Snapshot, Structure};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut cursor = std::io::Cursor::new(data);
    if let Ok(structure) = Structure::decode(&mut cursor) {
        // Decoding never reads past the sentinel.
        assert!(cursor.position() as usize <= data.len());
        // Whatever decoded must re-encode to exactly the bytes it consumed.
        let consumed = &data[..cursor.position() as usize];
        if let Ok(reencoded) = structure.to_bytes() {
            if consumed.ends_with(&[b':', b'E', b' ', 0, 0, 0, 0]) {
                assert_eq!(reencoded, consumed);
            }
        }
        let _ = Snapshot::from_structure(&structure);
    }
});
