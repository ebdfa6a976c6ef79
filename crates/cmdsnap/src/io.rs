use std::io::{Read, Write};

use crate::error::{Result, SnapshotError};
use crate::format::{FieldTag, FIELD_SEPARATOR, FIELD_START, INT_WIDTH};

pub trait WriteBeExt: Write {
    /// Writes `n` as a 4-byte big-endian two's-complement integer.
    fn write_int_be(&mut self, n: i64) -> Result<()> {
        let v: i32 = n.try_into().map_err(|_| SnapshotError::OutOfRange {
            what: "integer",
            value: i128::from(n),
        })?;
        self.write_all(&v.to_be_bytes())?;
        Ok(())
    }

    fn write_len_be(&mut self, len: usize, what: &'static str) -> Result<()> {
        let v: u32 = len.try_into().map_err(|_| SnapshotError::OutOfRange {
            what,
            value: len as i128,
        })?;
        self.write_all(&v.to_be_bytes())?;
        Ok(())
    }

    fn write_blob_be(&mut self, bytes: &[u8]) -> Result<()> {
        self.write_len_be(bytes.len(), "byte length")?;
        self.write_all(bytes)?;
        Ok(())
    }

    fn write_text_be(&mut self, s: &str) -> Result<()> {
        self.write_blob_be(s.as_bytes())
    }

    /// `[':'][tag][' '][key]`, with the key written as length-prefixed text.
    fn write_field_header(&mut self, tag: FieldTag, key: &str) -> Result<()> {
        self.write_all(&[FIELD_START, tag.as_byte(), FIELD_SEPARATOR])?;
        self.write_text_be(key)
    }
}

impl<T: Write + ?Sized> WriteBeExt for T {}

pub trait ReadBeExt: Read {
    fn read_u8(&mut self, what: &'static str) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf)
            .map_err(|e| SnapshotError::from_read(e, what))?;
        Ok(buf[0])
    }

    fn read_int_be(&mut self) -> Result<i32> {
        let mut buf = [0u8; INT_WIDTH];
        self.read_exact(&mut buf)
            .map_err(|e| SnapshotError::from_read(e, "integer"))?;
        Ok(i32::from_be_bytes(buf))
    }

    fn read_len_be(&mut self, what: &'static str) -> Result<u32> {
        let mut buf = [0u8; INT_WIDTH];
        self.read_exact(&mut buf)
            .map_err(|e| SnapshotError::from_read(e, what))?;
        Ok(u32::from_be_bytes(buf))
    }

    /// Reads a length prefix and then exactly that many bytes.
    ///
    /// The buffer grows with the bytes actually present, so a corrupt prefix claiming gigabytes
    /// fails with `TruncatedInput` instead of allocating up front.
    fn read_blob_be(&mut self) -> Result<Vec<u8>> {
        let len = self.read_len_be("byte length")?;
        let mut buf = Vec::with_capacity((len as usize).min(64 * 1024));
        (&mut *self)
            .take(u64::from(len))
            .read_to_end(&mut buf)
            .map_err(|e| SnapshotError::from_read(e, "byte payload"))?;
        if buf.len() != len as usize {
            return Err(SnapshotError::TruncatedInput("byte payload"));
        }
        Ok(buf)
    }

    fn read_text_be(&mut self) -> Result<String> {
        let bytes = self.read_blob_be()?;
        Ok(String::from_utf8(bytes)?)
    }

    fn read_field_header(&mut self) -> Result<(FieldTag, String)> {
        let start = self.read_u8("field start")?;
        if start != FIELD_START {
            return Err(SnapshotError::MalformedField {
                what: "field start",
                expected: FIELD_START,
                found: start,
            });
        }
        let tag_byte = self.read_u8("field tag")?;
        let tag = FieldTag::from_byte(tag_byte).ok_or(SnapshotError::UnknownTag(tag_byte))?;
        let separator = self.read_u8("field separator")?;
        if separator != FIELD_SEPARATOR {
            return Err(SnapshotError::MalformedField {
                what: "field separator",
                expected: FIELD_SEPARATOR,
                found: separator,
            });
        }
        let key = self.read_text_be()?;
        Ok((tag, key))
    }
}

impl<T: Read + ?Sized> ReadBeExt for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn integers_are_big_endian_and_signed() {
        let mut out = Vec::new();
        out.write_int_be(1).unwrap();
        out.write_int_be(-1).unwrap();
        out.write_int_be(i64::from(i32::MIN)).unwrap();
        assert_eq!(out.len(), 3 * INT_WIDTH);
        assert_eq!(
            out,
            [0, 0, 0, 1, 0xff, 0xff, 0xff, 0xff, 0x80, 0, 0, 0]
        );

        let mut r = Cursor::new(out);
        assert_eq!(r.read_int_be().unwrap(), 1);
        assert_eq!(r.read_int_be().unwrap(), -1);
        assert_eq!(r.read_int_be().unwrap(), i32::MIN);
    }

    #[test]
    fn integer_outside_32_bits_is_out_of_range() {
        let mut out = Vec::new();
        let err = out.write_int_be(i64::from(i32::MAX) + 1).unwrap_err();
        assert!(matches!(err, SnapshotError::OutOfRange { what: "integer", .. }));
        assert!(out.is_empty(), "nothing may be written for a rejected integer");
    }

    #[test]
    fn short_integer_is_truncated_input() {
        let err = Cursor::new([0u8, 0, 1]).read_int_be().unwrap_err();
        assert!(matches!(err, SnapshotError::TruncatedInput("integer")));
    }

    #[test]
    fn blob_layout_is_length_then_payload() {
        let mut out = Vec::new();
        out.write_blob_be(b"hi\n").unwrap();
        assert_eq!(out, [0, 0, 0, 3, b'h', b'i', b'\n']);
        assert_eq!(Cursor::new(out).read_blob_be().unwrap(), b"hi\n");
    }

    #[test]
    fn blob_with_short_payload_is_truncated_input() {
        let data = [0u8, 0, 0, 5, b'a', b'b'];
        let err = Cursor::new(data).read_blob_be().unwrap_err();
        assert!(matches!(err, SnapshotError::TruncatedInput("byte payload")));
    }

    #[test]
    fn huge_length_prefix_does_not_allocate_up_front() {
        let data = [0xffu8, 0xff, 0xff, 0xff, 1, 2, 3];
        let err = Cursor::new(data).read_blob_be().unwrap_err();
        assert!(matches!(err, SnapshotError::TruncatedInput(_)));
    }

    #[test]
    fn invalid_utf8_text_is_invalid_encoding() {
        let data = [0u8, 0, 0, 2, 0xc3, 0x28];
        let err = Cursor::new(data).read_text_be().unwrap_err();
        assert!(matches!(err, SnapshotError::InvalidEncoding(_)));
    }

    #[test]
    fn field_header_layout() {
        let mut out = Vec::new();
        out.write_field_header(FieldTag::Integer, "ret").unwrap();
        assert_eq!(out, [b':', b'i', b' ', 0, 0, 0, 3, b'r', b'e', b't']);

        let (tag, key) = Cursor::new(out).read_field_header().unwrap();
        assert_eq!(tag, FieldTag::Integer);
        assert_eq!(key, "ret");
    }

    #[test]
    fn field_header_rejects_bad_start_and_separator() {
        let err = Cursor::new(*b";i \0\0\0\0").read_field_header().unwrap_err();
        assert!(matches!(
            err,
            SnapshotError::MalformedField {
                what: "field start",
                found: b';',
                ..
            }
        ));

        let err = Cursor::new(*b":i_\0\0\0\0").read_field_header().unwrap_err();
        assert!(matches!(
            err,
            SnapshotError::MalformedField {
                what: "field separator",
                found: b'_',
                ..
            }
        ));
    }

    #[test]
    fn field_header_rejects_unknown_tag() {
        let err = Cursor::new(*b":x \0\0\0\0").read_field_header().unwrap_err();
        assert!(matches!(err, SnapshotError::UnknownTag(b'x')));
    }

    #[test]
    fn empty_stream_is_truncated_at_field_start() {
        let err = Cursor::new(Vec::<u8>::new())
            .read_field_header()
            .unwrap_err();
        assert!(matches!(err, SnapshotError::TruncatedInput("field start")));
    }
}
