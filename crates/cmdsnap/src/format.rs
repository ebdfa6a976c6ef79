/// First byte of every field header (`:`).
pub const FIELD_START: u8 = b':';
/// Byte between the tag and the key (` `).
pub const FIELD_SEPARATOR: u8 = b' ';

/// Width in bytes of integers, length prefixes and list counts.
pub const INT_WIDTH: usize = 4;

pub const KEY_RET: &str = "ret";
pub const KEY_HALTED: &str = "halted";
pub const KEY_ARGV: &str = "argv";
pub const KEY_STDIN: &str = "stdin";
pub const KEY_STDOUT: &str = "stdout";
pub const KEY_STDERR: &str = "stderr";

/// Payload kind of a field. The set is closed; any other tag byte is rejected at decode time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldTag {
    /// `i`: 32-bit big-endian signed integer.
    Integer,
    /// `b`: length-prefixed raw bytes.
    Bytes,
    /// `B`: length-prefixed UTF-8 text.
    Text,
    /// `l`: count-prefixed list of length-prefixed UTF-8 text items.
    TextList,
    /// `E`: end-of-structure sentinel, no payload.
    End,
}

impl FieldTag {
    pub const fn as_byte(self) -> u8 {
        match self {
            FieldTag::Integer => b'i',
            FieldTag::Bytes => b'b',
            FieldTag::Text => b'B',
            FieldTag::TextList => b'l',
            FieldTag::End => b'E',
        }
    }

    pub const fn from_byte(byte: u8) -> Option<FieldTag> {
        match byte {
            b'i' => Some(FieldTag::Integer),
            b'b' => Some(FieldTag::Bytes),
            b'B' => Some(FieldTag::Text),
            b'l' => Some(FieldTag::TextList),
            b'E' => Some(FieldTag::End),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FieldTag::Integer => "integer",
            FieldTag::Bytes => "bytes",
            FieldTag::Text => "text",
            FieldTag::TextList => "text-list",
            FieldTag::End => "end",
        }
    }
}

impl core::fmt::Display for FieldTag {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}({})", self.name(), self.as_byte() as char)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_bytes_are_stable() {
        let cases = [
            (FieldTag::Integer, b'i'),
            (FieldTag::Bytes, b'b'),
            (FieldTag::Text, b'B'),
            (FieldTag::TextList, b'l'),
            (FieldTag::End, b'E'),
        ];
        for (tag, byte) in cases {
            assert_eq!(tag.as_byte(), byte, "{tag} wire byte changed; must remain stable");
            assert_eq!(FieldTag::from_byte(byte), Some(tag));
        }
    }

    #[test]
    fn tags_outside_the_closed_set_are_rejected() {
        for byte in [b'I', b'L', b'e', b's', 0, 0xff] {
            assert_eq!(FieldTag::from_byte(byte), None, "byte {byte:#04x}");
        }
    }

    #[test]
    fn display_names_tag_and_byte() {
        assert_eq!(FieldTag::TextList.to_string(), "text-list(l)");
        assert_eq!(FieldTag::Bytes.to_string(), "bytes(b)");
    }
}
