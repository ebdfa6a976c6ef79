use std::io::{Read, Write};

use crate::error::{Result, SnapshotError};
use crate::format::{FieldTag, KEY_ARGV, KEY_HALTED, KEY_RET, KEY_STDERR, KEY_STDIN, KEY_STDOUT};
use crate::structure::{Structure, Value};

/// One recorded command execution.
///
/// On the wire this is a [`Structure`] with exactly six parameters, always in the order
/// `ret:i`, `halted:i`, `argv:l`, `stdin:b`, `stdout:b`, `stderr:b`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// Exit status. `0` when the process had to be killed.
    pub ret: i32,
    /// The process did not exit on its own and was killed.
    pub halted: bool,
    pub argv: Vec<String>,
    pub stdin: Vec<u8>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl Snapshot {
    pub fn to_structure(&self) -> Structure {
        Structure::new()
            .with(FieldTag::Integer, KEY_RET, Value::Integer(i64::from(self.ret)))
            .with(
                FieldTag::Integer,
                KEY_HALTED,
                Value::Integer(i64::from(self.halted)),
            )
            .with(FieldTag::TextList, KEY_ARGV, Value::TextList(self.argv.clone()))
            .with(FieldTag::Bytes, KEY_STDIN, Value::Bytes(self.stdin.clone()))
            .with(FieldTag::Bytes, KEY_STDOUT, Value::Bytes(self.stdout.clone()))
            .with(FieldTag::Bytes, KEY_STDERR, Value::Bytes(self.stderr.clone()))
    }

    /// Reads the six well-known keys by first match. Extra parameters are ignored.
    pub fn from_structure(s: &Structure) -> Result<Self> {
        let ret = s.integer(KEY_RET)?;
        let ret: i32 = ret.try_into().map_err(|_| SnapshotError::OutOfRange {
            what: "ret",
            value: i128::from(ret),
        })?;
        let halted = match s.integer(KEY_HALTED)? {
            0 => false,
            1 => true,
            other => {
                return Err(SnapshotError::OutOfRange {
                    what: "halted",
                    value: i128::from(other),
                })
            }
        };
        Ok(Self {
            ret,
            halted,
            argv: s.text_list(KEY_ARGV)?.to_vec(),
            stdin: s.bytes(KEY_STDIN)?.to_vec(),
            stdout: s.bytes(KEY_STDOUT)?.to_vec(),
            stderr: s.bytes(KEY_STDERR)?.to_vec(),
        })
    }

    pub fn encode<W: Write + ?Sized>(&self, w: &mut W) -> Result<()> {
        self.to_structure().encode(w)
    }

    pub fn decode<R: Read + ?Sized>(r: &mut R) -> Result<Self> {
        Self::from_structure(&Structure::decode(r)?)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.to_structure().to_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_structure(&Structure::from_bytes(bytes)?)
    }
}
