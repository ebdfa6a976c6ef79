use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::format::FieldTag;

pub type Result<T> = std::result::Result<T, SnapshotError>;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("io error: {0}")]
    Io(#[source] io::Error),

    #[error("truncated input while reading {0}")]
    TruncatedInput(&'static str),

    #[error("malformed field header: expected {expected:#04x} for {what}, found {found:#04x}")]
    MalformedField {
        what: &'static str,
        expected: u8,
        found: u8,
    },

    #[error("unknown field tag {0:#04x}")]
    UnknownTag(u8),

    #[error("text payload is not valid utf-8: {0}")]
    InvalidEncoding(#[from] std::string::FromUtf8Error),

    #[error("{what} value {value} does not fit in a 32-bit field")]
    OutOfRange { what: &'static str, value: i128 },

    #[error("key {0:?} not found")]
    KeyNotFound(String),

    #[error("parameter {key:?} has tag {found}, expected {expected}")]
    TypeMismatch {
        key: String,
        expected: FieldTag,
        found: FieldTag,
    },
}

impl SnapshotError {
    /// Maps `UnexpectedEof` onto [`SnapshotError::TruncatedInput`]; every other I/O failure stays
    /// an [`SnapshotError::Io`].
    pub(crate) fn from_read(err: io::Error, what: &'static str) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            SnapshotError::TruncatedInput(what)
        } else {
            SnapshotError::Io(err)
        }
    }
}

impl From<io::Error> for SnapshotError {
    fn from(err: io::Error) -> Self {
        SnapshotError::from_read(err, "stream")
    }
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("cannot read stdin source {source_desc}: {source}")]
    UnreadableInput {
        source_desc: String,
        #[source]
        source: io::Error,
    },

    #[error("corrupt snapshot {}: {source}", path.display())]
    CorruptSnapshot {
        path: PathBuf,
        #[source]
        source: SnapshotError,
    },

    #[error("argv is empty; nothing to run")]
    EmptyArgv,

    #[error("failed to launch {program:?}: {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

impl CaptureError {
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        CaptureError::Io {
            context: context.into(),
            source,
        }
    }
}
