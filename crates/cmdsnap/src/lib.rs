//! Golden-file snapshots of command executions.
//!
//! A [`Snapshot`] records a command's argv, stdin, exit status, whether it had to be killed, and
//! its stdout/stderr. Snapshots are stored in a small tagged binary format ([`Structure`]) and
//! replayed with [`test`], which reports every field that no longer matches.

mod config;
mod driver;
mod error;
mod exec;
mod format;
mod io;
mod snapshot;
mod structure;

pub use crate::config::{ConfigError, ExecConfig, TIMEOUT_ENV};
pub use crate::driver::{
    capture, compare, load, save, test, ComparedField, Destination, Mismatch, StdinSource,
    Verdict,
};
pub use crate::error::{CaptureError, Result, SnapshotError};
pub use crate::exec::{ExecOutcome, Executor, ProcessExecutor};
pub use crate::format::{
    FieldTag, FIELD_SEPARATOR, FIELD_START, INT_WIDTH, KEY_ARGV, KEY_HALTED, KEY_RET, KEY_STDERR,
    KEY_STDIN, KEY_STDOUT,
};
pub use crate::io::{ReadBeExt, WriteBeExt};
pub use crate::snapshot::Snapshot;
pub use crate::structure::{Parameter, Structure, Value};
