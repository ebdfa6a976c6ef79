//! Capture, save and replay of command snapshots.
//!
//! `test` runs through `Loaded -> Replayed -> Compared -> {Pass, Fail}`. Failures while loading or
//! replaying end the run; field mismatches are results, not errors.

use std::fmt;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::error::CaptureError;
use crate::exec::Executor;
use crate::snapshot::Snapshot;

/// Where the bytes fed to the command come from.
pub enum StdinSource {
    /// No input.
    Empty,
    /// Contents of a file, read fully before the command starts.
    Path(PathBuf),
    Bytes(Vec<u8>),
    /// An already-open stream, read to its end. The stream is not closed.
    Reader(Box<dyn Read>),
}

impl StdinSource {
    pub fn resolve(self) -> Result<Vec<u8>, CaptureError> {
        match self {
            StdinSource::Empty => Ok(Vec::new()),
            StdinSource::Bytes(bytes) => Ok(bytes),
            StdinSource::Path(path) => {
                fs::read(&path).map_err(|source| CaptureError::UnreadableInput {
                    source_desc: path.display().to_string(),
                    source,
                })
            }
            StdinSource::Reader(mut reader) => {
                let mut buf = Vec::new();
                reader
                    .read_to_end(&mut buf)
                    .map_err(|source| CaptureError::UnreadableInput {
                        source_desc: "<reader>".to_string(),
                        source,
                    })?;
                Ok(buf)
            }
        }
    }
}

impl fmt::Debug for StdinSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StdinSource::Empty => f.write_str("Empty"),
            StdinSource::Path(path) => f.debug_tuple("Path").field(path).finish(),
            StdinSource::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
            StdinSource::Reader(_) => f.write_str("Reader(..)"),
        }
    }
}

/// Where an encoded snapshot goes. A path is created (or truncated) and closed within the call; a
/// writer is only borrowed.
pub enum Destination<'a> {
    Path(&'a Path),
    Writer(&'a mut dyn Write),
}

/// Runs `argv` once and records the result.
pub fn capture<E: Executor + ?Sized>(
    executor: &mut E,
    argv: &[String],
    stdin: &[u8],
) -> Result<Snapshot, CaptureError> {
    if argv.is_empty() {
        return Err(CaptureError::EmptyArgv);
    }
    let outcome = executor.execute(argv, stdin)?;
    Ok(Snapshot {
        ret: outcome.exit_code,
        halted: outcome.halted,
        argv: argv.to_vec(),
        stdin: stdin.to_vec(),
        stdout: outcome.stdout,
        stderr: outcome.stderr,
    })
}

/// Captures `argv` and writes the encoded snapshot to `destination`.
///
/// Nothing is written unless the capture and the encode both succeed.
pub fn save<E: Executor + ?Sized>(
    executor: &mut E,
    destination: Destination<'_>,
    argv: &[String],
    stdin: StdinSource,
) -> Result<Snapshot, CaptureError> {
    tracing::debug!(?stdin, "resolving stdin");
    let stdin = stdin.resolve()?;
    let snapshot = capture(executor, argv, &stdin)?;
    let bytes = snapshot.to_bytes()?;

    match destination {
        Destination::Path(path) => fs::write(path, &bytes).map_err(|err| {
            CaptureError::io(format!("write snapshot {}", path.display()), err)
        })?,
        Destination::Writer(w) => w
            .write_all(&bytes)
            .and_then(|()| w.flush())
            .map_err(|err| CaptureError::io("write snapshot", err))?,
    }
    tracing::debug!(len = bytes.len(), "snapshot written");
    Ok(snapshot)
}

/// Reads and decodes a snapshot file. Any decode failure becomes [`CaptureError::CorruptSnapshot`].
pub fn load(path: &Path) -> Result<Snapshot, CaptureError> {
    let bytes = fs::read(path)
        .map_err(|err| CaptureError::io(format!("read snapshot {}", path.display()), err))?;
    Snapshot::from_bytes(&bytes).map_err(|source| CaptureError::CorruptSnapshot {
        path: path.to_path_buf(),
        source,
    })
}

/// Replays the invocation stored at `source` and compares the result against it.
pub fn test<E: Executor + ?Sized>(executor: &mut E, source: &Path) -> Result<Verdict, CaptureError> {
    let expected = load(source)?;
    let actual = capture(executor, &expected.argv, &expected.stdin)?;
    let verdict = compare(&expected, &actual);
    tracing::info!(
        path = %source.display(),
        pass = verdict.is_pass(),
        mismatches = verdict.mismatches().len(),
        "snapshot compared"
    );
    Ok(verdict)
}

/// Compares the four output fields. All four are always checked.
pub fn compare(expected: &Snapshot, actual: &Snapshot) -> Verdict {
    let mut mismatches = Vec::new();
    if actual.ret != expected.ret {
        mismatches.push(Mismatch {
            field: ComparedField::ReturnCode,
            expected: expected.ret.to_string(),
            actual: actual.ret.to_string(),
        });
    }
    if actual.halted != expected.halted {
        mismatches.push(Mismatch {
            field: ComparedField::Halted,
            expected: u8::from(expected.halted).to_string(),
            actual: u8::from(actual.halted).to_string(),
        });
    }
    if actual.stdout != expected.stdout {
        mismatches.push(Mismatch {
            field: ComparedField::Stdout,
            expected: String::from_utf8_lossy(&expected.stdout).into_owned(),
            actual: String::from_utf8_lossy(&actual.stdout).into_owned(),
        });
    }
    if actual.stderr != expected.stderr {
        mismatches.push(Mismatch {
            field: ComparedField::Stderr,
            expected: String::from_utf8_lossy(&expected.stderr).into_owned(),
            actual: String::from_utf8_lossy(&actual.stderr).into_owned(),
        });
    }
    Verdict { mismatches }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparedField {
    ReturnCode,
    Halted,
    Stdout,
    Stderr,
}

impl ComparedField {
    pub fn label(self) -> &'static str {
        match self {
            ComparedField::ReturnCode => "RETURNCODE",
            ComparedField::Halted => "HALTED",
            ComparedField::Stdout => "STDOUT",
            ComparedField::Stderr => "STDERR",
        }
    }
}

impl fmt::Display for ComparedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One differing field, with both sides rendered as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    pub field: ComparedField,
    pub expected: String,
    pub actual: String,
}

impl Mismatch {
    /// The diagnostic without the field label, e.g. `0 != 1` or `(a) != (b)`.
    pub fn detail(&self) -> String {
        match self.field {
            ComparedField::ReturnCode | ComparedField::Halted => {
                format!("{} != {}", self.actual, self.expected)
            }
            ComparedField::Stdout | ComparedField::Stderr => {
                format!("({}) != ({})", self.actual, self.expected)
            }
        }
    }
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.detail())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Verdict {
    mismatches: Vec<Mismatch>,
}

impl Verdict {
    pub fn is_pass(&self) -> bool {
        self.mismatches.is_empty()
    }

    pub fn mismatches(&self) -> &[Mismatch] {
        &self.mismatches
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(ret: i32, halted: bool, stdout: &[u8], stderr: &[u8]) -> Snapshot {
        Snapshot {
            ret,
            halted,
            argv: vec!["prog".into()],
            stdin: Vec::new(),
            stdout: stdout.to_vec(),
            stderr: stderr.to_vec(),
        }
    }

    #[test]
    fn identical_snapshots_pass() {
        let s = snap(0, false, b"out", b"err");
        assert!(compare(&s, &s).is_pass());
    }

    #[test]
    fn every_differing_field_is_reported() {
        let expected = snap(1, false, b"old\n", b"");
        let actual = snap(0, true, b"new\n", b"warn");
        let verdict = compare(&expected, &actual);
        assert!(!verdict.is_pass());

        let lines: Vec<String> = verdict.mismatches().iter().map(|m| m.to_string()).collect();
        assert_eq!(
            lines,
            [
                "RETURNCODE 0 != 1",
                "HALTED 1 != 0",
                "STDOUT (new\n) != (old\n)",
                "STDERR (warn) != ()",
            ]
        );
    }

    #[test]
    fn argv_and_stdin_are_not_compared() {
        let expected = snap(0, false, b"", b"");
        let mut actual = expected.clone();
        actual.argv.push("extra".into());
        actual.stdin = b"different".to_vec();
        assert!(compare(&expected, &actual).is_pass());
    }

    #[test]
    fn invalid_utf8_output_is_rendered_lossily() {
        let verdict = compare(&snap(0, false, b"", b""), &snap(0, false, &[0xff], b""));
        assert_eq!(verdict.mismatches()[0].actual, "\u{fffd}");
    }

    #[test]
    fn stdin_sources_resolve_to_bytes() {
        assert!(StdinSource::Empty.resolve().unwrap().is_empty());
        assert_eq!(
            StdinSource::Bytes(b"abc".to_vec()).resolve().unwrap(),
            b"abc"
        );
        let reader = StdinSource::Reader(Box::new(std::io::Cursor::new(b"xyz".to_vec())));
        assert_eq!(reader.resolve().unwrap(), b"xyz");
    }

    #[test]
    fn missing_stdin_file_is_unreadable_input() {
        let tmp = tempfile::tempdir().unwrap();
        let err = StdinSource::Path(tmp.path().join("nope"))
            .resolve()
            .unwrap_err();
        assert!(matches!(err, CaptureError::UnreadableInput { .. }));
    }
}
