#![forbid(unsafe_code)]

use std::fs;
use std::io::{self, Cursor, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use cmdsnap::{Destination, ExecConfig, ProcessExecutor, StdinSource, Structure, Value};
use tracing_subscriber::EnvFilter;

/// Exit code for `test` when at least one field differs.
const EXIT_MISMATCH: u8 = 1;
/// Exit code for any failure to load, run or write.
const EXIT_ERROR: u8 = 2;

const PREVIEW_LEN: usize = 64;

#[derive(Parser, Debug)]
#[command(
    name = "cmdsnap",
    about = "Record a command's exit status and output as a binary snapshot, and replay snapshots as golden tests."
)]
struct Cli {
    /// Kill a command still running after this many milliseconds (overrides CMDSNAP_TIMEOUT_MS)
    #[arg(long, value_name = "MS", global = true, value_parser = clap::value_parser!(u64).range(1..))]
    timeout_ms: Option<u64>,

    /// Log at debug level when RUST_LOG is not set
    #[arg(short, long, global = true, action = clap::ArgAction::SetTrue)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay the command stored in a snapshot and compare its result
    Test {
        /// Snapshot file to replay
        #[arg(short, long, value_name = "PATH")]
        source: PathBuf,
    },

    /// Run a command and write its snapshot
    Save {
        /// Snapshot file to write (created or truncated)
        #[arg(short, long, value_name = "PATH")]
        output: PathBuf,

        /// File whose contents are fed to the command ("-" reads this process's stdin)
        #[arg(long, value_name = "PATH", conflicts_with = "stdin_text")]
        stdin: Option<PathBuf>,

        /// Literal text fed to the command
        #[arg(long, value_name = "TEXT")]
        stdin_text: Option<String>,

        /// Command line to run; takes every remaining argument, so pass it last
        #[arg(
            short,
            long = "args",
            value_name = "ARGV",
            num_args = 1..,
            allow_hyphen_values = true,
            required = true
        )]
        args: Vec<String>,
    },

    /// Print every parameter stored in a snapshot file
    Inspect {
        /// Snapshot file to decode
        path: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    match cli.command {
        Command::Test { source } => cmd_test(executor(cli.timeout_ms)?, &source),
        Command::Save {
            output,
            stdin,
            stdin_text,
            args,
        } => {
            let source = match (stdin, stdin_text) {
                (Some(path), _) if path.as_os_str() == "-" => {
                    StdinSource::Reader(Box::new(io::stdin()))
                }
                (Some(path), _) => StdinSource::Path(path),
                (None, Some(text)) => StdinSource::Bytes(text.into_bytes()),
                (None, None) => StdinSource::Empty,
            };
            cmd_save(executor(cli.timeout_ms)?, &output, &args, source)
        }
        Command::Inspect { path } => cmd_inspect(&path),
    }
}

fn executor(timeout_ms: Option<u64>) -> anyhow::Result<ProcessExecutor> {
    let mut config = ExecConfig::from_env().context("load configuration")?;
    if let Some(ms) = timeout_ms {
        config = config.with_timeout(Duration::from_millis(ms));
    }
    Ok(ProcessExecutor::new(config))
}

fn cmd_test(mut exec: ProcessExecutor, source: &Path) -> anyhow::Result<ExitCode> {
    let verdict = cmdsnap::test(&mut exec, source)
        .with_context(|| format!("test {}", source.display()))?;

    let style = Style::detect();
    let mut out = io::stdout().lock();
    for mismatch in verdict.mismatches() {
        writeln!(
            out,
            "{} {}",
            style.red(mismatch.field.label()),
            mismatch.detail()
        )?;
    }
    if verdict.is_pass() {
        writeln!(out, "{}", style.green("SUCCESS"))?;
        Ok(ExitCode::SUCCESS)
    } else {
        writeln!(out, "{}", style.red("FAILURE"))?;
        Ok(ExitCode::from(EXIT_MISMATCH))
    }
}

fn cmd_save(
    mut exec: ProcessExecutor,
    output: &Path,
    args: &[String],
    stdin: StdinSource,
) -> anyhow::Result<ExitCode> {
    let snapshot = cmdsnap::save(&mut exec, Destination::Path(output), args, stdin)
        .with_context(|| format!("save {}", output.display()))?;

    println!(
        "saved {}: ret={} halted={} stdout={} bytes stderr={} bytes",
        output.display(),
        snapshot.ret,
        u8::from(snapshot.halted),
        snapshot.stdout.len(),
        snapshot.stderr.len()
    );
    Ok(ExitCode::SUCCESS)
}

fn cmd_inspect(path: &Path) -> anyhow::Result<ExitCode> {
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let mut cursor = Cursor::new(bytes.as_slice());
    let structure = Structure::decode(&mut cursor)
        .with_context(|| format!("decode {}", path.display()))?;

    let mut out = io::stdout().lock();
    writeln!(out, "Snapshot: {}", path.display())?;
    writeln!(out, "File size: {} bytes", bytes.len())?;
    writeln!(out, "Parameters:")?;
    for param in &structure {
        writeln!(
            out,
            "  - {}: {} = {}",
            param.key(),
            param.tag(),
            describe(param.value())
        )?;
    }
    let trailing = bytes.len() as u64 - cursor.position();
    if trailing != 0 {
        writeln!(out, "Trailing bytes after sentinel: {trailing}")?;
    }
    Ok(ExitCode::SUCCESS)
}

fn describe(value: &Value) -> String {
    match value {
        Value::Integer(n) => n.to_string(),
        Value::Bytes(bytes) => format!("{} bytes {:?}", bytes.len(), preview(bytes)),
        Value::Text(text) => format!("{:?}", preview(text.as_bytes())),
        Value::TextList(items) => format!("{items:?}"),
    }
}

fn preview(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(&bytes[..bytes.len().min(PREVIEW_LEN)]);
    if bytes.len() > PREVIEW_LEN {
        format!("{text}...")
    } else {
        text.into_owned()
    }
}

/// ANSI coloring for verdict lines; disabled when stdout is not a terminal or `NO_COLOR` is set.
#[derive(Clone, Copy)]
struct Style {
    color: bool,
}

impl Style {
    fn detect() -> Self {
        let color = io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none();
        Self { color }
    }

    fn red(self, s: &str) -> String {
        self.paint("31", s)
    }

    fn green(self, s: &str) -> String {
        self.paint("32", s)
    }

    fn paint(self, code: &str, s: &str) -> String {
        if self.color {
            format!("\x1b[{code}m{s}\x1b[0m")
        } else {
            s.to_string()
        }
    }
}
