use std::io::{self, Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crate::config::ExecConfig;
use crate::error::CaptureError;

/// What a finished (or killed) process left behind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutcome {
    pub exit_code: i32,
    /// The process was killed because it did not exit within the budget.
    pub halted: bool,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// Runs one command to completion. Implementations block until the command exits or is killed.
pub trait Executor {
    fn execute(&mut self, argv: &[String], stdin: &[u8]) -> Result<ExecOutcome, CaptureError>;
}

/// Spawns `argv[0]` directly (no shell) with piped stdio and a wall-clock kill policy.
///
/// A child still running when [`ExecConfig::timeout`] elapses is killed and reported as
/// `halted = true, exit_code = 0`. A child that dies from a signal it did not get from us reports
/// `128 + signal`.
#[derive(Debug, Clone, Default)]
pub struct ProcessExecutor {
    config: ExecConfig,
}

impl ProcessExecutor {
    pub fn new(config: ExecConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExecConfig {
        &self.config
    }
}

impl Executor for ProcessExecutor {
    fn execute(&mut self, argv: &[String], stdin: &[u8]) -> Result<ExecOutcome, CaptureError> {
        let (program, args) = argv.split_first().ok_or(CaptureError::EmptyArgv)?;
        tracing::info!(?argv, stdin_len = stdin.len(), "running command");

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        // The child leads its own process group so a timeout can kill everything it spawned.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt as _;
            cmd.process_group(0);
        }
        let mut child = cmd
            .spawn()
            .map_err(|source| CaptureError::Launch {
                program: program.clone(),
                source,
            })?;

        let mut child_stdin = take_pipe(child.stdin.take(), "child stdin")?;
        let child_stdout = take_pipe(child.stdout.take(), "child stdout")?;
        let child_stderr = take_pipe(child.stderr.take(), "child stderr")?;

        let input = stdin.to_vec();
        let stdin_thread = thread::spawn(move || -> io::Result<()> {
            match child_stdin.write_all(&input) {
                // The child exited (or was killed) without draining its input.
                Err(err) if err.kind() == io::ErrorKind::BrokenPipe => Ok(()),
                other => other,
            }
        });
        let stdout_thread = spawn_reader(child_stdout);
        let stderr_thread = spawn_reader(child_stderr);

        let (status, halted) = wait_with_deadline(&mut child, &self.config)?;

        join_thread(stdin_thread, "write child stdin")?;
        let stdout = join_thread(stdout_thread, "read child stdout")?;
        let stderr = join_thread(stderr_thread, "read child stderr")?;

        let exit_code = if halted { 0 } else { exit_code(status) };
        tracing::debug!(
            exit_code,
            halted,
            stdout_len = stdout.len(),
            stderr_len = stderr.len(),
            "command finished"
        );

        Ok(ExecOutcome {
            exit_code,
            halted,
            stdout,
            stderr,
        })
    }
}

fn take_pipe<T>(pipe: Option<T>, what: &str) -> Result<T, CaptureError> {
    pipe.ok_or_else(|| CaptureError::io(what, io::Error::other("pipe was not captured")))
}

fn spawn_reader<R: Read + Send + 'static>(mut reader: R) -> JoinHandle<io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Ok(buf)
    })
}

fn join_thread<T>(handle: JoinHandle<io::Result<T>>, what: &str) -> Result<T, CaptureError> {
    handle
        .join()
        .map_err(|_| CaptureError::io(what, io::Error::other("worker thread panicked")))?
        .map_err(|err| CaptureError::io(what, err))
}

fn wait_with_deadline(
    child: &mut Child,
    config: &ExecConfig,
) -> Result<(ExitStatus, bool), CaptureError> {
    let deadline = Instant::now().checked_add(config.timeout);

    loop {
        if let Some(status) = child
            .try_wait()
            .map_err(|err| CaptureError::io("wait for child", err))?
        {
            return Ok((status, false));
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            tracing::warn!(
                timeout_ms = config.timeout.as_millis() as u64,
                "command did not exit in time; killing it"
            );
            kill_process_group(child);
            let status = child
                .wait()
                .map_err(|err| CaptureError::io("wait for child after kill", err))?;
            // The child may have exited on its own between `try_wait` and the kill.
            let halted = was_killed(status);
            if !halted {
                tracing::debug!(?status, "command exited before the kill landed");
            }
            return Ok((status, halted));
        }
        thread::sleep(config.poll_interval);
    }
}

/// Kills the child and every process in its group. Grandchildren holding the output pipes would
/// otherwise keep the reader threads blocked after the child itself is gone.
fn kill_process_group(child: &mut Child) {
    #[cfg(unix)]
    {
        if let Ok(pid) = i32::try_from(child.id()) {
            // SAFETY: `kill` has no memory-safety preconditions. `-pid` names the group the child
            // was placed in at spawn time.
            unsafe {
                let _ = libc::kill(-pid, libc::SIGKILL);
            }
        }
    }
    let _ = child.kill();
}

fn was_killed(status: ExitStatus) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt as _;
        status.signal() == Some(libc::SIGKILL)
    }
    #[cfg(not(unix))]
    {
        let _ = status;
        true
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    #[cfg(unix)]
    let signal = {
        use std::os::unix::process::ExitStatusExt as _;
        status.signal()
    };
    #[cfg(not(unix))]
    let signal: Option<i32> = None;

    match status.code() {
        Some(code) => code,
        None => signal.map(|s| 128 + s).unwrap_or(1),
    }
}
