//! Blocking external-tool runner with a wall-clock limit
//!
//! `Command::output()` waits forever, so a wedged renderer or OCR process
//! would hang the whole pipeline. The child is polled instead and killed once
//! the deadline passes. Output pipes are drained on their own threads so a
//! chatty tool cannot block on a full pipe while we wait for it.

use crate::error::ExtractionCause;
use std::io::{self, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug)]
pub(crate) struct ToolOutput {
    pub stdout: Vec<u8>,
}

#[derive(Debug)]
pub(crate) enum ToolFailure {
    Spawn(io::Error),
    Wait(io::Error),
    TimedOut(Duration),
    Exit { status: ExitStatus, stderr: String },
}

impl ToolFailure {
    /// Map a runner failure onto an extraction cause. `on_exit` builds the
    /// engine-specific cause for a non-zero exit.
    pub(crate) fn into_cause(
        self,
        tool: &str,
        on_exit: impl FnOnce(String) -> ExtractionCause,
    ) -> ExtractionCause {
        match self {
            ToolFailure::Spawn(e) if e.kind() == io::ErrorKind::NotFound => ExtractionCause::ToolMissing {
                tool: tool.to_string(),
                message: e.to_string(),
            },
            ToolFailure::Spawn(e) | ToolFailure::Wait(e) => ExtractionCause::Io(e),
            ToolFailure::TimedOut(after) => ExtractionCause::Timeout {
                tool: tool.to_string(),
                after,
            },
            ToolFailure::Exit { status, stderr } if stderr.is_empty() => on_exit(format!("exited with {status}")),
            ToolFailure::Exit { status, stderr } => on_exit(format!("exited with {status}: {stderr}")),
        }
    }
}

pub(crate) fn run_with_timeout(command: &mut Command, timeout: Duration) -> Result<ToolOutput, ToolFailure> {
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(ToolFailure::Spawn)?;

    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    // Reader threads finish on their own once the pipes close.
    let status = wait_with_deadline(&mut child, timeout)?;

    let stdout = collect(stdout);
    let stderr = collect(stderr);

    if !status.success() {
        return Err(ToolFailure::Exit {
            status,
            stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
        });
    }

    Ok(ToolOutput { stdout })
}

/// The parts of a running child the deadline loop needs
trait Supervised {
    fn try_wait(&mut self) -> io::Result<Option<ExitStatus>>;
    fn kill(&mut self) -> io::Result<()>;
    fn wait(&mut self) -> io::Result<ExitStatus>;
}

impl Supervised for Child {
    fn try_wait(&mut self) -> io::Result<Option<ExitStatus>> {
        Child::try_wait(self)
    }

    fn kill(&mut self) -> io::Result<()> {
        Child::kill(self)
    }

    fn wait(&mut self) -> io::Result<ExitStatus> {
        Child::wait(self)
    }
}

/// Poll until the child exits. On timeout or a failed poll the child is
/// killed and reaped before returning.
fn wait_with_deadline(child: &mut impl Supervised, timeout: Duration) -> Result<ExitStatus, ToolFailure> {
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) if Instant::now() >= deadline => {
                reap(child);
                return Err(ToolFailure::TimedOut(timeout));
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => {
                reap(child);
                return Err(ToolFailure::Wait(e));
            }
        }
    }
}

/// Errors ignored: the child may already have exited
fn reap(child: &mut impl Supervised) {
    let _ = child.kill();
    let _ = child.wait();
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = reader.read_to_end(&mut buf);
        buf
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}
