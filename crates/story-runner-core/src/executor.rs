//! Runs one verification command through the platform shell.
//!
//! stdout and stderr are attached to the same pipe so the captured text keeps
//! the order in which the command emitted it. The pipe is drained on a reader
//! thread while we wait; otherwise a chatty command fills the pipe buffer and
//! blocks forever.

use crate::error::{Result, RunnerError};
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use wait_timeout::ChildExt;

/// How long to keep collecting output after the child has exited or been
/// killed. Background processes that inherited the pipe can hold it open.
const OUTPUT_COLLECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Appended to the output when the pipe was still open after
/// [`OUTPUT_COLLECTION_TIMEOUT`].
pub const OUTPUT_INCOMPLETE_MARKER: &str = "\n[output collection timed out]";

/// Exit code recorded when the child has no status code (signal or timeout).
pub const NO_EXIT_CODE: i32 = -1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    pub exit_code: i32,
    /// Combined stdout and stderr, in emission order.
    pub output: String,
    pub timed_out: bool,
    pub duration: Duration,
}

/// Run `command` in `cwd`, blocking until it exits or `timeout` elapses.
///
/// A command that fails is data, not an error. `Err` means the shell itself
/// could not be started or waited on.
pub fn run(command: &str, cwd: &Path, timeout: Option<Duration>) -> Result<Execution> {
    let host_err = |source: std::io::Error| RunnerError::HostExecution {
        command: command.to_string(),
        cwd: cwd.to_path_buf(),
        source,
    };

    let start = Instant::now();
    let (reader, writer) = std::io::pipe().map_err(host_err)?;
    let writer_err = writer.try_clone().map_err(host_err)?;

    let mut cmd = shell_command(command);
    cmd.current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(writer)
        .stderr(writer_err);
    // A timed command leads its own process group so expiry can kill the
    // whole group.
    #[cfg(unix)]
    if timeout.is_some() {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }
    let mut child = cmd.spawn().map_err(host_err)?;
    // The Command still owns our copies of the write end; the reader only
    // sees EOF once they are closed.
    drop(cmd);

    let collected = Arc::new(Mutex::new(Vec::new()));
    let (done_tx, done_rx) = mpsc::channel();
    let sink = Arc::clone(&collected);
    thread::spawn(move || {
        drain(reader, &sink);
        let _ = done_tx.send(());
    });

    let status = match timeout {
        None => Some(child.wait().map_err(host_err)?),
        Some(limit) => child.wait_timeout(limit).map_err(host_err)?,
    };

    let timed_out = status.is_none();
    if timed_out {
        tracing::warn!(command, ?timeout, "command timed out, killing");
        kill_tree(&mut child);
        let _ = child.wait();
    }

    // A background process that inherited the pipe keeps it open past the
    // shell's exit. Keep what was read so far and mark it as incomplete.
    let complete = done_rx.recv_timeout(OUTPUT_COLLECTION_TIMEOUT).is_ok();
    let bytes = collected
        .lock()
        .map(|buf| buf.clone())
        .unwrap_or_else(|poisoned| poisoned.into_inner().clone());
    let mut output = String::from_utf8_lossy(&bytes).into_owned();
    if !complete {
        tracing::warn!(command, "output pipe still open, keeping partial output");
        output.push_str(OUTPUT_INCOMPLETE_MARKER);
    }
    let exit_code = status.and_then(|s| s.code()).unwrap_or(NO_EXIT_CODE);
    let duration = start.elapsed();
    tracing::debug!(command, exit_code, ?duration, "command finished");

    Ok(Execution {
        exit_code,
        output,
        timed_out,
        duration,
    })
}

#[cfg(not(windows))]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(windows)]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("powershell");
    cmd.args(["-NoProfile", "-NonInteractive", "-Command", command]);
    cmd
}

fn drain<R: Read>(mut stream: R, sink: &Mutex<Vec<u8>>) {
    let mut chunk = [0u8; 8192];
    loop {
        match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => match sink.lock() {
                Ok(mut buf) => buf.extend_from_slice(&chunk[..n]),
                Err(_) => break,
            },
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(_) => break,
        }
    }
}

/// Kill the shell and everything it started. The child leads its own process
/// group, so a negative pid reaches grandchildren that still hold the pipe.
#[cfg(unix)]
fn kill_tree(child: &mut Child) {
    let group = format!("kill -9 -{}", child.id());
    let _ = Command::new("sh")
        .arg("-c")
        .arg(&group)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
    let _ = child.kill();
}

#[cfg(not(unix))]
fn kill_tree(child: &mut Child) {
    let _ = child.kill();
}
