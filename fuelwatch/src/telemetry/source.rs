//! Cancellable line input from the upstream telemetry producer.
//!
//! Lines come from standard input, a file, or the stdout of a spawned
//! command. Reading blocks until upstream produces a line; a
//! [`CancellationToken`] ends the wait on shutdown.

use std::fmt;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Where telemetry lines come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelemetrySource {
    /// Standard input.
    Stdin,
    /// A file read to its end.
    File(PathBuf),
    /// Stdout of a shell command (e.g. `submsg pentad`).
    Command(String),
}

impl fmt::Display for TelemetrySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetrySource::Stdin => write!(f, "stdin"),
            TelemetrySource::File(path) => write!(f, "file {}", path.display()),
            TelemetrySource::Command(cmd) => write!(f, "command `{}`", cmd),
        }
    }
}

type BoxedReader = Box<dyn AsyncRead + Unpin + Send>;

/// Lines buffered between the stdin thread and the reader.
const THREAD_LINE_BUFFER: usize = 64;

enum Lines {
    /// Async reader polled on the runtime.
    Async(tokio::io::Lines<BufReader<BoxedReader>>),
    /// Lines forwarded from a dedicated blocking thread.
    Thread(mpsc::Receiver<io::Result<String>>),
}

impl Lines {
    async fn next(&mut self) -> io::Result<Option<String>> {
        match self {
            Lines::Async(lines) => lines.next_line().await,
            Lines::Thread(rx) => rx.recv().await.transpose(),
        }
    }
}

/// Line reader over a telemetry source.
///
/// Holds the spawned child process, if any; the child is killed when the
/// reader is dropped.
///
/// Standard input is read on its own OS thread, not tokio's blocking pool:
/// the runtime waits for pending blocking-pool reads when it is dropped.
pub struct LineReader {
    lines: Lines,
    cancel: CancellationToken,
    child: Option<Child>,
}

impl fmt::Debug for LineReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.lines {
            Lines::Async(_) => "async",
            Lines::Thread(_) => "thread",
        };
        f.debug_struct("LineReader")
            .field("lines", &kind)
            .field("cancelled", &self.cancel.is_cancelled())
            .field("child", &self.child.as_ref().and_then(|c| c.id()))
            .finish()
    }
}

impl LineReader {
    /// Open a source.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened, the command cannot
    /// be spawned, or the stdin thread cannot be started.
    pub async fn open(source: &TelemetrySource, cancel: CancellationToken) -> io::Result<Self> {
        match source {
            TelemetrySource::Stdin => {
                Self::from_blocking_reader(std::io::BufReader::new(std::io::stdin()), cancel)
            }
            TelemetrySource::File(path) => {
                let file = tokio::fs::File::open(path).await?;
                Ok(Self::from_reader(file, cancel))
            }
            TelemetrySource::Command(cmd) => {
                let mut child = shell_command(cmd)
                    .stdout(Stdio::piped())
                    .stdin(Stdio::null())
                    .kill_on_drop(true)
                    .spawn()?;
                let stdout = child.stdout.take().ok_or_else(|| {
                    io::Error::new(io::ErrorKind::BrokenPipe, "child stdout not captured")
                })?;
                info!(command = %cmd, pid = ?child.id(), "Spawned telemetry producer");
                let mut reader = Self::from_reader(stdout, cancel);
                reader.child = Some(child);
                Ok(reader)
            }
        }
    }

    /// Wrap an arbitrary async reader.
    pub fn from_reader<R>(reader: R, cancel: CancellationToken) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let boxed: BoxedReader = Box::new(reader);
        Self {
            lines: Lines::Async(BufReader::new(boxed).lines()),
            cancel,
            child: None,
        }
    }

    /// Read a blocking source on a dedicated thread.
    ///
    /// The thread is detached: once the reader is dropped it exits at the
    /// next line or at end of input, and never holds up runtime shutdown.
    /// Lines that are not valid UTF-8 are forwarded as errors and reading
    /// continues; any other I/O error ends the thread.
    pub fn from_blocking_reader<R>(reader: R, cancel: CancellationToken) -> io::Result<Self>
    where
        R: BufRead + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(THREAD_LINE_BUFFER);
        std::thread::Builder::new()
            .name("fuelwatch-input".to_string())
            .spawn(move || {
                for line in reader.lines() {
                    let fatal = matches!(&line, Err(e) if e.kind() != io::ErrorKind::InvalidData);
                    if tx.blocking_send(line).is_err() || fatal {
                        break;
                    }
                }
            })?;
        Ok(Self {
            lines: Lines::Thread(rx),
            cancel,
            child: None,
        })
    }

    /// Wait for the next line.
    ///
    /// Returns `Ok(None)` at end of input or once cancelled.
    pub async fn next_line(&mut self) -> io::Result<Option<String>> {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => {
                debug!("Line read cancelled");
                Ok(None)
            }
            line = self.lines.next() => line,
        }
    }

    /// Stop the upstream command, if one was spawned.
    pub async fn shutdown(&mut self) -> io::Result<()> {
        if let Some(mut child) = self.child.take() {
            child.kill().await?;
            debug!("Telemetry producer stopped");
        }
        Ok(())
    }
}

#[cfg(unix)]
fn shell_command(cmd: &str) -> Command {
    let mut command = Command::new("sh");
    command.arg("-c").arg(cmd);
    command
}

#[cfg(windows)]
fn shell_command(cmd: &str) -> Command {
    let mut command = Command::new("cmd");
    command.arg("/C").arg(cmd);
    command
}
