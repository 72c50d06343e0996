//! Process executor

use std::process::Stdio;
use std::time::Duration;

use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, instrument};

use localdev_core::ResolvedCommand;

use crate::command::CommandLine;
use crate::error::ExecError;
use crate::window::{LineSender, WindowFactory};

/// How long stream readers may keep draining after the process exits
const READER_GRACE: Duration = Duration::from_secs(2);

/// Exit status of one command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CommandOutcome {
    /// Exited with status 0
    Success,
    /// Exited non-zero; `code` is `None` when killed by a signal
    Failed { code: Option<i32> },
}

impl CommandOutcome {
    /// Check if this outcome represents success
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Outcome of one command for one project
#[derive(Debug, Clone, Serialize)]
pub struct CommandResult {
    /// Project key
    pub project: String,
    /// Command as displayed, `cd <dir> && <cmd>`
    pub command: String,
    /// Exit status
    pub outcome: CommandOutcome,
    /// Wall time
    #[serde(rename = "duration_ms", serialize_with = "as_millis")]
    pub duration: Duration,
}

fn as_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

/// Spawns resolved commands and streams their output into a window
#[derive(Clone)]
pub struct Executor {
    windows: WindowFactory,
}

impl Executor {
    /// Create an executor drawing output windows from `windows`
    pub fn new(windows: WindowFactory) -> Self {
        Self { windows }
    }

    /// The window factory in use
    pub fn windows(&self) -> &WindowFactory {
        &self.windows
    }

    /// Run one resolved command to completion
    ///
    /// A non-zero exit is an `Ok` outcome; failing to parse, spawn or wait is an error.
    #[instrument(skip_all, fields(project = %project, command = %command.command))]
    pub async fn run(
        &self,
        project: &str,
        command: &ResolvedCommand,
    ) -> Result<CommandOutcome, ExecError> {
        let line = CommandLine::parse(&command.command)?.ok_or_else(|| ExecError::EmptyCommand {
            project: project.to_string(),
        })?;

        let mut cmd = Command::new(&line.program);
        cmd.args(&line.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if !command.dir.is_empty() {
            cmd.current_dir(&command.dir);
        }

        let mut child = cmd.spawn().map_err(|source| ExecError::Spawn {
            command: command.to_string(),
            source,
        })?;
        debug!(pid = ?child.id(), "process spawned");

        let window = self.windows.open(command.to_string());
        let mut readers = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            readers.push(tokio::spawn(forward_lines(stdout, window.sender())));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(tokio::spawn(forward_lines(stderr, window.sender())));
        }

        let status = child.wait().await;

        let drained = tokio::time::timeout(READER_GRACE, async {
            for reader in &mut readers {
                let _ = reader.await;
            }
        })
        .await;
        if drained.is_err() {
            debug!("output readers still busy after process exit, dropping remaining output");
            for reader in &readers {
                reader.abort();
            }
        }

        window.close().await;

        let status = status.map_err(|source| ExecError::Wait {
            command: command.to_string(),
            source,
        })?;

        let outcome = if status.success() {
            CommandOutcome::Success
        } else {
            CommandOutcome::Failed {
                code: status.code(),
            }
        };
        debug!(?outcome, "process exited");
        Ok(outcome)
    }
}

/// Forward every line of `stream` to the window, in order
///
/// Bytes that are not valid UTF-8 are replaced rather than ending the stream, so
/// the child never loses its reader while it is still writing.
async fn forward_lines<R>(stream: R, window: LineSender)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    let mut forwarding = true;
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                if !forwarding {
                    continue;
                }
                if buf.last() == Some(&b'\n') {
                    buf.pop();
                }
                let line = String::from_utf8_lossy(&buf).into_owned();
                if window.send(line).is_err() {
                    // Keep draining so the child does not block or get SIGPIPE
                    forwarding = false;
                }
            }
            Err(e) => {
                debug!(error = %e, "stream read failed");
                break;
            }
        }
    }
}
