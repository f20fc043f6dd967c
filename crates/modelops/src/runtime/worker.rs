use std::process::Stdio;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, warn};

use super::Attachment;
use crate::error::ReleaseError;

#[derive(Debug, Clone)]
pub struct WorkerCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl WorkerCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into(), args: Vec::new() }
    }

    pub fn arg(mut self, a: impl Into<String>) -> Self {
        self.args.push(a.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerErrorKind {
    IncompatibleBackend,
    OutOfMemory,
    DeviceFault,
    #[serde(other)]
    Other,
}

/// One NDJSON line on the worker's stdout.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum WorkerEvent {
    #[serde(rename = "progress")]
    Progress {
        phase: String,
        detail: Option<String>,
    },
    #[serde(rename = "ready")]
    Ready {
        backend: String,
        memory_mb: u64,
        #[serde(default)]
        companion: Option<String>,
    },
    #[serde(rename = "result")]
    Result {
        text: String,
    },
    #[serde(rename = "error")]
    Error {
        kind: WorkerErrorKind,
        message: String,
    },
}

/// One NDJSON line on the worker's stdin.
#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum WorkerRequest<'a> {
    Generate {
        prompt: &'a str,
        max_new_tokens: u32,
        temperature: Option<f32>,
        attachments: &'a [Attachment],
    },
    /// Interpreter-style invocation used by edge runtimes.
    Run {
        input: &'a str,
        max_tokens: u32,
        temperature: Option<f32>,
    },
    Shutdown,
}

/// A model-serving child process. Killed if dropped without shutdown.
pub struct WorkerProcess {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    label: String,
}

impl WorkerProcess {
    pub fn spawn(cmd: &WorkerCommand, label: &str) -> std::io::Result<Self> {
        let mut command = Command::new(&cmd.program);
        command
            .args(&cmd.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn()?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| std::io::Error::other("worker stdin not captured"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::other("worker stdout not captured"))?;

        if let Some(stderr) = child.stderr.take() {
            let label = label.to_string();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(worker = %label, "{line}");
                }
            });
        }

        Ok(Self {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            label: label.to_string(),
        })
    }

    pub async fn send(&mut self, req: &WorkerRequest<'_>) -> std::io::Result<()> {
        let mut line = serde_json::to_vec(req).map_err(std::io::Error::other)?;
        line.push(b'\n');
        self.stdin.write_all(&line).await?;
        self.stdin.flush().await
    }

    /// Next meaningful event. Progress lines and non-JSON chatter are logged
    /// and skipped. `None` means the worker closed stdout.
    pub async fn next_event(&mut self) -> std::io::Result<Option<WorkerEvent>> {
        while let Some(line) = self.stdout.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<WorkerEvent>(line) {
                Ok(WorkerEvent::Progress { phase, detail }) => {
                    debug!(worker = %self.label, phase = %phase, detail = ?detail, "worker progress");
                }
                Ok(ev) => return Ok(Some(ev)),
                Err(_) => debug!(worker = %self.label, line = %line, "non-json stdout line"),
            }
        }
        Ok(None)
    }

    pub async fn exit_status(&mut self) -> String {
        match self.child.try_wait() {
            Ok(Some(status)) => status.to_string(),
            Ok(None) => "still running".to_string(),
            Err(e) => e.to_string(),
        }
    }

    /// Asks the worker to exit, killing it after `grace`.
    pub async fn shutdown(mut self, grace: Duration) -> Result<(), ReleaseError> {
        if let Err(e) = self.send(&WorkerRequest::Shutdown).await {
            debug!(worker = %self.label, error = %e, "shutdown request not delivered");
        }
        match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(Ok(status)) if status.success() => Ok(()),
            Ok(Ok(status)) => {
                warn!(worker = %self.label, %status, "worker exited uncleanly");
                Ok(())
            }
            Ok(Err(e)) => Err(ReleaseError(format!("wait failed: {e}"))),
            Err(_) => {
                warn!(worker = %self.label, "worker ignored shutdown; killing");
                self.child
                    .kill()
                    .await
                    .map_err(|e| ReleaseError(format!("kill failed: {e}")))
            }
        }
    }

    pub async fn kill(mut self) {
        let _ = self.child.kill().await;
    }
}
