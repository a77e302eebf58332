// src/exec/process.rs

//! Real process runner on top of `tokio::process`.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;
use std::time::Instant;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::command::CommandLine;
use crate::config::ExecConfig;
use crate::errors::{ExecError, Result};
use crate::exec::backend::{LineObserver, ProcessResult, ProcessRunner};
use crate::types::{Capture, RunnerMode};

/// Spawns each `CommandLine` as a child process.
///
/// - `Argv` mode executes the program directly; a stdout redirect becomes a
///   file handle attached to the child.
/// - `Shell` mode runs the quoted rendering through `<shell> -c`, so the
///   redirect is done by the shell.
///
/// The child is killed if the future is dropped before it exits.
#[derive(Debug, Clone)]
pub struct TokioProcessRunner {
    mode: RunnerMode,
    shell: String,
    stderr_tail: usize,
}

impl TokioProcessRunner {
    pub fn new(mode: RunnerMode, shell: impl Into<String>, stderr_tail: usize) -> Self {
        Self {
            mode,
            shell: shell.into(),
            stderr_tail,
        }
    }

    pub fn from_config(config: &ExecConfig) -> Self {
        Self::new(
            config.runner.mode,
            config.programs.shell.clone(),
            config.runner.output_tail_lines,
        )
    }

    fn build_command(&self, cmd: &CommandLine) -> Result<Command> {
        let mut command = match self.mode {
            RunnerMode::Argv => {
                let mut c = Command::new(cmd.program());
                c.args(cmd.argv());
                c
            }
            RunnerMode::Shell => {
                let mut c = Command::new(&self.shell);
                c.arg("-c").arg(cmd.render_shell());
                c
            }
        };

        if let Some(dir) = cmd.working_dir() {
            command.current_dir(dir);
        }

        match (self.mode, cmd.stdout_path()) {
            (RunnerMode::Argv, Some(path)) => {
                let file = std::fs::File::create(path)?;
                command.stdout(Stdio::from(file));
            }
            // The rendered command already ends in `> file`.
            (RunnerMode::Shell, Some(_)) => {
                command.stdout(Stdio::null());
            }
            (_, None) => {
                command.stdout(Stdio::piped());
            }
        }

        command
            .stdin(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        Ok(command)
    }

    async fn run_inner(
        &self,
        cmd: &CommandLine,
        observer: &mut dyn LineObserver,
    ) -> Result<ProcessResult> {
        let started = Instant::now();
        let mut command = self.build_command(cmd)?;

        info!(tool = %cmd.tool(), cmd = %cmd, mode = ?self.mode, "starting process");

        let mut child = command.spawn().map_err(|source| ExecError::SpawnError {
            program: cmd.program().to_string(),
            source,
        })?;

        // Drain stderr concurrently so the child never blocks on a full pipe.
        let stderr_task = child.stderr.take().map(|stderr| {
            let masker = cmd.clone();
            let limit = self.stderr_tail;
            tokio::spawn(async move {
                let tool = masker.tool();
                let mut tail = VecDeque::new();
                let mut reader = BufReader::new(stderr);
                let mut buf = Vec::new();
                while let Ok(Some(line)) = read_line_lossy(&mut reader, &mut buf).await {
                    debug!(%tool, "stderr: {}", masker.redact_text(&line));
                    push_bounded(&mut tail, line, Capture::Tail(limit));
                }
                Vec::from(tail)
            })
        });

        let mut stdout_lines = VecDeque::new();
        if let Some(stdout) = child.stdout.take() {
            let mut reader = BufReader::new(stdout);
            let mut buf = Vec::new();
            while let Some(line) = read_line_lossy(&mut reader, &mut buf).await? {
                debug!(tool = %cmd.tool(), "stdout: {}", cmd.redact_text(&line));
                observer.on_stdout(&line);
                push_bounded(&mut stdout_lines, line, cmd.capture_policy());
            }
        }

        let status = child.wait().await?;
        let exit_code = status.code().unwrap_or(-1);

        let stderr = match stderr_task {
            Some(handle) => handle.await.unwrap_or_else(|e| {
                warn!(error = %e, "stderr reader task failed");
                Vec::new()
            }),
            None => Vec::new(),
        };

        let duration = started.elapsed();
        info!(
            tool = %cmd.tool(),
            exit_code,
            duration_ms = duration.as_millis() as u64,
            "process exited"
        );

        Ok(ProcessResult {
            exit_code,
            stdout: Vec::from(stdout_lines),
            stderr,
            duration,
        })
    }
}

impl ProcessRunner for TokioProcessRunner {
    fn run<'a>(
        &'a self,
        cmd: &'a CommandLine,
        observer: &'a mut dyn LineObserver,
    ) -> Pin<Box<dyn Future<Output = Result<ProcessResult>> + Send + 'a>> {
        Box::pin(self.run_inner(cmd, observer))
    }
}

/// Read one line, tolerating non-UTF-8 bytes. `Ok(None)` at end of stream.
async fn read_line_lossy<R>(reader: &mut BufReader<R>, buf: &mut Vec<u8>) -> Result<Option<String>>
where
    R: AsyncRead + Unpin,
{
    buf.clear();
    let n = reader.read_until(b'\n', buf).await?;
    if n == 0 {
        return Ok(None);
    }
    while matches!(buf.last(), Some(b'\n' | b'\r')) {
        buf.pop();
    }
    Ok(Some(String::from_utf8_lossy(buf).into_owned()))
}

fn push_bounded(lines: &mut VecDeque<String>, line: String, capture: Capture) {
    match capture {
        Capture::All => lines.push_back(line),
        Capture::Tail(0) => {}
        Capture::Tail(n) => {
            if lines.len() == n {
                lines.pop_front();
            }
            lines.push_back(line);
        }
    }
}
