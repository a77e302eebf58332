// src/exec/backend.rs

//! Pluggable process-runner abstraction.
//!
//! The executor talks to a `ProcessRunner` instead of `tokio::process`
//! directly. Production code uses [`TokioProcessRunner`]; tests can provide
//! their own implementation that replays scripted output without spawning
//! anything.
//!
//! [`TokioProcessRunner`]: super::process::TokioProcessRunner

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::command::CommandLine;
use crate::errors::Result;

/// Receives stdout lines as the child produces them.
pub trait LineObserver: Send {
    fn on_stdout(&mut self, line: &str);
}

/// Observer that discards every line.
#[derive(Debug, Clone, Copy, Default)]
pub struct IgnoreLines;

impl LineObserver for IgnoreLines {
    fn on_stdout(&mut self, _line: &str) {}
}

/// Outcome of one child process, fixed once it has terminated.
///
/// `stdout` holds what the command's capture policy retained; `stderr` holds
/// a bounded tail. `exit_code` is `-1` when the child was killed by a signal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessResult {
    pub exit_code: i32,
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
    pub duration: Duration,
}

impl ProcessResult {
    /// Last `n` lines of diagnostic output, stderr first.
    pub fn output_tail(&self, n: usize) -> String {
        let lines: Vec<&str> = self
            .stderr
            .iter()
            .chain(self.stdout.iter())
            .map(String::as_str)
            .collect();
        let start = lines.len().saturating_sub(n);
        lines[start..].join("\n")
    }

    pub fn duration_millis(&self) -> u128 {
        self.duration.as_millis()
    }
}

/// Trait abstracting how a `CommandLine` becomes a finished process.
///
/// The returned future must not resolve before the child has exited.
pub trait ProcessRunner: Send + Sync {
    fn run<'a>(
        &'a self,
        cmd: &'a CommandLine,
        observer: &'a mut dyn LineObserver,
    ) -> Pin<Box<dyn Future<Output = Result<ProcessResult>> + Send + 'a>>;
}
