use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use etlexec::command::CommandLine;
use etlexec::errors::Result;
use etlexec::exec::{LineObserver, ProcessResult, ProcessRunner};
use etlexec::operation::Tool;

/// What a fake process does when run.
#[derive(Debug, Clone, Default)]
pub struct Scripted {
    pub exit_code: i32,
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
    /// Bytes written to the command's output file: the stdout redirect, or
    /// the argument after `-O`.
    pub output_file: Option<Vec<u8>>,
}

impl Scripted {
    pub fn exit(code: i32) -> Self {
        Self {
            exit_code: code,
            ..Self::default()
        }
    }

    pub fn stdout(mut self, lines: &[&str]) -> Self {
        self.stdout = lines.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn stderr(mut self, lines: &[&str]) -> Self {
        self.stderr = lines.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn writes(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.output_file = Some(bytes.into());
        self
    }
}

#[derive(Default)]
struct FakeState {
    queued: HashMap<Tool, VecDeque<Scripted>>,
    fallback: HashMap<Tool, Scripted>,
    calls: Vec<CommandLine>,
}

/// A fake process runner that:
/// - records every command line it is asked to run
/// - replays scripted stdout to the observer and returns scripted exit codes
///
/// Unscripted tools exit 0 with no output.
#[derive(Clone, Default)]
pub struct FakeRunner {
    state: Arc<Mutex<FakeState>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the next run of `tool`. Queued scripts are used in order.
    pub fn push(&self, tool: Tool, script: Scripted) -> &Self {
        let mut state = self.state.lock().unwrap();
        state.queued.entry(tool).or_default().push_back(script);
        self
    }

    /// Script every run of `tool` that has no queued script.
    pub fn always(&self, tool: Tool, script: Scripted) -> &Self {
        let mut state = self.state.lock().unwrap();
        state.fallback.insert(tool, script);
        self
    }

    pub fn calls(&self) -> Vec<CommandLine> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn calls_for(&self, tool: Tool) -> Vec<CommandLine> {
        self.calls().into_iter().filter(|c| c.tool() == tool).collect()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().unwrap().calls.len()
    }

    fn next_script(&self, cmd: &CommandLine) -> Scripted {
        let mut state = self.state.lock().unwrap();
        state.calls.push(cmd.clone());
        let tool = cmd.tool();
        if let Some(script) = state.queued.get_mut(&tool).and_then(VecDeque::pop_front) {
            return script;
        }
        state.fallback.get(&tool).cloned().unwrap_or_default()
    }
}

fn output_target(cmd: &CommandLine) -> Option<PathBuf> {
    if let Some(path) = cmd.stdout_path() {
        return Some(path.to_path_buf());
    }
    let argv = cmd.argv();
    argv.iter()
        .position(|a| a == "-O")
        .and_then(|i| argv.get(i + 1))
        .map(PathBuf::from)
}

impl ProcessRunner for FakeRunner {
    fn run<'a>(
        &'a self,
        cmd: &'a CommandLine,
        observer: &'a mut dyn LineObserver,
    ) -> Pin<Box<dyn Future<Output = Result<ProcessResult>> + Send + 'a>> {
        Box::pin(async move {
            let script = self.next_script(cmd);

            for line in &script.stdout {
                observer.on_stdout(line);
            }
            if let (Some(bytes), Some(target)) = (&script.output_file, output_target(cmd)) {
                std::fs::write(target, bytes)?;
            }

            Ok(ProcessResult {
                exit_code: script.exit_code,
                stdout: script.stdout,
                stderr: script.stderr,
                duration: Duration::from_millis(1),
            })
        })
    }
}
