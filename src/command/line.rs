// src/command/line.rs

//! `CommandLine`: an immutable description of one child-process invocation.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::command::quote::shell_quote;
use crate::operation::Tool;
use crate::types::Capture;

/// Replacement text for credential values in anything shown to a human.
pub const REDACTED: &str = "********";

/// One argument. Credential arguments keep the secret part separate so it can
/// be masked when the command line is displayed.
#[derive(Clone, PartialEq, Eq)]
pub enum Arg {
    Plain(String),
    Secret {
        prefix: String,
        secret: String,
        suffix: String,
    },
}

impl Arg {
    fn value(&self) -> String {
        match self {
            Arg::Plain(s) => s.clone(),
            Arg::Secret {
                prefix,
                secret,
                suffix,
            } => format!("{prefix}{secret}{suffix}"),
        }
    }

    fn masked(&self) -> String {
        match self {
            Arg::Plain(s) => s.clone(),
            Arg::Secret { prefix, suffix, .. } => format!("{prefix}{REDACTED}{suffix}"),
        }
    }
}

impl fmt::Debug for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.masked())
    }
}

/// Program, argument vector and I/O wiring for a single invocation.
///
/// Built once by the `CommandBuilder` and never changed afterwards. Both
/// `Debug` and `Display` show the redacted form; the real values are only
/// reachable through [`CommandLine::argv`] and [`CommandLine::render_shell`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    tool: Tool,
    program: String,
    args: Vec<Arg>,
    stdout_to: Option<PathBuf>,
    cwd: Option<PathBuf>,
    capture: Capture,
}

impl CommandLine {
    pub fn new(tool: Tool, program: impl Into<String>) -> Self {
        Self {
            tool,
            program: program.into(),
            args: Vec::new(),
            stdout_to: None,
            cwd: None,
            capture: Capture::default(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(Arg::Plain(arg.into()));
        self
    }

    /// Append `prefix` + `secret` as one argument, masking `secret` on display.
    pub fn secret_arg(self, prefix: impl Into<String>, secret: impl Into<String>) -> Self {
        self.embedded_secret_arg(prefix, secret, "")
    }

    /// Append `prefix` + `secret` + `suffix` as one argument, for credentials
    /// embedded mid-argument such as the password of a URL.
    pub fn embedded_secret_arg(
        mut self,
        prefix: impl Into<String>,
        secret: impl Into<String>,
        suffix: impl Into<String>,
    ) -> Self {
        self.args.push(Arg::Secret {
            prefix: prefix.into(),
            secret: secret.into(),
            suffix: suffix.into(),
        });
        self
    }

    /// Send the child's stdout to `path` instead of a pipe.
    pub fn stdout_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdout_to = Some(path.into());
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn capture(mut self, capture: Capture) -> Self {
        self.capture = capture;
        self
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn stdout_path(&self) -> Option<&Path> {
        self.stdout_to.as_deref()
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    pub fn capture_policy(&self) -> Capture {
        self.capture
    }

    /// Real argument values, in order, for direct (non-shell) execution.
    pub fn argv(&self) -> Vec<String> {
        self.args.iter().map(Arg::value).collect()
    }

    /// Single shell string with every word quoted and the stdout redirect (if
    /// any) appended. Contains real credentials; never log it.
    pub fn render_shell(&self) -> String {
        self.render(Arg::value)
    }

    /// Same as [`CommandLine::render_shell`] with credentials masked.
    pub fn redacted(&self) -> String {
        self.render(Arg::masked)
    }

    /// Mask every credential value that occurs in `text`, e.g. a program
    /// echoing its own command line into stderr.
    pub fn redact_text(&self, text: &str) -> String {
        let mut out = text.to_string();
        for arg in &self.args {
            if let Arg::Secret { secret, .. } = arg {
                if !secret.is_empty() {
                    out = out.replace(secret.as_str(), REDACTED);
                }
            }
        }
        out
    }

    fn render(&self, show: impl Fn(&Arg) -> String) -> String {
        let mut words = Vec::with_capacity(self.args.len() + 3);
        words.push(shell_quote(&self.program));
        words.extend(self.args.iter().map(|a| shell_quote(&show(a))));
        if let Some(ref out) = self.stdout_to {
            words.push(">".to_string());
            words.push(shell_quote(&out.to_string_lossy()));
        }
        words.join(" ")
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}
