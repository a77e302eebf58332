use std::str::FromStr;
use serde::Deserialize;

/// How a `CommandLine` is handed to the operating system.
///
/// - `Argv`: the program is executed directly with an argument vector. No
///   shell is involved, so nothing in the arguments can change parsing
///   (default).
/// - `Shell`: the command line is rendered to a quoted string and run through
///   `sh -c`. Stdout redirection is then expressed as a `> file` suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunnerMode {
    Argv,
    Shell,
}

impl Default for RunnerMode {
    fn default() -> Self {
        RunnerMode::Argv
    }
}

impl FromStr for RunnerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "argv" => Ok(RunnerMode::Argv),
            "shell" => Ok(RunnerMode::Shell),
            other => Err(format!(
                "invalid runner mode: {other} (expected \"argv\" or \"shell\")"
            )),
        }
    }
}

/// How much of a child's stdout is kept in the `ProcessResult`.
///
/// Every line is always offered to the line observer as it arrives; this only
/// bounds what is retained afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capture {
    /// Keep every line (query results).
    All,
    /// Keep only the last `n` lines.
    Tail(usize),
}

impl Default for Capture {
    fn default() -> Self {
        Capture::Tail(40)
    }
}
