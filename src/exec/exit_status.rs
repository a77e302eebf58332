// src/exec/exit_status.rs

//! Per-tool interpretation of process exit codes.
//!
//! "Zero means success" holds for most wrapped programs but not all of them:
//! `dbview` reports a successful conversion with exit code 1. Each tool
//! therefore has an explicit success set, which the configuration may
//! replace.

use std::collections::BTreeMap;

use crate::operation::Tool;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitClass {
    Success,
    Failure { code: i32, description: String },
}

impl ExitClass {
    pub fn is_success(&self) -> bool {
        matches!(self, ExitClass::Success)
    }
}

/// wget exit statuses 0..=8.
const WGET_STATUS: [&str; 9] = [
    "OK",
    "Generic error",
    "Parse error",
    "File I/O error",
    "Network failure",
    "SSL verification failure",
    "Username/password authentication failure",
    "Protocol errors",
    "Server issued an error response",
];

#[derive(Debug, Clone, Default)]
pub struct ExitStatusTranslator {
    overrides: BTreeMap<Tool, Vec<i32>>,
}

impl ExitStatusTranslator {
    pub fn new(overrides: BTreeMap<Tool, Vec<i32>>) -> Self {
        Self { overrides }
    }

    /// Exit codes that count as success for `tool`.
    pub fn success_codes(&self, tool: Tool) -> &[i32] {
        match self.overrides.get(&tool) {
            Some(codes) => codes.as_slice(),
            None => builtin_success_codes(tool),
        }
    }

    pub fn translate(&self, tool: Tool, code: i32) -> ExitClass {
        if self.success_codes(tool).contains(&code) {
            ExitClass::Success
        } else {
            ExitClass::Failure {
                code,
                description: describe(tool, code),
            }
        }
    }
}

fn builtin_success_codes(tool: Tool) -> &'static [i32] {
    match tool {
        Tool::DbView => &[1],
        Tool::Mysql | Tool::MysqlImport | Tool::Wget => &[0],
    }
}

/// Human-readable meaning of `code` for `tool`.
pub fn describe(tool: Tool, code: i32) -> String {
    if code < 0 {
        return "terminated by signal".to_string();
    }
    match tool {
        Tool::Wget => usize::try_from(code)
            .ok()
            .and_then(|i| WGET_STATUS.get(i))
            .map(|s| s.to_string())
            .unwrap_or_else(|| format!("unrecognized exit status {code}")),
        Tool::DbView if code == 0 => "did not exit cleanly".to_string(),
        _ if code == 0 => "OK".to_string(),
        _ => "generic failure".to_string(),
    }
}
