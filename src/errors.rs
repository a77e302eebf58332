// src/errors.rs

//! Crate-wide error type and helpers.

use std::path::PathBuf;

use thiserror::Error;

use crate::operation::Tool;

#[derive(Error, Debug)]
pub enum ExecError {
    /// A required setting is missing or empty.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Operation parameters are malformed or not allowed.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// The child process could not be started at all.
    #[error("Failed to spawn {program}: {source}")]
    SpawnError {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The child ran but its exit code is not a success code for the tool.
    ///
    /// `command` and `output_tail` are already redacted.
    #[error("{tool} exited with code {exit_code} ({description}): {command}{}", tail_suffix(.output_tail))]
    ProcessExitError {
        tool: Tool,
        exit_code: i32,
        description: String,
        command: String,
        output_tail: String,
    },

    #[error("Destination already exists and overwrite is disabled: {0:?}")]
    DestinationExists(PathBuf),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    ArchiveError(#[from] zip::result::ZipError),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Coarse classification of [`ExecError`], for callers that only need to
/// branch on the failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Validation,
    Spawn,
    ProcessExit,
    DestinationExists,
    Io,
    Archive,
    Other,
}

impl ExecError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExecError::ConfigError(_) | ExecError::TomlError(_) => ErrorKind::Configuration,
            ExecError::ValidationError(_) => ErrorKind::Validation,
            ExecError::SpawnError { .. } => ErrorKind::Spawn,
            ExecError::ProcessExitError { .. } => ErrorKind::ProcessExit,
            ExecError::DestinationExists(_) => ErrorKind::DestinationExists,
            ExecError::IoError(_) => ErrorKind::Io,
            ExecError::ArchiveError(_) => ErrorKind::Archive,
            ExecError::Other(_) => ErrorKind::Other,
        }
    }

    /// Raw exit code of the child, when the failure came from one.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ExecError::ProcessExitError { exit_code, .. } => Some(*exit_code),
            _ => None,
        }
    }
}

fn tail_suffix(tail: &str) -> String {
    if tail.is_empty() {
        String::new()
    } else {
        format!("\n--- output tail ---\n{tail}")
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, ExecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_exit_message_carries_code_and_tail() {
        let err = ExecError::ProcessExitError {
            tool: Tool::Wget,
            exit_code: 4,
            description: "Network failure".to_string(),
            command: "/usr/bin/wget --quiet http://example.org/a.zip".to_string(),
            output_tail: "connection refused".to_string(),
        };

        let msg = err.to_string();
        assert!(msg.contains("wget exited with code 4"));
        assert!(msg.contains("Network failure"));
        assert!(msg.contains("connection refused"));
        assert_eq!(err.exit_code(), Some(4));
        assert_eq!(err.kind(), ErrorKind::ProcessExit);
    }

    #[test]
    fn config_error_kind() {
        let err = ExecError::ConfigError("mysql.host is required".into());
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(err.exit_code(), None);
    }
}
