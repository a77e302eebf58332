// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for actually running the wrapped programs,
//! using `tokio::process::Command`, and for interpreting what they report.
//!
//! - [`backend`] provides the `ProcessRunner` trait, the `LineObserver` hook
//!   and `ProcessResult`. Tests replace the runner with a fake.
//! - [`process`] is the production `TokioProcessRunner`.
//! - [`status`] extracts `word: number` metrics into a `StatusReport`.
//! - [`exit_status`] maps exit codes to success/failure per tool.

pub mod backend;
pub mod exit_status;
pub mod process;
pub mod status;

pub use backend::{IgnoreLines, LineObserver, ProcessResult, ProcessRunner};
pub use exit_status::{ExitClass, ExitStatusTranslator};
pub use process::TokioProcessRunner;
pub use status::{StatusCollector, StatusParser, StatusReport};
