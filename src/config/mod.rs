// src/config/mod.rs

//! Configuration for etlexec.
//!
//! Responsibilities:
//! - The `ConfigSet` settings bag every operation reads (`set.rs`).
//! - The TOML-backed framework configuration (`model.rs`).
//! - Loading a config file from disk (`loader.rs`).
//! - Validating it into an `ExecConfig` (`validate.rs`).

pub mod loader;
pub mod model;
pub mod set;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, load_or_default};
pub use model::{
    ExecConfig, FetchSection, RawExecConfig, RunnerSection, ScratchSection, ToolPaths,
};
pub use set::ConfigSet;
