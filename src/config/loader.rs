// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{ExecConfig, RawExecConfig};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw
/// `RawExecConfig`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawExecConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawExecConfig = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and run validation.
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Checks program paths, fetch limits and exit-code overrides, and turns
///   `[settings]` into the initial `ConfigSet`.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ExecConfig> {
    let raw_config = load_from_path(&path)?;
    let config = ExecConfig::try_from(raw_config)?;
    Ok(config)
}

/// Like [`load_and_validate`], but a missing file at the default location
/// yields the built-in defaults instead of an error.
pub fn load_or_default(path: impl AsRef<Path>) -> Result<ExecConfig> {
    let path = path.as_ref();
    if !path.exists() && path == default_config_path() {
        return Ok(ExecConfig::default());
    }
    load_and_validate(path)
}

/// Default config location: `Etlexec.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Etlexec.toml")
}
