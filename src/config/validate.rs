// src/config/validate.rs

use std::collections::BTreeMap;

use crate::config::model::{ExecConfig, RawExecConfig};
use crate::config::set::ConfigSet;
use crate::errors::{ExecError, Result};
use crate::operation::Tool;

impl TryFrom<RawExecConfig> for ExecConfig {
    type Error = crate::errors::ExecError;

    fn try_from(raw: RawExecConfig) -> std::result::Result<Self, Self::Error> {
        validate_programs(&raw)?;
        validate_fetch(&raw)?;
        let exit_codes = resolve_exit_codes(&raw)?;
        let settings = resolve_settings(&raw)?;
        let scratch_root = raw.scratch.root.unwrap_or_else(std::env::temp_dir);

        Ok(ExecConfig::new_unchecked(
            raw.programs,
            raw.runner,
            raw.fetch,
            scratch_root,
            exit_codes,
            settings,
        ))
    }
}

fn validate_programs(cfg: &RawExecConfig) -> Result<()> {
    for tool in Tool::ALL {
        if cfg.programs.program(tool).trim().is_empty() {
            return Err(ExecError::ConfigError(format!(
                "[programs].{tool} must not be empty"
            )));
        }
    }
    if cfg.programs.shell.trim().is_empty() {
        return Err(ExecError::ConfigError(
            "[programs].shell must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_fetch(cfg: &RawExecConfig) -> Result<()> {
    if cfg.fetch.tries == 0 {
        return Err(ExecError::ConfigError(
            "[fetch].tries must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.fetch.timeout_secs == 0 {
        return Err(ExecError::ConfigError(
            "[fetch].timeout_secs must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn resolve_exit_codes(cfg: &RawExecConfig) -> Result<BTreeMap<Tool, Vec<i32>>> {
    let mut resolved = BTreeMap::new();
    for (name, codes) in cfg.exit_codes.iter() {
        let tool = Tool::ALL
            .into_iter()
            .find(|t| t.as_str() == name)
            .ok_or_else(|| {
                ExecError::ConfigError(format!("[exit_codes] has unknown tool '{name}'"))
            })?;
        if codes.is_empty() {
            return Err(ExecError::ConfigError(format!(
                "[exit_codes].{name} must list at least one success code"
            )));
        }
        resolved.insert(tool, codes.clone());
    }
    Ok(resolved)
}

fn resolve_settings(cfg: &RawExecConfig) -> Result<ConfigSet> {
    let mut settings = ConfigSet::new();
    for (key, value) in cfg.settings.iter() {
        let value = match value {
            toml::Value::String(s) => s.clone(),
            toml::Value::Boolean(b) => b.to_string(),
            toml::Value::Integer(i) => i.to_string(),
            toml::Value::Float(f) => f.to_string(),
            other => {
                return Err(ExecError::ConfigError(format!(
                    "[settings].\"{key}\" must be a scalar (got {})",
                    other.type_str()
                )));
            }
        };
        settings.set(key.clone(), value);
    }
    Ok(settings)
}
