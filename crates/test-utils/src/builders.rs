#![allow(dead_code)]

use std::path::Path;

use etlexec::config::{ConfigSet, ExecConfig, RawExecConfig};
use etlexec::operation::Tool;
use etlexec::types::RunnerMode;

/// Complete database connection settings.
pub fn db_settings() -> ConfigSet {
    ConfigSet::new()
        .with("mysql.database", "etl")
        .with("mysql.host", "db.internal")
        .with("mysql.user", "loader")
        .with("mysql.pass", "s3cr3t'pw")
}

/// Builder for `ExecConfig` to simplify test setup.
pub struct ExecConfigBuilder {
    raw: RawExecConfig,
    settings: ConfigSet,
}

impl ExecConfigBuilder {
    pub fn new() -> Self {
        Self {
            raw: RawExecConfig::default(),
            settings: ConfigSet::new(),
        }
    }

    pub fn program(mut self, tool: Tool, path: impl AsRef<Path>) -> Self {
        self.raw
            .programs
            .set_program(tool, path.as_ref().to_string_lossy().into_owned());
        self
    }

    pub fn mode(mut self, mode: RunnerMode) -> Self {
        self.raw.runner.mode = mode;
        self
    }

    pub fn scratch_root(mut self, root: impl AsRef<Path>) -> Self {
        self.raw.scratch.root = Some(root.as_ref().to_path_buf());
        self
    }

    pub fn success_codes(mut self, tool: Tool, codes: &[i32]) -> Self {
        self.raw
            .exit_codes
            .insert(tool.as_str().to_string(), codes.to_vec());
        self
    }

    pub fn setting(mut self, key: &str, value: &str) -> Self {
        self.settings.set(key, value);
        self
    }

    pub fn with_database(mut self) -> Self {
        self.settings.merge(&db_settings());
        self
    }

    pub fn build(self) -> ExecConfig {
        let mut config =
            ExecConfig::try_from(self.raw).expect("Failed to build valid config from builder");
        config.settings.merge(&self.settings);
        config
    }
}

impl Default for ExecConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
