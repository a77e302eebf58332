// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::config::set::ConfigSet;
use crate::operation::Tool;
use crate::types::RunnerMode;

/// Framework configuration as read from a TOML file.
///
/// ```toml
/// [programs]
/// mysql = "/usr/bin/mysql"
/// wget = "/opt/bin/wget"
///
/// [runner]
/// mode = "argv"
///
/// [fetch]
/// timeout_secs = 5
/// tries = 1
/// max_redirects = 2
///
/// [exit_codes]
/// dbview = [1]
///
/// [settings]
/// "mysql.host" = "localhost"
/// "mysql.force" = true
/// ```
///
/// All sections are optional and have reasonable defaults. Use
/// [`ExecConfig::try_from`] (or `loader::load_and_validate`) to get a
/// validated [`ExecConfig`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawExecConfig {
    #[serde(default)]
    pub programs: ToolPaths,

    #[serde(default)]
    pub runner: RunnerSection,

    #[serde(default)]
    pub fetch: FetchSection,

    #[serde(default)]
    pub scratch: ScratchSection,

    /// Per-tool success codes, keyed by tool name (`mysql`, `mysqlimport`,
    /// `wget`, `dbview`). Replaces the built-in success set for that tool.
    #[serde(default)]
    pub exit_codes: BTreeMap<String, Vec<i32>>,

    /// Initial ConfigSet entries. Scalars are stored as their string form.
    #[serde(default)]
    pub settings: BTreeMap<String, toml::Value>,
}

/// `[programs]` section: where each wrapped executable lives.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ToolPaths {
    #[serde(default = "default_mysql")]
    pub mysql: String,
    #[serde(default = "default_mysqlimport")]
    pub mysqlimport: String,
    #[serde(default = "default_wget")]
    pub wget: String,
    #[serde(default = "default_dbview")]
    pub dbview: String,
    /// Shell used when `runner.mode = "shell"`.
    #[serde(default = "default_shell")]
    pub shell: String,
}

fn default_mysql() -> String {
    "/usr/bin/mysql".to_string()
}

fn default_mysqlimport() -> String {
    "/usr/bin/mysqlimport".to_string()
}

fn default_wget() -> String {
    "/usr/bin/wget".to_string()
}

fn default_dbview() -> String {
    "/usr/bin/dbview".to_string()
}

fn default_shell() -> String {
    "/bin/sh".to_string()
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            mysql: default_mysql(),
            mysqlimport: default_mysqlimport(),
            wget: default_wget(),
            dbview: default_dbview(),
            shell: default_shell(),
        }
    }
}

impl ToolPaths {
    pub fn program(&self, tool: Tool) -> &str {
        match tool {
            Tool::Mysql => &self.mysql,
            Tool::MysqlImport => &self.mysqlimport,
            Tool::Wget => &self.wget,
            Tool::DbView => &self.dbview,
        }
    }

    pub fn set_program(&mut self, tool: Tool, path: impl Into<String>) {
        let path = path.into();
        match tool {
            Tool::Mysql => self.mysql = path,
            Tool::MysqlImport => self.mysqlimport = path,
            Tool::Wget => self.wget = path,
            Tool::DbView => self.dbview = path,
        }
    }
}

/// `[runner]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RunnerSection {
    #[serde(default)]
    pub mode: RunnerMode,

    /// Number of trailing output lines kept for diagnostics.
    #[serde(default = "default_output_tail_lines")]
    pub output_tail_lines: usize,
}

fn default_output_tail_lines() -> usize {
    40
}

impl Default for RunnerSection {
    fn default() -> Self {
        Self {
            mode: RunnerMode::default(),
            output_tail_lines: default_output_tail_lines(),
        }
    }
}

/// `[fetch]` section: limits passed through to the retrieval program.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FetchSection {
    /// Overall network timeout (`--timeout`).
    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,

    /// Attempts per URL (`--tries`).
    #[serde(default = "default_fetch_tries")]
    pub tries: u32,

    /// Maximum redirects followed (`--max-redirect`).
    #[serde(default = "default_fetch_redirects")]
    pub max_redirects: u32,

    #[serde(default)]
    pub connect_timeout_secs: Option<u64>,

    #[serde(default)]
    pub read_timeout_secs: Option<u64>,
}

fn default_fetch_timeout() -> u64 {
    5
}

fn default_fetch_tries() -> u32 {
    1
}

fn default_fetch_redirects() -> u32 {
    2
}

impl Default for FetchSection {
    fn default() -> Self {
        Self {
            timeout_secs: default_fetch_timeout(),
            tries: default_fetch_tries(),
            max_redirects: default_fetch_redirects(),
            connect_timeout_secs: None,
            read_timeout_secs: None,
        }
    }
}

/// `[scratch]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScratchSection {
    /// Root for temporary directories and staged files that have no final
    /// target directory. Defaults to the system temporary directory.
    #[serde(default)]
    pub root: Option<PathBuf>,
}

/// Validated framework configuration.
///
/// Constructed via `TryFrom<RawExecConfig>` (see `config::validate`) or
/// [`ExecConfig::default`].
#[derive(Debug, Clone)]
pub struct ExecConfig {
    pub programs: ToolPaths,
    pub runner: RunnerSection,
    pub fetch: FetchSection,
    pub scratch_root: PathBuf,
    pub exit_codes: BTreeMap<Tool, Vec<i32>>,
    pub settings: ConfigSet,
}

impl ExecConfig {
    pub(crate) fn new_unchecked(
        programs: ToolPaths,
        runner: RunnerSection,
        fetch: FetchSection,
        scratch_root: PathBuf,
        exit_codes: BTreeMap<Tool, Vec<i32>>,
        settings: ConfigSet,
    ) -> Self {
        Self {
            programs,
            runner,
            fetch,
            scratch_root,
            exit_codes,
            settings,
        }
    }
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self::new_unchecked(
            ToolPaths::default(),
            RunnerSection::default(),
            FetchSection::default(),
            std::env::temp_dir(),
            BTreeMap::new(),
            ConfigSet::new(),
        )
    }
}
