// src/preflight.rs

//! Checks run before anything is spawned.
//!
//! A failed check is an error and nothing is executed. Some inputs are not
//! errors but are not worth running either (an empty import file, a file
//! whose table does not exist); those yield [`Preflight::Skip`] and the
//! executor reports them with `Ignored=TRUE`.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::command::builder::{redact_url, validate_url};
use crate::config::ConfigSet;
use crate::errors::{ExecError, Result};
use crate::fs::{FileSystem, RealFileSystem};
use crate::operation::Operation;

/// Outcome of a successful check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Preflight {
    Proceed,
    /// Do not run; the string says why.
    Skip(String),
}

impl Preflight {
    pub fn is_skip(&self) -> bool {
        matches!(self, Preflight::Skip(_))
    }
}

#[derive(Debug, Clone)]
pub struct PreflightValidator {
    fs: Arc<dyn FileSystem>,
}

impl Default for PreflightValidator {
    fn default() -> Self {
        Self::new(Arc::new(RealFileSystem))
    }
}

impl PreflightValidator {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    /// Everything that can be decided from the operation, the settings and
    /// the filesystem alone. The import table match needs the database and is
    /// done separately by [`PreflightValidator::check_table`].
    pub fn check(&self, op: &Operation, cfg: &ConfigSet) -> Result<Preflight> {
        cfg.require_all(op.required_keys())?;

        match op {
            Operation::Query { sql } => {
                if sql.trim().is_empty() {
                    return Err(ExecError::ValidationError(
                        "null or empty SQL statement".to_string(),
                    ));
                }
                Ok(Preflight::Proceed)
            }
            Operation::Export { sql, destination } => {
                self.check_export(sql, destination, cfg)?;
                Ok(Preflight::Proceed)
            }
            Operation::Import { source } => self.check_import_source(source),
            Operation::ArchiveExtract { archive, dest_dir } => {
                self.check_archive(archive)?;
                if let Some(dir) = dest_dir {
                    self.check_dir_target(dir)?;
                }
                Ok(Preflight::Proceed)
            }
            Operation::ArchiveCreate {
                source_dir,
                destination,
            } => {
                if !self.fs.is_dir(source_dir) {
                    return Err(ExecError::ValidationError(format!(
                        "archive source {source_dir:?} is not a directory"
                    )));
                }
                if let Some(dest) = destination {
                    if self.fs.is_dir(dest) {
                        return Err(ExecError::ValidationError(format!(
                            "archive destination {dest:?} is a directory"
                        )));
                    }
                }
                Ok(Preflight::Proceed)
            }
            Operation::Fetch {
                url,
                dest_dir,
                overwrite,
            } => {
                let name = file_name_from_url(url)?;
                if let Some(dir) = dest_dir {
                    self.check_dir_target(dir)?;
                    let target = dir.join(&name);
                    if !overwrite && self.fs.exists(&target) {
                        return Err(ExecError::DestinationExists(target));
                    }
                }
                Ok(Preflight::Proceed)
            }
            Operation::Convert { source } => {
                if !has_extension(source, "dbf") {
                    return Err(ExecError::ValidationError(format!(
                        "{source:?} is not a dBase (.dbf) file"
                    )));
                }
                self.require_file(source)?;
                Ok(Preflight::Proceed)
            }
        }
    }

    /// Export only runs `SELECT` statements, and only into a file path.
    pub fn check_export(&self, sql: &str, destination: &Path, cfg: &ConfigSet) -> Result<()> {
        if !is_select(sql) {
            return Err(ExecError::ValidationError(format!(
                "export requires a SELECT statement, got: {}",
                sql.trim()
            )));
        }
        if destination.as_os_str().is_empty() {
            return Err(ExecError::ValidationError(
                "export destination is required".to_string(),
            ));
        }
        if self.fs.is_dir(destination) {
            return Err(ExecError::ValidationError(format!(
                "export destination {destination:?} is a directory"
            )));
        }
        if !export_overwrites(cfg) && self.fs.exists(destination) {
            return Err(ExecError::DestinationExists(destination.to_path_buf()));
        }
        Ok(())
    }

    /// Import sources must be existing regular files that are not archives.
    /// Empty files are skipped.
    pub fn check_import_source(&self, source: &Path) -> Result<Preflight> {
        self.require_file(source)?;
        if has_extension(source, "zip") {
            return Err(ExecError::ValidationError(format!(
                "{source:?} is a zip archive; extract it before importing"
            )));
        }
        if self.fs.file_len(source)? == 0 {
            warn!(file = ?source, "import data file is empty; ignoring");
            return Ok(Preflight::Skip(format!("{} is empty", source.display())));
        }
        Ok(Preflight::Proceed)
    }

    /// Zip archives only, and they must exist.
    pub fn check_archive(&self, archive: &Path) -> Result<()> {
        if !has_extension(archive, "zip") {
            return Err(ExecError::ValidationError(format!(
                "{archive:?} is not a zip archive"
            )));
        }
        self.require_file(archive)
    }

    /// The data file's table must be in `catalog` (exact match).
    pub fn check_table(&self, source: &Path, catalog: &BTreeSet<String>) -> Preflight {
        match table_name(source) {
            Some(table) if catalog.contains(&table) => Preflight::Proceed,
            Some(table) => {
                debug!(table = %table, "no matching table in catalog");
                Preflight::Skip(format!("no table named {table}"))
            }
            None => Preflight::Skip(format!("cannot derive a table name from {source:?}")),
        }
    }

    fn require_file(&self, path: &Path) -> Result<()> {
        if !self.fs.is_file(path) {
            return Err(ExecError::ValidationError(format!(
                "{path:?} does not exist or is not a regular file"
            )));
        }
        Ok(())
    }

    fn check_dir_target(&self, dir: &Path) -> Result<()> {
        if self.fs.exists(dir) && !self.fs.is_dir(dir) {
            return Err(ExecError::ValidationError(format!(
                "{dir:?} exists and is not a directory"
            )));
        }
        Ok(())
    }
}

/// Export replaces an existing destination unless `replace` is set to
/// something other than `true`.
pub fn export_overwrites(cfg: &ConfigSet) -> bool {
    cfg.is_truthy_or("replace", true)
}

/// `true` when the first keyword is `SELECT`, ignoring case and leading
/// whitespace.
pub fn is_select(sql: &str) -> bool {
    let first = sql.trim_start().split(|c: char| !c.is_alphanumeric()).next();
    first.is_some_and(|w| w.eq_ignore_ascii_case("select"))
}

/// Case-insensitive extension test, `ext` given without the dot.
pub fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

/// Table a data file loads into: its file name without the last extension.
pub fn table_name(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Last segment of the URL path, with query and fragment removed.
pub fn file_name_from_url(url: &str) -> Result<String> {
    validate_url(url)?;
    let after_scheme = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    let without_suffix = after_scheme
        .split(['?', '#'])
        .next()
        .unwrap_or(after_scheme);
    let name = match without_suffix.split_once('/') {
        Some((_, path)) => path.rsplit('/').next().unwrap_or(""),
        None => "",
    };
    if name.is_empty() || name == "." || name == ".." {
        return Err(ExecError::ValidationError(format!(
            "cannot derive a file name from URL {}",
            redact_url(url)
        )));
    }
    Ok(name.to_string())
}
