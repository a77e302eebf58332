// src/executor/mod.rs

//! Runs an [`Operation`] end to end.
//!
//! Every operation follows the same path: preflight checks, command
//! construction, process execution with output streamed into a status
//! parser, exit-code classification, and finally the commit of any produced
//! file. Nothing is visible at a final path unless all earlier steps
//! succeeded.

mod archive;
mod import;

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use anyhow::anyhow;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

pub use import::ImportSession;

use crate::command::builder::redact_url;
use crate::command::quote::terminate_sql;
use crate::command::{CommandBuilder, CommandLine, QueryStyle};
use crate::config::{ConfigSet, ExecConfig};
use crate::errors::{ExecError, Result};
use crate::exec::exit_status::describe;
use crate::exec::status::REASON;
use crate::exec::{
    ExitClass, ExitStatusTranslator, IgnoreLines, LineObserver, ProcessResult, ProcessRunner,
    StatusReport, TokioProcessRunner,
};
use crate::fs::{FileSystem, RealFileSystem};
use crate::operation::{Operation, Tool};
use crate::preflight::{PreflightValidator, export_overwrites, file_name_from_url};
use crate::transfer::{ScratchRoot, StagedFile};

/// Output of a query: the retained stdout rows plus the status report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOutput {
    pub rows: Vec<String>,
    pub report: StatusReport,
}

/// Shared, immutable execution context. Cloning is cheap and clones can be
/// moved into tasks; invocations never share mutable state.
pub struct Executor<R: ProcessRunner = TokioProcessRunner> {
    inner: Arc<Inner<R>>,
}

struct Inner<R> {
    config: ExecConfig,
    runner: R,
    translator: ExitStatusTranslator,
    scratch: ScratchRoot,
    fs: Arc<dyn FileSystem>,
    preflight: PreflightValidator,
}

impl<R: ProcessRunner> Clone for Executor<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Executor<TokioProcessRunner> {
    /// Executor spawning real processes as configured.
    pub fn from_config(config: ExecConfig) -> Self {
        let runner = TokioProcessRunner::from_config(&config);
        Self::new(config, runner)
    }
}

impl<R: ProcessRunner + 'static> Executor<R> {
    pub fn new(config: ExecConfig, runner: R) -> Self {
        Self::with_filesystem(config, runner, Arc::new(RealFileSystem))
    }

    /// Like [`Executor::new`] with preflight checks answered by `fs`.
    pub fn with_filesystem(config: ExecConfig, runner: R, fs: Arc<dyn FileSystem>) -> Self {
        let translator = ExitStatusTranslator::new(config.exit_codes.clone());
        let scratch = ScratchRoot::new(config.scratch_root.clone());
        let preflight = PreflightValidator::new(Arc::clone(&fs));
        Self {
            inner: Arc::new(Inner {
                config,
                runner,
                translator,
                scratch,
                fs,
                preflight,
            }),
        }
    }

    pub fn config(&self) -> &ExecConfig {
        &self.inner.config
    }

    pub fn settings(&self) -> &ConfigSet {
        &self.inner.config.settings
    }

    pub fn runner(&self) -> &R {
        &self.inner.runner
    }

    pub fn scratch(&self) -> &ScratchRoot {
        &self.inner.scratch
    }

    pub(crate) fn preflight(&self) -> &PreflightValidator {
        &self.inner.preflight
    }

    /// Run one operation to completion.
    ///
    /// Skipped operations are not errors: they return a report for which
    /// [`StatusReport::is_ignored`] is true.
    pub async fn execute(&self, op: Operation) -> Result<StatusReport> {
        let name = op.name();
        debug!(operation = name, "executing operation");
        let result = self.dispatch(op).await;
        match &result {
            Ok(report) if report.is_ignored() => {
                info!(operation = name, reason = report.get(REASON).unwrap_or(""), "operation skipped")
            }
            Ok(_) => info!(operation = name, "operation finished"),
            Err(err) => warn!(operation = name, error = %err, "operation failed"),
        }
        result
    }

    async fn dispatch(&self, op: Operation) -> Result<StatusReport> {
        // Import has its own gating, including skips.
        if !matches!(op, Operation::Import { .. }) {
            self.preflight().check(&op, self.settings())?;
        }

        match op {
            Operation::Query { sql } => Ok(self.run_query(&sql, QueryStyle::Plain).await?.report),
            Operation::Export { sql, destination } => {
                self.export(&sql, &absolute(&destination)?).await
            }
            Operation::Import { source } => {
                self.import_session().import(&absolute(&source)?).await
            }
            Operation::ArchiveExtract { archive, dest_dir } => {
                self.extract(absolute(&archive)?, dest_dir).await
            }
            Operation::ArchiveCreate {
                source_dir,
                destination,
            } => self.create_archive(absolute(&source_dir)?, destination).await,
            Operation::Fetch {
                url,
                dest_dir,
                overwrite,
            } => self.fetch(&url, dest_dir.as_deref(), overwrite).await,
            Operation::Convert { source } => self.convert(&absolute(&source)?).await,
        }
    }

    /// Run a statement and keep every output row.
    pub async fn query(&self, sql: &str) -> Result<QueryOutput> {
        let op = Operation::Query { sql: sql.to_string() };
        self.preflight().check(&op, self.settings())?;
        self.run_query(sql, QueryStyle::Plain).await
    }

    /// Rows of a query without the header line.
    pub async fn select_rows(&self, sql: &str) -> Result<Vec<String>> {
        Ok(self.run_query(sql, QueryStyle::RowsOnly).await?.rows)
    }

    /// Start a session for importing several files into the same database.
    pub fn import_session(&self) -> ImportSession<R> {
        ImportSession::new(self.clone())
    }

    /// Fetch every URL concurrently, one task per URL.
    ///
    /// Results come back in input order. A failing fetch is logged and
    /// reported in its own slot; it does not stop the others.
    pub async fn fetch_all(
        &self,
        urls: Vec<String>,
        dest_dir: Option<PathBuf>,
        overwrite: bool,
    ) -> Vec<(String, Result<StatusReport>)> {
        let mut set = JoinSet::new();
        let mut slots: Vec<(String, Option<Result<StatusReport>>)> = Vec::with_capacity(urls.len());
        let mut ids = std::collections::HashMap::new();

        for (idx, url) in urls.into_iter().enumerate() {
            let exec = self.clone();
            let op = Operation::Fetch {
                url: url.clone(),
                dest_dir: dest_dir.clone(),
                overwrite,
            };
            let handle = set.spawn(async move { (idx, exec.execute(op).await) });
            ids.insert(handle.id(), idx);
            slots.push((url, None));
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((idx, result)) => {
                    if let Err(err) = &result {
                        warn!(url = %redact_url(&slots[idx].0), error = %err, "fetch failed");
                    }
                    slots[idx].1 = Some(result);
                }
                Err(join_err) => {
                    if let Some(&idx) = ids.get(&join_err.id()) {
                        error!(url = %redact_url(&slots[idx].0), error = %join_err, "fetch task panicked");
                        slots[idx].1 = Some(Err(ExecError::Other(anyhow!(
                            "fetch task failed: {join_err}"
                        ))));
                    }
                }
            }
        }

        slots
            .into_iter()
            .map(|(url, result)| {
                let result = result
                    .unwrap_or_else(|| Err(ExecError::Other(anyhow!("fetch task did not report"))));
                (url, result)
            })
            .collect()
    }

    /// Fetch in the background; the handle resolves to the fetch result.
    pub fn spawn_fetch(
        &self,
        url: impl Into<String>,
        dest_dir: Option<PathBuf>,
        overwrite: bool,
    ) -> JoinHandle<Result<StatusReport>> {
        let exec = self.clone();
        let op = Operation::Fetch {
            url: url.into(),
            dest_dir,
            overwrite,
        };
        tokio::spawn(async move { exec.execute(op).await })
    }

    /// The command line `op` would run, without running it. `None` for
    /// operations done in-process.
    pub fn plan(&self, op: &Operation) -> Result<Option<CommandLine>> {
        let cfg = self.settings();
        let builder = CommandBuilder::new(self.config());
        let cmd = match op {
            Operation::Query { sql } => builder.query(cfg, sql, QueryStyle::Plain)?,
            Operation::Export { sql, destination } => builder.export(cfg, sql, destination)?,
            Operation::Import { source } => builder.import(cfg, source)?,
            Operation::Fetch { url, dest_dir, .. } => {
                let name = file_name_from_url(url)?;
                let dir = dest_dir.as_deref().unwrap_or(self.scratch().path());
                builder.fetch(url, &dir.join(name))?
            }
            Operation::Convert { source } => builder.convert(source, &dat_path(source))?,
            Operation::ArchiveExtract { .. } | Operation::ArchiveCreate { .. } => return Ok(None),
        };
        Ok(Some(cmd))
    }

    /// Run `cmd` and turn a non-success exit into `ProcessExitError`.
    pub(crate) async fn run_checked(
        &self,
        cmd: &CommandLine,
        observer: &mut dyn LineObserver,
    ) -> Result<ProcessResult> {
        let tool = cmd.tool();
        debug!(tool = %tool, cmd = %cmd, "running");
        let result = self.inner.runner.run(cmd, observer).await?;

        match self.inner.translator.translate(tool, result.exit_code) {
            ExitClass::Success => {
                debug!(tool = %tool, exit_code = result.exit_code, "exit code accepted");
                Ok(result)
            }
            ExitClass::Failure { code, description } => {
                let tail = result.output_tail(self.config().runner.output_tail_lines);
                Err(ExecError::ProcessExitError {
                    tool,
                    exit_code: code,
                    description,
                    command: cmd.redacted(),
                    output_tail: cmd.redact_text(&tail),
                })
            }
        }
    }

    async fn run_query(&self, sql: &str, style: QueryStyle) -> Result<QueryOutput> {
        let start = Instant::now();
        let cfg = self.settings();
        let cmd = CommandBuilder::new(self.config()).query(cfg, sql, style)?;
        let result = self.run_checked(&cmd, &mut IgnoreLines).await?;

        let mut report = StatusReport::new();
        for key in ["mysql.database", "mysql.host"] {
            if let Some(value) = cfg.get(key) {
                report.insert(key, value);
            }
        }
        let rows = match style {
            QueryStyle::Plain => result.stdout.len().saturating_sub(1),
            QueryStyle::RowsOnly => result.stdout.len(),
        };
        report.insert("SQL", terminate_sql(sql));
        report.insert("Rows", rows);
        report.insert("Duration", start.elapsed().as_millis());
        Ok(QueryOutput {
            rows: result.stdout,
            report,
        })
    }

    async fn export(&self, sql: &str, destination: &Path) -> Result<StatusReport> {
        let start = Instant::now();
        let cfg = self.settings();
        let mut report = StatusReport::new();
        report.insert("startTime", unix_millis());

        let staged = StagedFile::new_for(destination)?;
        let cmd = CommandBuilder::new(self.config()).export(cfg, sql, staged.path())?;
        self.run_checked(&cmd, &mut IgnoreLines).await?;

        let staged_path = staged.path().to_path_buf();
        let records = tokio::task::spawn_blocking(move || count_lines(&staged_path))
            .await
            .map_err(anyhow::Error::from)??;
        let size = staged.len()?;
        let path = staged.commit(destination, export_overwrites(cfg))?;

        report.insert("destination", path.display());
        report.insert("fileSize", size);
        report.insert("records", records);
        report.insert("duration", start.elapsed().as_millis());
        Ok(report)
    }

    async fn fetch(
        &self,
        url: &str,
        dest_dir: Option<&Path>,
        overwrite: bool,
    ) -> Result<StatusReport> {
        let (dir, scratch_dir) = match dest_dir {
            Some(dir) => (absolute(dir)?, false),
            None => (self.scratch().create_dir("wget-")?, true),
        };
        let result = self.fetch_into(url, &dir, overwrite).await;
        if result.is_err() && scratch_dir {
            if let Err(err) = self.scratch().remove(&dir) {
                warn!(dir = ?dir, error = %err, "failed to remove scratch directory");
            }
        }
        result
    }

    async fn fetch_into(&self, url: &str, dir: &Path, overwrite: bool) -> Result<StatusReport> {
        let start = Instant::now();
        let target = dir.join(file_name_from_url(url)?);

        let staged = StagedFile::new_for(&target)?;
        let cmd = CommandBuilder::new(self.config()).fetch(url, staged.path())?;
        let result = self.run_checked(&cmd, &mut IgnoreLines).await?;
        let size = staged.len()?;
        let path = staged.commit(&target, overwrite)?;

        let millis = start.elapsed().as_millis().max(1);
        let mbps = (size as f64 * 8.0) / (millis as f64 * 1000.0);

        let mut report = StatusReport::new();
        report.insert("source", redact_url(url));
        report.insert("status", describe(Tool::Wget, result.exit_code));
        report.insert("destination", path.display());
        report.insert("size", size);
        report.insert("duration", millis);
        report.insert("speed", format!("{mbps:.3}"));
        Ok(report)
    }

    async fn extract(&self, archive: PathBuf, dest_dir: Option<PathBuf>) -> Result<StatusReport> {
        let dir = match dest_dir {
            Some(dir) => absolute(&dir)?,
            None => self.scratch().create_dir("zip-")?,
        };
        tokio::task::spawn_blocking(move || archive::extract(&archive, &dir))
            .await
            .map_err(anyhow::Error::from)?
    }

    async fn create_archive(
        &self,
        source_dir: PathBuf,
        destination: Option<PathBuf>,
    ) -> Result<StatusReport> {
        let fs = &self.inner.fs;
        let files: Vec<PathBuf> = fs
            .read_dir(&source_dir)?
            .into_iter()
            .filter(|p| fs.is_file(p))
            .collect();

        let target = match destination {
            Some(dest) => absolute(&dest)?,
            None => {
                let base = source_dir
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "archive".to_string());
                self.scratch().create_dir("zip-")?.join(format!("{base}.zip"))
            }
        };
        let overwrite = self.settings().is_truthy_or("replace", true);

        tokio::task::spawn_blocking(move || archive::create(&source_dir, &files, &target, overwrite))
            .await
            .map_err(anyhow::Error::from)?
    }

    async fn convert(&self, source: &Path) -> Result<StatusReport> {
        let start = Instant::now();
        let output = dat_path(source);

        let staged = StagedFile::new_for(&output)?;
        let cmd = CommandBuilder::new(self.config()).convert(source, staged.path())?;
        self.run_checked(&cmd, &mut IgnoreLines).await?;
        let size = staged.len()?;
        let path = staged.commit(&output, true)?;

        let mut report = StatusReport::new();
        report.insert("Source", source.display());
        report.insert("Output", path.display());
        report.insert("Size", size);
        report.insert("Duration", start.elapsed().as_millis());
        Ok(report)
    }
}

/// Where a converted `.dbf` file is written: same directory, lowercased
/// name, `.dat` extension.
pub fn dat_path(source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    source.with_file_name(format!("{stem}.dat"))
}

fn absolute(path: &Path) -> Result<PathBuf> {
    Ok(std::path::absolute(path)?)
}

fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

/// Number of newline characters, the way `wc -l` counts.
fn count_lines(path: &Path) -> Result<u64> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut buf = [0u8; 64 * 1024];
    let mut lines = 0u64;
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        lines += buf[..n].iter().filter(|&&b| b == b'\n').count() as u64;
    }
    Ok(lines)
}
