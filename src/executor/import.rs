// src/executor/import.rs

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::command::CommandBuilder;
use crate::errors::{ExecError, Result};
use crate::exec::{ProcessRunner, StatusCollector, StatusParser, StatusReport};
use crate::executor::Executor;
use crate::operation::{Operation, Tool};
use crate::preflight::Preflight;

/// A sequence of imports into one database.
///
/// The list of existing tables is queried the first time it is needed and
/// reused for the rest of the session. Files whose base name matches no
/// table are skipped.
pub struct ImportSession<R: ProcessRunner> {
    executor: Executor<R>,
    tables: OnceCell<BTreeSet<String>>,
    catalog_queries: AtomicUsize,
}

impl<R: ProcessRunner + 'static> ImportSession<R> {
    pub fn new(executor: Executor<R>) -> Self {
        Self {
            executor,
            tables: OnceCell::new(),
            catalog_queries: AtomicUsize::new(0),
        }
    }

    /// Tables of the configured database, fetched once per session.
    pub async fn tables(&self) -> Result<&BTreeSet<String>> {
        self.tables
            .get_or_try_init(|| async {
                self.catalog_queries.fetch_add(1, Ordering::Relaxed);
                let rows = self.executor.select_rows("show tables").await?;
                let tables: BTreeSet<String> = rows
                    .into_iter()
                    .map(|r| r.trim().to_string())
                    .filter(|r| !r.is_empty())
                    .collect();
                debug!(count = tables.len(), "table catalog loaded");
                Ok::<_, ExecError>(tables)
            })
            .await
    }

    /// How many times the catalog was actually queried.
    pub fn catalog_queries(&self) -> usize {
        self.catalog_queries.load(Ordering::Relaxed)
    }

    /// Load `source` into the table named after its base name.
    ///
    /// Empty files and files without a matching table return a report with
    /// `Ignored=TRUE` and run nothing.
    pub async fn import(&self, source: &Path) -> Result<StatusReport> {
        let start = Instant::now();
        let exec = &self.executor;
        let cfg = exec.settings();
        let op = Operation::Import {
            source: source.to_path_buf(),
        };

        if let Preflight::Skip(reason) = exec.preflight().check(&op, cfg)? {
            return Ok(skipped(source, reason, start));
        }
        let tables = self.tables().await?;
        if let Preflight::Skip(reason) = exec.preflight().check_table(source, tables) {
            info!(file = ?source, reason = %reason, "import skipped");
            return Ok(skipped(source, reason, start));
        }

        let cmd = CommandBuilder::new(exec.config()).import(cfg, source)?;
        let mut collector = StatusCollector::new(StatusParser::for_tool(Tool::MysqlImport));
        exec.run_checked(&cmd, &mut collector).await?;

        let mut report = collector.into_report();
        report.insert("Duration", start.elapsed().as_millis());
        Ok(report)
    }
}

fn skipped(source: &Path, reason: String, start: Instant) -> StatusReport {
    let mut report = StatusReport::new();
    report.insert("Source", source.display());
    report.insert("Duration", start.elapsed().as_millis());
    report.mark_ignored(reason);
    report
}
