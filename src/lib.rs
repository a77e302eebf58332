// src/lib.rs

pub mod cli;
pub mod command;
pub mod config;
pub mod errors;
pub mod exec;
pub mod executor;
pub mod fs;
pub mod logging;
pub mod operation;
pub mod preflight;
pub mod transfer;
pub mod types;

use anyhow::{Result, bail};
use tracing::{debug, info};

use crate::cli::{CliArgs, Command};
use crate::command::builder::redact_url;
use crate::config::loader::load_or_default;
use crate::exec::{ProcessRunner, StatusReport};
use crate::executor::Executor;
use crate::operation::Operation;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and `--set` overrides
/// - the executor with the real process runner
/// - the selected subcommand, with reports printed on stdout
pub async fn run(args: CliArgs) -> Result<()> {
    let mut config = load_or_default(&args.config)?;
    for (key, value) in &args.settings {
        config.settings.set(key.as_str(), value.as_str());
    }
    debug!(settings = config.settings.len(), "configuration loaded");

    let executor = Executor::from_config(config);

    if args.dry_run {
        print_dry_run(&executor, &args.command)?;
        return Ok(());
    }

    match args.command {
        Command::Query { sql } => {
            let output = executor.query(&sql).await?;
            for row in &output.rows {
                println!("{row}");
            }
            debug!(report = %output.report, "query finished");
        }
        Command::Import { files } => {
            let session = executor.import_session();
            for file in files {
                let report = session.import(&file).await?;
                print_report(&file.display().to_string(), &report);
            }
        }
        Command::Fetch {
            urls,
            dest,
            overwrite,
        } => {
            let total = urls.len();
            let results = executor.fetch_all(urls, dest, overwrite).await;
            let mut failed = 0usize;
            for (url, result) in results {
                match result {
                    Ok(report) => print_report(&redact_url(&url), &report),
                    Err(err) => {
                        eprintln!("{}: {err}", redact_url(&url));
                        failed += 1;
                    }
                }
            }
            if failed > 0 {
                bail!("{failed} of {total} fetches failed");
            }
        }
        command => {
            for op in operations(&command) {
                let label = op.name();
                let report = executor.execute(op).await?;
                print_report(label, &report);
            }
        }
    }

    info!("done");
    Ok(())
}

/// The operations a subcommand stands for, in execution order.
pub fn operations(command: &Command) -> Vec<Operation> {
    match command {
        Command::Query { sql } => vec![Operation::Query { sql: sql.clone() }],
        Command::Export { output, sql } => vec![Operation::Export {
            sql: sql.clone(),
            destination: output.clone(),
        }],
        Command::Import { files } => files
            .iter()
            .map(|f| Operation::Import { source: f.clone() })
            .collect(),
        Command::Extract { archive, dest } => vec![Operation::ArchiveExtract {
            archive: archive.clone(),
            dest_dir: dest.clone(),
        }],
        Command::Archive { source_dir, output } => vec![Operation::ArchiveCreate {
            source_dir: source_dir.clone(),
            destination: output.clone(),
        }],
        Command::Fetch {
            urls,
            dest,
            overwrite,
        } => urls
            .iter()
            .map(|url| Operation::Fetch {
                url: url.clone(),
                dest_dir: dest.clone(),
                overwrite: *overwrite,
            })
            .collect(),
        Command::Convert { files } => files
            .iter()
            .map(|f| Operation::Convert { source: f.clone() })
            .collect(),
    }
}

/// `[label]` followed by `key=value` lines.
fn print_report(label: &str, report: &StatusReport) {
    println!("[{label}]");
    print!("{report}");
}

/// Print what would run. Credentials are masked.
fn print_dry_run<R: ProcessRunner + 'static>(executor: &Executor<R>, command: &Command) -> Result<()> {
    println!("etlexec dry-run");
    println!("  runner.mode = {:?}", executor.config().runner.mode);
    println!();

    for op in operations(command) {
        match executor.plan(&op)? {
            Some(cmd) => println!("{}: {cmd}", op.name()),
            None => println!("{}: (in-process) {op:?}", op.name()),
        }
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}
