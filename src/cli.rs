// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::ConfigSet;

/// Command-line arguments for `etlexec`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "etlexec",
    version,
    about = "Run database, archive and retrieval tools with checked exits and atomic output.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Etlexec.toml` in the current working directory. A missing
    /// default file means built-in defaults.
    #[arg(long, value_name = "PATH", default_value = "Etlexec.toml", global = true)]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ETLEXEC_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    /// Set or override a setting, e.g. `--set mysql.host=db1`. Repeatable;
    /// later values win.
    #[arg(
        long = "set",
        value_name = "KEY=VALUE",
        value_parser = ConfigSet::parse_assignment,
        global = true
    )]
    pub settings: Vec<(String, String)>,

    /// Print the (redacted) command lines instead of running them.
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run a SQL statement and print its output rows.
    Query {
        sql: String,
    },

    /// Write the output of a SELECT to a file.
    Export {
        /// Destination file.
        #[arg(long, short = 'o', value_name = "FILE")]
        output: PathBuf,
        sql: String,
    },

    /// Bulk-load data files, each into the table named after it.
    Import {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Expand a zip archive.
    Extract {
        archive: PathBuf,
        /// Target directory; a fresh temporary directory when omitted.
        #[arg(long, short = 'd', value_name = "DIR")]
        dest: Option<PathBuf>,
    },

    /// Pack the files of a directory into a zip archive.
    Archive {
        source_dir: PathBuf,
        #[arg(long, short = 'o', value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Download one or more URLs concurrently.
    Fetch {
        #[arg(required = true)]
        urls: Vec<String>,
        /// Target directory; a fresh temporary directory per URL when omitted.
        #[arg(long, short = 'd', value_name = "DIR")]
        dest: Option<PathBuf>,
        /// Replace files that already exist.
        #[arg(long)]
        overwrite: bool,
    },

    /// Convert dBase (.dbf) files to colon-delimited `.dat` files.
    Convert {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
