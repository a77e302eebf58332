// src/operation.rs

//! The fixed family of external actions the framework knows how to run.

use std::fmt;
use std::path::PathBuf;

/// One external action. Exactly one variant is active per invocation and it
/// is consumed by that invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Run a SQL statement through the SQL client.
    Query { sql: String },

    /// Run a `SELECT` and write its output to `destination`.
    Export { sql: String, destination: PathBuf },

    /// Bulk-load a data file into the table named after its base name.
    Import { source: PathBuf },

    /// Expand a zip archive. Without `dest_dir` a fresh directory is created
    /// under the scratch root.
    ArchiveExtract {
        archive: PathBuf,
        dest_dir: Option<PathBuf>,
    },

    /// Pack the regular files of `source_dir` into a zip archive. Without
    /// `destination` the archive is kept under the scratch root.
    ArchiveCreate {
        source_dir: PathBuf,
        destination: Option<PathBuf>,
    },

    /// Retrieve a remote file into `dest_dir` (or a fresh scratch directory).
    Fetch {
        url: String,
        dest_dir: Option<PathBuf>,
        overwrite: bool,
    },

    /// Convert a dBase III `.dbf` file into a colon-delimited `.dat` file
    /// next to it.
    Convert { source: PathBuf },
}

impl Operation {
    /// Short name used in logs and status reports.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Query { .. } => "query",
            Operation::Export { .. } => "export",
            Operation::Import { .. } => "import",
            Operation::ArchiveExtract { .. } => "extract",
            Operation::ArchiveCreate { .. } => "archive",
            Operation::Fetch { .. } => "fetch",
            Operation::Convert { .. } => "convert",
        }
    }

    /// The wrapped tool, or `None` for operations done in-process.
    pub fn tool(&self) -> Option<Tool> {
        match self {
            Operation::Query { .. } | Operation::Export { .. } => Some(Tool::Mysql),
            Operation::Import { .. } => Some(Tool::MysqlImport),
            Operation::Fetch { .. } => Some(Tool::Wget),
            Operation::Convert { .. } => Some(Tool::DbView),
            Operation::ArchiveExtract { .. } | Operation::ArchiveCreate { .. } => None,
        }
    }

    /// ConfigSet keys that must be present and non-empty.
    pub fn required_keys(&self) -> &'static [&'static str] {
        match self {
            Operation::Query { .. } | Operation::Export { .. } | Operation::Import { .. } => {
                DATABASE_KEYS
            }
            _ => &[],
        }
    }
}

/// Connection settings needed by every database operation.
pub const DATABASE_KEYS: &[&str] = &["mysql.database", "mysql.host", "mysql.user", "mysql.pass"];

/// External programs wrapped by the framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tool {
    Mysql,
    MysqlImport,
    Wget,
    DbView,
}

impl Tool {
    pub const ALL: [Tool; 4] = [Tool::Mysql, Tool::MysqlImport, Tool::Wget, Tool::DbView];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tool::Mysql => "mysql",
            Tool::MysqlImport => "mysqlimport",
            Tool::Wget => "wget",
            Tool::DbView => "dbview",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
