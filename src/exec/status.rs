// src/exec/status.rs

//! Status metrics extracted from a wrapped program's output.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::exec::backend::LineObserver;
use crate::operation::Tool;

/// Key set on reports of operations that were intentionally skipped.
pub const IGNORED: &str = "Ignored";

/// Key carrying the reason for a skip.
pub const REASON: &str = "Reason";

/// Metric name → value, owned by the invocation that produced it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusReport {
    entries: BTreeMap<String, String>,
}

impl StatusReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a metric; a later value for the same key replaces the earlier one.
    pub fn insert(&mut self, key: impl Into<String>, value: impl ToString) {
        self.entries.insert(key.into(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Mark this report as belonging to a skipped (not failed) operation.
    pub fn mark_ignored(&mut self, reason: impl Into<String>) {
        self.insert(IGNORED, "TRUE");
        self.insert(REASON, reason.into());
    }

    pub fn is_ignored(&self) -> bool {
        self.get(IGNORED).is_some_and(|v| v.eq_ignore_ascii_case("true"))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (k, v) in self.entries.iter() {
            writeln!(f, "{k}={v}")?;
        }
        Ok(())
    }
}

/// `word: number`, at line start or after whitespace.
static METRIC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|\s)(\w+): +(\d+)\b").expect("metric pattern is valid")
});

/// Line-local extraction of `word: number` metrics.
///
/// When `label_key` is set and the line starts with a `label:` field ahead of
/// its first metric, the label is recorded under that key as well (mysqlimport
/// prints `db.table: Records: 21  Deleted: 0 ...`).
#[derive(Debug, Clone, Default)]
pub struct StatusParser {
    label_key: Option<String>,
}

impl StatusParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_label(label_key: impl Into<String>) -> Self {
        Self {
            label_key: Some(label_key.into()),
        }
    }

    /// Parser matching the output grammar of `tool`.
    pub fn for_tool(tool: Tool) -> Self {
        match tool {
            Tool::MysqlImport => Self::with_label("Table"),
            Tool::Mysql | Tool::Wget | Tool::DbView => Self::new(),
        }
    }

    /// All metric pairs found in `line`, in order of appearance.
    pub fn parse_line(&self, line: &str) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        let mut first_start = None;

        for caps in METRIC_RE.captures_iter(line) {
            if first_start.is_none() {
                first_start = caps.get(0).map(|m| m.start());
            }
            pairs.push((caps[1].to_string(), caps[2].to_string()));
        }

        if let (Some(key), Some(start)) = (self.label_key.as_ref(), first_start) {
            if let Some(colon) = line.find(':') {
                let label = line[..colon].trim();
                if colon < start && !label.is_empty() {
                    pairs.insert(0, (key.clone(), label.to_string()));
                }
            }
        }

        pairs
    }

    /// Parse `line` into `report`. Returns how many values were written.
    pub fn apply(&self, line: &str, report: &mut StatusReport) -> usize {
        let pairs = self.parse_line(line);
        if pairs.is_empty() {
            debug!(line, "no status metrics in line");
        }
        let n = pairs.len();
        for (k, v) in pairs {
            report.insert(k, v);
        }
        n
    }
}

/// Feeds every stdout line through a parser into an owned report.
#[derive(Debug, Clone, Default)]
pub struct StatusCollector {
    parser: StatusParser,
    report: StatusReport,
}

impl StatusCollector {
    pub fn new(parser: StatusParser) -> Self {
        Self {
            parser,
            report: StatusReport::new(),
        }
    }

    pub fn into_report(self) -> StatusReport {
        self.report
    }
}

impl LineObserver for StatusCollector {
    fn on_stdout(&mut self, line: &str) {
        self.parser.apply(line, &mut self.report);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mysqlimport_summary_line() {
        let parser = StatusParser::for_tool(Tool::MysqlImport);
        let mut report = StatusReport::new();
        let n = parser.apply(
            "fcc_uls.lo: Records: 21  Deleted: 0  Skipped: 0  Warnings: 326  Time: 6",
            &mut report,
        );

        assert_eq!(n, 6);
        assert_eq!(report.get("Table"), Some("fcc_uls.lo"));
        assert_eq!(report.get("Records"), Some("21"));
        assert_eq!(report.get("Deleted"), Some("0"));
        assert_eq!(report.get("Skipped"), Some("0"));
        assert_eq!(report.get("Warnings"), Some("326"));
        assert_eq!(report.get("Time"), Some("6"));
        assert_eq!(report.len(), 6);
    }

    #[test]
    fn later_lines_overwrite_earlier_metrics() {
        let parser = StatusParser::for_tool(Tool::MysqlImport);
        let mut report = StatusReport::new();
        parser.apply("db.a: Records: 1  Deleted: 0", &mut report);
        parser.apply("db.b: Records: 7  Deleted: 2", &mut report);
        assert_eq!(report.get("Table"), Some("db.b"));
        assert_eq!(report.get("Records"), Some("7"));
        assert_eq!(report.get("Deleted"), Some("2"));
    }

    #[test]
    fn unlabelled_metrics_do_not_become_labels() {
        let parser = StatusParser::with_label("Table");
        let pairs = parser.parse_line("Records: 3  Skipped: 1");
        assert_eq!(
            pairs,
            vec![
                ("Records".to_string(), "3".to_string()),
                ("Skipped".to_string(), "1".to_string())
            ]
        );
    }

    #[test]
    fn unparseable_lines_are_ignored() {
        let parser = StatusParser::for_tool(Tool::MysqlImport);
        let mut report = StatusReport::new();
        assert_eq!(parser.apply("mysqlimport: [Warning] Using a password", &mut report), 0);
        assert_eq!(parser.apply("", &mut report), 0);
        assert!(report.is_empty());
    }

    #[test]
    fn ignored_flag_round_trips() {
        let mut report = StatusReport::new();
        assert!(!report.is_ignored());
        report.mark_ignored("zero-length source file");
        assert!(report.is_ignored());
        assert_eq!(report.get(IGNORED), Some("TRUE"));
        assert_eq!(report.to_string(), "Ignored=TRUE\nReason=zero-length source file\n");
    }
}
