// tests/config_loading.rs

mod common;
use crate::common::init_tracing;

use std::error::Error;
use std::io::Write;

use tempfile::NamedTempFile;

use etlexec::config::{ExecConfig, load_and_validate};
use etlexec::errors::{ErrorKind, ExecError};
use etlexec::exec::ExitStatusTranslator;
use etlexec::operation::Tool;
use etlexec::types::RunnerMode;

type TestResult = Result<(), Box<dyn Error>>;

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[test]
fn full_file_is_loaded() -> TestResult {
    init_tracing();

    let file = config_file(
        r#"
[programs]
wget = "/opt/wget/bin/wget"

[runner]
mode = "shell"
output_tail_lines = 10

[fetch]
timeout_secs = 30
tries = 3
read_timeout_secs = 20

[scratch]
root = "/var/tmp/etl"

[exit_codes]
dbview = [0, 1]

[settings]
"mysql.host" = "db1"
"mysql.force" = true
"mysql.ignore-lines" = 1
"#,
    );

    let cfg = load_and_validate(file.path())?;
    assert_eq!(cfg.programs.wget, "/opt/wget/bin/wget");
    assert_eq!(cfg.programs.mysql, "/usr/bin/mysql");
    assert_eq!(cfg.runner.mode, RunnerMode::Shell);
    assert_eq!(cfg.runner.output_tail_lines, 10);
    assert_eq!(cfg.fetch.tries, 3);
    assert_eq!(cfg.fetch.max_redirects, 2);
    assert_eq!(cfg.fetch.read_timeout_secs, Some(20));
    assert_eq!(cfg.scratch_root.to_str(), Some("/var/tmp/etl"));
    assert_eq!(cfg.settings.get("mysql.host"), Some("db1"));
    assert!(cfg.settings.is_truthy("mysql.force"));
    assert_eq!(cfg.settings.get("mysql.ignore-lines"), Some("1"));

    let translator = ExitStatusTranslator::new(cfg.exit_codes.clone());
    assert!(translator.translate(Tool::DbView, 0).is_success());
    Ok(())
}

#[test]
fn empty_file_gives_defaults() -> TestResult {
    let file = config_file("");
    let cfg = load_and_validate(file.path())?;
    let defaults = ExecConfig::default();
    assert_eq!(cfg.programs, defaults.programs);
    assert_eq!(cfg.fetch, defaults.fetch);
    assert_eq!(cfg.runner.mode, RunnerMode::Argv);
    assert!(cfg.settings.is_empty());
    Ok(())
}

#[test]
fn zero_tries_is_rejected() {
    let file = config_file("[fetch]\ntries = 0\n");
    let err = load_and_validate(file.path()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn unknown_tool_in_exit_codes_is_rejected() {
    let file = config_file("[exit_codes]\ncurl = [0]\n");
    match load_and_validate(file.path()) {
        Err(ExecError::ConfigError(msg)) => assert!(msg.contains("curl")),
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn table_valued_setting_is_rejected() {
    let file = config_file("[settings]\nmysql = { host = \"db1\" }\n");
    assert!(matches!(
        load_and_validate(file.path()),
        Err(ExecError::ConfigError(_))
    ));
}

#[test]
fn malformed_toml_is_a_toml_error() {
    let file = config_file("[runner\nmode = ");
    let err = load_and_validate(file.path()).unwrap_err();
    assert!(matches!(err, ExecError::TomlError(_)));
    assert_eq!(err.kind(), ErrorKind::Configuration);
}
