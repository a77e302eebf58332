// src/command/quote.rs

//! Shell quoting and SQL text normalisation.

use std::path::Path;

/// Quote a string for safe use as one word of a POSIX shell command.
///
/// Strings made only of safe characters are returned as-is. Everything else
/// is wrapped in single quotes, with embedded single quotes written as
/// `'\''`. Inside single quotes the shell performs no expansion at all, so the
/// result always parses back to exactly `s`.
pub fn shell_quote(s: &str) -> String {
    if s.is_empty() {
        return "''".to_string();
    }
    if s.chars().all(is_safe_char) {
        return s.to_string();
    }
    format!("'{}'", s.replace('\'', "'\\''"))
}

fn is_safe_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '/' | '.' | '-' | '_' | '=' | ':' | ',' | '+' | '@' | '%')
}

/// Collapse multi-line SQL into a single line.
pub fn flatten_sql(sql: &str) -> String {
    sql.replace("\r\n", " ").replace(['\n', '\r'], " ")
}

/// Flatten `sql` and make sure it ends with exactly the terminator the user
/// wrote, or a single `;` if there was none.
pub fn terminate_sql(sql: &str) -> String {
    let flat = flatten_sql(sql);
    let trimmed = flat.trim();
    if trimmed.ends_with(';') {
        trimmed.to_string()
    } else {
        format!("{trimmed};")
    }
}

/// Render a path as a positional argument that can never be mistaken for an
/// option by the wrapped program.
pub fn positional_path(path: &Path) -> String {
    let s = path.to_string_lossy();
    if s.starts_with('-') {
        format!("./{s}")
    } else {
        s.into_owned()
    }
}
