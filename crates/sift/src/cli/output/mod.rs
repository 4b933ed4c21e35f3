//! Terminal styling and JSON serialization for CLI output.

use std::process::ExitCode;

use comfy_table::{Cell, Table, presets::UTF8_FULL_CONDENSED};
use serde::Serialize;
use serde_json::Value;
use sift_index::Record;
use sift_query::Diagnostic;

/// ANSI escape sequences.
mod colors {
    /// Bold text.
    pub const BOLD: &str = "\x1b[1m";
    /// Cyan text (for headers).
    pub const CYAN: &str = "\x1b[36m";
    /// Yellow text (for warnings).
    pub const YELLOW: &str = "\x1b[33m";
    /// Dim/gray text (for less important info).
    pub const DIM: &str = "\x1b[2m";
    /// Reset all formatting.
    pub const RESET: &str = "\x1b[0m";
}

/// Formats a header with bold cyan styling.
pub fn header(text: &str) -> String {
    format!("{}{}{}{}", colors::BOLD, colors::CYAN, text, colors::RESET)
}

/// Formats text as a subheader (bold).
pub fn subheader(text: &str) -> String {
    format!("{}{}{}", colors::BOLD, text, colors::RESET)
}

/// Formats text as dimmed/less important.
pub fn dim(text: &str) -> String {
    format!("{}{}{}", colors::DIM, text, colors::RESET)
}

/// Formats text as a warning (yellow).
pub fn warning(text: &str) -> String {
    format!("{}{}{}", colors::YELLOW, text, colors::RESET)
}

/// Indents every line of `text` by three spaces.
pub fn indent(text: &str) -> String {
    text.lines()
        .map(|line| format!("   {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prints `value` as pretty JSON.
pub fn print_json<T: Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: failed to serialize JSON: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Prints tolerated input problems after the main output.
pub fn print_diagnostics(diagnostics: &[Diagnostic]) {
    if diagnostics.is_empty() {
        return;
    }
    println!();
    println!(
        "{}",
        subheader(&format!("Ignored input ({}):", diagnostics.len()))
    );
    for d in diagnostics {
        let location = d.param.as_deref().unwrap_or("-");
        println!(
            "   {} {}",
            warning(&format!("{location}: {:?}", d.input)),
            dim(&d.message)
        );
    }
}

/// Renders a stored value for a table cell.
fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(cell_text).collect::<Vec<_>>().join(", "),
        other => other.to_string(),
    }
}

/// Renders records as a table whose columns are the union of their keys.
pub fn records_table(records: &[Record]) -> Table {
    let mut columns: Vec<&str> = Vec::new();
    for record in records {
        for key in record.keys() {
            if !columns.contains(&key.as_str()) {
                columns.push(key);
            }
        }
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(columns.iter().map(|c| Cell::new(c)).collect::<Vec<_>>());
    for record in records {
        table.add_row(
            columns
                .iter()
                .map(|c| Cell::new(record.get(*c).map(cell_text).unwrap_or_default()))
                .collect::<Vec<_>>(),
        );
    }
    table
}

#[cfg(test)]
mod tests {
    use serde_json::{Map, json};

    use super::*;

    #[test]
    fn styles_wrap_text_in_reset() {
        assert_eq!(header("x"), "\x1b[1m\x1b[36mx\x1b[0m");
        assert!(warning("careful").ends_with(colors::RESET));
    }

    #[test]
    fn indent_prefixes_each_line() {
        assert_eq!(indent("a\nb"), "   a\n   b");
    }

    #[test]
    fn table_columns_cover_all_records() {
        let mut first = Map::new();
        first.insert("firstname".into(), json!("Abel"));
        let mut second = Map::new();
        second.insert("name".into(), json!("Zeus"));
        second.insert("tags".into(), json!(["dog", "oslo"]));
        let rendered = records_table(&[first, second]).to_string();
        assert!(rendered.contains("firstname"));
        assert!(rendered.contains("dog, oslo"));
    }
}
