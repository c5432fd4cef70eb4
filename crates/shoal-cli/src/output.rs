// crates/shoal-cli/src/output.rs
//
// Output formatting utilities for the Shoal CLI.
// Supports table and JSON output modes.

use serde::Serialize;
use tabled::{Table, Tabled};

use shoal_economics::Ether;

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Pretty-printed table output (default).
    Table,
    /// JSON output for machine consumption.
    Json,
}

impl OutputFormat {
    pub fn from_flag(json: bool) -> Self {
        if json {
            OutputFormat::Json
        } else {
            OutputFormat::Table
        }
    }
}

/// Format a slice of Tabled items as a table string.
pub fn format_table<T: Tabled>(data: &[T]) -> String {
    Table::new(data).to_string()
}

/// Format a serializable value as a pretty-printed JSON string.
pub fn format_json<T: Serialize>(data: &T) -> String {
    serde_json::to_string_pretty(data).unwrap_or_else(|e| format!("JSON serialization error: {}", e))
}

/// Print rows as a table, or the JSON value as-is.
pub fn emit<T: Tabled, J: Serialize>(format: OutputFormat, rows: &[T], json: &J) {
    match format {
        OutputFormat::Table => println!("{}", format_table(rows)),
        OutputFormat::Json => println!("{}", format_json(json)),
    }
}

/// Render a wei amount as ETH.
pub fn eth(wei: u128) -> String {
    format!("{} ETH", Ether::from_wei(wei))
}

/// One `field | value` row of a key-value table.
#[derive(Debug, Tabled)]
pub struct FieldRow {
    #[tabled(rename = "Field")]
    pub field: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

impl FieldRow {
    pub fn new(field: &str, value: impl ToString) -> Self {
        Self {
            field: field.to_string(),
            value: value.to_string(),
        }
    }
}
