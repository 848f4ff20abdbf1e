//! Export and console preview of report artifacts.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tabled::{builder::Builder, settings::Style, Table, Tabled};

use crate::aggregate::WideTable;
use crate::error::{DashboardError, Result};
use crate::util::format_number;

/// Create `dir` (and parents) if missing.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| DashboardError::io(dir, e))
}

/// Wide table as CSV: the index column, then one column per split value.
pub fn write_wide_csv(path: &Path, table: &WideTable) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path).map_err(|e| DashboardError::io(path, e.into()))?;
    let header = std::iter::once(table.index_name.as_str())
        .chain(table.columns.iter().map(String::as_str));
    wtr.write_record(header)
        .map_err(|e| DashboardError::io(path, e.into()))?;
    for (row, values) in table.rows.iter().zip(&table.values) {
        let record = std::iter::once(row.clone()).chain(values.iter().map(|v| v.to_string()));
        wtr.write_record(record)
            .map_err(|e| DashboardError::io(path, e.into()))?;
    }
    wtr.flush().map_err(|e| DashboardError::io(path, e))
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value).map_err(|e| DashboardError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    std::fs::write(path, s).map_err(|e| DashboardError::io(path, e))
}

/// Write `value` as `<dir>/<name>.json` and return the path written.
pub fn export_json<T: Serialize>(dir: &Path, name: &str, value: &T) -> Result<PathBuf> {
    ensure_dir(dir)?;
    let path = dir.join(format!("{name}.json"));
    write_json(&path, value)?;
    tracing::debug!(path = %path.display(), "exported");
    Ok(path)
}

/// Markdown table of the first `max_rows` rows, or `(no rows)`.
pub fn render_rows<T>(rows: &[T], max_rows: usize) -> String
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        return "(no rows)".to_string();
    }
    Table::new(slice).with(Style::markdown()).to_string()
}

pub fn preview_table<T>(title: &str, note: Option<&str>, rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    println!("\n{}", title);
    if let Some(n) = note {
        println!("({})", n);
    }
    println!();
    println!("{}\n", render_rows(rows, max_rows));
}

/// Markdown rendering of a wide table, values to `decimals` places.
pub fn render_wide_table(table: &WideTable, decimals: usize) -> String {
    if table.is_empty() {
        return "(no rows)".to_string();
    }
    let mut builder = Builder::default();
    builder.push_record(
        std::iter::once(table.index_name.clone()).chain(table.columns.iter().cloned()),
    );
    for (row, values) in table.rows.iter().zip(&table.values) {
        builder.push_record(
            std::iter::once(row.clone()).chain(values.iter().map(|v| format_number(*v, decimals))),
        );
    }
    builder.build().with(Style::markdown()).to_string()
}
