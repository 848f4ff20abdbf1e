//! In-memory tabular model: typed values, columns and datasets.

use std::collections::HashSet;
use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;
use tabled::Tabled;

use crate::error::{DashboardError, Result};
use crate::util::{is_null_token, parse_date_safe, parse_f64_safe, parse_i64_safe};

/// A single cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view of the cell. Text is parsed leniently.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::Text(s) => parse_f64_safe(Some(s)),
            Value::Null | Value::Date(_) => None,
        }
    }

    /// Numeric view where anything unparsable counts as zero.
    pub fn as_f64_or_zero(&self) -> f64 {
        self.as_f64().unwrap_or(0.0)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            Value::Text(s) => parse_i64_safe(Some(s)),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            Value::Text(s) => parse_date_safe(Some(s)),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(s) => f.write_str(s),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

/// Storage kind of a column, decided once at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ColumnKind {
    Integer,
    Float,
    Text,
    Date,
}

impl ColumnKind {
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnKind::Integer | ColumnKind::Float)
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnKind::Integer => "integer",
            ColumnKind::Float => "float",
            ColumnKind::Text => "text",
            ColumnKind::Date => "date",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
    pub values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ColumnKind, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            kind,
            values,
        }
    }

    /// Build a column from raw CSV cells, inferring Integer, then Float,
    /// then Text. Null tokens never influence the inferred kind.
    pub fn infer(name: impl Into<String>, raw: Vec<String>) -> Self {
        let cells: Vec<Option<String>> = raw
            .into_iter()
            .map(|s| if is_null_token(&s) { None } else { Some(s) })
            .collect();

        let present = || cells.iter().flatten();
        let kind = if present().next().is_none() {
            ColumnKind::Float
        } else if present().all(|s| parse_i64_safe(Some(s)).is_some()) {
            ColumnKind::Integer
        } else if present().all(|s| parse_f64_safe(Some(s)).is_some()) {
            ColumnKind::Float
        } else {
            ColumnKind::Text
        };

        let values = cells
            .into_iter()
            .map(|cell| match cell {
                None => Value::Null,
                Some(s) => match kind {
                    ColumnKind::Integer => parse_i64_safe(Some(&s)).map_or(Value::Null, Value::Int),
                    ColumnKind::Float => parse_f64_safe(Some(&s)).map_or(Value::Null, Value::Float),
                    _ => Value::Text(s),
                },
            })
            .collect();

        Self::new(name, kind, values)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Distinct non-null values in first-encountered order.
    pub fn unique_non_null(&self) -> Vec<&Value> {
        let mut seen = HashSet::new();
        self.values
            .iter()
            .filter(|v| !v.is_null())
            .filter(|v| seen.insert(v.to_string()))
            .collect()
    }

    pub fn n_unique(&self) -> usize {
        self.unique_non_null().len()
    }

    pub fn non_null_count(&self) -> usize {
        self.values.iter().filter(|v| !v.is_null()).count()
    }
}

/// Column-major table. `Clone` is a deep copy; nothing inside is shared.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    columns: Vec<Column>,
    height: usize,
}

impl Dataset {
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let height = columns.first().map_or(0, Column::len);
        if let Some(bad) = columns.iter().find(|c| c.len() != height) {
            return Err(DashboardError::ShapeMismatch {
                column: bad.name.clone(),
                expected: height,
                found: bad.len(),
            });
        }
        Ok(Self { columns, height })
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.height == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Result<&Column> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| DashboardError::ColumnNotFound {
                column: name.to_string(),
            })
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    pub fn columns_of_kind(&self, kind: ColumnKind) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(move |c| c.kind == kind)
    }

    pub fn numeric_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.kind.is_numeric())
    }

    /// Rows where `keep` is true, as a new dataset.
    pub fn filter(&self, keep: &[bool]) -> Dataset {
        let columns = self
            .columns
            .iter()
            .map(|c| {
                let values = c
                    .values
                    .iter()
                    .zip(keep)
                    .filter(|(_, k)| **k)
                    .map(|(v, _)| v.clone())
                    .collect();
                Column::new(c.name.clone(), c.kind, values)
            })
            .collect();
        let height = keep.iter().take(self.height).filter(|k| **k).count();
        Dataset { columns, height }
    }

    /// Replace the column with the same name, or append it.
    pub fn with_column(mut self, column: Column) -> Result<Dataset> {
        if !self.columns.is_empty() && column.len() != self.height {
            let found = column.len();
            return Err(DashboardError::ShapeMismatch {
                column: column.name,
                expected: self.height,
                found,
            });
        }
        if self.columns.is_empty() {
            self.height = column.len();
        }
        match self.columns.iter_mut().find(|c| c.name == column.name) {
            Some(slot) => *slot = column,
            None => self.columns.push(column),
        }
        Ok(self)
    }
}

// --- Report rows (markdown previews) ---

#[derive(Debug, Clone, Serialize, Tabled)]
pub struct MetricRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

impl MetricRow {
    pub fn new(metric: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            metric: metric.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Tabled)]
pub struct ColumnOverviewRow {
    #[tabled(rename = "Field")]
    pub field: String,
    #[tabled(rename = "Data Type")]
    pub kind: ColumnKind,
    #[tabled(rename = "Count")]
    pub non_null: usize,
    #[tabled(rename = "Unique")]
    pub unique: usize,
    #[tabled(rename = "Min", display_with = "display_opt")]
    pub min: Option<f64>,
    #[tabled(rename = "Mean", display_with = "display_opt")]
    pub mean: Option<f64>,
    #[tabled(rename = "Max", display_with = "display_opt")]
    pub max: Option<f64>,
}

fn display_opt(v: &Option<f64>) -> String {
    v.map(|x| crate::util::format_number(x, 2)).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_infer_kinds() {
        assert_eq!(Column::infer("a", raw(&["1", "2", ""])).kind, ColumnKind::Integer);
        assert_eq!(Column::infer("b", raw(&["1", "2.5", "NA"])).kind, ColumnKind::Float);
        assert_eq!(Column::infer("c", raw(&["YES", "NO"])).kind, ColumnKind::Text);
        assert_eq!(Column::infer("d", raw(&["2024-01-01"])).kind, ColumnKind::Text);
        assert_eq!(Column::infer("e", raw(&["", "NaN"])).kind, ColumnKind::Float);
    }

    #[test]
    fn test_infer_nulls() {
        let col = Column::infer("a", raw(&["1", "", "null"]));
        assert_eq!(col.values, vec![Value::Int(1), Value::Null, Value::Null]);
        assert_eq!(col.non_null_count(), 1);
    }

    #[test]
    fn test_unique_first_encountered_order() {
        let col = Column::infer("s", raw(&["Goa", "Kerala", "Goa", "", "Assam"]));
        let uniq: Vec<String> = col.unique_non_null().iter().map(|v| v.to_string()).collect();
        assert_eq!(uniq, vec!["Goa", "Kerala", "Assam"]);
    }

    #[test]
    fn test_new_rejects_ragged_columns() {
        let result = Dataset::new(vec![
            Column::infer("a", raw(&["1", "2"])),
            Column::infer("b", raw(&["1"])),
        ]);
        assert!(matches!(result, Err(DashboardError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_filter_and_with_column() {
        let ds = Dataset::new(vec![Column::infer("a", raw(&["1", "2", "3"]))]).unwrap();
        let kept = ds.filter(&[true, false, true]);
        assert_eq!(kept.height(), 2);
        assert_eq!(ds.height(), 3);

        let kept = kept
            .with_column(Column::new(
                "b",
                ColumnKind::Text,
                vec![Value::Text("x".into()), Value::Text("y".into())],
            ))
            .unwrap();
        assert_eq!(kept.width(), 2);
        assert!(kept.clone().with_column(Column::new("c", ColumnKind::Text, vec![])).is_err());
    }

    #[test]
    fn test_with_column_reports_length_mismatch() {
        let ds = Dataset::new(vec![Column::infer("a", raw(&["1", "2", "3"]))]).unwrap();
        let short = Column::infer("b", raw(&["x"]));
        match ds.with_column(short) {
            Err(DashboardError::ShapeMismatch { column, expected, found }) => {
                assert_eq!(column, "b");
                assert_eq!(expected, 3);
                assert_eq!(found, 1);
            }
            other => panic!("expected shape mismatch, got {other:?}"),
        }
    }
}
