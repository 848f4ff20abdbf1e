//! Date coercion and time-window filtering.

use chrono::{Duration, Local, NaiveDate};
use serde::Serialize;

use crate::error::{DashboardError, Result};
use crate::types::{Column, ColumnKind, Dataset, Value};

/// Column every window filter reads.
pub const DATE_COLUMN: &str = "Date";

/// Reinterpret `column` as dates. Unparsable cells become null.
pub fn coerce_dates(dataset: Dataset, column: &str) -> Result<Dataset> {
    let source = dataset.column(column)?;
    if source.kind == ColumnKind::Date {
        return Ok(dataset);
    }
    let values: Vec<Value> = source
        .values
        .iter()
        .map(|v| v.as_date().map_or(Value::Null, Value::Date))
        .collect();
    let parsed = values.iter().filter(|v| !v.is_null()).count();
    let unparsable = source.non_null_count().saturating_sub(parsed);
    tracing::debug!(column, unparsable, "coerced column to dates");
    dataset.with_column(Column::new(column, ColumnKind::Date, values))
}

/// Parsed dates of the window column, `None` where missing or unparsable.
pub fn dates_of(dataset: &Dataset) -> Result<Vec<Option<NaiveDate>>> {
    Ok(dataset
        .column(DATE_COLUMN)?
        .values
        .iter()
        .map(Value::as_date)
        .collect())
}

/// Rows dated within the last `n` days, today included.
///
/// "Today" is read when the call is made.
pub fn last_n_days(dataset: &Dataset, n: u32) -> Result<Dataset> {
    last_n_days_as_of(dataset, n, Local::now().date_naive())
}

pub fn last_n_days_as_of(dataset: &Dataset, n: u32, today: NaiveDate) -> Result<Dataset> {
    let start = today
        .checked_sub_signed(Duration::days(i64::from(n)))
        .unwrap_or(NaiveDate::MIN);
    let filtered = filter_between(dataset, start, today)?;
    tracing::debug!(days = n, rows = filtered.height(), "applied trailing window");
    Ok(filtered)
}

/// Rows dated within `[start, end]`. A reversed range is rejected.
pub fn range_filter(dataset: &Dataset, start: NaiveDate, end: NaiveDate) -> Result<Dataset> {
    if start > end {
        return Err(DashboardError::InvalidRange { start, end });
    }
    filter_between(dataset, start, end)
}

fn filter_between(dataset: &Dataset, start: NaiveDate, end: NaiveDate) -> Result<Dataset> {
    let keep: Vec<bool> = dates_of(dataset)?
        .into_iter()
        .map(|d| d.is_some_and(|d| start <= d && d <= end))
        .collect();
    Ok(dataset.filter(&keep))
}

/// Earliest and latest valid date, if any.
pub fn date_bounds(dataset: &Dataset) -> Result<Option<(NaiveDate, NaiveDate)>> {
    let dates = dates_of(dataset)?;
    let mut valid = dates.into_iter().flatten();
    Ok(valid.next().map(|first| {
        valid.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d)))
    }))
}

/// Scope of an analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DateWindow {
    Trailing { days: u32 },
    Range { start: NaiveDate, end: NaiveDate },
}

impl DateWindow {
    pub fn apply(&self, dataset: &Dataset) -> Result<Dataset> {
        match *self {
            DateWindow::Trailing { days } => last_n_days(dataset, days),
            DateWindow::Range { start, end } => range_filter(dataset, start, end),
        }
    }

    /// Number of calendar days covered.
    pub fn span_days(&self) -> i64 {
        match *self {
            DateWindow::Trailing { days } => i64::from(days),
            DateWindow::Range { start, end } => (end - start).num_days() + 1,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            DateWindow::Trailing { days } => format!("Last {days} Days"),
            DateWindow::Range { start, end } => format!("{start} to {end}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn dated(cells: &[&str]) -> Dataset {
        let ids = (0..cells.len()).map(|i| format!("V{i}")).collect();
        Dataset::new(vec![
            Column::infer("Violation_ID", ids),
            Column::infer(DATE_COLUMN, cells.iter().map(|s| s.to_string()).collect()),
        ])
        .unwrap()
    }

    #[test]
    fn test_coerce_dates_nulls_garbage() {
        let ds = coerce_dates(dated(&["2024-01-05", "garbage", ""]), DATE_COLUMN).unwrap();
        let col = ds.column(DATE_COLUMN).unwrap();
        assert_eq!(col.kind, ColumnKind::Date);
        assert_eq!(col.values, vec![Value::Date(d(2024, 1, 5)), Value::Null, Value::Null]);
    }

    #[test]
    fn test_coerce_dates_missing_column() {
        let ds = Dataset::new(vec![Column::infer("x", vec!["1".into()])]).unwrap();
        assert!(matches!(
            coerce_dates(ds, DATE_COLUMN),
            Err(DashboardError::ColumnNotFound { .. })
        ));
    }

    #[test]
    fn test_trailing_window_inclusive() {
        let today = d(2024, 6, 30);
        let ds = dated(&["2024-06-30", "2024-05-31", "2024-05-30", "2024-07-01", "bad"]);
        let out = last_n_days_as_of(&ds, 30, today).unwrap();
        let ids: Vec<String> = out
            .column("Violation_ID")
            .unwrap()
            .values
            .iter()
            .map(|v| v.to_string())
            .collect();
        assert_eq!(ids, vec!["V0", "V1"]);
    }

    #[test]
    fn test_trailing_window_never_grows() {
        let ds = dated(&["2020-01-01", "2024-06-01", "2024-06-15"]);
        for n in [7, 30, 365] {
            let out = last_n_days_as_of(&ds, n, d(2024, 6, 20)).unwrap();
            assert!(out.height() <= ds.height());
        }
    }

    #[test]
    fn test_trailing_window_longer_than_calendar() {
        let ds = dated(&["0001-01-01", "2024-05-31", "2024-06-02"]);
        let out = last_n_days_as_of(&ds, u32::MAX, d(2024, 6, 1)).unwrap();
        assert_eq!(out.height(), 2);
    }

    #[test]
    fn test_range_filter_rejects_reversed() {
        let ds = dated(&["2024-01-01"]);
        let err = range_filter(&ds, d(2024, 2, 1), d(2024, 1, 1)).unwrap_err();
        assert!(matches!(err, DashboardError::InvalidRange { .. }));
    }

    #[test]
    fn test_range_filter_single_day() {
        let ds = dated(&["2024-01-01", "2024-01-02", "2024-01-02 23:59:00", "2024-01-03"]);
        let out = range_filter(&ds, d(2024, 1, 2), d(2024, 1, 2)).unwrap();
        assert_eq!(out.height(), 2);
    }

    #[test]
    fn test_date_bounds() {
        let ds = dated(&["2024-03-01", "junk", "2023-12-31", "2024-01-15"]);
        assert_eq!(date_bounds(&ds).unwrap(), Some((d(2023, 12, 31), d(2024, 3, 1))));
        assert_eq!(date_bounds(&dated(&["junk"])).unwrap(), None);
    }

    #[test]
    fn test_window_span() {
        assert_eq!(DateWindow::Trailing { days: 30 }.span_days(), 30);
        let range = DateWindow::Range {
            start: d(2024, 1, 1),
            end: d(2024, 1, 31),
        };
        assert_eq!(range.span_days(), 31);
    }
}
