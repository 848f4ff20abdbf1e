//! Grouping, pivoting and summary statistics over a [`Dataset`].
//!
//! Every function borrows its input and returns a freshly built result;
//! nothing here mutates a dataset in place.
//!
//! Group keys keep their natural order: numbers and dates numerically,
//! text lexically, months and weekdays in calendar order.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::error::{DashboardError, Result};
use crate::temporal::dates_of;
use crate::types::{ColumnKind, ColumnOverviewRow, Dataset, Value};
use crate::util::{average, median, ratio};

pub const MONTH_NAMES: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];

const WEEKDAY_NAMES: [&str; 7] = [
    "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday",
];

/// Calendar bucket derived from the `Date` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TimeBucket {
    Year,
    /// Month name, ignoring the year.
    Month,
    /// `YYYY-MM` period.
    YearMonth,
    DayOfWeek,
}

impl TimeBucket {
    pub fn name(self) -> &'static str {
        match self {
            TimeBucket::Year => "Year",
            TimeBucket::Month => "Month",
            TimeBucket::YearMonth => "Year_Month",
            TimeBucket::DayOfWeek => "DayOfWeek",
        }
    }

    fn key(self, date: NaiveDate) -> GroupKey {
        match self {
            TimeBucket::Year => GroupKey::new(i64::from(date.year()), date.year().to_string()),
            TimeBucket::Month => {
                let m = date.month0() as usize;
                GroupKey::new(m as i64, MONTH_NAMES[m])
            }
            TimeBucket::YearMonth => GroupKey::new(
                i64::from(date.year()) * 12 + i64::from(date.month0()),
                format!("{:04}-{:02}", date.year(), date.month()),
            ),
            TimeBucket::DayOfWeek => {
                let d = date.weekday().num_days_from_monday() as usize;
                GroupKey::new(d as i64, WEEKDAY_NAMES[d])
            }
        }
    }
}

/// What rows are grouped by: a column as-is, or a bucket of the date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension<'a> {
    Column(&'a str),
    Time(TimeBucket),
}

impl Dimension<'_> {
    pub fn name(&self) -> &str {
        match self {
            Dimension::Column(c) => c,
            Dimension::Time(b) => b.name(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct GroupKey {
    rank: i64,
    label: String,
}

impl GroupKey {
    fn new(rank: i64, label: impl Into<String>) -> Self {
        Self {
            rank,
            label: label.into(),
        }
    }

    fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Int(v) => Some(Self::new(*v, v.to_string())),
            Value::Float(v) => Some(Self::new(float_rank(*v), v.to_string())),
            Value::Text(s) => Some(Self::new(0, s.as_str())),
            Value::Date(d) => Some(Self::new(i64::from(d.num_days_from_ce()), value.to_string())),
        }
    }
}

/// Order-preserving map from f64 to i64.
fn float_rank(v: f64) -> i64 {
    let bits = v.to_bits() as i64;
    if bits < 0 {
        bits ^ i64::MAX
    } else {
        bits
    }
}

fn keys_for(dataset: &Dataset, dim: Dimension<'_>) -> Result<Vec<Option<GroupKey>>> {
    match dim {
        Dimension::Column(name) => Ok(dataset
            .column(name)?
            .values
            .iter()
            .map(GroupKey::of)
            .collect()),
        Dimension::Time(bucket) => Ok(dates_of(dataset)?
            .into_iter()
            .map(|d| d.map(|d| bucket.key(d)))
            .collect()),
    }
}

fn measure_values(dataset: &Dataset, measure: &str) -> Result<Vec<f64>> {
    Ok(dataset
        .column(measure)?
        .values
        .iter()
        .map(Value::as_f64_or_zero)
        .collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Row count per group value, sorted by count. Ties keep the order in which
/// the values first appear.
pub fn count_by(
    dataset: &Dataset,
    dimension: Dimension<'_>,
    order: SortOrder,
) -> Result<Vec<(String, usize)>> {
    let keys = keys_for(dataset, dimension)?;
    let mut position: HashMap<GroupKey, usize> = HashMap::new();
    let mut counts: Vec<(String, usize)> = Vec::new();
    for key in keys.into_iter().flatten() {
        match position.get(&key) {
            Some(&i) => counts[i].1 += 1,
            None => {
                position.insert(key.clone(), counts.len());
                counts.push((key.label, 1));
            }
        }
    }
    match order {
        SortOrder::Ascending => counts.sort_by_key(|(_, n)| *n),
        SortOrder::Descending => counts.sort_by(|a, b| b.1.cmp(&a.1)),
    }
    Ok(counts)
}

/// Per-group reducer over a numeric measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Reducer {
    Sum,
    Mean,
    Median,
}

impl Reducer {
    pub fn apply(self, values: Vec<f64>) -> f64 {
        match self {
            Reducer::Sum => values.iter().sum(),
            Reducer::Mean => average(&values),
            Reducer::Median => median(values),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Reducer::Sum => "Sum",
            Reducer::Mean => "Mean",
            Reducer::Median => "Median",
        }
    }
}

/// Reduce `measure` per group, groups in key order. Unparsable or missing
/// measure cells count as zero.
pub fn reduce_by(
    dataset: &Dataset,
    dimension: Dimension<'_>,
    measure: &str,
    reducer: Reducer,
) -> Result<Vec<(String, f64)>> {
    let keys = keys_for(dataset, dimension)?;
    let values = measure_values(dataset, measure)?;
    let mut groups: BTreeMap<GroupKey, Vec<f64>> = BTreeMap::new();
    for (key, v) in keys.into_iter().zip(values) {
        if let Some(key) = key {
            groups.entry(key).or_default().push(v);
        }
    }
    Ok(groups
        .into_iter()
        .map(|(k, vs)| (k.label, reducer.apply(vs)))
        .collect())
}

pub fn sum_by(
    dataset: &Dataset,
    dimension: Dimension<'_>,
    measure: &str,
) -> Result<Vec<(String, f64)>> {
    reduce_by(dataset, dimension, measure, Reducer::Sum)
}

pub fn mean_by(
    dataset: &Dataset,
    dimension: Dimension<'_>,
    measure: &str,
) -> Result<Vec<(String, f64)>> {
    reduce_by(dataset, dimension, measure, Reducer::Mean)
}

pub fn median_by(
    dataset: &Dataset,
    dimension: Dimension<'_>,
    measure: &str,
) -> Result<Vec<(String, f64)>> {
    reduce_by(dataset, dimension, measure, Reducer::Median)
}

/// Stable sort of `(label, value)` pairs by value.
pub fn sort_by_value(mut pairs: Vec<(String, f64)>, order: SortOrder) -> Vec<(String, f64)> {
    let cmp = |a: &f64, b: &f64| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal);
    match order {
        SortOrder::Ascending => pairs.sort_by(|a, b| cmp(&a.1, &b.1)),
        SortOrder::Descending => pairs.sort_by(|a, b| cmp(&b.1, &a.1)),
    }
    pairs
}

/// Dense two-key table: one row per index value, one column per split value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WideTable {
    pub index_name: String,
    pub rows: Vec<String>,
    pub columns: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

impl WideTable {
    /// Pivot long `(row, column) -> value` cells. Every row gets every
    /// column; absent combinations are 0.
    fn pivot(index_name: &str, cells: &BTreeMap<(GroupKey, GroupKey), f64>) -> Self {
        let row_keys: BTreeSet<&GroupKey> = cells.keys().map(|(r, _)| r).collect();
        let col_keys: BTreeSet<&GroupKey> = cells.keys().map(|(_, c)| c).collect();
        let col_pos: HashMap<&GroupKey, usize> =
            col_keys.iter().enumerate().map(|(i, k)| (*k, i)).collect();
        let row_pos: HashMap<&GroupKey, usize> =
            row_keys.iter().enumerate().map(|(i, k)| (*k, i)).collect();

        let mut values = vec![vec![0.0; col_keys.len()]; row_keys.len()];
        for ((r, c), v) in cells {
            values[row_pos[r]][col_pos[c]] = *v;
        }
        Self {
            index_name: index_name.to_string(),
            rows: row_keys.into_iter().map(|k| k.label.clone()).collect(),
            columns: col_keys.into_iter().map(|k| k.label.clone()).collect(),
            values,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, row: &str, column: &str) -> Option<f64> {
        let r = self.rows.iter().position(|x| x == row)?;
        let c = self.columns.iter().position(|x| x == column)?;
        Some(self.values[r][c])
    }

    pub fn row_totals(&self) -> Vec<f64> {
        self.values.iter().map(|row| row.iter().sum()).collect()
    }

    /// Rename columns, e.g. `YES` -> `Paid`. Unknown names are ignored.
    pub fn rename_columns(mut self, renames: &[(&str, &str)]) -> Self {
        for col in &mut self.columns {
            if let Some((_, to)) = renames.iter().find(|(from, _)| from == col) {
                *col = (*to).to_string();
            }
        }
        self
    }
}

fn paired_keys(
    dataset: &Dataset,
    rows: Dimension<'_>,
    columns: Dimension<'_>,
) -> Result<Vec<Option<(GroupKey, GroupKey)>>> {
    let row_keys = keys_for(dataset, rows)?;
    let col_keys = keys_for(dataset, columns)?;
    Ok(row_keys
        .into_iter()
        .zip(col_keys)
        .map(|(r, c)| Some((r?, c?)))
        .collect())
}

/// Sum of `measure` per `(dimension, split)` pair, split values pivoted to
/// columns and zero-filled.
pub fn stacked_breakdown(
    dataset: &Dataset,
    dimension: &str,
    split_column: &str,
    measure: &str,
) -> Result<WideTable> {
    let keys = paired_keys(dataset, Dimension::Column(dimension), Dimension::Column(split_column))?;
    let values = measure_values(dataset, measure)?;
    let mut cells: BTreeMap<(GroupKey, GroupKey), f64> = BTreeMap::new();
    for (key, v) in keys.into_iter().zip(values) {
        if let Some(key) = key {
            *cells.entry(key).or_insert(0.0) += v;
        }
    }
    Ok(WideTable::pivot(dimension, &cells))
}

/// Positive-outcome counts and shares per `(group, x)` cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutcomeShare {
    /// Name of the dimension spread across the columns.
    pub x_name: String,
    pub positives: WideTable,
    pub totals: WideTable,
    /// 0..=100. Cells without rows are 0.
    pub percentages: WideTable,
}

/// For every `(group_dim, x_dim)` cell: the share of rows whose
/// `flag_column` equals `positive_value`, compared case-insensitively.
pub fn percentage_of_positive(
    dataset: &Dataset,
    group_dim: Dimension<'_>,
    x_dim: Dimension<'_>,
    flag_column: &str,
    positive_value: &str,
) -> Result<OutcomeShare> {
    let keys = paired_keys(dataset, group_dim, x_dim)?;
    let wanted = positive_value.to_lowercase();
    let flags: Vec<bool> = dataset
        .column(flag_column)?
        .values
        .iter()
        .map(|v| v.to_string().to_lowercase() == wanted)
        .collect();

    let mut totals: BTreeMap<(GroupKey, GroupKey), f64> = BTreeMap::new();
    let mut positives: BTreeMap<(GroupKey, GroupKey), f64> = BTreeMap::new();
    for (key, hit) in keys.into_iter().zip(flags) {
        let Some(key) = key else { continue };
        *totals.entry(key.clone()).or_insert(0.0) += 1.0;
        *positives.entry(key).or_insert(0.0) += if hit { 1.0 } else { 0.0 };
    }
    let percentages: BTreeMap<(GroupKey, GroupKey), f64> = totals
        .iter()
        .map(|(k, total)| (k.clone(), 100.0 * ratio(positives[k], *total)))
        .collect();

    let index = group_dim.name();
    Ok(OutcomeShare {
        x_name: x_dim.name().to_string(),
        positives: WideTable::pivot(index, &positives),
        totals: WideTable::pivot(index, &totals),
        percentages: WideTable::pivot(index, &percentages),
    })
}

/// Row count per `(x, split)` pair, indexed by `x`.
///
/// Only x values present in the data become rows, so a month with no
/// violations is left out rather than shown as zero. Split columns are
/// still zero-filled within each row.
pub fn trend_table(dataset: &Dataset, x: Dimension<'_>, split_column: &str) -> Result<WideTable> {
    let keys = paired_keys(dataset, x, Dimension::Column(split_column))?;
    let mut cells: BTreeMap<(GroupKey, GroupKey), f64> = BTreeMap::new();
    for key in keys.into_iter().flatten() {
        *cells.entry(key).or_insert(0.0) += 1.0;
    }
    Ok(WideTable::pivot(x.name(), &cells))
}

/// Pearson correlation between every pair of numeric columns, using the
/// rows where both are present. Degenerate pairs (constant or under two
/// shared rows) report 0.
pub fn correlation_matrix(dataset: &Dataset) -> Result<WideTable> {
    let numeric: Vec<(&str, Vec<Option<f64>>)> = dataset
        .numeric_columns()
        .map(|c| (c.name.as_str(), c.values.iter().map(Value::as_f64).collect()))
        .collect();
    if numeric.len() < 2 {
        return Err(DashboardError::selection(
            "not enough numerical columns to build a correlation matrix",
        ));
    }
    let names: Vec<String> = numeric.iter().map(|(n, _)| n.to_string()).collect();
    let values: Vec<Vec<f64>> = numeric
        .iter()
        .map(|(_, a)| numeric.iter().map(|(_, b)| pearson(a, b)).collect::<Vec<f64>>())
        .collect();
    Ok(WideTable {
        index_name: "Field".to_string(),
        rows: names.clone(),
        columns: names,
        values,
    })
}

fn pearson(a: &[Option<f64>], b: &[Option<f64>]) -> f64 {
    let pairs: Vec<(f64, f64)> = a
        .iter()
        .zip(b)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();
    if pairs.len() < 2 {
        return 0.0;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        cov += (x - mean_x) * (y - mean_y);
        var_x += (x - mean_x).powi(2);
        var_y += (y - mean_y).powi(2);
    }
    ratio(cov, (var_x * var_y).sqrt())
}

/// Per-column kind, counts and numeric range.
pub fn column_overview(dataset: &Dataset) -> Vec<ColumnOverviewRow> {
    dataset
        .columns()
        .iter()
        .map(|c| {
            let nums: Vec<f64> = if c.kind.is_numeric() {
                c.values.iter().filter_map(Value::as_f64).collect()
            } else {
                Vec::new()
            };
            let (min, mean, max) = if nums.is_empty() {
                (None, None, None)
            } else {
                (
                    nums.iter().copied().reduce(f64::min),
                    Some(average(&nums)),
                    nums.iter().copied().reduce(f64::max),
                )
            };
            ColumnOverviewRow {
                field: c.name.clone(),
                kind: c.kind,
                non_null: c.non_null_count(),
                unique: c.n_unique(),
                min,
                mean,
                max,
            }
        })
        .collect()
}

/// Rows whose `Violation_Type` contains `query`, ignoring case.
pub fn search_violations(dataset: &Dataset, query: &str) -> Result<Dataset> {
    let needle = query.trim().to_lowercase();
    let keep: Vec<bool> = dataset
        .column("Violation_Type")?
        .values
        .iter()
        .map(|v| !v.is_null() && v.to_string().to_lowercase().contains(&needle))
        .collect();
    Ok(dataset.filter(&keep))
}

/// Text columns whose unique-value count lies strictly between `min` and `max`.
pub fn categorical_columns(dataset: &Dataset, min: usize, max: usize) -> Vec<String> {
    dataset
        .columns_of_kind(ColumnKind::Text)
        .filter(|c| {
            let n = c.n_unique();
            n > min && n < max
        })
        .map(|c| c.name.clone())
        .collect()
}

/// Flag and group-by columns for the outcome heatmap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeatmapColumns {
    pub flag_column: String,
    pub group_column: String,
}

/// Pick the outcome heatmap's columns among text columns with 2 to 49
/// distinct values, preferring `flag` and `group` when they qualify.
///
/// Fails with `NoQualifyingColumns` when fewer than two columns qualify.
pub fn heatmap_columns(dataset: &Dataset, flag: &str, group: &str) -> Result<HeatmapColumns> {
    let candidates = categorical_columns(dataset, 1, 50);
    let flag_column = candidates
        .iter()
        .find(|c| *c == flag)
        .or_else(|| candidates.first())
        .cloned()
        .ok_or(DashboardError::NoQualifyingColumns)?;
    let others: Vec<&String> = candidates.iter().filter(|c| **c != flag_column).collect();
    let group_column = others
        .iter()
        .find(|c| **c == group)
        .or_else(|| others.first())
        .map(|c| (*c).clone())
        .ok_or(DashboardError::NoQualifyingColumns)?;
    Ok(HeatmapColumns {
        flag_column,
        group_column,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Column;

    fn table(cols: &[(&str, &[&str])]) -> Dataset {
        Dataset::new(
            cols.iter()
                .map(|(name, cells)| {
                    Column::infer(*name, cells.iter().map(|s| s.to_string()).collect())
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_count_by_ascending_with_stable_ties() {
        let ds = table(&[(
            "Violation_Type",
            &["Speeding", "Parking", "Speeding", "Signal", "Parking", "Speeding", ""],
        )]);
        let counts =
            count_by(&ds, Dimension::Column("Violation_Type"), SortOrder::Ascending).unwrap();
        assert_eq!(
            counts,
            vec![("Signal".into(), 1), ("Parking".into(), 2), ("Speeding".into(), 3)]
        );

        let ds = table(&[("k", &["b", "a", "c"])]);
        let counts = count_by(&ds, Dimension::Column("k"), SortOrder::Descending).unwrap();
        let labels: Vec<&str> = counts.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(labels, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_reducers_treat_junk_as_zero() {
        let ds = table(&[
            ("g", &["a", "a", "a", "b"]),
            ("m", &["10", "oops", "20", "5"]),
        ]);
        assert_eq!(
            sum_by(&ds, Dimension::Column("g"), "m").unwrap(),
            vec![("a".into(), 30.0), ("b".into(), 5.0)]
        );
        assert_eq!(mean_by(&ds, Dimension::Column("g"), "m").unwrap()[0].1, 10.0);
        assert_eq!(median_by(&ds, Dimension::Column("g"), "m").unwrap()[0].1, 10.0);
    }

    #[test]
    fn test_integer_groups_sort_numerically() {
        let ds = table(&[("year", &["10", "9", "100"]), ("m", &["1", "1", "1"])]);
        let labels: Vec<String> = sum_by(&ds, Dimension::Column("year"), "m")
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(labels, vec!["9", "10", "100"]);
    }

    #[test]
    fn test_stacked_breakdown_is_dense() {
        let ds = table(&[
            ("Violation_Type", &["Speeding", "Speeding", "Parking"]),
            ("Fine_Paid", &["YES", "NO", "YES"]),
            ("Fine_Amount", &["100", "200", "50"]),
        ]);
        let t = stacked_breakdown(&ds, "Violation_Type", "Fine_Paid", "Fine_Amount").unwrap();
        assert_eq!(t.rows, vec!["Parking", "Speeding"]);
        assert_eq!(t.columns, vec!["NO", "YES"]);
        assert_eq!(t.values, vec![vec![0.0, 50.0], vec![200.0, 100.0]]);
        assert_eq!(t.row_totals(), vec![50.0, 300.0]);
        for row in &t.values {
            assert_eq!(row.len(), t.columns.len());
        }
        let renamed = t.rename_columns(&[("YES", "Paid"), ("NO", "Unpaid")]);
        assert_eq!(renamed.columns, vec!["Unpaid", "Paid"]);
    }

    #[test]
    fn test_percentage_of_positive() {
        let ds = table(&[
            ("Vehicle_Type", &["Car", "Car", "Car", "Bike"]),
            ("Date", &["2024-01-10", "2024-01-20", "2024-02-01", "2024-02-03"]),
            ("Court", &["Yes", "no", "YES", "No"]),
        ]);
        let share = percentage_of_positive(
            &ds,
            Dimension::Column("Vehicle_Type"),
            Dimension::Time(TimeBucket::Month),
            "Court",
            "yes",
        )
        .unwrap();
        assert_eq!(share.x_name, "Month");
        assert_eq!(share.percentages.columns, vec!["January", "February"]);
        assert_eq!(share.percentages.get("Car", "January"), Some(50.0));
        assert_eq!(share.percentages.get("Car", "February"), Some(100.0));
        assert_eq!(share.percentages.get("Bike", "February"), Some(0.0));
        // Bike has no January rows: zero, not NaN.
        assert_eq!(share.percentages.get("Bike", "January"), Some(0.0));
        assert_eq!(share.positives.get("Car", "January"), Some(1.0));
        assert_eq!(share.totals.get("Car", "January"), Some(2.0));
    }

    #[test]
    fn test_trend_by_month_drops_absent_months() {
        let ds = table(&[
            ("Date", &["2024-07-04", "2024-03-01", "2023-03-15", "junk"]),
            ("Violation_Type", &["Speeding", "Parking", "Speeding", "Speeding"]),
        ]);
        let t = trend_table(&ds, Dimension::Time(TimeBucket::Month), "Violation_Type").unwrap();
        assert_eq!(t.index_name, "Month");
        assert_eq!(t.rows, vec!["March", "July"]);
        assert_eq!(t.get("March", "Speeding"), Some(1.0));
        assert_eq!(t.get("March", "Parking"), Some(1.0));
        assert_eq!(t.get("July", "Parking"), Some(0.0));
    }

    #[test]
    fn test_trend_by_year_month_and_year() {
        let ds = table(&[
            ("Date", &["2024-01-04", "2023-12-01", "2024-01-09"]),
            ("Driver_Gender", &["M", "F", "F"]),
        ]);
        let t = trend_table(&ds, Dimension::Time(TimeBucket::YearMonth), "Driver_Gender").unwrap();
        assert_eq!(t.rows, vec!["2023-12", "2024-01"]);
        let t = trend_table(&ds, Dimension::Time(TimeBucket::Year), "Driver_Gender").unwrap();
        assert_eq!(t.rows, vec!["2023", "2024"]);
        assert_eq!(t.get("2024", "F"), Some(1.0));
    }

    #[test]
    fn test_correlation_matrix() {
        let ds = table(&[
            ("a", &["1", "2", "3"]),
            ("b", &["2", "4", "6"]),
            ("c", &["3", "2", "1"]),
            ("t", &["x", "y", "z"]),
        ]);
        let m = correlation_matrix(&ds).unwrap();
        assert_eq!(m.rows, vec!["a", "b", "c"]);
        assert!((m.get("a", "b").unwrap() - 1.0).abs() < 1e-12);
        assert!((m.get("a", "c").unwrap() + 1.0).abs() < 1e-12);

        let only_one = table(&[("a", &["1"]), ("t", &["x"])]);
        assert!(matches!(
            correlation_matrix(&only_one),
            Err(DashboardError::InvalidSelection { .. })
        ));
    }

    #[test]
    fn test_heatmap_columns_prefer_defaults() {
        let ds = table(&[
            ("Violation_ID", &["V1", "V2", "V3"]),
            ("Constant", &["a", "a", "a"]),
            ("Vehicle_Type", &["Car", "Bike", "Car"]),
            ("Court_Appearance_Required", &["Yes", "No", "No"]),
            ("Fine_Amount", &["1", "2", "3"]),
        ]);
        assert_eq!(
            categorical_columns(&ds, 1, 50),
            vec!["Violation_ID", "Vehicle_Type", "Court_Appearance_Required"]
        );
        let cols = heatmap_columns(&ds, "Court_Appearance_Required", "Vehicle_Type").unwrap();
        assert_eq!(cols.flag_column, "Court_Appearance_Required");
        assert_eq!(cols.group_column, "Vehicle_Type");

        let cols = heatmap_columns(&ds, "Towed", "Weather_Condition").unwrap();
        assert_eq!(cols.flag_column, "Violation_ID");
        assert_eq!(cols.group_column, "Vehicle_Type");

        let only_one = table(&[("Vehicle_Type", &["Car", "Bike"]), ("Constant", &["a", "a"])]);
        assert!(matches!(
            heatmap_columns(&only_one, "Vehicle_Type", "Constant"),
            Err(DashboardError::NoQualifyingColumns)
        ));
    }

    #[test]
    fn test_search_violations_case_insensitive() {
        let ds = table(&[("Violation_Type", &["Speeding", "Over-speeding", "Parking"])]);
        assert_eq!(search_violations(&ds, "SPEED").unwrap().height(), 2);
    }

    #[test]
    fn test_column_overview() {
        let ds = table(&[("n", &["1", "3", ""]), ("s", &["a", "a", "b"])]);
        let rows = column_overview(&ds);
        assert_eq!(rows[0].non_null, 2);
        assert_eq!(rows[0].mean, Some(2.0));
        assert_eq!(rows[1].unique, 2);
        assert_eq!(rows[1].max, None);
    }
}
