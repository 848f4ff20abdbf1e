//! Render-agnostic chart descriptions for each dashboard view.
//!
//! Values keep full precision; only annotation text is rounded.

use serde::Serialize;

use crate::aggregate::{
    count_by, mean_by, reduce_by, sort_by_value, stacked_breakdown, Dimension, OutcomeShare,
    Reducer, SortOrder, WideTable,
};
use crate::error::{DashboardError, Result};
use crate::insights::DriverInsights;
use crate::location::STATE_NAME_PROPERTY;
use crate::types::{Column, ColumnKind, Dataset, Value};
use crate::util::{format_int, format_number, humanize, ratio};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Bar,
    StackedBar,
    Pie,
    Line,
    Scatter,
    Heatmap,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub name: String,
    pub values: Vec<f64>,
}

/// Text drawn at a category (and, for grids, a series).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Annotation {
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series: Option<String>,
    pub text: String,
}

impl Annotation {
    fn at(category: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            series: None,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    /// X-axis categories, in display order.
    pub categories: Vec<String>,
    /// One value per category in each series.
    pub series: Vec<Series>,
    pub annotations: Vec<Annotation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legend_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_range: Option<(f64, f64)>,
}

impl ChartSpec {
    fn new(
        kind: ChartKind,
        title: impl Into<String>,
        x_label: impl Into<String>,
        y_label: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            title: title.into(),
            x_label: x_label.into(),
            y_label: y_label.into(),
            categories: Vec::new(),
            series: Vec::new(),
            annotations: Vec::new(),
            legend_title: None,
            value_range: None,
        }
    }

    fn with_pairs(mut self, name: &str, pairs: Vec<(String, f64)>) -> Self {
        let (categories, values): (Vec<String>, Vec<f64>) = pairs.into_iter().unzip();
        self.categories = categories;
        self.series = vec![Series {
            name: name.to_string(),
            values,
        }];
        self
    }

    fn annotate_each(mut self, fmt: impl Fn(f64) -> String) -> Self {
        if let Some(series) = self.series.first() {
            self.annotations = self
                .categories
                .iter()
                .zip(&series.values)
                .map(|(c, v)| Annotation::at(c.as_str(), fmt(*v)))
                .collect();
        }
        self
    }

    /// Series of a grid chart built from a wide table: one per table column.
    fn with_table_columns(mut self, table: &WideTable) -> Self {
        self.categories = table.rows.clone();
        self.series = table
            .columns
            .iter()
            .enumerate()
            .map(|(c, name)| Series {
                name: name.clone(),
                values: table.values.iter().map(|row| row[c]).collect(),
            })
            .collect();
        self
    }
}

fn counts_as_f64(counts: Vec<(String, usize)>) -> Vec<(String, f64)> {
    counts.into_iter().map(|(k, n)| (k, n as f64)).collect()
}

/// Violation types, least to most frequent, each bar labelled with its count.
pub fn violation_distribution(dataset: &Dataset) -> Result<ChartSpec> {
    let counts = count_by(dataset, Dimension::Column("Violation_Type"), SortOrder::Ascending)?;
    Ok(ChartSpec::new(
        ChartKind::Bar,
        "Violation Types Distribution",
        "Violation Type",
        "No of Violations",
    )
    .with_pairs("Violations", counts_as_f64(counts))
    .annotate_each(|v| format_number(v, 0)))
}

/// Fine totals per violation type, stacked by payment status.
pub fn fines_by_payment_status(dataset: &Dataset) -> Result<ChartSpec> {
    let paid = dataset.column("Fine_Paid")?;
    let normalized: Vec<Value> = paid
        .values
        .iter()
        .map(|v| match v {
            Value::Null => Value::Null,
            other => Value::Text(other.to_string().trim().to_uppercase()),
        })
        .collect();
    let prepared = dataset
        .clone()
        .with_column(Column::new("Fine_Paid", ColumnKind::Text, normalized))?;

    let table = stacked_breakdown(&prepared, "Violation_Type", "Fine_Paid", "Fine_Amount")?
        .rename_columns(&[("YES", "Paid"), ("NO", "Unpaid")]);
    let totals = table.row_totals();

    let mut chart = ChartSpec::new(
        ChartKind::StackedBar,
        "Fines Distribution",
        "Violation Type",
        "Total Fine Amount (₹)",
    )
    .with_table_columns(&table);
    chart.legend_title = Some("Status".to_string());
    chart.annotations = table
        .rows
        .iter()
        .zip(totals)
        .map(|(row, total)| Annotation::at(row.as_str(), format_number(total, 0)))
        .collect();
    Ok(chart)
}

/// Share of violations per location, most frequent first.
pub fn location_share(dataset: &Dataset) -> Result<ChartSpec> {
    let counts = count_by(dataset, Dimension::Column("Location"), SortOrder::Descending)?;
    let total: usize = counts.iter().map(|(_, n)| n).sum();
    Ok(
        ChartSpec::new(ChartKind::Pie, "Violations by Location", "Location", "No of Violations")
            .with_pairs("Violations", counts_as_f64(counts))
            .annotate_each(|v| format!("{:.1}%", 100.0 * ratio(v, total as f64))),
    )
}

pub fn gender_distribution(insights: &DriverInsights) -> ChartSpec {
    ChartSpec::new(ChartKind::Bar, "Gender Distribution", "Gender", "Count")
        .with_pairs("Drivers", counts_as_f64(insights.gender_distribution.clone()))
}

/// Mean of `Recorded_Speed - Speed_Limit` per weather condition, highest first.
pub fn speed_exceeded_by_weather(dataset: &Dataset) -> Result<ChartSpec> {
    let recorded = &dataset.column("Recorded_Speed")?.values;
    let limit = &dataset.column("Speed_Limit")?.values;
    let exceeded: Vec<Value> = recorded
        .iter()
        .zip(limit)
        .map(|(r, l)| match (r.as_f64(), l.as_f64()) {
            (Some(r), Some(l)) => Value::Float(r - l),
            _ => Value::Null,
        })
        .collect();
    let prepared = dataset
        .clone()
        .with_column(Column::new("Speed_Exceeded", ColumnKind::Float, exceeded))?;

    let means = mean_by(&prepared, Dimension::Column("Weather_Condition"), "Speed_Exceeded")?;
    Ok(ChartSpec::new(
        ChartKind::Bar,
        "Average Speed Exceeded vs Weather Condition",
        "Weather Condition",
        "Average Speed Exceeded (km/h)",
    )
    .with_pairs("Speed Exceeded", sort_by_value(means, SortOrder::Descending))
    .annotate_each(|v| format!("{v:.1}")))
}

pub fn average_fine_by_violation(dataset: &Dataset) -> Result<ChartSpec> {
    let means = mean_by(dataset, Dimension::Column("Violation_Type"), "Fine_Amount")?;
    Ok(ChartSpec::new(
        ChartKind::Scatter,
        "Average Fine Amount by Violation Type",
        "Violation Type",
        "Average Fine Amount (₹)",
    )
    .with_pairs("Average Fine", sort_by_value(means, SortOrder::Descending))
    .annotate_each(|v| format!("{v:.0}")))
}

/// Y-axis of the generic bar chart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BarMeasure {
    Count,
    Mean(String),
}

/// Count of, or mean of a numeric column per, a categorical x-axis.
pub fn category_bar(dataset: &Dataset, x: &str, measure: &BarMeasure) -> Result<ChartSpec> {
    if dataset.column(x)?.kind != ColumnKind::Text {
        return Err(DashboardError::selection(format!("'{x}' is not a categorical column")));
    }
    match measure {
        BarMeasure::Count => {
            let counts = count_by(dataset, Dimension::Column(x), SortOrder::Descending)?;
            Ok(ChartSpec::new(ChartKind::Bar, format!("Count of {x}"), x, "Count")
                .with_pairs("Count", counts_as_f64(counts)))
        }
        BarMeasure::Mean(y) => {
            if !dataset.column(y)?.kind.is_numeric() {
                return Err(DashboardError::selection(format!(
                    "'{y}' is not numeric and cannot be averaged"
                )));
            }
            let means = mean_by(dataset, Dimension::Column(x), y)?;
            Ok(ChartSpec::new(ChartKind::Bar, format!("Mean of {y} by {x}"), x, format!("Mean {y}"))
                .with_pairs(y, means))
        }
    }
}

/// One line per split value across the table's x buckets.
pub fn trend_lines(table: &WideTable, split_column: &str) -> ChartSpec {
    let mut chart = ChartSpec::new(
        ChartKind::Line,
        format!("{} Trend based on {}", humanize(split_column), humanize(&table.index_name)),
        humanize(&table.index_name),
        "Number of Violations",
    )
    .with_table_columns(table);
    chart.legend_title = Some(humanize(split_column));
    chart
}

/// Percentage grid (0 to 100) annotated with `count\n(pct%)` per cell.
pub fn outcome_heatmap(share: &OutcomeShare, flag_column: &str, positive_value: &str) -> ChartSpec {
    let pct = &share.percentages;
    let mut chart = ChartSpec::new(
        ChartKind::Heatmap,
        format!("{flag_column} ('{positive_value}') Count & Percentage Heatmap"),
        share.x_name.clone(),
        pct.index_name.clone(),
    );
    chart.categories = pct.columns.clone();
    chart.series = pct
        .rows
        .iter()
        .zip(&pct.values)
        .map(|(name, values)| Series {
            name: name.clone(),
            values: values.clone(),
        })
        .collect();
    chart.annotations = pct
        .rows
        .iter()
        .flat_map(|row| {
            pct.columns.iter().map(move |col| {
                let yes = share.positives.get(row, col).unwrap_or(0.0);
                let p = pct.get(row, col).unwrap_or(0.0);
                Annotation {
                    category: col.clone(),
                    series: Some(row.clone()),
                    text: format!("{}\n({:.1}%)", format_int(yes as u64), p),
                }
            })
        })
        .collect();
    chart.value_range = Some((0.0, 100.0));
    chart
}

pub fn correlation_heatmap(matrix: &WideTable) -> ChartSpec {
    let mut chart = ChartSpec::new(ChartKind::Heatmap, "Correlation Matrix", "", "");
    chart.categories = matrix.columns.clone();
    chart.series = matrix
        .rows
        .iter()
        .zip(&matrix.values)
        .map(|(name, values)| Series {
            name: name.clone(),
            values: values.clone(),
        })
        .collect();
    chart.annotations = matrix
        .rows
        .iter()
        .zip(&matrix.values)
        .flat_map(|(row, values)| {
            matrix.columns.iter().zip(values).map(move |(col, v)| Annotation {
                category: col.clone(),
                series: Some(row.clone()),
                text: format!("{v:.2}"),
            })
        })
        .collect();
    chart.value_range = Some((-1.0, 1.0));
    chart
}

/// Value shown per region on the map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapMeasure {
    Count,
    Aggregate { column: String, reducer: Reducer },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapValue {
    /// Lower-cased, matched against the boundary property.
    pub key: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChoroplethSpec {
    pub title: String,
    pub location_column: String,
    pub key_property: String,
    pub legend: String,
    /// `Count`, or the reducer applied per location.
    pub aggregation: String,
    pub palette: String,
    pub center: (f64, f64),
    pub zoom: u8,
    pub values: Vec<MapValue>,
}

/// Per-location values keyed for the state boundary layer.
pub fn choropleth(
    dataset: &Dataset,
    location_column: &str,
    measure: &MapMeasure,
) -> Result<ChoroplethSpec> {
    let dim = Dimension::Column(location_column);
    let (legend, aggregation, pairs) = match measure {
        MapMeasure::Count => (
            "Count of Violations".to_string(),
            "Count",
            counts_as_f64(count_by(dataset, dim, SortOrder::Descending)?),
        ),
        MapMeasure::Aggregate { column, reducer } => {
            if !dataset.column(column)?.kind.is_numeric() {
                return Err(DashboardError::selection(format!(
                    "'{column}' is not numeric and cannot be aggregated"
                )));
            }
            (
                column.clone(),
                reducer.name(),
                reduce_by(dataset, dim, column, *reducer)?,
            )
        }
    };
    Ok(ChoroplethSpec {
        title: format!("{legend} by {location_column}"),
        location_column: location_column.to_string(),
        key_property: STATE_NAME_PROPERTY.to_string(),
        legend,
        aggregation: aggregation.to_string(),
        palette: "YlGnBu".to_string(),
        center: (22.0, 82.0),
        zoom: 4,
        values: pairs
            .into_iter()
            .map(|(k, value)| MapValue {
                key: k.to_lowercase(),
                value,
            })
            .collect(),
    })
}

/// Most variables a pair plot accepts.
pub const PAIR_PLOT_MAX_COLUMNS: usize = 5;

/// Text columns need fewer distinct values than this to be plotted or used as hue.
pub const PAIR_PLOT_MAX_LEVELS: usize = 10;

/// One plotted variable. Text columns are encoded as indexes into `levels`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairVariable {
    pub name: String,
    pub kind: ColumnKind,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub levels: Vec<String>,
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairHue {
    pub column: String,
    pub levels: Vec<String>,
    /// Index into `levels` per row.
    pub codes: Vec<Option<usize>>,
}

/// Lower-triangle scatter grid with density plots on the diagonal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairPlotSpec {
    pub title: String,
    pub variables: Vec<PairVariable>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hue: Option<PairHue>,
    pub corner: bool,
    pub diagonal: String,
}

/// Text columns usable as pair plot hue.
pub fn pair_plot_hue_columns(dataset: &Dataset) -> Vec<String> {
    dataset
        .columns_of_kind(ColumnKind::Text)
        .filter(|c| c.n_unique() < PAIR_PLOT_MAX_LEVELS)
        .map(|c| c.name.clone())
        .collect()
}

/// Numeric columns followed by low-cardinality text columns.
pub fn pair_plot_columns(dataset: &Dataset) -> Vec<String> {
    dataset
        .numeric_columns()
        .map(|c| c.name.clone())
        .chain(pair_plot_hue_columns(dataset))
        .collect()
}

fn encode_levels(column: &Column) -> (Vec<String>, Vec<Option<usize>>) {
    let levels: Vec<String> = column.unique_non_null().iter().map(|v| v.to_string()).collect();
    let codes = column
        .values
        .iter()
        .map(|v| match v {
            Value::Null => None,
            v => {
                let label = v.to_string();
                levels.iter().position(|l| *l == label)
            }
        })
        .collect();
    (levels, codes)
}

/// Pairwise relationships between up to five selectable columns, coloured
/// by an optional categorical `hue`.
pub fn pair_plot(dataset: &Dataset, columns: &[&str], hue: Option<&str>) -> Result<PairPlotSpec> {
    if columns.is_empty() {
        return Err(DashboardError::selection("select at least one column to plot"));
    }
    if columns.len() > PAIR_PLOT_MAX_COLUMNS {
        return Err(DashboardError::selection(format!(
            "too many columns selected, choose {PAIR_PLOT_MAX_COLUMNS} or fewer"
        )));
    }
    let selectable = pair_plot_columns(dataset);
    let variables = columns
        .iter()
        .map(|name| {
            let column = dataset.column(name)?;
            if !selectable.iter().any(|s| s == name) {
                return Err(DashboardError::selection(format!(
                    "'{name}' has too many distinct values for a pair plot"
                )));
            }
            let (levels, values) = if column.kind.is_numeric() {
                (Vec::new(), column.values.iter().map(Value::as_f64).collect())
            } else {
                let (levels, codes) = encode_levels(column);
                (levels, codes.into_iter().map(|c| c.map(|i| i as f64)).collect())
            };
            Ok(PairVariable {
                name: name.to_string(),
                kind: column.kind,
                levels,
                values,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let hue = match hue {
        Some(name) => {
            let column = dataset.column(name)?;
            if !pair_plot_hue_columns(dataset).iter().any(|h| h == name) {
                return Err(DashboardError::selection(format!(
                    "'{name}' cannot be used as hue"
                )));
            }
            let (levels, codes) = encode_levels(column);
            Some(PairHue {
                column: name.to_string(),
                levels,
                codes,
            })
        }
        None => None,
    };

    Ok(PairPlotSpec {
        title: "Pair Plot".to_string(),
        variables,
        hue,
        corner: true,
        diagonal: "kde".to_string(),
    })
}
