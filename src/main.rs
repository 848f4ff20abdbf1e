// Entry point and menu-driven CLI flow.
//
// - Option [1] lists the dataset catalog and loads the chosen dataset.
// - Option [2] builds the summary report for a trailing window.
// - Option [3] exports the state map values.
// After a report the user can go back to the menu or exit.
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use once_cell::sync::Lazy;

use traffic_dashboard::aggregate::{
    column_overview, correlation_matrix, heatmap_columns, percentage_of_positive, trend_table,
    Dimension, TimeBucket,
};
use traffic_dashboard::charts::{self, MapMeasure, PAIR_PLOT_MAX_COLUMNS};
use traffic_dashboard::insights::{
    driver_insights, violation_summary, DriverInsights, ViolationSummary,
};
use traffic_dashboard::location::{load_state_names, location_columns};
use traffic_dashboard::temporal::{coerce_dates, DATE_COLUMN};
use traffic_dashboard::types::MetricRow;
use traffic_dashboard::util::{format_int, format_number};
use traffic_dashboard::{
    list_datasets, logging, output, shared_cache, validate, DashboardConfig, DashboardError,
    DateWindow, Result, ValidatedDataset, REQUIRED_SCHEMA,
};

const PAIR_PLOT_DEFAULTS: &[&str] = &[
    "Fine_Amount",
    "Vehicle_Model_Year",
    "Speed_Limit",
    "Recorded_Speed",
    "Alcohol_Level",
];

// Selected dataset, kept so reports can be generated repeatedly in one run.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| Mutex::new(AppState::default()));

#[derive(Default)]
struct AppState {
    label: Option<String>,
    data: Option<ValidatedDataset>,
}

fn state() -> MutexGuard<'static, AppState> {
    APP_STATE.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn prompt(label: &str) -> String {
    print!("{label}");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

/// Ask whether to return to the menu. `true` for `Y`, `false` for `N`.
fn prompt_back_to_menu() -> bool {
    loop {
        match prompt("Back to menu (Y/N): ").to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

fn report_error(err: &DashboardError) {
    match err {
        DashboardError::SchemaMismatch { missing, actual } => {
            eprintln!("Error: the dataset does not match the required schema.");
            let expected: Vec<&str> = REQUIRED_SCHEMA.iter().map(|f| f.name).collect();
            eprintln!("  Expected columns: {}", expected.join(", "));
            eprintln!("  Actual columns:   {}", actual.join(", "));
            eprintln!("  Missing columns:  {}", missing.join(", "));
        }
        other => eprintln!("Error: {other}"),
    }
    println!();
}

/// Option [1]: pick a dataset from the catalog, load and validate it.
fn handle_select(config: &DashboardConfig) -> Result<()> {
    let catalog = list_datasets(&config.roots)?;
    if catalog.is_empty() {
        println!("No datasets found.\n");
        return Ok(());
    }
    if catalog.collision_count() > 0 {
        println!(
            "Note: {} dataset label(s) appear in more than one location; the later one is used.",
            catalog.collision_count()
        );
    }
    for (i, label) in catalog.labels().enumerate() {
        println!("[{}] {}", i + 1, label);
    }
    let choice = prompt("Select dataset: ");
    let Some(entry) = choice
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| catalog.entries().get(i))
    else {
        println!("Invalid choice.\n");
        return Ok(());
    };

    let path = catalog.resolve(&entry.label)?;
    let dataset = shared_cache().load(path)?;
    let rows = dataset.height();
    let validated = validate(dataset, REQUIRED_SCHEMA)?;
    println!(
        "Loaded {} ({} rows, {} tier)\n",
        entry.label,
        format_int(rows),
        entry.tier
    );
    let mut state = state();
    state.label = Some(entry.label.clone());
    state.data = Some(validated);
    Ok(())
}

fn selected() -> Option<(String, ValidatedDataset)> {
    let state = state();
    Some((state.label.clone()?, state.data.clone()?))
}

fn read_window(config: &DashboardConfig) -> Option<DateWindow> {
    let input = prompt(&format!(
        "Number of days to analyze ({}-{}, default {}): ",
        config.min_window_days, config.max_window_days, config.default_window_days
    ));
    let days = if input.is_empty() {
        config.default_window_days
    } else {
        input.parse::<u32>().ok()?
    };
    config
        .window_in_bounds(days)
        .then_some(DateWindow::Trailing { days })
}

fn summary_rows(summary: &ViolationSummary) -> Vec<MetricRow> {
    vec![
        MetricRow::new("Total Violations", format_int(summary.total_violations)),
        MetricRow::new("Avg Violations per Day", format_number(summary.avg_violations_per_day, 2)),
        MetricRow::new(
            "Avg Violations per Vehicle Type",
            format_number(summary.avg_violations_per_vehicle_type, 2),
        ),
        MetricRow::new("Total Fines (₹)", format_number(summary.total_fines, 2)),
        MetricRow::new(
            "Avg Fine per Violation (₹)",
            format_number(summary.avg_fine_per_violation, 2),
        ),
        MetricRow::new("Avg Fines per Day (₹)", format_number(summary.avg_fines_per_day, 2)),
        MetricRow::new("Total Locations", format_int(summary.total_locations)),
        MetricRow::new(
            "Avg Violations per Location",
            format_number(summary.avg_violations_per_location, 2),
        ),
        MetricRow::new(
            "Most Violated Location",
            summary.most_violated_location.clone().unwrap_or_default(),
        ),
    ]
}

fn driver_rows(insights: &DriverInsights) -> Vec<MetricRow> {
    vec![
        MetricRow::new("Average Driver Age", format_number(insights.avg_age, 2)),
        MetricRow::new("Most Common Gender", insights.modal_gender.clone()),
        MetricRow::new(
            "Max Alcohol Level",
            insights
                .max_alcohol_level
                .map(|v| format_number(v, 2))
                .unwrap_or_else(|| "n/a".to_string()),
        ),
    ]
}

/// Option [2]: summary metrics and chart exports for a trailing window.
fn handle_generate_report(config: &DashboardConfig) -> Result<()> {
    let Some((label, data)) = selected() else {
        println!("Error: No dataset selected. Please select one first (option 1).\n");
        return Ok(());
    };
    let Some(window) = read_window(config) else {
        println!(
            "Invalid number of days. Please enter a value between {} and {}.\n",
            config.min_window_days, config.max_window_days
        );
        return Ok(());
    };

    let dated = coerce_dates(data.into_dataset(), DATE_COLUMN)?;
    let windowed = match validate(window.apply(&dated)?, REQUIRED_SCHEMA) {
        Ok(v) => v,
        Err(DashboardError::EmptyDataset) => {
            println!("No violations recorded in the {}.\n", window.describe().to_lowercase());
            return Ok(());
        }
        Err(e) => return Err(e),
    };
    let ds = windowed.dataset();
    println!("Generating report for {label} ({})...", window.describe());

    let summary = violation_summary(&windowed, window.span_days())?;
    output::preview_table(
        "Violation Summary",
        Some(window.describe().as_str()),
        &summary_rows(&summary),
        10,
    );

    let out = &config.output_dir;
    output::export_json(out, "summary", &summary)?;
    output::export_json(out, "violation_distribution", &charts::violation_distribution(ds)?)?;
    output::export_json(out, "fines_by_payment_status", &charts::fines_by_payment_status(ds)?)?;
    output::export_json(out, "location_share", &charts::location_share(ds)?)?;
    output::export_json(out, "speed_exceeded_by_weather", &charts::speed_exceeded_by_weather(ds)?)?;
    output::export_json(out, "average_fine_by_violation", &charts::average_fine_by_violation(ds)?)?;

    match driver_insights(ds) {
        Ok(insights) => {
            output::preview_table("Driver Insights", None, &driver_rows(&insights), 10);
            let chart = charts::gender_distribution(&insights);
            output::export_json(out, "gender_distribution", &chart)?;
        }
        Err(e) if e.is_recoverable() => println!("Driver insights unavailable: {e}\n"),
        Err(e) => return Err(e),
    }

    let trend = trend_table(ds, Dimension::Time(TimeBucket::Month), "Violation_Type")?;
    println!("Monthly Violation Trend\n\n{}\n", output::render_wide_table(&trend, 0));
    output::write_wide_csv(&out.join("monthly_trend.csv"), &trend)?;
    output::export_json(out, "monthly_trend", &charts::trend_lines(&trend, "Violation_Type"))?;

    match heatmap_columns(ds, "Court_Appearance_Required", "Vehicle_Type") {
        Ok(cols) => {
            let share = percentage_of_positive(
                ds,
                Dimension::Column(&cols.group_column),
                Dimension::Time(TimeBucket::DayOfWeek),
                &cols.flag_column,
                "Yes",
            )?;
            output::export_json(
                out,
                "outcome_heatmap",
                &charts::outcome_heatmap(&share, &cols.flag_column, "Yes"),
            )?;
        }
        Err(e) => println!("Outcome heatmap skipped: {e}"),
    }

    let selectable = charts::pair_plot_columns(ds);
    let pair_columns: Vec<&str> = PAIR_PLOT_DEFAULTS
        .iter()
        .copied()
        .filter(|c| selectable.iter().any(|s| s == c))
        .take(PAIR_PLOT_MAX_COLUMNS)
        .collect();
    let hue = charts::pair_plot_hue_columns(ds)
        .into_iter()
        .find(|c| c == "Violation_Type");
    match charts::pair_plot(ds, &pair_columns, hue.as_deref()) {
        Ok(plot) => {
            output::export_json(out, "pair_plot", &plot)?;
        }
        Err(e) => println!("Pair plot skipped: {e}"),
    }

    match correlation_matrix(ds) {
        Ok(matrix) => {
            output::export_json(out, "correlation", &charts::correlation_heatmap(&matrix))?;
        }
        Err(e) => println!("Correlation skipped: {e}"),
    }

    output::preview_table("Dataset Overview", None, &column_overview(ds), 40);
    println!("(Chart data exported to {})\n", out.display());
    Ok(())
}

/// Option [3]: per-state violation counts keyed for the boundary layer.
fn handle_export_map(config: &DashboardConfig) -> Result<()> {
    let Some((label, data)) = selected() else {
        println!("Error: No dataset selected. Please select one first (option 1).\n");
        return Ok(());
    };
    let known = load_state_names(&config.geojson_path)?;
    let candidates = location_columns(data.dataset(), &known, &config.location)?;
    let Some(column) = candidates.preferred() else {
        return Err(DashboardError::NoQualifyingColumns);
    };
    let map = charts::choropleth(data.dataset(), column, &MapMeasure::Count)?;
    let path = output::export_json(&config.output_dir, "state_map", &map)?;
    println!(
        "Map data for {label} by {column} ({} regions) exported to {}\n",
        map.values.len(),
        path.display()
    );
    Ok(())
}

fn load_config() -> DashboardConfig {
    let arg = std::env::args().nth(1);
    match DashboardConfig::load(arg.as_deref().map(Path::new)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}. Using defaults.");
            DashboardConfig::default()
        }
    }
}

fn main() {
    let config = load_config();
    logging::init_logging(&config.log_level);

    loop {
        println!("Traffic Violation Dashboard");
        println!("[1] Select dataset");
        println!("[2] Generate summary report");
        println!("[3] Export map data\n");
        let outcome = match prompt("Enter choice: ").as_str() {
            "1" => handle_select(&config),
            "2" => {
                println!();
                let result = handle_generate_report(&config);
                if let Err(e) = &result {
                    report_error(e);
                }
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
                continue;
            }
            "3" => handle_export_map(&config),
            _ => {
                println!("Invalid choice. Please enter 1, 2 or 3.\n");
                Ok(())
            }
        };
        if let Err(e) = outcome {
            report_error(&e);
        }
    }
}
