use std::collections::HashSet;

use serde::Serialize;

use crate::aggregate::{count_by, Dimension, SortOrder};
use crate::error::{DashboardError, Result};
use crate::schema::ValidatedDataset;
use crate::types::{Dataset, Value};
use crate::util::{average, ratio, round_to};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriverInsights {
    /// Rounded to two decimals.
    pub avg_age: f64,
    pub modal_gender: String,
    /// Raw maximum; `None` when no row has a readable level.
    pub max_alcohol_level: Option<f64>,
    /// Most common first.
    pub gender_distribution: Vec<(String, usize)>,
}

/// Age, gender and alcohol summary over rows that have both an age and a
/// gender. Gender ties go to the value seen first.
pub fn driver_insights(dataset: &Dataset) -> Result<DriverInsights> {
    let ages: Vec<Option<i64>> = dataset
        .column("Driver_Age")?
        .values
        .iter()
        .map(Value::as_i64)
        .collect();
    let genders = &dataset.column("Driver_Gender")?.values;
    let keep: Vec<bool> = ages
        .iter()
        .zip(genders)
        .map(|(age, gender)| age.is_some() && !gender.is_null())
        .collect();
    let usable = dataset.filter(&keep);
    if usable.is_empty() {
        return Err(DashboardError::EmptyDataset);
    }

    let usable_ages: Vec<f64> = ages
        .into_iter()
        .zip(&keep)
        .filter(|(_, k)| **k)
        .filter_map(|(age, _)| age.map(|a| a as f64))
        .collect();
    let gender_distribution = count_by(
        &usable,
        Dimension::Column("Driver_Gender"),
        SortOrder::Descending,
    )?;
    let modal_gender = gender_distribution
        .first()
        .map(|(g, _)| g.clone())
        .ok_or(DashboardError::EmptyDataset)?;
    let max_alcohol_level = match usable.column("Alcohol_Level") {
        Ok(col) => col.values.iter().filter_map(Value::as_f64).reduce(f64::max),
        Err(_) => None,
    };

    Ok(DriverInsights {
        avg_age: round_to(average(&usable_ages), 2),
        modal_gender,
        max_alcohol_level,
        gender_distribution,
    })
}

/// Headline numbers for a windowed, validated dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViolationSummary {
    pub window_days: i64,
    pub total_violations: usize,
    pub avg_violations_per_day: f64,
    pub avg_violations_per_vehicle_type: f64,
    pub total_fines: f64,
    pub avg_fine_per_violation: f64,
    pub avg_fines_per_day: f64,
    pub total_locations: usize,
    pub avg_violations_per_location: f64,
    pub most_violated_location: Option<String>,
}

pub fn violation_summary(data: &ValidatedDataset, window_days: i64) -> Result<ViolationSummary> {
    let records = data.records();
    let total = records.len();
    let days = window_days.max(0) as f64;

    let vehicle_types: HashSet<&str> = records
        .iter()
        .filter_map(|r| r.vehicle_type.as_deref())
        .collect();
    let total_fines: f64 = records.iter().map(|r| r.fine_amount.unwrap_or(0.0)).sum();

    let by_location = count_by(
        data.dataset(),
        Dimension::Column("Location"),
        SortOrder::Descending,
    )?;

    Ok(ViolationSummary {
        window_days,
        total_violations: total,
        avg_violations_per_day: ratio(total as f64, days),
        avg_violations_per_vehicle_type: ratio(total as f64, vehicle_types.len() as f64),
        total_fines,
        avg_fine_per_violation: ratio(total_fines, total as f64),
        avg_fines_per_day: ratio(total_fines, days),
        total_locations: by_location.len(),
        avg_violations_per_location: ratio(total as f64, by_location.len() as f64),
        most_violated_location: by_location.first().map(|(loc, _)| loc.clone()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{tests::full_row, validate, REQUIRED_SCHEMA};
    use crate::types::Column;

    fn drivers(ages: &[&str], genders: &[&str], alcohol: &[&str]) -> Dataset {
        let col = |name: &str, cells: &[&str]| {
            Column::infer(name, cells.iter().map(|s| s.to_string()).collect())
        };
        Dataset::new(vec![
            col("Driver_Age", ages),
            col("Driver_Gender", genders),
            col("Alcohol_Level", alcohol),
        ])
        .unwrap()
    }

    #[test]
    fn test_driver_insights_scenario() {
        let ds = drivers(&["30", "40", "50"], &["M", "F", "M"], &["0.01", "0.12", "0.05"]);
        let insights = driver_insights(&ds).unwrap();
        assert_eq!(insights.avg_age, 40.0);
        assert_eq!(insights.modal_gender, "M");
        assert_eq!(insights.max_alcohol_level, Some(0.12));
        assert_eq!(
            insights.gender_distribution,
            vec![("M".to_string(), 2), ("F".to_string(), 1)]
        );
    }

    #[test]
    fn test_driver_insights_drops_incomplete_rows() {
        let ds = drivers(
            &["20", "", "25", "99"],
            &["F", "M", "", "M"],
            &["0.3", "0.9", "0.8", "0.1"],
        );
        let insights = driver_insights(&ds).unwrap();
        // Rows 0 and 3 survive.
        assert_eq!(insights.avg_age, 59.5);
        assert_eq!(insights.max_alcohol_level, Some(0.3));
        // Tie: F was seen first.
        assert_eq!(insights.modal_gender, "F");
    }

    #[test]
    fn test_driver_insights_rounds_age() {
        let ds = drivers(&["20", "21", "21"], &["M", "M", "M"], &["", "", ""]);
        let insights = driver_insights(&ds).unwrap();
        assert_eq!(insights.avg_age, 20.67);
        assert_eq!(insights.max_alcohol_level, None);
    }

    #[test]
    fn test_driver_insights_without_usable_rows() {
        let ds = drivers(&[""], &["M"], &["0.1"]);
        assert!(matches!(driver_insights(&ds), Err(DashboardError::EmptyDataset)));
    }

    #[test]
    fn test_violation_summary() {
        let ds = full_row(&[
            ("Fine_Amount", "1500"),
            ("Location", "Goa"),
            ("Vehicle_Type", "Car"),
        ]);
        let validated = validate(ds, REQUIRED_SCHEMA).unwrap();
        let summary = violation_summary(&validated, 30).unwrap();
        assert_eq!(summary.total_violations, 1);
        assert_eq!(summary.total_fines, 1500.0);
        assert_eq!(summary.avg_fine_per_violation, 1500.0);
        assert_eq!(summary.avg_fines_per_day, 50.0);
        assert_eq!(summary.avg_violations_per_vehicle_type, 1.0);
        assert_eq!(summary.avg_violations_per_location, 1.0);
        assert_eq!(summary.most_violated_location.as_deref(), Some("Goa"));

        let zero_days = violation_summary(&validated, 0).unwrap();
        assert_eq!(zero_days.avg_violations_per_day, 0.0);

        let no_location = validate(full_row(&[("Location", "")]), REQUIRED_SCHEMA).unwrap();
        let summary = violation_summary(&no_location, 30).unwrap();
        assert_eq!(summary.total_locations, 0);
        assert_eq!(summary.avg_violations_per_location, 0.0);
    }
}
