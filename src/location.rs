//! Detection of place-name columns for the state map.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::config::LocationDetection;
use crate::error::{DashboardError, Result};
use crate::types::{Column, ColumnKind, Dataset};

/// GeoJSON property holding the short state name.
pub const STATE_NAME_PROPERTY: &str = "STNAME_SH";

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    properties: serde_json::Map<String, serde_json::Value>,
}

/// Lower-cased state names from a boundary feature collection.
pub fn load_state_names(path: &Path) -> Result<HashSet<String>> {
    let geo_err = |message: String| DashboardError::GeoJson {
        path: path.to_path_buf(),
        message,
    };
    let text = std::fs::read_to_string(path).map_err(|e| geo_err(e.to_string()))?;
    let collection: FeatureCollection =
        serde_json::from_str(&text).map_err(|e| geo_err(e.to_string()))?;

    collection
        .features
        .iter()
        .enumerate()
        .map(|(i, feature)| {
            feature
                .properties
                .get(STATE_NAME_PROPERTY)
                .and_then(|v| v.as_str())
                .map(str::to_lowercase)
                .ok_or_else(|| {
                    geo_err(format!("feature {i} has no {STATE_NAME_PROPERTY} property"))
                })
        })
        .collect()
}

/// Share of a column's sampled unique values found in `known_locations`.
///
/// `None` when the column has no non-null values to sample.
pub fn match_ratio(
    column: &Column,
    known_locations: &HashSet<String>,
    sample_size: usize,
) -> Option<f64> {
    let sample: Vec<String> = column
        .unique_non_null()
        .into_iter()
        .take(sample_size)
        .map(|v| v.to_string())
        .collect();
    if sample.is_empty() {
        return None;
    }
    let hits = sample
        .iter()
        .filter(|v| known_locations.contains(&v.to_lowercase()))
        .count();
    Some(hits as f64 / sample.len() as f64)
}

/// Text columns whose first `sample_size` unique values mostly name known
/// locations. `known_locations` is expected lower-case.
pub fn find_location_columns(
    dataset: &Dataset,
    known_locations: &HashSet<String>,
    sample_size: usize,
    threshold: f64,
) -> Vec<String> {
    dataset
        .columns_of_kind(ColumnKind::Text)
        .filter(|c| {
            match_ratio(c, known_locations, sample_size).is_some_and(|ratio| ratio >= threshold)
        })
        .map(|c| c.name.clone())
        .collect()
}

/// Columns offered to the map view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationColumns {
    Detected(Vec<String>),
    /// Detection found nothing; low-cardinality text columns instead.
    Fallback(Vec<String>),
}

impl LocationColumns {
    pub fn columns(&self) -> &[String] {
        match self {
            LocationColumns::Detected(c) | LocationColumns::Fallback(c) => c,
        }
    }

    /// `Registration_State` when offered, else the first candidate.
    pub fn preferred(&self) -> Option<&str> {
        let cols = self.columns();
        cols.iter()
            .find(|c| *c == "Registration_State")
            .or_else(|| cols.first())
            .map(String::as_str)
    }
}

pub fn location_columns(
    dataset: &Dataset,
    known_locations: &HashSet<String>,
    settings: &LocationDetection,
) -> Result<LocationColumns> {
    let detected = find_location_columns(
        dataset,
        known_locations,
        settings.sample_size,
        settings.threshold,
    );
    if !detected.is_empty() {
        return Ok(LocationColumns::Detected(detected));
    }

    tracing::warn!("no location column detected, falling back to categorical columns");
    let fallback: Vec<String> = dataset
        .columns_of_kind(ColumnKind::Text)
        .filter(|c| c.n_unique() < settings.fallback_max_unique)
        .map(|c| c.name.clone())
        .collect();
    if fallback.is_empty() {
        return Err(DashboardError::NoQualifyingColumns);
    }
    Ok(LocationColumns::Fallback(fallback))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn states() -> HashSet<String> {
        ["goa", "kerala", "assam", "punjab"].iter().map(|s| s.to_string()).collect()
    }

    fn dataset() -> Dataset {
        let col = |name: &str, cells: &[&str]| {
            Column::infer(name, cells.iter().map(|s| s.to_string()).collect())
        };
        Dataset::new(vec![
            col("Registration_State", &["Goa", "KERALA", "Assam", "Goa", "Punjab"]),
            col("Location", &["Goa", "Downtown", "Assam", "Goa", "Harbor"]),
            col("Driver_Age", &["30", "40", "50", "60", "70"]),
            col("Comments", &["", "", "", "", ""]),
        ])
        .unwrap()
    }

    #[test]
    fn test_detects_state_column_case_insensitively() {
        let found = find_location_columns(&dataset(), &states(), 20, 0.8);
        assert_eq!(found, vec!["Registration_State"]);
    }

    #[test]
    fn test_threshold_and_sample_size() {
        // Location: Goa, Downtown, Assam, Harbor -> 2 of 4.
        let found = find_location_columns(&dataset(), &states(), 20, 0.5);
        assert_eq!(found, vec!["Registration_State", "Location"]);
        // First unique value only.
        let found = find_location_columns(&dataset(), &states(), 1, 1.0);
        assert_eq!(found, vec!["Registration_State", "Location"]);
    }

    #[test]
    fn test_empty_vocabulary_matches_nothing() {
        assert!(find_location_columns(&dataset(), &HashSet::new(), 20, 0.8).is_empty());
    }

    #[test]
    fn test_numeric_and_all_null_columns_never_qualify() {
        let numeric_states: HashSet<String> = ["30", "40"].iter().map(|s| s.to_string()).collect();
        let found = find_location_columns(&dataset(), &numeric_states, 20, 0.0);
        assert!(!found.contains(&"Driver_Age".to_string()));
        assert!(!found.contains(&"Comments".to_string()));
    }

    #[test]
    fn test_fallback_and_preferred() {
        let settings = LocationDetection::default();
        let cols = location_columns(&dataset(), &HashSet::new(), &settings).unwrap();
        assert!(matches!(cols, LocationColumns::Fallback(_)));
        assert_eq!(cols.preferred(), Some("Registration_State"));

        let strict = LocationDetection {
            fallback_max_unique: 1,
            ..settings
        };
        assert!(matches!(
            location_columns(&dataset(), &HashSet::new(), &strict),
            Err(DashboardError::NoQualifyingColumns)
        ));
    }

    #[test]
    fn test_load_state_names() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("states.geojson");
        std::fs::write(
            &path,
            r#"{"type":"FeatureCollection","features":[
                {"type":"Feature","properties":{"STNAME_SH":"Goa"},"geometry":null},
                {"type":"Feature","properties":{"STNAME_SH":"Tamil Nadu"},"geometry":null}
            ]}"#,
        )
        .unwrap();
        let names = load_state_names(&path).unwrap();
        assert!(names.contains("goa"));
        assert!(names.contains("tamil nadu"));

        let missing = dir.path().join("absent.geojson");
        assert!(matches!(load_state_names(&missing), Err(DashboardError::GeoJson { .. })));
    }
}
