//! Runtime configuration: dataset roots, analysis defaults, output paths.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{DashboardError, Result};

/// Env var that rebases every relative directory in the config.
pub const ROOT_ENV_VAR: &str = "TRAFFIC_DASHBOARD_ROOT";

/// Directories scanned for datasets, one per source tier.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct DatasetRoots {
    pub sample_dir: PathBuf,
    pub generated_dir: PathBuf,
    pub legacy_dir: PathBuf,
    pub other_party_dir: PathBuf,
    pub legacy_upload_root: PathBuf,
}

impl Default for DatasetRoots {
    fn default() -> Self {
        Self {
            sample_dir: PathBuf::from("dataset"),
            generated_dir: PathBuf::from("generated_fake_traffic_datasets"),
            legacy_dir: PathBuf::from("related_uploads"),
            other_party_dir: PathBuf::from("other_party_uploads"),
            legacy_upload_root: PathBuf::from("uploaded_datasets"),
        }
    }
}

impl DatasetRoots {
    /// All roots under one base directory, using the default names.
    pub fn under(base: &Path) -> Self {
        Self::default().rebased(base)
    }

    fn rebased(self, base: &Path) -> Self {
        Self {
            sample_dir: rebase(base, self.sample_dir),
            generated_dir: rebase(base, self.generated_dir),
            legacy_dir: rebase(base, self.legacy_dir),
            other_party_dir: rebase(base, self.other_party_dir),
            legacy_upload_root: rebase(base, self.legacy_upload_root),
        }
    }
}

/// Parameters for the location column heuristic.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(default)]
pub struct LocationDetection {
    /// How many unique values are checked per column.
    pub sample_size: usize,
    /// Minimum share of sampled values that must be known locations.
    pub threshold: f64,
    /// Fallback columns must have fewer unique values than this.
    pub fallback_max_unique: usize,
}

impl Default for LocationDetection {
    fn default() -> Self {
        Self {
            sample_size: 20,
            threshold: 0.8,
            fallback_max_unique: 50,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct DashboardConfig {
    pub roots: DatasetRoots,
    pub geojson_path: PathBuf,
    pub output_dir: PathBuf,
    pub default_window_days: u32,
    pub min_window_days: u32,
    pub max_window_days: u32,
    pub location: LocationDetection,
    pub log_level: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            roots: DatasetRoots::default(),
            geojson_path: PathBuf::from("map_data").join("01_INDIA_STATES.geojson"),
            output_dir: PathBuf::from("reports"),
            default_window_days: 30,
            min_window_days: 7,
            max_window_days: 365,
            location: LocationDetection::default(),
            log_level: "info".to_string(),
        }
    }
}

impl DashboardConfig {
    /// Load from an optional JSON file, then apply the root env override.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        Ok(match std::env::var_os(ROOT_ENV_VAR) {
            Some(base) => config.rebased(Path::new(&base)),
            None => config,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| DashboardError::io(path, e))?;
        serde_json::from_str(&text).map_err(|e| DashboardError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    pub fn rebased(self, base: &Path) -> Self {
        Self {
            roots: self.roots.rebased(base),
            geojson_path: rebase(base, self.geojson_path),
            output_dir: rebase(base, self.output_dir),
            ..self
        }
    }

    pub fn window_in_bounds(&self, days: u32) -> bool {
        (self.min_window_days..=self.max_window_days).contains(&days)
    }
}

fn rebase(base: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DashboardConfig::default();
        assert_eq!(config.default_window_days, 30);
        assert_eq!(config.location.sample_size, 20);
        assert_eq!(config.location.threshold, 0.8);
        assert!(config.window_in_bounds(7));
        assert!(config.window_in_bounds(365));
        assert!(!config.window_in_bounds(6));
        assert!(!config.window_in_bounds(366));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: DashboardConfig =
            serde_json::from_str(r#"{"default_window_days": 90, "location": {"threshold": 0.5}}"#)
                .unwrap();
        assert_eq!(config.default_window_days, 90);
        assert_eq!(config.location.threshold, 0.5);
        assert_eq!(config.location.sample_size, 20);
        assert_eq!(config.roots, DatasetRoots::default());
    }

    #[test]
    fn test_rebased_leaves_absolute_paths() {
        let mut config = DashboardConfig::default();
        config.output_dir = PathBuf::from("/tmp/out");
        let config = config.rebased(Path::new("/srv/dash"));
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.roots.sample_dir, PathBuf::from("/srv/dash/dataset"));
    }

    #[test]
    fn test_from_file_reports_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = DashboardConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, DashboardError::Config { .. }));
    }
}
