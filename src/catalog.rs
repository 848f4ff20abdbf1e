//! Dataset discovery across the source tiers.

use std::collections::HashMap;
use std::fmt;
use std::fs::DirEntry;
use std::path::{Path, PathBuf};

use crate::config::DatasetRoots;
use crate::error::{DashboardError, Result};

/// Where a dataset came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Sample,
    Generated,
    Legacy,
    OtherParty,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tier::Sample => "Sample",
            Tier::Generated => "Fake Generated",
            Tier::Legacy => "Legacy",
            Tier::OtherParty => "Other CSVs",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub label: String,
    pub path: PathBuf,
    pub tier: Tier,
    /// Date-stamped batch directory, generated tier only.
    pub batch: Option<String>,
}

/// Label -> dataset mapping in scan order.
///
/// A label scanned twice keeps its first position but points at the later
/// path. Overwrites are counted so callers can surface them.
#[derive(Debug, Clone, Default)]
pub struct DatasetCatalog {
    entries: Vec<CatalogEntry>,
    index: HashMap<String, usize>,
    collisions: usize,
}

impl DatasetCatalog {
    pub fn insert(&mut self, entry: CatalogEntry) {
        match self.index.get(&entry.label) {
            Some(&pos) => {
                tracing::warn!(
                    label = %entry.label,
                    replaced = %self.entries[pos].path.display(),
                    with = %entry.path.display(),
                    "duplicate dataset label, keeping the later path"
                );
                self.collisions += 1;
                self.entries[pos] = entry;
            }
            None => {
                self.index.insert(entry.label.clone(), self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.label.as_str())
    }

    pub fn get(&self, label: &str) -> Option<&CatalogEntry> {
        self.index.get(label).map(|&pos| &self.entries[pos])
    }

    pub fn resolve(&self, label: &str) -> Result<&Path> {
        self.get(label)
            .map(|e| e.path.as_path())
            .ok_or_else(|| DashboardError::NotFound {
                label: label.to_string(),
            })
    }

    /// Number of entries silently replaced by a later scan.
    pub fn collision_count(&self) -> usize {
        self.collisions
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Scan every tier in priority order: sample, generated, legacy,
/// other-party, then the legacy upload tree. Missing directories are skipped.
pub fn list_datasets(roots: &DatasetRoots) -> Result<DatasetCatalog> {
    let mut catalog = DatasetCatalog::default();

    if roots.sample_dir.is_dir() {
        for path in list_csv_files(&roots.sample_dir)? {
            catalog.insert(CatalogEntry {
                label: format!("{} [{}]", file_name(&path), Tier::Sample),
                path,
                tier: Tier::Sample,
                batch: None,
            });
        }
    }

    scan_generated(&roots.generated_dir, &mut catalog)?;
    scan_tier(&roots.legacy_dir, Tier::Legacy, &mut catalog)?;
    scan_tier(&roots.other_party_dir, Tier::OtherParty, &mut catalog)?;

    if roots.legacy_upload_root.is_dir() {
        walk_legacy_uploads(&roots.legacy_upload_root, &mut catalog)?;
    }

    tracing::debug!(
        datasets = catalog.len(),
        collisions = catalog.collision_count(),
        "dataset catalog built"
    );
    Ok(catalog)
}

/// Date-stamped batch directories, most recent first.
fn scan_generated(dir: &Path, catalog: &mut DatasetCatalog) -> Result<()> {
    if !dir.is_dir() {
        return Ok(());
    }
    let mut batches = list_subdirs(dir)?;
    batches.sort_by(|a, b| b.file_name().cmp(&a.file_name()));

    for batch_dir in batches {
        let batch = file_name(&batch_dir);
        for path in list_csv_files(&batch_dir)? {
            catalog.insert(CatalogEntry {
                label: format!("{} [{} - {}]", file_name(&path), Tier::Generated, batch),
                path,
                tier: Tier::Generated,
                batch: Some(batch.clone()),
            });
        }
    }
    Ok(())
}

fn scan_tier(dir: &Path, tier: Tier, catalog: &mut DatasetCatalog) -> Result<()> {
    if !dir.is_dir() {
        return Ok(());
    }
    for path in list_csv_files(dir)? {
        catalog.insert(CatalogEntry {
            label: format!("{} [{}]", file_name(&path), tier),
            path,
            tier,
            batch: None,
        });
    }
    Ok(())
}

/// Top-down walk: a directory's own files, then each subdirectory.
fn walk_legacy_uploads(dir: &Path, catalog: &mut DatasetCatalog) -> Result<()> {
    let parent = file_name(dir);
    for path in list_csv_files(dir)? {
        catalog.insert(CatalogEntry {
            label: format!("[{}] {}/{}", Tier::Legacy, parent, file_name(&path)),
            path,
            tier: Tier::Legacy,
            batch: None,
        });
    }
    // Symlinked directories are not followed, so a link cycle cannot recurse.
    let mut subdirs: Vec<PathBuf> = read_dir_entries(dir)?
        .into_iter()
        .filter(|e| e.file_type().is_ok_and(|t| t.is_dir()))
        .map(|e| e.path())
        .collect();
    subdirs.sort();
    for sub in subdirs {
        walk_legacy_uploads(&sub, catalog)?;
    }
    Ok(())
}

/// CSV files directly in `dir`, sorted by file name.
pub fn list_csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = read_entries(dir)?
        .into_iter()
        .filter(|p| p.is_file() && is_csv(p))
        .collect();
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

fn list_subdirs(dir: &Path) -> Result<Vec<PathBuf>> {
    Ok(read_entries(dir)?.into_iter().filter(|p| p.is_dir()).collect())
}

fn read_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    Ok(read_dir_entries(dir)?.iter().map(DirEntry::path).collect())
}

fn read_dir_entries(dir: &Path) -> Result<Vec<DirEntry>> {
    let read_err = |e| DashboardError::DirectoryRead {
        path: dir.to_path_buf(),
        source: e,
    };
    std::fs::read_dir(dir)
        .map_err(read_err)?
        .map(|entry| entry.map_err(read_err))
        .collect()
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("csv"))
        .unwrap_or(false)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
