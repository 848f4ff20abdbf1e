use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use csv::ReaderBuilder;
use once_cell::sync::Lazy;

use crate::error::{DashboardError, Result};
use crate::types::{Column, Dataset};

/// Parse a delimited text file into a dataset, inferring column kinds.
///
/// Short rows are padded with nulls; rows longer than the header are a
/// parse error.
pub fn read_dataset(path: &Path) -> Result<Dataset> {
    let parse_err = |message: String| DashboardError::Parse {
        path: path.to_path_buf(),
        message,
    };

    let file = std::fs::File::open(path).map_err(|e| DashboardError::io(path, e))?;
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(file);

    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| parse_err(e.to_string()))?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();
    if headers.is_empty() || headers.iter().all(String::is_empty) {
        return Err(parse_err("no columns to parse from file".to_string()));
    }

    let mut raw: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    for (line, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| parse_err(e.to_string()))?;
        if record.len() > headers.len() {
            return Err(parse_err(format!(
                "expected {} fields in record {}, saw {}",
                headers.len(),
                line + 1,
                record.len()
            )));
        }
        for (i, cells) in raw.iter_mut().enumerate() {
            cells.push(record.get(i).unwrap_or_default().to_string());
        }
    }

    let columns = headers
        .into_iter()
        .zip(raw)
        .map(|(name, cells)| Column::infer(name, cells))
        .collect();
    let dataset = Dataset::new(columns)?;
    tracing::debug!(
        path = %path.display(),
        rows = dataset.height(),
        columns = dataset.width(),
        "parsed dataset"
    );
    Ok(dataset)
}

/// Time source for cache staleness decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CachePolicy {
    /// Entries live until invalidated or the process exits.
    #[default]
    NeverExpire,
    /// Entries older than this are re-read on next access.
    ExpireAfter(Duration),
}

struct CacheEntry {
    dataset: Dataset,
    loaded_at: DateTime<Utc>,
}

/// Path-keyed dataset cache.
///
/// The cached dataset is never handed out: every `load` returns a deep copy
/// the caller owns outright.
pub struct DatasetCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    clock: Arc<dyn Clock>,
    policy: CachePolicy,
}

impl Default for DatasetCache {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock), CachePolicy::NeverExpire)
    }
}

impl DatasetCache {
    pub fn new(clock: Arc<dyn Clock>, policy: CachePolicy) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
            policy,
        }
    }

    pub fn load(&self, path: &Path) -> Result<Dataset> {
        let key = path.to_string_lossy().into_owned();
        let now = self.clock.now();

        if let Some(entry) = self.lock().get(&key) {
            if self.is_fresh(entry, now) {
                tracing::debug!(path = %key, "dataset cache hit");
                return Ok(entry.dataset.clone());
            }
            tracing::debug!(path = %key, "dataset cache entry expired");
        }

        let dataset = read_dataset(path)?;
        tracing::debug!(path = %key, "dataset cache miss, stored");
        self.lock().insert(
            key,
            CacheEntry {
                dataset: dataset.clone(),
                loaded_at: now,
            },
        );
        Ok(dataset)
    }

    pub fn invalidate(&self, path: &Path) -> bool {
        self.lock().remove(&*path.to_string_lossy()).is_some()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_fresh(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        match self.policy {
            CachePolicy::NeverExpire => true,
            CachePolicy::ExpireAfter(ttl) => now - entry.loaded_at < ttl,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        // A panic while holding the lock cannot leave a half-written entry.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

static SHARED_CACHE: Lazy<DatasetCache> = Lazy::new(DatasetCache::default);

/// Process-wide cache used by the binary.
pub fn shared_cache() -> &'static DatasetCache {
    &SHARED_CACHE
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Value;
    use std::sync::Mutex as StdMutex;
    use tempfile::TempDir;

    struct ManualClock(StdMutex<DateTime<Utc>>);

    impl ManualClock {
        fn advance(&self, by: Duration) {
            let mut now = self.0.lock().unwrap();
            *now += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    fn write(dir: &TempDir, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_read_dataset_infers_and_pads() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "d.csv", "id,fine,state\n1,500,Goa\n2,NA\n");
        let ds = read_dataset(&path).unwrap();
        assert_eq!(ds.height(), 2);
        assert_eq!(ds.column("fine").unwrap().values, vec![Value::Int(500), Value::Null]);
        assert_eq!(ds.column("state").unwrap().values[1], Value::Null);
    }

    #[test]
    fn test_read_dataset_errors() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.csv");
        assert!(matches!(read_dataset(&missing), Err(DashboardError::Io { .. })));

        let empty = write(&dir, "empty.csv", "");
        assert!(matches!(read_dataset(&empty), Err(DashboardError::Parse { .. })));

        let long = write(&dir, "long.csv", "a,b\n1,2,3\n");
        assert!(matches!(read_dataset(&long), Err(DashboardError::Parse { .. })));
    }

    #[test]
    fn test_loads_are_independent_copies() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "d.csv", "state\nGoa\n");
        let cache = DatasetCache::default();

        let mut first = cache.load(&path).unwrap();
        first.column_mut("state").unwrap().values[0] = Value::Text("Kerala".into());
        let second = cache.load(&path).unwrap();

        assert_eq!(second.column("state").unwrap().values[0], Value::Text("Goa".into()));
        assert_ne!(first, second);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_never_expire_serves_stale_content() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "d.csv", "n\n1\n");
        let cache = DatasetCache::default();
        cache.load(&path).unwrap();

        std::fs::write(&path, "n\n1\n2\n").unwrap();
        assert_eq!(cache.load(&path).unwrap().height(), 1);

        assert!(cache.invalidate(&path));
        assert_eq!(cache.load(&path).unwrap().height(), 2);
    }

    #[test]
    fn test_expire_after_uses_injected_clock() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "d.csv", "n\n1\n");
        let clock = Arc::new(ManualClock(StdMutex::new(Utc::now())));
        let cache =
            DatasetCache::new(clock.clone(), CachePolicy::ExpireAfter(Duration::minutes(5)));
        cache.load(&path).unwrap();

        std::fs::write(&path, "n\n1\n2\n").unwrap();
        clock.advance(Duration::minutes(4));
        assert_eq!(cache.load(&path).unwrap().height(), 1);

        clock.advance(Duration::minutes(2));
        assert_eq!(cache.load(&path).unwrap().height(), 2);
    }
}
