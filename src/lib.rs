//! Traffic-violation dashboard engine.
//!
//! Pipeline: discover datasets ([`catalog`]), load them through a cache
//! ([`loader`]), check the required columns ([`schema`]), narrow to a date
//! window ([`temporal`]), aggregate ([`aggregate`], [`insights`]) and turn the
//! results into declarative chart descriptions ([`charts`]) for export
//! ([`output`]).

pub mod aggregate;
pub mod catalog;
pub mod charts;
pub mod config;
pub mod error;
pub mod insights;
pub mod loader;
pub mod location;
pub mod logging;
pub mod output;
pub mod schema;
pub mod temporal;
pub mod types;
pub mod util;

pub use aggregate::{Dimension, Reducer, SortOrder, TimeBucket, WideTable};
pub use catalog::{list_datasets, CatalogEntry, DatasetCatalog, Tier};
pub use config::DashboardConfig;
pub use error::{DashboardError, Result};
pub use loader::{shared_cache, CachePolicy, Clock, DatasetCache, SystemClock};
pub use schema::{validate, ValidatedDataset, ViolationRecord, REQUIRED_SCHEMA};
pub use temporal::DateWindow;
pub use types::{Column, ColumnKind, Dataset, Value};
