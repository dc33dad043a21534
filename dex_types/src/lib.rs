//! Shared data model for dextramer/clonotype binder ranking: per-cell
//! records, the fixed feature column set, strict CSV loading and the typed
//! errors surfaced to callers.

pub mod cell_table;
pub mod errors;
pub mod types;

pub use cell_table::CellTable;
pub use errors::{ConfigError, FeatureDataError};
pub use types::{CellRecord, PairKey, CLONOTYPE_COLUMN, DEXTRAMER_COLUMN, FEATURE_COLUMNS};
