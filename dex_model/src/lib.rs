//! Anomaly scoring over standardized per-cell feature matrices.
//!
//! The scoring model is a capability, not a concrete class: anything that can
//! fit on a standardized feature matrix and then emit one [`CellScore`] per
//! row can drive the binder ranking. [`forest::IsolationForest`] is the
//! default implementation.

pub mod forest;
pub mod scale;

use anyhow::Result;
use ndarray::ArrayView2;
use serde::Serialize;

/// Per-cell output of an anomaly scorer. Lower `anomaly_score` means more
/// outlier-like relative to the bulk of cells; a negative score marks the
/// cell as a likely binder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CellScore {
    pub anomaly_score: f64,
    pub likely_binder: bool,
}

/// Capability provided by any anomaly-detection model: fit on a standardized
/// cells-by-features matrix, then produce one score and one binary call per
/// row. Implementations must be deterministic given their seed.
pub trait AnomalyScorer {
    /// Fit (or refit) the model on `features`. Fitting twice on the same
    /// input must leave the model in the same state.
    fn fit(&mut self, features: ArrayView2<'_, f64>) -> Result<()>;

    /// Score every row of `features`, in row order.
    fn score(&self, features: ArrayView2<'_, f64>) -> Result<Vec<CellScore>>;
}
