use std::path::PathBuf;

/// Validation failures raised while loading a per-cell feature table. All of
/// these are detected before any scoring happens; feature values are never
/// silently coerced.
#[derive(Debug, thiserror::Error)]
pub enum FeatureDataError {
    #[error(
        "The cell table {path:?} must contain a column named '{column}', but it was not found. \
         Please check the headers in the CSV file."
    )]
    MissingColumn { path: PathBuf, column: String },

    #[error(
        "The column '{column}' in line {line} of the cell table {path:?} is empty, \
         which is not allowed."
    )]
    EmptyField {
        path: PathBuf,
        column: String,
        line: usize,
    },

    #[error(
        "Error in the cell table {path:?}. On line {line} in the '{column}' column: \
         expected a number but received '{value}'."
    )]
    InvalidNumber {
        path: PathBuf,
        column: String,
        line: usize,
        value: String,
    },

    #[error(
        "Error in the cell table {path:?}. On line {line} in the '{column}' column: \
         the value '{value}' is not finite. NaN and infinite feature values cannot be scored."
    )]
    NonFiniteNumber {
        path: PathBuf,
        column: String,
        line: usize,
        value: f64,
    },
}

/// Configuration problems detected before any processing begins.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error(
        "Score weights must be finite: min_score_weight={min_score_weight}, \
         mean_score_weight={mean_score_weight}."
    )]
    NonFiniteWeight {
        min_score_weight: f64,
        mean_score_weight: f64,
    },

    #[error("An isolation forest requires at least one tree.")]
    ZeroTrees,

    #[error("The per-tree subsample size must be at least one cell.")]
    ZeroSampleSize,

    #[error("The anomaly model has not been fitted. Call fit() before score().")]
    ModelNotFitted,
}
