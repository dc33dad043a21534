use serde::Serialize;

/// Column holding the dextramer reagent label (controls included).
pub const DEXTRAMER_COLUMN: &str = "dextramer";

/// Column holding the clonotype assignment. Cells without an assignment carry
/// an empty field or the literal string "None".
pub const CLONOTYPE_COLUMN: &str = "raw_clonotype_id";

/// The fixed, ordered set of numeric feature columns. The feature matrix
/// handed to scoring uses this column order.
pub const FEATURE_COLUMNS: [&str; 4] = [
    "dex_norm",
    "dex_enrich",
    "clonotype_count",
    "clonotype_enrichment",
];

/// One row of the per-cell input table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellRecord {
    pub dextramer: String,
    pub raw_clonotype_id: Option<String>,
    pub dex_norm: f64,
    pub dex_enrich: f64,
    pub clonotype_count: f64,
    pub clonotype_enrichment: f64,
}

impl CellRecord {
    /// Feature values in `FEATURE_COLUMNS` order.
    pub fn features(&self) -> [f64; FEATURE_COLUMNS.len()] {
        [
            self.dex_norm,
            self.dex_enrich,
            self.clonotype_count,
            self.clonotype_enrichment,
        ]
    }

    /// The (dextramer, clonotype) aggregation key, or `None` for cells
    /// without a clonotype assignment. Unassigned cells are scored but never
    /// contribute to a pair.
    pub fn pair_key(&self) -> Option<PairKey> {
        self.raw_clonotype_id.as_ref().map(|id| PairKey {
            dextramer: self.dextramer.clone(),
            raw_clonotype_id: id.clone(),
        })
    }
}

/// Identity of one candidate binder: a dextramer reagent paired with a
/// clonotype.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct PairKey {
    pub dextramer: String,
    pub raw_clonotype_id: String,
}

impl std::fmt::Display for PairKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.dextramer, self.raw_clonotype_id)
    }
}
