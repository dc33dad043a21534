//! The binder ranking procedure: standardize features, score every cell,
//! aggregate scores per (dextramer, clonotype) pair, suppress small-support
//! pairs, and order the survivors by a weighted composite of their minimum
//! and mean anomaly scores.

use anyhow::Result;
use dex_model::forest::{ForestParams, IsolationForest};
use dex_model::scale::{standardize, ColumnStats};
use dex_model::{AnomalyScorer, CellScore};
use dex_types::{CellRecord, CellTable, ConfigError, PairKey};
use itertools::Itertools;
use log::info;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Median};
use std::collections::HashMap;
use std::path::Path;

/// Ranking configuration. Weights need not sum to one; lower `final_score`
/// always means a stronger binder candidate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankerConfig {
    /// Pairs supported by this many cells or fewer are dropped, regardless
    /// of how extreme their scores are. Single-cell noise does not rank.
    pub minimum_support: usize,
    pub min_score_weight: f64,
    pub mean_score_weight: f64,
}

impl Default for RankerConfig {
    fn default() -> RankerConfig {
        RankerConfig {
            minimum_support: 1,
            min_score_weight: 0.7,
            mean_score_weight: 0.3,
        }
    }
}

impl RankerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.min_score_weight.is_finite() || !self.mean_score_weight.is_finite() {
            return Err(ConfigError::NonFiniteWeight {
                min_score_weight: self.min_score_weight,
                mean_score_weight: self.mean_score_weight,
            });
        }
        Ok(())
    }
}

/// A cell record augmented with its anomaly score and binder call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredCell {
    pub dextramer: String,
    pub raw_clonotype_id: Option<String>,
    pub dex_norm: f64,
    pub dex_enrich: f64,
    pub clonotype_count: f64,
    pub clonotype_enrichment: f64,
    pub binding_anomaly_score: f64,
    pub is_likely_binder: bool,
}

impl ScoredCell {
    fn new(record: CellRecord, score: CellScore) -> ScoredCell {
        ScoredCell {
            dextramer: record.dextramer,
            raw_clonotype_id: record.raw_clonotype_id,
            dex_norm: record.dex_norm,
            dex_enrich: record.dex_enrich,
            clonotype_count: record.clonotype_count,
            clonotype_enrichment: record.clonotype_enrichment,
            binding_anomaly_score: score.anomaly_score,
            is_likely_binder: score.likely_binder,
        }
    }

    /// The (dextramer, clonotype) key, or `None` for unassigned cells.
    pub fn pair_key(&self) -> Option<PairKey> {
        self.raw_clonotype_id.as_ref().map(|id| PairKey {
            dextramer: self.dextramer.clone(),
            raw_clonotype_id: id.clone(),
        })
    }
}

/// One ranked candidate binder pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairAggregate {
    pub dextramer: String,
    pub raw_clonotype_id: String,
    /// Number of supporting cells.
    pub count: usize,
    /// Supporting cells the scorer called likely binders.
    pub n_likely_binders: usize,
    pub mean_score: f64,
    pub median_score: f64,
    pub min_score: f64,
    pub final_score: f64,
}

/// Cell- and pair-level counts for one ranking run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RankingSummary {
    pub n_cells: usize,
    pub n_unassigned_cells: usize,
    pub n_pairs_total: usize,
    pub n_pairs_ranked: usize,
    pub n_pairs_dropped: usize,
}

/// Both deliverables of a ranking run: the augmented per-cell table (for
/// diagnostics) and the ranked pair table (the primary output), plus the
/// standardization statistics that were applied.
#[derive(Debug, Clone, PartialEq)]
pub struct BinderRanking {
    pub cells: Vec<ScoredCell>,
    pub pairs: Vec<PairAggregate>,
    pub column_stats: Vec<ColumnStats>,
    pub summary: RankingSummary,
}

/// Running score accumulator for one pair, in cell input order.
#[derive(Default)]
struct PairScores {
    scores: Vec<f64>,
    n_likely_binders: usize,
}

impl PairScores {
    fn observe(&mut self, cell: &ScoredCell) {
        self.scores.push(cell.binding_anomaly_score);
        self.n_likely_binders += usize::from(cell.is_likely_binder);
    }

    fn count(&self) -> usize {
        self.scores.len()
    }

    fn into_aggregate(self, key: PairKey, config: &RankerConfig) -> PairAggregate {
        let count = self.scores.len();
        let mean_score = self.scores.iter().sum::<f64>() / count as f64;
        let min_score = self.scores.iter().copied().fold(f64::INFINITY, f64::min);
        let median_score = Data::new(self.scores).median();
        PairAggregate {
            dextramer: key.dextramer,
            raw_clonotype_id: key.raw_clonotype_id,
            count,
            n_likely_binders: self.n_likely_binders,
            mean_score,
            median_score,
            min_score,
            final_score: config.min_score_weight * min_score
                + config.mean_score_weight * mean_score,
        }
    }
}

/// Rank candidate binder pairs in `table` using `scorer`.
///
/// The table is consumed and returned augmented with per-cell scores; the
/// input is never mutated in place. Feature columns are standardized from
/// the table's own statistics, the scorer is fitted on the standardized
/// matrix and then applied to it, and per-pair aggregates are built in
/// first-appearance order so that equal `final_score` ties keep a stable
/// ordering. An empty table yields an empty ranking, not an error.
pub fn rank_binders(
    table: CellTable,
    scorer: &mut dyn AnomalyScorer,
    config: &RankerConfig,
) -> Result<BinderRanking> {
    config.validate()?;

    let standardized = standardize(&table.feature_matrix());
    scorer.fit(standardized.matrix.view())?;
    let scores = scorer.score(standardized.matrix.view())?;

    let cells: Vec<ScoredCell> = table
        .into_records()
        .into_iter()
        .zip_eq(scores)
        .map(|(record, score)| ScoredCell::new(record, score))
        .collect();

    // Group in first-appearance order of the pair key.
    let mut groups: Vec<(PairKey, PairScores)> = Vec::new();
    let mut group_index: HashMap<PairKey, usize> = HashMap::new();
    let mut n_unassigned_cells = 0;
    for cell in &cells {
        let Some(key) = cell.pair_key() else {
            n_unassigned_cells += 1;
            continue;
        };
        let i = *group_index.entry(key.clone()).or_insert_with(|| {
            groups.push((key, PairScores::default()));
            groups.len() - 1
        });
        groups[i].1.observe(cell);
    }

    let n_pairs_total = groups.len();
    let mut pairs: Vec<PairAggregate> = groups
        .into_iter()
        .filter(|(_, scores)| scores.count() > config.minimum_support)
        .map(|(key, scores)| scores.into_aggregate(key, config))
        .collect();
    // stable: ties stay in first-appearance order
    pairs.sort_by_key(|pair| OrderedFloat(pair.final_score));

    let summary = RankingSummary {
        n_cells: cells.len(),
        n_unassigned_cells,
        n_pairs_total,
        n_pairs_ranked: pairs.len(),
        n_pairs_dropped: n_pairs_total - pairs.len(),
    };
    info!(
        "ranked {} of {} candidate pairs ({} at or below support threshold {})",
        summary.n_pairs_ranked, summary.n_pairs_total, summary.n_pairs_dropped,
        config.minimum_support
    );

    Ok(BinderRanking {
        cells,
        pairs,
        column_stats: standardized.columns,
        summary,
    })
}

/// Load one sample's cell table from CSV, fit an isolation forest on its
/// standardized features, and rank its binder pairs. Samples are independent;
/// standardization and fitting never share state across calls.
pub fn rank_sample(
    path: &Path,
    params: ForestParams,
    config: &RankerConfig,
) -> Result<BinderRanking> {
    let table = CellTable::from_csv(path)?;
    let mut forest = IsolationForest::new(params);
    rank_binders(table, &mut forest, config)
}
