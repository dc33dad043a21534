//! Ranking of candidate (dextramer, clonotype) binder pairs from per-cell
//! anomaly scores. The primary entry points are [`rank_binders`] for an
//! in-memory table with any [`dex_model::AnomalyScorer`], and [`rank_sample`]
//! for the one-call per-sample workflow (CSV in, isolation forest, ranked
//! pairs out).

pub mod output;
mod rank;

pub use output::{write_cells_csv, write_pairs_csv, write_summary_json};
pub use rank::{
    rank_binders, rank_sample, BinderRanking, PairAggregate, RankerConfig, RankingSummary,
    ScoredCell,
};
