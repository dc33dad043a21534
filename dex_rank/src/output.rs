//! Tabular sinks for the two ranking deliverables. Both writers take any
//! `io::Write`, so callers can target files, pipes or in-memory buffers.

use crate::rank::{PairAggregate, RankingSummary, ScoredCell};
use anyhow::Result;
use std::io::Write;

/// Write the ranked pair table as CSV, best candidate first.
pub fn write_pairs_csv<W: Write>(pairs: &[PairAggregate], writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for pair in pairs {
        wtr.serialize(pair)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write the augmented per-cell table as CSV, in input row order.
pub fn write_cells_csv<W: Write>(cells: &[ScoredCell], writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for cell in cells {
        wtr.serialize(cell)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write the run summary counts as pretty-printed JSON.
pub fn write_summary_json<W: Write>(summary: &RankingSummary, mut writer: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, summary)?;
    writeln!(writer)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_pairs_csv() {
        let pairs = vec![PairAggregate {
            dextramer: "NeoAg01".to_string(),
            raw_clonotype_id: "clonotype3".to_string(),
            count: 7,
            n_likely_binders: 5,
            mean_score: -0.12,
            median_score: -0.1,
            min_score: -0.4,
            final_score: -0.316,
        }];
        let mut buf = Vec::new();
        write_pairs_csv(&pairs, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text.lines().next().unwrap(),
            "dextramer,raw_clonotype_id,count,n_likely_binders,mean_score,median_score,min_score,final_score"
        );
        assert!(text.lines().nth(1).unwrap().starts_with("NeoAg01,clonotype3,7,5,"));
    }

    #[test]
    fn test_write_cells_csv_empty_clonotype_field() {
        let cells = vec![ScoredCell {
            dextramer: "NegCtrl".to_string(),
            raw_clonotype_id: None,
            dex_norm: 0.1,
            dex_enrich: 0.2,
            clonotype_count: 1.0,
            clonotype_enrichment: 0.0,
            binding_anomaly_score: 0.2,
            is_likely_binder: false,
        }];
        let mut buf = Vec::new();
        write_cells_csv(&cells, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        // unassigned clonotype serializes as an empty field
        assert!(text.lines().nth(1).unwrap().starts_with("NegCtrl,,0.1,"));
    }

    #[test]
    fn test_write_summary_json() {
        let summary = RankingSummary {
            n_cells: 10,
            n_unassigned_cells: 2,
            n_pairs_total: 4,
            n_pairs_ranked: 3,
            n_pairs_dropped: 1,
        };
        let mut buf = Vec::new();
        write_summary_json(&summary, &mut buf).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["n_pairs_ranked"], 3);
    }
}
