//! Strict loading of per-cell feature tables from CSV. Header presence and
//! per-field numeric validity are checked up front so that scoring never sees
//! a silently-coerced value.

use crate::errors::FeatureDataError;
use crate::types::{CellRecord, CLONOTYPE_COLUMN, DEXTRAMER_COLUMN, FEATURE_COLUMNS};
use anyhow::{Context, Result};
use csv::StringRecord;
use itertools::Itertools;
use ndarray::Array2;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Clonotype field value marking an unassigned cell.
const UNASSIGNED_CLONOTYPE: &str = "None";

/// An owned, validated table of cell records for one sample.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CellTable {
    records: Vec<CellRecord>,
}

impl CellTable {
    pub fn new(records: Vec<CellRecord>) -> CellTable {
        CellTable { records }
    }

    /// Load a cell table from a CSV file with the columns `dextramer`,
    /// `raw_clonotype_id` and the four feature columns. A header-only file
    /// yields an empty table, not an error.
    pub fn from_csv(path: &Path) -> Result<CellTable> {
        let file = File::open(path).with_context(|| path.display().to_string())?;
        Self::from_reader(BufReader::new(file), path)
    }

    /// Load a cell table from any reader; `path` is only used in error
    /// messages.
    pub fn from_reader(reader: impl Read, path: &Path) -> Result<CellTable> {
        let mut rdr = csv::Reader::from_reader(reader);

        let mut headers = rdr.headers()?.clone();
        headers.trim();
        let headers: Vec<String> = headers.iter().map(String::from).collect();
        let col_map = check_headers(path, &headers)?;

        let records = rdr
            .records()
            .enumerate()
            .map(|(i, row)| -> Result<CellRecord> {
                let mut row = row?;
                row.trim();
                parse_row(path, &col_map, i + 1, &row)
            })
            .try_collect()?;

        Ok(CellTable { records })
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[CellRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<CellRecord> {
        self.records
    }

    /// The numeric features as a cells-by-features matrix, columns in
    /// `FEATURE_COLUMNS` order.
    pub fn feature_matrix(&self) -> Array2<f64> {
        let mut matrix = Array2::zeros((self.records.len(), FEATURE_COLUMNS.len()));
        for (i, record) in self.records.iter().enumerate() {
            for (j, value) in record.features().into_iter().enumerate() {
                matrix[[i, j]] = value;
            }
        }
        matrix
    }
}

fn check_headers(path: &Path, headers: &[String]) -> Result<HashMap<String, usize>> {
    for required in FEATURE_COLUMNS
        .into_iter()
        .chain([DEXTRAMER_COLUMN, CLONOTYPE_COLUMN])
    {
        if !headers.iter().any(|h| h.as_str() == required) {
            return Err(FeatureDataError::MissingColumn {
                path: path.to_path_buf(),
                column: required.to_string(),
            }
            .into());
        }
    }
    Ok(headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.clone(), i))
        .collect())
}

fn field<'a>(row: &'a StringRecord, col_map: &HashMap<String, usize>, column: &str) -> &'a str {
    row.get(col_map[column]).unwrap_or("").trim()
}

fn parse_row(
    path: &Path,
    col_map: &HashMap<String, usize>,
    line: usize,
    row: &StringRecord,
) -> Result<CellRecord> {
    let dextramer = field(row, col_map, DEXTRAMER_COLUMN);
    if dextramer.is_empty() {
        return Err(empty_field(path, DEXTRAMER_COLUMN, line).into());
    }

    let raw_clonotype_id = match field(row, col_map, CLONOTYPE_COLUMN) {
        "" | UNASSIGNED_CLONOTYPE => None,
        id => Some(id.to_string()),
    };

    let features: Vec<f64> = FEATURE_COLUMNS
        .iter()
        .map(|&column| parse_feature(path, column, line, field(row, col_map, column)))
        .try_collect()?;

    Ok(CellRecord {
        dextramer: dextramer.to_string(),
        raw_clonotype_id,
        dex_norm: features[0],
        dex_enrich: features[1],
        clonotype_count: features[2],
        clonotype_enrichment: features[3],
    })
}

fn parse_feature(path: &Path, column: &str, line: usize, value: &str) -> Result<f64> {
    if value.is_empty() {
        return Err(empty_field(path, column, line).into());
    }
    let parsed: f64 = value.parse().map_err(|_| FeatureDataError::InvalidNumber {
        path: path.to_path_buf(),
        column: column.to_string(),
        line,
        value: value.to_string(),
    })?;
    if !parsed.is_finite() {
        return Err(FeatureDataError::NonFiniteNumber {
            path: path.to_path_buf(),
            column: column.to_string(),
            line,
            value: parsed,
        }
        .into());
    }
    Ok(parsed)
}

fn empty_field(path: &Path, column: &str, line: usize) -> FeatureDataError {
    FeatureDataError::EmptyField {
        path: path.to_path_buf(),
        column: column.to_string(),
        line,
    }
}
