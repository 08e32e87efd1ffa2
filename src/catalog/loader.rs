//! CSV ingestion.
//!
//! Rows with an empty, unparseable, or non-finite value in any required
//! column are skipped and counted. A missing column or a structurally
//! malformed file fails the whole load.

use std::io;

use csv::StringRecord;

use super::record::{Record, SkyCoordinate};
use super::schema::{ALPHA, BANDS, CLASS, DELTA, MISSING_MAGNITUDE, REDSHIFT, REQUIRED_COLUMNS};
use crate::core::{EngineError, Result};

/// Positions of the required columns in the header row.
#[derive(Debug)]
struct ColumnIndex {
    bands: [usize; 5],
    redshift: usize,
    alpha: usize,
    delta: usize,
    class: usize,
}

impl ColumnIndex {
    fn from_headers(headers: &StringRecord, source_name: &str) -> Result<Self> {
        let position = |name: &str| headers.iter().position(|h| h == name);

        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|name| position(*name).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(EngineError::data_load(
                source_name,
                format!(
                    "missing required columns {:?}; available columns: {:?}",
                    missing,
                    headers.iter().collect::<Vec<_>>()
                ),
            ));
        }

        // Every lookup below is known to succeed.
        let idx = |name: &str| position(name).unwrap_or_default();
        Ok(Self {
            bands: BANDS.map(idx),
            redshift: idx(REDSHIFT),
            alpha: idx(ALPHA),
            delta: idx(DELTA),
            class: idx(CLASS),
        })
    }
}

/// Rows read from a source.
#[derive(Debug)]
pub(crate) struct LoadedRows {
    pub records: Vec<Record>,
    pub skipped: usize,
}

/// Read every row of a CSV source.
pub(crate) fn read_csv<R: io::Read>(reader: R, source_name: &str) -> Result<LoadedRows> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| EngineError::data_load(source_name, format!("failed to read headers: {e}")))?
        .clone();
    let columns = ColumnIndex::from_headers(&headers, source_name)?;

    let mut records = Vec::new();
    let mut skipped = 0;

    for (line, row) in reader.records().enumerate() {
        let row = row.map_err(|e| {
            EngineError::data_load(source_name, format!("malformed row {}: {e}", line + 2))
        })?;

        match parse_row(&row, &columns) {
            Some(record) => records.push(record),
            None => {
                log::debug!("[CATALOG] skipping incomplete row {} in {}", line + 2, source_name);
                skipped += 1;
            }
        }
    }

    Ok(LoadedRows { records, skipped })
}

fn parse_row(row: &StringRecord, columns: &ColumnIndex) -> Option<Record> {
    let class = row.get(columns.class).filter(|c| !c.is_empty())?;
    let redshift = parse_finite(row, columns.redshift)?;
    let coordinate = SkyCoordinate::new(
        parse_finite(row, columns.alpha)?,
        parse_finite(row, columns.delta)?,
    );

    let mut record = Record::new(class, redshift, coordinate);
    for (band, &idx) in BANDS.iter().zip(columns.bands.iter()) {
        let value = parse_finite(row, idx).filter(|&v| v != MISSING_MAGNITUDE)?;
        record = record.with_magnitude(*band, value);
    }
    Some(record)
}

fn parse_finite(row: &StringRecord, idx: usize) -> Option<f64> {
    row.get(idx)?
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}
