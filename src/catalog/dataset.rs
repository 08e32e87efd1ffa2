//! The in-memory catalog.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io;
use std::path::Path;

use super::loader::read_csv;
use super::record::{ClassLabel, Record};
use super::schema::{BANDS, MISSING_MAGNITUDE};
use crate::core::{EngineError, GameRng, Result};

/// Labeled dataset, loaded once and read-only afterwards.
///
/// Every record held has all bands, redshift, coordinates and a class.
/// Incomplete rows are dropped at construction and counted in
/// [`Catalog::skipped_rows`].
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    records: Vec<Record>,
    classes: Vec<ClassLabel>,
    skipped: usize,
}

impl Catalog {
    /// Load a CSV catalog from disk.
    ///
    /// # Errors
    ///
    /// `DataLoad` if the file cannot be opened, a required column is
    /// missing, or a row is malformed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source_name = path.display().to_string();
        let file = File::open(path).map_err(|e| EngineError::data_load(&source_name, e))?;
        Self::read(file, &source_name)
    }

    /// Load a CSV catalog from any reader.
    ///
    /// # Errors
    ///
    /// Same as [`Catalog::load`].
    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self> {
        Self::read(reader, "<reader>")
    }

    fn read<R: io::Read>(reader: R, source_name: &str) -> Result<Self> {
        let rows = read_csv(reader, source_name)?;
        let mut catalog = Self::from_records(rows.records);
        catalog.skipped += rows.skipped;

        log::info!(
            "[CATALOG] loaded {} records from {} ({} classes)",
            catalog.len(),
            source_name,
            catalog.classes.len()
        );
        if catalog.skipped > 0 {
            log::warn!(
                "[CATALOG] excluded {} incomplete rows from {}",
                catalog.skipped,
                source_name
            );
        }
        Ok(catalog)
    }

    /// Build a catalog from records, dropping incomplete ones.
    pub fn from_records(records: impl IntoIterator<Item = Record>) -> Self {
        let mut kept = Vec::new();
        let mut skipped = 0;
        for record in records {
            if is_complete(&record) {
                kept.push(record);
            } else {
                skipped += 1;
            }
        }

        let classes = kept
            .iter()
            .map(|r| r.class().clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        Self {
            records: kept,
            classes,
            skipped,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    /// Distinct class labels in sorted order. These are the guess options.
    #[must_use]
    pub fn classes(&self) -> &[ClassLabel] {
        &self.classes
    }

    /// Whether `label` is one of the catalog's classes.
    #[must_use]
    pub fn has_class(&self, label: &str) -> bool {
        self.classes.iter().any(|c| c == label)
    }

    /// Number of records per class.
    #[must_use]
    pub fn class_counts(&self) -> BTreeMap<ClassLabel, usize> {
        let mut counts = BTreeMap::new();
        for record in &self.records {
            *counts.entry(record.class().clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Rows excluded because a required value was missing.
    #[must_use]
    pub fn skipped_rows(&self) -> usize {
        self.skipped
    }

    /// Draw one record uniformly at random, with replacement.
    ///
    /// # Errors
    ///
    /// `EmptyCatalog` if there is nothing to draw from.
    pub fn sample_one(&self, rng: &mut GameRng) -> Result<&Record> {
        if self.records.is_empty() {
            return Err(EngineError::EmptyCatalog);
        }
        Ok(&self.records[rng.gen_index(self.records.len())])
    }
}

fn is_complete(record: &Record) -> bool {
    let coordinate = record.coordinate();
    !record.class().as_str().trim().is_empty()
        && record.redshift().is_finite()
        && coordinate.ra.is_finite()
        && coordinate.dec.is_finite()
        && BANDS.iter().all(|band| {
            record
                .magnitude(band)
                .is_some_and(|v| v.is_finite() && v != MISSING_MAGNITUDE)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SkyCoordinate;

    fn record(class: &str, redshift: f64) -> Record {
        BANDS.iter().fold(
            Record::new(class, redshift, SkyCoordinate::new(180.0, 10.0)),
            |r, band| r.with_magnitude(*band, 19.0),
        )
    }

    #[test]
    fn test_from_records_collects_classes() {
        let catalog = Catalog::from_records(vec![
            record("STAR", 0.0),
            record("QSO", 1.8),
            record("GALAXY", 0.3),
            record("STAR", 0.0),
        ]);

        assert_eq!(catalog.len(), 4);
        let classes: Vec<_> = catalog.classes().iter().map(ClassLabel::as_str).collect();
        assert_eq!(classes, vec!["GALAXY", "QSO", "STAR"]);
        assert_eq!(catalog.class_counts()[&ClassLabel::new("STAR")], 2);
        assert!(catalog.has_class("QSO"));
        assert!(!catalog.has_class("qso"));
    }

    #[test]
    fn test_from_records_drops_incomplete() {
        let missing_band = Record::new("STAR", 0.0, SkyCoordinate::new(1.0, 1.0))
            .with_magnitude("u", 19.0);
        let nan_redshift = record("GALAXY", f64::NAN);

        let catalog = Catalog::from_records(vec![record("STAR", 0.0), missing_band, nan_redshift]);

        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.skipped_rows(), 2);
        assert_eq!(catalog.classes().len(), 1);
    }

    #[test]
    fn test_sample_one_empty() {
        let catalog = Catalog::default();
        let mut rng = GameRng::new(42);
        assert!(matches!(catalog.sample_one(&mut rng), Err(EngineError::EmptyCatalog)));
    }

    #[test]
    fn test_sample_one_with_replacement() {
        let catalog = Catalog::from_records(vec![record("STAR", 0.0), record("QSO", 2.0)]);
        let mut rng = GameRng::new(42);

        let mut seen = BTreeSet::new();
        for _ in 0..50 {
            let sampled = catalog.sample_one(&mut rng).unwrap();
            assert!(catalog.records().contains(sampled));
            seen.insert(sampled.class().clone());
        }
        // 50 draws from two records hit both.
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn test_sample_one_deterministic() {
        let catalog = Catalog::from_records((0..20).map(|i| record("STAR", f64::from(i))));
        let mut rng1 = GameRng::new(9);
        let mut rng2 = GameRng::new(9);

        for _ in 0..10 {
            assert_eq!(
                catalog.sample_one(&mut rng1).unwrap(),
                catalog.sample_one(&mut rng2).unwrap()
            );
        }
    }
}
