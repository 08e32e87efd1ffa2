//! Catalog rows and class labels.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::schema::REDSHIFT;

/// Object class label, e.g. `STAR`, `GALAXY`, `QSO`.
///
/// Labels are compared exactly as they appear in the catalog.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClassLabel(String);

impl ClassLabel {
    /// Create a label.
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    /// The label text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClassLabel {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

impl PartialEq<str> for ClassLabel {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ClassLabel {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Equatorial sky position in degrees (J2000).
///
/// Used only to look up an image of the object.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SkyCoordinate {
    /// Right ascension (`alpha`).
    pub ra: f64,
    /// Declination (`delta`).
    pub dec: f64,
}

impl SkyCoordinate {
    /// Create a coordinate.
    #[must_use]
    pub const fn new(ra: f64, dec: f64) -> Self {
        Self { ra, dec }
    }
}

/// One catalog row.
///
/// Records are immutable; the builder methods consume and return `self` and
/// are only used while a record is being assembled.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    magnitudes: BTreeMap<String, f64>,
    redshift: f64,
    coordinate: SkyCoordinate,
    class: ClassLabel,
}

impl Record {
    /// Create a record with no magnitudes.
    pub fn new(class: impl Into<ClassLabel>, redshift: f64, coordinate: SkyCoordinate) -> Self {
        Self {
            magnitudes: BTreeMap::new(),
            redshift,
            coordinate,
            class: class.into(),
        }
    }

    /// Add a photometric band magnitude.
    #[must_use]
    pub fn with_magnitude(mut self, band: impl Into<String>, value: f64) -> Self {
        self.magnitudes.insert(band.into(), value);
        self
    }

    /// Photometric magnitudes keyed by band name.
    #[must_use]
    pub fn magnitudes(&self) -> &BTreeMap<String, f64> {
        &self.magnitudes
    }

    /// Magnitude in one band.
    #[must_use]
    pub fn magnitude(&self, band: &str) -> Option<f64> {
        self.magnitudes.get(band).copied()
    }

    #[must_use]
    pub fn redshift(&self) -> f64 {
        self.redshift
    }

    #[must_use]
    pub fn coordinate(&self) -> SkyCoordinate {
        self.coordinate
    }

    /// Ground-truth label from the catalog.
    #[must_use]
    pub fn class(&self) -> &ClassLabel {
        &self.class
    }

    /// Look up a model feature by name: a band magnitude or `redshift`.
    #[must_use]
    pub fn feature(&self, name: &str) -> Option<f64> {
        if name == REDSHIFT {
            Some(self.redshift)
        } else {
            self.magnitude(name)
        }
    }
}
