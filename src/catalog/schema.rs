//! Column names of the star classification catalog.

/// Photometric bands, in model input order.
pub const BANDS: [&str; 5] = ["u", "g", "r", "i", "z"];

pub const REDSHIFT: &str = "redshift";
pub const ALPHA: &str = "alpha";
pub const DELTA: &str = "delta";
pub const CLASS: &str = "class";

/// Default classifier inputs: the five bands followed by redshift.
pub const FEATURES: [&str; 6] = ["u", "g", "r", "i", "z", REDSHIFT];

/// Every column a catalog source must provide.
pub const REQUIRED_COLUMNS: [&str; 9] = ["u", "g", "r", "i", "z", REDSHIFT, ALPHA, DELTA, CLASS];

/// Whether `name` can be used as a classifier input.
#[must_use]
pub fn is_feature(name: &str) -> bool {
    FEATURES.contains(&name)
}

/// Sentinel the survey writes for a magnitude it could not measure.
pub const MISSING_MAGNITUDE: f64 = -9999.0;
