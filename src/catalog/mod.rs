//! Labeled catalog of sky objects.
//!
//! The catalog is read from a CSV export with the columns listed in
//! [`schema::REQUIRED_COLUMNS`] and held in memory for the lifetime of the
//! process. Sampling consumes randomness from the caller's stream, so the
//! catalog itself stays immutable and can be shared between sessions.

pub mod dataset;
mod loader;
pub mod record;
pub mod schema;

pub use dataset::Catalog;
pub use record::{ClassLabel, Record, SkyCoordinate};
