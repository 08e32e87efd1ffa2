//! Prediction seam between the round state machine and a model.

use crate::catalog::{ClassLabel, Record};
use crate::core::Result;

/// Anything that can label a record.
///
/// The round state machine only needs this, so a trained [`Classifier`]
/// and deterministic stand-ins are interchangeable.
///
/// [`Classifier`]: super::Classifier
pub trait Predictor: Send + Sync {
    /// Predict the class of a record.
    ///
    /// # Errors
    ///
    /// `InvalidFeature` if the record cannot be turned into model input.
    fn predict(&self, record: &Record) -> Result<ClassLabel>;
}

impl<P: Predictor + ?Sized> Predictor for std::sync::Arc<P> {
    fn predict(&self, record: &Record) -> Result<ClassLabel> {
        (**self).predict(record)
    }
}

/// Always predicts the same label (baseline for testing).
#[derive(Clone, Debug)]
pub struct ConstantPredictor {
    label: ClassLabel,
}

impl ConstantPredictor {
    /// Create a predictor that always answers `label`.
    pub fn new(label: impl Into<ClassLabel>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl Predictor for ConstantPredictor {
    fn predict(&self, _record: &Record) -> Result<ClassLabel> {
        Ok(self.label.clone())
    }
}
