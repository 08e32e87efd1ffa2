//! Engine error taxonomy.
//!
//! Startup errors (`DataLoad`, `EmptyCatalog`, `Training`, `Config`) halt
//! initialization. Per-round errors (`InvalidFeature`, `InvalidGuess`,
//! `InvalidTransition`) are reported to the caller and never corrupt a
//! session. `ModelLoad` is recovered by retraining.

use thiserror::Error;

use crate::game::RoundPhase;

/// Errors produced by the game engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The catalog source is unreadable or lacks required columns.
    #[error("failed to load catalog from {source_name}: {message}")]
    DataLoad {
        source_name: String,
        message: String,
    },

    /// Sampling was attempted on a catalog with zero records.
    #[error("catalog holds no records")]
    EmptyCatalog,

    /// The classifier could not be fitted.
    #[error("training failed: {0}")]
    Training(String),

    /// A persisted model could not be read or decoded.
    #[error("failed to load model from {path}: {message}")]
    ModelLoad { path: String, message: String },

    /// A trained model could not be written.
    #[error("failed to save model to {path}: {message}")]
    ModelSave { path: String, message: String },

    /// A record is missing a feature or carries a non-finite value.
    #[error("invalid feature `{feature}`: {message}")]
    InvalidFeature { feature: String, message: String },

    /// The guess is not one of the known class labels.
    #[error("invalid guess `{guess}`, expected one of {expected:?}")]
    InvalidGuess {
        guess: String,
        expected: Vec<String>,
    },

    /// A transition was requested from a phase that does not allow it.
    #[error("cannot {action} while {phase}")]
    InvalidTransition {
        action: &'static str,
        phase: RoundPhase,
    },

    /// Configuration could not be read, parsed, or validated.
    #[error("configuration error: {0}")]
    Config(String),
}

impl EngineError {
    pub(crate) fn data_load(source_name: impl Into<String>, message: impl ToString) -> Self {
        Self::DataLoad {
            source_name: source_name.into(),
            message: message.to_string(),
        }
    }

    pub(crate) fn invalid_feature(feature: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidFeature {
            feature: feature.into(),
            message: message.into(),
        }
    }

    /// Whether a session can continue after this error.
    ///
    /// Startup failures are not recoverable; per-round failures and a bad
    /// persisted model are.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            EngineError::DataLoad { .. }
            | EngineError::EmptyCatalog
            | EngineError::Training(_)
            | EngineError::Config(_) => false,
            EngineError::ModelLoad { .. }
            | EngineError::ModelSave { .. }
            | EngineError::InvalidFeature { .. }
            | EngineError::InvalidGuess { .. }
            | EngineError::InvalidTransition { .. } => true,
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, EngineError>;
