//! # spacedex
//!
//! Quiz engine for guessing the class of astronomical objects.
//!
//! Each round samples one object from a labeled sky survey catalog, shows
//! its photometry and position, and asks the player whether it is a star,
//! a galaxy or a quasar. The answer is checked against a random forest
//! trained on the catalog at startup.
//!
//! ## Design Principles
//!
//! 1. **Shared, Read-Only Data**: The catalog and classifier are built once
//!    and shared through `Arc` by every session.
//!
//! 2. **Explicit Sessions**: All per-player state lives in a `RoundState`
//!    the caller owns. Nothing is global.
//!
//! 3. **Deterministic**: Sampling and training are driven by seeded
//!    ChaCha8 streams, so a seed reproduces a session exactly.
//!
//! ## Modules
//!
//! - `core`: Errors, RNG, configuration
//! - `catalog`: CSV ingestion, records, random sampling
//! - `classifier`: Random forest, persistence, the `Predictor` seam
//! - `game`: Round state machine, scoring, images, the `Game` facade

pub mod catalog;
pub mod classifier;
pub mod core;
pub mod game;

// Re-export commonly used types
pub use crate::core::{EngineError, GameConfig, GameRng, GameRngState, Result};

pub use crate::catalog::{Catalog, ClassLabel, Record, SkyCoordinate};

pub use crate::classifier::{Classifier, ConstantPredictor, ForestConfig, Predictor};

pub use crate::game::{
    CutoutRequest, Feedback, Game, ImageConfig, ImageProvider, RoundPhase, RoundSnapshot,
    RoundState, ScoreEvent, ScoringConfig, UrlProvider,
};
