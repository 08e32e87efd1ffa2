//! Quiz rounds: session state, scoring, images and the shared engine.
//!
//! - `state`: per-session `RoundState` machine and its snapshots
//! - `scoring`: points, levels and the events a round produces
//! - `image`: sky cutout requests and the `ImageProvider` seam
//! - `engine`: `Game`, the `Arc`-shared catalog and predictor with resampling

pub mod engine;
pub mod image;
pub mod scoring;
pub mod state;

pub use engine::Game;
pub use image::{CutoutRequest, ImageConfig, ImageProvider, UrlProvider};
pub use scoring::{ScoreEvent, ScoringConfig};
pub use state::{Feedback, RoundPhase, RoundSnapshot, RoundState};
