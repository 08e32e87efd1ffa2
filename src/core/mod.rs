//! Engine-wide building blocks: errors, deterministic randomness and
//! configuration.

pub mod config;
pub mod error;
pub mod rng;

pub use config::GameConfig;
pub use error::{EngineError, Result};
pub use rng::{GameRng, GameRngState};
