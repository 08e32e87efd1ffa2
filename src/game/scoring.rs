//! Points and levels.

use serde::{Deserialize, Serialize};

use crate::core::{EngineError, Result};

/// How correct guesses are rewarded.
///
/// The defaults give 100 points per correct guess and a new level every
/// 1000 points. Turning scoring off keeps correctness feedback only;
/// turning leveling off keeps the player at level 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Award points for correct guesses.
    pub enabled: bool,

    /// Points per correct guess.
    pub award: u64,

    /// Derive a level from the score and report level-ups.
    pub leveling: bool,

    /// Points per level. Must be positive.
    pub level_threshold: u64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            award: 100,
            leveling: true,
            level_threshold: 1000,
        }
    }
}

impl ScoringConfig {
    /// Correctness feedback only, no points.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_award(mut self, award: u64) -> Self {
        self.award = award;
        self
    }

    #[must_use]
    pub fn with_level_threshold(mut self, threshold: u64) -> Self {
        self.level_threshold = threshold;
        self
    }

    #[must_use]
    pub fn without_leveling(mut self) -> Self {
        self.leveling = false;
        self
    }

    /// # Errors
    ///
    /// `Config` if the level threshold is zero.
    pub fn validate(&self) -> Result<()> {
        if self.level_threshold == 0 {
            return Err(EngineError::Config("level_threshold must be positive".into()));
        }
        Ok(())
    }

    /// Level for a score: `score / level_threshold + 1`.
    #[must_use]
    pub fn level_for(&self, score: u64) -> u64 {
        if self.leveling {
            score / self.level_threshold.max(1) + 1
        } else {
            1
        }
    }
}

/// What scoring a round produced.
///
/// A level-up is reported instead of, not in addition to, a plain correct
/// event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreEvent {
    /// The guess did not match the prediction.
    Incorrect,
    /// The guess matched.
    Correct { awarded: u64 },
    /// The guess matched and the level went up.
    LevelUp { awarded: u64, from: u64, to: u64 },
}

impl ScoreEvent {
    #[must_use]
    pub fn is_correct(&self) -> bool {
        !matches!(self, ScoreEvent::Incorrect)
    }

    #[must_use]
    pub fn is_level_up(&self) -> bool {
        matches!(self, ScoreEvent::LevelUp { .. })
    }

    /// Points added to the score.
    #[must_use]
    pub fn awarded(&self) -> u64 {
        match self {
            ScoreEvent::Incorrect => 0,
            ScoreEvent::Correct { awarded } | ScoreEvent::LevelUp { awarded, .. } => *awarded,
        }
    }
}
