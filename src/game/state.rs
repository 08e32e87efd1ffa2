//! Per-session round state machine.
//!
//! ```text
//! AwaitingRound --start_round--> RoundActive --submit_guess--> FeedbackShown
//!                                  |    ^                          |
//!                                  +----+ skip_round               |
//!                                       ^                          |
//!                                       +-------advance_round------+
//! ```
//!
//! Every transition either fully succeeds or leaves the player-visible
//! state untouched. The session's RNG stream is the one exception: a draw
//! that failed prediction is consumed, so retrying samples a fresh record.

use serde::{Deserialize, Serialize};

use super::scoring::{ScoreEvent, ScoringConfig};
use crate::catalog::{Catalog, ClassLabel, Record};
use crate::classifier::Predictor;
use crate::core::{EngineError, GameRng, GameRngState, Result};

/// Where a session is in the round cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoundPhase {
    /// No record yet (fresh session).
    AwaitingRound,
    /// A record is shown and a guess is expected.
    RoundActive,
    /// The guess was checked and feedback is visible.
    FeedbackShown,
}

impl std::fmt::Display for RoundPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RoundPhase::AwaitingRound => "awaiting round",
            RoundPhase::RoundActive => "round active",
            RoundPhase::FeedbackShown => "feedback shown",
        };
        f.write_str(name)
    }
}

/// Result of a submitted guess, for the presentation layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub guess: ClassLabel,
    /// The classifier's answer, which the guess is scored against.
    pub prediction: ClassLabel,
    /// The label stored in the catalog; may disagree with the prediction.
    pub catalog_label: ClassLabel,
    pub correct: bool,
    pub event: ScoreEvent,
    /// Score after this round.
    pub score: u64,
    /// Level after this round.
    pub level: u64,
}

/// Comparable copy of everything a player can observe.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoundSnapshot {
    pub phase: RoundPhase,
    pub round: u64,
    pub record: Option<Record>,
    pub prediction: Option<ClassLabel>,
    pub choices: Vec<ClassLabel>,
    pub guess: Option<ClassLabel>,
    pub correct: Option<bool>,
    pub scored: bool,
    pub score: u64,
    pub level: u64,
    pub correct_guesses: u64,
}

/// One player's session.
///
/// Owns the sampled record and the randomness used to draw it. The
/// catalog and predictor are borrowed per call, so any number of sessions
/// can share them.
#[derive(Clone, Debug)]
pub struct RoundState {
    config: ScoringConfig,
    rng: GameRng,
    phase: RoundPhase,
    round: u64,
    record: Option<Record>,
    prediction: Option<ClassLabel>,
    choices: Vec<ClassLabel>,
    guess: Option<ClassLabel>,
    correct: Option<bool>,
    scored: bool,
    last_event: Option<ScoreEvent>,
    score: u64,
    level: u64,
    correct_guesses: u64,
}

impl RoundState {
    /// Create a session awaiting its first round.
    #[must_use]
    pub fn new(config: ScoringConfig, seed: u64) -> Self {
        Self::with_rng(config, GameRng::new(seed))
    }

    /// Create a session drawing from an existing stream.
    #[must_use]
    pub fn with_rng(config: ScoringConfig, rng: GameRng) -> Self {
        Self {
            config,
            rng,
            phase: RoundPhase::AwaitingRound,
            round: 0,
            record: None,
            prediction: None,
            choices: Vec::new(),
            guess: None,
            correct: None,
            scored: false,
            last_event: None,
            score: 0,
            level: config.level_for(0),
            correct_guesses: 0,
        }
    }

    /// Start the session from an existing score.
    #[must_use]
    pub fn with_score(mut self, score: u64) -> Self {
        self.score = score;
        self.level = self.config.level_for(score);
        self
    }

    /// Continue sampling from a position saved with [`RoundState::rng_state`].
    #[must_use]
    pub fn with_rng_state(mut self, state: &GameRngState) -> Self {
        self.rng = GameRng::from_state(state);
        self
    }

    /// Sample a record and cache its prediction.
    ///
    /// Valid while awaiting a round or showing feedback.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` from any other phase, `EmptyCatalog` if there is
    /// nothing to sample, `InvalidFeature` if the predictor rejects the
    /// sampled record. On error the round does not advance.
    pub fn start_round<P: Predictor + ?Sized>(
        &mut self,
        catalog: &Catalog,
        predictor: &P,
    ) -> Result<&Record> {
        match self.phase {
            RoundPhase::AwaitingRound | RoundPhase::FeedbackShown => {
                self.begin_round(catalog, predictor)
            }
            RoundPhase::RoundActive => Err(self.invalid("start a round")),
        }
    }

    /// Move on after feedback; same effect as [`RoundState::start_round`].
    ///
    /// # Errors
    ///
    /// `InvalidTransition` unless feedback is shown, plus the errors of
    /// [`RoundState::start_round`].
    pub fn advance_round<P: Predictor + ?Sized>(
        &mut self,
        catalog: &Catalog,
        predictor: &P,
    ) -> Result<&Record> {
        match self.phase {
            RoundPhase::FeedbackShown => self.begin_round(catalog, predictor),
            _ => Err(self.invalid("advance the round")),
        }
    }

    /// Replace the current record without guessing. Nothing is scored.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` unless a round is active, plus the errors of
    /// [`RoundState::start_round`].
    pub fn skip_round<P: Predictor + ?Sized>(
        &mut self,
        catalog: &Catalog,
        predictor: &P,
    ) -> Result<&Record> {
        match self.phase {
            RoundPhase::RoundActive => self.begin_round(catalog, predictor),
            _ => Err(self.invalid("skip the round")),
        }
    }

    fn begin_round<P: Predictor + ?Sized>(
        &mut self,
        catalog: &Catalog,
        predictor: &P,
    ) -> Result<&Record> {
        let record = catalog.sample_one(&mut self.rng)?.clone();
        let prediction = predictor.predict(&record)?;

        self.round += 1;
        log::debug!(
            "[ROUND] {} started: catalog says {}, model says {}",
            self.round,
            record.class(),
            prediction
        );

        self.phase = RoundPhase::RoundActive;
        self.prediction = Some(prediction);
        self.choices = catalog.classes().to_vec();
        self.guess = None;
        self.correct = None;
        self.scored = false;
        self.last_event = None;
        Ok(self.record.insert(record))
    }

    /// Check a guess against the cached prediction and score it.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` unless a round is active; `InvalidGuess` if the
    /// label is not one of [`RoundState::choices`]. Either way the state is
    /// unchanged and the round stays active.
    pub fn submit_guess(&mut self, guess: &str) -> Result<Feedback> {
        if self.phase != RoundPhase::RoundActive {
            return Err(self.invalid("submit a guess"));
        }
        let (Some(record), Some(prediction)) = (&self.record, &self.prediction) else {
            return Err(self.invalid("submit a guess"));
        };
        let Some(guess) = self.choices.iter().find(|c| *c == guess).cloned() else {
            return Err(EngineError::InvalidGuess {
                guess: guess.to_string(),
                expected: self.choices.iter().map(ToString::to_string).collect(),
            });
        };

        let prediction = prediction.clone();
        let catalog_label = record.class().clone();
        let correct = guess == prediction;

        self.guess = Some(guess.clone());
        self.correct = Some(correct);
        self.phase = RoundPhase::FeedbackShown;

        // The round was reset when it began, so this is its first scoring.
        let event = self.score_update().unwrap_or(ScoreEvent::Incorrect);

        log::debug!(
            "[ROUND] {} guess {} vs {}: {:?}, score {}",
            self.round,
            guess,
            prediction,
            event,
            self.score
        );

        Ok(Feedback {
            guess,
            prediction,
            catalog_label,
            correct,
            event,
            score: self.score,
            level: self.level,
        })
    }

    /// Apply the award for the current round.
    ///
    /// Returns `None` outside feedback or once the round has been scored,
    /// so repeated calls never award twice.
    pub fn score_update(&mut self) -> Option<ScoreEvent> {
        if self.phase != RoundPhase::FeedbackShown || self.scored {
            return None;
        }

        let event = if self.correct == Some(true) {
            let awarded = if self.config.enabled { self.config.award } else { 0 };
            self.score = self.score.saturating_add(awarded);
            self.correct_guesses += 1;

            let level = self.config.level_for(self.score);
            let event = if level > self.level {
                ScoreEvent::LevelUp {
                    awarded,
                    from: self.level,
                    to: level,
                }
            } else {
                ScoreEvent::Correct { awarded }
            };
            self.level = level;
            event
        } else {
            ScoreEvent::Incorrect
        };

        self.scored = true;
        self.last_event = Some(event);
        Some(event)
    }

    fn invalid(&self, action: &'static str) -> EngineError {
        EngineError::InvalidTransition {
            action,
            phase: self.phase,
        }
    }

    #[must_use]
    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    /// Number of rounds started in this session.
    #[must_use]
    pub fn round(&self) -> u64 {
        self.round
    }

    #[must_use]
    pub fn record(&self) -> Option<&Record> {
        self.record.as_ref()
    }

    /// Cached prediction for the current record.
    #[must_use]
    pub fn prediction(&self) -> Option<&ClassLabel> {
        self.prediction.as_ref()
    }

    /// Labels a guess may use.
    #[must_use]
    pub fn choices(&self) -> &[ClassLabel] {
        &self.choices
    }

    #[must_use]
    pub fn guess(&self) -> Option<&ClassLabel> {
        self.guess.as_ref()
    }

    /// Whether the submitted guess was right; `None` before a guess.
    #[must_use]
    pub fn is_correct(&self) -> Option<bool> {
        self.correct
    }

    #[must_use]
    pub fn feedback_visible(&self) -> bool {
        self.phase == RoundPhase::FeedbackShown
    }

    #[must_use]
    pub fn last_event(&self) -> Option<ScoreEvent> {
        self.last_event
    }

    #[must_use]
    pub fn score(&self) -> u64 {
        self.score
    }

    #[must_use]
    pub fn level(&self) -> u64 {
        self.level
    }

    #[must_use]
    pub fn correct_guesses(&self) -> u64 {
        self.correct_guesses
    }

    #[must_use]
    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Position of the session's sampling stream.
    #[must_use]
    pub fn rng_state(&self) -> GameRngState {
        self.rng.state()
    }

    /// Capture the player-visible state.
    #[must_use]
    pub fn snapshot(&self) -> RoundSnapshot {
        RoundSnapshot {
            phase: self.phase,
            round: self.round,
            record: self.record.clone(),
            prediction: self.prediction.clone(),
            choices: self.choices.clone(),
            guess: self.guess.clone(),
            correct: self.correct,
            scored: self.scored,
            score: self.score,
            level: self.level,
            correct_guesses: self.correct_guesses,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{schema::BANDS, SkyCoordinate};
    use crate::classifier::ConstantPredictor;

    fn record(class: &str, ra: f64) -> Record {
        BANDS.iter().fold(
            Record::new(class, 0.1, SkyCoordinate::new(ra, -1.0)),
            |r, band| r.with_magnitude(*band, 20.0),
        )
    }

    fn catalog() -> Catalog {
        Catalog::from_records(vec![
            record("STAR", 1.0),
            record("GALAXY", 2.0),
            record("QSO", 3.0),
            record("STAR", 4.0),
        ])
    }

    struct Refuses;

    impl Predictor for Refuses {
        fn predict(&self, _record: &Record) -> Result<ClassLabel> {
            Err(EngineError::invalid_feature("u", "rejected"))
        }
    }

    #[test]
    fn test_new_session() {
        let state = RoundState::new(ScoringConfig::default(), 1);
        assert_eq!(state.phase(), RoundPhase::AwaitingRound);
        assert!(state.record().is_none());
        assert_eq!(state.score(), 0);
        assert_eq!(state.level(), 1);
        assert!(!state.feedback_visible());
    }

    #[test]
    fn test_start_round_caches_prediction() {
        let catalog = catalog();
        let mut state = RoundState::new(ScoringConfig::default(), 1);

        let sampled = state.start_round(&catalog, &ConstantPredictor::new("STAR")).unwrap().clone();

        assert!(catalog.records().contains(&sampled));
        assert_eq!(state.phase(), RoundPhase::RoundActive);
        assert_eq!(state.prediction().unwrap(), "STAR");
        assert_eq!(state.choices(), catalog.classes());
        assert_eq!(state.round(), 1);
    }

    #[test]
    fn test_start_round_rejected_while_active() {
        let catalog = catalog();
        let predictor = ConstantPredictor::new("STAR");
        let mut state = RoundState::new(ScoringConfig::default(), 1);
        state.start_round(&catalog, &predictor).unwrap();
        let before = state.snapshot();

        let err = state.start_round(&catalog, &predictor).unwrap_err();

        assert!(matches!(err, EngineError::InvalidTransition { .. }));
        assert_eq!(state.snapshot(), before);
    }

    #[test]
    fn test_guess_before_round_rejected() {
        let mut state = RoundState::new(ScoringConfig::default(), 1);
        assert!(matches!(
            state.submit_guess("STAR"),
            Err(EngineError::InvalidTransition {
                phase: RoundPhase::AwaitingRound,
                ..
            })
        ));
    }

    #[test]
    fn test_correct_guess_scores() {
        let catalog = catalog();
        let mut state = RoundState::new(ScoringConfig::default(), 1);
        state.start_round(&catalog, &ConstantPredictor::new("QSO")).unwrap();

        let feedback = state.submit_guess("QSO").unwrap();

        assert!(feedback.correct);
        assert_eq!(feedback.event, ScoreEvent::Correct { awarded: 100 });
        assert_eq!(feedback.score, 100);
        assert_eq!(state.score(), 100);
        assert_eq!(state.correct_guesses(), 1);
        assert!(state.feedback_visible());
    }

    #[test]
    fn test_score_update_is_idempotent() {
        let catalog = catalog();
        let mut state = RoundState::new(ScoringConfig::default(), 1);
        state.start_round(&catalog, &ConstantPredictor::new("QSO")).unwrap();
        state.submit_guess("QSO").unwrap();

        assert_eq!(state.score_update(), None);
        assert_eq!(state.score_update(), None);
        assert_eq!(state.score(), 100);
        assert_eq!(state.last_event(), Some(ScoreEvent::Correct { awarded: 100 }));
    }

    #[test]
    fn test_score_update_outside_feedback_does_nothing() {
        let catalog = catalog();
        let mut state = RoundState::new(ScoringConfig::default(), 1);
        assert_eq!(state.score_update(), None);

        state.start_round(&catalog, &ConstantPredictor::new("QSO")).unwrap();
        assert_eq!(state.score_update(), None);
        assert_eq!(state.score(), 0);
    }

    #[test]
    fn test_scoring_disabled() {
        let catalog = catalog();
        let mut state = RoundState::new(ScoringConfig::disabled(), 1);
        state.start_round(&catalog, &ConstantPredictor::new("STAR")).unwrap();

        let feedback = state.submit_guess("STAR").unwrap();

        assert!(feedback.correct);
        assert_eq!(feedback.event, ScoreEvent::Correct { awarded: 0 });
        assert_eq!(state.score(), 0);
    }

    #[test]
    fn test_level_up_without_leveling() {
        let catalog = catalog();
        let config = ScoringConfig::default().without_leveling();
        let mut state = RoundState::new(config, 1).with_score(950);
        state.start_round(&catalog, &ConstantPredictor::new("STAR")).unwrap();

        let feedback = state.submit_guess("STAR").unwrap();

        assert_eq!(feedback.event, ScoreEvent::Correct { awarded: 100 });
        assert_eq!(state.score(), 1050);
        assert_eq!(state.level(), 1);
    }

    #[test]
    fn test_failed_prediction_keeps_state() {
        let catalog = catalog();
        let mut state = RoundState::new(ScoringConfig::default(), 1);
        let before = state.snapshot();

        let err = state.start_round(&catalog, &Refuses).unwrap_err();

        assert!(matches!(err, EngineError::InvalidFeature { .. }));
        assert_eq!(state.snapshot(), before);
        assert_eq!(state.phase(), RoundPhase::AwaitingRound);
    }

    #[test]
    fn test_failed_prediction_consumes_sample() {
        let catalog = catalog();
        let mut state = RoundState::new(ScoringConfig::default(), 1);
        let rng_before = state.rng_state();

        let _ = state.start_round(&catalog, &Refuses);

        assert_ne!(state.rng_state(), rng_before);
    }

    #[test]
    fn test_empty_catalog() {
        let mut state = RoundState::new(ScoringConfig::default(), 1);
        let err = state
            .start_round(&Catalog::default(), &ConstantPredictor::new("STAR"))
            .unwrap_err();
        assert!(matches!(err, EngineError::EmptyCatalog));
        assert_eq!(state.phase(), RoundPhase::AwaitingRound);
    }

    #[test]
    fn test_advance_requires_feedback() {
        let catalog = catalog();
        let predictor = ConstantPredictor::new("STAR");
        let mut state = RoundState::new(ScoringConfig::default(), 1);

        assert!(state.advance_round(&catalog, &predictor).is_err());
        state.start_round(&catalog, &predictor).unwrap();
        assert!(state.advance_round(&catalog, &predictor).is_err());

        state.submit_guess("GALAXY").unwrap();
        state.advance_round(&catalog, &predictor).unwrap();

        assert_eq!(state.phase(), RoundPhase::RoundActive);
        assert!(state.guess().is_none());
        assert!(state.is_correct().is_none());
        assert!(state.last_event().is_none());
        assert_eq!(state.round(), 2);
    }

    #[test]
    fn test_skip_round() {
        let catalog = catalog();
        let predictor = ConstantPredictor::new("STAR");
        let mut state = RoundState::new(ScoringConfig::default(), 1);

        assert!(state.skip_round(&catalog, &predictor).is_err());
        state.start_round(&catalog, &predictor).unwrap();
        state.skip_round(&catalog, &predictor).unwrap();

        assert_eq!(state.phase(), RoundPhase::RoundActive);
        assert_eq!(state.round(), 2);
        assert_eq!(state.score(), 0);
    }

    #[test]
    fn test_resume_from_rng_state() {
        let catalog = catalog();
        let predictor = ConstantPredictor::new("STAR");
        let mut first = RoundState::new(ScoringConfig::default(), 12);
        first.start_round(&catalog, &predictor).unwrap();
        first.submit_guess("STAR").unwrap();

        let mut resumed = RoundState::new(ScoringConfig::default(), 0)
            .with_score(first.score())
            .with_rng_state(&first.rng_state());

        for _ in 0..4 {
            first.advance_round(&catalog, &predictor).unwrap();
            let next = resumed.start_round(&catalog, &predictor).unwrap();
            assert_eq!(Some(next), first.record());
            first.submit_guess("STAR").unwrap();
            resumed.submit_guess("STAR").unwrap();
        }
        assert_eq!(resumed.score(), first.score());
    }

    #[test]
    fn test_sessions_with_same_seed_agree() {
        let catalog = catalog();
        let predictor = ConstantPredictor::new("STAR");
        let mut a = RoundState::new(ScoringConfig::default(), 77);
        let mut b = RoundState::new(ScoringConfig::default(), 77);

        for _ in 0..5 {
            let ra = a.start_round(&catalog, &predictor).unwrap().clone();
            let rb = b.start_round(&catalog, &predictor).unwrap().clone();
            assert_eq!(ra, rb);
            a.submit_guess("STAR").unwrap();
            b.submit_guess("STAR").unwrap();
        }
        assert_eq!(a.snapshot(), b.snapshot());
    }
}
