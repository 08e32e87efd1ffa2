//! Shared engine facade.
//!
//! A `Game` owns the read-only pieces (catalog, predictor, config) behind
//! `Arc`s. Sessions are plain [`RoundState`] values held by the caller;
//! any number of them can run against one `Game`, from any thread.

use std::sync::Arc;

use super::image::{CutoutRequest, ImageProvider};
use super::state::{Feedback, RoundState};
use crate::catalog::Catalog;
use crate::classifier::{Classifier, Predictor};
use crate::core::{EngineError, GameConfig, GameRng, Result};

/// Catalog, predictor and configuration shared by every session.
pub struct Game<P: Predictor + ?Sized = Classifier> {
    catalog: Arc<Catalog>,
    predictor: Arc<P>,
    config: GameConfig,
}

impl<P: Predictor + ?Sized> Clone for Game<P> {
    fn clone(&self) -> Self {
        Self {
            catalog: Arc::clone(&self.catalog),
            predictor: Arc::clone(&self.predictor),
            config: self.config.clone(),
        }
    }
}

impl Game<Classifier> {
    /// Startup: load the catalog, then load or train the classifier.
    ///
    /// With a `model_path` configured, a usable persisted model is reused
    /// and anything else is retrained and written back.
    ///
    /// # Errors
    ///
    /// `Config`, `DataLoad`, `EmptyCatalog` or `Training`. All are fatal.
    pub fn bootstrap(config: GameConfig) -> Result<Self> {
        config.validate()?;

        let catalog = Catalog::load(&config.catalog_path)?;
        if catalog.is_empty() {
            return Err(EngineError::EmptyCatalog);
        }

        let features = config.feature_refs();
        let classifier = match &config.model_path {
            Some(path) => Classifier::load_or_train(
                path,
                &catalog,
                &features,
                &config.label,
                &config.forest,
            )?,
            None => Classifier::train_with(&catalog, &features, &config.label, &config.forest)?,
        };

        if log::log_enabled!(log::Level::Debug) {
            log::debug!(
                "[MODEL] accuracy against catalog labels: {:.3}",
                classifier.accuracy(&catalog)
            );
        }
        log::info!(
            "[GAME] ready: {} records, classes {:?}",
            catalog.len(),
            catalog.classes()
        );

        Self::new(Arc::new(catalog), Arc::new(classifier), config)
    }
}

impl<P: Predictor + ?Sized> Game<P> {
    /// Assemble a game from already-built parts.
    ///
    /// # Errors
    ///
    /// `Config` if `config` does not validate.
    pub fn new(catalog: Arc<Catalog>, predictor: Arc<P>, config: GameConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            catalog,
            predictor,
            config,
        })
    }

    #[must_use]
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    #[must_use]
    pub fn predictor(&self) -> &Arc<P> {
        &self.predictor
    }

    #[must_use]
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// A fresh session using the configured scoring.
    #[must_use]
    pub fn new_session(&self, seed: u64) -> RoundState {
        RoundState::new(self.config.scoring, seed)
    }

    /// A session whose stream is derived from `seed` and a player name.
    ///
    /// Different players get unrelated record sequences from one seed;
    /// the same player always gets the same one.
    #[must_use]
    pub fn session_for(&self, seed: u64, player: &str) -> RoundState {
        RoundState::with_rng(self.config.scoring, GameRng::new(seed).for_context(player))
    }

    /// Start the first round (or the next one after feedback).
    ///
    /// # Errors
    ///
    /// As [`RoundState::start_round`]; `InvalidFeature` only once every
    /// sample attempt was rejected.
    pub fn start_round(&self, session: &mut RoundState) -> Result<()> {
        self.resample(session, |s, catalog, predictor| {
            s.start_round(catalog, predictor).map(|_| ())
        })
    }

    /// Leave feedback and start the next round.
    ///
    /// # Errors
    ///
    /// As [`RoundState::advance_round`], with resampling.
    pub fn advance_round(&self, session: &mut RoundState) -> Result<()> {
        self.resample(session, |s, catalog, predictor| {
            s.advance_round(catalog, predictor).map(|_| ())
        })
    }

    /// Swap the active record for a new one without scoring.
    ///
    /// # Errors
    ///
    /// As [`RoundState::skip_round`], with resampling.
    pub fn skip_round(&self, session: &mut RoundState) -> Result<()> {
        self.resample(session, |s, catalog, predictor| {
            s.skip_round(catalog, predictor).map(|_| ())
        })
    }

    /// # Errors
    ///
    /// As [`RoundState::submit_guess`].
    pub fn submit_guess(&self, session: &mut RoundState, guess: &str) -> Result<Feedback> {
        session.submit_guess(guess)
    }

    /// Cutout request for the session's current record.
    #[must_use]
    pub fn cutout_request(&self, session: &RoundState) -> Option<CutoutRequest> {
        session
            .record()
            .map(|record| self.config.image.request(record.coordinate()))
    }

    /// Fetch an image of the current record.
    ///
    /// Returns `None` when there is no record or the provider fails. A
    /// failure is logged and has no effect on the session.
    pub fn fetch_image<I: ImageProvider>(
        &self,
        provider: &I,
        session: &RoundState,
    ) -> Option<I::Image> {
        let request = self.cutout_request(session)?;
        match provider.fetch(&request) {
            Ok(image) => Some(image),
            Err(err) => {
                log::warn!("[IMAGE] fetch failed for {}: {err}", request.url());
                None
            }
        }
    }

    fn resample<F>(&self, session: &mut RoundState, mut transition: F) -> Result<()>
    where
        F: FnMut(&mut RoundState, &Catalog, &P) -> Result<()>,
    {
        let mut attempt = 1;
        loop {
            match transition(&mut *session, self.catalog.as_ref(), self.predictor.as_ref()) {
                Err(err @ EngineError::InvalidFeature { .. })
                    if attempt < self.config.max_sample_attempts =>
                {
                    log::warn!("[ROUND] sample rejected (attempt {attempt}): {err}");
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}
