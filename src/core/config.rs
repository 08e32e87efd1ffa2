//! Engine configuration.
//!
//! `GameConfig` gathers the per-area configs (`ForestConfig`,
//! `ScoringConfig`, `ImageConfig`) plus the data and model locations. Every
//! field has a default, so a JSON file only needs the keys it changes.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{EngineError, Result};
use crate::catalog::schema;
use crate::classifier::ForestConfig;
use crate::game::{ImageConfig, ScoringConfig};

/// Complete engine configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Catalog CSV file.
    pub catalog_path: PathBuf,

    /// Where the trained model is persisted. `None` trains on every start.
    pub model_path: Option<PathBuf>,

    /// Classifier inputs, in model order.
    pub features: Vec<String>,

    /// Target column.
    pub label: String,

    pub forest: ForestConfig,

    pub scoring: ScoringConfig,

    pub image: ImageConfig,

    /// Fresh samples tried per round when the classifier rejects a record.
    pub max_sample_attempts: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            catalog_path: PathBuf::from("star_classification.csv"),
            model_path: None,
            features: schema::FEATURES.iter().map(|f| (*f).to_string()).collect(),
            label: schema::CLASS.to_string(),
            forest: ForestConfig::default(),
            scoring: ScoringConfig::default(),
            image: ImageConfig::default(),
            max_sample_attempts: 3,
        }
    }
}

impl GameConfig {
    /// Read the catalog from `path`.
    #[must_use]
    pub fn with_catalog_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.catalog_path = path.into();
        self
    }

    /// Persist the trained model at `path` and reuse it on later starts.
    #[must_use]
    pub fn with_model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_features(mut self, features: &[&str]) -> Self {
        self.features = features.iter().map(|f| (*f).to_string()).collect();
        self
    }

    #[must_use]
    pub fn with_forest(mut self, forest: ForestConfig) -> Self {
        self.forest = forest;
        self
    }

    #[must_use]
    pub fn with_scoring(mut self, scoring: ScoringConfig) -> Self {
        self.scoring = scoring;
        self
    }

    #[must_use]
    pub fn with_image(mut self, image: ImageConfig) -> Self {
        self.image = image;
        self
    }

    #[must_use]
    pub fn with_max_sample_attempts(mut self, attempts: usize) -> Self {
        self.max_sample_attempts = attempts;
        self
    }

    /// Feature names as borrowed slices, the form the classifier takes.
    #[must_use]
    pub fn feature_refs(&self) -> Vec<&str> {
        self.features.iter().map(String::as_str).collect()
    }

    /// Parse and validate a JSON document.
    ///
    /// # Errors
    ///
    /// `Config` if the JSON is malformed or fails [`GameConfig::validate`].
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| EngineError::Config(format!("invalid JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON config file.
    ///
    /// # Errors
    ///
    /// `Config` if the file cannot be read or its content is invalid.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json_str(&json)
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    ///
    /// `Config` describing the first violated constraint.
    pub fn validate(&self) -> Result<()> {
        if self.features.is_empty() {
            return Err(EngineError::Config("features must not be empty".into()));
        }
        if let Some(bad) = self.features.iter().find(|f| !schema::is_feature(f)) {
            return Err(EngineError::Config(format!(
                "unknown feature `{bad}`, expected any of {:?}",
                schema::FEATURES
            )));
        }
        if self.label != schema::CLASS {
            return Err(EngineError::Config(format!(
                "label must be `{}`, got `{}`",
                schema::CLASS,
                self.label
            )));
        }
        if self.max_sample_attempts == 0 {
            return Err(EngineError::Config("max_sample_attempts must be at least 1".into()));
        }
        if !(self.image.scale.is_finite() && self.image.scale > 0.0) {
            return Err(EngineError::Config("image scale must be positive".into()));
        }
        self.forest.validate()?;
        self.scoring.validate()
    }
}
