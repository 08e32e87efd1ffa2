//! Bagged ensemble of decision trees.

use serde::{Deserialize, Serialize};

use super::tree::{DecisionTree, FeatureVector, TreeParams};
use crate::core::{EngineError, GameRng, Result};

/// Random forest hyperparameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    /// Number of trees (default: 100).
    pub n_estimators: usize,

    /// Maximum tree depth (`None` = grow until leaves are pure).
    pub max_depth: Option<usize>,

    /// Minimum rows a node needs before it may be split.
    pub min_samples_split: usize,

    /// Features examined per split (`None` = square root of the feature count).
    pub max_features: Option<usize>,

    /// Seed for bootstrap sampling and feature selection.
    /// Same seed and data produce the same forest.
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            max_features: None,
            seed: 42,
        }
    }
}

impl ForestConfig {
    #[must_use]
    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    #[must_use]
    pub fn with_min_samples_split(mut self, n: usize) -> Self {
        self.min_samples_split = n;
        self
    }

    #[must_use]
    pub fn with_max_features(mut self, n: usize) -> Self {
        self.max_features = Some(n);
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Check that the forest can be grown.
    ///
    /// # Errors
    ///
    /// `Config` if a parameter is out of range.
    pub fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(EngineError::Config("forest needs at least one tree".into()));
        }
        if self.min_samples_split < 2 {
            return Err(EngineError::Config("min_samples_split must be at least 2".into()));
        }
        if self.max_features == Some(0) {
            return Err(EngineError::Config("max_features must be positive".into()));
        }
        Ok(())
    }

    fn tree_params(&self, n_features: usize) -> TreeParams {
        let default_features = ((n_features as f64).sqrt() as usize).max(1);
        TreeParams {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            max_features: self.max_features.unwrap_or(default_features).min(n_features.max(1)),
        }
    }
}

/// Fitted random forest over class indices `0..n_classes`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    n_features: usize,
    n_classes: usize,
}

impl RandomForest {
    /// Fit one tree per estimator, each on its own bootstrap sample.
    ///
    /// # Errors
    ///
    /// `Training` if the data is empty or inconsistent, `Config` if the
    /// configuration is invalid.
    pub fn fit(
        x: &[FeatureVector],
        y: &[usize],
        n_classes: usize,
        config: &ForestConfig,
    ) -> Result<Self> {
        config.validate()?;

        if x.is_empty() {
            return Err(EngineError::Training("cannot fit with zero samples".into()));
        }
        if x.len() != y.len() {
            return Err(EngineError::Training(format!(
                "{} feature rows but {} labels",
                x.len(),
                y.len()
            )));
        }
        let n_features = x[0].len();
        if n_features == 0 || x.iter().any(|row| row.len() != n_features) {
            return Err(EngineError::Training("feature rows must share a non-zero width".into()));
        }
        if let Some(&label) = y.iter().find(|&&label| label >= n_classes) {
            return Err(EngineError::Training(format!(
                "label index {label} out of range for {n_classes} classes"
            )));
        }

        let params = config.tree_params(n_features);
        let n_samples = x.len();
        let mut rng = GameRng::new(config.seed);

        let trees = (0..config.n_estimators)
            .map(|_| {
                let mut tree_rng = rng.fork();
                let sample: Vec<usize> = (0..n_samples)
                    .map(|_| tree_rng.gen_index(n_samples))
                    .collect();
                DecisionTree::fit(x, y, n_classes, &sample, params, &mut tree_rng)
            })
            .collect();

        Ok(Self {
            trees,
            n_features,
            n_classes,
        })
    }

    /// Mean of the trees' leaf distributions.
    #[must_use]
    pub fn predict_proba(&self, x: &[f64]) -> Vec<f64> {
        let mut proba = vec![0.0; self.n_classes];
        for tree in &self.trees {
            for (total, p) in proba.iter_mut().zip(tree.predict_distribution(x)) {
                *total += p;
            }
        }
        let n_trees = self.trees.len().max(1) as f64;
        for p in &mut proba {
            *p /= n_trees;
        }
        proba
    }

    /// Most probable class index; ties go to the lowest index.
    #[must_use]
    pub fn predict(&self, x: &[f64]) -> usize {
        let proba = self.predict_proba(x);
        let mut best = 0;
        for (class, &p) in proba.iter().enumerate().skip(1) {
            if p > proba[best] {
                best = class;
            }
        }
        best
    }

    /// Whether every tree matches the forest's shape. Required of a
    /// decoded forest before it is used for prediction.
    pub(crate) fn is_consistent(&self) -> bool {
        !self.trees.is_empty()
            && self
                .trees
                .iter()
                .all(|tree| tree.is_consistent(self.n_features, self.n_classes))
    }

    #[must_use]
    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }
}
