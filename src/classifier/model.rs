//! The trained classifier and its persisted form.

use std::fs;
use std::path::Path;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::forest::{ForestConfig, RandomForest};
use super::traits::Predictor;
use super::tree::FeatureVector;
use crate::catalog::{schema, Catalog, ClassLabel, Record};
use crate::core::{EngineError, Result};

/// Leading bytes of a persisted model.
const MODEL_MAGIC: [u8; 4] = *b"SPDX";

/// Bumped whenever the persisted layout changes.
const MODEL_FORMAT_VERSION: u32 = 1;

/// Random forest over named catalog features.
///
/// Immutable once trained; share it between sessions behind an `Arc`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Classifier {
    feature_names: Vec<String>,
    label_name: String,
    classes: Vec<ClassLabel>,
    forest: RandomForest,
}

impl Classifier {
    /// Train with the default forest (100 trees, seed 42).
    ///
    /// # Errors
    ///
    /// See [`Classifier::train_with`].
    pub fn train(catalog: &Catalog, feature_names: &[&str], label_name: &str) -> Result<Self> {
        Self::train_with(catalog, feature_names, label_name, &ForestConfig::default())
    }

    /// Train on every record in the catalog.
    ///
    /// # Errors
    ///
    /// `Training` if fewer than two classes are present, the label column
    /// is not the catalog's class column, or the feature list is empty,
    /// duplicated, or names a column that is not a model input.
    pub fn train_with(
        catalog: &Catalog,
        feature_names: &[&str],
        label_name: &str,
        config: &ForestConfig,
    ) -> Result<Self> {
        if label_name != schema::CLASS {
            return Err(EngineError::Training(format!(
                "unknown label column `{label_name}`"
            )));
        }
        validate_feature_names(feature_names)?;

        let classes = catalog.classes().to_vec();
        if classes.len() < 2 {
            return Err(EngineError::Training(format!(
                "need at least 2 distinct classes, found {}",
                classes.len()
            )));
        }

        let class_index: FxHashMap<&ClassLabel, usize> =
            classes.iter().enumerate().map(|(i, c)| (c, i)).collect();

        let mut x = Vec::with_capacity(catalog.len());
        let mut y = Vec::with_capacity(catalog.len());
        for record in catalog.records() {
            x.push(extract_features(record, feature_names)?);
            y.push(class_index[record.class()]);
        }

        let forest = RandomForest::fit(&x, &y, classes.len(), config)?;

        log::info!(
            "[MODEL] trained {} trees on {} records ({} features, {} classes, seed {})",
            config.n_estimators,
            x.len(),
            feature_names.len(),
            classes.len(),
            config.seed
        );

        Ok(Self {
            feature_names: feature_names.iter().map(|s| (*s).to_string()).collect(),
            label_name: label_name.to_string(),
            classes,
            forest,
        })
    }

    /// Input features in the order the model was trained on.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    #[must_use]
    pub fn label_name(&self) -> &str {
        &self.label_name
    }

    /// Labels the model can output, sorted.
    #[must_use]
    pub fn classes(&self) -> &[ClassLabel] {
        &self.classes
    }

    #[must_use]
    pub fn n_estimators(&self) -> usize {
        self.forest.trees().len()
    }

    /// Extract the model input for a record.
    ///
    /// # Errors
    ///
    /// `InvalidFeature` if a feature is missing or not finite.
    pub fn feature_vector(&self, record: &Record) -> Result<FeatureVector> {
        let mut values = FeatureVector::with_capacity(self.feature_names.len());
        for name in &self.feature_names {
            values.push(feature_value(record, name)?);
        }
        Ok(values)
    }

    /// The single most likely label for a record.
    ///
    /// # Errors
    ///
    /// `InvalidFeature` if the record cannot be turned into model input.
    pub fn predict(&self, record: &Record) -> Result<ClassLabel> {
        let x = self.feature_vector(record)?;
        Ok(self.classes[self.forest.predict(&x)].clone())
    }

    /// Vote share of every class, in [`Classifier::classes`] order.
    ///
    /// # Errors
    ///
    /// Same as [`Classifier::predict`].
    pub fn predict_proba(&self, record: &Record) -> Result<Vec<(ClassLabel, f64)>> {
        let x = self.feature_vector(record)?;
        Ok(self
            .classes
            .iter()
            .cloned()
            .zip(self.forest.predict_proba(&x))
            .collect())
    }

    /// Fraction of catalog records whose prediction matches their label.
    #[must_use]
    pub fn accuracy(&self, catalog: &Catalog) -> f64 {
        if catalog.is_empty() {
            return 0.0;
        }
        let agree = catalog
            .records()
            .iter()
            .filter(|r| self.predict(r).is_ok_and(|label| &label == r.class()))
            .count();
        agree as f64 / catalog.len() as f64
    }

    /// Encode the model with its format header.
    ///
    /// # Errors
    ///
    /// `ModelSave` if encoding fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(&(MODEL_MAGIC, MODEL_FORMAT_VERSION, self)).map_err(|e| {
            EngineError::ModelSave {
                path: "<memory>".into(),
                message: e.to_string(),
            }
        })
    }

    /// Decode a model produced by [`Classifier::to_bytes`].
    ///
    /// # Errors
    ///
    /// `ModelLoad` if the bytes are not a model of the current format.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::decode(bytes, "<memory>")
    }

    fn decode(bytes: &[u8], path: &str) -> Result<Self> {
        let load_error = |message: String| EngineError::ModelLoad {
            path: path.to_string(),
            message,
        };

        let (magic, version): ([u8; 4], u32) =
            bincode::deserialize(bytes).map_err(|e| load_error(format!("bad header: {e}")))?;
        if magic != MODEL_MAGIC {
            return Err(load_error("not a model file".into()));
        }
        if version != MODEL_FORMAT_VERSION {
            return Err(load_error(format!(
                "format version {version}, expected {MODEL_FORMAT_VERSION}"
            )));
        }

        let (_, _, model): ([u8; 4], u32, Classifier) =
            bincode::deserialize(bytes).map_err(|e| load_error(e.to_string()))?;

        if model.forest.n_features() != model.feature_names.len()
            || model.forest.n_classes() != model.classes.len()
        {
            return Err(load_error("model shape does not match its metadata".into()));
        }
        if !model.forest.is_consistent() {
            return Err(load_error("tree structure does not match the model shape".into()));
        }
        validate_feature_names(&model.feature_names.iter().map(String::as_str).collect::<Vec<_>>())
            .map_err(|e| load_error(e.to_string()))?;

        Ok(model)
    }

    /// Write the model to disk.
    ///
    /// # Errors
    ///
    /// `ModelSave` if encoding or writing fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let bytes = self.to_bytes()?;
        fs::write(path, bytes).map_err(|e| EngineError::ModelSave {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        log::info!("[MODEL] saved to {}", path.display());
        Ok(())
    }

    /// Read a model from disk.
    ///
    /// # Errors
    ///
    /// `ModelLoad` if the file is unreadable, corrupt, or of another format.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let bytes = fs::read(path).map_err(|e| EngineError::ModelLoad {
            path: display.clone(),
            message: e.to_string(),
        })?;
        let model = Self::decode(&bytes, &display)?;
        log::info!(
            "[MODEL] loaded {} trees from {}",
            model.n_estimators(),
            display
        );
        Ok(model)
    }

    /// Load a persisted model, or train a fresh one if that fails.
    ///
    /// A model whose classes differ from the catalog's is treated as
    /// stale. A freshly trained model is written back to `path`; failing to
    /// write it is logged and otherwise ignored.
    ///
    /// # Errors
    ///
    /// Only training errors propagate.
    pub fn load_or_train(
        path: impl AsRef<Path>,
        catalog: &Catalog,
        feature_names: &[&str],
        label_name: &str,
        config: &ForestConfig,
    ) -> Result<Self> {
        let path = path.as_ref();
        let loaded = Self::load(path).and_then(|model| {
            if model.classes() == catalog.classes() && model.feature_names == feature_names {
                Ok(model)
            } else {
                Err(EngineError::ModelLoad {
                    path: path.display().to_string(),
                    message: "model does not match the catalog".into(),
                })
            }
        });

        match loaded {
            Ok(model) => Ok(model),
            Err(err) => {
                log::warn!("[MODEL] {err}; retraining");
                let model = Self::train_with(catalog, feature_names, label_name, config)?;
                if let Err(err) = model.save(path) {
                    log::warn!("[MODEL] {err}");
                }
                Ok(model)
            }
        }
    }
}

impl Predictor for Classifier {
    fn predict(&self, record: &Record) -> Result<ClassLabel> {
        Classifier::predict(self, record)
    }
}

fn validate_feature_names(feature_names: &[&str]) -> Result<()> {
    if feature_names.is_empty() {
        return Err(EngineError::Training("no input features given".into()));
    }
    for (i, name) in feature_names.iter().enumerate() {
        if !schema::is_feature(name) {
            return Err(EngineError::Training(format!(
                "`{name}` is not a model input; expected one of {:?}",
                schema::FEATURES
            )));
        }
        if feature_names[..i].contains(name) {
            return Err(EngineError::Training(format!("feature `{name}` listed twice")));
        }
    }
    Ok(())
}

fn feature_value(record: &Record, name: &str) -> Result<f64> {
    let value = record
        .feature(name)
        .ok_or_else(|| EngineError::invalid_feature(name, "missing from record"))?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(EngineError::invalid_feature(name, format!("value {value} is not finite")))
    }
}

fn extract_features(record: &Record, feature_names: &[&str]) -> Result<FeatureVector> {
    feature_names
        .iter()
        .map(|name| feature_value(record, name))
        .collect()
}
