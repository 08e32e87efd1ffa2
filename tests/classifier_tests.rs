//! Classifier training, persistence and recovery tests on the sample catalog.

use serde::Serialize;
use spacedex::catalog::schema::FEATURES;
use spacedex::classifier::TreeNode;
use spacedex::{Catalog, ClassLabel, Classifier, EngineError, ForestConfig};

const FIXTURE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data/star_classification_sample.csv");

fn catalog() -> Catalog {
    Catalog::load(FIXTURE).unwrap()
}

fn small_forest() -> ForestConfig {
    ForestConfig::default().with_n_estimators(25)
}

// =============================================================================
// Training
// =============================================================================

#[test]
fn test_learns_sample_catalog() {
    let catalog = catalog();
    let model = Classifier::train_with(&catalog, &FEATURES, "class", &small_forest()).unwrap();

    assert_eq!(model.classes(), catalog.classes());
    assert_eq!(model.n_estimators(), 25);
    assert!(model.accuracy(&catalog) > 0.9, "accuracy {}", model.accuracy(&catalog));
}

#[test]
fn test_training_deterministic_with_seed() {
    let catalog = catalog();
    let a = Classifier::train_with(&catalog, &FEATURES, "class", &small_forest()).unwrap();
    let b = Classifier::train_with(&catalog, &FEATURES, "class", &small_forest()).unwrap();

    for record in catalog.records() {
        assert_eq!(a.predict(record).unwrap(), b.predict(record).unwrap());
        assert_eq!(a.predict_proba(record).unwrap(), b.predict_proba(record).unwrap());
    }
}

#[test]
fn test_predict_is_repeatable() {
    let catalog = catalog();
    let model = Classifier::train_with(&catalog, &FEATURES, "class", &small_forest()).unwrap();
    let record = &catalog.records()[7];

    let first = model.predict(record).unwrap();
    for _ in 0..10 {
        assert_eq!(model.predict(record).unwrap(), first);
    }
}

#[test]
fn test_redshift_only_model() {
    let catalog = catalog();
    let model = Classifier::train_with(&catalog, &["redshift"], "class", &small_forest()).unwrap();

    assert_eq!(model.feature_names(), ["redshift"]);
    assert!(model.accuracy(&catalog) > 0.9);
}

#[test]
fn test_unknown_label_column() {
    let err = Classifier::train(&catalog(), &FEATURES, "subclass").unwrap_err();
    assert!(matches!(err, EngineError::Training(_)));
}

// =============================================================================
// Persistence
// =============================================================================

#[test]
fn test_save_and_load() {
    let catalog = catalog();
    let model = Classifier::train_with(&catalog, &FEATURES, "class", &small_forest()).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.bin");

    model.save(&path).unwrap();
    let loaded = Classifier::load(&path).unwrap();

    assert_eq!(loaded.classes(), model.classes());
    assert_eq!(loaded.feature_names(), model.feature_names());
    for record in catalog.records() {
        assert_eq!(loaded.predict(record).unwrap(), model.predict(record).unwrap());
    }
}

#[test]
fn test_load_missing_model() {
    let dir = tempfile::tempdir().unwrap();
    let err = Classifier::load(dir.path().join("absent.bin")).unwrap_err();
    assert!(matches!(err, EngineError::ModelLoad { .. }));
    assert!(err.is_recoverable());
}

#[test]
fn test_load_corrupt_model() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.bin");
    std::fs::write(&path, b"definitely not a forest").unwrap();

    assert!(matches!(Classifier::load(&path), Err(EngineError::ModelLoad { .. })));
}

#[test]
fn test_save_to_missing_directory() {
    let catalog = catalog();
    let model = Classifier::train_with(&catalog, &FEATURES, "class", &small_forest()).unwrap();
    let dir = tempfile::tempdir().unwrap();

    let err = model.save(dir.path().join("no/such/dir/model.bin")).unwrap_err();

    assert!(matches!(err, EngineError::ModelSave { .. }));
}

// =============================================================================
// Load-or-train recovery
// =============================================================================

#[test]
fn test_load_or_train_writes_model() {
    let catalog = catalog();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.bin");

    let trained =
        Classifier::load_or_train(&path, &catalog, &FEATURES, "class", &small_forest()).unwrap();

    assert!(path.exists());
    let reloaded = Classifier::load(&path).unwrap();
    assert_eq!(reloaded.n_estimators(), trained.n_estimators());
}

#[test]
fn test_load_or_train_reuses_model() {
    let catalog = catalog();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.bin");
    Classifier::train_with(&catalog, &FEATURES, "class", &small_forest())
        .unwrap()
        .save(&path)
        .unwrap();

    // A different tree count shows whether the file or a fresh fit was used.
    let config = ForestConfig::default().with_n_estimators(3);
    let model = Classifier::load_or_train(&path, &catalog, &FEATURES, "class", &config).unwrap();

    assert_eq!(model.n_estimators(), 25);
}

#[test]
fn test_load_or_train_recovers_from_corrupt_file() {
    let catalog = catalog();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.bin");
    std::fs::write(&path, [0u8; 16]).unwrap();

    let model =
        Classifier::load_or_train(&path, &catalog, &FEATURES, "class", &small_forest()).unwrap();

    assert_eq!(model.n_estimators(), 25);
    assert!(Classifier::load(&path).is_ok());
}

#[test]
fn test_load_or_train_retrains_on_feature_mismatch() {
    let catalog = catalog();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.bin");
    Classifier::train_with(&catalog, &["redshift"], "class", &small_forest())
        .unwrap()
        .save(&path)
        .unwrap();

    let model =
        Classifier::load_or_train(&path, &catalog, &FEATURES, "class", &small_forest()).unwrap();

    assert_eq!(model.feature_names().len(), FEATURES.len());
}

// =============================================================================
// Hand-built model files
// =============================================================================

/// Same field layout as the persisted model, so bincode writes identical bytes.
#[derive(Serialize)]
struct StoredTree {
    root: TreeNode,
    n_features: usize,
    n_classes: usize,
}

#[derive(Serialize)]
struct StoredForest {
    trees: Vec<StoredTree>,
    n_features: usize,
    n_classes: usize,
}

#[derive(Serialize)]
struct StoredModel {
    feature_names: Vec<String>,
    label_name: String,
    classes: Vec<ClassLabel>,
    forest: StoredForest,
}

fn leaf(distribution: [f64; 3]) -> Box<TreeNode> {
    Box::new(TreeNode::Leaf {
        distribution: distribution.to_vec(),
        n_samples: 1,
    })
}

/// One-stump redshift model whose split reads input `feature`.
fn stump_model_bytes(feature: usize) -> Vec<u8> {
    let model = StoredModel {
        feature_names: vec!["redshift".into()],
        label_name: "class".into(),
        classes: ["GALAXY", "QSO", "STAR"].into_iter().map(ClassLabel::from).collect(),
        forest: StoredForest {
            trees: vec![StoredTree {
                root: TreeNode::Split {
                    feature,
                    threshold: 0.01,
                    left: leaf([0.0, 0.0, 1.0]),
                    right: leaf([1.0, 0.0, 0.0]),
                },
                n_features: 1,
                n_classes: 3,
            }],
            n_features: 1,
            n_classes: 3,
        },
    };
    bincode::serialize(&(*b"SPDX", 1u32, &model)).unwrap()
}

#[test]
fn test_hand_built_model_loads() {
    let model = Classifier::from_bytes(&stump_model_bytes(0)).unwrap();

    assert_eq!(model.n_estimators(), 1);
    let catalog = catalog();
    let star = catalog.records().iter().find(|r| r.class() == "STAR").unwrap();
    assert_eq!(model.predict(star).unwrap(), "STAR");
}

#[test]
fn test_split_on_missing_input_is_rejected() {
    match Classifier::from_bytes(&stump_model_bytes(7)) {
        Err(EngineError::ModelLoad { message, .. }) => assert!(message.contains("tree structure")),
        other => panic!("expected ModelLoad, got {other:?}"),
    }
}

#[test]
fn test_load_or_train_replaces_inconsistent_model() {
    let catalog = catalog();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.bin");
    std::fs::write(&path, stump_model_bytes(7)).unwrap();
    assert!(matches!(Classifier::load(&path), Err(EngineError::ModelLoad { .. })));

    let model =
        Classifier::load_or_train(&path, &catalog, &["redshift"], "class", &small_forest()).unwrap();

    assert_eq!(model.n_estimators(), 25);
    assert!(model.accuracy(&catalog) > 0.9);
    assert_eq!(Classifier::load(&path).unwrap().n_estimators(), 25);
}
