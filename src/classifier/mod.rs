//! Object classifier: a random forest over photometric features.
//!
//! The model is trained once per process (or loaded from disk) and then
//! only read. Its prediction, not the catalog's own label, is the answer a
//! player is scored against.
//!
//! - `tree`: CART decision trees with Gini impurity
//! - `forest`: bootstrap-aggregated trees and their configuration
//! - `model`: the named-feature `Classifier`, persistence and recovery
//! - `traits`: the `Predictor` seam used by the round state machine

pub mod forest;
pub mod model;
pub mod traits;
pub mod tree;

pub use forest::{ForestConfig, RandomForest};
pub use model::Classifier;
pub use traits::{ConstantPredictor, Predictor};
pub use tree::{DecisionTree, FeatureVector, TreeNode};
