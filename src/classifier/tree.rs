//! CART decision tree with Gini impurity.
//!
//! Trees are grown on a bootstrap sample given as row indices (duplicates
//! allowed) and examine a random subset of features at each split. Leaves
//! keep the class distribution of the rows that reached them so the forest
//! can average probabilities.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::core::GameRng;

/// Dense feature vector for one record, in the model's feature order.
pub type FeatureVector = SmallVec<[f64; 8]>;

/// A node in a fitted tree.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum TreeNode {
    /// Internal node: rows with `x[feature] <= threshold` go left.
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
    /// Terminal node with the class distribution of its training rows.
    Leaf {
        distribution: Vec<f64>,
        n_samples: usize,
    },
}

impl TreeNode {
    /// Depth of the subtree; a leaf has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 0,
            TreeNode::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    /// Number of leaves in the subtree.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Split { left, right, .. } => left.n_leaves() + right.n_leaves(),
        }
    }

    /// Whether every split indexes a real feature with a finite threshold
    /// and every leaf has one finite entry per class.
    fn is_consistent(&self, n_features: usize, n_classes: usize) -> bool {
        match self {
            TreeNode::Leaf { distribution, .. } => {
                distribution.len() == n_classes && distribution.iter().all(|p| p.is_finite())
            }
            TreeNode::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                *feature < n_features
                    && threshold.is_finite()
                    && left.is_consistent(n_features, n_classes)
                    && right.is_consistent(n_features, n_classes)
            }
        }
    }
}

/// Growth limits for one tree.
#[derive(Clone, Copy, Debug)]
pub(crate) struct TreeParams {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub max_features: usize,
}

/// A fitted classification tree.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DecisionTree {
    root: TreeNode,
    n_features: usize,
    n_classes: usize,
}

impl DecisionTree {
    /// Grow a tree over the rows listed in `sample`.
    ///
    /// `x` and `y` must have the same length, every label must be below
    /// `n_classes` and `sample` must be non-empty.
    pub(crate) fn fit(
        x: &[FeatureVector],
        y: &[usize],
        n_classes: usize,
        sample: &[usize],
        params: TreeParams,
        rng: &mut GameRng,
    ) -> Self {
        debug_assert_eq!(x.len(), y.len());
        debug_assert!(!sample.is_empty());

        let n_features = x.first().map_or(0, |row| row.len());
        let mut builder = TreeBuilder {
            x,
            y,
            n_classes,
            n_features,
            params,
            rng,
        };
        let root = builder.build(sample, 0);

        Self {
            root,
            n_features,
            n_classes,
        }
    }

    /// Class distribution of the leaf `x` falls into.
    #[must_use]
    pub fn predict_distribution(&self, x: &[f64]) -> &[f64] {
        let mut node = &self.root;
        loop {
            match node {
                TreeNode::Leaf { distribution, .. } => return distribution,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if x[*feature] <= *threshold { left } else { right };
                }
            }
        }
    }

    /// Whether the tree can be evaluated on `n_features` inputs and
    /// yields `n_classes` probabilities. Decoded trees must pass this
    /// before [`DecisionTree::predict_distribution`] is safe to call.
    pub(crate) fn is_consistent(&self, n_features: usize, n_classes: usize) -> bool {
        self.n_features == n_features
            && self.n_classes == n_classes
            && self.root.is_consistent(n_features, n_classes)
    }

    #[must_use]
    pub fn root(&self) -> &TreeNode {
        &self.root
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

struct TreeBuilder<'a> {
    x: &'a [FeatureVector],
    y: &'a [usize],
    n_classes: usize,
    n_features: usize,
    params: TreeParams,
    rng: &'a mut GameRng,
}

impl TreeBuilder<'_> {
    fn build(&mut self, rows: &[usize], depth: usize) -> TreeNode {
        let counts = self.class_counts(rows);

        let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
        let too_small = rows.len() < self.params.min_samples_split;
        let too_deep = self.params.max_depth.is_some_and(|max| depth >= max);
        if pure || too_small || too_deep {
            return self.leaf(&counts, rows.len());
        }

        let Some((feature, threshold)) = self.best_split(rows, &counts) else {
            return self.leaf(&counts, rows.len());
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .iter()
            .partition(|&&row| self.x[row][feature] <= threshold);

        TreeNode::Split {
            feature,
            threshold,
            left: Box::new(self.build(&left_rows, depth + 1)),
            right: Box::new(self.build(&right_rows, depth + 1)),
        }
    }

    fn leaf(&self, counts: &[usize], n_samples: usize) -> TreeNode {
        let total = n_samples.max(1) as f64;
        TreeNode::Leaf {
            distribution: counts.iter().map(|&c| c as f64 / total).collect(),
            n_samples,
        }
    }

    fn class_counts(&self, rows: &[usize]) -> Vec<usize> {
        let mut counts = vec![0; self.n_classes];
        for &row in rows {
            counts[self.y[row]] += 1;
        }
        counts
    }

    /// Lowest weighted-Gini split over a random feature subset.
    ///
    /// Like CART in random forests, the search continues past
    /// `max_features` candidates until at least one valid split is found.
    fn best_split(&mut self, rows: &[usize], parent_counts: &[usize]) -> Option<(usize, f64)> {
        let n = rows.len();
        let parent_impurity = gini(parent_counts, n);

        let mut features: Vec<usize> = (0..self.n_features).collect();
        self.rng.shuffle(&mut features);

        let mut order = rows.to_vec();
        let mut best: Option<(usize, f64, f64)> = None;

        for (examined, &feature) in features.iter().enumerate() {
            if examined >= self.params.max_features && best.is_some() {
                break;
            }

            let x = self.x;
            order.sort_by(|&a, &b| x[a][feature].total_cmp(&x[b][feature]));

            let mut left = vec![0usize; self.n_classes];
            let mut right = parent_counts.to_vec();

            for pos in 0..n - 1 {
                let label = self.y[order[pos]];
                left[label] += 1;
                right[label] -= 1;

                let value = x[order[pos]][feature];
                let next = x[order[pos + 1]][feature];
                if value >= next {
                    continue;
                }

                let n_left = pos + 1;
                let n_right = n - n_left;
                let impurity = (n_left as f64 * gini(&left, n_left)
                    + n_right as f64 * gini(&right, n_right))
                    / n as f64;

                if impurity < parent_impurity - 1e-12
                    && best.map_or(true, |(_, _, best_impurity)| impurity < best_impurity)
                {
                    best = Some((feature, midpoint(value, next), impurity));
                }
            }
        }

        best.map(|(feature, threshold, _)| (feature, threshold))
    }
}

/// Gini impurity `1 - Σ p²` of a class histogram.
fn gini(counts: &[usize], n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let n = n as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / n;
            p * p
        })
        .sum::<f64>()
}

/// Threshold strictly below `next` so the upper value always goes right.
fn midpoint(value: f64, next: f64) -> f64 {
    let mid = value + (next - value) / 2.0;
    if mid < next {
        mid
    } else {
        value
    }
}
