//! CART decision tree over dense feature vectors
//!
//! Nodes live in one arena indexed from the root (0). Growth is breadth
//! first so that a node cap stops the shallowest-first expansion.

use rand::rngs::StdRng;
use rand::seq::index;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// A tree node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    /// `x[feature] <= threshold` goes left
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Per-class counts of the bagged samples reaching this leaf
    Leaf { distribution: Vec<u32> },
}

/// Growth limits for one tree
#[derive(Debug, Clone, Copy)]
pub(crate) struct GrowParams {
    pub variables_per_split: usize,
    pub min_leaf_population: usize,
    pub max_nodes: usize,
}

/// Training rows for one tree: feature vectors with class indices
pub(crate) struct TrainingView<'a> {
    pub features: &'a [&'a [f64]],
    pub labels: &'a [usize],
    pub num_classes: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
}

/// Gini impurity scaled by population: `n * (1 - sum p^2)`
fn weighted_gini(counts: &[u32], n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let n = n as f64;
    let sum_sq: f64 = counts.iter().map(|&c| (c as f64) * (c as f64)).sum();
    n - sum_sq / n
}

fn class_counts(view: &TrainingView, members: &[usize]) -> Vec<u32> {
    let mut counts = vec![0u32; view.num_classes];
    for &i in members {
        counts[view.labels[i]] += 1;
    }
    counts
}

/// Best threshold on one feature, scanning the sorted member values
fn best_threshold(
    view: &TrainingView,
    members: &[usize],
    feature: usize,
    parent: &[u32],
    parent_impurity: f64,
    min_leaf: usize,
) -> Option<BestSplit> {
    let mut order: Vec<(f64, usize)> = members
        .iter()
        .map(|&i| (view.features[i][feature], view.labels[i]))
        .collect();
    order.sort_by(|a, b| a.0.total_cmp(&b.0));

    let n = order.len();
    let mut left = vec![0u32; view.num_classes];
    let mut right = parent.to_vec();
    let mut best: Option<BestSplit> = None;

    for i in 0..n - 1 {
        let (value, class) = order[i];
        left[class] += 1;
        right[class] -= 1;

        let next = order[i + 1].0;
        if value == next {
            continue;
        }
        let n_left = i + 1;
        let n_right = n - n_left;
        if n_left < min_leaf || n_right < min_leaf {
            continue;
        }

        let gain = parent_impurity - weighted_gini(&left, n_left) - weighted_gini(&right, n_right);
        // Only strictly positive gains qualify
        if gain > best.as_ref().map_or(0.0, |b| b.gain) {
            let mut threshold = value + (next - value) / 2.0;
            if threshold >= next {
                threshold = value;
            }
            best = Some(BestSplit {
                feature,
                threshold,
                gain,
            });
        }
    }
    best
}

impl DecisionTree {
    /// Grow a tree on the `bag` rows of `view`.
    ///
    /// `importance[f]` accumulates the impurity decrease of every split on
    /// feature `f`.
    pub(crate) fn grow(
        view: &TrainingView,
        bag: Vec<usize>,
        params: GrowParams,
        rng: &mut StdRng,
        importance: &mut [f64],
    ) -> Self {
        let num_features = importance.len();
        let mut nodes = vec![Node::Leaf {
            distribution: Vec::new(),
        }];
        let mut queue = VecDeque::from([(0usize, bag)]);

        while let Some((at, members)) = queue.pop_front() {
            let counts = class_counts(view, &members);
            let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
            if pure
                || members.len() <= params.min_leaf_population
                || nodes.len() + 2 > params.max_nodes
            {
                nodes[at] = Node::Leaf {
                    distribution: counts,
                };
                continue;
            }

            let parent_impurity = weighted_gini(&counts, members.len());
            let candidates = index::sample(rng, num_features, params.variables_per_split);
            let best = candidates
                .iter()
                .filter_map(|f| {
                    best_threshold(
                        view,
                        &members,
                        f,
                        &counts,
                        parent_impurity,
                        params.min_leaf_population,
                    )
                })
                .fold(None::<BestSplit>, |acc, s| match acc {
                    Some(a) if a.gain >= s.gain => Some(a),
                    _ => Some(s),
                });

            // No candidate improves purity: the node stays a leaf even if
            // the other stop rules would allow a split
            let Some(split) = best else {
                nodes[at] = Node::Leaf {
                    distribution: counts,
                };
                continue;
            };

            importance[split.feature] += split.gain;
            let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = members
                .into_iter()
                .partition(|&i| view.features[i][split.feature] <= split.threshold);

            let left = nodes.len();
            let right = left + 1;
            nodes.push(Node::Leaf {
                distribution: Vec::new(),
            });
            nodes.push(Node::Leaf {
                distribution: Vec::new(),
            });
            nodes[at] = Node::Split {
                feature: split.feature,
                threshold: split.threshold,
                left,
                right,
            };
            queue.push_back((left, left_rows));
            queue.push_back((right, right_rows));
        }

        Self { nodes }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Class distribution of the leaf `x` falls into
    pub fn leaf(&self, x: &[f64]) -> &[u32] {
        let mut at = 0;
        loop {
            match &self.nodes[at] {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => at = if x[*feature] <= *threshold { *left } else { *right },
                Node::Leaf { distribution } => return distribution,
            }
        }
    }

    /// Majority class index of the leaf `x` falls into; ties go to the lower index
    pub fn vote(&self, x: &[f64]) -> usize {
        argmax_lowest(self.leaf(x))
    }
}

/// Index of the largest count, the lowest index among equals
pub(crate) fn argmax_lowest(counts: &[u32]) -> usize {
    let mut best = 0;
    for (i, &c) in counts.iter().enumerate() {
        if c > counts[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn grow_on(features: &[Vec<f64>], labels: &[usize], params: GrowParams) -> (DecisionTree, Vec<f64>) {
        let rows: Vec<&[f64]> = features.iter().map(|f| f.as_slice()).collect();
        let view = TrainingView {
            features: &rows,
            labels,
            num_classes: 2,
        };
        let mut importance = vec![0.0; features[0].len()];
        let mut rng = StdRng::seed_from_u64(1);
        let tree = DecisionTree::grow(&view, (0..labels.len()).collect(), params, &mut rng, &mut importance);
        (tree, importance)
    }

    fn params() -> GrowParams {
        GrowParams {
            variables_per_split: 2,
            min_leaf_population: 1,
            max_nodes: usize::MAX,
        }
    }

    #[test]
    fn test_separable_split_on_informative_feature() {
        let features = vec![
            vec![0.0, 5.0],
            vec![1.0, 5.0],
            vec![10.0, 5.0],
            vec![11.0, 5.0],
        ];
        let (tree, importance) = grow_on(&features, &[0, 0, 1, 1], params());
        assert_eq!(tree.node_count(), 3);
        match &tree.nodes()[0] {
            Node::Split { feature, threshold, .. } => {
                assert_eq!(*feature, 0);
                assert_eq!(*threshold, 5.5);
            }
            other => panic!("expected split, got {:?}", other),
        }
        assert_eq!(tree.vote(&[2.0, 0.0]), 0);
        assert_eq!(tree.vote(&[9.0, 0.0]), 1);
        assert!(importance[0] > 0.0);
        assert_eq!(importance[1], 0.0);
    }

    #[test]
    fn test_node_cap() {
        let features: Vec<Vec<f64>> = (0..16).map(|i| vec![i as f64, 0.0]).collect();
        let labels: Vec<usize> = (0..16).map(|i| i % 2).collect();
        let capped = GrowParams {
            max_nodes: 5,
            ..params()
        };
        let (tree, _) = grow_on(&features, &labels, capped);
        assert!(tree.node_count() <= 5);
    }

    #[test]
    fn test_min_leaf_rejects_small_children() {
        // Only the split isolating the first row improves purity
        let features = vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![2.0, 0.0]];
        let labels = [1, 0, 0];

        let (tree, _) = grow_on(&features, &labels, params());
        assert_eq!(tree.node_count(), 3);

        let guarded = GrowParams {
            min_leaf_population: 2,
            ..params()
        };
        let (tree, importance) = grow_on(&features, &labels, guarded);
        assert_eq!(tree.nodes(), &[Node::Leaf { distribution: vec![2, 1] }]);
        assert_eq!(importance, vec![0.0, 0.0]);
    }

    #[test]
    fn test_pure_root_is_leaf() {
        let features = vec![vec![0.0, 1.0], vec![3.0, 2.0]];
        let (tree, importance) = grow_on(&features, &[1, 1], params());
        assert_eq!(tree.nodes(), &[Node::Leaf { distribution: vec![0, 2] }]);
        assert_eq!(importance, vec![0.0, 0.0]);
    }

    #[test]
    fn test_argmax_ties_take_lowest() {
        assert_eq!(argmax_lowest(&[2, 3, 3]), 1);
        assert_eq!(argmax_lowest(&[0, 0]), 0);
    }
}
