//! Supervised classification
//!
//! - **Decision tree**: CART with Gini impurity, breadth-first growth
//! - **Random forest**: seeded bagging, per-tree parallel training, OOB error
//! - **Accuracy**: confusion matrices, overall accuracy, kappa, per-class accuracy

mod accuracy;
mod forest;
mod tree;

pub use accuracy::{assess, AccuracyAssessor, AccuracyReport, ConfusionMatrix};
pub use forest::{BandImportance, Explanation, ForestModel, ForestParams, RandomForestTrainer};
pub use tree::{DecisionTree, Node};
