//! `agroplan-ai`
//!
//! **Responsibility:** crop classification boundary.
//!
//! - Loads the pre-trained classifier and label decoder artifacts once.
//! - Turns a [`SensorReading`](agroplan_core::SensorReading) into a feature vector
//!   in the deployment's configured order and decodes the prediction.
//! - Provides the rule-based fallback used when the classifier cannot answer.
//!
//! Nothing in here is mutable after construction.

pub mod decoder;
pub mod engine;
pub mod heuristic;
pub mod model;
pub mod result;
pub mod schema;

#[cfg(test)]
mod fixtures;

pub use decoder::LabelDecoder;
pub use engine::ClassificationEngine;
pub use heuristic::HeuristicRecommender;
pub use model::{CropClassifier, TreeEnsemble, TreeNode};
pub use result::{ArtifactError, ClassifyError, RecommendationSource};
pub use schema::FeatureSchema;
