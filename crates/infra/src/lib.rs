//! Stateful side of the pipeline: the sensor state store and the
//! recommendation coordinator that sits on top of it.

pub mod coordinator;
pub mod state_store;

pub use coordinator::{CoordinatorConfig, PipelineStatus, RecommendationCoordinator, RefreshPolicy};
pub use state_store::{Recommendation, RecommendationSnapshot, SensorStateStore, StoredReading};
