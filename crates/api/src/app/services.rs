use std::sync::Arc;

use tokio::task::JoinError;

use agroplan_agronomy::CropProfileCatalog;
use agroplan_ai::ClassificationEngine;
use agroplan_infra::RecommendationCoordinator;

use crate::config::AppConfig;

/// Process-wide services shared by every handler.
#[derive(Debug, Clone)]
pub struct AppServices {
    coordinator: Arc<RecommendationCoordinator>,
}

impl AppServices {
    pub fn new(coordinator: RecommendationCoordinator) -> Self {
        Self {
            coordinator: Arc::new(coordinator),
        }
    }

    /// Load the model artifacts and wire the pipeline.
    ///
    /// Blocking: reads files and runs a warm-up prediction. A missing or
    /// invalid artifact leaves the model unavailable rather than failing.
    pub fn from_config(config: &AppConfig) -> Self {
        let engine = ClassificationEngine::load(
            config.feature_order.clone(),
            &config.model_path,
            &config.labels_path,
        );

        let catalog = Arc::new(CropProfileCatalog::builtin());
        tracing::info!(
            crops = catalog.len(),
            refresh = %config.refresh,
            ingest_mode = %config.ingest_mode,
            fallback = config.fallback,
            "pipeline ready"
        );
        Self::new(RecommendationCoordinator::new(
            engine,
            catalog,
            config.coordinator_config(),
        ))
    }

    pub fn coordinator(&self) -> &RecommendationCoordinator {
        &self.coordinator
    }

    /// Run `f` against the coordinator on the blocking pool.
    ///
    /// Classification and lock waits must not stall the async workers.
    pub async fn run<F, T>(&self, f: F) -> Result<T, JoinError>
    where
        F: FnOnce(&RecommendationCoordinator) -> T + Send + 'static,
        T: Send + 'static,
    {
        let coordinator = Arc::clone(&self.coordinator);
        tokio::task::spawn_blocking(move || f(&coordinator)).await
    }
}
