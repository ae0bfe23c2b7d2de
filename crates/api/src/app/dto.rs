use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use agroplan_agronomy::FertilizerPlan;
use agroplan_ai::RecommendationSource;
use agroplan_core::{ReadingId, SensorReading};
use agroplan_infra::{PipelineStatus, RecommendationSnapshot, StoredReading};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct CropQuery {
    pub crop: Option<String>,
}

impl CropQuery {
    /// The trimmed crop name, or `None` when absent or blank.
    pub fn crop(&self) -> Option<&str> {
        self.crop.as_deref().map(str::trim).filter(|c| !c.is_empty())
    }
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct SensorDataAccepted {
    pub status: &'static str,
    pub message: &'static str,
    pub received: SensorReading,
    pub reading_id: ReadingId,
    pub received_at: DateTime<Utc>,
}

impl From<StoredReading> for SensorDataAccepted {
    fn from(stored: StoredReading) -> Self {
        Self {
            status: "success",
            message: "Sensor data received",
            received: stored.reading,
            reading_id: stored.reading_id,
            received_at: stored.received_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RecommendationResponse {
    pub recommended_crops: Vec<String>,
    pub source: RecommendationSource,
    pub sensor_data: SensorReading,
    pub reading_id: ReadingId,
    pub received_at: DateTime<Utc>,
    pub computed_at: DateTime<Utc>,
}

impl From<RecommendationSnapshot> for RecommendationResponse {
    fn from(snapshot: RecommendationSnapshot) -> Self {
        let RecommendationSnapshot {
            recommendation,
            reading,
        } = snapshot;
        Self {
            recommended_crops: vec![recommendation.crop],
            source: recommendation.source,
            sensor_data: reading.reading,
            reading_id: reading.reading_id,
            received_at: reading.received_at,
            computed_at: recommendation.computed_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FertilizerResponse {
    #[serde(flatten)]
    pub plan: FertilizerPlan,
    pub sensor_data: SensorReading,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub model_loaded: bool,
    pub model_error: Option<String>,
    pub feature_order: String,
    pub has_sensor_data: bool,
    pub latest_recommendation: Option<String>,
    pub recommendation_source: Option<RecommendationSource>,
    pub fallback_enabled: bool,
    pub refresh: String,
    pub ingest_mode: String,
    pub endpoints: Vec<&'static str>,
}

pub const ENDPOINTS: [&str; 6] = [
    "GET /",
    "GET /health",
    "POST /sensor-data",
    "GET /recommend-crops",
    "GET /crop-soil?crop=<name>",
    "GET /fertilizer?crop=<name>",
];

impl From<PipelineStatus> for StatusResponse {
    fn from(status: PipelineStatus) -> Self {
        let (latest_recommendation, recommendation_source) = match status.latest_recommendation {
            Some(r) => (Some(r.crop), Some(r.source)),
            None => (None, None),
        };
        Self {
            status: "online",
            model_loaded: status.model_loaded,
            model_error: status.model_error,
            feature_order: status.feature_order,
            has_sensor_data: status.has_sensor_data,
            latest_recommendation,
            recommendation_source,
            fallback_enabled: status.fallback_enabled,
            refresh: status.refresh.to_string(),
            ingest_mode: status.ingest_mode.to_string(),
            endpoints: ENDPOINTS.to_vec(),
        }
    }
}
