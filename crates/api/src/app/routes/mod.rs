use axum::{
    routing::{get, post},
    Router,
};

pub mod crops;
pub mod recommend;
pub mod sensor;
pub mod system;

/// Router for the pipeline endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/", get(system::status))
        .route("/sensor-data", post(sensor::ingest))
        .route("/recommend-crops", get(recommend::recommend_crops))
        .route("/crop-soil", get(crops::crop_soil))
        .route("/fertilizer", get(crops::fertilizer))
}
