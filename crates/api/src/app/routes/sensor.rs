use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::Value;

use agroplan_core::SensorUpdate;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub async fn ingest(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<Value>, JsonRejection>,
) -> axum::response::Response {
    let Json(payload) = match body {
        Ok(b) => b,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "rejected sensor payload");
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "validation_error",
                rejection.body_text(),
            );
        }
    };

    // Validate in full before anything touches the store.
    let update = match SensorUpdate::from_json(&payload) {
        Ok(u) => u,
        Err(e) => return errors::pipeline_error_to_response(e),
    };

    match services.run(move |c| c.ingest(&update)).await {
        Ok(stored) => Json(dto::SensorDataAccepted::from(stored)).into_response(),
        Err(e) => errors::join_error_to_response(e),
    }
}
