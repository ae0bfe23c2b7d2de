use std::sync::Arc;

use axum::{extract::Extension, response::IntoResponse, Json};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub async fn recommend_crops(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.run(|c| c.get_recommendation()).await {
        Ok(Ok(snapshot)) => Json(dto::RecommendationResponse::from(snapshot)).into_response(),
        Ok(Err(e)) => errors::pipeline_error_to_response(e),
        Err(e) => errors::join_error_to_response(e),
    }
}
