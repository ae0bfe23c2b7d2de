use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

fn require_crop(query: &dto::CropQuery) -> Result<String, axum::response::Response> {
    query.crop().map(str::to_string).ok_or_else(|| {
        errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "query parameter 'crop' is required",
        )
    })
}

pub async fn crop_soil(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::CropQuery>,
) -> axum::response::Response {
    let crop = match require_crop(&query) {
        Ok(c) => c,
        Err(resp) => return resp,
    };

    match services.coordinator().crop_profile(&crop) {
        Ok(profile) => Json(profile).into_response(),
        Err(e) => errors::pipeline_error_to_response(e),
    }
}

pub async fn fertilizer(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::CropQuery>,
) -> axum::response::Response {
    let crop = match require_crop(&query) {
        Ok(c) => c,
        Err(resp) => return resp,
    };

    match services.run(move |c| c.fertilizer_plan(&crop)).await {
        Ok(Ok((plan, stored))) => Json(dto::FertilizerResponse {
            plan,
            sensor_data: stored.reading,
        })
        .into_response(),
        Ok(Err(e)) => errors::pipeline_error_to_response(e),
        Err(e) => errors::join_error_to_response(e),
    }
}
