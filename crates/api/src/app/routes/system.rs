use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn status(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.run(|c| c.status()).await {
        Ok(status) => Json(dto::StatusResponse::from(status)).into_response(),
        Err(e) => errors::join_error_to_response(e),
    }
}
