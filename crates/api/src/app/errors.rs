use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use agroplan_core::PipelineError;

pub fn pipeline_error_to_response(err: PipelineError) -> axum::response::Response {
    let status = match &err {
        PipelineError::Validation { .. } => StatusCode::BAD_REQUEST,
        PipelineError::NoSensorData | PipelineError::CropNotFound(_) => StatusCode::NOT_FOUND,
        PipelineError::ModelUnavailable(_) | PipelineError::Inference(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    let message = match &err {
        PipelineError::CropNotFound(_) => "Crop not found".to_string(),
        other => other.to_string(),
    };
    json_error(status, err.kind(), message)
}

/// A blocking pipeline call that never returned (panicked or was cancelled).
pub fn join_error_to_response(err: tokio::task::JoinError) -> axum::response::Response {
    tracing::error!(error = %err, "pipeline task failed");
    json_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal_error",
        "internal error",
    )
}

pub fn json_error(
    status: StatusCode,
    kind: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": message.into(),
            "kind": kind,
        })),
    )
        .into_response()
}
