//! Pipeline error model.

use thiserror::Error;

/// Result type used across the pipeline.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Pipeline-level error.
///
/// Every variant maps to a stable, machine-readable [`kind`](PipelineError::kind)
/// so outer layers can render structured error payloads without matching on
/// message text.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// A sensor field could not be read as a finite number.
    #[error("invalid value for field '{field}': {reason}")]
    Validation { field: String, reason: String },

    /// Classifier or label decoder artifacts did not load at startup.
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    /// Prediction or label decoding failed for a well-formed reading.
    #[error("prediction failed: {0}")]
    Inference(String),

    /// A recommendation was requested before any reading was ingested.
    #[error("no sensor data available")]
    NoSensorData,

    /// The crop is not part of the profile catalog.
    #[error("crop not found: {0}")]
    CropNotFound(String),
}

impl PipelineError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn model_unavailable(msg: impl Into<String>) -> Self {
        Self::ModelUnavailable(msg.into())
    }

    pub fn inference(msg: impl Into<String>) -> Self {
        Self::Inference(msg.into())
    }

    pub fn crop_not_found(crop: impl Into<String>) -> Self {
        Self::CropNotFound(crop.into())
    }

    /// Stable snake_case identifier of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Validation { .. } => "validation_error",
            PipelineError::ModelUnavailable(_) => "model_unavailable",
            PipelineError::Inference(_) => "inference_error",
            PipelineError::NoSensorData => "no_sensor_data",
            PipelineError::CropNotFound(_) => "crop_not_found",
        }
    }
}
