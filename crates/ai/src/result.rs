use serde::{Deserialize, Serialize};
use thiserror::Error;

use agroplan_core::{PipelineError, SensorField};

/// Where a crop label came from.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationSource {
    /// Pre-trained classifier + label decoder.
    MlModel,
    /// Rule-based fallback used when the classifier could not answer.
    Heuristic,
}

impl RecommendationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationSource::MlModel => "ml_model",
            RecommendationSource::Heuristic => "heuristic",
        }
    }
}

/// Failure of a single classification call.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ClassifyError {
    /// Detail about the load failure is logged at startup, never returned.
    #[error("crop classifier is not loaded")]
    ModelUnavailable,

    #[error("reading has no value for feature '{0}'")]
    MissingFeature(SensorField),

    #[error("invalid feature vector: {0}")]
    InvalidInput(String),

    #[error("inference failed: {0}")]
    InferenceFailed(String),

    #[error("class index {0} is not known to the label decoder")]
    UnknownLabel(usize),
}

impl From<ClassifyError> for PipelineError {
    fn from(err: ClassifyError) -> Self {
        match err {
            e @ ClassifyError::ModelUnavailable => PipelineError::model_unavailable(e.to_string()),
            other => PipelineError::inference(other.to_string()),
        }
    }
}

/// Failure to load or validate a model artifact.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed artifact: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid artifact: {0}")]
    Invalid(String),
}

impl ArtifactError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }
}

pub(crate) fn read_artifact(path: &std::path::Path) -> Result<String, ArtifactError> {
    std::fs::read_to_string(path).map_err(|source| ArtifactError::Io {
        path: path.display().to_string(),
        source,
    })
}
