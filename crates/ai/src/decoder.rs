use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::result::{read_artifact, ArtifactError, ClassifyError};

/// Maps encoded class indices back to crop names (`{"classes": [...]}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelDecoder {
    classes: Vec<String>,
}

impl LabelDecoder {
    pub fn new(classes: Vec<String>) -> Result<Self, ArtifactError> {
        if classes.is_empty() {
            return Err(ArtifactError::invalid("label decoder has no classes"));
        }
        if let Some(pos) = classes.iter().position(|c| c.trim().is_empty()) {
            return Err(ArtifactError::invalid(format!("class {pos} has an empty name")));
        }
        Ok(Self { classes })
    }

    pub fn from_json_str(json: &str) -> Result<Self, ArtifactError> {
        let raw: Self = serde_json::from_str(json)?;
        Self::new(raw.classes)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ArtifactError> {
        Self::from_json_str(&read_artifact(path.as_ref())?)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn decode(&self, index: usize) -> Result<&str, ClassifyError> {
        self.classes
            .get(index)
            .map(String::as_str)
            .ok_or(ClassifyError::UnknownLabel(index))
    }
}
