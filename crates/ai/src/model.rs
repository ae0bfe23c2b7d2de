use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::result::{read_artifact, ArtifactError, ClassifyError};

/// A pre-trained crop classifier.
///
/// Implementations map a feature vector (in the deployment's configured field
/// order) to an encoded class index. They must be deterministic and must not
/// hold mutable state: one instance is shared by all request handlers.
pub trait CropClassifier: Send + Sync + 'static {
    /// Number of features the model was trained with.
    fn n_features(&self) -> usize;

    /// Training-time feature names, when the artifact records them.
    fn feature_names(&self) -> Option<&[String]> {
        None
    }

    /// Predict the encoded class index for one sample.
    fn predict(&self, features: &[f64]) -> Result<usize, ClassifyError>;
}

/// One node of a decision tree, stored in a flat per-tree array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreeNode {
    /// Go to `left` when `x[feature] <= threshold`, otherwise to `right`.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        class: usize,
    },
}

/// Exported random-forest style classifier: majority vote over decision trees.
///
/// JSON layout:
///
/// ```json
/// {
///   "n_features": 5,
///   "n_classes": 3,
///   "feature_names": ["N", "P", "K", "rainfall", "temperature"],
///   "trees": [[{"kind": "split", "feature": 3, "threshold": 150.0, "left": 1, "right": 2},
///              {"kind": "leaf", "class": 0},
///              {"kind": "leaf", "class": 2}]]
/// }
/// ```
///
/// The root of every tree is node `0`. Ties in the vote go to the lowest class index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeEnsemble {
    n_features: usize,
    n_classes: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    feature_names: Option<Vec<String>>,
    trees: Vec<Vec<TreeNode>>,
}

impl TreeEnsemble {
    pub fn new(
        n_features: usize,
        n_classes: usize,
        feature_names: Option<Vec<String>>,
        trees: Vec<Vec<TreeNode>>,
    ) -> Result<Self, ArtifactError> {
        let model = Self {
            n_features,
            n_classes,
            feature_names,
            trees,
        };
        model.validate()?;
        Ok(model)
    }

    pub fn from_json_str(json: &str) -> Result<Self, ArtifactError> {
        let model: Self = serde_json::from_str(json)?;
        model.validate()?;
        Ok(model)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ArtifactError> {
        Self::from_json_str(&read_artifact(path.as_ref())?)
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    fn validate(&self) -> Result<(), ArtifactError> {
        if self.n_features == 0 {
            return Err(ArtifactError::invalid("n_features must be > 0"));
        }
        if self.n_classes == 0 {
            return Err(ArtifactError::invalid("n_classes must be > 0"));
        }
        if self.trees.is_empty() {
            return Err(ArtifactError::invalid("ensemble has no trees"));
        }
        if let Some(names) = &self.feature_names {
            if names.len() != self.n_features {
                return Err(ArtifactError::invalid(format!(
                    "{} feature names for {} features",
                    names.len(),
                    self.n_features
                )));
            }
        }

        for (t, tree) in self.trees.iter().enumerate() {
            if tree.is_empty() {
                return Err(ArtifactError::invalid(format!("tree {t} is empty")));
            }
            for (i, node) in tree.iter().enumerate() {
                match *node {
                    TreeNode::Split {
                        feature,
                        threshold,
                        left,
                        right,
                    } => {
                        if feature >= self.n_features {
                            return Err(ArtifactError::invalid(format!(
                                "tree {t} node {i}: feature {feature} out of range"
                            )));
                        }
                        if !threshold.is_finite() {
                            return Err(ArtifactError::invalid(format!(
                                "tree {t} node {i}: non-finite threshold"
                            )));
                        }
                        // Children must point forward; this also rules out cycles.
                        if left <= i || right <= i || left >= tree.len() || right >= tree.len() {
                            return Err(ArtifactError::invalid(format!(
                                "tree {t} node {i}: child index out of range"
                            )));
                        }
                    }
                    TreeNode::Leaf { class } => {
                        if class >= self.n_classes {
                            return Err(ArtifactError::invalid(format!(
                                "tree {t} node {i}: class {class} out of range"
                            )));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn predict_tree(tree: &[TreeNode], features: &[f64]) -> Result<usize, ClassifyError> {
        let mut idx = 0usize;
        // Bounded walk: a well-formed tree reaches a leaf in fewer than len steps.
        for _ in 0..tree.len() {
            let node = tree.get(idx).ok_or_else(|| {
                ClassifyError::InferenceFailed(format!("dangling node index {idx}"))
            })?;
            match *node {
                TreeNode::Leaf { class } => return Ok(class),
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let x = features.get(feature).ok_or_else(|| {
                        ClassifyError::InferenceFailed(format!(
                            "feature index {feature} out of range"
                        ))
                    })?;
                    idx = if *x <= threshold { left } else { right };
                }
            }
        }
        Err(ClassifyError::InferenceFailed(
            "tree walk did not reach a leaf".to_string(),
        ))
    }
}

impl CropClassifier for TreeEnsemble {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    fn predict(&self, features: &[f64]) -> Result<usize, ClassifyError> {
        if features.len() != self.n_features {
            return Err(ClassifyError::InvalidInput(format!(
                "expected {} features, got {}",
                self.n_features,
                features.len()
            )));
        }
        if let Some(pos) = features.iter().position(|x| !x.is_finite()) {
            return Err(ClassifyError::InvalidInput(format!(
                "feature {pos} is not finite"
            )));
        }

        let mut votes = vec![0usize; self.n_classes];
        for tree in &self.trees {
            let class = Self::predict_tree(tree, features)?;
            let slot = votes.get_mut(class).ok_or_else(|| {
                ClassifyError::InferenceFailed(format!("class {class} out of range"))
            })?;
            *slot += 1;
        }

        // max_by_key keeps the last maximum; iterate in reverse so ties go to the lowest index.
        votes
            .iter()
            .enumerate()
            .rev()
            .max_by_key(|(_, count)| **count)
            .map(|(class, _)| class)
            .ok_or_else(|| ClassifyError::InferenceFailed("no votes".to_string()))
    }
}
