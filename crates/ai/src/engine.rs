use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use agroplan_core::SensorReading;

use crate::decoder::LabelDecoder;
use crate::model::{CropClassifier, TreeEnsemble};
use crate::result::{ArtifactError, ClassifyError};
use crate::schema::FeatureSchema;

#[derive(Clone)]
enum ModelState {
    Loaded {
        classifier: Arc<dyn CropClassifier>,
        decoder: Arc<LabelDecoder>,
    },
    Unavailable {
        reason: String,
    },
}

/// Classifier + label decoder behind a fixed feature schema.
///
/// Whether the model is usable is decided once, when the engine is built. An
/// engine built from artifacts that failed to load stays unavailable for the
/// life of the process and answers every call with
/// [`ClassifyError::ModelUnavailable`].
#[derive(Clone)]
pub struct ClassificationEngine {
    schema: FeatureSchema,
    state: ModelState,
}

impl core::fmt::Debug for ClassificationEngine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ClassificationEngine")
            .field("schema", &self.schema.to_string())
            .field("model_loaded", &self.is_model_loaded())
            .finish()
    }
}

impl ClassificationEngine {
    /// Wire an already-loaded classifier and decoder.
    ///
    /// Fails when the classifier's width or recorded feature names disagree
    /// with `schema`.
    pub fn new(
        schema: FeatureSchema,
        classifier: Arc<dyn CropClassifier>,
        decoder: LabelDecoder,
    ) -> Result<Self, ArtifactError> {
        if classifier.n_features() != schema.width() {
            return Err(ArtifactError::invalid(format!(
                "model expects {} features but feature order '{}' has {}",
                classifier.n_features(),
                schema,
                schema.width()
            )));
        }
        if let Some(names) = classifier.feature_names() {
            if !schema.matches_names(names) {
                return Err(ArtifactError::invalid(format!(
                    "model was trained on [{}] but feature order is '{}'",
                    names.join(","),
                    schema
                )));
            }
        }

        Ok(Self {
            schema,
            state: ModelState::Loaded {
                classifier,
                decoder: Arc::new(decoder),
            },
        })
    }

    pub fn unavailable(schema: FeatureSchema, reason: impl Into<String>) -> Self {
        Self {
            schema,
            state: ModelState::Unavailable {
                reason: reason.into(),
            },
        }
    }

    /// Load a [`TreeEnsemble`] and [`LabelDecoder`] from disk.
    ///
    /// Never fails: load errors are logged and produce an unavailable engine.
    /// A loaded engine is warmed up before it is returned.
    pub fn load(schema: FeatureSchema, model_path: &Path, labels_path: &Path) -> Self {
        let loaded = TreeEnsemble::from_path(model_path).and_then(|model| {
            let decoder = LabelDecoder::from_path(labels_path)?;
            Ok((model, decoder))
        });
        Self::from_loaded(schema, loaded)
    }

    /// Same as [`load`](Self::load), from in-memory JSON artifacts.
    pub fn from_json(schema: FeatureSchema, model_json: &str, labels_json: &str) -> Self {
        let loaded = TreeEnsemble::from_json_str(model_json).and_then(|model| {
            let decoder = LabelDecoder::from_json_str(labels_json)?;
            Ok((model, decoder))
        });
        Self::from_loaded(schema, loaded)
    }

    fn from_loaded(
        schema: FeatureSchema,
        loaded: Result<(TreeEnsemble, LabelDecoder), ArtifactError>,
    ) -> Self {
        let engine = loaded.and_then(|(model, decoder)| {
            if decoder.len() < model.n_classes() {
                warn!(
                    classes = decoder.len(),
                    model_classes = model.n_classes(),
                    "label decoder knows fewer classes than the model predicts"
                );
            }
            info!(
                trees = model.n_trees(),
                classes = model.n_classes(),
                feature_order = %schema,
                "crop classifier loaded"
            );
            Self::new(schema.clone(), Arc::new(model), decoder)
        });

        match engine {
            Ok(engine) => {
                engine.warm_up();
                engine
            }
            Err(e) => {
                warn!(error = %e, "crop classifier unavailable");
                Self::unavailable(schema, e.to_string())
            }
        }
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn is_model_loaded(&self) -> bool {
        matches!(self.state, ModelState::Loaded { .. })
    }

    /// Why loading failed. Operator detail (paths, OS errors); not for clients.
    pub fn unavailable_reason(&self) -> Option<&str> {
        match &self.state {
            ModelState::Loaded { .. } => None,
            ModelState::Unavailable { reason } => Some(reason),
        }
    }

    /// Classify a reading into a crop name.
    pub fn classify(&self, reading: &SensorReading) -> Result<String, ClassifyError> {
        let (classifier, decoder) = match &self.state {
            ModelState::Loaded {
                classifier,
                decoder,
            } => (classifier, decoder),
            ModelState::Unavailable { .. } => return Err(ClassifyError::ModelUnavailable),
        };

        let features = self.schema.vector(reading)?;
        let index = classifier.predict(&features)?;
        decoder.decode(index).map(str::to_string)
    }

    /// Run one inference on an all-zero vector to front-load initialization cost.
    pub fn warm_up(&self) {
        let ModelState::Loaded {
            classifier,
            decoder,
        } = &self.state
        else {
            return;
        };

        let started = Instant::now();
        let zeros = vec![0.0; self.schema.width()];
        match classifier
            .predict(&zeros)
            .and_then(|idx| decoder.decode(idx).map(str::to_string))
        {
            Ok(label) => info!(
                label = %label,
                elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
                "classifier warm-up complete"
            ),
            Err(e) => warn!(error = %e, "classifier warm-up failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{SAMPLE_LABELS, SAMPLE_MODEL};
    use agroplan_core::SensorField;

    fn scenario_a() -> SensorReading {
        SensorReading {
            nitrogen: 120.0,
            phosphorus: 60.0,
            potassium: 80.0,
            ph: Some(6.0),
            humidity: Some(50.0),
            temperature: 25.0,
            rainfall: 10.0,
        }
    }

    /// Echoes which feature vector it received, as a class index.
    struct RecordingClassifier {
        expected: Vec<f64>,
    }

    impl CropClassifier for RecordingClassifier {
        fn n_features(&self) -> usize {
            self.expected.len()
        }

        fn predict(&self, features: &[f64]) -> Result<usize, ClassifyError> {
            Ok(if features == self.expected.as_slice() { 1 } else { 0 })
        }
    }

    #[test]
    fn classifies_through_model_and_decoder() {
        let engine =
            ClassificationEngine::from_json(FeatureSchema::default(), SAMPLE_MODEL, SAMPLE_LABELS);
        assert!(engine.is_model_loaded());
        assert_eq!(engine.classify(&scenario_a()).unwrap(), "maize");

        let wet = SensorReading {
            rainfall: 220.0,
            ..scenario_a()
        };
        assert_eq!(engine.classify(&wet).unwrap(), "rice");
    }

    #[test]
    fn feature_vector_follows_the_configured_order() {
        let decoder = LabelDecoder::new(vec!["wrong".into(), "right".into()]).unwrap();

        let engine = ClassificationEngine::new(
            FeatureSchema::default(),
            Arc::new(RecordingClassifier {
                expected: vec![120.0, 60.0, 80.0, 10.0, 25.0],
            }),
            decoder.clone(),
        )
        .unwrap();
        assert_eq!(engine.classify(&scenario_a()).unwrap(), "right");

        let seven: FeatureSchema = "N,P,K,temperature,humidity,ph,rainfall".parse().unwrap();
        let engine = ClassificationEngine::new(
            seven,
            Arc::new(RecordingClassifier {
                expected: vec![120.0, 60.0, 80.0, 25.0, 50.0, 6.0, 10.0],
            }),
            decoder,
        )
        .unwrap();
        assert_eq!(engine.classify(&scenario_a()).unwrap(), "right");
    }

    #[test]
    fn schema_that_disagrees_with_the_artifact_makes_the_model_unavailable() {
        let swapped: FeatureSchema = "N,P,K,temperature,rainfall".parse().unwrap();
        let engine = ClassificationEngine::from_json(swapped, SAMPLE_MODEL, SAMPLE_LABELS);
        assert!(!engine.is_model_loaded());
        assert!(engine.unavailable_reason().unwrap().contains("trained on"));

        let narrow: FeatureSchema = "N,P,K".parse().unwrap();
        let engine = ClassificationEngine::from_json(narrow, SAMPLE_MODEL, SAMPLE_LABELS);
        assert!(!engine.is_model_loaded());
    }

    #[test]
    fn unavailable_engine_reports_model_unavailable() {
        let engine = ClassificationEngine::load(
            FeatureSchema::default(),
            Path::new("/nonexistent/model.json"),
            Path::new("/nonexistent/labels.json"),
        );
        assert!(!engine.is_model_loaded());
        assert!(matches!(
            engine.classify(&scenario_a()),
            Err(ClassifyError::ModelUnavailable)
        ));
    }

    #[test]
    fn index_missing_from_decoder_is_an_inference_error() {
        let short_labels = r#"{ "classes": ["maize", "groundnuts"] }"#;
        let engine =
            ClassificationEngine::from_json(FeatureSchema::default(), SAMPLE_MODEL, short_labels);
        let wet = SensorReading {
            rainfall: 220.0,
            ..scenario_a()
        };
        assert_eq!(engine.classify(&wet).unwrap_err(), ClassifyError::UnknownLabel(2));
    }

    #[test]
    fn failed_warm_up_leaves_model_loaded() {
        // The all-zero vector lands on class 2, which the decoder does not know.
        let model = r#"{
            "n_features": 5,
            "n_classes": 3,
            "trees": [[{"kind": "leaf", "class": 2}]]
        }"#;
        let labels = r#"{ "classes": ["maize", "groundnuts"] }"#;

        let engine = ClassificationEngine::from_json(FeatureSchema::default(), model, labels);
        assert!(engine.is_model_loaded());
        assert_eq!(engine.unavailable_reason(), None);

        engine.warm_up();
        assert!(engine.is_model_loaded());
        assert_eq!(
            engine.classify(&scenario_a()).unwrap_err(),
            ClassifyError::UnknownLabel(2)
        );
    }

    #[test]
    fn unavailable_error_hides_load_detail() {
        let engine = ClassificationEngine::load(
            FeatureSchema::default(),
            Path::new("/nonexistent/model.json"),
            Path::new("/nonexistent/labels.json"),
        );
        assert!(engine.unavailable_reason().unwrap().contains("/nonexistent/model.json"));

        let err = engine.classify(&scenario_a()).unwrap_err();
        assert!(!err.to_string().contains("nonexistent"));
    }

    #[test]
    fn missing_optional_feature_is_an_inference_error() {
        let schema: FeatureSchema = "N,P,K,ph,rainfall".parse().unwrap();
        let engine = ClassificationEngine::new(
            schema,
            Arc::new(RecordingClassifier {
                expected: vec![0.0; 5],
            }),
            LabelDecoder::new(vec!["maize".into(), "rice".into()]).unwrap(),
        )
        .unwrap();
        let no_ph = SensorReading {
            ph: None,
            ..scenario_a()
        };
        assert_eq!(
            engine.classify(&no_ph).unwrap_err(),
            ClassifyError::MissingFeature(SensorField::Ph)
        );
    }
}
