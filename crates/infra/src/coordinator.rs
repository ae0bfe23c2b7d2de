use core::fmt;
use core::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use agroplan_agronomy::{CropProfile, CropProfileCatalog, FertilizerPlan, FertilizerPlanner};
use agroplan_ai::{
    ClassificationEngine, ClassifyError, HeuristicRecommender, RecommendationSource,
};
use agroplan_core::{IngestMode, PipelineError, PipelineResult, SensorUpdate};

use crate::state_store::{
    Recommendation, RecommendationSnapshot, SensorStateStore, SlotView, StoredReading,
};

/// Classification attempts made outside the lock before falling back to
/// classifying while holding it.
const MAX_OPTIMISTIC_ATTEMPTS: usize = 3;

/// When a recommendation is computed for a new reading.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshPolicy {
    /// Classify as part of ingestion.
    Eager,
    /// Classify on the first query after ingestion.
    #[default]
    Lazy,
}

impl RefreshPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefreshPolicy::Eager => "eager",
            RefreshPolicy::Lazy => "lazy",
        }
    }
}

impl fmt::Display for RefreshPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RefreshPolicy {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "eager" => Ok(RefreshPolicy::Eager),
            "lazy" => Ok(RefreshPolicy::Lazy),
            other => Err(PipelineError::validation(
                "refresh",
                format!("expected 'eager' or 'lazy', got '{other}'"),
            )),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CoordinatorConfig {
    pub refresh: RefreshPolicy,
    pub ingest_mode: IngestMode,
    /// `Some` enables the rule-based fallback when classification fails.
    pub fallback: Option<HeuristicRecommender>,
}

/// Liveness summary.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineStatus {
    pub model_loaded: bool,
    pub model_error: Option<String>,
    pub feature_order: String,
    pub has_sensor_data: bool,
    /// Only reported while it still matches the current reading.
    pub latest_recommendation: Option<Recommendation>,
    pub fallback_enabled: bool,
    pub refresh: RefreshPolicy,
    pub ingest_mode: IngestMode,
}

/// Ties sensor state, classification and fertilizer planning together.
///
/// The coordinator is the only writer of the cached recommendation. A returned
/// recommendation is always derived from the reading that is current at the
/// moment the call returns.
#[derive(Debug)]
pub struct RecommendationCoordinator {
    store: SensorStateStore,
    engine: ClassificationEngine,
    catalog: Arc<CropProfileCatalog>,
    planner: FertilizerPlanner,
    refresh: RefreshPolicy,
    fallback: Option<HeuristicRecommender>,
}

impl RecommendationCoordinator {
    pub fn new(
        engine: ClassificationEngine,
        catalog: Arc<CropProfileCatalog>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            store: SensorStateStore::new(config.ingest_mode),
            engine,
            catalog,
            planner: FertilizerPlanner::new(),
            refresh: config.refresh,
            fallback: config.fallback,
        }
    }

    /// Store a new reading; in eager mode also classify it.
    ///
    /// Eager classification failures are logged, not returned: the reading is
    /// stored either way and the next query reports the error.
    pub fn ingest(&self, update: &SensorUpdate) -> StoredReading {
        let stored = self.store.update(update);
        info!(
            reading_version = stored.version,
            reading_id = %stored.reading_id,
            fields = update.fields().count(),
            "sensor reading stored"
        );

        if self.refresh == RefreshPolicy::Eager {
            if let Err(e) = self.refresh() {
                warn!(reading_version = stored.version, error = %e, "eager classification failed");
            }
        }
        stored
    }

    pub fn current_reading(&self) -> Option<StoredReading> {
        self.store.get()
    }

    /// Cached recommendation for the current reading, computing it if needed.
    pub fn get_recommendation(&self) -> PipelineResult<RecommendationSnapshot> {
        self.refresh()
    }

    pub fn crop_profile(&self, crop: &str) -> PipelineResult<CropProfile> {
        self.catalog.get(crop).cloned()
    }

    /// Fertilizer plan for `crop` against the current reading.
    pub fn fertilizer_plan(&self, crop: &str) -> PipelineResult<(FertilizerPlan, StoredReading)> {
        let profile = self.catalog.get(crop)?;
        let reading = self.store.get().ok_or(PipelineError::NoSensorData)?;
        let plan = self.planner.plan(&reading.reading, profile);
        Ok((plan, reading))
    }

    pub fn status(&self) -> PipelineStatus {
        let current = self.store.get();
        PipelineStatus {
            model_loaded: self.engine.is_model_loaded(),
            model_error: (!self.engine.is_model_loaded())
                .then(|| ClassifyError::ModelUnavailable.to_string()),
            feature_order: self.engine.schema().to_string(),
            has_sensor_data: current.is_some(),
            latest_recommendation: self.store.fresh_recommendation().map(|s| s.recommendation),
            fallback_enabled: self.fallback.is_some(),
            refresh: self.refresh,
            ingest_mode: self.store.mode(),
        }
    }

    fn refresh(&self) -> PipelineResult<RecommendationSnapshot> {
        for attempt in 1..=MAX_OPTIMISTIC_ATTEMPTS {
            let reading = match self.store.view() {
                SlotView::Empty => return Err(PipelineError::NoSensorData),
                SlotView::Fresh(snapshot) => return Ok(snapshot),
                SlotView::Stale(reading) => reading,
            };

            let recommendation = self.evaluate(&reading)?;
            if let Some(snapshot) = self.store.cache_if_current(&recommendation) {
                return Ok(snapshot);
            }
            debug!(
                attempt,
                reading_version = reading.version,
                "reading superseded during classification"
            );
        }

        self.store.refresh_locked(|reading| self.evaluate(reading))
    }

    fn evaluate(&self, stored: &StoredReading) -> PipelineResult<Recommendation> {
        let (crop, source) = match self.engine.classify(&stored.reading) {
            Ok(crop) => (crop, RecommendationSource::MlModel),
            Err(e) => match &self.fallback {
                Some(heuristic) => {
                    warn!(
                        reading_version = stored.version,
                        error = %e,
                        "classifier failed; using heuristic fallback"
                    );
                    let crop = heuristic.recommend(&stored.reading).to_string();
                    (crop, RecommendationSource::Heuristic)
                }
                None => return Err(e.into()),
            },
        };

        info!(
            reading_version = stored.version,
            crop = %crop,
            source = source.as_str(),
            "recommendation computed"
        );
        Ok(Recommendation {
            crop,
            source,
            reading_version: stored.version,
            reading_id: stored.reading_id,
            computed_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{mpsc, Mutex};
    use std::thread;

    use agroplan_ai::{ClassifyError, CropClassifier, FeatureSchema, LabelDecoder};
    use agroplan_core::SensorField;

    /// Class 1 ("rice") when N > 100, class 0 ("maize") otherwise; counts calls.
    #[derive(Default)]
    struct NitrogenClassifier {
        calls: AtomicUsize,
    }

    impl CropClassifier for NitrogenClassifier {
        fn n_features(&self) -> usize {
            5
        }

        fn predict(&self, features: &[f64]) -> Result<usize, ClassifyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(if features[0] > 100.0 { 1 } else { 0 })
        }
    }

    /// Blocks the first prediction until the test says go.
    struct GatedClassifier {
        entered: Mutex<mpsc::Sender<()>>,
        proceed: Mutex<mpsc::Receiver<()>>,
        gated: AtomicBool,
    }

    impl CropClassifier for GatedClassifier {
        fn n_features(&self) -> usize {
            5
        }

        fn predict(&self, features: &[f64]) -> Result<usize, ClassifyError> {
            if self.gated.swap(false, Ordering::SeqCst) {
                self.entered.lock().unwrap().send(()).unwrap();
                self.proceed.lock().unwrap().recv().unwrap();
            }
            Ok(if features[0] > 100.0 { 1 } else { 0 })
        }
    }

    /// Accepts the vector, then fails every prediction.
    struct FailingClassifier;

    impl CropClassifier for FailingClassifier {
        fn n_features(&self) -> usize {
            5
        }

        fn predict(&self, _features: &[f64]) -> Result<usize, ClassifyError> {
            Err(ClassifyError::InferenceFailed("tree walk did not reach a leaf".into()))
        }
    }

    fn labels() -> LabelDecoder {
        LabelDecoder::new(vec!["maize".into(), "rice".into()]).unwrap()
    }

    fn coordinator_with(
        classifier: Arc<dyn CropClassifier>,
        config: CoordinatorConfig,
    ) -> RecommendationCoordinator {
        let engine =
            ClassificationEngine::new(FeatureSchema::default(), classifier, labels()).unwrap();
        RecommendationCoordinator::new(engine, Arc::new(CropProfileCatalog::builtin()), config)
    }

    fn update(n: f64, p: f64, k: f64) -> SensorUpdate {
        SensorUpdate::new()
            .with(SensorField::Nitrogen, n)
            .and_then(|u| u.with(SensorField::Phosphorus, p))
            .and_then(|u| u.with(SensorField::Potassium, k))
            .and_then(|u| u.with(SensorField::Temperature, 25.0))
            .and_then(|u| u.with(SensorField::Rainfall, 10.0))
            .unwrap()
    }

    #[test]
    fn query_before_ingest_is_no_sensor_data() {
        let c = coordinator_with(
            Arc::new(NitrogenClassifier::default()),
            CoordinatorConfig::default(),
        );
        assert_eq!(c.get_recommendation().unwrap_err(), PipelineError::NoSensorData);
        assert_eq!(c.fertilizer_plan("maize").unwrap_err(), PipelineError::NoSensorData);
    }

    #[test]
    fn lazy_mode_classifies_once_per_reading() {
        let classifier = Arc::new(NitrogenClassifier::default());
        let c = coordinator_with(classifier.clone(), CoordinatorConfig::default());

        c.ingest(&update(120.0, 60.0, 80.0));
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);

        let first = c.get_recommendation().unwrap();
        let second = c.get_recommendation().unwrap();
        assert_eq!(first.recommendation.crop, "rice");
        assert_eq!(first.recommendation.source, RecommendationSource::MlModel);
        assert_eq!(first, second);
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn eager_mode_classifies_on_ingest() {
        let classifier = Arc::new(NitrogenClassifier::default());
        let c = coordinator_with(
            classifier.clone(),
            CoordinatorConfig {
                refresh: RefreshPolicy::Eager,
                ..CoordinatorConfig::default()
            },
        );

        c.ingest(&update(50.0, 60.0, 80.0));
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 1);
        assert_eq!(c.status().latest_recommendation.unwrap().crop, "maize");

        c.get_recommendation().unwrap();
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn new_reading_invalidates_previous_label() {
        let c = coordinator_with(
            Arc::new(NitrogenClassifier::default()),
            CoordinatorConfig::default(),
        );

        c.ingest(&update(50.0, 0.0, 0.0));
        assert_eq!(c.get_recommendation().unwrap().recommendation.crop, "maize");
        assert!(c.status().latest_recommendation.is_some());

        c.ingest(&update(150.0, 0.0, 0.0));
        assert!(c.status().latest_recommendation.is_none());
        let snap = c.get_recommendation().unwrap();
        assert_eq!(snap.recommendation.crop, "rice");
        assert_eq!(snap.recommendation.reading_version, snap.reading.version);
        assert_eq!(snap.reading.version, 2);
    }

    #[test]
    fn reading_superseded_mid_classification_is_reclassified() {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (proceed_tx, proceed_rx) = mpsc::channel();
        let classifier = Arc::new(GatedClassifier {
            entered: Mutex::new(entered_tx),
            proceed: Mutex::new(proceed_rx),
            gated: AtomicBool::new(true),
        });
        let c = Arc::new(coordinator_with(classifier, CoordinatorConfig::default()));

        c.ingest(&update(50.0, 0.0, 0.0));

        let worker = {
            let c = c.clone();
            thread::spawn(move || c.get_recommendation())
        };

        // The worker is now classifying reading 1; reading 2 lands meanwhile.
        entered_rx.recv().unwrap();
        let r2 = c.ingest(&update(150.0, 0.0, 0.0));
        proceed_tx.send(()).unwrap();

        let snap = worker.join().unwrap().unwrap();
        assert_eq!(snap.reading.version, r2.version);
        assert_eq!(snap.recommendation.reading_version, r2.version);
        assert_eq!(snap.recommendation.crop, "rice");
        assert_eq!(c.get_recommendation().unwrap(), snap);
    }

    #[test]
    fn concurrent_ingest_and_query_stay_consistent() {
        let c = Arc::new(coordinator_with(
            Arc::new(NitrogenClassifier::default()),
            CoordinatorConfig::default(),
        ));
        c.ingest(&update(0.0, 0.0, 0.0));

        let writers: Vec<_> = (0..4)
            .map(|w| {
                let c = c.clone();
                thread::spawn(move || {
                    for i in 0..200 {
                        let n = if (i + w) % 2 == 0 { 50.0 } else { 150.0 };
                        c.ingest(&update(n, 0.0, 0.0));
                    }
                })
            })
            .collect();
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let c = c.clone();
                thread::spawn(move || {
                    for _ in 0..200 {
                        let snap = c.get_recommendation().unwrap();
                        assert_eq!(snap.recommendation.reading_version, snap.reading.version);
                        let expected = if snap.reading.reading.nitrogen > 100.0 {
                            "rice"
                        } else {
                            "maize"
                        };
                        assert_eq!(snap.recommendation.crop, expected);
                    }
                })
            })
            .collect();

        for h in writers.into_iter().chain(readers) {
            h.join().unwrap();
        }

        let last = c.current_reading().unwrap();
        let snap = c.get_recommendation().unwrap();
        assert_eq!(snap.reading, last);
    }

    #[test]
    fn model_unavailable_propagates_without_fallback() {
        let engine = ClassificationEngine::unavailable(FeatureSchema::default(), "no artifact");
        let c = RecommendationCoordinator::new(
            engine,
            Arc::new(CropProfileCatalog::builtin()),
            CoordinatorConfig::default(),
        );
        c.ingest(&update(50.0, 0.0, 0.0));
        let err = c.get_recommendation().unwrap_err();
        assert_eq!(err.kind(), "model_unavailable");
        assert!(!err.to_string().contains("no artifact"));

        let status = c.status();
        assert!(!status.model_loaded);
        assert_eq!(status.model_error.as_deref(), Some("crop classifier is not loaded"));
    }

    #[test]
    fn fallback_is_reported_as_heuristic() {
        let engine = ClassificationEngine::unavailable(FeatureSchema::default(), "no artifact");
        let c = RecommendationCoordinator::new(
            engine,
            Arc::new(CropProfileCatalog::builtin()),
            CoordinatorConfig {
                fallback: Some(HeuristicRecommender::default()),
                ..CoordinatorConfig::default()
            },
        );
        c.ingest(&update(50.0, 0.0, 0.0));
        let snap = c.get_recommendation().unwrap();
        assert_eq!(snap.recommendation.source, RecommendationSource::Heuristic);
        assert_eq!(snap.recommendation.crop, "maize");
        assert!(c.status().fallback_enabled);
    }

    #[test]
    fn inference_failure_falls_back_to_heuristic() {
        let c = coordinator_with(
            Arc::new(FailingClassifier),
            CoordinatorConfig {
                fallback: Some(HeuristicRecommender::default()),
                ..CoordinatorConfig::default()
            },
        );
        c.ingest(&update(50.0, 0.0, 0.0));

        let snap = c.get_recommendation().unwrap();
        assert_eq!(snap.recommendation.source, RecommendationSource::Heuristic);
        assert_eq!(snap.recommendation.crop, "maize");
        assert!(c.status().model_loaded);
    }

    #[test]
    fn inference_failure_without_fallback_is_an_inference_error() {
        let c = coordinator_with(Arc::new(FailingClassifier), CoordinatorConfig::default());
        c.ingest(&update(50.0, 0.0, 0.0));

        let err = c.get_recommendation().unwrap_err();
        assert_eq!(err.kind(), "inference_error");
        assert!(c.status().latest_recommendation.is_none());
    }

    #[test]
    fn eager_failure_does_not_reject_the_reading() {
        let engine = ClassificationEngine::unavailable(FeatureSchema::default(), "no artifact");
        let c = RecommendationCoordinator::new(
            engine,
            Arc::new(CropProfileCatalog::builtin()),
            CoordinatorConfig {
                refresh: RefreshPolicy::Eager,
                ..CoordinatorConfig::default()
            },
        );
        let stored = c.ingest(&update(50.0, 0.0, 0.0));
        assert_eq!(c.current_reading().unwrap(), stored);
        assert!(c.get_recommendation().is_err());
    }

    #[test]
    fn fertilizer_plan_uses_current_reading() {
        let c = coordinator_with(
            Arc::new(NitrogenClassifier::default()),
            CoordinatorConfig::default(),
        );
        c.ingest(&update(70.0, 40.0, 50.0));

        let (plan, reading) = c.fertilizer_plan("Maize").unwrap();
        assert_eq!(reading.reading.nitrogen, 70.0);
        assert_eq!(plan.plan.nitrogen.amount_kg_per_ha, 25.0);
        assert_eq!(plan.plan.phosphorus.amount_kg_per_ha, 40.0);
        assert_eq!(plan.plan.potassium.amount_kg_per_ha, 45.0);

        assert_eq!(c.fertilizer_plan("Unknown").unwrap_err().kind(), "crop_not_found");
    }

    #[test]
    fn refresh_policy_parses() {
        assert_eq!("EAGER".parse::<RefreshPolicy>().unwrap(), RefreshPolicy::Eager);
        assert_eq!(" lazy".parse::<RefreshPolicy>().unwrap(), RefreshPolicy::Lazy);
        assert!("sometimes".parse::<RefreshPolicy>().is_err());
    }
}
