use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;

use agroplan_ai::RecommendationSource;
use agroplan_core::{
    IngestMode, PipelineError, PipelineResult, ReadingId, SensorReading, SensorUpdate,
};

/// The current reading plus its server-side bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredReading {
    pub reading: SensorReading,
    pub reading_id: ReadingId,
    /// Process-local, strictly increasing per successful update.
    pub version: u64,
    pub received_at: DateTime<Utc>,
}

/// A crop label derived from exactly one stored reading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub crop: String,
    pub source: RecommendationSource,
    pub reading_version: u64,
    pub reading_id: ReadingId,
    pub computed_at: DateTime<Utc>,
}

/// A recommendation together with the reading it was computed from.
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationSnapshot {
    pub recommendation: Recommendation,
    pub reading: StoredReading,
}

#[derive(Debug, Default)]
struct Slot {
    current: Option<StoredReading>,
    cached: Option<Recommendation>,
    last_version: u64,
}

impl Slot {
    /// The cached recommendation, only while it still matches the current reading.
    fn fresh(&self) -> Option<RecommendationSnapshot> {
        let current = self.current.as_ref()?;
        let cached = self.cached.as_ref()?;
        (cached.reading_version == current.version).then(|| RecommendationSnapshot {
            recommendation: cached.clone(),
            reading: current.clone(),
        })
    }
}

/// What the coordinator finds when it looks at the slot.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SlotView {
    Empty,
    Fresh(RecommendationSnapshot),
    Stale(StoredReading),
}

/// Latest-reading-wins holder for the sensor state and its cached recommendation.
///
/// Reading and cached recommendation share one mutex: an update and the
/// invalidation of the recommendation derived from the previous reading happen
/// in the same critical section, and readers never see a reading paired with a
/// recommendation computed for a different one.
#[derive(Debug)]
pub struct SensorStateStore {
    mode: IngestMode,
    inner: Mutex<Slot>,
}

impl SensorStateStore {
    pub fn new(mode: IngestMode) -> Self {
        Self {
            mode,
            inner: Mutex::new(Slot::default()),
        }
    }

    pub fn mode(&self) -> IngestMode {
        self.mode
    }

    /// Apply a validated update and drop the cached recommendation.
    pub fn update(&self, update: &SensorUpdate) -> StoredReading {
        let mut slot = self.lock();
        let reading = update.apply(slot.current.as_ref().map(|s| &s.reading), self.mode);
        slot.last_version += 1;
        let stored = StoredReading {
            reading,
            reading_id: ReadingId::new(),
            version: slot.last_version,
            received_at: Utc::now(),
        };
        slot.current = Some(stored.clone());
        slot.cached = None;
        stored
    }

    pub fn get(&self) -> Option<StoredReading> {
        self.lock().current.clone()
    }

    /// Cached recommendation for the current reading, if one was computed.
    pub fn fresh_recommendation(&self) -> Option<RecommendationSnapshot> {
        self.lock().fresh()
    }

    pub(crate) fn view(&self) -> SlotView {
        let slot = self.lock();
        match (&slot.current, slot.fresh()) {
            (None, _) => SlotView::Empty,
            (Some(_), Some(fresh)) => SlotView::Fresh(fresh),
            (Some(current), None) => SlotView::Stale(current.clone()),
        }
    }

    /// Cache `recommendation` unless a newer reading arrived since it was computed.
    pub(crate) fn cache_if_current(
        &self,
        recommendation: &Recommendation,
    ) -> Option<RecommendationSnapshot> {
        let mut slot = self.lock();
        let current = slot.current.clone()?;
        if current.version != recommendation.reading_version {
            return None;
        }
        slot.cached = Some(recommendation.clone());
        Some(RecommendationSnapshot {
            recommendation: recommendation.clone(),
            reading: current,
        })
    }

    /// Compute and cache a recommendation while holding the lock.
    ///
    /// Writers are blocked for the duration of `compute`.
    pub(crate) fn refresh_locked<F>(&self, compute: F) -> PipelineResult<RecommendationSnapshot>
    where
        F: FnOnce(&StoredReading) -> PipelineResult<Recommendation>,
    {
        let mut slot = self.lock();
        if let Some(fresh) = slot.fresh() {
            return Ok(fresh);
        }
        let current = slot.current.clone().ok_or(PipelineError::NoSensorData)?;
        let recommendation = compute(&current)?;
        slot.cached = Some(recommendation.clone());
        Ok(RecommendationSnapshot {
            recommendation,
            reading: current,
        })
    }

    // The slot is always left consistent, so a poisoned lock is safe to reuse.
    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for SensorStateStore {
    fn default() -> Self {
        Self::new(IngestMode::default())
    }
}
