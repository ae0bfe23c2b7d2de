use serde::{Deserialize, Serialize};

use agroplan_core::{PipelineError, PipelineResult};

/// Ideal nitrogen / phosphorus / potassium levels (same units as the sensor).
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutrientTargets {
    #[serde(rename = "N")]
    pub nitrogen: f64,
    #[serde(rename = "P")]
    pub phosphorus: f64,
    #[serde(rename = "K")]
    pub potassium: f64,
}

/// Inclusive ideal range.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdealRange {
    pub min: f64,
    pub max: f64,
}

impl IdealRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Ideal growing conditions for one crop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropProfile {
    pub crop: String,
    pub ideal: NutrientTargets,
    pub ph: IdealRange,
    pub humidity: IdealRange,
    pub soil: String,
    pub fertilizer_schedule: String,
}

/// Read-only crop name → profile lookup.
///
/// Names are matched case-insensitively, ignoring surrounding whitespace.
#[derive(Debug, Clone)]
pub struct CropProfileCatalog {
    profiles: Vec<CropProfile>,
}

impl CropProfileCatalog {
    pub fn new(profiles: Vec<CropProfile>) -> Self {
        let profiles = profiles
            .into_iter()
            .map(|mut p| {
                p.crop = normalize(&p.crop);
                p
            })
            .collect();
        Self { profiles }
    }

    /// The profiles shipped with the service.
    pub fn builtin() -> Self {
        Self::new(builtin_profiles())
    }

    pub fn get(&self, crop: &str) -> PipelineResult<&CropProfile> {
        let key = normalize(crop);
        self.profiles
            .iter()
            .find(|p| p.crop == key)
            .ok_or_else(|| PipelineError::crop_not_found(crop.trim()))
    }

    pub fn names(&self) -> Vec<&str> {
        self.profiles.iter().map(|p| p.crop.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl Default for CropProfileCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn normalize(crop: &str) -> String {
    crop.trim().to_lowercase()
}

fn profile(
    crop: &str,
    (nitrogen, phosphorus, potassium): (f64, f64, f64),
    ph: IdealRange,
    humidity: IdealRange,
    soil: &str,
    fertilizer_schedule: &str,
) -> CropProfile {
    CropProfile {
        crop: crop.to_string(),
        ideal: NutrientTargets {
            nitrogen,
            phosphorus,
            potassium,
        },
        ph,
        humidity,
        soil: soil.to_string(),
        fertilizer_schedule: fertilizer_schedule.to_string(),
    }
}

fn builtin_profiles() -> Vec<CropProfile> {
    vec![
        profile(
            "maize",
            (120.0, 60.0, 80.0),
            IdealRange::new(5.8, 7.0),
            IdealRange::new(55.0, 75.0),
            "Loamy soil, pH 5.8-7.0, well-drained",
            "NPK 15-15-15 at planting, Urea top dressing at 6 weeks",
        ),
        profile(
            "rice",
            (80.0, 48.0, 40.0),
            IdealRange::new(5.5, 6.5),
            IdealRange::new(80.0, 85.0),
            "Clay loam, pH 5.5-6.5",
            "Split nitrogen: basal, tillering and panicle initiation",
        ),
        profile(
            "wheat",
            (100.0, 50.0, 40.0),
            IdealRange::new(6.0, 7.5),
            IdealRange::new(50.0, 70.0),
            "Clay loam, pH 6.0-7.5",
            "Basal NPK at sowing, nitrogen top dressing at crown root initiation",
        ),
        profile(
            "beans",
            (20.0, 60.0, 20.0),
            IdealRange::new(6.0, 7.0),
            IdealRange::new(18.0, 25.0),
            "Loamy soil, pH 6.0-7.0",
            "20-20-20 at planting, magnesium supplement",
        ),
        profile(
            "groundnuts",
            (20.0, 50.0, 30.0),
            IdealRange::new(5.8, 6.2),
            IdealRange::new(40.0, 60.0),
            "Sandy loam, pH 5.8-6.2",
            "Phosphate at planting, no nitrogen needed",
        ),
        profile(
            "cowpeas",
            (20.0, 45.0, 20.0),
            IdealRange::new(5.5, 6.5),
            IdealRange::new(80.0, 90.0),
            "Well-drained sandy soil, pH 5.5-6.5",
            "Low nitrogen, focus on phosphorus and potassium",
        ),
        profile(
            "mango",
            (20.0, 27.0, 30.0),
            IdealRange::new(5.5, 7.5),
            IdealRange::new(45.0, 55.0),
            "Deep sandy loam, pH 5.5-7.5",
            "10-10-10 NPK quarterly, add compost annually",
        ),
        profile(
            "watermelon",
            (100.0, 17.0, 50.0),
            IdealRange::new(6.0, 6.8),
            IdealRange::new(80.0, 90.0),
            "Sandy loam, pH 6.0-6.8",
            "Balanced NPK, high potassium during fruiting",
        ),
    ]
}
