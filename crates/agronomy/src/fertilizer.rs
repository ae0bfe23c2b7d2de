//! Deficit-based fertilizer planning.
//!
//! For each of N, P and K: `deficit = max(0, ideal - measured)` and
//! `amount_kg_per_ha = round(deficit * multiplier, 2)`. Only additions are ever
//! recommended; an oversupplied nutrient has a deficit of zero. Amounts and the
//! total saturate at `f64::MAX`, so any finite reading yields a finite plan.

use serde::{Deserialize, Serialize};

use agroplan_core::{PipelineResult, SensorReading};

use crate::catalog::{CropProfile, CropProfileCatalog};

/// Fertilizer product used to correct one nutrient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FertilizerRule {
    pub fertilizer: String,
    /// kg of product per unit of deficit.
    pub multiplier: f64,
}

impl FertilizerRule {
    pub fn new(fertilizer: impl Into<String>, multiplier: f64) -> Self {
        Self {
            fertilizer: fertilizer.into(),
            multiplier,
        }
    }
}

/// One rule per macronutrient.
#[derive(Debug, Clone, PartialEq)]
pub struct FertilizerRules {
    pub nitrogen: FertilizerRule,
    pub phosphorus: FertilizerRule,
    pub potassium: FertilizerRule,
}

impl Default for FertilizerRules {
    /// Urea ×0.5, Superphosphate ×2.0, Muriate of Potash ×1.5.
    fn default() -> Self {
        Self {
            nitrogen: FertilizerRule::new("Urea", 0.5),
            phosphorus: FertilizerRule::new("Superphosphate", 2.0),
            potassium: FertilizerRule::new("Muriate of Potash", 1.5),
        }
    }
}

/// Recommended correction for one nutrient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutrientDose {
    pub deficit: f64,
    pub fertilizer: String,
    pub amount_kg_per_ha: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NpkDoses {
    #[serde(rename = "N")]
    pub nitrogen: NutrientDose,
    #[serde(rename = "P")]
    pub phosphorus: NutrientDose,
    #[serde(rename = "K")]
    pub potassium: NutrientDose,
}

/// Fertilizer plan for one crop against one reading. Recomputed per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FertilizerPlan {
    pub crop: String,
    pub plan: NpkDoses,
    pub total_kg_per_ha: f64,
    pub schedule: String,
}

#[derive(Debug, Clone, Default)]
pub struct FertilizerPlanner {
    rules: FertilizerRules,
}

impl FertilizerPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules(rules: FertilizerRules) -> Self {
        Self { rules }
    }

    pub fn plan(&self, reading: &SensorReading, profile: &CropProfile) -> FertilizerPlan {
        let plan = NpkDoses {
            nitrogen: dose(profile.ideal.nitrogen, reading.nitrogen, &self.rules.nitrogen),
            phosphorus: dose(profile.ideal.phosphorus, reading.phosphorus, &self.rules.phosphorus),
            potassium: dose(profile.ideal.potassium, reading.potassium, &self.rules.potassium),
        };
        let total = round2(
            plan.nitrogen.amount_kg_per_ha
                + plan.phosphorus.amount_kg_per_ha
                + plan.potassium.amount_kg_per_ha,
        );

        FertilizerPlan {
            crop: profile.crop.clone(),
            plan,
            total_kg_per_ha: total,
            schedule: profile.fertilizer_schedule.clone(),
        }
    }

    /// Look `crop` up in `catalog`, then [`plan`](Self::plan).
    pub fn plan_for(
        &self,
        catalog: &CropProfileCatalog,
        reading: &SensorReading,
        crop: &str,
    ) -> PipelineResult<FertilizerPlan> {
        let profile = catalog.get(crop)?;
        Ok(self.plan(reading, profile))
    }
}

fn dose(ideal: f64, measured: f64, rule: &FertilizerRule) -> NutrientDose {
    let deficit = (ideal - measured).max(0.0);
    NutrientDose {
        deficit,
        fertilizer: rule.fertilizer.clone(),
        amount_kg_per_ha: round2(deficit * rule.multiplier),
    }
}

/// Round to two decimals, half away from zero, saturating at `f64::MAX`.
///
/// Values too large to scale are already integral and are returned as is.
fn round2(x: f64) -> f64 {
    let x = x.clamp(-f64::MAX, f64::MAX);
    let scaled = x * 100.0;
    if scaled.is_finite() {
        scaled.round() / 100.0
    } else {
        x
    }
}
