//! Static agronomy knowledge (crop profiles) and the fertilizer planner.

pub mod catalog;
pub mod fertilizer;

pub use catalog::{CropProfile, CropProfileCatalog, IdealRange, NutrientTargets};
pub use fertilizer::{
    FertilizerPlan, FertilizerPlanner, FertilizerRule, FertilizerRules, NpkDoses, NutrientDose,
};
