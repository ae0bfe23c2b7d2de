use core::fmt;
use core::str::FromStr;

use agroplan_core::{PipelineError, SensorField, SensorReading};

use crate::result::ClassifyError;

/// Ordered list of reading fields fed to the classifier.
///
/// The order is part of the deployed model's contract: it must be exactly the
/// column order the classifier was trained with. It is configured per
/// deployment (see `AGROPLAN_FEATURE_ORDER`), never assumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSchema {
    fields: Vec<SensorField>,
}

impl FeatureSchema {
    pub fn new(fields: Vec<SensorField>) -> Result<Self, PipelineError> {
        if fields.is_empty() {
            return Err(PipelineError::validation(
                "feature_order",
                "at least one feature is required",
            ));
        }
        for (i, f) in fields.iter().enumerate() {
            if fields[..i].contains(f) {
                return Err(PipelineError::validation(
                    "feature_order",
                    format!("feature '{f}' is listed twice"),
                ));
            }
        }
        Ok(Self { fields })
    }

    pub fn fields(&self) -> &[SensorField] {
        &self.fields
    }

    pub fn width(&self) -> usize {
        self.fields.len()
    }

    /// Build the feature vector for `reading` in schema order.
    pub fn vector(&self, reading: &SensorReading) -> Result<Vec<f64>, ClassifyError> {
        self.fields
            .iter()
            .map(|f| reading.value(*f).ok_or(ClassifyError::MissingFeature(*f)))
            .collect()
    }

    /// True when `names` spell out the same fields in the same order.
    pub fn matches_names(&self, names: &[String]) -> bool {
        names.len() == self.fields.len()
            && names
                .iter()
                .zip(&self.fields)
                .all(|(name, field)| name.parse::<SensorField>().ok() == Some(*field))
    }
}

impl Default for FeatureSchema {
    /// `N, P, K, rainfall, temperature`.
    fn default() -> Self {
        Self {
            fields: vec![
                SensorField::Nitrogen,
                SensorField::Phosphorus,
                SensorField::Potassium,
                SensorField::Rainfall,
                SensorField::Temperature,
            ],
        }
    }
}

impl FromStr for FeatureSchema {
    type Err = PipelineError;

    /// Comma-separated field list, e.g. `N,P,K,temperature,humidity,ph,rainfall`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields = s
            .split(',')
            .filter(|part| !part.trim().is_empty())
            .map(str::parse)
            .collect::<Result<Vec<SensorField>, _>>()?;
        Self::new(fields)
    }
}

impl fmt::Display for FeatureSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            f.write_str(field.key())?;
        }
        Ok(())
    }
}
