use agroplan_core::SensorReading;

/// Rule-based crop recommender used when the classifier cannot answer.
///
/// Rules are evaluated in order:
/// - rainfall >= `wet_rainfall_mm` → rice
/// - temperature < `cool_temperature_c` → wheat
/// - temperature > `hot_temperature_c` and rainfall < `dry_rainfall_mm` → groundnuts
/// - otherwise → maize
#[derive(Debug, Clone, PartialEq)]
pub struct HeuristicRecommender {
    pub wet_rainfall_mm: f64,
    pub cool_temperature_c: f64,
    pub hot_temperature_c: f64,
    pub dry_rainfall_mm: f64,
}

impl Default for HeuristicRecommender {
    fn default() -> Self {
        Self {
            wet_rainfall_mm: 200.0,
            cool_temperature_c: 20.0,
            hot_temperature_c: 30.0,
            dry_rainfall_mm: 50.0,
        }
    }
}

impl HeuristicRecommender {
    pub fn recommend(&self, reading: &SensorReading) -> &'static str {
        if reading.rainfall >= self.wet_rainfall_mm {
            "rice"
        } else if reading.temperature < self.cool_temperature_c {
            "wheat"
        } else if reading.temperature > self.hot_temperature_c
            && reading.rainfall < self.dry_rainfall_mm
        {
            "groundnuts"
        } else {
            "maize"
        }
    }
}
