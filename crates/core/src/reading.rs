//! Sensor reading schema and boundary validation.
//!
//! Device payloads are loosely typed JSON objects. They are turned into a
//! [`SensorUpdate`] (every field optional, every present field a finite number)
//! at the boundary, and a [`SensorUpdate`] is applied onto the previously stored
//! [`SensorReading`] according to an [`IngestMode`].

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{PipelineError, PipelineResult};

/// One measurable field of a sensor reading.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SensorField {
    #[serde(rename = "N")]
    Nitrogen,
    #[serde(rename = "P")]
    Phosphorus,
    #[serde(rename = "K")]
    Potassium,
    #[serde(rename = "ph")]
    Ph,
    #[serde(rename = "humidity")]
    Humidity,
    #[serde(rename = "temperature")]
    Temperature,
    #[serde(rename = "rainfall")]
    Rainfall,
}

impl SensorField {
    pub const ALL: [SensorField; 7] = [
        SensorField::Nitrogen,
        SensorField::Phosphorus,
        SensorField::Potassium,
        SensorField::Ph,
        SensorField::Humidity,
        SensorField::Temperature,
        SensorField::Rainfall,
    ];

    /// JSON key used on the wire.
    pub fn key(&self) -> &'static str {
        match self {
            SensorField::Nitrogen => "N",
            SensorField::Phosphorus => "P",
            SensorField::Potassium => "K",
            SensorField::Ph => "ph",
            SensorField::Humidity => "humidity",
            SensorField::Temperature => "temperature",
            SensorField::Rainfall => "rainfall",
        }
    }

    /// Required fields default to `0.0` when a payload omits them.
    pub fn is_required(&self) -> bool {
        !matches!(self, SensorField::Ph | SensorField::Humidity)
    }
}

impl fmt::Display for SensorField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for SensorField {
    type Err = PipelineError;

    /// Case-insensitive: `n`, `N` and `nitrogen` all name [`SensorField::Nitrogen`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "n" | "nitrogen" => Ok(SensorField::Nitrogen),
            "p" | "phosphorus" => Ok(SensorField::Phosphorus),
            "k" | "potassium" => Ok(SensorField::Potassium),
            "ph" => Ok(SensorField::Ph),
            "humidity" => Ok(SensorField::Humidity),
            "temperature" => Ok(SensorField::Temperature),
            "rainfall" => Ok(SensorField::Rainfall),
            other => Err(PipelineError::validation(
                "field",
                format!("unknown sensor field '{other}'"),
            )),
        }
    }
}

/// The latest soil/climate measurements.
///
/// `N`, `P`, `K`, `temperature` and `rainfall` are always present (missing values
/// default to `0.0`); `ph` and `humidity` are only present when a device reports them.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SensorReading {
    #[serde(rename = "N")]
    pub nitrogen: f64,
    #[serde(rename = "P")]
    pub phosphorus: f64,
    #[serde(rename = "K")]
    pub potassium: f64,
    #[serde(default)]
    pub ph: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
    pub temperature: f64,
    pub rainfall: f64,
}

impl SensorReading {
    pub fn value(&self, field: SensorField) -> Option<f64> {
        match field {
            SensorField::Nitrogen => Some(self.nitrogen),
            SensorField::Phosphorus => Some(self.phosphorus),
            SensorField::Potassium => Some(self.potassium),
            SensorField::Ph => self.ph,
            SensorField::Humidity => self.humidity,
            SensorField::Temperature => Some(self.temperature),
            SensorField::Rainfall => Some(self.rainfall),
        }
    }

    fn set(&mut self, field: SensorField, value: f64) {
        match field {
            SensorField::Nitrogen => self.nitrogen = value,
            SensorField::Phosphorus => self.phosphorus = value,
            SensorField::Potassium => self.potassium = value,
            SensorField::Ph => self.ph = Some(value),
            SensorField::Humidity => self.humidity = Some(value),
            SensorField::Temperature => self.temperature = value,
            SensorField::Rainfall => self.rainfall = value,
        }
    }
}

/// How an incoming update combines with the stored reading.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestMode {
    /// Present fields overwrite, absent fields keep their previous value.
    #[default]
    Merge,
    /// The stored reading is replaced wholesale; absent fields take their defaults.
    Replace,
}

impl IngestMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngestMode::Merge => "merge",
            IngestMode::Replace => "replace",
        }
    }
}

impl fmt::Display for IngestMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IngestMode {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "merge" => Ok(IngestMode::Merge),
            "replace" => Ok(IngestMode::Replace),
            other => Err(PipelineError::validation(
                "ingest_mode",
                format!("expected 'merge' or 'replace', got '{other}'"),
            )),
        }
    }
}

/// A validated, possibly partial, device payload.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SensorUpdate {
    values: Vec<(SensorField, f64)>,
}

impl SensorUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter (used by tests and in-process callers).
    ///
    /// Rejects non-finite values the same way the JSON boundary does.
    pub fn with(mut self, field: SensorField, value: f64) -> PipelineResult<Self> {
        if !value.is_finite() {
            return Err(PipelineError::validation(field.key(), "value must be finite"));
        }
        self.values.retain(|(f, _)| *f != field);
        self.values.push((field, value));
        Ok(self)
    }

    /// Validate a JSON payload.
    ///
    /// Known keys must hold a number or a numeric string; unknown keys are ignored.
    pub fn from_json(payload: &JsonValue) -> PipelineResult<Self> {
        let object = payload
            .as_object()
            .ok_or_else(|| PipelineError::validation("body", "expected a JSON object"))?;

        let mut values = Vec::new();
        for field in SensorField::ALL {
            if let Some(raw) = object.get(field.key()) {
                values.push((field, coerce_number(field, raw)?));
            }
        }
        Ok(Self { values })
    }

    pub fn get(&self, field: SensorField) -> Option<f64> {
        self.values
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, v)| *v)
    }

    pub fn fields(&self) -> impl Iterator<Item = SensorField> + '_ {
        self.values.iter().map(|(f, _)| *f)
    }

    /// Combine this update with the previously stored reading.
    pub fn apply(&self, previous: Option<&SensorReading>, mode: IngestMode) -> SensorReading {
        let mut reading = match (mode, previous) {
            (IngestMode::Merge, Some(prev)) => *prev,
            _ => SensorReading::default(),
        };
        for (field, value) in &self.values {
            reading.set(*field, *value);
        }
        reading
    }
}

fn coerce_number(field: SensorField, raw: &JsonValue) -> PipelineResult<f64> {
    let value = match raw {
        JsonValue::Number(n) => n
            .as_f64()
            .ok_or_else(|| PipelineError::validation(field.key(), "number out of range"))?,
        JsonValue::String(s) => s.trim().parse::<f64>().map_err(|_| {
            PipelineError::validation(field.key(), format!("'{s}' is not a number"))
        })?,
        JsonValue::Null => return Err(PipelineError::validation(field.key(), "value is null")),
        other => {
            return Err(PipelineError::validation(
                field.key(),
                format!("expected a number, got {}", json_type_name(other)),
            ));
        }
    };

    if !value.is_finite() {
        return Err(PipelineError::validation(field.key(), "value must be finite"));
    }
    Ok(value)
}

fn json_type_name(v: &JsonValue) -> &'static str {
    match v {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
