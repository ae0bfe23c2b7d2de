//! `agroplan-core`: shared building blocks of the agronomic pipeline.
//!
//! This crate contains **pure** types (no IO, no locking): the error taxonomy,
//! the sensor reading schema and its boundary validation.

pub mod error;
pub mod id;
pub mod reading;

pub use error::{PipelineError, PipelineResult};
pub use id::ReadingId;
pub use reading::{IngestMode, SensorField, SensorReading, SensorUpdate};
