//! Data structures for Health Thermometer measurements.

pub mod measurement;

pub use measurement::{TemperatureMeasurement, TemperatureType, TemperatureUnit};
