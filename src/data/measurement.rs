//! Temperature measurement data structures.
//!
//! Contains the decoded form of a Health Thermometer measurement.

use chrono::NaiveDateTime;

use crate::utils::convert_temperature;

/// Unit of a reported temperature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TemperatureUnit {
    /// Degrees Celsius.
    #[default]
    Celsius,
    /// Degrees Fahrenheit.
    Fahrenheit,
}

impl TemperatureUnit {
    /// Decode from the unit bit of the flags byte.
    pub fn from_flag(set: bool) -> Self {
        if set {
            Self::Fahrenheit
        } else {
            Self::Celsius
        }
    }

    /// Unit symbol.
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Celsius => "°C",
            Self::Fahrenheit => "°F",
        }
    }
}

/// Body site the temperature was taken at.
///
/// Codes follow the Temperature Type characteristic. Codes the standard
/// does not define are kept as [`TemperatureType::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TemperatureType {
    /// Armpit.
    Armpit,
    /// Body (general).
    Body,
    /// Ear (usually ear lobe).
    Ear,
    /// Finger.
    Finger,
    /// Gastro-intestinal tract.
    GastroIntestinalTract,
    /// Mouth.
    Mouth,
    /// Rectum.
    Rectum,
    /// Toe.
    Toe,
    /// Tympanum (ear drum).
    Tympanum,
    /// Any code not assigned by the standard.
    Other(u8),
}

impl TemperatureType {
    /// Map a raw body-site code.
    pub fn from_raw(code: u8) -> Self {
        match code {
            1 => Self::Armpit,
            2 => Self::Body,
            3 => Self::Ear,
            4 => Self::Finger,
            5 => Self::GastroIntestinalTract,
            6 => Self::Mouth,
            7 => Self::Rectum,
            8 => Self::Toe,
            9 => Self::Tympanum,
            other => Self::Other(other),
        }
    }

    /// The raw body-site code.
    pub fn to_raw(self) -> u8 {
        match self {
            Self::Armpit => 1,
            Self::Body => 2,
            Self::Ear => 3,
            Self::Finger => 4,
            Self::GastroIntestinalTract => 5,
            Self::Mouth => 6,
            Self::Rectum => 7,
            Self::Toe => 8,
            Self::Tympanum => 9,
            Self::Other(code) => code,
        }
    }
}

impl std::fmt::Display for TemperatureType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Armpit => write!(f, "Armpit"),
            Self::Body => write!(f, "Body (general)"),
            Self::Ear => write!(f, "Ear (usually ear lobe)"),
            Self::Finger => write!(f, "Finger"),
            Self::GastroIntestinalTract => write!(f, "Gastro-intestinal tract"),
            Self::Mouth => write!(f, "Mouth"),
            Self::Rectum => write!(f, "Rectum"),
            Self::Toe => write!(f, "Toe"),
            Self::Tympanum => write!(f, "Tympanum (ear drum)"),
            Self::Other(code) => write!(f, "Reserved value ({})", code),
        }
    }
}

/// A decoded Temperature Measurement.
///
/// Only produced by a successful decode, so the optional fields always
/// reflect the flags of the packet they came from.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TemperatureMeasurement {
    /// Temperature in `unit`. May be NaN or infinite for the special values
    /// of the IEEE-11073 FLOAT encoding.
    pub temperature: f64,
    /// Unit of `temperature`.
    pub unit: TemperatureUnit,
    /// Time the measurement was taken, if reported and known.
    pub timestamp: Option<NaiveDateTime>,
    /// Body site, if reported.
    pub temperature_type: Option<TemperatureType>,
}

impl TemperatureMeasurement {
    /// Create a measurement with no timestamp or body site.
    pub fn new(temperature: f64, unit: TemperatureUnit) -> Self {
        Self {
            temperature,
            unit,
            timestamp: None,
            temperature_type: None,
        }
    }

    /// Attach a timestamp.
    pub fn with_timestamp(mut self, timestamp: NaiveDateTime) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Attach a body site.
    pub fn with_type(mut self, temperature_type: TemperatureType) -> Self {
        self.temperature_type = Some(temperature_type);
        self
    }

    /// The temperature in degrees Celsius.
    pub fn celsius(&self) -> f64 {
        convert_temperature(self.temperature, self.unit, TemperatureUnit::Celsius)
    }

    /// The temperature in degrees Fahrenheit.
    pub fn fahrenheit(&self) -> f64 {
        convert_temperature(self.temperature, self.unit, TemperatureUnit::Fahrenheit)
    }

    /// Whether the reading is a real number (not NaN, NRes or infinity).
    pub fn is_valid(&self) -> bool {
        self.temperature.is_finite()
    }
}

impl std::fmt::Display for TemperatureMeasurement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}{}", self.temperature, self.unit.symbol())?;
        if let Some(temperature_type) = self.temperature_type {
            write!(f, ", Type: {}", temperature_type)?;
        }
        if let Some(timestamp) = self.timestamp {
            write!(f, ", Time: {}", timestamp.format("%Y-%m-%d %H:%M:%S"))?;
        }
        Ok(())
    }
}
