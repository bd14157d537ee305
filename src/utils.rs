//! Unit conversion helpers.

use crate::data::TemperatureUnit;

/// Convert Celsius to Fahrenheit.
///
/// ```
/// use health_thermometer_ble::celsius_to_fahrenheit;
///
/// assert!((celsius_to_fahrenheit(37.0) - 98.6).abs() < 0.001);
/// ```
#[inline]
pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}

/// Convert Fahrenheit to Celsius.
#[inline]
pub fn fahrenheit_to_celsius(fahrenheit: f64) -> f64 {
    (fahrenheit - 32.0) * 5.0 / 9.0
}

/// Convert a temperature between units.
pub fn convert_temperature(value: f64, from: TemperatureUnit, to: TemperatureUnit) -> f64 {
    match (from, to) {
        (TemperatureUnit::Celsius, TemperatureUnit::Fahrenheit) => celsius_to_fahrenheit(value),
        (TemperatureUnit::Fahrenheit, TemperatureUnit::Celsius) => fahrenheit_to_celsius(value),
        _ => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fever_thresholds() {
        assert!((celsius_to_fahrenheit(38.0) - 100.4).abs() < 0.001);
        assert!((fahrenheit_to_celsius(100.4) - 38.0).abs() < 0.001);
    }

    #[test]
    fn test_convert_temperature() {
        use TemperatureUnit::*;
        assert!((convert_temperature(36.6, Celsius, Fahrenheit) - 97.88).abs() < 0.001);
        assert!((convert_temperature(212.0, Fahrenheit, Celsius) - 100.0).abs() < 0.001);
        assert_eq!(convert_temperature(36.6, Celsius, Celsius), 36.6);
    }
}
