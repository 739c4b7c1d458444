use serde::{Deserialize, Serialize};
use uom::fmt::DisplayStyle;
use uom::si::f64::ThermodynamicTemperature;
use uom::si::thermodynamic_temperature::{degree_celsius, degree_fahrenheit, degree_rankine, kelvin};

/// The temperature scale of the K-value tables.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureScale {
    Celsius,
    #[default]
    Fahrenheit,
    Kelvin,
    Rankine,
}

impl TemperatureScale {
    pub fn value_of(self, temperature: ThermodynamicTemperature) -> f64 {
        match self {
            TemperatureScale::Celsius => temperature.get::<degree_celsius>(),
            TemperatureScale::Fahrenheit => temperature.get::<degree_fahrenheit>(),
            TemperatureScale::Kelvin => temperature.get::<kelvin>(),
            TemperatureScale::Rankine => temperature.get::<degree_rankine>(),
        }
    }

    pub fn temperature(self, value: f64) -> ThermodynamicTemperature {
        match self {
            TemperatureScale::Celsius => ThermodynamicTemperature::new::<degree_celsius>(value),
            TemperatureScale::Fahrenheit => {
                ThermodynamicTemperature::new::<degree_fahrenheit>(value)
            }
            TemperatureScale::Kelvin => ThermodynamicTemperature::new::<kelvin>(value),
            TemperatureScale::Rankine => ThermodynamicTemperature::new::<degree_rankine>(value),
        }
    }

    /// Convert a value given in `self` into the `target` scale.
    /// Values are returned untouched if both scales agree, so table bounds stay exact.
    pub fn convert(self, value: f64, target: TemperatureScale) -> f64 {
        if self == target {
            value
        } else {
            target.value_of(self.temperature(value))
        }
    }

    /// Format a value of this scale with its unit abbreviation.
    pub fn format(self, value: f64, precision: usize) -> String {
        let temperature = self.temperature(value);
        match self {
            TemperatureScale::Celsius => format!(
                "{:.precision$}",
                temperature.into_format_args(degree_celsius, DisplayStyle::Abbreviation)
            ),
            TemperatureScale::Fahrenheit => format!(
                "{:.precision$}",
                temperature.into_format_args(degree_fahrenheit, DisplayStyle::Abbreviation)
            ),
            TemperatureScale::Kelvin => format!(
                "{:.precision$}",
                temperature.into_format_args(kelvin, DisplayStyle::Abbreviation)
            ),
            TemperatureScale::Rankine => format!(
                "{:.precision$}",
                temperature.into_format_args(degree_rankine, DisplayStyle::Abbreviation)
            ),
        }
    }
}
