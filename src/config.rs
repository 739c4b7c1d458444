use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::info;
use serde::{Deserialize, Serialize};

use crate::compound::DataSet;
use crate::error::{Error, Result};
use crate::interpolation_table::Interpolator;
use crate::material_balance::StreamFlows;
use crate::temperature::TemperatureScale;
use crate::volatility::{BatchPolicy, ColumnTemperatures, KeyComponents, StreamMembership};

pub const DEFAULT_PATH: &str = "fug.toml";

/// Temperatures in the scale of the K-value tables.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemperatureConfig {
    pub feed: f64,
    pub bottom: f64,
    pub top: f64,
}

impl Default for TemperatureConfig {
    fn default() -> Self {
        Self {
            feed: 150.0,
            bottom: 130.0,
            top: 300.0,
        }
    }
}

/// Unset entries are derived from the order of the compounds in the data directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub light: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heavy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distillate: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bottoms: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub on_error: BatchPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub k_values: PathBuf,
    pub fractions: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            k_values: PathBuf::from("k_values.csv"),
            fractions: PathBuf::from("fractions_data.csv"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory of the per-compound K-value tables.
    pub data_dir: PathBuf,
    pub temperature_scale: TemperatureScale,
    pub temperatures: TemperatureConfig,
    pub keys: KeyConfig,
    pub interpolation: Interpolator,
    pub batch: BatchConfig,
    pub flows: StreamFlows,
    pub output: OutputConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            temperature_scale: TemperatureScale::default(),
            temperatures: TemperatureConfig::default(),
            keys: KeyConfig::default(),
            interpolation: Interpolator::default(),
            batch: BatchConfig::default(),
            flows: StreamFlows::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Config {
    /// Read the configuration file, or fall back to the defaults if there is none.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(error) if error.kind() == ErrorKind::NotFound => {
                info!("No configuration at {path:?}, using defaults");
                Ok(Self::default())
            }
            Err(source) => Err(Error::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn column_temperatures(&self) -> ColumnTemperatures {
        ColumnTemperatures {
            feed: self.temperatures.feed,
            top: self.temperatures.top,
            bottom: self.temperatures.bottom,
        }
    }

    /// The configured keys, or the first and the second compound of the data set.
    pub fn key_components(&self, data: &DataSet) -> Result<KeyComponents> {
        let nth = |n: usize, role: &'static str| {
            data.names()
                .nth(n)
                .map(str::to_string)
                .ok_or(Error::MissingKey {
                    role,
                    compounds: data.len(),
                })
        };

        let light = match &self.keys.light {
            Some(light) => light.clone(),
            None => nth(0, "light")?,
        };
        let heavy = match &self.keys.heavy {
            Some(heavy) => heavy.clone(),
            None => nth(1, "heavy")?,
        };
        Ok(KeyComponents { light, heavy })
    }

    /// The configured stream selection, or the first three compounds in the distillate
    /// and the next three in the bottoms.
    pub fn stream_membership(&self, data: &DataSet) -> StreamMembership {
        let names: Vec<String> = data.names().map(str::to_string).collect();
        let default_range = |start: usize, end: usize| -> Vec<String> {
            names
                .iter()
                .skip(start)
                .take(end - start)
                .cloned()
                .collect()
        };

        StreamMembership {
            distillate: self
                .keys
                .distillate
                .clone()
                .unwrap_or_else(|| default_range(0, 3)),
            bottoms: self
                .keys
                .bottoms
                .clone()
                .unwrap_or_else(|| default_range(3, 6)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Config;
    use crate::compound::{CompoundTable, DataSet};
    use crate::error::Error;
    use crate::interpolation_table::{Degradation, SampleCurve, SplineBoundary};
    use crate::temperature::TemperatureScale;
    use crate::volatility::BatchPolicy;

    fn data_set(names: &[&str]) -> DataSet {
        let curve = SampleCurve::new(vec![(0.0, 1.0), (1.0, 2.0)]).unwrap();
        DataSet::new(
            names
                .iter()
                .map(|name| CompoundTable::new(*name, curve.clone()))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn partial_file() {
        let config: Config = toml::from_str(
            r#"
            data_dir = "tables"
            temperature_scale = "celsius"

            [temperatures]
            feed = 120.5

            [keys]
            heavy = "Butane"

            [interpolation]
            boundary = "natural"

            [batch]
            on_error = "abort"

            [flows.feed]
            Propane = 30.0
            Butane = 70.0
            "#,
        )
        .unwrap();

        assert_eq!(config.data_dir.to_str(), Some("tables"));
        assert_eq!(config.temperature_scale, TemperatureScale::Celsius);
        assert_eq!(config.temperatures.feed, 120.5);
        assert_eq!(config.temperatures.bottom, 130.0);
        assert_eq!(config.interpolation.boundary, SplineBoundary::Natural);
        assert_eq!(config.interpolation.degradation, Degradation::LowerOrder);
        assert_eq!(config.batch.on_error, BatchPolicy::Abort);
        assert_eq!(config.flows.feed["Butane"], 70.0);
        assert!(config.flows.top.is_empty());
    }

    #[test]
    fn round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fug.toml");

        let mut config = Config::default();
        config.keys.light = Some("Propane".to_string());
        config.keys.bottoms = Some(vec!["Pentane".to_string()]);
        config.flows.top.insert("Propane".to_string(), 29.5);
        config.save(&path).unwrap();

        assert_eq!(Config::load(&path).unwrap(), config);
    }

    #[test]
    fn missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            Config::load(&dir.path().join("absent.toml")).unwrap(),
            Config::default()
        );
    }

    #[test]
    fn default_selection() {
        let data = data_set(&["A", "B", "C", "D", "E", "F", "G"]);
        let config = Config::default();

        let keys = config.key_components(&data).unwrap();
        assert_eq!((keys.light.as_str(), keys.heavy.as_str()), ("A", "B"));

        let membership = config.stream_membership(&data);
        assert_eq!(membership.distillate, ["A", "B", "C"]);
        assert_eq!(membership.bottoms, ["D", "E", "F"]);
    }

    #[test]
    fn short_data_set() {
        let data = data_set(&["A"]);
        let config = Config::default();
        assert!(matches!(
            config.key_components(&data),
            Err(Error::MissingKey {
                role: "heavy",
                compounds: 1
            })
        ));
        assert!(config.stream_membership(&data).bottoms.is_empty());
    }
}
