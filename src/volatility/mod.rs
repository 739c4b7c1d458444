//! K-values of every compound at the feed, top and bottom temperatures,
//! and their relative volatilities against the heavy key.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::compound::DataSet;
use crate::error::{Error, InterpolationError, Result};
use crate::interpolation_table::{Interpolator, SampleCurve};
use crate::material_balance::Stream;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyComponents {
    pub light: String,
    pub heavy: String,
}

/// The compounds expected in the distillate and in the bottoms.
/// Every compound is part of the feed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamMembership {
    pub distillate: Vec<String>,
    pub bottoms: Vec<String>,
}

impl StreamMembership {
    pub fn contains(&self, stream: Stream, compound: &str) -> bool {
        match stream {
            Stream::Feed => true,
            Stream::Top => self.distillate.iter().any(|name| name == compound),
            Stream::Bottom => self.bottoms.iter().any(|name| name == compound),
        }
    }
}

/// Temperatures of the column, in the temperature scale of the K-value tables.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnTemperatures {
    pub feed: f64,
    pub top: f64,
    pub bottom: f64,
}

impl ColumnTemperatures {
    pub fn get(&self, stream: Stream) -> f64 {
        match stream {
            Stream::Feed => self.feed,
            Stream::Top => self.top,
            Stream::Bottom => self.bottom,
        }
    }
}

/// How a failed interpolation affects the rest of the table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BatchPolicy {
    /// Record the failure in its cell and carry on with the other compounds.
    #[default]
    Isolate,
    /// Stop at the first failure.
    Abort,
}

/// A single cell of the table.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    /// The compound is not expected in the stream.
    NotRequested,
    Computed(f64),
    Failed(InterpolationError),
    /// The value exists, but the heavy key has a K-value of zero.
    Undefined,
}

impl Evaluation {
    pub fn value(&self) -> Option<f64> {
        match self {
            Evaluation::Computed(value) => Some(*value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&InterpolationError> {
        match self {
            Evaluation::Failed(error) => Some(error),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StreamValues {
    pub feed: Evaluation,
    pub bottom: Evaluation,
    pub top: Evaluation,
}

impl Default for StreamValues {
    fn default() -> Self {
        Self {
            feed: Evaluation::NotRequested,
            bottom: Evaluation::NotRequested,
            top: Evaluation::NotRequested,
        }
    }
}

impl StreamValues {
    pub fn get(&self, stream: Stream) -> &Evaluation {
        match stream {
            Stream::Feed => &self.feed,
            Stream::Top => &self.top,
            Stream::Bottom => &self.bottom,
        }
    }

    fn get_mut(&mut self, stream: Stream) -> &mut Evaluation {
        match stream {
            Stream::Feed => &mut self.feed,
            Stream::Top => &mut self.top,
            Stream::Bottom => &mut self.bottom,
        }
    }

    /// The computed values, in report column order.
    pub fn computed(&self) -> impl Iterator<Item = f64> + '_ {
        Stream::ALL
            .into_iter()
            .filter_map(|stream| self.get(stream).value())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VolatilityRow {
    pub compound: String,
    pub k_values: StreamValues,
    pub alphas: StreamValues,
    /// Mean of the computed relative volatilities.
    pub alpha_average: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VolatilityTable {
    keys: KeyComponents,
    temperatures: ColumnTemperatures,
    rows: Vec<VolatilityRow>,
}

impl VolatilityTable {
    pub fn keys(&self) -> &KeyComponents {
        &self.keys
    }

    pub fn temperatures(&self) -> ColumnTemperatures {
        self.temperatures
    }

    /// In the order of the data set.
    pub fn rows(&self) -> &[VolatilityRow] {
        &self.rows
    }

    pub fn row(&self, compound: &str) -> Option<&VolatilityRow> {
        self.rows.iter().find(|row| row.compound == compound)
    }

    /// The failed K-value interpolations.
    pub fn failures(&self) -> impl Iterator<Item = (&str, Stream, &InterpolationError)> {
        self.rows.iter().flat_map(|row| {
            Stream::ALL.into_iter().filter_map(move |stream| {
                row.k_values
                    .get(stream)
                    .error()
                    .map(|error| (row.compound.as_str(), stream, error))
            })
        })
    }
}

/// Everything the table depends on besides the K-value data.
#[derive(Debug, Clone, PartialEq)]
pub struct VolatilityRequest {
    pub temperatures: ColumnTemperatures,
    pub keys: KeyComponents,
    pub membership: StreamMembership,
    pub interpolator: Interpolator,
    pub policy: BatchPolicy,
}

impl VolatilityRequest {
    fn evaluate(
        &self,
        compound: &str,
        curve: &SampleCurve,
        stream: Stream,
    ) -> Result<Evaluation> {
        let temperature = self.temperatures.get(stream);
        match self.interpolator.interpolate(curve, temperature) {
            Ok(k_value) => Ok(Evaluation::Computed(k_value)),
            Err(source) => match self.policy {
                BatchPolicy::Abort => Err(Error::Compound {
                    compound: compound.to_string(),
                    source,
                }),
                BatchPolicy::Isolate => {
                    warn!("{compound} at the {stream} temperature: {source}");
                    Ok(Evaluation::Failed(source))
                }
            },
        }
    }
}

/// Interpolate the K-values of all compounds and relate them to the heavy key.
pub fn evaluate(data: &DataSet, request: &VolatilityRequest) -> Result<VolatilityTable> {
    let keys = &request.keys;
    data.require(&keys.light)?;
    let heavy = data.require(&keys.heavy)?;

    for name in request.membership.distillate.iter().chain(&request.membership.bottoms) {
        if data.get(name).is_none() {
            warn!("Ignoring unknown compound {name:?} in the stream selection");
        }
    }

    // The heavy key is needed at every temperature some compound is evaluated at.
    let mut heavy_k_values = StreamValues::default();
    for stream in Stream::ALL {
        if data
            .names()
            .any(|name| request.membership.contains(stream, name))
        {
            *heavy_k_values.get_mut(stream) =
                request.evaluate(heavy.name(), heavy.curve(), stream)?;
        }
    }

    let mut rows = Vec::with_capacity(data.len());
    for compound in data.compounds() {
        let name = compound.name();
        let is_heavy_key = name == keys.heavy;

        let mut k_values = StreamValues::default();
        for stream in Stream::ALL {
            if request.membership.contains(stream, name) {
                *k_values.get_mut(stream) = if is_heavy_key {
                    heavy_k_values.get(stream).clone()
                } else {
                    request.evaluate(name, compound.curve(), stream)?
                };
            }
        }

        let mut alphas = StreamValues::default();
        for stream in Stream::ALL {
            *alphas.get_mut(stream) = match (k_values.get(stream), heavy_k_values.get(stream)) {
                (Evaluation::Computed(_), _) if is_heavy_key => Evaluation::Computed(1.0),
                (Evaluation::Computed(k_value), Evaluation::Computed(heavy_k_value)) => {
                    if *heavy_k_value == 0.0 {
                        Evaluation::Undefined
                    } else {
                        Evaluation::Computed(k_value / heavy_k_value)
                    }
                }
                (Evaluation::Computed(_), Evaluation::Failed(error)) => {
                    Evaluation::Failed(error.clone())
                }
                (Evaluation::Computed(_), _) => Evaluation::Undefined,
                (other, _) => other.clone(),
            };
        }

        let computed: Vec<f64> = alphas.computed().collect();
        let alpha_average =
            (!computed.is_empty()).then(|| computed.iter().sum::<f64>() / computed.len() as f64);
        debug!("{name}: K = {k_values:?}, alpha average = {alpha_average:?}");

        rows.push(VolatilityRow {
            compound: name.to_string(),
            k_values,
            alphas,
            alpha_average,
        });
    }

    Ok(VolatilityTable {
        keys: keys.clone(),
        temperatures: request.temperatures,
        rows,
    })
}
