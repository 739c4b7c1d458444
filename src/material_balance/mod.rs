use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::volatility::KeyComponents;

/// Relative difference between feed and products above which the balance is reported as open.
const IMBALANCE_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stream {
    Feed,
    /// The distillate.
    Top,
    /// The bottoms.
    Bottom,
}

impl Stream {
    /// In the column order of the reports.
    pub const ALL: [Stream; 3] = [Stream::Feed, Stream::Bottom, Stream::Top];
}

impl Display for Stream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stream::Feed => write!(f, "feed"),
            Stream::Top => write!(f, "top"),
            Stream::Bottom => write!(f, "bottom"),
        }
    }
}

/// Component flow rates of the three streams, in lbmol/h.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamFlows {
    pub feed: BTreeMap<String, f64>,
    pub top: BTreeMap<String, f64>,
    pub bottom: BTreeMap<String, f64>,
}

impl StreamFlows {
    pub fn stream(&self, stream: Stream) -> &BTreeMap<String, f64> {
        match stream {
            Stream::Feed => &self.feed,
            Stream::Top => &self.top,
            Stream::Bottom => &self.bottom,
        }
    }

    pub fn is_empty(&self) -> bool {
        Stream::ALL
            .into_iter()
            .all(|stream| self.stream(stream).is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Flow {
    /// lbmol/h
    pub rate: f64,
    /// Mole fraction within the stream.
    pub fraction: f64,
}

/// The flows of one compound. A stream the compound is not listed in has no flow.
#[derive(Debug, Clone, PartialEq)]
pub struct FractionRow {
    pub compound: String,
    pub feed: Option<Flow>,
    pub top: Option<Flow>,
    pub bottom: Option<Flow>,
}

impl FractionRow {
    pub fn flow(&self, stream: Stream) -> Option<Flow> {
        match stream {
            Stream::Feed => self.feed,
            Stream::Top => self.top,
            Stream::Bottom => self.bottom,
        }
    }
}

/// Mole fractions z, xd and xb of the feed, the distillate and the bottoms.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialBalance {
    rows: Vec<FractionRow>,
    feed_total: f64,
    top_total: f64,
    bottom_total: f64,
}

impl MaterialBalance {
    pub fn new(flows: &StreamFlows) -> Result<Self> {
        let mut totals = [0.0; 3];
        for (total, stream) in totals.iter_mut().zip(Stream::ALL) {
            let rates = flows.stream(stream);
            for (compound, &rate) in rates {
                if !rate.is_finite() || rate < 0.0 {
                    return Err(Error::InvalidFlowRate {
                        stream,
                        compound: compound.clone(),
                        rate,
                    });
                }
                *total += rate;
            }
            if !rates.is_empty() && *total == 0.0 {
                return Err(Error::ZeroTotalFlow(stream));
            }
        }
        let [feed_total, bottom_total, top_total] = totals;

        let compounds: BTreeSet<&String> = Stream::ALL
            .into_iter()
            .flat_map(|stream| flows.stream(stream).keys())
            .collect();
        let flow = |stream: Stream, total: f64, compound: &str| {
            flows.stream(stream).get(compound).map(|&rate| Flow {
                rate,
                fraction: rate / total,
            })
        };
        let rows = compounds
            .into_iter()
            .map(|compound| FractionRow {
                compound: compound.clone(),
                feed: flow(Stream::Feed, feed_total, compound.as_str()),
                top: flow(Stream::Top, top_total, compound.as_str()),
                bottom: flow(Stream::Bottom, bottom_total, compound.as_str()),
            })
            .collect();

        let balance = Self {
            rows,
            feed_total,
            top_total,
            bottom_total,
        };

        let products_given = !flows.top.is_empty() && !flows.bottom.is_empty();
        if products_given && balance.imbalance().abs() > IMBALANCE_TOLERANCE * feed_total {
            warn!(
                "Feed of {feed_total} lbmol/h does not match the products of {} lbmol/h",
                top_total + bottom_total
            );
        }

        Ok(balance)
    }

    /// Sorted by compound name.
    pub fn rows(&self) -> &[FractionRow] {
        &self.rows
    }

    pub fn row(&self, compound: &str) -> Option<&FractionRow> {
        self.rows.iter().find(|row| row.compound == compound)
    }

    pub fn total(&self, stream: Stream) -> f64 {
        match stream {
            Stream::Feed => self.feed_total,
            Stream::Top => self.top_total,
            Stream::Bottom => self.bottom_total,
        }
    }

    /// Feed minus distillate and bottoms.
    pub fn imbalance(&self) -> f64 {
        self.feed_total - (self.top_total + self.bottom_total)
    }

    fn key_fraction(&self, compound: &str, stream: Stream) -> Result<f64> {
        match self
            .row(compound)
            .and_then(|row| row.flow(stream))
            .map(|flow| flow.fraction)
        {
            Some(fraction) if fraction > 0.0 => Ok(fraction),
            _ => Err(Error::FenskeUndefined(format!(
                "{compound} has no {stream} fraction"
            ))),
        }
    }
}

/// Minimum number of equilibrium stages at total reflux:
/// `ln[(xd_LK / xb_LK) (xb_HK / xd_HK)] / ln(alpha_LK)`.
pub fn fenske_minimum_stages(
    balance: &MaterialBalance,
    keys: &KeyComponents,
    alpha_light: f64,
) -> Result<f64> {
    if !(alpha_light.is_finite() && alpha_light > 1.0) {
        return Err(Error::FenskeUndefined(format!(
            "the relative volatility of the light key is {alpha_light}, not above one"
        )));
    }

    let light_top = balance.key_fraction(&keys.light, Stream::Top)?;
    let light_bottom = balance.key_fraction(&keys.light, Stream::Bottom)?;
    let heavy_top = balance.key_fraction(&keys.heavy, Stream::Top)?;
    let heavy_bottom = balance.key_fraction(&keys.heavy, Stream::Bottom)?;

    let separation = (light_top / light_bottom) * (heavy_bottom / heavy_top);
    if separation <= 1.0 {
        return Err(Error::FenskeUndefined(format!(
            "the keys are not separated (separation factor {separation})"
        )));
    }

    Ok(separation.ln() / alpha_light.ln())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::{fenske_minimum_stages, MaterialBalance, Stream, StreamFlows};
    use crate::error::Error;
    use crate::volatility::KeyComponents;

    fn rates(entries: &[(&str, f64)]) -> BTreeMap<String, f64> {
        entries
            .iter()
            .map(|&(compound, rate)| (compound.to_string(), rate))
            .collect()
    }

    fn flows() -> StreamFlows {
        StreamFlows {
            feed: rates(&[("Propane", 30.0), ("Butane", 50.0), ("Pentane", 20.0)]),
            top: rates(&[("Propane", 29.5), ("Butane", 2.5)]),
            bottom: rates(&[("Propane", 0.5), ("Butane", 47.5), ("Pentane", 20.0)]),
        }
    }

    fn keys() -> KeyComponents {
        KeyComponents {
            light: "Propane".to_string(),
            heavy: "Butane".to_string(),
        }
    }

    #[test]
    fn fractions() {
        let balance = MaterialBalance::new(&flows()).unwrap();
        assert!((balance.total(Stream::Feed) - 100.0).abs() < 1e-10);
        assert!((balance.total(Stream::Top) - 32.0).abs() < 1e-10);
        assert!((balance.total(Stream::Bottom) - 68.0).abs() < 1e-10);
        assert!(balance.imbalance().abs() < 1e-10);

        let names: Vec<_> = balance.rows().iter().map(|row| row.compound.as_str()).collect();
        assert_eq!(names, ["Butane", "Pentane", "Propane"]);

        let propane = balance.row("Propane").unwrap();
        assert!((propane.feed.unwrap().fraction - 0.3).abs() < 1e-10);
        assert!((propane.top.unwrap().fraction - 0.921875).abs() < 1e-10);
        assert!((propane.bottom.unwrap().fraction - 0.5 / 68.0).abs() < 1e-10);
    }

    #[test]
    fn absent_is_not_zero() {
        let balance = MaterialBalance::new(&flows()).unwrap();
        let pentane = balance.row("Pentane").unwrap();
        assert_eq!(pentane.top, None);
        assert_eq!(pentane.flow(Stream::Bottom).unwrap().rate, 20.0);
    }

    #[test]
    fn negative_rate() {
        let mut flows = flows();
        flows.top.insert("Pentane".to_string(), -1.0);
        assert!(matches!(
            MaterialBalance::new(&flows),
            Err(Error::InvalidFlowRate { stream: Stream::Top, rate, .. }) if rate == -1.0
        ));
    }

    #[test]
    fn zero_total() {
        let mut flows = flows();
        flows.bottom = rates(&[("Butane", 0.0)]);
        assert!(matches!(
            MaterialBalance::new(&flows),
            Err(Error::ZeroTotalFlow(Stream::Bottom))
        ));
    }

    #[test]
    fn empty_streams() {
        let balance = MaterialBalance::new(&StreamFlows::default()).unwrap();
        assert!(balance.rows().is_empty());
        assert_eq!(balance.imbalance(), 0.0);
    }

    #[test]
    fn fenske() {
        let balance = MaterialBalance::new(&flows()).unwrap();
        let stages = fenske_minimum_stages(&balance, &keys(), 2.5).unwrap();
        assert!((stages - 7.663480791418253).abs() < 1e-9);
    }

    #[test]
    fn fenske_symmetric_split() {
        let flows = StreamFlows {
            feed: rates(&[("Propane", 50.0), ("Butane", 50.0)]),
            top: rates(&[("Propane", 47.5), ("Butane", 2.5)]),
            bottom: rates(&[("Propane", 2.5), ("Butane", 47.5)]),
        };
        let balance = MaterialBalance::new(&flows).unwrap();
        let stages = fenske_minimum_stages(&balance, &keys(), 2.0).unwrap();
        assert!((stages - 8.49585502688717).abs() < 1e-9);
    }

    #[test]
    fn fenske_undefined() {
        let balance = MaterialBalance::new(&flows()).unwrap();
        assert!(matches!(
            fenske_minimum_stages(&balance, &keys(), 1.0),
            Err(Error::FenskeUndefined(_))
        ));

        let keys = KeyComponents {
            light: "Propane".to_string(),
            heavy: "Pentane".to_string(),
        };
        let error = fenske_minimum_stages(&balance, &keys, 2.5).unwrap_err();
        assert_eq!(
            error.to_string(),
            "the Fenske equation is undefined: Pentane has no top fraction"
        );
    }
}
