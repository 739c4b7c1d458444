//! K-value interpolation over sampled (temperature, K-value) curves.
//!
//! A [`SampleCurve`] holds the validated samples of one compound.
//! An [`Interpolator`] fits an [`InterpolationTable`] through a curve and evaluates it,
//! refusing any query outside of the sampled temperature range.

use std::cmp::Ordering;

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::error::InterpolationError;

pub use self::cubic_spline::CubicSplineTable;
pub use self::linear::LinearInterpolationTable;
pub use self::quadratic::QuadraticInterpolationTable;

mod cubic_spline;
mod linear;
mod quadratic;


/// The (temperature, K-value) samples of a single compound, sorted by temperature.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleCurve {
    samples: Vec<(f64, f64)>,
}

impl SampleCurve {
    /// No interpolant exists through fewer samples than this.
    pub const MINIMUM_SAMPLES: usize = 2;

    /// Validate and sort the given samples.
    /// The first element of each pair is the temperature, the second the K-value.
    pub fn new(samples: impl Into<Vec<(f64, f64)>>) -> Result<Self, InterpolationError> {
        let mut samples = samples.into();

        if samples.len() < Self::MINIMUM_SAMPLES {
            return Err(InterpolationError::InsufficientData {
                required: Self::MINIMUM_SAMPLES,
                actual: samples.len(),
            });
        }

        if let Some((index, &(temperature, k_value))) = samples
            .iter()
            .enumerate()
            .find(|(_, (temperature, k_value))| !temperature.is_finite() || !k_value.is_finite())
        {
            return Err(InterpolationError::NonFiniteSample {
                index,
                temperature,
                k_value,
            });
        }

        samples.sort_by(|a, b| a.0.total_cmp(&b.0));

        if let Some(pair) = samples.windows(2).find(|pair| pair[0].0 == pair[1].0) {
            return Err(InterpolationError::DuplicateTemperature {
                temperature: pair[0].0,
                first: pair[0].1,
                second: pair[1].1,
            });
        }

        Ok(Self { samples })
    }

    pub fn samples(&self) -> &[(f64, f64)] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn temperatures(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(|&(temperature, _)| temperature)
    }

    pub fn k_values(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(|&(_, k_value)| k_value)
    }

    /// The lowest and highest sampled temperature.
    pub fn bounds(&self) -> (f64, f64) {
        (self.samples[0].0, self.samples[self.samples.len() - 1].0)
    }

    /// Fails with [`InterpolationError::OutOfRange`] if `query` lies outside of [`Self::bounds`].
    pub fn check_bounds(&self, query: f64) -> Result<(), InterpolationError> {
        let (min, max) = self.bounds();
        check_bounds(query, min, max)
    }
}

fn check_bounds(query: f64, min: f64, max: f64) -> Result<(), InterpolationError> {
    if query.is_nan() {
        Err(InterpolationError::NonFiniteQuery(query))
    } else if query < min || query > max {
        Err(InterpolationError::OutOfRange { query, min, max })
    } else {
        Ok(())
    }
}

/// Find `x` in the sorted `knots`.
/// `Ok(index)` if `x` is a knot, otherwise `Err(index)` of the first knot above `x`,
/// clamped so that `index - 1` and `index` always name a valid interval.
fn locate(knots: &[f64], x: f64) -> Result<usize, usize> {
    match knots.binary_search_by(|knot| knot.partial_cmp(&x).unwrap_or(Ordering::Greater)) {
        Ok(index) => Ok(index),
        Err(index) => Err(index.clamp(1, knots.len() - 1)),
    }
}

/// End conditions of the cubic spline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SplineBoundary {
    /// The third derivative is continuous at the second and the second to last knot.
    #[default]
    NotAKnot,
    /// The second derivative vanishes at both ends.
    Natural,
}

impl SplineBoundary {
    /// The number of samples the boundary condition needs to determine a spline.
    pub fn minimum_samples(self) -> usize {
        match self {
            SplineBoundary::NotAKnot => 4,
            SplineBoundary::Natural => 3,
        }
    }
}

/// What to do with curves that have too few samples for the chosen spline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Degradation {
    /// Interpolate with the highest order polynomial the samples support:
    /// a quadratic through three samples, a line through two.
    #[default]
    LowerOrder,
    /// Fail with [`InterpolationError::InsufficientData`].
    Reject,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Interpolator {
    pub boundary: SplineBoundary,
    pub degradation: Degradation,
}

impl Interpolator {
    pub fn new(boundary: SplineBoundary, degradation: Degradation) -> Self {
        Self {
            boundary,
            degradation,
        }
    }

    pub fn minimum_samples(&self) -> usize {
        match self.degradation {
            Degradation::LowerOrder => SampleCurve::MINIMUM_SAMPLES,
            Degradation::Reject => self.boundary.minimum_samples(),
        }
    }

    /// Fit an interpolation table through all samples of the curve.
    pub fn fit(&self, curve: &SampleCurve) -> Result<InterpolationTable, InterpolationError> {
        let required = self.minimum_samples();
        if curve.len() < required {
            return Err(InterpolationError::InsufficientData {
                required,
                actual: curve.len(),
            });
        }

        let table = if curve.len() >= self.boundary.minimum_samples() {
            InterpolationTable::CubicSpline(CubicSplineTable::fit(curve, self.boundary)?)
        } else if curve.len() >= 3 {
            InterpolationTable::Quadratic(QuadraticInterpolationTable::new(curve)?)
        } else {
            InterpolationTable::Linear(LinearInterpolationTable::new(curve))
        };

        if table.order() < 3 {
            debug!(
                "Only {} samples, interpolating with a polynomial of order {}",
                curve.len(),
                table.order()
            );
        }
        Ok(table)
    }

    /// Interpolate the K-value of the curve at the query temperature.
    ///
    /// The bounds are checked before anything is fitted, so the result is never extrapolated.
    pub fn interpolate(&self, curve: &SampleCurve, query: f64) -> Result<f64, InterpolationError> {
        curve.check_bounds(query)?;
        let k_value = self.fit(curve)?.get(query)?;
        trace!("K({query}) = {k_value}");
        Ok(k_value)
    }
}

/// Interpolate K at `query` through `samples` of (temperature, K-value) pairs,
/// using a not-a-knot cubic spline that degrades to lower orders for short curves.
pub fn interpolate(samples: &[(f64, f64)], query: f64) -> Result<f64, InterpolationError> {
    let curve = SampleCurve::new(samples)?;
    Interpolator::default().interpolate(&curve, query)
}

/// A fitted interpolant over the sampled temperature range of one curve.
#[derive(Debug, Clone)]
pub enum InterpolationTable {
    Linear(LinearInterpolationTable),
    Quadratic(QuadraticInterpolationTable),
    CubicSpline(CubicSplineTable),
}

impl InterpolationTable {
    /// The polynomial order of the interpolant.
    pub fn order(&self) -> usize {
        match self {
            InterpolationTable::Linear(_) => 1,
            InterpolationTable::Quadratic(_) => 2,
            InterpolationTable::CubicSpline(_) => 3,
        }
    }

    pub fn bounds(&self) -> (f64, f64) {
        match self {
            InterpolationTable::Linear(table) => table.bounds(),
            InterpolationTable::Quadratic(table) => table.bounds(),
            InterpolationTable::CubicSpline(table) => table.bounds(),
        }
    }

    pub fn get(&self, x: f64) -> Result<f64, InterpolationError> {
        let (min, max) = self.bounds();
        check_bounds(x, min, max)?;

        Ok(match self {
            InterpolationTable::Linear(table) => table.get(x),
            InterpolationTable::Quadratic(table) => table.get(x),
            InterpolationTable::CubicSpline(table) => table.get(x),
        })
    }
}
