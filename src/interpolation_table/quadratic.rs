use super::{locate, SampleCurve};
use crate::error::InterpolationError;

/// The parabola through exactly three samples.
/// This is also what a not-a-knot cubic spline reduces to for three knots.
#[derive(Debug, Clone)]
pub struct QuadraticInterpolationTable {
    temperatures: [f64; 3],
    k_values: [f64; 3],
}

impl QuadraticInterpolationTable {
    /// Uses the first three samples of the curve.
    pub fn new(curve: &SampleCurve) -> Result<Self, InterpolationError> {
        let &[(x0, y0), (x1, y1), (x2, y2), ..] = curve.samples() else {
            return Err(InterpolationError::InsufficientData {
                required: 3,
                actual: curve.len(),
            });
        };

        Ok(Self {
            temperatures: [x0, x1, x2],
            k_values: [y0, y1, y2],
        })
    }

    pub fn bounds(&self) -> (f64, f64) {
        (self.temperatures[0], self.temperatures[2])
    }

    /// Lagrange form. Expects `x` within [`Self::bounds`].
    pub fn get(&self, x: f64) -> f64 {
        if let Ok(index) = locate(&self.temperatures, x) {
            return self.k_values[index];
        }

        let [x0, x1, x2] = self.temperatures;
        let [y0, y1, y2] = self.k_values;
        y0 * ((x - x1) * (x - x2)) / ((x0 - x1) * (x0 - x2))
            + y1 * ((x - x0) * (x - x2)) / ((x1 - x0) * (x1 - x2))
            + y2 * ((x - x0) * (x - x1)) / ((x2 - x0) * (x2 - x1))
    }
}
