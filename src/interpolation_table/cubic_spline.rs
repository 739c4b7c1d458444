use log::trace;
use nalgebra::{DMatrix, DVector};

use super::{locate, SampleCurve, SplineBoundary};
use crate::error::InterpolationError;

/// A piecewise cubic through every sample, continuous up to the second derivative.
#[derive(Debug, Clone)]
pub struct CubicSplineTable {
    temperatures: Vec<f64>,
    k_values: Vec<f64>,
    /// Per interval, the coefficients `[d, c, b, a]` of
    /// `a + b * s + c * s^2 + d * s^3` with `s` the distance to the left knot.
    segments: Vec<[f64; 4]>,
}

impl CubicSplineTable {
    pub fn fit(curve: &SampleCurve, boundary: SplineBoundary) -> Result<Self, InterpolationError> {
        let required = boundary.minimum_samples();
        if curve.len() < required {
            return Err(InterpolationError::InsufficientData {
                required,
                actual: curve.len(),
            });
        }

        let temperatures: Vec<f64> = curve.temperatures().collect();
        let k_values: Vec<f64> = curve.k_values().collect();
        let moments = solve_moments(&temperatures, &k_values, boundary)?;

        let segments = temperatures
            .windows(2)
            .enumerate()
            .map(|(i, pair)| {
                let h = pair[1] - pair[0];
                let d = (moments[i + 1] - moments[i]) / (6.0 * h);
                let c = moments[i] / 2.0;
                let b = (k_values[i + 1] - k_values[i]) / h
                    - h * (2.0 * moments[i] + moments[i + 1]) / 6.0;
                [d, c, b, k_values[i]]
            })
            .collect();

        trace!(
            "Fitted {boundary:?} cubic spline through {} knots",
            temperatures.len()
        );

        Ok(Self {
            temperatures,
            k_values,
            segments,
        })
    }

    pub fn bounds(&self) -> (f64, f64) {
        (
            self.temperatures[0],
            self.temperatures[self.temperatures.len() - 1],
        )
    }

    /// Expects `x` within [`Self::bounds`].
    pub fn get(&self, x: f64) -> f64 {
        match locate(&self.temperatures, x) {
            Ok(index) => self.k_values[index],
            Err(index) => {
                let s = x - self.temperatures[index - 1];
                let [d, c, b, a] = self.segments[index - 1];
                d.mul_add(s, c).mul_add(s, b).mul_add(s, a)
            }
        }
    }
}

/// Solve for the second derivatives at the knots.
///
/// Interior rows come from continuity of the first derivative:
/// `h[i-1] m[i-1] + 2 (h[i-1] + h[i]) m[i] + h[i] m[i+1] = 6 (slope[i] - slope[i-1])`.
/// The first and the last row hold the boundary condition.
fn solve_moments(
    temperatures: &[f64],
    k_values: &[f64],
    boundary: SplineBoundary,
) -> Result<DVector<f64>, InterpolationError> {
    let n = temperatures.len() - 1;
    let h: Vec<f64> = temperatures.windows(2).map(|pair| pair[1] - pair[0]).collect();
    let slopes: Vec<f64> = (0..n)
        .map(|i| (k_values[i + 1] - k_values[i]) / h[i])
        .collect();

    let mut moment_matrix = DMatrix::<f64>::zeros(n + 1, n + 1);
    let mut rhs = DVector::<f64>::zeros(n + 1);

    for i in 1..n {
        moment_matrix[(i, i - 1)] = h[i - 1];
        moment_matrix[(i, i)] = 2.0 * (h[i - 1] + h[i]);
        moment_matrix[(i, i + 1)] = h[i];
        rhs[i] = 6.0 * (slopes[i] - slopes[i - 1]);
    }

    match boundary {
        SplineBoundary::Natural => {
            moment_matrix[(0, 0)] = 1.0;
            moment_matrix[(n, n)] = 1.0;
        }
        SplineBoundary::NotAKnot => {
            // The cubic coefficients of the first two and of the last two intervals agree.
            moment_matrix[(0, 0)] = -h[1];
            moment_matrix[(0, 1)] = h[0] + h[1];
            moment_matrix[(0, 2)] = -h[0];

            moment_matrix[(n, n - 2)] = -h[n - 1];
            moment_matrix[(n, n - 1)] = h[n - 2] + h[n - 1];
            moment_matrix[(n, n)] = -h[n - 2];
        }
    }

    moment_matrix
        .lu()
        .solve(&rhs)
        .ok_or(InterpolationError::SingularSystem { knots: n + 1 })
}

#[cfg(test)]
mod tests {
    use super::CubicSplineTable;
    use crate::{
        error::InterpolationError,
        interpolation_table::{SampleCurve, SplineBoundary},
    };

    fn curve() -> SampleCurve {
        SampleCurve::new(vec![
            (100.0, 1.0),
            (150.0, 1.5),
            (200.0, 1.8),
            (250.0, 2.0),
            (300.0, 2.6),
            (350.0, 2.7),
        ])
        .unwrap()
    }

    #[test]
    fn not_a_knot() {
        let table = CubicSplineTable::fit(&curve(), SplineBoundary::NotAKnot).unwrap();
        for (x, expected) in [
            (125.0, 1.26875),
            (175.0, 1.68125),
            (230.0, 1.8856),
            (333.0, 2.8028092),
        ] {
            assert!(
                (table.get(x) - expected).abs() < 1e-9,
                "K({x}) = {}, expected {expected}",
                table.get(x)
            );
        }
    }

    #[test]
    fn natural() {
        let table = CubicSplineTable::fit(&curve(), SplineBoundary::Natural).unwrap();
        for (x, expected) in [
            (125.0, 1.2636363636363637),
            (175.0, 1.684090909090909),
            (230.0, 1.878981818181818),
            (333.0, 2.7152048),
        ] {
            assert!(
                (table.get(x) - expected).abs() < 1e-9,
                "K({x}) = {}, expected {expected}",
                table.get(x)
            );
        }
    }

    #[test]
    fn four_knots_not_a_knot_is_a_single_cubic() {
        // y = x^3 - 2x + 1 is reproduced exactly by a not-a-knot spline through four of its points.
        let cubic = |x: f64| x * x * x - 2.0 * x + 1.0;
        let curve =
            SampleCurve::new([-2.0, -0.5, 1.0, 3.0].map(|x| (x, cubic(x))).to_vec()).unwrap();
        let table = CubicSplineTable::fit(&curve, SplineBoundary::NotAKnot).unwrap();
        for x in [-1.9, -1.0, 0.0, 0.3, 2.2, 2.99] {
            assert!((table.get(x) - cubic(x)).abs() < 1e-9);
        }
    }

    #[test]
    fn knots_are_exact() {
        let curve = curve();
        for boundary in [SplineBoundary::NotAKnot, SplineBoundary::Natural] {
            let table = CubicSplineTable::fit(&curve, boundary).unwrap();
            for &(temperature, k_value) in curve.samples() {
                assert_eq!(table.get(temperature), k_value);
            }
        }
    }

    #[test]
    fn too_few_knots() {
        let curve = SampleCurve::new(vec![(0.0, 1.0), (1.0, 2.0), (2.0, 1.5)]).unwrap();
        assert_eq!(
            CubicSplineTable::fit(&curve, SplineBoundary::NotAKnot).unwrap_err(),
            InterpolationError::InsufficientData {
                required: 4,
                actual: 3
            }
        );
        assert!(CubicSplineTable::fit(&curve, SplineBoundary::Natural).is_ok());
    }
}
