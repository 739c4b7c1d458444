use super::{locate, SampleCurve};

#[derive(Debug, Clone)]
pub struct LinearInterpolationTable {
    temperatures: Vec<f64>,
    k_values: Vec<f64>,
}

impl LinearInterpolationTable {
    pub fn new(curve: &SampleCurve) -> Self {
        Self {
            temperatures: curve.temperatures().collect(),
            k_values: curve.k_values().collect(),
        }
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
                let (key1, value1) = (self.temperatures[index - 1], self.k_values[index - 1]);
                let (key2, value2) = (self.temperatures[index], self.k_values[index]);

                ((key2 - x) * value1 + (x - key1) * value2) / (key2 - key1)
            }
        }
    }
}
