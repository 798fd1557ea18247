use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{DashboardError, Result};
use crate::types::SeriesPoint;

const X_END: f64 = 10.0;

/// Size and noise of one data explorer series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesParams {
    pub size: usize,
    pub noise: f64,
}

impl SeriesParams {
    pub const MIN_SIZE: usize = 10;
    pub const MAX_SIZE: usize = 1000;
    pub const MAX_NOISE: f64 = 2.0;

    pub fn new(size: usize, noise: f64) -> Self {
        Self { size, noise }
    }

    pub fn validate(&self) -> Result<()> {
        if !(Self::MIN_SIZE..=Self::MAX_SIZE).contains(&self.size) {
            return Err(DashboardError::invalid_parameter(
                "size",
                format!(
                    "must be between {} and {}",
                    Self::MIN_SIZE,
                    Self::MAX_SIZE
                ),
            ));
        }
        if !self.noise.is_finite() || !(0.0..=Self::MAX_NOISE).contains(&self.noise) {
            return Err(DashboardError::invalid_parameter(
                "noise",
                format!("must be between 0 and {}", Self::MAX_NOISE),
            ));
        }
        Ok(())
    }
}

impl Default for SeriesParams {
    fn default() -> Self {
        Self {
            size: 100,
            noise: 0.5,
        }
    }
}

/// Generates evenly spaced `x` in `[0, 10]` with noisy trigonometric columns
#[derive(Debug, Clone, Copy, Default)]
pub struct SeriesDatasetGenerator;

impl SeriesDatasetGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Each signal column gets independent `Normal(0, noise)` noise. Noise
    /// is drawn column by column.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        params: SeriesParams,
        rng: &mut R,
    ) -> Result<Vec<SeriesPoint>> {
        params.validate()?;

        let normal = Normal::new(0.0, params.noise)
            .map_err(|e| DashboardError::invalid_parameter("noise", e.to_string()))?;

        let n = params.size;
        let step = X_END / (n - 1) as f64;
        let xs: Vec<f64> = (0..n).map(|i| i as f64 * step).collect();

        let sin: Vec<f64> = xs.iter().map(|x| x.sin() + normal.sample(rng)).collect();
        let cos: Vec<f64> = xs.iter().map(|x| x.cos() + normal.sample(rng)).collect();
        let sin_cos: Vec<f64> = xs
            .iter()
            .map(|x| x.sin() * x.cos() + normal.sample(rng))
            .collect();

        let points: Vec<SeriesPoint> = xs
            .iter()
            .enumerate()
            .map(|(i, &x)| SeriesPoint {
                x,
                sin_x: sin[i],
                cos_x: cos[i],
                sin_cos_x: sin_cos[i],
            })
            .collect();

        debug!(size = n, noise = params.noise, "Generated series dataset");
        Ok(points)
    }
}
