//! Seeded ensemble generation
//!
//! Produces realistic-looking multi-member forecasts on a small grid so
//! merge, reduction and filtering can be exercised on non-trivial data.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use strata_core::{LabelledArray, StrataResult};

use crate::ArrayBuilder;

/// Ensemble generator configuration
#[derive(Clone, Debug)]
pub struct EnsembleConfig {
    /// Number of realizations
    pub members: usize,
    /// Height levels in metres
    pub heights: Vec<f64>,
    /// Grid rows
    pub rows: usize,
    /// Grid columns
    pub cols: usize,
    /// Grid spacing in metres
    pub spacing: f64,
    /// Validity times in seconds
    pub times: Vec<f64>,
    /// Mean value
    pub base: f64,
    /// Half-width of the uniform perturbation
    pub spread: f64,
    /// Random seed
    pub seed: u64,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        EnsembleConfig {
            members: 3,
            heights: vec![10.0, 50.0, 100.0],
            rows: 4,
            cols: 4,
            spacing: 2000.0,
            times: vec![1_700_000_000.0],
            base: 280.0,
            spread: 5.0,
            seed: 42,
        }
    }
}

impl EnsembleConfig {
    /// Small ensemble for quick tests
    pub fn light() -> Self {
        EnsembleConfig {
            members: 2,
            heights: vec![10.0, 100.0],
            rows: 2,
            cols: 2,
            times: vec![1_700_000_000.0, 1_700_003_600.0],
            ..EnsembleConfig::default()
        }
    }

    /// Large ensemble for benchmarks
    pub fn heavy() -> Self {
        EnsembleConfig {
            members: 18,
            heights: (1..=10).map(|h| h as f64 * 50.0).collect(),
            rows: 32,
            cols: 32,
            times: (0..6).map(|t| 1_700_000_000.0 + t as f64 * 3600.0).collect(),
            ..EnsembleConfig::default()
        }
    }
}

/// Ensemble generator
pub struct EnsembleGenerator {
    config: EnsembleConfig,
    rng: StdRng,
}

impl EnsembleGenerator {
    pub fn new(config: EnsembleConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        EnsembleGenerator { config, rng }
    }

    pub fn config(&self) -> &EnsembleConfig {
        &self.config
    }

    fn values(&mut self, count: usize) -> Vec<f64> {
        let (base, spread) = (self.config.base, self.config.spread);
        (0..count)
            .map(|_| base + self.rng.gen_range(-spread..=spread))
            .collect()
    }

    /// Full ensemble (realization, height, y, x) valid at `time`
    pub fn ensemble_at(&mut self, time: f64) -> StrataResult<LabelledArray> {
        let c = &self.config;
        let size = c.members * c.heights.len() * c.rows * c.cols;
        let builder = ArrayBuilder::air_temperature()
            .realizations(c.members)
            .heights(&c.heights)
            .grid(c.rows, c.cols, c.spacing)
            .time(time);
        let values = self.values(size);
        builder.values(values).build()
    }

    /// Surface field (realization, y, x) valid at `time`
    pub fn surface_at(&mut self, time: f64) -> StrataResult<LabelledArray> {
        let c = &self.config;
        let size = c.members * c.rows * c.cols;
        let builder = ArrayBuilder::air_temperature()
            .realizations(c.members)
            .grid(c.rows, c.cols, c.spacing)
            .time(time);
        let values = self.values(size);
        builder.values(values).build()
    }

    /// One surface field per configured time
    pub fn surface_series(&mut self) -> StrataResult<Vec<LabelledArray>> {
        let times = self.config.times.clone();
        times.into_iter().map(|t| self.surface_at(t)).collect()
    }
}
