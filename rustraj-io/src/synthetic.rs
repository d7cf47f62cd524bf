//! Synthetic trajectory datasets.
//!
//! Each prototype is a straight path between two random points in a square
//! arena. Samples follow their prototype with independent Gaussian noise on
//! every point. The samples are shuffled so that capping the dataset to its
//! first trajectories still covers every prototype.

use crate::Result;
use ndarray::Array3;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use rustraj_core::{Dataset, Error};

/// Parameters of a synthetic dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticConfig {
    /// Number of prototype paths.
    pub prototypes: usize,
    /// Samples drawn around each prototype.
    pub per_prototype: usize,
    /// Points per trajectory (T).
    pub steps: usize,
    /// Standard deviation of the positional noise.
    pub noise: f64,
    /// Side length of the square arena holding the endpoints.
    pub arena: f64,
    /// RNG seed.
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            prototypes: 4,
            per_prototype: 25,
            steps: 20,
            noise: 2.0,
            arena: 100.0,
            seed: 0,
        }
    }
}

impl SyntheticConfig {
    /// Sets the number of prototypes.
    #[must_use]
    pub fn with_prototypes(mut self, prototypes: usize) -> Self {
        self.prototypes = prototypes;
        self
    }

    /// Sets the samples per prototype.
    #[must_use]
    pub fn with_per_prototype(mut self, samples: usize) -> Self {
        self.per_prototype = samples;
        self
    }

    /// Sets the trajectory length.
    #[must_use]
    pub fn with_steps(mut self, steps: usize) -> Self {
        self.steps = steps;
        self
    }

    /// Sets the noise standard deviation.
    #[must_use]
    pub fn with_noise(mut self, noise: f64) -> Self {
        self.noise = noise;
        self
    }

    /// Sets the RNG seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// A generated dataset with the prototype each trajectory was drawn from.
#[derive(Debug, Clone)]
pub struct SyntheticDataset {
    /// The trajectories.
    pub dataset: Dataset,
    /// Prototype index of every trajectory.
    pub labels: Vec<usize>,
    /// The noiseless prototype paths (`K×T×2`).
    pub prototypes: Array3<f64>,
}

/// Generates a dataset of noisy samples around random straight prototypes.
///
/// # Errors
/// Returns a configuration error if any count is zero, or if the noise or
/// arena size is negative or not finite.
pub fn generate(config: &SyntheticConfig) -> Result<SyntheticDataset> {
    if config.prototypes == 0 || config.per_prototype == 0 || config.steps == 0 {
        return Err(Error::ConfigError(
            "prototypes, samples and steps must all be positive".to_string(),
        )
        .into());
    }
    if !(config.arena.is_finite() && config.arena > 0.0) {
        return Err(Error::ConfigError(format!("invalid arena size {}", config.arena)).into());
    }
    let normal = Normal::new(0.0, config.noise)
        .map_err(|e| Error::ConfigError(format!("invalid noise {}: {e}", config.noise)))?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let steps = config.steps;
    let mut prototypes = Array3::zeros((config.prototypes, steps, 2));
    for mut path in prototypes.outer_iter_mut() {
        let start = [
            rng.gen_range(0.0..config.arena),
            rng.gen_range(0.0..config.arena),
        ];
        let end = [
            rng.gen_range(0.0..config.arena),
            rng.gen_range(0.0..config.arena),
        ];
        for (t, mut point) in path.outer_iter_mut().enumerate() {
            let a = if steps > 1 {
                t as f64 / (steps - 1) as f64
            } else {
                0.0
            };
            point[0] = start[0] + a * (end[0] - start[0]);
            point[1] = start[1] + a * (end[1] - start[1]);
        }
    }

    let mut labels: Vec<usize> = (0..config.prototypes)
        .flat_map(|p| std::iter::repeat(p).take(config.per_prototype))
        .collect();
    labels.shuffle(&mut rng);

    let mut data = Array3::zeros((labels.len(), steps, 2));
    for (mut trajectory, &label) in data.outer_iter_mut().zip(&labels) {
        trajectory.assign(&prototypes.index_axis(ndarray::Axis(0), label));
        trajectory.mapv_inplace(|v| v + normal.sample(&mut rng));
    }

    Ok(SyntheticDataset {
        dataset: Dataset::new(data)?,
        labels,
        prototypes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_shape_and_labels() {
        let config = SyntheticConfig::default()
            .with_prototypes(3)
            .with_per_prototype(4)
            .with_steps(6);
        let synth = generate(&config).unwrap();
        assert_eq!(synth.dataset.len(), 12);
        assert_eq!(synth.dataset.steps(), 6);
        assert_eq!(synth.labels.len(), 12);
        for p in 0..3 {
            assert_eq!(synth.labels.iter().filter(|&&l| l == p).count(), 4);
        }
        assert_eq!(synth.prototypes.dim(), (3, 6, 2));
    }

    #[test]
    fn test_generate_is_seeded() {
        let config = SyntheticConfig::default().with_seed(11);
        let a = generate(&config).unwrap();
        let b = generate(&config).unwrap();
        let c = generate(&config.clone().with_seed(12)).unwrap();
        assert_eq!(a.dataset, b.dataset);
        assert_eq!(a.labels, b.labels);
        assert_ne!(a.dataset, c.dataset);
    }

    #[test]
    fn test_noise_free_samples_match_prototypes() {
        let config = SyntheticConfig::default()
            .with_noise(0.0)
            .with_prototypes(2)
            .with_per_prototype(3);
        let synth = generate(&config).unwrap();
        for (trajectory, &label) in synth.dataset.iter().zip(&synth.labels) {
            assert_eq!(
                trajectory,
                synth.prototypes.index_axis(ndarray::Axis(0), label)
            );
        }
    }

    #[test]
    fn test_invalid_config() {
        assert!(generate(&SyntheticConfig::default().with_steps(0)).is_err());
        assert!(generate(&SyntheticConfig::default().with_noise(-1.0)).is_err());
        assert!(generate(&SyntheticConfig::default().with_noise(f64::NAN)).is_err());
    }
}
