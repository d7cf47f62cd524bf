//! Display colours for clusters and trajectories.
//!
//! Palettes are built by clustering random RGB samples with k-means, which
//! spreads `count` colours roughly evenly over the colour cube. Palettes are
//! memoized per count in a process-wide cache created on first use.

use ndarray::Axis;
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustraj_core::Responsibilities;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

/// An RGB colour with channels in `[0, 1]`.
pub type Rgb = [f64; 3];

/// Number of random colour samples clustered per palette.
const PALETTE_SAMPLES: usize = 1000;
const PALETTE_SEED: u64 = 0x5EED_C010;
const KMEANS_MAX_ITER: usize = 100;

/// Sets with at least this many trajectories are left to the renderer's
/// default colours.
pub const DISTINCT_COLOR_LIMIT: usize = 50;

/// Trajectories below this share of the total responsibility mass are
/// greyed out.
pub const VISIBLE_SHARE: f64 = 1e-4;

const MUTED: Rgb = [0.8, 0.8, 0.8];
const MUTED_ALPHA: f64 = 0.3;

static PALETTES: OnceLock<Mutex<HashMap<usize, Arc<[Rgb]>>>> = OnceLock::new();

/// Display colour of one trajectory.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrajectoryColor {
    /// Colour channels in `[0, 1]`.
    pub rgb: Rgb,
    /// Opacity in `[0, 1]`.
    pub alpha: f64,
}

/// Returns a palette of `count` colours, computing it on first request.
#[must_use]
pub fn generate_palette(count: usize) -> Arc<[Rgb]> {
    let cache = PALETTES.get_or_init(|| Mutex::new(HashMap::new()));
    let mut cache = cache.lock().unwrap_or_else(PoisonError::into_inner);
    Arc::clone(
        cache
            .entry(count)
            .or_insert_with(|| compute_palette(count).into()),
    )
}

/// Distinct colours for a plain set of `count` trajectories, or `None` when
/// the set is large enough that the renderer's defaults should be used.
#[must_use]
pub fn trajectory_palette(count: usize) -> Option<Arc<[Rgb]>> {
    (count < DISTINCT_COLOR_LIMIT).then(|| generate_palette(count))
}

/// Colours each trajectory by blending cluster colours with its
/// responsibilities.
///
/// Trajectories carrying less than [`VISIBLE_SHARE`] of the total
/// responsibility mass are drawn in translucent grey.
#[must_use]
pub fn cluster_colors(responsibilities: &Responsibilities) -> Vec<TrajectoryColor> {
    let palette = generate_palette(responsibilities.ncols());
    let total = responsibilities.sum();

    responsibilities
        .axis_iter(Axis(0))
        .map(|row| {
            let mass = row.sum();
            if total > 0.0 && mass / total > VISIBLE_SHARE {
                let mut rgb = [0.0; 3];
                for (color, &weight) in palette.iter().zip(row.iter()) {
                    for channel in 0..3 {
                        rgb[channel] += color[channel] * weight / mass;
                    }
                }
                TrajectoryColor { rgb, alpha: 1.0 }
            } else {
                TrajectoryColor {
                    rgb: MUTED,
                    alpha: MUTED_ALPHA,
                }
            }
        })
        .collect()
}

fn compute_palette(count: usize) -> Vec<Rgb> {
    if count == 0 {
        return Vec::new();
    }
    let mut rng = StdRng::seed_from_u64(PALETTE_SEED ^ count as u64);
    let samples: Vec<Rgb> = (0..PALETTE_SAMPLES)
        .map(|_| {
            [
                f64::from(rng.gen_range(0u8..255)),
                f64::from(rng.gen_range(0u8..255)),
                f64::from(rng.gen_range(0u8..255)),
            ]
        })
        .collect();
    kmeans(&samples, count, &mut rng)
        .into_iter()
        .map(|c| [c[0] / 255.0, c[1] / 255.0, c[2] / 255.0])
        .collect()
}

fn distance_sq(a: &Rgb, b: &Rgb) -> f64 {
    (0..3).map(|i| (a[i] - b[i]).powi(2)).sum()
}

fn nearest(point: &Rgb, centers: &[Rgb]) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (index, center) in centers.iter().enumerate() {
        let dist = distance_sq(point, center);
        if dist < best_dist {
            best = index;
            best_dist = dist;
        }
    }
    best
}

/// k-means with k-means++ seeding. Empty clusters keep their centre.
fn kmeans(samples: &[Rgb], k: usize, rng: &mut StdRng) -> Vec<Rgb> {
    let mut centers = Vec::with_capacity(k);
    centers.push(samples[rng.gen_range(0..samples.len())]);
    while centers.len() < k {
        let weights: Vec<f64> = samples
            .iter()
            .map(|s| distance_sq(s, &centers[nearest(s, &centers)]))
            .collect();
        let next = match WeightedIndex::new(&weights) {
            Ok(dist) => dist.sample(rng),
            // Every sample already coincides with a centre.
            Err(_) => rng.gen_range(0..samples.len()),
        };
        centers.push(samples[next]);
    }

    let mut labels = vec![usize::MAX; samples.len()];
    for _ in 0..KMEANS_MAX_ITER {
        let mut changed = false;
        for (label, sample) in labels.iter_mut().zip(samples) {
            let closest = nearest(sample, &centers);
            if *label != closest {
                *label = closest;
                changed = true;
            }
        }
        if !changed {
            break;
        }

        let mut sums = vec![[0.0; 3]; k];
        let mut counts = vec![0usize; k];
        for (&label, sample) in labels.iter().zip(samples) {
            counts[label] += 1;
            for channel in 0..3 {
                sums[label][channel] += sample[channel];
            }
        }
        for ((center, sum), &n) in centers.iter_mut().zip(&sums).zip(&counts) {
            if n > 0 {
                let n = n as f64;
                *center = [sum[0] / n, sum[1] / n, sum[2] / n];
            }
        }
    }
    centers
}
