//! Randomized chord-bisector circle fit.
//!
//! Every chord of a circle has a perpendicular bisector through the center.
//! Edge-point pairs are drawn at random from a seeded generator; every two
//! consecutive chords whose bisectors intersect cast one vote for the center.
//! The center is the mean vote, the radius the mean distance of all edge
//! points to it.

use log::{debug, warn};
use nalgebra::{Point2, Vector2, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::{require_points, CircleModel, HorizonFit, HorizonModel};
use crate::camera::HorizonError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomizedChordFit {
    /// Only every `stride`-th edge point takes part in chord pairs.
    pub stride: usize,
    /// Chords shorter than this (pixels) are skipped.
    pub min_chord: f64,
    /// Number of random point pairs drawn; bounds the cost of a fit.
    pub max_pairs: usize,
    pub seed: u64,
}

impl Default for RandomizedChordFit {
    fn default() -> Self {
        RandomizedChordFit {
            stride: 5,
            min_chord: 5.0,
            max_pairs: 50_000,
            seed: 0,
        }
    }
}

impl RandomizedChordFit {
    pub fn with_seed(seed: u64) -> Self {
        RandomizedChordFit {
            seed,
            ..Default::default()
        }
    }

    /// Estimates the circle through the edge points.
    ///
    /// # Arguments
    ///
    /// * `points` - Edge points in centered coordinates
    ///
    /// # Errors
    ///
    /// * [`HorizonError::NoEdgeFound`] for an empty point set.
    /// * [`HorizonError::DegenerateGeometry`] when no chord pair produces a
    ///   center vote (too few points, all chords too short or parallel).
    pub fn fit_circle(&self, points: &[Point2<f64>]) -> Result<CircleModel, HorizonError> {
        require_points(points, 3)?;
        if self.stride == 0 {
            return Err(HorizonError::InvalidParameters(
                "chord stride must be at least 1".to_string(),
            ));
        }

        let samples: Vec<Point2<f64>> = points.iter().step_by(self.stride).copied().collect();
        let pairs = self.draw_pairs(samples.len());

        let mut sum = Vector2::zeros();
        let mut votes = 0usize;
        let mut skipped = 0usize;
        for window in pairs.windows(2) {
            let first = (samples[window[0].0], samples[window[0].1]);
            let second = (samples[window[1].0], samples[window[1].1]);
            let (Some(l1), Some(l2)) = (
                self.bisector(&first.0, &first.1),
                self.bisector(&second.0, &second.1),
            ) else {
                skipped += 1;
                continue;
            };
            match intersect(&l1, &l2) {
                Some(vote) => {
                    sum += vote.coords;
                    votes += 1;
                }
                None => skipped += 1,
            }
        }
        if skipped > votes {
            warn!(
                "Chord fit skipped {} of {} chord pairs (short chords or parallel bisectors)",
                skipped,
                skipped + votes
            );
        }

        if votes == 0 {
            return Err(HorizonError::DegenerateGeometry(
                "no chord pair produced a center vote".to_string(),
            ));
        }
        let center = Point2::from(sum / votes as f64);
        let radius = points.iter().map(|p| (p - center).norm()).sum::<f64>() / points.len() as f64;
        debug!(
            "Chord fit: {} votes from {} samples, center ({:.3}, {:.3}), radius {:.3}",
            votes,
            samples.len(),
            center.x,
            center.y,
            radius
        );
        CircleModel::new(center, radius)
    }

    /// Draws up to `max_pairs` ordered index pairs `(i, j)`, `i != j`, from
    /// `n` samples. Cost is bounded by `max_pairs`, not by `n²`.
    fn draw_pairs(&self, n: usize) -> Vec<(usize, usize)> {
        if n < 2 {
            return Vec::new();
        }
        let count = self.max_pairs.min(n * (n - 1));
        let mut rng = StdRng::seed_from_u64(self.seed);
        (0..count)
            .map(|_| loop {
                let i = rng.gen_range(0..n);
                let j = rng.gen_range(0..n);
                if i != j {
                    break (i, j);
                }
            })
            .collect()
    }

    /// Perpendicular bisector of `p`-`q` as homogeneous line `(a, b, c)` with
    /// `a x + b y + c = 0`, or `None` for a chord shorter than `min_chord`.
    fn bisector(&self, p: &Point2<f64>, q: &Point2<f64>) -> Option<Vector3<f64>> {
        let chord = q - p;
        if chord.norm() < self.min_chord {
            return None;
        }
        let midpoint = p + chord * 0.5;
        Some(Vector3::new(chord.x, chord.y, -chord.dot(&midpoint.coords)))
    }
}

/// Smallest sine of the angle between two bisectors that still casts a vote.
const MIN_BISECTOR_SINE: f64 = 1e-9;

fn intersect(l1: &Vector3<f64>, l2: &Vector3<f64>) -> Option<Point2<f64>> {
    let p = l1.cross(l2);
    let scale = l1.xy().norm() * l2.xy().norm();
    if p.z.abs() <= MIN_BISECTOR_SINE * scale {
        return None;
    }
    Some(Point2::new(p.x / p.z, p.y / p.z))
}

impl HorizonFit for RandomizedChordFit {
    fn name(&self) -> &'static str {
        "randomized_chord"
    }

    fn fit(&self, points: &[Point2<f64>]) -> Result<HorizonModel, HorizonError> {
        self.fit_circle(points).map(HorizonModel::Circle)
    }
}
