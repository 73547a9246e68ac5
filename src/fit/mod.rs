//! Horizon curve estimators.
//!
//! The horizon arc is modelled either as a circle ([`CircleModel`]) or as a
//! general conic ([`ConicModel`]). Three interchangeable estimators implement
//! the [`HorizonFit`] trait:
//!
//! - [`RandomizedChordFit`]: votes for the center with intersections of random
//!   chord bisectors.
//! - [`AlgebraicCircleFit`]: linear least squares on `x² + y² + Dx + Ey + F = 0`.
//! - [`ConicFit`]: QR-partitioned orthogonal conic fit that tolerates the
//!   non-circular arcs produced by lens distortion.
//!
//! [`quality`] scores a circle against the edge points it was fitted to.

use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

pub mod algebraic;
pub mod chord;
pub mod conic;
pub mod quality;

pub use algebraic::AlgebraicCircleFit;
pub use chord::RandomizedChordFit;
pub use conic::ConicFit;
pub use quality::FitQuality;

use crate::camera::HorizonError;

/// Circle in centered coordinates. `radius` is always positive and finite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CircleModel {
    pub center: Point2<f64>,
    pub radius: f64,
}

impl CircleModel {
    pub fn new(center: Point2<f64>, radius: f64) -> Result<Self, HorizonError> {
        if !(radius.is_finite() && radius > 0.0) {
            return Err(HorizonError::DegenerateGeometry(format!(
                "circle radius must be positive, got {radius}"
            )));
        }
        if !(center.x.is_finite() && center.y.is_finite()) {
            return Err(HorizonError::DegenerateGeometry(format!(
                "circle center is not finite: {center:?}"
            )));
        }
        Ok(CircleModel { center, radius })
    }

    /// Whether the image center lies strictly inside the circle.
    pub fn contains_origin(&self) -> bool {
        self.radius > self.center.coords.norm()
    }

    /// Point of the circle nearest to the image center.
    pub fn vertex(&self) -> Result<Point2<f64>, HorizonError> {
        let distance = self.center.coords.norm();
        if distance == 0.0 {
            return Err(HorizonError::DegenerateGeometry(
                "circle is centered on the image center".to_string(),
            ));
        }
        let toward_origin = -self.center.coords / distance;
        Ok(self.center + toward_origin * self.radius)
    }
}

/// Conic `a0 x² + a1 xy + a2 y² + a3 x + a4 y + a5 = 0` in centered coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConicModel {
    pub coefficients: [f64; 6],
}

impl ConicModel {
    pub fn new(coefficients: [f64; 6]) -> Self {
        ConicModel { coefficients }
    }

    pub fn evaluate(&self, p: &Point2<f64>) -> f64 {
        let [a0, a1, a2, a3, a4, a5] = self.coefficients;
        a0 * p.x * p.x + a1 * p.x * p.y + a2 * p.y * p.y + a3 * p.x + a4 * p.y + a5
    }

    /// Rescales to unit norm with `a0 + a2 > 0`, so the region that closes
    /// around the curve evaluates negative.
    pub fn normalized(&self) -> Result<Self, HorizonError> {
        let norm = self.coefficients.iter().map(|a| a * a).sum::<f64>().sqrt();
        if !(norm.is_finite() && norm > 0.0) {
            return Err(HorizonError::DegenerateGeometry(
                "conic coefficients vanish".to_string(),
            ));
        }
        let trace = (self.coefficients[0] + self.coefficients[2]) / norm;
        if trace.abs() < 1e-12 {
            return Err(HorizonError::DegenerateGeometry(
                "conic has no preferred interior (a0 + a2 = 0)".to_string(),
            ));
        }
        let scale = trace.signum() / norm;
        Ok(ConicModel {
            coefficients: self.coefficients.map(|a| a * scale),
        })
    }

    /// Whether the image center falls on the interior (Earth) side of the curve.
    pub fn contains_origin(&self) -> Result<bool, HorizonError> {
        Ok(self.normalized()?.coefficients[5] < 0.0)
    }

    /// Distance from the origin to the first crossing of the ray at `angle`.
    pub fn ray_distance(&self, angle: f64) -> Option<f64> {
        let [a0, a1, a2, a3, a4, a5] = self.coefficients;
        let (s, c) = angle.sin_cos();
        let a = a0 * c * c + a1 * c * s + a2 * s * s;
        let b = a3 * c + a4 * s;
        smallest_positive_root(a, b, a5)
    }

    /// Point of the curve nearest to the image center.
    ///
    /// Rays are cast from the origin on a 0.5° grid; the best ray is refined by
    /// golden-section search over the neighbouring grid cells.
    pub fn vertex(&self) -> Result<Point2<f64>, HorizonError> {
        const SCAN_STEPS: usize = 720;
        const REFINE_ITERATIONS: usize = 64;

        let distance = |angle: f64| self.ray_distance(angle).unwrap_or(f64::INFINITY);
        let step = 2.0 * std::f64::consts::PI / SCAN_STEPS as f64;

        let (best_angle, best_distance) = (0..SCAN_STEPS)
            .map(|i| {
                let angle = i as f64 * step;
                (angle, distance(angle))
            })
            .fold((0.0, f64::INFINITY), |best, candidate| {
                if candidate.1 < best.1 {
                    candidate
                } else {
                    best
                }
            });
        if !best_distance.is_finite() {
            return Err(HorizonError::DegenerateGeometry(
                "no ray from the image center meets the conic".to_string(),
            ));
        }

        let inv_phi = (5.0_f64.sqrt() - 1.0) / 2.0;
        let (mut lo, mut hi) = (best_angle - step, best_angle + step);
        for _ in 0..REFINE_ITERATIONS {
            let m1 = hi - inv_phi * (hi - lo);
            let m2 = lo + inv_phi * (hi - lo);
            if distance(m1) <= distance(m2) {
                hi = m2;
            } else {
                lo = m1;
            }
        }
        let refined = 0.5 * (lo + hi);
        let (angle, t) = match distance(refined) {
            t if t <= best_distance => (refined, t),
            _ => (best_angle, best_distance),
        };
        Ok(Point2::from(Vector2::new(angle.cos(), angle.sin()) * t))
    }

    /// Circle represented by this conic, if it is one (`a1 ≈ 0`, `a0 ≈ a2`).
    pub fn to_circle(&self, tolerance: f64) -> Option<CircleModel> {
        let [a0, a1, a2, a3, a4, a5] = self.normalized().ok()?.coefficients;
        let scale = 0.5 * (a0 + a2);
        if a1.abs() > tolerance * scale || (a0 - a2).abs() > tolerance * scale {
            return None;
        }
        let d = a3 / scale;
        let e = a4 / scale;
        let f = a5 / scale;
        let center = Point2::new(-0.5 * d, -0.5 * e);
        let radicand = center.coords.norm_squared() - f;
        if radicand <= 0.0 {
            return None;
        }
        CircleModel::new(center, radicand.sqrt()).ok()
    }
}

fn smallest_positive_root(a: f64, b: f64, c: f64) -> Option<f64> {
    let scale = a.abs().max(b.abs()).max(c.abs());
    if scale == 0.0 {
        return None;
    }
    let roots: [Option<f64>; 2] = if a.abs() <= 1e-14 * scale {
        if b == 0.0 {
            return None;
        }
        [Some(-c / b), None]
    } else {
        let discriminant = b * b - 4.0 * a * c;
        if discriminant < 0.0 {
            return None;
        }
        let q = -0.5 * (b + b.signum() * discriminant.sqrt());
        let first = q / a;
        let second = if q != 0.0 { Some(c / q) } else { Some(first) };
        [Some(first), second]
    };
    roots
        .into_iter()
        .flatten()
        .filter(|t| t.is_finite() && *t > 0.0)
        .fold(None, |best: Option<f64>, t| {
            Some(best.map_or(t, |b| b.min(t)))
        })
}

/// Output of a [`HorizonFit`] estimator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum HorizonModel {
    Circle(CircleModel),
    Conic(ConicModel),
}

impl HorizonModel {
    pub fn as_circle(&self) -> Option<&CircleModel> {
        match self {
            HorizonModel::Circle(circle) => Some(circle),
            HorizonModel::Conic(_) => None,
        }
    }

    pub fn vertex(&self) -> Result<Point2<f64>, HorizonError> {
        match self {
            HorizonModel::Circle(circle) => circle.vertex(),
            HorizonModel::Conic(conic) => conic.vertex(),
        }
    }
}

/// A horizon curve estimator over centered edge points.
pub trait HorizonFit {
    /// Short identifier used in logs and reports.
    fn name(&self) -> &'static str;

    /// Fits the horizon model to the edge points.
    ///
    /// # Errors
    ///
    /// * [`HorizonError::NoEdgeFound`] for an empty point set.
    /// * [`HorizonError::DegenerateGeometry`] when the points do not determine
    ///   a valid model.
    fn fit(&self, points: &[Point2<f64>]) -> Result<HorizonModel, HorizonError>;
}

pub(crate) fn require_points(points: &[Point2<f64>], needed: usize) -> Result<(), HorizonError> {
    if points.is_empty() {
        return Err(HorizonError::NoEdgeFound(
            "no edge points to fit".to_string(),
        ));
    }
    if points.len() < needed {
        return Err(HorizonError::DegenerateGeometry(format!(
            "need at least {needed} edge points, got {}",
            points.len()
        )));
    }
    Ok(())
}
