//! Radial barrel distortion on centered edge points.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::camera::{HorizonError, Resolution};

/// Radial distortion model, applied about the image center.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum BarrelDistortion {
    /// Single coefficient derived from the relative displacement of the image
    /// corner, `(r_distorted - r_true) / r_true`.
    FirstOrder { percentage: f64 },
    /// Calibrated coefficients `k1, k2, ...` of `|p|², |p|⁴, ...`.
    Polynomial { coefficients: Vec<f64> },
}

impl BarrelDistortion {
    pub fn validate_params(&self) -> Result<(), HorizonError> {
        match self {
            BarrelDistortion::FirstOrder { percentage } => {
                if !(percentage.is_finite() && *percentage < 1.0 && *percentage > -1.0) {
                    return Err(HorizonError::InvalidParameters(format!(
                        "distortion percentage must lie in (-1, 1), got {percentage}"
                    )));
                }
            }
            BarrelDistortion::Polynomial { coefficients } => {
                if coefficients.iter().any(|k| !k.is_finite()) {
                    return Err(HorizonError::InvalidParameters(
                        "distortion coefficients must be finite".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Relative radial scale `s(|p|)` so that the correction is `p (1 + s)`.
    fn radial_term(&self, p: &Point2<f64>, resolution: &Resolution) -> f64 {
        let r_sq = p.coords.norm_squared();
        match self {
            BarrelDistortion::FirstOrder { percentage } => {
                let k = percentage / ((1.0 - percentage) * resolution.corner_radius_sq());
                k * r_sq
            }
            BarrelDistortion::Polynomial { coefficients } => coefficients
                .iter()
                .scan(1.0, |power, k| {
                    *power *= r_sq;
                    Some(k * *power)
                })
                .sum(),
        }
    }

    /// Removes the distortion from one point.
    pub fn correct(&self, p: &Point2<f64>, resolution: &Resolution) -> Point2<f64> {
        p * (1.0 + self.radial_term(p, resolution))
    }

    /// Adds the distortion to one point. First-order approximation of the
    /// inverse of [`BarrelDistortion::correct`], used to synthesise test data.
    pub fn distort(&self, p: &Point2<f64>, resolution: &Resolution) -> Point2<f64> {
        p * (1.0 - self.radial_term(p, resolution))
    }

    pub fn correct_points(
        &self,
        points: &[Point2<f64>],
        resolution: &Resolution,
    ) -> Vec<Point2<f64>> {
        points.iter().map(|p| self.correct(p, resolution)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_first_order_corner() {
        let resolution = Resolution::new(160, 120);
        let model = BarrelDistortion::FirstOrder { percentage: 0.1 };
        let corner = Point2::new(80.0, 60.0);
        let corrected = model.correct(&corner, &resolution);
        assert_relative_eq!(corrected.x, 80.0 / 0.9, epsilon = 1e-9);
        assert_relative_eq!(corrected.y, 60.0 / 0.9, epsilon = 1e-9);

        let origin = model.correct(&Point2::origin(), &resolution);
        assert_eq!(origin, Point2::origin());
    }

    #[test]
    fn test_polynomial() {
        let resolution = Resolution::default();
        let model = BarrelDistortion::Polynomial {
            coefficients: vec![1e-4, 1e-8],
        };
        let p = Point2::new(30.0, 40.0);
        // |p|² = 2500, |p|⁴ = 6.25e6
        let scale = 1.0 + 1e-4 * 2500.0 + 1e-8 * 6.25e6;
        let corrected = model.correct(&p, &resolution);
        assert_relative_eq!(corrected.x, 30.0 * scale, epsilon = 1e-9);
        assert_relative_eq!(corrected.y, 40.0 * scale, epsilon = 1e-9);
    }

    #[test]
    fn test_distort_roughly_inverts_correct() {
        let resolution = Resolution::default();
        let model = BarrelDistortion::FirstOrder { percentage: 0.02 };
        let p = Point2::new(-50.0, 35.0);
        let round_trip = model.correct(&model.distort(&p, &resolution), &resolution);
        assert_relative_eq!(round_trip.x, p.x, epsilon = 0.05);
        assert_relative_eq!(round_trip.y, p.y, epsilon = 0.05);
    }

    #[test]
    fn test_validation() {
        assert!(BarrelDistortion::FirstOrder { percentage: 1.0 }
            .validate_params()
            .is_err());
        assert!(BarrelDistortion::Polynomial {
            coefficients: vec![f64::NAN]
        }
        .validate_params()
        .is_err());
        assert!(BarrelDistortion::FirstOrder { percentage: 0.05 }
            .validate_params()
            .is_ok());
    }
}
