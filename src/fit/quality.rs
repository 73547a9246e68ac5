//! Residual statistics of a circle fit.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use super::CircleModel;
use crate::camera::HorizonError;

/// Statistics of the radial residuals `|p - center| - radius`.
///
/// Standard deviations are population values (divided by `n`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitQuality {
    pub num_points: usize,
    pub mean_sq_error: f64,
    pub std_sq_error: f64,
    pub mean_abs_error: f64,
    pub std_abs_error: f64,
    pub rmse: f64,
    pub max_abs_error: f64,
}

impl FitQuality {
    /// Scores `circle` against the points it was fitted to.
    ///
    /// # Errors
    ///
    /// [`HorizonError::NoEdgeFound`] for an empty point set.
    pub fn evaluate(points: &[Point2<f64>], circle: &CircleModel) -> Result<Self, HorizonError> {
        if points.is_empty() {
            return Err(HorizonError::NoEdgeFound(
                "cannot score a fit without points".to_string(),
            ));
        }
        let residuals: Vec<f64> = points
            .iter()
            .map(|p| (p - circle.center).norm() - circle.radius)
            .collect();
        let squared: Vec<f64> = residuals.iter().map(|r| r * r).collect();
        let absolute: Vec<f64> = residuals.iter().map(|r| r.abs()).collect();

        let (mean_sq_error, std_sq_error) = mean_std(&squared);
        let (mean_abs_error, std_abs_error) = mean_std(&absolute);
        Ok(FitQuality {
            num_points: points.len(),
            mean_sq_error,
            std_sq_error,
            mean_abs_error,
            std_abs_error,
            rmse: mean_sq_error.sqrt(),
            max_abs_error: absolute.iter().cloned().fold(0.0, f64::max),
        })
    }
}

fn mean_std(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_perfect_fit() {
        let circle = CircleModel::new(Point2::new(1.0, 2.0), 5.0).unwrap();
        let points = crate::geometry::sample_arc(&circle.center, 5.0, 0.0, 3.0, 40);
        let quality = FitQuality::evaluate(&points, &circle).unwrap();
        assert_eq!(quality.num_points, 40);
        assert_relative_eq!(quality.rmse, 0.0, epsilon = 1e-12);
        assert_relative_eq!(quality.max_abs_error, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_known_residuals() {
        let circle = CircleModel::new(Point2::origin(), 10.0).unwrap();
        // Residuals: +1, -1, +3, -3
        let points = [
            Point2::new(11.0, 0.0),
            Point2::new(0.0, 9.0),
            Point2::new(-13.0, 0.0),
            Point2::new(0.0, -7.0),
        ];
        let quality = FitQuality::evaluate(&points, &circle).unwrap();
        assert_relative_eq!(quality.mean_abs_error, 2.0, epsilon = 1e-12);
        assert_relative_eq!(quality.std_abs_error, 1.0, epsilon = 1e-12);
        assert_relative_eq!(quality.mean_sq_error, 5.0, epsilon = 1e-12);
        assert_relative_eq!(quality.std_sq_error, 4.0, epsilon = 1e-12);
        assert_relative_eq!(quality.rmse, 5.0_f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(quality.max_abs_error, 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_empty_points() {
        let circle = CircleModel::new(Point2::origin(), 1.0).unwrap();
        assert!(FitQuality::evaluate(&[], &circle).is_err());
    }
}
