//! Linear least-squares circle fit.
//!
//! Minimises the algebraic residual of `x² + y² = D x + E y + F` through the
//! 3×3 normal equations. The center is `(D/2, E/2)` and
//! `r² = F + cx² + cy²`.

use log::debug;
use nalgebra::{Matrix3, Point2, Vector3};

use super::{require_points, CircleModel, HorizonFit, HorizonModel};
use crate::camera::HorizonError;

const SINGULAR_TOLERANCE: f64 = 1e-12;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AlgebraicCircleFit;

impl AlgebraicCircleFit {
    /// # Errors
    ///
    /// * [`HorizonError::NoEdgeFound`] for an empty point set.
    /// * [`HorizonError::DegenerateGeometry`] for fewer than three points,
    ///   collinear points (singular normal matrix) or a negative `r²`.
    pub fn fit_circle(&self, points: &[Point2<f64>]) -> Result<CircleModel, HorizonError> {
        require_points(points, 3)?;

        let mut a = Matrix3::<f64>::zeros();
        let mut b = Vector3::<f64>::zeros();
        for p in points {
            let row = Vector3::new(p.x, p.y, 1.0);
            let sq = p.coords.norm_squared();
            a += row * row.transpose();
            b += row * sq;
        }

        let singular = || {
            HorizonError::DegenerateGeometry("singular normal matrix (collinear points)".to_string())
        };
        if a.determinant().abs() <= SINGULAR_TOLERANCE * a.norm().powi(3) {
            return Err(singular());
        }
        let sol = a.lu().solve(&b).ok_or_else(singular)?;
        let center = Point2::new(sol[0] / 2.0, sol[1] / 2.0);
        let radius_sq = sol[2] + center.coords.norm_squared();
        if !(radius_sq > 0.0) {
            return Err(HorizonError::DegenerateGeometry(format!(
                "negative squared radius {radius_sq}"
            )));
        }

        let circle = CircleModel::new(center, radius_sq.sqrt())?;
        debug!(
            "Algebraic fit over {} points: center ({:.3}, {:.3}), radius {:.3}",
            points.len(),
            circle.center.x,
            circle.center.y,
            circle.radius
        );
        Ok(circle)
    }
}

impl HorizonFit for AlgebraicCircleFit {
    fn name(&self) -> &'static str {
        "algebraic"
    }

    fn fit(&self, points: &[Point2<f64>]) -> Result<HorizonModel, HorizonError> {
        self.fit_circle(points).map(HorizonModel::Circle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::sample_arc;
    use approx::assert_relative_eq;

    #[test]
    fn test_three_points_define_circle() {
        let points = [
            Point2::new(10.0, 0.0),
            Point2::new(0.0, 10.0),
            Point2::new(-10.0, 0.0),
        ];
        let circle = AlgebraicCircleFit.fit_circle(&points).unwrap();
        assert_relative_eq!(circle.center.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(circle.center.y, 0.0, epsilon = 1e-9);
        assert_relative_eq!(circle.radius, 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_short_arc() {
        let center = Point2::new(15.0, -300.0);
        let points = sample_arc(&center, 340.0, 1.3, 1.85, 200);
        let circle = AlgebraicCircleFit.fit_circle(&points).unwrap();
        assert_relative_eq!(circle.center.x, 15.0, epsilon = 1e-6);
        assert_relative_eq!(circle.center.y, -300.0, epsilon = 1e-6);
        assert_relative_eq!(circle.radius, 340.0, epsilon = 1e-6);
    }

    #[test]
    fn test_collinear_points_are_degenerate() {
        let points: Vec<_> = (0..20).map(|i| Point2::new(i as f64, 2.0 * i as f64)).collect();
        assert!(matches!(
            AlgebraicCircleFit.fit(&points),
            Err(HorizonError::DegenerateGeometry(_))
        ));
    }

    #[test]
    fn test_too_few_points() {
        let points = [Point2::new(1.0, 0.0), Point2::new(0.0, 1.0)];
        assert!(matches!(
            AlgebraicCircleFit.fit_circle(&points),
            Err(HorizonError::DegenerateGeometry(_))
        ));
    }
}
