//! Orthogonal least-squares conic fit.
//!
//! Each edge point contributes a row `[x, y, 1, x², √2·xy, y²]`. After a QR
//! decomposition the triangular factor is split into blocks
//!
//! ```text
//! R = [R11 R12]
//!     [ 0  R22]
//! ```
//!
//! The quadratic part `w` is the right singular vector of `R22` for its smallest
//! singular value, and the linear part follows from `R11 v = -R12 w`. The unit
//! norm constraint on `w` is invariant under rotation and translation of the
//! plane, so points are normalised to their centroid before fitting.

use log::debug;
use nalgebra::{DMatrix, Point2, Vector3};

use super::{require_points, ConicModel, HorizonFit, HorizonModel};
use crate::camera::HorizonError;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ConicFit;

impl ConicFit {
    /// # Errors
    ///
    /// * [`HorizonError::NoEdgeFound`] for an empty point set.
    /// * [`HorizonError::DegenerateGeometry`] for fewer than six points or a
    ///   rank-deficient linear block (collinear points).
    pub fn fit_conic(&self, points: &[Point2<f64>]) -> Result<ConicModel, HorizonError> {
        require_points(points, 6)?;

        let (mean, scale) = normalization(points);
        let mut design = DMatrix::<f64>::zeros(points.len(), 6);
        for (i, p) in points.iter().enumerate() {
            let x = (p.x - mean.x) * scale;
            let y = (p.y - mean.y) * scale;
            design[(i, 0)] = x;
            design[(i, 1)] = y;
            design[(i, 2)] = 1.0;
            design[(i, 3)] = x * x;
            design[(i, 4)] = std::f64::consts::SQRT_2 * x * y;
            design[(i, 5)] = y * y;
        }

        let r = design.qr().r();
        let r11 = r.fixed_view::<3, 3>(0, 0).into_owned();
        let r12 = r.fixed_view::<3, 3>(0, 3).into_owned();
        let r22 = r.fixed_view::<3, 3>(3, 3).into_owned();

        let svd = r22.svd(false, true);
        let v_t = svd.v_t.ok_or_else(|| {
            HorizonError::DegenerateGeometry("SVD of the quadratic block failed".to_string())
        })?;
        let smallest = svd.singular_values.imin();
        let w: Vector3<f64> = v_t.row(smallest).transpose();

        let v = -r11
            .solve_upper_triangular(&(r12 * w))
            .ok_or_else(|| {
                HorizonError::DegenerateGeometry(
                    "rank-deficient linear block (collinear points)".to_string(),
                )
            })?;

        let normalized = [
            w[0],
            std::f64::consts::SQRT_2 * w[1],
            w[2],
            v[0],
            v[1],
            v[2],
        ];
        let conic = ConicModel::new(denormalize(&normalized, &mean, scale)).normalized()?;
        debug!(
            "Conic fit over {} points: {:?}",
            points.len(),
            conic.coefficients
        );
        Ok(conic)
    }
}

/// Centroid and the scale that brings the mean distance to it to `√2`.
fn normalization(points: &[Point2<f64>]) -> (Point2<f64>, f64) {
    let n = points.len() as f64;
    let mean = Point2::from(points.iter().map(|p| p.coords).sum::<nalgebra::Vector2<f64>>() / n);
    let mean_distance = points.iter().map(|p| (p - mean).norm()).sum::<f64>() / n;
    let scale = if mean_distance > 1e-15 {
        std::f64::consts::SQRT_2 / mean_distance
    } else {
        1.0
    };
    (mean, scale)
}

/// Maps conic coefficients fitted on `x' = s (x - mx)`, `y' = s (y - my)` back
/// to the original coordinates.
fn denormalize(c: &[f64; 6], mean: &Point2<f64>, s: f64) -> [f64; 6] {
    let [a, b, cc, d, e, f] = *c;
    let (mx, my) = (mean.x, mean.y);
    let s2 = s * s;
    [
        a * s2,
        b * s2,
        cc * s2,
        -2.0 * a * s2 * mx - b * s2 * my + d * s,
        -b * s2 * mx - 2.0 * cc * s2 * my + e * s,
        a * s2 * mx * mx + b * s2 * mx * my + cc * s2 * my * my - d * s * mx - e * s * my + f,
    ]
}

impl HorizonFit for ConicFit {
    fn name(&self) -> &'static str {
        "conic"
    }

    fn fit(&self, points: &[Point2<f64>]) -> Result<HorizonModel, HorizonError> {
        self.fit_conic(points).map(HorizonModel::Conic)
    }
}
