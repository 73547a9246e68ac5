//! Pitch, roll and nadir vector from a fitted horizon.
//!
//! The vertex of the horizon (its point nearest the image center) fixes both
//! angles. Roll is the direction of the Earth disk center as seen from the image
//! center; pitch is the angular offset of the vertex plus the angular radius of
//! the Earth. The nadir vector is the boresight `(0, 0, -1)` rotated about the
//! camera x axis by `-pitch` and then about the z axis by `-roll`.

use log::debug;
use nalgebra::{Point2, Rotation3, Vector2, Vector3};
use serde::{Deserialize, Serialize};

use crate::camera::{CameraParams, HorizonError};
use crate::fit::{CircleModel, ConicModel, HorizonModel};

/// Camera boresight in the camera frame.
pub fn boresight() -> Vector3<f64> {
    Vector3::new(0.0, 0.0, -1.0)
}

/// Rotates the boresight by `angle_x` about x, then the result by `angle_z` about z.
pub fn rotate_boresight(angle_x: f64, angle_z: f64) -> Vector3<f64> {
    let rx = Rotation3::from_axis_angle(&Vector3::x_axis(), angle_x);
    let rz = Rotation3::from_axis_angle(&Vector3::z_axis(), angle_z);
    rz * (rx * boresight())
}

/// Angle between two directions, `acos` of their clamped normalised dot product.
pub fn angular_error(predicted: &Vector3<f64>, actual: &Vector3<f64>) -> f64 {
    let denom = predicted.norm() * actual.norm();
    if denom == 0.0 {
        return f64::NAN;
    }
    (predicted.dot(actual) / denom).clamp(-1.0, 1.0).acos()
}

/// Attitude of the camera relative to the Earth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Attitude {
    /// Rotation about the camera x axis, radians.
    pub pitch: f64,
    /// Rotation about the camera z axis, radians.
    pub roll: f64,
    /// Unit vector toward the Earth center, camera frame.
    pub nadir: Vector3<f64>,
}

#[derive(Debug, Clone)]
pub struct AttitudeSolver {
    params: CameraParams,
}

impl AttitudeSolver {
    /// # Errors
    ///
    /// [`HorizonError::InvalidParameters`] if the camera parameters do not validate.
    pub fn new(params: CameraParams) -> Result<Self, HorizonError> {
        params.validate_params()?;
        Ok(AttitudeSolver { params })
    }

    pub fn params(&self) -> &CameraParams {
        &self.params
    }

    pub fn solve(&self, model: &HorizonModel) -> Result<Attitude, HorizonError> {
        match model {
            HorizonModel::Circle(circle) => self.solve_circle(circle),
            HorizonModel::Conic(conic) => self.solve_conic(conic),
        }
    }

    /// Attitude from a circular horizon.
    ///
    /// # Errors
    ///
    /// [`HorizonError::DegenerateGeometry`] when the circle is centered exactly
    /// on the image center, which leaves the roll direction undefined.
    pub fn solve_circle(&self, circle: &CircleModel) -> Result<Attitude, HorizonError> {
        let distance = circle.center.coords.norm();
        if distance == 0.0 {
            return Err(HorizonError::DegenerateGeometry(
                "circle center coincides with the image center".to_string(),
            ));
        }
        let toward_origin = -circle.center.coords / distance;
        let vertex = circle.center + toward_origin * circle.radius;
        let depth = vertex.coords.norm();
        let k = if circle.contains_origin() { -depth } else { depth };
        Ok(self.attitude(&toward_origin, k))
    }

    /// Attitude from a conic horizon, through the vertex found by ray scanning.
    pub fn solve_conic(&self, conic: &ConicModel) -> Result<Attitude, HorizonError> {
        let vertex = conic.vertex()?;
        self.solve_vertex(&vertex, conic.contains_origin()?)
    }

    /// Attitude from the horizon vertex and whether the image center lies on
    /// the Earth side of the horizon.
    ///
    /// # Errors
    ///
    /// [`HorizonError::DegenerateGeometry`] when the vertex is the image center.
    pub fn solve_vertex(
        &self,
        vertex: &Point2<f64>,
        center_on_earth: bool,
    ) -> Result<Attitude, HorizonError> {
        let depth = vertex.coords.norm();
        if depth == 0.0 {
            return Err(HorizonError::DegenerateGeometry(
                "horizon passes through the image center".to_string(),
            ));
        }
        let direction = vertex.coords / depth;
        let (toward_origin, k) = if center_on_earth {
            (direction, -depth)
        } else {
            (-direction, depth)
        };
        Ok(self.attitude(&toward_origin, k))
    }

    /// `toward_origin` points from the Earth disk center to the image center.
    fn attitude(&self, toward_origin: &Vector2<f64>, k: f64) -> Attitude {
        let roll = roll_angle(toward_origin);
        let pitch = self.params.offset_to_angle(k) + self.params.earth_angular_radius();
        let nadir = rotate_boresight(-pitch, -roll);
        debug!(
            "Attitude: pitch {:.4} rad, roll {:.4} rad, vertex depth {:.3} px",
            pitch, roll, k
        );
        Attitude { pitch, roll, nadir }
    }
}

/// Signed angle from `(0, 1)` to `v`, negative when `v` points to the left.
fn roll_angle(v: &Vector2<f64>) -> f64 {
    let up = Vector2::new(0.0, 1.0);
    let angle = v.dot(&up).clamp(-1.0, 1.0).acos();
    let det = v.x * up.y - v.y * up.x;
    if det < 0.0 {
        -angle
    } else {
        angle
    }
}
