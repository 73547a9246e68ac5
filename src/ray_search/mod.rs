//! Fitting-free horizon vertex search.
//!
//! Rays are cast from the image center over a binary pixel classification.
//! A ray whose two ends fall in different classes crosses the horizon, and the
//! crossing is located by bisection along the ray. Scanning ray angles brackets
//! the visible horizon arc; a second bisection over angles finds the ray that
//! mirrors one bracket end about the vertex, and the vertex direction is the
//! midpoint of the two.
//!
//! Every loop is bounded: ray bisection and angle bisection by
//! `max_iterations`, the angular scan by one revolution per phase.

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::attitude::{rotate_boresight, Attitude};
use crate::camera::{CameraParams, HorizonError};
use crate::edge::PixelClassifier;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaySearchConfig {
    /// Angular step of the horizon scan, radians.
    pub scan_step: f64,
    /// Bisection tolerance along a ray, pixels.
    pub ray_tolerance: f64,
    /// Bisection tolerance of the symmetric-angle search, radians.
    pub angle_tolerance: f64,
    /// Iteration cap shared by both bisections.
    pub max_iterations: usize,
}

impl Default for RaySearchConfig {
    fn default() -> Self {
        RaySearchConfig {
            scan_step: 0.05,
            ray_tolerance: 0.5,
            angle_tolerance: 0.01,
            max_iterations: 64,
        }
    }
}

impl RaySearchConfig {
    pub fn validate_params(&self) -> Result<(), HorizonError> {
        for (name, value) in [
            ("scan_step", self.scan_step),
            ("ray_tolerance", self.ray_tolerance),
            ("angle_tolerance", self.angle_tolerance),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(HorizonError::InvalidParameters(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        if self.scan_step >= PI {
            return Err(HorizonError::InvalidParameters(format!(
                "scan_step must be below pi, got {}",
                self.scan_step
            )));
        }
        if self.max_iterations == 0 {
            return Err(HorizonError::InvalidParameters(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Angular extent of the horizon as seen from the image center.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HorizonBracket {
    pub start: f64,
    pub end: f64,
}

impl HorizonBracket {
    pub fn midpoint(&self) -> f64 {
        0.5 * (self.start + self.end)
    }
}

/// Outcome of a vertex search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VertexSearch {
    pub bracket: HorizonBracket,
    /// Direction of the vertex from the image center, radians.
    pub vertex_angle: f64,
    /// Signed vertex distance, pixels; negative when the image center is on Earth.
    pub vertex_offset: f64,
    pub rays_cast: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ScanState {
    /// Skipping any arc that already covers the starting angle.
    LeavingInitialArc,
    SearchingFirstEdge,
    InHorizonArc { start: f64 },
    ExitedArc { start: f64, end: f64 },
}

#[derive(Debug, Clone, Default)]
pub struct RaySearchLocator {
    pub config: RaySearchConfig,
}

impl RaySearchLocator {
    pub fn new(config: RaySearchConfig) -> Result<Self, HorizonError> {
        config.validate_params()?;
        Ok(RaySearchLocator { config })
    }

    /// Casts a ray from the image center at `angle` (counter-clockwise from +x,
    /// y up) and returns the signed distance to the first class change, or
    /// `None` when both ends of the ray share a class.
    ///
    /// The distance is negative when the image center itself is classified
    /// `true`. `rays_cast` is incremented once per call.
    ///
    /// # Errors
    ///
    /// [`HorizonError::NonConvergence`] if bisection exceeds `max_iterations`.
    pub fn ray_from_center<C: PixelClassifier>(
        &self,
        classifier: &C,
        angle: f64,
        rays_cast: &mut usize,
    ) -> Result<Option<f64>, HorizonError> {
        *rays_cast += 1;
        let width = classifier.width() as f64;
        let height = classifier.height() as f64;
        let (rise, run) = angle.sin_cos();

        let sample = |t: f64| {
            let x = 0.5 * width + run * t;
            let y = 0.5 * height + rise * t;
            let col = clamp_index((x - 0.5).round_ties_even(), classifier.width());
            let row = clamp_index((height - (y + 0.5)).round_ties_even(), classifier.height());
            classifier.classify(row, col)
        };

        let mut t_min = 0.0;
        let mut t_max = (0.5 * (height - 1.0) / rise)
            .abs()
            .min((0.5 * (width - 1.0) / run).abs());
        let center_class = sample(t_min);
        if center_class == sample(t_max) {
            return Ok(None);
        }

        let mut iterations = 0;
        while (t_max - t_min).abs() > self.config.ray_tolerance {
            if iterations == self.config.max_iterations {
                return Err(HorizonError::NonConvergence {
                    stage: "ray bisection",
                    iterations,
                });
            }
            iterations += 1;
            let t_mid = 0.5 * (t_min + t_max);
            if sample(t_mid) == center_class {
                t_min = t_mid;
            } else {
                t_max = t_mid;
            }
        }

        let offset = 0.5 * (t_min + t_max);
        Ok(Some(if center_class { -offset } else { offset }))
    }

    /// Scans ray angles in steps of `scan_step` and brackets the first
    /// complete horizon arc.
    ///
    /// # Errors
    ///
    /// * [`HorizonError::NoEdgeFound`] if no ray crosses the horizon.
    /// * [`HorizonError::DegenerateGeometry`] if every ray crosses it.
    pub fn scan<C: PixelClassifier>(
        &self,
        classifier: &C,
        rays_cast: &mut usize,
    ) -> Result<HorizonBracket, HorizonError> {
        let step = self.config.scan_step;
        let steps_per_turn = (TAU / step).ceil() as usize;

        let mut state = ScanState::LeavingInitialArc;
        let mut k = 0usize;
        let mut phase_steps = 0usize;
        let bracket = loop {
            if let ScanState::ExitedArc { start, end } = state {
                break HorizonBracket { start, end };
            }
            if phase_steps > steps_per_turn {
                return Err(match state {
                    ScanState::SearchingFirstEdge => HorizonError::NoEdgeFound(
                        "no ray from the image center crosses the horizon".to_string(),
                    ),
                    _ => HorizonError::DegenerateGeometry(
                        "every ray from the image center crosses the horizon".to_string(),
                    ),
                });
            }

            k += 1;
            phase_steps += 1;
            let angle = k as f64 * step;
            let found = self.ray_from_center(classifier, angle, rays_cast)?.is_some();
            let next = match (state, found) {
                (ScanState::LeavingInitialArc, false) => ScanState::SearchingFirstEdge,
                (ScanState::SearchingFirstEdge, true) => ScanState::InHorizonArc { start: angle },
                (ScanState::InHorizonArc { start }, false) => ScanState::ExitedArc {
                    start,
                    end: angle - step,
                },
                (current, _) => current,
            };
            if next != state {
                phase_steps = 0;
                state = next;
            }
        };

        let bracket = if bracket.end >= PI {
            HorizonBracket {
                start: bracket.start - TAU,
                end: bracket.end - TAU,
            }
        } else {
            bracket
        };
        debug!(
            "Horizon bracket [{:.3}, {:.3}] rad after {} rays",
            bracket.start, bracket.end, rays_cast
        );
        Ok(bracket)
    }

    /// Locates the horizon vertex: bracket scan, symmetric-angle bisection,
    /// then a final ray along the vertex direction.
    ///
    /// # Errors
    ///
    /// * Errors of [`RaySearchLocator::scan`].
    /// * [`HorizonError::DegenerateGeometry`] when a ray inside the bracket
    ///   misses the horizon or the bracket middle is not closer than its ends,
    ///   as happens when the horizon passes through the image center.
    /// * [`HorizonError::NonConvergence`] if a bisection exceeds its cap.
    pub fn locate<C: PixelClassifier>(&self, classifier: &C) -> Result<VertexSearch, HorizonError> {
        if classifier.width() == 0 || classifier.height() == 0 {
            return Err(HorizonError::InvalidParameters(
                "cannot search an empty image".to_string(),
            ));
        }
        let mut rays_cast = 0usize;
        let bracket = self.scan(classifier, &mut rays_cast)?;

        let mut cast = |angle: f64, what: &str| -> Result<f64, HorizonError> {
            self.ray_from_center(classifier, angle, &mut rays_cast)?
                .ok_or_else(|| {
                    HorizonError::DegenerateGeometry(format!(
                        "{what} ray at {angle:.4} rad misses the horizon"
                    ))
                })
        };

        let d_start = cast(bracket.start, "bracket start")?;
        let d_end = cast(bracket.end, "bracket end")?;
        let (target, base_angle, mut a2) = if d_start.abs() > d_end.abs() {
            (d_end, bracket.end, bracket.start)
        } else {
            (d_start, bracket.start, bracket.end)
        };

        let mut a1 = 0.5 * (base_angle + a2);
        let d1 = cast(a1, "bracket middle")?;
        if d1.abs() >= target.abs() {
            return Err(HorizonError::DegenerateGeometry(format!(
                "bracket middle offset {d1:.3} is not inside end offset {target:.3}"
            )));
        }

        let mut iterations = 0;
        while (a1 - a2).abs() > self.config.angle_tolerance {
            if iterations == self.config.max_iterations {
                return Err(HorizonError::NonConvergence {
                    stage: "symmetric angle bisection",
                    iterations,
                });
            }
            iterations += 1;
            let test_angle = 0.5 * (a1 + a2);
            let d = cast(test_angle, "bisection")?;
            if d.abs() < target.abs() {
                a1 = test_angle;
            } else if d.abs() > target.abs() {
                a2 = test_angle;
            } else {
                break;
            }
        }

        let symmetric_angle = 0.5 * (a1 + a2);
        cast(symmetric_angle, "symmetric")?;
        let vertex_angle = 0.5 * (base_angle + symmetric_angle);
        let vertex_offset = cast(vertex_angle, "vertex")?;

        debug!(
            "Vertex at {:.4} rad, offset {:.2} px, {} rays cast",
            vertex_angle, vertex_offset, rays_cast
        );
        Ok(VertexSearch {
            bracket,
            vertex_angle,
            vertex_offset,
            rays_cast,
        })
    }

    /// Attitude from a located vertex.
    ///
    /// Roll is the vertex direction turned by a quarter turn toward the Earth
    /// side, wrapped into `(-π, π]`; the nadir vector rotates the boresight by `-pitch` about x, then by
    /// `+roll` about z.
    pub fn attitude(&self, search: &VertexSearch, params: &CameraParams) -> Attitude {
        let above_horizon = params.offset_to_angle(search.vertex_offset);
        let pitch = params.earth_angular_radius() + above_horizon;
        let roll = wrap_angle(if above_horizon > 0.0 {
            search.vertex_angle + FRAC_PI_2
        } else {
            search.vertex_angle - FRAC_PI_2
        });
        Attitude {
            pitch,
            roll,
            nadir: rotate_boresight(-pitch, roll),
        }
    }

    /// Runs [`RaySearchLocator::locate`] and converts the vertex to attitude.
    pub fn estimate<C: PixelClassifier>(
        &self,
        classifier: &C,
        params: &CameraParams,
    ) -> Result<(Attitude, VertexSearch), HorizonError> {
        let search = self.locate(classifier)?;
        Ok((self.attitude(&search, params), search))
    }
}

/// Wraps an angle into `(-π, π]`.
fn wrap_angle(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(TAU);
    if wrapped > PI {
        wrapped - TAU
    } else {
        wrapped
    }
}

fn clamp_index(value: f64, len: usize) -> usize {
    if value <= 0.0 {
        0
    } else {
        (value as usize).min(len.saturating_sub(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attitude::{angular_error, AttitudeSolver};
    use crate::edge::ThresholdClassifier;
    use crate::fit::CircleModel;
    use crate::frame::Frame;
    use crate::geometry::rasterize_horizon;
    use approx::assert_relative_eq;
    use nalgebra::Point2;

    fn synthetic(center: Point2<f64>, radius: f64) -> Frame {
        rasterize_horizon(160, 120, &center, radius, 200.0, 0.0)
    }

    #[test]
    fn test_ray_up_hits_vertex() {
        let frame = synthetic(Point2::new(0.0, -40.0), 90.0);
        let classifier = ThresholdClassifier::new(&frame, 0.0);
        let locator = RaySearchLocator::default();
        let mut rays = 0;
        let offset = locator
            .ray_from_center(&classifier, FRAC_PI_2, &mut rays)
            .unwrap()
            .unwrap();
        assert_eq!(rays, 1);
        // Image center is on Earth, the vertex sits 50 px above it.
        assert!(offset < 0.0);
        assert_relative_eq!(offset, -50.0, epsilon = 1.0);

        // Straight down stays on Earth.
        assert!(locator
            .ray_from_center(&classifier, -FRAC_PI_2, &mut rays)
            .unwrap()
            .is_none());
        assert_eq!(rays, 2);
    }

    #[test]
    fn test_bracket_centered_below() {
        let frame = synthetic(Point2::new(0.0, -40.0), 90.0);
        let classifier = ThresholdClassifier::new(&frame, 0.0);
        let mut rays = 0;
        let bracket = RaySearchLocator::default().scan(&classifier, &mut rays).unwrap();
        let expected = (-1.0_f64).atan2(0.0) + PI;
        assert!((bracket.midpoint() - expected).abs() < 0.05);
        assert!(bracket.start < bracket.end);
    }

    #[test]
    fn test_attitude_matches_circle_solution() {
        let center = Point2::new(0.0, -40.0);
        let frame = synthetic(center, 90.0);
        let classifier = ThresholdClassifier::new(&frame, 0.0);
        let params = CameraParams::default();
        let (attitude, search) = RaySearchLocator::default()
            .estimate(&classifier, &params)
            .unwrap();
        assert!(search.rays_cast > 0);
        assert_relative_eq!(search.vertex_angle, FRAC_PI_2, epsilon = 0.03);

        let truth = AttitudeSolver::new(params)
            .unwrap()
            .solve_circle(&CircleModel::new(center, 90.0).unwrap())
            .unwrap();
        assert_relative_eq!(attitude.pitch, truth.pitch, epsilon = 1.0_f64.to_radians());
        assert_relative_eq!(attitude.roll, 0.0, epsilon = 0.03);
        assert!(angular_error(&attitude.nadir, &truth.nadir) < 2.0_f64.to_radians());
    }

    #[test]
    fn test_rolled_horizon_matches_circle_solution() {
        // Vertex at (-24, 32), up and to the left of the image center.
        let center = Point2::new(30.0, -40.0);
        let frame = synthetic(center, 90.0);
        let classifier = ThresholdClassifier::new(&frame, 0.0);
        let params = CameraParams::default();
        let (attitude, _) = RaySearchLocator::default()
            .estimate(&classifier, &params)
            .unwrap();

        let truth = AttitudeSolver::new(params)
            .unwrap()
            .solve_circle(&CircleModel::new(center, 90.0).unwrap())
            .unwrap();
        assert!(angular_error(&attitude.nadir, &truth.nadir) < 1.0_f64.to_radians());
        assert_relative_eq!(attitude.pitch, truth.pitch, epsilon = 1.0_f64.to_radians());
        // Unnegated z rotation: the ray-search roll mirrors the circle roll.
        assert!(attitude.roll > -PI && attitude.roll <= PI);
        assert_relative_eq!(attitude.roll, -truth.roll, epsilon = 0.03);
    }

    #[test]
    fn test_wrap_angle() {
        assert_relative_eq!(wrap_angle(-5.647), -5.647 + TAU, epsilon = 1e-12);
        assert_relative_eq!(wrap_angle(PI), PI, epsilon = 1e-12);
        assert_relative_eq!(wrap_angle(-PI), PI, epsilon = 1e-12);
        assert_relative_eq!(wrap_angle(0.25), 0.25, epsilon = 1e-12);
        assert_relative_eq!(wrap_angle(3.0 * TAU + 1.0), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_iteration_cap_reports_non_convergence() {
        let frame = synthetic(Point2::new(0.0, -40.0), 90.0);
        let classifier = ThresholdClassifier::new(&frame, 0.0);
        let locator = RaySearchLocator::new(RaySearchConfig {
            max_iterations: 2,
            ..Default::default()
        })
        .unwrap();
        assert!(matches!(
            locator.locate(&classifier),
            Err(HorizonError::NonConvergence {
                stage: "ray bisection",
                iterations: 2
            })
        ));
    }

    #[test]
    fn test_arc_across_zero_angle() {
        // Earth disk off to the right; the arc straddles angle 0.
        let frame = synthetic(Point2::new(140.0, 0.0), 100.0);
        let classifier = ThresholdClassifier::new(&frame, 0.0);
        let search = RaySearchLocator::default().locate(&classifier).unwrap();
        assert!(search.bracket.start < 0.0 && search.bracket.end > 0.0);
        assert_relative_eq!(search.vertex_angle, 0.0, epsilon = 0.03);
        assert_relative_eq!(search.vertex_offset, 40.0, epsilon = 1.0);
    }

    #[test]
    fn test_blank_frame_has_no_horizon() {
        let frame = Frame::zeros(160, 120);
        let classifier = ThresholdClassifier::new(&frame, 0.0);
        assert!(matches!(
            RaySearchLocator::default().locate(&classifier),
            Err(HorizonError::NoEdgeFound(_))
        ));
    }

    #[test]
    fn test_disk_inside_frame_is_degenerate() {
        // Every ray leaves a small Earth disk around the image center.
        let frame = synthetic(Point2::origin(), 20.0);
        let classifier = ThresholdClassifier::new(&frame, 0.0);
        assert!(matches!(
            RaySearchLocator::default().locate(&classifier),
            Err(HorizonError::DegenerateGeometry(_))
        ));
    }

    #[test]
    fn test_rejects_bad_config() {
        let config = RaySearchConfig {
            scan_step: 0.0,
            ..Default::default()
        };
        assert!(RaySearchLocator::new(config).is_err());
    }
}
