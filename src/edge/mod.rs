//! Horizon edge extraction.
//!
//! A Canny-style pipeline turns a raw [`Frame`] into a binary [`EdgeMap`]:
//!
//! 1. 3×3 Gaussian smoothing (zero padded).
//! 2. Sobel or Prewitt gradients ([`GradientKernel`]).
//! 3. Non-maximum suppression over four direction bins.
//! 4. Double thresholding relative to the strongest surviving response.
//! 5. Single-pass hysteresis: weak pixels touching a strong pixel are kept.
//!
//! Edge pixels are reported in centered, y-up coordinates (see [`crate::frame`]).
//!
//! The module also defines [`PixelClassifier`], the per-pixel binary test the
//! ray search bisects on. [`EdgeMap`] implements it for edge membership and
//! [`ThresholdClassifier`] for the Earth-disk / space split of the raw intensity.

pub mod gradient;
pub mod nms;

pub use gradient::{gaussian_blur, image_gradient, Gradient, GradientKernel};
pub use nms::{double_threshold, hysteresis, non_max_suppression, EdgeClass};

use log::debug;
use nalgebra::{DMatrix, Point2};
use serde::{Deserialize, Serialize};

use crate::camera::HorizonError;
use crate::frame::{pixel_to_centered, Frame};

/// A binary per-pixel test over an image grid.
pub trait PixelClassifier {
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    fn classify(&self, row: usize, col: usize) -> bool;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeDetectorConfig {
    pub kernel: GradientKernel,
    /// High threshold as a fraction of the strongest suppressed response.
    pub ratio_high: f64,
    /// Low threshold as a fraction of the high threshold.
    pub ratio_low: f64,
}

impl Default for EdgeDetectorConfig {
    fn default() -> Self {
        EdgeDetectorConfig {
            kernel: GradientKernel::Sobel,
            ratio_high: 0.67,
            ratio_low: 0.3,
        }
    }
}

impl EdgeDetectorConfig {
    pub fn validate_params(&self) -> Result<(), HorizonError> {
        for (name, ratio) in [("ratio_high", self.ratio_high), ("ratio_low", self.ratio_low)] {
            if !(ratio > 0.0 && ratio <= 1.0) {
                return Err(HorizonError::InvalidParameters(format!(
                    "{name} must lie in (0, 1], got {ratio}"
                )));
            }
        }
        Ok(())
    }
}

/// Binary edge classification of a frame.
#[derive(Debug, Clone)]
pub struct EdgeMap {
    edges: DMatrix<bool>,
}

impl EdgeMap {
    pub fn new(edges: DMatrix<bool>) -> Self {
        EdgeMap { edges }
    }

    pub fn is_edge(&self, row: usize, col: usize) -> bool {
        self.edges[(row, col)]
    }

    pub fn count(&self) -> usize {
        self.edges.iter().filter(|&&e| e).count()
    }

    pub fn is_empty(&self) -> bool {
        !self.edges.iter().any(|&e| e)
    }

    /// Centered coordinates of every edge pixel, in row-major order.
    pub fn points(&self) -> Vec<Point2<f64>> {
        let (rows, cols) = self.edges.shape();
        let mut points = Vec::new();
        for row in 0..rows {
            for col in 0..cols {
                if self.edges[(row, col)] {
                    points.push(pixel_to_centered(row, col, cols, rows));
                }
            }
        }
        points
    }

    pub fn as_matrix(&self) -> &DMatrix<bool> {
        &self.edges
    }
}

impl PixelClassifier for EdgeMap {
    fn width(&self) -> usize {
        self.edges.ncols()
    }

    fn height(&self) -> usize {
        self.edges.nrows()
    }

    fn classify(&self, row: usize, col: usize) -> bool {
        self.is_edge(row, col)
    }
}

/// Classifies pixels brighter than `level` as Earth disk.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdClassifier<'a> {
    frame: &'a Frame,
    level: f64,
}

impl<'a> ThresholdClassifier<'a> {
    pub fn new(frame: &'a Frame, level: f64) -> Self {
        ThresholdClassifier { frame, level }
    }
}

impl PixelClassifier for ThresholdClassifier<'_> {
    fn width(&self) -> usize {
        self.frame.width()
    }

    fn height(&self) -> usize {
        self.frame.height()
    }

    fn classify(&self, row: usize, col: usize) -> bool {
        self.frame.get(row, col) > self.level
    }
}

#[derive(Debug, Clone, Default)]
pub struct EdgeDetector {
    pub config: EdgeDetectorConfig,
}

impl EdgeDetector {
    pub fn new(config: EdgeDetectorConfig) -> Result<Self, HorizonError> {
        config.validate_params()?;
        Ok(EdgeDetector { config })
    }

    /// Smoothed gradient field of a frame.
    pub fn gradient(&self, frame: &Frame) -> Gradient {
        let blurred = gaussian_blur(&frame.data);
        image_gradient(&blurred, self.config.kernel)
    }

    /// Runs the full pipeline and returns the binary edge map.
    ///
    /// A frame without any gradient yields an empty map.
    pub fn detect(&self, frame: &Frame) -> EdgeMap {
        let gradient = self.gradient(frame);
        let suppressed = non_max_suppression(&gradient.magnitude, &gradient.direction);
        let classes = double_threshold(&suppressed, self.config.ratio_high, self.config.ratio_low);
        let edges = EdgeMap::new(hysteresis(&classes));
        debug!(
            "Edge detection on {}x{} frame kept {} pixels",
            frame.width(),
            frame.height(),
            edges.count()
        );
        edges
    }

    /// Edge points in centered coordinates.
    ///
    /// # Errors
    ///
    /// [`HorizonError::NoEdgeFound`] when no pixel survives thresholding, for
    /// example on a blank frame.
    pub fn extract_points(&self, frame: &Frame) -> Result<Vec<Point2<f64>>, HorizonError> {
        let points = self.detect(frame).points();
        if points.is_empty() {
            return Err(HorizonError::NoEdgeFound(
                "edge extraction produced no strong pixels".to_string(),
            ));
        }
        Ok(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::rasterize_horizon;

    #[test]
    fn test_blank_frame_has_no_edges() {
        let detector = EdgeDetector::default();
        let frame = Frame::zeros(160, 120);
        assert!(detector.detect(&frame).is_empty());
        assert!(matches!(
            detector.extract_points(&frame),
            Err(HorizonError::NoEdgeFound(_))
        ));
    }

    #[test]
    fn test_flat_frame_has_no_edges_in_interior() {
        let detector = EdgeDetector::default();
        let frame = Frame::from_fn(40, 30, |_, _| 100.0);
        let edges = detector.detect(&frame);
        // Only the zero-padding response near the border can fire.
        for row in 3..27 {
            for col in 3..37 {
                assert!(!edges.is_edge(row, col));
            }
        }
    }

    #[test]
    fn test_horizontal_horizon_line() {
        // Earth fills the bottom half of the frame.
        let frame = Frame::from_fn(40, 30, |row, _| if row >= 15 { 200.0 } else { 20.0 });
        for kernel in [GradientKernel::Sobel, GradientKernel::Prewitt] {
            let detector = EdgeDetector::new(EdgeDetectorConfig {
                kernel,
                ..Default::default()
            })
            .unwrap();
            let points = detector.extract_points(&frame).unwrap();
            let interior: Vec<_> = points.iter().filter(|p| p.x.abs() < 15.0).collect();
            assert!(!interior.is_empty());
            // Boundary between rows 14 and 15 sits at y = 0.
            for p in interior {
                assert!(p.y.abs() <= 1.0, "edge point {p:?} too far from the horizon");
            }
        }
    }

    #[test]
    fn test_circle_edges_hug_the_radius() {
        let center = Point2::new(0.0, -40.0);
        let radius = 90.0;
        let frame = rasterize_horizon(160, 120, &center, radius, 200.0, 10.0);
        let points = EdgeDetector::default().extract_points(&frame).unwrap();
        assert!(points.len() > 100);

        let near_arc = points
            .iter()
            .filter(|p| ((*p - center).norm() - radius).abs() <= 1.5)
            .count();
        assert!(near_arc as f64 > 0.95 * points.len() as f64);
    }

    #[test]
    fn test_edge_map_classifier_matches_points() {
        let frame = Frame::from_fn(40, 30, |row, _| if row >= 15 { 200.0 } else { 20.0 });
        let edges = EdgeDetector::default().detect(&frame);
        assert_eq!(PixelClassifier::width(&edges), 40);
        assert_eq!(PixelClassifier::height(&edges), 30);

        let mut classified = Vec::new();
        for row in 0..30 {
            for col in 0..40 {
                assert_eq!(edges.classify(row, col), edges.as_matrix()[(row, col)]);
                if edges.classify(row, col) {
                    classified.push(pixel_to_centered(row, col, 40, 30));
                }
            }
        }
        assert_eq!(classified.len(), edges.count());
        assert_eq!(classified, edges.points());
    }

    #[test]
    fn test_threshold_classifier() {
        let frame = Frame::from_fn(4, 2, |row, _| if row == 1 { 5.0 } else { 0.0 });
        let classifier = ThresholdClassifier::new(&frame, 0.0);
        assert_eq!(classifier.width(), 4);
        assert!(classifier.classify(1, 3));
        assert!(!classifier.classify(0, 3));
    }

    #[test]
    fn test_rejects_bad_ratios() {
        let config = EdgeDetectorConfig {
            ratio_high: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            EdgeDetector::new(config),
            Err(HorizonError::InvalidParameters(_))
        ));
    }
}
