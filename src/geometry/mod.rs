use nalgebra::Point2;

use crate::frame::{pixel_to_centered, Frame};

/// Rasterize a horizon disk into a frame.
///
/// Pixels whose centers fall inside the circle (centered coordinates) take
/// `earth_level`, all others `space_level`.
///
/// # Arguments
///
/// * `width`, `height` - Frame dimensions in pixels
/// * `center` - Circle center in centered, y-up coordinates
/// * `radius` - Circle radius in pixels
/// * `earth_level`, `space_level` - Intensities inside and outside the disk
pub fn rasterize_horizon(
    width: usize,
    height: usize,
    center: &Point2<f64>,
    radius: f64,
    earth_level: f64,
    space_level: f64,
) -> Frame {
    Frame::from_fn(width, height, |row, col| {
        let p = pixel_to_centered(row, col, width, height);
        if (p - center).norm() < radius {
            earth_level
        } else {
            space_level
        }
    })
}

/// Generate `n` points evenly spaced on a circular arc
///
/// # Arguments
///
/// * `center`, `radius` - The circle
/// * `start_angle`, `end_angle` - Arc limits in radians, counter-clockwise from +x
/// * `n` - Number of points, including both end points
///
/// # Returns
///
/// A vector of points in the same frame as `center`
pub fn sample_arc(
    center: &Point2<f64>,
    radius: f64,
    start_angle: f64,
    end_angle: f64,
    n: usize,
) -> Vec<Point2<f64>> {
    let step = if n > 1 {
        (end_angle - start_angle) / (n - 1) as f64
    } else {
        0.0
    };
    (0..n)
        .map(|i| {
            let angle = start_angle + step * i as f64;
            Point2::new(
                center.x + radius * angle.cos(),
                center.y + radius * angle.sin(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rasterize_horizon() {
        let frame = rasterize_horizon(160, 120, &Point2::new(0.0, -40.0), 90.0, 200.0, 10.0);
        assert_eq!(frame.width(), 160);
        assert_eq!(frame.height(), 120);
        // Image center is inside the disk, top row above the vertex is not.
        assert_eq!(frame.get(60, 80), 200.0);
        assert_eq!(frame.get(0, 80), 10.0);
        // Vertex at y = 50: row 9 center is y = 50.5, row 10 center is y = 49.5.
        assert_eq!(frame.get(9, 80), 10.0);
        assert_eq!(frame.get(10, 80), 200.0);
    }

    #[test]
    fn test_sample_arc() {
        let center = Point2::new(3.0, -4.0);
        let points = sample_arc(&center, 10.0, 0.0, std::f64::consts::PI, 5);
        assert_eq!(points.len(), 5);
        for p in &points {
            assert_relative_eq!((p - center).norm(), 10.0, epsilon = 1e-12);
        }
        assert_relative_eq!(points[0].x, 13.0, epsilon = 1e-12);
        assert_relative_eq!(points[4].x, -7.0, epsilon = 1e-12);
        assert_relative_eq!(points[2].y, 6.0, epsilon = 1e-12);
    }
}
