//! Raw intensity frames and the image ↔ centered coordinate conventions.
//!
//! A [`Frame`] is a row-major grid of luminance samples with row 0 at the top
//! of the image. Every stage after edge extraction works in *centered*
//! coordinates: origin at the image center, `x` to the right and `y` upward.
//! Pixel `(row, col)` covers the unit square whose center maps to
//!
//! ```text
//! x = col + 0.5 - width / 2
//! y = height / 2 - (row + 0.5)
//! ```
//!
//! so a 160×120 frame spans `[-80, 80] × [-60, 60]` and no pixel center sits
//! exactly on an axis.

use image::{GrayImage, Luma};
use nalgebra::{DMatrix, Point2};
use std::path::Path;

use crate::camera::{HorizonError, Resolution};

#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Intensity samples, `height` rows by `width` columns.
    pub data: DMatrix<f64>,
}

impl Frame {
    pub fn new(data: DMatrix<f64>) -> Self {
        Frame { data }
    }

    /// Blank (all-zero) frame.
    pub fn zeros(width: usize, height: usize) -> Self {
        Frame {
            data: DMatrix::zeros(height, width),
        }
    }

    /// Builds a frame by evaluating `f(row, col)` for every pixel.
    pub fn from_fn<F>(width: usize, height: usize, f: F) -> Self
    where
        F: FnMut(usize, usize) -> f64,
    {
        Frame {
            data: DMatrix::from_fn(height, width, f),
        }
    }

    pub fn from_gray_image(image: &GrayImage) -> Self {
        let (width, height) = image.dimensions();
        Self::from_fn(width as usize, height as usize, |row, col| {
            image.get_pixel(col as u32, row as u32).0[0] as f64
        })
    }

    /// Loads an image file and converts it to single-channel luminance.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, HorizonError> {
        let image = image::open(path)?.to_luma8();
        Ok(Self::from_gray_image(&image))
    }

    /// Converts back to an 8-bit image, clamping samples to `[0, 255]`.
    pub fn to_gray_image(&self) -> GrayImage {
        GrayImage::from_fn(self.width() as u32, self.height() as u32, |x, y| {
            let value = self.data[(y as usize, x as usize)];
            Luma([value.round().clamp(0.0, 255.0) as u8])
        })
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width() as u32, self.height() as u32)
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[(row, col)]
    }

    /// Centered coordinates of the center of pixel `(row, col)`.
    pub fn pixel_to_centered(&self, row: usize, col: usize) -> Point2<f64> {
        pixel_to_centered(row, col, self.width(), self.height())
    }

    /// Pixel containing the centered point `p`, or `None` outside the frame.
    pub fn centered_to_pixel(&self, p: &Point2<f64>) -> Option<(usize, usize)> {
        centered_to_pixel(p, self.width(), self.height())
    }
}

pub fn pixel_to_centered(row: usize, col: usize, width: usize, height: usize) -> Point2<f64> {
    Point2::new(
        col as f64 + 0.5 - 0.5 * width as f64,
        0.5 * height as f64 - (row as f64 + 0.5),
    )
}

pub fn centered_to_pixel(p: &Point2<f64>, width: usize, height: usize) -> Option<(usize, usize)> {
    let col = (p.x + 0.5 * width as f64).floor();
    let row = (0.5 * height as f64 - p.y).floor();
    if col < 0.0 || row < 0.0 || col >= width as f64 || row >= height as f64 {
        return None;
    }
    Some((row as usize, col as usize))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centered_coordinates_of_corners() {
        let frame = Frame::zeros(160, 120);
        assert_eq!(frame.pixel_to_centered(0, 0), Point2::new(-79.5, 59.5));
        assert_eq!(frame.pixel_to_centered(119, 159), Point2::new(79.5, -59.5));
        assert_eq!(frame.pixel_to_centered(60, 80), Point2::new(0.5, -0.5));
    }

    #[test]
    fn test_centered_pixel_inverse() {
        let frame = Frame::zeros(160, 120);
        for &(row, col) in &[(0, 0), (10, 17), (59, 80), (119, 159)] {
            let p = frame.pixel_to_centered(row, col);
            assert_eq!(frame.centered_to_pixel(&p), Some((row, col)));
        }
        assert_eq!(frame.centered_to_pixel(&Point2::new(80.5, 0.0)), None);
        assert_eq!(frame.centered_to_pixel(&Point2::new(0.0, 60.5)), None);
    }

    #[test]
    fn test_gray_image_conversion() {
        let frame = Frame::from_fn(4, 3, |row, col| (row * 4 + col) as f64 * 10.0);
        let image = frame.to_gray_image();
        assert_eq!(image.dimensions(), (4, 3));
        assert_eq!(image.get_pixel(3, 2).0[0], 110);
        assert_eq!(Frame::from_gray_image(&image), frame);
    }
}
