//! Smoothing and directional gradients on zero-padded 3×3 neighbourhoods.
//!
//! Kernels are applied as correlations in image (row, col) order. The `Y`
//! kernels put the positive row on top, so `gy` grows upward like the centered
//! frame. Direction is only used modulo π by non-maximum suppression, which makes
//! the result independent of the flip between correlation and convolution.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

pub type Kernel3 = [[f64; 3]; 3];

/// Normalised 3×3 Gaussian, `[1 2 1; 2 4 2; 1 2 1] / 16`.
pub const GAUSSIAN_KERNEL: Kernel3 = [
    [1.0 / 16.0, 2.0 / 16.0, 1.0 / 16.0],
    [2.0 / 16.0, 4.0 / 16.0, 2.0 / 16.0],
    [1.0 / 16.0, 2.0 / 16.0, 1.0 / 16.0],
];

const SOBEL_KERNEL_X: Kernel3 = [[-1.0, 0.0, 1.0], [-2.0, 0.0, 2.0], [-1.0, 0.0, 1.0]];
const SOBEL_KERNEL_Y: Kernel3 = [[1.0, 2.0, 1.0], [0.0, 0.0, 0.0], [-1.0, -2.0, -1.0]];

const PREWITT_KERNEL_X: Kernel3 = [[-1.0, 0.0, 1.0], [-1.0, 0.0, 1.0], [-1.0, 0.0, 1.0]];
const PREWITT_KERNEL_Y: Kernel3 = [[1.0, 1.0, 1.0], [0.0, 0.0, 0.0], [-1.0, -1.0, -1.0]];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradientKernel {
    #[default]
    Sobel,
    Prewitt,
}

impl GradientKernel {
    pub fn kernels(&self) -> (&'static Kernel3, &'static Kernel3) {
        match self {
            GradientKernel::Sobel => (&SOBEL_KERNEL_X, &SOBEL_KERNEL_Y),
            GradientKernel::Prewitt => (&PREWITT_KERNEL_X, &PREWITT_KERNEL_Y),
        }
    }
}

/// Per-pixel gradient field.
#[derive(Debug, Clone)]
pub struct Gradient {
    pub gx: DMatrix<f64>,
    pub gy: DMatrix<f64>,
    /// `hypot(gx, gy)`
    pub magnitude: DMatrix<f64>,
    /// `atan2(gy, gx)` in radians, range (-π, π]
    pub direction: DMatrix<f64>,
}

/// Correlates `input` with a 3×3 kernel, treating samples outside the grid as zero.
pub fn correlate_zero_padded(input: &DMatrix<f64>, kernel: &Kernel3) -> DMatrix<f64> {
    let (rows, cols) = input.shape();
    DMatrix::from_fn(rows, cols, |row, col| {
        let mut sum = 0.0;
        for (ky, kernel_row) in kernel.iter().enumerate() {
            let Some(r) = (row + ky).checked_sub(1).filter(|&r| r < rows) else {
                continue;
            };
            for (kx, weight) in kernel_row.iter().enumerate() {
                let Some(c) = (col + kx).checked_sub(1).filter(|&c| c < cols) else {
                    continue;
                };
                sum += input[(r, c)] * weight;
            }
        }
        sum
    })
}

pub fn gaussian_blur(input: &DMatrix<f64>) -> DMatrix<f64> {
    correlate_zero_padded(input, &GAUSSIAN_KERNEL)
}

/// Computes the directional gradient of an (already smoothed) intensity grid.
pub fn image_gradient(input: &DMatrix<f64>, kernel: GradientKernel) -> Gradient {
    let (kernel_x, kernel_y) = kernel.kernels();
    let gx = correlate_zero_padded(input, kernel_x);
    let gy = correlate_zero_padded(input, kernel_y);
    let magnitude = gx.zip_map(&gy, |x, y| x.hypot(y));
    let direction = gx.zip_map(&gy, |x, y| y.atan2(x));
    Gradient {
        gx,
        gy,
        magnitude,
        direction,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_gaussian_preserves_flat_interior() {
        let input = DMatrix::from_element(5, 5, 8.0);
        let blurred = gaussian_blur(&input);
        assert_relative_eq!(blurred[(2, 2)], 8.0, epsilon = 1e-12);
        // Zero padding darkens the frame border.
        assert_relative_eq!(blurred[(0, 2)], 6.0, epsilon = 1e-12);
        assert_relative_eq!(blurred[(0, 0)], 4.5, epsilon = 1e-12);
    }

    #[test]
    fn test_vertical_step_gives_horizontal_gradient() {
        // Bright right half.
        let input = DMatrix::from_fn(5, 6, |_, c| if c >= 3 { 10.0 } else { 0.0 });
        for kernel in [GradientKernel::Sobel, GradientKernel::Prewitt] {
            let grad = image_gradient(&input, kernel);
            assert!(grad.gx[(2, 2)] > 0.0);
            assert_relative_eq!(grad.gy[(2, 2)], 0.0, epsilon = 1e-12);
            assert_relative_eq!(grad.direction[(2, 2)], 0.0, epsilon = 1e-12);
            assert_eq!(grad.magnitude[(2, 0)], 0.0);
        }
    }

    #[test]
    fn test_gradient_points_up_when_top_is_bright() {
        let input = DMatrix::from_fn(6, 5, |r, _| if r < 3 { 10.0 } else { 0.0 });
        let grad = image_gradient(&input, GradientKernel::Sobel);
        assert_relative_eq!(grad.gy[(3, 2)], 40.0, epsilon = 1e-12);
        assert_relative_eq!(
            grad.direction[(3, 2)],
            std::f64::consts::FRAC_PI_2,
            epsilon = 1e-12
        );
    }
}
