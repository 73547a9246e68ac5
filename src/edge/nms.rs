//! Non-maximum suppression, double thresholding and single-hop hysteresis.
//!
//! The outermost one-pixel frame is never processed and stays suppressed, which
//! keeps neighbour lookups in bounds and discards the zero-padding response at
//! the image border.

use nalgebra::DMatrix;

/// Double-threshold label of a pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EdgeClass {
    #[default]
    Suppressed,
    Weak,
    Strong,
}

/// Thins the magnitude field to ridges along the gradient direction.
///
/// Direction is folded into `[0, 180)` degrees and quantised into the 0°, 45°,
/// 90° and 135° bins; a pixel survives when its magnitude is at least that of
/// both neighbours across the edge.
pub fn non_max_suppression(magnitude: &DMatrix<f64>, direction: &DMatrix<f64>) -> DMatrix<f64> {
    let (rows, cols) = magnitude.shape();
    let mut out = DMatrix::zeros(rows, cols);
    if rows < 3 || cols < 3 {
        return out;
    }

    for i in 1..rows - 1 {
        for j in 1..cols - 1 {
            let mut angle = direction[(i, j)].to_degrees();
            if angle < 0.0 {
                angle += 180.0;
            }

            let (q, r) = if !(22.5..157.5).contains(&angle) {
                (magnitude[(i, j + 1)], magnitude[(i, j - 1)])
            } else if angle < 67.5 {
                (magnitude[(i + 1, j - 1)], magnitude[(i - 1, j + 1)])
            } else if angle < 112.5 {
                (magnitude[(i + 1, j)], magnitude[(i - 1, j)])
            } else {
                (magnitude[(i - 1, j - 1)], magnitude[(i + 1, j + 1)])
            };

            let current = magnitude[(i, j)];
            if current >= q && current >= r {
                out[(i, j)] = current;
            }
        }
    }
    out
}

/// Labels pixels strong (`>= high`), weak (`[low, high)`) or suppressed.
///
/// `high = ratio_high * max(z)` and `low = ratio_low * high`. A field with no
/// positive response labels everything suppressed.
pub fn double_threshold(z: &DMatrix<f64>, ratio_high: f64, ratio_low: f64) -> DMatrix<EdgeClass> {
    let max = z.iter().cloned().fold(0.0_f64, f64::max);
    if max <= 0.0 {
        return DMatrix::from_element(z.nrows(), z.ncols(), EdgeClass::Suppressed);
    }

    let high = ratio_high * max;
    let low = ratio_low * high;
    z.map(|value| {
        if value >= high {
            EdgeClass::Strong
        } else if value >= low {
            EdgeClass::Weak
        } else {
            EdgeClass::Suppressed
        }
    })
}

/// Promotes weak pixels with a strong 8-neighbour and drops the rest.
///
/// Neighbours are read from the labels as they were before the pass, so a weak
/// pixel is promoted only when it touches an originally strong pixel.
pub fn hysteresis(classes: &DMatrix<EdgeClass>) -> DMatrix<bool> {
    let (rows, cols) = classes.shape();
    let mut strong = classes.map(|class| class == EdgeClass::Strong);
    if rows < 3 || cols < 3 {
        return strong;
    }

    for i in 1..rows - 1 {
        for j in 1..cols - 1 {
            if classes[(i, j)] != EdgeClass::Weak {
                continue;
            }
            let touches_strong = (i - 1..=i + 1)
                .flat_map(|r| (j - 1..=j + 1).map(move |c| (r, c)))
                .any(|(r, c)| (r, c) != (i, j) && classes[(r, c)] == EdgeClass::Strong);
            strong[(i, j)] = touches_strong;
        }
    }
    strong
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nms_keeps_ridge_only() {
        // Horizontal gradient everywhere, ridge along column 2.
        let magnitude = DMatrix::from_fn(5, 5, |_, c| match c {
            2 => 10.0,
            1 | 3 => 5.0,
            _ => 1.0,
        });
        let direction = DMatrix::zeros(5, 5);
        let z = non_max_suppression(&magnitude, &direction);
        for r in 1..4 {
            assert_eq!(z[(r, 2)], 10.0);
            assert_eq!(z[(r, 1)], 0.0);
            assert_eq!(z[(r, 3)], 0.0);
        }
        // Border is never processed.
        assert_eq!(z[(0, 2)], 0.0);
    }

    #[test]
    fn test_nms_vertical_direction_bin() {
        let magnitude = DMatrix::from_fn(5, 5, |r, _| if r == 2 { 10.0 } else { 4.0 });
        let direction = DMatrix::from_element(5, 5, -std::f64::consts::FRAC_PI_2);
        let z = non_max_suppression(&magnitude, &direction);
        assert_eq!(z[(2, 2)], 10.0);
        assert_eq!(z[(1, 2)], 0.0);
    }

    #[test]
    fn test_double_threshold_levels() {
        let z = DMatrix::from_row_slice(1, 4, &[10.0, 6.0, 2.5, 1.0]);
        let classes = double_threshold(&z, 0.67, 0.3);
        // high = 6.7, low = 2.01
        assert_eq!(classes[(0, 0)], EdgeClass::Strong);
        assert_eq!(classes[(0, 1)], EdgeClass::Weak);
        assert_eq!(classes[(0, 2)], EdgeClass::Weak);
        assert_eq!(classes[(0, 3)], EdgeClass::Suppressed);
    }

    #[test]
    fn test_double_threshold_blank_field() {
        let classes = double_threshold(&DMatrix::zeros(3, 3), 0.67, 0.3);
        assert!(classes.iter().all(|&c| c == EdgeClass::Suppressed));
    }

    #[test]
    fn test_hysteresis_is_single_hop() {
        use EdgeClass::*;
        let classes = DMatrix::from_row_slice(
            3,
            6,
            &[
                Suppressed, Suppressed, Suppressed, Suppressed, Suppressed, Suppressed,
                Suppressed, Strong, Weak, Weak, Weak, Suppressed,
                Suppressed, Suppressed, Suppressed, Suppressed, Suppressed, Suppressed,
            ],
        );
        let edges = hysteresis(&classes);
        assert!(edges[(1, 1)]);
        assert!(edges[(1, 2)]);
        // Two hops away from the strong pixel.
        assert!(!edges[(1, 3)]);
        assert!(!edges[(1, 4)]);
    }
}
