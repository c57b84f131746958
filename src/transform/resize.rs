//! Image resizing with nearest, bilinear, cubic and area interpolation.
//!
//! Resizing is separable: every mode builds a table of `(source index,
//! weight)` taps per destination column and per destination row, then runs a
//! horizontal and a vertical pass over an `f64` working copy.

use ndarray::Array3;

use super::interpolate::{cubic_weights, InterpolationMode};
use crate::error::{Error, Result};
use crate::filters::core::{clamp_index, par_rows};
use crate::matrix::{Matrix, Size};

type Taps = Vec<Vec<(usize, f64)>>;

/// Source taps of every destination index along one axis.
fn axis_taps(src_len: usize, dst_len: usize, mode: InterpolationMode) -> Taps {
    let scale = src_len as f64 / dst_len as f64;
    let clamp = |i: isize| clamp_index(i, src_len);

    (0..dst_len)
        .map(|d| match mode {
            InterpolationMode::Nearest => {
                let s = ((d as f64 * scale).floor() as usize).min(src_len - 1);
                vec![(s, 1.0)]
            }
            InterpolationMode::Linear => {
                let f = ((d as f64 + 0.5) * scale - 0.5).max(0.0);
                let s = f.floor();
                let t = f - s;
                let s = s as isize;
                vec![(clamp(s), 1.0 - t), (clamp(s + 1), t)]
            }
            InterpolationMode::Cubic => {
                let f = (d as f64 + 0.5) * scale - 0.5;
                let s = f.floor();
                let w = cubic_weights(f - s);
                let s = s as isize;
                (0..4).map(|i| (clamp(s + i as isize - 1), w[i])).collect()
            }
            InterpolationMode::Area if scale >= 1.0 => {
                // Coverage of [d, d+1) in source coordinates.
                let start = d as f64 * scale;
                let end = start + scale;
                let first = start.floor() as usize;
                let last = (end.ceil() as usize).min(src_len);
                (first..last)
                    .filter_map(|s| {
                        let overlap = end.min(s as f64 + 1.0) - start.max(s as f64);
                        (overlap > 1e-9).then_some((s, overlap / scale))
                    })
                    .collect()
            }
            InterpolationMode::Area => {
                // Upscaling: each source pixel is a box, blended only across
                // the box boundaries.
                let inv_scale = 1.0 / scale;
                let s = (d as f64 * scale).floor();
                let f = (d as f64 + 1.0) - (s + 1.0) * inv_scale;
                let t = if f <= 0.0 { 0.0 } else { f - f.floor() };
                let s = s as isize;
                vec![(clamp(s), 1.0 - t), (clamp(s + 1), t)]
            }
        })
        .collect()
}

/// Resize `src` to `size` using `interpolation`.
///
/// - `Nearest` copies the source sample whose area contains the
///   destination sample.
/// - `Linear` blends the 2×2 neighbourhood around the pixel-centre aligned
///   source position.
/// - `Cubic` convolves the 4×4 neighbourhood with a cubic kernel.
/// - `Area` averages the covered source area when shrinking and blends only
///   across source pixel boundaries when enlarging.
///
/// # Arguments
/// * `src` - Any depth, 1-4 channels
/// * `size` - Destination width and height, both at least 1
/// * `interpolation` - Resampling mode; `InterpolationMode::default()` is linear
pub fn resize(src: &Matrix, size: Size, interpolation: InterpolationMode) -> Result<Matrix> {
    if size.width == 0 || size.height == 0 {
        return Err(Error::invalid(format!(
            "resize target must be non-empty, got {}x{}",
            size.width, size.height
        )));
    }
    if src.rows() == 0 || src.cols() == 0 {
        return Err(Error::invalid("cannot resize an empty matrix"));
    }

    let plane = src.to_f64();
    let (height, width, channels) = plane.dim();
    let x_taps = axis_taps(width, size.width, interpolation);
    let y_taps = axis_taps(height, size.height, interpolation);

    // Horizontal pass
    let mut temp = Array3::<f64>::zeros((height, size.width, channels));
    par_rows(&mut temp, |y, mut row| {
        for (x, taps) in x_taps.iter().enumerate() {
            for c in 0..channels {
                row[[x, c]] = taps.iter().map(|&(sx, w)| plane[[y, sx, c]] * w).sum();
            }
        }
    });

    // Vertical pass
    let mut out = Array3::<f64>::zeros((size.height, size.width, channels));
    par_rows(&mut out, |y, mut row| {
        let taps = &y_taps[y];
        for x in 0..size.width {
            for c in 0..channels {
                row[[x, c]] = taps.iter().map(|&(sy, w)| temp[[sy, x, c]] * w).sum();
            }
        }
    });

    Ok(Matrix::from_f64_array(out, src.depth()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::Depth;

    fn pattern(rows: usize, cols: usize) -> Matrix {
        Matrix::from_fn(rows, cols, Depth::F32, 1, |r, c, _| ((r * 13 + c * 7) % 11) as f64).unwrap()
    }

    #[test]
    fn test_same_size_is_identity() {
        let src = pattern(6, 9);
        for mode in [
            InterpolationMode::Nearest,
            InterpolationMode::Linear,
            InterpolationMode::Cubic,
            InterpolationMode::Area,
        ] {
            assert_eq!(resize(&src, src.size(), mode).unwrap(), src, "{mode:?}");
        }
    }

    #[test]
    fn test_area_downscale_averages_blocks() {
        let src = Matrix::from_vec(2, 4, 1, vec![0u8, 2, 4, 6, 10, 12, 14, 16]).unwrap();
        let out = resize(&src, Size::new(2, 1), InterpolationMode::Area).unwrap();
        assert_eq!(out.get_sample(0, 0, 0).unwrap(), 6.0);
        assert_eq!(out.get_sample(0, 1, 0).unwrap(), 10.0);
    }

    #[test]
    fn test_nearest_upscale_replicates() {
        let src = Matrix::from_vec(1, 2, 1, vec![3u8, 9]).unwrap();
        let out = resize(&src, Size::new(4, 2), InterpolationMode::Nearest).unwrap();
        for r in 0..2 {
            let row: Vec<f64> = (0..4).map(|c| out.get_sample(r, c, 0).unwrap()).collect();
            assert_eq!(row, vec![3.0, 3.0, 9.0, 9.0]);
        }
    }

    #[test]
    fn test_modes_are_distinct_on_fractional_scale() {
        let src = pattern(10, 10);
        let target = Size::new(7, 7);
        let outputs: Vec<Matrix> = [
            InterpolationMode::Nearest,
            InterpolationMode::Linear,
            InterpolationMode::Cubic,
            InterpolationMode::Area,
        ]
        .iter()
        .map(|&m| resize(&src, target, m).unwrap())
        .collect();
        for i in 0..outputs.len() {
            for j in i + 1..outputs.len() {
                assert_ne!(outputs[i], outputs[j], "modes {i} and {j} coincide");
            }
        }
    }

    #[test]
    fn test_area_and_linear_coincide_at_half_scale() {
        let src = pattern(8, 8);
        let a = resize(&src, Size::new(4, 4), InterpolationMode::Area).unwrap();
        let l = resize(&src, Size::new(4, 4), InterpolationMode::Linear).unwrap();
        for r in 0..4 {
            for c in 0..4 {
                let (va, vl) = (a.get_sample(r, c, 0).unwrap(), l.get_sample(r, c, 0).unwrap());
                assert!((va - vl).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn test_tap_weights_sum_to_one() {
        for mode in [InterpolationMode::Linear, InterpolationMode::Cubic, InterpolationMode::Area] {
            for &(s, d) in &[(10usize, 7usize), (3, 8), (5, 5)] {
                for taps in axis_taps(s, d, mode) {
                    let sum: f64 = taps.iter().map(|&(_, w)| w).sum();
                    assert!((sum - 1.0).abs() < 1e-9, "{mode:?} {s}->{d}: {sum}");
                }
            }
        }
    }

    #[test]
    fn test_rejects_empty_target() {
        let src = pattern(4, 4);
        assert!(resize(&src, Size::new(0, 3), InterpolationMode::Linear).is_err());
    }
}
