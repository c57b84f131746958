//! Affine and perspective warps, coordinate remapping and log-polar
//! resampling.
//!
//! A warp visits every destination pixel, computes where it comes from in
//! the source and samples there. Transform matrices describe the
//! source → destination mapping and are inverted before use, unless
//! [`WarpFlags::inverse_map`] says they already map destination → source.

use std::f64::consts::PI;

use ndarray::{Array2, Array3};

use super::interpolate::{is_outlier, sample_pixel, InterpolationMode};
use super::transform_coeffs;
use crate::error::{Error, Result};
use crate::filters::core::par_rows;
use crate::matrix::{MatData, Matrix, Point2f, Scalar, Size};

/// Orthogonal modifiers of the warp operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WarpFlags {
    /// The transform already maps destination pixels to source pixels.
    pub inverse_map: bool,
    /// Destination pixels whose source lies outside the image take the fill
    /// value instead of replicated edge samples.
    pub fill_outliers: bool,
}

/// Options shared by [`warp_affine`], [`warp_perspective`], [`remap`] and
/// [`log_polar`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WarpOptions {
    pub interpolation: InterpolationMode,
    pub flags: WarpFlags,
    pub fill_value: Scalar,
}

// ============================================================================
// Rotation matrix
// ============================================================================

/// 2×3 cv32f matrix rotating by `angle` degrees (counter-clockwise) about
/// `center` and scaling by `scale`.
///
/// With `a = scale·cos(angle)` and `b = scale·sin(angle)`:
///
/// ```text
/// [  a  b  (1 - a)·cx - b·cy ]
/// [ -b  a  b·cx + (1 - a)·cy ]
/// ```
pub fn rotation_matrix_2d(center: Point2f, angle: f64, scale: f64) -> Matrix {
    let (sin, cos) = angle.to_radians().sin_cos();
    let a = scale * cos;
    let b = scale * sin;
    let (cx, cy) = (center.x as f64, center.y as f64);
    let coeffs = [
        a,
        b,
        (1.0 - a) * cx - b * cy,
        -b,
        a,
        b * cx + (1.0 - a) * cy,
    ];
    let values = Array3::from_shape_fn((2, 3, 1), |(r, c, _)| coeffs[r * 3 + c] as f32);
    Matrix::from_data(MatData::F32(values))
}

// ============================================================================
// Sampling core
// ============================================================================

/// Fill every destination pixel from the source location `locate(x, y)`.
///
/// `None` marks a pixel without a source location (a point at infinity),
/// which always takes the fill value. So does every pixel of a warp from an
/// empty source.
fn warp_with<F>(src: &Matrix, dst_size: Size, options: &WarpOptions, locate: F) -> Matrix
where
    F: Fn(usize, usize) -> Option<(f64, f64)> + Sync + Send,
{
    let plane = src.to_f64();
    let (height, width, channels) = plane.dim();
    let fill = options.fill_value.0;
    let empty = height == 0 || width == 0;

    let mut out = Array3::<f64>::zeros((dst_size.height, dst_size.width, channels));
    par_rows(&mut out, |y, mut row| {
        for x in 0..dst_size.width {
            let value = match locate(x, y) {
                _ if empty => fill,
                Some((sx, sy)) if !(options.flags.fill_outliers && is_outlier(sx, sy, width, height)) => {
                    sample_pixel(plane.view(), sx, sy, options.interpolation)
                }
                _ => fill,
            };
            for c in 0..channels {
                row[[x, c]] = value[c];
            }
        }
    });
    Matrix::from_f64_array(out, src.depth())
}

#[inline]
fn finite_point(x: f64, y: f64) -> Option<(f64, f64)> {
    (x.is_finite() && y.is_finite()).then_some((x, y))
}

fn invert_affine(m: &[f64]) -> Result<[f64; 6]> {
    let det = m[0] * m[4] - m[1] * m[3];
    if det == 0.0 || !det.is_finite() {
        log::debug!("affine transform {m:?} is singular");
        return Err(Error::invalid("affine transform is singular"));
    }
    let d = 1.0 / det;
    let (a, b, c) = (m[4] * d, -m[1] * d, -m[3] * d);
    let e = m[0] * d;
    Ok([
        a,
        b,
        -(a * m[2] + b * m[5]),
        c,
        e,
        -(c * m[2] + e * m[5]),
    ])
}

fn invert_3x3(m: &[f64]) -> Result<[f64; 9]> {
    let cof = [
        m[4] * m[8] - m[5] * m[7],
        m[2] * m[7] - m[1] * m[8],
        m[1] * m[5] - m[2] * m[4],
        m[5] * m[6] - m[3] * m[8],
        m[0] * m[8] - m[2] * m[6],
        m[2] * m[3] - m[0] * m[5],
        m[3] * m[7] - m[4] * m[6],
        m[1] * m[6] - m[0] * m[7],
        m[0] * m[4] - m[1] * m[3],
    ];
    let det = m[0] * cof[0] + m[1] * cof[3] + m[2] * cof[6];
    if det == 0.0 || !det.is_finite() {
        log::debug!("perspective transform {m:?} is singular");
        return Err(Error::invalid("perspective transform is singular"));
    }
    Ok(cof.map(|v| v / det))
}

// ============================================================================
// Warps
// ============================================================================

/// Affine warp through a 2×3 matrix; the output has the input size.
///
/// # Arguments
/// * `src` - Any depth, 1-4 channels
/// * `map_matrix` - 2×3 single-channel cv32f/cv64f matrix
/// * `options` - Interpolation, flags and fill value
///
/// # Errors
/// `TypeArgument` for a malformed matrix, `InvalidArgument` when a forward
/// matrix cannot be inverted.
pub fn warp_affine(src: &Matrix, map_matrix: &Matrix, options: WarpOptions) -> Result<Matrix> {
    let coeffs = transform_coeffs(map_matrix, 2, 3)?;
    let m = if options.flags.inverse_map {
        [coeffs[0], coeffs[1], coeffs[2], coeffs[3], coeffs[4], coeffs[5]]
    } else {
        invert_affine(&coeffs)?
    };

    Ok(warp_with(src, src.size(), &options, |x, y| {
        let (x, y) = (x as f64, y as f64);
        finite_point(
            m[0] * x + m[1] * y + m[2],
            m[3] * x + m[4] * y + m[5],
        )
    }))
}

/// Perspective warp through a 3×3 homogeneous matrix; the output has the
/// input size.
pub fn warp_perspective(src: &Matrix, map_matrix: &Matrix, options: WarpOptions) -> Result<Matrix> {
    let coeffs = transform_coeffs(map_matrix, 3, 3)?;
    let m = if options.flags.inverse_map {
        let mut m = [0.0; 9];
        m.copy_from_slice(&coeffs);
        m
    } else {
        invert_3x3(&coeffs)?
    };

    Ok(warp_with(src, src.size(), &options, |x, y| {
        let (x, y) = (x as f64, y as f64);
        let w = m[6] * x + m[7] * y + m[8];
        if w == 0.0 {
            return None;
        }
        finite_point(
            (m[0] * x + m[1] * y + m[2]) / w,
            (m[3] * x + m[4] * y + m[5]) / w,
        )
    }))
}

fn check_map(map: &Matrix, name: &str) -> Result<Array2<f64>> {
    if !map.depth().is_float() || map.channels() != 1 {
        return Err(Error::type_arg(format!(
            "{name} must be a single-channel float matrix, got {} with {} channels",
            map.depth(),
            map.channels()
        )));
    }
    Ok(map.to_f64().index_axis_move(ndarray::Axis(2), 0))
}

/// Sample the source at the coordinates stored in `map_x` / `map_y`.
///
/// The maps give, for every destination pixel, the source column and row.
/// The output takes the size of the maps. `WarpFlags::inverse_map` has no
/// effect since the maps are already destination → source.
pub fn remap(src: &Matrix, map_x: &Matrix, map_y: &Matrix, options: WarpOptions) -> Result<Matrix> {
    let mx = check_map(map_x, "map_x")?;
    let my = check_map(map_y, "map_y")?;
    if mx.dim() != my.dim() {
        return Err(Error::type_arg(format!(
            "map_x is {}x{} but map_y is {}x{}",
            mx.ncols(),
            mx.nrows(),
            my.ncols(),
            my.nrows()
        )));
    }
    let (rows, cols) = mx.dim();

    Ok(warp_with(src, Size::new(cols, rows), &options, |x, y| {
        finite_point(mx[[y, x]], my[[y, x]])
    }))
}

/// Log-polar resampling about `center`.
///
/// Forward: destination column `ρ` and row `φ` sample the source at radius
/// `exp(ρ / magnitude)` and angle `φ · 2π / rows`. With
/// `WarpFlags::inverse_map` the mapping runs the other way, turning a
/// log-polar image back into Cartesian form.
pub fn log_polar(src: &Matrix, center: Point2f, magnitude: f64, options: WarpOptions) -> Result<Matrix> {
    if !(magnitude > 0.0 && magnitude.is_finite()) {
        return Err(Error::invalid(format!("magnitude must be positive, got {magnitude}")));
    }
    let (cx, cy) = (center.x as f64, center.y as f64);
    let angle_rows = src.rows() as f64;

    let result = if options.flags.inverse_map {
        warp_with(src, src.size(), &options, |x, y| {
            let (dx, dy) = (x as f64 - cx, y as f64 - cy);
            let rho = magnitude * dx.hypot(dy).ln();
            let mut phi = dy.atan2(dx);
            if phi < 0.0 {
                phi += 2.0 * PI;
            }
            finite_point(rho, phi * angle_rows / (2.0 * PI))
        })
    } else {
        warp_with(src, src.size(), &options, |x, y| {
            let r = (x as f64 / magnitude).exp();
            let phi = y as f64 * 2.0 * PI / angle_rows;
            finite_point(cx + r * phi.cos(), cy + r * phi.sin())
        })
    };
    Ok(result)
}

/// Identity coordinate maps of the given size, handy as a starting point
/// for custom [`remap`] grids.
pub fn identity_maps(size: Size) -> (Matrix, Matrix) {
    let mx = Array3::from_shape_fn((size.height, size.width, 1), |(_, x, _)| x as f32);
    let my = Array3::from_shape_fn((size.height, size.width, 1), |(y, _, _)| y as f32);
    (
        Matrix::from_data(MatData::F32(mx)),
        Matrix::from_data(MatData::F32(my)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::Depth;

    fn ramp(rows: usize, cols: usize) -> Matrix {
        Matrix::from_fn(rows, cols, Depth::U8, 1, |r, c, _| (10 * r + c) as f64).unwrap()
    }

    fn affine(coeffs: [f64; 6]) -> Matrix {
        Matrix::from_fn(2, 3, Depth::F64, 1, |r, c, _| coeffs[r * 3 + c]).unwrap()
    }

    #[test]
    fn test_rotation_matrix_closed_form() {
        let m = rotation_matrix_2d(Point2f::new(10.0, 20.0), 60.0, 2.0);
        assert_eq!((m.rows(), m.cols(), m.channels(), m.depth()), (2, 3, 1, Depth::F32));
        let expected = [[1.0, 1.73205, -34.64102], [-1.73205, 1.0, 17.32051]];
        for (r, row) in expected.iter().enumerate() {
            for (c, &e) in row.iter().enumerate() {
                let v = m.get_sample(r, c, 0).unwrap();
                assert!((v - e).abs() < 1e-4, "[{r}][{c}] = {v}, expected {e}");
            }
        }
    }

    #[test]
    fn test_identity_affine_is_exact() {
        let src = ramp(6, 7);
        let id = affine([1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
        for mode in [InterpolationMode::Nearest, InterpolationMode::Linear, InterpolationMode::Cubic] {
            let opts = WarpOptions { interpolation: mode, ..Default::default() };
            assert_eq!(warp_affine(&src, &id, opts).unwrap(), src);
        }
    }

    #[test]
    fn test_translation_forward_inverse_and_fill() {
        let src = ramp(4, 6);
        let shift = affine([1.0, 0.0, 2.0, 0.0, 1.0, 0.0]);

        // Forward: dst(x) = src(x - 2), left columns replicate column 0.
        let fwd = warp_affine(&src, &shift, WarpOptions::default()).unwrap();
        assert_eq!(fwd.get_sample(1, 4, 0).unwrap(), 12.0);
        assert_eq!(fwd.get_sample(1, 0, 0).unwrap(), 10.0);

        // Inverse map: dst(x) = src(x + 2).
        let inv_opts = WarpOptions {
            flags: WarpFlags { inverse_map: true, ..Default::default() },
            ..Default::default()
        };
        let inv = warp_affine(&src, &shift, inv_opts).unwrap();
        assert_eq!(inv.get_sample(1, 0, 0).unwrap(), 12.0);
        assert_ne!(inv, fwd);

        // Fill changes only the two outlier columns.
        let fill_opts = WarpOptions {
            flags: WarpFlags { fill_outliers: true, ..Default::default() },
            fill_value: Scalar::all(200.0),
            ..Default::default()
        };
        let filled = warp_affine(&src, &shift, fill_opts).unwrap();
        for r in 0..4 {
            for c in 0..6 {
                let (a, b) = (fwd.get_sample(r, c, 0).unwrap(), filled.get_sample(r, c, 0).unwrap());
                if c < 2 {
                    assert_eq!(b, 200.0);
                } else {
                    assert_eq!(a, b);
                }
            }
        }
    }

    /// Check that `filled` is `plain` except in the first two columns, which
    /// hold the fill value 200.
    fn assert_left_columns_filled(plain: &Matrix, filled: &Matrix) {
        for r in 0..plain.rows() {
            for c in 0..plain.cols() {
                let (a, b) = (plain.get_sample(r, c, 0).unwrap(), filled.get_sample(r, c, 0).unwrap());
                if c < 2 {
                    assert_eq!(b, 200.0, "({r}, {c})");
                } else {
                    assert_eq!(a, b, "({r}, {c})");
                }
            }
        }
    }

    #[test]
    fn test_fill_outliers_perspective_and_remap() {
        let src = ramp(4, 6);
        let fill_opts = WarpOptions {
            flags: WarpFlags { fill_outliers: true, ..Default::default() },
            fill_value: Scalar::all(200.0),
            ..Default::default()
        };

        let shift = Matrix::from_fn(3, 3, Depth::F64, 1, |r, c, _| match (r, c) {
            (0, 2) => 2.0,
            _ if r == c => 1.0,
            _ => 0.0,
        })
        .unwrap();
        let plain = warp_perspective(&src, &shift, WarpOptions::default()).unwrap();
        let filled = warp_perspective(&src, &shift, fill_opts).unwrap();
        assert_left_columns_filled(&plain, &filled);

        let (_, my) = identity_maps(src.size());
        let mx = Matrix::from_fn(4, 6, Depth::F32, 1, |_, c, _| c as f64 - 2.0).unwrap();
        let plain = remap(&src, &mx, &my, WarpOptions::default()).unwrap();
        let filled = remap(&src, &mx, &my, fill_opts).unwrap();
        assert_eq!(plain.get_sample(2, 0, 0).unwrap(), 20.0);
        assert_left_columns_filled(&plain, &filled);
    }

    #[test]
    fn test_empty_source_takes_fill_value() {
        let empty = Matrix::new(0, 0, Depth::U8, 1).unwrap();
        let opts = WarpOptions { fill_value: Scalar::all(7.0), ..Default::default() };

        let (mx, my) = identity_maps(Size::new(2, 2));
        let out = remap(&empty, &mx, &my, opts).unwrap();
        assert_eq!((out.rows(), out.cols(), out.depth()), (2, 2, Depth::U8));
        let view = out.as_array::<u8>().unwrap();
        assert!(view.iter().all(|&v| v == 7));

        let id = affine([1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
        let warped = warp_affine(&empty, &id, opts).unwrap();
        assert_eq!((warped.rows(), warped.cols()), (0, 0));
    }

    #[test]
    fn test_warp_argument_validation() {
        let src = ramp(4, 4);
        let bad = Matrix::new(3, 3, Depth::F32, 1).unwrap();
        assert!(matches!(warp_affine(&src, &bad, WarpOptions::default()), Err(Error::TypeArgument(_))));
        let bad = Matrix::new(3, 3, Depth::U8, 1).unwrap();
        assert!(matches!(warp_perspective(&src, &bad, WarpOptions::default()), Err(Error::TypeArgument(_))));

        let singular = affine([1.0, 2.0, 0.0, 2.0, 4.0, 0.0]);
        assert!(matches!(
            warp_affine(&src, &singular, WarpOptions::default()),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_perspective_matches_affine() {
        let src = ramp(8, 8);
        let rot = rotation_matrix_2d(Point2f::new(3.5, 3.5), 30.0, 1.0);
        let c: Vec<f64> = (0..6).map(|i| rot.get_sample(i / 3, i % 3, 0).unwrap()).collect();
        let persp = Matrix::from_fn(3, 3, Depth::F64, 1, |r, col, _| {
            if r < 2 { c[r * 3 + col] } else if col == 2 { 1.0 } else { 0.0 }
        })
        .unwrap();
        let a = warp_affine(&src, &rot, WarpOptions::default()).unwrap();
        let p = warp_perspective(&src, &persp, WarpOptions::default()).unwrap();
        // Both inversions agree up to rounding of the cv8u result.
        for r in 0..8 {
            for col in 0..8 {
                let (va, vp) = (a.get_sample(r, col, 0).unwrap(), p.get_sample(r, col, 0).unwrap());
                assert!((va - vp).abs() <= 1.0, "({r}, {col}): {va} vs {vp}");
            }
        }
    }

    #[test]
    fn test_remap_identity_and_size() {
        let src = ramp(5, 6);
        let (mx, my) = identity_maps(src.size());
        assert_eq!(remap(&src, &mx, &my, WarpOptions::default()).unwrap(), src);

        let (mx, my) = identity_maps(Size::new(3, 2));
        let out = remap(&src, &mx, &my, WarpOptions::default()).unwrap();
        assert_eq!((out.rows(), out.cols()), (2, 3));
        assert_eq!(out.get_sample(1, 2, 0).unwrap(), 12.0);

        let (other_x, _) = identity_maps(Size::new(4, 4));
        assert!(matches!(
            remap(&src, &other_x, &my, WarpOptions::default()),
            Err(Error::TypeArgument(_))
        ));
        let int_map = Matrix::new(2, 3, Depth::I16, 1).unwrap();
        assert!(matches!(
            remap(&src, &int_map, &my, WarpOptions::default()),
            Err(Error::TypeArgument(_))
        ));
    }

    #[test]
    fn test_log_polar() {
        let src = Matrix::from_fn(16, 16, Depth::U8, 1, |_, _, _| 90.0).unwrap();
        let center = Point2f::new(8.0, 8.0);
        let out = log_polar(&src, center, 4.0, WarpOptions::default()).unwrap();
        assert_eq!(out, src);

        let inv_opts = WarpOptions {
            flags: WarpFlags { inverse_map: true, fill_outliers: true },
            ..Default::default()
        };
        let inv = log_polar(&src, center, 4.0, inv_opts).unwrap();
        // The centre has no finite log-radius.
        assert_eq!(inv.get_sample(8, 8, 0).unwrap(), 0.0);
        assert_eq!(inv.get_sample(8, 10, 0).unwrap(), 90.0);

        assert!(log_polar(&src, center, 0.0, WarpOptions::default()).is_err());
    }

    #[test]
    fn test_warp_is_deterministic() {
        let src = Matrix::from_fn(32, 40, Depth::F32, 3, |r, c, ch| ((r * 7 + c * 3 + ch) % 17) as f64).unwrap();
        let rot = rotation_matrix_2d(Point2f::new(20.0, 16.0), 17.0, 0.8);
        let opts = WarpOptions { interpolation: InterpolationMode::Cubic, ..Default::default() };
        let a = warp_affine(&src, &rot, opts).unwrap();
        let b = warp_affine(&src, &rot, opts).unwrap();
        assert_eq!(a, b);
    }
}
