//! Sub-pixel patch extraction.

use ndarray::Array3;

use super::interpolate::{sample_pixel, InterpolationMode};
use super::transform_coeffs;
use crate::error::{Error, Result};
use crate::filters::core::par_rows;
use crate::matrix::{Matrix, Point2f, Size};

fn patch_size(src: &Matrix, size: Option<Size>) -> Result<Size> {
    let size = size.unwrap_or_else(|| src.size());
    if size.width == 0 || size.height == 0 {
        return Err(Error::invalid(format!(
            "patch size must be non-empty, got {}x{}",
            size.width, size.height
        )));
    }
    Ok(size)
}

/// Bilinear patch sampled at `locate(x, y)` for every patch pixel.
fn extract<F>(src: &Matrix, size: Size, locate: F) -> Matrix
where
    F: Fn(f64, f64) -> (f64, f64) + Sync + Send,
{
    let plane = src.to_f64();
    let channels = plane.dim().2;
    let mut out = Array3::<f64>::zeros((size.height, size.width, channels));
    par_rows(&mut out, |y, mut row| {
        for x in 0..size.width {
            let (sx, sy) = locate(x as f64, y as f64);
            let value = sample_pixel(plane.view(), sx, sy, InterpolationMode::Linear);
            for c in 0..channels {
                row[[x, c]] = value[c];
            }
        }
    });
    Matrix::from_f64_array(out, src.depth())
}

/// Extract a `size` patch whose centre lies at `center` in the source.
///
/// Samples fall between pixels when `center` is fractional and are
/// interpolated bilinearly; pixels beyond the border replicate the edge.
/// `size` defaults to the source size.
pub fn rect_sub_pix(src: &Matrix, center: Point2f, size: Option<Size>) -> Result<Matrix> {
    let size = patch_size(src, size)?;
    let x0 = center.x as f64 - (size.width as f64 - 1.0) * 0.5;
    let y0 = center.y as f64 - (size.height as f64 - 1.0) * 0.5;
    Ok(extract(src, size, |x, y| (x0 + x, y0 + y)))
}

/// Extract a `size` patch through the 2×3 matrix `[A | b]`.
///
/// Patch pixel `(x, y)` samples the source at `A · (x - (w-1)/2, y - (h-1)/2) + b`,
/// so `b` is the patch centre in source coordinates.
///
/// # Errors
/// `TypeArgument` if `map_matrix` is not a 2×3 single-channel float matrix.
pub fn quadrangle_sub_pix(src: &Matrix, map_matrix: &Matrix, size: Option<Size>) -> Result<Matrix> {
    let m = transform_coeffs(map_matrix, 2, 3)?;
    let size = patch_size(src, size)?;
    let half_w = (size.width as f64 - 1.0) * 0.5;
    let half_h = (size.height as f64 - 1.0) * 0.5;
    Ok(extract(src, size, |x, y| {
        let (dx, dy) = (x - half_w, y - half_h);
        (m[0] * dx + m[1] * dy + m[2], m[3] * dx + m[4] * dy + m[5])
    }))
}
