//! Edge detection filters: Sobel, Laplacian, Canny.
//!
//! ## Supported Formats
//!
//! Derivative filters accept 1 to 4 channels, each filtered independently:
//! - **cv8u** input produces **cv16s** output (saturated)
//! - **cv32f** input produces **cv32f** output
//!
//! Any other depth fails with `UnsupportedDepth`. Borders replicate the edge
//! samples, so the output always has the input size.

use ndarray::{Array2, Array3, ArrayView2};

use super::core::{
    derivative_output_depth, filter_2d, laplacian_kernel, par_rows, sep_filter, sobel_kernels,
    Aperture,
};
use crate::error::Result;
use crate::matrix::{MatData, Matrix};

// ============================================================================
// Sobel
// ============================================================================

/// Separable Sobel derivative.
///
/// # Arguments
/// * `src` - cv8u or cv32f matrix, 1-4 channels
/// * `dx` - Derivative order along columns (x)
/// * `dy` - Derivative order along rows (y)
/// * `aperture` - Stencil size; `Aperture::default()` is 3
///
/// # Returns
/// cv16s matrix for cv8u input, cv32f matrix for cv32f input
pub fn sobel(src: &Matrix, dx: usize, dy: usize, aperture: Aperture) -> Result<Matrix> {
    let out_depth = derivative_output_depth(src.depth())?;
    let (kx, ky) = sobel_kernels(dx, dy, aperture)?;
    let result = sep_filter(src.to_f32().view(), &kx, &ky);
    Ok(Matrix::from_f32_array(result, out_depth))
}

// ============================================================================
// Laplacian
// ============================================================================

/// Laplacian `d²/dx² + d²/dy²` through a single combined stencil.
///
/// # Arguments
/// * `src` - cv8u or cv32f matrix, 1-4 channels
/// * `aperture` - Stencil size; `Aperture::default()` is 3
pub fn laplace(src: &Matrix, aperture: Aperture) -> Result<Matrix> {
    let out_depth = derivative_output_depth(src.depth())?;
    let kernel = laplacian_kernel(aperture)?;
    let result = filter_2d(src.to_f32().view(), kernel.view());
    Ok(Matrix::from_f32_array(result, out_depth))
}

// ============================================================================
// Canny
// ============================================================================

const TAN_22_5: f32 = 0.414_213_57;
const TAN_67_5: f32 = 2.414_213_5;

const WEAK: u8 = 1;
const STRONG: u8 = 2;

/// Canny edge detector.
///
/// Gradients come from the Sobel filter at `aperture`; the magnitude is the
/// L1 norm `|gx| + |gy|`. For multi-channel input the channel with the
/// largest magnitude wins at each pixel.
///
/// # Arguments
/// * `src` - cv8u or cv32f matrix
/// * `low_threshold` - Weak edge threshold (swapped with `high` if larger)
/// * `high_threshold` - Strong edge threshold
/// * `aperture` - Sobel stencil size
///
/// # Returns
/// Single-channel cv8u matrix with values 0 or 255
pub fn canny(
    src: &Matrix,
    low_threshold: f64,
    high_threshold: f64,
    aperture: Aperture,
) -> Result<Matrix> {
    derivative_output_depth(src.depth())?;
    let (low, high) = if low_threshold > high_threshold {
        (high_threshold as f32, low_threshold as f32)
    } else {
        (low_threshold as f32, high_threshold as f32)
    };

    let planes = src.to_f32();
    let (kx, ky) = sobel_kernels(1, 0, aperture)?;
    let gx = sep_filter(planes.view(), &kx, &ky);
    let (kx, ky) = sobel_kernels(0, 1, aperture)?;
    let gy = sep_filter(planes.view(), &kx, &ky);

    let (mag, dir_x, dir_y) = strongest_gradient(&gx, &gy);
    let state = non_maximum_suppression(mag.view(), dir_x.view(), dir_y.view(), low, high);
    let edges = hysteresis(state.view());

    let (height, width) = edges.dim();
    let edges = edges.into_shape_with_order((height, width, 1))?;
    Ok(Matrix::from_data(MatData::U8(edges)))
}

/// Per-pixel L1 magnitude and gradient of the strongest channel.
fn strongest_gradient(gx: &Array3<f32>, gy: &Array3<f32>) -> (Array2<f32>, Array2<f32>, Array2<f32>) {
    let (height, width, channels) = gx.dim();
    let mut mag = Array2::<f32>::zeros((height, width));
    let mut dir_x = Array2::<f32>::zeros((height, width));
    let mut dir_y = Array2::<f32>::zeros((height, width));

    for y in 0..height {
        for x in 0..width {
            let mut best = (0.0f32, 0.0f32, 0.0f32);
            for c in 0..channels {
                let (vx, vy) = (gx[[y, x, c]], gy[[y, x, c]]);
                let m = vx.abs() + vy.abs();
                if c == 0 || m > best.0 {
                    best = (m, vx, vy);
                }
            }
            mag[[y, x]] = best.0;
            dir_x[[y, x]] = best.1;
            dir_y[[y, x]] = best.2;
        }
    }

    (mag, dir_x, dir_y)
}

/// Thin edges to one pixel and classify survivors as weak or strong.
///
/// A pixel survives when it beats the neighbour behind it along the
/// quantised gradient direction and is not beaten by the one ahead.
fn non_maximum_suppression(
    mag: ArrayView2<f32>,
    gx: ArrayView2<f32>,
    gy: ArrayView2<f32>,
    low: f32,
    high: f32,
) -> Array2<u8> {
    let (height, width) = mag.dim();
    let at = |y: isize, x: isize| -> f32 {
        if y < 0 || x < 0 || y >= height as isize || x >= width as isize {
            0.0
        } else {
            mag[[y as usize, x as usize]]
        }
    };

    let mut state = Array2::<u8>::zeros((height, width));
    par_rows(&mut state, |y, mut row| {
        for x in 0..width {
            let m = mag[[y, x]];
            if m <= low {
                continue;
            }
            let (ax, ay) = (gx[[y, x]].abs(), gy[[y, x]].abs());
            // (row, col) offsets of the two neighbours along the gradient.
            let ((ry1, rx1), (ry2, rx2)) = if ay <= ax * TAN_22_5 {
                ((0, -1), (0, 1))
            } else if ay >= ax * TAN_67_5 {
                ((-1, 0), (1, 0))
            } else if (gx[[y, x]] > 0.0) == (gy[[y, x]] > 0.0) {
                ((-1, -1), (1, 1))
            } else {
                ((1, -1), (-1, 1))
            };
            let (yi, xi) = (y as isize, x as isize);
            if m > at(yi + ry1, xi + rx1) && m >= at(yi + ry2, xi + rx2) {
                row[x] = if m > high { STRONG } else { WEAK };
            }
        }
    });
    state
}

/// Keep strong pixels and every weak pixel 8-connected to one.
fn hysteresis(state: ArrayView2<u8>) -> Array2<u8> {
    let (height, width) = state.dim();
    let mut edges = Array2::<u8>::zeros((height, width));
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for ((y, x), &s) in state.indexed_iter() {
        if s == STRONG {
            edges[[y, x]] = 255;
            stack.push((y, x));
        }
    }
    log::trace!("canny: {} strong seeds", stack.len());

    while let Some((y, x)) = stack.pop() {
        for ny in y.saturating_sub(1)..=(y + 1).min(height - 1) {
            for nx in x.saturating_sub(1)..=(x + 1).min(width - 1) {
                if state[[ny, nx]] == WEAK && edges[[ny, nx]] == 0 {
                    edges[[ny, nx]] = 255;
                    stack.push((ny, nx));
                }
            }
        }
    }

    edges
}
