//! Geometric resampling: warps, coordinate remapping, resizing and
//! sub-pixel patch extraction.
//!
//! ## Supported Formats
//!
//! Every depth and 1-4 channels. Sampling runs on an `f64` working copy and
//! results are converted back to the input depth with saturation.
//!
//! Transform matrices (2×3 affine, 3×3 perspective) and coordinate maps are
//! single-channel cv32f or cv64f matrices; anything else is a
//! `TypeArgument` error.

pub mod interpolate;
pub mod resize;
pub mod subpix;
pub mod warp;

use crate::error::{Error, Result};
use crate::matrix::Matrix;

/// Coefficients of a `rows × cols` transform matrix in row-major order.
pub(crate) fn transform_coeffs(m: &Matrix, rows: usize, cols: usize) -> Result<Vec<f64>> {
    if !m.depth().is_float() || m.channels() != 1 || m.rows() != rows || m.cols() != cols {
        return Err(Error::type_arg(format!(
            "transform must be a {rows}x{cols} single-channel float matrix, got {}x{} {} with {} channels",
            m.rows(),
            m.cols(),
            m.depth(),
            m.channels()
        )));
    }
    Ok(m.to_f64().iter().copied().collect())
}
