//! Core utilities shared by the derivative and corner filters.
//!
//! This module provides:
//! - Sobel / Scharr / Laplacian stencil generation
//! - Separable and dense 2D correlation with replicated borders
//! - Unnormalised box sums and 3×3 grey dilation
//! - The row-parallel loop every filter is written against

use ndarray::parallel::prelude::*;
use ndarray::{Array, Array2, Array3, ArrayView2, ArrayView3, ArrayViewMut, Axis, RemoveAxis};

use crate::error::{Error, Result};
use crate::matrix::Depth;

// ============================================================================
// Apertures
// ============================================================================

/// Derivative stencil selector.
///
/// `Size1` is the unsmoothed stencil (three taps along the derivative axis,
/// one tap across it). `Scharr` is the sharpened 3×3 variant, valid for
/// first derivatives only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Aperture {
    Scharr,
    Size1,
    #[default]
    Size3,
    Size5,
    Size7,
}

impl Aperture {
    /// Nominal aperture value; `Scharr` reports -1.
    pub fn value(self) -> i32 {
        match self {
            Aperture::Scharr => -1,
            Aperture::Size1 => 1,
            Aperture::Size3 => 3,
            Aperture::Size5 => 5,
            Aperture::Size7 => 7,
        }
    }

    /// Gain of the first-derivative stencil, `2^(size - 1)`.
    ///
    /// The corner filters divide gradients by this so responses do not grow
    /// with the aperture. Scharr counts as a size-3 stencil with twice the gain.
    pub(crate) fn gradient_scale(self) -> f64 {
        match self {
            Aperture::Scharr => 8.0,
            other => (1u32 << (other.value() - 1)) as f64,
        }
    }
}

impl TryFrom<i32> for Aperture {
    type Error = Error;

    fn try_from(v: i32) -> Result<Self> {
        match v {
            -1 => Ok(Aperture::Scharr),
            1 => Ok(Aperture::Size1),
            3 => Ok(Aperture::Size3),
            5 => Ok(Aperture::Size5),
            7 => Ok(Aperture::Size7),
            _ => Err(Error::invalid(format!(
                "aperture must be one of -1, 1, 3, 5, 7; got {v}"
            ))),
        }
    }
}

impl TryFrom<usize> for Aperture {
    type Error = Error;

    fn try_from(v: usize) -> Result<Self> {
        i32::try_from(v)
            .map_err(|_| Error::invalid(format!("aperture {v} is too large")))
            .and_then(|v: i32| Aperture::try_from(v))
    }
}

// ============================================================================
// Stencils
// ============================================================================

fn poly_mul(a: &[i32], b: &[i32]) -> Vec<i32> {
    let mut out = vec![0; a.len() + b.len() - 1];
    for (i, &x) in a.iter().enumerate() {
        for (j, &y) in b.iter().enumerate() {
            out[i + j] += x * y;
        }
    }
    out
}

/// 1D stencil for a derivative of `order` (0 = smoothing) at `aperture`.
///
/// Sizes 3, 5 and 7 are built from binomial smoothing `[1, 1]` followed by
/// `order` differences `[-1, 1]`, giving the classic Sobel family
/// (`[1, 2, 1]`, `[-1, 0, 1]`, `[1, -2, 1]` for size 3).
pub(crate) fn deriv_kernel(order: usize, aperture: Aperture) -> Result<Vec<f32>> {
    let taps: Vec<i32> = match aperture {
        Aperture::Scharr => match order {
            0 => vec![3, 10, 3],
            1 => vec![-1, 0, 1],
            _ => {
                return Err(Error::invalid(
                    "Scharr aperture supports first derivatives only",
                ))
            }
        },
        Aperture::Size1 => match order {
            0 => vec![1],
            // Forward difference f(x+1) - f(x), centred in a three-tap window.
            1 => vec![0, -1, 1],
            2 => vec![1, -2, 1],
            _ => {
                return Err(Error::invalid(format!(
                    "derivative order {order} too large for aperture 1"
                )))
            }
        },
        _ => {
            let size = aperture.value() as usize;
            if order >= size {
                return Err(Error::invalid(format!(
                    "derivative order {order} too large for aperture {size}"
                )));
            }
            let mut k = vec![1];
            for _ in 0..size - order - 1 {
                k = poly_mul(&k, &[1, 1]);
            }
            for _ in 0..order {
                k = poly_mul(&k, &[-1, 1]);
            }
            k
        }
    };
    Ok(taps.into_iter().map(|v| v as f32).collect())
}

/// Column (`kx`) and row (`ky`) stencils for a `(dx, dy)` derivative.
pub(crate) fn sobel_kernels(dx: usize, dy: usize, aperture: Aperture) -> Result<(Vec<f32>, Vec<f32>)> {
    if dx + dy == 0 {
        return Err(Error::invalid("at least one of dx, dy must be positive"));
    }
    if aperture == Aperture::Scharr && dx + dy != 1 {
        return Err(Error::invalid(
            "Scharr aperture requires (dx, dy) of (1, 0) or (0, 1)",
        ));
    }
    Ok((deriv_kernel(dx, aperture)?, deriv_kernel(dy, aperture)?))
}

/// Combined second-derivative stencil `d²/dx² + d²/dy²`.
pub(crate) fn laplacian_kernel(aperture: Aperture) -> Result<Array2<f32>> {
    match aperture {
        Aperture::Scharr => Err(Error::invalid("Laplacian does not support the Scharr aperture")),
        Aperture::Size1 => Ok(ndarray::arr2(&[
            [0.0, 1.0, 0.0],
            [1.0, -4.0, 1.0],
            [0.0, 1.0, 0.0],
        ])),
        _ => {
            let d2 = deriv_kernel(2, aperture)?;
            let s = deriv_kernel(0, aperture)?;
            let n = d2.len();
            Ok(Array2::from_shape_fn((n, n), |(i, j)| d2[j] * s[i] + s[j] * d2[i]))
        }
    }
}

/// Output depth of derivative filters: 8u → 16s, 32f → 32f.
pub(crate) fn derivative_output_depth(depth: Depth) -> Result<Depth> {
    match depth {
        Depth::U8 => Ok(Depth::I16),
        Depth::F32 => Ok(Depth::F32),
        other => Err(Error::UnsupportedDepth(other)),
    }
}

// ============================================================================
// Correlation
// ============================================================================

#[inline]
pub(crate) fn clamp_index(i: isize, len: usize) -> usize {
    i.clamp(0, len as isize - 1) as usize
}

/// Run `f(row_index, row)` for every row of `out` on the rayon pool.
///
/// Each row is written by exactly one task, so results do not depend on
/// the number of threads.
pub(crate) fn par_rows<A, D, F>(out: &mut Array<A, D>, f: F)
where
    A: Send + Sync,
    D: RemoveAxis,
    F: Fn(usize, ArrayViewMut<'_, A, D::Smaller>) + Sync + Send,
{
    out.axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(y, row)| f(y, row));
}

/// Correlate every channel with `kx` along columns, then `ky` along rows.
///
/// Stencils are anchored at `len / 2`; borders replicate the edge samples,
/// so the output has the input size.
pub(crate) fn sep_filter(src: ArrayView3<f32>, kx: &[f32], ky: &[f32]) -> Array3<f32> {
    let (height, width, channels) = src.dim();
    let half_x = (kx.len() / 2) as isize;
    let half_y = (ky.len() / 2) as isize;

    // Horizontal pass
    let mut temp = Array3::<f32>::zeros((height, width, channels));
    par_rows(&mut temp, |y, mut row| {
        for x in 0..width {
            for c in 0..channels {
                let mut sum = 0.0f32;
                for (ki, &kv) in kx.iter().enumerate() {
                    let sx = clamp_index(x as isize + ki as isize - half_x, width);
                    sum += src[[y, sx, c]] * kv;
                }
                row[[x, c]] = sum;
            }
        }
    });

    // Vertical pass
    let mut result = Array3::<f32>::zeros((height, width, channels));
    par_rows(&mut result, |y, mut row| {
        for x in 0..width {
            for c in 0..channels {
                let mut sum = 0.0f32;
                for (ki, &kv) in ky.iter().enumerate() {
                    let sy = clamp_index(y as isize + ki as isize - half_y, height);
                    sum += temp[[sy, x, c]] * kv;
                }
                row[[x, c]] = sum;
            }
        }
    });

    result
}

/// Dense 2D correlation of every channel with `kernel`, replicated borders.
pub(crate) fn filter_2d(src: ArrayView3<f32>, kernel: ArrayView2<f32>) -> Array3<f32> {
    let (height, width, channels) = src.dim();
    let (kh, kw) = kernel.dim();
    let (half_y, half_x) = ((kh / 2) as isize, (kw / 2) as isize);

    let mut result = Array3::<f32>::zeros((height, width, channels));
    par_rows(&mut result, |y, mut row| {
        for x in 0..width {
            for c in 0..channels {
                let mut sum = 0.0f32;
                for ky in 0..kh {
                    let sy = clamp_index(y as isize + ky as isize - half_y, height);
                    for kx in 0..kw {
                        let kv = kernel[[ky, kx]];
                        if kv == 0.0 {
                            continue;
                        }
                        let sx = clamp_index(x as isize + kx as isize - half_x, width);
                        sum += src[[sy, sx, c]] * kv;
                    }
                }
                row[[x, c]] = sum;
            }
        }
    });
    result
}

/// Unnormalised `block × block` neighbourhood sum of every channel.
pub(crate) fn box_sum(src: ArrayView3<f32>, block: usize) -> Array3<f32> {
    let ones = vec![1.0f32; block.max(1)];
    sep_filter(src, &ones, &ones)
}

/// 3×3 grey dilation (neighbourhood maximum) of a single plane.
pub(crate) fn dilate_3x3(src: ArrayView2<f32>) -> Array2<f32> {
    let (height, width) = src.dim();
    let mut result = Array2::<f32>::zeros((height, width));
    par_rows(&mut result, |y, mut row| {
        for x in 0..width {
            let mut max_val = f32::NEG_INFINITY;
            for dy in -1..=1isize {
                let sy = y as isize + dy;
                if sy < 0 || sy >= height as isize {
                    continue;
                }
                for dx in -1..=1isize {
                    let sx = x as isize + dx;
                    if sx < 0 || sx >= width as isize {
                        continue;
                    }
                    max_val = max_val.max(src[[sy as usize, sx as usize]]);
                }
            }
            row[x] = max_val;
        }
    });
    result
}
