//! Interpolation kernels and border-aware sampling at fractional coordinates.
//!
//! Sampling always replicates the edge samples; callers that want a constant
//! border test [`is_outlier`] first and skip sampling.

use std::str::FromStr;

use ndarray::ArrayView3;

use crate::error::{Error, Result};
use crate::filters::core::clamp_index;

/// Resampling method of the warp, remap and resize operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InterpolationMode {
    /// Closest source sample.
    Nearest,
    /// Bilinear interpolation of the 2×2 neighbourhood.
    #[default]
    Linear,
    /// Cubic convolution over the 4×4 neighbourhood.
    Cubic,
    /// Box averaging for resize; bilinear for pointwise sampling.
    Area,
}

impl InterpolationMode {
    pub fn name(self) -> &'static str {
        match self {
            InterpolationMode::Nearest => "nn",
            InterpolationMode::Linear => "linear",
            InterpolationMode::Cubic => "cubic",
            InterpolationMode::Area => "area",
        }
    }
}

impl FromStr for InterpolationMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "nn" | "nearest" => Ok(InterpolationMode::Nearest),
            "linear" => Ok(InterpolationMode::Linear),
            "cubic" => Ok(InterpolationMode::Cubic),
            "area" => Ok(InterpolationMode::Area),
            _ => Err(Error::invalid(format!("unknown interpolation mode '{s}'"))),
        }
    }
}

/// Free parameter of the cubic convolution kernel.
const CUBIC_A: f64 = -0.75;

/// Weights of the taps at offsets -1, 0, 1, 2 for fractional position `t`.
pub(crate) fn cubic_weights(t: f64) -> [f64; 4] {
    let a = CUBIC_A;
    let t1 = t + 1.0;
    let u = 1.0 - t;
    let w0 = ((a * t1 - 5.0 * a) * t1 + 8.0 * a) * t1 - 4.0 * a;
    let w1 = ((a + 2.0) * t - (a + 3.0)) * t * t + 1.0;
    let w2 = ((a + 2.0) * u - (a + 3.0)) * u * u + 1.0;
    [w0, w1, w2, 1.0 - w0 - w1 - w2]
}

/// True when `(x, y)` falls outside `[0, width-1] × [0, height-1]`.
#[inline]
pub(crate) fn is_outlier(x: f64, y: f64, width: usize, height: usize) -> bool {
    !(x >= 0.0 && y >= 0.0 && x <= (width as f64 - 1.0) && y <= (height as f64 - 1.0))
}

#[inline]
fn tap(i: f64, offset: isize, len: usize) -> usize {
    // Saturating float cast keeps far-away coordinates on the border.
    clamp_index((i as isize).saturating_add(offset), len)
}

/// Sample every channel of `src` at `(x, y)`; unused channels stay zero.
///
/// A source without rows or columns has no border to replicate and samples
/// as zero.
pub(crate) fn sample_pixel(src: ArrayView3<f64>, x: f64, y: f64, mode: InterpolationMode) -> [f64; 4] {
    let (height, width, channels) = src.dim();
    let mut out = [0.0; 4];
    if height == 0 || width == 0 {
        return out;
    }

    match mode {
        InterpolationMode::Nearest => {
            let sx = tap(x.round(), 0, width);
            let sy = tap(y.round(), 0, height);
            for (c, v) in out.iter_mut().enumerate().take(channels) {
                *v = src[[sy, sx, c]];
            }
        }
        InterpolationMode::Linear | InterpolationMode::Area => {
            let (x0, y0) = (x.floor(), y.floor());
            let (fx, fy) = (x - x0, y - y0);
            let (sx0, sx1) = (tap(x0, 0, width), tap(x0, 1, width));
            let (sy0, sy1) = (tap(y0, 0, height), tap(y0, 1, height));
            for (c, v) in out.iter_mut().enumerate().take(channels) {
                let top = src[[sy0, sx0, c]] * (1.0 - fx) + src[[sy0, sx1, c]] * fx;
                let bottom = src[[sy1, sx0, c]] * (1.0 - fx) + src[[sy1, sx1, c]] * fx;
                *v = top * (1.0 - fy) + bottom * fy;
            }
        }
        InterpolationMode::Cubic => {
            let (x0, y0) = (x.floor(), y.floor());
            let wx = cubic_weights(x - x0);
            let wy = cubic_weights(y - y0);
            for (c, v) in out.iter_mut().enumerate().take(channels) {
                let mut sum = 0.0;
                for (j, &wyj) in wy.iter().enumerate() {
                    let sy = tap(y0, j as isize - 1, height);
                    let mut row = 0.0;
                    for (i, &wxi) in wx.iter().enumerate() {
                        row += src[[sy, tap(x0, i as isize - 1, width), c]] * wxi;
                    }
                    sum += row * wyj;
                }
                *v = sum;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn test_mode_names_round_trip() {
        for mode in [
            InterpolationMode::Nearest,
            InterpolationMode::Linear,
            InterpolationMode::Cubic,
            InterpolationMode::Area,
        ] {
            assert_eq!(mode.name().parse::<InterpolationMode>().unwrap(), mode);
        }
        assert_eq!(InterpolationMode::default(), InterpolationMode::Linear);
        assert!("bilinear".parse::<InterpolationMode>().is_err());
    }

    #[test]
    fn test_cubic_weights_partition_unity() {
        for &t in &[0.0, 0.25, 0.5, 0.9] {
            let w = cubic_weights(t);
            assert!((w.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        }
        let w = cubic_weights(0.0);
        assert!((w[1] - 1.0).abs() < 1e-12);
        assert!(w[0].abs() < 1e-12 && w[2].abs() < 1e-12);
    }

    #[test]
    fn test_sampling_modes() {
        let src = Array3::from_shape_fn((4, 4, 1), |(y, x, _)| (x + 10 * y) as f64);
        let v = src.view();
        assert_eq!(sample_pixel(v, 1.4, 2.6, InterpolationMode::Nearest)[0], 31.0);
        assert!((sample_pixel(v, 1.5, 2.5, InterpolationMode::Linear)[0] - 26.5).abs() < 1e-12);
        // Cubic reproduces linear ramps away from the border.
        assert!((sample_pixel(v, 1.5, 1.5, InterpolationMode::Cubic)[0] - 16.5).abs() < 1e-9);
        // Replicated border.
        assert_eq!(sample_pixel(v, -3.0, 0.0, InterpolationMode::Linear)[0], 0.0);
        assert_eq!(sample_pixel(v, 10.0, 10.0, InterpolationMode::Nearest)[0], 33.0);
    }

    #[test]
    fn test_outlier_bounds() {
        assert!(!is_outlier(0.0, 0.0, 4, 3));
        assert!(!is_outlier(3.0, 2.0, 4, 3));
        assert!(is_outlier(3.01, 0.0, 4, 3));
        assert!(is_outlier(0.0, -0.5, 4, 3));
        assert!(is_outlier(f64::NAN, 0.0, 4, 3));
    }
}
