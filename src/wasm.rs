//! WebAssembly exports for the image-processing core.
//!
//! These functions are exposed to JavaScript via wasm-bindgen.
//!
//! ## Data Layout
//!
//! Every export takes a flat 8-bit grayscale buffer (`width * height`
//! bytes, row-major), which is what a canvas luminance plane reduces to.
//! Errors surface as JavaScript exceptions carrying the error message.

use wasm_bindgen::prelude::*;

use crate::error::Error;
use crate::filters::core::Aperture;
use crate::filters::corner::{good_features_to_track, GoodFeaturesOptions};
use crate::filters::edge::{canny, sobel};
use crate::matrix::{Matrix, Size};
use crate::transform::interpolate::InterpolationMode;
use crate::transform::resize::resize;

fn js_err(e: Error) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn gray_matrix(data: &[u8], width: usize, height: usize) -> Result<Matrix, JsValue> {
    Matrix::from_vec(height, width, 1, data.to_vec()).map_err(js_err)
}

/// Row-major bytes of a cv8u matrix.
fn to_bytes(m: &Matrix) -> Vec<u8> {
    m.as_array::<u8>()
        .map(|a| a.iter().copied().collect())
        .unwrap_or_default()
}

// ============================================================================
// Edge Filters
// ============================================================================

/// Sobel derivative rendered as `|d|` clamped to 0-255.
///
/// # Arguments
/// * `data` - Flat grayscale bytes (length = width * height)
/// * `width` - Image width in pixels
/// * `height` - Image height in pixels
/// * `dx`, `dy` - Derivative orders along x and y
/// * `aperture` - -1 (Scharr), 1, 3, 5 or 7
#[wasm_bindgen]
pub fn sobel_wasm(
    data: &[u8],
    width: usize,
    height: usize,
    dx: usize,
    dy: usize,
    aperture: i32,
) -> Result<Vec<u8>, JsValue> {
    let src = gray_matrix(data, width, height)?;
    let aperture = Aperture::try_from(aperture).map_err(js_err)?;
    let derivative = sobel(&src, dx, dy, aperture).map_err(js_err)?;
    Ok(to_bytes(&derivative.convert_scale_abs(1.0, 0.0)))
}

/// Canny edge map, 255 on edges and 0 elsewhere.
#[wasm_bindgen]
pub fn canny_wasm(
    data: &[u8],
    width: usize,
    height: usize,
    low_threshold: f64,
    high_threshold: f64,
) -> Result<Vec<u8>, JsValue> {
    let src = gray_matrix(data, width, height)?;
    let edges = canny(&src, low_threshold, high_threshold, Aperture::default()).map_err(js_err)?;
    Ok(to_bytes(&edges))
}

// ============================================================================
// Features and Resampling
// ============================================================================

/// Strongest corners as a flat `[x0, y0, x1, y1, ...]` array.
#[wasm_bindgen]
pub fn good_features_wasm(
    data: &[u8],
    width: usize,
    height: usize,
    quality_level: f64,
    min_distance: f64,
    max_corners: usize,
) -> Result<Vec<f32>, JsValue> {
    let src = gray_matrix(data, width, height)?;
    let options = GoodFeaturesOptions {
        max: (max_corners > 0).then_some(max_corners),
        ..Default::default()
    };
    let corners = good_features_to_track(&src, quality_level, min_distance, options).map_err(js_err)?;
    Ok(corners.into_iter().flat_map(|c| [c.x, c.y]).collect())
}

/// Resize with `mode` one of "nn", "linear", "cubic", "area".
#[wasm_bindgen]
pub fn resize_wasm(
    data: &[u8],
    width: usize,
    height: usize,
    new_width: usize,
    new_height: usize,
    mode: &str,
) -> Result<Vec<u8>, JsValue> {
    let src = gray_matrix(data, width, height)?;
    let mode: InterpolationMode = mode.parse().map_err(js_err)?;
    let resized = resize(&src, Size::new(new_width, new_height), mode).map_err(js_err)?;
    Ok(to_bytes(&resized))
}
