//! Corner and feature detectors built on the local structure tensor.
//!
//! ## Supported Formats
//!
//! All detectors take a single-channel matrix:
//! - **cv8u** (gradients normalised by 255)
//! - **cv32f**
//!
//! Response maps are single-channel **cv32f** of the input size.
//!
//! ## Structure tensor
//!
//! For every pixel the Sobel gradients `Ix`, `Iy` are summed over a
//! `block_size × block_size` window into `[Ixx, Ixy, Iyy]`. Gradients are
//! divided by `2^(aperture - 1) * block_size` (and 255 for cv8u) first, so the
//! response magnitude does not depend on the window or stencil size.

use std::cmp::Ordering;

use ndarray::{Array2, Array3, ArrayView3, Axis};
use rayon::prelude::*;

use super::core::{box_sum, dilate_3x3, par_rows, sep_filter, sobel_kernels, Aperture};
use crate::error::{Error, Result};
use crate::matrix::{Corner, Depth, MatData, Matrix, Point2f, Size};
use crate::transform::interpolate::{sample_pixel, InterpolationMode};

/// Harris free parameter used when the caller has no preference.
pub const DEFAULT_HARRIS_K: f64 = 0.04;

// ============================================================================
// Structure tensor
// ============================================================================

fn check_corner_input(src: &Matrix) -> Result<()> {
    match src.depth() {
        Depth::U8 | Depth::F32 => {}
        other => return Err(Error::UnsupportedDepth(other)),
    }
    if src.channels() != 1 {
        return Err(Error::invalid(format!(
            "corner detectors need a single-channel matrix, got {} channels",
            src.channels()
        )));
    }
    Ok(())
}

fn resolve_aperture(block_size: usize, aperture: Option<Aperture>) -> Result<Aperture> {
    match aperture {
        Some(a) => Ok(a),
        None => Aperture::try_from(block_size),
    }
}

/// Normalised first derivatives `(Ix, Iy)` of the single channel of `src`.
fn gradients(src: &Matrix, aperture: Aperture, scale: f32) -> Result<(Array2<f32>, Array2<f32>)> {
    let plane = src.to_f32();
    let (kx, ky) = sobel_kernels(1, 0, aperture)?;
    let dx = sep_filter(plane.view(), &kx, &ky);
    let (kx, ky) = sobel_kernels(0, 1, aperture)?;
    let dy = sep_filter(plane.view(), &kx, &ky);
    Ok((
        dx.index_axis_move(Axis(2), 0).mapv(|v| v * scale),
        dy.index_axis_move(Axis(2), 0).mapv(|v| v * scale),
    ))
}

/// Windowed `[Ixx, Ixy, Iyy]` per pixel, shape `(rows, cols, 3)`.
fn structure_tensor(src: &Matrix, block_size: usize, aperture: Aperture) -> Result<Array3<f32>> {
    check_corner_input(src)?;
    if block_size == 0 {
        return Err(Error::invalid("block_size must be >= 1"));
    }

    let mut scale = aperture.gradient_scale() * block_size as f64;
    if src.depth() == Depth::U8 {
        scale *= 255.0;
    }
    let (dx, dy) = gradients(src, aperture, (1.0 / scale) as f32)?;

    let (height, width) = dx.dim();
    let mut products = Array3::<f32>::zeros((height, width, 3));
    par_rows(&mut products, |y, mut row| {
        for x in 0..width {
            let (gx, gy) = (dx[[y, x]], dy[[y, x]]);
            row[[x, 0]] = gx * gx;
            row[[x, 1]] = gx * gy;
            row[[x, 2]] = gy * gy;
        }
    });

    Ok(box_sum(products.view(), block_size))
}

/// Map every tensor `(a, b, c)` to one response value.
fn tensor_map<F>(cov: ArrayView3<f32>, f: F) -> Array2<f32>
where
    F: Fn(f32, f32, f32) -> f32 + Sync + Send,
{
    let (height, width, _) = cov.dim();
    let mut out = Array2::<f32>::zeros((height, width));
    par_rows(&mut out, |y, mut row| {
        for x in 0..width {
            row[x] = f(cov[[y, x, 0]], cov[[y, x, 1]], cov[[y, x, 2]]);
        }
    });
    out
}

fn harris_response(cov: ArrayView3<f32>, k: f32) -> Array2<f32> {
    tensor_map(cov, |a, b, c| a * c - b * b - k * (a + c) * (a + c))
}

fn min_eigen_response(cov: ArrayView3<f32>) -> Array2<f32> {
    tensor_map(cov, |a, b, c| {
        let a = a * 0.5;
        let c = c * 0.5;
        (a + c) - ((a - c) * (a - c) + b * b).sqrt()
    })
}

/// Unit eigenvector of `[[a, b], [b, c]]` for eigenvalue `l`.
///
/// Each row of `A - lI` gives a candidate orthogonal to it; the longer one
/// is the better conditioned. Isotropic tensors have no preferred direction
/// and return `fallback`.
fn eigenvector(a: f32, b: f32, c: f32, l: f32, fallback: (f32, f32)) -> (f32, f32) {
    let (x1, y1) = (b, l - a);
    let (x2, y2) = (l - c, b);
    let n1 = x1.hypot(y1);
    let n2 = x2.hypot(y2);
    let (x, y, n) = if n1 >= n2 { (x1, y1, n1) } else { (x2, y2, n2) };
    if n > 0.0 && n.is_finite() {
        (x / n, y / n)
    } else {
        fallback
    }
}

fn eigen_decompose(a: f32, b: f32, c: f32) -> [f32; 6] {
    let half_trace = (a + c) * 0.5;
    let disc = ((a - c) * (a - c) * 0.25 + b * b).sqrt();
    let l1 = half_trace + disc;
    let l2 = half_trace - disc;
    let (x1, y1) = eigenvector(a, b, c, l1, (1.0, 0.0));
    let (x2, y2) = eigenvector(a, b, c, l2, (-y1, x1));
    [l1, l2, x1, y1, x2, y2]
}

fn response_matrix(response: Array2<f32>) -> Matrix {
    Matrix::from_data(MatData::F32(response.insert_axis(Axis(2))))
}

// ============================================================================
// Response maps
// ============================================================================

/// Harris corner response `det(M) - k * trace(M)²`.
///
/// # Arguments
/// * `src` - Single-channel cv8u or cv32f matrix
/// * `block_size` - Neighbourhood size of the structure tensor
/// * `aperture` - Sobel stencil; `None` derives it from `block_size`
/// * `k` - Harris free parameter, usually [`DEFAULT_HARRIS_K`]
pub fn corner_harris(
    src: &Matrix,
    block_size: usize,
    aperture: Option<Aperture>,
    k: f64,
) -> Result<Matrix> {
    let aperture = resolve_aperture(block_size, aperture)?;
    let cov = structure_tensor(src, block_size, aperture)?;
    Ok(response_matrix(harris_response(cov.view(), k as f32)))
}

/// Smaller eigenvalue of the structure tensor at every pixel.
pub fn corner_min_eigen_val(src: &Matrix, block_size: usize, aperture: Option<Aperture>) -> Result<Matrix> {
    let aperture = resolve_aperture(block_size, aperture)?;
    let cov = structure_tensor(src, block_size, aperture)?;
    Ok(response_matrix(min_eigen_response(cov.view())))
}

/// Eigenvalues and eigenvectors of the structure tensor.
///
/// The result is a single-channel cv32f matrix with `rows` rows and
/// `cols * 6` columns. Each pixel owns six consecutive values
/// `[λ1, λ2, x1, y1, x2, y2]` with `λ1 >= λ2` and `(x1, y1)`, `(x2, y2)`
/// the matching unit eigenvectors.
pub fn corner_eigenvv(src: &Matrix, block_size: usize, aperture: Option<Aperture>) -> Result<Matrix> {
    let aperture = resolve_aperture(block_size, aperture)?;
    let cov = structure_tensor(src, block_size, aperture)?;
    let (height, width, _) = cov.dim();

    let mut out = Array3::<f32>::zeros((height, width * 6, 1));
    par_rows(&mut out, |y, mut row| {
        for x in 0..width {
            let values = eigen_decompose(cov[[y, x, 0]], cov[[y, x, 1]], cov[[y, x, 2]]);
            for (i, v) in values.into_iter().enumerate() {
                row[[x * 6 + i, 0]] = v;
            }
        }
    });
    Ok(Matrix::from_data(MatData::F32(out)))
}

/// Corner strength from first and second derivatives:
/// `Dx² * Dyy + Dy² * Dxx - 2 * Dx * Dy * Dxy`.
///
/// Derivatives are normalised like the structure tensor, so the response of
/// cv8u input matches the same image scaled to [0, 1] in cv32f.
pub fn pre_corner_detect(src: &Matrix, aperture: Aperture) -> Result<Matrix> {
    check_corner_input(src)?;

    let mut factor = aperture.gradient_scale();
    if src.depth() == Depth::U8 {
        factor *= 255.0;
    }
    let factor = (1.0 / (factor * factor * factor)) as f32;

    let plane = src.to_f32();
    let derive = |dx: usize, dy: usize| -> Result<Array2<f32>> {
        let (kx, ky) = sobel_kernels(dx, dy, aperture)?;
        Ok(sep_filter(plane.view(), &kx, &ky).index_axis_move(Axis(2), 0))
    };
    let d1x = derive(1, 0)?;
    let d1y = derive(0, 1)?;
    let d2x = derive(2, 0)?;
    let d2y = derive(0, 2)?;
    let dxy = derive(1, 1)?;

    let (height, width) = d1x.dim();
    let mut out = Array2::<f32>::zeros((height, width));
    par_rows(&mut out, |y, mut row| {
        for x in 0..width {
            let (gx, gy) = (d1x[[y, x]], d1y[[y, x]]);
            let v = gx * gx * d2y[[y, x]] + gy * gy * d2x[[y, x]] - 2.0 * gx * gy * dxy[[y, x]];
            row[x] = v * factor;
        }
    });
    Ok(response_matrix(out))
}

// ============================================================================
// Good features to track
// ============================================================================

/// Optional knobs of [`good_features_to_track`].
#[derive(Debug, Clone, Copy)]
pub struct GoodFeaturesOptions<'a> {
    /// cv8u single-channel matrix of the input size; zero entries are skipped.
    pub mask: Option<&'a Matrix>,
    pub block_size: usize,
    /// Rank by the Harris response instead of the minimal eigenvalue.
    pub use_harris: bool,
    pub k: f64,
    /// Upper bound on returned corners; `None` means unlimited.
    pub max: Option<usize>,
}

impl Default for GoodFeaturesOptions<'_> {
    fn default() -> Self {
        Self {
            mask: None,
            block_size: 3,
            use_harris: false,
            k: DEFAULT_HARRIS_K,
            max: None,
        }
    }
}

fn check_mask(mask: &Matrix, src: &Matrix) -> Result<()> {
    if mask.depth() != Depth::U8 || mask.channels() != 1 {
        return Err(Error::type_arg(format!(
            "mask must be a single-channel cv8u matrix, got {} with {} channels",
            mask.depth(),
            mask.channels()
        )));
    }
    if mask.size() != src.size() {
        return Err(Error::type_arg(format!(
            "mask size {}x{} does not match image size {}x{}",
            mask.cols(),
            mask.rows(),
            src.cols(),
            src.rows()
        )));
    }
    Ok(())
}

/// Strong, well separated corners, strongest first.
///
/// Pixels whose response is below `quality_level` times the global maximum
/// are discarded, as are pixels that are not the maximum of their 3×3
/// neighbourhood. The survivors are sorted by descending response (ties in
/// raster order) and accepted greedily while they stay at least
/// `min_distance` away from every corner already accepted.
///
/// # Arguments
/// * `src` - Single-channel cv8u or cv32f matrix
/// * `quality_level` - Fraction of the strongest response a corner must reach
/// * `min_distance` - Minimum Euclidean distance between returned corners
/// * `options` - Mask, block size, detector choice and corner limit
pub fn good_features_to_track(
    src: &Matrix,
    quality_level: f64,
    min_distance: f64,
    options: GoodFeaturesOptions<'_>,
) -> Result<Vec<Corner>> {
    if options.max == Some(0) {
        return Err(Error::invalid("max must be >= 1"));
    }
    if quality_level.is_nan() || quality_level <= 0.0 {
        return Err(Error::invalid(format!(
            "quality_level must be positive, got {quality_level}"
        )));
    }
    if min_distance < 0.0 {
        return Err(Error::invalid(format!(
            "min_distance must be >= 0, got {min_distance}"
        )));
    }
    let mask = match options.mask {
        Some(mask) => {
            check_mask(mask, src)?;
            mask.as_array::<u8>()
        }
        None => None,
    };

    let cov = structure_tensor(src, options.block_size, Aperture::Size3)?;
    let mut response = if options.use_harris {
        harris_response(cov.view(), options.k as f32)
    } else {
        min_eigen_response(cov.view())
    };

    let max_response = response
        .axis_iter(Axis(0))
        .into_par_iter()
        .map(|row| row.iter().copied().fold(f32::NEG_INFINITY, f32::max))
        .reduce(|| f32::NEG_INFINITY, f32::max);
    let threshold = (max_response as f64 * quality_level) as f32;
    response.mapv_inplace(|v| if v >= threshold { v } else { 0.0 });
    let dilated = dilate_3x3(response.view());

    let (height, width) = response.dim();
    let rows: Vec<Vec<(f32, usize, usize)>> = (1..height.saturating_sub(1))
        .into_par_iter()
        .map(|y| {
            (1..width.saturating_sub(1))
                .filter_map(|x| {
                    let v = response[[y, x]];
                    let masked_out = mask.as_ref().is_some_and(|m| m[[y, x, 0]] == 0);
                    (v != 0.0 && v == dilated[[y, x]] && !masked_out).then_some((v, y, x))
                })
                .collect()
        })
        .collect();
    let mut candidates: Vec<(f32, usize, usize)> = rows.into_iter().flatten().collect();
    candidates.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

    let limit = options.max.unwrap_or(usize::MAX);
    let min_dist_sq = (min_distance * min_distance) as f32;
    let mut corners: Vec<Corner> = Vec::new();
    for &(_, y, x) in &candidates {
        if corners.len() >= limit {
            break;
        }
        let p = Point2f::new(x as f32, y as f32);
        if corners.iter().all(|c| c.distance_sq(p) >= min_dist_sq) {
            corners.push(p);
        }
    }

    log::debug!(
        "good_features_to_track: {} candidates above {threshold}, {} accepted",
        candidates.len(),
        corners.len()
    );
    Ok(corners)
}

// ============================================================================
// Sub-pixel refinement
// ============================================================================

/// Stop conditions of [`find_corner_sub_pix`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubPixCriteria {
    pub max_iter: usize,
    /// Stop once a step moves the corner by less than this many pixels.
    pub epsilon: f64,
}

impl Default for SubPixCriteria {
    fn default() -> Self {
        Self { max_iter: 20, epsilon: 0.03 }
    }
}

/// Refine corner locations to sub-pixel accuracy.
///
/// Every vector from the corner `q` to a point `p` of the search window is
/// orthogonal to the image gradient at `p`. Solving the weighted normal
/// equations of that condition gives the next estimate of `q`, iterated until
/// `criteria` is met.
///
/// # Arguments
/// * `src` - Single-channel cv8u or cv32f matrix
/// * `corners` - Initial integer or sub-pixel estimates
/// * `win` - Half size of the search window; the window is `2 * win + 1`
/// * `zero_zone` - Half size of a dead zone in the window centre, if any
/// * `criteria` - Iteration limit and minimal step
///
/// # Returns
/// Refined corners in input order. A corner that drifts further than `win`
/// from its start keeps its initial position, as does every corner of an
/// empty image.
pub fn find_corner_sub_pix(
    src: &Matrix,
    corners: &[Corner],
    win: Size,
    zero_zone: Option<Size>,
    criteria: SubPixCriteria,
) -> Result<Vec<Corner>> {
    check_corner_input(src)?;
    if win.width == 0 || win.height == 0 {
        return Err(Error::invalid("search window half size must be >= 1"));
    }
    if let Some(zone) = zero_zone {
        if zone.width >= win.width || zone.height >= win.height {
            return Err(Error::invalid("zero zone must be smaller than the search window"));
        }
    }
    if criteria.max_iter == 0 && criteria.epsilon <= 0.0 {
        return Err(Error::invalid("criteria need max_iter >= 1 or epsilon > 0"));
    }

    let (hw, hh) = (win.width as isize, win.height as isize);
    let (win_w, win_h) = (2 * win.width + 1, 2 * win.height + 1);

    // Gaussian-like weights, zeroed inside the dead zone.
    let mut weights = Array2::<f64>::zeros((win_h, win_w));
    for i in 0..win_h {
        let vy = (i as f64 - hh as f64) / hh as f64;
        for j in 0..win_w {
            let vx = (j as f64 - hw as f64) / hw as f64;
            weights[[i, j]] = (-(vx * vx)).exp() * (-(vy * vy)).exp();
        }
    }
    if let Some(zone) = zero_zone {
        let (zw, zh) = (zone.width as isize, zone.height as isize);
        for i in (hh - zh)..=(hh + zh) {
            for j in (hw - zw)..=(hw + zw) {
                weights[[i as usize, j as usize]] = 0.0;
            }
        }
    }

    if src.rows() == 0 || src.cols() == 0 {
        return Ok(corners.to_vec());
    }

    let plane = src.to_f64();
    let max_iter = if criteria.max_iter == 0 { 100 } else { criteria.max_iter };
    let eps_sq = criteria.epsilon.max(0.0).powi(2);
    let (rows, cols) = (src.rows() as f64, src.cols() as f64);

    let refined = corners
        .par_iter()
        .map(|&start| {
            let (sx, sy) = (start.x as f64, start.y as f64);
            let (mut cx, mut cy) = (sx, sy);

            for _ in 0..max_iter {
                let sample = |dx: isize, dy: isize| -> f64 {
                    sample_pixel(plane.view(), cx + dx as f64, cy + dy as f64, InterpolationMode::Linear)[0]
                };
                let (mut a, mut b, mut c) = (0.0, 0.0, 0.0);
                let (mut bb1, mut bb2) = (0.0, 0.0);

                for i in 0..win_h {
                    let py = i as isize - hh;
                    for j in 0..win_w {
                        let px = j as isize - hw;
                        let m = weights[[i, j]];
                        if m == 0.0 {
                            continue;
                        }
                        let tgx = sample(px + 1, py) - sample(px - 1, py);
                        let tgy = sample(px, py + 1) - sample(px, py - 1);
                        let gxx = tgx * tgx * m;
                        let gxy = tgx * tgy * m;
                        let gyy = tgy * tgy * m;
                        a += gxx;
                        b += gxy;
                        c += gyy;
                        bb1 += gxx * px as f64 + gxy * py as f64;
                        bb2 += gxy * px as f64 + gyy * py as f64;
                    }
                }

                let det = a * c - b * b;
                if det.abs() <= f64::EPSILON * f64::EPSILON {
                    break;
                }
                let scale = 1.0 / det;
                let nx = cx + c * scale * bb1 - b * scale * bb2;
                let ny = cy - b * scale * bb1 + a * scale * bb2;
                let step_sq = (nx - cx) * (nx - cx) + (ny - cy) * (ny - cy);
                cx = nx;
                cy = ny;
                if cx < 0.0 || cx >= cols || cy < 0.0 || cy >= rows || step_sq <= eps_sq {
                    break;
                }
            }

            if (cx - sx).abs() > win.width as f64 || (cy - sy).abs() > win.height as f64 {
                start
            } else {
                Point2f::new(cx as f32, cy as f32)
            }
        })
        .collect();
    Ok(refined)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `size × size` cv8u image, black with a white square on `[lo, hi]`.
    fn square_image(size: usize, lo: usize, hi: usize) -> Matrix {
        Matrix::from_fn(size, size, Depth::U8, 1, |r, c, _| {
            if (lo..=hi).contains(&r) && (lo..=hi).contains(&c) {
                255.0
            } else {
                0.0
            }
        })
        .unwrap()
    }

    fn value(m: &Matrix, p: Corner) -> f64 {
        m.get_sample(p.y as usize, p.x as usize, 0).unwrap()
    }

    #[test]
    fn test_inputs_are_validated() {
        let img = Matrix::new(8, 8, Depth::I16, 1).unwrap();
        assert!(matches!(
            corner_harris(&img, 3, None, DEFAULT_HARRIS_K),
            Err(Error::UnsupportedDepth(Depth::I16))
        ));
        let img = Matrix::new(8, 8, Depth::U8, 3).unwrap();
        assert!(matches!(
            corner_min_eigen_val(&img, 3, None),
            Err(Error::InvalidArgument(_))
        ));
        let img = Matrix::new(8, 8, Depth::U8, 1).unwrap();
        assert!(corner_harris(&img, 4, None, DEFAULT_HARRIS_K).is_err());
        assert!(corner_harris(&img, 4, Some(Aperture::Size3), DEFAULT_HARRIS_K).is_ok());
        assert!(pre_corner_detect(&img, Aperture::Scharr).is_err());
    }

    #[test]
    fn test_flat_image_has_no_response() {
        let img = Matrix::from_fn(10, 10, Depth::F32, 1, |_, _, _| 0.5).unwrap();
        let h = corner_harris(&img, 3, None, DEFAULT_HARRIS_K).unwrap();
        assert_eq!(h.depth(), Depth::F32);
        assert_eq!(h.count_non_zero(), 0);
        let corners = good_features_to_track(&img, 0.1, 1.0, GoodFeaturesOptions::default()).unwrap();
        assert!(corners.is_empty());
    }

    #[test]
    fn test_min_eigen_val_peaks_at_corner_not_edge() {
        let img = square_image(30, 10, 19);
        let r = corner_min_eigen_val(&img, 3, None).unwrap();
        let corner = r.get_sample(10, 10, 0).unwrap();
        let edge = r.get_sample(15, 10, 0).unwrap();
        let flat = r.get_sample(3, 3, 0).unwrap();
        assert!(corner > 0.0);
        assert!(edge.abs() < 1e-6);
        assert_eq!(flat, 0.0);
    }

    #[test]
    fn test_harris_sign_on_edge_and_corner() {
        let img = square_image(30, 10, 19);
        let r = corner_harris(&img, 3, None, DEFAULT_HARRIS_K).unwrap();
        assert!(r.get_sample(10, 10, 0).unwrap() > 0.0);
        // Straight edges have one dominant eigenvalue, so det ≈ 0 and trace > 0.
        assert!(r.get_sample(15, 10, 0).unwrap() < 0.0);
    }

    #[test]
    fn test_u8_and_unit_f32_agree() {
        let img = square_image(20, 6, 13);
        let unit = Matrix::from_fn(20, 20, Depth::F32, 1, |r, c, _| {
            img.get_sample(r, c, 0).unwrap() / 255.0
        })
        .unwrap();
        let a = corner_min_eigen_val(&img, 3, None).unwrap();
        let b = corner_min_eigen_val(&unit, 3, None).unwrap();
        for r in 0..20 {
            for c in 0..20 {
                let (va, vb) = (a.get_sample(r, c, 0).unwrap(), b.get_sample(r, c, 0).unwrap());
                assert!((va - vb).abs() < 1e-5, "({r}, {c}): {va} vs {vb}");
            }
        }
    }

    #[test]
    fn test_eigenvv_layout_and_consistency() {
        let img = square_image(20, 6, 13);
        let vv = corner_eigenvv(&img, 3, None).unwrap();
        assert_eq!((vv.rows(), vv.cols(), vv.channels()), (20, 120, 1));

        let min_eig = corner_min_eigen_val(&img, 3, None).unwrap();
        for &(r, c) in &[(6usize, 6usize), (10, 6), (2, 2)] {
            let l1 = vv.get_sample(r, c * 6, 0).unwrap();
            let l2 = vv.get_sample(r, c * 6 + 1, 0).unwrap();
            assert!(l1 >= l2);
            let (x1, y1) = (vv.get_sample(r, c * 6 + 2, 0).unwrap(), vv.get_sample(r, c * 6 + 3, 0).unwrap());
            let (x2, y2) = (vv.get_sample(r, c * 6 + 4, 0).unwrap(), vv.get_sample(r, c * 6 + 5, 0).unwrap());
            assert!((x1.hypot(y1) - 1.0).abs() < 1e-4);
            assert!((x2.hypot(y2) - 1.0).abs() < 1e-4);
            assert!((x1 * x2 + y1 * y2).abs() < 1e-3);
            let m = min_eig.get_sample(r, c, 0).unwrap();
            assert!((l2 - m).abs() < 1e-5);
        }
    }

    #[test]
    fn test_eigenvectors_on_vertical_edge() {
        // Gradient along x only: dominant direction is the x axis.
        let [l1, l2, x1, y1, _, _] = eigen_decompose(4.0, 0.0, 0.0);
        assert_eq!((l1, l2), (4.0, 0.0));
        assert!((x1.abs() - 1.0).abs() < 1e-6 && y1.abs() < 1e-6);
        let [_, _, x1, y1, x2, y2] = eigen_decompose(0.0, 0.0, 0.0);
        assert_eq!((x1, y1, x2, y2), (1.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn test_pre_corner_detect_flat_and_shape() {
        let img = square_image(16, 4, 11);
        let out = pre_corner_detect(&img, Aperture::Size3).unwrap();
        assert_eq!((out.rows(), out.cols(), out.depth()), (16, 16, Depth::F32));
        assert_eq!(out.get_sample(0, 0, 0).unwrap(), 0.0);
        assert!(out.get_sample(4, 4, 0).unwrap().abs() > 0.0);
    }

    #[test]
    fn test_good_features_find_square_corners() {
        let img = square_image(30, 10, 19);
        let corners = good_features_to_track(&img, 0.1, 8.0, GoodFeaturesOptions::default()).unwrap();

        // Equal responses keep raster order.
        let expected = vec![
            Point2f::new(10.0, 10.0),
            Point2f::new(19.0, 10.0),
            Point2f::new(10.0, 19.0),
            Point2f::new(19.0, 19.0),
        ];
        assert_eq!(corners, expected);
        for (i, a) in corners.iter().enumerate() {
            for b in &corners[i + 1..] {
                assert!(a.distance_sq(*b) >= 64.0);
            }
        }

        let response = corner_min_eigen_val(&img, 3, None).unwrap();
        for pair in corners.windows(2) {
            assert!(value(&response, pair[0]) >= value(&response, pair[1]));
        }
    }

    #[test]
    fn test_good_features_full_quality_keeps_strongest() {
        let img = square_image(30, 10, 19);
        let all = good_features_to_track(&img, 0.1, 8.0, GoodFeaturesOptions::default()).unwrap();
        let strongest = good_features_to_track(&img, 1.0, 8.0, GoodFeaturesOptions::default()).unwrap();
        assert!(!strongest.is_empty());
        assert_eq!(strongest[0], all[0]);

        let response = corner_min_eigen_val(&img, 3, None).unwrap();
        let top = value(&response, all[0]);
        assert!(strongest.iter().all(|&c| value(&response, c) == top));
    }

    #[test]
    fn test_good_features_max_and_mask() {
        let img = square_image(30, 10, 19);
        let all = good_features_to_track(&img, 0.1, 8.0, GoodFeaturesOptions::default()).unwrap();

        let one = good_features_to_track(
            &img,
            0.1,
            8.0,
            GoodFeaturesOptions { max: Some(1), ..Default::default() },
        )
        .unwrap();
        assert_eq!(one, vec![all[0]]);

        let zero = good_features_to_track(
            &img,
            0.1,
            8.0,
            GoodFeaturesOptions { max: Some(0), ..Default::default() },
        );
        assert!(matches!(zero, Err(Error::InvalidArgument(_))));

        let mask = Matrix::from_fn(30, 30, Depth::U8, 1, |r, c, _| {
            if r < 15 && c < 15 { 1.0 } else { 0.0 }
        })
        .unwrap();
        let masked = good_features_to_track(
            &img,
            0.1,
            8.0,
            GoodFeaturesOptions { mask: Some(&mask), ..Default::default() },
        )
        .unwrap();
        assert_eq!(masked.len(), 1);
        assert!(all.contains(&masked[0]));

        let bad_mask = Matrix::new(30, 30, Depth::F32, 1).unwrap();
        let err = good_features_to_track(
            &img,
            0.1,
            8.0,
            GoodFeaturesOptions { mask: Some(&bad_mask), ..Default::default() },
        );
        assert!(matches!(err, Err(Error::TypeArgument(_))));
    }

    #[test]
    fn test_good_features_harris_and_determinism() {
        let img = square_image(30, 10, 19);
        let opts = GoodFeaturesOptions { use_harris: true, ..Default::default() };
        let a = good_features_to_track(&img, 0.1, 8.0, opts).unwrap();
        let b = good_features_to_track(&img, 0.1, 8.0, opts).unwrap();
        assert!(!a.is_empty());
        assert_eq!(a, b);
    }

    #[test]
    fn test_sub_pix_moves_towards_true_corner() {
        // White quadrant from pixel 10 on: the corner sits at (9.5, 9.5).
        let img = Matrix::from_fn(21, 21, Depth::F32, 1, |r, c, _| {
            if r >= 10 && c >= 10 { 1.0 } else { 0.0 }
        })
        .unwrap();
        let refined = find_corner_sub_pix(
            &img,
            &[Point2f::new(9.0, 9.0)],
            Size::new(3, 3),
            None,
            SubPixCriteria::default(),
        )
        .unwrap();
        assert_eq!(refined.len(), 1);
        assert!((refined[0].x - 9.5).abs() < 0.25, "{:?}", refined[0]);
        assert!((refined[0].y - 9.5).abs() < 0.25, "{:?}", refined[0]);
    }

    #[test]
    fn test_sub_pix_keeps_corner_on_flat_image() {
        let img = Matrix::new(12, 12, Depth::U8, 1).unwrap();
        let start = Point2f::new(5.0, 6.0);
        let refined =
            find_corner_sub_pix(&img, &[start], Size::new(2, 2), None, SubPixCriteria::default()).unwrap();
        assert_eq!(refined, vec![start]);

        assert!(find_corner_sub_pix(
            &img,
            &[start],
            Size::new(2, 2),
            Some(Size::new(2, 1)),
            SubPixCriteria::default()
        )
        .is_err());
    }

    #[test]
    fn test_sub_pix_on_empty_image_keeps_corners() {
        let img = Matrix::new(0, 0, Depth::F32, 1).unwrap();
        let corners = [Point2f::new(0.0, 0.0), Point2f::new(3.5, 1.0)];
        let refined =
            find_corner_sub_pix(&img, &corners, Size::new(2, 2), None, SubPixCriteria::default()).unwrap();
        assert_eq!(refined, corners.to_vec());
    }
}
