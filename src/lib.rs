//! imgproc_core
//!
//! Image-processing primitives over a dense, typed matrix: derivative and
//! edge filters, corner detectors and geometric resampling. Python bindings
//! are available through PyO3 (feature `python`) and WASM bindings for
//! JavaScript through wasm-bindgen (feature `wasm`).
//!
//! ## Image Format
//! A [`Matrix`] holds `(rows, cols, channels)` samples of one depth:
//! - **Channels**: 1 to 4, interleaved per element
//! - **Depths**: cv8u, cv8s, cv16u, cv16s, cv32s, cv32f, cv64f
//!
//! Derivative and corner filters accept cv8u and cv32f only; resampling
//! accepts every depth and converts back with saturation.
//!
//! ## Conventions
//! - Borders replicate the edge samples unless a fill value is requested
//! - Every operation returns a new matrix and never mutates its input
//! - Optional behaviour is passed as an explicit options value with a
//!   `Default` impl ([`GoodFeaturesOptions`], [`WarpOptions`],
//!   [`SubPixCriteria`])

pub mod error;
pub mod filters;
pub mod matrix;
pub mod transform;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use error::{Error, Result};
pub use filters::core::Aperture;
pub use filters::corner::{
    corner_eigenvv, corner_harris, corner_min_eigen_val, find_corner_sub_pix,
    good_features_to_track, pre_corner_detect, GoodFeaturesOptions, SubPixCriteria,
    DEFAULT_HARRIS_K,
};
pub use filters::edge::{canny, laplace, sobel};
pub use matrix::{Corner, Depth, MatData, Matrix, Point2f, Point2i, Sample, Scalar, Size};
pub use transform::interpolate::InterpolationMode;
pub use transform::resize::resize;
pub use transform::subpix::{quadrangle_sub_pix, rect_sub_pix};
pub use transform::warp::{
    identity_maps, log_polar, remap, rotation_matrix_2d, warp_affine, warp_perspective,
    WarpFlags, WarpOptions,
};

// Python bindings (only when python feature is enabled)
#[cfg(feature = "python")]
mod python {
    use numpy::{IntoPyArray, PyReadonlyArray3};
    use pyo3::exceptions::{PyIndexError, PyRuntimeError, PyTypeError, PyValueError};
    use pyo3::prelude::*;

    use crate::error::Error;
    use crate::filters::core::Aperture;
    use crate::filters::{corner, edge};
    use crate::matrix::{dispatch, Matrix, Point2f, Scalar, Size};
    use crate::transform::warp::{WarpFlags, WarpOptions};
    use crate::transform::{resize as resize_mod, subpix, warp};

    impl From<Error> for PyErr {
        fn from(e: Error) -> PyErr {
            let msg = e.to_string();
            match e {
                Error::TypeArgument(_) => PyTypeError::new_err(msg),
                Error::InvalidArgument(_) | Error::Shape(_) => PyValueError::new_err(msg),
                Error::OutOfRange { .. } => PyIndexError::new_err(msg),
                Error::UnsupportedDepth(_) => PyRuntimeError::new_err(msg),
            }
        }
    }

    // ========================================================================
    // Array conversion
    // ========================================================================

    /// Copy a (H, W, C) numpy array of any supported dtype into a Matrix.
    fn to_matrix(image: &Bound<'_, PyAny>) -> PyResult<Matrix> {
        macro_rules! try_dtype {
            ($($t:ty),*) => {
                $(
                    if let Ok(a) = image.extract::<PyReadonlyArray3<'_, $t>>() {
                        return Ok(Matrix::from_array(a.as_array().to_owned())?);
                    }
                )*
            };
        }
        try_dtype!(u8, i8, u16, i16, i32, f32, f64);
        Err(PyTypeError::new_err(
            "expected a (height, width, channels) array of uint8, int8, uint16, int16, int32, float32 or float64",
        ))
    }

    fn to_numpy(py: Python<'_>, m: Matrix) -> PyObject {
        dispatch!(m.into_data(), a => a.into_pyarray(py).into_any().unbind())
    }

    fn scalar(values: Option<Vec<f64>>) -> Scalar {
        let mut s = Scalar::ZERO;
        for (i, v) in values.unwrap_or_default().into_iter().take(4).enumerate() {
            s.0[i] = v;
        }
        s
    }

    fn warp_options(
        interpolation: &str,
        inverse_map: bool,
        fill_outliers: bool,
        fill_value: Option<Vec<f64>>,
    ) -> PyResult<WarpOptions> {
        Ok(WarpOptions {
            interpolation: interpolation.parse()?,
            flags: WarpFlags { inverse_map, fill_outliers },
            fill_value: scalar(fill_value),
        })
    }

    fn aperture(value: Option<i32>) -> PyResult<Option<Aperture>> {
        Ok(value.map(|v: i32| Aperture::try_from(v)).transpose()?)
    }

    // ========================================================================
    // Edge Filters
    // ========================================================================

    /// Sobel derivative; uint8 input gives int16 output.
    #[pyfunction]
    #[pyo3(signature = (image, dx, dy, aperture=3))]
    pub fn sobel(py: Python<'_>, image: &Bound<'_, PyAny>, dx: usize, dy: usize, aperture: i32) -> PyResult<PyObject> {
        let m = to_matrix(image)?;
        Ok(to_numpy(py, edge::sobel(&m, dx, dy, Aperture::try_from(aperture)?)?))
    }

    #[pyfunction]
    #[pyo3(signature = (image, aperture=3))]
    pub fn laplace(py: Python<'_>, image: &Bound<'_, PyAny>, aperture: i32) -> PyResult<PyObject> {
        let m = to_matrix(image)?;
        Ok(to_numpy(py, edge::laplace(&m, Aperture::try_from(aperture)?)?))
    }

    #[pyfunction]
    #[pyo3(signature = (image, low_threshold, high_threshold, aperture=3))]
    pub fn canny(
        py: Python<'_>,
        image: &Bound<'_, PyAny>,
        low_threshold: f64,
        high_threshold: f64,
        aperture: i32,
    ) -> PyResult<PyObject> {
        let m = to_matrix(image)?;
        let result = edge::canny(&m, low_threshold, high_threshold, Aperture::try_from(aperture)?)?;
        Ok(to_numpy(py, result))
    }

    #[pyfunction]
    #[pyo3(signature = (image, scale=1.0, shift=0.0))]
    pub fn convert_scale_abs(py: Python<'_>, image: &Bound<'_, PyAny>, scale: f64, shift: f64) -> PyResult<PyObject> {
        let m = to_matrix(image)?;
        Ok(to_numpy(py, m.convert_scale_abs(scale, shift)))
    }

    // ========================================================================
    // Corner Filters
    // ========================================================================

    #[pyfunction]
    #[pyo3(signature = (image, block_size, aperture=None, k=0.04))]
    pub fn corner_harris(
        py: Python<'_>,
        image: &Bound<'_, PyAny>,
        block_size: usize,
        aperture: Option<i32>,
        k: f64,
    ) -> PyResult<PyObject> {
        let m = to_matrix(image)?;
        let ap = self::aperture(aperture)?;
        Ok(to_numpy(py, corner::corner_harris(&m, block_size, ap, k)?))
    }

    #[pyfunction]
    #[pyo3(signature = (image, block_size, aperture=None))]
    pub fn corner_min_eigen_val(
        py: Python<'_>,
        image: &Bound<'_, PyAny>,
        block_size: usize,
        aperture: Option<i32>,
    ) -> PyResult<PyObject> {
        let m = to_matrix(image)?;
        let ap = self::aperture(aperture)?;
        Ok(to_numpy(py, corner::corner_min_eigen_val(&m, block_size, ap)?))
    }

    /// Eigen decomposition, six float32 values per pixel along the columns.
    #[pyfunction]
    #[pyo3(signature = (image, block_size, aperture=None))]
    pub fn corner_eigenvv(
        py: Python<'_>,
        image: &Bound<'_, PyAny>,
        block_size: usize,
        aperture: Option<i32>,
    ) -> PyResult<PyObject> {
        let m = to_matrix(image)?;
        let ap = self::aperture(aperture)?;
        Ok(to_numpy(py, corner::corner_eigenvv(&m, block_size, ap)?))
    }

    #[pyfunction]
    #[pyo3(signature = (image, aperture=3))]
    pub fn pre_corner_detect(py: Python<'_>, image: &Bound<'_, PyAny>, aperture: i32) -> PyResult<PyObject> {
        let m = to_matrix(image)?;
        Ok(to_numpy(py, corner::pre_corner_detect(&m, Aperture::try_from(aperture)?)?))
    }

    /// Strongest corners as a list of (x, y) tuples.
    #[pyfunction]
    #[pyo3(signature = (image, quality_level, min_distance, mask=None, block_size=3, use_harris=false, k=0.04, max=None))]
    #[allow(clippy::too_many_arguments)]
    pub fn good_features_to_track(
        image: &Bound<'_, PyAny>,
        quality_level: f64,
        min_distance: f64,
        mask: Option<&Bound<'_, PyAny>>,
        block_size: usize,
        use_harris: bool,
        k: f64,
        max: Option<usize>,
    ) -> PyResult<Vec<(f32, f32)>> {
        let m = to_matrix(image)?;
        let mask = mask.map(to_matrix).transpose()?;
        let options = corner::GoodFeaturesOptions {
            mask: mask.as_ref(),
            block_size,
            use_harris,
            k,
            max,
        };
        let corners = corner::good_features_to_track(&m, quality_level, min_distance, options)?;
        Ok(corners.into_iter().map(|c| (c.x, c.y)).collect())
    }

    #[pyfunction]
    #[pyo3(signature = (image, corners, win, zero_zone=None, max_iter=20, epsilon=0.03))]
    pub fn find_corner_sub_pix(
        image: &Bound<'_, PyAny>,
        corners: Vec<(f32, f32)>,
        win: (usize, usize),
        zero_zone: Option<(usize, usize)>,
        max_iter: usize,
        epsilon: f64,
    ) -> PyResult<Vec<(f32, f32)>> {
        let m = to_matrix(image)?;
        let corners: Vec<Point2f> = corners.into_iter().map(|(x, y)| Point2f::new(x, y)).collect();
        let refined = corner::find_corner_sub_pix(
            &m,
            &corners,
            Size::new(win.0, win.1),
            zero_zone.map(|(w, h)| Size::new(w, h)),
            corner::SubPixCriteria { max_iter, epsilon },
        )?;
        Ok(refined.into_iter().map(|c| (c.x, c.y)).collect())
    }

    // ========================================================================
    // Geometric Transforms
    // ========================================================================

    /// 2x3 float32 rotation matrix as a (2, 3, 1) array.
    #[pyfunction]
    pub fn rotation_matrix_2d(py: Python<'_>, center: (f32, f32), angle: f64, scale: f64) -> PyObject {
        to_numpy(py, warp::rotation_matrix_2d(Point2f::new(center.0, center.1), angle, scale))
    }

    #[pyfunction]
    #[pyo3(signature = (image, map_matrix, interpolation="linear", inverse_map=false, fill_outliers=false, fill_value=None))]
    pub fn warp_affine(
        py: Python<'_>,
        image: &Bound<'_, PyAny>,
        map_matrix: &Bound<'_, PyAny>,
        interpolation: &str,
        inverse_map: bool,
        fill_outliers: bool,
        fill_value: Option<Vec<f64>>,
    ) -> PyResult<PyObject> {
        let m = to_matrix(image)?;
        let t = to_matrix(map_matrix).map_err(|_| PyTypeError::new_err("map_matrix must be a float array"))?;
        let options = warp_options(interpolation, inverse_map, fill_outliers, fill_value)?;
        Ok(to_numpy(py, warp::warp_affine(&m, &t, options)?))
    }

    #[pyfunction]
    #[pyo3(signature = (image, map_matrix, interpolation="linear", inverse_map=false, fill_outliers=false, fill_value=None))]
    pub fn warp_perspective(
        py: Python<'_>,
        image: &Bound<'_, PyAny>,
        map_matrix: &Bound<'_, PyAny>,
        interpolation: &str,
        inverse_map: bool,
        fill_outliers: bool,
        fill_value: Option<Vec<f64>>,
    ) -> PyResult<PyObject> {
        let m = to_matrix(image)?;
        let t = to_matrix(map_matrix).map_err(|_| PyTypeError::new_err("map_matrix must be a float array"))?;
        let options = warp_options(interpolation, inverse_map, fill_outliers, fill_value)?;
        Ok(to_numpy(py, warp::warp_perspective(&m, &t, options)?))
    }

    #[pyfunction]
    #[pyo3(signature = (image, map_x, map_y, interpolation="linear", fill_outliers=false, fill_value=None))]
    pub fn remap(
        py: Python<'_>,
        image: &Bound<'_, PyAny>,
        map_x: &Bound<'_, PyAny>,
        map_y: &Bound<'_, PyAny>,
        interpolation: &str,
        fill_outliers: bool,
        fill_value: Option<Vec<f64>>,
    ) -> PyResult<PyObject> {
        let m = to_matrix(image)?;
        let mx = to_matrix(map_x).map_err(|_| PyTypeError::new_err("map_x must be a float array"))?;
        let my = to_matrix(map_y).map_err(|_| PyTypeError::new_err("map_y must be a float array"))?;
        let options = warp_options(interpolation, false, fill_outliers, fill_value)?;
        Ok(to_numpy(py, warp::remap(&m, &mx, &my, options)?))
    }

    #[pyfunction]
    #[pyo3(signature = (image, center, magnitude, interpolation="linear", inverse_map=false, fill_outliers=false, fill_value=None))]
    #[allow(clippy::too_many_arguments)]
    pub fn log_polar(
        py: Python<'_>,
        image: &Bound<'_, PyAny>,
        center: (f32, f32),
        magnitude: f64,
        interpolation: &str,
        inverse_map: bool,
        fill_outliers: bool,
        fill_value: Option<Vec<f64>>,
    ) -> PyResult<PyObject> {
        let m = to_matrix(image)?;
        let options = warp_options(interpolation, inverse_map, fill_outliers, fill_value)?;
        let center = Point2f::new(center.0, center.1);
        Ok(to_numpy(py, warp::log_polar(&m, center, magnitude, options)?))
    }

    #[pyfunction]
    #[pyo3(signature = (image, width, height, interpolation="linear"))]
    pub fn resize(
        py: Python<'_>,
        image: &Bound<'_, PyAny>,
        width: usize,
        height: usize,
        interpolation: &str,
    ) -> PyResult<PyObject> {
        let m = to_matrix(image)?;
        let result = resize_mod::resize(&m, Size::new(width, height), interpolation.parse()?)?;
        Ok(to_numpy(py, result))
    }

    #[pyfunction]
    #[pyo3(signature = (image, center, size=None))]
    pub fn rect_sub_pix(
        py: Python<'_>,
        image: &Bound<'_, PyAny>,
        center: (f32, f32),
        size: Option<(usize, usize)>,
    ) -> PyResult<PyObject> {
        let m = to_matrix(image)?;
        let size = size.map(|(w, h)| Size::new(w, h));
        Ok(to_numpy(py, subpix::rect_sub_pix(&m, Point2f::new(center.0, center.1), size)?))
    }

    #[pyfunction]
    #[pyo3(signature = (image, map_matrix, size=None))]
    pub fn quadrangle_sub_pix(
        py: Python<'_>,
        image: &Bound<'_, PyAny>,
        map_matrix: &Bound<'_, PyAny>,
        size: Option<(usize, usize)>,
    ) -> PyResult<PyObject> {
        let m = to_matrix(image)?;
        let t = to_matrix(map_matrix).map_err(|_| PyTypeError::new_err("map_matrix must be a float array"))?;
        let size = size.map(|(w, h)| Size::new(w, h));
        Ok(to_numpy(py, subpix::quadrangle_sub_pix(&m, &t, size)?))
    }

    /// imgproc_core Python extension module
    #[pymodule]
    pub fn imgproc_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
        // Edge filters
        m.add_function(wrap_pyfunction!(sobel, m)?)?;
        m.add_function(wrap_pyfunction!(laplace, m)?)?;
        m.add_function(wrap_pyfunction!(canny, m)?)?;
        m.add_function(wrap_pyfunction!(convert_scale_abs, m)?)?;

        // Corner filters
        m.add_function(wrap_pyfunction!(corner_harris, m)?)?;
        m.add_function(wrap_pyfunction!(corner_min_eigen_val, m)?)?;
        m.add_function(wrap_pyfunction!(corner_eigenvv, m)?)?;
        m.add_function(wrap_pyfunction!(pre_corner_detect, m)?)?;
        m.add_function(wrap_pyfunction!(good_features_to_track, m)?)?;
        m.add_function(wrap_pyfunction!(find_corner_sub_pix, m)?)?;

        // Geometric transforms
        m.add_function(wrap_pyfunction!(rotation_matrix_2d, m)?)?;
        m.add_function(wrap_pyfunction!(warp_affine, m)?)?;
        m.add_function(wrap_pyfunction!(warp_perspective, m)?)?;
        m.add_function(wrap_pyfunction!(remap, m)?)?;
        m.add_function(wrap_pyfunction!(log_polar, m)?)?;
        m.add_function(wrap_pyfunction!(resize, m)?)?;
        m.add_function(wrap_pyfunction!(rect_sub_pix, m)?)?;
        m.add_function(wrap_pyfunction!(quadrangle_sub_pix, m)?)?;

        Ok(())
    }
}

#[cfg(feature = "python")]
pub use python::imgproc_core;
