//! Dense 2D sample arrays with explicit depth and channel metadata.
//!
//! A [`Matrix`] owns an `ndarray::Array3` of shape `(rows, cols, channels)`,
//! the same `(height, width, channels)` layout the filters use everywhere.
//! The element type is chosen at runtime through [`Depth`]; internally the
//! buffer lives in a closed tagged variant ([`MatData`]) with one arm per
//! supported sample type, and algorithms dispatch over it once per call.
//!
//! | Depth | Rust type | Name    |
//! |-------|-----------|---------|
//! | U8    | `u8`      | `cv8u`  |
//! | I8    | `i8`      | `cv8s`  |
//! | U16   | `u16`     | `cv16u` |
//! | I16   | `i16`     | `cv16s` |
//! | I32   | `i32`     | `cv32s` |
//! | F32   | `f32`     | `cv32f` |
//! | F64   | `f64`     | `cv64f` |

use std::fmt;
use std::ops::Index;

use ndarray::{Array3, ArrayView3};

use crate::error::{Error, Result};

// ============================================================================
// Depth and sample types
// ============================================================================

/// Sample type of a matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Depth {
    U8,
    I8,
    U16,
    I16,
    I32,
    F32,
    F64,
}

impl Depth {
    pub const ALL: [Depth; 7] = [
        Depth::U8,
        Depth::I8,
        Depth::U16,
        Depth::I16,
        Depth::I32,
        Depth::F32,
        Depth::F64,
    ];

    /// Symbolic name used by the bindings (`cv8u`, `cv32f`, ...).
    pub fn name(self) -> &'static str {
        match self {
            Depth::U8 => "cv8u",
            Depth::I8 => "cv8s",
            Depth::U16 => "cv16u",
            Depth::I16 => "cv16s",
            Depth::I32 => "cv32s",
            Depth::F32 => "cv32f",
            Depth::F64 => "cv64f",
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, Depth::F32 | Depth::F64)
    }
}

impl fmt::Display for Depth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Types that can be stored in a [`Matrix`].
pub trait Sample: Copy + Default + Send + Sync + PartialOrd + 'static {
    const DEPTH: Depth;

    fn to_f64(self) -> f64;

    #[inline]
    fn to_f32(self) -> f32 {
        self.to_f64() as f32
    }

    /// Round to nearest and clamp into the representable range.
    fn saturate(v: f64) -> Self;

    fn wrap(array: Array3<Self>) -> MatData;

    fn view(data: &MatData) -> Option<ArrayView3<'_, Self>>;
}

macro_rules! impl_sample {
    ($t:ty, $depth:ident, int) => {
        impl Sample for $t {
            const DEPTH: Depth = Depth::$depth;

            #[inline]
            fn to_f64(self) -> f64 {
                self as f64
            }

            #[inline]
            fn saturate(v: f64) -> Self {
                // Float-to-int `as` saturates at the type bounds and maps NaN to 0.
                v.round() as $t
            }

            fn wrap(array: Array3<Self>) -> MatData {
                MatData::$depth(array)
            }

            fn view(data: &MatData) -> Option<ArrayView3<'_, Self>> {
                match data {
                    MatData::$depth(a) => Some(a.view()),
                    _ => None,
                }
            }
        }
    };
    ($t:ty, $depth:ident, float) => {
        impl Sample for $t {
            const DEPTH: Depth = Depth::$depth;

            #[inline]
            fn to_f64(self) -> f64 {
                self as f64
            }

            #[inline]
            fn saturate(v: f64) -> Self {
                v as $t
            }

            fn wrap(array: Array3<Self>) -> MatData {
                MatData::$depth(array)
            }

            fn view(data: &MatData) -> Option<ArrayView3<'_, Self>> {
                match data {
                    MatData::$depth(a) => Some(a.view()),
                    _ => None,
                }
            }
        }
    };
}

impl_sample!(u8, U8, int);
impl_sample!(i8, I8, int);
impl_sample!(u16, U16, int);
impl_sample!(i16, I16, int);
impl_sample!(i32, I32, int);
impl_sample!(f32, F32, float);
impl_sample!(f64, F64, float);

/// Sample buffer, one arm per depth.
#[derive(Debug, Clone, PartialEq)]
pub enum MatData {
    U8(Array3<u8>),
    I8(Array3<i8>),
    U16(Array3<u16>),
    I16(Array3<i16>),
    I32(Array3<i32>),
    F32(Array3<f32>),
    F64(Array3<f64>),
}

/// Run `$body` with `$a` bound to the typed array inside a `MatData`.
macro_rules! dispatch {
    ($data:expr, $a:ident => $body:expr) => {
        match $data {
            $crate::matrix::MatData::U8($a) => $body,
            $crate::matrix::MatData::I8($a) => $body,
            $crate::matrix::MatData::U16($a) => $body,
            $crate::matrix::MatData::I16($a) => $body,
            $crate::matrix::MatData::I32($a) => $body,
            $crate::matrix::MatData::F32($a) => $body,
            $crate::matrix::MatData::F64($a) => $body,
        }
    };
}

pub(crate) use dispatch;

// ============================================================================
// Small value types
// ============================================================================

/// Up to four per-channel values, used for pixel reads/writes and fill colors.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Scalar(pub [f64; 4]);

impl Scalar {
    pub const ZERO: Scalar = Scalar([0.0; 4]);

    pub fn new(v0: f64, v1: f64, v2: f64, v3: f64) -> Self {
        Scalar([v0, v1, v2, v3])
    }

    pub fn all(v: f64) -> Self {
        Scalar([v; 4])
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar([v, 0.0, 0.0, 0.0])
    }
}

impl Index<usize> for Scalar {
    type Output = f64;

    fn index(&self, i: usize) -> &f64 {
        &self.0[i]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Size {
    pub width: usize,
    pub height: usize,
}

impl Size {
    pub fn new(width: usize, height: usize) -> Self {
        Size { width, height }
    }
}

/// Sub-pixel 2D point.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point2f {
    pub x: f32,
    pub y: f32,
}

impl Point2f {
    pub fn new(x: f32, y: f32) -> Self {
        Point2f { x, y }
    }

    pub fn distance_sq(self, other: Point2f) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

/// Integer pixel location (x = column, y = row).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point2i {
    pub x: i32,
    pub y: i32,
}

impl Point2i {
    pub fn new(x: i32, y: i32) -> Self {
        Point2i { x, y }
    }
}

/// A detected feature location.
pub type Corner = Point2f;

// ============================================================================
// Matrix
// ============================================================================

/// Dense row-major matrix of samples.
///
/// Depth and channel count are fixed at construction. Every operation in the
/// crate returns a freshly allocated matrix; only [`Matrix::clear`],
/// [`Matrix::fill`] and [`Matrix::set`] write in place.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    data: MatData,
}

fn check_channels(channels: usize) -> Result<()> {
    if (1..=4).contains(&channels) {
        Ok(())
    } else {
        Err(Error::invalid(format!(
            "channel count must be 1..=4, got {channels}"
        )))
    }
}

impl Matrix {
    /// Create a zero-filled matrix.
    pub fn new(rows: usize, cols: usize, depth: Depth, channels: usize) -> Result<Self> {
        check_channels(channels)?;
        let shape = (rows, cols, channels);
        let data = match depth {
            Depth::U8 => MatData::U8(Array3::zeros(shape)),
            Depth::I8 => MatData::I8(Array3::zeros(shape)),
            Depth::U16 => MatData::U16(Array3::zeros(shape)),
            Depth::I16 => MatData::I16(Array3::zeros(shape)),
            Depth::I32 => MatData::I32(Array3::zeros(shape)),
            Depth::F32 => MatData::F32(Array3::zeros(shape)),
            Depth::F64 => MatData::F64(Array3::zeros(shape)),
        };
        Ok(Matrix { data })
    }

    /// Wrap an existing `(rows, cols, channels)` array.
    pub fn from_array<T: Sample>(array: Array3<T>) -> Result<Self> {
        check_channels(array.dim().2)?;
        Ok(Matrix { data: T::wrap(array) })
    }

    /// Build a matrix from a packed row-major sample vector.
    pub fn from_vec<T: Sample>(
        rows: usize,
        cols: usize,
        channels: usize,
        samples: Vec<T>,
    ) -> Result<Self> {
        check_channels(channels)?;
        let array = Array3::from_shape_vec((rows, cols, channels), samples)?;
        Ok(Matrix { data: T::wrap(array) })
    }

    /// Build a matrix by evaluating `f(row, col, channel)` for every sample.
    pub fn from_fn<F>(rows: usize, cols: usize, depth: Depth, channels: usize, mut f: F) -> Result<Self>
    where
        F: FnMut(usize, usize, usize) -> f64,
    {
        check_channels(channels)?;
        let values = Array3::from_shape_fn((rows, cols, channels), |(r, c, ch)| f(r, c, ch));
        Ok(Matrix::from_f64_array(values, depth))
    }

    pub(crate) fn from_data(data: MatData) -> Self {
        Matrix { data }
    }

    /// Convert a working plane back to `depth`, saturating integer depths.
    pub(crate) fn from_f64_array(values: Array3<f64>, depth: Depth) -> Self {
        let data = match depth {
            Depth::U8 => MatData::U8(values.mapv(u8::saturate)),
            Depth::I8 => MatData::I8(values.mapv(i8::saturate)),
            Depth::U16 => MatData::U16(values.mapv(u16::saturate)),
            Depth::I16 => MatData::I16(values.mapv(i16::saturate)),
            Depth::I32 => MatData::I32(values.mapv(i32::saturate)),
            Depth::F32 => MatData::F32(values.mapv(|v| v as f32)),
            Depth::F64 => MatData::F64(values),
        };
        Matrix { data }
    }

    pub(crate) fn from_f32_array(values: Array3<f32>, depth: Depth) -> Self {
        let data = match depth {
            Depth::U8 => MatData::U8(values.mapv(|v| u8::saturate(v as f64))),
            Depth::I8 => MatData::I8(values.mapv(|v| i8::saturate(v as f64))),
            Depth::U16 => MatData::U16(values.mapv(|v| u16::saturate(v as f64))),
            Depth::I16 => MatData::I16(values.mapv(|v| i16::saturate(v as f64))),
            Depth::I32 => MatData::I32(values.mapv(|v| i32::saturate(v as f64))),
            Depth::F32 => MatData::F32(values),
            Depth::F64 => MatData::F64(values.mapv(|v| v as f64)),
        };
        Matrix { data }
    }

    // --- Metadata ---

    #[inline]
    pub fn rows(&self) -> usize {
        dispatch!(&self.data, a => a.dim().0)
    }

    #[inline]
    pub fn cols(&self) -> usize {
        dispatch!(&self.data, a => a.dim().1)
    }

    #[inline]
    pub fn channels(&self) -> usize {
        dispatch!(&self.data, a => a.dim().2)
    }

    /// Row stride in samples.
    #[inline]
    pub fn step(&self) -> usize {
        self.cols() * self.channels()
    }

    pub fn depth(&self) -> Depth {
        match &self.data {
            MatData::U8(_) => Depth::U8,
            MatData::I8(_) => Depth::I8,
            MatData::U16(_) => Depth::U16,
            MatData::I16(_) => Depth::I16,
            MatData::I32(_) => Depth::I32,
            MatData::F32(_) => Depth::F32,
            MatData::F64(_) => Depth::F64,
        }
    }

    pub fn size(&self) -> Size {
        Size::new(self.cols(), self.rows())
    }

    pub fn data(&self) -> &MatData {
        &self.data
    }

    pub fn into_data(self) -> MatData {
        self.data
    }

    /// Typed view of the samples; `None` when `T` does not match the depth.
    pub fn as_array<T: Sample>(&self) -> Option<ArrayView3<'_, T>> {
        T::view(&self.data)
    }

    // --- Element access ---

    fn check_index(&self, row: usize, col: usize, channel: usize) -> Result<()> {
        let (rows, cols, channels) = (self.rows(), self.cols(), self.channels());
        if row < rows && col < cols && channel < channels {
            Ok(())
        } else {
            Err(Error::OutOfRange { row, col, channel, rows, cols, channels })
        }
    }

    /// Read one sample without depth conversion beyond widening to `f64`.
    pub fn get_sample(&self, row: usize, col: usize, channel: usize) -> Result<f64> {
        self.check_index(row, col, channel)?;
        Ok(dispatch!(&self.data, a => a[[row, col, channel]].to_f64()))
    }

    /// Read all channels of one element. Unused channels are zero.
    pub fn get(&self, row: usize, col: usize) -> Result<Scalar> {
        self.check_index(row, col, 0)?;
        let mut out = Scalar::ZERO;
        dispatch!(&self.data, a => {
            for (ch, v) in a.slice(ndarray::s![row, col, ..]).iter().enumerate() {
                out.0[ch] = v.to_f64();
            }
        });
        Ok(out)
    }

    /// Write all channels of one element, saturating to the matrix depth.
    pub fn set(&mut self, row: usize, col: usize, value: Scalar) -> Result<()> {
        self.check_index(row, col, 0)?;
        dispatch!(&mut self.data, a => {
            for (ch, v) in a.slice_mut(ndarray::s![row, col, ..]).iter_mut().enumerate() {
                *v = Sample::saturate(value.0[ch]);
            }
        });
        Ok(())
    }

    /// Reset every sample to zero.
    pub fn clear(&mut self) -> &mut Self {
        dispatch!(&mut self.data, a => a.fill(Default::default()));
        self
    }

    /// Set every element to `value`.
    pub fn fill(&mut self, value: Scalar) -> &mut Self {
        dispatch!(&mut self.data, a => {
            for mut px in a.lanes_mut(ndarray::Axis(2)) {
                for (ch, v) in px.iter_mut().enumerate() {
                    *v = Sample::saturate(value.0[ch]);
                }
            }
        });
        self
    }

    /// Number of samples that are not zero.
    pub fn count_non_zero(&self) -> usize {
        dispatch!(&self.data, a => a.iter().filter(|v| v.to_f64() != 0.0).count())
    }

    // --- Conversions ---

    /// Copy of the samples widened to `f32`.
    pub fn to_f32(&self) -> Array3<f32> {
        dispatch!(&self.data, a => a.mapv(|v| v.to_f32()))
    }

    /// Copy of the samples widened to `f64`.
    pub fn to_f64(&self) -> Array3<f64> {
        dispatch!(&self.data, a => a.mapv(|v| v.to_f64()))
    }

    /// `|v * scale + shift|` saturated to 8-bit unsigned.
    ///
    /// Used to visualise signed derivative output.
    pub fn convert_scale_abs(&self, scale: f64, shift: f64) -> Matrix {
        let data = dispatch!(&self.data, a => a.mapv(|v| u8::saturate((v.to_f64() * scale + shift).abs())));
        Matrix::from_data(MatData::U8(data))
    }

    /// Sample every pixel on the raster line from `pt1` to `pt2`.
    ///
    /// `connectivity` is 8 (diagonal steps allowed) or 4. The segment is
    /// clipped to the matrix first, so only in-bounds pixels are walked.
    pub fn sample_line(&self, pt1: Point2i, pt2: Point2i, connectivity: u8) -> Result<Vec<Scalar>> {
        if connectivity != 4 && connectivity != 8 {
            return Err(Error::invalid(format!(
                "connectivity must be 4 or 8, got {connectivity}"
            )));
        }
        let Some((pt1, pt2)) = clip_line(self.size(), pt1, pt2) else {
            return Ok(Vec::new());
        };

        let mut samples = Vec::new();
        let mut visit = |x: i64, y: i64| {
            if x >= 0 && y >= 0 && (x as usize) < self.cols() && (y as usize) < self.rows() {
                if let Ok(s) = self.get(y as usize, x as usize) {
                    samples.push(s);
                }
            }
        };

        let (mut x, mut y) = (pt1.x as i64, pt1.y as i64);
        let (x2, y2) = (pt2.x as i64, pt2.y as i64);
        let dx = (x2 - x).abs();
        let dy = (y2 - y).abs();
        let sx = if x2 >= x { 1 } else { -1 };
        let sy = if y2 >= y { 1 } else { -1 };

        visit(x, y);
        if connectivity == 8 {
            let mut err = dx - dy;
            while x != x2 || y != y2 {
                let e2 = 2 * err;
                if e2 > -dy {
                    err -= dy;
                    x += sx;
                }
                if e2 < dx {
                    err += dx;
                    y += sy;
                }
                visit(x, y);
            }
        } else {
            let (mut ix, mut iy) = (0i64, 0i64);
            while ix < dx || iy < dy {
                if (1 + 2 * ix) * dy < (1 + 2 * iy) * dx {
                    x += sx;
                    ix += 1;
                } else {
                    y += sy;
                    iy += 1;
                }
                visit(x, y);
            }
        }

        Ok(samples)
    }
}

/// Clip the segment `pt1`-`pt2` to `[0, cols-1] × [0, rows-1]`
/// (Liang-Barsky). `None` when nothing of it lies inside.
fn clip_line(size: Size, pt1: Point2i, pt2: Point2i) -> Option<(Point2i, Point2i)> {
    if size.width == 0 || size.height == 0 {
        return None;
    }
    let (xmax, ymax) = ((size.width - 1) as f64, (size.height - 1) as f64);
    let (x1, y1) = (pt1.x as f64, pt1.y as f64);
    let (dx, dy) = (pt2.x as f64 - x1, pt2.y as f64 - y1);

    let (mut t0, mut t1) = (0.0f64, 1.0f64);
    for (p, q) in [(-dx, x1), (dx, xmax - x1), (-dy, y1), (dy, ymax - y1)] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
        } else {
            let r = q / p;
            if p < 0.0 {
                t0 = t0.max(r);
            } else {
                t1 = t1.min(r);
            }
        }
    }
    if t0 > t1 {
        return None;
    }

    let at = |t: f64| {
        let x = (x1 + t * dx).round().clamp(0.0, xmax);
        let y = (y1 + t * dy).round().clamp(0.0, ymax);
        Point2i::new(x as i32, y as i32)
    };
    Some((at(t0), at(t1)))
}
