//! Derivative, edge and corner filters.
//!
//! ## Supported Formats
//!
//! | Depth | Derivative output | Corner response |
//! |-------|-------------------|-----------------|
//! | cv8u  | cv16s (saturated) | cv32f, gradients scaled by 1/255 |
//! | cv32f | cv32f             | cv32f |
//!
//! Every other depth fails with `UnsupportedDepth`. Sobel, Laplacian and
//! Canny accept 1-4 channels; the corner detectors need a single channel.
//!
//! ## Architecture
//!
//! - **Replicated borders** - outputs always have the input size
//! - **f32 working planes** - inputs are widened once, results narrowed once
//! - **Row-parallel** - every pass writes whole rows on the rayon pool, so
//!   results are identical for any thread count
//!
//! ## Filter Categories
//!
//! - **Derivatives**: sobel, laplace
//! - **Edges**: canny
//! - **Corners**: corner_harris, corner_min_eigen_val, corner_eigenvv,
//!   pre_corner_detect, good_features_to_track, find_corner_sub_pix

pub mod core;
pub mod corner;
pub mod edge;
