//! Error kinds shared by every operation in the crate.
//!
//! All errors are raised synchronously by the call that detects them.
//! Outputs are only returned on success, so there is never a partially
//! written result to clean up.

use crate::matrix::Depth;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A derivative-based operator received a depth other than 8u or 32f.
    #[error("unsupported depth {0}: expected cv8u or cv32f")]
    UnsupportedDepth(Depth),

    /// A numeric parameter violates a documented constraint.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A matrix argument (transform, coordinate map, mask) has the wrong
    /// shape, depth or channel count.
    #[error("wrong argument type: {0}")]
    TypeArgument(String),

    /// Direct indexed access outside the matrix bounds.
    #[error("index ({row}, {col}, {channel}) out of range for {rows}x{cols}x{channels} matrix")]
    OutOfRange {
        row: usize,
        col: usize,
        channel: usize,
        rows: usize,
        cols: usize,
        channels: usize,
    },

    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    pub(crate) fn type_arg(msg: impl Into<String>) -> Self {
        Error::TypeArgument(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_problem() {
        let e = Error::UnsupportedDepth(Depth::I16);
        assert!(e.to_string().contains("cv16s"));

        let e = Error::OutOfRange { row: 5, col: 1, channel: 0, rows: 3, cols: 3, channels: 1 };
        assert_eq!(e.to_string(), "index (5, 1, 0) out of range for 3x3x1 matrix");

        let e = Error::invalid("max must be >= 1");
        assert!(matches!(e, Error::InvalidArgument(_)));
    }
}
