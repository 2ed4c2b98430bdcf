//! Type-erased strided image descriptors.
//!
//! This crate provides the array data model consumed by the separable
//! framework in `strided-separable`: an N-dimensional grid of pixels, where
//! each pixel is a short vector ("tensor") of samples.
//!
//! # Core Types
//!
//! - [`Image`]: Dynamic-rank image header over reference-counted storage.
//!   Cloning an image shares its pixel data; [`Image::copy`] duplicates it.
//! - [`DataType`] / [`Sample`]: Runtime element type tag and the Rust types
//!   that implement it.
//! - [`Tensor`] / [`TensorShape`]: Per-pixel vector layout, including the
//!   compact symmetric, diagonal and triangular matrix forms.
//! - [`TensorLookup`]: Mapping from a full matrix layout to compact storage.
//! - [`PixelSize`] / [`PhysicalQuantity`]: Physical units per dimension.
//!
//! # Metadata Transformations
//!
//! These operate only on sizes/strides/origin and never touch pixel data:
//! - [`Image::quick_copy`]: Header copy sharing the same storage
//! - [`Image::tensor_to_spatial`]: Fold the tensor into a spatial dimension
//! - [`Image::window`]: Leading sub-region with the same strides
//!
//! # Example
//!
//! ```rust
//! use strided_image::{DataType, Image};
//!
//! let mut img = Image::new(&[4, 3], 1, DataType::DFloat).unwrap();
//! img.set::<f64>(&[2, 1], 0, 5.0);
//! assert_eq!(img.get::<f64>(&[2, 1], 0), 5.0);
//! assert_eq!(img.strides(), &[1, 4]);
//!
//! let view = img.quick_copy();
//! assert!(view.same_origin(&img));
//! ```

mod data_type;
pub mod image;
mod pixel_size;
mod pod;
mod tensor;

// ============================================================================
// Element types
// ============================================================================
pub use data_type::{DataType, ReadFn, Sample, WriteFn};

// ============================================================================
// Image types and utilities
// ============================================================================
pub use image::{col_major_strides, row_major_strides, AcceptDataTypeChange, Image};
pub use pixel_size::{PhysicalQuantity, PixelSize};
pub use pod::{samples_as_bytes, samples_from_bytes};
pub use tensor::{Tensor, TensorLookup, TensorShape};

// ============================================================================
// Error types
// ============================================================================

/// Errors that can occur while manipulating image headers and storage.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    /// The image has no pixel data allocated.
    #[error("image is not forged")]
    NotForged,

    /// Image sizes are incompatible for the operation.
    #[error("sizes don't match: {0:?} vs {1:?}")]
    SizeMismatch(Vec<usize>, Vec<usize>),

    /// Image dimensionalities do not match.
    #[error("dimensionalities don't match: {0} vs {1}")]
    DimensionMismatch(usize, usize),

    /// Stride array length doesn't match sizes.
    #[error("stride and sizes length mismatch")]
    StrideLengthMismatch,

    /// Invalid axis index for the given image dimensionality.
    #[error("invalid axis {axis} for dimensionality {rank}")]
    InvalidAxis { axis: usize, rank: usize },

    /// Integer overflow while computing an offset or allocation size.
    #[error("offset overflow while computing pointer")]
    OffsetOverflow,

    /// A typed access used a type different from the image's data type.
    #[error("data type mismatch: expected {expected}, found {found}")]
    DataTypeMismatch { expected: DataType, found: DataType },

    /// Tensor element counts are incompatible.
    #[error("number of tensor elements doesn't match: {0} vs {1}")]
    TensorSizeMismatch(usize, usize),

    /// The image is protected against stripping or reforging.
    #[error("image is protected")]
    Protected,

    /// A sample buffer has the wrong number of elements.
    #[error("buffer length mismatch: expected {expected}, found {found}")]
    BufferLength { expected: usize, found: usize },
}

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, ImageError>;
