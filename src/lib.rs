//! Separable filtering over strided, type-erased images.
//!
//! A separable filter is applied one dimension at a time: a 1D line filter
//! runs over every line along the first processed dimension, then over
//! every line of that result along the next dimension, and so on. This
//! crate provides the framework around the line filter; the filter itself
//! only ever sees one line at a time through a [`LineBuffer`].
//!
//! # Core API
//!
//! - [`separable`]: Run a [`SeparableLineFilter`] along selected dimensions
//! - [`SeparableOptions`] / [`SeparableOption`]: Output resizing, tensor
//!   handling and forced staging
//! - [`BoundaryCondition`]: How line margins are filled
//!
//! # Building Blocks
//!
//! - [`optimal_processing_dim`]: Cache-friendly choice of the innermost dimension
//! - [`LineIterator`]: Lines along one dimension of two images in lockstep
//! - [`copy_buffer`] / [`copy_image`]: Strided copy with type conversion
//! - [`split_evenly`]: Split the lines of an image into equal runs
//! - [`expand_shape`], [`singleton_expanded_sizes`]: Singleton expansion
//!
//! The image data model ([`Image`], [`DataType`], [`Tensor`], ...) comes from
//! `strided-image` and is re-exported here.
//!
//! # Example
//!
//! ```rust
//! use strided_separable::{
//!     separable, BoundaryCondition, DataType, Image, Result, SeparableLineFilterParams,
//!     SeparableOptions,
//! };
//!
//! // 3-pixel moving average along every dimension.
//! let data: Vec<f32> = (0..20).map(|v| v as f32).collect();
//! let input = Image::from_samples(&data, &[5, 4], 1).unwrap();
//! let mut output = Image::default();
//! let mut average = |p: SeparableLineFilterParams<'_>| -> Result<()> {
//!     for i in 0..p.in_buffer.length() as isize {
//!         let sum: f64 = (-1..=1).map(|k| p.in_buffer.get::<f64>(i + k, 0)).sum();
//!         p.out_buffer.set::<f64>(i, 0, sum / 3.0);
//!     }
//!     Ok(())
//! };
//! separable(
//!     &input,
//!     &mut output,
//!     DataType::DFloat,
//!     DataType::SFloat,
//!     &[],
//!     &[1],
//!     &[BoundaryCondition::Nearest],
//!     &mut average,
//!     SeparableOptions::empty(),
//! )
//! .unwrap();
//! assert_eq!(output.sizes(), &[5, 4]);
//! assert_eq!(output.data_type(), DataType::SFloat);
//! ```

mod boundary;
mod buffer;
mod copy;
mod dim;
mod filter;
mod iter;
mod options;
mod order;
mod separable;
mod shape;

// ============================================================================
// Image data model
// ============================================================================
pub use strided_image::{
    col_major_strides, row_major_strides, samples_as_bytes, samples_from_bytes,
    AcceptDataTypeChange, DataType, Image, ImageError, PhysicalQuantity, PixelSize, ReadFn, Sample,
    Tensor, TensorLookup, TensorShape, WriteFn,
};

// ============================================================================
// Separable driver
// ============================================================================
pub use filter::{SeparableLineFilter, SeparableLineFilterParams};
pub use options::{SeparableOption, SeparableOptions};
pub use separable::separable;

// ============================================================================
// Line buffers and boundary extension
// ============================================================================
pub use boundary::{expand_buffer, expand_line, BoundaryCondition};
pub use buffer::{input_needs_buffer, output_needs_buffer, resolve_aliasing, LineBuffer, Staging};

// ============================================================================
// Iteration, copying and shape utilities
// ============================================================================
pub use copy::{copy_buffer, copy_image, RawLine};
pub use dim::{
    optimal_processing_dim, optimal_processing_dim_with_kernel, processing_dim_for_kernel,
    processing_dim_for_layout,
};
pub use iter::{LineIterator, LinePosition};
pub use order::growth_ratios;
pub use shape::{
    expand_shape, singleton_expanded_sizes, singleton_expanded_tensor_elements, split_evenly,
};

// ============================================================================
// Constants
// ============================================================================

/// Length at or below which a dimension counts as short.
///
/// [`optimal_processing_dim`] prefers a longer dimension over a short one
/// even when the short one has the smaller stride.
pub const SMALL_IMAGE: usize = 63;

// ============================================================================
// Error types
// ============================================================================

/// Errors that can occur during separable processing.
#[derive(Debug, thiserror::Error)]
pub enum SeparableError {
    /// Error from the image data model.
    #[error(transparent)]
    Image(#[from] ImageError),

    /// Sizes cannot be matched, even with singleton expansion.
    #[error("sizes don't match: {0:?} vs {1:?}")]
    SizeMismatch(Vec<usize>, Vec<usize>),

    /// A per-dimension parameter has the wrong number of entries.
    #[error("array parameter has the wrong length: expected {expected}, found {found}")]
    ArrayLengthMismatch { expected: usize, found: usize },

    /// Dimensionalities differ, or (with `dim`) a size along that dimension.
    #[error("dimension mismatch (dim {dim:?}): {input} vs {output}")]
    DimensionMismatch {
        dim: Option<usize>,
        input: usize,
        output: usize,
    },

    /// The image has no pixel data.
    #[error("image is not forged")]
    NotAllocated,

    /// A boundary condition name was not recognized.
    #[error("unknown boundary condition: {0}")]
    UnknownBoundaryCondition(String),

    /// The line filter reported a failure.
    #[error("line filter failed: {0}")]
    LineFilter(String),
}

/// Result type for separable operations.
pub type Result<T> = std::result::Result<T, SeparableError>;
