//! Choice of the dimension to iterate innermost.
//!
//! The preferred processing dimension has the smallest stride, unless that
//! dimension is short ([`SMALL_IMAGE`] pixels or fewer) and a longer one
//! exists. Dimensions with a zero stride are never chosen over another.

use strided_image::Image;

use crate::{Result, SeparableError, SMALL_IMAGE};

/// Best processing dimension for a layout.
///
/// An empty layout returns 0.
pub fn processing_dim_for_layout(sizes: &[usize], strides: &[isize]) -> Result<usize> {
    if sizes.len() != strides.len() {
        return Err(SeparableError::ArrayLengthMismatch {
            expected: sizes.len(),
            found: strides.len(),
        });
    }
    Ok(select(sizes, strides))
}

/// Best processing dimension for a layout, given the filter's kernel sizes.
///
/// Dimensions where the kernel has size 1 are treated as having size 1, so
/// they are only picked when nothing else qualifies.
pub fn processing_dim_for_kernel(
    sizes: &[usize],
    strides: &[isize],
    kernel_sizes: &[usize],
) -> Result<usize> {
    if kernel_sizes.len() != sizes.len() {
        return Err(SeparableError::DimensionMismatch {
            dim: None,
            input: sizes.len(),
            output: kernel_sizes.len(),
        });
    }
    let sizes: Vec<usize> = sizes
        .iter()
        .zip(kernel_sizes)
        .map(|(&s, &k)| if k == 1 { 1 } else { s })
        .collect();
    processing_dim_for_layout(&sizes, strides)
}

/// Best processing dimension of a forged image.
pub fn optimal_processing_dim(image: &Image) -> Result<usize> {
    if !image.is_forged() {
        return Err(SeparableError::NotAllocated);
    }
    processing_dim_for_layout(image.sizes(), image.strides())
}

/// Best processing dimension of a forged image for a given kernel.
pub fn optimal_processing_dim_with_kernel(image: &Image, kernel_sizes: &[usize]) -> Result<usize> {
    if !image.is_forged() {
        return Err(SeparableError::NotAllocated);
    }
    processing_dim_for_kernel(image.sizes(), image.strides(), kernel_sizes)
}

fn select(sizes: &[usize], strides: &[isize]) -> usize {
    let mut best = 0;
    for ii in 1..strides.len() {
        if strides[ii] == 0 {
            continue;
        }
        let current_stride = strides[best].unsigned_abs();
        let replace = strides[best] == 0
            || (sizes[ii] > SMALL_IMAGE && strides[ii].unsigned_abs() < current_stride)
            || (sizes[best] <= SMALL_IMAGE && sizes[ii] > sizes[best]);
        if replace {
            best = ii;
        }
    }
    best
}
