//! Strided copy with type conversion.

use std::ptr;

use num_complex::Complex64;
use strided_image::{DataType, Image, ImageError, TensorLookup};

use crate::iter::LineIterator;
use crate::{optimal_processing_dim, Result, SeparableError};

/// Raw description of a strided run of pixels.
///
/// `stride` and `tensor_stride` are counted in samples of `data_type`.
#[derive(Debug, Clone, Copy)]
pub struct RawLine<P> {
    pub ptr: P,
    pub data_type: DataType,
    pub stride: isize,
    pub tensor_stride: isize,
}

impl<P> RawLine<P> {
    /// Byte offset of tensor element `tensor` of pixel `index`.
    #[inline]
    pub fn byte_offset(&self, index: isize, tensor: usize) -> isize {
        (index * self.stride + tensor as isize * self.tensor_stride) * self.data_type.size_of() as isize
    }
}

impl RawLine<*mut u8> {
    #[inline]
    pub fn as_const(self) -> RawLine<*const u8> {
        RawLine {
            ptr: self.ptr as *const u8,
            data_type: self.data_type,
            stride: self.stride,
            tensor_stride: self.tensor_stride,
        }
    }
}

/// Copy `pixels` pixels of `tensor_elements` samples from `src` to `dst`.
///
/// Destination element `t` is read from source element `lookup.source(t)`,
/// or set to zero when the lookup has no source for it. Samples are copied
/// bytewise when both types match and converted otherwise.
///
/// # Safety
/// Every addressed sample of `src` must be valid for reads and every
/// addressed sample of `dst` valid for writes. The two may overlap only if
/// each destination sample is written after all reads from it.
pub unsafe fn copy_buffer(
    src: RawLine<*const u8>,
    dst: RawLine<*mut u8>,
    pixels: usize,
    tensor_elements: usize,
    lookup: &TensorLookup,
) {
    let same_type = src.data_type == dst.data_type;
    let size = dst.data_type.size_of();
    let read = src.data_type.reader();
    let write = dst.data_type.writer();
    for p in 0..pixels as isize {
        for t in 0..tensor_elements {
            let d = dst.ptr.offset(dst.byte_offset(p, t));
            match lookup.source(t) {
                Some(st) => {
                    let s = src.ptr.offset(src.byte_offset(p, st));
                    if same_type {
                        ptr::copy(s, d, size);
                    } else {
                        write(d, read(s));
                    }
                }
                // All zero bits is zero for every sample type.
                None => ptr::write_bytes(d, 0, size),
            }
        }
    }
}

/// Copy the pixels of `src` into `dst`, converting the data type.
///
/// Both images must be forged with identical sizes and tensor element count.
pub fn copy_image(src: &Image, dst: &mut Image) -> Result<()> {
    if !src.is_forged() || !dst.is_forged() {
        return Err(SeparableError::NotAllocated);
    }
    if src.sizes() != dst.sizes() {
        return Err(SeparableError::SizeMismatch(
            src.sizes().to_vec(),
            dst.sizes().to_vec(),
        ));
    }
    if src.tensor_elements() != dst.tensor_elements() {
        return Err(ImageError::TensorSizeMismatch(src.tensor_elements(), dst.tensor_elements()).into());
    }
    let src_origin = src.origin()?;
    let dst_origin = dst.origin()?;
    let te = src.tensor_elements();

    if src.dimensionality() == 0 {
        // SAFETY: both origins address one forged pixel.
        unsafe {
            copy_buffer(
                RawLine {
                    ptr: src_origin as *const u8,
                    data_type: src.data_type(),
                    stride: 0,
                    tensor_stride: src.tensor_stride(),
                },
                RawLine {
                    ptr: dst_origin,
                    data_type: dst.data_type(),
                    stride: 0,
                    tensor_stride: dst.tensor_stride(),
                },
                1,
                te,
                &TensorLookup::Identity,
            )
        };
        return Ok(());
    }

    let dim = optimal_processing_dim(src)?;
    let length = src.size(dim);
    let src_size = src.data_type().size_of() as isize;
    let dst_size = dst.data_type().size_of() as isize;
    for line in LineIterator::new(src, dst, dim)? {
        let s = RawLine {
            ptr: src_origin.wrapping_offset(line.in_offset * src_size) as *const u8,
            data_type: src.data_type(),
            stride: src.stride(dim),
            tensor_stride: src.tensor_stride(),
        };
        let d = RawLine {
            ptr: dst_origin.wrapping_offset(line.out_offset * dst_size),
            data_type: dst.data_type(),
            stride: dst.stride(dim),
            tensor_stride: dst.tensor_stride(),
        };
        // SAFETY: the iterator only yields lines inside both images.
        unsafe { copy_buffer(s, d, length, te, &TensorLookup::Identity) };
    }
    Ok(())
}
