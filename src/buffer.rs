//! Line buffers handed to the line filter, and the decision to stage them.
//!
//! A [`LineBuffer`] either points straight into an image ("direct") or into
//! a contiguous scratch area owned by a [`BufferStorage`] ("staged"). Staged
//! input lines are tensor-interleaved (`stride == tensor_length`,
//! `tensor_stride == 1`) and may carry a margin on both sides.

use strided_image::{DataType, Sample, TensorLookup};

use crate::copy::RawLine;
use crate::{SeparableOption, SeparableOptions};

// ============================================================================
// Staging decisions
// ============================================================================

/// Which sides of a pass go through a scratch line buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Staging {
    pub input: bool,
    pub output: bool,
}

/// Whether input lines must be copied into a scratch buffer.
///
/// Needed when the stored type differs from the working type, when the
/// tensor is remapped, when a margin is requested, or when forced.
pub fn input_needs_buffer(
    in_type: DataType,
    buffer_type: DataType,
    lookup: &TensorLookup,
    border: usize,
    options: SeparableOptions,
) -> bool {
    in_type != buffer_type
        || !lookup.is_identity()
        || border > 0
        || options.contains(SeparableOption::UseInputBuffer)
}

/// Whether output lines must be written through a scratch buffer.
pub fn output_needs_buffer(
    out_type: DataType,
    buffer_type: DataType,
    out_border: usize,
    options: SeparableOptions,
) -> bool {
    out_type != buffer_type || out_border > 0 || options.contains(SeparableOption::UseOutputBuffer)
}

/// Force input staging when input and output lines start at the same
/// sample and neither side is staged, so the filter never reads a line it
/// is writing.
pub fn resolve_aliasing(staging: Staging, same_origin: bool) -> Staging {
    if same_origin && !staging.input && !staging.output {
        Staging {
            input: true,
            ..staging
        }
    } else {
        staging
    }
}

// ============================================================================
// Storage
// ============================================================================

/// Growable, 8-byte aligned scratch memory reused across lines and passes.
#[derive(Debug, Default)]
pub(crate) struct BufferStorage {
    words: Vec<u64>,
}

impl BufferStorage {
    /// Make room for `pixels` pixels of `tensor_length` samples and return
    /// the start of the area. Existing memory is reused when large enough.
    pub(crate) fn reserve(&mut self, pixels: usize, tensor_length: usize, data_type: DataType) -> *mut u8 {
        let bytes = pixels * tensor_length * data_type.size_of();
        let words = bytes.div_ceil(8).max(1);
        if self.words.len() < words {
            self.words.resize(words, 0);
        }
        self.words.as_mut_ptr().cast::<u8>()
    }

    /// Current capacity in bytes.
    pub(crate) fn len_bytes(&self) -> usize {
        self.words.len() * 8
    }
}

// ============================================================================
// LineBuffer
// ============================================================================

/// One line of pixels as seen by a line filter.
///
/// Pixel indices run over `-border..length + border`; tensor indices over
/// `0..tensor_length`. Typed accessors check both ranges and the sample
/// type, and panic on misuse.
#[derive(Debug)]
pub struct LineBuffer {
    ptr: *mut u8,
    data_type: DataType,
    length: usize,
    border: usize,
    stride: isize,
    tensor_stride: isize,
    tensor_length: usize,
}

impl LineBuffer {
    /// Line staged in `storage`.
    ///
    /// With `repeat`, the line is one pixel repeated `length` times
    /// (stride 0); its margin pixels are that same pixel.
    pub(crate) fn staged(
        storage: &mut BufferStorage,
        data_type: DataType,
        length: usize,
        border: usize,
        tensor_length: usize,
        repeat: bool,
    ) -> Self {
        if repeat {
            let ptr = storage.reserve(1, tensor_length, data_type);
            return LineBuffer {
                ptr,
                data_type,
                length,
                border,
                stride: 0,
                tensor_stride: 1,
                tensor_length,
            };
        }
        let base = storage.reserve(length + 2 * border, tensor_length, data_type);
        LineBuffer {
            ptr: base.wrapping_add(border * tensor_length * data_type.size_of()),
            data_type,
            length,
            border,
            stride: tensor_length as isize,
            tensor_stride: 1,
            tensor_length,
        }
    }

    /// Line read or written in place; the pointer is set per line.
    pub(crate) fn direct(
        data_type: DataType,
        length: usize,
        stride: isize,
        tensor_stride: isize,
        tensor_length: usize,
    ) -> Self {
        LineBuffer {
            ptr: std::ptr::null_mut(),
            data_type,
            length,
            border: 0,
            stride,
            tensor_stride,
            tensor_length,
        }
    }

    /// Wrap existing memory.
    ///
    /// # Safety
    /// Every sample addressed by `-border..length + border` and
    /// `0..tensor_length` must stay valid for reads and writes while the
    /// buffer is used.
    pub unsafe fn from_raw(line: RawLine<*mut u8>, length: usize, border: usize, tensor_length: usize) -> Self {
        LineBuffer {
            ptr: line.ptr,
            data_type: line.data_type,
            length,
            border,
            stride: line.stride,
            tensor_stride: line.tensor_stride,
            tensor_length,
        }
    }

    #[inline]
    pub(crate) fn set_ptr(&mut self, ptr: *mut u8) {
        self.ptr = ptr;
    }

    #[inline]
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Number of pixels in the line, margins excluded.
    #[inline]
    pub fn length(&self) -> usize {
        self.length
    }

    /// Number of margin pixels on each side.
    #[inline]
    pub fn border(&self) -> usize {
        self.border
    }

    /// Distance between consecutive pixels, in samples.
    #[inline]
    pub fn stride(&self) -> isize {
        self.stride
    }

    #[inline]
    pub fn tensor_stride(&self) -> isize {
        self.tensor_stride
    }

    #[inline]
    pub fn tensor_length(&self) -> usize {
        self.tensor_length
    }

    /// Raw description of the line, pointing at pixel 0.
    pub fn raw(&self) -> RawLine<*mut u8> {
        RawLine {
            ptr: self.ptr,
            data_type: self.data_type,
            stride: self.stride,
            tensor_stride: self.tensor_stride,
        }
    }

    fn checked_ptr<T: Sample>(&self, index: isize, tensor: usize) -> *mut u8 {
        assert_eq!(
            T::DATA_TYPE,
            self.data_type,
            "sample type does not match line buffer data type"
        );
        let lo = -(self.border as isize);
        let hi = (self.length + self.border) as isize;
        assert!(
            (lo..hi).contains(&index),
            "pixel index {} out of range {}..{}",
            index,
            lo,
            hi
        );
        assert!(
            tensor < self.tensor_length,
            "tensor index {} out of bounds for {} elements",
            tensor,
            self.tensor_length
        );
        assert!(!self.ptr.is_null(), "line buffer is not attached to a line");
        self.ptr.wrapping_offset(self.raw().byte_offset(index, tensor))
    }

    /// Read one sample.
    pub fn get<T: Sample>(&self, index: isize, tensor: usize) -> T {
        let ptr = self.checked_ptr::<T>(index, tensor);
        // SAFETY: index and tensor are in range and the line is attached.
        unsafe { ptr.cast::<T>().read_unaligned() }
    }

    /// Write one sample.
    pub fn set<T: Sample>(&mut self, index: isize, tensor: usize, value: T) {
        let ptr = self.checked_ptr::<T>(index, tensor);
        // SAFETY: as in `get`.
        unsafe { ptr.cast::<T>().write_unaligned(value) }
    }

    /// Samples of tensor element `tensor` for pixels `0..length`.
    pub fn to_vec<T: Sample>(&self, tensor: usize) -> Vec<T> {
        (0..self.length as isize).map(|i| self.get(i, tensor)).collect()
    }

    /// Samples of tensor element `tensor` for the line including its margins.
    pub fn to_vec_with_border<T: Sample>(&self, tensor: usize) -> Vec<T> {
        let lo = -(self.border as isize);
        let hi = (self.length + self.border) as isize;
        (lo..hi).map(|i| self.get(i, tensor)).collect()
    }
}
