//! Dynamic-rank image headers over shared, type-erased storage.
//!
//! An [`Image`] is a header (sizes, strides, tensor layout, data type,
//! origin, metadata) plus an optional reference to pixel storage. Headers
//! are cheap to copy and several of them may point into the same storage:
//!
//! - [`Clone`] / [`Image::quick_copy`]: share the storage (a "view")
//! - [`Image::copy`]: duplicate the pixel data into fresh storage
//!
//! Storage is reference counted and interior mutable; images are therefore
//! confined to the thread that created them.

use std::cell::UnsafeCell;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::pod::samples_as_bytes;
use crate::{DataType, ImageError, PhysicalQuantity, PixelSize, Result, Sample, Tensor};

type SVec<T> = SmallVec<[T; 8]>;

// ============================================================================
// Validation helpers
// ============================================================================

/// Validate that all accessed offsets stay within `[0, len)`.
fn validate_bounds(len: usize, dims: &[usize], strides: &[isize], offset: isize) -> Result<()> {
    if dims.len() != strides.len() {
        return Err(ImageError::StrideLengthMismatch);
    }
    // Empty image - no access needed
    if dims.iter().any(|&d| d == 0) {
        return Ok(());
    }
    let (min_offset, max_offset) = offset_extent(dims, strides, offset)?;
    if min_offset < 0 || max_offset < 0 {
        return Err(ImageError::OffsetOverflow);
    }
    if max_offset as usize >= len {
        return Err(ImageError::OffsetOverflow);
    }
    Ok(())
}

/// Smallest and largest element offsets reached by a strided layout.
fn offset_extent(dims: &[usize], strides: &[isize], offset: isize) -> Result<(isize, isize)> {
    let mut min_offset = offset;
    let mut max_offset = offset;
    for (&dim, &stride) in dims.iter().zip(strides.iter()) {
        if dim > 1 {
            let end = stride
                .checked_mul(dim as isize - 1)
                .ok_or(ImageError::OffsetOverflow)?;
            if end >= 0 {
                max_offset = max_offset
                    .checked_add(end)
                    .ok_or(ImageError::OffsetOverflow)?;
            } else {
                min_offset = min_offset
                    .checked_add(end)
                    .ok_or(ImageError::OffsetOverflow)?;
            }
        }
    }
    Ok((min_offset, max_offset))
}

/// Compute column-major strides (first index varies fastest).
pub fn col_major_strides(dims: &[usize]) -> Vec<isize> {
    let rank = dims.len();
    if rank == 0 {
        return vec![];
    }
    let mut strides = vec![1isize; rank];
    for i in 1..rank {
        strides[i] = strides[i - 1] * dims[i - 1] as isize;
    }
    strides
}

/// Compute row-major strides (last index varies fastest).
pub fn row_major_strides(dims: &[usize]) -> Vec<isize> {
    let rank = dims.len();
    if rank == 0 {
        return vec![];
    }
    let mut strides = vec![1isize; rank];
    for i in (0..rank - 1).rev() {
        strides[i] = strides[i + 1] * dims[i + 1] as isize;
    }
    strides
}

/// Visit every pixel in coordinate order (dimension 0 fastest), passing the
/// element offsets of that pixel under two stride sets.
fn walk_pixels(sizes: &[usize], a: &[isize], b: &[isize], mut f: impl FnMut(isize, isize)) {
    if sizes.iter().any(|&s| s == 0) {
        return;
    }
    let rank = sizes.len();
    let mut coords: SVec<usize> = SmallVec::from_elem(0, rank);
    let (mut off_a, mut off_b) = (0isize, 0isize);
    loop {
        f(off_a, off_b);
        let mut d = 0;
        loop {
            if d == rank {
                return;
            }
            coords[d] += 1;
            off_a += a[d];
            off_b += b[d];
            if coords[d] < sizes[d] {
                break;
            }
            off_a -= coords[d] as isize * a[d];
            off_b -= coords[d] as isize * b[d];
            coords[d] = 0;
            d += 1;
        }
    }
}

// ============================================================================
// Storage
// ============================================================================

/// Zero-initialized, 8-byte aligned, interior-mutable byte storage.
struct Storage {
    words: Box<[UnsafeCell<u64>]>,
}

impl Storage {
    fn zeroed(bytes: usize) -> Self {
        let words = bytes.div_ceil(8).max(1);
        Self {
            words: (0..words).map(|_| UnsafeCell::new(0)).collect(),
        }
    }

    #[inline]
    fn as_ptr(&self) -> *mut u8 {
        UnsafeCell::raw_get(self.words.as_ptr()).cast::<u8>()
    }
}

// ============================================================================
// Image
// ============================================================================

/// Whether [`Image::reforge`] may keep a protected image's data type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AcceptDataTypeChange {
    #[default]
    DontAllow,
    DoAllow,
}

/// Dynamic-rank strided image with a per-pixel tensor.
///
/// Strides and the origin offset are counted in samples. A stride of zero
/// repeats one pixel along that dimension.
#[derive(Clone, Default)]
pub struct Image {
    sizes: Vec<usize>,
    strides: Vec<isize>,
    tensor: Tensor,
    tensor_stride: isize,
    data_type: DataType,
    pixel_size: PixelSize,
    color_space: String,
    protected: bool,
    offset: isize,
    storage: Option<Rc<Storage>>,
}

impl std::fmt::Debug for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Image")
            .field("sizes", &self.sizes)
            .field("strides", &self.strides)
            .field("tensor", &self.tensor)
            .field("tensor_stride", &self.tensor_stride)
            .field("data_type", &self.data_type)
            .field("offset", &self.offset)
            .field("forged", &self.is_forged())
            .finish()
    }
}

impl Image {
    /// Allocate a zero-filled image with tensor-interleaved column-major layout.
    pub fn new(sizes: &[usize], tensor_elements: usize, data_type: DataType) -> Result<Self> {
        let mut img = Image {
            sizes: sizes.to_vec(),
            tensor: Tensor::column_vector(tensor_elements),
            data_type,
            ..Default::default()
        };
        img.forge()?;
        Ok(img)
    }

    /// Allocate an image and fill it with `samples` in coordinate order
    /// (tensor innermost, then dimension 0, 1, ...).
    pub fn from_samples<T: Sample>(
        samples: &[T],
        sizes: &[usize],
        tensor_elements: usize,
    ) -> Result<Self> {
        let img = Self::new(sizes, tensor_elements, T::DATA_TYPE)?;
        let expected = img.number_of_samples();
        if samples.len() != expected {
            return Err(ImageError::BufferLength {
                expected,
                found: samples.len(),
            });
        }
        let bytes = samples_as_bytes(samples);
        let origin = img.origin()?;
        // A freshly forged image is contiguous from the start of its storage.
        unsafe { std::ptr::copy_nonoverlapping(bytes.as_ptr(), origin, bytes.len()) };
        Ok(img)
    }

    /// Build an image over a copy of `samples` with an explicit layout.
    pub fn from_parts<T: Sample>(
        samples: &[T],
        sizes: &[usize],
        strides: &[isize],
        tensor_elements: usize,
        tensor_stride: isize,
        offset: isize,
    ) -> Result<Self> {
        if sizes.len() != strides.len() {
            return Err(ImageError::StrideLengthMismatch);
        }
        let mut dims: SVec<usize> = SmallVec::from_slice(sizes);
        dims.push(tensor_elements);
        let mut all_strides: SVec<isize> = SmallVec::from_slice(strides);
        all_strides.push(tensor_stride);
        validate_bounds(samples.len(), &dims, &all_strides, offset)?;

        let bytes = samples_as_bytes(samples);
        let storage = Storage::zeroed(bytes.len());
        unsafe { std::ptr::copy_nonoverlapping(bytes.as_ptr(), storage.as_ptr(), bytes.len()) };
        Ok(Image {
            sizes: sizes.to_vec(),
            strides: strides.to_vec(),
            tensor: Tensor::column_vector(tensor_elements),
            tensor_stride,
            data_type: T::DATA_TYPE,
            offset,
            storage: Some(Rc::new(storage)),
            ..Default::default()
        })
    }

    // ------------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------------

    #[inline]
    pub fn dimensionality(&self) -> usize {
        self.sizes.len()
    }

    #[inline]
    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    #[inline]
    pub fn size(&self, dim: usize) -> usize {
        self.sizes[dim]
    }

    #[inline]
    pub fn strides(&self) -> &[isize] {
        &self.strides
    }

    #[inline]
    pub fn stride(&self, dim: usize) -> isize {
        self.strides[dim]
    }

    #[inline]
    pub fn tensor(&self) -> &Tensor {
        &self.tensor
    }

    #[inline]
    pub fn tensor_elements(&self) -> usize {
        self.tensor.elements()
    }

    #[inline]
    pub fn tensor_stride(&self) -> isize {
        self.tensor_stride
    }

    #[inline]
    pub fn is_scalar(&self) -> bool {
        self.tensor.is_scalar()
    }

    #[inline]
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    #[inline]
    pub fn is_forged(&self) -> bool {
        self.storage.is_some()
    }

    #[inline]
    pub fn is_protected(&self) -> bool {
        self.protected
    }

    /// Set the protect flag, returning the previous value.
    pub fn protect(&mut self, protect: bool) -> bool {
        std::mem::replace(&mut self.protected, protect)
    }

    pub fn number_of_pixels(&self) -> usize {
        self.sizes.iter().product()
    }

    pub fn number_of_samples(&self) -> usize {
        self.number_of_pixels() * self.tensor.elements()
    }

    #[inline]
    pub fn pixel_size(&self) -> &PixelSize {
        &self.pixel_size
    }

    pub fn set_pixel_size(&mut self, pixel_size: PixelSize) {
        self.pixel_size = pixel_size;
    }

    #[inline]
    pub fn color_space(&self) -> &str {
        &self.color_space
    }

    pub fn set_color_space(&mut self, color_space: impl Into<String>) {
        self.color_space = color_space.into();
    }

    pub fn is_color(&self) -> bool {
        !self.color_space.is_empty()
    }

    // ------------------------------------------------------------------------
    // Data access
    // ------------------------------------------------------------------------

    /// Raw pointer to the first sample of the pixel at the origin.
    pub fn origin(&self) -> Result<*mut u8> {
        let storage = self.storage.as_ref().ok_or(ImageError::NotForged)?;
        Ok(storage.as_ptr().wrapping_offset(self.byte_origin()))
    }

    #[inline]
    fn byte_origin(&self) -> isize {
        self.offset * self.data_type.size_of() as isize
    }

    /// Half-open byte range `[lo, hi)` touched by this header, `None` if empty.
    fn byte_range(&self) -> Option<(isize, isize)> {
        if self.number_of_samples() == 0 {
            return None;
        }
        let mut dims: SVec<usize> = SmallVec::from_slice(&self.sizes);
        dims.push(self.tensor.elements());
        let mut strides: SVec<isize> = SmallVec::from_slice(&self.strides);
        strides.push(self.tensor_stride);
        let (lo, hi) = offset_extent(&dims, &strides, self.offset).ok()?;
        let size = self.data_type.size_of() as isize;
        Some((lo * size, (hi + 1) * size))
    }

    fn sample_offset(&self, coords: &[usize], tensor_index: usize) -> isize {
        assert_eq!(coords.len(), self.sizes.len(), "wrong number of coordinates");
        assert!(
            tensor_index < self.tensor.elements(),
            "tensor index {} out of bounds for {} elements",
            tensor_index,
            self.tensor.elements()
        );
        let mut idx = tensor_index as isize * self.tensor_stride;
        for (d, (&c, &s)) in coords.iter().zip(self.strides.iter()).enumerate() {
            assert!(
                c < self.sizes[d],
                "index {} out of bounds for dim {}",
                c,
                self.sizes[d]
            );
            idx += c as isize * s;
        }
        idx
    }

    fn typed_origin<T: Sample>(&self) -> *mut u8 {
        assert_eq!(
            T::DATA_TYPE,
            self.data_type,
            "sample type does not match image data type"
        );
        match self.origin() {
            Ok(ptr) => ptr,
            Err(_) => panic!("image is not forged"),
        }
    }

    /// Read one sample.
    ///
    /// # Panics
    /// If the image is not forged, `T` is not the image's data type, or an
    /// index is out of bounds.
    pub fn get<T: Sample>(&self, coords: &[usize], tensor_index: usize) -> T {
        let origin = self.typed_origin::<T>();
        let idx = self.sample_offset(coords, tensor_index);
        unsafe {
            origin
                .offset(idx * std::mem::size_of::<T>() as isize)
                .cast::<T>()
                .read_unaligned()
        }
    }

    /// Write one sample. Other headers sharing the storage see the change.
    ///
    /// # Panics
    /// Under the same conditions as [`Image::get`].
    pub fn set<T: Sample>(&mut self, coords: &[usize], tensor_index: usize, value: T) {
        let origin = self.typed_origin::<T>();
        let idx = self.sample_offset(coords, tensor_index);
        unsafe {
            origin
                .offset(idx * std::mem::size_of::<T>() as isize)
                .cast::<T>()
                .write_unaligned(value)
        }
    }

    /// All samples in coordinate order (tensor innermost, dimension 0 next).
    pub fn samples<T: Sample>(&self) -> Result<Vec<T>> {
        if T::DATA_TYPE != self.data_type {
            return Err(ImageError::DataTypeMismatch {
                expected: self.data_type,
                found: T::DATA_TYPE,
            });
        }
        let origin = self.origin()?;
        let size = std::mem::size_of::<T>() as isize;
        let te = self.tensor.elements();
        let mut out = Vec::with_capacity(self.number_of_samples());
        walk_pixels(&self.sizes, &self.strides, &self.strides, |offset, _| {
            for t in 0..te {
                let idx = offset + t as isize * self.tensor_stride;
                out.push(unsafe { origin.offset(idx * size).cast::<T>().read_unaligned() });
            }
        });
        Ok(out)
    }

    // ------------------------------------------------------------------------
    // Header and storage management
    // ------------------------------------------------------------------------

    /// Header sharing this image's storage, without pixel size or color space.
    pub fn quick_copy(&self) -> Image {
        Image {
            sizes: self.sizes.clone(),
            strides: self.strides.clone(),
            tensor: self.tensor,
            tensor_stride: self.tensor_stride,
            data_type: self.data_type,
            offset: self.offset,
            storage: self.storage.clone(),
            ..Default::default()
        }
    }

    /// Duplicate pixel data and metadata into fresh, contiguous storage.
    pub fn copy(&self) -> Result<Image> {
        let src = self.origin()?;
        let mut dest = Image {
            sizes: self.sizes.clone(),
            tensor: self.tensor,
            data_type: self.data_type,
            pixel_size: self.pixel_size.clone(),
            color_space: self.color_space.clone(),
            ..Default::default()
        };
        dest.forge()?;
        let dst = dest.origin()?;
        let size = self.data_type.size_of();
        let te = self.tensor.elements();
        walk_pixels(&self.sizes, &self.strides, &dest.strides, |s, d| {
            for t in 0..te {
                let s = (s + t as isize * self.tensor_stride) * size as isize;
                let d = (d + t as isize) * size as isize;
                unsafe { std::ptr::copy_nonoverlapping(src.offset(s), dst.offset(d), size) };
            }
        });
        Ok(dest)
    }

    /// Allocate storage for the current sizes, tensor and data type.
    ///
    /// Does nothing if the image is already forged.
    pub fn forge(&mut self) -> Result<()> {
        if self.is_forged() {
            return Ok(());
        }
        let te = self.tensor.elements();
        if te == 0 {
            return Err(ImageError::TensorSizeMismatch(0, 1));
        }
        let bytes = self
            .sizes
            .iter()
            .try_fold(te, |acc, &s| acc.checked_mul(s))
            .and_then(|n| n.checked_mul(self.data_type.size_of()))
            .filter(|&n| n <= isize::MAX as usize)
            .ok_or(ImageError::OffsetOverflow)?;
        self.strides = col_major_strides(&self.sizes)
            .into_iter()
            .map(|s| s * te as isize)
            .collect();
        self.tensor_stride = 1;
        self.offset = 0;
        self.storage = Some(Rc::new(Storage::zeroed(bytes)));
        Ok(())
    }

    /// Release this header's reference to the storage; sizes are kept.
    pub fn strip(&mut self) -> Result<()> {
        if self.is_forged() {
            if self.protected {
                return Err(ImageError::Protected);
            }
            self.storage = None;
            self.offset = 0;
        }
        Ok(())
    }

    /// Make the image forged with the given properties.
    ///
    /// Storage is kept when the image already has matching sizes, tensor
    /// element count and data type. A protected image keeps its own data
    /// type when `accept` is [`AcceptDataTypeChange::DoAllow`], and cannot
    /// be reallocated.
    pub fn reforge(
        &mut self,
        sizes: &[usize],
        tensor_elements: usize,
        data_type: DataType,
        accept: AcceptDataTypeChange,
    ) -> Result<()> {
        let data_type = if self.protected && accept == AcceptDataTypeChange::DoAllow {
            self.data_type
        } else {
            data_type
        };
        if self.is_forged() {
            if self.sizes == sizes
                && self.tensor.elements() == tensor_elements
                && self.data_type == data_type
            {
                return Ok(());
            }
            self.strip()?;
        }
        self.sizes = sizes.to_vec();
        if self.tensor.elements() != tensor_elements {
            self.tensor = Tensor::column_vector(tensor_elements);
        }
        self.data_type = data_type;
        self.forge()
    }

    /// Change the tensor shape, keeping the number of elements.
    pub fn reshape_tensor(&mut self, tensor: Tensor) -> Result<()> {
        if tensor.elements() != self.tensor.elements() {
            return Err(ImageError::TensorSizeMismatch(
                tensor.elements(),
                self.tensor.elements(),
            ));
        }
        self.tensor = tensor;
        Ok(())
    }

    /// Turn the tensor into a new spatial dimension at `dim`.
    pub fn tensor_to_spatial(&mut self, dim: usize) -> Result<()> {
        let rank = self.sizes.len();
        if dim > rank {
            return Err(ImageError::InvalidAxis { axis: dim, rank });
        }
        if self.strides.len() == rank {
            self.strides.insert(dim, self.tensor_stride);
        }
        self.sizes.insert(dim, self.tensor.elements());
        self.tensor = Tensor::scalar();
        self.tensor_stride = 1;
        self.pixel_size.insert(dim, PhysicalQuantity::pixel());
        Ok(())
    }

    /// View of the leading `sizes` region, sharing strides and origin.
    pub fn window(&self, sizes: &[usize]) -> Result<Image> {
        if !self.is_forged() {
            return Err(ImageError::NotForged);
        }
        if sizes.len() != self.sizes.len() {
            return Err(ImageError::DimensionMismatch(sizes.len(), self.sizes.len()));
        }
        if sizes.iter().zip(&self.sizes).any(|(&w, &s)| w > s) {
            return Err(ImageError::SizeMismatch(sizes.to_vec(), self.sizes.clone()));
        }
        let mut view = self.quick_copy();
        view.sizes = sizes.to_vec();
        Ok(view)
    }

    // ------------------------------------------------------------------------
    // Aliasing
    // ------------------------------------------------------------------------

    /// True if both headers reference the same storage.
    pub fn shares_data(&self, other: &Image) -> bool {
        match (&self.storage, &other.storage) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// True if both headers start at the same sample in the same storage.
    pub fn same_origin(&self, other: &Image) -> bool {
        self.shares_data(other) && self.byte_origin() == other.byte_origin()
    }

    /// True if the memory spans of both headers intersect.
    pub fn is_overlapping_view(&self, other: &Image) -> bool {
        if !self.shares_data(other) {
            return false;
        }
        match (self.byte_range(), other.byte_range()) {
            (Some((a0, a1)), Some((b0, b1))) => a0 < b1 && b0 < a1,
            _ => false,
        }
    }
}
