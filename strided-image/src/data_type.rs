//! Runtime element types and the sample trait that links them to Rust types.
//!
//! Pixel data is stored type-erased. Every [`DataType`] exposes a reader and
//! a writer function pointer that widen to / narrow from `Complex<f64>`, so a
//! conversion between any pair of types is two indirect calls instead of one
//! monomorphized routine per pair.

use std::fmt;

use bytemuck::Pod;
use num_complex::{Complex32, Complex64};
use num_traits::{Bounded, NumCast, ToPrimitive};

/// Reads one sample at an (unaligned) address and widens it.
pub type ReadFn = unsafe fn(*const u8) -> Complex64;

/// Narrows a widened value and writes it at an (unaligned) address.
pub type WriteFn = unsafe fn(*mut u8, Complex64);

/// Element type of the samples stored in an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DataType {
    UInt8,
    UInt16,
    UInt32,
    SInt8,
    SInt16,
    SInt32,
    #[default]
    SFloat,
    DFloat,
    SComplex,
    DComplex,
}

impl DataType {
    /// Size of one sample in bytes.
    pub const fn size_of(self) -> usize {
        match self {
            DataType::UInt8 | DataType::SInt8 => 1,
            DataType::UInt16 | DataType::SInt16 => 2,
            DataType::UInt32 | DataType::SInt32 | DataType::SFloat => 4,
            DataType::DFloat | DataType::SComplex => 8,
            DataType::DComplex => 16,
        }
    }

    pub const fn is_complex(self) -> bool {
        matches!(self, DataType::SComplex | DataType::DComplex)
    }

    pub const fn is_float(self) -> bool {
        matches!(self, DataType::SFloat | DataType::DFloat)
    }

    pub const fn is_integer(self) -> bool {
        !self.is_complex() && !self.is_float()
    }

    pub const fn is_unsigned(self) -> bool {
        matches!(self, DataType::UInt8 | DataType::UInt16 | DataType::UInt32)
    }

    pub const fn name(self) -> &'static str {
        match self {
            DataType::UInt8 => "UINT8",
            DataType::UInt16 => "UINT16",
            DataType::UInt32 => "UINT32",
            DataType::SInt8 => "SINT8",
            DataType::SInt16 => "SINT16",
            DataType::SInt32 => "SINT32",
            DataType::SFloat => "SFLOAT",
            DataType::DFloat => "DFLOAT",
            DataType::SComplex => "SCOMPLEX",
            DataType::DComplex => "DCOMPLEX",
        }
    }

    /// Smallest representable real value, as used for saturating writes.
    pub fn min_value(self) -> f64 {
        match self {
            DataType::UInt8 | DataType::UInt16 | DataType::UInt32 => 0.0,
            DataType::SInt8 => i8::MIN as f64,
            DataType::SInt16 => i16::MIN as f64,
            DataType::SInt32 => i32::MIN as f64,
            DataType::SFloat | DataType::SComplex => f32::MIN as f64,
            DataType::DFloat | DataType::DComplex => f64::MIN,
        }
    }

    /// Largest representable real value.
    pub fn max_value(self) -> f64 {
        match self {
            DataType::UInt8 => u8::MAX as f64,
            DataType::UInt16 => u16::MAX as f64,
            DataType::UInt32 => u32::MAX as f64,
            DataType::SInt8 => i8::MAX as f64,
            DataType::SInt16 => i16::MAX as f64,
            DataType::SInt32 => i32::MAX as f64,
            DataType::SFloat | DataType::SComplex => f32::MAX as f64,
            DataType::DFloat | DataType::DComplex => f64::MAX,
        }
    }

    /// Function that reads a sample of this type.
    pub fn reader(self) -> ReadFn {
        match self {
            DataType::UInt8 => read_sample::<u8>,
            DataType::UInt16 => read_sample::<u16>,
            DataType::UInt32 => read_sample::<u32>,
            DataType::SInt8 => read_sample::<i8>,
            DataType::SInt16 => read_sample::<i16>,
            DataType::SInt32 => read_sample::<i32>,
            DataType::SFloat => read_sample::<f32>,
            DataType::DFloat => read_sample::<f64>,
            DataType::SComplex => read_sample::<Complex32>,
            DataType::DComplex => read_sample::<Complex64>,
        }
    }

    /// Function that writes a sample of this type.
    pub fn writer(self) -> WriteFn {
        match self {
            DataType::UInt8 => write_sample::<u8>,
            DataType::UInt16 => write_sample::<u16>,
            DataType::UInt32 => write_sample::<u32>,
            DataType::SInt8 => write_sample::<i8>,
            DataType::SInt16 => write_sample::<i16>,
            DataType::SInt32 => write_sample::<i32>,
            DataType::SFloat => write_sample::<f32>,
            DataType::DFloat => write_sample::<f64>,
            DataType::SComplex => write_sample::<Complex32>,
            DataType::DComplex => write_sample::<Complex64>,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// # Safety
/// `ptr` must be valid for reading `size_of::<T>()` bytes.
unsafe fn read_sample<T: Sample>(ptr: *const u8) -> Complex64 {
    ptr.cast::<T>().read_unaligned().to_complex()
}

/// # Safety
/// `ptr` must be valid for writing `size_of::<T>()` bytes.
unsafe fn write_sample<T: Sample>(ptr: *mut u8, value: Complex64) {
    ptr.cast::<T>().write_unaligned(T::from_complex(value));
}

/// A Rust type that can be stored as an image sample.
///
/// Conversions into integer types round half away from zero and saturate;
/// conversions from complex into real types keep the real part.
pub trait Sample: Pod + Send + Sync + PartialEq + fmt::Debug + 'static {
    /// Runtime tag of this type.
    const DATA_TYPE: DataType;

    /// Widen to a complex double.
    fn to_complex(self) -> Complex64;

    /// Narrow from a complex double.
    fn from_complex(value: Complex64) -> Self;
}

fn saturate<T: Bounded + NumCast + ToPrimitive + Default>(value: f64) -> T {
    let lo = T::min_value().to_f64().unwrap_or(f64::MIN);
    let hi = T::max_value().to_f64().unwrap_or(f64::MAX);
    // NaN falls through `clamp` and fails the cast.
    <T as NumCast>::from(value.round().clamp(lo, hi)).unwrap_or_default()
}

macro_rules! impl_integer_sample {
    ($($t:ty => $dt:ident),* $(,)?) => {
        $(
            impl Sample for $t {
                const DATA_TYPE: DataType = DataType::$dt;

                #[inline]
                fn to_complex(self) -> Complex64 {
                    Complex64::new(self as f64, 0.0)
                }

                #[inline]
                fn from_complex(value: Complex64) -> Self {
                    saturate::<$t>(value.re)
                }
            }
        )*
    };
}

impl_integer_sample!(
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    i8 => SInt8,
    i16 => SInt16,
    i32 => SInt32,
);

impl Sample for f32 {
    const DATA_TYPE: DataType = DataType::SFloat;

    #[inline]
    fn to_complex(self) -> Complex64 {
        Complex64::new(self as f64, 0.0)
    }

    #[inline]
    fn from_complex(value: Complex64) -> Self {
        value.re as f32
    }
}

impl Sample for f64 {
    const DATA_TYPE: DataType = DataType::DFloat;

    #[inline]
    fn to_complex(self) -> Complex64 {
        Complex64::new(self, 0.0)
    }

    #[inline]
    fn from_complex(value: Complex64) -> Self {
        value.re
    }
}

impl Sample for Complex32 {
    const DATA_TYPE: DataType = DataType::SComplex;

    #[inline]
    fn to_complex(self) -> Complex64 {
        Complex64::new(self.re as f64, self.im as f64)
    }

    #[inline]
    fn from_complex(value: Complex64) -> Self {
        Complex32::new(value.re as f32, value.im as f32)
    }
}

impl Sample for Complex64 {
    const DATA_TYPE: DataType = DataType::DComplex;

    #[inline]
    fn to_complex(self) -> Complex64 {
        self
    }

    #[inline]
    fn from_complex(value: Complex64) -> Self {
        value
    }
}
