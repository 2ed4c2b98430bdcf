//! Byte reinterpretation of typed sample slices.

use crate::{ImageError, Result, Sample};

/// View a slice of samples as its raw bytes.
pub fn samples_as_bytes<T: Sample>(src: &[T]) -> &[u8] {
    bytemuck::cast_slice(src)
}

/// Collect raw (possibly unaligned) bytes into typed samples.
///
/// Fails if `bytes.len()` is not a multiple of the sample size.
pub fn samples_from_bytes<T: Sample>(bytes: &[u8]) -> Result<Vec<T>> {
    let size = std::mem::size_of::<T>();
    if bytes.len() % size != 0 {
        return Err(ImageError::BufferLength {
            expected: bytes.len().next_multiple_of(size),
            found: bytes.len(),
        });
    }
    Ok(bytes
        .chunks_exact(size)
        .map(bytemuck::pod_read_unaligned::<T>)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex64;

    #[test]
    fn test_bytes_roundtrip_complex() {
        let data = vec![Complex64::new(1.0, 2.0), Complex64::new(-3.0, 0.5)];
        let bytes = samples_as_bytes(&data);
        assert_eq!(bytes.len(), 32);
        let back: Vec<Complex64> = samples_from_bytes(bytes).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn test_unaligned_source() {
        let data: Vec<u16> = vec![0x0102, 0x0304];
        let mut bytes = vec![0u8];
        bytes.extend_from_slice(samples_as_bytes(&data));
        let back: Vec<u16> = samples_from_bytes(&bytes[1..]).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn test_length_not_multiple() {
        let err = samples_from_bytes::<f32>(&[0u8; 6]).unwrap_err();
        assert!(matches!(
            err,
            ImageError::BufferLength {
                expected: 8,
                found: 6
            }
        ));
    }
}
