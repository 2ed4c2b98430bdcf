//! Singleton expansion of image sizes and even splitting of an iteration space.

use strided_image::Image;

use crate::{Result, SeparableError};

/// Expand `size` so that it is compatible with `other`.
///
/// `size` is padded with ones if it has fewer dimensions. Along each
/// dimension, a size of 1 on either side is expanded to the other side's
/// size; any other disagreement fails with [`SeparableError::SizeMismatch`].
pub fn expand_shape(size: &mut Vec<usize>, other: &[usize]) -> Result<()> {
    if size.len() < other.len() {
        size.resize(other.len(), 1);
    }
    for (s, &o) in size.iter_mut().zip(other.iter()) {
        if *s != o {
            if *s == 1 {
                *s = o;
            } else if o != 1 {
                return Err(SeparableError::SizeMismatch(size.clone(), other.to_vec()));
            }
        }
    }
    Ok(())
}

/// Sizes all `images` can be singleton-expanded to.
pub fn singleton_expanded_sizes(images: &[&Image]) -> Result<Vec<usize>> {
    let (first, rest) = images
        .split_first()
        .ok_or(SeparableError::ArrayLengthMismatch {
            expected: 1,
            found: 0,
        })?;
    let mut size = first.sizes().to_vec();
    for img in rest {
        expand_shape(&mut size, img.sizes())?;
    }
    Ok(size)
}

/// Number of tensor elements all `images` can be singleton-expanded to.
pub fn singleton_expanded_tensor_elements(images: &[&Image]) -> Result<usize> {
    let (first, rest) = images
        .split_first()
        .ok_or(SeparableError::ArrayLengthMismatch {
            expected: 1,
            found: 0,
        })?;
    let mut elements = first.tensor_elements();
    for img in rest {
        let other = img.tensor_elements();
        if elements != other {
            if elements == 1 {
                elements = other;
            } else if other != 1 {
                return Err(SeparableError::SizeMismatch(vec![elements], vec![other]));
            }
        }
    }
    Ok(elements)
}

/// Split the lines of an image into `n_blocks` runs of `pixels_per_block`.
///
/// Returns the start coordinate of each block. Coordinates advance along
/// the lowest non-excluded dimension first, carrying into higher ones; the
/// `excluded` dimension (the processing dimension, if any) always stays 0.
/// A block that would start past the end wraps around to the origin.
pub fn split_evenly(
    sizes: &[usize],
    n_blocks: usize,
    pixels_per_block: usize,
    excluded: Option<usize>,
) -> Vec<Vec<usize>> {
    let rank = sizes.len();
    let excluded = excluded.filter(|&d| d < rank);
    let mut starts: Vec<Vec<usize>> = Vec::with_capacity(n_blocks);
    if n_blocks == 0 {
        return starts;
    }
    starts.push(vec![0; rank]);

    let first_dim = (0..rank).find(|&d| Some(d) != excluded);
    let first_dim = match first_dim {
        Some(d) if !sizes.iter().any(|&s| s == 0) => d,
        // A single line (or nothing) to split.
        _ => {
            starts.resize(n_blocks, vec![0; rank]);
            return starts;
        }
    };

    for ii in 1..n_blocks {
        let mut coords = starts[ii - 1].clone();
        let mut remaining = pixels_per_block;
        loop {
            for dd in 0..rank {
                if dd == first_dim {
                    let n = sizes[dd] - coords[dd];
                    if remaining >= n {
                        // Rewind, the next dimension gets incremented
                        remaining -= n;
                        coords[dd] = 0;
                    } else {
                        coords[dd] += remaining;
                        remaining = 0;
                        break;
                    }
                } else if Some(dd) != excluded {
                    coords[dd] += 1;
                    if coords[dd] < sizes[dd] {
                        break;
                    }
                    coords[dd] = 0;
                }
            }
            if remaining == 0 {
                break;
            }
        }
        starts.push(coords);
    }
    starts
}

#[cfg(test)]
mod tests {
    use super::*;
    use strided_image::DataType;

    #[test]
    fn test_expand_shape_elementwise_max() {
        let mut a = vec![1, 5, 3];
        expand_shape(&mut a, &[4, 5, 1]).unwrap();
        assert_eq!(a, vec![4, 5, 3]);
    }

    #[test]
    fn test_expand_shape_pads_shorter() {
        let mut a = vec![3];
        expand_shape(&mut a, &[3, 7]).unwrap();
        assert_eq!(a, vec![3, 7]);
        let mut b = vec![3, 7, 2];
        expand_shape(&mut b, &[1]).unwrap();
        assert_eq!(b, vec![3, 7, 2]);
    }

    #[test]
    fn test_expand_shape_mismatch() {
        let mut a = vec![2, 3];
        let err = expand_shape(&mut a, &[2, 4]).unwrap_err();
        assert!(matches!(err, SeparableError::SizeMismatch(_, _)));
    }

    #[test]
    fn test_singleton_expanded_sizes() {
        let a = Image::new(&[1, 6], 1, DataType::UInt8).unwrap();
        let b = Image::new(&[4, 1], 1, DataType::UInt8).unwrap();
        let c = Image::new(&[4, 6, 2], 1, DataType::UInt8).unwrap();
        assert_eq!(singleton_expanded_sizes(&[&a, &b]).unwrap(), vec![4, 6]);
        assert_eq!(singleton_expanded_sizes(&[&a, &b, &c]).unwrap(), vec![4, 6, 2]);
        assert!(singleton_expanded_sizes(&[]).is_err());
    }

    #[test]
    fn test_singleton_expanded_tensor_elements() {
        let a = Image::new(&[2], 1, DataType::UInt8).unwrap();
        let b = Image::new(&[2], 3, DataType::UInt8).unwrap();
        let c = Image::new(&[2], 2, DataType::UInt8).unwrap();
        assert_eq!(singleton_expanded_tensor_elements(&[&a, &b]).unwrap(), 3);
        assert!(matches!(
            singleton_expanded_tensor_elements(&[&a, &b, &c]),
            Err(SeparableError::SizeMismatch(_, _))
        ));
    }

    #[test]
    fn test_split_evenly_partial_lines() {
        let starts = split_evenly(&[4, 3], 2, 6, None);
        assert_eq!(starts, vec![vec![0, 0], vec![2, 1]]);
    }

    #[test]
    fn test_split_evenly_skips_excluded_dimension() {
        let starts = split_evenly(&[5, 4, 3], 3, 4, Some(0));
        assert_eq!(starts, vec![vec![0, 0, 0], vec![0, 0, 1], vec![0, 0, 2]]);
    }

    #[test]
    fn test_split_evenly_excluded_in_middle() {
        // Lines along dim 1: 2 * 3 = 6 lines, three per block
        let starts = split_evenly(&[2, 10, 3], 2, 3, Some(1));
        assert_eq!(starts, vec![vec![0, 0, 0], vec![1, 0, 1]]);
    }

    #[test]
    fn test_split_evenly_single_line() {
        let starts = split_evenly(&[7], 3, 1, Some(0));
        assert_eq!(starts, vec![vec![0], vec![0], vec![0]]);
        assert!(split_evenly(&[7], 0, 1, None).is_empty());
    }
}
