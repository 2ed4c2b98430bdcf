//! Iteration over the image lines along one dimension.

use smallvec::SmallVec;
use strided_image::{Image, ImageError};

use crate::{Result, SeparableError};

type SVec<T> = SmallVec<[T; 8]>;

/// Position of one line in a pair of images.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinePosition {
    /// Coordinates of the first pixel of the line; the processing dimension is 0.
    pub coordinates: SVec<usize>,
    /// Offset of the first pixel in the input, in samples from its origin.
    pub in_offset: isize,
    /// Offset of the first pixel in the output, in samples from its origin.
    pub out_offset: isize,
}

/// Walks the lines along a processing dimension of two images in lockstep.
///
/// The two images must agree in sizes on all dimensions other than the
/// processing dimension. Lines are visited with the lowest non-processing
/// dimension changing fastest.
#[derive(Debug, Clone)]
pub struct LineIterator {
    sizes: SVec<usize>,
    in_strides: SVec<isize>,
    out_strides: SVec<isize>,
    dim: usize,
    coords: SVec<usize>,
    in_offset: isize,
    out_offset: isize,
    done: bool,
}

impl LineIterator {
    pub fn new(input: &Image, output: &Image, dim: usize) -> Result<Self> {
        let rank = input.dimensionality();
        if output.dimensionality() != rank {
            return Err(SeparableError::DimensionMismatch {
                dim: None,
                input: rank,
                output: output.dimensionality(),
            });
        }
        if dim >= rank {
            return Err(ImageError::InvalidAxis { axis: dim, rank }.into());
        }
        let mismatch = (0..rank).any(|d| d != dim && input.size(d) != output.size(d));
        if mismatch {
            return Err(SeparableError::SizeMismatch(
                input.sizes().to_vec(),
                output.sizes().to_vec(),
            ));
        }
        Ok(LineIterator {
            sizes: SmallVec::from_slice(input.sizes()),
            in_strides: SmallVec::from_slice(input.strides()),
            out_strides: SmallVec::from_slice(output.strides()),
            dim,
            coords: SmallVec::from_elem(0, rank),
            in_offset: 0,
            out_offset: 0,
            done: input.sizes().iter().any(|&s| s == 0),
        })
    }

    /// Resume iteration at `coordinates` (as produced by
    /// [`split_evenly`](crate::split_evenly)).
    ///
    /// The processing-dimension coordinate is ignored. A coordinate past
    /// the end of its dimension leaves nothing to iterate.
    pub fn starting_at(mut self, coordinates: &[usize]) -> Result<Self> {
        if coordinates.len() != self.sizes.len() {
            return Err(SeparableError::ArrayLengthMismatch {
                expected: self.sizes.len(),
                found: coordinates.len(),
            });
        }
        self.in_offset = 0;
        self.out_offset = 0;
        for (d, &c) in coordinates.iter().enumerate() {
            let c = if d == self.dim { 0 } else { c };
            if c >= self.sizes[d] && d != self.dim {
                self.done = true;
            }
            self.coords[d] = c;
            self.in_offset += c as isize * self.in_strides[d];
            self.out_offset += c as isize * self.out_strides[d];
        }
        Ok(self)
    }

    #[inline]
    pub fn processing_dim(&self) -> usize {
        self.dim
    }

    /// Total number of lines in the images.
    pub fn line_count(&self) -> usize {
        self.sizes
            .iter()
            .enumerate()
            .filter(|&(d, _)| d != self.dim)
            .map(|(_, &s)| s)
            .product()
    }

    fn advance(&mut self) {
        let rank = self.sizes.len();
        let mut d = 0;
        loop {
            if d == rank {
                self.done = true;
                return;
            }
            if d == self.dim {
                d += 1;
                continue;
            }
            self.coords[d] += 1;
            self.in_offset += self.in_strides[d];
            self.out_offset += self.out_strides[d];
            if self.coords[d] < self.sizes[d] {
                return;
            }
            self.in_offset -= self.coords[d] as isize * self.in_strides[d];
            self.out_offset -= self.coords[d] as isize * self.out_strides[d];
            self.coords[d] = 0;
            d += 1;
        }
    }
}

impl Iterator for LineIterator {
    type Item = LinePosition;

    fn next(&mut self) -> Option<LinePosition> {
        if self.done {
            return None;
        }
        let position = LinePosition {
            coordinates: self.coords.clone(),
            in_offset: self.in_offset,
            out_offset: self.out_offset,
        };
        self.advance();
        Some(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strided_image::DataType;

    #[test]
    fn test_lines_along_dim0() {
        let input = Image::new(&[4, 3], 1, DataType::UInt8).unwrap();
        let output = Image::new(&[4, 3], 2, DataType::UInt8).unwrap();
        let lines: Vec<_> = LineIterator::new(&input, &output, 0).unwrap().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].coordinates.as_slice(), &[0, 0]);
        assert_eq!(lines[2].coordinates.as_slice(), &[0, 2]);
        assert_eq!(lines[2].in_offset, 8);
        assert_eq!(lines[2].out_offset, 16);
    }

    #[test]
    fn test_lowest_dimension_fastest() {
        let img = Image::new(&[2, 5, 3], 1, DataType::SFloat).unwrap();
        let coords: Vec<Vec<usize>> = LineIterator::new(&img, &img, 1)
            .unwrap()
            .map(|p| p.coordinates.to_vec())
            .collect();
        assert_eq!(
            coords,
            vec![
                vec![0, 0, 0],
                vec![1, 0, 0],
                vec![0, 0, 1],
                vec![1, 0, 1],
                vec![0, 0, 2],
                vec![1, 0, 2]
            ]
        );
    }

    #[test]
    fn test_processing_dimension_may_differ() {
        let input = Image::new(&[10, 3], 1, DataType::SFloat).unwrap();
        let output = Image::new(&[4, 3], 1, DataType::SFloat).unwrap();
        let it = LineIterator::new(&input, &output, 0).unwrap();
        assert_eq!(it.line_count(), 3);
        let offsets: Vec<_> = it.map(|p| (p.in_offset, p.out_offset)).collect();
        assert_eq!(offsets, vec![(0, 0), (10, 4), (20, 8)]);
        assert!(matches!(
            LineIterator::new(&input, &output, 1),
            Err(SeparableError::SizeMismatch(_, _))
        ));
    }

    #[test]
    fn test_starting_at() {
        let img = Image::new(&[3, 4, 2], 1, DataType::UInt8).unwrap();
        let it = LineIterator::new(&img, &img, 0)
            .unwrap()
            .starting_at(&[7, 2, 1])
            .unwrap();
        let coords: Vec<Vec<usize>> = it.map(|p| p.coordinates.to_vec()).collect();
        assert_eq!(coords, vec![vec![0, 2, 1], vec![0, 3, 1]]);
    }

    #[test]
    fn test_one_dimensional_single_line() {
        let img = Image::new(&[9], 1, DataType::UInt8).unwrap();
        let lines: Vec<_> = LineIterator::new(&img, &img, 0).unwrap().collect();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].in_offset, 0);
    }

    #[test]
    fn test_empty_image_yields_nothing() {
        let img = Image::new(&[0, 4], 1, DataType::UInt8).unwrap();
        assert_eq!(LineIterator::new(&img, &img, 1).unwrap().count(), 0);
    }

    #[test]
    fn test_errors() {
        let a = Image::new(&[3, 4], 1, DataType::UInt8).unwrap();
        let b = Image::new(&[3], 1, DataType::UInt8).unwrap();
        assert!(matches!(
            LineIterator::new(&a, &b, 0),
            Err(SeparableError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            LineIterator::new(&a, &a, 2),
            Err(SeparableError::Image(ImageError::InvalidAxis { axis: 2, rank: 2 }))
        ));
        let it = LineIterator::new(&a, &a, 0).unwrap();
        assert!(it.starting_at(&[0]).is_err());
    }
}
