//! Extension of staged lines past their ends.
//!
//! A staged input line has `border` pixels of margin on each side. Before
//! the line filter runs, the margins are filled from the line itself
//! according to a [`BoundaryCondition`].

use std::fmt;
use std::str::FromStr;

use num_complex::Complex64;
use strided_image::Sample;

use crate::copy::RawLine;
use crate::{Result, SeparableError};

/// How values outside a line are computed.
///
/// Diagrams show a line `a b c d` with three pixels of margin.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum BoundaryCondition {
    /// `c b a | a b c d | d c b` (edge pixel repeated)
    #[default]
    Reflect,
    /// `d c b | a b c d | c b a` (edge pixel not repeated)
    Mirror,
    /// `b c d | a b c d | a b c`
    Periodic,
    /// `a a a | a b c d | d d d`
    Nearest,
    /// `k k k | a b c d | k k k`
    Constant(f64),
}

impl BoundaryCondition {
    /// Index inside `0..length` whose value appears at `index`.
    ///
    /// `None` for [`BoundaryCondition::Constant`] outside the line, or for
    /// an empty line. Margins wider than the line wrap around as many
    /// times as needed.
    pub fn source_index(self, index: isize, length: usize) -> Option<usize> {
        if length == 0 {
            return None;
        }
        let n = length as isize;
        if (0..n).contains(&index) {
            return Some(index as usize);
        }
        let source = match self {
            BoundaryCondition::Reflect => {
                let m = index.rem_euclid(2 * n);
                if m < n {
                    m
                } else {
                    2 * n - 1 - m
                }
            }
            BoundaryCondition::Mirror => {
                if n == 1 {
                    0
                } else {
                    let period = 2 * n - 2;
                    let m = index.rem_euclid(period);
                    if m < n {
                        m
                    } else {
                        period - m
                    }
                }
            }
            BoundaryCondition::Periodic => index.rem_euclid(n),
            BoundaryCondition::Nearest => index.clamp(0, n - 1),
            BoundaryCondition::Constant(_) => return None,
        };
        Some(source as usize)
    }
}

impl fmt::Display for BoundaryCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundaryCondition::Reflect => f.write_str("symmetric mirror"),
            BoundaryCondition::Mirror => f.write_str("mirror"),
            BoundaryCondition::Periodic => f.write_str("periodic"),
            BoundaryCondition::Nearest => f.write_str("zero order"),
            BoundaryCondition::Constant(v) if *v == 0.0 => f.write_str("add zeros"),
            BoundaryCondition::Constant(v) => write!(f, "constant {}", v),
        }
    }
}

impl FromStr for BoundaryCondition {
    type Err = SeparableError;

    /// Parse a boundary condition name. An empty string selects the default.
    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim().to_ascii_lowercase();
        match name.as_str() {
            "" | "default" | "symmetric mirror" | "reflect" => Ok(BoundaryCondition::Reflect),
            "mirror" | "asymmetric mirror" => Ok(BoundaryCondition::Mirror),
            "periodic" | "wrap" => Ok(BoundaryCondition::Periodic),
            "zero order" | "nearest" => Ok(BoundaryCondition::Nearest),
            "add zeros" | "zero" => Ok(BoundaryCondition::Constant(0.0)),
            _ => {
                if let Some(value) = name.strip_prefix("constant") {
                    if let Ok(v) = value.trim().parse::<f64>() {
                        return Ok(BoundaryCondition::Constant(v));
                    }
                }
                Err(SeparableError::UnknownBoundaryCondition(s.to_string()))
            }
        }
    }
}

/// Fill the margins of a staged line in place.
///
/// `line.ptr` points at pixel 0; the margins are pixels `-border..0` and
/// `length..length + border`. Lines of length 0 are left untouched.
///
/// # Safety
/// Every sample in `-border..length + border` (times `tensor_length`
/// elements) must be valid for reads and writes through `line`.
pub unsafe fn expand_buffer(
    line: RawLine<*mut u8>,
    length: usize,
    tensor_length: usize,
    border: usize,
    condition: BoundaryCondition,
) {
    if length == 0 || border == 0 {
        return;
    }
    let size = line.data_type.size_of();
    let write = line.data_type.writer();
    let left = -(border as isize)..0;
    let right = length as isize..(length + border) as isize;
    for index in left.chain(right) {
        let source = condition.source_index(index, length);
        for t in 0..tensor_length {
            let dst = line.ptr.offset(line.byte_offset(index, t));
            match (source, condition) {
                (Some(s), _) => {
                    let src = line.ptr.offset(line.byte_offset(s as isize, t));
                    std::ptr::copy_nonoverlapping(src, dst, size);
                }
                (None, BoundaryCondition::Constant(v)) => write(dst, Complex64::new(v, 0.0)),
                (None, _) => std::ptr::write_bytes(dst, 0, size),
            }
        }
    }
}

/// Fill the first and last `border` entries of a scalar line from the rest.
///
/// ```rust
/// use strided_separable::{expand_line, BoundaryCondition};
///
/// let mut line = [0.0, 0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 0.0, 0.0];
/// expand_line(&mut line, 2, BoundaryCondition::Mirror).unwrap();
/// assert_eq!(line, [3.0, 2.0, 1.0, 2.0, 3.0, 4.0, 5.0, 4.0, 3.0]);
/// ```
pub fn expand_line<T: Sample>(
    line: &mut [T],
    border: usize,
    condition: BoundaryCondition,
) -> Result<()> {
    let found = line.len();
    let length = found
        .checked_sub(2 * border)
        .ok_or(SeparableError::ArrayLengthMismatch {
            expected: 2 * border,
            found,
        })?;
    if length == 0 {
        return Ok(());
    }
    let ptr = line.as_mut_ptr().cast::<u8>();
    let raw = RawLine {
        ptr: ptr.wrapping_add(border * std::mem::size_of::<T>()),
        data_type: T::DATA_TYPE,
        stride: 1,
        tensor_stride: 1,
    };
    // SAFETY: `line` covers exactly `border + length + border` samples.
    unsafe { expand_buffer(raw, length, 1, border, condition) };
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn indices(condition: BoundaryCondition, n: usize, range: std::ops::Range<isize>) -> Vec<Option<usize>> {
        range.map(|i| condition.source_index(i, n)).collect()
    }

    #[test]
    fn test_reflect_repeats_edge() {
        assert_eq!(
            indices(BoundaryCondition::Reflect, 4, -3..0),
            vec![Some(2), Some(1), Some(0)]
        );
        assert_eq!(
            indices(BoundaryCondition::Reflect, 4, 4..7),
            vec![Some(3), Some(2), Some(1)]
        );
    }

    #[test]
    fn test_mirror_skips_edge() {
        assert_eq!(
            indices(BoundaryCondition::Mirror, 5, -2..0),
            vec![Some(2), Some(1)]
        );
        assert_eq!(
            indices(BoundaryCondition::Mirror, 5, 5..7),
            vec![Some(3), Some(2)]
        );
    }

    #[test]
    fn test_mirror_single_pixel() {
        assert_eq!(
            indices(BoundaryCondition::Mirror, 1, -3..4),
            vec![Some(0); 7]
        );
    }

    #[test]
    fn test_margin_wider_than_line() {
        // Reflect over a 2-pixel line: ... b a | a b | b a a b ...
        assert_eq!(
            indices(BoundaryCondition::Reflect, 2, 2..6),
            vec![Some(1), Some(0), Some(0), Some(1)]
        );
        assert_eq!(
            indices(BoundaryCondition::Periodic, 3, -7..-4),
            vec![Some(2), Some(0), Some(1)]
        );
        assert_eq!(
            indices(BoundaryCondition::Mirror, 3, 3..8),
            vec![Some(1), Some(0), Some(1), Some(2), Some(1)]
        );
    }

    #[test]
    fn test_nearest_and_constant() {
        assert_eq!(
            indices(BoundaryCondition::Nearest, 3, -2..5),
            vec![Some(0), Some(0), Some(0), Some(1), Some(2), Some(2), Some(2)]
        );
        assert_eq!(BoundaryCondition::Constant(1.5).source_index(-1, 3), None);
        assert_eq!(BoundaryCondition::Constant(1.5).source_index(1, 3), Some(1));
        assert_eq!(BoundaryCondition::Reflect.source_index(0, 0), None);
    }

    #[test]
    fn test_expand_line_conditions() {
        let base = [0.0f64, 0.0, 1.0, 2.0, 3.0, 0.0, 0.0];
        let mut line = base;
        expand_line(&mut line, 2, BoundaryCondition::Reflect).unwrap();
        assert_eq!(line, [2.0, 1.0, 1.0, 2.0, 3.0, 3.0, 2.0]);

        let mut line = base;
        expand_line(&mut line, 2, BoundaryCondition::Periodic).unwrap();
        assert_eq!(line, [2.0, 3.0, 1.0, 2.0, 3.0, 1.0, 2.0]);

        let mut line = base;
        expand_line(&mut line, 2, BoundaryCondition::Constant(-0.5)).unwrap();
        assert_relative_eq!(line[0], -0.5);
        assert_relative_eq!(line[6], -0.5);
        assert_relative_eq!(line[3], 2.0);
    }

    #[test]
    fn test_expand_line_integer_constant_saturates() {
        let mut line = [9u8, 1, 2, 9];
        expand_line(&mut line, 1, BoundaryCondition::Constant(300.0)).unwrap();
        assert_eq!(line, [255, 1, 2, 255]);
    }

    #[test]
    fn test_expand_line_too_short() {
        let mut line = [0.0f32; 3];
        assert!(matches!(
            expand_line(&mut line, 2, BoundaryCondition::Reflect),
            Err(SeparableError::ArrayLengthMismatch {
                expected: 4,
                found: 3
            })
        ));
    }

    #[test]
    fn test_expand_interleaved_tensor() {
        // Two-element pixels, stride 2: line (1,10) (2,20), one pixel of margin
        let mut buf = [0i32, 0, 1, 10, 2, 20, 0, 0];
        let raw = RawLine {
            ptr: buf.as_mut_ptr().wrapping_add(2).cast::<u8>(),
            data_type: strided_image::DataType::SInt32,
            stride: 2,
            tensor_stride: 1,
        };
        unsafe { expand_buffer(raw, 2, 2, 1, BoundaryCondition::Nearest) };
        assert_eq!(buf, [1, 10, 1, 10, 2, 20, 2, 20]);
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("".parse::<BoundaryCondition>().unwrap(), BoundaryCondition::Reflect);
        assert_eq!(
            "Symmetric Mirror".parse::<BoundaryCondition>().unwrap(),
            BoundaryCondition::Reflect
        );
        assert_eq!("mirror".parse::<BoundaryCondition>().unwrap(), BoundaryCondition::Mirror);
        assert_eq!(
            "periodic".parse::<BoundaryCondition>().unwrap(),
            BoundaryCondition::Periodic
        );
        assert_eq!(
            "zero order".parse::<BoundaryCondition>().unwrap(),
            BoundaryCondition::Nearest
        );
        assert_eq!(
            "add zeros".parse::<BoundaryCondition>().unwrap(),
            BoundaryCondition::Constant(0.0)
        );
        assert_eq!(
            "constant 2.5".parse::<BoundaryCondition>().unwrap(),
            BoundaryCondition::Constant(2.5)
        );
        assert!(matches!(
            "sideways".parse::<BoundaryCondition>(),
            Err(SeparableError::UnknownBoundaryCondition(name)) if name == "sideways"
        ));
    }

    #[test]
    fn test_display_parses_back() {
        for bc in [
            BoundaryCondition::Reflect,
            BoundaryCondition::Mirror,
            BoundaryCondition::Periodic,
            BoundaryCondition::Nearest,
            BoundaryCondition::Constant(0.0),
            BoundaryCondition::Constant(-3.0),
        ] {
            assert_eq!(bc.to_string().parse::<BoundaryCondition>().unwrap(), bc);
        }
    }
}
