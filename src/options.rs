//! Options controlling the separable driver.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// A single option flag for [`separable`](crate::separable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeparableOption {
    /// The output keeps its current sizes instead of taking the input's.
    DontResizeOutput,
    /// Fold the tensor into a new leading spatial dimension.
    AsScalarImage,
    /// Stage compact tensor layouts as full column-major matrices.
    ExpandTensorInBuffer,
    /// Always stage the input through a line buffer.
    UseInputBuffer,
    /// Always stage the output through a line buffer.
    UseOutputBuffer,
    /// Give the output buffer the same margin as the input buffer.
    UseOutputBorder,
}

impl SeparableOption {
    const ALL: [SeparableOption; 6] = [
        SeparableOption::DontResizeOutput,
        SeparableOption::AsScalarImage,
        SeparableOption::ExpandTensorInBuffer,
        SeparableOption::UseInputBuffer,
        SeparableOption::UseOutputBuffer,
        SeparableOption::UseOutputBorder,
    ];

    #[inline]
    const fn bit(self) -> u8 {
        1 << self as u8
    }
}

/// A set of [`SeparableOption`]s.
///
/// ```rust
/// use strided_separable::{SeparableOption, SeparableOptions};
///
/// let opts = SeparableOption::AsScalarImage | SeparableOption::UseInputBuffer;
/// assert!(opts.contains(SeparableOption::AsScalarImage));
/// assert!(!opts.contains(SeparableOption::UseOutputBuffer));
/// assert!(SeparableOptions::empty().is_empty());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SeparableOptions(u8);

impl SeparableOptions {
    pub const fn empty() -> Self {
        SeparableOptions(0)
    }

    #[inline]
    pub const fn contains(self, option: SeparableOption) -> bool {
        self.0 & option.bit() != 0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn insert(&mut self, option: SeparableOption) {
        self.0 |= option.bit();
    }

    pub fn remove(&mut self, option: SeparableOption) {
        self.0 &= !option.bit();
    }

    pub fn iter(self) -> impl Iterator<Item = SeparableOption> {
        SeparableOption::ALL
            .into_iter()
            .filter(move |&o| self.contains(o))
    }
}

impl fmt::Debug for SeparableOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl From<SeparableOption> for SeparableOptions {
    fn from(option: SeparableOption) -> Self {
        SeparableOptions(option.bit())
    }
}

impl FromIterator<SeparableOption> for SeparableOptions {
    fn from_iter<I: IntoIterator<Item = SeparableOption>>(iter: I) -> Self {
        let mut set = SeparableOptions::empty();
        for option in iter {
            set.insert(option);
        }
        set
    }
}

impl BitOr for SeparableOptions {
    type Output = SeparableOptions;

    fn bitor(self, rhs: SeparableOptions) -> SeparableOptions {
        SeparableOptions(self.0 | rhs.0)
    }
}

impl BitOr<SeparableOption> for SeparableOptions {
    type Output = SeparableOptions;

    fn bitor(self, rhs: SeparableOption) -> SeparableOptions {
        SeparableOptions(self.0 | rhs.bit())
    }
}

impl BitOr for SeparableOption {
    type Output = SeparableOptions;

    fn bitor(self, rhs: SeparableOption) -> SeparableOptions {
        SeparableOptions(self.bit() | rhs.bit())
    }
}

impl BitOrAssign<SeparableOption> for SeparableOptions {
    fn bitor_assign(&mut self, rhs: SeparableOption) {
        self.insert(rhs);
    }
}
