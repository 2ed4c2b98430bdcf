//! Physical size of a pixel along each image dimension.

use std::fmt;

/// A magnitude with units, e.g. `0.25 um`.
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalQuantity {
    pub magnitude: f64,
    pub units: String,
}

impl PhysicalQuantity {
    pub fn new(magnitude: f64, units: impl Into<String>) -> Self {
        Self {
            magnitude,
            units: units.into(),
        }
    }

    /// One pixel, the size reported for dimensions without physical units.
    pub fn pixel() -> Self {
        Self::new(1.0, "px")
    }

    pub fn is_pixel(&self) -> bool {
        self.magnitude == 1.0 && self.units == "px"
    }
}

impl fmt::Display for PhysicalQuantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.magnitude, self.units)
    }
}

/// Per-dimension pixel size.
///
/// Dimensions beyond the stored entries repeat the last entry, so a single
/// entry describes an isotropic pixel. An empty pixel size is undefined and
/// reports one pixel for every dimension.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PixelSize {
    sizes: Vec<PhysicalQuantity>,
}

impl PixelSize {
    pub fn new(sizes: Vec<PhysicalQuantity>) -> Self {
        Self { sizes }
    }

    pub fn isotropic(size: PhysicalQuantity) -> Self {
        Self { sizes: vec![size] }
    }

    #[inline]
    pub fn is_defined(&self) -> bool {
        !self.sizes.is_empty()
    }

    /// Size along dimension `dim`.
    pub fn get(&self, dim: usize) -> PhysicalQuantity {
        match self.sizes.get(dim).or_else(|| self.sizes.last()) {
            Some(q) => q.clone(),
            None => PhysicalQuantity::pixel(),
        }
    }

    /// Set the size along dimension `dim`, materializing the entries before it.
    pub fn set(&mut self, dim: usize, size: PhysicalQuantity) {
        self.extend_to(dim + 1);
        self.sizes[dim] = size;
    }

    /// Insert a new dimension at `dim`; later dimensions shift up by one.
    pub fn insert(&mut self, dim: usize, size: PhysicalQuantity) {
        if !self.is_defined() {
            return;
        }
        self.extend_to(dim);
        self.sizes.insert(dim, size);
    }

    fn extend_to(&mut self, len: usize) {
        let fill = self
            .sizes
            .last()
            .cloned()
            .unwrap_or_else(PhysicalQuantity::pixel);
        if self.sizes.len() < len {
            self.sizes.resize(len, fill);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undefined_reports_pixel() {
        let ps = PixelSize::default();
        assert!(!ps.is_defined());
        assert!(ps.get(3).is_pixel());
    }

    #[test]
    fn test_isotropic_repeats_last() {
        let ps = PixelSize::isotropic(PhysicalQuantity::new(0.5, "um"));
        assert_eq!(ps.get(0), PhysicalQuantity::new(0.5, "um"));
        assert_eq!(ps.get(7), PhysicalQuantity::new(0.5, "um"));
    }

    #[test]
    fn test_insert_shifts_dimensions() {
        let mut ps = PixelSize::new(vec![
            PhysicalQuantity::new(1.0, "um"),
            PhysicalQuantity::new(2.0, "um"),
        ]);
        ps.insert(0, PhysicalQuantity::pixel());
        assert!(ps.get(0).is_pixel());
        assert_eq!(ps.get(1).magnitude, 1.0);
        assert_eq!(ps.get(2).magnitude, 2.0);
    }

    #[test]
    fn test_insert_into_undefined_stays_undefined() {
        let mut ps = PixelSize::default();
        ps.insert(0, PhysicalQuantity::pixel());
        assert!(!ps.is_defined());
    }

    #[test]
    fn test_set_extends() {
        let mut ps = PixelSize::isotropic(PhysicalQuantity::new(3.0, "nm"));
        ps.set(2, PhysicalQuantity::new(9.0, "nm"));
        assert_eq!(ps.get(1).magnitude, 3.0);
        assert_eq!(ps.get(2).magnitude, 9.0);
        assert_eq!(ps.get(2).to_string(), "9 nm");
    }
}
