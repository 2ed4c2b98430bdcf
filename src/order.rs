//! Order in which the dimensions are filtered.
//!
//! Passes run from the smallest to the largest absolute input stride, so
//! the dimensions walked first are the cheapest to stage. When the output
//! is resized, dimensions that shrink are processed before those that
//! grow, keeping intermediate results as small as possible.

/// Per-dimension size ratio `output / input`; an empty input counts as 1.
pub fn growth_ratios(in_sizes: &[usize], out_sizes: &[usize]) -> Vec<f64> {
    in_sizes
        .iter()
        .zip(out_sizes)
        .map(|(&i, &o)| if i == 0 { 1.0 } else { o as f64 / i as f64 })
        .collect()
}

/// Dimensions with `process[d]` set, in the order they should be filtered.
///
/// Sorts stably by `|strides[d]|`, then stably by `grow[d]`.
pub(crate) fn compute_order(process: &[bool], strides: &[isize], grow: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = process
        .iter()
        .enumerate()
        .filter(|(_, &p)| p)
        .map(|(d, _)| d)
        .collect();
    order.sort_by_key(|&d| strides[d].unsigned_abs());
    order.sort_by(|&a, &b| grow[a].total_cmp(&grow[b]));
    order
}
