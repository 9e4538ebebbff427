//! Ambisonic Channel Number (ACN) indexing.
//!
//! ACN is the canonical flat ordering of spherical harmonic channels:
//! `k = l² + l + m` for degree `l` and order `m` with `−l ≤ m ≤ l`.
//! For a maximum degree `L` the channel count is `(L + 1)²`.

/// Highest ambisonic order supported by the codec.
pub const MAX_ORDER: u16 = 7;

/// Number of ambisonic channels for the given order: `(order + 1)²`.
pub fn channel_count(order: u16) -> usize {
    let n = order as usize + 1;
    n * n
}

/// ACN index for a `(degree, order)` pair: `k = l² + l + m`.
///
/// Debug-asserts `m` within `−l ..= l`; an out-of-range pair is a
/// caller bug, not a runtime condition.
pub fn acn_index(l: u16, m: i16) -> usize {
    debug_assert!(m.unsigned_abs() <= l, "order {m} out of range for degree {l}");
    let l = l as usize;
    (l * l + l).wrapping_add_signed(m as isize)
}

/// Inverse of [`acn_index`]: `l = ⌊√k⌋`, `m = k − l² − l`.
pub fn acn_degree_order(k: usize) -> (u16, i16) {
    let l = (k as f64).sqrt() as usize;
    let m = k as isize - (l * l + l) as isize;
    (l as u16, m as i16)
}
