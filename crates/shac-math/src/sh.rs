//! Real spherical harmonic evaluation.
//!
//! Harmonics are evaluated from navigational direction angles (azimuth
//! from front toward right, elevation toward up) in the basis described
//! in the crate docs: the zonal axis is the front (+Z) axis, so the
//! `m = 0` harmonic of every degree peaks straight ahead, and the
//! first-order channels align with the up / front / right axes.
//!
//! Associated Legendre values come from the standard three-term
//! recurrences, evaluated in `f64` and emitted as `f32`. The
//! Condon–Shortley phase is excluded, as is conventional in ambisonics.
//! Normalization tables are built once per evaluator; nothing inside
//! the per-direction path recomputes a factorial.

use serde::{Deserialize, Serialize};

use crate::acn::{acn_degree_order, channel_count, MAX_ORDER};

/// Spherical harmonic normalization scheme, fixed per file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u16)]
pub enum Normalization {
    /// Schmidt semi-normalized: the omnidirectional channel is 1.0.
    Sn3d = 1,
    /// Fully orthonormal on the unit sphere: `√(2l+1)` times SN3D.
    N3d = 2,
}

impl Normalization {
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(Self::Sn3d),
            2 => Some(Self::N3d),
            _ => None,
        }
    }

    pub fn as_u16(self) -> u16 {
        self as u16
    }
}

/// Evaluates all `(order + 1)²` harmonics for a direction.
///
/// Construction precomputes the per-channel normalization factors and
/// the ACN → `(l, m)` table; [`coefficients`](ShEvaluator::coefficients)
/// is then pure arithmetic.
#[derive(Debug, Clone)]
pub struct ShEvaluator {
    order: u16,
    /// Per-ACN `(l, |m|, m)` lookup, precomputed.
    index: Vec<(usize, usize, i16)>,
    /// Per-ACN normalization factor, precomputed.
    norm: Vec<f64>,
}

impl ShEvaluator {
    /// Build an evaluator for the given order and normalization.
    ///
    /// Orders above [`MAX_ORDER`] are a caller bug.
    pub fn new(order: u16, normalization: Normalization) -> Self {
        debug_assert!(order <= MAX_ORDER, "order {order} exceeds maximum {MAX_ORDER}");
        let n = channel_count(order);
        let mut index = Vec::with_capacity(n);
        let mut norm = Vec::with_capacity(n);
        for k in 0..n {
            let (l, m) = acn_degree_order(k);
            index.push((l as usize, m.unsigned_abs() as usize, m));
            norm.push(normalization_factor(l, m, normalization));
        }
        Self { order, index, norm }
    }

    pub fn order(&self) -> u16 {
        self.order
    }

    pub fn channel_count(&self) -> usize {
        self.index.len()
    }

    /// Fill `out` with the harmonic values for a direction.
    ///
    /// `out.len()` must equal [`channel_count`](ShEvaluator::channel_count).
    pub fn coefficients(&self, azimuth: f32, elevation: f32, out: &mut [f32]) {
        debug_assert_eq!(out.len(), self.index.len());
        let order = self.order as usize;

        let basis = DirectionBasis::new(azimuth as f64, elevation as f64, order);
        for (k, &(l, am, m)) in self.index.iter().enumerate() {
            let trig = if m > 0 {
                basis.cos_m[am]
            } else if m < 0 {
                basis.sin_m[am]
            } else {
                1.0
            };
            out[k] = (self.norm[k] * basis.legendre[l][am] * trig) as f32;
        }
    }
}

/// Evaluate a single harmonic `Y(l, m, azimuth, elevation)`.
///
/// This mirrors the per-channel contract; bulk callers should prefer
/// [`ShEvaluator`], which amortizes the normalization table.
/// Invalid `(l, m)` is a caller bug.
pub fn eval(l: u16, m: i16, azimuth: f32, elevation: f32, normalization: Normalization) -> f32 {
    debug_assert!(l <= MAX_ORDER, "degree {l} exceeds maximum {MAX_ORDER}");
    debug_assert!(m.unsigned_abs() <= l, "order {m} out of range for degree {l}");

    let am = m.unsigned_abs() as usize;
    let basis = DirectionBasis::new(azimuth as f64, elevation as f64, l as usize);
    let trig = if m > 0 {
        basis.cos_m[am]
    } else if m < 0 {
        basis.sin_m[am]
    } else {
        1.0
    };
    (normalization_factor(l, m, normalization) * basis.legendre[l as usize][am] * trig) as f32
}

/// Per-direction intermediate values shared by all channels.
struct DirectionBasis {
    /// `legendre[l][m]` = `P_l^m` at the direction's zonal coordinate.
    legendre: Vec<Vec<f64>>,
    /// `cos_m[m]` = `cos(m·α)` for the harmonic azimuth α.
    cos_m: Vec<f64>,
    /// `sin_m[m]` = `sin(m·α)`.
    sin_m: Vec<f64>,
}

impl DirectionBasis {
    fn new(azimuth: f64, elevation: f64, order: usize) -> Self {
        // Direction vector in the file frame.
        let x = elevation.cos() * azimuth.sin();
        let y = elevation.sin();
        let z = elevation.cos() * azimuth.cos();

        // Harmonic frame: zonal axis is the front axis, harmonic
        // azimuth runs in the right/up plane.
        let alpha = y.atan2(x);
        let sz = z.clamp(-1.0, 1.0);
        let cz = (1.0 - sz * sz).max(0.0).sqrt();

        let legendre = associated_legendre(order, sz, cz);

        let mut cos_m = Vec::with_capacity(order + 1);
        let mut sin_m = Vec::with_capacity(order + 1);
        for m in 0..=order {
            let (s, c) = (m as f64 * alpha).sin_cos();
            cos_m.push(c);
            sin_m.push(s);
        }

        Self {
            legendre,
            cos_m,
            sin_m,
        }
    }
}

/// Associated Legendre values `P_l^m(x)` for all `0 ≤ m ≤ l ≤ order`,
/// without the Condon–Shortley phase. `c` is `√(1 − x²)`.
///
/// Recurrences:
/// - `P(0,0) = 1`
/// - `P(m,m) = (2m−1)!! · c^m`
/// - `P(m+1,m) = (2m+1) · x · P(m,m)`
/// - `P(l,m) = ((2l−1)·x·P(l−1,m) − (l+m−1)·P(l−2,m)) / (l−m)`
fn associated_legendre(order: usize, x: f64, c: f64) -> Vec<Vec<f64>> {
    let mut p = vec![vec![0.0; order + 1]; order + 1];
    p[0][0] = 1.0;
    for m in 1..=order {
        p[m][m] = p[m - 1][m - 1] * (2 * m - 1) as f64 * c;
    }
    for m in 0..order {
        p[m + 1][m] = (2 * m + 1) as f64 * x * p[m][m];
    }
    for m in 0..=order {
        for l in (m + 2)..=order {
            p[l][m] = ((2 * l - 1) as f64 * x * p[l - 1][m] - (l + m - 1) as f64 * p[l - 2][m])
                / (l - m) as f64;
        }
    }
    p
}

fn factorial(n: u32) -> f64 {
    (1..=n as u64).map(|i| i as f64).product()
}

/// `√((2−δ_{m,0}) · (l−|m|)! / (l+|m|)!)`, times `√(2l+1)` for N3D.
fn normalization_factor(l: u16, m: i16, normalization: Normalization) -> f64 {
    let am = m.unsigned_abs() as u32;
    let two = if m == 0 { 1.0 } else { 2.0 };
    let mut n = (two * factorial(l as u32 - am) / factorial(l as u32 + am)).sqrt();
    if normalization == Normalization::N3d {
        n *= (2.0 * l as f64 + 1.0).sqrt();
    }
    n
}
