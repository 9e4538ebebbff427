//! Per-order ambisonic rotation matrices.
//!
//! A rotation of the sound field acts independently on each spherical
//! harmonic degree: degree `l` has its own `(2l+1)×(2l+1)` real matrix,
//! and degree 0 is always the identity. Degree 1 is a permutation of
//! the Cartesian rotation matrix; degrees 2 and above are built from
//! the degree-1 and degree-(l−1) matrices with the Ivanic–Ruedenberg
//! recurrence (including the published erratum), which stays numerically
//! stable through order 7.
//!
//! Matrices are constructed in `f64` and applied in `f32`. SN3D and
//! N3D share the same rotation matrices, since the two schemes differ
//! only by a per-degree constant.

use crate::acn::{channel_count, MAX_ORDER};

/// A per-degree set of rotation matrices for one field rotation.
#[derive(Debug, Clone)]
pub struct ShRotation {
    order: u16,
    /// `blocks[l]` is the row-major `(2l+1)×(2l+1)` matrix for degree `l`.
    blocks: Vec<Vec<f32>>,
}

impl ShRotation {
    /// Build the rotation that yaws the field about +Y (up), then
    /// pitches it about +X (right).
    ///
    /// Positive yaw moves a front source toward the right (+X);
    /// positive pitch moves a front source up (+Y). To counter-rotate
    /// a field for a listener with orientation `(yaw, pitch)`, pass the
    /// negated angles.
    pub fn from_yaw_pitch(order: u16, yaw: f32, pitch: f32) -> Self {
        let (sy, cy) = (yaw as f64).sin_cos();
        let (sp, cp) = (pitch as f64).sin_cos();

        // Rows and columns over (x, y, z); v' = M · v.
        let ry = [[cy, 0.0, sy], [0.0, 1.0, 0.0], [-sy, 0.0, cy]];
        let rx = [[1.0, 0.0, 0.0], [0.0, cp, sp], [0.0, -sp, cp]];
        Self::from_matrix3(order, &mat3_mul(&rx, &ry))
    }

    /// Build per-degree matrices from an arbitrary 3×3 Cartesian
    /// rotation (rows/columns over x, y, z).
    pub fn from_matrix3(order: u16, m: &[[f64; 3]; 3]) -> Self {
        debug_assert!(order <= MAX_ORDER);

        let mut bands: Vec<Vec<f64>> = Vec::with_capacity(order as usize + 1);
        bands.push(vec![1.0]);

        if order >= 1 {
            // Degree-1 basis ordering is (m = −1, 0, +1) ↔ (y, z, x).
            const AXIS: [usize; 3] = [1, 2, 0];
            let mut band1 = vec![0.0; 9];
            for (i, &ai) in AXIS.iter().enumerate() {
                for (j, &aj) in AXIS.iter().enumerate() {
                    band1[i * 3 + j] = m[ai][aj];
                }
            }
            bands.push(band1);
        }

        for l in 2..=order as i64 {
            let band = ivanic_ruedenberg_band(l, &bands[1], &bands[l as usize - 1]);
            bands.push(band);
        }

        let blocks = bands
            .into_iter()
            .map(|b| b.into_iter().map(|v| v as f32).collect())
            .collect();
        Self { order, blocks }
    }

    pub fn order(&self) -> u16 {
        self.order
    }

    /// Rotate one coefficient frame in place.
    ///
    /// `frame.len()` must equal `(order + 1)²`. Degree 0 is untouched;
    /// each higher degree is a dense matrix-vector product.
    pub fn apply(&self, frame: &mut [f32]) {
        debug_assert_eq!(frame.len(), channel_count(self.order));
        let mut tmp = [0.0f32; 2 * MAX_ORDER as usize + 1];
        for l in 1..=self.order as usize {
            let base = l * l;
            let size = 2 * l + 1;
            let block = &self.blocks[l];
            for (i, t) in tmp.iter_mut().enumerate().take(size) {
                let row = &block[i * size..(i + 1) * size];
                let mut acc = 0.0;
                for (j, &r) in row.iter().enumerate() {
                    acc += r * frame[base + j];
                }
                *t = acc;
            }
            frame[base..base + size].copy_from_slice(&tmp[..size]);
        }
    }
}

fn mat3_mul(a: &[[f64; 3]; 3], b: &[[f64; 3]; 3]) -> [[f64; 3]; 3] {
    let mut out = [[0.0; 3]; 3];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = (0..3).map(|k| a[i][k] * b[k][j]).sum();
        }
    }
    out
}

/// One degree of the Ivanic–Ruedenberg recurrence.
///
/// `r1` is the degree-1 matrix (3×3), `prev` the degree-(l−1) matrix;
/// both are row-major with rows/columns running `m = −l .. l`.
fn ivanic_ruedenberg_band(l: i64, r1: &[f64], prev: &[f64]) -> Vec<f64> {
    let size = (2 * l + 1) as usize;
    let mut out = vec![0.0; size * size];

    let r = |i: i64, j: i64| r1[((i + 1) * 3 + (j + 1)) as usize];
    let sub = |a: i64, b: i64| prev[((a + l - 1) * (2 * l - 1) + (b + l - 1)) as usize];

    // The P helper of the recurrence; `i` selects a degree-1 row.
    let p = |i: i64, a: i64, b: i64| -> f64 {
        if b == l {
            r(i, 1) * sub(a, l - 1) - r(i, -1) * sub(a, -l + 1)
        } else if b == -l {
            r(i, 1) * sub(a, -l + 1) + r(i, -1) * sub(a, l - 1)
        } else {
            r(i, 0) * sub(a, b)
        }
    };

    for m in -l..=l {
        for n in -l..=l {
            let d = if m == 0 { 1.0 } else { 0.0 };
            let denom = if n.abs() == l {
                ((2 * l) * (2 * l - 1)) as f64
            } else {
                ((l + n) * (l - n)) as f64
            };

            let u = (((l + m) * (l - m)) as f64 / denom).sqrt();
            let v = 0.5
                * (1.0 - 2.0 * d)
                * ((1.0 + d) * ((l + m.abs() - 1) * (l + m.abs())) as f64 / denom).sqrt();
            let w = -0.5 * (1.0 - d) * (((l - m.abs() - 1) * (l - m.abs())) as f64 / denom).sqrt();

            let mut val = 0.0;
            if u != 0.0 {
                val += u * p(0, m, n);
            }
            if v != 0.0 {
                let term = if m == 0 {
                    p(1, 1, n) + p(-1, -1, n)
                } else if m > 0 {
                    let d1: f64 = if m == 1 { 1.0 } else { 0.0 };
                    p(1, m - 1, n) * (1.0 + d1).sqrt() - p(-1, -m + 1, n) * (1.0 - d1)
                } else {
                    let d1 = if m == -1 { 1.0 } else { 0.0 };
                    p(1, m + 1, n) * (1.0 - d1) + p(-1, -m - 1, n) * (1.0 + d1).sqrt()
                };
                val += v * term;
            }
            if w != 0.0 {
                let term = if m > 0 {
                    p(1, m + 1, n) + p(-1, -m - 1, n)
                } else {
                    p(1, m - 1, n) - p(-1, -m + 1, n)
                };
                val += w * term;
            }

            out[((m + l) * (2 * l + 1) + (n + l)) as usize] = val;
        }
    }
    out
}
