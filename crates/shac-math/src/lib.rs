//! # shac-math
//!
//! The numerical core of the SHAC spatial audio codec: ACN channel
//! indexing, Cartesian/spherical coordinate conversion, real spherical
//! harmonic evaluation (SN3D and N3D), and per-order ambisonic rotation
//! matrices.
//!
//! ## Conventions
//!
//! SHAC uses a right-handed coordinate system with **+X = right,
//! +Y = up, +Z = front**. Navigational azimuth is `atan2(x, z)`
//! (0 = front, +90° = right) and elevation is `asin(y / r)`
//! (0 = horizon, +90° = up).
//!
//! The spherical harmonic basis is aligned so that each first-order
//! channel peaks along its same-named axis: ACN 1 at +Y (up), ACN 2 at
//! +Z (front), ACN 3 at +X (right). Consequently the zonal (m = 0)
//! harmonics of every order aim forward, and a source yawed to azimuth
//! zero concentrates its energy in the `ACN(l, 0)` channels.

pub mod acn;
pub mod coord;
pub mod rotation;
pub mod sh;

pub use acn::{acn_degree_order, acn_index, channel_count, MAX_ORDER};
pub use coord::{to_spherical, Spherical, Vec3};
pub use rotation::ShRotation;
pub use sh::{eval, Normalization, ShEvaluator};
