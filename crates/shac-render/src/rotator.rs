//! Cached block rotation for the real-time decode path.
//!
//! Rotation matrices are deterministic in (order, yaw, pitch), so the
//! rotator quantizes the angles to 1° bins and keeps the matrices in a
//! bounded LRU cache. A hit applies the cached matrices without any
//! recomputation; a miss computes them inline — bounded work at
//! order ≤ 7 — and inserts. The cache is owned by the audio thread, so
//! no locking is involved.

use std::collections::HashMap;

use shac_math::{channel_count, ShRotation};

/// Default cache bound, in distinct quantized orientations.
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

struct CachedRotation {
    rotation: ShRotation,
    last_used: u64,
}

/// Applies field rotations to interleaved ambisonic blocks, caching
/// the per-order matrices by quantized angle.
pub struct Rotator {
    order: u16,
    channels: usize,
    capacity: usize,
    cache: HashMap<(i32, i32), CachedRotation>,
    tick: u64,
}

impl Rotator {
    pub fn new(order: u16) -> Self {
        Self::with_capacity(order, DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_capacity(order: u16, capacity: usize) -> Self {
        Self {
            order,
            channels: channel_count(order),
            capacity: capacity.max(1),
            cache: HashMap::with_capacity(capacity.max(1).min(DEFAULT_CACHE_CAPACITY)),
            tick: 0,
        }
    }

    pub fn order(&self) -> u16 {
        self.order
    }

    /// Number of cached orientations.
    pub fn cached_rotations(&self) -> usize {
        self.cache.len()
    }

    /// Rotate `frames` interleaved frames of `block` in place by the
    /// given field rotation (yaw about +Y, then pitch about +X).
    ///
    /// To counter-rotate for a listener orientation, pass the negated
    /// pose angles. Angles are quantized to 1° bins; the applied
    /// matrices are built from the binned angles so hits and misses
    /// agree exactly.
    pub fn apply(&mut self, block: &mut [f32], frames: usize, yaw: f32, pitch: f32) {
        debug_assert!(block.len() >= frames * self.channels);

        let key = quantize(yaw, pitch);
        if key == (0, 0) {
            // Identity: a front-facing listener skips the matrix work.
            return;
        }

        self.tick += 1;
        let tick = self.tick;

        if let Some(entry) = self.cache.get_mut(&key) {
            entry.last_used = tick;
        } else {
            if self.cache.len() >= self.capacity {
                self.evict_least_recent();
            }
            let rotation = ShRotation::from_yaw_pitch(
                self.order,
                (key.0 as f32).to_radians(),
                (key.1 as f32).to_radians(),
            );
            self.cache.insert(
                key,
                CachedRotation {
                    rotation,
                    last_used: tick,
                },
            );
        }

        let rotation = &self.cache[&key].rotation;
        for frame in block[..frames * self.channels].chunks_exact_mut(self.channels) {
            rotation.apply(frame);
        }
    }

    fn evict_least_recent(&mut self) {
        if let Some((&key, _)) = self.cache.iter().min_by_key(|(_, e)| e.last_used) {
            self.cache.remove(&key);
        }
    }

    #[cfg(test)]
    fn contains(&self, yaw_deg: i32, pitch_deg: i32) -> bool {
        self.cache.contains_key(&(yaw_deg, pitch_deg))
    }
}

/// Quantize angles in radians to whole-degree bins: yaw wrapped to
/// [-180, 180), pitch clamped to [-90, 90].
fn quantize(yaw: f32, pitch: f32) -> (i32, i32) {
    let yaw_deg = yaw.to_degrees().rem_euclid(360.0);
    let mut yaw_bin = yaw_deg.round() as i32;
    if yaw_bin >= 180 {
        yaw_bin -= 360;
    }
    let pitch_bin = pitch.to_degrees().clamp(-90.0, 90.0).round() as i32;
    (yaw_bin, pitch_bin)
}
