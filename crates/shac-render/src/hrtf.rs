//! Binaural decoding tables — ambisonic bus to headphone stereo.
//!
//! A decoder accepts either of two HRTF representations, chosen at
//! open time:
//!
//! - **Matrix**: one scalar per (ear, channel). Decoding is a dot
//!   product per frame — the short-impulse-response approximation.
//! - **FIR**: one impulse response per (ear, channel), convolved in
//!   direct form with persistent per-channel history so block
//!   boundaries are seamless.
//!
//! [`HrtfTable::virtual_stereo`] builds a matrix table from a ±30°
//! virtual speaker pair for use when no measured dataset is loaded.

use shac_math::{Normalization, ShEvaluator};

use crate::error::{RenderError, Result};

/// One ear/channel FIR filter with its ring-buffer history.
#[derive(Debug, Clone)]
struct FirFilter {
    taps: Vec<f32>,
    history: Vec<f32>,
    pos: usize,
}

impl FirFilter {
    fn new(taps: Vec<f32>) -> Self {
        let len = taps.len();
        Self {
            taps,
            history: vec![0.0; len],
            pos: 0,
        }
    }

    /// Push one input sample and produce one output sample.
    fn process(&mut self, x: f32) -> f32 {
        let len = self.history.len();
        self.history[self.pos] = x;
        let mut acc = 0.0;
        let mut idx = self.pos;
        for &tap in &self.taps {
            acc += tap * self.history[idx];
            idx = if idx == 0 { len - 1 } else { idx - 1 };
        }
        self.pos = (self.pos + 1) % len;
        acc
    }
}

/// An ambisonic-to-binaural rendering table for one decoder.
///
/// The FIR variant carries convolution state, so a table belongs to
/// exactly one decoder for its lifetime.
#[derive(Debug, Clone)]
pub enum HrtfTable {
    /// Scalar decode matrix: `left[k]` / `right[k]` weight channel `k`.
    Matrix { left: Vec<f32>, right: Vec<f32> },
    /// Per-channel impulse responses with convolution state.
    Fir {
        left: Vec<FirFilterBox>,
        right: Vec<FirFilterBox>,
    },
}

/// Opaque wrapper so the filter internals stay private.
#[derive(Debug, Clone)]
pub struct FirFilterBox(FirFilter);

impl HrtfTable {
    /// Build a scalar matrix table.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::HrtfChannelMismatch`] when the two ears
    /// disagree in length or the table is empty.
    pub fn from_matrix(left: Vec<f32>, right: Vec<f32>) -> Result<Self> {
        if left.is_empty() {
            return Err(RenderError::HrtfChannelMismatch {
                expected: 1,
                got: 0,
            });
        }
        if left.len() != right.len() {
            return Err(RenderError::HrtfChannelMismatch {
                expected: left.len(),
                got: right.len(),
            });
        }
        Ok(Self::Matrix { left, right })
    }

    /// Build a convolution table from `(left_ir, right_ir)` pairs, one
    /// per ambisonic channel in ACN order.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::HrtfChannelMismatch`] for an empty table
    /// and [`RenderError::EmptyImpulseResponse`] for a zero-length IR.
    pub fn from_impulse_responses(pairs: Vec<(Vec<f32>, Vec<f32>)>) -> Result<Self> {
        if pairs.is_empty() {
            return Err(RenderError::HrtfChannelMismatch {
                expected: 1,
                got: 0,
            });
        }
        let mut left = Vec::with_capacity(pairs.len());
        let mut right = Vec::with_capacity(pairs.len());
        for (channel, (l, r)) in pairs.into_iter().enumerate() {
            if l.is_empty() || r.is_empty() {
                return Err(RenderError::EmptyImpulseResponse { channel });
            }
            left.push(FirFilterBox(FirFilter::new(l)));
            right.push(FirFilterBox(FirFilter::new(r)));
        }
        Ok(Self::Fir { left, right })
    }

    /// A matrix table decoding through a virtual speaker pair at ±30°
    /// azimuth on the horizon, for files of the given order and
    /// normalization.
    pub fn virtual_stereo(order: u16, normalization: Normalization) -> Result<Self> {
        if order == 0 || order > shac_math::MAX_ORDER {
            return Err(RenderError::InvalidOrder(order));
        }
        let evaluator = ShEvaluator::new(order, normalization);
        let n = evaluator.channel_count();

        let speaker = 30f32.to_radians();
        let mut left = vec![0.0; n];
        let mut right = vec![0.0; n];
        evaluator.coefficients(-speaker, 0.0, &mut left);
        evaluator.coefficients(speaker, 0.0, &mut right);

        // Two speakers share the load.
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            *l *= 0.5;
            *r *= 0.5;
        }
        Ok(Self::Matrix { left, right })
    }

    /// Number of ambisonic channels this table decodes.
    pub fn channels(&self) -> usize {
        match self {
            Self::Matrix { left, .. } => left.len(),
            Self::Fir { left, .. } => left.len(),
        }
    }

    /// Decode `frames` interleaved bus frames into interleaved stereo.
    ///
    /// `out` must hold at least `frames * 2` samples; it is fully
    /// overwritten in that range.
    pub(crate) fn process_block(
        &mut self,
        bus: &[f32],
        frames: usize,
        channels: usize,
        out: &mut [f32],
    ) {
        debug_assert_eq!(self.channels(), channels);
        match self {
            Self::Matrix { left, right } => {
                for (f, frame) in bus[..frames * channels].chunks_exact(channels).enumerate() {
                    let mut l = 0.0;
                    let mut r = 0.0;
                    for (k, &s) in frame.iter().enumerate() {
                        l += left[k] * s;
                        r += right[k] * s;
                    }
                    out[2 * f] = l;
                    out[2 * f + 1] = r;
                }
            }
            Self::Fir { left, right } => {
                out[..frames * 2].fill(0.0);
                for k in 0..channels {
                    let lf = &mut left[k].0;
                    let rf = &mut right[k].0;
                    for f in 0..frames {
                        let x = bus[f * channels + k];
                        out[2 * f] += lf.process(x);
                        out[2 * f + 1] += rf.process(x);
                    }
                }
            }
        }
    }
}
