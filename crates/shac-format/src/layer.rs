//! Layers — positioned ambisonic sources within a SHAC file.
//!
//! A layer couples a full set of ambisonic channels with a JSON
//! metadata object describing the source. Audio is stored interleaved,
//! frame-major, in ACN channel order; de-interleaved access is provided
//! on demand.

use serde::{Deserialize, Serialize};

use crate::error::{Result, ShacFormatError};

/// A contiguous block of `frames × channels` samples, interleaved
/// frame-major: `[f0c0, f0c1, …, f0c(N-1), f1c0, …]`.
#[derive(Debug, Clone, PartialEq)]
pub struct AmbisonicBuffer {
    channels: usize,
    data: Vec<f32>,
}

impl AmbisonicBuffer {
    /// Wrap an interleaved sample vector.
    ///
    /// # Errors
    ///
    /// Returns [`ShacFormatError::ChannelMismatch`] for zero channels
    /// and [`ShacFormatError::ShapeMismatch`] when the sample count
    /// does not form whole frames.
    pub fn from_interleaved(data: Vec<f32>, channels: usize) -> Result<Self> {
        if channels == 0 {
            return Err(ShacFormatError::ChannelMismatch {
                expected: 1,
                got: 0,
            });
        }
        if data.len() % channels != 0 {
            return Err(ShacFormatError::ShapeMismatch {
                expected: data.len().div_ceil(channels),
                got: data.len() / channels,
            });
        }
        Ok(Self { channels, data })
    }

    /// Interleave one vector per channel into a buffer.
    ///
    /// # Errors
    ///
    /// Returns [`ShacFormatError::ChannelMismatch`] for zero channels
    /// and [`ShacFormatError::ShapeMismatch`] when the channels have
    /// differing lengths.
    pub fn from_planar(channels: &[Vec<f32>]) -> Result<Self> {
        if channels.is_empty() {
            return Err(ShacFormatError::ChannelMismatch {
                expected: 1,
                got: 0,
            });
        }
        let frames = channels[0].len();
        for ch in channels {
            if ch.len() != frames {
                return Err(ShacFormatError::ShapeMismatch {
                    expected: frames,
                    got: ch.len(),
                });
            }
        }
        let n = channels.len();
        let mut data = vec![0.0; frames * n];
        for (c, ch) in channels.iter().enumerate() {
            for (f, &s) in ch.iter().enumerate() {
                data[f * n + c] = s;
            }
        }
        Ok(Self { channels: n, data })
    }

    /// An all-zero buffer of the given shape.
    pub fn zeros(frames: usize, channels: usize) -> Self {
        Self {
            channels: channels.max(1),
            data: vec![0.0; frames * channels.max(1)],
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn frames(&self) -> usize {
        self.data.len() / self.channels
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The raw interleaved samples.
    pub fn samples(&self) -> &[f32] {
        &self.data
    }

    /// One frame's worth of channel samples.
    pub fn frame(&self, index: usize) -> &[f32] {
        let start = index * self.channels;
        &self.data[start..start + self.channels]
    }

    /// De-interleave a single channel. Computed on demand; the buffer
    /// itself stays interleaved.
    pub fn channel(&self, index: usize) -> Vec<f32> {
        assert!(index < self.channels, "channel {index} out of range");
        self.data
            .iter()
            .skip(index)
            .step_by(self.channels)
            .copied()
            .collect()
    }
}

fn default_gain() -> f64 {
    1.0
}

/// JSON metadata attached to a layer.
///
/// `position` and `type` are required; `gain` defaults to 1.0. Any
/// additional fields round-trip unchanged through the flattened
/// `extra` map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerMetadata {
    /// Source position in meters: +X = right, +Y = up, +Z = front.
    pub position: [f64; 3],
    /// Free-form source descriptor; the codec assigns it no meaning.
    #[serde(rename = "type")]
    pub kind: String,
    /// Linear gain applied at decode time.
    #[serde(default = "default_gain")]
    pub gain: f64,
    /// Unrecognized fields, preserved verbatim on re-emit.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl LayerMetadata {
    pub fn new(position: [f64; 3], kind: impl Into<String>) -> Self {
        Self {
            position,
            kind: kind.into(),
            gain: 1.0,
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_gain(mut self, gain: f64) -> Self {
        self.gain = gain;
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Check the semantic constraints of the metadata object.
    ///
    /// # Errors
    ///
    /// Returns [`ShacFormatError::InvalidMetadata`] naming `layer` when
    /// the position or gain is non-finite.
    pub fn validate(&self, layer: &str) -> Result<()> {
        if self.position.iter().any(|v| !v.is_finite()) {
            return Err(ShacFormatError::InvalidMetadata {
                layer: layer.to_string(),
                reason: format!("position {:?} has non-finite components", self.position),
            });
        }
        if !self.gain.is_finite() {
            return Err(ShacFormatError::InvalidMetadata {
                layer: layer.to_string(),
                reason: format!("gain {} is not finite", self.gain),
            });
        }
        Ok(())
    }
}

/// One parsed layer: identifier, metadata, and audio.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    /// Unique UTF-8 identifier, 1..=256 bytes.
    pub id: String,
    /// Parsed metadata object.
    pub metadata: LayerMetadata,
    /// Interleaved ambisonic audio, ACN channel order.
    pub audio: AmbisonicBuffer,
}
