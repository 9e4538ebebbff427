//! SHAC file header — the first 26 bytes of every `.shac` file.

use serde::{Deserialize, Serialize};

use shac_math::{channel_count, Normalization};

use crate::error::{Result, ShacFormatError};

/// Magic bytes identifying a SHAC file: `SHAC` (0x53 0x48 0x41 0x43).
pub const SHAC_MAGIC: [u8; 4] = [0x53, 0x48, 0x41, 0x43];

/// Current format version.
pub const SHAC_VERSION: u16 = 1;

/// Size of the fixed header in bytes.
pub const HEADER_SIZE: usize = 26;

/// Lowest accepted sample rate in Hz.
pub const MIN_SAMPLE_RATE: u32 = 8_000;

/// Highest accepted sample rate in Hz.
pub const MAX_SAMPLE_RATE: u32 = 192_000;

/// The only supported sample bit depth (IEEE-754 float32).
pub const BIT_DEPTH: u32 = 32;

/// Maximum layer identifier length in bytes.
pub const MAX_LAYER_ID_LEN: usize = 256;

/// Maximum serialized layer metadata length in bytes.
pub const MAX_METADATA_LEN: usize = 4096;

/// The fixed-size header at the beginning of every `.shac` file.
///
/// Layout (26 bytes, little-endian):
/// - `[0..4]`   magic: `SHAC`
/// - `[4..6]`   version: u16 (currently 1)
/// - `[6..8]`   order: u16 (1..=7)
/// - `[8..10]`  channels: u16 (must equal `(order + 1)²`)
/// - `[10..14]` sample_rate: u32 (Hz)
/// - `[14..18]` bit_depth: u32 (always 32)
/// - `[18..22]` samples: u32 (per channel, shared by all layers)
/// - `[22..24]` layer_count: u16 (>= 1)
/// - `[24..26]` normalization: u16 (1 = SN3D, 2 = N3D)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShacHeader {
    /// Format version (currently 1).
    pub version: u16,
    /// Ambisonic order L.
    pub order: u16,
    /// Channel count, `(order + 1)²`.
    pub channels: u16,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Sample bit depth (always 32).
    pub bit_depth: u32,
    /// Samples per channel, shared by every layer.
    pub samples: u32,
    /// Number of layers in the file.
    pub layer_count: u16,
    /// Spherical harmonic normalization scheme.
    pub normalization: Normalization,
}

impl ShacHeader {
    /// Create a header for a new file. `samples` and `layer_count` are
    /// pinned later, when the first layer is added and the file is
    /// finalized.
    pub fn new(order: u16, sample_rate: u32, normalization: Normalization) -> Self {
        Self {
            version: SHAC_VERSION,
            order,
            channels: channel_count(order) as u16,
            sample_rate,
            bit_depth: BIT_DEPTH,
            samples: 0,
            layer_count: 0,
            normalization,
        }
    }

    /// Check every header constraint of the format.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<()> {
        if self.version != SHAC_VERSION {
            return Err(ShacFormatError::UnsupportedVersion(self.version));
        }
        if self.order == 0 || self.order > shac_math::MAX_ORDER {
            return Err(ShacFormatError::InvalidOrder(self.order));
        }
        let expected = channel_count(self.order);
        if self.channels as usize != expected {
            return Err(ShacFormatError::ChannelMismatch {
                expected,
                got: self.channels as usize,
            });
        }
        if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&self.sample_rate) {
            return Err(ShacFormatError::InvalidSampleRate(self.sample_rate));
        }
        if self.bit_depth != BIT_DEPTH {
            return Err(ShacFormatError::InvalidBitDepth(self.bit_depth));
        }
        if self.samples == 0 {
            return Err(ShacFormatError::ShapeMismatch {
                expected: 1,
                got: 0,
            });
        }
        if self.layer_count == 0 {
            return Err(ShacFormatError::EmptyFile);
        }
        Ok(())
    }
}
