//! SHAC file reader — parses `.shac` containers into an in-memory model.
//!
//! The reader is a stateless parser over a byte slice: it validates the
//! 26-byte header and every layer block, de-serializes layer metadata,
//! and decodes the interleaved float32 audio. [`read_from_path`] loads
//! the whole file first, so no file handle outlives the parse. The
//! first violated constraint fails the whole parse; truncation errors
//! carry the byte offset at which the input ran out.
//!
//! Non-finite audio samples are passed through unchanged — suppressing
//! them is the decoder's job, at its output.

use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};

use shac_math::{channel_count, Normalization};

use crate::error::{Result, ShacFormatError};
use crate::header::{
    ShacHeader, BIT_DEPTH, MAX_LAYER_ID_LEN, MAX_METADATA_LEN, MAX_SAMPLE_RATE, MIN_SAMPLE_RATE,
    SHAC_MAGIC, SHAC_VERSION,
};
use crate::layer::{AmbisonicBuffer, Layer, LayerMetadata};

/// Default per-layer audio allocation limit (256 MiB).
///
/// Protects against crafted headers declaring absurd sample counts;
/// override with [`parse_with_limit`].
pub const DEFAULT_LAYER_ALLOCATION_LIMIT: u64 = 256 * 1024 * 1024;

/// A fully parsed `.shac` file.
#[derive(Debug, Clone)]
pub struct ShacFile {
    /// The validated 26-byte header.
    pub header: ShacHeader,
    /// All layers, in file order.
    pub layers: Vec<Layer>,
}

impl ShacFile {
    /// Look up a layer by id.
    pub fn layer(&self, id: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }
}

/// Parse a complete `.shac` file from bytes with the default
/// allocation limit.
///
/// # Errors
///
/// Returns the first violated format constraint; see
/// [`ShacFormatError`].
pub fn parse(bytes: &[u8]) -> Result<ShacFile> {
    parse_with_limit(bytes, DEFAULT_LAYER_ALLOCATION_LIMIT)
}

/// Parse with an explicit per-layer allocation limit in bytes.
pub fn parse_with_limit(bytes: &[u8], allocation_limit: u64) -> Result<ShacFile> {
    if bytes.is_empty() {
        return Err(ShacFormatError::EmptyFile);
    }

    let mut s = ByteScanner::new(bytes);

    // --- 1. Fixed header ---
    if s.take(4)? != SHAC_MAGIC {
        return Err(ShacFormatError::InvalidMagic);
    }
    let version = s.read_u16()?;
    if version != SHAC_VERSION {
        return Err(ShacFormatError::UnsupportedVersion(version));
    }
    let order = s.read_u16()?;
    if order == 0 || order > shac_math::MAX_ORDER {
        return Err(ShacFormatError::InvalidOrder(order));
    }
    let channels = s.read_u16()?;
    let expected_channels = channel_count(order);
    if channels as usize != expected_channels {
        return Err(ShacFormatError::ChannelMismatch {
            expected: expected_channels,
            got: channels as usize,
        });
    }
    let sample_rate = s.read_u32()?;
    if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&sample_rate) {
        return Err(ShacFormatError::InvalidSampleRate(sample_rate));
    }
    let bit_depth = s.read_u32()?;
    if bit_depth != BIT_DEPTH {
        return Err(ShacFormatError::InvalidBitDepth(bit_depth));
    }
    let samples = s.read_u32()?;
    if samples == 0 {
        return Err(ShacFormatError::ShapeMismatch {
            expected: 1,
            got: 0,
        });
    }
    let layer_count = s.read_u16()?;
    if layer_count == 0 {
        return Err(ShacFormatError::EmptyFile);
    }
    let norm_raw = s.read_u16()?;
    let normalization = Normalization::from_u16(norm_raw)
        .ok_or(ShacFormatError::InvalidNormalization(norm_raw))?;

    let header = ShacHeader {
        version,
        order,
        channels,
        sample_rate,
        bit_depth,
        samples,
        layer_count,
        normalization,
    };

    tracing::info!(
        order,
        channels,
        sample_rate,
        samples,
        layers = layer_count,
        "Parsed SHAC header"
    );

    // --- 2. Allocation guard before touching any layer audio ---
    let audio_bytes = samples as u64 * channels as u64 * 4;
    if audio_bytes > allocation_limit {
        return Err(ShacFormatError::AllocationTooLarge {
            requested: audio_bytes,
            limit: allocation_limit,
        });
    }

    // --- 3. Layer blocks ---
    let mut layers: Vec<Layer> = Vec::with_capacity(layer_count as usize);
    for index in 0..layer_count as usize {
        let id_len = s.read_u16()? as usize;
        let meta_len = s.read_u32()? as usize;

        if id_len == 0 || id_len > MAX_LAYER_ID_LEN {
            return Err(ShacFormatError::InvalidLayerId {
                index,
                reason: format!("length {id_len} outside 1..={MAX_LAYER_ID_LEN}"),
            });
        }
        if meta_len == 0 {
            return Err(ShacFormatError::InvalidMetadata {
                layer: format!("#{index}"),
                reason: "empty metadata".to_string(),
            });
        }
        if meta_len > MAX_METADATA_LEN {
            return Err(ShacFormatError::MetadataTooLarge {
                layer: format!("#{index}"),
                len: meta_len,
                max: MAX_METADATA_LEN,
            });
        }

        let id = std::str::from_utf8(s.take(id_len)?)
            .map_err(|_| ShacFormatError::InvalidLayerId {
                index,
                reason: "not valid UTF-8".to_string(),
            })?
            .to_string();
        if layers.iter().any(|l| l.id == id) {
            return Err(ShacFormatError::DuplicateLayerId(id));
        }

        let meta_text =
            std::str::from_utf8(s.take(meta_len)?).map_err(|_| ShacFormatError::InvalidMetadata {
                layer: id.clone(),
                reason: "not valid UTF-8".to_string(),
            })?;
        let metadata: LayerMetadata =
            serde_json::from_str(meta_text).map_err(|e| ShacFormatError::InvalidMetadata {
                layer: id.clone(),
                reason: e.to_string(),
            })?;
        metadata.validate(&id)?;

        let raw = s.take(audio_bytes as usize)?;
        let mut data = vec![0.0f32; samples as usize * channels as usize];
        LittleEndian::read_f32_into(raw, &mut data);
        let audio = AmbisonicBuffer::from_interleaved(data, channels as usize)?;

        tracing::debug!(
            index,
            layer = id.as_str(),
            position = ?metadata.position,
            gain = metadata.gain,
            "Parsed layer"
        );

        layers.push(Layer {
            id,
            metadata,
            audio,
        });
    }

    // Trailing bytes after the declared layers are tolerated.
    Ok(ShacFile { header, layers })
}

/// Read and parse a `.shac` file from disk.
///
/// The file is loaded fully before parsing; no handle survives the
/// call.
pub fn read_from_path(path: &Path) -> Result<ShacFile> {
    tracing::info!("Opening SHAC file: {}", path.display());
    let bytes = std::fs::read(path)?;
    parse(&bytes)
}

/// Sequential cursor over the input that reports truncation with the
/// byte offset where the input ran out.
struct ByteScanner<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteScanner<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let available = self.bytes.len() - self.pos;
        if available < n {
            return Err(ShacFormatError::TruncatedData {
                offset: self.pos as u64,
                needed: n as u64,
                available: available as u64,
            });
        }
        let out = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn read_u16(&mut self) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.take(2)?))
    }

    fn read_u32(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }
}
