//! SHAC file writer — serializes ambisonic layers into the `.shac` container.
//!
//! The writer uses a builder pattern: create a [`ShacWriter`], add
//! layers, then call [`ShacWriter::write`] (or
//! [`write_to_path`](ShacWriter::write_to_path)) to emit the complete
//! file. Every semantic check happens in [`add_layer`](ShacWriter::add_layer)
//! or before the first byte is written; a failed write never leaves a
//! half-validated builder behind.
//!
//! # Binary Layout
//!
//! - **Header** (26 bytes): magic, version, order, channels, sample
//!   rate, bit depth, samples per channel, layer count, normalization.
//! - **Layer blocks**: `id_len: u16`, `meta_len: u32`, id bytes,
//!   metadata bytes, interleaved float32 audio.
//!
//! Little-endian throughout.
//!
//! # Example
//!
//! ```rust
//! use shac_format::{AmbisonicBuffer, LayerMetadata, Normalization, ShacWriter};
//!
//! let audio = AmbisonicBuffer::from_interleaved(vec![0.0; 16], 4).unwrap();
//! let meta = LayerMetadata::new([0.0, 0.0, 1.0], "voice");
//!
//! let mut writer = ShacWriter::new(1, 48_000, Normalization::Sn3d).unwrap();
//! writer.add_layer("voice", audio, &meta).unwrap();
//!
//! let mut bytes = Vec::new();
//! writer.write(&mut bytes).unwrap();
//! assert_eq!(&bytes[0..4], b"SHAC");
//! ```

use std::io::{BufWriter, Write};
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};

use shac_math::Normalization;

use crate::error::{Result, ShacFormatError};
use crate::header::{
    ShacHeader, MAX_LAYER_ID_LEN, MAX_METADATA_LEN, MAX_SAMPLE_RATE, MIN_SAMPLE_RATE, SHAC_MAGIC,
};
use crate::layer::{AmbisonicBuffer, LayerMetadata};

/// A validated layer awaiting emission: metadata already serialized.
#[derive(Debug, Clone)]
struct PendingLayer {
    id: String,
    metadata_bytes: Vec<u8>,
    audio: AmbisonicBuffer,
}

/// Builder for `.shac` files.
///
/// The first added layer pins the file's per-channel sample count;
/// every further layer must match it. Non-finite audio samples are
/// written through unmodified — level management is the caller's
/// concern, and the decoder guards its own output.
pub struct ShacWriter {
    header: ShacHeader,
    layers: Vec<PendingLayer>,
}

impl ShacWriter {
    /// Create a writer for a file of the given order, sample rate, and
    /// normalization scheme.
    ///
    /// # Errors
    ///
    /// Returns [`ShacFormatError::InvalidOrder`] or
    /// [`ShacFormatError::InvalidSampleRate`] for out-of-range
    /// parameters.
    pub fn new(order: u16, sample_rate: u32, normalization: Normalization) -> Result<Self> {
        if order == 0 || order > shac_math::MAX_ORDER {
            return Err(ShacFormatError::InvalidOrder(order));
        }
        if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&sample_rate) {
            return Err(ShacFormatError::InvalidSampleRate(sample_rate));
        }
        Ok(Self {
            header: ShacHeader::new(order, sample_rate, normalization),
            layers: Vec::new(),
        })
    }

    /// The header as it would currently be written.
    pub fn header(&self) -> &ShacHeader {
        &self.header
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Add one layer.
    ///
    /// Validates the id (1..=256 UTF-8 bytes, unique), the metadata
    /// (semantics plus a serialized size of 1..=4096 bytes), and the
    /// audio shape (channel count matching the file order, a frame
    /// count above zero and equal to the count pinned by the first
    /// layer).
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint; the builder is unchanged
    /// on error.
    pub fn add_layer(
        &mut self,
        id: &str,
        audio: AmbisonicBuffer,
        metadata: &LayerMetadata,
    ) -> Result<&mut Self> {
        let index = self.layers.len();
        if id.is_empty() || id.len() > MAX_LAYER_ID_LEN {
            return Err(ShacFormatError::InvalidLayerId {
                index,
                reason: format!("length {} outside 1..={MAX_LAYER_ID_LEN}", id.len()),
            });
        }
        if self.layers.iter().any(|l| l.id == id) {
            return Err(ShacFormatError::DuplicateLayerId(id.to_string()));
        }

        metadata.validate(id)?;
        let metadata_bytes = serde_json::to_vec(metadata)?;
        if metadata_bytes.len() > MAX_METADATA_LEN {
            return Err(ShacFormatError::MetadataTooLarge {
                layer: id.to_string(),
                len: metadata_bytes.len(),
                max: MAX_METADATA_LEN,
            });
        }

        if audio.channels() != self.header.channels as usize {
            return Err(ShacFormatError::ChannelMismatch {
                expected: self.header.channels as usize,
                got: audio.channels(),
            });
        }
        let frames = audio.frames();
        if frames == 0 {
            return Err(ShacFormatError::ShapeMismatch {
                expected: 1,
                got: 0,
            });
        }
        if frames > u32::MAX as usize {
            return Err(ShacFormatError::ShapeMismatch {
                expected: u32::MAX as usize,
                got: frames,
            });
        }
        if self.layers.is_empty() {
            // First layer pins the file-wide sample count.
            self.header.samples = frames as u32;
        } else if frames != self.header.samples as usize {
            return Err(ShacFormatError::ShapeMismatch {
                expected: self.header.samples as usize,
                got: frames,
            });
        }

        tracing::debug!(
            layer = id,
            frames,
            channels = audio.channels(),
            metadata_len = metadata_bytes.len(),
            "Adding layer to writer"
        );

        self.layers.push(PendingLayer {
            id: id.to_string(),
            metadata_bytes,
            audio,
        });
        self.header.layer_count = self.layers.len() as u16;
        Ok(self)
    }

    /// Emit the complete file into `sink`.
    ///
    /// # Errors
    ///
    /// Returns [`ShacFormatError::EmptyFile`] when no layer was added,
    /// or [`ShacFormatError::Io`] on a sink failure.
    pub fn write<W: Write>(&self, sink: W) -> Result<()> {
        if self.layers.is_empty() {
            return Err(ShacFormatError::EmptyFile);
        }

        let header = self.header.clone();
        header.validate()?;

        tracing::info!(
            order = header.order,
            channels = header.channels,
            sample_rate = header.sample_rate,
            samples = header.samples,
            layers = header.layer_count,
            "Writing SHAC container"
        );

        let mut w = BufWriter::new(sink);
        Self::write_header(&mut w, &header)?;

        for layer in &self.layers {
            tracing::debug!(
                layer = layer.id.as_str(),
                audio_samples = layer.audio.samples().len(),
                "Writing layer block"
            );
            w.write_u16::<LittleEndian>(layer.id.len() as u16)?;
            w.write_u32::<LittleEndian>(layer.metadata_bytes.len() as u32)?;
            w.write_all(layer.id.as_bytes())?;
            w.write_all(&layer.metadata_bytes)?;
            for &sample in layer.audio.samples() {
                w.write_f32::<LittleEndian>(sample)?;
            }
        }

        w.flush()?;
        Ok(())
    }

    /// Emit the complete file to a path.
    pub fn write_to_path(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)?;
        self.write(file)
    }

    /// Write the 26-byte header.
    fn write_header<W: Write>(w: &mut W, header: &ShacHeader) -> Result<()> {
        w.write_all(&SHAC_MAGIC)?;
        w.write_u16::<LittleEndian>(header.version)?;
        w.write_u16::<LittleEndian>(header.order)?;
        w.write_u16::<LittleEndian>(header.channels)?;
        w.write_u32::<LittleEndian>(header.sample_rate)?;
        w.write_u32::<LittleEndian>(header.bit_depth)?;
        w.write_u32::<LittleEndian>(header.samples)?;
        w.write_u16::<LittleEndian>(header.layer_count)?;
        w.write_u16::<LittleEndian>(header.normalization.as_u16())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::HEADER_SIZE;

    fn buffer(frames: usize, channels: usize) -> AmbisonicBuffer {
        AmbisonicBuffer::from_interleaved(vec![0.25; frames * channels], channels).unwrap()
    }

    fn meta() -> LayerMetadata {
        LayerMetadata::new([0.0, 0.0, 1.0], "t")
    }

    #[test]
    fn test_invalid_order_rejected() {
        assert!(matches!(
            ShacWriter::new(0, 48_000, Normalization::Sn3d),
            Err(ShacFormatError::InvalidOrder(0))
        ));
        assert!(matches!(
            ShacWriter::new(8, 48_000, Normalization::Sn3d),
            Err(ShacFormatError::InvalidOrder(8))
        ));
    }

    #[test]
    fn test_invalid_sample_rate_rejected() {
        assert!(matches!(
            ShacWriter::new(1, 4_000, Normalization::Sn3d),
            Err(ShacFormatError::InvalidSampleRate(4_000))
        ));
    }

    #[test]
    fn test_header_bytes_match_layout() {
        // The reference bytes of the trivial file: L=1, 4 samples,
        // 48 kHz, SN3D, one layer.
        let mut writer = ShacWriter::new(1, 48_000, Normalization::Sn3d).unwrap();
        writer.add_layer("a", buffer(4, 4), &meta()).unwrap();

        let mut bytes = Vec::new();
        writer.write(&mut bytes).unwrap();

        let expected: [u8; HEADER_SIZE] = [
            0x53, 0x48, 0x41, 0x43, // magic
            0x01, 0x00, // version
            0x01, 0x00, // order
            0x04, 0x00, // channels
            0x80, 0xBB, 0x00, 0x00, // sample rate 48000
            0x20, 0x00, 0x00, 0x00, // bit depth 32
            0x04, 0x00, 0x00, 0x00, // samples 4
            0x01, 0x00, // layer count
            0x01, 0x00, // normalization SN3D
        ];
        assert_eq!(&bytes[..HEADER_SIZE], &expected);
    }

    #[test]
    fn test_file_length_is_exact() {
        let mut writer = ShacWriter::new(1, 48_000, Normalization::Sn3d).unwrap();
        let m = meta();
        writer.add_layer("a", buffer(8, 4), &m).unwrap();
        writer.add_layer("b", buffer(8, 4), &m).unwrap();

        let mut bytes = Vec::new();
        writer.write(&mut bytes).unwrap();

        let meta_len = serde_json::to_vec(&m).unwrap().len();
        let expected = HEADER_SIZE + 2 * (6 + 1 + meta_len + 8 * 4 * 4);
        assert_eq!(bytes.len(), expected);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut writer = ShacWriter::new(1, 48_000, Normalization::Sn3d).unwrap();
        writer.add_layer("a", buffer(4, 4), &meta()).unwrap();
        let result = writer.add_layer("a", buffer(4, 4), &meta());
        assert!(matches!(result, Err(ShacFormatError::DuplicateLayerId(id)) if id == "a"));
    }

    #[test]
    fn test_empty_id_rejected() {
        let mut writer = ShacWriter::new(1, 48_000, Normalization::Sn3d).unwrap();
        assert!(matches!(
            writer.add_layer("", buffer(4, 4), &meta()),
            Err(ShacFormatError::InvalidLayerId { index: 0, .. })
        ));
    }

    #[test]
    fn test_oversized_id_rejected() {
        let mut writer = ShacWriter::new(1, 48_000, Normalization::Sn3d).unwrap();
        let id = "x".repeat(257);
        assert!(writer.add_layer(&id, buffer(4, 4), &meta()).is_err());
    }

    #[test]
    fn test_oversized_metadata_rejected() {
        let mut writer = ShacWriter::new(1, 48_000, Normalization::Sn3d).unwrap();
        let m = meta().with_extra("blob", serde_json::json!("y".repeat(5_000)));
        assert!(matches!(
            writer.add_layer("a", buffer(4, 4), &m),
            Err(ShacFormatError::MetadataTooLarge { .. })
        ));
    }

    #[test]
    fn test_channel_mismatch_rejected() {
        let mut writer = ShacWriter::new(2, 48_000, Normalization::Sn3d).unwrap();
        assert!(matches!(
            writer.add_layer("a", buffer(4, 4), &meta()),
            Err(ShacFormatError::ChannelMismatch {
                expected: 9,
                got: 4
            })
        ));
    }

    #[test]
    fn test_second_layer_must_match_pinned_frames() {
        let mut writer = ShacWriter::new(1, 48_000, Normalization::Sn3d).unwrap();
        writer.add_layer("a", buffer(8, 4), &meta()).unwrap();
        assert!(matches!(
            writer.add_layer("b", buffer(4, 4), &meta()),
            Err(ShacFormatError::ShapeMismatch {
                expected: 8,
                got: 4
            })
        ));
    }

    #[test]
    fn test_zero_frames_rejected() {
        let mut writer = ShacWriter::new(1, 48_000, Normalization::Sn3d).unwrap();
        let empty = AmbisonicBuffer::from_interleaved(vec![], 4).unwrap();
        assert!(matches!(
            writer.add_layer("a", empty, &meta()),
            Err(ShacFormatError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_write_without_layers_rejected() {
        let writer = ShacWriter::new(1, 48_000, Normalization::Sn3d).unwrap();
        let mut bytes = Vec::new();
        assert!(matches!(
            writer.write(&mut bytes),
            Err(ShacFormatError::EmptyFile)
        ));
        assert!(bytes.is_empty());
    }

    #[test]
    fn test_non_finite_samples_pass_through() {
        let mut writer = ShacWriter::new(1, 48_000, Normalization::Sn3d).unwrap();
        let audio =
            AmbisonicBuffer::from_interleaved(vec![f32::NAN, 0.0, f32::INFINITY, 1.0], 4).unwrap();
        writer.add_layer("a", audio, &meta()).unwrap();
        let mut bytes = Vec::new();
        writer.write(&mut bytes).unwrap();

        let meta_len = serde_json::to_vec(&meta()).unwrap().len();
        let audio_start = HEADER_SIZE + 6 + 1 + meta_len;
        let first = f32::from_le_bytes(bytes[audio_start..audio_start + 4].try_into().unwrap());
        assert!(first.is_nan());
    }
}
