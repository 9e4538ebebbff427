//! Real-time block decoder — parsed container to interleaved stereo.
//!
//! [`ShacDecoder::open`] takes a parsed [`ShacFile`], an HRTF table,
//! and decode options; it pre-allocates every buffer the block path
//! needs and hands back a [`PosePublisher`] for the navigation thread.
//! From then on [`produce_block`](ShacDecoder::produce_block) is
//! infallible: it allocates nothing, takes no locks, and keeps
//! producing blocks until the cursor reaches the end of the file.
//!
//! Per block: snapshot the pose, accumulate every layer into the bus
//! with `gain / max(distance, r_min)` distance attenuation,
//! counter-rotate the bus by the listener orientation, binaural-decode
//! through the HRTF table, and suppress any non-finite samples.
//! Listener translation adjusts gain only; the per-layer ambisonic
//! coefficients stay as encoded, which is the documented approximation
//! of this codec.

use shac_format::{AmbisonicBuffer, ShacFile};
use shac_math::Vec3;

use crate::error::{RenderError, Result};
use crate::hrtf::HrtfTable;
use crate::pose::{pose_slot, ListenerPose, PoseCell, PosePublisher};
use crate::rotator::Rotator;

/// Smallest accepted block size in frames.
pub const MIN_BLOCK_SIZE: usize = 32;

/// Largest accepted block size in frames.
pub const MAX_BLOCK_SIZE: usize = 8192;

/// Decoder configuration.
#[derive(Debug, Clone)]
pub struct DecoderOptions {
    /// Output block size in frames.
    pub block_size: usize,
    /// Distance floor for per-layer gain, in meters.
    pub r_min: f32,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            block_size: 512,
            r_min: 1.0,
        }
    }
}

/// One layer prepared for rendering.
struct DecodedLayer {
    id: String,
    position: Vec3,
    gain: f32,
    audio: AmbisonicBuffer,
}

/// The real-time decoder for one opened file.
pub struct ShacDecoder {
    channels: usize,
    sample_rate: u32,
    total_samples: usize,
    block_size: usize,
    r_min: f32,
    layers: Vec<DecodedLayer>,
    hrtf: HrtfTable,
    pose: PoseCell,
    rotator: Rotator,
    /// Pre-allocated mix bus, `block_size × channels`.
    bus: Vec<f32>,
    cursor: usize,
}

impl ShacDecoder {
    /// Open a decoder over a parsed file.
    ///
    /// Acquires every buffer the block path will use and returns the
    /// pose publisher for the navigation side. The file's audio moves
    /// into the decoder; it is released on drop.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::HrtfChannelMismatch`] when the table does
    /// not match the file's channel count, or
    /// [`RenderError::InvalidBlockSize`] for an out-of-range block
    /// size.
    pub fn open(
        file: ShacFile,
        hrtf: HrtfTable,
        options: DecoderOptions,
    ) -> Result<(Self, PosePublisher)> {
        let channels = file.header.channels as usize;
        if hrtf.channels() != channels {
            return Err(RenderError::HrtfChannelMismatch {
                expected: channels,
                got: hrtf.channels(),
            });
        }
        if !(MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE).contains(&options.block_size) {
            return Err(RenderError::InvalidBlockSize(options.block_size));
        }

        let layers = file
            .layers
            .into_iter()
            .map(|layer| DecodedLayer {
                position: Vec3::new(
                    layer.metadata.position[0] as f32,
                    layer.metadata.position[1] as f32,
                    layer.metadata.position[2] as f32,
                ),
                gain: layer.metadata.gain as f32,
                id: layer.id,
                audio: layer.audio,
            })
            .collect::<Vec<_>>();

        tracing::info!(
            order = file.header.order,
            channels,
            sample_rate = file.header.sample_rate,
            samples = file.header.samples,
            layers = layers.len(),
            block_size = options.block_size,
            "Opened SHAC decoder"
        );

        let (publisher, pose) = pose_slot(ListenerPose::default());
        let decoder = Self {
            channels,
            sample_rate: file.header.sample_rate,
            total_samples: file.header.samples as usize,
            block_size: options.block_size,
            r_min: options.r_min,
            layers,
            hrtf,
            pose,
            rotator: Rotator::new(file.header.order),
            bus: vec![0.0; options.block_size * channels],
            cursor: 0,
        };
        Ok((decoder, publisher))
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Total frames in the file, per channel.
    pub fn total_samples(&self) -> usize {
        self.total_samples
    }

    /// Current playback position in frames.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// True once every frame has been produced.
    pub fn finished(&self) -> bool {
        self.cursor >= self.total_samples
    }

    /// Layer ids in file order.
    pub fn layer_ids(&self) -> impl Iterator<Item = &str> {
        self.layers.iter().map(|l| l.id.as_str())
    }

    /// Produce the next block of interleaved stereo into `out`.
    ///
    /// Returns the number of frames written: the block size, a shorter
    /// final block at the end of the file (also bounded by
    /// `out.len() / 2`), or 0 at end of stream. This path never fails;
    /// a non-finite pose produces one silent block, and non-finite
    /// samples are zeroed before they can reach the output.
    pub fn produce_block(&mut self, out: &mut [f32]) -> usize {
        let remaining = self.total_samples - self.cursor.min(self.total_samples);
        let frames = self.block_size.min(out.len() / 2).min(remaining);
        if frames == 0 {
            return 0;
        }
        let out = &mut out[..frames * 2];

        let pose = self.pose.snapshot();
        if !pose.is_finite() {
            out.fill(0.0);
            self.cursor += frames;
            return frames;
        }

        let n = self.channels;
        let bus = &mut self.bus[..frames * n];
        bus.fill(0.0);

        // Gain-only translation: distance attenuation is re-derived
        // from the listener-relative vector each block.
        for layer in &self.layers {
            let rel = layer.position.sub(&pose.position);
            let gain = layer.gain / rel.length().max(self.r_min);
            let start = self.cursor * n;
            let src = &layer.audio.samples()[start..start + frames * n];
            for (acc, &s) in bus.iter_mut().zip(src.iter()) {
                *acc += s * gain;
            }
        }

        // A NaN in any layer must not poison the rotator output or the
        // HRTF history; scrub the bus before going further.
        for s in bus.iter_mut() {
            if !s.is_finite() {
                *s = 0.0;
            }
        }

        self.rotator
            .apply(&mut self.bus[..frames * n], frames, -pose.yaw, -pose.pitch);

        self.hrtf
            .process_block(&self.bus[..frames * n], frames, n, out);

        for s in out.iter_mut() {
            if !s.is_finite() {
                *s = 0.0;
            }
        }

        self.cursor += frames;
        frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{encode_mono, EncoderOptions};
    use shac_format::{parse, LayerMetadata, Normalization, ShacWriter};

    /// Build a parsed file with one impulse source per given position.
    fn build_file(order: u16, frames: usize, positions: &[[f64; 3]]) -> ShacFile {
        let mut writer = ShacWriter::new(order, 48_000, Normalization::Sn3d).unwrap();
        for (i, &pos) in positions.iter().enumerate() {
            let mut samples = vec![0.0f32; frames];
            samples[0] = 1.0;
            let audio = encode_mono(
                &samples,
                Vec3::new(pos[0] as f32, pos[1] as f32, pos[2] as f32),
                &EncoderOptions::new(order, Normalization::Sn3d),
            )
            .unwrap();
            writer
                .add_layer(&format!("s{i}"), audio, &LayerMetadata::new(pos, "t"))
                .unwrap();
        }
        let mut bytes = Vec::new();
        writer.write(&mut bytes).unwrap();
        parse(&bytes).unwrap()
    }

    fn open(file: ShacFile) -> (ShacDecoder, PosePublisher) {
        let order = file.header.order;
        let hrtf = HrtfTable::virtual_stereo(order, Normalization::Sn3d).unwrap();
        ShacDecoder::open(
            file,
            hrtf,
            DecoderOptions {
                block_size: 32,
                r_min: 1.0,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_block_sequence_and_end_of_stream() {
        let file = build_file(1, 64, &[[0.0, 0.0, 1.0]]);
        let (mut decoder, _publisher) = open(file);
        let mut out = vec![0.0f32; 64];

        assert_eq!(decoder.produce_block(&mut out), 32);
        assert_eq!(decoder.produce_block(&mut out), 32);
        assert!(decoder.finished());
        assert_eq!(decoder.produce_block(&mut out), 0);
    }

    #[test]
    fn test_short_final_block() {
        let file = build_file(1, 40, &[[0.0, 0.0, 1.0]]);
        let (mut decoder, _publisher) = open(file);
        let mut out = vec![0.0f32; 64];
        assert_eq!(decoder.produce_block(&mut out), 32);
        assert_eq!(decoder.produce_block(&mut out), 8);
        assert_eq!(decoder.produce_block(&mut out), 0);
    }

    #[test]
    fn test_output_bounded_by_caller_buffer() {
        let file = build_file(1, 64, &[[0.0, 0.0, 1.0]]);
        let (mut decoder, _publisher) = open(file);
        let mut small = vec![0.0f32; 16];
        assert_eq!(decoder.produce_block(&mut small), 8);
    }

    #[test]
    fn test_front_source_is_balanced() {
        let file = build_file(1, 32, &[[0.0, 0.0, 1.0]]);
        let (mut decoder, _publisher) = open(file);
        let mut out = vec![0.0f32; 64];
        decoder.produce_block(&mut out);
        assert!(out[0].abs() > 1e-3, "impulse missing from output");
        assert!((out[0] - out[1]).abs() < 1e-5, "L={} R={}", out[0], out[1]);
    }

    #[test]
    fn test_yaw_toward_source_centers_it() {
        // Source at the right; a listener turned 90° right hears it
        // centered, like a front source.
        let right = build_file(1, 32, &[[1.0, 0.0, 0.0]]);
        let (mut decoder, publisher) = open(right);
        publisher.publish(ListenerPose::new(
            Vec3::default(),
            std::f32::consts::FRAC_PI_2,
            0.0,
        ));
        let mut out = vec![0.0f32; 64];
        decoder.produce_block(&mut out);
        assert!(out[0].abs() > 1e-3);
        assert!((out[0] - out[1]).abs() < 1e-4, "L={} R={}", out[0], out[1]);
    }

    #[test]
    fn test_translation_changes_gain_only() {
        // The source sits 4 m ahead; stepping 2 m closer doubles the
        // block gain.
        let file = build_file(1, 64, &[[0.0, 0.0, 4.0]]);
        let (mut decoder, _publisher) = open(file);

        let mut far = vec![0.0f32; 64];
        decoder.produce_block(&mut far);

        // The impulse sits at frame 0 of the file, so open a second
        // decoder to render the same content under the moved pose.
        let file = build_file(1, 64, &[[0.0, 0.0, 4.0]]);
        let hrtf = HrtfTable::virtual_stereo(1, Normalization::Sn3d).unwrap();
        let (mut decoder2, publisher2) = ShacDecoder::open(
            file,
            hrtf,
            DecoderOptions {
                block_size: 32,
                r_min: 1.0,
            },
        )
        .unwrap();
        publisher2.publish(ListenerPose::new(Vec3::new(0.0, 0.0, 2.0), 0.0, 0.0));
        let mut near = vec![0.0f32; 64];
        decoder2.produce_block(&mut near);

        assert!((near[0] / far[0] - 2.0).abs() < 1e-3, "near={} far={}", near[0], far[0]);
    }

    #[test]
    fn test_listener_at_source_is_clamped() {
        let file = build_file(1, 32, &[[0.0, 0.0, 1.0]]);
        let (mut decoder, publisher) = open(file);
        publisher.publish(ListenerPose::new(Vec3::new(0.0, 0.0, 1.0), 0.0, 0.0));
        let mut out = vec![0.0f32; 64];
        decoder.produce_block(&mut out);
        assert!(out.iter().all(|s| s.is_finite()));
        assert!(out[0].abs() > 1e-3);
    }

    #[test]
    fn test_non_finite_pose_produces_silence_then_recovers() {
        let file = build_file(1, 64, &[[0.0, 0.0, 1.0]]);
        let (mut decoder, publisher) = open(file);
        publisher.publish(ListenerPose::new(Vec3::new(f32::NAN, 0.0, 0.0), 0.0, 0.0));
        let mut out = vec![1.0f32; 64];
        assert_eq!(decoder.produce_block(&mut out), 32);
        assert!(out.iter().all(|&s| s == 0.0));

        publisher.publish(ListenerPose::default());
        assert_eq!(decoder.produce_block(&mut out), 32);
    }

    #[test]
    fn test_nan_audio_never_reaches_output() {
        // Hand-craft a layer whose first frame is NaN.
        let mut writer = ShacWriter::new(1, 48_000, Normalization::Sn3d).unwrap();
        let mut data = vec![0.0f32; 32 * 4];
        data[0] = f32::NAN;
        data[5] = 0.5;
        let audio = shac_format::AmbisonicBuffer::from_interleaved(data, 4).unwrap();
        writer
            .add_layer("n", audio, &LayerMetadata::new([0.0, 0.0, 1.0], "t"))
            .unwrap();
        let mut bytes = Vec::new();
        writer.write(&mut bytes).unwrap();
        let file = parse(&bytes).unwrap();

        let (mut decoder, _publisher) = open(file);
        let mut out = vec![0.0f32; 64];
        decoder.produce_block(&mut out);
        assert!(out.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn test_hrtf_channel_mismatch_rejected_at_open() {
        let file = build_file(2, 32, &[[0.0, 0.0, 1.0]]);
        let hrtf = HrtfTable::virtual_stereo(1, Normalization::Sn3d).unwrap();
        let result = ShacDecoder::open(file, hrtf, DecoderOptions::default());
        assert!(matches!(
            result,
            Err(RenderError::HrtfChannelMismatch {
                expected: 9,
                got: 4
            })
        ));
    }

    #[test]
    fn test_invalid_block_size_rejected_at_open() {
        let file = build_file(1, 32, &[[0.0, 0.0, 1.0]]);
        let hrtf = HrtfTable::virtual_stereo(1, Normalization::Sn3d).unwrap();
        let result = ShacDecoder::open(
            file,
            hrtf,
            DecoderOptions {
                block_size: 4,
                r_min: 1.0,
            },
        );
        assert!(matches!(result, Err(RenderError::InvalidBlockSize(4))));
    }

    #[test]
    fn test_layer_gain_scales_output() {
        let mut writer = ShacWriter::new(1, 48_000, Normalization::Sn3d).unwrap();
        let mut samples = vec![0.0f32; 32];
        samples[0] = 1.0;
        let opts = EncoderOptions::new(1, Normalization::Sn3d);
        let audio = encode_mono(&samples, Vec3::new(0.0, 0.0, 1.0), &opts).unwrap();
        writer
            .add_layer(
                "half",
                audio,
                &LayerMetadata::new([0.0, 0.0, 1.0], "t").with_gain(0.5),
            )
            .unwrap();
        let mut bytes = Vec::new();
        writer.write(&mut bytes).unwrap();
        let (mut decoder, _publisher) = open(parse(&bytes).unwrap());

        let unit = build_file(1, 32, &[[0.0, 0.0, 1.0]]);
        let (mut reference, _pub2) = open(unit);

        let mut out = vec![0.0f32; 64];
        let mut ref_out = vec![0.0f32; 64];
        decoder.produce_block(&mut out);
        reference.produce_block(&mut ref_out);
        assert!((out[0] * 2.0 - ref_out[0]).abs() < 1e-5);
    }
}
