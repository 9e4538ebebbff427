//! Ambisonic encoding — mono sources to full spherical harmonic layers.
//!
//! Encoding a mono signal at a fixed position reduces to one set of
//! direction coefficients and a per-sample multiply-broadcast across
//! the channels; the normalization tables are built once per session
//! and shared by every layer.

use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use shac_format::{AmbisonicBuffer, LayerMetadata, ShacWriter};
use shac_math::{channel_count, to_spherical, Normalization, ShEvaluator, Vec3};

use crate::error::{RenderError, Result};

/// Parameters of an encoding session.
#[derive(Debug, Clone)]
pub struct EncoderOptions {
    /// Ambisonic order L; the layer gets `(L + 1)²` channels.
    pub order: u16,
    /// Normalization scheme baked into the coefficients.
    pub normalization: Normalization,
    /// Apply `1 / max(distance, reference_distance)` gain at encode time.
    pub distance_gain: bool,
    /// Distance floor for the optional gain, in meters.
    pub reference_distance: f32,
}

impl EncoderOptions {
    pub fn new(order: u16, normalization: Normalization) -> Self {
        Self {
            order,
            normalization,
            distance_gain: false,
            reference_distance: 1.0,
        }
    }

    pub fn with_distance_gain(mut self, enabled: bool) -> Self {
        self.distance_gain = enabled;
        self
    }

    pub fn with_reference_distance(mut self, meters: f32) -> Self {
        self.reference_distance = meters;
        self
    }
}

/// Encode a mono signal positioned at `position` into an ambisonic
/// buffer of `(order + 1)²` channels.
///
/// The encoder never clips; callers manage levels. A source at the
/// origin has no direction — it is encoded straight ahead and logged.
///
/// # Errors
///
/// Returns [`RenderError::InvalidOrder`] for an order outside 1..=7.
pub fn encode_mono(
    samples: &[f32],
    position: Vec3,
    options: &EncoderOptions,
) -> Result<AmbisonicBuffer> {
    if options.order == 0 || options.order > shac_math::MAX_ORDER {
        return Err(RenderError::InvalidOrder(options.order));
    }
    let evaluator = ShEvaluator::new(options.order, options.normalization);
    encode_with(&evaluator, samples, position, options)
}

/// Encode with a prebuilt evaluator (shared across a session).
fn encode_with(
    evaluator: &ShEvaluator,
    samples: &[f32],
    position: Vec3,
    options: &EncoderOptions,
) -> Result<AmbisonicBuffer> {
    let n = evaluator.channel_count();
    let spherical = to_spherical(position);
    if spherical.distance < shac_math::coord::DISTANCE_EPSILON {
        tracing::warn!(
            ?position,
            "source direction undefined at the origin; encoding straight ahead"
        );
    }

    let mut coeffs = vec![0.0f32; n];
    evaluator.coefficients(spherical.azimuth, spherical.elevation, &mut coeffs);

    if options.distance_gain {
        let gain = 1.0 / spherical.distance.max(options.reference_distance);
        for c in coeffs.iter_mut() {
            *c *= gain;
        }
    }

    let mut data = vec![0.0f32; samples.len() * n];
    for (frame, &sample) in data.chunks_exact_mut(n).zip(samples.iter()) {
        for (out, &c) in frame.iter_mut().zip(coeffs.iter()) {
            *out = sample * c;
        }
    }

    Ok(AmbisonicBuffer::from_interleaved(data, n)?)
}

/// Cooperative cancellation flag for offline encode sessions.
///
/// Clones share the flag; cancellation is observed between layers.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// One mono source queued for a scene encode.
#[derive(Debug, Clone)]
pub struct MonoSource {
    /// Layer id in the output container.
    pub id: String,
    /// Mono samples at the container sample rate.
    pub samples: Vec<f32>,
    /// Layer metadata; the source position is taken from it.
    pub metadata: LayerMetadata,
}

/// Offline encoder for a whole scene of positioned mono sources.
///
/// Wraps a [`ShacWriter`]: each added source is encoded to a full
/// ambisonic layer and appended; [`write`](SceneEncoder::write) emits
/// the container. The spherical harmonic tables are built once at
/// session start.
pub struct SceneEncoder {
    writer: ShacWriter,
    evaluator: ShEvaluator,
    options: EncoderOptions,
}

impl SceneEncoder {
    /// Create a session for the given sample rate and encoder options.
    ///
    /// # Errors
    ///
    /// Propagates order and sample rate validation from the container
    /// writer.
    pub fn new(sample_rate: u32, options: EncoderOptions) -> Result<Self> {
        if options.order == 0 || options.order > shac_math::MAX_ORDER {
            return Err(RenderError::InvalidOrder(options.order));
        }
        let writer = ShacWriter::new(options.order, sample_rate, options.normalization)?;
        let evaluator = ShEvaluator::new(options.order, options.normalization);
        Ok(Self {
            writer,
            evaluator,
            options,
        })
    }

    pub fn channel_count(&self) -> usize {
        channel_count(self.options.order)
    }

    pub fn layer_count(&self) -> usize {
        self.writer.layer_count()
    }

    /// Encode one mono source and append it as a layer.
    ///
    /// The source position comes from `metadata.position`.
    ///
    /// # Errors
    ///
    /// Propagates container-side validation (id, metadata, shape).
    pub fn add_source(
        &mut self,
        id: &str,
        samples: &[f32],
        metadata: &LayerMetadata,
    ) -> Result<&mut Self> {
        let position = Vec3::new(
            metadata.position[0] as f32,
            metadata.position[1] as f32,
            metadata.position[2] as f32,
        );
        let audio = encode_with(&self.evaluator, samples, position, &self.options)?;
        tracing::debug!(layer = id, frames = samples.len(), "Encoded source");
        self.writer.add_layer(id, audio, metadata)?;
        Ok(self)
    }

    /// Encode a batch of sources, checking `token` between layers.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Cancelled`] when the token fires; layers
    /// encoded before the cancellation remain in the session.
    pub fn encode_all<I>(&mut self, sources: I, token: &CancelToken) -> Result<&mut Self>
    where
        I: IntoIterator<Item = MonoSource>,
    {
        for source in sources {
            if token.is_cancelled() {
                tracing::info!("Encode session cancelled between layers");
                return Err(RenderError::Cancelled);
            }
            self.add_source(&source.id, &source.samples, &source.metadata)?;
        }
        Ok(self)
    }

    /// Emit the finished container into `sink`.
    pub fn write<W: Write>(&self, sink: W) -> Result<()> {
        Ok(self.writer.write(sink)?)
    }

    /// Emit the finished container to a path.
    pub fn write_to_path(&self, path: &Path) -> Result<()> {
        Ok(self.writer.write_to_path(path)?)
    }
}
