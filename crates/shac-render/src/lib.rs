//! # shac-render
//!
//! Encoding and real-time rendering for the SHAC spatial audio codec.
//!
//! The offline side turns positioned mono sources into full ambisonic
//! layers ([`encode_mono`], [`SceneEncoder`]) and writes them through
//! the container writer. The real-time side opens a parsed container
//! ([`ShacDecoder::open`]) and produces interleaved stereo blocks under
//! interactive listener navigation: the navigation thread publishes
//! poses through a lock-free slot, and the audio thread renders one
//! consistent pose snapshot per block.
//!
//! ## Example
//!
//! ```rust
//! use shac_format::{parse, LayerMetadata, Normalization};
//! use shac_render::{
//!     DecoderOptions, EncoderOptions, HrtfTable, ListenerPose, SceneEncoder, ShacDecoder,
//! };
//! use shac_math::Vec3;
//!
//! // Encode a one-source scene.
//! let mut session = SceneEncoder::new(48_000, EncoderOptions::new(1, Normalization::Sn3d)).unwrap();
//! session
//!     .add_source("voice", &[1.0, 0.0, 0.0, 0.0], &LayerMetadata::new([0.0, 0.0, 2.0], "voice"))
//!     .unwrap();
//! let mut bytes = Vec::new();
//! session.write(&mut bytes).unwrap();
//!
//! // Decode it binaurally while the listener walks forward.
//! let file = parse(&bytes).unwrap();
//! let hrtf = HrtfTable::virtual_stereo(1, Normalization::Sn3d).unwrap();
//! let (mut decoder, publisher) = ShacDecoder::open(file, hrtf, DecoderOptions {
//!     block_size: 32,
//!     r_min: 1.0,
//! }).unwrap();
//! publisher.publish(ListenerPose::new(Vec3::new(0.0, 0.0, 1.0), 0.0, 0.0));
//!
//! let mut stereo = vec![0.0f32; 64];
//! let frames = decoder.produce_block(&mut stereo);
//! assert_eq!(frames, 4);
//! ```

pub mod decoder;
pub mod encoder;
pub mod error;
pub mod hrtf;
pub mod pose;
pub mod rotator;

pub use decoder::{DecoderOptions, ShacDecoder, MAX_BLOCK_SIZE, MIN_BLOCK_SIZE};
pub use encoder::{encode_mono, CancelToken, EncoderOptions, MonoSource, SceneEncoder};
pub use error::{RenderError, Result};
pub use hrtf::HrtfTable;
pub use pose::{pose_slot, ListenerPose, PoseCell, PosePublisher};
pub use rotator::Rotator;
