//! # shac-format
//!
//! Reader and writer for the SHAC container format: multiple
//! positioned mono sources stored as independent ambisonic layers in a
//! single self-contained binary file.
//!
//! ## Format Overview
//!
//! A `.shac` file consists of:
//! - **Header** (26 bytes): magic `SHAC`, version, ambisonic order,
//!   channel count, sample rate, bit depth, samples per channel, layer
//!   count, normalization scheme. All integers little-endian.
//! - **Layer blocks**: for each layer, `id_len: u16`, `meta_len: u32`,
//!   the UTF-8 id, the UTF-8 JSON metadata, then `samples × N × 4`
//!   bytes of interleaved float32 audio in ACN channel order.
//!
//! Every layer shares the header's sample rate and sample count; layer
//! ids are unique within a file. A file is produced by a single writer
//! session and is immutable once written.
//!
//! ## Example
//!
//! ```rust
//! use shac_format::{parse, AmbisonicBuffer, LayerMetadata, Normalization, ShacWriter};
//!
//! let audio = AmbisonicBuffer::from_interleaved(vec![0.0; 4 * 4], 4).unwrap();
//! let meta = LayerMetadata::new([0.0, 0.0, 1.0], "voice");
//!
//! let mut writer = ShacWriter::new(1, 48_000, Normalization::Sn3d).unwrap();
//! writer.add_layer("voice", audio, &meta).unwrap();
//!
//! let mut bytes = Vec::new();
//! writer.write(&mut bytes).unwrap();
//!
//! let file = parse(&bytes).unwrap();
//! assert_eq!(file.header.order, 1);
//! assert_eq!(file.layers[0].id, "voice");
//! ```

pub mod error;
pub mod header;
pub mod layer;
pub mod reader;
pub mod writer;

pub use error::{Result, ShacFormatError};
pub use header::*;
pub use layer::{AmbisonicBuffer, Layer, LayerMetadata};
pub use reader::{parse, parse_with_limit, read_from_path, ShacFile};
pub use writer::ShacWriter;

// The normalization scheme is part of the header contract; re-export
// it so container users do not need a direct shac-math dependency.
pub use shac_math::Normalization;
