//! Error types for the SHAC container format.

use thiserror::Error;

/// Errors that can occur when reading or writing SHAC files.
#[derive(Error, Debug)]
pub enum ShacFormatError {
    #[error("empty file: no header or no layers")]
    EmptyFile,

    #[error("invalid magic bytes: expected SHAC (0x53 0x48 0x41 0x43)")]
    InvalidMagic,

    #[error("unsupported format version: {0}")]
    UnsupportedVersion(u16),

    #[error("invalid ambisonic order: {0} (must be 1-7)")]
    InvalidOrder(u16),

    #[error("channel count mismatch: expected {expected}, got {got}")]
    ChannelMismatch { expected: usize, got: usize },

    #[error("invalid bit depth: {0} (must be 32)")]
    InvalidBitDepth(u32),

    #[error("invalid sample rate: {0} Hz (must be 8000-192000)")]
    InvalidSampleRate(u32),

    #[error("invalid normalization scheme: {0} (must be 1=SN3D or 2=N3D)")]
    InvalidNormalization(u16),

    #[error("truncated data at byte {offset}: need {needed} bytes, {available} available")]
    TruncatedData {
        offset: u64,
        needed: u64,
        available: u64,
    },

    #[error("duplicate layer id: '{0}'")]
    DuplicateLayerId(String),

    #[error("invalid layer id at index {index}: {reason}")]
    InvalidLayerId { index: usize, reason: String },

    #[error("metadata too large for layer '{layer}': {len} bytes (max {max})")]
    MetadataTooLarge {
        layer: String,
        len: usize,
        max: usize,
    },

    #[error("invalid metadata for layer '{layer}': {reason}")]
    InvalidMetadata { layer: String, reason: String },

    #[error("layer frame count mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: usize, got: usize },

    #[error("declared layer audio of {requested} bytes exceeds the allocation limit of {limit} bytes")]
    AllocationTooLarge { requested: u64, limit: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ShacFormatError>;
