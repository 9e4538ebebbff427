//! Error types for encoding and decoding.

use thiserror::Error;

use shac_format::ShacFormatError;

/// Errors that can occur while encoding scenes or opening a decoder.
///
/// The real-time block path is infallible by design: every condition
/// it would need to report is checked at open time.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("invalid ambisonic order: {0} (must be 1-7)")]
    InvalidOrder(u16),

    #[error("HRTF channel count mismatch: expected {expected}, got {got}")]
    HrtfChannelMismatch { expected: usize, got: usize },

    #[error("HRTF impulse response for channel {channel} is empty")]
    EmptyImpulseResponse { channel: usize },

    #[error("invalid block size: {0} (must be 32..=8192)")]
    InvalidBlockSize(usize),

    #[error("encode session cancelled")]
    Cancelled,

    #[error(transparent)]
    Format(#[from] ShacFormatError),
}

pub type Result<T> = std::result::Result<T, RenderError>;
