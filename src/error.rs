//! Error types for transcript composition and export

use thiserror::Error;

use crate::assets::FrameSlot;

/// Result type alias for chatframe operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while composing or exporting a transcript
#[derive(Error, Debug)]
pub enum Error {
    /// Rejected user input (blank message text, malformed transcript)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// `clear` was requested on an empty store
    #[error("Nothing to clear: the transcript is already empty")]
    NothingToClear,

    /// A frame image could not be fetched or decoded
    #[error("Failed to load {slot} frame: {reason}")]
    AssetLoad { slot: FrameSlot, reason: String },

    /// The composite would not fit inside the output canvas
    #[error("Transcript too long: composite height is {current}px but the maximum is {max}px; remove some messages and try again")]
    OverLength { current: u32, max: u32 },

    /// Failed to rasterize the transcript snapshot
    #[error("Rendering failed: {0}")]
    RenderError(String),

    /// Output canvas could not be allocated
    #[error("Canvas context unavailable: {0}")]
    Context(String),

    /// PNG encoding failed
    #[error("Image encoding failed: {0}")]
    EncodeError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Filesystem error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::EncodeError(err.to_string())
    }
}
