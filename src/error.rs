//! Error types for the fallible edges of the crate
//!
//! The pipeline stages themselves never fail; only config files, image
//! I/O and caller-side light list building can.

use thiserror::Error;

/// Errors from loading or saving a render config
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("Serialize error: {0}")]
    Serialize(#[from] ron::Error),
}

/// Errors from loading textures or saving frames
#[derive(Debug, Error)]
pub enum TextureError {
    #[error("Failed to load {path}: {source}")]
    Load {
        path: String,
        #[source]
        source: image::ImageError,
    },
    #[error("Failed to save {path}: {source}")]
    Save {
        path: String,
        #[source]
        source: image::ImageError,
    },
    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Texture has no pixels ({width}x{height})")]
    Empty { width: usize, height: usize },
}

/// Errors raised while assembling per-draw inputs
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DrawError {
    #[error("Light list is full ({capacity} lights)")]
    LightListFull { capacity: usize },
}
