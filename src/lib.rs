//! Bonnie Retro
//!
//! A PS1-style rendering pipeline: vertex snapping, distance tessellation,
//! bounded light lists, linear fog, ordered dithering and an NTSC composite
//! post-process, driven by a software rasterizer.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod rasterizer;

pub use config::{load_config, load_config_from_str, save_config, RenderConfig};
pub use error::{ConfigError, DrawError, TextureError};

/// Crate version, for window titles and logs
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
