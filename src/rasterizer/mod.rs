//! PS1-style software rasterizer
//!
//! Drives the `pipeline` stages off-GPU:
//! - Vertex snapping and distance tessellation before setup
//! - Affine (warping) or perspective-correct attribute interpolation
//! - Z-buffer or painter's algorithm
//! - Sky background and composite video post-process per frame

mod math;
mod types;
mod render;

pub use math::*;
pub use types::*;
pub use render::*;

/// Screen dimensions (authentic PS1 resolution)
pub const WIDTH: usize = 320;
pub const HEIGHT: usize = 240;

/// Display aspect of the internal target
pub const RENDER_ASPECT: f32 = 4.0 / 3.0;

/// Vertical field of view
pub const FOV_DEGREES: f32 = 60.0;

pub const NEAR_CLIP: f32 = 0.1;
pub const FAR_CLIP: f32 = 35.0;

/// Fog ramps in over the last stretch before the far plane
pub const FOG_START: f32 = FAR_CLIP - 10.0;
pub const FOG_END: f32 = FAR_CLIP - 5.0;
