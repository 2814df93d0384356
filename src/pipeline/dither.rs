//! Dithering / quantization stage
//!
//! Integer-domain PS1 dither: remap through the DAC intensity curve, round
//! to 8 bits, add the ordered bias, then drop to 5 bits with a floor.

use glam::{UVec2, Vec3};
use serde::{Deserialize, Serialize};

use super::color::{dither_bias, intensity_remap, luma};

/// Output levels per channel (5-bit)
pub const DITHER_LEVELS: i32 = 32;

/// Dither options shared by every dithering material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DitherSettings {
    /// Scale the bias by `sqrt(luma)` so dark areas dither less
    pub luma_scaled: bool,
}

fn quantize_channel(c: f32, bias: i32) -> f32 {
    let c8 = (intensity_remap(c) * 255.0).round() as i32;
    let q = (c8 + bias).div_euclid(8).clamp(0, DITHER_LEVELS - 1);
    q as f32 / (DITHER_LEVELS - 1) as f32
}

/// Dither one color at a pixel. Deterministic in `(color, pixel)`.
pub fn dither(color: Vec3, pixel: UVec2, settings: &DitherSettings) -> Vec3 {
    let mut bias = dither_bias(pixel.x, pixel.y);
    if settings.luma_scaled {
        let strength = luma(color).max(0.0).sqrt();
        bias = (bias as f32 * strength).round() as i32;
    }
    Vec3::new(
        quantize_channel(color.x, bias),
        quantize_channel(color.y, bias),
        quantize_channel(color.z, bias),
    )
}
