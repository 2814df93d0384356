//! Composite video emulation stage
//!
//! Encode a finished frame to YIQ, box-filter a mip chain of it, then decode
//! with luma read from level 0 and each chroma channel from a coarser level.
//! The mismatched levels are the whole effect: chroma smears across edges the
//! way it does over a bandwidth-limited NTSC signal.
//!
//! Mip generation is a barrier between the passes. Encode finishes every
//! texel before the first downsample, and every level exists before decode.
//! Within a pass rows are independent and run in parallel.

use glam::{Mat3, Vec2, Vec3, Vec4};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::color::{linear_to_srgb_rgb, quantize, saturate_rgb, srgb_to_linear_rgb};

/// RGB -> YIQ (columns)
pub const YIQ_FROM_RGB: Mat3 = Mat3::from_cols(
    Vec3::new(0.299, 0.596, 0.211),
    Vec3::new(0.587, -0.274, -0.523),
    Vec3::new(0.114, -0.322, 0.312),
);

/// YIQ -> RGB (columns)
pub const RGB_FROM_YIQ: Mat3 = Mat3::from_cols(
    Vec3::new(1.0, 1.0, 1.0),
    Vec3::new(0.956, -0.272, -1.106),
    Vec3::new(0.621, -0.647, 1.703),
);

pub fn rgb_to_yiq(rgb: Vec3) -> Vec3 {
    YIQ_FROM_RGB * rgb
}

pub fn yiq_to_rgb(yiq: Vec3) -> Vec3 {
    RGB_FROM_YIQ * yiq
}

/// Composite post-process settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositeSettings {
    pub enabled: bool,
    /// Mip level luma is read from
    pub luma_level: u32,
    /// Mip level the I channel is read from
    pub i_level: u32,
    /// Mip level the Q channel is read from
    pub q_level: u32,
    /// Encode sRGB-gamma values and decode back to linear
    pub gamma: bool,
    /// Quantize each channel to this many levels before encoding
    pub quantize_levels: Option<u32>,
}

impl Default for CompositeSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            luma_level: 0,
            i_level: 2,
            q_level: 3,
            gamma: true,
            quantize_levels: None,
        }
    }
}

/// One level of the YIQ target
#[derive(Debug, Clone)]
pub struct MipLevel {
    pub width: usize,
    pub height: usize,
    pub texels: Vec<Vec3>,
}

impl MipLevel {
    fn texel(&self, x: isize, y: isize) -> Vec3 {
        if self.texels.is_empty() {
            return Vec3::ZERO;
        }
        let x = x.clamp(0, self.width as isize - 1) as usize;
        let y = y.clamp(0, self.height as isize - 1) as usize;
        self.texels[y * self.width + x]
    }

    /// Bilinear fetch with clamp-to-edge addressing
    pub fn sample(&self, uv: Vec2) -> Vec3 {
        let tx = uv.x * self.width as f32 - 0.5;
        let ty = uv.y * self.height as f32 - 0.5;
        let x0 = tx.floor();
        let y0 = ty.floor();
        let fx = tx - x0;
        let fy = ty - y0;
        let (x0, y0) = (x0 as isize, y0 as isize);

        let top = self.texel(x0, y0).lerp(self.texel(x0 + 1, y0), fx);
        let bottom = self.texel(x0, y0 + 1).lerp(self.texel(x0 + 1, y0 + 1), fx);
        top.lerp(bottom, fy)
    }

    /// Box-filtered half-size level. On an odd dimension the last output
    /// also covers the trailing source texel, so every texel contributes.
    fn downsample(&self) -> MipLevel {
        let width = (self.width / 2).max(1);
        let height = (self.height / 2).max(1);
        let span = |i: usize, out_len: usize, src_len: usize| {
            let end = if i + 1 == out_len { src_len } else { i * 2 + 2 };
            (i * 2)..end.max(i * 2 + 1)
        };
        let mut texels = vec![Vec3::ZERO; width * height];
        texels.par_chunks_mut(width).enumerate().for_each(|(y, row)| {
            let rows = span(y, height, self.height);
            for (x, out) in row.iter_mut().enumerate() {
                let cols = span(x, width, self.width);
                let mut sum = Vec3::ZERO;
                for sy in rows.clone() {
                    for sx in cols.clone() {
                        sum += self.texel(sx as isize, sy as isize);
                    }
                }
                *out = sum / (rows.len() * cols.len()) as f32;
            }
        });
        MipLevel { width, height, texels }
    }
}

/// Pre-step applied to a frame color before the YIQ transform
pub fn encode_pixel(rgb: Vec3, settings: &CompositeSettings) -> Vec3 {
    let mut c = saturate_rgb(rgb);
    if settings.gamma {
        c = linear_to_srgb_rgb(c);
    }
    if let Some(levels) = settings.quantize_levels {
        c = Vec3::new(quantize(c.x, levels), quantize(c.y, levels), quantize(c.z, levels));
    }
    rgb_to_yiq(c)
}

/// The encoded frame and all of its mip levels. Lives for one frame.
#[derive(Debug, Clone)]
pub struct YiqMipChain {
    levels: Vec<MipLevel>,
}

impl YiqMipChain {
    /// Encode pass followed by the full mip chain
    pub fn encode(pixels: &[Vec4], width: usize, height: usize, settings: &CompositeSettings) -> Self {
        let mut texels = vec![Vec3::ZERO; width * height];
        texels
            .par_chunks_mut(width.max(1))
            .zip(pixels.par_chunks(width.max(1)))
            .for_each(|(out_row, in_row)| {
                for (out, px) in out_row.iter_mut().zip(in_row) {
                    *out = encode_pixel(px.truncate(), settings);
                }
            });

        let mut levels = vec![MipLevel { width, height, texels }];
        if width == 0 || height == 0 {
            return Self { levels };
        }
        loop {
            let last = &levels[levels.len() - 1];
            if last.width <= 1 && last.height <= 1 {
                break;
            }
            let next = last.downsample();
            levels.push(next);
        }
        log::debug!("Composite: encoded {}x{} into {} mip levels", width, height, levels.len());
        Self { levels }
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// Level `i`, clamped to the coarsest level like a sampler's max LOD
    pub fn level(&self, i: u32) -> &MipLevel {
        &self.levels[(i as usize).min(self.levels.len() - 1)]
    }

    pub fn width(&self) -> usize {
        self.levels[0].width
    }

    pub fn height(&self) -> usize {
        self.levels[0].height
    }

    /// Reconstruct one pixel: Y, I and Q each pulled from their own level
    pub fn decode_pixel(&self, x: usize, y: usize, settings: &CompositeSettings) -> Vec3 {
        let uv = Vec2::new(
            (x as f32 + 0.5) / self.width() as f32,
            (y as f32 + 0.5) / self.height() as f32,
        );
        let luma = self.level(settings.luma_level).sample(uv).x;
        let i = self.level(settings.i_level).sample(uv).y;
        let q = self.level(settings.q_level).sample(uv).z;

        let rgb = saturate_rgb(yiq_to_rgb(Vec3::new(luma, i, q)));
        if settings.gamma {
            srgb_to_linear_rgb(rgb)
        } else {
            rgb
        }
    }

    /// Decode pass over the whole frame; alpha is taken from `alpha_source`
    pub fn decode(&self, alpha_source: &[Vec4], settings: &CompositeSettings) -> Vec<Vec4> {
        let width = self.width();
        let mut out = vec![Vec4::ZERO; width * self.height()];
        out.par_chunks_mut(width.max(1)).enumerate().for_each(|(y, row)| {
            for (x, px) in row.iter_mut().enumerate() {
                let alpha = alpha_source.get(y * width + x).map_or(1.0, |p| p.w);
                *px = self.decode_pixel(x, y, settings).extend(alpha);
            }
        });
        out
    }
}

/// Full composite round: encode, build mips, decode
pub fn composite(pixels: &[Vec4], width: usize, height: usize, settings: &CompositeSettings) -> Vec<Vec4> {
    YiqMipChain::encode(pixels, width, height, settings).decode(pixels, settings)
}
