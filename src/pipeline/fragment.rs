//! Per-vertex light setup and the per-pixel stage chain
//!
//! Vertex side: evaluate or bake light so subdivision can carry it.
//! Pixel side: albedo, discard, light, fog, dither, in that order.

use glam::{Mat4, UVec2, Vec2, Vec3, Vec4};

use super::color::saturate_rgb;
use super::dither::{dither, DitherSettings};
use super::fog::FogParams;
use super::lighting::{accumulate, BakedLight, LightList, LightingMode, DEFAULT_POINT_LIGHT_SCALE};
use super::material::MaterialConfig;
use super::projection::ProjectedVertex;
use crate::rasterizer::TextureSampler;

/// Texels with alpha under this are discarded
pub const ALPHA_CUTOFF: f32 = 0.1;

/// Everything shared by every draw in a frame
#[derive(Debug, Clone)]
pub struct FrameParams {
    pub view: Mat4,
    pub projection: Mat4,
    pub lights: LightList,
    pub fog: FogParams,
    pub resolution: UVec2,
    pub point_light_scale: f32,
    pub baked: BakedLight,
    pub dither: DitherSettings,
}

impl Default for FrameParams {
    fn default() -> Self {
        Self {
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            lights: LightList::new(),
            fog: FogParams::default(),
            resolution: UVec2::new(crate::rasterizer::WIDTH as u32, crate::rasterizer::HEIGHT as u32),
            point_light_scale: DEFAULT_POINT_LIGHT_SCALE,
            baked: BakedLight::default(),
            dither: DitherSettings::default(),
        }
    }
}

impl FrameParams {
    pub fn resolution_f32(&self) -> Vec2 {
        self.resolution.as_vec2()
    }
}

/// One pixel's worth of interpolated inputs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fragment {
    pub pixel: UVec2,
    pub eye_distance: f32,
    pub world_pos: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
    pub color: Vec4,
    pub light: Vec3,
}

impl Fragment {
    pub fn from_vertex(v: &ProjectedVertex, pixel: UVec2) -> Self {
        Self {
            pixel,
            eye_distance: v.eye_distance(),
            world_pos: v.world_pos,
            normal: v.normal,
            uv: v.uv,
            color: v.color,
            light: v.light,
        }
    }
}

/// Fill `light` for modes that resolve it per vertex
pub fn light_vertex(v: &mut ProjectedVertex, material: &MaterialConfig, frame: &FrameParams) {
    v.light = match material.lighting {
        LightingMode::Vertex => accumulate(&frame.lights, v.world_pos, v.normal, frame.point_light_scale),
        LightingMode::Baked => frame.baked.apply(v.color.truncate()),
        LightingMode::Fragment => Vec3::ZERO,
    };
}

/// Run one fragment through lighting, fog and dithering.
/// Returns `None` when the texel is cut out.
pub fn shade_fragment(
    frag: &Fragment,
    material: &MaterialConfig,
    frame: &FrameParams,
    texture: Option<&dyn TextureSampler>,
) -> Option<Vec4> {
    let mut albedo = material.base_color;
    if let Some(texture) = texture {
        albedo *= texture.sample(frag.uv);
    }
    if albedo.w < ALPHA_CUTOFF {
        return None;
    }

    let (tint, light) = match material.lighting {
        LightingMode::Vertex => (frag.color.truncate(), frag.light),
        LightingMode::Fragment => {
            let normal = frag.normal.normalize_or_zero();
            let light = accumulate(&frame.lights, frag.world_pos, normal, frame.point_light_scale);
            (frag.color.truncate(), light)
        }
        // Vertex color already went into the baked light
        LightingMode::Baked => (Vec3::ONE, frag.light),
    };

    let lit = albedo.truncate() * tint * light;

    let mut rgb = if material.fog {
        frame.fog.apply(lit, frag.eye_distance)
    } else {
        saturate_rgb(lit)
    };

    if material.dither {
        rgb = dither(rgb, frag.pixel, &frame.dither);
    }

    Some(rgb.extend(albedo.w.clamp(0.0, 1.0)))
}
