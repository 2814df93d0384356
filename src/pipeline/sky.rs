//! Sky ray projection
//!
//! Rebuilds a world-space view ray per pixel and maps it onto an
//! equirectangular sky texture. Two ways of building the ray are offered
//! (unproject through the inverse view-projection, or from the field of view
//! rotated by the inverse view); both point the same way.

use std::f32::consts::PI;

use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};
use rayon::prelude::*;

use crate::rasterizer::TextureSampler;

/// Largest jiggle offset, in pixels
pub const MAX_JIGGLE: f32 = 0.25;

fn fract(v: f32) -> f32 {
    v - v.floor()
}

/// NDC of a pixel centre (y up)
pub fn pixel_to_ndc(x: f32, y: f32, resolution: Vec2) -> Vec2 {
    Vec2::new(
        (x + 0.5) / resolution.x * 2.0 - 1.0,
        1.0 - (y + 0.5) / resolution.y * 2.0,
    )
}

/// Ray through `ndc` from unprojecting its near and far points
pub fn ray_from_unproject(ndc: Vec2, inv_view_proj: &Mat4) -> Vec3 {
    let near = *inv_view_proj * Vec4::new(ndc.x, ndc.y, -1.0, 1.0);
    let far = *inv_view_proj * Vec4::new(ndc.x, ndc.y, 1.0, 1.0);
    if near.w.abs() <= f32::EPSILON || far.w.abs() <= f32::EPSILON {
        return Vec3::ZERO;
    }
    (far.truncate() / far.w - near.truncate() / near.w).normalize_or_zero()
}

/// Ray through `ndc` built in view space from the vertical FOV, then rotated to world
pub fn ray_from_fov(ndc: Vec2, fov_y: f32, aspect: f32, inv_view: &Mat4) -> Vec3 {
    let half = (fov_y * 0.5).tan();
    let view_dir = Vec3::new(ndc.x * half * aspect, ndc.y * half, -1.0).normalize();
    (Mat3::from_mat4(*inv_view) * view_dir).normalize_or_zero()
}

/// `(atan2(z, x) + pi, acos(y)) / (2pi, pi)`
pub fn equirect_uv(dir: Vec3) -> Vec2 {
    Vec2::new(
        (dir.z.atan2(dir.x) + PI) / (2.0 * PI),
        dir.y.clamp(-1.0, 1.0).acos() / PI,
    )
}

/// Sub-pixel offset from the view's translation.
///
/// The fractional parts of the translation are summed into a seed, so the
/// offset is stable for a still camera and shifts as it moves.
pub fn view_jiggle(view: &Mat4) -> Vec2 {
    let t = view.w_axis;
    let seed = fract(t.x) + fract(t.y) + fract(t.z);
    Vec2::new(
        (fract(seed * 12.9898) - 0.5) * 2.0 * MAX_JIGGLE,
        (fract(seed * 78.233) - 0.5) * 2.0 * MAX_JIGGLE,
    )
}

/// Fill a color buffer with the sky as seen through `view`/`projection`
pub fn render_sky(
    pixels: &mut [Vec4],
    width: usize,
    height: usize,
    sky: &dyn TextureSampler,
    view: &Mat4,
    projection: &Mat4,
    jiggle: bool,
) {
    let resolution = Vec2::new(width as f32, height as f32);
    let inv_view_proj = (*projection * *view).inverse();
    let offset = if jiggle { view_jiggle(view) } else { Vec2::ZERO };

    pixels.par_chunks_mut(width.max(1)).enumerate().for_each(|(y, row)| {
        for (x, px) in row.iter_mut().enumerate() {
            let ndc = pixel_to_ndc(x as f32 + offset.x, y as f32 + offset.y, resolution);
            let dir = ray_from_unproject(ndc, &inv_view_proj);
            *px = sky.sample(equirect_uv(dir));
        }
    });
}
