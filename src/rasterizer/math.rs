//! Screen-space helpers for triangle setup

use glam::{Vec2, Vec3, Vec4};

/// Clip positions with |w| under this are not rasterized
pub const MIN_CLIP_W: f32 = 1e-6;

/// Clip space to screen pixels (y down), NDC depth in z
pub fn clip_to_screen(clip: Vec4, width: usize, height: usize) -> Vec3 {
    let ndc = clip.truncate() / clip.w;
    Vec3::new(
        (ndc.x + 1.0) * 0.5 * width as f32,
        (1.0 - ndc.y) * 0.5 * height as f32,
        ndc.z,
    )
}

/// Twice the signed area of (a, b, c); positive when counter-clockwise with y up
pub fn signed_area(a: Vec2, b: Vec2, c: Vec2) -> f32 {
    (b - a).perp_dot(c - a)
}

/// Calculate barycentric coordinates for point p in triangle (v1, v2, v3)
/// Returns (u, v, w) where u + v + w = 1 if point is inside triangle
pub fn barycentric(p: Vec2, v1: Vec2, v2: Vec2, v3: Vec2) -> Vec3 {
    let d = (v2.y - v3.y) * (v1.x - v3.x) + (v3.x - v2.x) * (v1.y - v3.y);

    if d.abs() < 0.0001 {
        return Vec3::splat(-1.0); // Degenerate triangle
    }

    let u = ((v2.y - v3.y) * (p.x - v3.x) + (v3.x - v2.x) * (p.y - v3.y)) / d;
    let v = ((v3.y - v1.y) * (p.x - v3.x) + (v1.x - v3.x) * (p.y - v3.y)) / d;
    let w = 1.0 - u - v;

    Vec3::new(u, v, w)
}

/// Reweight screen-space barycentrics by 1/w so attributes interpolate
/// perspective-correctly
pub fn perspective_weights(bc: Vec3, w: Vec3) -> Vec3 {
    let bcc = bc / w;
    let bd = bcc.x + bcc.y + bcc.z;
    if bd.abs() <= f32::EPSILON || !bd.is_finite() {
        return bc;
    }
    bcc / bd
}
