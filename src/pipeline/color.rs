//! Color and intensity helpers shared by the stages
//!
//! Pure functions over linear `f32` channels. No state.

use glam::{Vec3, Vec4};

/// PS1 GPU dither matrix (signed values -4 to +3), indexed `[y & 3][x & 3]`
pub const DITHER_MATRIX: [[i8; 4]; 4] = [
    [-4,  0, -3,  1],
    [ 2, -2,  3, -1],
    [-3,  1, -4,  0],
    [ 3, -1,  2, -2],
];

/// Convert one sRGB-encoded channel to linear
pub fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Convert one linear channel to sRGB encoding
pub fn linear_to_srgb(c: f32) -> f32 {
    if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

pub fn srgb_to_linear_rgb(c: Vec3) -> Vec3 {
    Vec3::new(srgb_to_linear(c.x), srgb_to_linear(c.y), srgb_to_linear(c.z))
}

pub fn linear_to_srgb_rgb(c: Vec3) -> Vec3 {
    Vec3::new(linear_to_srgb(c.x), linear_to_srgb(c.y), linear_to_srgb(c.z))
}

/// Luma with the legacy 0.3 / 0.59 / 0.11 weights (not BT.601 or BT.709)
pub fn luma(rgb: Vec3) -> f32 {
    0.3 * rgb.x + 0.59 * rgb.y + 0.11 * rgb.z
}

/// Ordered dither bias for an integer pixel position
pub fn dither_bias(x: u32, y: u32) -> i32 {
    DITHER_MATRIX[(y & 3) as usize][(x & 3) as usize] as i32
}

/// Piecewise intensity curve of a non-linear DAC ramp.
///
/// The low quarter of the input range is stretched over the first half of
/// the output, the remaining three quarters over the second half.
pub fn intensity_remap(c: f32) -> f32 {
    let a = (c / 0.25).clamp(0.0, 1.0);
    let b = ((c - 0.25) / 0.75).clamp(0.0, 1.0);
    0.5 * (a + b)
}

pub fn intensity_remap_rgb(c: Vec3) -> Vec3 {
    Vec3::new(intensity_remap(c.x), intensity_remap(c.y), intensity_remap(c.z))
}

/// Quantize a channel to `levels` evenly spaced values over [0, 1]
pub fn quantize(c: f32, levels: u32) -> f32 {
    if levels < 2 {
        return c.clamp(0.0, 1.0);
    }
    let steps = (levels - 1) as f32;
    (c.clamp(0.0, 1.0) * steps).round() / steps
}

/// Clamp all four channels to [0, 1], mapping NaN to 0
pub fn saturate(c: Vec4) -> Vec4 {
    let c = Vec4::select(c.cmpeq(c), c, Vec4::ZERO);
    c.clamp(Vec4::ZERO, Vec4::ONE)
}

/// Clamp three channels to [0, 1], mapping NaN to 0
pub fn saturate_rgb(c: Vec3) -> Vec3 {
    let c = Vec3::select(c.cmpeq(c), c, Vec3::ZERO);
    c.clamp(Vec3::ZERO, Vec3::ONE)
}

/// Encode a linear color for display as 8-bit sRGB RGBA
pub fn to_display_bytes(c: Vec4) -> [u8; 4] {
    let c = saturate(c);
    let rgb = linear_to_srgb_rgb(c.truncate());
    [
        (rgb.x * 255.0).round() as u8,
        (rgb.y * 255.0).round() as u8,
        (rgb.z * 255.0).round() as u8,
        (c.w * 255.0).round() as u8,
    ]
}

/// Decode an 8-bit sRGB RGBA pixel to linear floats
pub fn from_display_bytes(p: [u8; 4]) -> Vec4 {
    let rgb = Vec3::new(p[0] as f32, p[1] as f32, p[2] as f32) / 255.0;
    srgb_to_linear_rgb(rgb).extend(p[3] as f32 / 255.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_srgb_round_trip() {
        for i in 0..=20 {
            let c = i as f32 / 20.0;
            assert!((srgb_to_linear(linear_to_srgb(c)) - c).abs() < 1e-5);
        }
    }

    #[test]
    fn test_luma_weights() {
        assert!((luma(Vec3::new(1.0, 0.0, 0.0)) - 0.3).abs() < 1e-6);
        assert!((luma(Vec3::new(0.0, 1.0, 0.0)) - 0.59).abs() < 1e-6);
        assert!((luma(Vec3::new(0.0, 0.0, 1.0)) - 0.11).abs() < 1e-6);
        assert!((luma(Vec3::ONE) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_dither_matrix_range() {
        let mut sum = 0;
        for y in 0..4 {
            for x in 0..4 {
                let b = dither_bias(x, y);
                assert!((-4..=3).contains(&b));
                sum += b;
            }
        }
        assert_eq!(sum, -8);
        assert_eq!(dither_bias(4, 4), dither_bias(0, 0));
        assert_eq!(dither_bias(5, 6), dither_bias(1, 2));
    }

    #[test]
    fn test_intensity_remap_knots() {
        assert_eq!(intensity_remap(0.0), 0.0);
        assert!((intensity_remap(0.25) - 0.5).abs() < 1e-6);
        assert!((intensity_remap(1.0) - 1.0).abs() < 1e-6);
        assert!((intensity_remap(0.125) - 0.25).abs() < 1e-6);
        assert_eq!(intensity_remap(-1.0), 0.0);
        assert!((intensity_remap(2.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_intensity_remap_monotonic() {
        let mut prev = intensity_remap(0.0);
        for i in 1..=100 {
            let v = intensity_remap(i as f32 / 100.0);
            assert!(v >= prev);
            prev = v;
        }
    }

    #[test]
    fn test_quantize_levels() {
        assert_eq!(quantize(0.0, 32), 0.0);
        assert_eq!(quantize(1.0, 32), 1.0);
        assert!((quantize(0.5, 32) - 16.0 / 31.0).abs() < 1e-6);
        assert_eq!(quantize(1.5, 32), 1.0);
    }

    #[test]
    fn test_saturate_removes_nan() {
        let c = saturate(Vec4::new(f32::NAN, 2.0, -1.0, 0.5));
        assert_eq!(c, Vec4::new(0.0, 1.0, 0.0, 0.5));
    }

    #[test]
    fn test_display_bytes() {
        assert_eq!(to_display_bytes(Vec4::ONE), [255, 255, 255, 255]);
        assert_eq!(to_display_bytes(Vec4::new(0.0, 0.0, 0.0, 1.0)), [0, 0, 0, 255]);
        let back = from_display_bytes([128, 64, 255, 255]);
        assert_eq!(to_display_bytes(back), [128, 64, 255, 255]);
    }
}
