//! Core types for the rasterizer

use glam::{Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::error::TextureError;
use crate::pipeline::color::{from_display_bytes, srgb_to_linear};

/// Up to four joint influences
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SkinWeights {
    pub joints: [u16; 4],
    /// Non-negative, summing to about 1
    pub weights: [f32; 4],
}

/// A model-space vertex as handed over by the asset side
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub pos: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
    /// Baked light or tint, linear
    pub color: Vec4,
    pub skin: Option<SkinWeights>,
}

impl Default for Vertex {
    fn default() -> Self {
        Self {
            pos: Vec3::ZERO,
            normal: Vec3::ZERO,
            uv: Vec2::ZERO,
            color: Vec4::ONE,
            skin: None,
        }
    }
}

impl Vertex {
    pub fn new(pos: Vec3, uv: Vec2, normal: Vec3) -> Self {
        Self {
            pos,
            uv,
            normal,
            ..Default::default()
        }
    }

    pub fn from_pos(x: f32, y: f32, z: f32) -> Self {
        Self {
            pos: Vec3::new(x, y, z),
            ..Default::default()
        }
    }

    pub fn with_color(mut self, color: Vec4) -> Self {
        self.color = color;
        self
    }

    pub fn with_skin(mut self, joints: [u16; 4], weights: [f32; 4]) -> Self {
        self.skin = Some(SkinWeights { joints, weights });
        self
    }
}

/// A triangle face (indices into vertex array)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Face {
    pub v0: usize,
    pub v1: usize,
    pub v2: usize,
}

impl Face {
    pub fn new(v0: usize, v1: usize, v2: usize) -> Self {
        Self { v0, v1, v2 }
    }
}

/// Triangulated vertex + index stream for one draw
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub faces: Vec<Face>,
}

impl Mesh {
    pub fn new(vertices: Vec<Vertex>, faces: Vec<Face>) -> Self {
        Self { vertices, faces }
    }
}

/// Opaque texture lookup: RGBA (linear) at a UV
pub trait TextureSampler: Sync {
    fn sample(&self, uv: Vec2) -> Vec4;
}

/// Simple texture (array of linear colors)
#[derive(Debug, Clone)]
pub struct Texture {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<Vec4>,
    pub name: String,
}

impl Texture {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![Vec4::ONE; width * height],
            name: String::new(),
        }
    }

    /// Load texture from an image file (sRGB-encoded)
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, TextureError> {
        let path = path.as_ref();
        let img = image::open(path).map_err(|source| TextureError::Load {
            path: path.display().to_string(),
            source,
        })?;

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        let texture = Self::from_image(img, name)?;
        log::info!("Loaded texture: {} ({}x{})", texture.name, texture.width, texture.height);
        Ok(texture)
    }

    /// Load texture from encoded image bytes
    pub fn from_bytes(bytes: &[u8], name: String) -> Result<Self, TextureError> {
        let img = image::load_from_memory(bytes)?;
        Self::from_image(img, name)
    }

    fn from_image(img: image::DynamicImage, name: String) -> Result<Self, TextureError> {
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        if width == 0 || height == 0 {
            return Err(TextureError::Empty { width: width as usize, height: height as usize });
        }

        let pixels: Vec<Vec4> = rgba.pixels().map(|p| from_display_bytes(p.0)).collect();

        Ok(Self {
            width: width as usize,
            height: height as usize,
            pixels,
            name,
        })
    }

    /// Create a checkerboard test texture
    pub fn checkerboard(width: usize, height: usize, color1: Vec4, color2: Vec4) -> Self {
        let mut pixels = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                let checker = ((x / 4) + (y / 4)) % 2 == 0;
                pixels.push(if checker { color1 } else { color2 });
            }
        }
        Self { width, height, pixels, name: "checkerboard".to_string() }
    }

    /// Vertical sky gradient laid out for equirectangular lookup (v=0 is straight up)
    pub fn sky_gradient(width: usize, height: usize, zenith: Vec3, horizon: Vec3, ground: Vec3) -> Self {
        let mut pixels = Vec::with_capacity(width * height);
        for y in 0..height {
            let v = (y as f32 + 0.5) / height as f32;
            let rgb = if v < 0.5 {
                zenith.lerp(horizon, (v / 0.5).powf(2.0))
            } else {
                horizon.lerp(ground, ((v - 0.5) / 0.5).sqrt())
            };
            let linear = Vec3::new(srgb_to_linear(rgb.x), srgb_to_linear(rgb.y), srgb_to_linear(rgb.z));
            pixels.extend(std::iter::repeat(linear.extend(1.0)).take(width));
        }
        Self { width, height, pixels, name: "sky".to_string() }
    }

    /// Get pixel at x,y coordinates
    pub fn get_pixel(&self, x: usize, y: usize) -> Vec4 {
        if x < self.width && y < self.height {
            self.pixels[y * self.width + x]
        } else {
            Vec4::new(0.0, 0.0, 0.0, 1.0)
        }
    }
}

impl TextureSampler for Texture {
    /// Nearest texel with repeat wrapping (no filtering - PS1 style)
    fn sample(&self, uv: Vec2) -> Vec4 {
        if self.width == 0 || self.height == 0 {
            return Vec4::ONE;
        }
        let tx = (uv.x * self.width as f32).floor() as i64;
        let ty = (uv.y * self.height as f32).floor() as i64;
        let tx = tx.rem_euclid(self.width as i64) as usize;
        let ty = ty.rem_euclid(self.height as i64) as usize;
        self.pixels[ty * self.width + tx]
    }
}

/// Rasterizer settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterSettings {
    /// Interpolate linearly in screen space (true = PS1 warping, false = perspective correct)
    pub affine_textures: bool,
    /// Use Z-buffer (false = painter's algorithm)
    pub use_zbuffer: bool,
    /// Backface culling
    pub backface_cull: bool,
    /// Sub-pixel sky jiggle
    pub sky_jiggle: bool,
    /// Color the frame is cleared to before the sky/geometry passes
    pub clear_color: Vec4,
}

impl Default for RasterSettings {
    fn default() -> Self {
        Self {
            affine_textures: true,  // PS1 default: affine (warpy)
            use_zbuffer: true,
            backface_cull: true,
            sky_jiggle: true,
            clear_color: Vec4::new(0.05, 0.05, 0.05, 1.0),
        }
    }
}
