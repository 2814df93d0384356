//! Core rendering functions
//! Triangle setup and rasterization driving the retro pipeline stages

use std::ops::AddAssign;

use glam::{Mat4, UVec2, Vec2, Vec3, Vec4};
use rayon::prelude::*;

use super::math::{barycentric, clip_to_screen, perspective_weights, signed_area, MIN_CLIP_W};
use super::types::{Face, Mesh, RasterSettings, TextureSampler, Vertex};
use crate::error::TextureError;
use crate::pipeline::color::to_display_bytes;
use crate::pipeline::composite::{composite, CompositeSettings};
use crate::pipeline::fragment::{light_vertex, shade_fragment, Fragment, FrameParams};
use crate::pipeline::material::MaterialConfig;
use crate::pipeline::projection::{billboard_matrix, project_vertex, ProjectedVertex, Skin, TransformSet};
use crate::pipeline::sky::render_sky;
use crate::pipeline::tessellation::tessellate;

/// Framebuffer for software rendering (linear color)
pub struct Framebuffer {
    pub color: Vec<Vec4>,
    pub depth: Vec<f32>, // NDC depth, cleared to f32::MAX
    pub width: usize,
    pub height: usize,
}

impl Framebuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            color: vec![Vec4::ZERO; width * height],
            depth: vec![f32::MAX; width * height],
            width,
            height,
        }
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        if self.width != width || self.height != height {
            *self = Self::new(width, height);
        }
    }

    pub fn clear(&mut self, color: Vec4) {
        self.color.fill(color);
        self.depth.fill(f32::MAX);
    }

    pub fn get_pixel(&self, x: usize, y: usize) -> Option<Vec4> {
        if x < self.width && y < self.height {
            Some(self.color[y * self.width + x])
        } else {
            None
        }
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, color: Vec4) {
        if x < self.width && y < self.height {
            self.color[y * self.width + x] = color;
        }
    }

    pub fn set_pixel_with_depth(&mut self, x: usize, y: usize, z: f32, color: Vec4) -> bool {
        if x < self.width && y < self.height {
            let idx = y * self.width + x;
            if z < self.depth[idx] {
                self.depth[idx] = z;
                self.color[idx] = color;
                return true;
            }
        }
        false
    }

    /// sRGB-encoded RGBA8, ready for display or export
    pub fn to_rgba8(&self) -> Vec<u8> {
        self.color.iter().flat_map(|&c| to_display_bytes(c)).collect()
    }

    pub fn save_png<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), TextureError> {
        let path = path.as_ref();
        image::save_buffer(
            path,
            &self.to_rgba8(),
            self.width as u32,
            self.height as u32,
            image::ColorType::Rgba8,
        )
        .map_err(|source| TextureError::Save {
            path: path.display().to_string(),
            source,
        })?;
        log::info!("Saved frame to {}", path.display());
        Ok(())
    }
}

/// Pitch limit either side of the horizon
pub const MAX_PITCH: f32 = 0.4 * std::f32::consts::PI;

/// First-person camera state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub pitch: f32,
    pub yaw: f32, // 0 looks down -Z
}

impl Camera {
    pub fn new(position: Vec3) -> Self {
        Self { position, pitch: 0.0, yaw: 0.0 }
    }

    pub fn forward(&self) -> Vec3 {
        Vec3::new(
            self.pitch.cos() * self.yaw.sin(),
            self.pitch.sin(),
            -self.pitch.cos() * self.yaw.cos(),
        )
    }

    pub fn right(&self) -> Vec3 {
        Vec3::new(self.yaw.cos(), 0.0, self.yaw.sin())
    }

    pub fn rotate(&mut self, dpitch: f32, dyaw: f32) {
        self.yaw += dyaw;
        self.pitch = (self.pitch + dpitch).clamp(-MAX_PITCH, MAX_PITCH);
    }

    /// Move along the view direction, the flat right vector and world up
    pub fn translate(&mut self, forward: f32, right: f32, up: f32) {
        self.position += self.forward() * forward + self.right() * right + Vec3::Y * up;
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.forward(), Vec3::Y)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vec3::ZERO)
    }
}

/// One mesh submission
#[derive(Clone, Copy)]
pub struct Draw<'a> {
    pub mesh: &'a Mesh,
    pub model: Mat4,
    pub skin: Option<&'a Skin>,
    pub material: &'a MaterialConfig,
    pub texture: Option<&'a dyn TextureSampler>,
    /// Replace the model rotation with one that faces the camera
    pub billboard: bool,
}

impl<'a> Draw<'a> {
    pub fn new(mesh: &'a Mesh, material: &'a MaterialConfig) -> Self {
        Self {
            mesh,
            model: Mat4::IDENTITY,
            skin: None,
            material,
            texture: None,
            billboard: false,
        }
    }

    pub fn with_model(mut self, model: Mat4) -> Self {
        self.model = model;
        self
    }

    pub fn with_texture(mut self, texture: &'a dyn TextureSampler) -> Self {
        self.texture = Some(texture);
        self
    }

    pub fn with_skin(mut self, skin: &'a Skin) -> Self {
        self.skin = Some(skin);
        self
    }

    pub fn billboard(mut self) -> Self {
        self.billboard = true;
        self
    }
}

/// Counters gathered while drawing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawStats {
    /// Source faces submitted
    pub triangles_in: usize,
    /// Sub-triangles left after subdivision and culling
    pub subtriangles_drawn: usize,
    pub culled: usize,
    /// Dropped for crossing the near plane or having w <= 0
    pub clipped: usize,
    pub subdivided_vertices: usize,
    pub fragments_written: usize,
    pub fragments_discarded: usize,
}

impl AddAssign for DrawStats {
    fn add_assign(&mut self, other: Self) {
        self.triangles_in += other.triangles_in;
        self.subtriangles_drawn += other.subtriangles_drawn;
        self.culled += other.culled;
        self.clipped += other.clipped;
        self.subdivided_vertices += other.subdivided_vertices;
        self.fragments_written += other.fragments_written;
        self.fragments_discarded += other.fragments_discarded;
    }
}

/// Sub-triangle ready for rasterization
struct Surface {
    verts: [ProjectedVertex; 3],
    screen: [Vec3; 3],
}

impl Surface {
    fn max_depth(&self) -> f32 {
        self.screen[0].z.max(self.screen[1].z).max(self.screen[2].z)
    }
}

fn in_front(v: &ProjectedVertex) -> bool {
    v.clip_pos.w > MIN_CLIP_W && v.clip_pos.z >= -v.clip_pos.w
}

/// Rasterize a single triangle
fn rasterize_triangle(
    fb: &mut Framebuffer,
    surface: &Surface,
    draw: &Draw,
    frame: &FrameParams,
    settings: &RasterSettings,
    stats: &mut DrawStats,
) {
    let [s1, s2, s3] = surface.screen;
    let [a, b, c] = &surface.verts;

    // Bounding box
    let min_x = s1.x.min(s2.x).min(s3.x).floor().max(0.0) as usize;
    let max_x = s1.x.max(s2.x).max(s3.x).ceil().min(fb.width as f32) as usize;
    let min_y = s1.y.min(s2.y).min(s3.y).floor().max(0.0) as usize;
    let max_y = s1.y.max(s2.y).max(s3.y).ceil().min(fb.height as f32) as usize;

    let clip_w = Vec3::new(a.clip_pos.w, b.clip_pos.w, c.clip_pos.w);

    for y in min_y..max_y {
        for x in min_x..max_x {
            let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            let bc = barycentric(p, s1.truncate(), s2.truncate(), s3.truncate());

            // Check if inside triangle
            const ERR: f32 = -0.0001;
            if bc.x < ERR || bc.y < ERR || bc.z < ERR {
                continue;
            }

            // Interpolate depth (NDC z is linear in screen space)
            let z = bc.x * s1.z + bc.y * s2.z + bc.z * s3.z;
            if z > 1.0 {
                continue;
            }

            // Early Z test
            if settings.use_zbuffer && z >= fb.depth[y * fb.width + x] {
                continue;
            }

            let weights = if settings.affine_textures {
                bc
            } else {
                perspective_weights(bc, clip_w)
            };

            let attrs = ProjectedVertex::blend(a, b, c, weights);
            let frag = Fragment::from_vertex(&attrs, UVec2::new(x as u32, y as u32));

            match shade_fragment(&frag, draw.material, frame, draw.texture) {
                Some(color) => {
                    if settings.use_zbuffer {
                        fb.set_pixel_with_depth(x, y, z, color);
                    } else {
                        fb.set_pixel(x, y, color);
                    }
                    stats.fragments_written += 1;
                }
                None => stats.fragments_discarded += 1,
            }
        }
    }
}

/// Project, light, subdivide and rasterize one draw
pub fn render_draw(
    fb: &mut Framebuffer,
    frame: &FrameParams,
    draw: &Draw,
    settings: &RasterSettings,
) -> DrawStats {
    let mut stats = DrawStats::default();

    let model = if draw.billboard {
        billboard_matrix(&frame.view, &draw.model)
    } else {
        draw.model
    };
    let transforms = TransformSet::new(model, frame.view, frame.projection);
    let snap_grid = draw.material.snap_grid_for(frame.resolution_f32());

    // Vertex stage
    let projected: Vec<ProjectedVertex> = draw
        .mesh
        .vertices
        .par_iter()
        .map(|v| {
            let mut p = project_vertex(v, &transforms, draw.skin, snap_grid);
            light_vertex(&mut p, draw.material, frame);
            p
        })
        .collect();

    // Build surfaces for visible sub-triangles
    let mut surfaces: Vec<Surface> = Vec::with_capacity(draw.mesh.faces.len());

    for face in &draw.mesh.faces {
        stats.triangles_in += 1;

        let (Some(v0), Some(v1), Some(v2)) = (
            projected.get(face.v0),
            projected.get(face.v1),
            projected.get(face.v2),
        ) else {
            log::warn!("Face {:?} indexes past {} vertices", face, projected.len());
            continue;
        };

        let patch = tessellate([*v0, *v1, *v2], draw.material.tessellation.as_ref());
        stats.subdivided_vertices += patch.vertices.len();

        for i in 0..patch.triangles.len() {
            let [a, b, c] = patch.triangle(i);

            // Near plane clipping (skip triangles reaching behind the camera)
            if !(in_front(a) && in_front(b) && in_front(c)) {
                stats.clipped += 1;
                continue;
            }

            let screen = [
                clip_to_screen(a.clip_pos, fb.width, fb.height),
                clip_to_screen(b.clip_pos, fb.width, fb.height),
                clip_to_screen(c.clip_pos, fb.width, fb.height),
            ];

            // Screen y points down, so counter-clockwise faces have negative area
            let area = signed_area(screen[0].truncate(), screen[1].truncate(), screen[2].truncate());
            if settings.backface_cull && area >= 0.0 {
                stats.culled += 1;
                continue;
            }

            surfaces.push(Surface { verts: [*a, *b, *c], screen });
        }
    }

    // Sort by depth if not using Z-buffer (painter's algorithm)
    if !settings.use_zbuffer {
        surfaces.sort_by(|a, b| {
            b.max_depth()
                .partial_cmp(&a.max_depth())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }

    for surface in &surfaces {
        rasterize_triangle(fb, surface, draw, frame, settings, &mut stats);
    }
    stats.subtriangles_drawn = surfaces.len();

    log::debug!(
        "draw: {} faces in, {} sub-triangles drawn, {} culled, {} clipped, {} tess verts, {} frags, {} discarded",
        stats.triangles_in,
        stats.subtriangles_drawn,
        stats.culled,
        stats.clipped,
        stats.subdivided_vertices,
        stats.fragments_written,
        stats.fragments_discarded
    );

    stats
}

/// Full frame: clear, sky, draws, then the composite post-process.
/// The framebuffer holds linear color afterwards; `to_rgba8` does display conversion.
pub fn render_frame(
    fb: &mut Framebuffer,
    frame: &FrameParams,
    draws: &[Draw],
    sky: Option<&dyn TextureSampler>,
    video: &CompositeSettings,
    settings: &RasterSettings,
) -> DrawStats {
    fb.clear(settings.clear_color);

    if let Some(sky) = sky {
        render_sky(
            &mut fb.color,
            fb.width,
            fb.height,
            sky,
            &frame.view,
            &frame.projection,
            settings.sky_jiggle,
        );
    }

    let mut stats = DrawStats::default();
    for draw in draws {
        stats += render_draw(fb, frame, draw, settings);
    }

    if video.enabled {
        fb.color = composite(&fb.color, fb.width, fb.height, video);
    }

    log::debug!(
        "frame: {} draws, {} sub-triangles drawn, {} fragments",
        draws.len(),
        stats.subtriangles_drawn,
        stats.fragments_written
    );

    stats
}

/// Create a simple test cube mesh
pub fn create_test_cube() -> Mesh {
    let mut vertices = Vec::new();
    let mut faces = Vec::new();

    // Cube vertices with positions, UVs, and normals
    let positions = [
        // Front face
        Vec3::new(-1.0, -1.0, 1.0),
        Vec3::new(1.0, -1.0, 1.0),
        Vec3::new(1.0, 1.0, 1.0),
        Vec3::new(-1.0, 1.0, 1.0),
        // Back face
        Vec3::new(-1.0, -1.0, -1.0),
        Vec3::new(-1.0, 1.0, -1.0),
        Vec3::new(1.0, 1.0, -1.0),
        Vec3::new(1.0, -1.0, -1.0),
        // Top face
        Vec3::new(-1.0, 1.0, -1.0),
        Vec3::new(-1.0, 1.0, 1.0),
        Vec3::new(1.0, 1.0, 1.0),
        Vec3::new(1.0, 1.0, -1.0),
        // Bottom face
        Vec3::new(-1.0, -1.0, -1.0),
        Vec3::new(1.0, -1.0, -1.0),
        Vec3::new(1.0, -1.0, 1.0),
        Vec3::new(-1.0, -1.0, 1.0),
        // Right face
        Vec3::new(1.0, -1.0, -1.0),
        Vec3::new(1.0, 1.0, -1.0),
        Vec3::new(1.0, 1.0, 1.0),
        Vec3::new(1.0, -1.0, 1.0),
        // Left face
        Vec3::new(-1.0, -1.0, -1.0),
        Vec3::new(-1.0, -1.0, 1.0),
        Vec3::new(-1.0, 1.0, 1.0),
        Vec3::new(-1.0, 1.0, -1.0),
    ];

    let normals = [
        Vec3::Z,     // Front
        Vec3::NEG_Z, // Back
        Vec3::Y,     // Top
        Vec3::NEG_Y, // Bottom
        Vec3::X,     // Right
        Vec3::NEG_X, // Left
    ];

    let uvs = [
        Vec2::new(0.0, 1.0),
        Vec2::new(1.0, 1.0),
        Vec2::new(1.0, 0.0),
        Vec2::new(0.0, 0.0),
    ];

    // Build vertices for each face
    for (face_idx, &normal) in normals.iter().enumerate() {
        let base = face_idx * 4;

        for i in 0..4 {
            vertices.push(Vertex::new(positions[base + i], uvs[i], normal));
        }

        // Two triangles per face
        faces.push(Face::new(base, base + 1, base + 2));
        faces.push(Face::new(base, base + 2, base + 3));
    }

    Mesh::new(vertices, faces)
}

/// Flat grid facing +Y, `divisions` quads per side, vertex colors as a
/// baked-light falloff from the centre
pub fn create_ground_plane(size: f32, divisions: usize, y: f32) -> Mesh {
    let divisions = divisions.max(1);
    let row = divisions + 1;
    let half = size * 0.5;

    let mut vertices = Vec::with_capacity(row * row);
    for zi in 0..row {
        for xi in 0..row {
            let u = xi as f32 / divisions as f32;
            let v = zi as f32 / divisions as f32;
            let pos = Vec3::new(-half + u * size, y, -half + v * size);
            let falloff = (1.0 - pos.length() / half.max(f32::EPSILON)).clamp(0.1, 1.0);
            vertices.push(
                Vertex::new(pos, Vec2::new(u * divisions as f32, v * divisions as f32), Vec3::Y)
                    .with_color(Vec4::new(falloff, falloff, falloff, 1.0)),
            );
        }
    }

    let mut faces = Vec::with_capacity(divisions * divisions * 2);
    for zi in 0..divisions {
        for xi in 0..divisions {
            let i00 = zi * row + xi;
            let i10 = i00 + 1;
            let i01 = i00 + row;
            let i11 = i01 + 1;
            faces.push(Face::new(i00, i01, i11));
            faces.push(Face::new(i00, i11, i10));
        }
    }

    Mesh::new(vertices, faces)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::lighting::{Light, LightList};
    use crate::rasterizer::Texture;

    const W: usize = 320;
    const H: usize = 240;

    fn frame() -> FrameParams {
        FrameParams {
            view: Mat4::look_at_rh(Vec3::new(0.0, 0.0, 3.0), Vec3::ZERO, Vec3::Y),
            projection: Mat4::perspective_rh_gl(60f32.to_radians(), 4.0 / 3.0, 0.1, 35.0),
            lights: LightList::from_slice(&[Light::directional(Vec3::NEG_Z, Vec3::ONE, 1.0)]),
            ..FrameParams::default()
        }
    }

    fn triangle(z: f32, color: Vec4, face: Face) -> Mesh {
        let vertices = vec![
            Vertex::new(Vec3::new(-1.0, -1.0, z), Vec2::ZERO, Vec3::Z).with_color(color),
            Vertex::new(Vec3::new(1.0, -1.0, z), Vec2::ZERO, Vec3::Z).with_color(color),
            Vertex::new(Vec3::new(0.0, 1.0, z), Vec2::ZERO, Vec3::Z).with_color(color),
        ];
        Mesh::new(vertices, vec![face])
    }

    fn center(fb: &Framebuffer) -> Vec4 {
        fb.get_pixel(W / 2, H / 2).unwrap()
    }

    fn cleared() -> Framebuffer {
        let mut fb = Framebuffer::new(W, H);
        fb.clear(Vec4::new(0.0, 0.0, 0.0, 1.0));
        fb
    }

    struct Solid(Vec4);

    impl TextureSampler for Solid {
        fn sample(&self, _uv: Vec2) -> Vec4 {
            self.0
        }
    }

    #[test]
    fn test_framebuffer_depth() {
        let mut fb = Framebuffer::new(4, 4);
        assert!(fb.set_pixel_with_depth(1, 1, 0.5, Vec4::ONE));
        assert!(!fb.set_pixel_with_depth(1, 1, 0.7, Vec4::ZERO));
        assert!(fb.set_pixel_with_depth(1, 1, 0.2, Vec4::X));
        assert_eq!(fb.get_pixel(1, 1), Some(Vec4::X));
        assert!(!fb.set_pixel_with_depth(9, 9, 0.0, Vec4::ONE));
        assert_eq!(fb.get_pixel(9, 9), None);
    }

    #[test]
    fn test_framebuffer_rgba8() {
        let mut fb = Framebuffer::new(2, 1);
        fb.clear(Vec4::new(1.0, 0.0, 0.0, 1.0));
        assert_eq!(fb.to_rgba8(), vec![255, 0, 0, 255, 255, 0, 0, 255]);
    }

    #[test]
    fn test_camera_view() {
        let cam = Camera::new(Vec3::new(0.0, 0.0, 5.0));
        let eye = cam.view_matrix() * Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert!((eye.truncate() - Vec3::new(0.0, 0.0, -5.0)).length() < 1e-5);
    }

    #[test]
    fn test_camera_pitch_clamp() {
        let mut cam = Camera::default();
        cam.rotate(10.0, 0.0);
        assert_eq!(cam.pitch, MAX_PITCH);
        cam.rotate(-20.0, 0.0);
        assert_eq!(cam.pitch, -MAX_PITCH);
        assert!(cam.view_matrix().is_finite());
    }

    #[test]
    fn test_front_triangle_drawn() {
        let mut fb = cleared();
        let mesh = triangle(0.0, Vec4::ONE, Face::new(0, 1, 2));
        let material = MaterialConfig::modern();
        let stats = render_draw(&mut fb, &frame(), &Draw::new(&mesh, &material), &RasterSettings::default());
        assert_eq!(stats.subtriangles_drawn, 1);
        assert!(stats.fragments_written > 0);
        assert!((center(&fb).truncate() - Vec3::ONE).length() < 1e-4);
        assert!(fb.depth[(H / 2) * W + W / 2] < 1.0);
    }

    #[test]
    fn test_backface_cull() {
        let mesh = triangle(0.0, Vec4::ONE, Face::new(0, 2, 1));
        let material = MaterialConfig::modern();

        let mut fb = cleared();
        let stats = render_draw(&mut fb, &frame(), &Draw::new(&mesh, &material), &RasterSettings::default());
        assert_eq!(stats.culled, 1);
        assert_eq!(stats.fragments_written, 0);
        assert_eq!(center(&fb), Vec4::new(0.0, 0.0, 0.0, 1.0));

        let no_cull = RasterSettings { backface_cull: false, ..RasterSettings::default() };
        let stats = render_draw(&mut fb, &frame(), &Draw::new(&mesh, &material), &no_cull);
        assert_eq!(stats.culled, 0);
        assert!(stats.fragments_written > 0);
    }

    #[test]
    fn test_depth_test_keeps_nearest() {
        let near = triangle(1.0, Vec4::new(1.0, 0.0, 0.0, 1.0), Face::new(0, 1, 2));
        let far = triangle(-1.0, Vec4::new(0.0, 1.0, 0.0, 1.0), Face::new(0, 1, 2));
        let material = MaterialConfig::modern();
        let mut fb = cleared();
        let settings = RasterSettings::default();
        render_draw(&mut fb, &frame(), &Draw::new(&near, &material), &settings);
        render_draw(&mut fb, &frame(), &Draw::new(&far, &material), &settings);
        let c = center(&fb);
        assert!(c.x > 0.9 && c.y < 0.1);
    }

    #[test]
    fn test_painters_order_without_zbuffer() {
        let mut mesh = triangle(1.0, Vec4::new(1.0, 0.0, 0.0, 1.0), Face::new(0, 1, 2));
        let far = triangle(-1.0, Vec4::new(0.0, 1.0, 0.0, 1.0), Face::new(3, 4, 5));
        mesh.vertices.extend(far.vertices);
        mesh.faces.extend(far.faces);

        let material = MaterialConfig::modern();
        let settings = RasterSettings { use_zbuffer: false, ..RasterSettings::default() };
        let mut fb = cleared();
        render_draw(&mut fb, &frame(), &Draw::new(&mesh, &material), &settings);
        let c = center(&fb);
        assert!(c.x > 0.9 && c.y < 0.1);
    }

    #[test]
    fn test_alpha_cutout_discards() {
        let mesh = triangle(0.0, Vec4::ONE, Face::new(0, 1, 2));
        let material = MaterialConfig::modern();
        let clear = Solid(Vec4::new(1.0, 1.0, 1.0, 0.0));
        let mut fb = cleared();
        let draw = Draw::new(&mesh, &material).with_texture(&clear);
        let stats = render_draw(&mut fb, &frame(), &draw, &RasterSettings::default());
        assert_eq!(stats.fragments_written, 0);
        assert!(stats.fragments_discarded > 0);
        assert_eq!(fb.depth[(H / 2) * W + W / 2], f32::MAX);
    }

    #[test]
    fn test_behind_camera_is_clipped() {
        let mesh = triangle(5.0, Vec4::ONE, Face::new(0, 1, 2));
        let material = MaterialConfig::modern();
        let mut fb = cleared();
        let stats = render_draw(&mut fb, &frame(), &Draw::new(&mesh, &material), &RasterSettings::default());
        assert_eq!(stats.clipped, 1);
        assert_eq!(stats.fragments_written, 0);
    }

    #[test]
    fn test_bad_index_is_skipped() {
        let mesh = triangle(0.0, Vec4::ONE, Face::new(0, 1, 7));
        let material = MaterialConfig::modern();
        let mut fb = cleared();
        let stats = render_draw(&mut fb, &frame(), &Draw::new(&mesh, &material), &RasterSettings::default());
        assert_eq!(stats.triangles_in, 1);
        assert_eq!(stats.subtriangles_drawn, 0);
    }

    #[test]
    fn test_near_triangle_is_tessellated() {
        let mesh = triangle(0.0, Vec4::ONE, Face::new(0, 1, 2));
        let material = MaterialConfig::ps1();
        let mut fb = cleared();
        let stats = render_draw(&mut fb, &frame(), &Draw::new(&mesh, &material), &RasterSettings::default());
        assert!(stats.subdivided_vertices > 3);
        assert_eq!(stats.triangles_in, 1);
        assert!(stats.subtriangles_drawn > 1);
        // Dithered output stays on the 5-bit grid
        let steps = center(&fb).x * 31.0;
        assert!((steps - steps.round()).abs() < 1e-4);
    }

    #[test]
    fn test_cube_faces_the_camera() {
        let cube = create_test_cube();
        assert_eq!(cube.vertices.len(), 24);
        assert_eq!(cube.faces.len(), 12);

        let material = MaterialConfig::modern();
        let mut fb = cleared();
        let draw = Draw::new(&cube, &material).with_model(Mat4::from_scale(Vec3::splat(0.5)));
        let stats = render_draw(&mut fb, &frame(), &draw, &RasterSettings::default());
        // Only the front face survives culling head-on
        assert_eq!(stats.subtriangles_drawn, 2);
        assert!((center(&fb).truncate() - Vec3::ONE).length() < 1e-4);
    }

    #[test]
    fn test_ground_plane_faces_up() {
        let plane = create_ground_plane(10.0, 4, 0.0);
        assert_eq!(plane.vertices.len(), 25);
        assert_eq!(plane.faces.len(), 32);
        for face in &plane.faces {
            let a = plane.vertices[face.v0].pos;
            let b = plane.vertices[face.v1].pos;
            let c = plane.vertices[face.v2].pos;
            assert!((b - a).cross(c - a).y > 0.0);
        }
    }

    #[test]
    fn test_render_frame_with_sky_and_composite() {
        let mesh = triangle(0.0, Vec4::ONE, Face::new(0, 1, 2));
        let material = MaterialConfig::ps1();
        let sky = Texture::sky_gradient(16, 8, Vec3::new(0.2, 0.3, 0.8), Vec3::ONE, Vec3::splat(0.2));
        let mut fb = Framebuffer::new(W, H);
        let draws = [Draw::new(&mesh, &material)];
        let stats = render_frame(
            &mut fb,
            &frame(),
            &draws,
            Some(&sky as &dyn TextureSampler),
            &CompositeSettings::default(),
            &RasterSettings::default(),
        );
        assert!(stats.fragments_written > 0);
        assert!(fb.color.iter().all(|c| c.is_finite()));
        // Corner shows sky, not the clear color
        assert_ne!(fb.get_pixel(0, 0), Some(RasterSettings::default().clear_color));
        assert_eq!(fb.to_rgba8().len(), W * H * 4);
    }
}
