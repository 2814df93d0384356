//! Projection & snap stage
//!
//! Takes a model-space vertex through world, eye and clip space, with
//! optional skeletal blending and clip-space snap-to-grid (the PS1 vertex
//! wobble from fixed-point transforms).

use glam::{Mat3, Mat4, Vec2, Vec3, Vec4, Vec4Swizzles};

use crate::rasterizer::Vertex;

/// Below this |w| the NDC divide is meaningless and snapping is skipped
pub const SNAP_W_EPSILON: f32 = 1e-6;

/// Per-draw matrices. Consumed, never mutated, by the stages.
#[derive(Debug, Clone, Copy)]
pub struct TransformSet {
    pub model: Mat4,
    pub view: Mat4,
    pub projection: Mat4,
    /// Inverse-transpose of the model's upper 3x3
    pub normal_matrix: Mat3,
}

impl TransformSet {
    pub fn new(model: Mat4, view: Mat4, projection: Mat4) -> Self {
        Self {
            model,
            view,
            projection,
            normal_matrix: normal_matrix(&model),
        }
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }
}

impl Default for TransformSet {
    fn default() -> Self {
        Self::new(Mat4::IDENTITY, Mat4::IDENTITY, Mat4::IDENTITY)
    }
}

/// Inverse-transpose of the upper 3x3, falling back to the plain 3x3 when singular
pub fn normal_matrix(m: &Mat4) -> Mat3 {
    let upper = Mat3::from_mat4(*m);
    if upper.determinant().abs() <= f32::EPSILON {
        return upper;
    }
    upper.inverse().transpose()
}

/// Joint matrices for one skinned draw
#[derive(Debug, Clone, Default)]
pub struct Skin {
    pub joint_matrices: Vec<Mat4>,
}

impl Skin {
    pub fn new(joint_matrices: Vec<Mat4>) -> Self {
        Self { joint_matrices }
    }

    /// Build joint matrices as `joint_world * inverse_bind`.
    /// Joints without an inverse bind matrix use identity.
    pub fn from_joints(world_transforms: &[Mat4], inverse_bind_matrices: &[Mat4]) -> Self {
        let joint_matrices = world_transforms
            .iter()
            .enumerate()
            .map(|(i, world)| {
                let inverse_bind = inverse_bind_matrices.get(i).copied().unwrap_or(Mat4::IDENTITY);
                *world * inverse_bind
            })
            .collect();
        Self { joint_matrices }
    }

    /// Weighted sum of the vertex's joint matrices.
    /// Returns `None` when every weight is zero (caller keeps the model matrix).
    /// Influences naming a joint past the end of the list are dropped.
    pub fn blend(&self, joints: [u16; 4], weights: [f32; 4]) -> Option<Mat4> {
        if weights.iter().all(|w| *w == 0.0) {
            return None;
        }
        let acc = joints
            .iter()
            .zip(weights)
            .filter(|(_, w)| *w != 0.0)
            .filter_map(|(&j, w)| self.joint_matrices.get(j as usize).map(|m| *m * w))
            .fold(Mat4::ZERO, |acc, m| acc + m);
        Some(acc)
    }
}

/// Output of the projection stage, and the attribute set carried through
/// subdivision and rasterization.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProjectedVertex {
    pub world_pos: Vec3,
    pub eye_pos: Vec3,
    pub clip_pos: Vec4,
    /// World-space, unit length (or zero for a degenerate input normal)
    pub normal: Vec3,
    pub uv: Vec2,
    pub color: Vec4,
    /// Light evaluated per vertex (vertex and baked lighting modes)
    pub light: Vec3,
}

impl ProjectedVertex {
    /// Eye-space distance, used by tessellation and fog
    pub fn eye_distance(&self) -> f32 {
        self.eye_pos.length()
    }

    /// Barycentric linear blend of every attribute, clip position included.
    /// Not perspective-corrected: that is the affine look being emulated.
    pub fn blend(a: &Self, b: &Self, c: &Self, coord: Vec3) -> Self {
        Self {
            world_pos: a.world_pos * coord.x + b.world_pos * coord.y + c.world_pos * coord.z,
            eye_pos: a.eye_pos * coord.x + b.eye_pos * coord.y + c.eye_pos * coord.z,
            clip_pos: a.clip_pos * coord.x + b.clip_pos * coord.y + c.clip_pos * coord.z,
            normal: a.normal * coord.x + b.normal * coord.y + c.normal * coord.z,
            uv: a.uv * coord.x + b.uv * coord.y + c.uv * coord.z,
            color: a.color * coord.x + b.color * coord.y + c.color * coord.z,
            light: a.light * coord.x + b.light * coord.y + c.light * coord.z,
        }
    }
}

/// Snap a clip position's x/y to a grid in NDC: `floor(grid * ndc) / grid`, then back to clip.
/// z and w pass through. Snapping is bypassed when |w| is near zero.
pub fn snap_to_grid(clip: Vec4, grid: Vec2) -> Vec4 {
    if clip.w.abs() <= SNAP_W_EPSILON || grid.x <= 0.0 || grid.y <= 0.0 {
        return clip;
    }
    let ndc = clip.xy() / clip.w;
    let snapped = (grid * ndc).floor() / grid;
    Vec4::new(snapped.x * clip.w, snapped.y * clip.w, clip.z, clip.w)
}

/// Snap grid that lands vertices on whole-pixel edges for a render target of `resolution`
pub fn pixel_snap_grid(resolution: Vec2) -> Vec2 {
    resolution * 0.5
}

/// Run one vertex through the projection stage.
///
/// `skin` selects the skinned path; `snap_grid` enables grid snapping.
pub fn project_vertex(
    vertex: &Vertex,
    transforms: &TransformSet,
    skin: Option<&Skin>,
    snap_grid: Option<Vec2>,
) -> ProjectedVertex {
    let skinned = match (skin, vertex.skin) {
        (Some(skin), Some(weights)) => skin.blend(weights.joints, weights.weights),
        _ => None,
    };

    let (model, normal_mat) = match skinned {
        Some(skin_matrix) => (skin_matrix, normal_matrix(&skin_matrix)),
        None => (transforms.model, transforms.normal_matrix),
    };

    let world = model * vertex.pos.extend(1.0);
    let eye = transforms.view * world;
    let mut clip = transforms.projection * eye;

    if let Some(grid) = snap_grid {
        clip = snap_to_grid(clip, grid);
    }

    ProjectedVertex {
        world_pos: world.xyz(),
        eye_pos: eye.xyz(),
        clip_pos: clip,
        normal: (normal_mat * vertex.normal).normalize_or_zero(),
        uv: vertex.uv,
        color: vertex.color,
        light: Vec3::ZERO,
    }
}

/// Billboard model matrix: the view rotation inverted (transposed, with the
/// view translation dropped) placed at the model's translation.
pub fn billboard_matrix(view: &Mat4, model: &Mat4) -> Mat4 {
    let mut m = view.transpose();
    m.x_axis.w = 0.0;
    m.y_axis.w = 0.0;
    m.z_axis.w = 0.0;
    m.w_axis = Vec4::new(model.w_axis.x, model.w_axis.y, model.w_axis.z, 1.0);
    m
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rasterizer::SkinWeights;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-4
    }

    #[test]
    fn test_snap_grid_scenario() {
        let snapped = snap_to_grid(Vec4::new(0.3, 0.7, 0.2, 1.0), Vec2::new(4.0, 4.0));
        assert!((snapped.x - 0.25).abs() < 1e-6);
        assert!((snapped.y - 0.5).abs() < 1e-6);
        assert_eq!(snapped.z, 0.2);
        assert_eq!(snapped.w, 1.0);
    }

    #[test]
    fn test_snap_rescales_by_w() {
        let snapped = snap_to_grid(Vec4::new(0.6, 1.4, 0.5, 2.0), Vec2::new(4.0, 4.0));
        assert!((snapped.x - 0.5).abs() < 1e-6);
        assert!((snapped.y - 1.0).abs() < 1e-6);
        assert_eq!(snapped.w, 2.0);
    }

    #[test]
    fn test_snap_bypassed_at_zero_w() {
        let clip = Vec4::new(0.3, 0.7, 0.1, 0.0);
        assert_eq!(snap_to_grid(clip, Vec2::new(4.0, 4.0)), clip);
        let tiny = Vec4::new(0.3, 0.7, 0.1, 1e-9);
        assert_eq!(snap_to_grid(tiny, Vec2::new(4.0, 4.0)), tiny);
    }

    #[test]
    fn test_normal_renormalized_under_scale() {
        let model = Mat4::from_scale(Vec3::new(4.0, 1.0, 1.0));
        let transforms = TransformSet::new(model, Mat4::IDENTITY, Mat4::IDENTITY);
        let mut v = Vertex::default();
        v.normal = Vec3::new(1.0, 1.0, 0.0).normalize();
        let p = project_vertex(&v, &transforms, None, None);
        assert!((p.normal.length() - 1.0).abs() < 1e-5);
        // Inverse-transpose shrinks the scaled axis
        assert!(p.normal.x < p.normal.y);
    }

    #[test]
    fn test_project_spaces() {
        let model = Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0));
        let view = Mat4::from_translation(Vec3::new(0.0, 0.0, -5.0));
        let transforms = TransformSet::new(model, view, Mat4::IDENTITY);
        let v = Vertex::default();
        let p = project_vertex(&v, &transforms, None, None);
        assert!(approx(p.world_pos, Vec3::new(1.0, 0.0, 0.0)));
        assert!(approx(p.eye_pos, Vec3::new(1.0, 0.0, -5.0)));
        assert!((p.eye_distance() - 26.0f32.sqrt()).abs() < 1e-5);
    }

    #[test]
    fn test_zero_weights_use_model_matrix() {
        let model = Mat4::from_translation(Vec3::new(0.0, 2.0, 0.0));
        let transforms = TransformSet::new(model, Mat4::IDENTITY, Mat4::IDENTITY);
        let skin = Skin::new(vec![Mat4::from_translation(Vec3::new(9.0, 0.0, 0.0))]);
        let mut v = Vertex::default();
        v.skin = Some(SkinWeights { joints: [0; 4], weights: [0.0; 4] });
        let p = project_vertex(&v, &transforms, Some(&skin), None);
        assert!(approx(p.world_pos, Vec3::new(0.0, 2.0, 0.0)));
    }

    #[test]
    fn test_pixel_grid_lands_on_pixel_edges() {
        let grid = pixel_snap_grid(Vec2::new(320.0, 240.0));
        for x in [-0.731, -0.2, 0.013, 0.4999, 0.87] {
            let clip = snap_to_grid(Vec4::new(x * 2.5, 0.33 * 2.5, 0.5, 2.5), grid);
            let screen = crate::rasterizer::clip_to_screen(clip, 320, 240);
            assert!((screen.x - screen.x.round()).abs() < 1e-3, "x = {}", screen.x);
            assert!((screen.y - screen.y.round()).abs() < 1e-3, "y = {}", screen.y);
        }
    }

    #[test]
    fn test_weights_without_skin_use_model_matrix() {
        let model = Mat4::from_translation(Vec3::new(0.0, 1.0, 0.0));
        let transforms = TransformSet::new(model, Mat4::IDENTITY, Mat4::IDENTITY);
        let mut v = Vertex::default();
        v.normal = Vec3::Y;
        v.skin = Some(SkinWeights { joints: [0, 1, 0, 0], weights: [0.7, 0.3, 0.0, 0.0] });
        let p = project_vertex(&v, &transforms, None, None);
        assert!(approx(p.world_pos, Vec3::new(0.0, 1.0, 0.0)));
        assert!(approx(p.normal, Vec3::Y));
    }

    #[test]
    fn test_skin_blend_replaces_model() {
        let model = Mat4::from_translation(Vec3::new(0.0, 100.0, 0.0));
        let transforms = TransformSet::new(model, Mat4::IDENTITY, Mat4::IDENTITY);
        let skin = Skin::new(vec![
            Mat4::from_translation(Vec3::new(2.0, 0.0, 0.0)),
            Mat4::from_translation(Vec3::new(0.0, 0.0, 4.0)),
        ]);
        let mut v = Vertex::default();
        v.skin = Some(SkinWeights { joints: [0, 1, 0, 0], weights: [0.5, 0.5, 0.0, 0.0] });
        let p = project_vertex(&v, &transforms, Some(&skin), None);
        assert!(approx(p.world_pos, Vec3::new(1.0, 0.0, 2.0)));
    }

    #[test]
    fn test_skin_ignores_missing_joint() {
        let skin = Skin::new(vec![Mat4::from_translation(Vec3::X)]);
        let m = skin.blend([0, 7, 0, 0], [1.0, 0.5, 0.0, 0.0]).unwrap();
        assert!(m.abs_diff_eq(Mat4::from_translation(Vec3::X), 1e-6));
    }

    #[test]
    fn test_skin_from_joints() {
        let world = [Mat4::from_translation(Vec3::X), Mat4::from_translation(Vec3::Y)];
        let inverse_bind = [Mat4::from_translation(-Vec3::X)];
        let skin = Skin::from_joints(&world, &inverse_bind);
        assert_eq!(skin.joint_matrices.len(), 2);
        assert!(skin.joint_matrices[0].abs_diff_eq(Mat4::IDENTITY, 1e-6));
        assert!(skin.joint_matrices[1].abs_diff_eq(Mat4::from_translation(Vec3::Y), 1e-6));
    }

    #[test]
    fn test_billboard_faces_camera() {
        let view = Mat4::from_rotation_y(0.7) * Mat4::from_translation(Vec3::new(3.0, 1.0, 2.0));
        let model = Mat4::from_translation(Vec3::new(5.0, 6.0, 7.0));
        let bb = billboard_matrix(&view, &model);
        assert!(approx(bb.w_axis.truncate(), Vec3::new(5.0, 6.0, 7.0)));
        // Rotation part cancels the view rotation
        let combined = Mat3::from_mat4(view) * Mat3::from_mat4(bb);
        assert!(combined.abs_diff_eq(Mat3::IDENTITY, 1e-5));
    }
}
