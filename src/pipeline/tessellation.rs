//! Adaptive subdivision stage
//!
//! Picks a tessellation level per triangle from eye-space distance and
//! builds a uniform barycentric lattice of interpolated vertices. Nearby
//! triangles get finer patches, which hides affine texture swim up close.
//!
//! The same level drives all three edges and the interior. Neighbouring
//! triangles at different levels can crack along shared edges; that matches
//! the hardware-tessellated original and is left as is.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::projection::ProjectedVertex;

/// Highest segment count a patch edge may be split into
pub const MAX_SEGMENTS: u32 = 64;

/// Per-material tessellation settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TessellationParams {
    /// Level at and beyond `falloff_end`
    pub min_level: f32,
    /// Level at eye distance 0
    pub max_level: f32,
    /// Eye distance where the level bottoms out
    pub falloff_end: f32,
}

impl Default for TessellationParams {
    fn default() -> Self {
        Self {
            min_level: 1.0,
            max_level: 8.0,
            falloff_end: 15.0,
        }
    }
}

impl TessellationParams {
    /// `min + (1 - clamp(d, 0, end) / end) * (max - min)`
    pub fn level(&self, eye_dist: f32) -> f32 {
        if !(self.falloff_end > 0.0) {
            return self.min_level;
        }
        let d = eye_dist.clamp(0.0, self.falloff_end);
        self.min_level + (1.0 - d / self.falloff_end) * (self.max_level - self.min_level)
    }
}

/// Round a fractional level up to a whole segment count in [1, MAX_SEGMENTS]
pub fn segment_count(level: f32) -> u32 {
    if !level.is_finite() {
        return 1;
    }
    (level.ceil() as i64).clamp(1, MAX_SEGMENTS as i64) as u32
}

/// A subdivided triangle, alive only while one source primitive is rasterized
#[derive(Debug, Clone, Default)]
pub struct Patch {
    pub vertices: Vec<ProjectedVertex>,
    pub triangles: Vec<[usize; 3]>,
}

impl Patch {
    /// The source triangle, untouched
    pub fn passthrough(tri: [ProjectedVertex; 3]) -> Self {
        Self {
            vertices: tri.to_vec(),
            triangles: vec![[0, 1, 2]],
        }
    }

    pub fn triangle(&self, i: usize) -> [&ProjectedVertex; 3] {
        let [a, b, c] = self.triangles[i];
        [&self.vertices[a], &self.vertices[b], &self.vertices[c]]
    }
}

/// Barycentric coordinates of the lattice, row by row from vertex 0.
/// Row `i` holds `i + 1` points; the corners come out exactly as
/// (1,0,0), (0,1,0) and (0,0,1).
fn lattice_coords(n: u32) -> Vec<Vec3> {
    let nf = n as f32;
    let mut coords = Vec::with_capacity(((n + 1) * (n + 2) / 2) as usize);
    for i in 0..=n {
        for j in 0..=i {
            let b = (i - j) as f32 / nf;
            let c = j as f32 / nf;
            let a = (n - i) as f32 / nf;
            coords.push(Vec3::new(a, b, c));
        }
    }
    coords
}

fn row_start(i: u32) -> usize {
    (i * (i + 1) / 2) as usize
}

/// Subdivide a triangle into `n * n` sub-triangles, winding preserved
pub fn subdivide(tri: [ProjectedVertex; 3], n: u32) -> Patch {
    let n = n.clamp(1, MAX_SEGMENTS);
    if n == 1 {
        return Patch::passthrough(tri);
    }

    let [a, b, c] = &tri;
    let vertices: Vec<ProjectedVertex> = lattice_coords(n)
        .into_iter()
        .map(|coord| ProjectedVertex::blend(a, b, c, coord))
        .collect();

    let mut triangles = Vec::with_capacity((n * n) as usize);
    for i in 0..n {
        let top = row_start(i);
        let bottom = row_start(i + 1);
        for j in 0..=i as usize {
            triangles.push([top + j, bottom + j, bottom + j + 1]);
            if j < i as usize {
                triangles.push([top + j, bottom + j + 1, top + j + 1]);
            }
        }
    }

    Patch { vertices, triangles }
}

/// Full stage: level from the first (controlling) vertex, or a pass-through
/// when the material does not tessellate.
pub fn tessellate(tri: [ProjectedVertex; 3], params: Option<&TessellationParams>) -> Patch {
    match params {
        Some(params) => {
            let level = params.level(tri[0].eye_distance());
            subdivide(tri, segment_count(level))
        }
        None => Patch::passthrough(tri),
    }
}
