//! Atmospheric compositing stage: linear distance fog

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::color::saturate_rgb;
use crate::rasterizer::{FOG_END, FOG_START};

/// Linear fog between two eye distances
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FogParams {
    pub color: Vec3,
    pub near: f32,
    pub far: f32,
}

impl Default for FogParams {
    fn default() -> Self {
        Self {
            color: Vec3::ZERO,
            near: FOG_START,
            far: FOG_END,
        }
    }
}

impl FogParams {
    /// A usable range needs `far > 0` and `far > near`
    pub fn is_valid(&self) -> bool {
        self.far > 0.0 && self.far > self.near
    }

    /// 0 = clear, 1 = fully fogged. An invalid range means no fog at all.
    pub fn factor(&self, dist: f32) -> f32 {
        if !self.is_valid() {
            return 0.0;
        }
        let f = ((dist - self.near) / (self.far - self.near)).clamp(0.0, 1.0);
        if f.is_nan() {
            0.0
        } else {
            f
        }
    }

    /// Blend toward the fog color and clamp to [0, 1]
    pub fn apply(&self, lit: Vec3, dist: f32) -> Vec3 {
        let f = self.factor(dist);
        saturate_rgb(lit * (1.0 - f) + self.color * f)
    }
}
