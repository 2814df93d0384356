//! Per-material retro feature toggles
//!
//! One parameterized pipeline covers every variant; a material just picks
//! which stages run and with what settings.

use glam::{Vec2, Vec4};
use serde::{Deserialize, Serialize};

use super::lighting::LightingMode;
use super::projection::pixel_snap_grid;
use super::tessellation::TessellationParams;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialConfig {
    /// Snap clip-space x/y to a grid (vertex wobble)
    pub snap: bool,
    /// Snap grid in NDC units; `None` uses one step per pixel
    pub snap_grid: Option<Vec2>,
    /// Distance-based subdivision; `None` disables it
    pub tessellation: Option<TessellationParams>,
    pub lighting: LightingMode,
    pub dither: bool,
    pub fog: bool,
    /// Base color factor, multiplied with the texture sample
    pub base_color: Vec4,
}

impl Default for MaterialConfig {
    fn default() -> Self {
        Self::ps1()
    }
}

impl MaterialConfig {
    /// Every retro feature on
    pub fn ps1() -> Self {
        Self {
            snap: true,
            snap_grid: None,
            tessellation: Some(TessellationParams::default()),
            lighting: LightingMode::Vertex,
            dither: true,
            fog: true,
            base_color: Vec4::ONE,
        }
    }

    /// Retro look with offline-baked vertex light
    pub fn baked() -> Self {
        Self {
            lighting: LightingMode::Baked,
            ..Self::ps1()
        }
    }

    /// Plain modern path: no snap, no subdivision, per-pixel light, no dither
    pub fn modern() -> Self {
        Self {
            snap: false,
            snap_grid: None,
            tessellation: None,
            lighting: LightingMode::Fragment,
            dither: false,
            fog: true,
            base_color: Vec4::ONE,
        }
    }

    pub fn with_base_color(mut self, base_color: Vec4) -> Self {
        self.base_color = base_color;
        self
    }

    /// Grid handed to the snap stage, if snapping is on
    pub fn snap_grid_for(&self, resolution: Vec2) -> Option<Vec2> {
        if !self.snap {
            return None;
        }
        Some(self.snap_grid.unwrap_or_else(|| pixel_snap_grid(resolution)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snap_grid_resolution() {
        let res = Vec2::new(320.0, 240.0);
        assert_eq!(MaterialConfig::ps1().snap_grid_for(res), Some(Vec2::new(160.0, 120.0)));
        assert_eq!(MaterialConfig::modern().snap_grid_for(res), None);

        let custom = MaterialConfig { snap_grid: Some(Vec2::new(4.0, 4.0)), ..MaterialConfig::ps1() };
        assert_eq!(custom.snap_grid_for(res), Some(Vec2::new(4.0, 4.0)));
    }

    #[test]
    fn test_presets() {
        assert_eq!(MaterialConfig::baked().lighting, LightingMode::Baked);
        assert!(MaterialConfig::baked().dither);
        assert!(MaterialConfig::modern().tessellation.is_none());
    }
}
