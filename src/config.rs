//! Render configuration
//!
//! Uses RON format for human-readable config files.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use glam::{Mat4, UVec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::pipeline::composite::CompositeSettings;
use crate::pipeline::dither::DitherSettings;
use crate::pipeline::fog::FogParams;
use crate::pipeline::fragment::FrameParams;
use crate::pipeline::lighting::{BakedLight, Light, LightList, DEFAULT_POINT_LIGHT_SCALE};
use crate::pipeline::material::MaterialConfig;
use crate::rasterizer::{RasterSettings, FAR_CLIP, FOV_DEGREES, HEIGHT, NEAR_CLIP, WIDTH};

/// Frame-wide settings plus named materials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub resolution: UVec2,
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub fog: FogParams,
    pub point_light_scale: f32,
    pub baked: BakedLight,
    pub dither: DitherSettings,
    pub composite: CompositeSettings,
    pub raster: RasterSettings,
    pub lights: Vec<Light>,
    pub materials: BTreeMap<String, MaterialConfig>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        let mut materials = BTreeMap::new();
        materials.insert("ps1".to_string(), MaterialConfig::ps1());
        materials.insert("baked".to_string(), MaterialConfig::baked());
        materials.insert("modern".to_string(), MaterialConfig::modern());

        Self {
            resolution: UVec2::new(WIDTH as u32, HEIGHT as u32),
            fov_degrees: FOV_DEGREES,
            near: NEAR_CLIP,
            far: FAR_CLIP,
            fog: FogParams::default(),
            point_light_scale: DEFAULT_POINT_LIGHT_SCALE,
            baked: BakedLight::default(),
            dither: DitherSettings::default(),
            composite: CompositeSettings::default(),
            raster: RasterSettings::default(),
            lights: vec![
                Light::directional(Vec3::new(-0.4, -1.0, -0.6), Vec3::new(1.0, 0.95, 0.85), 0.9),
                Light::point(Vec3::new(2.0, 1.5, 2.0), 8.0, Vec3::new(1.0, 0.5, 0.2), 40.0),
            ],
            materials,
        }
    }
}

impl RenderConfig {
    pub fn aspect(&self) -> f32 {
        if self.resolution.y == 0 {
            return 1.0;
        }
        self.resolution.x as f32 / self.resolution.y as f32
    }

    /// OpenGL-style perspective projection from the configured FOV and clip planes
    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov_degrees.to_radians(), self.aspect(), self.near, self.far)
    }

    /// Look up a material by name, falling back to the PS1 preset
    pub fn material(&self, name: &str) -> MaterialConfig {
        self.materials.get(name).copied().unwrap_or_else(|| {
            log::warn!("Unknown material '{}', using ps1 preset", name);
            MaterialConfig::ps1()
        })
    }

    /// Per-frame inputs for a given view
    pub fn frame_params(&self, view: Mat4) -> FrameParams {
        FrameParams {
            view,
            projection: self.projection(),
            lights: LightList::from_slice(&self.lights),
            fog: self.fog,
            resolution: self.resolution,
            point_light_scale: self.point_light_scale,
            baked: self.baked,
            dither: self.dither,
        }
    }

    fn validate(&self) {
        if !self.fog.is_valid() {
            log::warn!(
                "Fog range near={} far={} is unusable, fog will be disabled",
                self.fog.near,
                self.fog.far
            );
        }
        if self.resolution.x == 0 || self.resolution.y == 0 {
            log::warn!("Render resolution {}x{} is empty", self.resolution.x, self.resolution.y);
        }
    }
}

/// Load a render config from a RON file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<RenderConfig, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let config = load_config_from_str(&contents)?;
    log::info!("Loaded render config from {}", path.display());
    Ok(config)
}

/// Save a render config to a RON file
pub fn save_config<P: AsRef<Path>>(config: &RenderConfig, path: P) -> Result<(), ConfigError> {
    let path = path.as_ref();
    let pretty = ron::ser::PrettyConfig::new()
        .depth_limit(4)
        .indentor("  ".to_string());

    let contents = ron::ser::to_string_pretty(config, pretty)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)?;
    log::info!("Saved render config to {}", path.display());
    Ok(())
}

/// Load a render config from a RON string
pub fn load_config_from_str(s: &str) -> Result<RenderConfig, ConfigError> {
    let config: RenderConfig = ron::from_str(s)?;
    config.validate();
    Ok(config)
}
