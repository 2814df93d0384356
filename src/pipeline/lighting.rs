//! Lighting accumulation stage
//!
//! Sums an additive radiance term over a bounded light list. Evaluated per
//! vertex or per fragment depending on the material's `LightingMode`; baked
//! materials skip the light list entirely.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::DrawError;

/// Fixed light list capacity
pub const LIGHT_CAPACITY: usize = 20;

/// Point lights are scaled down by this much unless configured otherwise
pub const DEFAULT_POINT_LIGHT_SCALE: f32 = 0.1;

/// A punctual light
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum Light {
    #[default]
    Disabled,
    Directional {
        direction: Vec3,
        color: Vec3,
        intensity: f32,
    },
    Point {
        position: Vec3,
        range: f32,
        color: Vec3,
        intensity: f32,
    },
    /// Declared for scene compatibility; currently contributes nothing
    Spot {
        position: Vec3,
        direction: Vec3,
        range: f32,
        color: Vec3,
        intensity: f32,
        inner_cone_angle: f32,
        outer_cone_angle: f32,
    },
}

impl Light {
    pub fn directional(direction: Vec3, color: Vec3, intensity: f32) -> Self {
        Light::Directional { direction, color, intensity }
    }

    pub fn point(position: Vec3, range: f32, color: Vec3, intensity: f32) -> Self {
        Light::Point { position, range, color, intensity }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, Light::Disabled)
    }
}

/// Light list with a fixed capacity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LightList {
    lights: Vec<Light>,
}

impl LightList {
    pub fn new() -> Self {
        Self { lights: Vec::with_capacity(LIGHT_CAPACITY) }
    }

    /// Build from a slice, dropping anything past capacity
    pub fn from_slice(lights: &[Light]) -> Self {
        if lights.len() > LIGHT_CAPACITY {
            log::warn!(
                "Light list truncated from {} to {} lights",
                lights.len(),
                LIGHT_CAPACITY
            );
        }
        Self {
            lights: lights.iter().take(LIGHT_CAPACITY).copied().collect(),
        }
    }

    pub fn push(&mut self, light: Light) -> Result<(), DrawError> {
        if self.lights.len() >= LIGHT_CAPACITY {
            return Err(DrawError::LightListFull { capacity: LIGHT_CAPACITY });
        }
        self.lights.push(light);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.lights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Light> {
        self.lights.iter()
    }

    pub fn as_slice(&self) -> &[Light] {
        &self.lights
    }
}

/// How a material gets its light
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LightingMode {
    /// Evaluate per vertex before subdivision, carry the result
    #[default]
    Vertex,
    /// Evaluate per output pixel from interpolated position and normal
    Fragment,
    /// Use the vertex color as pre-baked light, no light list
    Baked,
}

/// Scale/ambient applied to pre-baked vertex light
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BakedLight {
    pub scale: f32,
    pub ambient: f32,
}

impl Default for BakedLight {
    fn default() -> Self {
        Self { scale: 1.5, ambient: 0.05 }
    }
}

impl BakedLight {
    /// `min(scale * baked + ambient, 1)` per channel
    pub fn apply(&self, baked: Vec3) -> Vec3 {
        (baked * self.scale + Vec3::splat(self.ambient)).min(Vec3::ONE)
    }
}

/// Attenuation window for a point light: `clamp(1 - (d/r)^4, 0, 1) / d^2`
pub fn point_attenuation(dist: f32, range: f32) -> f32 {
    if dist <= 0.0 {
        return 0.0;
    }
    let ratio = dist / range;
    let window = (1.0 - ratio.powi(4)).clamp(0.0, 1.0);
    window / (dist * dist)
}

/// Contribution of a single light at a surface point
pub fn light_contribution(light: &Light, world_pos: Vec3, normal: Vec3, point_light_scale: f32) -> Vec3 {
    match *light {
        Light::Disabled => Vec3::ZERO,
        Light::Directional { direction, color, intensity } => {
            let diffuse = normal.dot(-direction.normalize_or_zero()).max(0.0);
            color * (diffuse * intensity)
        }
        Light::Point { position, range, color, intensity } => {
            let to_light = position - world_pos;
            let dist = to_light.length();
            if dist <= f32::EPSILON {
                return Vec3::ZERO;
            }
            let diffuse = normal.dot(to_light / dist).max(0.0);
            let attenuation = point_attenuation(dist, range);
            color * (diffuse * attenuation * intensity * point_light_scale)
        }
        Light::Spot { .. } => Vec3::ZERO,
    }
}

/// Sum every enabled light; never negative
pub fn accumulate(lights: &LightList, world_pos: Vec3, normal: Vec3, point_light_scale: f32) -> Vec3 {
    lights
        .iter()
        .filter(|light| light.is_enabled())
        .fold(Vec3::ZERO, |acc, light| {
            acc + light_contribution(light, world_pos, normal, point_light_scale)
        })
        .max(Vec3::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directional_scenario() {
        let lights = LightList::from_slice(&[Light::directional(Vec3::new(0.0, -1.0, 0.0), Vec3::ONE, 1.0)]);
        let radiance = accumulate(&lights, Vec3::ZERO, Vec3::Y, DEFAULT_POINT_LIGHT_SCALE);
        assert!((radiance - Vec3::ONE).length() < 1e-6);
    }

    #[test]
    fn test_directional_facing_away_is_zero() {
        let light = Light::directional(Vec3::new(0.0, -1.0, 0.0), Vec3::ONE, 3.0);
        let lights = LightList::from_slice(&[light]);
        for normal in [Vec3::NEG_Y, Vec3::X, Vec3::new(0.3, -0.9, 0.1).normalize()] {
            assert_eq!(accumulate(&lights, Vec3::ZERO, normal, 0.1), Vec3::ZERO);
        }
    }

    #[test]
    fn test_point_light_scenario() {
        let light = Light::point(Vec3::ZERO, 10.0, Vec3::new(1.0, 0.0, 0.0), 1.0);
        let lights = LightList::from_slice(&[light]);
        let pos = Vec3::new(5.0, 0.0, 0.0);
        let radiance = accumulate(&lights, pos, Vec3::NEG_X, DEFAULT_POINT_LIGHT_SCALE);
        let attenuation = (1.0 - 0.5f32.powi(4)) / 25.0;
        assert!((point_attenuation(5.0, 10.0) - 0.0375).abs() < 1e-6);
        assert!((radiance.x - 0.1 * attenuation).abs() < 1e-7);
        assert_eq!(radiance.y, 0.0);
        assert_eq!(radiance.z, 0.0);
    }

    #[test]
    fn test_point_light_beyond_range() {
        for d in [10.0, 12.0, 100.0] {
            assert!(point_attenuation(d, 10.0) <= 0.0);
        }
        let light = Light::point(Vec3::ZERO, 10.0, Vec3::ONE, 5.0);
        let lights = LightList::from_slice(&[light]);
        let radiance = accumulate(&lights, Vec3::new(0.0, 0.0, 15.0), Vec3::NEG_Z, 0.1);
        assert_eq!(radiance, Vec3::ZERO);
    }

    #[test]
    fn test_point_light_at_surface_is_finite() {
        let light = Light::point(Vec3::ONE, 10.0, Vec3::ONE, 1.0);
        let c = light_contribution(&light, Vec3::ONE, Vec3::Y, 0.1);
        assert_eq!(c, Vec3::ZERO);
    }

    #[test]
    fn test_disabled_and_spot_are_inert() {
        let spot = Light::Spot {
            position: Vec3::new(0.0, 1.0, 0.0),
            direction: Vec3::NEG_Y,
            range: 10.0,
            color: Vec3::ONE,
            intensity: 10.0,
            inner_cone_angle: 0.1,
            outer_cone_angle: 0.5,
        };
        let lights = LightList::from_slice(&[Light::Disabled, spot]);
        assert_eq!(accumulate(&lights, Vec3::ZERO, Vec3::Y, 0.1), Vec3::ZERO);
    }

    #[test]
    fn test_lights_add_up() {
        let a = Light::directional(Vec3::NEG_Y, Vec3::new(0.2, 0.0, 0.0), 1.0);
        let b = Light::directional(Vec3::NEG_Y, Vec3::new(0.0, 0.3, 0.0), 2.0);
        let lights = LightList::from_slice(&[a, b]);
        let r = accumulate(&lights, Vec3::ZERO, Vec3::Y, 0.1);
        assert!((r - Vec3::new(0.2, 0.6, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_light_list_capacity() {
        let mut list = LightList::new();
        for _ in 0..LIGHT_CAPACITY {
            assert!(list.push(Light::Disabled).is_ok());
        }
        assert_eq!(
            list.push(Light::Disabled),
            Err(DrawError::LightListFull { capacity: LIGHT_CAPACITY })
        );
        let truncated = LightList::from_slice(&[Light::Disabled; 25]);
        assert_eq!(truncated.len(), LIGHT_CAPACITY);
    }

    #[test]
    fn test_baked_bypass() {
        let baked = BakedLight::default();
        let out = baked.apply(Vec3::new(0.0, 0.5, 1.0));
        assert!((out - Vec3::new(0.05, 0.8, 1.0)).length() < 1e-6);
    }
}
