//! Fixed studio lighting

use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4};

/// Number of directional lights the shader reads.
pub const MAX_DIRECTIONAL_LIGHTS: usize = 3;

/// Directional light shining from `position` towards `target`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    pub position: Vec3,
    pub target: Vec3,
    pub color: Vec3,
    pub intensity: f32,
}

impl DirectionalLight {
    pub fn new(position: Vec3, color: Vec3, intensity: f32) -> Self {
        Self {
            position,
            target: Vec3::ZERO,
            color,
            intensity,
        }
    }

    /// Direction the light travels in.
    pub fn direction(&self) -> Vec3 {
        (self.target - self.position).normalize_or_zero()
    }
}

/// Ambient term plus the directional lights of the preview stage
#[derive(Debug, Clone, PartialEq)]
pub struct Lighting {
    pub ambient: Vec3,
    pub directional: Vec<DirectionalLight>,
    /// Strength of the neutral room environment used for reflections.
    pub environment_intensity: f32,
}

impl Default for Lighting {
    fn default() -> Self {
        Self::studio()
    }
}

impl Lighting {
    /// Black ambient and three white key lights of intensity 3.
    pub fn studio() -> Self {
        Self {
            ambient: Vec3::ZERO,
            directional: vec![
                DirectionalLight::new(Vec3::new(0.0, 200.0, 0.0), Vec3::ONE, 3.0),
                DirectionalLight::new(Vec3::new(100.0, 200.0, 100.0), Vec3::ONE, 3.0),
                DirectionalLight::new(Vec3::new(-100.0, -200.0, -100.0), Vec3::ONE, 3.0),
            ],
            environment_intensity: 1.0,
        }
    }

    /// Pack lights for the shader. Lights past the shader limit are dropped.
    pub fn uniform_data(&self) -> LightingUniformData {
        let mut directional = [GpuDirectionalLight::zeroed(); MAX_DIRECTIONAL_LIGHTS];
        for (gpu, light) in directional.iter_mut().zip(&self.directional) {
            *gpu = GpuDirectionalLight {
                direction: light.direction().extend(0.0),
                color: light.color.extend(light.intensity),
            };
        }

        LightingUniformData {
            ambient: self.ambient.extend(self.environment_intensity),
            directional,
            counts: [self.directional.len().min(MAX_DIRECTIONAL_LIGHTS) as u32, 0, 0, 0],
        }
    }
}

/// GPU-compatible directional light
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct GpuDirectionalLight {
    pub direction: Vec4, // xyz=direction light travels
    pub color: Vec4,     // rgb=color, a=intensity
}

/// Lighting uniform data for GPU
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct LightingUniformData {
    pub ambient: Vec4, // rgb=ambient, a=environment intensity
    pub directional: [GpuDirectionalLight; MAX_DIRECTIONAL_LIGHTS],
    pub counts: [u32; 4],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_studio_rig() {
        let lighting = Lighting::studio();
        assert_eq!(lighting.ambient, Vec3::ZERO);
        assert_eq!(lighting.directional.len(), 3);
        assert!(lighting.directional.iter().all(|l| l.intensity == 3.0 && l.color == Vec3::ONE));
        assert_eq!(lighting.directional[0].direction(), -Vec3::Y);
    }

    #[test]
    fn test_uniform_packing() {
        let data = Lighting::studio().uniform_data();
        assert_eq!(data.counts[0], 3);
        assert_eq!(data.directional[1].color.w, 3.0);
        let d = data.directional[2].direction.truncate();
        assert!((d - Vec3::new(100.0, 200.0, 100.0).normalize()).length() < 1e-6);
    }
}
