//! Object transforms

use bytemuck::{Pod, Zeroable};
use glam::{EulerRot, Mat4, Quat, Vec3};

/// Position, rotation and scale of a preview object
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Replace the rotation with XYZ euler angles (radians), applied X first.
    pub fn set_euler(&mut self, euler: Vec3) {
        self.rotation = Quat::from_euler(EulerRot::XYZ, euler.x, euler.y, euler.z);
    }

    pub fn euler(&self) -> Vec3 {
        let (x, y, z) = self.rotation.to_euler(EulerRot::XYZ);
        Vec3::new(x, y, z)
    }

    /// Get the model matrix for this transform
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Transform a point into world space
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.matrix().transform_point3(point)
    }

    /// Transform a normal into world space
    pub fn transform_normal(&self, normal: Vec3) -> Vec3 {
        self.matrix()
            .inverse()
            .transpose()
            .transform_vector3(normal)
            .normalize_or_zero()
    }

    /// Build uniform data for shaders
    pub fn uniform_data(&self) -> TransformUniformData {
        let model = self.matrix();
        TransformUniformData {
            model,
            normal_matrix: model.inverse().transpose(),
        }
    }
}

/// Transform uniform data for GPU
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct TransformUniformData {
    pub model: Mat4,
    pub normal_matrix: Mat4,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_euler_round_trip() {
        let mut t = Transform::default();
        t.set_euler(Vec3::new(-0.3, 0.2, 0.0));
        let e = t.euler();
        assert!((e.x + 0.3).abs() < 1e-5);
        assert!((e.y - 0.2).abs() < 1e-5);
        assert!(e.z.abs() < 1e-5);
    }

    #[test]
    fn test_translation_applies_after_rotation() {
        let mut t = Transform::from_position(Vec3::new(-35.0, 0.0, 0.0));
        t.set_euler(Vec3::new(0.0, std::f32::consts::FRAC_PI_2, 0.0));
        let p = t.transform_point(Vec3::X);
        assert!((p - Vec3::new(-35.0, 0.0, -1.0)).length() < 1e-5);
        let n = t.transform_normal(Vec3::X);
        assert!((n - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-5);
    }
}
