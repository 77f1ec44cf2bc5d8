//! Orbit camera controls
//!
//! Left drag orbits around the target, right drag pans, the wheel zooms.
//! With damping enabled, input accumulates into a velocity that decays by
//! `damping_factor` every update, so the camera keeps gliding briefly after
//! the mouse stops.

use glam::{Vec2, Vec3};
use std::f32::consts::{PI, TAU};

use super::Camera;

/// Pointer input gathered since the last update
#[derive(Debug, Clone, Default)]
pub struct CameraInput {
    /// Pixel delta while the orbit button is held
    pub rotate_delta: Vec2,
    /// Pixel delta while the pan button is held
    pub pan_delta: Vec2,
    /// Mouse scroll delta (positive = scroll up)
    pub scroll_delta: f32,
}

impl CameraInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_idle(&self) -> bool {
        self.rotate_delta == Vec2::ZERO && self.pan_delta == Vec2::ZERO && self.scroll_delta == 0.0
    }

    /// Reset per-frame deltas (call after update)
    pub fn reset_deltas(&mut self) {
        *self = Self::default();
    }
}

/// Orbit camera controller
pub struct OrbitController {
    /// Target point to orbit around
    pub target: Vec3,
    /// Distance from target
    pub distance: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Angle around the Y axis, zero looking down -Z
    pub azimuth: f32,
    /// Angle from the +Y axis
    pub polar: f32,
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub enable_pan: bool,
    pub rotate_speed: f32,
    /// Distance multiplier per scroll unit
    pub zoom_factor: f32,
    pub pan_speed: f32,

    azimuth_delta: f32,
    polar_delta: f32,
    pan_offset: Vec3,
}

impl Default for OrbitController {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            distance: 60.0,
            min_distance: 1.0,
            max_distance: 190.0,
            azimuth: 0.0,
            polar: PI / 2.0,
            enable_damping: true,
            damping_factor: 0.05,
            enable_pan: true,
            rotate_speed: 1.0,
            zoom_factor: 0.95,
            pan_speed: 1.0,
            azimuth_delta: 0.0,
            polar_delta: 0.0,
            pan_offset: Vec3::ZERO,
        }
    }
}

impl OrbitController {
    pub fn new(target: Vec3) -> Self {
        Self {
            target,
            ..Default::default()
        }
    }

    /// Initialize from camera's current position and target
    pub fn sync_with_camera(&mut self, camera: &Camera) {
        self.target = camera.target;
        let offset = camera.position - camera.target;
        self.distance = offset.length().max(f32::EPSILON);
        self.azimuth = offset.x.atan2(offset.z);
        self.polar = (offset.y / self.distance).clamp(-1.0, 1.0).acos();
    }

    /// Feed pointer input. `viewport_height` is in the same pixels as the deltas.
    pub fn handle_input(&mut self, camera: &Camera, input: &CameraInput, viewport_height: f32) {
        let height = viewport_height.max(1.0);

        if input.rotate_delta != Vec2::ZERO {
            self.azimuth_delta -= TAU * input.rotate_delta.x / height * self.rotate_speed;
            self.polar_delta -= TAU * input.rotate_delta.y / height * self.rotate_speed;
        }

        if self.enable_pan && input.pan_delta != Vec2::ZERO {
            // Scale so the point under the cursor follows it at the target depth
            let world_per_pixel =
                2.0 * self.distance * (camera.projection.fov_y / 2.0).tan() / height;
            let forward = camera.forward();
            let right = forward.cross(camera.up).normalize_or_zero();
            let up = right.cross(forward);
            self.pan_offset += (-right * input.pan_delta.x + up * input.pan_delta.y)
                * world_per_pixel
                * self.pan_speed;
        }

        if input.scroll_delta != 0.0 {
            let scale = self.zoom_factor.powf(input.scroll_delta);
            self.distance = (self.distance * scale).clamp(self.min_distance, self.max_distance);
        }
    }

    /// Advance the controller and write the camera. Returns whether it moved.
    pub fn update(&mut self, camera: &mut Camera) -> bool {
        let factor = if self.enable_damping { self.damping_factor } else { 1.0 };

        self.azimuth += self.azimuth_delta * factor;
        self.polar = (self.polar + self.polar_delta * factor).clamp(1e-4, PI - 1e-4);
        self.target += self.pan_offset * factor;

        let moving = self.azimuth_delta.abs() > 1e-6
            || self.polar_delta.abs() > 1e-6
            || self.pan_offset.length_squared() > 1e-12;

        if self.enable_damping {
            self.azimuth_delta *= 1.0 - factor;
            self.polar_delta *= 1.0 - factor;
            self.pan_offset *= 1.0 - factor;
        } else {
            self.azimuth_delta = 0.0;
            self.polar_delta = 0.0;
            self.pan_offset = Vec3::ZERO;
        }

        let position = self.calculate_position();
        let changed = moving || camera.position != position || camera.target != self.target;
        camera.position = position;
        camera.target = self.target;
        changed
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Calculate camera position from orbit parameters
    fn calculate_position(&self) -> Vec3 {
        let sin_polar = self.polar.sin();
        self.target
            + self.distance
                * Vec3::new(
                    sin_polar * self.azimuth.sin(),
                    self.polar.cos(),
                    sin_polar * self.azimuth.cos(),
                )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_with_default_camera() {
        let camera = Camera::default();
        let mut orbit = OrbitController::default();
        orbit.sync_with_camera(&camera);
        assert!((orbit.distance - 60.0).abs() < 1e-5);
        assert!(orbit.azimuth.abs() < 1e-6);
        assert!((orbit.polar - PI / 2.0).abs() < 1e-6);

        let mut synced = camera.clone();
        orbit.update(&mut synced);
        assert!((synced.position - camera.position).length() < 1e-3);
    }

    #[test]
    fn test_damped_rotation_glides_and_settles() {
        let mut camera = Camera::default();
        let mut orbit = OrbitController::default();
        orbit.sync_with_camera(&camera);

        let input = CameraInput {
            rotate_delta: Vec2::new(100.0, 0.0),
            ..Default::default()
        };
        orbit.handle_input(&camera, &input, 600.0);

        orbit.update(&mut camera);
        let first = orbit.azimuth;
        assert!(first < 0.0);

        orbit.update(&mut camera);
        assert!(orbit.azimuth < first);

        for _ in 0..1000 {
            orbit.update(&mut camera);
        }
        assert!(!orbit.update(&mut camera));
        // Total rotation converges to the undamped amount
        assert!((orbit.azimuth + TAU * 100.0 / 600.0).abs() < 1e-3);
        assert!((camera.position.length() - 60.0).abs() < 1e-3);
    }

    #[test]
    fn test_zoom_is_clamped() {
        let camera = Camera::default();
        let mut orbit = OrbitController::default();
        orbit.sync_with_camera(&camera);
        let input = CameraInput {
            scroll_delta: 1000.0,
            ..Default::default()
        };
        orbit.handle_input(&camera, &input, 600.0);
        assert_eq!(orbit.distance, orbit.min_distance);
    }

    #[test]
    fn test_pan_moves_target() {
        let mut camera = Camera::default();
        let mut orbit = OrbitController {
            enable_damping: false,
            ..Default::default()
        };
        orbit.sync_with_camera(&camera);
        let input = CameraInput {
            pan_delta: Vec2::new(-10.0, 0.0),
            ..Default::default()
        };
        orbit.handle_input(&camera, &input, 600.0);
        orbit.update(&mut camera);
        assert!(camera.target.x > 0.0);
        assert!(camera.target.y.abs() < 1e-5);
    }

    #[test]
    fn test_pan_disabled() {
        let mut camera = Camera::default();
        let mut orbit = OrbitController {
            enable_pan: false,
            ..Default::default()
        };
        orbit.sync_with_camera(&camera);
        let input = CameraInput {
            pan_delta: Vec2::new(50.0, 50.0),
            ..Default::default()
        };
        orbit.handle_input(&camera, &input, 600.0);
        orbit.update(&mut camera);
        assert_eq!(camera.target, Vec3::ZERO);
    }
}
