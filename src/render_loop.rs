//! Animation state of the preview.

use glam::Vec3;

/// Rotation speed around X, radians per second.
pub const ROTATION_SPEED_X: f32 = -0.15;
/// Rotation speed around Y, radians per second.
pub const ROTATION_SPEED_Y: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopState {
    /// No scene is ready; a rebuild is pending.
    #[default]
    Waiting,
    /// The scene is ready and frames are produced.
    Rendering,
}

/// Waiting/rendering state plus the stop toggle.
///
/// Rotation is a function of absolute session time, so stopping and resuming
/// never resets the phase and frame rate does not affect the angle.
#[derive(Debug, Clone)]
pub struct RenderLoop {
    state: LoopState,
    running: bool,
    needs_redraw: bool,
}

impl Default for RenderLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderLoop {
    pub fn new() -> Self {
        Self {
            state: LoopState::Waiting,
            running: true,
            needs_redraw: false,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Whether this tick should animate and draw.
    pub fn is_animating(&self) -> bool {
        self.running && self.state == LoopState::Rendering
    }

    /// Drop back to waiting until the next rebuild completes.
    pub fn enter_waiting(&mut self) {
        self.state = LoopState::Waiting;
        self.needs_redraw = false;
    }

    /// The rebuilt scene is ready.
    pub fn mark_ready(&mut self) {
        self.state = LoopState::Rendering;
        self.needs_redraw = true;
    }

    /// Stop or resume. Returns the new running state.
    pub fn toggle(&mut self) -> bool {
        self.running = !self.running;
        if self.running {
            self.needs_redraw = true;
        }
        self.running
    }

    /// Flag a redraw after an out-of-band edit.
    pub fn request_redraw(&mut self) {
        if self.state == LoopState::Rendering {
            self.needs_redraw = true;
        }
    }

    /// Consume the redraw flag.
    pub fn take_redraw(&mut self) -> bool {
        std::mem::take(&mut self.needs_redraw)
    }

    /// Euler rotation of every mesh at `elapsed` seconds.
    pub fn rotation_at(elapsed: f32) -> Vec3 {
        Vec3::new(ROTATION_SPEED_X * elapsed, ROTATION_SPEED_Y * elapsed, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_is_time_based() {
        let r = RenderLoop::rotation_at(10.0);
        assert!((r.x + 1.5).abs() < 1e-6);
        assert!((r.y - 1.0).abs() < 1e-6);
        assert_eq!(r.z, 0.0);
        assert_eq!(RenderLoop::rotation_at(0.0), Vec3::ZERO);
    }

    #[test]
    fn test_waiting_until_ready() {
        let mut render_loop = RenderLoop::new();
        assert_eq!(render_loop.state(), LoopState::Waiting);
        assert!(!render_loop.is_animating());

        render_loop.request_redraw();
        assert!(!render_loop.take_redraw());

        render_loop.mark_ready();
        assert!(render_loop.is_animating());
        assert!(render_loop.take_redraw());
        assert!(!render_loop.take_redraw());

        render_loop.enter_waiting();
        assert!(!render_loop.is_animating());
    }

    #[test]
    fn test_toggle() {
        let mut render_loop = RenderLoop::new();
        render_loop.mark_ready();
        render_loop.take_redraw();

        assert!(!render_loop.toggle());
        assert!(!render_loop.is_animating());
        assert_eq!(render_loop.state(), LoopState::Rendering);

        assert!(render_loop.toggle());
        assert!(render_loop.is_animating());
        assert!(render_loop.take_redraw());
    }
}
