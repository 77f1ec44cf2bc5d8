//! egui GUI integration for the wgpu backend.

mod wgpu;

pub use self::wgpu::WgpuEguiIntegration;
