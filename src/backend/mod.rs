//! GPU backend
//!
//! Handle-based wrapper around wgpu used by the preview renderer.

pub mod types;
pub mod wgpu_backend;

pub use types::*;
