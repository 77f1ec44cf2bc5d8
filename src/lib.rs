//! Material Preview - an interactive physically-based material previewer
//!
//! Texture descriptors published by a host are watched for changes; every
//! change rebuilds a physical material from the described maps and shows it
//! on a sphere, a cube and a torus rendered with wgpu.
//!
//! # Features
//! - Change detection over in-memory or file-backed attribute sources
//! - Background texture fetching from an image server or a local directory
//! - Live egui parameter panel with edits replayed across rebuilds
//! - glTF, GLB and OBJ scene export plus PNG screenshots

pub mod args;
pub mod backend;
pub mod descriptor;
pub mod egui_integration;
pub mod engine;
pub mod error;
pub mod export;
pub mod loader;
pub mod panel;
pub mod render_loop;
pub mod resources;
pub mod scene;
pub mod session;
pub mod watcher;
pub mod window;

use std::path::PathBuf;

pub use egui_integration::WgpuEguiIntegration;
pub use engine::Engine;
pub use error::{PreviewError, PreviewResult};
pub use session::PreviewSession;
pub use window::Window;

pub use backend::wgpu_backend::WgpuBackend;

/// Default address of the image server.
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8188";

/// Configuration for a preview window and its session
#[derive(Debug, Clone)]
pub struct PreviewConfig {
    /// Window title
    pub title: String,
    /// Initial window width
    pub width: u32,
    /// Initial window height
    pub height: u32,
    /// Enable vsync
    pub vsync: bool,
    /// Base URL of the image server's `/view` endpoint
    pub server_url: String,
    /// Read textures from this directory instead of the image server
    pub texture_dir: Option<PathBuf>,
    /// JSON file holding the descriptor attributes, watched for changes
    pub attributes_file: Option<PathBuf>,
    /// Where exports and screenshots are written
    pub export_dir: PathBuf,
    /// Format preselected in the export strip
    pub export_format: export::ExportFormat,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            title: "Material Preview".to_string(),
            width: 1280,
            height: 720,
            vsync: true,
            server_url: DEFAULT_SERVER_URL.to_string(),
            texture_dir: None,
            attributes_file: None,
            export_dir: PathBuf::from("."),
            export_format: export::ExportFormat::Gltf,
        }
    }
}
