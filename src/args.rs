//! Command line arguments of the preview binary.

use std::path::PathBuf;

use clap::Parser;

use crate::export::ExportFormat;
use crate::{PreviewConfig, DEFAULT_SERVER_URL};

/// Interactive physically-based material preview.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "material-preview",
    about = "Interactive physically-based material preview",
    long_about = "Shows a sphere, a cube and a torus sharing one physical material.\n\n\
        Texture maps are described by a JSON attributes file (watched for edits) and\n\
        fetched from the image server's /view endpoint, or from a local directory\n\
        when --texture-dir is given.\n\
        \n\
        EXAMPLES:\n\
          # Preview maps served by a local image server\n\
          ./material-preview --attributes maps.json\n\
        \n\
          # Read maps from disk and exit after 120 frames\n\
          ./material-preview --attributes maps.json --texture-dir ./output --max-frames 120",
    version
)]
pub struct Args {
    /// Initial window width in pixels.
    #[arg(long, default_value = "1280")]
    pub width: u32,

    /// Initial window height in pixels.
    #[arg(long, default_value = "720")]
    pub height: u32,

    /// Disable vertical sync (may cause tearing).
    #[arg(long)]
    pub no_vsync: bool,

    /// Base URL of the image server.
    #[arg(long, default_value = DEFAULT_SERVER_URL)]
    pub server: String,

    /// Read textures from this directory instead of the image server.
    #[arg(long)]
    pub texture_dir: Option<PathBuf>,

    /// JSON file with the texture descriptors, reloaded when it changes.
    #[arg(long)]
    pub attributes: Option<PathBuf>,

    /// Directory receiving exports and screenshots.
    #[arg(long, default_value = ".")]
    pub export_dir: PathBuf,

    /// Export format preselected in the panel.
    #[arg(long, default_value = "gltf", value_enum)]
    pub format: ExportFormat,

    /// Exit after rendering N frames (useful for testing).
    #[arg(long)]
    pub max_frames: Option<u64>,
}

impl From<Args> for PreviewConfig {
    fn from(args: Args) -> Self {
        if args.texture_dir.is_some() && args.server != DEFAULT_SERVER_URL {
            log::warn!("--server has no effect when --texture-dir is given");
        }

        Self {
            width: args.width,
            height: args.height,
            vsync: !args.no_vsync,
            server_url: args.server,
            texture_dir: args.texture_dir,
            attributes_file: args.attributes,
            export_dir: args.export_dir,
            export_format: args.format,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_config() {
        let args = Args::try_parse_from(["material-preview"]).unwrap();
        assert_eq!(args.max_frames, None);

        let config = PreviewConfig::from(args);
        let defaults = PreviewConfig::default();
        assert_eq!(config.width, defaults.width);
        assert_eq!(config.height, defaults.height);
        assert_eq!(config.server_url, defaults.server_url);
        assert_eq!(config.export_dir, defaults.export_dir);
        assert_eq!(config.export_format, ExportFormat::Gltf);
        assert!(config.vsync);
    }

    #[test]
    fn test_parse_all_flags() {
        let args = Args::try_parse_from([
            "material-preview",
            "--width",
            "800",
            "--height",
            "600",
            "--no-vsync",
            "--texture-dir",
            "/tmp/maps",
            "--attributes",
            "maps.json",
            "--export-dir",
            "out",
            "--format",
            "glb",
            "--max-frames",
            "10",
        ])
        .unwrap();
        assert_eq!(args.max_frames, Some(10));

        let config = PreviewConfig::from(args);
        assert_eq!((config.width, config.height), (800, 600));
        assert!(!config.vsync);
        assert_eq!(config.texture_dir, Some(PathBuf::from("/tmp/maps")));
        assert_eq!(config.attributes_file, Some(PathBuf::from("maps.json")));
        assert_eq!(config.export_dir, PathBuf::from("out"));
        assert_eq!(config.export_format, ExportFormat::Glb);
    }

    #[test]
    fn test_rejects_unknown_format() {
        assert!(Args::try_parse_from(["material-preview", "--format", "fbx"]).is_err());
    }
}
