//! Scene export and screenshots.
//!
//! Exports produce an in-memory [`ExportedFile`]; writing it into the export
//! directory is a separate step so callers can decide where the bytes go.

mod gltf;
mod obj;
mod screenshot;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;

use crate::resources::PhysicalMaterial;
use crate::scene::Scene;

pub use screenshot::{screenshot_png, SCREENSHOT_FILE_NAME};

/// Export error type
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to write {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("PNG encoding failed: {0}")]
    Image(#[from] image::ImageError),
    #[error("Nothing to export: no visible objects")]
    EmptyScene,
    #[error("Invalid capture: {0}")]
    InvalidCapture(String),
}

/// Output format of a scene export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, clap::ValueEnum)]
pub enum ExportFormat {
    /// glTF JSON with embedded base64 buffers
    #[default]
    Gltf,
    /// Binary glTF
    Glb,
    /// Wavefront OBJ text
    Obj,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 3] = [ExportFormat::Gltf, ExportFormat::Glb, ExportFormat::Obj];

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Gltf => "gltf",
            ExportFormat::Glb => "glb",
            ExportFormat::Obj => "obj",
        }
    }

    /// `scene.{extension}`
    pub fn file_name(self) -> String {
        format!("scene.{}", self.extension())
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ExportFormat::ALL
            .into_iter()
            .find(|format| format.extension().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown export format {s:?} (expected gltf, glb or obj)"))
    }
}

/// Contents of an exported file
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Text(String),
    Binary(Vec<u8>),
}

impl Payload {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Payload::Text(text) => text.as_bytes(),
            Payload::Binary(bytes) => bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }
}

/// A named export ready to be written
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedFile {
    pub file_name: String,
    pub payload: Payload,
}

impl ExportedFile {
    /// Write into `dir`, creating it if needed. Returns the written path.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf, ExportError> {
        std::fs::create_dir_all(dir).map_err(|source| ExportError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = dir.join(&self.file_name);
        std::fs::write(&path, self.payload.as_bytes()).map_err(|source| ExportError::Io {
            path: path.clone(),
            source,
        })?;
        log::info!("Wrote {} ({} bytes)", path.display(), self.payload.len());
        Ok(path)
    }
}

/// Serialize the visible objects of `scene` with `material` applied to each.
pub fn export_scene(
    scene: &Scene,
    material: &PhysicalMaterial,
    format: ExportFormat,
) -> Result<ExportedFile, ExportError> {
    if scene.visible_objects().next().is_none() {
        return Err(ExportError::EmptyScene);
    }

    let payload = match format {
        ExportFormat::Gltf => Payload::Text(gltf::export_gltf(scene, material)?),
        ExportFormat::Glb => Payload::Binary(gltf::export_glb(scene, material)?),
        ExportFormat::Obj => Payload::Text(obj::export_obj(scene)),
    };

    Ok(ExportedFile {
        file_name: format.file_name(),
        payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::MeshLibrary;

    fn scene() -> Scene {
        let mut scene = Scene::new();
        scene.populate(&MeshLibrary::new());
        scene
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("gltf".parse::<ExportFormat>().unwrap(), ExportFormat::Gltf);
        assert_eq!("GLB".parse::<ExportFormat>().unwrap(), ExportFormat::Glb);
        assert_eq!("obj".parse::<ExportFormat>().unwrap(), ExportFormat::Obj);
        assert!("fbx".parse::<ExportFormat>().is_err());
        assert_eq!(ExportFormat::Glb.file_name(), "scene.glb");
    }

    #[test]
    fn test_payload_kinds() {
        let scene = scene();
        let material = PhysicalMaterial::new("m");

        let obj = export_scene(&scene, &material, ExportFormat::Obj).unwrap();
        assert_eq!(obj.file_name, "scene.obj");
        assert!(matches!(obj.payload, Payload::Text(_)));

        let glb = export_scene(&scene, &material, ExportFormat::Glb).unwrap();
        assert_eq!(glb.file_name, "scene.glb");
        assert!(matches!(glb.payload, Payload::Binary(_)));
    }

    #[test]
    fn test_empty_scene_is_an_error() {
        let mut scene = scene();
        for object in &mut scene.objects {
            object.visible = false;
        }
        let result = export_scene(&scene, &PhysicalMaterial::new("m"), ExportFormat::Obj);
        assert!(matches!(result, Err(ExportError::EmptyScene)));
    }

    #[test]
    fn test_write_to_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = ExportedFile {
            file_name: "scene.obj".into(),
            payload: Payload::Text("o sphere\n".into()),
        };
        let path = file.write_to(&dir.path().join("out")).unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "o sphere\n");
    }
}
