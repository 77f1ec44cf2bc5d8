//! Exports of a live session, parsed back with the `gltf` crate.

use std::sync::Arc;
use std::time::Duration;

use material_preview::descriptor::{MapSlot, TextureDescriptor};
use material_preview::export::{export_scene, ExportFormat, Payload};
use material_preview::loader::DirectoryFetcher;
use material_preview::panel::PanelChange;
use material_preview::resources::encode_rgba_png;
use material_preview::scene::ObjectKind;
use material_preview::watcher::MemoryAttributes;
use material_preview::PreviewSession;

fn textured_session(dir: &std::path::Path) -> PreviewSession {
    let png = encode_rgba_png(2, 2, &[90u8; 16]).unwrap();
    std::fs::write(dir.join("wood.png"), &png).unwrap();
    std::fs::write(dir.join("rough.png"), &png).unwrap();

    let attributes = MemoryAttributes::new();
    attributes.set_descriptor(
        MapSlot::Color,
        Some(&TextureDescriptor::new("wood.png").with_repeat(2.0, 2.0)),
    );
    attributes.set_descriptor(MapSlot::Roughness, Some(&TextureDescriptor::new("rough.png")));

    let mut session = PreviewSession::new(attributes, Arc::new(DirectoryFetcher::new(dir)));
    assert!(session.wait_for_rebuild(Duration::from_secs(10)));
    session
}

#[test]
fn test_glb_parses_with_gltf_crate() {
    let dir = tempfile::tempdir().unwrap();
    let session = textured_session(dir.path());

    let file = export_scene(session.scene(), session.material(), ExportFormat::Glb).unwrap();
    assert_eq!(file.file_name, "scene.glb");
    let Payload::Binary(bytes) = &file.payload else {
        panic!("glb export must be binary");
    };

    let gltf = gltf::Gltf::from_slice(bytes).unwrap();
    let document = &gltf.document;
    assert_eq!(document.meshes().count(), 3);
    assert_eq!(document.materials().count(), 1);
    assert_eq!(document.cameras().count(), 1);
    assert_eq!(document.images().count(), 2);
    assert_eq!(document.lights().map(|l| l.count()), Some(3));
    assert!(gltf.blob.as_ref().is_some_and(|blob| !blob.is_empty()));

    let material = document.materials().next().unwrap();
    let pbr = material.pbr_metallic_roughness();
    assert!(pbr.base_color_texture().is_some());
    assert!(pbr.metallic_roughness_texture().is_some());
    assert_eq!(pbr.metallic_factor(), 1.0);

    let names: Vec<_> = document
        .nodes()
        .filter(|n| n.mesh().is_some())
        .filter_map(|n| n.name().map(str::to_string))
        .collect();
    assert_eq!(names, vec!["sphere", "cube", "torus"]);
}

#[test]
fn test_gltf_follows_visibility() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = textured_session(dir.path());
    session.apply_panel(PanelChange::Visible(ObjectKind::Cube, false));

    let file = export_scene(session.scene(), session.material(), ExportFormat::Gltf).unwrap();
    let Payload::Text(text) = &file.payload else {
        panic!("gltf export must be text");
    };
    let gltf = gltf::Gltf::from_slice(text.as_bytes()).unwrap();
    assert_eq!(gltf.document.meshes().count(), 2);
    assert!(gltf.document.buffers().all(|b| matches!(
        b.source(),
        gltf::buffer::Source::Uri(uri) if uri.starts_with("data:")
    )));
}

#[test]
fn test_obj_written_to_export_dir() {
    let dir = tempfile::tempdir().unwrap();
    let session = textured_session(dir.path());

    let file = export_scene(session.scene(), session.material(), ExportFormat::Obj).unwrap();
    let path = file.write_to(&dir.path().join("exports")).unwrap();
    assert!(path.ends_with("exports/scene.obj"));

    let text = std::fs::read_to_string(path).unwrap();
    assert_eq!(text.lines().filter(|l| l.starts_with("o ")).count(), 3);
    assert!(text.lines().any(|l| l.starts_with("vt ")));
    assert!(text.lines().any(|l| l.starts_with("vn ")));
    assert!(text.lines().any(|l| l.starts_with("f ")));
}
