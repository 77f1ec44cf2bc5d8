//! Session pipeline tests: attribute edits in, rebuilt materials out.

use std::path::Path;
use std::sync::{mpsc, Arc};
use std::time::Duration;

use parking_lot::Mutex;

use material_preview::descriptor::{MapSlot, TextureDescriptor};
use material_preview::loader::{DirectoryFetcher, LoadError, TextureFetcher};
use material_preview::panel::PanelChange;
use material_preview::render_loop::LoopState;
use material_preview::resources::{encode_rgba_png, WrapMode};
use material_preview::watcher::MemoryAttributes;
use material_preview::PreviewSession;

const TIMEOUT: Duration = Duration::from_secs(10);

fn write_png(dir: &Path, name: &str) {
    let png = encode_rgba_png(4, 4, &[200u8; 64]).unwrap();
    std::fs::write(dir.join(name), png).unwrap();
}

/// Reads from a directory, one file per permit sent by the test.
struct GatedFetcher {
    inner: DirectoryFetcher,
    permits: Mutex<mpsc::Receiver<()>>,
}

impl TextureFetcher for GatedFetcher {
    fn fetch(&self, descriptor: &TextureDescriptor) -> Result<Vec<u8>, LoadError> {
        let _ = self.permits.lock().recv();
        self.inner.fetch(descriptor)
    }
}

fn ready_session(dir: &Path, attributes: &MemoryAttributes) -> PreviewSession {
    let mut session =
        PreviewSession::new(attributes.clone(), Arc::new(DirectoryFetcher::new(dir)));
    assert!(session.wait_for_rebuild(TIMEOUT));
    session
}

#[test]
fn test_color_descriptor_builds_color_map_only() {
    let dir = tempfile::tempdir().unwrap();
    write_png(dir.path(), "wood.png");

    let attributes = MemoryAttributes::new();
    attributes.set(MapSlot::Color.attribute_name(), r#"{"filename": "wood.png"}"#);
    for slot in &MapSlot::ALL[1..] {
        attributes.set(slot.attribute_name(), "null");
    }
    let session = ready_session(dir.path(), &attributes);

    let material = session.material();
    let color = material.map(MapSlot::Color).expect("color map bound");
    assert_eq!((color.texture.width, color.texture.height), (4, 4));
    for slot in &MapSlot::ALL[1..] {
        assert!(material.map(*slot).is_none(), "{slot:?} should be empty");
    }
    assert_eq!(material.roughness, 1.0);
    assert_eq!(material.metalness, 1.0);
    assert_eq!(session.scene().objects.len(), 3);
}

#[test]
fn test_identical_content_does_not_rebuild() {
    let dir = tempfile::tempdir().unwrap();
    write_png(dir.path(), "wood.png");

    let attributes = MemoryAttributes::new();
    attributes.set_descriptor(MapSlot::Color, Some(&TextureDescriptor::new("wood.png")));
    let mut session = ready_session(dir.path(), &attributes);
    let generation = session.generation();

    session.tick(0.5);
    session.tick(1.0);
    assert_eq!(session.generation(), generation);

    // Same value written again is still no change
    attributes.set_descriptor(MapSlot::Color, Some(&TextureDescriptor::new("wood.png")));
    session.tick(1.5);
    assert_eq!(session.generation(), generation);
    assert_eq!(session.loop_state(), LoopState::Rendering);
}

#[test]
fn test_descriptor_change_rebuilds_once() {
    let dir = tempfile::tempdir().unwrap();
    write_png(dir.path(), "wood.png");
    write_png(dir.path(), "bumps.png");

    let (permits, gate) = mpsc::channel();
    let fetcher = GatedFetcher {
        inner: DirectoryFetcher::new(dir.path()),
        permits: Mutex::new(gate),
    };
    let attributes = MemoryAttributes::new();
    let mut session = PreviewSession::new(attributes.clone(), Arc::new(fetcher));
    assert!(session.wait_for_rebuild(TIMEOUT));
    let generation = session.generation();
    let old_mesh = Arc::clone(&session.scene().objects[0].mesh);

    attributes.set_descriptor(MapSlot::Color, Some(&TextureDescriptor::new("wood.png")));
    attributes.set_descriptor(MapSlot::Normal, Some(&TextureDescriptor::new("bumps.png")));
    session.tick(1.0);
    assert_eq!(session.generation(), generation + 1);
    assert_eq!(session.loop_state(), LoopState::Waiting);
    assert!(session.scene().objects.is_empty());

    permits.send(()).unwrap();
    permits.send(()).unwrap();
    assert!(session.wait_for_rebuild(TIMEOUT));
    assert_eq!(session.generation(), generation + 1);
    assert_eq!(session.material().bound_map_count(), 2);
    assert_eq!(session.scene().objects.len(), 3);
    // Geometry is shared, only the objects are replaced
    assert!(Arc::ptr_eq(&old_mesh, &session.scene().objects[0].mesh));
}

#[test]
fn test_unsupported_extension_leaves_slot_empty() {
    let dir = tempfile::tempdir().unwrap();
    write_png(dir.path(), "wood.png");

    let attributes = MemoryAttributes::new();
    attributes.set_descriptor(MapSlot::Color, Some(&TextureDescriptor::new("wood.png")));
    attributes.set_descriptor(MapSlot::Normal, Some(&TextureDescriptor::new("normal.exr")));
    attributes.set_descriptor(MapSlot::Roughness, Some(&TextureDescriptor::new("missing.png")));
    let session = ready_session(dir.path(), &attributes);

    let material = session.material();
    assert!(material.map(MapSlot::Color).is_some());
    assert!(material.map(MapSlot::Normal).is_none());
    assert!(material.map(MapSlot::Roughness).is_none());
    assert!(session.is_ready());
}

#[test]
fn test_wrap_change_updates_every_bound_map() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["c.png", "n.png", "r.png"] {
        write_png(dir.path(), name);
    }

    let attributes = MemoryAttributes::new();
    attributes.set_descriptor(MapSlot::Color, Some(&TextureDescriptor::new("c.png")));
    attributes.set_descriptor(MapSlot::Normal, Some(&TextureDescriptor::new("n.png")));
    attributes.set_descriptor(MapSlot::Roughness, Some(&TextureDescriptor::new("r.png")));
    let mut session = ready_session(dir.path(), &attributes);
    assert_eq!(session.material().bound_map_count(), 3);

    session.apply_panel(PanelChange::WrapS(WrapMode::MirroredRepeat));
    session.apply_panel(PanelChange::RepeatX(3.0));

    for (_, binding) in session.material().maps() {
        assert_eq!(binding.wrap_s, WrapMode::MirroredRepeat);
        assert_eq!(binding.wrap_t, WrapMode::Repeat);
        assert_eq!(binding.repeat.x, 3.0);
    }
}

#[test]
fn test_stopped_session_ignores_edits_until_resumed() {
    let dir = tempfile::tempdir().unwrap();
    write_png(dir.path(), "wood.png");

    let attributes = MemoryAttributes::new();
    let mut session = ready_session(dir.path(), &attributes);
    let generation = session.generation();

    assert!(!session.toggle_animation());
    attributes.set_descriptor(MapSlot::Color, Some(&TextureDescriptor::new("wood.png")));
    session.tick(1.0);
    assert_eq!(session.generation(), generation);

    assert!(session.toggle_animation());
    session.tick(2.0);
    assert_eq!(session.generation(), generation + 1);
}
