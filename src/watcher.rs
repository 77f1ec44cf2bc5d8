//! Attribute sources and the descriptor change detector.
//!
//! The host publishes the seven texture descriptors as JSON text attributes.
//! [`AttributeWatcher`] reads them once per tick, parses them, and reports a
//! new [`DescriptorSet`] only when the parsed values differ from the previous
//! tick.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Arc;

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::RwLock;
use serde_json::Value;
use thiserror::Error;

use crate::descriptor::{DescriptorSet, MapSlot, TextureDescriptor};

/// Attribute source error type
#[derive(Error, Debug)]
pub enum AttributeError {
    #[error("Failed to read attributes file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Attributes file {path} is not a JSON object: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to watch attributes file: {0}")]
    Watch(#[from] notify::Error),
}

/// Where the texture descriptor attributes come from.
pub trait AttributeSource {
    /// Pick up external changes. Called once per poll before any reads.
    fn refresh(&mut self) {}

    /// Raw attribute text, `None` when the attribute is absent.
    fn attribute(&self, name: &str) -> Option<String>;
}

/// In-memory attributes, shared between the host and the session.
///
/// Clones share the same storage, so a host can keep one handle and pass
/// another to the session.
#[derive(Debug, Clone, Default)]
pub struct MemoryAttributes {
    values: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, name: impl Into<String>, value: impl Into<String>) {
        self.values.write().insert(name.into(), value.into());
    }

    pub fn remove(&self, name: &str) {
        self.values.write().remove(name);
    }

    /// Store `descriptor` under the slot's attribute, or remove it for `None`.
    pub fn set_descriptor(&self, slot: MapSlot, descriptor: Option<&TextureDescriptor>) {
        match descriptor.map(serde_json::to_string) {
            Some(Ok(json)) => self.set(slot.attribute_name(), json),
            Some(Err(e)) => log::warn!("Failed to serialize {} descriptor: {e}", slot.label()),
            None => self.remove(slot.attribute_name()),
        }
    }

    pub fn clear(&self) {
        self.values.write().clear();
    }
}

impl AttributeSource for MemoryAttributes {
    fn attribute(&self, name: &str) -> Option<String> {
        self.values.read().get(name).cloned()
    }
}

/// Attributes stored in a JSON file, re-read whenever the file changes.
///
/// The file holds one object mapping attribute names to either JSON text or
/// an inline descriptor value.
pub struct FileAttributes {
    path: PathBuf,
    values: HashMap<String, String>,
    /// The underlying file watcher (kept alive).
    _watcher: RecommendedWatcher,
    event_rx: mpsc::Receiver<notify::Event>,
    dirty: bool,
    last_error: Option<String>,
}

impl FileAttributes {
    /// Start watching `path`. The file does not have to exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, AttributeError> {
        let path = path.into();
        let (tx, rx) = mpsc::channel::<notify::Event>();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            if let Ok(event) = res {
                let _ = tx.send(event);
            }
        })?;

        // Editors often replace the file, so watch the containing directory
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        log::info!("Watching attributes file {:?}", path);

        Ok(Self {
            path,
            values: HashMap::new(),
            _watcher: watcher,
            event_rx: rx,
            dirty: true,
            last_error: None,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn drain_events(&mut self) {
        let file_name = self.path.file_name();
        while let Ok(event) = self.event_rx.try_recv() {
            if !matches!(
                event.kind,
                EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
            ) {
                continue;
            }
            if event.paths.iter().any(|p| p.file_name() == file_name) {
                self.dirty = true;
            }
        }
    }
}

/// Parse an attributes file into raw attribute strings.
pub fn read_attributes_file(path: &Path) -> Result<HashMap<String, String>, AttributeError> {
    let text = std::fs::read_to_string(path).map_err(|source| AttributeError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let object: serde_json::Map<String, Value> =
        serde_json::from_str(&text).map_err(|source| AttributeError::Json {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(object
        .into_iter()
        .filter_map(|(name, value)| match value {
            Value::Null => None,
            Value::String(text) => Some((name, text)),
            other => Some((name, other.to_string())),
        })
        .collect())
}

impl AttributeSource for FileAttributes {
    fn refresh(&mut self) {
        self.drain_events();
        if !self.dirty {
            return;
        }
        self.dirty = false;

        match read_attributes_file(&self.path) {
            Ok(values) => {
                log::debug!("Reloaded {} attributes from {:?}", values.len(), self.path);
                self.values = values;
                self.last_error = None;
            }
            Err(e) => {
                // Keep the previous contents; report each distinct failure once
                let message = e.to_string();
                if self.last_error.as_deref() != Some(message.as_str()) {
                    log::warn!("{message}");
                    self.last_error = Some(message);
                }
            }
        }
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.values.get(name).cloned()
    }
}

type ChangeListener = Box<dyn FnMut(&DescriptorSet)>;

/// Detects changes of the seven descriptor attributes between ticks.
pub struct AttributeWatcher {
    source: Box<dyn AttributeSource>,
    raw: [Option<String>; MapSlot::COUNT],
    snapshot: [Option<Value>; MapSlot::COUNT],
    listeners: Vec<ChangeListener>,
}

impl AttributeWatcher {
    pub fn new(source: impl AttributeSource + 'static) -> Self {
        Self::from_boxed(Box::new(source))
    }

    pub fn from_boxed(source: Box<dyn AttributeSource>) -> Self {
        Self {
            source,
            raw: Default::default(),
            snapshot: Default::default(),
            listeners: Vec::new(),
        }
    }

    /// Register a callback invoked with every new descriptor set.
    pub fn on_change(&mut self, listener: impl FnMut(&DescriptorSet) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Read all attributes and compare them against the previous snapshot.
    ///
    /// Returns the new descriptor set when anything changed.
    pub fn poll(&mut self) -> Option<DescriptorSet> {
        self.source.refresh();

        let mut next = self.snapshot.clone();
        for slot in MapSlot::ALL {
            let raw = self.source.attribute(slot.attribute_name());
            if raw == self.raw[slot.index()] {
                continue;
            }
            next[slot.index()] = raw.as_deref().and_then(|text| parse_attribute(slot, text));
            self.raw[slot.index()] = raw;
        }

        if next == self.snapshot {
            return None;
        }
        self.snapshot = next;

        let descriptors = self.descriptors();
        log::info!(
            "Texture descriptors changed ({} of {} slots set)",
            descriptors.len(),
            MapSlot::COUNT
        );
        for listener in &mut self.listeners {
            listener(&descriptors);
        }
        Some(descriptors)
    }

    /// Descriptor set of the current snapshot.
    pub fn descriptors(&self) -> DescriptorSet {
        let mut set = DescriptorSet::new();
        for slot in MapSlot::ALL {
            let descriptor = self.snapshot[slot.index()]
                .as_ref()
                .and_then(TextureDescriptor::from_attribute);
            set.set(slot, descriptor);
        }
        set
    }
}

/// Parse attribute text; empty text and JSON `null` mean "no descriptor".
fn parse_attribute(slot: MapSlot, text: &str) -> Option<Value> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Null) => None,
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!("Invalid JSON in {}: {e}", slot.attribute_name());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn wood() -> TextureDescriptor {
        TextureDescriptor::new("wood.png")
    }

    #[test]
    fn test_empty_source_never_changes() {
        let mut watcher = AttributeWatcher::new(MemoryAttributes::new());
        assert!(watcher.poll().is_none());
        assert!(watcher.poll().is_none());
    }

    #[test]
    fn test_change_detected_once() {
        let attributes = MemoryAttributes::new();
        let mut watcher = AttributeWatcher::new(attributes.clone());

        attributes.set_descriptor(MapSlot::Color, Some(&wood()));
        let set = watcher.poll().expect("first descriptor is a change");
        assert_eq!(set.get(MapSlot::Color), Some(&wood()));
        assert_eq!(set.len(), 1);

        assert!(watcher.poll().is_none());
    }

    #[test]
    fn test_formatting_is_not_a_change() {
        let attributes = MemoryAttributes::new();
        let mut watcher = AttributeWatcher::new(attributes.clone());

        attributes.set("color_map", r#"{"filename":"wood.png","subfolder":""}"#);
        assert!(watcher.poll().is_some());

        attributes.set("color_map", r#"{ "subfolder": "", "filename": "wood.png" }"#);
        assert!(watcher.poll().is_none());
    }

    #[test]
    fn test_removal_is_a_change() {
        let attributes = MemoryAttributes::new();
        let mut watcher = AttributeWatcher::new(attributes.clone());

        attributes.set_descriptor(MapSlot::Normal, Some(&wood()));
        assert!(watcher.poll().is_some());

        attributes.set_descriptor(MapSlot::Normal, None);
        let set = watcher.poll().expect("removal is a change");
        assert!(set.is_empty());
    }

    #[test]
    fn test_null_and_empty_mean_absent() {
        let attributes = MemoryAttributes::new();
        let mut watcher = AttributeWatcher::new(attributes.clone());

        attributes.set("color_map", "null");
        attributes.set("ao_map", "");
        assert!(watcher.poll().is_none());
    }

    #[test]
    fn test_invalid_json_disables_slot() {
        let attributes = MemoryAttributes::new();
        let mut watcher = AttributeWatcher::new(attributes.clone());

        attributes.set_descriptor(MapSlot::Roughness, Some(&wood()));
        assert!(watcher.poll().is_some());

        attributes.set("roughness_map", "{not json");
        let set = watcher.poll().expect("slot dropped");
        assert!(set.get(MapSlot::Roughness).is_none());
    }

    #[test]
    fn test_listeners_are_notified() {
        let attributes = MemoryAttributes::new();
        let mut watcher = AttributeWatcher::new(attributes.clone());

        let calls = Rc::new(Cell::new(0));
        let seen = Rc::clone(&calls);
        watcher.on_change(move |set| {
            assert!(set.get(MapSlot::Alpha).is_some());
            seen.set(seen.get() + 1);
        });

        attributes.set_descriptor(MapSlot::Alpha, Some(&wood()));
        watcher.poll();
        watcher.poll();
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_read_attributes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attributes.json");
        std::fs::write(
            &path,
            r#"{
                "color_map": {"filename": "wood.png"},
                "normal_map": "{\"filename\": \"n.png\"}",
                "ao_map": null
            }"#,
        )
        .unwrap();

        let values = read_attributes_file(&path).unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values["normal_map"], r#"{"filename": "n.png"}"#);

        let parsed: Value = serde_json::from_str(&values["color_map"]).unwrap();
        assert_eq!(parsed["filename"], "wood.png");
    }

    #[test]
    fn test_read_attributes_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(
            read_attributes_file(&missing),
            Err(AttributeError::Io { .. })
        ));

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "[1, 2]").unwrap();
        assert!(matches!(
            read_attributes_file(&bad),
            Err(AttributeError::Json { .. })
        ));
    }

    #[test]
    fn test_file_attributes_initial_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attributes.json");
        std::fs::write(&path, r#"{"color_map": {"filename": "wood.png"}}"#).unwrap();

        let mut watcher = AttributeWatcher::new(FileAttributes::open(&path).unwrap());
        let set = watcher.poll().expect("initial contents are a change");
        assert_eq!(set.get(MapSlot::Color).map(|d| d.filename.as_str()), Some("wood.png"));
    }
}
