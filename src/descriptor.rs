//! Texture descriptors read from the host attributes.
//!
//! Each of the seven map slots carries an optional JSON descriptor naming an
//! image on the image server together with its wrap and repeat settings.

use serde::{Deserialize, Deserializer, Serialize};
use url::Url;

use crate::resources::WrapMode;

/// File extensions the loader accepts.
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// One of the seven texture slots of the physical material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MapSlot {
    Color,
    Displacement,
    Normal,
    AmbientOcclusion,
    Metalness,
    Roughness,
    Alpha,
}

impl MapSlot {
    pub const COUNT: usize = 7;

    /// All slots in attribute order.
    pub const ALL: [MapSlot; Self::COUNT] = [
        MapSlot::Color,
        MapSlot::Displacement,
        MapSlot::Normal,
        MapSlot::AmbientOcclusion,
        MapSlot::Metalness,
        MapSlot::Roughness,
        MapSlot::Alpha,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Name of the host attribute holding this slot's descriptor.
    pub fn attribute_name(self) -> &'static str {
        match self {
            MapSlot::Color => "color_map",
            MapSlot::Displacement => "displacement_map",
            MapSlot::Normal => "normal_map",
            MapSlot::AmbientOcclusion => "ao_map",
            MapSlot::Metalness => "metalness_map",
            MapSlot::Roughness => "roughness_map",
            MapSlot::Alpha => "alpha_map",
        }
    }

    /// Suffix used when the producer saves a map to disk.
    pub fn file_suffix(self) -> &'static str {
        match self {
            MapSlot::Color => "color",
            MapSlot::Displacement => "displacement",
            MapSlot::Normal => "normal",
            MapSlot::AmbientOcclusion => "ao",
            MapSlot::Metalness => "metalness",
            MapSlot::Roughness => "roughness",
            MapSlot::Alpha => "alpha",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MapSlot::Color => "Color",
            MapSlot::Displacement => "Displacement",
            MapSlot::Normal => "Normal",
            MapSlot::AmbientOcclusion => "Ambient Occlusion",
            MapSlot::Metalness => "Metalness",
            MapSlot::Roughness => "Roughness",
            MapSlot::Alpha => "Alpha",
        }
    }

    /// Only the color map holds sRGB-encoded data; every other map is linear.
    pub fn is_srgb(self) -> bool {
        matches!(self, MapSlot::Color)
    }
}

/// Descriptor of a single texture on the image server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextureDescriptor {
    pub filename: String,
    #[serde(default)]
    pub subfolder: String,
    #[serde(default = "default_bucket", rename = "type")]
    pub bucket: String,
    #[serde(default, deserialize_with = "deserialize_wrap", skip_serializing_if = "Option::is_none")]
    pub wrap_s: Option<WrapMode>,
    #[serde(default, deserialize_with = "deserialize_wrap", skip_serializing_if = "Option::is_none")]
    pub wrap_t: Option<WrapMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat_x: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat_y: Option<f32>,
    /// Slot-specific scalar (displacement scale, normal scale, AO intensity).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intensity: Option<f32>,
}

fn default_bucket() -> String {
    "output".to_string()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawWrap {
    Name(String),
    Code(u32),
}

fn deserialize_wrap<'de, D>(deserializer: D) -> Result<Option<WrapMode>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawWrap>::deserialize(deserializer)?;
    Ok(match raw {
        None => None,
        Some(RawWrap::Name(name)) => WrapMode::from_name(&name),
        Some(RawWrap::Code(code)) => WrapMode::from_code(code),
    })
}

impl TextureDescriptor {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            subfolder: String::new(),
            bucket: default_bucket(),
            wrap_s: None,
            wrap_t: None,
            repeat_x: None,
            repeat_y: None,
            intensity: None,
        }
    }

    pub fn with_subfolder(mut self, subfolder: impl Into<String>) -> Self {
        self.subfolder = subfolder.into();
        self
    }

    pub fn with_wrap(mut self, wrap_s: WrapMode, wrap_t: WrapMode) -> Self {
        self.wrap_s = Some(wrap_s);
        self.wrap_t = Some(wrap_t);
        self
    }

    pub fn with_repeat(mut self, x: f32, y: f32) -> Self {
        self.repeat_x = Some(x);
        self.repeat_y = Some(y);
        self
    }

    /// Descriptor in the shape the map-saving node reports:
    /// `{prefix}_{counter:05}_{slot}.png` inside `subfolder` of the output bucket.
    pub fn saved_map(prefix: &str, counter: u32, slot: MapSlot, subfolder: &str) -> Self {
        Self::new(format!("{prefix}_{counter:05}_{}.png", slot.file_suffix()))
            .with_subfolder(subfolder)
    }

    /// Parse an attribute value.
    ///
    /// The value is either a descriptor object or an array of them, in which
    /// case the first entry wins. `null`, an empty array, and objects without
    /// a filename all mean "no descriptor".
    pub fn from_attribute(value: &serde_json::Value) -> Option<Self> {
        let value = match value {
            serde_json::Value::Array(items) => items.first()?,
            other => other,
        };
        if !value.is_object() {
            return None;
        }
        match serde_json::from_value::<TextureDescriptor>(value.clone()) {
            Ok(descriptor) if !descriptor.filename.is_empty() => Some(descriptor),
            Ok(_) => None,
            Err(e) => {
                log::warn!("Ignoring malformed texture descriptor: {e}");
                None
            }
        }
    }

    /// Lower-cased file extension, if any.
    pub fn extension(&self) -> Option<String> {
        std::path::Path::new(&self.filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
    }

    pub fn is_supported_image(&self) -> bool {
        self.extension()
            .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
    }

    /// URL of the image on the server's `/view` endpoint. Any path prefix of
    /// `base` is kept.
    pub fn view_url(&self, base: &str) -> Result<Url, url::ParseError> {
        let mut url = Url::parse(base)?;
        url.path_segments_mut()
            .map_err(|()| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .push("view");
        url.set_query(None);
        url.query_pairs_mut()
            .append_pair("filename", &self.filename)
            .append_pair("subfolder", &self.subfolder)
            .append_pair("type", &self.bucket);
        Ok(url)
    }
}

/// One optional descriptor per map slot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DescriptorSet {
    slots: [Option<TextureDescriptor>; MapSlot::COUNT],
}

impl DescriptorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, slot: MapSlot) -> Option<&TextureDescriptor> {
        self.slots[slot.index()].as_ref()
    }

    pub fn set(&mut self, slot: MapSlot, descriptor: Option<TextureDescriptor>) {
        self.slots[slot.index()] = descriptor;
    }

    pub fn with(mut self, slot: MapSlot, descriptor: TextureDescriptor) -> Self {
        self.set(slot, Some(descriptor));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (MapSlot, &TextureDescriptor)> {
        MapSlot::ALL
            .into_iter()
            .filter_map(move |slot| self.get(slot).map(|d| (slot, d)))
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_attribute_names_follow_slot_order() {
        let names: Vec<_> = MapSlot::ALL.iter().map(|s| s.attribute_name()).collect();
        assert_eq!(
            names,
            [
                "color_map",
                "displacement_map",
                "normal_map",
                "ao_map",
                "metalness_map",
                "roughness_map",
                "alpha_map"
            ]
        );
        for (i, slot) in MapSlot::ALL.iter().enumerate() {
            assert_eq!(slot.index(), i);
        }
    }

    #[test]
    fn test_parse_object_descriptor() {
        let value = json!({
            "filename": "wood.png",
            "subfolder": "maps",
            "type": "output",
            "wrapS": "MirroredRepeatWrapping",
            "wrapT": 1001,
            "repeatX": 2,
            "repeatY": 3.5
        });
        let d = TextureDescriptor::from_attribute(&value).unwrap();
        assert_eq!(d.filename, "wood.png");
        assert_eq!(d.subfolder, "maps");
        assert_eq!(d.wrap_s, Some(WrapMode::MirroredRepeat));
        assert_eq!(d.wrap_t, Some(WrapMode::ClampToEdge));
        assert_eq!(d.repeat_x, Some(2.0));
        assert_eq!(d.repeat_y, Some(3.5));
    }

    #[test]
    fn test_parse_array_takes_first() {
        let value = json!([
            {"filename": "a_00001_color.png", "subfolder": "", "type": "output"},
            {"filename": "b_00001_color.png", "subfolder": "", "type": "output"}
        ]);
        let d = TextureDescriptor::from_attribute(&value).unwrap();
        assert_eq!(d.filename, "a_00001_color.png");
        assert_eq!(d.bucket, "output");
    }

    #[test]
    fn test_parse_absent_values() {
        assert!(TextureDescriptor::from_attribute(&json!(null)).is_none());
        assert!(TextureDescriptor::from_attribute(&json!([])).is_none());
        assert!(TextureDescriptor::from_attribute(&json!("wood.png")).is_none());
        assert!(TextureDescriptor::from_attribute(&json!({"filename": ""})).is_none());
        assert!(TextureDescriptor::from_attribute(&json!({"subfolder": "x"})).is_none());
    }

    #[test]
    fn test_defaults() {
        let d = TextureDescriptor::from_attribute(&json!({"filename": "x.jpg"})).unwrap();
        assert_eq!(d.subfolder, "");
        assert_eq!(d.bucket, "output");
        assert!(d.wrap_s.is_none());
        assert!(d.repeat_x.is_none());
    }

    #[test]
    fn test_unknown_wrap_is_ignored() {
        let d = TextureDescriptor::from_attribute(&json!({"filename": "x.png", "wrapS": "Spiral"}))
            .unwrap();
        assert!(d.wrap_s.is_none());
    }

    #[test]
    fn test_supported_extensions() {
        assert!(TextureDescriptor::new("a.png").is_supported_image());
        assert!(TextureDescriptor::new("a.JPG").is_supported_image());
        assert!(TextureDescriptor::new("dir.v2/a.jpeg").is_supported_image());
        assert!(!TextureDescriptor::new("a.webp").is_supported_image());
        assert!(!TextureDescriptor::new("a.exr").is_supported_image());
        assert!(!TextureDescriptor::new("png").is_supported_image());
    }

    #[test]
    fn test_view_url_encodes_query() {
        let d = TextureDescriptor::new("my map.png").with_subfolder("a/b");
        let url = d.view_url("http://127.0.0.1:8188").unwrap();
        assert_eq!(url.path(), "/view");
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("filename".to_string(), "my map.png".to_string()),
                ("subfolder".to_string(), "a/b".to_string()),
                ("type".to_string(), "output".to_string()),
            ]
        );
    }

    #[test]
    fn test_view_url_keeps_base_path() {
        let d = TextureDescriptor::new("wood.png");
        let url = d.view_url("http://127.0.0.1:8188/comfy").unwrap();
        assert_eq!(url.path(), "/comfy/view");
        assert_eq!(url.query(), Some("filename=wood.png&subfolder=&type=output"));

        let url = d.view_url("http://127.0.0.1:8188/comfy/").unwrap();
        assert_eq!(url.path(), "/comfy/view");

        assert!(d.view_url("mailto:someone@example.com").is_err());
    }

    #[test]
    fn test_saved_map_naming() {
        let d = TextureDescriptor::saved_map("ComfyUI", 7, MapSlot::AmbientOcclusion, "");
        assert_eq!(d.filename, "ComfyUI_00007_ao.png");
        assert_eq!(d.bucket, "output");
    }

    #[test]
    fn test_descriptor_set_iter() {
        let set = DescriptorSet::new()
            .with(MapSlot::Roughness, TextureDescriptor::new("r.png"))
            .with(MapSlot::Color, TextureDescriptor::new("c.png"));
        let slots: Vec<_> = set.iter().map(|(s, _)| s).collect();
        assert_eq!(slots, vec![MapSlot::Color, MapSlot::Roughness]);
        assert_eq!(set.len(), 2);
        assert!(!set.is_empty());
        assert!(DescriptorSet::new().is_empty());
    }
}
