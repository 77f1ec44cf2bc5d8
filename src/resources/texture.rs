//! Texture data, wrap modes and GPU upload

use crate::backend::types::*;
use crate::backend::wgpu_backend::WgpuBackend;
use image::{DynamicImage, GenericImageView};
use serde::{Deserialize, Serialize};

/// How texture coordinates outside `[0, 1]` are resolved.
///
/// The numeric codes match the ones the host page uses in descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WrapMode {
    ClampToEdge,
    #[default]
    Repeat,
    MirroredRepeat,
}

impl WrapMode {
    pub const ALL: [WrapMode; 3] = [WrapMode::ClampToEdge, WrapMode::Repeat, WrapMode::MirroredRepeat];

    pub fn code(self) -> u32 {
        match self {
            WrapMode::Repeat => 1000,
            WrapMode::ClampToEdge => 1001,
            WrapMode::MirroredRepeat => 1002,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            1000 => Some(WrapMode::Repeat),
            1001 => Some(WrapMode::ClampToEdge),
            1002 => Some(WrapMode::MirroredRepeat),
            _ => None,
        }
    }

    /// Accepts both the long (`RepeatWrapping`) and short (`Repeat`) names.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        let short = name.strip_suffix("Wrapping").unwrap_or(name);
        match short {
            "ClampToEdge" => Some(WrapMode::ClampToEdge),
            "Repeat" => Some(WrapMode::Repeat),
            "MirroredRepeat" => Some(WrapMode::MirroredRepeat),
            _ => name.parse::<u32>().ok().and_then(Self::from_code),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            WrapMode::ClampToEdge => "ClampToEdgeWrapping",
            WrapMode::Repeat => "RepeatWrapping",
            WrapMode::MirroredRepeat => "MirroredRepeatWrapping",
        }
    }

    pub fn address_mode(self) -> AddressMode {
        match self {
            WrapMode::ClampToEdge => AddressMode::ClampToEdge,
            WrapMode::Repeat => AddressMode::Repeat,
            WrapMode::MirroredRepeat => AddressMode::MirrorRepeat,
        }
    }
}

/// Decoded RGBA8 texture
#[derive(Debug, Clone, PartialEq)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub data: Vec<u8>,
    pub name: String,
}

impl TextureData {
    /// Decode texture from encoded bytes (PNG or JPEG)
    pub fn from_bytes(bytes: &[u8], name: &str, srgb: bool) -> Result<Self, image::ImageError> {
        let img = image::load_from_memory(bytes)?;
        Ok(Self::from_image(img, name, srgb))
    }

    fn from_image(img: DynamicImage, name: &str, srgb: bool) -> Self {
        let (width, height) = img.dimensions();
        let data = img.to_rgba8().into_raw();

        Self {
            width,
            height,
            format: if srgb {
                TextureFormat::Rgba8UnormSrgb
            } else {
                TextureFormat::Rgba8Unorm
            },
            data,
            name: name.to_string(),
        }
    }

    /// Create a solid color texture
    pub fn solid_color(color: [u8; 4], name: &str) -> Self {
        Self {
            width: 1,
            height: 1,
            format: TextureFormat::Rgba8Unorm,
            data: color.to_vec(),
            name: name.to_string(),
        }
    }

    /// Placeholder bound to empty material slots
    pub fn white() -> Self {
        Self::solid_color([255, 255, 255, 255], "white")
    }

    /// Re-encode the pixels as PNG.
    pub fn encode_png(&self) -> Result<Vec<u8>, image::ImageError> {
        encode_rgba_png(self.width, self.height, &self.data)
    }
}

/// Encode tightly packed RGBA8 pixels as PNG.
pub fn encode_rgba_png(width: u32, height: u32, pixels: &[u8]) -> Result<Vec<u8>, image::ImageError> {
    let img = image::ImageBuffer::<image::Rgba<u8>, _>::from_raw(width, height, pixels.to_vec())
        .ok_or_else(|| {
            image::ImageError::Parameter(image::error::ParameterError::from_kind(
                image::error::ParameterErrorKind::DimensionMismatch,
            ))
        })?;

    let mut png = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)?;
    Ok(png)
}

/// GPU texture with associated view
pub struct GpuTexture {
    pub handle: TextureHandle,
    pub view: TextureViewHandle,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
}

impl GpuTexture {
    /// Create and upload texture to GPU
    pub fn create(backend: &mut WgpuBackend, data: &TextureData) -> BackendResult<Self> {
        let handle = backend.create_texture(&TextureDescriptor {
            label: Some(data.name.clone()),
            width: data.width,
            height: data.height,
            format: data.format,
            usage: TextureUsage::TEXTURE_BINDING | TextureUsage::COPY_DST,
        })?;

        let view = backend.create_texture_view(handle)?;
        backend.write_texture(handle, &data.data, data.width, data.height);

        Ok(Self {
            handle,
            view,
            width: data.width,
            height: data.height,
            format: data.format,
        })
    }

    pub fn destroy(self, backend: &mut WgpuBackend) {
        backend.destroy_texture_view(self.view);
        backend.destroy_texture(self.handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_codes_round_trip() {
        for mode in WrapMode::ALL {
            assert_eq!(WrapMode::from_code(mode.code()), Some(mode));
            assert_eq!(WrapMode::from_name(mode.name()), Some(mode));
        }
        assert_eq!(WrapMode::from_code(42), None);
    }

    #[test]
    fn test_wrap_name_forms() {
        assert_eq!(WrapMode::from_name("Repeat"), Some(WrapMode::Repeat));
        assert_eq!(WrapMode::from_name("ClampToEdgeWrapping"), Some(WrapMode::ClampToEdge));
        assert_eq!(WrapMode::from_name("1002"), Some(WrapMode::MirroredRepeat));
        assert_eq!(WrapMode::from_name("Clamp"), None);
    }

    #[test]
    fn test_wrap_address_modes() {
        assert_eq!(WrapMode::MirroredRepeat.address_mode(), AddressMode::MirrorRepeat);
        assert_eq!(WrapMode::default(), WrapMode::Repeat);
    }

    #[test]
    fn test_decode_png_bytes() {
        let png = encode_rgba_png(2, 1, &[255, 0, 0, 255, 0, 255, 0, 255]).unwrap();
        let tex = TextureData::from_bytes(&png, "pixels.png", true).unwrap();
        assert_eq!((tex.width, tex.height), (2, 1));
        assert_eq!(tex.format, TextureFormat::Rgba8UnormSrgb);
        assert_eq!(&tex.data[4..8], &[0, 255, 0, 255]);

        let linear = TextureData::from_bytes(&png, "pixels.png", false).unwrap();
        assert_eq!(linear.format, TextureFormat::Rgba8Unorm);
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(TextureData::from_bytes(b"not an image", "x.png", false).is_err());
    }

    #[test]
    fn test_encode_rejects_short_buffer() {
        assert!(encode_rgba_png(4, 4, &[0; 8]).is_err());
    }
}
