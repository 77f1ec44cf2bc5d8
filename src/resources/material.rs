//! Physically-based material shared by the preview meshes

use crate::backend::types::{AddressMode, CullMode, FilterMode, SamplerDescriptor};
use crate::descriptor::MapSlot;
use crate::resources::{TextureData, WrapMode};
use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};
use std::sync::Arc;

/// Which faces of the meshes are shaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MaterialSide {
    #[default]
    Front,
    Back,
    Double,
}

impl MaterialSide {
    pub const ALL: [MaterialSide; 3] = [MaterialSide::Front, MaterialSide::Back, MaterialSide::Double];

    pub fn name(self) -> &'static str {
        match self {
            MaterialSide::Front => "Front",
            MaterialSide::Back => "Back",
            MaterialSide::Double => "Double",
        }
    }

    pub fn cull_mode(self) -> CullMode {
        match self {
            MaterialSide::Front => CullMode::Back,
            MaterialSide::Back => CullMode::Front,
            MaterialSide::Double => CullMode::None,
        }
    }

    fn code(self) -> u32 {
        match self {
            MaterialSide::Front => 0,
            MaterialSide::Back => 1,
            MaterialSide::Double => 2,
        }
    }
}

/// A decoded texture bound to one material slot, with its sampling state.
#[derive(Debug, Clone)]
pub struct MapBinding {
    pub texture: Arc<TextureData>,
    pub wrap_s: WrapMode,
    pub wrap_t: WrapMode,
    pub repeat: Vec2,
}

impl MapBinding {
    pub fn new(texture: Arc<TextureData>) -> Self {
        Self {
            texture,
            wrap_s: WrapMode::Repeat,
            wrap_t: WrapMode::Repeat,
            repeat: Vec2::ONE,
        }
    }

    pub fn sampler_descriptor(&self) -> SamplerDescriptor {
        SamplerDescriptor {
            label: Some(format!("{} sampler", self.texture.name)),
            mag_filter: FilterMode::Linear,
            min_filter: FilterMode::Linear,
            mipmap_filter: FilterMode::Linear,
            address_mode_u: self.wrap_s.address_mode(),
            address_mode_v: self.wrap_t.address_mode(),
            address_mode_w: AddressMode::ClampToEdge,
            compare: None,
        }
    }
}

/// Physically-based material state
///
/// Colors are stored in linear space. Reflectivity is not stored: it is
/// derived from `ior` the same way the shader derives F0.
#[derive(Debug, Clone)]
pub struct PhysicalMaterial {
    pub name: String,
    pub color: Vec3,
    pub emissive: Vec3,
    pub roughness: f32,
    pub metalness: f32,
    pub ior: f32,
    pub specular_intensity: f32,
    pub specular_color: Vec3,
    pub sheen: f32,
    pub sheen_roughness: f32,
    pub sheen_color: Vec3,
    pub iridescence: f32,
    pub iridescence_ior: f32,
    pub clearcoat: f32,
    pub clearcoat_roughness: f32,
    pub opacity: f32,
    pub transparent: bool,
    pub flat_shading: bool,
    pub wireframe: bool,
    pub vertex_colors: bool,
    pub side: MaterialSide,
    pub displacement_scale: f32,
    pub normal_scale: f32,
    pub ao_map_intensity: f32,
    maps: [Option<MapBinding>; MapSlot::COUNT],
}

impl Default for PhysicalMaterial {
    fn default() -> Self {
        Self {
            name: "physical".to_string(),
            color: Vec3::ONE,
            emissive: Vec3::ZERO,
            roughness: 1.0,
            metalness: 0.0,
            ior: 1.5,
            specular_intensity: 1.0,
            specular_color: Vec3::ONE,
            sheen: 0.0,
            sheen_roughness: 1.0,
            sheen_color: Vec3::ZERO,
            iridescence: 0.0,
            iridescence_ior: 1.3,
            clearcoat: 0.0,
            clearcoat_roughness: 0.0,
            opacity: 1.0,
            transparent: false,
            flat_shading: false,
            wireframe: false,
            vertex_colors: false,
            side: MaterialSide::Front,
            displacement_scale: 1.0,
            normal_scale: 1.0,
            ao_map_intensity: 1.0,
            maps: Default::default(),
        }
    }
}

impl PhysicalMaterial {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_metalness(mut self, metalness: f32) -> Self {
        self.metalness = metalness;
        self
    }

    pub fn with_roughness(mut self, roughness: f32) -> Self {
        self.roughness = roughness;
        self
    }

    pub fn with_map(mut self, slot: MapSlot, binding: MapBinding) -> Self {
        self.set_map(slot, Some(binding));
        self
    }

    /// Specular reflectivity in `[0, 1]`, derived from the index of refraction.
    pub fn reflectivity(&self) -> f32 {
        reflectivity_for_ior(self.ior)
    }

    /// Set reflectivity by solving for the matching index of refraction.
    pub fn set_reflectivity(&mut self, reflectivity: f32) {
        self.ior = ior_for_reflectivity(reflectivity);
    }

    pub fn map(&self, slot: MapSlot) -> Option<&MapBinding> {
        self.maps[slot.index()].as_ref()
    }

    pub fn map_mut(&mut self, slot: MapSlot) -> Option<&mut MapBinding> {
        self.maps[slot.index()].as_mut()
    }

    pub fn set_map(&mut self, slot: MapSlot, binding: Option<MapBinding>) {
        self.maps[slot.index()] = binding;
    }

    pub fn maps(&self) -> impl Iterator<Item = (MapSlot, &MapBinding)> {
        MapSlot::ALL
            .into_iter()
            .filter_map(move |slot| self.map(slot).map(|m| (slot, m)))
    }

    /// Visit every bound map. Panel wrap and repeat edits go through here so
    /// that all slots change together.
    pub fn for_each_map_mut(&mut self, mut f: impl FnMut(MapSlot, &mut MapBinding)) {
        for (slot, binding) in MapSlot::ALL.into_iter().zip(self.maps.iter_mut()) {
            if let Some(binding) = binding {
                f(slot, binding);
            }
        }
    }

    pub fn bound_map_count(&self) -> usize {
        self.maps.iter().filter(|m| m.is_some()).count()
    }

    /// Whether the pipeline must blend this material.
    pub fn needs_blending(&self) -> bool {
        self.transparent
    }

    /// Create a uniform data struct for GPU
    pub fn uniform_data(&self) -> MaterialUniformData {
        let mut maps = [[0.0; 4]; MapSlot::COUNT];
        for (slot, binding) in self.maps() {
            maps[slot.index()] = [binding.repeat.x, binding.repeat.y, 1.0, 0.0];
        }

        MaterialUniformData {
            color: self.color.extend(self.opacity).to_array(),
            emissive: self.emissive.extend(1.0).to_array(),
            sheen: self.sheen_color.extend(self.sheen).to_array(),
            specular: self.specular_color.extend(self.specular_intensity).to_array(),
            pbr: [self.roughness, self.metalness, self.ior, self.clearcoat],
            layers: [
                self.iridescence,
                self.iridescence_ior,
                self.sheen_roughness,
                self.clearcoat_roughness,
            ],
            scales: [
                self.displacement_scale,
                self.normal_scale,
                self.ao_map_intensity,
                0.0,
            ],
            flags: [
                self.flat_shading as u32,
                self.vertex_colors as u32,
                self.transparent as u32,
                self.side.code(),
            ],
            maps,
        }
    }
}

/// Material uniform data for GPU
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct MaterialUniformData {
    pub color: [f32; 4],    // rgb=base color, a=opacity
    pub emissive: [f32; 4], // rgb=emissive
    pub sheen: [f32; 4],    // rgb=sheen color, a=sheen
    pub specular: [f32; 4], // rgb=specular color, a=intensity
    pub pbr: [f32; 4],      // roughness, metalness, ior, clearcoat
    pub layers: [f32; 4],   // iridescence, iridescence ior, sheen roughness, clearcoat roughness
    pub scales: [f32; 4],   // displacement, normal, ao intensity
    pub flags: [u32; 4],    // flat shading, vertex colors, transparent, side
    pub maps: [[f32; 4]; MapSlot::COUNT], // xy=repeat, z=bound
}

/// Reflectivity implied by an index of refraction.
pub fn reflectivity_for_ior(ior: f32) -> f32 {
    (2.5 * (ior - 1.0) / (ior + 1.0)).clamp(0.0, 1.0)
}

/// Index of refraction implied by a reflectivity.
pub fn ior_for_reflectivity(reflectivity: f32) -> f32 {
    let r = reflectivity.clamp(0.0, 1.0);
    (1.0 + 0.4 * r) / (1.0 - 0.4 * r)
}

/// Convert an sRGB-encoded 8-bit color to linear floats.
pub fn srgb_to_linear(rgb: [u8; 3]) -> Vec3 {
    fn channel(c: u8) -> f32 {
        let c = c as f32 / 255.0;
        if c <= 0.04045 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    }
    Vec3::new(channel(rgb[0]), channel(rgb[1]), channel(rgb[2]))
}

/// Convert a linear color back to 8-bit sRGB.
pub fn linear_to_srgb(color: Vec3) -> [u8; 3] {
    fn channel(c: f32) -> u8 {
        let c = c.clamp(0.0, 1.0);
        let s = if c <= 0.003_130_8 {
            c * 12.92
        } else {
            1.055 * c.powf(1.0 / 2.4) - 0.055
        };
        (s * 255.0).round() as u8
    }
    [channel(color.x), channel(color.y), channel(color.z)]
}

/// Split a `0xRRGGBB` value into bytes.
pub fn hex_to_rgb(hex: u32) -> [u8; 3] {
    [(hex >> 16) as u8, (hex >> 8) as u8, hex as u8]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texture() -> Arc<TextureData> {
        Arc::new(TextureData::white())
    }

    #[test]
    fn test_physical_defaults() {
        let m = PhysicalMaterial::default();
        assert_eq!(m.color, Vec3::ONE);
        assert_eq!(m.ior, 1.5);
        assert_eq!(m.specular_intensity, 1.0);
        assert_eq!(m.side, MaterialSide::Front);
        assert_eq!(m.bound_map_count(), 0);
    }

    #[test]
    fn test_reflectivity_ior_coupling() {
        let mut m = PhysicalMaterial::default();
        assert!((m.reflectivity() - 0.5).abs() < 1e-6);

        m.set_reflectivity(1.0);
        assert!((m.ior - 2.333_333).abs() < 1e-4);
        assert!((m.reflectivity() - 1.0).abs() < 1e-5);

        m.set_reflectivity(0.0);
        assert!((m.ior - 1.0).abs() < 1e-6);

        m.ior = 1.8;
        let r = m.reflectivity();
        m.set_reflectivity(r);
        assert!((m.ior - 1.8).abs() < 1e-4);
    }

    #[test]
    fn test_for_each_map_visits_only_bound() {
        let mut m = PhysicalMaterial::default()
            .with_map(MapSlot::Color, MapBinding::new(texture()))
            .with_map(MapSlot::Alpha, MapBinding::new(texture()));

        let mut visited = Vec::new();
        m.for_each_map_mut(|slot, binding| {
            binding.wrap_s = WrapMode::MirroredRepeat;
            visited.push(slot);
        });

        assert_eq!(visited, vec![MapSlot::Color, MapSlot::Alpha]);
        assert!(m.maps().all(|(_, b)| b.wrap_s == WrapMode::MirroredRepeat));
        assert!(m.map(MapSlot::Normal).is_none());
    }

    #[test]
    fn test_uniform_map_flags() {
        let mut binding = MapBinding::new(texture());
        binding.repeat = Vec2::new(2.0, 3.0);
        let m = PhysicalMaterial::default().with_map(MapSlot::Roughness, binding);

        let u = m.uniform_data();
        assert_eq!(u.maps[MapSlot::Roughness.index()], [2.0, 3.0, 1.0, 0.0]);
        assert_eq!(u.maps[MapSlot::Color.index()][2], 0.0);
        assert_eq!(std::mem::size_of::<MaterialUniformData>() % 16, 0);
    }

    #[test]
    fn test_side_cull_modes() {
        assert_eq!(MaterialSide::Front.cull_mode(), CullMode::Back);
        assert_eq!(MaterialSide::Back.cull_mode(), CullMode::Front);
        assert_eq!(MaterialSide::Double.cull_mode(), CullMode::None);
    }

    #[test]
    fn test_srgb_conversion() {
        assert_eq!(srgb_to_linear([255, 255, 255]), Vec3::ONE);
        assert_eq!(srgb_to_linear([0, 0, 0]), Vec3::ZERO);
        let grey = srgb_to_linear(hex_to_rgb(0x444444));
        assert!((grey.x - 0.0578).abs() < 1e-3);
        assert_eq!(linear_to_srgb(grey), [0x44, 0x44, 0x44]);
    }

    #[test]
    fn test_sampler_follows_wrap() {
        let mut binding = MapBinding::new(texture());
        binding.wrap_s = WrapMode::ClampToEdge;
        binding.wrap_t = WrapMode::MirroredRepeat;
        let desc = binding.sampler_descriptor();
        assert_eq!(desc.address_mode_u, AddressMode::ClampToEdge);
        assert_eq!(desc.address_mode_v, AddressMode::MirrorRepeat);
    }
}
