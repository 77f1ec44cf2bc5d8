//! glTF 2.0 export of the preview scene.
//!
//! Every visible object becomes a mesh node sharing one material. Texture
//! maps are re-encoded as PNG and stored in the binary buffer next to the
//! geometry. glTF packs metalness and roughness into one texture and keeps
//! opacity in the base color alpha, so those maps are merged on export.

use std::collections::BTreeMap;

use ::gltf::json as gj;
use base64::Engine as _;
use glam::{Quat, Vec3};
use serde_json::json;

use crate::backend::types::Vertex;
use crate::descriptor::MapSlot;
use crate::resources::{MapBinding, MaterialSide, Mesh, PhysicalMaterial, TextureData, WrapMode};
use crate::scene::{Camera, Lighting, PreviewObject, Scene};

use super::ExportError;

const LIGHTS_EXTENSION: &str = "KHR_lights_punctual";
const TEXTURE_TRANSFORM_EXTENSION: &str = "KHR_texture_transform";

/// glTF JSON with the buffer embedded as a base64 data URI.
pub(super) fn export_gltf(scene: &Scene, material: &PhysicalMaterial) -> Result<String, ExportError> {
    let mut ctx = ExportContext::new();
    ctx.build(scene, material)?;
    ctx.embed_buffer();
    Ok(ctx.root.to_string_pretty()?)
}

/// Binary glTF.
pub(super) fn export_glb(scene: &Scene, material: &PhysicalMaterial) -> Result<Vec<u8>, ExportError> {
    let mut ctx = ExportContext::new();
    ctx.build(scene, material)?;
    ctx.finalize_buffer();
    ctx.to_glb()
}

struct ExportContext {
    root: gj::Root,
    buffer_data: Vec<u8>,
}

impl ExportContext {
    fn new() -> Self {
        let mut root = gj::Root::default();
        root.asset.generator = Some(format!("material-preview {}", env!("CARGO_PKG_VERSION")));
        Self {
            root,
            buffer_data: Vec::new(),
        }
    }

    fn build(&mut self, scene: &Scene, material: &PhysicalMaterial) -> Result<(), ExportError> {
        let material_idx = self.build_material(material)?;

        let mut nodes = Vec::new();
        for object in scene.visible_objects() {
            nodes.push(self.build_object(object, material_idx));
        }
        nodes.push(self.build_camera(&scene.camera));
        nodes.extend(self.build_lights(&scene.lighting)?);

        self.root.scenes.push(gj::Scene {
            name: Some("Material Preview".into()),
            nodes: nodes.into_iter().map(gj::Index::new).collect(),
            extensions: None,
            extras: gj::Extras::default(),
        });
        self.root.scene = Some(gj::Index::new(0));
        Ok(())
    }

    // -- Material ------------------------------------------------------------

    fn build_material(&mut self, material: &PhysicalMaterial) -> Result<u32, ExportError> {
        let base_color_texture = match (material.map(MapSlot::Color), material.map(MapSlot::Alpha)) {
            (None, None) => None,
            (color, alpha) => {
                let merged = merge_base_color(
                    color.map(|b| b.texture.as_ref()),
                    alpha.map(|b| b.texture.as_ref()),
                );
                let binding = color.or(alpha);
                Some(self.push_texture(&merged, binding)?)
            }
        };

        let metallic_roughness_texture =
            match (material.map(MapSlot::Metalness), material.map(MapSlot::Roughness)) {
                (None, None) => None,
                (metalness, roughness) => {
                    let merged = merge_metallic_roughness(
                        metalness.map(|b| b.texture.as_ref()),
                        roughness.map(|b| b.texture.as_ref()),
                    );
                    let binding = roughness.or(metalness);
                    Some(self.push_texture(&merged, binding)?)
                }
            };

        let normal_texture = match material.map(MapSlot::Normal) {
            Some(binding) => {
                let info = self.push_texture(&binding.texture, Some(binding))?;
                Some(gj::material::NormalTexture {
                    index: info.index,
                    scale: material.normal_scale,
                    tex_coord: 0,
                    extensions: None,
                    extras: gj::Extras::default(),
                })
            }
            None => None,
        };

        let occlusion_texture = match material.map(MapSlot::AmbientOcclusion) {
            Some(binding) => {
                let info = self.push_texture(&binding.texture, Some(binding))?;
                Some(gj::material::OcclusionTexture {
                    index: info.index,
                    strength: gj::material::StrengthFactor(material.ao_map_intensity),
                    tex_coord: 0,
                    extensions: None,
                    extras: gj::Extras::default(),
                })
            }
            None => None,
        };

        if material.map(MapSlot::Displacement).is_some() {
            log::debug!("Displacement map has no glTF counterpart; skipped");
        }

        let alpha_mode = if material.needs_blending() {
            gj::material::AlphaMode::Blend
        } else {
            gj::material::AlphaMode::Opaque
        };
        if material.side == MaterialSide::Back {
            log::debug!("Back-side culling exported as single-sided");
        }

        let pbr = gj::material::PbrMetallicRoughness {
            base_color_factor: gj::material::PbrBaseColorFactor([
                material.color.x,
                material.color.y,
                material.color.z,
                material.opacity,
            ]),
            base_color_texture,
            metallic_factor: gj::material::StrengthFactor(material.metalness),
            roughness_factor: gj::material::StrengthFactor(material.roughness),
            metallic_roughness_texture,
            extensions: None,
            extras: gj::Extras::default(),
        };

        let idx = self.root.materials.len() as u32;
        self.root.materials.push(gj::Material {
            name: Some(material.name.clone()),
            alpha_cutoff: None,
            alpha_mode: gj::validation::Checked::Valid(alpha_mode),
            double_sided: material.side == MaterialSide::Double,
            pbr_metallic_roughness: pbr,
            normal_texture,
            occlusion_texture,
            emissive_texture: None,
            emissive_factor: gj::material::EmissiveFactor(material.emissive.to_array()),
            extensions: None,
            extras: gj::Extras::default(),
        });
        Ok(idx)
    }

    /// Image, sampler and texture for one map. The sampler and the texture
    /// transform follow `binding`.
    fn push_texture(
        &mut self,
        texture: &TextureData,
        binding: Option<&MapBinding>,
    ) -> Result<gj::texture::Info, ExportError> {
        let png = texture.encode_png()?;
        let view_idx = self.push_buffer_view(&png, None);

        let image_idx = self.root.images.len() as u32;
        self.root.images.push(gj::Image {
            buffer_view: Some(gj::Index::new(view_idx)),
            mime_type: Some(gj::image::MimeType("image/png".into())),
            name: Some(texture.name.clone()),
            uri: None,
            extensions: None,
            extras: gj::Extras::default(),
        });

        let (wrap_s, wrap_t) = binding
            .map(|b| (b.wrap_s, b.wrap_t))
            .unwrap_or((WrapMode::Repeat, WrapMode::Repeat));
        let sampler_idx = self.root.samplers.len() as u32;
        self.root.samplers.push(gj::texture::Sampler {
            mag_filter: Some(gj::validation::Checked::Valid(gj::texture::MagFilter::Linear)),
            min_filter: Some(gj::validation::Checked::Valid(
                gj::texture::MinFilter::LinearMipmapLinear,
            )),
            wrap_s: gj::validation::Checked::Valid(map_wrapping(wrap_s)),
            wrap_t: gj::validation::Checked::Valid(map_wrapping(wrap_t)),
            name: None,
            extensions: None,
            extras: gj::Extras::default(),
        });

        let texture_idx = self.root.textures.len() as u32;
        self.root.textures.push(gj::Texture {
            name: Some(texture.name.clone()),
            sampler: Some(gj::Index::new(sampler_idx)),
            source: gj::Index::new(image_idx),
            extensions: None,
            extras: gj::Extras::default(),
        });

        let extensions = match binding {
            Some(b) if b.repeat != glam::Vec2::ONE => {
                self.use_extension(TEXTURE_TRANSFORM_EXTENSION);
                Some(serde_json::from_value(json!({
                    TEXTURE_TRANSFORM_EXTENSION: {
                        "offset": [0.0, 0.0],
                        "rotation": 0.0,
                        "scale": [b.repeat.x, b.repeat.y],
                        "texCoord": 0,
                    }
                }))?)
            }
            _ => None,
        };

        Ok(gj::texture::Info {
            index: gj::Index::new(texture_idx),
            tex_coord: 0,
            extensions,
            extras: gj::Extras::default(),
        })
    }

    // -- Nodes ---------------------------------------------------------------

    fn build_object(&mut self, object: &PreviewObject, material_idx: u32) -> u32 {
        let mesh_idx = self.build_mesh(&object.mesh, material_idx);
        let transform = &object.transform;
        self.push_node(gj::Node {
            name: Some(object.kind.name().to_string()),
            mesh: Some(gj::Index::new(mesh_idx)),
            translation: Some(transform.position.to_array()),
            rotation: Some(gj::scene::UnitQuaternion(transform.rotation.to_array())),
            scale: (transform.scale != Vec3::ONE).then(|| transform.scale.to_array()),
            ..empty_node()
        })
    }

    fn build_mesh(&mut self, mesh: &Mesh, material_idx: u32) -> u32 {
        let stride = std::mem::size_of::<Vertex>() as u32;
        let vertex_count = mesh.vertex_count() as u32;
        let vertex_view = self.push_buffer_view_with_stride(
            mesh.vertex_bytes(),
            stride,
            Some(gj::buffer::Target::ArrayBuffer),
        );

        let (min, max) = match mesh.bounds() {
            Some((min, max)) => (
                Some(json_f32_array(&min.to_array())),
                Some(json_f32_array(&max.to_array())),
            ),
            None => (None, None),
        };

        let mut attributes = BTreeMap::new();
        let layout = [
            (gj::mesh::Semantic::Positions, 0, gj::accessor::Type::Vec3),
            (gj::mesh::Semantic::Normals, 12, gj::accessor::Type::Vec3),
            (gj::mesh::Semantic::TexCoords(0), 24, gj::accessor::Type::Vec2),
            (gj::mesh::Semantic::Tangents, 32, gj::accessor::Type::Vec4),
        ];
        for (semantic, offset, type_) in layout {
            let (min, max) = if semantic == gj::mesh::Semantic::Positions {
                (min.clone(), max.clone())
            } else {
                (None, None)
            };
            let accessor = self.push_accessor(
                vertex_view,
                offset,
                vertex_count,
                gj::accessor::ComponentType::F32,
                type_,
                min,
                max,
            );
            attributes.insert(gj::validation::Checked::Valid(semantic), gj::Index::new(accessor));
        }

        let index_view = self.push_buffer_view(
            mesh.index_bytes(),
            Some(gj::buffer::Target::ElementArrayBuffer),
        );
        let indices = self.push_accessor(
            index_view,
            0,
            mesh.index_count() as u32,
            gj::accessor::ComponentType::U32,
            gj::accessor::Type::Scalar,
            None,
            None,
        );

        let idx = self.root.meshes.len() as u32;
        self.root.meshes.push(gj::Mesh {
            name: Some(mesh.name.clone()),
            primitives: vec![gj::mesh::Primitive {
                attributes,
                indices: Some(gj::Index::new(indices)),
                material: Some(gj::Index::new(material_idx)),
                mode: gj::validation::Checked::Valid(gj::mesh::Mode::Triangles),
                targets: None,
                extensions: None,
                extras: gj::Extras::default(),
            }],
            weights: None,
            extensions: None,
            extras: gj::Extras::default(),
        });
        idx
    }

    fn build_camera(&mut self, camera: &Camera) -> u32 {
        let camera_idx = self.root.cameras.len() as u32;
        self.root.cameras.push(gj::Camera {
            name: Some("Preview Camera".into()),
            type_: gj::validation::Checked::Valid(gj::camera::Type::Perspective),
            orthographic: None,
            perspective: Some(gj::camera::Perspective {
                aspect_ratio: Some(camera.projection.aspect),
                yfov: camera.projection.fov_y,
                zfar: Some(camera.projection.far),
                znear: camera.projection.near,
                extensions: None,
                extras: gj::Extras::default(),
            }),
            extensions: None,
            extras: gj::Extras::default(),
        });

        let (_, rotation, translation) = camera.world_matrix().to_scale_rotation_translation();
        self.push_node(gj::Node {
            name: Some("Preview Camera".into()),
            camera: Some(gj::Index::new(camera_idx)),
            translation: Some(translation.to_array()),
            rotation: Some(gj::scene::UnitQuaternion(rotation.normalize().to_array())),
            ..empty_node()
        })
    }

    /// Directional lights as `KHR_lights_punctual`. Lights shine down the
    /// node's -Z axis.
    fn build_lights(&mut self, lighting: &Lighting) -> Result<Vec<u32>, ExportError> {
        if lighting.directional.is_empty() {
            return Ok(Vec::new());
        }
        self.use_extension(LIGHTS_EXTENSION);

        let mut lights = Vec::new();
        let mut nodes = Vec::new();
        for (i, light) in lighting.directional.iter().enumerate() {
            let name = format!("Key Light {}", i + 1);
            lights.push(json!({
                "name": name,
                "type": "directional",
                "color": light.color.to_array(),
                "intensity": light.intensity,
            }));

            let direction = light.direction();
            let rotation = if direction == Vec3::ZERO {
                Quat::IDENTITY
            } else {
                Quat::from_rotation_arc(Vec3::NEG_Z, direction)
            };
            let extensions = serde_json::from_value(json!({
                LIGHTS_EXTENSION: { "light": i }
            }))?;
            nodes.push(self.push_node(gj::Node {
                name: Some(name),
                translation: Some(light.position.to_array()),
                rotation: Some(gj::scene::UnitQuaternion(rotation.to_array())),
                extensions: Some(extensions),
                ..empty_node()
            }));
        }

        self.root.extensions = Some(serde_json::from_value(json!({
            LIGHTS_EXTENSION: { "lights": lights }
        }))?);
        Ok(nodes)
    }

    fn push_node(&mut self, node: gj::Node) -> u32 {
        let idx = self.root.nodes.len() as u32;
        self.root.nodes.push(node);
        idx
    }

    fn use_extension(&mut self, name: &str) {
        if !self.root.extensions_used.iter().any(|used| used == name) {
            self.root.extensions_used.push(name.to_string());
        }
    }

    // -- Buffer/accessor helpers ---------------------------------------------

    fn align_buffer(&mut self) {
        let padding = (4 - (self.buffer_data.len() % 4)) % 4;
        self.buffer_data.extend(std::iter::repeat_n(0u8, padding));
    }

    fn push_buffer_view(&mut self, data: &[u8], target: Option<gj::buffer::Target>) -> u32 {
        self.push_view(data, None, target)
    }

    fn push_buffer_view_with_stride(
        &mut self,
        data: &[u8],
        stride: u32,
        target: Option<gj::buffer::Target>,
    ) -> u32 {
        self.push_view(data, Some(stride), target)
    }

    fn push_view(
        &mut self,
        data: &[u8],
        stride: Option<u32>,
        target: Option<gj::buffer::Target>,
    ) -> u32 {
        self.align_buffer();
        let offset = self.buffer_data.len();
        self.buffer_data.extend_from_slice(data);

        let view_idx = self.root.buffer_views.len() as u32;
        self.root.buffer_views.push(gj::buffer::View {
            buffer: gj::Index::new(0),
            byte_offset: Some(gj::validation::USize64(offset as u64)),
            byte_length: gj::validation::USize64(data.len() as u64),
            byte_stride: stride.map(|s| gj::buffer::Stride(s as usize)),
            target: target.map(gj::validation::Checked::Valid),
            name: None,
            extensions: None,
            extras: gj::Extras::default(),
        });
        view_idx
    }

    #[allow(clippy::too_many_arguments)]
    fn push_accessor(
        &mut self,
        buffer_view: u32,
        byte_offset: u32,
        count: u32,
        component_type: gj::accessor::ComponentType,
        type_: gj::accessor::Type,
        min: Option<gj::Value>,
        max: Option<gj::Value>,
    ) -> u32 {
        let acc_idx = self.root.accessors.len() as u32;
        self.root.accessors.push(gj::Accessor {
            buffer_view: Some(gj::Index::new(buffer_view)),
            byte_offset: Some(gj::validation::USize64(byte_offset as u64)),
            count: gj::validation::USize64(count as u64),
            component_type: gj::validation::Checked::Valid(gj::accessor::GenericComponentType(
                component_type,
            )),
            type_: gj::validation::Checked::Valid(type_),
            min,
            max,
            normalized: false,
            name: None,
            sparse: None,
            extensions: None,
            extras: gj::Extras::default(),
        });
        acc_idx
    }

    fn finalize_buffer(&mut self) {
        self.push_buffer(None);
    }

    /// Store the buffer inline as a data URI.
    fn embed_buffer(&mut self) {
        self.align_buffer();
        let encoded = base64::engine::general_purpose::STANDARD.encode(&self.buffer_data);
        self.push_buffer(Some(format!("data:application/octet-stream;base64,{encoded}")));
    }

    fn push_buffer(&mut self, uri: Option<String>) {
        if !self.buffer_data.is_empty() {
            self.root.buffers.push(gj::Buffer {
                byte_length: gj::validation::USize64(self.buffer_data.len() as u64),
                name: None,
                uri,
                extensions: None,
                extras: gj::Extras::default(),
            });
        }
    }

    // -- GLB assembly --------------------------------------------------------

    fn to_glb(&self) -> Result<Vec<u8>, ExportError> {
        let json_bytes = self.root.to_vec()?;

        let json_pad = (4 - (json_bytes.len() % 4)) % 4;
        let json_chunk_len = json_bytes.len() + json_pad;

        let bin_pad = (4 - (self.buffer_data.len() % 4)) % 4;
        let bin_chunk_len = self.buffer_data.len() + bin_pad;

        let has_bin = !self.buffer_data.is_empty();
        let total_length = 12 + 8 + json_chunk_len + if has_bin { 8 + bin_chunk_len } else { 0 };

        let mut glb = Vec::with_capacity(total_length);

        // Header
        glb.extend_from_slice(&0x46546C67u32.to_le_bytes()); // magic "glTF"
        glb.extend_from_slice(&2u32.to_le_bytes());
        glb.extend_from_slice(&(total_length as u32).to_le_bytes());

        // JSON chunk
        glb.extend_from_slice(&(json_chunk_len as u32).to_le_bytes());
        glb.extend_from_slice(&0x4E4F534Au32.to_le_bytes()); // "JSON"
        glb.extend_from_slice(&json_bytes);
        glb.extend(std::iter::repeat_n(b' ', json_pad));

        // BIN chunk
        if has_bin {
            glb.extend_from_slice(&(bin_chunk_len as u32).to_le_bytes());
            glb.extend_from_slice(&0x004E4942u32.to_le_bytes()); // "BIN\0"
            glb.extend_from_slice(&self.buffer_data);
            glb.extend(std::iter::repeat_n(0u8, bin_pad));
        }

        Ok(glb)
    }
}

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

fn empty_node() -> gj::Node {
    gj::Node {
        camera: None,
        children: None,
        extensions: None,
        extras: gj::Extras::default(),
        matrix: None,
        mesh: None,
        name: None,
        rotation: None,
        scale: None,
        translation: None,
        skin: None,
        weights: None,
    }
}

fn map_wrapping(mode: WrapMode) -> gj::texture::WrappingMode {
    match mode {
        WrapMode::ClampToEdge => gj::texture::WrappingMode::ClampToEdge,
        WrapMode::Repeat => gj::texture::WrappingMode::Repeat,
        WrapMode::MirroredRepeat => gj::texture::WrappingMode::MirroredRepeat,
    }
}

fn json_f32_array(values: &[f32]) -> gj::Value {
    gj::Value::Array(values.iter().map(|&v| gj::Value::from(v as f64)).collect())
}

/// Texel of `texture` nearest to the normalized coordinate of (x, y) in a
/// `width` x `height` image.
fn sample_nearest(texture: &TextureData, x: u32, y: u32, width: u32, height: u32) -> [u8; 4] {
    let sx = (x as u64 * texture.width as u64 / width.max(1) as u64) as usize;
    let sy = (y as u64 * texture.height as u64 / height.max(1) as u64) as usize;
    let i = (sy * texture.width as usize + sx) * 4;
    match texture.data.get(i..i + 4) {
        Some(texel) => [texel[0], texel[1], texel[2], texel[3]],
        None => [255; 4],
    }
}

fn merge_textures(
    name: String,
    primary: &TextureData,
    f: impl Fn(u32, u32, u32, u32) -> [u8; 4],
) -> TextureData {
    let (width, height) = (primary.width, primary.height);
    let mut data = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            data.extend_from_slice(&f(x, y, width, height));
        }
    }
    TextureData {
        width,
        height,
        format: primary.format,
        data,
        name,
    }
}

/// Color map RGB with the alpha map's green channel as alpha.
fn merge_base_color(color: Option<&TextureData>, alpha: Option<&TextureData>) -> TextureData {
    match (color, alpha) {
        (Some(color), None) => color.clone(),
        (color, Some(alpha)) => {
            let primary = color.unwrap_or(alpha);
            merge_textures(format!("{}_base_color", primary.name), primary, |x, y, w, h| {
                let rgb = color.map_or([255; 4], |c| sample_nearest(c, x, y, w, h));
                let a = sample_nearest(alpha, x, y, w, h)[1];
                [rgb[0], rgb[1], rgb[2], a]
            })
        }
        (None, None) => TextureData::white(),
    }
}

/// Roughness in green and metalness in blue, matching how the maps are read.
fn merge_metallic_roughness(
    metalness: Option<&TextureData>,
    roughness: Option<&TextureData>,
) -> TextureData {
    let Some(primary) = roughness.or(metalness) else {
        return TextureData::white();
    };
    merge_textures(format!("{}_metallic_roughness", primary.name), primary, |x, y, w, h| {
        let g = roughness.map_or(255, |r| sample_nearest(r, x, y, w, h)[1]);
        let b = metalness.map_or(255, |m| sample_nearest(m, x, y, w, h)[2]);
        [255, g, b, 255]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::MeshLibrary;
    use std::sync::Arc;

    fn scene() -> Scene {
        let mut scene = Scene::new();
        scene.populate(&MeshLibrary::new());
        scene
    }

    fn checker(name: &str) -> Arc<TextureData> {
        Arc::new(TextureData {
            width: 2,
            height: 1,
            format: crate::backend::types::TextureFormat::Rgba8Unorm,
            data: vec![10, 20, 30, 40, 50, 60, 70, 80],
            name: name.into(),
        })
    }

    #[test]
    fn test_glb_header() {
        let glb = export_glb(&scene(), &PhysicalMaterial::new("m")).unwrap();
        assert_eq!(&glb[0..4], b"glTF");
        assert_eq!(u32::from_le_bytes([glb[4], glb[5], glb[6], glb[7]]), 2);
        let total = u32::from_le_bytes([glb[8], glb[9], glb[10], glb[11]]) as usize;
        assert_eq!(total, glb.len());
        assert_eq!(glb.len() % 4, 0);
    }

    #[test]
    fn test_gltf_embeds_buffer() {
        let text = export_gltf(&scene(), &PhysicalMaterial::new("m")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        let uri = value["buffers"][0]["uri"].as_str().unwrap();
        assert!(uri.starts_with("data:application/octet-stream;base64,"));
        assert_eq!(value["meshes"].as_array().unwrap().len(), 3);
        assert_eq!(value["cameras"].as_array().unwrap().len(), 1);
        assert_eq!(
            value["extensions"]["KHR_lights_punctual"]["lights"]
                .as_array()
                .unwrap()
                .len(),
            3
        );
    }

    #[test]
    fn test_hidden_objects_are_skipped() {
        let mut scene = scene();
        scene.objects[1].visible = false;
        let text = export_gltf(&scene, &PhysicalMaterial::new("m")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["meshes"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_maps_become_textures() {
        let mut binding = MapBinding::new(checker("wood.png"));
        binding.wrap_s = WrapMode::MirroredRepeat;
        binding.repeat = glam::Vec2::new(2.0, 3.0);
        let material = PhysicalMaterial::new("m")
            .with_map(MapSlot::Color, binding)
            .with_map(MapSlot::Roughness, MapBinding::new(checker("rough.png")));

        let text = export_gltf(&scene(), &material).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["images"].as_array().unwrap().len(), 2);
        assert_eq!(value["samplers"][0]["wrapS"], 33648);
        let pbr = &value["materials"][0]["pbrMetallicRoughness"];
        assert_eq!(pbr["baseColorTexture"]["index"], 0);
        assert_eq!(pbr["metallicRoughnessTexture"]["index"], 1);
        assert_eq!(
            pbr["baseColorTexture"]["extensions"]["KHR_texture_transform"]["scale"],
            json!([2.0, 3.0])
        );
    }

    #[test]
    fn test_merge_metallic_roughness_channels() {
        let merged = merge_metallic_roughness(Some(&checker("m")), Some(&checker("r")));
        assert_eq!((merged.width, merged.height), (2, 1));
        assert_eq!(&merged.data[0..4], &[255, 20, 30, 255]);
        assert_eq!(&merged.data[4..8], &[255, 60, 70, 255]);
    }

    #[test]
    fn test_merge_base_color_alpha() {
        let merged = merge_base_color(Some(&checker("c")), Some(&checker("a")));
        assert_eq!(&merged.data[0..4], &[10, 20, 30, 20]);
    }
}
