//! Renders the preview scene with the physical material pipeline

use crate::backend::types::*;
use crate::backend::wgpu_backend::WgpuBackend;
use crate::descriptor::MapSlot;
use crate::resources::{srgb_to_linear, GpuTexture, Mesh, PhysicalMaterial, TextureData};
use crate::scene::{CameraUniformData, LightingUniformData, ObjectKind, Scene, TransformUniformData};
use bytemuck::{Pod, Zeroable};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use winit::window::Window as WinitWindow;

const PHYSICAL_SHADER: &str = include_str!("shaders/physical.wgsl");
const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;

/// First texture binding of the material group; samplers follow the textures.
const MATERIAL_TEXTURE_BINDING: u32 = 1;
const MATERIAL_SAMPLER_BINDING: u32 = MATERIAL_TEXTURE_BINDING + MapSlot::COUNT as u32;

/// Per-target shader parameters
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct FrameParams {
    /// x: 1 when the shader must encode sRGB itself
    output: [f32; 4],
}

impl FrameParams {
    fn for_format(format: TextureFormat) -> Self {
        let encode = if format.is_srgb() { 0.0 } else { 1.0 };
        Self {
            output: [encode, 0.0, 0.0, 0.0],
        }
    }
}

/// GPU resources for a mesh
struct GpuMesh {
    /// Keeps the address used as cache key alive
    _mesh: Arc<Mesh>,
    vertex_buffer: BufferHandle,
    index_buffer: BufferHandle,
    index_count: u32,
}

/// Per-object GPU resources
struct GpuObject {
    transform_buffer: BufferHandle,
    bind_group: BindGroupHandle,
}

/// Bind group for the current material revision
struct GpuMaterial {
    revision: u64,
    bind_group: BindGroupHandle,
    samplers: Vec<SamplerHandle>,
}

struct CachedTexture {
    _data: Arc<TextureData>,
    gpu: GpuTexture,
}

struct DepthTarget {
    texture: TextureHandle,
    view: TextureViewHandle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PipelineKey {
    format: TextureFormat,
    cull_mode: CullMode,
    polygon_mode: PolygonMode,
    blend: bool,
}

impl PipelineKey {
    fn new(format: TextureFormat, material: &PhysicalMaterial) -> Self {
        Self {
            format,
            cull_mode: material.side.cull_mode(),
            polygon_mode: if material.wireframe {
                PolygonMode::Line
            } else {
                PolygonMode::Fill
            },
            blend: material.needs_blending(),
        }
    }
}

/// An offscreen frame read back to the CPU as tightly packed RGBA8.
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// The preview renderer
pub struct Engine {
    backend: WgpuBackend,
    width: u32,
    height: u32,

    frame_layout: BindGroupLayoutHandle,
    object_layout: BindGroupLayoutHandle,
    material_layout: BindGroupLayoutHandle,

    camera_buffer: BufferHandle,
    lighting_buffer: BufferHandle,
    frame_params_buffer: BufferHandle,
    frame_bind_group: BindGroupHandle,
    material_buffer: BufferHandle,

    pipelines: HashMap<PipelineKey, RenderPipelineHandle>,
    meshes: HashMap<usize, GpuMesh>,
    objects: HashMap<ObjectKind, GpuObject>,
    textures: HashMap<usize, CachedTexture>,
    /// Bound to every empty map slot
    placeholder: GpuTexture,
    material: Option<GpuMaterial>,
    depth: DepthTarget,
    wireframe_warned: bool,
}

impl Engine {
    pub fn new(window: Arc<WinitWindow>, vsync: bool) -> BackendResult<Self> {
        let backend = WgpuBackend::new(Arc::clone(&window), vsync)?;
        Self::from_backend(backend)
    }

    fn from_backend(mut backend: WgpuBackend) -> BackendResult<Self> {
        let (width, height) = backend.surface_size();

        let uniform = |binding: u32, visibility: ShaderStageFlags| BindGroupLayoutEntry {
            binding,
            visibility,
            ty: BindingType::UniformBuffer,
        };

        let frame_layout = backend.create_bind_group_layout(&[
            uniform(0, ShaderStageFlags::VERTEX_FRAGMENT),
            uniform(1, ShaderStageFlags::FRAGMENT),
            uniform(2, ShaderStageFlags::FRAGMENT),
        ])?;
        let object_layout =
            backend.create_bind_group_layout(&[uniform(0, ShaderStageFlags::VERTEX)])?;

        // Displacement is sampled in the vertex stage, so every map is visible to both
        let mut material_entries = vec![uniform(0, ShaderStageFlags::VERTEX_FRAGMENT)];
        for slot in MapSlot::ALL {
            material_entries.push(BindGroupLayoutEntry {
                binding: MATERIAL_TEXTURE_BINDING + slot.index() as u32,
                visibility: ShaderStageFlags::VERTEX_FRAGMENT,
                ty: BindingType::Texture,
            });
        }
        for slot in MapSlot::ALL {
            material_entries.push(BindGroupLayoutEntry {
                binding: MATERIAL_SAMPLER_BINDING + slot.index() as u32,
                visibility: ShaderStageFlags::VERTEX_FRAGMENT,
                ty: BindingType::Sampler,
            });
        }
        let material_layout = backend.create_bind_group_layout(&material_entries)?;

        let uniform_buffer = |backend: &mut WgpuBackend, label: &str, size: usize| {
            backend.create_buffer(&BufferDescriptor {
                label: Some(label.into()),
                size: size as u64,
                usage: BufferUsage::UNIFORM | BufferUsage::COPY_DST,
            })
        };
        let camera_buffer = uniform_buffer(
            &mut backend,
            "Camera Buffer",
            std::mem::size_of::<CameraUniformData>(),
        )?;
        let lighting_buffer = uniform_buffer(
            &mut backend,
            "Lighting Buffer",
            std::mem::size_of::<LightingUniformData>(),
        )?;
        let frame_params_buffer = uniform_buffer(
            &mut backend,
            "Frame Params Buffer",
            std::mem::size_of::<FrameParams>(),
        )?;
        let material_buffer = uniform_buffer(
            &mut backend,
            "Material Buffer",
            std::mem::size_of::<crate::resources::MaterialUniformData>(),
        )?;

        let whole = |buffer: BufferHandle| BindGroupEntry::Buffer {
            buffer,
            offset: 0,
            size: None,
        };
        let frame_bind_group = backend.create_bind_group(
            frame_layout,
            &[
                (0, whole(camera_buffer)),
                (1, whole(lighting_buffer)),
                (2, whole(frame_params_buffer)),
            ],
        )?;

        let placeholder = GpuTexture::create(&mut backend, &TextureData::white())?;
        let depth = Self::create_depth(&mut backend, width, height)?;

        log::info!("Engine ready ({}x{}, {:?})", width, height, backend.swapchain_format());

        Ok(Self {
            backend,
            width,
            height,
            frame_layout,
            object_layout,
            material_layout,
            camera_buffer,
            lighting_buffer,
            frame_params_buffer,
            frame_bind_group,
            material_buffer,
            pipelines: HashMap::new(),
            meshes: HashMap::new(),
            objects: HashMap::new(),
            textures: HashMap::new(),
            placeholder,
            material: None,
            depth,
            wireframe_warned: false,
        })
    }

    fn create_depth(backend: &mut WgpuBackend, width: u32, height: u32) -> BackendResult<DepthTarget> {
        let texture = backend.create_texture(&TextureDescriptor {
            label: Some("Depth Buffer".into()),
            width,
            height,
            format: DEPTH_FORMAT,
            usage: TextureUsage::RENDER_ATTACHMENT,
        })?;
        let view = backend.create_texture_view(texture)?;
        Ok(DepthTarget { texture, view })
    }

    /// Handle window resize
    pub fn resize(&mut self, width: u32, height: u32) -> BackendResult<()> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.backend.resize(width, height);

        // The surface may be clamped by device limits
        let (actual_width, actual_height) = self.backend.surface_size();
        if (actual_width, actual_height) == (self.width, self.height) {
            return Ok(());
        }
        self.width = actual_width;
        self.height = actual_height;

        self.backend.destroy_texture_view(self.depth.view);
        self.backend.destroy_texture(self.depth.texture);
        self.depth = Self::create_depth(&mut self.backend, actual_width, actual_height)?;
        Ok(())
    }

    /// Upload whatever the scene and material need this frame.
    fn prepare(
        &mut self,
        scene: &Scene,
        material: &PhysicalMaterial,
        revision: u64,
        format: TextureFormat,
    ) -> BackendResult<()> {
        self.backend
            .write_buffer(self.camera_buffer, 0, bytemuck::bytes_of(&scene.camera.uniform_data()));
        self.backend.write_buffer(
            self.lighting_buffer,
            0,
            bytemuck::bytes_of(&scene.lighting.uniform_data()),
        );
        self.backend.write_buffer(
            self.frame_params_buffer,
            0,
            bytemuck::bytes_of(&FrameParams::for_format(format)),
        );

        for object in &scene.objects {
            self.upload_mesh(&object.mesh)?;
            if !self.objects.contains_key(&object.kind) {
                let created = self.create_object(object.kind)?;
                self.objects.insert(object.kind, created);
            }
            if let Some(gpu_object) = self.objects.get(&object.kind) {
                self.backend.write_buffer(
                    gpu_object.transform_buffer,
                    0,
                    bytemuck::bytes_of(&object.transform.uniform_data()),
                );
            }
        }

        if self.material.as_ref().map(|m| m.revision) != Some(revision) {
            self.update_material(material, revision)?;
        }
        Ok(())
    }

    fn upload_mesh(&mut self, mesh: &Arc<Mesh>) -> BackendResult<()> {
        let key = Arc::as_ptr(mesh) as usize;
        if self.meshes.contains_key(&key) {
            return Ok(());
        }

        let vertex_data = mesh.vertex_bytes();
        let index_data = mesh.index_bytes();
        let vertex_buffer = self.backend.create_buffer_init(
            &BufferDescriptor {
                label: Some(format!("{} vertices", mesh.name)),
                size: vertex_data.len() as u64,
                usage: BufferUsage::VERTEX,
            },
            vertex_data,
        )?;
        let index_buffer = self.backend.create_buffer_init(
            &BufferDescriptor {
                label: Some(format!("{} indices", mesh.name)),
                size: index_data.len() as u64,
                usage: BufferUsage::INDEX,
            },
            index_data,
        )?;
        log::debug!(
            "Uploaded {} ({} vertices, {} triangles)",
            mesh.name,
            mesh.vertex_count(),
            mesh.triangle_count()
        );

        self.meshes.insert(
            key,
            GpuMesh {
                _mesh: Arc::clone(mesh),
                vertex_buffer,
                index_buffer,
                index_count: mesh.index_count() as u32,
            },
        );
        Ok(())
    }

    fn create_object(&mut self, kind: ObjectKind) -> BackendResult<GpuObject> {
        let transform_buffer = self.backend.create_buffer(&BufferDescriptor {
            label: Some(format!("{} transform", kind.name())),
            size: std::mem::size_of::<TransformUniformData>() as u64,
            usage: BufferUsage::UNIFORM | BufferUsage::COPY_DST,
        })?;
        let bind_group = self.backend.create_bind_group(
            self.object_layout,
            &[(
                0,
                BindGroupEntry::Buffer {
                    buffer: transform_buffer,
                    offset: 0,
                    size: None,
                },
            )],
        )?;
        Ok(GpuObject {
            transform_buffer,
            bind_group,
        })
    }

    /// Rebuild the material bind group, uploading new maps and dropping
    /// textures the material no longer references.
    fn update_material(&mut self, material: &PhysicalMaterial, revision: u64) -> BackendResult<()> {
        self.backend
            .write_buffer(self.material_buffer, 0, bytemuck::bytes_of(&material.uniform_data()));

        let mut used = HashSet::new();
        let mut views = [self.placeholder.view; MapSlot::COUNT];
        let mut samplers = Vec::with_capacity(MapSlot::COUNT);

        for slot in MapSlot::ALL {
            let sampler_desc = match material.map(slot) {
                Some(binding) => {
                    let key = Arc::as_ptr(&binding.texture) as usize;
                    if !self.textures.contains_key(&key) {
                        let gpu = GpuTexture::create(&mut self.backend, &binding.texture)?;
                        self.textures.insert(
                            key,
                            CachedTexture {
                                _data: Arc::clone(&binding.texture),
                                gpu,
                            },
                        );
                    }
                    used.insert(key);
                    if let Some(cached) = self.textures.get(&key) {
                        views[slot.index()] = cached.gpu.view;
                    }
                    binding.sampler_descriptor()
                }
                None => SamplerDescriptor {
                    address_mode_u: AddressMode::Repeat,
                    address_mode_v: AddressMode::Repeat,
                    ..Default::default()
                },
            };
            samplers.push(self.backend.create_sampler(&sampler_desc)?);
        }

        let mut entries = vec![(
            0,
            BindGroupEntry::Buffer {
                buffer: self.material_buffer,
                offset: 0,
                size: None,
            },
        )];
        for slot in MapSlot::ALL {
            let i = slot.index();
            entries.push((
                MATERIAL_TEXTURE_BINDING + i as u32,
                BindGroupEntry::Texture(views[i]),
            ));
            entries.push((
                MATERIAL_SAMPLER_BINDING + i as u32,
                BindGroupEntry::Sampler(samplers[i]),
            ));
        }
        let bind_group = self.backend.create_bind_group(self.material_layout, &entries)?;

        if let Some(old) = self.material.take() {
            self.backend.destroy_bind_group(old.bind_group);
            for sampler in old.samplers {
                self.backend.destroy_sampler(sampler);
            }
        }

        let stale: Vec<usize> = self
            .textures
            .keys()
            .filter(|key| !used.contains(*key))
            .copied()
            .collect();
        for key in stale {
            if let Some(cached) = self.textures.remove(&key) {
                cached.gpu.destroy(&mut self.backend);
            }
        }

        self.material = Some(GpuMaterial {
            revision,
            bind_group,
            samplers,
        });
        Ok(())
    }

    fn pipeline_for(&mut self, key: PipelineKey) -> BackendResult<RenderPipelineHandle> {
        if let Some(pipeline) = self.pipelines.get(&key) {
            return Ok(*pipeline);
        }

        if key.polygon_mode == PolygonMode::Line
            && !self.backend.supports_wireframe()
            && !self.wireframe_warned
        {
            log::warn!("Wireframe rendering is not supported by this adapter; drawing filled");
            self.wireframe_warned = true;
        }

        let pipeline = self.backend.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some(format!(
                "Physical Pipeline ({:?}, {:?}, blend {})",
                key.cull_mode, key.polygon_mode, key.blend
            )),
            shader: PHYSICAL_SHADER.into(),
            vertex_layouts: vec![Vertex::layout()],
            bind_group_layouts: vec![self.frame_layout, self.object_layout, self.material_layout],
            front_face: FrontFace::Ccw,
            cull_mode: key.cull_mode,
            polygon_mode: key.polygon_mode,
            depth_stencil: Some(DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: CompareFunction::LessEqual,
            }),
            color_targets: vec![ColorTargetState {
                format: key.format,
                blend: key.blend.then(BlendState::alpha_blending),
            }],
        })?;
        self.pipelines.insert(key, pipeline);
        Ok(pipeline)
    }

    /// Clear color for `background` on a target of `format`.
    fn clear_color(background: [u8; 3], format: TextureFormat) -> [f32; 4] {
        let rgb = if format.is_srgb() {
            srgb_to_linear(background).to_array()
        } else {
            background.map(|c| c as f32 / 255.0)
        };
        [rgb[0], rgb[1], rgb[2], 1.0]
    }

    fn draw(
        &mut self,
        target: TextureViewHandle,
        format: TextureFormat,
        scene: &Scene,
        material: &PhysicalMaterial,
    ) -> BackendResult<()> {
        let pipeline = if scene.objects.is_empty() {
            None
        } else {
            Some(self.pipeline_for(PipelineKey::new(format, material))?)
        };

        self.backend.begin_render_pass(&RenderPassDescriptor {
            label: Some("Preview Pass".into()),
            color_attachments: vec![ColorAttachment {
                view: target,
                load_op: LoadOp::Clear(Self::clear_color(scene.background, format)),
            }],
            depth_stencil_attachment: Some(DepthStencilAttachment {
                view: self.depth.view,
                depth_clear_value: 1.0,
            }),
        });

        if let (Some(pipeline), Some(gpu_material)) = (pipeline, self.material.as_ref()) {
            self.backend.set_render_pipeline(pipeline);
            self.backend.set_bind_group(0, self.frame_bind_group);
            self.backend.set_bind_group(2, gpu_material.bind_group);

            for object in scene.visible_objects() {
                let Some(gpu_mesh) = self.meshes.get(&(Arc::as_ptr(&object.mesh) as usize)) else {
                    continue;
                };
                let Some(gpu_object) = self.objects.get(&object.kind) else {
                    continue;
                };
                self.backend.set_bind_group(1, gpu_object.bind_group);
                self.backend.set_vertex_buffer(0, gpu_mesh.vertex_buffer, 0);
                self.backend.set_index_buffer(gpu_mesh.index_buffer, 0);
                self.backend.draw_indexed(0..gpu_mesh.index_count, 0, 0..1);
            }
        }

        self.backend.end_render_pass();
        Ok(())
    }

    /// Acquire the swapchain image and draw the scene into it. Call
    /// [`Engine::end_frame`] after any overlay (like egui) is recorded.
    pub fn render_scene(
        &mut self,
        scene: &Scene,
        material: &PhysicalMaterial,
        revision: u64,
    ) -> BackendResult<()> {
        let frame = self.backend.begin_frame()?;
        let format = self.backend.swapchain_format();
        self.prepare(scene, material, revision, format)?;
        self.draw(frame.swapchain_view, format, scene, material)
    }

    /// Submit and present the frame.
    pub fn end_frame(&mut self) -> BackendResult<()> {
        self.backend.end_frame()
    }

    /// Render one frame offscreen at the surface size and read it back.
    pub fn capture(
        &mut self,
        scene: &Scene,
        material: &PhysicalMaterial,
        revision: u64,
    ) -> BackendResult<CapturedFrame> {
        let (width, height) = (self.width, self.height);
        let format = self.backend.swapchain_format();
        let color = self.backend.create_texture(&TextureDescriptor {
            label: Some("Screenshot Target".into()),
            width,
            height,
            format,
            usage: TextureUsage::RENDER_ATTACHMENT | TextureUsage::COPY_SRC,
        })?;
        let view = self.backend.create_texture_view(color)?;

        self.backend.begin_offscreen();
        let result = self
            .prepare(scene, material, revision, format)
            .and_then(|()| self.draw(view, format, scene, material))
            .and_then(|()| self.backend.read_texture(color, width, height));
        // Nothing may stay recorded if the readback bailed out early
        self.backend.submit_offscreen();

        self.backend.destroy_texture_view(view);
        self.backend.destroy_texture(color);

        Ok(CapturedFrame {
            width,
            height,
            pixels: result?,
        })
    }

    /// Current surface dimensions
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Access to the backend for overlays (like egui)
    pub fn backend(&self) -> &WgpuBackend {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut WgpuBackend {
        &mut self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::MaterialSide;

    #[test]
    fn test_clear_color_per_target() {
        let srgb = Engine::clear_color([0x44, 0x44, 0x44], TextureFormat::Bgra8UnormSrgb);
        let unorm = Engine::clear_color([0x44, 0x44, 0x44], TextureFormat::Bgra8Unorm);
        assert!((unorm[0] - 0x44 as f32 / 255.0).abs() < 1e-6);
        assert!(srgb[0] < unorm[0]);
        assert_eq!(srgb[3], 1.0);
    }

    #[test]
    fn test_pipeline_key_tracks_material() {
        let mut material = PhysicalMaterial::default();
        let front = PipelineKey::new(TextureFormat::Bgra8UnormSrgb, &material);
        assert_eq!(front.cull_mode, CullMode::Back);
        assert_eq!(front.polygon_mode, PolygonMode::Fill);
        assert!(!front.blend);

        material.side = MaterialSide::Double;
        material.wireframe = true;
        material.transparent = true;
        let edited = PipelineKey::new(TextureFormat::Bgra8UnormSrgb, &material);
        assert_eq!(edited.cull_mode, CullMode::None);
        assert_eq!(edited.polygon_mode, PolygonMode::Line);
        assert!(edited.blend);
        assert_ne!(front, edited);
    }

    #[test]
    fn test_frame_params_encode_flag() {
        assert_eq!(FrameParams::for_format(TextureFormat::Rgba8UnormSrgb).output[0], 0.0);
        assert_eq!(FrameParams::for_format(TextureFormat::Rgba8Unorm).output[0], 1.0);
    }
}
