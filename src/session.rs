//! Preview session: ties the watcher, loader, panel, material and scene
//! together and runs the per-tick rebuild logic.

use std::sync::{mpsc, Arc};

use glam::Vec2;

use crate::descriptor::{DescriptorSet, MapSlot, TextureDescriptor};
use crate::error::PreviewResult;
use crate::loader::{DirectoryFetcher, HttpFetcher, LoadProgress, RebuildResult, TextureFetcher, TextureLoader};
use crate::panel::{ChangeTarget, Panel, PanelChange, PanelParams};
use crate::render_loop::{LoopState, RenderLoop};
use crate::resources::{MapBinding, PhysicalMaterial, TextureData};
use crate::scene::{CameraInput, MeshLibrary, ObjectKind, OrbitController, Scene};
use crate::watcher::{AttributeSource, AttributeWatcher, FileAttributes, MemoryAttributes};
use crate::PreviewConfig;

/// Everything one preview window shows and edits.
pub struct PreviewSession {
    watcher: AttributeWatcher,
    /// Descriptor sets published by the watcher's change listener
    changes: mpsc::Receiver<DescriptorSet>,
    loader: TextureLoader,
    panel: Panel,
    material: PhysicalMaterial,
    meshes: MeshLibrary,
    scene: Scene,
    orbit: OrbitController,
    render_loop: RenderLoop,
    /// Latest requested rebuild
    generation: u64,
    /// Generation currently shown, 0 before the first rebuild lands
    shown_generation: u64,
    loading: bool,
    /// Bumped on every material change
    material_revision: u64,
    elapsed: f32,
}

impl PreviewSession {
    /// Create a session and request the first rebuild with whatever the
    /// source currently holds.
    pub fn new(source: impl AttributeSource + 'static, fetcher: Arc<dyn TextureFetcher>) -> Self {
        Self::from_parts(AttributeWatcher::new(source), fetcher)
    }

    /// Build a session from configuration: a watched attributes file or an
    /// empty in-memory source, and a directory or HTTP fetcher.
    pub fn from_config(config: &PreviewConfig) -> PreviewResult<Self> {
        let watcher = match &config.attributes_file {
            Some(path) => AttributeWatcher::new(FileAttributes::open(path)?),
            None => AttributeWatcher::new(MemoryAttributes::new()),
        };
        let fetcher: Arc<dyn TextureFetcher> = match &config.texture_dir {
            Some(dir) => Arc::new(DirectoryFetcher::new(dir)),
            None => Arc::new(HttpFetcher::new(config.server_url.clone())),
        };
        let mut session = Self::from_parts(watcher, fetcher);
        session.panel.set_export_format(config.export_format);
        Ok(session)
    }

    fn from_parts(mut watcher: AttributeWatcher, fetcher: Arc<dyn TextureFetcher>) -> Self {
        let scene = Scene::new();
        let mut orbit = OrbitController::default();
        orbit.sync_with_camera(&scene.camera);

        // Consume the initial state so the first tick only reports real edits
        let initial = watcher.poll().unwrap_or_else(|| watcher.descriptors());
        let (sender, changes) = mpsc::channel();
        watcher.on_change(move |descriptors| {
            let _ = sender.send(descriptors.clone());
        });

        let mut session = Self {
            watcher,
            changes,
            loader: TextureLoader::new(fetcher),
            panel: Panel::new(),
            material: Self::initial_material(),
            meshes: MeshLibrary::new(),
            scene,
            orbit,
            render_loop: RenderLoop::new(),
            generation: 0,
            shown_generation: 0,
            loading: false,
            material_revision: 0,
            elapsed: 0.0,
        };
        session.scene.background = session.panel.params().background;
        session.request_rebuild(initial);
        session
    }

    /// Physical defaults with metalness and roughness at 1.
    pub fn initial_material() -> PhysicalMaterial {
        PhysicalMaterial::new("preview")
            .with_metalness(1.0)
            .with_roughness(1.0)
    }

    /// Advance the session to `elapsed` seconds since its clock started.
    /// Returns true when a frame should be drawn.
    pub fn tick(&mut self, elapsed: f32) -> bool {
        self.elapsed = elapsed;

        if self.render_loop.is_running() {
            self.watcher.poll();
            if let Some(descriptors) = self.changes.try_iter().last() {
                self.request_rebuild(descriptors);
            }
        }

        while let Some(result) = self.loader.try_recv() {
            self.apply_rebuild(result);
        }

        let animating = self.render_loop.is_animating();
        if animating {
            self.scene.set_rotation(RenderLoop::rotation_at(elapsed));
        }

        if self.orbit.update(&mut self.scene.camera) {
            self.render_loop.request_redraw();
        }

        let redraw = self.render_loop.take_redraw();
        animating || redraw
    }

    /// Clear the scene and start resolving `descriptors` on a worker.
    pub fn request_rebuild(&mut self, descriptors: DescriptorSet) {
        self.generation += 1;
        log::info!(
            "Rebuilding scene (generation {}, {} maps described)",
            self.generation,
            descriptors.len()
        );
        self.scene.clear();
        self.render_loop.enter_waiting();
        self.loading = true;
        self.loader.request(self.generation, descriptors);
    }

    /// Install a finished rebuild. Returns false for superseded generations.
    pub fn apply_rebuild(&mut self, result: RebuildResult) -> bool {
        if result.generation != self.generation {
            log::debug!(
                "Discarding rebuild of generation {} (latest is {})",
                result.generation,
                self.generation
            );
            return false;
        }

        self.material = build_material(&result, &self.panel);
        self.material_revision += 1;

        self.scene.populate(&self.meshes);
        let params = self.panel.params();
        for object in &mut self.scene.objects {
            object.visible = params.is_visible(object.kind);
        }
        self.scene.set_rotation(RenderLoop::rotation_at(self.elapsed));

        self.loading = false;
        self.shown_generation = result.generation;
        self.render_loop.mark_ready();
        log::info!(
            "Scene ready (generation {}, {} maps bound)",
            result.generation,
            self.material.bound_map_count()
        );
        true
    }

    /// Route a panel edit into the material or scene.
    pub fn apply_panel(&mut self, change: PanelChange) {
        let change = self.panel.apply(change);
        match change.target() {
            ChangeTarget::Material | ChangeTarget::MapSettings => {
                change.apply_to_material(&mut self.material);
                self.material_revision += 1;
            }
            ChangeTarget::Scene => match change {
                PanelChange::Visible(kind, visible) => {
                    if let Some(object) = self.scene.object_mut(kind) {
                        object.visible = visible;
                    }
                }
                PanelChange::Background(color) => self.scene.background = color,
                _ => {}
            },
        }
        self.render_loop.request_redraw();
    }

    /// Stop or resume the animation. Returns the new running state.
    pub fn toggle_animation(&mut self) -> bool {
        let running = self.render_loop.toggle();
        log::info!("Animation {}", if running { "resumed" } else { "stopped" });
        running
    }

    /// Feed pointer input to the orbit controls.
    pub fn handle_camera_input(&mut self, input: &CameraInput, viewport_height: f32) {
        if input.is_idle() {
            return;
        }
        self.orbit
            .handle_input(&self.scene.camera, input, viewport_height);
        self.render_loop.request_redraw();
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.scene.camera.set_aspect(width as f32, height as f32);
        self.render_loop.request_redraw();
    }

    /// Loader progress while a rebuild is in flight.
    pub fn progress(&self) -> Option<LoadProgress> {
        self.loading.then(|| self.loader.progress())
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn material(&self) -> &PhysicalMaterial {
        &self.material
    }

    pub fn material_revision(&self) -> u64 {
        self.material_revision
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn panel(&self) -> &Panel {
        &self.panel
    }

    pub fn panel_mut(&mut self) -> &mut Panel {
        &mut self.panel
    }

    pub fn params(&self) -> &PanelParams {
        self.panel.params()
    }

    pub fn descriptors(&self) -> DescriptorSet {
        self.watcher.descriptors()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn shown_generation(&self) -> u64 {
        self.shown_generation
    }

    pub fn loop_state(&self) -> LoopState {
        self.render_loop.state()
    }

    pub fn is_animating(&self) -> bool {
        self.render_loop.is_animating()
    }

    /// Whether a scene is ready to be drawn or exported.
    pub fn is_ready(&self) -> bool {
        self.render_loop.state() == LoopState::Rendering
    }

    /// Block until the in-flight rebuild lands or `timeout` passes. Returns
    /// true when the latest generation was applied.
    pub fn wait_for_rebuild(&mut self, timeout: std::time::Duration) -> bool {
        let deadline = std::time::Instant::now() + timeout;
        while self.loading {
            let remaining = deadline.saturating_duration_since(std::time::Instant::now());
            if remaining.is_zero() {
                return false;
            }
            match self.loader.recv_timeout(remaining) {
                Some(result) => {
                    self.apply_rebuild(result);
                }
                None => return false,
            }
        }
        true
    }
}

/// Initial material, resolved maps, map settings, then replayed edits.
fn build_material(result: &RebuildResult, panel: &Panel) -> PhysicalMaterial {
    let params = panel.params();
    let mut material = PreviewSession::initial_material();
    panel.apply_map_settings(&mut material);

    for slot in MapSlot::ALL {
        let (Some(texture), Some(descriptor)) = (result.map(slot), result.descriptors.get(slot)) else {
            continue;
        };
        material.set_map(slot, Some(bind_map(texture, descriptor, params)));

        if let Some(intensity) = descriptor.intensity {
            match slot {
                MapSlot::Displacement => material.displacement_scale = intensity,
                MapSlot::Normal => material.normal_scale = intensity,
                MapSlot::AmbientOcclusion => material.ao_map_intensity = intensity,
                _ => {}
            }
        }
    }

    panel.replay(&mut material);
    material
}

/// Descriptor wrap and repeat where given, otherwise the panel values.
fn bind_map(texture: &Arc<TextureData>, descriptor: &TextureDescriptor, params: &PanelParams) -> MapBinding {
    let positive = |v: Option<f32>| v.filter(|v| v.is_finite() && *v > 0.0);
    let mut binding = MapBinding::new(Arc::clone(texture));
    binding.wrap_s = descriptor.wrap_s.unwrap_or(params.wrap_s);
    binding.wrap_t = descriptor.wrap_t.unwrap_or(params.wrap_t);
    binding.repeat = Vec2::new(
        positive(descriptor.repeat_x).unwrap_or(params.repeat_x),
        positive(descriptor.repeat_y).unwrap_or(params.repeat_y),
    );
    binding
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::LoadError;
    use crate::resources::WrapMode;
    use parking_lot::Mutex;
    use std::sync::mpsc;
    use std::time::Duration;

    /// Serves a 1x1 white PNG for every supported descriptor.
    struct WhiteFetcher;

    impl TextureFetcher for WhiteFetcher {
        fn fetch(&self, _descriptor: &TextureDescriptor) -> Result<Vec<u8>, LoadError> {
            Ok(TextureData::white().encode_png()?)
        }
    }

    /// White PNGs, each one held back until the test sends a permit.
    struct GatedFetcher {
        permits: Mutex<mpsc::Receiver<()>>,
    }

    impl TextureFetcher for GatedFetcher {
        fn fetch(&self, descriptor: &TextureDescriptor) -> Result<Vec<u8>, LoadError> {
            let _ = self.permits.lock().recv();
            WhiteFetcher.fetch(descriptor)
        }
    }

    fn session_with(attributes: &MemoryAttributes) -> PreviewSession {
        PreviewSession::new(attributes.clone(), Arc::new(WhiteFetcher))
    }

    fn gated_session(attributes: &MemoryAttributes) -> (PreviewSession, mpsc::Sender<()>) {
        let (permits, gate) = mpsc::channel();
        let fetcher = GatedFetcher {
            permits: Mutex::new(gate),
        };
        (PreviewSession::new(attributes.clone(), Arc::new(fetcher)), permits)
    }

    #[test]
    fn test_initial_rebuild_without_maps() {
        let attributes = MemoryAttributes::new();
        let mut session = session_with(&attributes);
        assert_eq!(session.generation(), 1);
        assert_eq!(session.loop_state(), LoopState::Waiting);
        assert!(session.progress().is_some());

        assert!(session.wait_for_rebuild(Duration::from_secs(10)));
        assert!(session.is_ready());
        assert_eq!(session.scene().objects.len(), 3);
        assert_eq!(session.material().bound_map_count(), 0);
        assert_eq!(session.material().metalness, 1.0);
        assert_eq!(session.material().roughness, 1.0);
        assert!(session.progress().is_none());
    }

    #[test]
    fn test_superseded_generation_is_discarded() {
        let attributes = MemoryAttributes::new();
        let mut session = session_with(&attributes);
        assert!(session.wait_for_rebuild(Duration::from_secs(10)));

        let stale = RebuildResult {
            generation: 0,
            descriptors: DescriptorSet::new().with(MapSlot::Color, TextureDescriptor::new("old.png")),
            maps: Default::default(),
        };
        let revision = session.material_revision();
        assert!(!session.apply_rebuild(stale));
        assert_eq!(session.material_revision(), revision);
    }

    #[test]
    fn test_descriptor_wrap_beats_panel() {
        let params = PanelParams {
            wrap_s: WrapMode::ClampToEdge,
            repeat_x: 4.0,
            ..PanelParams::default()
        };
        let texture = Arc::new(TextureData::white());

        let plain = bind_map(&texture, &TextureDescriptor::new("a.png"), &params);
        assert_eq!(plain.wrap_s, WrapMode::ClampToEdge);
        assert_eq!(plain.repeat, Vec2::new(4.0, 1.0));

        let described = TextureDescriptor::new("a.png")
            .with_wrap(WrapMode::MirroredRepeat, WrapMode::Repeat)
            .with_repeat(2.0, 3.0);
        let binding = bind_map(&texture, &described, &params);
        assert_eq!(binding.wrap_s, WrapMode::MirroredRepeat);
        assert_eq!(binding.repeat, Vec2::new(2.0, 3.0));
    }

    #[test]
    fn test_panel_edits_survive_rebuild() {
        let attributes = MemoryAttributes::new();
        let (mut session, permits) = gated_session(&attributes);
        assert!(session.wait_for_rebuild(Duration::from_secs(10)));

        session.apply_panel(PanelChange::Roughness(0.3));
        session.apply_panel(PanelChange::Visible(ObjectKind::Torus, false));
        assert_eq!(session.material().roughness, 0.3);

        attributes.set_descriptor(MapSlot::Color, Some(&TextureDescriptor::new("wood.png")));
        session.tick(1.0);
        assert_eq!(session.generation(), 2);
        assert_eq!(session.loop_state(), LoopState::Waiting);
        assert!(session.scene().objects.is_empty());

        permits.send(()).unwrap();
        assert!(session.wait_for_rebuild(Duration::from_secs(10)));

        assert!(session.material().map(MapSlot::Color).is_some());
        assert_eq!(session.material().roughness, 0.3);
        assert_eq!(session.material().metalness, 1.0);
        let torus = session.scene().object(ObjectKind::Torus).unwrap();
        assert!(!torus.visible);
    }

    #[test]
    fn test_stopped_session_does_not_poll() {
        let attributes = MemoryAttributes::new();
        let (mut session, permits) = gated_session(&attributes);
        assert!(session.wait_for_rebuild(Duration::from_secs(10)));
        assert!(session.tick(1.0));

        assert!(!session.toggle_animation());
        attributes.set_descriptor(MapSlot::Color, Some(&TextureDescriptor::new("wood.png")));
        assert!(!session.tick(2.0));
        assert_eq!(session.generation(), 1);

        assert!(session.toggle_animation());
        session.tick(3.0);
        assert_eq!(session.generation(), 2);
        assert_eq!(session.loop_state(), LoopState::Waiting);
        assert!(!session.tick(3.5));

        permits.send(()).unwrap();
        assert!(session.wait_for_rebuild(Duration::from_secs(10)));
        assert!(session.tick(4.0));
    }
}
