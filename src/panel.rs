//! Live parameter panel.
//!
//! [`PanelParams`] holds what the widgets show. Every edit travels as a
//! [`PanelChange`] through [`Panel::apply`], which clamps it to the declared
//! range, stores it, and remembers material edits so they can be replayed on
//! the material of the next rebuild.

use std::ops::RangeInclusive;

use crate::export::ExportFormat;
use crate::loader::LoadProgress;
use crate::resources::{
    hex_to_rgb, ior_for_reflectivity, reflectivity_for_ior, srgb_to_linear, MaterialSide,
    PhysicalMaterial, WrapMode,
};
use crate::scene::ObjectKind;

pub const UNIT_RANGE: RangeInclusive<f32> = 0.0..=1.0;
pub const IOR_RANGE: RangeInclusive<f32> = 1.0..=2.333;
pub const REPEAT_RANGE: RangeInclusive<f32> = 1.0..=10.0;

/// Values shown by the panel widgets. Colors are sRGB bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelParams {
    pub side: MaterialSide,
    pub color: [u8; 3],
    pub emissive: [u8; 3],
    pub roughness: f32,
    pub metalness: f32,
    pub ior: f32,
    pub reflectivity: f32,
    pub iridescence: f32,
    pub iridescence_ior: f32,
    pub sheen: f32,
    pub sheen_roughness: f32,
    pub sheen_color: [u8; 3],
    pub clearcoat: f32,
    pub clearcoat_roughness: f32,
    pub specular_intensity: f32,
    pub specular_color: [u8; 3],
    pub flat_shading: bool,
    pub wireframe: bool,
    pub vertex_colors: bool,
    pub displacement_scale: f32,
    pub normal_scale: f32,
    pub ao_map_intensity: f32,
    pub show_sphere: bool,
    pub show_cube: bool,
    pub show_torus: bool,
    pub background: [u8; 3],
    pub opacity: f32,
    pub transparent: bool,
    pub repeat_x: f32,
    pub repeat_y: f32,
    pub wrap_s: WrapMode,
    pub wrap_t: WrapMode,
}

impl Default for PanelParams {
    fn default() -> Self {
        Self {
            side: MaterialSide::Double,
            color: hex_to_rgb(0xffffff),
            emissive: hex_to_rgb(0x000000),
            roughness: 1.0,
            metalness: 0.0,
            ior: 1.5,
            reflectivity: 0.5,
            iridescence: 0.0,
            iridescence_ior: 1.5,
            sheen: 0.0,
            sheen_roughness: 0.5,
            sheen_color: hex_to_rgb(0xffffff),
            clearcoat: 0.0,
            clearcoat_roughness: 0.0,
            specular_intensity: 0.0,
            specular_color: hex_to_rgb(0xffffff),
            flat_shading: false,
            wireframe: false,
            vertex_colors: false,
            displacement_scale: 0.1,
            normal_scale: 0.5,
            ao_map_intensity: 1.0,
            show_sphere: true,
            show_cube: true,
            show_torus: true,
            background: hex_to_rgb(0x444444),
            opacity: 1.0,
            transparent: false,
            repeat_x: 1.0,
            repeat_y: 1.0,
            wrap_s: WrapMode::Repeat,
            wrap_t: WrapMode::Repeat,
        }
    }
}

impl PanelParams {
    pub fn is_visible(&self, kind: ObjectKind) -> bool {
        match kind {
            ObjectKind::Sphere => self.show_sphere,
            ObjectKind::Cube => self.show_cube,
            ObjectKind::Torus => self.show_torus,
        }
    }
}

/// A single edit made through the panel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PanelChange {
    Side(MaterialSide),
    Color([u8; 3]),
    Emissive([u8; 3]),
    Roughness(f32),
    Metalness(f32),
    Ior(f32),
    Reflectivity(f32),
    Iridescence(f32),
    IridescenceIor(f32),
    Sheen(f32),
    SheenRoughness(f32),
    SheenColor([u8; 3]),
    Clearcoat(f32),
    ClearcoatRoughness(f32),
    SpecularIntensity(f32),
    SpecularColor([u8; 3]),
    FlatShading(bool),
    Wireframe(bool),
    VertexColors(bool),
    DisplacementScale(f32),
    NormalScale(f32),
    AoMapIntensity(f32),
    Visible(ObjectKind, bool),
    Background([u8; 3]),
    Opacity(f32),
    Transparent(bool),
    RepeatX(f32),
    RepeatY(f32),
    WrapS(WrapMode),
    WrapT(WrapMode),
}

/// What an edit writes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeTarget {
    /// A material property; replayed on rebuilt materials.
    Material,
    /// Map scales, transparency, wrap and repeat; taken from the current
    /// values on every rebuild.
    MapSettings,
    /// Scene state outside the material.
    Scene,
}

fn clamp_to(value: f32, range: &RangeInclusive<f32>) -> f32 {
    if value.is_nan() {
        *range.start()
    } else {
        value.clamp(*range.start(), *range.end())
    }
}

impl PanelChange {
    pub fn target(&self) -> ChangeTarget {
        use PanelChange::*;
        match self {
            DisplacementScale(_) | NormalScale(_) | AoMapIntensity(_) | Transparent(_)
            | RepeatX(_) | RepeatY(_) | WrapS(_) | WrapT(_) => ChangeTarget::MapSettings,
            Visible(..) | Background(_) => ChangeTarget::Scene,
            _ => ChangeTarget::Material,
        }
    }

    /// The same edit with its value forced into the declared range.
    pub fn clamped(self) -> Self {
        use PanelChange::*;
        match self {
            Roughness(v) => Roughness(clamp_to(v, &UNIT_RANGE)),
            Metalness(v) => Metalness(clamp_to(v, &UNIT_RANGE)),
            Ior(v) => Ior(clamp_to(v, &IOR_RANGE)),
            Reflectivity(v) => Reflectivity(clamp_to(v, &UNIT_RANGE)),
            Iridescence(v) => Iridescence(clamp_to(v, &UNIT_RANGE)),
            IridescenceIor(v) => IridescenceIor(clamp_to(v, &IOR_RANGE)),
            Sheen(v) => Sheen(clamp_to(v, &UNIT_RANGE)),
            SheenRoughness(v) => SheenRoughness(clamp_to(v, &UNIT_RANGE)),
            Clearcoat(v) => Clearcoat(clamp_to(v, &UNIT_RANGE)),
            ClearcoatRoughness(v) => ClearcoatRoughness(clamp_to(v, &UNIT_RANGE)),
            SpecularIntensity(v) => SpecularIntensity(clamp_to(v, &UNIT_RANGE)),
            DisplacementScale(v) => DisplacementScale(clamp_to(v, &UNIT_RANGE)),
            NormalScale(v) => NormalScale(clamp_to(v, &UNIT_RANGE)),
            AoMapIntensity(v) => AoMapIntensity(clamp_to(v, &UNIT_RANGE)),
            Opacity(v) => Opacity(clamp_to(v, &UNIT_RANGE)),
            RepeatX(v) => RepeatX(clamp_to(v.round(), &REPEAT_RANGE)),
            RepeatY(v) => RepeatY(clamp_to(v.round(), &REPEAT_RANGE)),
            other => other,
        }
    }

    /// Write the edit into `material`. Scene edits are ignored.
    pub fn apply_to_material(&self, material: &mut PhysicalMaterial) {
        use PanelChange::*;
        match *self {
            Side(side) => material.side = side,
            Color(c) => material.color = srgb_to_linear(c),
            Emissive(c) => material.emissive = srgb_to_linear(c),
            Roughness(v) => material.roughness = v,
            Metalness(v) => material.metalness = v,
            Ior(v) => material.ior = v,
            Reflectivity(v) => material.set_reflectivity(v),
            Iridescence(v) => material.iridescence = v,
            IridescenceIor(v) => material.iridescence_ior = v,
            Sheen(v) => material.sheen = v,
            SheenRoughness(v) => material.sheen_roughness = v,
            SheenColor(c) => material.sheen_color = srgb_to_linear(c),
            Clearcoat(v) => material.clearcoat = v,
            ClearcoatRoughness(v) => material.clearcoat_roughness = v,
            SpecularIntensity(v) => material.specular_intensity = v,
            SpecularColor(c) => material.specular_color = srgb_to_linear(c),
            FlatShading(b) => material.flat_shading = b,
            Wireframe(b) => material.wireframe = b,
            VertexColors(b) => material.vertex_colors = b,
            DisplacementScale(v) => material.displacement_scale = v,
            NormalScale(v) => material.normal_scale = v,
            AoMapIntensity(v) => material.ao_map_intensity = v,
            Opacity(v) => material.opacity = v,
            Transparent(b) => material.transparent = b,
            RepeatX(v) => material.for_each_map_mut(|_, map| map.repeat.x = v),
            RepeatY(v) => material.for_each_map_mut(|_, map| map.repeat.y = v),
            WrapS(mode) => material.for_each_map_mut(|_, map| map.wrap_s = mode),
            WrapT(mode) => material.for_each_map_mut(|_, map| map.wrap_t = mode),
            Visible(..) | Background(_) => {}
        }
    }
}

/// User requests coming out of the panel this frame.
#[derive(Debug, Clone, PartialEq)]
pub enum PanelAction {
    Change(PanelChange),
    ToggleAnimation,
    SelectFormat(ExportFormat),
    Export(ExportFormat),
    Screenshot,
}

/// Panel state: widget values, remembered material edits, export format.
#[derive(Debug, Clone)]
pub struct Panel {
    params: PanelParams,
    overrides: Vec<PanelChange>,
    pub export_format: ExportFormat,
}

impl Default for Panel {
    fn default() -> Self {
        Self::new()
    }
}

impl Panel {
    pub fn new() -> Self {
        Self {
            params: PanelParams::default(),
            overrides: Vec::new(),
            export_format: ExportFormat::Gltf,
        }
    }

    pub fn params(&self) -> &PanelParams {
        &self.params
    }

    /// Material edits in the order they will be replayed.
    pub fn overrides(&self) -> &[PanelChange] {
        &self.overrides
    }

    /// Clamp and store an edit. Returns the edit as stored.
    pub fn apply(&mut self, change: PanelChange) -> PanelChange {
        use PanelChange::*;
        let change = change.clamped();
        let p = &mut self.params;
        match change {
            Side(v) => p.side = v,
            Color(v) => p.color = v,
            Emissive(v) => p.emissive = v,
            Roughness(v) => p.roughness = v,
            Metalness(v) => p.metalness = v,
            Ior(v) => {
                p.ior = v;
                p.reflectivity = reflectivity_for_ior(v);
            }
            Reflectivity(v) => {
                p.reflectivity = v;
                p.ior = ior_for_reflectivity(v);
            }
            Iridescence(v) => p.iridescence = v,
            IridescenceIor(v) => p.iridescence_ior = v,
            Sheen(v) => p.sheen = v,
            SheenRoughness(v) => p.sheen_roughness = v,
            SheenColor(v) => p.sheen_color = v,
            Clearcoat(v) => p.clearcoat = v,
            ClearcoatRoughness(v) => p.clearcoat_roughness = v,
            SpecularIntensity(v) => p.specular_intensity = v,
            SpecularColor(v) => p.specular_color = v,
            FlatShading(v) => p.flat_shading = v,
            Wireframe(v) => p.wireframe = v,
            VertexColors(v) => p.vertex_colors = v,
            DisplacementScale(v) => p.displacement_scale = v,
            NormalScale(v) => p.normal_scale = v,
            AoMapIntensity(v) => p.ao_map_intensity = v,
            Visible(ObjectKind::Sphere, v) => p.show_sphere = v,
            Visible(ObjectKind::Cube, v) => p.show_cube = v,
            Visible(ObjectKind::Torus, v) => p.show_torus = v,
            Background(v) => p.background = v,
            Opacity(v) => p.opacity = v,
            Transparent(v) => p.transparent = v,
            RepeatX(v) => p.repeat_x = v,
            RepeatY(v) => p.repeat_y = v,
            WrapS(v) => p.wrap_s = v,
            WrapT(v) => p.wrap_t = v,
        }

        if change.target() == ChangeTarget::Material {
            // Ior and reflectivity drive the same property
            let same_property = |old: &PanelChange| {
                std::mem::discriminant(old) == std::mem::discriminant(&change)
                    || matches!(
                        (old, &change),
                        (Ior(_), Reflectivity(_)) | (Reflectivity(_), Ior(_))
                    )
            };
            self.overrides.retain(|old| !same_property(old));
            self.overrides.push(change);
        }

        change
    }

    /// Apply the current map scales and transparency. Wrap and repeat are
    /// resolved per binding since descriptors may override them.
    pub fn apply_map_settings(&self, material: &mut PhysicalMaterial) {
        let p = &self.params;
        material.displacement_scale = p.displacement_scale;
        material.normal_scale = p.normal_scale;
        material.ao_map_intensity = p.ao_map_intensity;
        material.transparent = p.transparent;
    }

    /// Replay every remembered material edit onto a freshly built material.
    pub fn replay(&self, material: &mut PhysicalMaterial) {
        for change in &self.overrides {
            change.apply_to_material(material);
        }
    }

    /// Switch the format used by the export strip.
    pub fn set_export_format(&mut self, format: ExportFormat) {
        self.export_format = format;
    }

    /// Draw the panel, the progress window and the export strip.
    pub fn draw(&self, ctx: &egui::Context, progress: Option<&LoadProgress>) -> Vec<PanelAction> {
        let mut actions = Vec::new();
        let mut p = self.params.clone();
        let mut format = self.export_format;

        egui::Window::new("Material Preview")
            .default_pos([10.0, 10.0])
            .default_width(280.0)
            .resizable(false)
            .show(ctx, |ui| {
                egui::CollapsingHeader::new("Colors")
                    .default_open(true)
                    .show(ui, |ui| {
                        color(ui, &mut actions, "color", &mut p.color, PanelChange::Color);
                        color(ui, &mut actions, "emissive", &mut p.emissive, PanelChange::Emissive);
                        color(ui, &mut actions, "sheen color", &mut p.sheen_color, PanelChange::SheenColor);
                        color(
                            ui,
                            &mut actions,
                            "specular color",
                            &mut p.specular_color,
                            PanelChange::SpecularColor,
                        );
                        color(ui, &mut actions, "background", &mut p.background, PanelChange::Background);
                    });

                egui::CollapsingHeader::new("Visibility")
                    .default_open(true)
                    .show(ui, |ui| {
                        toggle(ui, &mut actions, "sphere", &mut p.show_sphere, |v| {
                            PanelChange::Visible(ObjectKind::Sphere, v)
                        });
                        toggle(ui, &mut actions, "cube", &mut p.show_cube, |v| {
                            PanelChange::Visible(ObjectKind::Cube, v)
                        });
                        toggle(ui, &mut actions, "torus", &mut p.show_torus, |v| {
                            PanelChange::Visible(ObjectKind::Torus, v)
                        });
                    });

                egui::CollapsingHeader::new("Material")
                    .default_open(true)
                    .show(ui, |ui| {
                        let a = &mut actions;
                        side(ui, a, &mut p.side);
                        slider(ui, a, "roughness", &mut p.roughness, UNIT_RANGE, PanelChange::Roughness);
                        slider(ui, a, "metalness", &mut p.metalness, UNIT_RANGE, PanelChange::Metalness);
                        slider(ui, a, "ior", &mut p.ior, IOR_RANGE, PanelChange::Ior);
                        slider(ui, a, "reflectivity", &mut p.reflectivity, UNIT_RANGE, PanelChange::Reflectivity);
                        slider(ui, a, "iridescence", &mut p.iridescence, UNIT_RANGE, PanelChange::Iridescence);
                        slider(
                            ui,
                            a,
                            "iridescence IOR",
                            &mut p.iridescence_ior,
                            IOR_RANGE,
                            PanelChange::IridescenceIor,
                        );
                        slider(ui, a, "sheen", &mut p.sheen, UNIT_RANGE, PanelChange::Sheen);
                        slider(
                            ui,
                            a,
                            "sheen roughness",
                            &mut p.sheen_roughness,
                            UNIT_RANGE,
                            PanelChange::SheenRoughness,
                        );
                        slider(ui, a, "clearcoat", &mut p.clearcoat, UNIT_RANGE, PanelChange::Clearcoat);
                        slider(
                            ui,
                            a,
                            "clearcoat roughness",
                            &mut p.clearcoat_roughness,
                            UNIT_RANGE,
                            PanelChange::ClearcoatRoughness,
                        );
                        slider(
                            ui,
                            a,
                            "specular intensity",
                            &mut p.specular_intensity,
                            UNIT_RANGE,
                            PanelChange::SpecularIntensity,
                        );
                        toggle(ui, a, "flat shading", &mut p.flat_shading, PanelChange::FlatShading);
                        toggle(ui, a, "wireframe", &mut p.wireframe, PanelChange::Wireframe);
                        toggle(ui, a, "vertex colors", &mut p.vertex_colors, PanelChange::VertexColors);
                        slider(
                            ui,
                            a,
                            "displacement scale",
                            &mut p.displacement_scale,
                            UNIT_RANGE,
                            PanelChange::DisplacementScale,
                        );
                        slider(ui, a, "normal scale", &mut p.normal_scale, UNIT_RANGE, PanelChange::NormalScale);
                        slider(
                            ui,
                            a,
                            "AO map intensity",
                            &mut p.ao_map_intensity,
                            UNIT_RANGE,
                            PanelChange::AoMapIntensity,
                        );
                        slider(ui, a, "opacity", &mut p.opacity, UNIT_RANGE, PanelChange::Opacity);
                        toggle(ui, a, "transparent", &mut p.transparent, PanelChange::Transparent);
                        repeat(ui, a, "repeat X", &mut p.repeat_x, PanelChange::RepeatX);
                        repeat(ui, a, "repeat Y", &mut p.repeat_y, PanelChange::RepeatY);
                        wrap(ui, a, "wrap S", &mut p.wrap_s, PanelChange::WrapS);
                        wrap(ui, a, "wrap T", &mut p.wrap_t, PanelChange::WrapT);
                    });

                ui.separator();
                if ui.button("Toggle Animation").clicked() {
                    actions.push(PanelAction::ToggleAnimation);
                }

                ui.add_space(10.0);
                ui.horizontal(|ui| {
                    egui::ComboBox::from_id_source("export_format")
                        .selected_text(format.extension())
                        .show_ui(ui, |ui| {
                            for option in ExportFormat::ALL {
                                ui.selectable_value(&mut format, option, option.extension());
                            }
                        });
                    if ui.button("Download").clicked() {
                        actions.push(PanelAction::Export(format));
                    }
                    if ui.button("Screenshot").clicked() {
                        actions.push(PanelAction::Screenshot);
                    }
                });
            });

        if let Some(progress) = progress {
            egui::Window::new("Loading textures")
                .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                .collapsible(false)
                .resizable(false)
                .show(ctx, |ui| {
                    let label = match progress.current {
                        Some(slot) => format!("{} map", slot.label()),
                        None => format!("{} / {}", progress.finished, progress.requested),
                    };
                    ui.label(label);
                    ui.add(egui::ProgressBar::new(progress.fraction()).show_percentage());
                });
        }

        if format != self.export_format {
            actions.insert(0, PanelAction::SelectFormat(format));
        }

        actions
    }
}

fn slider(
    ui: &mut egui::Ui,
    actions: &mut Vec<PanelAction>,
    label: &str,
    value: &mut f32,
    range: RangeInclusive<f32>,
    change: fn(f32) -> PanelChange,
) {
    ui.horizontal(|ui| {
        ui.label(label);
        if ui.add(egui::Slider::new(value, range).step_by(0.01)).changed() {
            actions.push(PanelAction::Change(change(*value)));
        }
    });
}

fn repeat(
    ui: &mut egui::Ui,
    actions: &mut Vec<PanelAction>,
    label: &str,
    value: &mut f32,
    change: fn(f32) -> PanelChange,
) {
    ui.horizontal(|ui| {
        ui.label(label);
        if ui
            .add(egui::Slider::new(value, REPEAT_RANGE).step_by(1.0))
            .changed()
        {
            actions.push(PanelAction::Change(change(*value)));
        }
    });
}

fn toggle(
    ui: &mut egui::Ui,
    actions: &mut Vec<PanelAction>,
    label: &str,
    value: &mut bool,
    change: impl Fn(bool) -> PanelChange,
) {
    if ui.checkbox(value, label).changed() {
        actions.push(PanelAction::Change(change(*value)));
    }
}

fn color(
    ui: &mut egui::Ui,
    actions: &mut Vec<PanelAction>,
    label: &str,
    value: &mut [u8; 3],
    change: fn([u8; 3]) -> PanelChange,
) {
    ui.horizontal(|ui| {
        ui.label(label);
        if ui.color_edit_button_srgb(value).changed() {
            actions.push(PanelAction::Change(change(*value)));
        }
    });
}

fn side(ui: &mut egui::Ui, actions: &mut Vec<PanelAction>, value: &mut MaterialSide) {
    let before = *value;
    ui.horizontal(|ui| {
        ui.label("side");
        egui::ComboBox::from_id_source("material_side")
            .selected_text(value.name())
            .show_ui(ui, |ui| {
                for option in MaterialSide::ALL {
                    ui.selectable_value(value, option, option.name());
                }
            });
    });
    if *value != before {
        actions.push(PanelAction::Change(PanelChange::Side(*value)));
    }
}

fn wrap(
    ui: &mut egui::Ui,
    actions: &mut Vec<PanelAction>,
    label: &str,
    value: &mut WrapMode,
    change: fn(WrapMode) -> PanelChange,
) {
    let before = *value;
    ui.horizontal(|ui| {
        ui.label(label);
        egui::ComboBox::from_id_source(label)
            .selected_text(value.name())
            .show_ui(ui, |ui| {
                for option in WrapMode::ALL {
                    ui.selectable_value(value, option, option.name());
                }
            });
    });
    if *value != before {
        actions.push(PanelAction::Change(change(*value)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let p = PanelParams::default();
        assert_eq!(p.side, MaterialSide::Double);
        assert_eq!(p.color, [255, 255, 255]);
        assert_eq!(p.background, [0x44, 0x44, 0x44]);
        assert_eq!(p.roughness, 1.0);
        assert_eq!(p.normal_scale, 0.5);
        assert_eq!(p.displacement_scale, 0.1);
        assert_eq!((p.repeat_x, p.repeat_y), (1.0, 1.0));
        assert_eq!(p.wrap_s, WrapMode::Repeat);
        assert!(p.show_sphere && p.show_cube && p.show_torus);
    }

    #[test]
    fn test_changes_are_clamped() {
        let mut panel = Panel::new();
        assert_eq!(panel.apply(PanelChange::Roughness(2.0)), PanelChange::Roughness(1.0));
        assert_eq!(panel.apply(PanelChange::Ior(0.5)), PanelChange::Ior(1.0));
        assert_eq!(panel.apply(PanelChange::RepeatX(3.4)), PanelChange::RepeatX(3.0));
        assert_eq!(panel.apply(PanelChange::RepeatY(42.0)), PanelChange::RepeatY(10.0));
        assert_eq!(panel.apply(PanelChange::Opacity(f32::NAN)), PanelChange::Opacity(0.0));
        assert_eq!(panel.params().roughness, 1.0);
        assert_eq!(panel.params().repeat_x, 3.0);
    }

    #[test]
    fn test_ior_and_reflectivity_coupled() {
        let mut panel = Panel::new();
        panel.apply(PanelChange::Ior(1.5));
        assert!((panel.params().reflectivity - 0.5).abs() < 1e-5);

        panel.apply(PanelChange::Reflectivity(1.0));
        assert!((panel.params().ior - 2.333).abs() < 1e-2);

        // Only the latest of the pair is replayed
        assert_eq!(panel.overrides(), &[PanelChange::Reflectivity(1.0)]);
    }

    #[test]
    fn test_overrides_keep_latest_per_property() {
        let mut panel = Panel::new();
        panel.apply(PanelChange::Roughness(0.2));
        panel.apply(PanelChange::Metalness(0.8));
        panel.apply(PanelChange::Roughness(0.4));
        panel.apply(PanelChange::Background([0, 0, 0]));
        panel.apply(PanelChange::NormalScale(0.9));

        assert_eq!(
            panel.overrides(),
            &[PanelChange::Metalness(0.8), PanelChange::Roughness(0.4)]
        );
    }

    #[test]
    fn test_replay_onto_rebuilt_material() {
        let mut panel = Panel::new();
        panel.apply(PanelChange::Roughness(0.25));
        panel.apply(PanelChange::Color([255, 0, 0]));
        panel.apply(PanelChange::WrapS(WrapMode::MirroredRepeat));
        panel.apply(PanelChange::DisplacementScale(0.3));

        let mut material = PhysicalMaterial::default();
        panel.replay(&mut material);
        panel.apply_map_settings(&mut material);

        assert_eq!(material.roughness, 0.25);
        assert_eq!(material.color, srgb_to_linear([255, 0, 0]));
        assert_eq!(material.displacement_scale, 0.3);
        assert_eq!(material.normal_scale, 0.5);
        // Side was never edited, so the material keeps its own
        assert_eq!(material.side, PhysicalMaterial::default().side);
    }

    #[test]
    fn test_visibility_is_scene_state() {
        let mut panel = Panel::new();
        panel.apply(PanelChange::Visible(ObjectKind::Cube, false));
        assert!(!panel.params().is_visible(ObjectKind::Cube));
        assert!(panel.params().is_visible(ObjectKind::Torus));
        assert!(panel.overrides().is_empty());
        assert_eq!(
            PanelChange::Visible(ObjectKind::Cube, false).target(),
            ChangeTarget::Scene
        );
    }
}
