//! Preview scene: three primitives sharing one material, fixed lighting,
//! and an orbiting camera.

mod camera;
mod camera_controller;
mod light;
mod transform;

pub use camera::*;
pub use camera_controller::*;
pub use light::*;
pub use transform::*;

use std::sync::Arc;

use glam::Vec3;

use crate::resources::{hex_to_rgb, Mesh};

/// The primitive a preview object shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Sphere,
    Cube,
    Torus,
}

impl ObjectKind {
    pub const ALL: [ObjectKind; 3] = [ObjectKind::Sphere, ObjectKind::Cube, ObjectKind::Torus];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            ObjectKind::Sphere => "sphere",
            ObjectKind::Cube => "cube",
            ObjectKind::Torus => "torus",
        }
    }

    /// Fixed resting position of the object.
    pub fn position(self) -> Vec3 {
        match self {
            ObjectKind::Sphere => Vec3::new(-35.0, 0.0, 0.0),
            ObjectKind::Cube => Vec3::ZERO,
            ObjectKind::Torus => Vec3::new(35.0, 0.0, 0.0),
        }
    }

    /// Build the object's geometry.
    pub fn build_mesh(self) -> Mesh {
        match self {
            ObjectKind::Sphere => Mesh::sphere(10.0, 128, 128),
            ObjectKind::Cube => Mesh::cuboid(15.0, 15.0, 15.0, 64, 64, 64),
            ObjectKind::Torus => Mesh::torus(10.0, 3.0, 128, 64),
        }
    }
}

/// One mesh instance of the preview.
#[derive(Debug, Clone)]
pub struct PreviewObject {
    pub kind: ObjectKind,
    pub mesh: Arc<Mesh>,
    pub transform: Transform,
    pub visible: bool,
}

impl PreviewObject {
    pub fn new(kind: ObjectKind, mesh: Arc<Mesh>) -> Self {
        Self {
            kind,
            mesh,
            transform: Transform::from_position(kind.position()),
            visible: true,
        }
    }
}

/// Geometry is expensive to tessellate, so it is built once and shared by
/// every rebuild.
#[derive(Debug, Clone)]
pub struct MeshLibrary {
    meshes: [Arc<Mesh>; 3],
}

impl Default for MeshLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl MeshLibrary {
    pub fn new() -> Self {
        Self {
            meshes: ObjectKind::ALL.map(|kind| Arc::new(kind.build_mesh())),
        }
    }

    pub fn get(&self, kind: ObjectKind) -> &Arc<Mesh> {
        &self.meshes[kind.index()]
    }
}

/// Everything drawn in a frame, minus the material.
#[derive(Debug, Clone)]
pub struct Scene {
    pub camera: Camera,
    pub lighting: Lighting,
    pub objects: Vec<PreviewObject>,
    /// sRGB clear color.
    pub background: [u8; 3],
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        Self {
            camera: Camera::default(),
            lighting: Lighting::studio(),
            objects: Vec::new(),
            background: hex_to_rgb(0x444444),
        }
    }

    pub fn clear(&mut self) {
        self.objects.clear();
    }

    /// Replace the objects with a fresh sphere, cube and torus.
    pub fn populate(&mut self, meshes: &MeshLibrary) {
        self.objects = ObjectKind::ALL
            .iter()
            .map(|&kind| PreviewObject::new(kind, Arc::clone(meshes.get(kind))))
            .collect();
    }

    pub fn object(&self, kind: ObjectKind) -> Option<&PreviewObject> {
        self.objects.iter().find(|o| o.kind == kind)
    }

    pub fn object_mut(&mut self, kind: ObjectKind) -> Option<&mut PreviewObject> {
        self.objects.iter_mut().find(|o| o.kind == kind)
    }

    pub fn visible_objects(&self) -> impl Iterator<Item = &PreviewObject> {
        self.objects.iter().filter(|o| o.visible)
    }

    /// Set the same euler rotation on every object.
    pub fn set_rotation(&mut self, euler: Vec3) {
        for object in &mut self.objects {
            object.transform.set_euler(euler);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_populate_places_objects() {
        let meshes = MeshLibrary::new();
        let mut scene = Scene::new();
        scene.populate(&meshes);

        assert_eq!(scene.objects.len(), 3);
        assert_eq!(
            scene.object(ObjectKind::Sphere).map(|o| o.transform.position),
            Some(Vec3::new(-35.0, 0.0, 0.0))
        );
        assert_eq!(
            scene.object(ObjectKind::Torus).map(|o| o.transform.position),
            Some(Vec3::new(35.0, 0.0, 0.0))
        );

        // Meshes are shared with the library, not rebuilt
        let cube = scene.object(ObjectKind::Cube).unwrap();
        assert!(Arc::ptr_eq(&cube.mesh, meshes.get(ObjectKind::Cube)));

        scene.clear();
        assert!(scene.objects.is_empty());
    }

    #[test]
    fn test_visibility_and_rotation() {
        let mut scene = Scene::new();
        scene.populate(&MeshLibrary::new());
        scene.object_mut(ObjectKind::Cube).unwrap().visible = false;
        assert_eq!(scene.visible_objects().count(), 2);

        scene.set_rotation(Vec3::new(0.3, -0.2, 0.0));
        for object in &scene.objects {
            assert!((object.transform.euler() - Vec3::new(0.3, -0.2, 0.0)).length() < 1e-5);
        }
    }

    #[test]
    fn test_sphere_bounds() {
        let (min, max) = ObjectKind::Sphere.build_mesh().bounds().unwrap();
        assert!((max.y - 10.0).abs() < 1e-4);
        assert!((min.y + 10.0).abs() < 1e-4);
    }
}
