//! Wavefront OBJ export.
//!
//! Geometry only: one `o` group per visible object with world-space
//! positions and normals. Indices are global and 1-based.

use std::fmt::Write as _;

use crate::scene::Scene;

pub(super) fn export_obj(scene: &Scene) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# material-preview {}", env!("CARGO_PKG_VERSION"));

    let mut base = 1usize;
    for object in scene.visible_objects() {
        let mesh = &object.mesh;
        let transform = &object.transform;
        let _ = writeln!(out, "o {}", object.kind.name());

        for vertex in &mesh.vertices {
            let p = transform.transform_point(vertex.position);
            let _ = writeln!(out, "v {} {} {}", p.x, p.y, p.z);
        }
        // OBJ texture space has v pointing up
        for vertex in &mesh.vertices {
            let _ = writeln!(out, "vt {} {}", vertex.uv.x, 1.0 - vertex.uv.y);
        }
        for vertex in &mesh.vertices {
            let n = transform.transform_normal(vertex.normal);
            let _ = writeln!(out, "vn {} {} {}", n.x, n.y, n.z);
        }

        for tri in mesh.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| i as usize + base);
            let _ = writeln!(out, "f {a}/{a}/{a} {b}/{b}/{b} {c}/{c}/{c}");
        }
        base += mesh.vertex_count();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{MeshLibrary, ObjectKind};

    fn scene() -> Scene {
        let mut scene = Scene::new();
        scene.populate(&MeshLibrary::new());
        scene
    }

    #[test]
    fn test_one_group_per_visible_object() {
        let mut scene = scene();
        scene.object_mut(ObjectKind::Cube).unwrap().visible = false;
        let text = export_obj(&scene);
        let groups: Vec<&str> = text.lines().filter(|l| l.starts_with("o ")).collect();
        assert_eq!(groups, vec!["o sphere", "o torus"]);
    }

    #[test]
    fn test_counts_and_indices() {
        let scene = scene();
        let text = export_obj(&scene);
        let total_vertices: usize = scene.objects.iter().map(|o| o.mesh.vertex_count()).sum();
        let total_triangles: usize = scene.objects.iter().map(|o| o.mesh.triangle_count()).sum();

        assert_eq!(text.lines().filter(|l| l.starts_with("v ")).count(), total_vertices);
        assert_eq!(text.lines().filter(|l| l.starts_with("vt ")).count(), total_vertices);
        assert_eq!(text.lines().filter(|l| l.starts_with("vn ")).count(), total_vertices);
        assert_eq!(text.lines().filter(|l| l.starts_with("f ")).count(), total_triangles);

        let max_index = text
            .lines()
            .filter(|l| l.starts_with("f "))
            .flat_map(|l| l[2..].split(' '))
            .map(|v| v.split('/').next().unwrap().parse::<usize>().unwrap())
            .max()
            .unwrap();
        assert_eq!(max_index, total_vertices);
    }

    #[test]
    fn test_positions_are_world_space() {
        let mut scene = scene();
        scene.objects.retain(|o| o.kind == ObjectKind::Torus);
        let text = export_obj(&scene);
        let xs: Vec<f32> = text
            .lines()
            .filter(|l| l.starts_with("v "))
            .map(|l| l.split(' ').nth(1).unwrap().parse().unwrap())
            .collect();
        let mean = xs.iter().sum::<f32>() / xs.len() as f32;
        assert!((mean - ObjectKind::Torus.position().x).abs() < 1.0);
    }
}
