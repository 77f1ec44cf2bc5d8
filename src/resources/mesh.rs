//! Mesh data structures and primitive generation
//!
//! The generators follow the usual parametric layouts for spheres, boxes and
//! tori: counter-clockwise front faces, one seam column of duplicated
//! vertices, and UVs with `v` growing downwards to match texture rows.

use crate::backend::types::Vertex;
use glam::{Vec2, Vec3, Vec4};
use std::f32::consts::{PI, TAU};

/// A mesh with vertex and index data
#[derive(Debug, Clone)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub name: String,
}

impl Mesh {
    pub fn new(name: &str) -> Self {
        Self {
            vertices: Vec::new(),
            indices: Vec::new(),
            name: name.to_string(),
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Get vertex data as bytes
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Get index data as bytes
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    /// Axis-aligned bounds of the vertex positions.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let first = self.vertices.first()?.position;
        Some(self.vertices.iter().fold((first, first), |(min, max), v| {
            (min.min(v.position), max.max(v.position))
        }))
    }

    /// UV sphere centered at the origin
    pub fn sphere(radius: f32, width_segments: u32, height_segments: u32) -> Self {
        let mut mesh = Mesh::new("sphere");
        let width_segments = width_segments.max(3);
        let height_segments = height_segments.max(2);
        let row = width_segments + 1;

        for iy in 0..=height_segments {
            let v = iy as f32 / height_segments as f32;
            // Pole vertices sit half a segment over so each pole triangle gets its own UV
            let u_offset = if iy == 0 {
                0.5 / width_segments as f32
            } else if iy == height_segments {
                -0.5 / width_segments as f32
            } else {
                0.0
            };

            for ix in 0..=width_segments {
                let u = ix as f32 / width_segments as f32;
                let phi = u * TAU;
                let theta = v * PI;

                let position = Vec3::new(
                    -radius * phi.cos() * theta.sin(),
                    radius * theta.cos(),
                    radius * phi.sin() * theta.sin(),
                );

                mesh.vertices.push(Vertex {
                    position,
                    normal: position.normalize_or_zero(),
                    uv: Vec2::new(u + u_offset, v),
                    tangent: Vec4::ZERO,
                });
            }
        }

        for iy in 0..height_segments {
            for ix in 0..width_segments {
                let a = iy * row + ix + 1;
                let b = iy * row + ix;
                let c = (iy + 1) * row + ix;
                let d = (iy + 1) * row + ix + 1;

                if iy != 0 {
                    mesh.indices.extend_from_slice(&[a, b, d]);
                }
                if iy != height_segments - 1 {
                    mesh.indices.extend_from_slice(&[b, c, d]);
                }
            }
        }

        mesh.compute_tangents();
        mesh
    }

    /// Box centered at the origin, each face subdivided into a grid
    pub fn cuboid(
        width: f32,
        height: f32,
        depth: f32,
        width_segments: u32,
        height_segments: u32,
        depth_segments: u32,
    ) -> Self {
        let mut mesh = Mesh::new("cube");
        let (ws, hs, ds) = (
            width_segments.max(1),
            height_segments.max(1),
            depth_segments.max(1),
        );

        // (u axis, v axis, w axis, u dir, v dir, face width, face height, face depth, grid x, grid y)
        let faces = [
            (2, 1, 0, -1.0, -1.0, depth, height, width, ds, hs),
            (2, 1, 0, 1.0, -1.0, depth, height, -width, ds, hs),
            (0, 2, 1, 1.0, 1.0, width, depth, height, ws, ds),
            (0, 2, 1, 1.0, -1.0, width, depth, -height, ws, ds),
            (0, 1, 2, 1.0, -1.0, width, height, depth, ws, hs),
            (0, 1, 2, -1.0, -1.0, width, height, -depth, ws, hs),
        ];

        for (u, v, w, udir, vdir, face_w, face_h, face_d, grid_x, grid_y) in faces {
            mesh.push_box_face(u, v, w, udir, vdir, face_w, face_h, face_d, grid_x, grid_y);
        }

        mesh.compute_tangents();
        mesh
    }

    #[allow(clippy::too_many_arguments)]
    fn push_box_face(
        &mut self,
        u: usize,
        v: usize,
        w: usize,
        udir: f32,
        vdir: f32,
        width: f32,
        height: f32,
        depth: f32,
        grid_x: u32,
        grid_y: u32,
    ) {
        let base = self.vertices.len() as u32;
        let segment_width = width / grid_x as f32;
        let segment_height = height / grid_y as f32;
        let depth_half = depth / 2.0;

        for iy in 0..=grid_y {
            let y = iy as f32 * segment_height - height / 2.0;
            for ix in 0..=grid_x {
                let x = ix as f32 * segment_width - width / 2.0;

                let mut position = [0.0f32; 3];
                position[u] = x * udir;
                position[v] = y * vdir;
                position[w] = depth_half;

                let mut normal = [0.0f32; 3];
                normal[w] = if depth > 0.0 { 1.0 } else { -1.0 };

                self.vertices.push(Vertex {
                    position: Vec3::from_array(position),
                    normal: Vec3::from_array(normal),
                    uv: Vec2::new(ix as f32 / grid_x as f32, iy as f32 / grid_y as f32),
                    tangent: Vec4::ZERO,
                });
            }
        }

        let row = grid_x + 1;
        for iy in 0..grid_y {
            for ix in 0..grid_x {
                let a = base + ix + row * iy;
                let b = base + ix + row * (iy + 1);
                let c = base + ix + 1 + row * (iy + 1);
                let d = base + ix + 1 + row * iy;
                self.indices.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }
    }

    /// Torus in the XY plane around the Z axis
    pub fn torus(radius: f32, tube: f32, radial_segments: u32, tubular_segments: u32) -> Self {
        let mut mesh = Mesh::new("torus");
        let radial = radial_segments.max(2);
        let tubular = tubular_segments.max(3);

        for j in 0..=radial {
            for i in 0..=tubular {
                let u = i as f32 / tubular as f32 * TAU;
                let v = j as f32 / radial as f32 * TAU;

                let position = Vec3::new(
                    (radius + tube * v.cos()) * u.cos(),
                    (radius + tube * v.cos()) * u.sin(),
                    tube * v.sin(),
                );
                let center = Vec3::new(radius * u.cos(), radius * u.sin(), 0.0);

                mesh.vertices.push(Vertex {
                    position,
                    normal: (position - center).normalize_or_zero(),
                    uv: Vec2::new(
                        i as f32 / tubular as f32,
                        1.0 - j as f32 / radial as f32,
                    ),
                    tangent: Vec4::ZERO,
                });
            }
        }

        let row = tubular + 1;
        for j in 1..=radial {
            for i in 1..=tubular {
                let a = row * j + i - 1;
                let b = row * (j - 1) + i - 1;
                let c = row * (j - 1) + i;
                let d = row * j + i;
                mesh.indices.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }

        mesh.compute_tangents();
        mesh
    }

    /// Per-vertex tangents from UV gradients.
    ///
    /// The bitangent sign in `tangent.w` points towards the top of the image,
    /// which is what tangent-space normal maps expect.
    pub fn compute_tangents(&mut self) {
        let mut tangents = vec![Vec3::ZERO; self.vertices.len()];
        let mut bitangents = vec![Vec3::ZERO; self.vertices.len()];

        for tri in self.indices.chunks_exact(3) {
            let [i0, i1, i2] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            let (v0, v1, v2) = (&self.vertices[i0], &self.vertices[i1], &self.vertices[i2]);

            let e1 = v1.position - v0.position;
            let e2 = v2.position - v0.position;
            // Flip v so +v points up the image
            let duv1 = Vec2::new(v1.uv.x - v0.uv.x, v0.uv.y - v1.uv.y);
            let duv2 = Vec2::new(v2.uv.x - v0.uv.x, v0.uv.y - v2.uv.y);

            let det = duv1.x * duv2.y - duv2.x * duv1.y;
            if det.abs() < f32::EPSILON {
                continue;
            }
            let r = 1.0 / det;
            let t = (e1 * duv2.y - e2 * duv1.y) * r;
            let b = (e2 * duv1.x - e1 * duv2.x) * r;

            for i in [i0, i1, i2] {
                tangents[i] += t;
                bitangents[i] += b;
            }
        }

        for (i, vertex) in self.vertices.iter_mut().enumerate() {
            let n = vertex.normal;
            let t = tangents[i] - n * n.dot(tangents[i]);
            let t = if t.length_squared() > 1e-12 {
                t.normalize()
            } else {
                n.any_orthonormal_vector()
            };
            let w = if n.cross(t).dot(bitangents[i]) < 0.0 { -1.0 } else { 1.0 };
            vertex.tangent = t.extend(w);
        }
    }
}
