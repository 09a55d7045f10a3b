// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Cityfuse Contributors

//! Mesh representation
//!
//! A mesh is built once from a merged record, exported once, then dropped.
//! Vertices are welded within a tolerance so wall/roof seams share vertices;
//! faces are grouped into contiguous ranges per material class.

use ahash::AHashMap;
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Vertex with position and normal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Vertex {
    pub position: Point3<f64>,
    pub normal: Vector3<f64>,
}

impl Vertex {
    pub fn new(position: Point3<f64>, normal: Vector3<f64>) -> Self {
        Self { position, normal }
    }
}

/// Triangle defined by three vertex indices.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Triangle {
    pub indices: [usize; 3],
}

impl Triangle {
    pub fn new(indices: [usize; 3]) -> Self {
        Self { indices }
    }
}

/// Render material of a face, derived from the source surface semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialClass {
    Roof,
    Wall,
    Ground,
}

impl MaterialClass {
    pub fn name(&self) -> &'static str {
        match self {
            MaterialClass::Roof => "roof",
            MaterialClass::Wall => "wall",
            MaterialClass::Ground => "ground",
        }
    }

    /// Fixed default base color (linear RGBA).
    pub fn base_color(&self) -> [f32; 4] {
        match self {
            MaterialClass::Roof => [0.72, 0.28, 0.22, 1.0],
            MaterialClass::Wall => [0.85, 0.82, 0.76, 1.0],
            MaterialClass::Ground => [0.36, 0.39, 0.34, 1.0],
        }
    }
}

/// Contiguous triangle range rendered with one material.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MaterialRange {
    pub class: MaterialClass,
    /// First triangle of the range.
    pub start: usize,
    /// Number of triangles.
    pub count: usize,
}

/// Triangular mesh with per-range materials.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub triangles: Vec<Triangle>,
    pub ranges: Vec<MaterialRange>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Material of the triangle at `index`, if it falls inside a range.
    pub fn material_of(&self, index: usize) -> Option<MaterialClass> {
        self.ranges
            .iter()
            .find(|r| index >= r.start && index < r.start + r.count)
            .map(|r| r.class)
    }

    /// Recompute vertex normals as the area-weighted average of incident face
    /// normals.
    pub fn recompute_normals(&mut self) {
        if self.vertices.is_empty() || self.triangles.is_empty() {
            return;
        }

        let mut sums: Vec<Vector3<f64>> = vec![Vector3::zeros(); self.vertices.len()];
        for triangle in &self.triangles {
            let v0 = &self.vertices[triangle.indices[0]].position;
            let v1 = &self.vertices[triangle.indices[1]].position;
            let v2 = &self.vertices[triangle.indices[2]].position;
            let face = (v1 - v0).cross(&(v2 - v0));
            if face.norm() > 1e-12 {
                for &idx in &triangle.indices {
                    sums[idx] += face;
                }
            }
        }

        for (vertex, sum) in self.vertices.iter_mut().zip(sums) {
            if sum.norm() > 1e-12 {
                vertex.normal = sum.normalize();
            } else {
                vertex.normal = Vector3::z();
            }
        }
    }
}

/// Incremental mesh assembly with coordinate welding.
///
/// Positions within `tolerance` of an already-inserted vertex reuse its
/// index, keeping seams between adjacent surfaces shared.
pub struct MeshWriter {
    mesh: Mesh,
    lookup: AHashMap<[i64; 3], usize>,
    inv_tolerance: f64,
}

impl MeshWriter {
    pub fn new(tolerance: f64) -> Self {
        Self {
            mesh: Mesh::new(),
            lookup: AHashMap::new(),
            inv_tolerance: 1.0 / tolerance.max(1e-12),
        }
    }

    fn key(&self, p: &Point3<f64>) -> [i64; 3] {
        [
            (p.x * self.inv_tolerance).round() as i64,
            (p.y * self.inv_tolerance).round() as i64,
            (p.z * self.inv_tolerance).round() as i64,
        ]
    }

    /// Insert or reuse a vertex, returning its index.
    pub fn add_vertex(&mut self, position: Point3<f64>) -> usize {
        let key = self.key(&position);
        if let Some(&idx) = self.lookup.get(&key) {
            return idx;
        }
        let idx = self.mesh.vertices.len();
        self.mesh
            .vertices
            .push(Vertex::new(position, Vector3::z()));
        self.lookup.insert(key, idx);
        idx
    }

    pub fn add_triangle(&mut self, indices: [usize; 3]) {
        self.mesh.triangles.push(Triangle::new(indices));
    }

    pub fn triangle_count(&self) -> usize {
        self.mesh.triangles.len()
    }

    /// Close a material range covering triangles `[start..len)`.
    pub fn close_range(&mut self, class: MaterialClass, start: usize) {
        let count = self.mesh.triangles.len() - start;
        if count > 0 {
            self.mesh.ranges.push(MaterialRange { class, start, count });
        }
    }

    /// Finish: recompute normals and hand out the mesh.
    pub fn finish(mut self) -> Mesh {
        self.mesh.recompute_normals();
        self.mesh
    }
}
