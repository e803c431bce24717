// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh data structures

use crate::bounds::Aabb;
use crate::error::{Error, Result};
use crate::transform::transform_point;
use crate::triangle::Triangle;
use nalgebra::{Matrix4, Point3};

/// Triangle mesh
///
/// Immutable once shared into the scene; face normals are derived from the
/// counter-clockwise winding of each index triple.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    /// Vertex positions (x, y, z)
    pub positions: Vec<f64>,
    /// Triangle indices (i0, i1, i2)
    pub indices: Vec<u32>,
}

impl Mesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self {
            positions: Vec::new(),
            indices: Vec::new(),
        }
    }

    /// Create a mesh with capacity
    pub fn with_capacity(vertex_count: usize, index_count: usize) -> Self {
        Self {
            positions: Vec::with_capacity(vertex_count * 3),
            indices: Vec::with_capacity(index_count),
        }
    }

    /// Build a mesh from vertices and index triples, checking every index
    pub fn from_parts(vertices: &[Point3<f64>], faces: &[[u32; 3]]) -> Result<Self> {
        let mut mesh = Self::with_capacity(vertices.len(), faces.len() * 3);
        for v in vertices {
            mesh.add_vertex(*v);
        }
        for face in faces {
            mesh.add_triangle(face[0], face[1], face[2]);
        }
        mesh.validate()?;
        Ok(mesh)
    }

    /// Add a vertex, returning its index
    #[inline]
    pub fn add_vertex(&mut self, position: Point3<f64>) -> u32 {
        let index = self.vertex_count() as u32;
        self.positions.push(position.x);
        self.positions.push(position.y);
        self.positions.push(position.z);
        index
    }

    /// Add a triangle
    #[inline]
    pub fn add_triangle(&mut self, i0: u32, i1: u32, i2: u32) {
        self.indices.push(i0);
        self.indices.push(i1);
        self.indices.push(i2);
    }

    /// Check that the index buffer is whole triangles referencing existing vertices
    pub fn validate(&self) -> Result<()> {
        if self.positions.len() % 3 != 0 {
            return Err(Error::InvalidMesh(format!(
                "position buffer length {} is not a multiple of 3",
                self.positions.len()
            )));
        }
        if self.indices.len() % 3 != 0 {
            return Err(Error::InvalidMesh(format!(
                "index buffer length {} is not a multiple of 3",
                self.indices.len()
            )));
        }
        let vertex_count = self.vertex_count();
        if let Some(&index) = self.indices.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(Error::IndexOutOfBounds {
                index,
                vertex_count,
            });
        }
        Ok(())
    }

    /// Get vertex count
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    /// Get triangle count
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Check if mesh is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Position of a vertex
    #[inline]
    pub fn vertex(&self, index: u32) -> Point3<f64> {
        let i = index as usize * 3;
        Point3::new(self.positions[i], self.positions[i + 1], self.positions[i + 2])
    }

    /// Index triple of a face
    #[inline]
    pub fn face(&self, face: usize) -> [u32; 3] {
        let i = face * 3;
        [self.indices[i], self.indices[i + 1], self.indices[i + 2]]
    }

    /// Local-space triangle of a face
    #[inline]
    pub fn triangle(&self, face: usize) -> Triangle {
        let [a, b, c] = self.face(face);
        Triangle::new(self.vertex(a), self.vertex(b), self.vertex(c))
    }

    /// Iterate over all faces as local-space triangles
    pub fn triangles(&self) -> impl Iterator<Item = Triangle> + '_ {
        (0..self.triangle_count()).map(move |f| self.triangle(f))
    }

    /// Iterate over vertex positions
    pub fn vertices(&self) -> impl Iterator<Item = Point3<f64>> + '_ {
        self.positions
            .chunks_exact(3)
            .map(|c| Point3::new(c[0], c[1], c[2]))
    }

    /// Calculate local bounds
    pub fn bounds(&self) -> Aabb {
        let mut bounds = Aabb::empty();
        self.vertices().for_each(|p| bounds.extend_point(&p));
        bounds
    }

    /// Bounds of the mesh after applying `matrix` to every vertex
    pub fn transformed_bounds(&self, matrix: &Matrix4<f64>) -> Aabb {
        let mut bounds = Aabb::empty();
        self.vertices()
            .for_each(|p| bounds.extend_point(&transform_point(matrix, &p)));
        bounds
    }

    /// Merge another mesh into this one
    pub fn merge(&mut self, other: &Mesh) {
        if other.is_empty() {
            return;
        }

        let vertex_offset = self.vertex_count() as u32;

        self.positions.reserve(other.positions.len());
        self.indices.reserve(other.indices.len());

        self.positions.extend_from_slice(&other.positions);
        self.indices
            .extend(other.indices.iter().map(|&i| i + vertex_offset));
    }

    /// Axis-aligned unit cube centred at the origin, outward-facing winding.
    ///
    /// Pillars are instances of this cube scaled and translated by their
    /// item matrix.
    pub fn unit_cube() -> Mesh {
        let min = Point3::new(-0.5, -0.5, -0.5);
        let max = Point3::new(0.5, 0.5, 0.5);
        let mut mesh = Mesh::with_capacity(8, 36);

        mesh.add_vertex(Point3::new(min.x, min.y, min.z)); // 0
        mesh.add_vertex(Point3::new(max.x, min.y, min.z)); // 1
        mesh.add_vertex(Point3::new(max.x, max.y, min.z)); // 2
        mesh.add_vertex(Point3::new(min.x, max.y, min.z)); // 3
        mesh.add_vertex(Point3::new(min.x, min.y, max.z)); // 4
        mesh.add_vertex(Point3::new(max.x, min.y, max.z)); // 5
        mesh.add_vertex(Point3::new(max.x, max.y, max.z)); // 6
        mesh.add_vertex(Point3::new(min.x, max.y, max.z)); // 7

        // -Z
        mesh.add_triangle(0, 2, 1);
        mesh.add_triangle(0, 3, 2);
        // +Z
        mesh.add_triangle(4, 5, 6);
        mesh.add_triangle(4, 6, 7);
        // -X
        mesh.add_triangle(0, 4, 7);
        mesh.add_triangle(0, 7, 3);
        // +X
        mesh.add_triangle(1, 2, 6);
        mesh.add_triangle(1, 6, 5);
        // -Y
        mesh.add_triangle(0, 1, 5);
        mesh.add_triangle(0, 5, 4);
        // +Y
        mesh.add_triangle(3, 7, 6);
        mesh.add_triangle(3, 6, 2);

        mesh
    }

    /// Axis-aligned box between two corners, outward-facing winding
    pub fn cuboid(min: Point3<f64>, max: Point3<f64>) -> Mesh {
        let mut mesh = Self::unit_cube();
        let center = nalgebra::center(&min, &max);
        let size = max - min;
        for chunk in mesh.positions.chunks_exact_mut(3) {
            chunk[0] = center.x + chunk[0] * size.x;
            chunk[1] = center.y + chunk[1] * size.y;
            chunk[2] = center.z + chunk[2] * size.z;
        }
        mesh
    }
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new()
    }
}
