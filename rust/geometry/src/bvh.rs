// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bounding volume hierarchy over a flat triangle set.
//!
//! The hierarchy is a binary tree built top-down: each node's triangles are
//! split at the median centroid along the longest axis of their centroid
//! bounds, until a node holds at most [`LEAF_SIZE`] triangles or the
//! configured depth limit is reached. Nodes live in one flat vector; a leaf
//! refers to a contiguous range of the reordered triangle list.
//!
//! The tree is read-only after [`Bvh::build`] and can be shared between
//! threads for concurrent queries.

use crate::bounds::Aabb;
use crate::error::{Error, Result};
use crate::triangle::Triangle;
use nalgebra::{Point3, Vector3};
use smallvec::SmallVec;

/// Maximum number of triangles stored in a leaf before splitting
pub const LEAF_SIZE: usize = 4;

/// Minimum ray parameter accepted as a hit
const HIT_EPSILON: f64 = 1e-9;

/// Which side of a triangle a ray may hit.
///
/// A front-face hit is one where the ray travels against the triangle
/// normal (`dot(dir, normal) < 0`); a back-face hit travels along it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceSelectivity {
    FrontFacesOnly,
    BackFacesOnly,
    Both,
}

impl FaceSelectivity {
    /// `det` is the Möller–Trumbore determinant: positive for front faces
    #[inline]
    fn accepts(self, det: f64) -> bool {
        match self {
            FaceSelectivity::FrontFacesOnly => det > 0.0,
            FaceSelectivity::BackFacesOnly => det < 0.0,
            FaceSelectivity::Both => true,
        }
    }
}

/// A half-line `origin + t * dir`, `t >= 0`
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Point3<f64>,
    pub dir: Vector3<f64>,
    inv_dir: Vector3<f64>,
}

impl Ray {
    /// Create a ray; `dir` is normalized
    pub fn new(origin: Point3<f64>, dir: Vector3<f64>) -> Self {
        let dir = dir.normalize();
        Self {
            origin,
            dir,
            inv_dir: dir.map(|c| 1.0 / c),
        }
    }

    /// Ray pointing up the +Z axis
    pub fn up(origin: Point3<f64>) -> Self {
        Self::new(origin, Vector3::z())
    }

    #[inline]
    pub fn point_at(&self, t: f64) -> Point3<f64> {
        self.origin + self.dir * t
    }
}

/// Nearest intersection of a ray with the indexed triangles
#[derive(Debug, Clone, Copy)]
pub struct RayHit {
    /// World position of the hit
    pub position: Point3<f64>,
    /// Unit normal of the hit triangle
    pub normal: Vector3<f64>,
    /// Distance along the ray
    pub t: f64,
    /// Index of the hit triangle in the input face list
    pub triangle: usize,
}

#[derive(Debug, Clone)]
enum NodeKind {
    Leaf { start: usize, count: usize },
    Inner { left: usize, right: usize },
}

#[derive(Debug, Clone)]
struct BvhNode {
    bounds: Aabb,
    kind: NodeKind,
}

/// Triangle bounding volume hierarchy
#[derive(Debug, Clone)]
pub struct Bvh {
    nodes: Vec<BvhNode>,
    /// Triangles in leaf order
    triangles: Vec<Triangle>,
    /// Original face index for each entry of `triangles`
    face_ids: Vec<usize>,
    depth: usize,
}

/// Per-triangle build input
struct BuildItem {
    face: usize,
    bounds: Aabb,
    centroid: Point3<f64>,
}

/// Index of the first of three vertices laid out for triangle `triangle`.
fn first_vertex_index(triangle: usize) -> Result<u32> {
    triangle
        .checked_mul(3)
        .and_then(|v| v.checked_add(2))
        .and_then(|last| u32::try_from(last).ok())
        .map(|last| last - 2)
        .ok_or(Error::IndexOverflow {
            triangles: triangle.saturating_add(1),
        })
}

impl Bvh {
    /// Build the hierarchy from a vertex list and index triples.
    ///
    /// `max_depth` caps the tree depth; nodes at the cap become leaves no
    /// matter how many triangles they hold. Degenerate triangles are kept
    /// but can never be hit.
    pub fn build(vertices: &[Point3<f64>], faces: &[[u32; 3]], max_depth: usize) -> Result<Self> {
        let vertex_count = vertices.len();
        let mut items = Vec::with_capacity(faces.len());
        let mut triangles = Vec::with_capacity(faces.len());

        for (face, idx) in faces.iter().enumerate() {
            if let Some(&index) = idx.iter().find(|&&i| i as usize >= vertex_count) {
                return Err(Error::IndexOutOfBounds {
                    index,
                    vertex_count,
                });
            }
            let tri = Triangle::new(
                vertices[idx[0] as usize],
                vertices[idx[1] as usize],
                vertices[idx[2] as usize],
            );
            items.push(BuildItem {
                face,
                bounds: tri.bounds(),
                centroid: tri.centroid(),
            });
            triangles.push(tri);
        }

        let mut bvh = Self {
            nodes: Vec::with_capacity(faces.len().max(1) * 2),
            triangles: Vec::with_capacity(faces.len()),
            face_ids: Vec::with_capacity(faces.len()),
            depth: 0,
        };

        if !items.is_empty() {
            bvh.build_recursive(&mut items, &triangles, 0, max_depth.max(1));
        }

        Ok(bvh)
    }

    /// Build from world-space triangles directly.
    ///
    /// Fails when the triangles need more vertices than 32-bit indices can
    /// address.
    pub fn from_triangles(triangles: &[Triangle], max_depth: usize) -> Result<Self> {
        let mut vertices = Vec::with_capacity(triangles.len() * 3);
        let mut faces = Vec::with_capacity(triangles.len());
        for (i, tri) in triangles.iter().enumerate() {
            let base = first_vertex_index(i)?;
            vertices.extend_from_slice(&tri.vertices());
            faces.push([base, base + 1, base + 2]);
        }
        Self::build(&vertices, &faces, max_depth)
    }

    /// Returns the node index
    fn build_recursive(
        &mut self,
        items: &mut [BuildItem],
        source: &[Triangle],
        depth: usize,
        max_depth: usize,
    ) -> usize {
        self.depth = self.depth.max(depth + 1);

        let mut bounds = Aabb::empty();
        let mut centroid_bounds = Aabb::empty();
        for item in items.iter() {
            bounds.extend_box(&item.bounds);
            centroid_bounds.extend_point(&item.centroid);
        }

        let node_idx = self.nodes.len();
        if items.len() <= LEAF_SIZE || depth + 1 >= max_depth {
            return self.push_leaf(bounds, items, source);
        }

        let axis = centroid_bounds.longest_axis();
        if centroid_bounds.extent()[axis] <= 0.0 {
            // All centroids coincide; no split can separate them
            return self.push_leaf(bounds, items, source);
        }

        let mid = items.len() / 2;
        items.select_nth_unstable_by(mid, |a, b| a.centroid[axis].total_cmp(&b.centroid[axis]));

        // Reserve the slot, children are filled in after recursion
        self.nodes.push(BvhNode {
            bounds,
            kind: NodeKind::Inner { left: 0, right: 0 },
        });

        let (left_items, right_items) = items.split_at_mut(mid);
        let left = self.build_recursive(left_items, source, depth + 1, max_depth);
        let right = self.build_recursive(right_items, source, depth + 1, max_depth);
        self.nodes[node_idx].kind = NodeKind::Inner { left, right };

        node_idx
    }

    fn push_leaf(&mut self, bounds: Aabb, items: &[BuildItem], source: &[Triangle]) -> usize {
        let start = self.triangles.len();
        for item in items {
            self.triangles.push(source[item.face]);
            self.face_ids.push(item.face);
        }
        self.nodes.push(BvhNode {
            bounds,
            kind: NodeKind::Leaf {
                start,
                count: items.len(),
            },
        });
        self.nodes.len() - 1
    }

    /// Number of indexed triangles
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Depth of the deepest leaf (root alone is depth 1)
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Bounds of every indexed triangle
    pub fn bounds(&self) -> Aabb {
        self.nodes.first().map(|n| n.bounds).unwrap_or_else(Aabb::empty)
    }

    /// Closest hit along the ray among triangles accepted by `selectivity`.
    ///
    /// Misses are `None`, not errors. To enumerate every crossing along a
    /// line, restart the query from a point just past the previous hit.
    pub fn nearest_hit(&self, ray: &Ray, selectivity: FaceSelectivity) -> Option<RayHit> {
        if self.nodes.is_empty() {
            return None;
        }

        let mut best_t = f64::INFINITY;
        let mut best: Option<usize> = None;
        let mut stack: SmallVec<[usize; 64]> = SmallVec::new();
        stack.push(0);

        while let Some(node_idx) = stack.pop() {
            let node = &self.nodes[node_idx];
            if !node.bounds.intersects_ray(&ray.origin, &ray.inv_dir, best_t) {
                continue;
            }
            match node.kind {
                NodeKind::Leaf { start, count } => {
                    for i in start..start + count {
                        if let Some((t, det)) =
                            self.triangles[i].intersect_ray(&ray.origin, &ray.dir, HIT_EPSILON)
                        {
                            if t < best_t && selectivity.accepts(det) {
                                best_t = t;
                                best = Some(i);
                            }
                        }
                    }
                }
                NodeKind::Inner { left, right } => {
                    stack.push(right);
                    stack.push(left);
                }
            }
        }

        let i = best?;
        let normal = self.triangles[i].normal()?;
        Some(RayHit {
            position: ray.point_at(best_t),
            normal,
            t: best_t,
            triangle: self.face_ids[i],
        })
    }

    /// Every accepted crossing along the ray, nearest first.
    ///
    /// Each follow-up query starts `advance` past the previous hit so the
    /// same surface is not reported twice.
    pub fn all_hits(&self, ray: &Ray, selectivity: FaceSelectivity, advance: f64) -> Vec<RayHit> {
        let mut hits = Vec::new();
        let mut current = *ray;
        let mut travelled = 0.0;
        while let Some(mut hit) = self.nearest_hit(&current, selectivity) {
            travelled += hit.t;
            hit.t = travelled;
            hits.push(hit);
            current = Ray::new(hit.position + ray.dir * advance, ray.dir);
            travelled += advance;
        }
        hits
    }
}

impl Default for Bvh {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            triangles: Vec::new(),
            face_ids: Vec::new(),
            depth: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Mesh;
    use approx::assert_relative_eq;

    fn mesh_parts(mesh: &Mesh) -> (Vec<Point3<f64>>, Vec<[u32; 3]>) {
        let vertices = mesh.vertices().collect();
        let faces = (0..mesh.triangle_count()).map(|f| mesh.face(f)).collect();
        (vertices, faces)
    }

    fn box_bvh(min: Point3<f64>, max: Point3<f64>) -> Bvh {
        let (v, f) = mesh_parts(&Mesh::cuboid(min, max));
        Bvh::build(&v, &f, 32).unwrap()
    }

    #[test]
    fn empty_index_never_hits() {
        let bvh = Bvh::build(&[], &[], 16).unwrap();
        assert!(bvh.is_empty());
        assert!(bvh
            .nearest_hit(&Ray::up(Point3::origin()), FaceSelectivity::Both)
            .is_none());
    }

    #[test]
    fn rejects_out_of_range_index() {
        let err = Bvh::build(&[Point3::origin()], &[[0, 1, 2]], 16).unwrap_err();
        assert!(matches!(err, Error::IndexOutOfBounds { index: 1, .. }));
    }

    #[test]
    fn upward_ray_front_face_is_box_bottom() {
        let bvh = box_bvh(Point3::new(0.0, 0.0, 5.0), Point3::new(4.0, 4.0, 8.0));
        let ray = Ray::up(Point3::new(1.3, 2.1, 0.0));

        let front = bvh.nearest_hit(&ray, FaceSelectivity::FrontFacesOnly).unwrap();
        assert_relative_eq!(front.position.z, 5.0, epsilon = 1e-9);
        assert_relative_eq!(front.normal, -Vector3::z(), epsilon = 1e-9);

        let back = bvh.nearest_hit(&ray, FaceSelectivity::BackFacesOnly).unwrap();
        assert_relative_eq!(back.position.z, 8.0, epsilon = 1e-9);
        assert_relative_eq!(back.normal, Vector3::z(), epsilon = 1e-9);
    }

    #[test]
    fn ray_miss_is_none() {
        let bvh = box_bvh(Point3::new(0.0, 0.0, 5.0), Point3::new(4.0, 4.0, 8.0));
        assert!(bvh
            .nearest_hit(&Ray::up(Point3::new(10.0, 10.0, 0.0)), FaceSelectivity::Both)
            .is_none());
        // box is entirely below the origin
        assert!(bvh
            .nearest_hit(&Ray::up(Point3::new(1.0, 1.0, 20.0)), FaceSelectivity::Both)
            .is_none());
    }

    #[test]
    fn all_hits_enumerates_stacked_surfaces() {
        let mut mesh = Mesh::cuboid(Point3::new(0.0, 0.0, 0.0), Point3::new(4.0, 4.0, 3.0));
        mesh.merge(&Mesh::cuboid(
            Point3::new(0.0, 0.0, 6.0),
            Point3::new(4.0, 4.0, 9.0),
        ));
        let (v, f) = mesh_parts(&mesh);
        let bvh = Bvh::build(&v, &f, 32).unwrap();

        let ray = Ray::up(Point3::new(1.7, 0.9, -0.001));
        let bottoms: Vec<f64> = bvh
            .all_hits(&ray, FaceSelectivity::FrontFacesOnly, 0.001)
            .iter()
            .map(|h| h.position.z)
            .collect();
        let tops: Vec<f64> = bvh
            .all_hits(&ray, FaceSelectivity::BackFacesOnly, 0.001)
            .iter()
            .map(|h| h.position.z)
            .collect();

        assert_eq!(bottoms.len(), 2);
        assert_relative_eq!(bottoms[0], 0.0, epsilon = 1e-9);
        assert_relative_eq!(bottoms[1], 6.0, epsilon = 1e-9);
        assert_eq!(tops.len(), 2);
        assert_relative_eq!(tops[0], 3.0, epsilon = 1e-9);
        assert_relative_eq!(tops[1], 9.0, epsilon = 1e-9);
    }

    #[test]
    fn depth_limit_is_respected() {
        // a strip of many small triangles
        let mut tris = Vec::new();
        for i in 0..200 {
            let x = i as f64;
            tris.push(Triangle::new(
                Point3::new(x, 0.0, 1.0),
                Point3::new(x + 1.0, 0.0, 1.0),
                Point3::new(x, 1.0, 1.0),
            ));
        }
        let shallow = Bvh::from_triangles(&tris, 3).unwrap();
        assert!(shallow.depth() <= 3);
        assert_eq!(shallow.triangle_count(), 200);

        let deep = Bvh::from_triangles(&tris, 64).unwrap();
        assert!(deep.depth() > 3);

        // both answer the same query
        let ray = Ray::up(Point3::new(150.2, 0.3, 0.0));
        let a = shallow.nearest_hit(&ray, FaceSelectivity::Both).unwrap();
        let b = deep.nearest_hit(&ray, FaceSelectivity::Both).unwrap();
        assert_eq!(a.triangle, b.triangle);
        assert_eq!(a.triangle, 150);
    }

    #[test]
    fn vertex_indices_stop_at_u32_range() {
        assert_eq!(first_vertex_index(0).unwrap(), 0);
        assert_eq!(first_vertex_index(1_431_655_764).unwrap(), 4_294_967_292);
        assert!(matches!(
            first_vertex_index(1_431_655_765),
            Err(Error::IndexOverflow {
                triangles: 1_431_655_766
            })
        ));
    }
}
