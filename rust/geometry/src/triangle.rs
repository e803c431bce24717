// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! World-space triangles and ray/triangle intersection

use crate::bounds::Aabb;
use crate::transform::transform_point;
use nalgebra::{Matrix4, Point3, Vector3};

/// Triangle definition
///
/// Winding is counter-clockwise when viewed from the side the normal points to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub v0: Point3<f64>,
    pub v1: Point3<f64>,
    pub v2: Point3<f64>,
}

impl Triangle {
    /// Create a new triangle
    pub fn new(v0: Point3<f64>, v1: Point3<f64>, v2: Point3<f64>) -> Self {
        Self { v0, v1, v2 }
    }

    /// Unnormalized normal, length is twice the area
    #[inline]
    pub fn scaled_normal(&self) -> Vector3<f64> {
        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;
        edge1.cross(&edge2)
    }

    /// Unit normal, or `None` for a degenerate (zero-area) triangle
    #[inline]
    pub fn normal(&self) -> Option<Vector3<f64>> {
        self.scaled_normal().try_normalize(1e-12)
    }

    /// Calculate triangle area
    pub fn area(&self) -> f64 {
        self.scaled_normal().norm() * 0.5
    }

    pub fn centroid(&self) -> Point3<f64> {
        Point3::from((self.v0.coords + self.v1.coords + self.v2.coords) / 3.0)
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::from_points([&self.v0, &self.v1, &self.v2])
    }

    /// Vertices as an array, in winding order
    #[inline]
    pub fn vertices(&self) -> [Point3<f64>; 3] {
        [self.v0, self.v1, self.v2]
    }

    /// Apply an affine transform to all three vertices.
    ///
    /// A transform with negative determinant flips the winding so the
    /// resulting normal still points outwards.
    pub fn transformed(&self, matrix: &Matrix4<f64>) -> Triangle {
        let p0 = transform_point(matrix, &self.v0);
        let p1 = transform_point(matrix, &self.v1);
        let p2 = transform_point(matrix, &self.v2);
        if matrix.fixed_view::<3, 3>(0, 0).clone_owned().determinant() < 0.0 {
            Triangle::new(p0, p2, p1)
        } else {
            Triangle::new(p0, p1, p2)
        }
    }

    /// Möller–Trumbore ray/triangle intersection.
    ///
    /// Returns `(t, det)` for hits with `t > eps`. The sign of `det` tells the
    /// side that was hit: positive when the ray travels against the normal
    /// (front face), negative when it travels along it (back face).
    pub fn intersect_ray(
        &self,
        origin: &Point3<f64>,
        dir: &Vector3<f64>,
        eps: f64,
    ) -> Option<(f64, f64)> {
        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;

        let pvec = dir.cross(&edge2);
        let det = edge1.dot(&pvec);

        if det.abs() < 1e-14 {
            // Ray is parallel to triangle
            return None;
        }

        let inv_det = 1.0 / det;
        let tvec = origin - self.v0;

        let u = tvec.dot(&pvec) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let qvec = tvec.cross(&edge1);
        let v = dir.dot(&qvec) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = edge2.dot(&qvec) * inv_det;
        if t > eps {
            Some((t, det))
        } else {
            None
        }
    }
}
