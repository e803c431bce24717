// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Axis-aligned bounding boxes

use nalgebra::{Point2, Point3, Vector3};

/// Axis-aligned bounding box in world units.
///
/// An empty box has `min > max` on every axis, so extending it with the first
/// point yields a degenerate box around that point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl Aabb {
    /// Create a box from its corners
    #[inline]
    pub fn new(min: Point3<f64>, max: Point3<f64>) -> Self {
        Self { min, max }
    }

    /// Create an empty (inverted) box
    #[inline]
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f64::MAX, f64::MAX, f64::MAX),
            max: Point3::new(f64::MIN, f64::MIN, f64::MIN),
        }
    }

    /// Box covering all of space
    #[inline]
    pub fn unbounded() -> Self {
        Self {
            min: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
            max: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
        }
    }

    /// Smallest box containing all points
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3<f64>>) -> Self {
        let mut bounds = Self::empty();
        for p in points {
            bounds.extend_point(p);
        }
        bounds
    }

    /// Check if the box contains nothing
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Grow the box to include a point
    #[inline]
    pub fn extend_point(&mut self, p: &Point3<f64>) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    /// Grow the box to include another box
    #[inline]
    pub fn extend_box(&mut self, other: &Aabb) {
        if other.is_empty() {
            return;
        }
        self.min = self.min.inf(&other.min);
        self.max = self.max.sup(&other.max);
    }

    #[inline]
    pub fn center(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }

    #[inline]
    pub fn extent(&self) -> Vector3<f64> {
        self.max - self.min
    }

    /// Index of the longest axis (0=X, 1=Y, 2=Z)
    #[inline]
    pub fn longest_axis(&self) -> usize {
        let d = self.extent();
        if d.x >= d.y && d.x >= d.z {
            0
        } else if d.y >= d.z {
            1
        } else {
            2
        }
    }

    /// Check if a point lies inside the box (inclusive)
    #[inline]
    pub fn contains(&self, p: &Point3<f64>) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    /// Check if the XY projection of the box contains a point (inclusive)
    #[inline]
    pub fn contains_xy(&self, p: &Point2<f64>) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    /// Slab test: does a ray `origin + t * dir` cross the box for some
    /// `t` in `[0, t_max]`?
    ///
    /// `inv_dir` holds the component-wise reciprocal of the direction; zero
    /// components become infinities, which the slab comparisons handle.
    pub fn intersects_ray(&self, origin: &Point3<f64>, inv_dir: &Vector3<f64>, t_max: f64) -> bool {
        let mut t0 = 0.0f64;
        let mut t1 = t_max;

        for axis in 0..3 {
            let inv = inv_dir[axis];
            let mut near = (self.min[axis] - origin[axis]) * inv;
            let mut far = (self.max[axis] - origin[axis]) * inv;
            // 0 * inf on a slab boundary gives NaN; treat the axis as unconstrained
            if near.is_nan() || far.is_nan() {
                if origin[axis] < self.min[axis] || origin[axis] > self.max[axis] {
                    return false;
                }
                continue;
            }
            if near > far {
                std::mem::swap(&mut near, &mut far);
            }
            t0 = t0.max(near);
            t1 = t1.min(far);
            if t0 > t1 {
                return false;
            }
        }

        true
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_box_extends_to_point() {
        let mut b = Aabb::empty();
        assert!(b.is_empty());
        b.extend_point(&Point3::new(1.0, 2.0, 3.0));
        assert!(!b.is_empty());
        assert_eq!(b.min, Point3::new(1.0, 2.0, 3.0));
        assert_eq!(b.max, Point3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn merging_empty_is_noop() {
        let a = Aabb::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0));
        let mut b = a;
        b.extend_box(&Aabb::empty());
        assert_eq!(b, a);
        let mut c = Aabb::empty();
        c.extend_box(&a);
        assert_eq!(c, a);
    }

    #[test]
    fn longest_axis_picks_largest_extent() {
        let b = Aabb::new(Point3::origin(), Point3::new(1.0, 5.0, 2.0));
        assert_eq!(b.longest_axis(), 1);
    }

    #[test]
    fn vertical_ray_hits_box_above() {
        let b = Aabb::new(Point3::new(0.0, 0.0, 5.0), Point3::new(2.0, 2.0, 6.0));
        let inv = Vector3::new(f64::INFINITY, f64::INFINITY, 1.0);
        assert!(b.intersects_ray(&Point3::new(1.0, 1.0, 0.0), &inv, f64::INFINITY));
        assert!(!b.intersects_ray(&Point3::new(3.0, 1.0, 0.0), &inv, f64::INFINITY));
        // box beyond the allowed distance
        assert!(!b.intersects_ray(&Point3::new(1.0, 1.0, 0.0), &inv, 4.0));
    }

    #[test]
    fn unbounded_contains_everything_in_xy() {
        let b = Aabb::unbounded();
        assert!(b.contains_xy(&Point2::new(1e12, -1e12)));
    }
}
