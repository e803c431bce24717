// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integer XY grid of pillar columns.

use nalgebra::Point2;
use pillar_geometry::Aabb;

/// Column grid aligned to multiples of the pillar size.
///
/// Cell `(x, y)` spans `[(left + x) * p, (left + x + 1) * p]` in X (and
/// likewise in Y), where `p` is the pillar size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SupportGrid {
    left: i64,
    bottom: i64,
    width: usize,
    height: usize,
    pillar_size: f64,
}

impl SupportGrid {
    /// Grid covering the XY extent of `bounds`.
    ///
    /// An empty box yields an empty grid. `pillar_size` must be positive
    /// and finite.
    pub fn from_bounds(bounds: &Aabb, pillar_size: f64) -> Self {
        if bounds.is_empty() || !pillar_size.is_finite() || pillar_size <= 0.0 {
            return Self::empty(pillar_size);
        }

        let left = (bounds.min.x / pillar_size).floor() as i64;
        let bottom = (bounds.min.y / pillar_size).floor() as i64;
        // A box flat in X or Y still needs one column of cells
        let right = ((bounds.max.x / pillar_size).ceil() as i64).max(left + 1);
        let top = ((bounds.max.y / pillar_size).ceil() as i64).max(bottom + 1);

        Self {
            left,
            bottom,
            width: (right - left) as usize,
            height: (top - bottom) as usize,
            pillar_size,
        }
    }

    pub fn empty(pillar_size: f64) -> Self {
        Self {
            left: 0,
            bottom: 0,
            width: 0,
            height: 0,
            pillar_size,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn pillar_size(&self) -> f64 {
        self.pillar_size
    }

    pub fn cell_count(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.cell_count() == 0
    }

    /// World XY of a cell's centre.
    pub fn cell_center(&self, x: usize, y: usize) -> Point2<f64> {
        let half = self.pillar_size / 2.0;
        Point2::new(
            (self.left + x as i64) as f64 * self.pillar_size + half,
            (self.bottom + y as i64) as f64 * self.pillar_size + half,
        )
    }

    /// Cell containing a world XY point, if it is inside the grid.
    ///
    /// Points on a shared edge belong to the higher cell, except on the
    /// grid's far edges.
    pub fn cell_of(&self, point: &Point2<f64>) -> Option<(usize, usize)> {
        if self.is_empty() {
            return None;
        }
        let locate = |coord: f64, origin: i64, count: usize| -> Option<usize> {
            let offset = (coord / self.pillar_size).floor() as i64 - origin;
            if offset == count as i64 && coord == (origin + count as i64) as f64 * self.pillar_size {
                return Some(count - 1);
            }
            (0..count as i64).contains(&offset).then_some(offset as usize)
        };
        Some((
            locate(point.x, self.left, self.width)?,
            locate(point.y, self.bottom, self.height)?,
        ))
    }

    /// World XY rectangle covered by the grid, as a box with zero height.
    pub fn world_bounds(&self) -> Aabb {
        if self.is_empty() {
            return Aabb::empty();
        }
        let p = self.pillar_size;
        Aabb::new(
            [self.left as f64 * p, self.bottom as f64 * p, 0.0].into(),
            [
                (self.left + self.width as i64) as f64 * p,
                (self.bottom + self.height as i64) as f64 * p,
                0.0,
            ]
            .into(),
        )
    }

    /// All cells, row by row.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> {
        let width = self.width;
        (0..self.height).flat_map(move |y| (0..width).map(move |x| (x, y)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    fn bounds(min: [f64; 3], max: [f64; 3]) -> Aabb {
        Aabb::new(min.into(), max.into())
    }

    #[test]
    fn grid_snaps_outwards() {
        let grid = SupportGrid::from_bounds(&bounds([-1.0, 0.5, 0.0], [3.1, 3.9, 5.0]), 2.0);
        assert_eq!((grid.width(), grid.height()), (3, 2));
        assert_relative_eq!(grid.cell_center(0, 0), Point2::new(-1.0, 1.0));
        assert_relative_eq!(grid.cell_center(2, 1), Point2::new(3.0, 3.0));

        let covered = grid.world_bounds();
        assert_relative_eq!(covered.min, Point3::new(-2.0, 0.0, 0.0));
        assert_relative_eq!(covered.max, Point3::new(4.0, 4.0, 0.0));
    }

    #[test]
    fn empty_bounds_give_empty_grid() {
        let grid = SupportGrid::from_bounds(&Aabb::empty(), 2.0);
        assert!(grid.is_empty());
        assert_eq!(grid.cells().count(), 0);
        assert!(grid.cell_of(&Point2::origin()).is_none());
    }

    #[test]
    fn cells_are_row_major() {
        let grid = SupportGrid::from_bounds(&bounds([0.0, 0.0, 0.0], [4.0, 4.0, 1.0]), 2.0);
        let cells: Vec<_> = grid.cells().collect();
        assert_eq!(cells, vec![(0, 0), (1, 0), (0, 1), (1, 1)]);
    }

    #[test]
    fn grid_covers_every_point_of_the_box() {
        let cases = [
            (bounds([0.0, 0.0, 0.0], [4.0, 4.0, 1.0]), 2.0),
            (bounds([-3.7, 1.2, 0.0], [5.3, 1.2, 0.0]), 1.5),
            (bounds([10.0, -10.0, 2.0], [10.0, -10.0, 2.0]), 3.0),
            (bounds([-0.25, -7.5, 0.0], [12.75, 0.1, 9.0]), 1.75),
        ];
        for (b, p) in cases {
            let grid = SupportGrid::from_bounds(&b, p);
            assert!(grid.width() >= 1 && grid.height() >= 1);
            for fx in [0.0, 0.13, 0.5, 0.77, 1.0] {
                for fy in [0.0, 0.31, 0.5, 0.9, 1.0] {
                    let point = Point2::new(
                        b.min.x + (b.max.x - b.min.x) * fx,
                        b.min.y + (b.max.y - b.min.y) * fy,
                    );
                    assert!(
                        grid.cell_of(&point).is_some(),
                        "{point:?} outside grid for pillar {p}"
                    );
                }
            }
        }
    }
}
