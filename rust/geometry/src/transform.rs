// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared transform utilities
//!
//! Item matrices are column-major 4x4 affine transforms mapping local
//! coordinates to parent coordinates (translation in column 3).

use nalgebra::{Matrix4, Point3, Vector3};

/// Transform a point by an affine matrix
#[inline]
pub fn transform_point(matrix: &Matrix4<f64>, point: &Point3<f64>) -> Point3<f64> {
    matrix.transform_point(point)
}

/// Build `translation * scale`: scales about the origin, then moves.
pub fn scale_translation(scale: &Vector3<f64>, translation: &Vector3<f64>) -> Matrix4<f64> {
    let mut transform = Matrix4::new_nonuniform_scaling(scale);
    transform[(0, 3)] = translation.x;
    transform[(1, 3)] = translation.y;
    transform[(2, 3)] = translation.z;
    transform
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn scale_then_translate() {
        let m = scale_translation(&Vector3::new(2.0, 2.0, 10.0), &Vector3::new(1.0, 2.0, 5.0));
        let p = transform_point(&m, &Point3::new(0.5, 0.5, 0.5));
        assert_relative_eq!(p, Point3::new(2.0, 3.0, 10.0));
    }
}
