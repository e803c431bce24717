// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Face classification by orientation.
//!
//! Angles are measured between a face's world normal and straight down
//! (`-Z`): 0° is a ceiling facing the bed, 90° a vertical wall and 180° a
//! floor facing up.

use pillar_geometry::Triangle;
use pillar_scene::{ItemKey, Scene};

/// Faces with every vertex at or below this height rest on the bed.
pub const BED_EPSILON: f64 = 0.01;

/// Angle in degrees between the face normal and `-Z`, in `[0, 180]`.
///
/// `None` for degenerate faces.
pub fn angle_from_up(triangle: &Triangle) -> Option<f64> {
    let normal = triangle.normal()?;
    // dot(normal, -Z)
    Some((-normal.z).clamp(-1.0, 1.0).acos().to_degrees())
}

/// Downward-facing within `max_angle` of straight down, and not lying on
/// the bed.
pub fn is_overhang(triangle: &Triangle, max_angle: f64) -> bool {
    let above_bed = triangle.vertices().iter().any(|v| v.z > BED_EPSILON);
    above_bed && angle_from_up(triangle).is_some_and(|a| a <= max_angle)
}

/// Horizontal or upward-facing: something can stand on it.
pub fn is_landing_surface(triangle: &Triangle) -> bool {
    angle_from_up(triangle).is_some_and(|a| a >= 90.0)
}

/// World-space triangles of one item's mesh.
pub fn world_triangles(scene: &Scene, key: ItemKey) -> impl Iterator<Item = Triangle> + '_ {
    let matrix = scene.world_matrix(key);
    scene
        .item(key)
        .and_then(|item| item.geometry())
        .into_iter()
        .flat_map(move |mesh| mesh.triangles().map(move |t| t.transformed(&matrix)))
}

/// World-space triangles of the given items that pass `keep`.
pub fn collect_faces<F>(scene: &Scene, items: &[ItemKey], keep: F) -> Vec<Triangle>
where
    F: Fn(&Triangle) -> bool,
{
    items
        .iter()
        .flat_map(|&key| world_triangles(scene, key))
        .filter(|t| keep(t))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Matrix4, Vector3};
    use pillar_geometry::Mesh;
    use pillar_scene::MeshItem;

    fn tri(a: [f64; 3], b: [f64; 3], c: [f64; 3]) -> Triangle {
        Triangle::new(a.into(), b.into(), c.into())
    }

    #[test]
    fn angle_of_axis_aligned_faces() {
        // counter-clockwise seen from below: normal -Z
        let ceiling = tri([0.0, 0.0, 5.0], [0.0, 1.0, 5.0], [1.0, 0.0, 5.0]);
        let floor = tri([0.0, 0.0, 5.0], [1.0, 0.0, 5.0], [0.0, 1.0, 5.0]);
        let wall = tri([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]);

        assert_relative_eq!(angle_from_up(&ceiling).unwrap(), 0.0, epsilon = 1e-9);
        assert_relative_eq!(angle_from_up(&floor).unwrap(), 180.0, epsilon = 1e-9);
        assert_relative_eq!(angle_from_up(&wall).unwrap(), 90.0, epsilon = 1e-9);
    }

    #[test]
    fn overhang_threshold_is_inclusive() {
        // 45 degree slope facing down and +X
        let slope = tri([0.0, 0.0, 5.0], [0.0, 1.0, 5.0], [1.0, 0.0, 6.0]);
        let angle = angle_from_up(&slope).unwrap();
        assert_relative_eq!(angle, 45.0, epsilon = 1e-9);
        assert!(is_overhang(&slope, angle));
        assert!(!is_overhang(&slope, 30.0));
        assert!(!is_landing_surface(&slope));
    }

    #[test]
    fn faces_on_the_bed_never_need_support() {
        let on_bed = tri([0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 0.0, 0.0]);
        assert!(!is_overhang(&on_bed, 90.0));
        let barely_above = tri([0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 0.0, 0.02]);
        assert!(is_overhang(&barely_above, 90.0));
    }

    #[test]
    fn degenerate_faces_are_neither() {
        let line = tri([0.0, 0.0, 1.0], [1.0, 0.0, 1.0], [2.0, 0.0, 1.0]);
        assert!(angle_from_up(&line).is_none());
        assert!(!is_overhang(&line, 90.0));
        assert!(!is_landing_surface(&line));
    }

    #[test]
    fn collect_uses_world_transforms() {
        let mut scene = Scene::new();
        let root = scene.root();
        let lifted = scene
            .add_item(
                root,
                MeshItem::with_mesh("cube", Mesh::unit_cube())
                    .matrix(Matrix4::new_translation(&Vector3::new(0.0, 0.0, 3.0))),
            )
            .unwrap();

        let overhangs = collect_faces(&scene, &[lifted], |t| is_overhang(t, 45.0));
        assert_eq!(overhangs.len(), 2);
        for t in &overhangs {
            assert!(t.vertices().iter().all(|v| (v.z - 2.5).abs() < 1e-12));
        }

        let landings = collect_faces(&scene, &[lifted], is_landing_surface);
        // top and four walls
        assert_eq!(landings.len(), 10);
        assert!(landings
            .iter()
            .any(|t| t.vertices().iter().all(|v| v.z == 3.5)));
    }
}
