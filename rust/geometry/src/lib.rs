// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pillar Geometry
//!
//! Triangle meshes, bounding boxes, affine helpers and a bounding volume
//! hierarchy answering nearest-hit ray queries, built on nalgebra.

pub mod bounds;
pub mod bvh;
pub mod error;
pub mod mesh;
pub mod transform;
pub mod triangle;

// Re-export nalgebra types for convenience
pub use nalgebra::{Matrix4, Point2, Point3, Vector2, Vector3};

pub use bounds::Aabb;
pub use bvh::{Bvh, FaceSelectivity, Ray, RayHit};
pub use error::{Error, Result};
pub use mesh::Mesh;
pub use transform::{scale_translation, transform_point};
pub use triangle::Triangle;
