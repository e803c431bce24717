// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh items: the nodes of the scene tree.

use std::sync::Arc;

use nalgebra::Matrix4;
use pillar_geometry::Mesh;
use serde::{Deserialize, Serialize};

use crate::keys::ItemKey;

/// What an item turns into when the scene is sent to the slicer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OutputType {
    /// Regular printed part.
    #[default]
    Solid,
    /// Support material, removed after printing.
    Support,
}

/// Where an item came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ItemKind {
    /// User geometry or a user-created group.
    #[default]
    Object,
    /// A pillar produced by support generation. Always `OutputType::Support`.
    GeneratedSupport,
}

/// A node in the scene tree.
///
/// An item may own a mesh, children, or both. `matrix` maps the item's
/// local coordinates into its parent's coordinates. The mesh is only
/// replaced through [`Scene::set_mesh`](crate::Scene::set_mesh), which
/// validates it.
#[derive(Debug, Clone)]
pub struct MeshItem {
    pub name: String,
    pub(crate) mesh: Option<Arc<Mesh>>,
    pub matrix: Matrix4<f64>,
    pub output_type: OutputType,
    pub kind: ItemKind,
    pub visible: bool,
    pub(crate) parent: Option<ItemKey>,
    pub(crate) children: Vec<ItemKey>,
}

impl MeshItem {
    /// Creates an empty, visible, solid item with an identity transform.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mesh: None,
            matrix: Matrix4::identity(),
            output_type: OutputType::Solid,
            kind: ItemKind::Object,
            visible: true,
            parent: None,
            children: Vec::new(),
        }
    }

    /// Creates a solid item owning `mesh`.
    pub fn with_mesh(name: impl Into<String>, mesh: Mesh) -> Self {
        Self::new(name).mesh(Arc::new(mesh))
    }

    /// Creates a generated support pillar sharing `mesh`.
    pub fn generated_support(mesh: Arc<Mesh>, matrix: Matrix4<f64>) -> Self {
        Self {
            output_type: OutputType::Support,
            kind: ItemKind::GeneratedSupport,
            ..Self::new("Support")
        }
        .mesh(mesh)
        .matrix(matrix)
    }

    pub fn mesh(mut self, mesh: Arc<Mesh>) -> Self {
        self.mesh = Some(mesh);
        self
    }

    pub fn matrix(mut self, matrix: Matrix4<f64>) -> Self {
        self.matrix = matrix;
        self
    }

    pub fn output_type(mut self, output_type: OutputType) -> Self {
        self.output_type = output_type;
        self
    }

    pub fn visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn geometry(&self) -> Option<&Mesh> {
        self.mesh.as_deref()
    }

    /// Parent key, `None` for the root and for detached items.
    pub fn parent(&self) -> Option<ItemKey> {
        self.parent
    }

    /// Child keys in order.
    pub fn children(&self) -> &[ItemKey] {
        &self.children
    }

    /// Whether this item was produced by support generation and may be
    /// bulk-removed without touching user geometry.
    pub fn is_generated_support(&self) -> bool {
        self.kind == ItemKind::GeneratedSupport
    }

    /// Whether this item's own geometry can need support: it has a mesh and
    /// is not itself support material.
    pub fn can_need_support(&self) -> bool {
        self.mesh.is_some() && self.output_type != OutputType::Support
    }
}
