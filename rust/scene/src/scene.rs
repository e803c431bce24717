// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The scene arena and its tree traversals.

use std::sync::Arc;

use nalgebra::{Matrix4, Point2};
use pillar_geometry::{Aabb, Mesh};
use slotmap::SlotMap;

use crate::command::{SceneCommand, UndoBuffer};
use crate::error::{Error, Result};
use crate::item::{MeshItem, OutputType};
use crate::keys::ItemKey;

/// Aggregate root of all mesh items.
///
/// # Example
///
/// ```
/// use pillar_geometry::Mesh;
/// use pillar_scene::{MeshItem, Scene};
///
/// let mut scene = Scene::new();
/// let root = scene.root();
/// let part = scene.add_item(root, MeshItem::with_mesh("cube", Mesh::unit_cube())).unwrap();
///
/// assert_eq!(scene.children(root), &[part]);
/// assert_eq!(scene.visible_meshes(root), vec![part]);
/// ```
#[derive(Debug)]
pub struct Scene {
    items: SlotMap<ItemKey, MeshItem>,
    root: ItemKey,
    selection: Option<ItemKey>,
    history: UndoBuffer,
}

impl Scene {
    /// Creates a scene holding only an empty root group.
    pub fn new() -> Self {
        let mut items = SlotMap::with_key();
        let root = items.insert(MeshItem::new("Scene"));
        Self {
            items,
            root,
            selection: None,
            history: UndoBuffer::new(),
        }
    }

    /// The root group. It is never detached.
    pub fn root(&self) -> ItemKey {
        self.root
    }

    // --- Item storage ---

    /// Stores an item without attaching it anywhere.
    ///
    /// The item is unreachable until an [`InsertCommand`](crate::InsertCommand)
    /// (or [`Scene::attach`]) links it under a parent.
    pub fn create_item(&mut self, mut item: MeshItem) -> Result<ItemKey> {
        if let Some(mesh) = &item.mesh {
            mesh.validate()?;
        }
        item.parent = None;
        item.children.clear();
        Ok(self.items.insert(item))
    }

    /// Stores an item and appends it to `parent` directly, outside the
    /// undo history. Used to build scenes.
    pub fn add_item(&mut self, parent: ItemKey, item: MeshItem) -> Result<ItemKey> {
        if !self.items.contains_key(parent) {
            return Err(Error::ItemNotFound(parent));
        }
        let key = self.create_item(item)?;
        self.attach(parent, key, None)?;
        Ok(key)
    }

    /// Returns the item for the given key, or `None` if not found.
    pub fn item(&self, key: ItemKey) -> Option<&MeshItem> {
        self.items.get(key)
    }

    /// Mutable access to an item. Tree links stay private to the scene.
    pub fn item_mut(&mut self, key: ItemKey) -> Option<&mut MeshItem> {
        self.items.get_mut(key)
    }

    /// Replaces an item's mesh. A mesh whose faces reference missing
    /// vertices is rejected and the old mesh is kept.
    pub fn set_mesh(&mut self, key: ItemKey, mesh: Option<Arc<Mesh>>) -> Result<()> {
        let item = self.items.get_mut(key).ok_or(Error::ItemNotFound(key))?;
        if let Some(mesh) = &mesh {
            mesh.validate()?;
        }
        item.mesh = mesh;
        Ok(())
    }

    /// Returns `true` if the key references a stored item (attached or not).
    pub fn contains(&self, key: ItemKey) -> bool {
        self.items.contains_key(key)
    }

    /// Number of stored items, including the root and detached subtrees
    /// kept alive by the history.
    pub fn stored_count(&self) -> usize {
        self.items.len()
    }

    // --- Tree structure ---

    /// Children of an item, in order. Empty for unknown keys.
    pub fn children(&self, key: ItemKey) -> &[ItemKey] {
        self.items
            .get(key)
            .map(|i| i.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn parent(&self, key: ItemKey) -> Option<ItemKey> {
        self.items.get(key).and_then(|i| i.parent)
    }

    /// Ancestors of an item from its parent up to the root.
    pub fn ancestors(&self, key: ItemKey) -> impl Iterator<Item = ItemKey> + '_ {
        std::iter::successors(self.parent(key), move |&k| self.parent(k))
    }

    /// Returns `true` if the item is the root or reachable from it.
    pub fn is_attached(&self, key: ItemKey) -> bool {
        if !self.items.contains_key(key) {
            return false;
        }
        key == self.root || self.ancestors(key).any(|k| k == self.root)
    }

    /// All items below `key` in depth-first pre-order, excluding `key`.
    pub fn descendants(&self, key: ItemKey) -> Vec<ItemKey> {
        let mut result = Vec::new();
        let mut stack: Vec<ItemKey> = self.children(key).iter().rev().copied().collect();
        while let Some(k) = stack.pop() {
            result.push(k);
            stack.extend(self.children(k).iter().rev());
        }
        result
    }

    /// Number of items reachable from the root, excluding the root itself.
    pub fn item_count(&self) -> usize {
        self.descendants(self.root).len()
    }

    /// Attached items that were not produced by support generation.
    pub fn user_items(&self) -> Vec<ItemKey> {
        self.descendants(self.root)
            .into_iter()
            .filter(|&k| !self.items[k].is_generated_support())
            .collect()
    }

    /// Drops a detached item and its subtree from storage.
    ///
    /// Only for items no command refers to, such as a batch whose insert
    /// failed.
    pub fn discard(&mut self, key: ItemKey) -> Result<()> {
        let item = self.items.get(key).ok_or(Error::ItemNotFound(key))?;
        if key == self.root {
            return Err(Error::CannotDetachRoot);
        }
        if item.parent.is_some() {
            return Err(Error::AlreadyAttached(key));
        }
        let mut doomed = self.descendants(key);
        doomed.push(key);
        for k in doomed {
            self.items.remove(k);
        }
        Ok(())
    }

    /// Links a detached item under `parent` at `index` (appends when `None`).
    pub fn attach(&mut self, parent: ItemKey, key: ItemKey, index: Option<usize>) -> Result<()> {
        if key == self.root {
            return Err(Error::CannotDetachRoot);
        }
        let item = self.items.get(key).ok_or(Error::ItemNotFound(key))?;
        if item.parent.is_some() {
            return Err(Error::AlreadyAttached(key));
        }
        if !self.items.contains_key(parent) {
            return Err(Error::ItemNotFound(parent));
        }
        // A detached item cannot contain an attached parent, so no cycle can form
        if !self.is_attached(parent) {
            return Err(Error::NotAttached(parent));
        }

        let siblings = &mut self.items[parent].children;
        let at = index.unwrap_or(siblings.len()).min(siblings.len());
        siblings.insert(at, key);
        self.items[key].parent = Some(parent);
        Ok(())
    }

    /// Unlinks an item from its parent, keeping its subtree intact.
    ///
    /// Returns the former parent and the item's position among its siblings.
    pub fn detach(&mut self, key: ItemKey) -> Result<(ItemKey, usize)> {
        if key == self.root {
            return Err(Error::CannotDetachRoot);
        }
        let parent = self
            .items
            .get(key)
            .ok_or(Error::ItemNotFound(key))?
            .parent
            .ok_or(Error::NotAttached(key))?;

        let siblings = &mut self.items[parent].children;
        let index = siblings
            .iter()
            .position(|&k| k == key)
            .ok_or(Error::NotAttached(key))?;
        siblings.remove(index);
        self.items[key].parent = None;
        Ok((parent, index))
    }

    // --- Derived world state ---

    /// Product of all transforms from the root down to the item.
    pub fn world_matrix(&self, key: ItemKey) -> Matrix4<f64> {
        let mut matrix = self
            .items
            .get(key)
            .map(|i| i.matrix)
            .unwrap_or_else(Matrix4::identity);
        for ancestor in self.ancestors(key) {
            matrix = self.items[ancestor].matrix * matrix;
        }
        matrix
    }

    /// Visible only if the item and every ancestor are visible.
    pub fn is_world_visible(&self, key: ItemKey) -> bool {
        match self.items.get(key) {
            Some(item) => item.visible && self.ancestors(key).all(|k| self.items[k].visible),
            None => false,
        }
    }

    /// Support if the item or any ancestor is marked support.
    pub fn world_output_type(&self, key: ItemKey) -> OutputType {
        let is_support = std::iter::once(key)
            .chain(self.ancestors(key))
            .filter_map(|k| self.items.get(k))
            .any(|i| i.output_type == OutputType::Support);
        if is_support {
            OutputType::Support
        } else {
            OutputType::Solid
        }
    }

    /// Mesh-owning items in the subtree rooted at `key` (including `key`)
    /// that are visible, in depth-first order. Hidden groups hide their
    /// whole subtree.
    pub fn visible_meshes(&self, key: ItemKey) -> Vec<ItemKey> {
        let mut result = Vec::new();
        if !self.is_world_visible(key) {
            return result;
        }
        let mut stack = vec![key];
        while let Some(k) = stack.pop() {
            let item = &self.items[k];
            if !item.visible {
                continue;
            }
            if item.mesh.is_some() {
                result.push(k);
            }
            stack.extend(item.children.iter().rev());
        }
        result
    }

    /// World bounds of the visible meshes under `key` (including `key`).
    pub fn world_bounds(&self, key: ItemKey) -> Aabb {
        let mut bounds = Aabb::empty();
        for k in self.visible_meshes(key) {
            if let Some(mesh) = &self.items[k].mesh {
                bounds.extend_box(&mesh.transformed_bounds(&self.world_matrix(k)));
            }
        }
        bounds
    }

    /// XY centre of an item's own mesh in world space, hidden or not.
    /// `None` when it has no mesh.
    pub fn world_center_xy(&self, key: ItemKey) -> Option<Point2<f64>> {
        let mesh = self.items.get(key)?.mesh.as_ref()?;
        let bounds = mesh.transformed_bounds(&self.world_matrix(key));
        if bounds.is_empty() {
            return None;
        }
        let c = bounds.center();
        Some(Point2::new(c.x, c.y))
    }

    // --- Selection ---

    /// The selected item, if it is still attached to the scene.
    pub fn selected_item(&self) -> Option<ItemKey> {
        self.selection.filter(|&k| k != self.root && self.is_attached(k))
    }

    /// Selects an attached item, or clears the selection with `None`.
    pub fn select(&mut self, key: Option<ItemKey>) -> Result<()> {
        if let Some(k) = key {
            if !self.is_attached(k) {
                return Err(Error::NotAttached(k));
            }
        }
        self.selection = key;
        Ok(())
    }

    // --- Reversible edits ---

    /// Executes a command and records it for undo. A failed command leaves
    /// the history untouched and its error is returned as-is.
    pub fn add_and_do(&mut self, mut command: Box<dyn SceneCommand>) -> Result<()> {
        command.execute(self)?;
        tracing::debug!(command = command.name(), "Scene command applied");
        self.history.push_done(command);
        Ok(())
    }

    /// Reverts the most recent command.
    pub fn undo(&mut self) -> Result<()> {
        let mut command = self.history.pop_undo().ok_or(Error::NothingToUndo)?;
        match command.undo(self) {
            Ok(()) => {
                self.history.push_undone(command);
                Ok(())
            }
            Err(e) => {
                self.history.restore_done(command);
                Err(e)
            }
        }
    }

    /// Re-applies the most recently undone command.
    pub fn redo(&mut self) -> Result<()> {
        let mut command = self.history.pop_redo().ok_or(Error::NothingToRedo)?;
        match command.execute(self) {
            Ok(()) => {
                self.history.restore_done(command);
                Ok(())
            }
            Err(e) => {
                self.history.push_undone(command);
                Err(e)
            }
        }
    }

    /// The edit history.
    pub fn history(&self) -> &UndoBuffer {
        &self.history
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Point3, Vector3};

    fn cube_at(x: f64, y: f64, z: f64) -> MeshItem {
        MeshItem::with_mesh("cube", Mesh::unit_cube())
            .matrix(Matrix4::new_translation(&Vector3::new(x, y, z)))
    }

    #[test]
    fn new_scene_has_only_root() {
        let scene = Scene::new();
        assert_eq!(scene.item_count(), 0);
        assert!(scene.is_attached(scene.root()));
        assert!(scene.selected_item().is_none());
    }

    #[test]
    fn descendants_are_preorder() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = scene.add_item(root, MeshItem::new("a")).unwrap();
        let a1 = scene.add_item(a, MeshItem::new("a1")).unwrap();
        let b = scene.add_item(root, MeshItem::new("b")).unwrap();
        let a2 = scene.add_item(a, MeshItem::new("a2")).unwrap();

        assert_eq!(scene.descendants(root), vec![a, a1, a2, b]);
        assert_eq!(scene.descendants(a), vec![a1, a2]);
        assert_eq!(scene.ancestors(a1).collect::<Vec<_>>(), vec![a, root]);
    }

    #[test]
    fn world_matrix_composes_parents() {
        let mut scene = Scene::new();
        let root = scene.root();
        let group = scene
            .add_item(
                root,
                MeshItem::new("group").matrix(Matrix4::new_translation(&Vector3::new(10.0, 0.0, 0.0))),
            )
            .unwrap();
        let part = scene.add_item(group, cube_at(0.0, 0.0, 0.5)).unwrap();

        let bounds = scene.world_bounds(part);
        assert_relative_eq!(bounds.min, Point3::new(9.5, -0.5, 0.0));
        assert_relative_eq!(bounds.max, Point3::new(10.5, 0.5, 1.0));
        assert_eq!(scene.world_bounds(root), bounds);
    }

    #[test]
    fn hidden_group_hides_subtree() {
        let mut scene = Scene::new();
        let root = scene.root();
        let group = scene.add_item(root, MeshItem::new("g").visible(false)).unwrap();
        let inner = scene.add_item(group, cube_at(0.0, 0.0, 0.0)).unwrap();
        let outer = scene.add_item(root, cube_at(3.0, 0.0, 0.0)).unwrap();

        assert!(!scene.is_world_visible(inner));
        assert_eq!(scene.visible_meshes(root), vec![outer]);
    }

    #[test]
    fn support_output_type_is_inherited() {
        let mut scene = Scene::new();
        let root = scene.root();
        let group = scene
            .add_item(root, MeshItem::new("g").output_type(OutputType::Support))
            .unwrap();
        let inner = scene.add_item(group, cube_at(0.0, 0.0, 0.0)).unwrap();
        assert_eq!(scene.item(inner).unwrap().output_type, OutputType::Solid);
        assert_eq!(scene.world_output_type(inner), OutputType::Support);
    }

    #[test]
    fn detach_and_reattach_preserves_position() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = scene.add_item(root, MeshItem::new("a")).unwrap();
        let b = scene.add_item(root, MeshItem::new("b")).unwrap();
        let c = scene.add_item(root, MeshItem::new("c")).unwrap();

        let (parent, index) = scene.detach(b).unwrap();
        assert_eq!((parent, index), (root, 1));
        assert!(!scene.is_attached(b));
        assert_eq!(scene.children(root), &[a, c]);

        scene.attach(parent, b, Some(index)).unwrap();
        assert_eq!(scene.children(root), &[a, b, c]);
    }

    #[test]
    fn root_cannot_be_detached() {
        let mut scene = Scene::new();
        let root = scene.root();
        assert!(matches!(scene.detach(root), Err(Error::CannotDetachRoot)));
    }

    #[test]
    fn attach_under_detached_parent_fails() {
        let mut scene = Scene::new();
        let loose_parent = scene.create_item(MeshItem::new("loose")).unwrap();
        let child = scene.create_item(MeshItem::new("child")).unwrap();
        assert!(matches!(
            scene.attach(loose_parent, child, None),
            Err(Error::NotAttached(_))
        ));
    }

    #[test]
    fn selection_ignores_detached_items() {
        let mut scene = Scene::new();
        let root = scene.root();
        let a = scene.add_item(root, cube_at(0.0, 0.0, 0.0)).unwrap();
        scene.select(Some(a)).unwrap();
        assert_eq!(scene.selected_item(), Some(a));
        scene.detach(a).unwrap();
        assert_eq!(scene.selected_item(), None);
    }

    #[test]
    fn invalid_mesh_is_rejected() {
        let mut scene = Scene::new();
        let mut mesh = Mesh::new();
        mesh.add_vertex(Point3::origin());
        mesh.add_triangle(0, 1, 2);
        let root = scene.root();
        assert!(matches!(
            scene.add_item(root, MeshItem::with_mesh("bad", mesh)),
            Err(Error::Geometry(_))
        ));
    }

    #[test]
    fn replacing_mesh_validates_it() {
        let mut scene = Scene::new();
        let root = scene.root();
        let part = scene.add_item(root, cube_at(0.0, 0.0, 0.0)).unwrap();

        let mut bad = Mesh::new();
        bad.add_vertex(Point3::origin());
        bad.add_triangle(0, 1, 2);
        assert!(matches!(
            scene.set_mesh(part, Some(Arc::new(bad))),
            Err(Error::Geometry(_))
        ));
        assert_eq!(scene.item(part).unwrap().geometry().unwrap().triangle_count(), 12);

        scene.set_mesh(part, None).unwrap();
        assert!(scene.item(part).unwrap().geometry().is_none());

        let gone = scene.create_item(MeshItem::new("gone")).unwrap();
        scene.discard(gone).unwrap();
        assert!(matches!(
            scene.set_mesh(gone, Some(Arc::new(Mesh::unit_cube()))),
            Err(Error::ItemNotFound(_))
        ));
    }

    #[test]
    fn center_of_own_mesh_ignores_visibility() {
        let mut scene = Scene::new();
        let root = scene.root();
        let group = scene
            .add_item(root, MeshItem::new("group").visible(false))
            .unwrap();
        let part = scene.add_item(group, cube_at(3.0, 4.0, 5.0)).unwrap();

        assert!(scene.world_bounds(part).is_empty());
        let c = scene.world_center_xy(part).unwrap();
        assert_relative_eq!(c.x, 3.0, epsilon = 1e-12);
        assert_relative_eq!(c.y, 4.0, epsilon = 1e-12);
        assert_eq!(scene.world_center_xy(group), None);
    }
}
