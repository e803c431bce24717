// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Reversible scene edits and the undo history.

use crate::error::{Error, Result};
use crate::keys::ItemKey;
use crate::scene::Scene;

/// A reversible edit of the scene tree.
///
/// `execute` must leave the scene unchanged when it fails. `undo` is only
/// called on a command whose last `execute` succeeded.
pub trait SceneCommand: std::fmt::Debug + Send {
    /// Short label for logs and history listings.
    fn name(&self) -> &str;

    fn execute(&mut self, scene: &mut Scene) -> Result<()>;

    fn undo(&mut self, scene: &mut Scene) -> Result<()>;
}

/// Appends already-created items under a parent, in order.
#[derive(Debug, Clone)]
pub struct InsertCommand {
    parent: ItemKey,
    items: Vec<ItemKey>,
}

impl InsertCommand {
    /// `items` must be stored in the scene (see [`Scene::create_item`]) and
    /// detached.
    pub fn new(parent: ItemKey, items: Vec<ItemKey>) -> Self {
        Self { parent, items }
    }

    pub fn items(&self) -> &[ItemKey] {
        &self.items
    }
}

impl SceneCommand for InsertCommand {
    fn name(&self) -> &str {
        "Insert"
    }

    fn execute(&mut self, scene: &mut Scene) -> Result<()> {
        if !scene.is_attached(self.parent) {
            return Err(Error::NotAttached(self.parent));
        }
        for &key in &self.items {
            let item = scene.item(key).ok_or(Error::ItemNotFound(key))?;
            if item.parent().is_some() {
                return Err(Error::AlreadyAttached(key));
            }
        }
        for &key in &self.items {
            scene.attach(self.parent, key, None)?;
        }
        Ok(())
    }

    fn undo(&mut self, scene: &mut Scene) -> Result<()> {
        for &key in self.items.iter().rev() {
            scene.detach(key)?;
        }
        Ok(())
    }
}

/// Detaches items from wherever they are, remembering their positions.
#[derive(Debug, Clone)]
pub struct DeleteCommand {
    items: Vec<ItemKey>,
    /// (item, former parent, former index), in detach order
    removed: Vec<(ItemKey, ItemKey, usize)>,
}

impl DeleteCommand {
    pub fn new(items: Vec<ItemKey>) -> Self {
        Self {
            items,
            removed: Vec::new(),
        }
    }

    pub fn items(&self) -> &[ItemKey] {
        &self.items
    }
}

impl SceneCommand for DeleteCommand {
    fn name(&self) -> &str {
        "Delete"
    }

    fn execute(&mut self, scene: &mut Scene) -> Result<()> {
        for &key in &self.items {
            if key == scene.root() {
                return Err(Error::CannotDetachRoot);
            }
            if !scene.is_attached(key) {
                return Err(Error::NotAttached(key));
            }
        }

        self.removed.clear();
        for &key in &self.items {
            // An ancestor earlier in the list may already have taken it out
            if !scene.is_attached(key) {
                continue;
            }
            let (parent, index) = scene.detach(key)?;
            self.removed.push((key, parent, index));
        }
        Ok(())
    }

    fn undo(&mut self, scene: &mut Scene) -> Result<()> {
        for &(key, parent, index) in self.removed.iter().rev() {
            scene.attach(parent, key, Some(index))?;
        }
        self.removed.clear();
        Ok(())
    }
}

/// Undo and redo stacks.
///
/// Recording a new command clears the redo stack.
#[derive(Debug, Default)]
pub struct UndoBuffer {
    undo: Vec<Box<dyn SceneCommand>>,
    redo: Vec<Box<dyn SceneCommand>>,
}

impl UndoBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    /// Records a freshly executed command.
    pub(crate) fn push_done(&mut self, command: Box<dyn SceneCommand>) {
        self.redo.clear();
        self.undo.push(command);
    }

    /// Puts a command back on the undo stack without touching redo.
    pub(crate) fn restore_done(&mut self, command: Box<dyn SceneCommand>) {
        self.undo.push(command);
    }

    pub(crate) fn push_undone(&mut self, command: Box<dyn SceneCommand>) {
        self.redo.push(command);
    }

    pub(crate) fn pop_undo(&mut self) -> Option<Box<dyn SceneCommand>> {
        self.undo.pop()
    }

    pub(crate) fn pop_redo(&mut self) -> Option<Box<dyn SceneCommand>> {
        self.redo.pop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::MeshItem;
    use pillar_geometry::Mesh;

    fn scene_with_parts(n: usize) -> (Scene, Vec<ItemKey>) {
        let mut scene = Scene::new();
        let root = scene.root();
        let keys = (0..n)
            .map(|i| {
                scene
                    .add_item(root, MeshItem::with_mesh(format!("part{i}"), Mesh::unit_cube()))
                    .unwrap()
            })
            .collect();
        (scene, keys)
    }

    #[test]
    fn insert_undo_redo() {
        let (mut scene, parts) = scene_with_parts(1);
        let root = scene.root();
        let a = scene.create_item(MeshItem::new("a")).unwrap();
        let b = scene.create_item(MeshItem::new("b")).unwrap();

        scene
            .add_and_do(Box::new(InsertCommand::new(root, vec![a, b])))
            .unwrap();
        assert_eq!(scene.children(root), &[parts[0], a, b]);
        assert!(scene.history().can_undo());

        scene.undo().unwrap();
        assert_eq!(scene.children(root), &[parts[0]]);
        assert!(scene.contains(a));
        assert!(!scene.is_attached(a));

        scene.redo().unwrap();
        assert_eq!(scene.children(root), &[parts[0], a, b]);
    }

    #[test]
    fn failed_insert_changes_nothing() {
        let (mut scene, parts) = scene_with_parts(1);
        let root = scene.root();
        let a = scene.create_item(MeshItem::new("a")).unwrap();

        // parts[0] is already attached
        let err = scene
            .add_and_do(Box::new(InsertCommand::new(root, vec![a, parts[0]])))
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyAttached(_)));
        assert!(!scene.is_attached(a));
        assert!(!scene.history().can_undo());
    }

    #[test]
    fn delete_restores_original_positions() {
        let (mut scene, parts) = scene_with_parts(4);
        let root = scene.root();

        scene
            .add_and_do(Box::new(DeleteCommand::new(vec![parts[1], parts[3]])))
            .unwrap();
        assert_eq!(scene.children(root), &[parts[0], parts[2]]);

        scene.undo().unwrap();
        assert_eq!(scene.children(root), parts.as_slice());
    }

    #[test]
    fn delete_of_nested_items_skips_already_detached() {
        let mut scene = Scene::new();
        let root = scene.root();
        let group = scene.add_item(root, MeshItem::new("group")).unwrap();
        let child = scene.add_item(group, MeshItem::new("child")).unwrap();

        scene
            .add_and_do(Box::new(DeleteCommand::new(vec![group, child])))
            .unwrap();
        assert!(!scene.is_attached(group));
        assert!(!scene.is_attached(child));
        // the child travels with its group
        assert_eq!(scene.children(group), &[child]);

        scene.undo().unwrap();
        assert!(scene.is_attached(child));
        assert_eq!(scene.children(root), &[group]);
    }

    #[test]
    fn new_command_clears_redo() {
        let (mut scene, parts) = scene_with_parts(2);
        scene
            .add_and_do(Box::new(DeleteCommand::new(vec![parts[0]])))
            .unwrap();
        scene.undo().unwrap();
        assert!(scene.history().can_redo());

        scene
            .add_and_do(Box::new(DeleteCommand::new(vec![parts[1]])))
            .unwrap();
        assert!(!scene.history().can_redo());
        assert!(matches!(scene.redo(), Err(Error::NothingToRedo)));
    }

    #[test]
    fn empty_history_errors() {
        let mut scene = Scene::new();
        assert!(matches!(scene.undo(), Err(Error::NothingToUndo)));
        assert!(matches!(scene.redo(), Err(Error::NothingToRedo)));
    }
}
