// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! JSON reports of the attached scene tree.
//!
//! Slot map keys are not portable, so items are numbered sequentially in
//! depth-first pre-order and links refer to those numbers. Detached items
//! held by the undo history are not included.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::item::{ItemKind, OutputType};
use crate::keys::ItemKey;
use crate::scene::Scene;

/// Serializable view of the attached scene.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneSnapshot {
    pub items: Vec<ItemSnapshot>,
    /// Id of the selected item, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemSnapshot {
    pub id: usize,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub kind: ItemKind,
    /// Output type after inheritance from ancestors
    pub output_type: OutputType,
    pub visible: bool,
    pub triangles: usize,
    /// World bounds as `[min, max]`, absent when the subtree has no visible mesh
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounds: Option<[[f64; 3]; 2]>,
}

impl SceneSnapshot {
    /// Captures the tree reachable from the root.
    pub fn capture(scene: &Scene) -> Self {
        let root = scene.root();
        let order: Vec<ItemKey> = std::iter::once(root)
            .chain(scene.descendants(root))
            .collect();
        let ids: FxHashMap<ItemKey, usize> =
            order.iter().enumerate().map(|(i, &k)| (k, i)).collect();

        let items = order
            .iter()
            .enumerate()
            .filter_map(|(id, &key)| {
                let item = scene.item(key)?;
                let bounds = scene.world_bounds(key);
                Some(ItemSnapshot {
                    id,
                    name: item.name.clone(),
                    parent: item.parent().and_then(|p| ids.get(&p).copied()),
                    children: item.children().iter().filter_map(|c| ids.get(c).copied()).collect(),
                    kind: item.kind,
                    output_type: scene.world_output_type(key),
                    visible: item.visible,
                    triangles: item.mesh.as_ref().map_or(0, |m| m.triangle_count()),
                    bounds: (!bounds.is_empty()).then(|| {
                        [
                            [bounds.min.x, bounds.min.y, bounds.min.z],
                            [bounds.max.x, bounds.max.y, bounds.max.z],
                        ]
                    }),
                })
            })
            .collect();

        Self {
            items,
            selected: scene.selected_item().and_then(|k| ids.get(&k).copied()),
        }
    }

    /// Number of generated support pillars in the snapshot.
    pub fn support_count(&self) -> usize {
        self.items
            .iter()
            .filter(|i| i.kind == ItemKind::GeneratedSupport)
            .count()
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Serialization(e.to_string()))
    }
}

impl Scene {
    /// Serializes the attached tree to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        SceneSnapshot::capture(self).to_json()
    }
}
