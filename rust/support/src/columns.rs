// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pillar synthesis and insertion.

use std::sync::Arc;

use nalgebra::Vector3;
use pillar_geometry::{scale_translation, Mesh};
use pillar_scene::{InsertCommand, ItemKey, MeshItem, Scene};

use crate::error::Result;
use crate::grid::SupportGrid;
use crate::intervals::{SupportInterval, MIN_COLUMN_HEIGHT};

/// A generated pillar for one span, or `None` if the span is too short.
///
/// The pillar instances `mesh` (a unit cube centred at the origin), scaled
/// to the reduced footprint and the span's height and moved to the cell
/// centre at the span's mid-height.
pub fn build_column(
    interval: &SupportInterval,
    grid: &SupportGrid,
    reduce_amount: f64,
    mesh: &Arc<Mesh>,
) -> Option<MeshItem> {
    let height = interval.height();
    if height < MIN_COLUMN_HEIGHT {
        return None;
    }

    let footprint = grid.pillar_size() - reduce_amount;
    let center = grid.cell_center(interval.x, interval.y);
    let matrix = scale_translation(
        &Vector3::new(footprint, footprint, height),
        &Vector3::new(center.x, center.y, interval.bottom_z + height / 2.0),
    );
    Some(MeshItem::generated_support(Arc::clone(mesh), matrix))
}

/// Inserts all pillars under `parent` as one undoable edit.
///
/// Returns the new keys in insertion order. Nothing is recorded for an
/// empty batch. If the insert fails the pillars are dropped again and the
/// scene error is returned.
pub fn commit_columns(
    scene: &mut Scene,
    parent: ItemKey,
    columns: Vec<MeshItem>,
) -> Result<Vec<ItemKey>> {
    if columns.is_empty() {
        return Ok(Vec::new());
    }

    let mut keys = Vec::with_capacity(columns.len());
    for column in columns {
        match scene.create_item(column) {
            Ok(key) => keys.push(key),
            Err(e) => {
                discard_all(scene, &keys);
                return Err(e.into());
            }
        }
    }

    if let Err(e) = scene.add_and_do(Box::new(InsertCommand::new(parent, keys.clone()))) {
        discard_all(scene, &keys);
        return Err(e.into());
    }
    Ok(keys)
}

fn discard_all(scene: &mut Scene, keys: &[ItemKey]) {
    for &key in keys {
        if let Err(e) = scene.discard(key) {
            tracing::warn!(error = %e, "Failed to drop uncommitted pillar");
        }
    }
}
