// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Built-in scenes for trying the generator without a model loader.

use anyhow::{bail, Result};
use pillar_geometry::{Mesh, Point3};
use pillar_scene::{MeshItem, Scene};

pub const SCENES: &[&str] = &["suspended", "stacked", "bridge", "table"];

fn cuboid(name: &str, min: [f64; 3], max: [f64; 3]) -> MeshItem {
    MeshItem::with_mesh(name, Mesh::cuboid(Point3::from(min), Point3::from(max)))
}

/// Builds the named scene.
pub fn build(name: &str) -> Result<Scene> {
    let mut scene = Scene::new();
    let root = scene.root();

    match name {
        // a slab floating above the bed
        "suspended" => {
            scene.add_item(root, cuboid("slab", [0.0, 0.0, 5.0], [12.0, 12.0, 8.0]))?;
        }
        // a block with a second block hovering over it
        "stacked" => {
            scene.add_item(root, cuboid("base", [0.0, 0.0, 0.0], [12.0, 12.0, 4.0]))?;
            scene.add_item(root, cuboid("top", [0.0, 0.0, 9.0], [12.0, 12.0, 12.0]))?;
        }
        // two piers joined by a deck
        "bridge" => {
            let group = scene.add_item(root, MeshItem::new("bridge"))?;
            scene.add_item(group, cuboid("left pier", [0.0, 0.0, 0.0], [3.0, 6.0, 10.0]))?;
            scene.add_item(group, cuboid("right pier", [21.0, 0.0, 0.0], [24.0, 6.0, 10.0]))?;
            scene.add_item(group, cuboid("deck", [0.0, 0.0, 10.0], [24.0, 6.0, 12.0]))?;
        }
        // four legs under a top, beside a box resting on the bed
        "table" => {
            let table = scene.add_item(root, MeshItem::new("table"))?;
            for (i, (x, y)) in [(0.0, 0.0), (16.0, 0.0), (0.0, 10.0), (16.0, 10.0)]
                .into_iter()
                .enumerate()
            {
                scene.add_item(
                    table,
                    cuboid(&format!("leg {i}"), [x, y, 0.0], [x + 2.0, y + 2.0, 14.0]),
                )?;
            }
            scene.add_item(table, cuboid("top", [0.0, 0.0, 14.0], [18.0, 12.0, 16.0]))?;
            scene.add_item(root, cuboid("crate", [30.0, 0.0, 0.0], [36.0, 6.0, 6.0]))?;
        }
        other => bail!("unknown demo scene '{other}', expected one of {SCENES:?}"),
    }

    Ok(scene)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_scene_builds() {
        for name in SCENES {
            let scene = build(name).unwrap();
            assert!(scene.item_count() > 0, "{name} is empty");
        }
    }

    #[test]
    fn unknown_scene_is_an_error() {
        assert!(build("teapot").is_err());
    }
}
