// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Vertical ray sampling of the column grid.
//!
//! Every cell is probed with nine upward rays on a 3×3 pattern spaced half a
//! pillar apart around its centre. Each ray collects every crossing with the
//! overhang index (ceilings, recorded as bottom events) and with the landing
//! index (floors, recorded as top events). All nine rays feed one event
//! list per cell, seeded with the bed.

use nalgebra::Point3;
use pillar_geometry::{Bvh, FaceSelectivity, Ray};
use rayon::prelude::*;

use crate::config::SupportConfig;
use crate::grid::SupportGrid;
use crate::progress::CancellationToken;

/// XY nudge applied to every ray so it never runs exactly along a shared
/// triangle edge of an axis-aligned mesh.
pub const RAY_JITTER_X: f64 = 0.000013;
pub const RAY_JITTER_Y: f64 = -0.00027;

/// Start height of rays looking for ceilings; just below the bed so a
/// ceiling at z = 0 is still seen.
pub const BOTTOM_RAY_START_Z: f64 = -0.001;

/// Start height of rays looking for floors.
pub const TOP_RAY_START_Z: f64 = 0.0;

/// Distance a follow-up ray starts past the previous hit.
pub const RAY_ADVANCE: f64 = 0.001;

/// A vertical crossing of a surface in one column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneEvent {
    pub z: f64,
    /// `true` for a ceiling over empty space, `false` for a floor
    pub is_bottom: bool,
}

impl PlaneEvent {
    #[inline]
    pub const fn top(z: f64) -> Self {
        Self { z, is_bottom: false }
    }

    #[inline]
    pub const fn bottom(z: f64) -> Self {
        Self { z, is_bottom: true }
    }

    /// The bed, present in every column.
    pub const BED: PlaneEvent = PlaneEvent::top(0.0);
}

/// Unsorted events of one grid cell; the first is always [`PlaneEvent::BED`].
#[derive(Debug, Clone, PartialEq)]
pub struct CellEvents {
    pub x: usize,
    pub y: usize,
    pub events: Vec<PlaneEvent>,
}

/// Sample every grid cell.
///
/// Returns `None` if `cancel` fires before all cells are traced.
pub fn detect_planes(
    grid: &SupportGrid,
    overhangs: &Bvh,
    landings: &Bvh,
    config: &SupportConfig,
    cancel: &CancellationToken,
) -> Option<Vec<CellEvents>> {
    let cells: Vec<(usize, usize)> = grid.cells().collect();

    let sample = |(x, y): (usize, usize)| -> Option<CellEvents> {
        if cancel.is_cancelled() {
            return None;
        }
        Some(CellEvents {
            x,
            y,
            events: sample_cell(grid, x, y, overhangs, landings),
        })
    };

    let traced: Option<Vec<CellEvents>> = if config.parallel {
        cells.into_par_iter().map(sample).collect()
    } else {
        cells.into_iter().map(sample).collect()
    };

    if cancel.is_cancelled() {
        return None;
    }
    traced
}

/// Events of one cell from its nine sample rays.
pub fn sample_cell(
    grid: &SupportGrid,
    x: usize,
    y: usize,
    overhangs: &Bvh,
    landings: &Bvh,
) -> Vec<PlaneEvent> {
    let center = grid.cell_center(x, y);
    let half = grid.pillar_size() / 2.0;
    let mut events = vec![PlaneEvent::BED];

    for dy in [-half, 0.0, half] {
        for dx in [-half, 0.0, half] {
            let px = center.x + dx + RAY_JITTER_X;
            let py = center.y + dy + RAY_JITTER_Y;

            let up = Ray::up(Point3::new(px, py, BOTTOM_RAY_START_Z));
            events.extend(
                overhangs
                    .all_hits(&up, FaceSelectivity::FrontFacesOnly, RAY_ADVANCE)
                    .iter()
                    .map(|hit| PlaneEvent::bottom(hit.position.z)),
            );

            let up = Ray::up(Point3::new(px, py, TOP_RAY_START_Z));
            events.extend(
                landings
                    .all_hits(&up, FaceSelectivity::BackFacesOnly, RAY_ADVANCE)
                    .iter()
                    .map(|hit| PlaneEvent::top(hit.position.z)),
            );
        }
    }

    events
}
