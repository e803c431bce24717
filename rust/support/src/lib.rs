// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Pillar Support
//!
//! Finds the faces of a scene that would print in mid-air and props them up
//! with box-shaped pillars.
//!
//! A generation pass runs leaf-first through these modules:
//!
//! 1. [`classify`] splits world-space faces into overhangs (facing down
//!    within the configured angle) and landing surfaces (facing up).
//! 2. [`grid`] lays a column grid over the candidates' XY bounds.
//! 3. [`planes`] shoots vertical rays through each column against one BVH
//!    per face class and records every crossing.
//! 4. [`intervals`] reads each column's crossings as floors and ceilings and
//!    emits the spans that need a pillar.
//! 5. [`columns`] turns spans into pillar items and inserts them in one
//!    undoable edit.
//!
//! [`SupportGenerator`] drives the pass and also removes generated pillars
//! and answers whether a scene needs support at all.

pub mod classify;
pub mod columns;
pub mod config;
pub mod error;
pub mod generator;
pub mod grid;
pub mod intervals;
pub mod planes;
pub mod progress;

pub use config::{SupportConfig, SupportType, UserSettings, MIN_PILLAR_SIZE};
pub use error::{Error, Result};
pub use generator::{GenerationOutcome, GenerationReport, SupportGenerator};
pub use grid::SupportGrid;
pub use intervals::{SupportInterval, MIN_COLUMN_HEIGHT};
pub use planes::{CellEvents, PlaneEvent};
pub use progress::{CancellationToken, Phase, ProgressReporter, ProgressStatus};
