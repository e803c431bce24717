// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scene-level support operations.

use std::sync::Arc;
use std::time::Instant;

use pillar_geometry::{Aabb, Bvh, Mesh};
use pillar_scene::{DeleteCommand, ItemKey, OutputType, Scene};
use serde::Serialize;

use crate::classify::{collect_faces, is_landing_surface, is_overhang, world_triangles};
use crate::columns::{build_column, commit_columns};
use crate::config::SupportConfig;
use crate::error::Result;
use crate::grid::SupportGrid;
use crate::intervals::resolve_grid;
use crate::planes::detect_planes;
use crate::progress::{CancellationToken, Phase, ProgressReporter, ProgressStatus};

/// Summary of a completed generation pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationReport {
    pub grid_width: usize,
    pub grid_height: usize,
    pub candidate_items: usize,
    pub overhang_triangles: usize,
    pub landing_triangles: usize,
    pub intervals: usize,
    /// Keys of the inserted pillars
    #[serde(skip)]
    pub inserted: Vec<ItemKey>,
    pub pillars: usize,
    pub trace_time_ms: u64,
    pub total_time_ms: u64,
}

/// How a generation pass ended.
#[derive(Debug, Clone)]
pub enum GenerationOutcome {
    Completed(GenerationReport),
    /// Cancelled before anything was inserted
    Cancelled,
}

impl GenerationOutcome {
    pub fn report(&self) -> Option<&GenerationReport> {
        match self {
            GenerationOutcome::Completed(report) => Some(report),
            GenerationOutcome::Cancelled => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, GenerationOutcome::Cancelled)
    }
}

/// Builds and removes pillar supports in a scene.
///
/// # Example
///
/// ```
/// use pillar_geometry::{Mesh, Point3};
/// use pillar_scene::{MeshItem, Scene};
/// use pillar_support::{CancellationToken, SupportConfig, SupportGenerator, SupportType};
///
/// let mut scene = Scene::new();
/// let root = scene.root();
/// let floating = Mesh::cuboid(Point3::new(0.0, 0.0, 5.0), Point3::new(4.0, 4.0, 8.0));
/// scene.add_item(root, MeshItem::with_mesh("shelf", floating)).unwrap();
///
/// let config = SupportConfig::default()
///     .with_pillar_size(2.0)
///     .with_support_type(SupportType::FromBed);
/// let generator = SupportGenerator::new(config).unwrap();
/// assert!(generator.requires_support(&scene));
///
/// let outcome = generator.create(&mut scene, None, &CancellationToken::new()).unwrap();
/// assert_eq!(outcome.report().unwrap().pillars, 4);
/// assert!(!generator.requires_support(&scene));
/// ```
#[derive(Debug, Clone)]
pub struct SupportGenerator {
    config: SupportConfig,
    pillar_mesh: Arc<Mesh>,
}

impl SupportGenerator {
    /// Validates `config` before any grid can be built from it.
    pub fn new(config: SupportConfig) -> Result<Self> {
        Ok(Self {
            config: config.validated()?,
            pillar_mesh: Arc::new(Mesh::unit_cube()),
        })
    }

    pub fn config(&self) -> &SupportConfig {
        &self.config
    }

    /// Adds pillars under every overhang of the selected item, or of the
    /// whole scene when nothing is selected.
    ///
    /// All pillars are inserted under the scene root in one undoable edit,
    /// after every column has been computed. A cancelled pass leaves the
    /// scene untouched.
    pub fn create(
        &self,
        scene: &mut Scene,
        progress: Option<&dyn ProgressReporter>,
        cancel: &CancellationToken,
    ) -> Result<GenerationOutcome> {
        let total_start = Instant::now();
        let report_phase = |phase: Phase, message: &str| {
            if let Some(reporter) = progress {
                reporter.report(&ProgressStatus::new(phase, message));
            }
        };

        report_phase(Phase::Enter, "Collecting support candidates");
        let root = scene.root();
        let scope = scene.selected_item().unwrap_or(root);
        let candidates: Vec<ItemKey> = scene
            .visible_meshes(scope)
            .into_iter()
            .filter(|&k| scene.world_output_type(k) == OutputType::Solid)
            .collect();
        let everything = scene.visible_meshes(root);

        let mut bounds = Aabb::empty();
        for &k in &candidates {
            bounds.extend_box(&scene.world_bounds(k));
        }
        let grid = SupportGrid::from_bounds(&bounds, self.config.pillar_size);

        tracing::info!(
            candidates = candidates.len(),
            scene_meshes = everything.len(),
            grid_width = grid.width(),
            grid_height = grid.height(),
            support_type = %self.config.support_type,
            "Starting support generation"
        );

        if cancel.is_cancelled() {
            return Ok(cancelled());
        }

        report_phase(Phase::Trace, "Tracing support columns");
        let trace_start = Instant::now();
        let max_angle = self.config.max_overhang_angle;
        let overhang_faces = collect_faces(scene, &candidates, |t| is_overhang(t, max_angle));
        let landing_faces = collect_faces(scene, &everything, is_landing_surface);
        let overhangs = Bvh::from_triangles(&overhang_faces, self.config.bvh_max_depth)?;
        let landings = Bvh::from_triangles(&landing_faces, self.config.bvh_max_depth)?;
        tracing::debug!(
            overhangs = overhangs.triangle_count(),
            overhang_depth = overhangs.depth(),
            landings = landings.triangle_count(),
            landing_depth = landings.depth(),
            "Built spatial indices"
        );

        if cancel.is_cancelled() {
            return Ok(cancelled());
        }

        let Some(cells) = detect_planes(&grid, &overhangs, &landings, &self.config, cancel) else {
            return Ok(cancelled());
        };
        let trace_time = trace_start.elapsed();
        tracing::debug!(
            cells = cells.len(),
            trace_time_ms = trace_time.as_millis(),
            "Traced grid"
        );

        report_phase(Phase::Columns, "Building support columns");
        let intervals = resolve_grid(
            &cells,
            self.config.support_type,
            self.config.minimum_support_height,
        );
        let columns: Vec<_> = intervals
            .iter()
            .filter_map(|i| build_column(i, &grid, self.config.reduce_amount, &self.pillar_mesh))
            .collect();

        if cancel.is_cancelled() {
            return Ok(cancelled());
        }

        let inserted = keep_selection(scene, |scene| commit_columns(scene, root, columns))?;

        let report = GenerationReport {
            grid_width: grid.width(),
            grid_height: grid.height(),
            candidate_items: candidates.len(),
            overhang_triangles: overhangs.triangle_count(),
            landing_triangles: landings.triangle_count(),
            intervals: intervals.len(),
            pillars: inserted.len(),
            inserted,
            trace_time_ms: trace_time.as_millis() as u64,
            total_time_ms: total_start.elapsed().as_millis() as u64,
        };
        tracing::info!(
            intervals = report.intervals,
            pillars = report.pillars,
            total_time_ms = report.total_time_ms,
            "Support generation complete"
        );
        Ok(GenerationOutcome::Completed(report))
    }

    /// Removes generated pillars whose centre lies within the selected
    /// item's XY footprint, or all of them when nothing is selected.
    ///
    /// User geometry is never touched, even if marked as support. Returns
    /// the removed keys; an empty result records no edit.
    pub fn remove_existing(&self, scene: &mut Scene) -> Result<Vec<ItemKey>> {
        let area = match scene.selected_item() {
            Some(selected) => scene.world_bounds(selected),
            None => Aabb::unbounded(),
        };

        let doomed: Vec<ItemKey> = scene
            .descendants(scene.root())
            .into_iter()
            .filter(|&k| {
                scene.item(k).is_some_and(|item| item.is_generated_support())
                    && scene
                        .world_center_xy(k)
                        .is_some_and(|c| area.contains_xy(&c))
            })
            .collect();

        if doomed.is_empty() {
            tracing::debug!("No generated support to remove");
            return Ok(doomed);
        }

        keep_selection(scene, |scene| {
            scene
                .add_and_do(Box::new(DeleteCommand::new(doomed.clone())))
                .map_err(Into::into)
        })?;
        tracing::info!(removed = doomed.len(), "Removed generated support");
        Ok(doomed)
    }

    /// Whether any visible geometry needs support.
    ///
    /// Any visible support already in the scene answers `false`.
    pub fn requires_support(&self, scene: &Scene) -> bool {
        let visible = scene.visible_meshes(scene.root());
        if visible
            .iter()
            .any(|&k| scene.world_output_type(k) == OutputType::Support)
        {
            return false;
        }

        let max_angle = self.config.max_overhang_angle;
        visible
            .iter()
            .filter(|&&k| scene.item(k).is_some_and(|i| i.can_need_support()))
            .any(|&k| world_triangles(scene, k).any(|t| is_overhang(&t, max_angle)))
    }
}

fn cancelled() -> GenerationOutcome {
    tracing::info!("Support generation cancelled");
    GenerationOutcome::Cancelled
}

/// Runs `edit` and then restores the selection it started with, provided
/// that item is still in the scene.
fn keep_selection<T>(
    scene: &mut Scene,
    edit: impl FnOnce(&mut Scene) -> Result<T>,
) -> Result<T> {
    let selected = scene.selected_item();
    let result = edit(scene);
    let restored = selected.filter(|&k| scene.is_attached(k));
    scene.select(restored)?;
    result
}
