// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pillar - generates vertical support pillars for a built-in scene and
//! prints the generation report and resulting scene as JSON.
//!
//! Configuration comes from the environment:
//!
//! - `DEMO_SCENE` - one of `suspended`, `stacked`, `bridge`, `table`
//! - `SETTINGS_FILE` - JSON settings store, updated after the run
//! - `PILLAR_SIZE`, `MAX_OVERHANG_ANGLE`, `SUPPORT_TYPE` - override stored settings
//! - `REPLACE_EXISTING` - remove generated pillars first
//! - `WORKER_THREADS` - rayon pool size

use std::path::Path;

use anyhow::{Context, Result};
use pillar_scene::SceneSnapshot;
use pillar_support::{
    CancellationToken, GenerationReport, ProgressStatus, SupportConfig, SupportGenerator,
    UserSettings,
};
use serde::Serialize;

mod config;
mod demo;

use config::Config;

#[derive(Serialize)]
struct RunOutput<'a> {
    scene: &'a str,
    config: &'a SupportConfig,
    required_support: bool,
    removed: usize,
    report: Option<GenerationReport>,
    snapshot: SceneSnapshot,
}

fn load_settings(path: Option<&str>) -> Result<UserSettings> {
    match path {
        Some(path) if Path::new(path).exists() => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read settings from {path}"))?;
            Ok(UserSettings::from_json(&json)?)
        }
        _ => Ok(UserSettings::new()),
    }
}

fn support_config(config: &Config, settings: &UserSettings) -> Result<SupportConfig> {
    let mut support = SupportConfig::from_settings(settings);
    if let Some(size) = config.pillar_size {
        support = support.with_pillar_size(size);
    }
    if let Some(angle) = config.max_overhang_angle {
        support = support.with_max_overhang_angle(angle);
    }
    if let Some(kind) = &config.support_type {
        support = support.with_support_type(kind.parse()?);
    }
    Ok(support.validated()?)
}

fn main() -> Result<()> {
    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,pillar_support=debug".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env();

    tracing::info!(
        demo_scene = %config.demo_scene,
        worker_threads = config.worker_threads,
        replace_existing = config.replace_existing,
        "Starting pillar generation"
    );

    rayon::ThreadPoolBuilder::new()
        .num_threads(config.worker_threads)
        .build_global()
        .context("Failed to initialize rayon thread pool")?;

    let mut settings = load_settings(config.settings_file.as_deref())?;
    let support = support_config(&config, &settings)?;
    let generator = SupportGenerator::new(support)?;
    let mut scene = demo::build(&config.demo_scene)?;

    let removed = if config.replace_existing {
        generator.remove_existing(&mut scene)?.len()
    } else {
        0
    };

    let required_support = generator.requires_support(&scene);
    let progress = |status: &ProgressStatus| {
        tracing::info!(phase = %status.phase, "{}", status.message);
    };
    let outcome = generator.create(&mut scene, Some(&progress), &CancellationToken::new())?;
    if outcome.is_cancelled() {
        tracing::warn!("Support generation cancelled");
    }

    if let Some(path) = &config.settings_file {
        generator.config().store(&mut settings);
        std::fs::write(path, settings.to_json()?)
            .with_context(|| format!("Failed to write settings to {path}"))?;
    }

    let output = RunOutput {
        scene: &config.demo_scene,
        config: generator.config(),
        required_support,
        removed,
        report: outcome.report().cloned(),
        snapshot: SceneSnapshot::capture(&scene),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
