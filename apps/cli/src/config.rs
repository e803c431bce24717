// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Driver configuration loaded from environment variables.

/// Driver configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Built-in scene to generate supports for.
    pub demo_scene: String,
    /// JSON settings file read before the pass and updated after it.
    pub settings_file: Option<String>,
    /// Overrides the stored pillar size.
    pub pillar_size: Option<f64>,
    /// Overrides the stored overhang angle in degrees.
    pub max_overhang_angle: Option<f64>,
    /// Overrides the stored support type ("Normal" or "From_Bed").
    pub support_type: Option<String>,
    /// Remove generated pillars before adding new ones.
    pub replace_existing: bool,
    /// Number of worker threads for parallel tracing.
    pub worker_threads: usize,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            demo_scene: std::env::var("DEMO_SCENE").unwrap_or_else(|_| "suspended".into()),
            settings_file: std::env::var("SETTINGS_FILE")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            pillar_size: std::env::var("PILLAR_SIZE").ok().and_then(|s| s.parse().ok()),
            max_overhang_angle: std::env::var("MAX_OVERHANG_ANGLE")
                .ok()
                .and_then(|s| s.parse().ok()),
            support_type: std::env::var("SUPPORT_TYPE").ok(),
            replace_existing: std::env::var("REPLACE_EXISTING")
                .unwrap_or_else(|_| "false".into())
                .parse()
                .unwrap_or(false),
            worker_threads: std::env::var("WORKER_THREADS")
                .unwrap_or_else(|_| num_cpus::get().to_string())
                .parse()
                .unwrap_or_else(|_| num_cpus::get()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
