// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for support generation.

/// Result type alias for support generation.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while generating or removing support.
///
/// Ray misses, empty candidate sets and empty grids are ordinary outcomes
/// and never surface here.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A configuration value cannot produce a finite grid.
    #[error("invalid support configuration: {0}")]
    InvalidConfig(String),

    /// The settings store could not be read or written.
    #[error("settings error: {0}")]
    Settings(String),

    /// The overhang or landing geometry could not be indexed.
    #[error(transparent)]
    Geometry(#[from] pillar_geometry::Error),

    /// A scene edit failed.
    #[error(transparent)]
    Scene(#[from] pillar_scene::Error),
}
