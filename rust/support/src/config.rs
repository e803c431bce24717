// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Generator configuration and the persisted settings it is read from.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Smallest pillar footprint the generator will build.
pub const MIN_PILLAR_SIZE: f64 = 1.5;

/// Overhang threshold used when none is stored.
pub const DEFAULT_OVERHANG_ANGLE: f64 = 45.0;

/// Pillar footprint used when none is stored.
pub const DEFAULT_PILLAR_SIZE: f64 = 3.0;

/// Gap left between neighbouring pillars.
pub const DEFAULT_REDUCE_AMOUNT: f64 = 0.99;

/// Settings keys shared with the rest of the application.
pub mod keys {
    pub const MAX_OVERHANG_ANGLE: &str = "support_max_overhang_angle";
    pub const PILLAR_SIZE: &str = "support_pillar_size";
    pub const GENERATION_TYPE: &str = "support_generation_type";
}

/// Where pillars are anchored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SupportType {
    /// Stack each pillar on the nearest surface below the overhang.
    #[default]
    Normal,
    /// Only build pillars that stand on the bed.
    #[serde(rename = "From_Bed")]
    FromBed,
}

impl fmt::Display for SupportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SupportType::Normal => "Normal",
            SupportType::FromBed => "From_Bed",
        })
    }
}

impl FromStr for SupportType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "Normal" => Ok(SupportType::Normal),
            "From_Bed" => Ok(SupportType::FromBed),
            other => Err(Error::Settings(format!("unknown support type '{other}'"))),
        }
    }
}

/// Parameters of one generation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportConfig {
    /// Faces within this many degrees of straight down need support
    pub max_overhang_angle: f64,
    /// Grid cell size and nominal pillar footprint
    pub pillar_size: f64,
    pub support_type: SupportType,
    /// Overhangs this close to the bed are treated as resting on it
    pub minimum_support_height: f64,
    /// Subtracted from the footprint so neighbouring pillars stay apart
    pub reduce_amount: f64,
    pub bvh_max_depth: usize,
    /// Trace grid cells on the rayon pool
    pub parallel: bool,
}

impl Default for SupportConfig {
    fn default() -> Self {
        Self {
            max_overhang_angle: DEFAULT_OVERHANG_ANGLE,
            pillar_size: DEFAULT_PILLAR_SIZE,
            support_type: SupportType::Normal,
            minimum_support_height: 0.05,
            reduce_amount: DEFAULT_REDUCE_AMOUNT,
            bvh_max_depth: 64,
            parallel: true,
        }
    }
}

impl SupportConfig {
    pub fn with_pillar_size(mut self, pillar_size: f64) -> Self {
        self.pillar_size = pillar_size;
        self
    }

    pub fn with_max_overhang_angle(mut self, degrees: f64) -> Self {
        self.max_overhang_angle = degrees;
        self
    }

    pub fn with_support_type(mut self, support_type: SupportType) -> Self {
        self.support_type = support_type;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Clamps soft limits and rejects values that cannot produce a finite grid.
    ///
    /// The angle is clamped to `[0, 90]` and the pillar size raised to
    /// [`MIN_PILLAR_SIZE`].
    pub fn validated(mut self) -> Result<Self> {
        for (name, value) in [
            ("max_overhang_angle", self.max_overhang_angle),
            ("pillar_size", self.pillar_size),
            ("minimum_support_height", self.minimum_support_height),
            ("reduce_amount", self.reduce_amount),
        ] {
            if !value.is_finite() {
                return Err(Error::InvalidConfig(format!("{name} must be finite, got {value}")));
            }
        }

        let angle = self.max_overhang_angle.clamp(0.0, 90.0);
        if angle != self.max_overhang_angle {
            tracing::warn!(
                requested = self.max_overhang_angle,
                clamped = angle,
                "Overhang angle out of range"
            );
            self.max_overhang_angle = angle;
        }

        if self.pillar_size < MIN_PILLAR_SIZE {
            tracing::warn!(
                requested = self.pillar_size,
                clamped = MIN_PILLAR_SIZE,
                "Pillar size below minimum"
            );
            self.pillar_size = MIN_PILLAR_SIZE;
        }

        if self.minimum_support_height < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "minimum_support_height must not be negative, got {}",
                self.minimum_support_height
            )));
        }
        if self.reduce_amount < 0.0 || self.reduce_amount >= self.pillar_size {
            return Err(Error::InvalidConfig(format!(
                "reduce_amount {} must be in [0, pillar_size {})",
                self.reduce_amount, self.pillar_size
            )));
        }
        self.bvh_max_depth = self.bvh_max_depth.max(1);

        Ok(self)
    }

    /// Reads the persisted support settings.
    ///
    /// Missing or unparsable values fall back to their defaults; the angle
    /// is clamped to `[0, 90]` and the pillar size to at least
    /// [`MIN_PILLAR_SIZE`].
    pub fn from_settings(settings: &UserSettings) -> Self {
        let max_overhang_angle = settings
            .get_f64(keys::MAX_OVERHANG_ANGLE)
            .unwrap_or(DEFAULT_OVERHANG_ANGLE)
            .clamp(0.0, 90.0);
        let pillar_size = settings
            .get_f64(keys::PILLAR_SIZE)
            .unwrap_or(DEFAULT_PILLAR_SIZE)
            .max(MIN_PILLAR_SIZE);
        let support_type = settings
            .get(keys::GENERATION_TYPE)
            .and_then(|s| s.parse().ok())
            .unwrap_or_default();

        Self {
            max_overhang_angle,
            pillar_size,
            support_type,
            ..Self::default()
        }
    }

    /// Writes the user-facing values back to the settings store.
    pub fn store(&self, settings: &mut UserSettings) {
        settings.set(keys::MAX_OVERHANG_ANGLE, self.max_overhang_angle.to_string());
        settings.set(keys::PILLAR_SIZE, self.pillar_size.to_string());
        settings.set(keys::GENERATION_TYPE, self.support_type.to_string());
    }
}

/// String key/value store persisted as a flat JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserSettings {
    values: BTreeMap<String, String>,
}

impl UserSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Parses a stored number. Unparsable values read as absent.
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        let raw = self.get(key)?;
        match raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Some(v),
            _ => {
                tracing::warn!(key, value = raw, "Ignoring unparsable setting");
                None
            }
        }
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Settings(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Settings(e.to_string()))
    }
}
