// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Progress reporting and cooperative cancellation.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Coarse phase of a generation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Candidates are being collected.
    Enter,
    /// Spatial indices are built and the grid is ray traced.
    Trace,
    /// Intervals are resolved and pillars synthesized.
    Columns,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Enter => "Enter",
            Phase::Trace => "Trace",
            Phase::Columns => "Columns",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressStatus {
    pub phase: Phase,
    pub message: String,
}

impl ProgressStatus {
    pub fn new(phase: Phase, message: impl Into<String>) -> Self {
        Self {
            phase,
            message: message.into(),
        }
    }
}

/// Receives phase markers from a generation pass, on the calling thread.
pub trait ProgressReporter {
    fn report(&self, status: &ProgressStatus);
}

impl<F> ProgressReporter for F
where
    F: Fn(&ProgressStatus),
{
    fn report(&self, status: &ProgressStatus) {
        self(status)
    }
}

/// Shared cancellation flag.
///
/// Clones observe the same flag, so a caller can keep one clone and hand
/// another to the pass running on a worker thread.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}
