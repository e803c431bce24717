// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for scene operations.

use crate::keys::ItemKey;

/// Result type alias for scene operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during scene operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A referenced item was not found in the arena.
    #[error("scene item not found: {0:?}")]
    ItemNotFound(ItemKey),

    /// The scene root cannot be removed or re-parented.
    #[error("the scene root cannot be detached")]
    CannotDetachRoot,

    /// The item already has a parent.
    #[error("item is already attached: {0:?}")]
    AlreadyAttached(ItemKey),

    /// The item is not reachable from the scene root.
    #[error("item is not attached to the scene: {0:?}")]
    NotAttached(ItemKey),

    /// The undo stack is empty.
    #[error("nothing to undo")]
    NothingToUndo,

    /// The redo stack is empty.
    #[error("nothing to redo")]
    NothingToRedo,

    /// The item's mesh failed validation.
    #[error("invalid mesh: {0}")]
    Geometry(#[from] pillar_geometry::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}
