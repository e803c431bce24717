// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Pillar Scene
//!
//! Arena-based scene tree for printable geometry.
//!
//! Every mesh item lives in a slot map owned by the [`Scene`] and is addressed
//! by a stable, generational [`ItemKey`]. A parent owns its children through
//! an ordered key list; each child keeps a non-owning key back to its parent
//! for upward traversal (world transforms, inherited output type).
//!
//! Edits that must be reversible go through [`Scene::add_and_do`] with a
//! [`SceneCommand`]. Removed subtrees are detached rather than destroyed, so
//! the history can put them back.

pub mod command;
pub mod error;
pub mod item;
pub mod keys;
pub mod scene;
pub mod snapshot;

pub use command::{DeleteCommand, InsertCommand, SceneCommand, UndoBuffer};
pub use error::{Error, Result};
pub use item::{ItemKind, MeshItem, OutputType};
pub use keys::ItemKey;
pub use scene::Scene;
pub use snapshot::{ItemSnapshot, SceneSnapshot};
