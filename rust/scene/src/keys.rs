// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Key type for arena-based item storage.
//!
//! Keys are created by `slotmap::SlotMap` and remain valid even after other
//! items are removed (generational indices).

use slotmap::new_key_type;

new_key_type! {
    /// Key for a mesh item (or group) in a [`Scene`](crate::Scene).
    pub struct ItemKey;
}
