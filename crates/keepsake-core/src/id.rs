// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Identifier types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a persistent entity, unique within a scene.
///
/// This is the id written into the savegame. Negative values are accepted as
/// candidates but never handed out by the [`IdentityRegistry`](crate::IdentityRegistry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersistentId(pub i32);

impl PersistentId {
    /// Returns the raw integer value.
    pub fn get(self) -> i32 {
        self.0
    }
}

impl From<i32> for PersistentId {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl fmt::Display for PersistentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque handle of a live entity in the host world.
///
/// Handed out by the host (scene setup, spawners, templates) and only ever
/// compared and passed back to it; the savegame system never interprets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityKey(pub u64);

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
