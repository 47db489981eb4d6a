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

//! The in-memory savegame document.
//!
//! A [`Container`] is built fresh for every save and consumed once on load.
//! Both record lists keep insertion order; codecs must round-trip that order.

use crate::error::{Result, SavegameError};
use crate::id::PersistentId;
use crate::snapshot::Snapshot;
use std::collections::HashSet;

/// Highest container format version this build reads and the one it writes.
pub const CONTAINER_FORMAT_VERSION: u32 = 1;

/// Scene index written when the scene identity is unknown.
pub const UNSET_SCENE_INDEX: i32 = -2;

/// Scene name written when the scene identity is unknown.
pub const PLACEHOLDER_SCENE_NAME: &str = "map_name_here";

/// Identifies the scene a savegame belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SceneIdentity {
    /// Build index of the scene.
    pub index: i32,
    /// Name of the scene.
    pub name: String,
}

impl SceneIdentity {
    /// Creates a scene identity.
    pub fn new(index: i32, name: impl Into<String>) -> Self {
        Self {
            index,
            name: name.into(),
        }
    }
}

impl Default for SceneIdentity {
    fn default() -> Self {
        Self {
            index: UNSET_SCENE_INDEX,
            name: PLACEHOLDER_SCENE_NAME.to_string(),
        }
    }
}

/// Saved state of one placed entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentRecord {
    /// Persistent id of the entity.
    pub id: PersistentId,
    /// Its snapshot.
    pub data: Snapshot,
}

/// Saved state of one dynamically spawned entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnedRecord {
    /// Key into the template registry used to recreate the entity.
    pub template_reference: String,
    /// Snapshot of the entity's saveable state, if it had one.
    pub data: Option<Snapshot>,
}

/// The full savegame document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Container {
    /// Scene the savegame belongs to.
    pub scene: SceneIdentity,
    /// Placed entities, in registration order.
    pub entities: Vec<ComponentRecord>,
    /// Spawned entities, in spawn order.
    pub spawned: Vec<SpawnedRecord>,
}

impl Container {
    /// Creates an empty container for the given scene.
    pub fn new(scene: SceneIdentity) -> Self {
        Self {
            scene,
            entities: Vec::new(),
            spawned: Vec::new(),
        }
    }

    /// Appends a placed-entity record.
    pub fn push_entity(&mut self, id: PersistentId, data: Snapshot) {
        self.entities.push(ComponentRecord { id, data });
    }

    /// Appends a spawned-entity record.
    pub fn push_spawned(&mut self, template_reference: impl Into<String>, data: Option<Snapshot>) {
        self.spawned.push(SpawnedRecord {
            template_reference: template_reference.into(),
            data,
        });
    }

    /// Returns the snapshot stored for `id`, if any.
    pub fn entity(&self, id: PersistentId) -> Option<&Snapshot> {
        self.entities.iter().find(|r| r.id == id).map(|r| &r.data)
    }

    /// Checks that no entity id appears twice.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::with_capacity(self.entities.len());
        for record in &self.entities {
            if !seen.insert(record.id) {
                return Err(SavegameError::decode(format!(
                    "duplicate entity id {} in container",
                    record.id
                )));
            }
        }
        Ok(())
    }
}
