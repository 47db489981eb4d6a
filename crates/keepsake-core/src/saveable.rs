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

//! The contract every persistent entity state implements.

use crate::error::SnapshotError;
use crate::snapshot::Snapshot;

/// Saveable state attached to one world entity.
///
/// All four hooks run on the thread that drives the savegame agent, one entity
/// at a time and in registration order. None of them may block.
///
/// The entity's persistent id is owned by the
/// [`PersistenceContext`](crate::PersistenceContext), which may reassign the
/// requested id on collision; read it back through
/// [`PersistentEntity::id`](crate::PersistentEntity::id).
pub trait Saveable {
    /// Pulls live transient state (e.g. the current transform) into the
    /// fields that will be captured.
    fn before_saving(&mut self) {}

    /// Produces the serializable snapshot.
    fn capture_snapshot(&self) -> Result<Snapshot, SnapshotError>;

    /// Overwrites the entity's fields from a decoded snapshot.
    ///
    /// Side effects on the world belong in [`after_loading`](Self::after_loading).
    fn apply_snapshot(&mut self, snapshot: &Snapshot) -> Result<(), SnapshotError>;

    /// Pushes restored fields back into the live world.
    fn after_loading(&mut self) {}
}
