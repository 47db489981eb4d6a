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

//! Scene-scoped persistence state.
//!
//! A [`PersistenceContext`] owns the identity registry and the list of
//! dynamically spawned entities for one scene. The host creates one when a
//! scene comes up, feeds it as entities enter and leave the world, and clears
//! it when the scene unloads. It is only touched from the thread that drives
//! the savegame agent.

use crate::error::{Result, SavegameError};
use crate::id::{EntityKey, PersistentId};
use crate::registry::IdentityRegistry;
use crate::saveable::Saveable;

/// A placed entity together with its saveable state.
pub struct PersistentEntity {
    id: PersistentId,
    key: EntityKey,
    state: Box<dyn Saveable>,
}

impl PersistentEntity {
    /// The persistent id assigned at registration.
    pub fn id(&self) -> PersistentId {
        self.id
    }

    /// The world entity carrying the state.
    pub fn key(&self) -> EntityKey {
        self.key
    }

    /// Borrows the saveable state.
    pub fn state(&self) -> &dyn Saveable {
        self.state.as_ref()
    }

    /// Mutably borrows the saveable state.
    pub fn state_mut(&mut self) -> &mut dyn Saveable {
        self.state.as_mut()
    }
}

/// An entity spawned at runtime from a template.
pub struct SpawnedEntity {
    key: EntityKey,
    template_reference: String,
    state: Option<Box<dyn Saveable>>,
}

impl SpawnedEntity {
    /// The world entity.
    pub fn key(&self) -> EntityKey {
        self.key
    }

    /// Template key used to recreate the entity on load.
    pub fn template_reference(&self) -> &str {
        &self.template_reference
    }

    /// Mutably borrows the saveable state, if the entity has one.
    pub fn state_mut(&mut self) -> Option<&mut (dyn Saveable + 'static)> {
        self.state.as_deref_mut()
    }
}

/// Identity registry plus spawned-entity list for one scene.
#[derive(Default)]
pub struct PersistenceContext {
    registry: IdentityRegistry,
    placed: Vec<PersistentEntity>,
    spawned: Vec<SpawnedEntity>,
}

impl PersistenceContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a saveable state to a placed entity and registers its id.
    ///
    /// A world entity carries at most one saveable state. A second attach is
    /// rejected with [`SavegameError::DuplicateComponent`] and `state` is
    /// dropped; the first attachment stays in place.
    pub fn attach(
        &mut self,
        key: EntityKey,
        candidate: PersistentId,
        state: Box<dyn Saveable>,
    ) -> Result<PersistentId> {
        if self.is_tracked(key) {
            log::warn!("Entity {key} already has a saveable state, discarding the duplicate.");
            return Err(SavegameError::DuplicateComponent { key });
        }
        let id = self.registry.register(key, candidate);
        self.placed.push(PersistentEntity { id, key, state });
        Ok(id)
    }

    /// Registers an entity as dynamically spawned from `template_reference`.
    pub fn spawn(
        &mut self,
        key: EntityKey,
        template_reference: impl Into<String>,
        state: Option<Box<dyn Saveable>>,
    ) -> Result<()> {
        if self.is_tracked(key) {
            log::warn!("Entity {key} is already tracked, discarding the duplicate spawn.");
            return Err(SavegameError::DuplicateComponent { key });
        }
        self.spawned.push(SpawnedEntity {
            key,
            template_reference: template_reference.into(),
            state,
        });
        Ok(())
    }

    /// Forgets an entity that left the world, placed or spawned.
    ///
    /// Returns `true` when the entity was tracked.
    pub fn detach(&mut self, key: EntityKey) -> bool {
        if let Some(pos) = self.placed.iter().position(|e| e.key == key) {
            self.placed.remove(pos);
            self.registry.unregister(key);
            return true;
        }
        if let Some(pos) = self.spawned.iter().position(|e| e.key == key) {
            self.spawned.remove(pos);
            return true;
        }
        false
    }

    /// The identity registry.
    pub fn registry(&self) -> &IdentityRegistry {
        &self.registry
    }

    /// Placed entities in registration order.
    pub fn entities(&self) -> impl Iterator<Item = &PersistentEntity> {
        self.placed.iter()
    }

    /// Number of placed entities.
    pub fn entity_count(&self) -> usize {
        self.placed.len()
    }

    /// The placed entity carried by world entity `key`.
    pub fn entity_mut(&mut self, key: EntityKey) -> Option<&mut PersistentEntity> {
        self.placed.iter_mut().find(|e| e.key == key)
    }

    /// The placed entity holding `id`.
    pub fn get(&self, id: PersistentId) -> Option<&PersistentEntity> {
        self.placed.iter().find(|e| e.id == id)
    }

    /// The placed entity holding `id`, mutably.
    pub fn get_mut(&mut self, id: PersistentId) -> Option<&mut PersistentEntity> {
        self.placed.iter_mut().find(|e| e.id == id)
    }

    /// Spawned entities in spawn order.
    pub fn spawned(&self) -> impl Iterator<Item = &SpawnedEntity> {
        self.spawned.iter()
    }

    /// Number of spawned entities.
    pub fn spawned_count(&self) -> usize {
        self.spawned.len()
    }

    /// The spawned entity tracked for world entity `key`.
    pub fn spawned_mut(&mut self, key: EntityKey) -> Option<&mut SpawnedEntity> {
        self.spawned.iter_mut().find(|e| e.key == key)
    }

    /// Drops everything; called when the scene unloads.
    pub fn clear(&mut self) {
        self.registry.clear();
        self.placed.clear();
        self.spawned.clear();
    }

    fn is_tracked(&self, key: EntityKey) -> bool {
        self.registry.id_of(key).is_some() || self.spawned.iter().any(|e| e.key == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SnapshotError;
    use crate::snapshot::Snapshot;

    struct Fixed(&'static str);

    impl Saveable for Fixed {
        fn capture_snapshot(&self) -> std::result::Result<Snapshot, SnapshotError> {
            Ok(Snapshot::new(self.0))
        }

        fn apply_snapshot(&mut self, _: &Snapshot) -> std::result::Result<(), SnapshotError> {
            Ok(())
        }
    }

    #[test]
    fn attach_keeps_registration_order() {
        let mut cx = PersistenceContext::new();
        cx.attach(EntityKey(3), PersistentId(30), Box::new(Fixed("c")))
            .unwrap();
        cx.attach(EntityKey(1), PersistentId(10), Box::new(Fixed("a")))
            .unwrap();

        let ids: Vec<_> = cx.entities().map(|e| e.id()).collect();
        assert_eq!(ids, vec![PersistentId(30), PersistentId(10)]);
    }

    #[test]
    fn second_attach_is_rejected_and_discarded() {
        let mut cx = PersistenceContext::new();
        cx.attach(EntityKey(1), PersistentId(1), Box::new(Fixed("first")))
            .unwrap();
        let err = cx
            .attach(EntityKey(1), PersistentId(2), Box::new(Fixed("second")))
            .unwrap_err();

        assert!(matches!(
            err,
            SavegameError::DuplicateComponent { key: EntityKey(1) }
        ));
        assert_eq!(cx.entity_count(), 1);
        let kept = cx.get(PersistentId(1)).unwrap();
        assert_eq!(kept.state().capture_snapshot().unwrap().as_str(), "first");
    }

    #[test]
    fn colliding_ids_are_reassigned_on_attach() {
        let mut cx = PersistenceContext::new();
        let a = cx
            .attach(EntityKey(1), PersistentId(5), Box::new(Fixed("a")))
            .unwrap();
        let b = cx
            .attach(EntityKey(2), PersistentId(5), Box::new(Fixed("b")))
            .unwrap();
        assert_ne!(a, b);
        assert_eq!(cx.registry().lookup(b), Some(EntityKey(2)));
    }

    #[test]
    fn detach_handles_placed_and_spawned() {
        let mut cx = PersistenceContext::new();
        cx.attach(EntityKey(1), PersistentId(1), Box::new(Fixed("a")))
            .unwrap();
        cx.spawn(EntityKey(2), "grenade", None).unwrap();

        assert!(cx.detach(EntityKey(1)));
        assert!(cx.entity_mut(EntityKey(1)).is_none());
        assert!(cx.spawned_mut(EntityKey(2)).is_some());
        assert!(cx.detach(EntityKey(2)));
        assert!(!cx.detach(EntityKey(3)));
        assert_eq!(cx.entity_count(), 0);
        assert_eq!(cx.spawned_count(), 0);
        assert!(cx.registry().is_empty());
    }

    #[test]
    fn clear_resets_everything() {
        let mut cx = PersistenceContext::new();
        cx.attach(EntityKey(1), PersistentId(1), Box::new(Fixed("a")))
            .unwrap();
        cx.spawn(EntityKey(2), "crate", Some(Box::new(Fixed("b"))))
            .unwrap();
        cx.clear();
        assert_eq!(cx.entity_count(), 0);
        assert_eq!(cx.spawned_count(), 0);
    }
}
