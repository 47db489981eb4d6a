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

//! Hands out stable, scene-unique persistent ids.

use crate::id::{EntityKey, PersistentId};
use std::collections::HashMap;

/// Bidirectional map between persistent ids and live entities.
///
/// Collisions never fail: the registry scans upward from the candidate (or
/// from zero for negative candidates) and takes the first free id, wrapping
/// from `i32::MAX` back to zero.
#[derive(Debug, Default)]
pub struct IdentityRegistry {
    by_id: HashMap<PersistentId, EntityKey>,
    by_key: HashMap<EntityKey, PersistentId>,
}

impl IdentityRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `key`, preferring `candidate` as its id.
    ///
    /// Re-registering an entity returns the id it already holds.
    pub fn register(&mut self, key: EntityKey, candidate: PersistentId) -> PersistentId {
        if let Some(&existing) = self.by_key.get(&key) {
            return existing;
        }

        let id = self.first_free_from(candidate.0.max(0));
        if id != candidate {
            if candidate.0 >= 0 {
                log::warn!("Persistent id {candidate} is taken, entity {key} reassigned to {id}.");
            } else {
                log::debug!("Entity {key} had no persistent id, assigned {id}.");
            }
        }

        self.by_id.insert(id, key);
        self.by_key.insert(key, id);
        id
    }

    /// Releases the id held by `key`, returning it.
    pub fn unregister(&mut self, key: EntityKey) -> Option<PersistentId> {
        let id = self.by_key.remove(&key)?;
        self.by_id.remove(&id);
        Some(id)
    }

    /// Returns the entity holding `id`.
    pub fn lookup(&self, id: PersistentId) -> Option<EntityKey> {
        self.by_id.get(&id).copied()
    }

    /// Returns the id held by `key`.
    pub fn id_of(&self, key: EntityKey) -> Option<PersistentId> {
        self.by_key.get(&key).copied()
    }

    /// Number of registered entities.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Returns `true` when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Forgets every registration.
    pub fn clear(&mut self) {
        self.by_id.clear();
        self.by_key.clear();
    }

    fn first_free_from(&self, start: i32) -> PersistentId {
        let mut next = start;
        while self.by_id.contains_key(&PersistentId(next)) {
            next = if next == i32::MAX { 0 } else { next + 1 };
        }
        PersistentId(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colliding_candidates_get_distinct_ids() {
        let mut registry = IdentityRegistry::new();
        let a = registry.register(EntityKey(10), PersistentId(1));
        let b = registry.register(EntityKey(20), PersistentId(1));

        assert_eq!(a, PersistentId(1));
        assert_eq!(b, PersistentId(2));
        assert_eq!(registry.lookup(a), Some(EntityKey(10)));
        assert_eq!(registry.lookup(b), Some(EntityKey(20)));
    }

    #[test]
    fn scan_skips_every_taken_id() {
        let mut registry = IdentityRegistry::new();
        for (key, id) in [(1, 3), (2, 4), (3, 5)] {
            registry.register(EntityKey(key), PersistentId(id));
        }
        assert_eq!(registry.register(EntityKey(4), PersistentId(3)), PersistentId(6));
    }

    #[test]
    fn re_registration_is_idempotent() {
        let mut registry = IdentityRegistry::new();
        let first = registry.register(EntityKey(1), PersistentId(8));
        let second = registry.register(EntityKey(1), PersistentId(99));
        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn negative_candidates_start_from_zero() {
        let mut registry = IdentityRegistry::new();
        registry.register(EntityKey(1), PersistentId(0));
        assert_eq!(registry.register(EntityKey(2), PersistentId(-1)), PersistentId(1));
    }

    #[test]
    fn scan_wraps_at_the_top_of_the_range() {
        let mut registry = IdentityRegistry::new();
        registry.register(EntityKey(1), PersistentId(i32::MAX));
        assert_eq!(
            registry.register(EntityKey(2), PersistentId(i32::MAX)),
            PersistentId(0)
        );
    }

    #[test]
    fn unregister_frees_the_id() {
        let mut registry = IdentityRegistry::new();
        registry.register(EntityKey(1), PersistentId(4));
        assert_eq!(registry.unregister(EntityKey(1)), Some(PersistentId(4)));
        assert_eq!(registry.lookup(PersistentId(4)), None);
        assert_eq!(registry.register(EntityKey(2), PersistentId(4)), PersistentId(4));
    }
}
