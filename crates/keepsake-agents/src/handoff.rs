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

//! Single-slot mailbox carrying a loaded container across a scene transition.
//!
//! The agent that finished decoding deposits the container, then asks the
//! host to switch scenes. The agent of the new scene takes it out exactly
//! once, when its active scene matches the target. The mailbox belongs to the
//! [`SavegameService`](crate::SavegameService), so neither agent has to
//! outlive the transition.

use keepsake_core::scene::SceneTarget;
use keepsake_core::{Container, SceneIdentity};
use parking_lot::Mutex;
use std::sync::Arc;
use uuid::Uuid;

/// A loaded container waiting for its scene.
#[derive(Debug)]
pub struct Handoff {
    /// Identifies the load that produced it.
    pub ticket: Uuid,
    /// Scene the container must be reconciled into.
    pub target: SceneTarget,
    /// The decoded savegame.
    pub container: Container,
}

/// Shared single-slot mailbox.
#[derive(Debug, Clone, Default)]
pub struct TransitoryHandoff {
    slot: Arc<Mutex<Option<Handoff>>>,
}

impl TransitoryHandoff {
    /// Creates an empty mailbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `container` for `target`, returning the ticket of the handoff.
    ///
    /// A handoff nobody picked up is replaced.
    pub fn deposit(&self, target: SceneTarget, container: Container) -> Uuid {
        let ticket = Uuid::new_v4();
        let mut slot = self.slot.lock();
        if let Some(stale) = slot.replace(Handoff {
            ticket,
            target,
            container,
        }) {
            log::warn!(
                "Dropping unclaimed savegame handoff {} for {}.",
                stale.ticket,
                stale.target
            );
        }
        ticket
    }

    /// Takes the handoff if it targets `scene`.
    pub fn take_for(&self, scene: &SceneIdentity) -> Option<Handoff> {
        let mut slot = self.slot.lock();
        if slot.as_ref().is_some_and(|h| h.target.matches(scene)) {
            slot.take()
        } else {
            None
        }
    }

    /// Takes the handoff back if it is still the one issued as `ticket`.
    pub fn withdraw(&self, ticket: Uuid) -> Option<Handoff> {
        let mut slot = self.slot.lock();
        if slot.as_ref().is_some_and(|h| h.ticket == ticket) {
            slot.take()
        } else {
            None
        }
    }

    /// Returns `true` while handoff `ticket` is waiting.
    pub fn is_pending(&self, ticket: Uuid) -> bool {
        self.slot.lock().as_ref().is_some_and(|h| h.ticket == ticket)
    }

    /// Returns `true` when nothing is waiting.
    pub fn is_empty(&self) -> bool {
        self.slot.lock().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taken_exactly_once_by_the_matching_scene() {
        let mailbox = TransitoryHandoff::new();
        let ticket = mailbox.deposit(SceneTarget::Index(2), Container::default());

        assert!(mailbox.take_for(&SceneIdentity::new(1, "Menu")).is_none());
        assert!(mailbox.is_pending(ticket));

        let handoff = mailbox.take_for(&SceneIdentity::new(2, "Level")).unwrap();
        assert_eq!(handoff.ticket, ticket);
        assert!(mailbox.is_empty());
        assert!(mailbox.take_for(&SceneIdentity::new(2, "Level")).is_none());
    }

    #[test]
    fn clones_share_the_slot() {
        let old_scene = TransitoryHandoff::new();
        let new_scene = old_scene.clone();
        old_scene.deposit(SceneTarget::Name("Level".into()), Container::default());
        assert!(new_scene
            .take_for(&SceneIdentity::new(9, "Level"))
            .is_some());
        assert!(old_scene.is_empty());
    }

    #[test]
    fn withdraw_only_matches_its_own_ticket() {
        let mailbox = TransitoryHandoff::new();
        let first = mailbox.deposit(SceneTarget::Index(1), Container::default());
        let second = mailbox.deposit(SceneTarget::Index(1), Container::default());

        assert!(!mailbox.is_pending(first));
        assert!(mailbox.withdraw(first).is_none());
        assert!(mailbox.withdraw(second).is_some());
        assert!(mailbox.is_empty());
    }
}
