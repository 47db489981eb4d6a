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

//! Merges a loaded container into the freshly loaded scene.

use super::SceneContext;
use keepsake_core::{Container, PersistentId, SavegameError, Snapshot};
use std::collections::HashMap;

/// What reconciliation did, entity by entity.
#[derive(Debug, Default)]
pub struct ReconciliationReport {
    /// Placed entities that received their saved state.
    pub applied: Vec<PersistentId>,
    /// Placed entities destroyed because the savegame did not know them.
    pub destroyed: Vec<PersistentId>,
    /// Template references recreated, in container order.
    pub spawned: Vec<String>,
    /// Per-entity failures; each one was skipped.
    pub failures: Vec<SavegameError>,
}

impl ReconciliationReport {
    /// Returns `true` when every record reconciled.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn fail(&mut self, target: String, reason: impl std::fmt::Display) {
        let error = SavegameError::Reconciliation {
            target,
            reason: reason.to_string(),
        };
        log::error!("{error}");
        self.failures.push(error);
    }
}

/// Applies `container` to the scene in `cx`.
///
/// Placed entities are visited in registration order: a saved snapshot is
/// applied, an entity the savegame does not know is destroyed. Spawned records
/// are then recreated in container order. A failing entity is reported and
/// skipped; it never stops the rest.
pub(crate) fn reconcile(container: Container, cx: &mut SceneContext<'_>) -> ReconciliationReport {
    let mut report = ReconciliationReport::default();
    let saved: HashMap<PersistentId, Snapshot> = container
        .entities
        .into_iter()
        .map(|record| (record.id, record.data))
        .collect();

    let live: Vec<_> = cx
        .persistence
        .entities()
        .map(|entity| (entity.id(), entity.key()))
        .collect();

    for (id, key) in live {
        match saved.get(&id) {
            Some(snapshot) => {
                let Some(entity) = cx.persistence.get_mut(id) else {
                    continue;
                };
                let state = entity.state_mut();
                match state.apply_snapshot(snapshot) {
                    Ok(()) => {
                        state.after_loading();
                        report.applied.push(id);
                    }
                    Err(e) => report.fail(format!("entity {id}"), e),
                }
            }
            None => {
                log::debug!("Entity {id} is not in the savegame, destroying it.");
                cx.persistence.detach(key);
                cx.scene.destroy_entity(key);
                report.destroyed.push(id);
            }
        }
    }

    for record in container.spawned {
        let reference = record.template_reference;
        let Some(template) = cx.templates.resolve(&reference) else {
            report.fail(format!("template '{reference}'"), "template not found");
            continue;
        };

        let mut instance = match template.instantiate() {
            Ok(instance) => instance,
            Err(e) => {
                report.fail(format!("template '{reference}'"), e);
                continue;
            }
        };

        if let (Some(state), Some(snapshot)) = (instance.state.as_mut(), record.data.as_ref()) {
            if let Err(e) = state.apply_snapshot(snapshot) {
                report.fail(format!("spawned '{reference}'"), e);
                cx.scene.destroy_entity(instance.key);
                continue;
            }
            state.after_loading();
        }

        match cx.persistence.spawn(instance.key, reference.as_str(), instance.state) {
            Ok(()) => report.spawned.push(reference),
            Err(e) => report.fail(format!("spawned '{reference}'"), e),
        }
    }

    report
}
