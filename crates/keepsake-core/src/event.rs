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

//! Savegame lifecycle events and the channel that carries them.

use crate::error::FailureKind;
use std::path::PathBuf;

/// Lifecycle notifications published by savegame agents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SavegameEvent {
    /// A save request was accepted.
    SavingStarted {
        /// Logical savegame name.
        name: String,
    },
    /// The savegame file was written.
    Saved {
        /// Final path of the file.
        path: PathBuf,
    },
    /// The save was aborted.
    SaveFailed {
        /// Failure classification.
        kind: FailureKind,
        /// Rendered error.
        message: String,
    },
    /// A load request was accepted.
    LoadingStarted {
        /// Logical savegame name, empty when loading the newest file.
        name: String,
    },
    /// Reconciliation finished in the new scene.
    Loaded {
        /// Placed entities that received their saved state.
        applied: usize,
        /// Placed entities destroyed because they were not in the savegame.
        destroyed: usize,
        /// Entities recreated from templates.
        spawned: usize,
        /// Per-entity failures that were skipped.
        failures: usize,
    },
    /// The load was aborted before any entity was touched.
    LoadFailed {
        /// Failure classification.
        kind: FailureKind,
        /// Rendered error.
        message: String,
    },
    /// The agent is idle again.
    Ready,
}

/// Manages a generic, thread-safe event channel.
///
/// This EventBus is generic over the type `T` of event it transports.
#[derive(Debug)]
pub struct EventBus<T: Clone + Send + Sync + 'static> {
    sender: flume::Sender<T>,
    receiver: flume::Receiver<T>,
}

impl<T: Clone + Send + Sync + 'static> EventBus<T> {
    /// Creates a new EventBus with an unbounded channel for a specific event type.
    pub fn new() -> Self {
        let (sender, receiver) = flume::unbounded();
        log::debug!("EventBus initialized.");
        Self { sender, receiver }
    }

    /// Attempts to send an event, logging an error if the receiver is disconnected.
    pub fn publish(&self, event: T) {
        log::trace!("Publishing an event.");

        if let Err(e) = self.sender.send(event) {
            log::error!("Failed to send event: {e}. Receiver likely disconnected.");
        }
    }

    /// Returns a clone of the sender end of the channel.
    /// Use this to allow other parts of the system to send events.
    pub fn sender(&self) -> flume::Sender<T> {
        self.sender.clone()
    }

    /// Returns a reference to the receiver end of the channel.
    /// Intended for the owner of the bus to process events.
    pub fn receiver(&self) -> &flume::Receiver<T> {
        &self.receiver
    }

    /// Takes every event currently queued, oldest first.
    pub fn drain(&self) -> Vec<T> {
        self.receiver.try_iter().collect()
    }
}

impl<T: Clone + Send + Sync + 'static> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}
