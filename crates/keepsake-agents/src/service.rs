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

//! The process-wide savegame service.

use crate::handoff::TransitoryHandoff;
use crate::savegame_agent::SavegameAgent;
use keepsake_core::{EventBus, Result, SavegameConfig, SavegameDirectory, SavegameEvent};
use keepsake_lanes::SavegamePipeline;
use std::path::Path;
use std::sync::Arc;

/// Owns the state shared by every scene's [`SavegameAgent`].
pub struct SavegameService {
    config: Arc<SavegameConfig>,
    directory: SavegameDirectory,
    pipeline: Arc<SavegamePipeline>,
    events: EventBus<SavegameEvent>,
    handoff: TransitoryHandoff,
}

impl SavegameService {
    /// Validates `config` and prepares the byte pipeline.
    ///
    /// Savegames live in `data_root/config.directory`; the directory is only
    /// created by the first save.
    pub fn new(config: SavegameConfig, data_root: impl AsRef<Path>) -> Result<Self> {
        config.validate()?;
        let pipeline = SavegamePipeline::from_config(&config)?;
        let directory = SavegameDirectory::new(
            data_root.as_ref().join(&config.directory),
            config.file_extension.clone(),
        );
        log::info!(
            "Savegame service ready: '{}' through {}.",
            directory.path().display(),
            pipeline.describe()
        );

        Ok(Self {
            config: Arc::new(config),
            directory,
            pipeline: Arc::new(pipeline),
            events: EventBus::new(),
            handoff: TransitoryHandoff::new(),
        })
    }

    /// Creates the agent for a newly loaded scene.
    pub fn agent(&self) -> SavegameAgent {
        SavegameAgent::new(
            Arc::clone(&self.config),
            self.directory.clone(),
            Arc::clone(&self.pipeline),
            self.events.sender(),
            self.handoff.clone(),
        )
    }

    /// The active configuration.
    pub fn config(&self) -> &SavegameConfig {
        &self.config
    }

    /// The savegame directory.
    pub fn directory(&self) -> &SavegameDirectory {
        &self.directory
    }

    /// The byte pipeline, for tools reading savegames directly.
    pub fn pipeline(&self) -> &SavegamePipeline {
        &self.pipeline
    }

    /// The handoff mailbox shared by all agents.
    pub fn handoff(&self) -> &TransitoryHandoff {
        &self.handoff
    }

    /// Receiver of every agent's lifecycle events.
    pub fn events(&self) -> &flume::Receiver<SavegameEvent> {
        self.events.receiver()
    }

    /// Takes all queued events, oldest first.
    pub fn drain_events(&self) -> Vec<SavegameEvent> {
        self.events.drain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keepsake_core::SavegameError;

    #[test]
    fn invalid_config_is_rejected() {
        let config = SavegameConfig {
            encrypt: true,
            key: None,
            ..Default::default()
        };
        assert!(matches!(
            SavegameService::new(config, "."),
            Err(SavegameError::Configuration(_))
        ));
    }

    #[test]
    fn directory_is_resolved_against_the_data_root() {
        let tmp = tempfile::tempdir().unwrap();
        let service = SavegameService::new(SavegameConfig::default(), tmp.path()).unwrap();
        assert_eq!(service.directory().path(), tmp.path().join("Savegames"));
        assert!(!service.directory().path().exists());
    }

    #[test]
    fn agents_report_on_the_service_bus() {
        // --- 1. ARRANGE ---
        let tmp = tempfile::tempdir().unwrap();
        let service = SavegameService::new(SavegameConfig::default(), tmp.path()).unwrap();
        let mut agent = service.agent();

        // --- 2. ACT ---
        assert!(agent.load("missing"));

        // --- 3. ASSERT ---
        let events = service.drain_events();
        assert_eq!(events.len(), 3);
        assert_eq!(
            events[0],
            SavegameEvent::LoadingStarted {
                name: "missing".into()
            }
        );
        assert!(matches!(
            events[1],
            SavegameEvent::LoadFailed {
                kind: keepsake_core::FailureKind::NotFound,
                ..
            }
        ));
        assert_eq!(events[2], SavegameEvent::Ready);
        assert!(!agent.is_busy());
    }
}
