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

//! A codec lane that stores the container as a JSON document.
//!
//! ```json
//! {
//!   "formatVersion": 1,
//!   "mapIndex": 3,
//!   "mapName": "Harbor",
//!   "components": [{ "id": 1, "data": "..." }],
//!   "spawnedPrefabs": [{ "templateReference": "grenade", "data": "..." }]
//! }
//! ```

use crate::codec_lane::ContainerCodec;
use keepsake_core::container::{
    ComponentRecord, SceneIdentity, SpawnedRecord, CONTAINER_FORMAT_VERSION,
    PLACEHOLDER_SCENE_NAME, UNSET_SCENE_INDEX,
};
use keepsake_core::lane::{Lane, LaneKind};
use keepsake_core::{Container, PersistentId, Result, SavegameError, Snapshot};
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SavegameOut<'a> {
    format_version: u32,
    map_index: i32,
    map_name: &'a str,
    components: Vec<ComponentOut<'a>>,
    spawned_prefabs: Vec<SpawnedOut<'a>>,
}

#[derive(Serialize)]
struct ComponentOut<'a> {
    id: PersistentId,
    data: &'a Snapshot,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SpawnedOut<'a> {
    template_reference: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a Snapshot>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SavegameIn {
    #[serde(default = "default_format_version")]
    format_version: u32,
    #[serde(default = "default_map_index")]
    map_index: i32,
    #[serde(default = "default_map_name")]
    map_name: String,
    #[serde(default)]
    components: Vec<ComponentIn>,
    #[serde(default)]
    spawned_prefabs: Vec<SpawnedIn>,
}

#[derive(Deserialize)]
struct ComponentIn {
    id: PersistentId,
    #[serde(default)]
    data: Snapshot,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpawnedIn {
    template_reference: String,
    #[serde(default)]
    data: Option<Snapshot>,
}

fn default_format_version() -> u32 {
    1
}

fn default_map_index() -> i32 {
    UNSET_SCENE_INDEX
}

fn default_map_name() -> String {
    PLACEHOLDER_SCENE_NAME.to_string()
}

/// Stores the container as JSON.
#[derive(Debug, Default)]
pub struct JsonCodecLane;

impl JsonCodecLane {
    /// Creates a new instance of the JsonCodecLane.
    pub fn new() -> Self {
        Self
    }
}

impl Lane for JsonCodecLane {
    fn strategy_name(&self) -> &'static str {
        "KS_JSON_V1"
    }

    fn lane_kind(&self) -> LaneKind {
        LaneKind::Codec
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

impl ContainerCodec for JsonCodecLane {
    fn encode(&self, container: &Container, pretty: bool) -> Result<Vec<u8>> {
        let document = SavegameOut {
            format_version: CONTAINER_FORMAT_VERSION,
            map_index: container.scene.index,
            map_name: &container.scene.name,
            components: container
                .entities
                .iter()
                .map(|r| ComponentOut {
                    id: r.id,
                    data: &r.data,
                })
                .collect(),
            spawned_prefabs: container
                .spawned
                .iter()
                .map(|r| SpawnedOut {
                    template_reference: &r.template_reference,
                    data: r.data.as_ref(),
                })
                .collect(),
        };

        let encoded = if pretty {
            serde_json::to_vec_pretty(&document)
        } else {
            serde_json::to_vec(&document)
        };
        encoded.map_err(SavegameError::encode)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Container> {
        let document: SavegameIn = serde_json::from_slice(bytes)
            .map_err(|e| SavegameError::decode(format!("invalid JSON savegame: {e}")))?;

        if document.format_version > CONTAINER_FORMAT_VERSION {
            return Err(SavegameError::decode(format!(
                "savegame format version {} is newer than supported version {CONTAINER_FORMAT_VERSION}",
                document.format_version
            )));
        }

        let container = Container {
            scene: SceneIdentity::new(document.map_index, document.map_name),
            entities: document
                .components
                .into_iter()
                .map(|c| ComponentRecord {
                    id: c.id,
                    data: c.data,
                })
                .collect(),
            spawned: document
                .spawned_prefabs
                .into_iter()
                .map(|s| SpawnedRecord {
                    template_reference: s.template_reference,
                    data: s.data,
                })
                .collect(),
        };
        container.validate()?;
        Ok(container)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Container {
        let mut container = Container::new(SceneIdentity::new(3, "Harbor"));
        container.push_entity(PersistentId(7), Snapshot::new(r#"{"hp":10}"#));
        container.push_entity(PersistentId(2), Snapshot::new("B"));
        container.push_entity(PersistentId(5), Snapshot::new(""));
        container.push_spawned("grenade", Some(Snapshot::new("fuse=3")));
        container.push_spawned("crate", None);
        container.push_spawned("grenade", Some(Snapshot::new("fuse=1")));
        container
    }

    #[test]
    fn round_trip_preserves_order_and_content() {
        let lane = JsonCodecLane::new();
        let container = sample();

        for pretty in [false, true] {
            let bytes = lane.encode(&container, pretty).unwrap();
            let decoded = lane.decode(&bytes).unwrap();
            assert_eq!(decoded, container);
            let ids: Vec<i32> = decoded.entities.iter().map(|r| r.id.get()).collect();
            assert_eq!(ids, vec![7, 2, 5]);
        }
    }

    #[test]
    fn compact_output_uses_the_documented_field_names() {
        let mut container = Container::new(SceneIdentity::new(0, "Main"));
        container.push_entity(PersistentId(1), Snapshot::new("A"));
        container.push_entity(PersistentId(2), Snapshot::new("B"));

        let bytes = JsonCodecLane::new().encode(&container, false).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"formatVersion":1,"mapIndex":0,"mapName":"Main","components":[{"id":1,"data":"A"},{"id":2,"data":"B"}],"spawnedPrefabs":[]}"#
        );
    }

    #[test]
    fn missing_optional_fields_take_neutral_values() {
        let decoded = JsonCodecLane::new()
            .decode(br#"{"components":[{"id":4}]}"#)
            .unwrap();
        assert_eq!(decoded.scene, SceneIdentity::default());
        assert_eq!(decoded.entities.len(), 1);
        assert!(decoded.entities[0].data.is_empty());
        assert!(decoded.spawned.is_empty());
    }

    #[test]
    fn malformed_documents_are_decode_errors() {
        let lane = JsonCodecLane::new();
        let cases: [&[u8]; 5] = [
            b"",
            b"not json",
            b"[1,2,3]",
            br#"{"components":[{"data":"no id"}]}"#,
            br#"{"spawnedPrefabs":[{"data":"no reference"}]}"#,
        ];
        for bytes in cases {
            assert!(
                matches!(lane.decode(bytes), Err(SavegameError::Decode(_))),
                "{:?} should not decode",
                String::from_utf8_lossy(bytes)
            );
        }
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let result = JsonCodecLane::new()
            .decode(br#"{"components":[{"id":1,"data":"a"},{"id":1,"data":"b"}]}"#);
        assert!(matches!(result, Err(SavegameError::Decode(_))));
    }

    #[test]
    fn newer_format_versions_are_rejected() {
        let result = JsonCodecLane::new().decode(br#"{"formatVersion":2}"#);
        assert!(matches!(result, Err(SavegameError::Decode(_))));
    }
}
