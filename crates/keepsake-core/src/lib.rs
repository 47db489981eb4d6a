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

//! # Keepsake Core
//!
//! Foundational crate containing the contracts, identifiers and data types
//! shared by every layer of the savegame system.
//!
//! Nothing in here touches the disk format beyond naming conventions; the byte
//! pipelines live in `keepsake-lanes` and the save/load state machine lives in
//! `keepsake-agents`.

#![warn(missing_docs)]

pub mod config;
pub mod container;
pub mod context;
pub mod error;
pub mod event;
pub mod format;
pub mod id;
pub mod lane;
pub mod registry;
pub mod saveable;
pub mod scene;
pub mod snapshot;

pub use config::{CodecKind, SavegameConfig};
pub use container::{ComponentRecord, Container, SceneIdentity, SpawnedRecord};
pub use context::{PersistenceContext, PersistentEntity, SpawnedEntity};
pub use error::{FailureKind, Result, SavegameError, SnapshotError};
pub use event::{EventBus, SavegameEvent};
pub use format::{validate_name, SavegameDirectory};
pub use id::{EntityKey, PersistentId};
pub use registry::IdentityRegistry;
pub use saveable::Saveable;
pub use scene::{SceneHost, SceneTarget, Template, TemplateInstance, TemplateLibrary, TemplateRegistry};
pub use snapshot::{Snapshot, SnapshotState};
