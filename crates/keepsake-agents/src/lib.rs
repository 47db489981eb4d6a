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

//! # Keepsake Agents
//!
//! The savegame agent drives save and load requests through the lanes, one
//! tick at a time, and hands loaded data across scene transitions.
//!
//! A [`SavegameService`] lives for the whole process and owns everything that
//! must survive a scene change: configuration, the byte pipeline, the event
//! bus and the [`TransitoryHandoff`] mailbox. Each scene asks it for a fresh
//! [`SavegameAgent`].

#![warn(missing_docs)]

pub mod handoff;
pub mod savegame_agent;
pub mod service;

pub use handoff::{Handoff, TransitoryHandoff};
pub use savegame_agent::{AgentPhase, ReconciliationReport, SaveRequest, SavegameAgent, SceneContext};
pub use service::SavegameService;
