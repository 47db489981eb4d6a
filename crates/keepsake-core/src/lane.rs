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

//! # Lane Abstraction
//!
//! A **Lane** is a swappable byte-processing strategy owned by the savegame
//! pipeline: one codec lane turns a container into bytes, and optional
//! compression and cipher lanes transform those bytes on their way to disk.
//!
//! Domain traits extend `Lane` with their execution methods
//! (`ContainerCodec: Lane` in `keepsake-lanes`, for instance); this trait only
//! carries identity and classification.

use std::any::Any;
use std::fmt;

/// Classification of lane types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LaneKind {
    /// Container to bytes and back.
    Codec,
    /// Byte-stream compression.
    Compression,
    /// Symmetric encryption.
    Cipher,
}

impl fmt::Display for LaneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaneKind::Codec => write!(f, "Codec"),
            LaneKind::Compression => write!(f, "Compression"),
            LaneKind::Cipher => write!(f, "Cipher"),
        }
    }
}

/// Common interface shared by all lanes.
pub trait Lane: Send + Sync {
    /// Human-readable, versioned name of this lane's strategy
    /// (e.g. `"KS_JSON_V1"`). Used for logging and diagnostics.
    fn strategy_name(&self) -> &'static str;

    /// The kind of processing this lane performs.
    fn lane_kind(&self) -> LaneKind;

    /// Downcast to a concrete type for type-specific operations.
    fn as_any(&self) -> &dyn Any;

    /// Downcast to a concrete type (mutable) for type-specific operations.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
