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

//! Opaque per-entity state payloads.
//!
//! Codecs store a [`Snapshot`] verbatim and never look inside it. Entity types
//! that want a typed, versioned payload implement [`SnapshotState`] on an
//! explicit state struct and go through [`Snapshot::from_state`] /
//! [`Snapshot::to_state`], which wrap the state in a small JSON envelope:
//!
//! ```json
//! {"version":2,"state":{"health":42}}
//! ```

use crate::error::SnapshotError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The serialized state of one entity at save time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(String);

/// An explicit, versioned snapshot type owned by an entity implementation.
///
/// Bump `VERSION` whenever the shape changes in a way older readers cannot
/// handle; use `#[serde(default)]` on new fields to keep reading older saves.
pub trait SnapshotState: Serialize + DeserializeOwned {
    /// Current version of the state layout.
    const VERSION: u32;
}

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    version: u32,
    state: &'a T,
}

#[derive(Deserialize)]
struct EnvelopeHeader {
    version: u32,
}

#[derive(Deserialize)]
struct Envelope<T> {
    state: T,
}

impl Snapshot {
    /// Wraps an already serialized payload.
    pub fn new(payload: impl Into<String>) -> Self {
        Self(payload.into())
    }

    /// Borrows the raw payload.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the snapshot and returns the raw payload.
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Returns `true` when the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Serializes a typed state into a versioned envelope.
    pub fn from_state<T: SnapshotState>(state: &T) -> Result<Self, SnapshotError> {
        let envelope = EnvelopeRef {
            version: T::VERSION,
            state,
        };
        Ok(Self(serde_json::to_string(&envelope)?))
    }

    /// Parses a versioned envelope back into its typed state.
    ///
    /// Payloads written by a newer `VERSION` are rejected instead of being
    /// partially applied.
    pub fn to_state<T: SnapshotState>(&self) -> Result<T, SnapshotError> {
        let header: EnvelopeHeader = serde_json::from_str(&self.0)?;
        if header.version > T::VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found: header.version,
                supported: T::VERSION,
            });
        }
        let envelope: Envelope<T> = serde_json::from_str(&self.0)?;
        Ok(envelope.state)
    }
}

impl From<String> for Snapshot {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Snapshot {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
