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

//! Error taxonomy of the savegame system.
//!
//! Lanes and agents all speak [`SavegameError`]. The agent is the only place
//! where errors are turned into `SaveFailed`/`LoadFailed` events, carrying the
//! coarse [`FailureKind`] plus the rendered message.

use crate::id::EntityKey;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, SavegameError>;

/// Errors raised by a single entity while producing or consuming a snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The payload could not be parsed into the entity's state type.
    #[error("malformed snapshot payload: {0}")]
    Malformed(#[from] serde_json::Error),
    /// The payload was written by a newer version of the state type.
    #[error("snapshot version {found} is newer than supported version {supported}")]
    UnsupportedVersion {
        /// Version stored in the payload.
        found: u32,
        /// Highest version the state type understands.
        supported: u32,
    },
    /// The entity refused the payload for a domain-specific reason.
    #[error("{0}")]
    Rejected(String),
}

/// Everything that can go wrong while saving or loading.
#[derive(Debug, Error)]
pub enum SavegameError {
    /// A required parameter is missing or out of range.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// The container could not be encoded.
    #[error("encode error: {0}")]
    Encode(String),
    /// The container bytes are malformed.
    #[error("decode error: {0}")]
    Decode(String),
    /// Wrong key, wrong salt or corrupted ciphertext.
    #[error("decryption error: {0}")]
    Decryption(String),
    /// The operation exceeded its configured budget.
    #[error("{operation} timed out after {elapsed:?}")]
    Timeout {
        /// `"save"` or `"load"`.
        operation: &'static str,
        /// Time spent when the budget check fired.
        elapsed: Duration,
    },
    /// A single entity or spawned record failed to reconcile.
    #[error("failed to reconcile {target}: {reason}")]
    Reconciliation {
        /// Human readable description of the entity or template.
        target: String,
        /// Rendered cause.
        reason: String,
    },
    /// A second saveable state was attached to the same world entity.
    #[error("entity {key} already has a saveable state attached")]
    DuplicateComponent {
        /// The world entity carrying the duplicate.
        key: EntityKey,
    },
    /// No savegame matches the requested name.
    #[error("no savegame found for '{name}'")]
    NotFound {
        /// The requested logical name.
        name: String,
    },
    /// The scene transition could not be started.
    #[error("scene transition failed: {0}")]
    Scene(String),
    /// The background task stopped before reporting a result.
    #[error("background task failed: {0}")]
    Task(String),
    /// The background task observed a cancellation request.
    #[error("operation cancelled")]
    Cancelled,
    /// An entity failed to produce or consume its snapshot.
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    /// Underlying filesystem error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SavegameError {
    /// Convenience constructor for configuration errors.
    pub fn config(msg: impl Into<String>) -> Self {
        SavegameError::Configuration(msg.into())
    }

    /// Convenience constructor for decode errors.
    pub fn decode(msg: impl fmt::Display) -> Self {
        SavegameError::Decode(msg.to_string())
    }

    /// Convenience constructor for encode errors.
    pub fn encode(msg: impl fmt::Display) -> Self {
        SavegameError::Encode(msg.to_string())
    }

    /// Convenience constructor for decryption errors.
    pub fn decryption(msg: impl fmt::Display) -> Self {
        SavegameError::Decryption(msg.to_string())
    }

    /// Returns the coarse classification carried by failure events.
    pub fn kind(&self) -> FailureKind {
        match self {
            SavegameError::Configuration(_) | SavegameError::DuplicateComponent { .. } => {
                FailureKind::Configuration
            }
            SavegameError::Encode(_) => FailureKind::Encode,
            SavegameError::Decode(_) => FailureKind::Decode,
            SavegameError::Decryption(_) => FailureKind::Decryption,
            SavegameError::Timeout { .. } | SavegameError::Cancelled => FailureKind::Timeout,
            SavegameError::Reconciliation { .. } => FailureKind::Reconciliation,
            SavegameError::NotFound { .. } => FailureKind::NotFound,
            SavegameError::Scene(_) => FailureKind::Scene,
            SavegameError::Snapshot(_) => FailureKind::Snapshot,
            SavegameError::Task(_) | SavegameError::Io(_) => FailureKind::Io,
        }
    }
}

/// Coarse failure classification, cheap to copy into events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Bad or missing parameter.
    Configuration,
    /// Container could not be encoded.
    Encode,
    /// Container bytes were malformed.
    Decode,
    /// Ciphertext could not be decrypted.
    Decryption,
    /// Budget exceeded.
    Timeout,
    /// Per-entity reconciliation failure.
    Reconciliation,
    /// No savegame file matched.
    NotFound,
    /// Scene transition refused.
    Scene,
    /// Entity snapshot failure.
    Snapshot,
    /// Filesystem or thread failure.
    Io,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::Configuration => "configuration",
            FailureKind::Encode => "encode",
            FailureKind::Decode => "decode",
            FailureKind::Decryption => "decryption",
            FailureKind::Timeout => "timeout",
            FailureKind::Reconciliation => "reconciliation",
            FailureKind::NotFound => "not-found",
            FailureKind::Scene => "scene",
            FailureKind::Snapshot => "snapshot",
            FailureKind::Io => "io",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_component_is_a_configuration_failure() {
        let err = SavegameError::DuplicateComponent { key: EntityKey(7) };
        assert_eq!(err.kind(), FailureKind::Configuration);
        assert_eq!(
            err.to_string(),
            "entity #7 already has a saveable state attached"
        );
    }

    #[test]
    fn io_errors_convert_with_question_mark() {
        fn open() -> Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"))?;
            Ok(())
        }
        let err = open().unwrap_err();
        assert_eq!(err.kind(), FailureKind::Io);
    }

    #[test]
    fn timeout_message_names_the_operation() {
        let err = SavegameError::Timeout {
            operation: "save",
            elapsed: Duration::from_secs(2),
        };
        assert!(err.to_string().starts_with("save timed out"));
        assert_eq!(err.kind(), FailureKind::Timeout);
    }
}
