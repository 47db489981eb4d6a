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

//! Savegame settings, loadable from a RON file.
//!
//! ```ron
//! (
//!     encrypt: true,
//!     key: Some("hunter2"),
//!     codec: Xml,
//!     save_timeout_secs: 30,
//! )
//! ```
//!
//! Every field is optional and falls back to [`SavegameConfig::default`].

use crate::error::{Result, SavegameError};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::Path;
use std::time::Duration;

/// Accepted range for save/load timeouts, in seconds.
pub const TIMEOUT_RANGE_SECS: RangeInclusive<u64> = 1..=300;

/// Accepted range for the per-tick batch size.
pub const BATCH_SIZE_RANGE: RangeInclusive<usize> = 16..=4096;

/// Which container codec a deployment uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CodecKind {
    /// Structured tagged text.
    #[default]
    Json,
    /// Tree markup.
    Xml,
}

/// Savegame system settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SavegameConfig {
    /// Passphrase used when `encrypt` is set.
    pub key: Option<String>,
    /// Encrypt savegames.
    pub encrypt: bool,
    /// Gzip savegames.
    pub compress: bool,
    /// PBKDF2 rounds. Must never change for a given key, or older saves
    /// become unreadable.
    pub pbkdf2_iterations: u32,
    /// Savegame directory, relative to the data root handed to the service.
    pub directory: String,
    /// Savegame file extension, including the leading dot.
    pub file_extension: String,
    /// Save budget in seconds.
    pub save_timeout_secs: u64,
    /// Load budget in seconds.
    pub load_timeout_secs: u64,
    /// Entities processed per tick before yielding.
    pub batch_size: usize,
    /// Interval between background task completion checks.
    pub poll_interval_ms: u64,
    /// Indent the encoded container.
    pub pretty_print: bool,
    /// Target the saved scene by name instead of by index.
    pub load_by_name: bool,
    /// Container codec.
    pub codec: CodecKind,
    /// Capture dynamically spawned entities.
    pub save_spawned: bool,
    /// Upper bound on decompressed container size.
    pub max_decompressed_bytes: usize,
}

impl Default for SavegameConfig {
    fn default() -> Self {
        Self {
            key: None,
            encrypt: false,
            compress: true,
            pbkdf2_iterations: 32,
            directory: "Savegames".to_string(),
            file_extension: ".sav".to_string(),
            save_timeout_secs: 20,
            load_timeout_secs: 20,
            batch_size: 256,
            poll_interval_ms: 64,
            pretty_print: false,
            load_by_name: false,
            codec: CodecKind::Json,
            save_spawned: true,
            max_decompressed_bytes: 256 * 1024 * 1024,
        }
    }
}

impl SavegameConfig {
    /// Parses a configuration from RON text and validates it.
    pub fn from_ron_str(text: &str) -> Result<Self> {
        let config: Self = ron::from_str(text)
            .map_err(|e| SavegameError::config(format!("invalid savegame config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a RON configuration file.
    pub fn from_ron_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_ron_str(&text)
    }

    /// Renders the configuration as pretty RON.
    pub fn to_ron_string(&self) -> Result<String> {
        let pretty = ron::ser::PrettyConfig::default().indentor("  ".to_string());
        ron::ser::to_string_pretty(self, pretty).map_err(SavegameError::encode)
    }

    /// Checks every field against its accepted range.
    pub fn validate(&self) -> Result<()> {
        if self.encrypt && self.key.as_deref().map_or(true, str::is_empty) {
            return Err(SavegameError::config(
                "encryption is enabled but no key is configured",
            ));
        }
        if self.pbkdf2_iterations == 0 {
            return Err(SavegameError::config("pbkdf2_iterations must be at least 1"));
        }
        if !BATCH_SIZE_RANGE.contains(&self.batch_size) {
            return Err(SavegameError::config(format!(
                "batch_size {} is outside {BATCH_SIZE_RANGE:?}",
                self.batch_size
            )));
        }
        for (label, secs) in [
            ("save_timeout_secs", self.save_timeout_secs),
            ("load_timeout_secs", self.load_timeout_secs),
        ] {
            if !TIMEOUT_RANGE_SECS.contains(&secs) {
                return Err(SavegameError::config(format!(
                    "{label} {secs} is outside {TIMEOUT_RANGE_SECS:?}"
                )));
            }
        }
        if self.poll_interval_ms == 0 {
            return Err(SavegameError::config("poll_interval_ms must be at least 1"));
        }
        if self.file_extension.len() < 2 || !self.file_extension.starts_with('.') {
            return Err(SavegameError::config(format!(
                "file extension '{}' must start with a dot",
                self.file_extension
            )));
        }
        if self.directory.is_empty() {
            return Err(SavegameError::config("savegame directory name is empty"));
        }
        Ok(())
    }

    /// Save budget.
    pub fn save_timeout(&self) -> Duration {
        Duration::from_secs(self.save_timeout_secs)
    }

    /// Load budget.
    pub fn load_timeout(&self) -> Duration {
        Duration::from_secs(self.load_timeout_secs)
    }

    /// Interval between background completion checks.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = SavegameConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.compress);
        assert!(!config.encrypt);
        assert_eq!(config.pbkdf2_iterations, 32);
        assert_eq!(config.file_extension, ".sav");
        assert_eq!(config.batch_size, 256);
        assert_eq!(config.save_timeout(), Duration::from_secs(20));
        assert_eq!(config.poll_interval(), Duration::from_millis(64));
    }

    #[test]
    fn partial_ron_falls_back_to_defaults() {
        let config =
            SavegameConfig::from_ron_str(r#"(encrypt: true, key: Some("k"), codec: Xml)"#).unwrap();
        assert!(config.encrypt);
        assert_eq!(config.codec, CodecKind::Xml);
        assert_eq!(config.directory, "Savegames");
    }

    #[test]
    fn ron_round_trip() {
        let config = SavegameConfig {
            load_by_name: true,
            batch_size: 64,
            ..Default::default()
        };
        let text = config.to_ron_string().unwrap();
        assert_eq!(SavegameConfig::from_ron_str(&text).unwrap(), config);
    }

    #[test]
    fn encryption_requires_a_key() {
        let config = SavegameConfig {
            encrypt: true,
            key: Some(String::new()),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SavegameError::Configuration(_))
        ));
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let cases = [
            SavegameConfig {
                batch_size: 8,
                ..Default::default()
            },
            SavegameConfig {
                save_timeout_secs: 0,
                ..Default::default()
            },
            SavegameConfig {
                load_timeout_secs: 301,
                ..Default::default()
            },
            SavegameConfig {
                pbkdf2_iterations: 0,
                ..Default::default()
            },
            SavegameConfig {
                file_extension: "sav".into(),
                ..Default::default()
            },
            SavegameConfig {
                poll_interval_ms: 0,
                ..Default::default()
            },
        ];
        for config in cases {
            assert!(config.validate().is_err(), "{config:?} should be rejected");
        }
    }

    #[test]
    fn malformed_ron_is_a_configuration_error() {
        assert!(matches!(
            SavegameConfig::from_ron_str("(batch_size: \"lots\")"),
            Err(SavegameError::Configuration(_))
        ));
    }
}
