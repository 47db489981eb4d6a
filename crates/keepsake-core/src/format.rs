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

//! Savegame file layout and naming.
//!
//! ```text
//! plain:      [container bytes]
//! compressed: [gzip(container bytes)]
//! encrypted:  [64-byte salt][aes-cbc(optionally compressed bytes)]
//! ```
//!
//! Files are named `{name}_{yyyyMMddHHmmssff}{extension}` on save.

use crate::error::{Result, SavegameError};
use chrono::{DateTime, Local, TimeZone};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Length of the random salt prepended to encrypted savegames.
pub const SALT_LEN: usize = 64;

/// Number of digits in a savegame timestamp.
pub const TIMESTAMP_LEN: usize = 16;

/// Formats `time` as `yyyyMMddHHmmssff` (centiseconds, no separators).
pub fn timestamp<Tz: TimeZone>(time: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let centis = time.timestamp_subsec_millis().min(999) / 10;
    format!("{}{:02}", time.format("%Y%m%d%H%M%S"), centis)
}

/// Checks that `name` is usable as a savegame file stem.
///
/// Rejects empty names and anything that could leave the savegame directory.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(SavegameError::config("savegame name is empty"));
    }
    if name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(SavegameError::config(format!(
            "savegame name '{name}' must not contain path separators"
        )));
    }
    Ok(())
}

/// A directory of savegame files sharing one extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavegameDirectory {
    root: PathBuf,
    extension: String,
}

impl SavegameDirectory {
    /// Creates a handle; nothing is touched on disk.
    pub fn new(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            extension: extension.into(),
        }
    }

    /// The directory path.
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// The savegame extension, including the dot.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Creates the directory if it does not exist yet.
    pub fn ensure(&self) -> Result<()> {
        if !self.root.is_dir() {
            log::info!("Creating savegame directory '{}'.", self.root.display());
            fs::create_dir_all(&self.root)?;
        }
        Ok(())
    }

    /// Path of the file holding savegame `stem`.
    pub fn file_path(&self, stem: &str) -> PathBuf {
        self.root.join(format!("{stem}{}", self.extension))
    }

    /// Path a save of `name` taken at `time` is written to.
    pub fn timestamped_path(&self, name: &str, time: &DateTime<Local>) -> PathBuf {
        self.file_path(&format!("{name}_{}", timestamp(time)))
    }

    /// All savegame stems, newest first.
    ///
    /// A missing directory lists as empty.
    pub fn list(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut found: Vec<(SystemTime, String)> = Vec::new();
        for entry in entries {
            let entry = entry?;
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            let Some(stem) = file_name.strip_suffix(self.extension.as_str()) else {
                continue;
            };
            let metadata = entry.metadata()?;
            if !metadata.is_file() || stem.is_empty() {
                continue;
            }
            let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            found.push((modified, stem.to_string()));
        }

        // Newest first; names break ties so timestamps order same-second saves.
        found.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));
        Ok(found.into_iter().map(|(_, stem)| stem).collect())
    }

    /// Stem of the most recently written savegame.
    pub fn newest(&self) -> Result<Option<String>> {
        Ok(self.list()?.into_iter().next())
    }

    /// Resolves a load request to an existing file.
    ///
    /// `name` is tried as an exact stem first, then as the logical name of
    /// timestamped saves (`{name}_{timestamp}`), newest wins.
    pub fn resolve(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;

        let exact = self.file_path(name);
        if exact.is_file() {
            return Ok(exact);
        }

        let prefix = format!("{name}_");
        self.list()?
            .into_iter()
            .find(|stem| {
                stem.strip_prefix(&prefix).is_some_and(|rest| {
                    rest.len() == TIMESTAMP_LEN && rest.bytes().all(|b| b.is_ascii_digit())
                })
            })
            .map(|stem| self.file_path(&stem))
            .ok_or_else(|| SavegameError::NotFound {
                name: name.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::time::Duration;

    fn touch(dir: &SavegameDirectory, stem: &str, age_secs: u64) {
        let path = dir.file_path(stem);
        fs::write(&path, stem).unwrap();
        let file = fs::File::options().write(true).open(&path).unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(age_secs))
            .unwrap();
    }

    #[test]
    fn timestamp_has_centiseconds_and_no_separators() {
        let time = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 2).unwrap()
            + chrono::Duration::milliseconds(457);
        assert_eq!(timestamp(&time), "2024030907050245");
    }

    #[test]
    fn timestamped_path_shape() {
        let dir = SavegameDirectory::new("saves", ".sav");
        let path = dir.timestamped_path("slot1", &Local::now());
        let file_name = path.file_name().unwrap().to_str().unwrap();
        let stamp = file_name
            .strip_prefix("slot1_")
            .and_then(|rest| rest.strip_suffix(".sav"))
            .unwrap();
        assert_eq!(stamp.len(), TIMESTAMP_LEN);
        assert!(stamp.bytes().all(|b| b.is_ascii_digit()));
    }

    #[test]
    fn list_is_newest_first_and_filters_extension() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = SavegameDirectory::new(tmp.path(), ".sav");
        touch(&dir, "old", 300);
        touch(&dir, "new", 10);
        touch(&dir, "middle", 100);
        fs::write(tmp.path().join("notes.txt"), "ignored").unwrap();

        assert_eq!(dir.list().unwrap(), vec!["new", "middle", "old"]);
        assert_eq!(dir.newest().unwrap().as_deref(), Some("new"));
    }

    #[test]
    fn missing_directory_lists_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = SavegameDirectory::new(tmp.path().join("nope"), ".sav");
        assert!(dir.list().unwrap().is_empty());
        assert_eq!(dir.newest().unwrap(), None);
    }

    #[test]
    fn resolve_prefers_exact_then_newest_slot() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = SavegameDirectory::new(tmp.path(), ".sav");
        touch(&dir, "slot1_2024010100000000", 200);
        touch(&dir, "slot1_2024010200000000", 50);
        touch(&dir, "slot10_2024010300000000", 5);

        assert_eq!(
            dir.resolve("slot1").unwrap(),
            dir.file_path("slot1_2024010200000000")
        );
        assert_eq!(
            dir.resolve("slot1_2024010100000000").unwrap(),
            dir.file_path("slot1_2024010100000000")
        );
        assert!(matches!(
            dir.resolve("slot2"),
            Err(SavegameError::NotFound { .. })
        ));
        assert!(matches!(
            dir.resolve(""),
            Err(SavegameError::Configuration(_))
        ));
        assert!(matches!(
            dir.resolve("../escape"),
            Err(SavegameError::Configuration(_))
        ));
    }

    #[test]
    fn ensure_creates_nested_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = SavegameDirectory::new(tmp.path().join("a").join("Savegames"), ".sav");
        dir.ensure().unwrap();
        assert!(dir.path().is_dir());
    }
}
