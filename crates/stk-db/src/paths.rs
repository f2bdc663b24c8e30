//! Locating the OS data stores on disk.
//!
//! The store locations are fixed, well-known paths under the user's home
//! directory; alternate roots are never probed. Tests and configuration can
//! still point a [`StorePaths`] anywhere via [`StorePaths::new`].

use std::path::{Path, PathBuf};

/// Event store location relative to the home directory.
const EVENT_STORE_RELATIVE: &str = "Library/Application Support/Knowledge/knowledgeC.db";

/// Settings store directory relative to the home directory.
const SETTINGS_DIR_RELATIVE: &str = "Library/Application Support/com.apple.screentime";

/// File extension of the settings stores.
const SETTINGS_STORE_EXTENSION: &str = "sqlite";

/// Canonical filesystem locations of the data stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    event_store: PathBuf,
    settings_dir: PathBuf,
}

impl StorePaths {
    /// Resolves the well-known store locations under the home directory.
    ///
    /// Returns `None` only when no home directory can be determined.
    #[must_use]
    pub fn locate() -> Option<Self> {
        let home = dirs::home_dir()?;
        Some(Self {
            event_store: home.join(EVENT_STORE_RELATIVE),
            settings_dir: home.join(SETTINGS_DIR_RELATIVE),
        })
    }

    /// Builds paths pointing at explicit locations (tests, config overrides).
    #[must_use]
    pub fn new(event_store: PathBuf, settings_dir: PathBuf) -> Self {
        Self {
            event_store,
            settings_dir,
        }
    }

    /// Path to the primary event store.
    #[must_use]
    pub fn event_store(&self) -> &Path {
        &self.event_store
    }

    /// Directory containing the settings store(s).
    #[must_use]
    pub fn settings_dir(&self) -> &Path {
        &self.settings_dir
    }

    /// All settings store files in the settings directory, including synced
    /// per-device copies.
    ///
    /// Filesystem listing order is not stable across platforms, so the
    /// result is sorted by file name; device-registry merging depends on
    /// this order being deterministic. An absent directory yields an empty
    /// list, not an error.
    #[must_use]
    pub fn settings_store_files(&self) -> Vec<PathBuf> {
        let Ok(entries) = std::fs::read_dir(&self.settings_dir) else {
            return Vec::new();
        };
        let mut files: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .is_some_and(|ext| ext == SETTINGS_STORE_EXTENSION)
            })
            .collect();
        files.sort();
        files
    }
}
