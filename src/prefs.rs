//! User preference persistence.
//!
//! Preferences are stored as versioned JSON at a caller-provided path.
//! Loading falls back to defaults when the file is missing or malformed, so
//! a corrupt preference file never blocks startup.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fading::FadingProfile;

/// Current preference file format version.
/// Increment this when making breaking changes to the format.
pub const PREFS_VERSION: u32 = 1;

const DEFAULT_MAX_RECENT_FILES: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    /// Version of the preference file format
    pub version: u32,

    /// Fading applied to new drawings that follow the default profile
    #[serde(default)]
    pub default_fading: FadingProfile,

    /// Restore every tool style to its preset when a video is opened
    #[serde(default)]
    pub reset_tool_styles_on_open: bool,

    /// Recently opened KVA files, most recent first
    #[serde(default)]
    pub recent_files: Vec<PathBuf>,

    #[serde(default = "default_max_recent_files")]
    pub max_recent_files: usize,
}

fn default_max_recent_files() -> usize {
    DEFAULT_MAX_RECENT_FILES
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            version: PREFS_VERSION,
            default_fading: FadingProfile::default(),
            reset_tool_styles_on_open: false,
            recent_files: Vec::new(),
            max_recent_files: DEFAULT_MAX_RECENT_FILES,
        }
    }
}

impl Preferences {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, PrefsError> {
        let prefs: Self = serde_json::from_str(json)?;
        if prefs.version > PREFS_VERSION {
            return Err(PrefsError::VersionTooNew {
                file_version: prefs.version,
                supported_version: PREFS_VERSION,
            });
        }
        Ok(prefs)
    }

    /// Loads from the given path. A missing or unreadable file yields the
    /// defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(json) => match Self::from_json(&json) {
                Ok(prefs) => {
                    log::info!("Loaded preferences from {:?}", path);
                    prefs
                }
                Err(e) => {
                    log::warn!("Failed to parse preference file {:?}: {}", path, e);
                    Self::default()
                }
            },
            Err(e) => {
                log::debug!("No preference file at {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), PrefsError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        log::info!("Saved preferences to {:?}", path);
        Ok(())
    }

    /// Moves (or inserts) a path at the front of the recent list, trimming
    /// to the configured maximum.
    pub fn add_recent_file(&mut self, path: &Path) {
        self.recent_files.retain(|p| p != path);
        self.recent_files.insert(0, path.to_path_buf());
        self.recent_files.truncate(self.max_recent_files);
    }
}

/// Errors that can occur when loading or saving preferences.
#[derive(Debug, Error)]
pub enum PrefsError {
    #[error("Failed to parse preferences: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Preference file version {file_version} is newer than supported version {supported_version}")]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_round_trip() {
        let mut prefs = Preferences::default();
        prefs.default_fading.fading_frames = 35;
        prefs.add_recent_file(Path::new("/videos/serve.kva"));

        let json = prefs.to_json().unwrap();
        let reread = Preferences::from_json(&json).unwrap();
        assert_eq!(reread, prefs);
    }

    #[test]
    fn test_newer_version_is_rejected() {
        let json = format!("{{\"version\": {}}}", PREFS_VERSION + 1);
        assert!(matches!(
            Preferences::from_json(&json),
            Err(PrefsError::VersionTooNew { .. })
        ));
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let prefs = Preferences::from_json("{\"version\": 1}").unwrap();
        assert_eq!(prefs.default_fading, FadingProfile::default());
        assert_eq!(prefs.max_recent_files, DEFAULT_MAX_RECENT_FILES);
    }

    #[test]
    fn test_recent_files_dedupe_and_trim() {
        let mut prefs = Preferences {
            max_recent_files: 2,
            ..Default::default()
        };
        prefs.add_recent_file(Path::new("/a.kva"));
        prefs.add_recent_file(Path::new("/b.kva"));
        prefs.add_recent_file(Path::new("/a.kva"));
        assert_eq!(
            prefs.recent_files,
            vec![PathBuf::from("/a.kva"), PathBuf::from("/b.kva")]
        );

        prefs.add_recent_file(Path::new("/c.kva"));
        assert_eq!(prefs.recent_files.len(), 2);
        assert_eq!(prefs.recent_files[0], PathBuf::from("/c.kva"));
    }
}
