// SPDX-License-Identifier: MIT OR Apache-2.0
//! Engine settings.
//!
//! Tunables for the edit engine, stored as RON. The defaults reproduce the
//! stock engine constants.

use crate::clip::MIN_CLIP_DURATION_MS;
use crate::document::SnapConfig;
use crate::history::MAX_HISTORY;
use crate::snapping::ANCHOR_SNAP_THRESHOLD_MS;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Current settings format version
pub const SETTINGS_FORMAT_VERSION: u32 = 1;

/// Settings file name
pub const SETTINGS_FILE_NAME: &str = "timeline.settings.ron";

/// Errors while loading or saving settings
#[derive(Debug, Error)]
pub enum SettingsError {
    /// File read/write failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// RON serialization failed
    #[error("Serialization error: {0}")]
    Serialize(#[from] ron::Error),

    /// RON parsing failed
    #[error("Deserialization error: {0}")]
    Deserialize(#[from] ron::error::SpannedError),

    /// File was written by a newer engine
    #[error("Settings version {found} is newer than supported version {supported}")]
    UnsupportedVersion {
        /// Version in the file
        found: u32,
        /// Highest supported version
        supported: u32,
    },

    /// A field holds an unusable value
    #[error("Invalid setting '{field}': {reason}")]
    Invalid {
        /// Offending field
        field: &'static str,
        /// What is wrong with it
        reason: &'static str,
    },
}

/// Engine tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Format version
    pub version: u32,
    /// Undo steps kept
    pub history_capacity: usize,
    /// Duration floor for trims and splits
    pub min_clip_duration_ms: f64,
    /// Anchor snap proximity
    pub anchor_snap_threshold_ms: f64,
    /// Grid interval for new documents
    pub default_grid_ms: f64,
    /// Snap enabled for new documents
    pub default_snap_enabled: bool,
    /// Frame rate for new documents
    pub default_frame_rate: f32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        let snap = SnapConfig::default();
        Self {
            version: SETTINGS_FORMAT_VERSION,
            history_capacity: MAX_HISTORY,
            min_clip_duration_ms: MIN_CLIP_DURATION_MS,
            anchor_snap_threshold_ms: ANCHOR_SNAP_THRESHOLD_MS,
            default_grid_ms: snap.grid_ms,
            default_snap_enabled: snap.enable,
            default_frame_rate: 30.0,
        }
    }
}

impl EngineSettings {
    /// Snap configuration for new documents
    pub fn snap_config(&self) -> SnapConfig {
        SnapConfig {
            grid_ms: self.default_grid_ms,
            enable: self.default_snap_enabled,
        }
    }

    /// Check every field is usable by the engine
    pub fn validate(&self) -> Result<(), SettingsError> {
        let invalid = |field, reason| Err(SettingsError::Invalid { field, reason });

        if !(self.min_clip_duration_ms.is_finite() && self.min_clip_duration_ms > 0.0) {
            return invalid("min_clip_duration_ms", "must be a positive number");
        }
        if !(self.anchor_snap_threshold_ms.is_finite() && self.anchor_snap_threshold_ms >= 0.0) {
            return invalid("anchor_snap_threshold_ms", "must be zero or a positive number");
        }
        if !(self.default_grid_ms.is_finite() && self.default_grid_ms >= 0.0) {
            return invalid("default_grid_ms", "must be zero or a positive number");
        }
        if !(self.default_frame_rate.is_finite() && self.default_frame_rate > 0.0) {
            return invalid("default_frame_rate", "must be a positive number");
        }
        if self.history_capacity == 0 {
            return invalid("history_capacity", "must keep at least one step");
        }
        Ok(())
    }

    /// Parse settings from RON
    pub fn from_ron(content: &str) -> Result<Self, SettingsError> {
        let settings: EngineSettings = ron::from_str(content)?;

        // Version check
        if settings.version > SETTINGS_FORMAT_VERSION {
            return Err(SettingsError::UnsupportedVersion {
                found: settings.version,
                supported: SETTINGS_FORMAT_VERSION,
            });
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a file
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        let settings = Self::from_ron(&content)?;
        tracing::info!("Loaded engine settings from {:?}", path);
        Ok(settings)
    }

    /// Save settings to a file
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let config = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);
        let content = ron::ser::to_string_pretty(self, config)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = EngineSettings::default();
        assert_eq!(settings.version, SETTINGS_FORMAT_VERSION);
        assert_eq!(settings.history_capacity, 50);
        assert_eq!(settings.min_clip_duration_ms, 100.0);
        assert_eq!(settings.anchor_snap_threshold_ms, 100.0);
        assert_eq!(settings.snap_config(), SnapConfig::default());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let settings = EngineSettings::from_ron("(history_capacity: 10)").unwrap();
        assert_eq!(settings.history_capacity, 10);
        assert_eq!(settings.min_clip_duration_ms, 100.0);
    }

    #[test]
    fn test_serialization() {
        let settings = EngineSettings {
            default_grid_ms: 40.0,
            ..Default::default()
        };
        let ron_str = ron::ser::to_string_pretty(&settings, ron::ser::PrettyConfig::default()).unwrap();
        let loaded = EngineSettings::from_ron(&ron_str).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_rejects_newer_version() {
        let result = EngineSettings::from_ron("(version: 99)");
        assert!(matches!(result, Err(SettingsError::UnsupportedVersion { found: 99, .. })));
    }

    #[test]
    fn test_rejects_unusable_floor() {
        for content in ["(min_clip_duration_ms: 0.0)", "(min_clip_duration_ms: -5.0)"] {
            let result = EngineSettings::from_ron(content);
            assert!(matches!(
                result,
                Err(SettingsError::Invalid { field: "min_clip_duration_ms", .. })
            ));
        }
        assert!(EngineSettings::from_ron("(default_frame_rate: 0.0)").is_err());
        assert!(EngineSettings::from_ron("(history_capacity: 0)").is_err());
        let nan_floor = EngineSettings {
            min_clip_duration_ms: f64::NAN,
            ..Default::default()
        };
        assert!(nan_floor.validate().is_err());
        assert!(EngineSettings::default().validate().is_ok());
    }
}
