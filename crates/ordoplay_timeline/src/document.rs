// SPDX-License-Identifier: MIT OR Apache-2.0
//! Timeline document: the aggregate root owning tracks, clips and anchors.

use crate::anchor::{AnchorId, KgAnchor};
use crate::clip::{Clip, ClipId};
use crate::track::{Track, TrackId, TrackKind};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Current document format version
pub const DOCUMENT_FORMAT_VERSION: u32 = 1;

/// Errors while loading or saving a document
#[derive(Debug, Error)]
pub enum DocumentError {
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
    #[error("Document version {found} is newer than supported version {supported}")]
    UnsupportedVersion {
        /// Version in the file
        found: u32,
        /// Highest supported version
        supported: u32,
    },
}

/// Ripple behavior for edits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RippleMode {
    /// Never shift downstream clips
    #[default]
    None,
    /// Shift downstream clips when the edit requests it
    Auto,
    /// Always shift downstream clips
    Force,
}

/// Snapping configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnapConfig {
    /// Grid interval in milliseconds
    pub grid_ms: f64,
    /// Whether snapping is active
    pub enable: bool,
}

impl Default for SnapConfig {
    fn default() -> Self {
        Self {
            grid_ms: 250.0,
            enable: true,
        }
    }
}

/// Multi-clip selection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    /// Currently selected clips
    pub clips: Vec<ClipId>,
}

impl Selection {
    /// Create a selection with the given clips
    pub fn with_clips(clips: impl Into<Vec<ClipId>>) -> Self {
        let mut selection = Self::default();
        for id in clips.into() {
            selection.add(id);
        }
        selection
    }

    /// Check if a clip is selected
    pub fn contains(&self, id: &ClipId) -> bool {
        self.clips.contains(id)
    }

    /// Add a clip to the selection (idempotent)
    pub fn add(&mut self, id: ClipId) {
        if !self.contains(&id) {
            self.clips.push(id);
        }
    }

    /// Remove a clip from the selection
    pub fn remove(&mut self, id: &ClipId) {
        self.clips.retain(|c| c != id);
    }

    /// Toggle a clip in the selection
    pub fn toggle(&mut self, id: ClipId) {
        if self.contains(&id) {
            self.remove(&id);
        } else {
            self.add(id);
        }
    }

    /// Clear the selection
    pub fn clear(&mut self) {
        self.clips.clear();
    }

    /// Check if the selection is empty
    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Get the number of selected clips
    pub fn len(&self) -> usize {
        self.clips.len()
    }

    /// Iterate over selected clips
    pub fn iter(&self) -> impl Iterator<Item = &ClipId> {
        self.clips.iter()
    }
}

/// Editing and playback state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineState {
    /// Playhead time in milliseconds
    pub playhead_ms: f64,
    /// Nominal frame rate
    pub frame_rate: f32,
    /// Snap configuration
    pub snap: SnapConfig,
    /// Current selection
    pub selection: Selection,
    /// Ripple mode
    pub ripple_mode: RippleMode,
    /// Playback shuttle multiplier (negative plays in reverse)
    pub shuttle: f32,
}

impl Default for TimelineState {
    fn default() -> Self {
        Self {
            playhead_ms: 0.0,
            frame_rate: 30.0,
            snap: SnapConfig::default(),
            selection: Selection::default(),
            ripple_mode: RippleMode::None,
            shuttle: 1.0,
        }
    }
}

impl TimelineState {
    /// Convert time to frame number
    pub fn time_to_frame(&self, time_ms: f64) -> u64 {
        (time_ms.max(0.0) / 1000.0 * f64::from(self.frame_rate)) as u64
    }

    /// Convert frame number to time
    pub fn frame_to_time(&self, frame: u64) -> f64 {
        frame as f64 * 1000.0 / f64::from(self.frame_rate)
    }

    /// Current frame under the playhead
    pub fn current_frame(&self) -> u64 {
        self.time_to_frame(self.playhead_ms)
    }

    /// Move the playhead by `delta_ms` scaled by the shuttle multiplier
    pub fn advance(&mut self, delta_ms: f64) {
        self.playhead_ms = (self.playhead_ms + delta_ms * f64::from(self.shuttle)).max(0.0);
    }

    /// Is the shuttle running backwards
    pub fn is_reverse(&self) -> bool {
        self.shuttle < 0.0
    }
}

/// The timeline document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineDocument {
    /// Format version
    pub format_version: u32,
    /// Tracks in display order
    pub(crate) tracks: IndexMap<TrackId, Track>,
    /// Clip records; sole owner of clip lifetime
    pub(crate) clips: IndexMap<ClipId, Clip>,
    /// Anchors
    pub(crate) anchors: Vec<KgAnchor>,
    /// Editing state
    pub state: TimelineState,
}

impl Default for TimelineDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl TimelineDocument {
    /// Create an empty document
    pub fn new() -> Self {
        Self {
            format_version: DOCUMENT_FORMAT_VERSION,
            tracks: IndexMap::new(),
            clips: IndexMap::new(),
            anchors: Vec::new(),
            state: TimelineState::default(),
        }
    }

    /// Get a track
    pub fn track(&self, track_id: TrackId) -> Option<&Track> {
        self.tracks.get(&track_id)
    }

    /// Get all tracks in display order
    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values()
    }

    /// Get track count
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Display index of a track
    pub fn track_index(&self, track_id: TrackId) -> Option<usize> {
        self.tracks.get_index_of(&track_id)
    }

    /// First track of the given kind
    pub fn first_track_of_kind(&self, kind: TrackKind) -> Option<&Track> {
        self.tracks.values().find(|t| t.kind == kind)
    }

    /// Get a clip
    pub fn clip(&self, clip_id: ClipId) -> Option<&Clip> {
        self.clips.get(&clip_id)
    }

    /// Get all clips (unordered with respect to time)
    pub fn clips(&self) -> impl Iterator<Item = &Clip> {
        self.clips.values()
    }

    /// Get clip count
    pub fn clip_count(&self) -> usize {
        self.clips.len()
    }

    /// Raw clip map
    pub fn clip_map(&self) -> &IndexMap<ClipId, Clip> {
        &self.clips
    }

    /// Track owning a clip
    pub fn track_of(&self, clip_id: ClipId) -> Option<&Track> {
        self.clips
            .get(&clip_id)
            .and_then(|c| self.tracks.get(&c.track_id))
    }

    /// Clips on a track in start order
    pub fn clips_on_track(&self, track_id: TrackId) -> Vec<&Clip> {
        self.tracks
            .get(&track_id)
            .map(|t| t.clip_ids().iter().filter_map(|id| self.clips.get(id)).collect())
            .unwrap_or_default()
    }

    /// Get an anchor
    pub fn anchor(&self, anchor_id: AnchorId) -> Option<&KgAnchor> {
        self.anchors.iter().find(|a| a.id == anchor_id)
    }

    /// Get all anchors
    pub fn anchors(&self) -> &[KgAnchor] {
        &self.anchors
    }

    /// Latest clip end across the document
    pub fn content_duration(&self) -> f64 {
        self.clips.values().map(|c| c.end).fold(0.0, f64::max)
    }

    /// Check every structural invariant: clip intervals respect `min_duration`,
    /// every clip is listed exactly by its owning track, and track lists are
    /// sorted by start.
    pub fn check_invariants(&self, min_duration: f64) -> bool {
        let clips_ok = self.clips.values().all(|c| {
            c.is_well_formed(min_duration)
                && self.tracks.get(&c.track_id).is_some_and(|t| t.contains(c.id))
        });
        let tracks_ok = self.tracks.values().all(|t| {
            t.is_sorted(&self.clips)
                && t.clip_ids()
                    .iter()
                    .all(|id| self.clips.get(id).is_some_and(|c| c.track_id == t.id))
        });
        clips_ok && tracks_ok
    }

    /// Repair a hydrated document: drop dangling IDs, re-sort track lists and
    /// remove clips whose owning track is missing.
    pub fn normalize(&mut self) {
        let tracks = &self.tracks;
        self.clips.retain(|_, c| tracks.contains_key(&c.track_id));
        for track in self.tracks.values_mut() {
            track.retain_resolved(&self.clips);
            track.sort_clips(&self.clips);
        }
        let clips = &self.clips;
        self.state.selection.clips.retain(|id| clips.contains_key(id));
    }

    /// Serialize to pretty RON
    pub fn to_ron(&self) -> Result<String, DocumentError> {
        let config = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);
        Ok(ron::ser::to_string_pretty(self, config)?)
    }

    /// Deserialize from RON and normalize
    pub fn from_ron(content: &str) -> Result<Self, DocumentError> {
        let mut document: TimelineDocument = ron::from_str(content)?;
        if document.format_version > DOCUMENT_FORMAT_VERSION {
            return Err(DocumentError::UnsupportedVersion {
                found: document.format_version,
                supported: DOCUMENT_FORMAT_VERSION,
            });
        }
        document.normalize();
        Ok(document)
    }

    /// Save to a file
    pub fn save(&self, path: &Path) -> Result<(), DocumentError> {
        std::fs::write(path, self.to_ron()?)?;
        tracing::info!("Saved timeline to {:?}", path);
        Ok(())
    }

    /// Load from a file
    pub fn load(path: &Path) -> Result<Self, DocumentError> {
        let content = std::fs::read_to_string(path)?;
        let document = Self::from_ron(&content)?;
        tracing::info!(
            "Loaded timeline from {:?} ({} tracks, {} clips)",
            path,
            document.track_count(),
            document.clip_count()
        );
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_document() -> (TimelineDocument, TrackId, ClipId) {
        let mut document = TimelineDocument::new();
        let track = Track::new("Scene", TrackKind::Scene);
        let track_id = track.id;
        document.tracks.insert(track_id, track);
        let clip = Clip::new(track_id, "media://intro", 0.0, 500.0);
        let clip_id = clip.id;
        document.clips.insert(clip_id, clip);
        if let Some(track) = document.tracks.get_mut(&track_id) {
            track.insert_sorted(clip_id, 0.0, &document.clips);
        }
        document.anchors.push(KgAnchor::marker(1000.0).with_tag("beat"));
        (document, track_id, clip_id)
    }

    #[test]
    fn test_ron_round_trip() {
        let (document, track_id, clip_id) = sample_document();
        let ron = document.to_ron().unwrap();
        let loaded = TimelineDocument::from_ron(&ron).unwrap();
        assert_eq!(loaded, document);
        assert_eq!(loaded.clips_on_track(track_id)[0].id, clip_id);
    }

    #[test]
    fn test_rejects_newer_version() {
        let (mut document, _, _) = sample_document();
        document.format_version = DOCUMENT_FORMAT_VERSION + 1;
        let ron = document.to_ron().unwrap();
        assert!(matches!(
            TimelineDocument::from_ron(&ron),
            Err(DocumentError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn test_normalize_drops_orphans() {
        let (mut document, track_id, clip_id) = sample_document();
        let orphan = Clip::new(TrackId::new(), "media://lost", 0.0, 200.0);
        let orphan_id = orphan.id;
        document.clips.insert(orphan_id, orphan);
        document.state.selection.add(orphan_id);
        if let Some(track) = document.tracks.get_mut(&track_id) {
            track.push(ClipId::new());
        }

        document.normalize();
        assert!(document.clip(orphan_id).is_none());
        assert!(document.state.selection.is_empty());
        assert_eq!(document.track(track_id).unwrap().clip_ids(), &[clip_id]);
        assert!(document.check_invariants(100.0));
    }

    #[test]
    fn test_state_frames_and_shuttle() {
        let mut state = TimelineState::default();
        assert_eq!(state.time_to_frame(1000.0), 30);
        assert_eq!(state.frame_to_time(15), 500.0);

        state.advance(100.0);
        assert_eq!(state.playhead_ms, 100.0);
        state.shuttle = -2.0;
        assert!(state.is_reverse());
        state.advance(100.0);
        assert_eq!(state.playhead_ms, 0.0);
    }

    #[test]
    fn test_selection_helpers() {
        let a = ClipId::new();
        let b = ClipId::new();
        let mut selection = Selection::with_clips(vec![a, a, b]);
        assert_eq!(selection.len(), 2);
        selection.toggle(a);
        assert!(!selection.contains(&a));
        selection.toggle(a);
        assert!(selection.contains(&a));
        selection.clear();
        assert!(selection.is_empty());
    }
}
