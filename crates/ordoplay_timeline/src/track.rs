// SPDX-License-Identifier: MIT OR Apache-2.0
//! Track definitions for the timeline.
//!
//! A track does not own its clips. It holds an ordered list of clip IDs
//! (ascending start time) that index into the document's clip map.

use crate::clip::{Clip, ClipId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackId(pub Uuid);

impl TrackId {
    /// Create a new random track ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TrackId {
    fn default() -> Self {
        Self::new()
    }
}

/// Role of a track in the render stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackKind {
    /// Logical anchors only, never drawn
    KeyGrip,
    /// Drawn on top of the scene
    OverlayFront,
    /// Drawn behind the scene
    OverlayBack,
    /// Scene plane content
    Scene,
}

impl TrackKind {
    /// Get the display name
    pub fn name(&self) -> &'static str {
        match self {
            Self::KeyGrip => "Key Grip",
            Self::OverlayFront => "Front Overlay",
            Self::OverlayBack => "Back Overlay",
            Self::Scene => "Scene",
        }
    }

    /// Whether this is one of the overlay kinds
    pub fn is_overlay(&self) -> bool {
        matches!(self, Self::OverlayFront | Self::OverlayBack)
    }
}

/// A lane of clips
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Unique track ID
    pub id: TrackId,
    /// Track name
    pub name: String,
    /// Track kind
    pub kind: TrackKind,
    /// Whether the track is drawn
    pub visible: bool,
    /// Whether the track accepts new clips
    pub locked: bool,
    /// Whether the track is muted
    pub muted: bool,
    /// Clip IDs ordered by ascending start time
    clips: Vec<ClipId>,
    /// Base depth among tracks of the same kind
    pub z_stack: i32,
}

impl Track {
    /// Create a new track
    pub fn new(name: impl Into<String>, kind: TrackKind) -> Self {
        Self {
            id: TrackId::new(),
            name: name.into(),
            kind,
            visible: true,
            locked: false,
            muted: false,
            clips: Vec::new(),
            z_stack: 0,
        }
    }

    /// Set the base depth
    pub fn with_z_stack(mut self, z_stack: i32) -> Self {
        self.z_stack = z_stack;
        self
    }

    /// Ordered clip IDs
    pub fn clip_ids(&self) -> &[ClipId] {
        &self.clips
    }

    /// Get clip count
    pub fn clip_count(&self) -> usize {
        self.clips.len()
    }

    /// Whether the track lists `clip_id`
    pub fn contains(&self, clip_id: ClipId) -> bool {
        self.clips.contains(&clip_id)
    }

    /// Index of `clip_id` in the ordered list
    pub fn position(&self, clip_id: ClipId) -> Option<usize> {
        self.clips.iter().position(|id| *id == clip_id)
    }

    /// Insert a clip ID at the position that keeps the list sorted by start.
    ///
    /// Clips sharing a start time keep insertion order. Returns the index.
    pub fn insert_sorted(&mut self, clip_id: ClipId, start: f64, clips: &IndexMap<ClipId, Clip>) -> usize {
        let idx = self
            .clips
            .partition_point(|id| clips.get(id).is_some_and(|c| c.start <= start));
        self.clips.insert(idx, clip_id);
        idx
    }

    /// Insert a clip ID directly after `after`, or append if `after` is absent
    pub fn insert_after(&mut self, after: ClipId, clip_id: ClipId) {
        match self.position(after) {
            Some(idx) => self.clips.insert(idx + 1, clip_id),
            None => self.clips.push(clip_id),
        }
    }

    /// Append a clip ID without ordering (call [`Track::sort_clips`] afterwards)
    pub fn push(&mut self, clip_id: ClipId) {
        self.clips.push(clip_id);
    }

    /// Remove a clip ID
    pub fn remove_clip(&mut self, clip_id: ClipId) -> bool {
        let before = self.clips.len();
        self.clips.retain(|id| *id != clip_id);
        self.clips.len() != before
    }

    /// Drop IDs that do not resolve in `clips`
    pub fn retain_resolved(&mut self, clips: &IndexMap<ClipId, Clip>) {
        self.clips.retain(|id| clips.contains_key(id));
    }

    /// Re-establish start ordering (stable for equal starts)
    pub fn sort_clips(&mut self, clips: &IndexMap<ClipId, Clip>) {
        self.clips.sort_by(|a, b| {
            let sa = clips.get(a).map_or(f64::INFINITY, |c| c.start);
            let sb = clips.get(b).map_or(f64::INFINITY, |c| c.start);
            sa.total_cmp(&sb)
        });
    }

    /// Whether the list is sorted by start
    pub fn is_sorted(&self, clips: &IndexMap<ClipId, Clip>) -> bool {
        self.clips.windows(2).all(|pair| match (clips.get(&pair[0]), clips.get(&pair[1])) {
            (Some(a), Some(b)) => a.start <= b.start,
            _ => false,
        })
    }

    /// Find the single clip active at `time`.
    ///
    /// Binary searches for the last clip starting at or before `time`, then
    /// walks back in case an earlier, longer clip still covers it.
    pub fn active_clip<'a>(&self, time: f64, clips: &'a IndexMap<ClipId, Clip>) -> Option<&'a Clip> {
        let idx = self
            .clips
            .partition_point(|id| clips.get(id).is_some_and(|c| c.start <= time));
        self.clips[..idx]
            .iter()
            .rev()
            .filter_map(|id| clips.get(id))
            .find(|c| c.contains(time))
    }

    /// Get clips overlapping `[start, end)` in order
    pub fn clips_in_range<'a>(
        &self,
        start: f64,
        end: f64,
        clips: &'a IndexMap<ClipId, Clip>,
    ) -> Vec<&'a Clip> {
        self.clips
            .iter()
            .filter_map(|id| clips.get(id))
            .filter(|c| c.overlaps(start, end))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lane(intervals: &[(f64, f64)]) -> (Track, IndexMap<ClipId, Clip>, Vec<ClipId>) {
        let mut track = Track::new("V1", TrackKind::Scene);
        let mut clips = IndexMap::new();
        let mut ids = Vec::new();
        for &(start, end) in intervals {
            let clip = Clip::new(track.id, "media", start, end - start);
            ids.push(clip.id);
            clips.insert(clip.id, clip.clone());
            track.insert_sorted(clip.id, start, &clips);
        }
        (track, clips, ids)
    }

    #[test]
    fn test_insert_sorted() {
        let (track, clips, ids) = lane(&[(500.0, 900.0), (0.0, 400.0), (1000.0, 1200.0), (450.0, 480.0)]);
        assert!(track.is_sorted(&clips));
        assert_eq!(track.clip_ids(), &[ids[1], ids[3], ids[0], ids[2]]);
    }

    #[test]
    fn test_active_clip() {
        let (track, clips, ids) = lane(&[(0.0, 500.0), (600.0, 900.0)]);
        assert_eq!(track.active_clip(0.0, &clips).map(|c| c.id), Some(ids[0]));
        assert_eq!(track.active_clip(499.0, &clips).map(|c| c.id), Some(ids[0]));
        assert!(track.active_clip(500.0, &clips).is_none());
        assert!(track.active_clip(550.0, &clips).is_none());
        assert_eq!(track.active_clip(600.0, &clips).map(|c| c.id), Some(ids[1]));
        assert!(track.active_clip(900.0, &clips).is_none());
    }

    #[test]
    fn test_active_clip_with_long_earlier_clip() {
        let (track, clips, ids) = lane(&[(0.0, 2000.0), (100.0, 200.0)]);
        assert_eq!(track.active_clip(1500.0, &clips).map(|c| c.id), Some(ids[0]));
    }

    #[test]
    fn test_remove_and_insert_after() {
        let (mut track, _clips, ids) = lane(&[(0.0, 100.0), (200.0, 300.0)]);
        let extra = ClipId::new();
        track.insert_after(ids[0], extra);
        assert_eq!(track.clip_ids(), &[ids[0], extra, ids[1]]);
        assert!(track.remove_clip(extra));
        assert!(!track.remove_clip(extra));
        assert_eq!(track.clip_count(), 2);
    }

    #[test]
    fn test_clips_in_range() {
        let (track, clips, ids) = lane(&[(0.0, 500.0), (600.0, 900.0), (1000.0, 1200.0)]);
        let hits: Vec<ClipId> = track.clips_in_range(400.0, 1000.0, &clips).iter().map(|c| c.id).collect();
        assert_eq!(hits, vec![ids[0], ids[1]]);
        assert!(track.clips_in_range(500.0, 600.0, &clips).is_empty());
        assert_eq!(track.clips_in_range(0.0, 5000.0, &clips).len(), 3);
    }
}
