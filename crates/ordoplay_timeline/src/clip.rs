// SPDX-License-Identifier: MIT OR Apache-2.0
//! Clip definitions for the timeline.

use crate::params::ClipParams;
use crate::track::TrackId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Minimum duration a clip may be trimmed to, in milliseconds
pub const MIN_CLIP_DURATION_MS: f64 = 100.0;

/// Unique identifier for a clip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClipId(pub Uuid);

impl ClipId {
    /// Create a new random clip ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClipId {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared identifier stamped on grouped clips
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupId(pub Uuid);

impl GroupId {
    /// Create a new random group ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for GroupId {
    fn default() -> Self {
        Self::new()
    }
}

/// Type of clip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ClipType {
    /// Regular content clip
    #[default]
    Clip,
    /// Intentional empty space
    Gap,
    /// Container for grouped content
    Group,
}

/// Per-axis lock flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClipLocks {
    /// Position and duration are frozen
    pub time: bool,
    /// Payload and parameters are frozen
    pub content: bool,
}

/// A time-bounded unit of content on a track.
///
/// The interval is half-open: `[start, end)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    /// Unique clip ID
    pub id: ClipId,
    /// Owning track
    pub track_id: TrackId,
    /// Clip type
    pub clip_type: ClipType,
    /// Start time in milliseconds (inclusive)
    pub start: f64,
    /// End time in milliseconds (exclusive)
    pub end: f64,
    /// Opaque payload reference resolved by the renderer
    pub payload_ref: String,
    /// Parameter bag
    pub params: ClipParams,
    /// Free-form labels
    pub labels: Vec<String>,
    /// Lock flags
    pub locks: ClipLocks,
    /// Muted clips are skipped during render-order evaluation
    pub muted: bool,
    /// Soloed clips hide every non-soloed clip
    pub solo: bool,
    /// Group this clip belongs to
    pub group_id: Option<GroupId>,
}

impl Clip {
    /// Create a new clip spanning `[start, start + duration)`
    pub fn new(track_id: TrackId, payload_ref: impl Into<String>, start: f64, duration: f64) -> Self {
        Self {
            id: ClipId::new(),
            track_id,
            clip_type: ClipType::Clip,
            start,
            end: start + duration,
            payload_ref: payload_ref.into(),
            params: ClipParams::default(),
            labels: Vec::new(),
            locks: ClipLocks::default(),
            muted: false,
            solo: false,
            group_id: None,
        }
    }

    /// Set the parameter bag
    pub fn with_params(mut self, params: ClipParams) -> Self {
        self.params = params;
        self
    }

    /// Duration in milliseconds
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Whether `time` falls inside `[start, end)`
    pub fn contains(&self, time: f64) -> bool {
        self.start <= time && time < self.end
    }

    /// Whether `time` falls strictly inside `(start, end)`
    pub fn strictly_contains(&self, time: f64) -> bool {
        self.start < time && time < self.end
    }

    /// Whether the clip overlaps `[start, end)`
    pub fn overlaps(&self, start: f64, end: f64) -> bool {
        self.start < end && start < self.end
    }

    /// Shift the whole interval (and its depth animation) by `delta` ms
    pub fn shift(&mut self, delta: f64) {
        self.start += delta;
        self.end += delta;
        self.params.offset_time(delta);
    }

    /// Check the interval invariant against a duration floor
    pub fn is_well_formed(&self, min_duration: f64) -> bool {
        self.start < self.end && self.duration() >= min_duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::DepthKey;

    #[test]
    fn test_clip_interval() {
        let clip = Clip::new(TrackId::new(), "media://a", 200.0, 300.0);
        assert_eq!(clip.end, 500.0);
        assert_eq!(clip.duration(), 300.0);
        assert!(clip.contains(200.0));
        assert!(!clip.contains(500.0));
        assert!(!clip.strictly_contains(200.0));
        assert!(clip.overlaps(450.0, 600.0));
        assert!(!clip.overlaps(500.0, 600.0));
        assert!(clip.is_well_formed(MIN_CLIP_DURATION_MS));
    }

    #[test]
    fn test_shift_moves_depth_keys() {
        let mut clip = Clip::new(TrackId::new(), "media://a", 0.0, 1000.0)
            .with_params(ClipParams::new().with_z_anim(vec![DepthKey::new(0.0, 1.0)]));
        clip.shift(250.0);
        assert_eq!((clip.start, clip.end), (250.0, 1250.0));
        assert_eq!(clip.params.z_anim[0].t, 250.0);
    }
}
