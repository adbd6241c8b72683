// SPDX-License-Identifier: MIT OR Apache-2.0
//! Render-order evaluation: `evaluate_render_order()` takes a document and a
//! time and produces the draw buckets for the compositor.
//!
//! The evaluation process:
//! 1. For each visible, unmuted, non-key-grip track, find the active clip.
//! 2. Drop muted clips; if any active clip is soloed, keep only soloed clips.
//! 3. Bucket by track kind and sort each bucket by track depth, then the
//!    clip's sampled depth animation.
//!
//! Renderers draw back overlays, then the scene, then front overlays.

use crate::clip::Clip;
use crate::document::TimelineDocument;
use crate::track::{TrackId, TrackKind};
use serde::Serialize;

/// One clip to draw, with its resolved sort keys
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderEntry {
    /// Copy of the clip record
    pub clip: Clip,
    /// Owning track
    pub track_id: TrackId,
    /// Owning track's base depth
    pub z_stack: i32,
    /// Depth animation sampled at the query time
    pub depth: f32,
}

/// Draw buckets for a single time
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RenderOrder {
    /// Drawn first
    pub back_overlays: Vec<RenderEntry>,
    /// Drawn second
    pub scene_clips: Vec<RenderEntry>,
    /// Drawn last
    pub front_overlays: Vec<RenderEntry>,
}

impl RenderOrder {
    /// Total entries across buckets
    pub fn len(&self) -> usize {
        self.back_overlays.len() + self.scene_clips.len() + self.front_overlays.len()
    }

    /// Nothing to draw
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All entries in draw order
    pub fn iter(&self) -> impl Iterator<Item = &RenderEntry> {
        self.back_overlays
            .iter()
            .chain(self.scene_clips.iter())
            .chain(self.front_overlays.iter())
    }
}

struct Candidate {
    kind: TrackKind,
    track_index: usize,
    entry: RenderEntry,
}

/// Evaluate which clips are active at `time_ms` and in what order they draw.
///
/// Never returns more than one clip per track.
#[tracing::instrument(skip(document))]
pub fn evaluate_render_order(document: &TimelineDocument, time_ms: f64) -> RenderOrder {
    let mut candidates = Vec::new();

    for (track_index, track) in document.tracks.values().enumerate() {
        // Key-grip tracks hold logical references only
        if !track.visible || track.muted || track.kind == TrackKind::KeyGrip {
            continue;
        }

        let Some(clip) = track.active_clip(time_ms, &document.clips) else {
            continue;
        };
        if clip.muted {
            continue;
        }

        candidates.push(Candidate {
            kind: track.kind,
            track_index,
            entry: RenderEntry {
                clip: clip.clone(),
                track_id: track.id,
                z_stack: track.z_stack,
                depth: clip.params.depth_at(time_ms),
            },
        });
    }

    if candidates.iter().any(|c| c.entry.clip.solo) {
        candidates.retain(|c| c.entry.clip.solo);
    }

    candidates.sort_by(|a, b| {
        a.entry
            .z_stack
            .cmp(&b.entry.z_stack)
            .then_with(|| a.entry.depth.total_cmp(&b.entry.depth))
            .then_with(|| a.track_index.cmp(&b.track_index))
    });

    let mut order = RenderOrder::default();
    for candidate in candidates {
        match candidate.kind {
            TrackKind::OverlayBack => order.back_overlays.push(candidate.entry),
            TrackKind::Scene => order.scene_clips.push(candidate.entry),
            TrackKind::OverlayFront => order.front_overlays.push(candidate.entry),
            TrackKind::KeyGrip => {}
        }
    }

    tracing::trace!("{} clips active", order.len());
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edit::TimelineEditor;
    use crate::params::{ClipParams, DepthKey};

    fn editor() -> TimelineEditor {
        let mut editor = TimelineEditor::new();
        editor.toggle_snap();
        editor
    }

    fn payloads(entries: &[RenderEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.clip.payload_ref.as_str()).collect()
    }

    #[test]
    fn test_buckets_by_track_kind() {
        let mut editor = editor();
        let front = editor.add_track(TrackKind::OverlayFront, "Titles").unwrap();
        let scene = editor.add_track(TrackKind::Scene, "Scene").unwrap();
        let back = editor.add_track(TrackKind::OverlayBack, "Sky").unwrap();
        let grip = editor.add_track(TrackKind::KeyGrip, "Grips").unwrap();
        editor.insert_clip(front, "title", 0.0, 1000.0, ClipParams::new()).unwrap();
        editor.insert_clip(scene, "actor", 0.0, 1000.0, ClipParams::new()).unwrap();
        editor.insert_clip(back, "sky", 0.0, 1000.0, ClipParams::new()).unwrap();
        editor.insert_clip(grip, "grip", 0.0, 1000.0, ClipParams::new()).unwrap();

        let order = editor.render_order(500.0);
        assert_eq!(payloads(&order.back_overlays), vec!["sky"]);
        assert_eq!(payloads(&order.scene_clips), vec!["actor"]);
        assert_eq!(payloads(&order.front_overlays), vec!["title"]);
        assert_eq!(order.len(), 3);
    }

    #[test]
    fn test_skips_hidden_and_muted_tracks() {
        let mut editor = editor();
        let hidden = editor.add_track(TrackKind::Scene, "Hidden").unwrap();
        let muted = editor.add_track(TrackKind::Scene, "Muted").unwrap();
        let shown = editor.add_track(TrackKind::Scene, "Shown").unwrap();
        editor.insert_clip(hidden, "a", 0.0, 1000.0, ClipParams::new()).unwrap();
        editor.insert_clip(muted, "b", 0.0, 1000.0, ClipParams::new()).unwrap();
        editor.insert_clip(shown, "c", 0.0, 1000.0, ClipParams::new()).unwrap();
        editor.set_track_visible(hidden, false).unwrap();
        editor.set_track_muted(muted, true).unwrap();

        let order = editor.render_order(100.0);
        assert_eq!(payloads(&order.scene_clips), vec!["c"]);
    }

    #[test]
    fn test_one_clip_per_track_half_open() {
        let mut editor = editor();
        let track = editor.add_track(TrackKind::Scene, "V1").unwrap();
        editor.insert_clip(track, "a", 0.0, 500.0, ClipParams::new()).unwrap();
        editor.insert_clip(track, "b", 500.0, 500.0, ClipParams::new()).unwrap();

        let order = editor.render_order(500.0);
        assert_eq!(payloads(&order.scene_clips), vec!["b"]);
        assert!(editor.render_order(1000.0).is_empty());
    }

    #[test]
    fn test_sorts_by_z_stack_then_depth() {
        let mut editor = editor();
        let upper = editor.add_track(TrackKind::Scene, "Upper").unwrap();
        let lower = editor.add_track(TrackKind::Scene, "Lower").unwrap();
        let same = editor.add_track(TrackKind::Scene, "Same").unwrap();
        editor.set_track_z_stack(upper, 5).unwrap();
        editor.set_track_z_stack(lower, 0).unwrap();
        editor.set_track_z_stack(same, 0).unwrap();

        let deep = ClipParams::new().with_z_anim(vec![DepthKey::new(0.0, 1.0), DepthKey::new(400.0, -3.0)]);
        editor.insert_clip(upper, "upper", 0.0, 1000.0, ClipParams::new()).unwrap();
        editor.insert_clip(lower, "lower", 0.0, 1000.0, ClipParams::new()).unwrap();
        editor.insert_clip(same, "deep", 0.0, 1000.0, deep).unwrap();

        // Before the second key "deep" samples 1.0, after it -3.0
        let order = editor.render_order(200.0);
        assert_eq!(payloads(&order.scene_clips), vec!["lower", "deep", "upper"]);
        let order = editor.render_order(600.0);
        assert_eq!(payloads(&order.scene_clips), vec!["deep", "lower", "upper"]);
        assert_eq!(order.scene_clips[0].depth, -3.0);
    }

    #[test]
    fn test_solo_and_mute() {
        let mut editor = editor();
        let v1 = editor.add_track(TrackKind::Scene, "V1").unwrap();
        let v2 = editor.add_track(TrackKind::Scene, "V2").unwrap();
        let v3 = editor.add_track(TrackKind::OverlayFront, "O1").unwrap();
        let a = editor.insert_clip(v1, "a", 0.0, 1000.0, ClipParams::new()).unwrap();
        let b = editor.insert_clip(v2, "b", 0.0, 1000.0, ClipParams::new()).unwrap();
        editor.insert_clip(v3, "c", 0.0, 1000.0, ClipParams::new()).unwrap();

        editor.set_clip_mute(a, true).unwrap();
        let order = editor.render_order(10.0);
        assert_eq!(payloads(&order.scene_clips), vec!["b"]);
        assert_eq!(order.front_overlays.len(), 1);

        editor.set_clip_solo(b, true).unwrap();
        let order = editor.render_order(10.0);
        assert_eq!(payloads(&order.scene_clips), vec!["b"]);
        assert!(order.front_overlays.is_empty());
    }

    #[test]
    fn test_evaluation_is_read_only() {
        let mut editor = editor();
        let track = editor.add_track(TrackKind::Scene, "V1").unwrap();
        editor.insert_clip(track, "a", 0.0, 1000.0, ClipParams::new()).unwrap();
        let before = editor.document().clone();
        let _ = evaluate_render_order(editor.document(), 250.0);
        assert_eq!(editor.document(), &before);
    }
}
