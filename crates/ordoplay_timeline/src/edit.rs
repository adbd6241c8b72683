// SPDX-License-Identifier: MIT OR Apache-2.0
//! Edit operations.
//!
//! [`TimelineEditor`] is the only writer of a [`TimelineDocument`]. Every
//! mutating operation runs against a draft copy of the document; on success
//! the pre-edit document is pushed to history and the draft is committed, on
//! failure nothing changes. Edits that leave the document untouched do not
//! create a history entry.

use crate::anchor::{AnchorId, KgAnchor};
use crate::clip::{Clip, ClipId, ClipLocks, GroupId};
use crate::document::{RippleMode, Selection, TimelineDocument};
use crate::history::{History, HistoryError, HistoryStats};
use crate::params::{ClipParams, DepthKey, ParamError, ParamValue};
use crate::render_order::{evaluate_render_order, RenderOrder};
use crate::settings::EngineSettings;
use crate::snapping::Snapper;
use crate::track::{Track, TrackId, TrackKind};
use indexmap::IndexMap;
use thiserror::Error;

/// Depth stamped on clips promoted from a front overlay
pub const PROMOTED_FRONT_DEPTH: f32 = 0.01;

/// Depth stamped on clips promoted from a back overlay
pub const PROMOTED_BACK_DEPTH: f32 = -2.0;

/// Error type for edit operations.
///
/// No variant is fatal: the document is always left as it was before the call.
#[derive(Debug, Error)]
pub enum EditError {
    /// Clip not found
    #[error("Clip not found: {0:?}")]
    ClipNotFound(ClipId),

    /// Track not found
    #[error("Track not found: {0:?}")]
    TrackNotFound(TrackId),

    /// Anchor not found
    #[error("Anchor not found: {0:?}")]
    AnchorNotFound(AnchorId),

    /// No clip carries the group
    #[error("Group not found: {0:?}")]
    GroupNotFound(GroupId),

    /// Operation does not apply in this context
    #[error("Invalid operation: {0}")]
    InvalidContext(String),

    /// Clip is locked against this kind of edit
    #[error("Clip is locked: {0:?}")]
    Locked(ClipId),

    /// Parameter write failed
    #[error("Parameter error: {0}")]
    Param(#[from] ParamError),

    /// History error
    #[error("History error: {0}")]
    History(#[from] HistoryError),
}

impl EditError {
    /// Whether the error is an unknown clip, track, anchor or group
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ClipNotFound(_) | Self::TrackNotFound(_) | Self::AnchorNotFound(_) | Self::GroupNotFound(_)
        )
    }
}

/// Result type for edit operations
pub type EditResult<T> = Result<T, EditError>;

/// Which edge of a clip to trim
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrimEdge {
    /// The start (in-point)
    In,
    /// The end (out-point)
    Out,
}

#[derive(Debug, Clone, Copy)]
struct EditRules {
    snapper: Snapper,
    min_duration: f64,
}

impl EditRules {
    fn snap(&self, doc: &TimelineDocument, time: f64) -> f64 {
        self.snapper.snap(time, &doc.anchors, &doc.state.snap)
    }
}

/// Owns a timeline document and its undo history
#[derive(Debug)]
pub struct TimelineEditor {
    document: TimelineDocument,
    history: History,
    rules: EditRules,
}

impl Default for TimelineEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl TimelineEditor {
    /// Create an editor with an empty document and default settings
    pub fn new() -> Self {
        Self::with_settings(&EngineSettings::default())
    }

    /// Create an editor with an empty document configured from `settings`.
    ///
    /// Settings that fail [`EngineSettings::validate`] are replaced by the defaults.
    pub fn with_settings(settings: &EngineSettings) -> Self {
        let settings = usable_settings(settings);
        let mut document = TimelineDocument::new();
        document.state.snap = settings.snap_config();
        document.state.frame_rate = settings.default_frame_rate;
        Self::from_document(document, &settings)
    }

    /// Wrap an existing (e.g. loaded) document
    pub fn from_document(mut document: TimelineDocument, settings: &EngineSettings) -> Self {
        let settings = usable_settings(settings);
        document.normalize();
        Self {
            document,
            history: History::with_max_depth(settings.history_capacity),
            rules: EditRules {
                snapper: Snapper::new(settings.anchor_snap_threshold_ms),
                min_duration: settings.min_clip_duration_ms,
            },
        }
    }

    /// Current document
    pub fn document(&self) -> &TimelineDocument {
        &self.document
    }

    /// Take the document out of the editor
    pub fn into_document(self) -> TimelineDocument {
        self.document
    }

    /// Replace the document and clear history
    pub fn load_document(&mut self, mut document: TimelineDocument) {
        document.normalize();
        self.document = document;
        self.history.clear();
        tracing::info!(
            "Loaded document with {} tracks and {} clips",
            self.document.track_count(),
            self.document.clip_count()
        );
    }

    /// Minimum clip duration enforced by trims and splits
    pub fn min_clip_duration(&self) -> f64 {
        self.rules.min_duration
    }

    /// Snap a time the same way edits do
    pub fn snap_time(&self, time: f64) -> f64 {
        self.rules.snap(&self.document, time)
    }

    /// Evaluate draw order at `time_ms`
    pub fn render_order(&self, time_ms: f64) -> RenderOrder {
        evaluate_render_order(&self.document, time_ms)
    }

    fn apply<T>(
        &mut self,
        description: &str,
        edit: impl FnOnce(&mut TimelineDocument, EditRules) -> EditResult<T>,
    ) -> EditResult<T> {
        let mut draft = self.document.clone();
        let output = match edit(&mut draft, self.rules) {
            Ok(output) => output,
            Err(err) => {
                tracing::warn!("{} rejected: {}", description, err);
                return Err(err);
            }
        };

        if draft == self.document {
            tracing::debug!("{} left the document unchanged", description);
            return Ok(output);
        }

        self.history.push(description, &self.document)?;
        self.document = draft;
        Ok(output)
    }

    // ------------------------------------------------------------------
    // Clip edits
    // ------------------------------------------------------------------

    /// Insert a new clip at the snapped `start_ms`, keeping track order.
    ///
    /// Durations below the floor are raised to it.
    pub fn insert_clip(
        &mut self,
        track_id: TrackId,
        payload_ref: impl Into<String>,
        start_ms: f64,
        duration_ms: f64,
        params: ClipParams,
    ) -> EditResult<ClipId> {
        let payload_ref = payload_ref.into();
        self.apply("Insert Clip", |doc, rules| {
            if !doc.tracks.contains_key(&track_id) {
                return Err(EditError::TrackNotFound(track_id));
            }
            require_unlocked(doc, track_id)?;
            let start_ms = require_finite("start", start_ms)?;
            let duration_ms = require_finite("duration", duration_ms)?;

            let start = rules.snap(doc, start_ms).max(0.0);
            let duration = duration_ms.max(rules.min_duration);
            let clip = Clip::new(track_id, payload_ref, start, duration).with_params(params);
            require_interval(&clip)?;
            let clip_id = clip.id;
            doc.clips.insert(clip_id, clip);
            if let Some(track) = doc.tracks.get_mut(&track_id) {
                track.insert_sorted(clip_id, start, &doc.clips);
            }

            tracing::debug!("Inserted clip {:?} at [{}, {})", clip_id, start, start + duration);
            Ok(clip_id)
        })
    }

    /// Delete every selected clip. Returns how many were removed.
    ///
    /// With `ripple` set (and the document's ripple mode not `None`), later
    /// clips on each affected track close the gap.
    pub fn delete_selection(&mut self, ripple: bool) -> EditResult<usize> {
        self.apply("Delete Clips", |doc, _rules| {
            let selected: Vec<ClipId> = doc
                .state
                .selection
                .iter()
                .copied()
                .filter(|id| doc.clips.contains_key(id))
                .collect();
            if selected.is_empty() {
                return Ok(0);
            }

            for id in &selected {
                if let Some(clip) = doc.clips.get(id) {
                    require_unlocked(doc, clip.track_id)?;
                }
            }

            let ripple = ripple && doc.state.ripple_mode != RippleMode::None;

            // Per track: latest deleted start and total deleted duration
            let mut removed: IndexMap<TrackId, (f64, f64)> = IndexMap::new();
            for id in &selected {
                let Some(clip) = doc.clips.shift_remove(id) else {
                    continue;
                };
                if let Some(track) = doc.tracks.get_mut(&clip.track_id) {
                    track.remove_clip(*id);
                }
                let entry = removed
                    .entry(clip.track_id)
                    .or_insert((f64::NEG_INFINITY, 0.0));
                entry.0 = entry.0.max(clip.start);
                entry.1 += clip.duration();
            }

            if ripple {
                for (track_id, (max_start, total)) in &removed {
                    let Some(track) = doc.tracks.get_mut(track_id) else {
                        continue;
                    };
                    for id in track.clip_ids() {
                        if let Some(clip) = doc.clips.get_mut(id) {
                            if clip.start > *max_start {
                                clip.shift(-total.min(clip.start));
                                require_interval(clip)?;
                            }
                        }
                    }
                    track.sort_clips(&doc.clips);
                    tracing::debug!("Rippled track {:?} left by {}", track_id, total);
                }
            }

            doc.state.selection.clear();
            Ok(selected.len())
        })
    }

    /// Shift clips by the snapped `delta_ms`, clamping starts at zero, and
    /// optionally relocate them to `target_track`.
    ///
    /// Group membership is not consulted; see [`TimelineEditor::move_group`].
    pub fn move_chunk(
        &mut self,
        clip_ids: &[ClipId],
        delta_ms: f64,
        target_track: Option<TrackId>,
    ) -> EditResult<()> {
        self.apply("Move Clips", |doc, rules| {
            move_clips(doc, rules, clip_ids, delta_ms, target_track)
        })
    }

    /// Move every clip in a group together
    pub fn move_group(&mut self, group_id: GroupId, delta_ms: f64) -> EditResult<()> {
        self.apply("Move Group", |doc, rules| {
            let members: Vec<ClipId> = doc
                .clips
                .values()
                .filter(|c| c.group_id == Some(group_id))
                .map(|c| c.id)
                .collect();
            if members.is_empty() {
                return Err(EditError::GroupNotFound(group_id));
            }
            move_clips(doc, rules, &members, delta_ms, None)
        })
    }

    /// Trim one edge of a clip to the snapped `to_ms`, never below the floor.
    ///
    /// When the effective ripple mode (`ripple`, else the document's) is not
    /// `None`, every later clip on the track shifts by the edge's delta.
    pub fn trim_edge(
        &mut self,
        clip_id: ClipId,
        edge: TrimEdge,
        to_ms: f64,
        ripple: Option<RippleMode>,
    ) -> EditResult<()> {
        self.apply("Trim Clip", |doc, rules| {
            let clip = doc.clips.get(&clip_id).ok_or(EditError::ClipNotFound(clip_id))?;
            if clip.locks.time {
                return Err(EditError::Locked(clip_id));
            }
            let (track_id, start, end) = (clip.track_id, clip.start, clip.end);
            let to = rules.snap(doc, require_finite("trim target", to_ms)?);

            let delta = match edge {
                TrimEdge::In => {
                    let new_start = to.max(0.0).min(end - rules.min_duration);
                    if let Some(clip) = doc.clips.get_mut(&clip_id) {
                        clip.start = new_start;
                    }
                    new_start - start
                }
                TrimEdge::Out => {
                    let new_end = to.max(start + rules.min_duration);
                    if let Some(clip) = doc.clips.get_mut(&clip_id) {
                        clip.end = new_end;
                    }
                    new_end - end
                }
            };

            if let Some(clip) = doc.clips.get(&clip_id) {
                require_interval(clip)?;
            }

            let mode = ripple.unwrap_or(doc.state.ripple_mode);
            if let Some(track) = doc.tracks.get_mut(&track_id) {
                if mode != RippleMode::None && delta != 0.0 {
                    if let Some(pos) = track.position(clip_id) {
                        for id in &track.clip_ids()[pos + 1..] {
                            if let Some(next) = doc.clips.get_mut(id) {
                                let new_start = (next.start + delta).max(0.0);
                                next.shift(new_start - next.start);
                                require_interval(next)?;
                            }
                        }
                    }
                    tracing::debug!("Rippled clips after {:?} by {}", clip_id, delta);
                }
                track.sort_clips(&doc.clips);
            }

            Ok(())
        })
    }

    /// Split the clip under the playhead on `track_id`.
    ///
    /// Returns the new tail clip, or `None` when no clip strictly contains the
    /// playhead or the clip is too short to split above the floor. The split
    /// point is clamped so both halves respect the floor.
    pub fn split_at_playhead(&mut self, track_id: TrackId) -> EditResult<Option<ClipId>> {
        self.apply("Split Clip", |doc, rules| {
            let track = doc.tracks.get(&track_id).ok_or(EditError::TrackNotFound(track_id))?;
            if track.locked {
                return Err(locked_track(track));
            }
            let playhead = doc.state.playhead_ms;
            let Some(original) = track
                .clip_ids()
                .iter()
                .filter_map(|id| doc.clips.get(id))
                .find(|c| c.strictly_contains(playhead))
                .cloned()
            else {
                return Ok(None);
            };

            if original.locks.time {
                return Err(EditError::Locked(original.id));
            }
            if original.duration() < 2.0 * rules.min_duration {
                tracing::debug!("Clip {:?} too short to split", original.id);
                return Ok(None);
            }

            let at = playhead.clamp(original.start + rules.min_duration, original.end - rules.min_duration);
            let mut tail = original.clone();
            tail.id = ClipId::new();
            tail.start = at;
            let tail_id = tail.id;

            if let Some(head) = doc.clips.get_mut(&original.id) {
                head.end = at;
            }
            doc.clips.insert(tail_id, tail);
            if let Some(track) = doc.tracks.get_mut(&track_id) {
                track.insert_after(original.id, tail_id);
                track.sort_clips(&doc.clips);
            }

            tracing::debug!("Split clip {:?} at {}", original.id, at);
            Ok(Some(tail_id))
        })
    }

    /// Move an overlay clip onto the scene plane with a constant depth
    /// animation (front overlays just above the plane, back overlays behind
    /// it). A scene track is created if none exists.
    pub fn promote_overlay_to_scene_plane(&mut self, clip_id: ClipId) -> EditResult<ClipId> {
        self.apply("Promote To Scene", |doc, _rules| {
            let clip = doc.clips.get(&clip_id).ok_or(EditError::ClipNotFound(clip_id))?;
            let source = doc
                .tracks
                .get(&clip.track_id)
                .ok_or(EditError::TrackNotFound(clip.track_id))?;
            if !source.kind.is_overlay() {
                return Err(EditError::InvalidContext(format!(
                    "only overlay clips can be promoted, clip is on a {} track",
                    source.kind.name()
                )));
            }
            if source.locked {
                return Err(locked_track(source));
            }
            let depth = if source.kind == TrackKind::OverlayFront {
                PROMOTED_FRONT_DEPTH
            } else {
                PROMOTED_BACK_DEPTH
            };
            let source_id = source.id;
            let mut promoted = clip.clone();

            let scene_id = match doc.first_track_of_kind(TrackKind::Scene) {
                Some(track) if track.locked => return Err(locked_track(track)),
                Some(track) => track.id,
                None => {
                    let track = Track::new("Scene", TrackKind::Scene);
                    let id = track.id;
                    doc.tracks.insert(id, track);
                    tracing::info!("Created scene track {:?} for promotion", id);
                    id
                }
            };

            promoted.id = ClipId::new();
            promoted.track_id = scene_id;
            promoted
                .params
                .set_z_anim(vec![DepthKey::new(promoted.start, depth), DepthKey::new(promoted.end, depth)]);
            let promoted_id = promoted.id;
            let start = promoted.start;

            doc.clips.shift_remove(&clip_id);
            if let Some(track) = doc.tracks.get_mut(&source_id) {
                track.remove_clip(clip_id);
            }
            doc.clips.insert(promoted_id, promoted);
            if let Some(track) = doc.tracks.get_mut(&scene_id) {
                track.insert_sorted(promoted_id, start, &doc.clips);
            }
            if doc.state.selection.contains(&clip_id) {
                doc.state.selection.remove(&clip_id);
                doc.state.selection.add(promoted_id);
            }

            tracing::info!("Promoted clip {:?} to scene plane as {:?}", clip_id, promoted_id);
            Ok(promoted_id)
        })
    }

    /// Write a parameter at a dotted key path
    pub fn set_clip_param(&mut self, clip_id: ClipId, path: &str, value: ParamValue) -> EditResult<()> {
        self.apply("Set Clip Parameter", |doc, _rules| {
            let clip = doc.clips.get_mut(&clip_id).ok_or(EditError::ClipNotFound(clip_id))?;
            if clip.locks.content {
                return Err(EditError::Locked(clip_id));
            }
            clip.params.set_path(path, value)?;
            Ok(())
        })
    }

    /// Clone a clip onto its own track at the snapped `at_ms`
    pub fn duplicate_clip(&mut self, clip_id: ClipId, at_ms: f64) -> EditResult<ClipId> {
        self.apply("Duplicate Clip", |doc, rules| {
            let source = doc.clips.get(&clip_id).ok_or(EditError::ClipNotFound(clip_id))?;
            let mut copy = source.clone();
            require_unlocked(doc, copy.track_id)?;
            let at = rules.snap(doc, require_finite("duplicate start", at_ms)?).max(0.0);

            copy.id = ClipId::new();
            copy.group_id = None;
            copy.shift(at - copy.start);
            require_interval(&copy)?;
            let copy_id = copy.id;
            let track_id = copy.track_id;

            doc.clips.insert(copy_id, copy);
            if let Some(track) = doc.tracks.get_mut(&track_id) {
                track.insert_sorted(copy_id, at, &doc.clips);
            }
            Ok(copy_id)
        })
    }

    /// Stamp a fresh group ID on the given clips
    pub fn group(&mut self, clip_ids: &[ClipId]) -> EditResult<GroupId> {
        self.apply("Group Clips", |doc, _rules| {
            let members: Vec<ClipId> = clip_ids
                .iter()
                .copied()
                .filter(|id| doc.clips.contains_key(id))
                .collect();
            if members.is_empty() {
                return Err(match clip_ids.first() {
                    Some(id) => EditError::ClipNotFound(*id),
                    None => EditError::InvalidContext("nothing to group".to_string()),
                });
            }

            let group_id = GroupId::new();
            for id in &members {
                if let Some(clip) = doc.clips.get_mut(id) {
                    clip.group_id = Some(group_id);
                }
            }
            Ok(group_id)
        })
    }

    /// Clear a group ID from every clip carrying it. Returns the member count.
    pub fn ungroup(&mut self, group_id: GroupId) -> EditResult<usize> {
        self.apply("Ungroup Clips", |doc, _rules| {
            let mut count = 0;
            for clip in doc.clips.values_mut() {
                if clip.group_id == Some(group_id) {
                    clip.group_id = None;
                    count += 1;
                }
            }
            if count == 0 {
                return Err(EditError::GroupNotFound(group_id));
            }
            Ok(count)
        })
    }

    /// Set clip mute
    pub fn set_clip_mute(&mut self, clip_id: ClipId, muted: bool) -> EditResult<()> {
        self.update_clip("Mute Clip", clip_id, |clip| clip.muted = muted)
    }

    /// Set clip solo
    pub fn set_clip_solo(&mut self, clip_id: ClipId, solo: bool) -> EditResult<()> {
        self.update_clip("Solo Clip", clip_id, |clip| clip.solo = solo)
    }

    /// Set clip lock flags
    pub fn set_clip_locks(&mut self, clip_id: ClipId, locks: ClipLocks) -> EditResult<()> {
        self.update_clip("Lock Clip", clip_id, |clip| clip.locks = locks)
    }

    /// Replace a clip's labels
    pub fn set_clip_labels(&mut self, clip_id: ClipId, labels: Vec<String>) -> EditResult<()> {
        self.update_clip("Label Clip", clip_id, |clip| clip.labels = labels)
    }

    fn update_clip(
        &mut self,
        description: &str,
        clip_id: ClipId,
        update: impl FnOnce(&mut Clip),
    ) -> EditResult<()> {
        self.apply(description, |doc, _rules| {
            let clip = doc.clips.get_mut(&clip_id).ok_or(EditError::ClipNotFound(clip_id))?;
            update(clip);
            Ok(())
        })
    }

    // ------------------------------------------------------------------
    // Tracks and anchors
    // ------------------------------------------------------------------

    /// Add a track on top of the existing tracks of its kind
    pub fn add_track(&mut self, kind: TrackKind, name: impl Into<String>) -> EditResult<TrackId> {
        let name = name.into();
        self.apply("Add Track", |doc, _rules| {
            let same_kind = doc.tracks.values().filter(|t| t.kind == kind).count();
            let track = Track::new(name, kind).with_z_stack(same_kind as i32);
            let id = track.id;
            tracing::info!("Added {} track '{}'", kind.name(), track.name);
            doc.tracks.insert(id, track);
            Ok(id)
        })
    }

    /// Remove a track and every clip it owns. Returns the removed clip count.
    pub fn remove_track(&mut self, track_id: TrackId) -> EditResult<usize> {
        self.apply("Remove Track", |doc, _rules| {
            require_unlocked(doc, track_id)?;
            let track = doc
                .tracks
                .shift_remove(&track_id)
                .ok_or(EditError::TrackNotFound(track_id))?;
            let owned: Vec<ClipId> = doc
                .clips
                .values()
                .filter(|c| c.track_id == track_id)
                .map(|c| c.id)
                .collect();
            for id in &owned {
                doc.clips.shift_remove(id);
                doc.state.selection.remove(id);
            }
            tracing::info!("Removed track '{}' and {} clips", track.name, owned.len());
            Ok(owned.len())
        })
    }

    /// Show or hide a track
    pub fn set_track_visible(&mut self, track_id: TrackId, visible: bool) -> EditResult<()> {
        self.update_track("Toggle Track Visibility", track_id, |track| track.visible = visible)
    }

    /// Lock or unlock a track
    pub fn set_track_locked(&mut self, track_id: TrackId, locked: bool) -> EditResult<()> {
        self.update_track("Lock Track", track_id, |track| track.locked = locked)
    }

    /// Mute or unmute a track
    pub fn set_track_muted(&mut self, track_id: TrackId, muted: bool) -> EditResult<()> {
        self.update_track("Mute Track", track_id, |track| track.muted = muted)
    }

    /// Set a track's base depth
    pub fn set_track_z_stack(&mut self, track_id: TrackId, z_stack: i32) -> EditResult<()> {
        self.update_track("Reorder Track", track_id, |track| track.z_stack = z_stack)
    }

    /// Rename a track
    pub fn rename_track(&mut self, track_id: TrackId, name: impl Into<String>) -> EditResult<()> {
        let name = name.into();
        self.update_track("Rename Track", track_id, |track| track.name = name)
    }

    fn update_track(
        &mut self,
        description: &str,
        track_id: TrackId,
        update: impl FnOnce(&mut Track),
    ) -> EditResult<()> {
        self.apply(description, |doc, _rules| {
            let track = doc.tracks.get_mut(&track_id).ok_or(EditError::TrackNotFound(track_id))?;
            update(track);
            Ok(())
        })
    }

    /// Add an anchor
    pub fn add_kg_anchor(&mut self, anchor: KgAnchor) -> EditResult<AnchorId> {
        self.apply("Add Anchor", |doc, _rules| {
            if doc.anchors.iter().any(|a| a.id == anchor.id) {
                return Err(EditError::InvalidContext(format!("anchor {:?} already exists", anchor.id)));
            }
            let id = anchor.id;
            doc.anchors.push(anchor);
            Ok(id)
        })
    }

    /// Remove an anchor
    pub fn remove_kg_anchor(&mut self, anchor_id: AnchorId) -> EditResult<()> {
        self.apply("Remove Anchor", |doc, _rules| {
            let idx = doc
                .anchors
                .iter()
                .position(|a| a.id == anchor_id)
                .ok_or(EditError::AnchorNotFound(anchor_id))?;
            doc.anchors.remove(idx);
            Ok(())
        })
    }

    // ------------------------------------------------------------------
    // State updates (no history)
    // ------------------------------------------------------------------

    /// Move the playhead
    pub fn seek(&mut self, time_ms: f64) {
        self.document.state.playhead_ms = time_ms.max(0.0);
    }

    /// Replace the selection
    pub fn set_selection(&mut self, clip_ids: &[ClipId]) {
        self.document.state.selection = Selection::with_clips(clip_ids.to_vec());
    }

    /// Toggle snapping. Returns the new state.
    pub fn toggle_snap(&mut self) -> bool {
        let snap = &mut self.document.state.snap;
        snap.enable = !snap.enable;
        snap.enable
    }

    /// Set the grid interval
    pub fn set_grid(&mut self, grid_ms: f64) {
        if grid_ms > 0.0 {
            self.document.state.snap.grid_ms = grid_ms;
        }
    }

    /// Set the ripple mode
    pub fn set_ripple_mode(&mut self, mode: RippleMode) {
        self.document.state.ripple_mode = mode;
    }

    /// Set the shuttle multiplier
    pub fn set_shuttle(&mut self, multiplier: f32) {
        self.document.state.shuttle = multiplier;
    }

    /// Set the nominal frame rate
    pub fn set_frame_rate(&mut self, frame_rate: f32) {
        if frame_rate > 0.0 {
            self.document.state.frame_rate = frame_rate;
        }
    }

    /// Advance the playhead by `delta_ms` of wall time
    pub fn advance(&mut self, delta_ms: f64) {
        self.document.state.advance(delta_ms);
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    /// Restore the state before the last edit
    pub fn undo(&mut self) -> EditResult<()> {
        let description = self.history.undo_description().map(str::to_string);
        self.document = self.history.undo(&self.document)?;
        tracing::info!("Undo: {}", description.unwrap_or_default());
        Ok(())
    }

    /// Re-apply the last undone edit
    pub fn redo(&mut self) -> EditResult<()> {
        let description = self.history.redo_description().map(str::to_string);
        self.document = self.history.redo(&self.document)?;
        tracing::info!("Redo: {}", description.unwrap_or_default());
        Ok(())
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Get undo stack depth
    pub fn undo_depth(&self) -> usize {
        self.history.undo_depth()
    }

    /// Get redo stack depth
    pub fn redo_depth(&self) -> usize {
        self.history.redo_depth()
    }

    /// Get description of next undo operation
    pub fn undo_description(&self) -> Option<&str> {
        self.history.undo_description()
    }

    /// Get description of next redo operation
    pub fn redo_description(&self) -> Option<&str> {
        self.history.redo_description()
    }

    /// Get history statistics
    pub fn history_stats(&self) -> HistoryStats {
        self.history.stats()
    }
}

fn require_finite(what: &str, value: f64) -> EditResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(EditError::InvalidContext(format!("{what} must be a finite time, got {value}")))
    }
}

/// Reject clips whose interval collapsed (e.g. precision loss at huge times)
fn require_interval(clip: &Clip) -> EditResult<()> {
    if clip.start.is_finite() && clip.end.is_finite() && clip.start < clip.end {
        Ok(())
    } else {
        Err(EditError::InvalidContext(format!(
            "clip {:?} would span the empty interval [{}, {})",
            clip.id, clip.start, clip.end
        )))
    }
}

fn locked_track(track: &Track) -> EditError {
    EditError::InvalidContext(format!("track '{}' is locked", track.name))
}

/// A locked track refuses clips being added to or removed from it
fn require_unlocked(doc: &TimelineDocument, track_id: TrackId) -> EditResult<()> {
    match doc.tracks.get(&track_id) {
        Some(track) if track.locked => Err(locked_track(track)),
        _ => Ok(()),
    }
}

fn usable_settings(settings: &EngineSettings) -> EngineSettings {
    match settings.validate() {
        Ok(()) => settings.clone(),
        Err(err) => {
            tracing::warn!("{}; falling back to default engine settings", err);
            EngineSettings::default()
        }
    }
}

fn move_clips(
    doc: &mut TimelineDocument,
    rules: EditRules,
    clip_ids: &[ClipId],
    delta_ms: f64,
    target_track: Option<TrackId>,
) -> EditResult<()> {
    let mut ids: Vec<ClipId> = Vec::new();
    for id in clip_ids {
        if doc.clips.contains_key(id) && !ids.contains(id) {
            ids.push(*id);
        }
    }
    if ids.is_empty() {
        return match clip_ids.first() {
            Some(id) => Err(EditError::ClipNotFound(*id)),
            None => Ok(()),
        };
    }
    if let Some(target) = target_track {
        if !doc.tracks.contains_key(&target) {
            return Err(EditError::TrackNotFound(target));
        }
        // Relocation adds to the target list and removes from each source list
        for id in &ids {
            if let Some(source) = doc.clips.get(id).map(|c| c.track_id).filter(|s| *s != target) {
                require_unlocked(doc, source)?;
                require_unlocked(doc, target)?;
            }
        }
    }
    if let Some(locked) = ids
        .iter()
        .find(|id| doc.clips.get(*id).is_some_and(|c| c.locks.time))
    {
        return Err(EditError::Locked(*locked));
    }

    let delta = rules.snap(doc, require_finite("move delta", delta_ms)?);
    let mut touched: Vec<TrackId> = Vec::new();

    for id in &ids {
        let Some(clip) = doc.clips.get_mut(id) else {
            continue;
        };
        let new_start = (clip.start + delta).max(0.0);
        clip.shift(new_start - clip.start);
        require_interval(clip)?;

        let source = clip.track_id;
        if !touched.contains(&source) {
            touched.push(source);
        }

        if let Some(target) = target_track.filter(|t| *t != source) {
            clip.track_id = target;
            if let Some(track) = doc.tracks.get_mut(&source) {
                track.remove_clip(*id);
            }
            if let Some(track) = doc.tracks.get_mut(&target) {
                track.push(*id);
            }
            if !touched.contains(&target) {
                touched.push(target);
            }
        }
    }

    for track_id in touched {
        if let Some(track) = doc.tracks.get_mut(&track_id) {
            track.sort_clips(&doc.clips);
        }
    }

    tracing::debug!("Moved {} clips by {}", ids.len(), delta);
    Ok(())
}
