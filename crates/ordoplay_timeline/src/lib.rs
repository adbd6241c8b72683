// SPDX-License-Identifier: MIT OR Apache-2.0
//! Chunk-based timeline editing engine for OrdoPlay.
//!
//! This crate provides the non-linear editing core:
//! - Layered tracks (key-grip, front/back overlays, scene plane)
//! - Clip editing with snapping, ripple, trim, split and promotion
//! - Render-order evaluation for the compositor
//! - Snapshot-based undo/redo
//!
//! ## Architecture
//!
//! The engine is built on:
//! - A serializable [`TimelineDocument`] owning tracks, clips and anchors
//! - A [`TimelineEditor`] that is the document's only writer
//! - A pure [`evaluate_render_order`] query
//! - RON persistence for documents and [`EngineSettings`]

pub mod anchor;
pub mod clip;
pub mod document;
pub mod edit;
pub mod history;
pub mod params;
pub mod render_order;
pub mod settings;
pub mod snapping;
pub mod track;

pub use anchor::{AnchorId, AnchorKind, KgAnchor, WorldTransform};
pub use clip::{Clip, ClipId, ClipLocks, ClipType, GroupId, MIN_CLIP_DURATION_MS};
pub use document::{
    DocumentError, RippleMode, Selection, SnapConfig, TimelineDocument, TimelineState,
    DOCUMENT_FORMAT_VERSION,
};
pub use edit::{EditError, EditResult, TimelineEditor, TrimEdge};
pub use history::{History, HistoryError, HistoryStats, OperationId, MAX_HISTORY};
pub use params::{BlendMode, ClipParams, DepthKey, Easing, ParamError, ParamValue, TransformHint};
pub use render_order::{evaluate_render_order, RenderEntry, RenderOrder};
pub use settings::{EngineSettings, SettingsError};
pub use snapping::{SnapTarget, Snapped, Snapper, ANCHOR_SNAP_THRESHOLD_MS};
pub use track::{Track, TrackId, TrackKind};
