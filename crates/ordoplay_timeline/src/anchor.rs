// SPDX-License-Identifier: MIT OR Apache-2.0
//! Key-grip anchors: spatial/temporal reference points usable as snap targets.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnchorId(pub Uuid);

impl AnchorId {
    /// Create a new random anchor ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AnchorId {
    fn default() -> Self {
        Self::new()
    }
}

/// Kind of anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AnchorKind {
    /// Generic anchor point
    #[default]
    Anchor,
    /// Timeline marker
    Marker,
    /// Attachment socket
    Socket,
}

/// World transform of an anchor (opaque to the engine)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldTransform {
    /// Position (x, y, z)
    pub position: [f32; 3],
    /// Rotation quaternion (x, y, z, w)
    pub rotation: [f32; 4],
}

impl Default for WorldTransform {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, 0.0],
            rotation: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

/// A key-grip anchor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KgAnchor {
    /// Unique anchor ID
    pub id: AnchorId,
    /// Anchor kind
    pub kind: AnchorKind,
    /// World transform
    pub transform: WorldTransform,
    /// Tags
    pub tags: Vec<String>,
    /// Associated time; only time-bearing anchors are snap targets
    pub time_ms: Option<f64>,
}

impl KgAnchor {
    /// Create an anchor with no associated time
    pub fn new(kind: AnchorKind) -> Self {
        Self {
            id: AnchorId::new(),
            kind,
            transform: WorldTransform::default(),
            tags: Vec::new(),
            time_ms: None,
        }
    }

    /// Create a timeline marker at `time_ms`
    pub fn marker(time_ms: f64) -> Self {
        Self::new(AnchorKind::Marker).at_time(time_ms)
    }

    /// Set the associated time
    pub fn at_time(mut self, time_ms: f64) -> Self {
        self.time_ms = Some(time_ms);
        self
    }

    /// Add a tag
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}
