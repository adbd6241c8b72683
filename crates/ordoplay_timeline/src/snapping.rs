// SPDX-License-Identifier: MIT OR Apache-2.0
//! Snapping: maps a candidate time to a corrected time.
//!
//! Anchor proximity always wins over the grid. The grid only applies when
//! snapping is enabled and no time-bearing anchor lies within the threshold.

use crate::anchor::{AnchorId, KgAnchor};
use crate::document::SnapConfig;

/// Default anchor proximity threshold in milliseconds
pub const ANCHOR_SNAP_THRESHOLD_MS: f64 = 100.0;

/// What a snapped time was corrected to
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SnapTarget {
    /// Snapped onto an anchor's time
    Anchor(AnchorId),
    /// Rounded to the grid
    Grid,
    /// Passed through unchanged
    None,
}

/// Result of a snap request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapped {
    /// Corrected time
    pub time: f64,
    /// Where the time came from
    pub target: SnapTarget,
}

/// Snapping resolver
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapper {
    /// Anchor proximity threshold (inclusive)
    pub anchor_threshold_ms: f64,
}

impl Default for Snapper {
    fn default() -> Self {
        Self::new(ANCHOR_SNAP_THRESHOLD_MS)
    }
}

impl Snapper {
    /// Create a resolver with the given anchor threshold
    pub fn new(anchor_threshold_ms: f64) -> Self {
        Self { anchor_threshold_ms }
    }

    /// Resolve `time` against anchors first, then the grid
    pub fn resolve(&self, time: f64, anchors: &[KgAnchor], config: &SnapConfig) -> Snapped {
        if let Some((anchor_id, anchor_time)) = self.nearest_anchor(time, anchors) {
            return Snapped {
                time: anchor_time,
                target: SnapTarget::Anchor(anchor_id),
            };
        }

        if config.enable && config.grid_ms > 0.0 {
            return Snapped {
                time: round_to_grid(time, config.grid_ms),
                target: SnapTarget::Grid,
            };
        }

        Snapped {
            time,
            target: SnapTarget::None,
        }
    }

    /// Shorthand for [`Snapper::resolve`] returning only the time
    pub fn snap(&self, time: f64, anchors: &[KgAnchor], config: &SnapConfig) -> f64 {
        self.resolve(time, anchors, config).time
    }

    /// Closest time-bearing anchor within the threshold. Ties go to the
    /// anchor listed first.
    fn nearest_anchor(&self, time: f64, anchors: &[KgAnchor]) -> Option<(AnchorId, f64)> {
        let mut best: Option<(AnchorId, f64, f64)> = None;
        for anchor in anchors {
            let Some(anchor_time) = anchor.time_ms else {
                continue;
            };
            let distance = (anchor_time - time).abs();
            if distance > self.anchor_threshold_ms {
                continue;
            }
            if best.map_or(true, |(_, _, d)| distance < d) {
                best = Some((anchor.id, anchor_time, distance));
            }
        }
        best.map(|(id, t, _)| (id, t))
    }
}

/// Round to the nearest multiple of `grid_ms`, halves rounding up
pub fn round_to_grid(time: f64, grid_ms: f64) -> f64 {
    (time / grid_ms + 0.5).floor() * grid_ms
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(grid_ms: f64, enable: bool) -> SnapConfig {
        SnapConfig { grid_ms, enable }
    }

    #[test]
    fn test_anchor_wins_within_threshold() {
        let anchors = vec![KgAnchor::marker(1000.0)];
        let snapper = Snapper::default();

        let snapped = snapper.resolve(1050.0, &anchors, &grid(250.0, true));
        assert_eq!(snapped.time, 1000.0);
        assert_eq!(snapped.target, SnapTarget::Anchor(anchors[0].id));

        let snapped = snapper.resolve(1300.0, &anchors, &grid(250.0, true));
        assert_eq!(snapped.time, 1250.0);
        assert_eq!(snapped.target, SnapTarget::Grid);
    }

    #[test]
    fn test_closest_anchor_is_chosen() {
        let anchors = vec![KgAnchor::marker(1000.0), KgAnchor::marker(1080.0)];
        let snapper = Snapper::default();
        assert_eq!(snapper.snap(1060.0, &anchors, &grid(250.0, true)), 1080.0);
        assert_eq!(snapper.snap(1030.0, &anchors, &grid(250.0, true)), 1000.0);
    }

    #[test]
    fn test_timeless_anchors_are_ignored() {
        let anchors = vec![KgAnchor::new(crate::anchor::AnchorKind::Socket)];
        let snapper = Snapper::default();
        assert_eq!(snapper.snap(1010.0, &anchors, &grid(250.0, true)), 1000.0);
    }

    #[test]
    fn test_disabled_grid_passes_through() {
        let snapper = Snapper::default();
        let snapped = snapper.resolve(1337.0, &[], &grid(250.0, false));
        assert_eq!(snapped.time, 1337.0);
        assert_eq!(snapped.target, SnapTarget::None);
    }

    #[test]
    fn test_round_to_grid() {
        assert_eq!(round_to_grid(124.0, 250.0), 0.0);
        assert_eq!(round_to_grid(125.0, 250.0), 250.0);
        assert_eq!(round_to_grid(-125.0, 250.0), 0.0);
        assert_eq!(round_to_grid(-130.0, 250.0), -250.0);
    }
}
