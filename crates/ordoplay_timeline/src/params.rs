// SPDX-License-Identifier: MIT OR Apache-2.0
//! Clip parameter bag.
//!
//! Parameters are a closed record of the kinds the compositor understands
//! (depth animation, transform, blend, easing) plus an `extensions` map for
//! renderer-specific values. The engine only ever reads `z_anim`.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while writing into a parameter bag
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParamError {
    /// The key path was empty or contained an empty segment
    #[error("Empty parameter path")]
    EmptyPath,

    /// The value does not have the shape the key requires
    #[error("Parameter '{path}' expects {expected}")]
    TypeMismatch {
        /// Path that was written
        path: String,
        /// Human-readable description of the accepted shape
        expected: &'static str,
    },

    /// The value contains NaN or an infinity
    #[error("Parameter '{path}' must not contain NaN or infinite numbers")]
    NonFinite {
        /// Path that was written
        path: String,
    },
}

/// Dynamically shaped parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    /// Boolean flag
    Bool(bool),
    /// Any number
    Number(f64),
    /// String value
    Text(String),
    /// Ordered list
    List(Vec<ParamValue>),
    /// Nested record
    Map(IndexMap<String, ParamValue>),
}

impl ParamValue {
    /// Whether every number in the value (recursively) is finite
    pub fn is_finite(&self) -> bool {
        match self {
            ParamValue::Number(v) => v.is_finite(),
            ParamValue::List(items) => items.iter().all(ParamValue::is_finite),
            ParamValue::Map(map) => map.values().all(ParamValue::is_finite),
            ParamValue::Bool(_) | ParamValue::Text(_) => true,
        }
    }

    /// Get as number if possible
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ParamValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as text if possible
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get as a fixed-size float array if this is a list of exactly `N` numbers
    pub fn as_floats<const N: usize>(&self) -> Option<[f32; N]> {
        let ParamValue::List(items) = self else {
            return None;
        };
        if items.len() != N {
            return None;
        }
        let mut out = [0.0; N];
        for (slot, item) in out.iter_mut().zip(items) {
            *slot = item.as_number()? as f32;
        }
        Some(out)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Number(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Text(v)
    }
}

/// A depth keyframe: at time `t` (ms) the clip sits at depth `z`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DepthKey {
    /// Time in milliseconds on the document clock
    pub t: f64,
    /// Depth value
    pub z: f32,
}

impl DepthKey {
    /// Create a new depth key
    pub fn new(t: f64, z: f32) -> Self {
        Self { t, z }
    }
}

/// Compositor blend mode hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum BlendMode {
    /// Standard alpha-over
    #[default]
    Normal,
    /// Additive
    Add,
    /// Multiply
    Multiply,
    /// Screen
    Screen,
}

impl BlendMode {
    /// Parse from a lowercase name
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "normal" => Some(Self::Normal),
            "add" | "additive" => Some(Self::Add),
            "multiply" => Some(Self::Multiply),
            "screen" => Some(Self::Screen),
            _ => None,
        }
    }
}

/// Easing hint for transitions in and out of a clip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Easing {
    /// Linear
    #[default]
    Linear,
    /// Ease in
    EaseIn,
    /// Ease out
    EaseOut,
    /// Ease in and out
    EaseInOut,
}

impl Easing {
    /// Parse from a name (`linear`, `easeIn`, `ease-in-out`, ...)
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized: String = name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match normalized.as_str() {
            "linear" => Some(Self::Linear),
            "easein" => Some(Self::EaseIn),
            "easeout" => Some(Self::EaseOut),
            "easeinout" => Some(Self::EaseInOut),
            _ => None,
        }
    }
}

/// Transform hint consumed by the renderer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformHint {
    /// Position (x, y, z)
    pub position: [f32; 3],
    /// Rotation quaternion (x, y, z, w)
    pub rotation: [f32; 4],
    /// Scale (x, y, z)
    pub scale: [f32; 3],
    /// Opacity in 0..=1
    pub opacity: f32,
}

impl Default for TransformHint {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, 0.0],
            rotation: [0.0, 0.0, 0.0, 1.0],
            scale: [1.0, 1.0, 1.0],
            opacity: 1.0,
        }
    }
}

/// Parameters attached to a clip
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClipParams {
    /// Depth animation, sorted by `t`
    pub z_anim: Vec<DepthKey>,
    /// Transform hint
    pub transform: Option<TransformHint>,
    /// Blend mode hint
    pub blend: Option<BlendMode>,
    /// Easing hint
    pub easing: Option<Easing>,
    /// Renderer-specific values
    pub extensions: IndexMap<String, ParamValue>,
}

impl ClipParams {
    /// Create an empty parameter bag
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the depth animation, keeping it sorted
    pub fn with_z_anim(mut self, keys: impl Into<Vec<DepthKey>>) -> Self {
        self.set_z_anim(keys.into());
        self
    }

    /// Set the depth animation, keeping it sorted
    pub fn set_z_anim(&mut self, mut keys: Vec<DepthKey>) {
        keys.sort_by(|a, b| a.t.total_cmp(&b.t));
        self.z_anim = keys;
    }

    /// Sample the depth animation: the latest key at or before `t`, or 0
    pub fn depth_at(&self, t: f64) -> f32 {
        // z_anim is sorted, so the partition point is the first key after t
        let idx = self.z_anim.partition_point(|k| k.t <= t);
        if idx == 0 {
            0.0
        } else {
            self.z_anim[idx - 1].z
        }
    }

    /// Shift every depth key by `delta` ms, so the animation follows its clip
    pub fn offset_time(&mut self, delta: f64) {
        for key in &mut self.z_anim {
            key.t += delta;
        }
    }

    /// Get an extension value by dotted path
    pub fn extension(&self, path: &str) -> Option<&ParamValue> {
        let mut segments = path.split('.');
        let mut current = self.extensions.get(segments.next()?)?;
        for segment in segments {
            match current {
                ParamValue::Map(map) => current = map.get(segment)?,
                _ => return None,
            }
        }
        Some(current)
    }

    /// Write `value` at a dotted key path.
    ///
    /// Known keys (`blend`, `easing`, `transform.*`, `zAnim`) are validated
    /// against their typed slot. Anything else lands in `extensions`, creating
    /// intermediate maps as needed and replacing non-map intermediates.
    pub fn set_path(&mut self, path: &str, value: ParamValue) -> Result<(), ParamError> {
        let segments: Vec<&str> = path.split('.').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(ParamError::EmptyPath);
        }
        if !value.is_finite() {
            return Err(ParamError::NonFinite {
                path: path.to_string(),
            });
        }

        let mismatch = |expected| ParamError::TypeMismatch {
            path: path.to_string(),
            expected,
        };

        match segments.as_slice() {
            ["blend"] => {
                let mode = value
                    .as_text()
                    .and_then(BlendMode::from_name)
                    .ok_or_else(|| mismatch("a blend mode name"))?;
                self.blend = Some(mode);
            }
            ["easing"] => {
                let easing = value
                    .as_text()
                    .and_then(Easing::from_name)
                    .ok_or_else(|| mismatch("an easing name"))?;
                self.easing = Some(easing);
            }
            ["zAnim" | "z_anim"] => {
                let keys = parse_depth_keys(&value).ok_or_else(|| mismatch("a list of {t, z} maps"))?;
                self.set_z_anim(keys);
            }
            ["transform", field] => {
                let transform = self.transform.get_or_insert_with(TransformHint::default);
                match *field {
                    "position" => {
                        transform.position = value.as_floats().ok_or_else(|| mismatch("3 numbers"))?;
                    }
                    "rotation" => {
                        transform.rotation = value.as_floats().ok_or_else(|| mismatch("4 numbers"))?;
                    }
                    "scale" => {
                        transform.scale = value.as_floats().ok_or_else(|| mismatch("3 numbers"))?;
                    }
                    "opacity" => {
                        transform.opacity =
                            value.as_number().ok_or_else(|| mismatch("a number"))? as f32;
                    }
                    _ => return Err(mismatch("position, rotation, scale or opacity")),
                }
            }
            _ => set_nested(&mut self.extensions, &segments, value),
        }

        Ok(())
    }
}

fn parse_depth_keys(value: &ParamValue) -> Option<Vec<DepthKey>> {
    let ParamValue::List(items) = value else {
        return None;
    };
    items
        .iter()
        .map(|item| match item {
            ParamValue::Map(map) => Some(DepthKey {
                t: map.get("t")?.as_number()?,
                z: map.get("z")?.as_number()? as f32,
            }),
            _ => None,
        })
        .collect()
}

fn set_nested(map: &mut IndexMap<String, ParamValue>, segments: &[&str], value: ParamValue) {
    let Some((last, parents)) = segments.split_last() else {
        return;
    };

    let mut current = map;
    for segment in parents {
        let entry = current
            .entry((*segment).to_string())
            .or_insert_with(|| ParamValue::Map(IndexMap::new()));
        if !matches!(entry, ParamValue::Map(_)) {
            *entry = ParamValue::Map(IndexMap::new());
        }
        let ParamValue::Map(inner) = entry else {
            return;
        };
        current = inner;
    }
    current.insert((*last).to_string(), value);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_sampling() {
        let params = ClipParams::new().with_z_anim(vec![
            DepthKey::new(500.0, 2.0),
            DepthKey::new(100.0, 1.0),
        ]);

        assert_eq!(params.depth_at(0.0), 0.0);
        assert_eq!(params.depth_at(100.0), 1.0);
        assert_eq!(params.depth_at(499.0), 1.0);
        assert_eq!(params.depth_at(500.0), 2.0);
        assert_eq!(params.depth_at(10_000.0), 2.0);
    }

    #[test]
    fn test_rejects_non_finite_numbers() {
        let mut params = ClipParams::new();
        let result = params.set_path("fx.x", f64::NAN.into());
        assert!(matches!(result, Err(ParamError::NonFinite { .. })));

        let nested = ParamValue::List(vec![1.0.into(), f64::INFINITY.into(), 0.0.into()]);
        assert!(params.set_path("transform.position", nested).is_err());
        assert_eq!(params, ClipParams::new());
    }

    #[test]
    fn test_set_nested_extension() {
        let mut params = ClipParams::new();
        params.set_path("fx.glow.radius", 4.0.into()).unwrap();
        params.set_path("fx.glow.color", "red".into()).unwrap();

        assert_eq!(params.extension("fx.glow.radius"), Some(&ParamValue::Number(4.0)));
        assert_eq!(params.extension("fx.glow.color").and_then(ParamValue::as_text), Some("red"));

        // A scalar intermediate is replaced by a map
        params.set_path("fx", true.into()).unwrap();
        params.set_path("fx.tint", 0.5.into()).unwrap();
        assert_eq!(params.extension("fx.tint"), Some(&ParamValue::Number(0.5)));
        assert!(params.extension("fx.glow").is_none());
    }

    #[test]
    fn test_known_keys() {
        let mut params = ClipParams::new();
        params.set_path("blend", "multiply".into()).unwrap();
        params.set_path("easing", "easeInOut".into()).unwrap();
        params.set_path("transform.opacity", 0.25.into()).unwrap();
        params
            .set_path(
                "transform.position",
                ParamValue::List(vec![1.0.into(), 2.0.into(), 3.0.into()]),
            )
            .unwrap();

        assert_eq!(params.blend, Some(BlendMode::Multiply));
        assert_eq!(params.easing, Some(Easing::EaseInOut));
        let transform = params.transform.unwrap();
        assert_eq!(transform.opacity, 0.25);
        assert_eq!(transform.position, [1.0, 2.0, 3.0]);
        assert_eq!(transform.scale, [1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_type_mismatch() {
        let mut params = ClipParams::new();
        assert!(matches!(
            params.set_path("blend", 3.0.into()),
            Err(ParamError::TypeMismatch { .. })
        ));
        assert_eq!(params.set_path("a..b", true.into()), Err(ParamError::EmptyPath));
        assert_eq!(params, ClipParams::new());
    }

    #[test]
    fn test_z_anim_from_value() {
        let key = |t: f64, z: f64| {
            let mut map = IndexMap::new();
            map.insert("t".to_string(), ParamValue::Number(t));
            map.insert("z".to_string(), ParamValue::Number(z));
            ParamValue::Map(map)
        };

        let mut params = ClipParams::new();
        params
            .set_path("zAnim", ParamValue::List(vec![key(300.0, -1.0), key(0.0, 0.5)]))
            .unwrap();
        assert_eq!(params.z_anim, vec![DepthKey::new(0.0, 0.5), DepthKey::new(300.0, -1.0)]);
    }
}
