#![forbid(unsafe_code)]

//! The key data model: one physical key-cap region.
//!
//! A [`Key`] is a plain-data record. Geometry lives in its primary rectangle
//! plus an optional secondary rectangle for compound shapes (ISO Enter,
//! stepped caps, oversized Enter variants). Appearance and legends are
//! editor-facing state the renderer and codec both consume.
//!
//! # Invariants
//!
//! 1. `width` and `height` never drop below [`MIN_KEY_SIZE`]; mutation paths
//!    in the document model clamp or reject.
//! 2. `labels` has exactly [`NUM_LEGENDS`] logical slots.
//! 3. A `decal` key has no stabilizers and is excluded from bounds-based
//!    layout algorithms that shift sibling keys.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::geometry::{Pivot, Point, Rotation, UnitRect, rotated_bbox};

/// Number of legend slots on a key face (3x4 canonical grid).
pub const NUM_LEGENDS: usize = 12;

/// Number of front-printed legend slots (left/center/right).
pub const NUM_FRONT_LEGENDS: usize = 3;

/// Smallest width/height a key may have, in units.
pub const MIN_KEY_SIZE: f64 = 0.25;

/// Default keycap fill color.
pub const DEFAULT_KEY_COLOR: &str = "#cccccc";

/// Default legend text size (1-9 scale).
pub const DEFAULT_TEXT_SIZE: u8 = 3;

/// Map a 1-9 legend text size to a point size.
#[inline]
#[must_use]
pub const fn text_size_to_points(size: u8) -> u32 {
    6 + 2 * size as u32
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Opaque unique key identifier, stable for the key's lifetime.
///
/// Ids are minted by the document and never reused; clones always get a
/// fresh id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyId(String);

impl KeyId {
    /// Wrap a raw id string.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The raw id string.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for KeyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Appearance
// ---------------------------------------------------------------------------

/// A color as a `#rrggbb` hex string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color(String);

impl Color {
    /// Wrap a hex color string.
    #[must_use]
    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// The hex string.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Color {
    fn default() -> Self {
        Self(DEFAULT_KEY_COLOR.to_string())
    }
}

/// Legend font family id. The renderer resolves it through its asset cache;
/// unresolved fonts fall back to the system font.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FontId(String);

impl FontId {
    /// Wrap a font family id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw id.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for FontId {
    fn default() -> Self {
        Self("system".to_string())
    }
}

/// Keycap profile tag.
///
/// Also carries the non-physical marker values `Led` and `Encoder` used for
/// indicator and rotary-encoder pseudo-keys.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    #[default]
    Unspecified,
    Sa,
    Dsa,
    Dcs,
    Oem,
    Cherry,
    Xda,
    Flat,
    Led,
    Encoder,
    /// Any profile string the editor does not recognize, kept verbatim.
    Other(String),
}

impl Profile {
    /// Parse a wire profile string, case-insensitively. Values the editor
    /// does not recognize (including row-suffixed forms like `"SA R1"`) are
    /// preserved verbatim.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::Unspecified;
        }
        match trimmed.to_ascii_uppercase().as_str() {
            "SA" => Self::Sa,
            "DSA" => Self::Dsa,
            "DCS" => Self::Dcs,
            "OEM" => Self::Oem,
            "CHERRY" => Self::Cherry,
            "XDA" => Self::Xda,
            "FLAT" => Self::Flat,
            "LED" => Self::Led,
            "ENCODER" => Self::Encoder,
            _ => Self::Other(trimmed.to_string()),
        }
    }

    /// Wire representation.
    #[must_use]
    pub fn as_wire(&self) -> &str {
        match self {
            Self::Unspecified => "",
            Self::Sa => "SA",
            Self::Dsa => "DSA",
            Self::Dcs => "DCS",
            Self::Oem => "OEM",
            Self::Cherry => "CHERRY",
            Self::Xda => "XDA",
            Self::Flat => "FLAT",
            Self::Led => "LED",
            Self::Encoder => "ENCODER",
            Self::Other(s) => s,
        }
    }

    /// Whether this is a non-physical marker (LED or encoder pseudo-key).
    #[inline]
    #[must_use]
    pub const fn is_marker(&self) -> bool {
        matches!(self, Self::Led | Self::Encoder)
    }
}

bitflags! {
    /// Legend alignment bit-field.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct LegendAlign: u8 {
        /// Center legends horizontally.
        const H_CENTER = 1;
        /// Center legends vertically.
        const V_CENTER = 1 << 1;
        /// Center front-printed legends.
        const FRONT_CENTER = 1 << 2;
    }
}

// Serialized as the raw bits, matching the wire format's `a` value.
impl Serialize for LegendAlign {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.bits())
    }
}

impl<'de> Deserialize<'de> for LegendAlign {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self::from_bits_truncate(u8::deserialize(deserializer)?))
    }
}

// ---------------------------------------------------------------------------
// Shape
// ---------------------------------------------------------------------------

/// Auxiliary rectangle of a compound key, relative to the primary origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SecondRect {
    /// Horizontal offset from the primary rectangle's origin.
    pub x2: f64,
    /// Vertical offset from the primary rectangle's origin.
    pub y2: f64,
    pub width2: f64,
    pub height2: f64,
}

/// Render/hit-test classification of a key, derived once from its flags.
///
/// Centralizing the branching here keeps the renderer and the hit tester
/// from drifting apart in their per-key-type conditionals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderKind {
    /// Label-only visual element, no physical key body.
    Decal,
    /// Translucent non-physical reference key.
    Ghost,
    /// LED indicator pseudo-key.
    Led,
    /// Rotary encoder pseudo-key.
    Encoder,
    /// Two-rectangle compound shape.
    Compound,
    /// Ordinary rectangular key.
    Normal,
}

// ---------------------------------------------------------------------------
// Key
// ---------------------------------------------------------------------------

/// One physical key-cap region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Key {
    pub id: KeyId,

    // Primary rectangle (units, top-left origin).
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,

    /// Secondary rectangle for compound shapes.
    pub second: Option<SecondRect>,

    pub rotation: Rotation,

    pub color: Color,
    /// Per-legend text color, sparse.
    pub text_color: [Option<Color>; NUM_LEGENDS],
    /// Per-legend text size (1-9 scale), sparse.
    pub text_size: [Option<u8>; NUM_LEGENDS],
    pub profile: Profile,
    pub font: FontId,

    /// Legends indexed by the canonical 3x4 grid position.
    pub labels: [String; NUM_LEGENDS],
    /// Front-printed legends (left/center/right).
    pub front_legends: [String; NUM_FRONT_LEGENDS],
    /// Always-last-drawn overlay legend.
    pub center_legend: String,

    pub ghost: bool,
    pub decal: bool,
    pub stepped: bool,
    pub nub: bool,

    pub align: LegendAlign,
}

impl Key {
    /// Create a default 1x1 key at the origin.
    #[must_use]
    pub fn new(id: KeyId) -> Self {
        Self {
            id,
            x: 0.0,
            y: 0.0,
            width: 1.0,
            height: 1.0,
            second: None,
            rotation: Rotation::IDENTITY,
            color: Color::default(),
            text_color: Default::default(),
            text_size: Default::default(),
            profile: Profile::default(),
            font: FontId::default(),
            labels: Default::default(),
            front_legends: Default::default(),
            center_legend: String::new(),
            ghost: false,
            decal: false,
            stepped: false,
            nub: false,
            align: LegendAlign::empty(),
        }
    }

    /// Builder-style position.
    #[must_use]
    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    /// Builder-style size.
    #[must_use]
    pub fn sized(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Builder-style rotation.
    #[must_use]
    pub fn rotated(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    /// Builder-style primary legend (slot 0).
    #[must_use]
    pub fn labeled(mut self, text: impl Into<String>) -> Self {
        self.labels[0] = text.into();
        self
    }

    /// The primary rectangle.
    #[inline]
    #[must_use]
    pub const fn rect(&self) -> UnitRect {
        UnitRect::new(self.x, self.y, self.width, self.height)
    }

    /// The secondary rectangle in absolute coordinates, if present.
    #[must_use]
    pub fn second_rect(&self) -> Option<UnitRect> {
        self.second.map(|s| {
            UnitRect::new(self.x + s.x2, self.y + s.y2, s.width2, s.height2)
        })
    }

    /// Unrotated envelope of primary and secondary rectangles.
    #[must_use]
    pub fn bounding_rect(&self) -> UnitRect {
        match self.second_rect() {
            Some(second) => self.rect().union(&second),
            None => self.rect(),
        }
    }

    /// The rotation pivot in absolute coordinates.
    ///
    /// An implicit pivot resolves against the primary rectangle, so it must
    /// be recomputed after every move.
    #[inline]
    #[must_use]
    pub fn resolved_pivot(&self) -> Point {
        self.rotation.pivot.resolve(self.rect())
    }

    /// Axis-aligned envelope of the key as rendered (rotation applied).
    ///
    /// The pivot is resolved once against the primary rectangle and shared
    /// by the secondary rectangle, matching the renderer's transform.
    #[must_use]
    pub fn rendered_bounds(&self) -> UnitRect {
        let rotation = Rotation {
            angle_deg: self.rotation.angle_deg,
            pivot: Pivot::Explicit(self.resolved_pivot()),
        };
        rotated_bbox(self.bounding_rect(), rotation)
    }

    /// Whether the key needs two rectangles to draw.
    #[inline]
    #[must_use]
    pub const fn is_compound(&self) -> bool {
        self.second.is_some()
    }

    /// Derive the render/hit-test classification from flags and profile.
    #[must_use]
    pub fn render_kind(&self) -> RenderKind {
        if self.decal {
            RenderKind::Decal
        } else if self.ghost {
            RenderKind::Ghost
        } else if self.profile == Profile::Led {
            RenderKind::Led
        } else if self.profile == Profile::Encoder {
            RenderKind::Encoder
        } else if self.is_compound() {
            RenderKind::Compound
        } else {
            RenderKind::Normal
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(id: &str) -> Key {
        Key::new(KeyId::new(id))
    }

    #[test]
    fn default_key_is_unit_square() {
        let k = key("k1");
        assert_eq!(k.rect(), UnitRect::new(0.0, 0.0, 1.0, 1.0));
        assert!(!k.is_compound());
        assert_eq!(k.render_kind(), RenderKind::Normal);
    }

    #[test]
    fn second_rect_is_relative_to_primary() {
        let mut k = key("k1").at(3.0, 2.0);
        k.second = Some(SecondRect {
            x2: -0.25,
            y2: 0.0,
            width2: 1.5,
            height2: 1.0,
        });
        let second = k.second_rect().unwrap();
        assert_eq!(second, UnitRect::new(2.75, 2.0, 1.5, 1.0));
        let bounds = k.bounding_rect();
        assert_eq!(bounds.x, 2.75);
        assert_eq!(bounds.right(), 4.25);
    }

    #[test]
    fn render_kind_precedence() {
        let mut k = key("k1");
        k.second = Some(SecondRect {
            x2: 0.0,
            y2: 0.0,
            width2: 1.0,
            height2: 2.0,
        });
        assert_eq!(k.render_kind(), RenderKind::Compound);
        k.profile = Profile::Led;
        assert_eq!(k.render_kind(), RenderKind::Led);
        k.ghost = true;
        assert_eq!(k.render_kind(), RenderKind::Ghost);
        k.decal = true;
        assert_eq!(k.render_kind(), RenderKind::Decal);
    }

    #[test]
    fn implicit_pivot_follows_the_key() {
        let mut k = key("k1").sized(2.0, 1.0).rotated(Rotation::centered(90.0));
        let before = k.resolved_pivot();
        k.x += 3.0;
        let after = k.resolved_pivot();
        assert!((after.x - before.x - 3.0).abs() < 1e-9);
    }

    #[test]
    fn explicit_pivot_stays_put() {
        let mut k = key("k1").rotated(Rotation::about(45.0, Point::new(1.0, 1.0)));
        let before = k.resolved_pivot();
        k.x += 3.0;
        assert_eq!(k.resolved_pivot(), before);
    }

    #[test]
    fn profile_parse_roundtrip() {
        for raw in ["SA", "DSA", "DCS", "OEM", "CHERRY", "XDA", "FLAT", "LED", "ENCODER"] {
            assert_eq!(Profile::parse(raw).as_wire(), raw);
        }
        assert_eq!(Profile::parse(""), Profile::Unspecified);
        assert_eq!(Profile::parse("sa"), Profile::Sa);
        // Row-suffixed profiles keep their full wire form.
        assert_eq!(Profile::parse("SA R1"), Profile::Other("SA R1".to_string()));
    }

    #[test]
    fn text_size_mapping() {
        assert_eq!(text_size_to_points(1), 8);
        assert_eq!(text_size_to_points(3), 12);
        assert_eq!(text_size_to_points(9), 24);
    }

    #[test]
    fn align_bits() {
        let a = LegendAlign::H_CENTER | LegendAlign::FRONT_CENTER;
        assert!(a.contains(LegendAlign::H_CENTER));
        assert!(!a.contains(LegendAlign::V_CENTER));
        assert_eq!(a.bits(), 0b101);
    }
}
