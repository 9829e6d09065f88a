#![forbid(unsafe_code)]

//! Rotation geometry for key placement, hit testing, and layout bounds.
//!
//! All coordinates are in key units (1 unit = one standard keycap pitch).
//! The forward rendering transform for a rotated key is
//! translate-to-pivot, rotate, translate-back; [`hit_rotated_rect`] applies
//! the exact inverse so hit testing can never desync from what is drawn.
//!
//! # Invariants
//!
//! 1. `unrotate_point(rotate_point(p, pivot, a), pivot, a) == p` up to float
//!    error for every pivot and angle.
//! 2. An implicit pivot ([`Pivot::KeyCenter`]) is resolved against the
//!    rectangle it rotates at every call site. It is never cached: moving the
//!    rectangle moves the effective pivot.
//! 3. [`reposition_for_pivot`] leaves the rendered center of the rectangle
//!    unchanged (within float tolerance) for any angle.

use serde::{Deserialize, Serialize};

/// A point in key units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// The unit-space origin.
    pub const ORIGIN: Self = Self { x: 0.0, y: 0.0 };

    /// Create a new point.
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    #[inline]
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Component-wise translation.
    #[inline]
    #[must_use]
    pub const fn translated(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// An axis-aligned rectangle in key units.
///
/// Unlike a pixel rect, edges are inclusive on all sides: a point exactly on
/// the border of a key still hits it.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct UnitRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl UnitRect {
    /// Create a new rectangle from its top-left corner and size.
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge.
    #[inline]
    #[must_use]
    pub const fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge.
    #[inline]
    #[must_use]
    pub const fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Geometric center.
    #[inline]
    #[must_use]
    pub const fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Check if a point lies inside the rectangle (edges inclusive).
    #[inline]
    #[must_use]
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    /// Check if this rectangle overlaps another at all.
    #[inline]
    #[must_use]
    pub fn intersects(&self, other: &UnitRect) -> bool {
        self.x <= other.right()
            && other.x <= self.right()
            && self.y <= other.bottom()
            && other.y <= self.bottom()
    }

    /// Check if this rectangle fully contains another.
    #[inline]
    #[must_use]
    pub fn encloses(&self, other: &UnitRect) -> bool {
        other.x >= self.x
            && other.right() <= self.right()
            && other.y >= self.y
            && other.bottom() <= self.bottom()
    }

    /// The smallest rectangle containing both.
    #[must_use]
    pub fn union(&self, other: &UnitRect) -> UnitRect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        UnitRect::new(x, y, right - x, bottom - y)
    }

    /// The rectangle moved by `(dx, dy)`.
    #[inline]
    #[must_use]
    pub const fn translated(&self, dx: f64, dy: f64) -> UnitRect {
        UnitRect::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Top-left corner.
    #[inline]
    #[must_use]
    pub const fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

// ---------------------------------------------------------------------------
// Pivot and rotation
// ---------------------------------------------------------------------------

/// The point a rotation is applied about.
///
/// `KeyCenter` is resolved against the rotated rectangle at every use.
/// A key whose pivot is `KeyCenter` carries its pivot with it when dragged;
/// an `Explicit` pivot stays put. Every consumer (renderer, hit tester,
/// pivot repositioning) must handle both cases.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pivot {
    /// Absolute unit coordinates, independent of the key's position.
    Explicit(Point),
    /// The key's own geometric center, recomputed from current geometry.
    #[default]
    KeyCenter,
}

impl Pivot {
    /// Resolve to absolute coordinates against the rectangle being rotated.
    #[inline]
    #[must_use]
    pub fn resolve(self, rect: UnitRect) -> Point {
        match self {
            Self::Explicit(p) => p,
            Self::KeyCenter => rect.center(),
        }
    }

    /// Whether the pivot is explicit (survives key movement unchanged).
    #[inline]
    #[must_use]
    pub const fn is_explicit(self) -> bool {
        matches!(self, Self::Explicit(_))
    }
}

/// Rotation state of a key: an angle in degrees plus a pivot.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rotation {
    /// Clockwise rotation in degrees; 0 = unrotated.
    pub angle_deg: f64,
    /// The point the rotation is applied about.
    pub pivot: Pivot,
}

impl Rotation {
    /// An unrotated state.
    pub const IDENTITY: Self = Self {
        angle_deg: 0.0,
        pivot: Pivot::KeyCenter,
    };

    /// Create a rotation about an explicit pivot.
    #[inline]
    #[must_use]
    pub const fn about(angle_deg: f64, pivot: Point) -> Self {
        Self {
            angle_deg,
            pivot: Pivot::Explicit(pivot),
        }
    }

    /// Create a rotation about the key's own center.
    #[inline]
    #[must_use]
    pub const fn centered(angle_deg: f64) -> Self {
        Self {
            angle_deg,
            pivot: Pivot::KeyCenter,
        }
    }

    /// Whether this rotation has no visual effect.
    #[inline]
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.angle_deg == 0.0
    }
}

// ---------------------------------------------------------------------------
// Transforms
// ---------------------------------------------------------------------------

/// Rotate `p` about `pivot` by `angle_deg` (the forward rendering transform).
#[must_use]
pub fn rotate_point(p: Point, pivot: Point, angle_deg: f64) -> Point {
    let rad = angle_deg.to_radians();
    let (sin, cos) = rad.sin_cos();
    let dx = p.x - pivot.x;
    let dy = p.y - pivot.y;
    Point::new(
        pivot.x + dx * cos - dy * sin,
        pivot.y + dx * sin + dy * cos,
    )
}

/// Exact inverse of [`rotate_point`].
#[inline]
#[must_use]
pub fn unrotate_point(p: Point, pivot: Point, angle_deg: f64) -> Point {
    rotate_point(p, pivot, -angle_deg)
}

/// Rotation-aware point-in-rectangle test.
///
/// Translates the query point into the rectangle's unrotated frame by
/// applying the inverse rotation, then performs a plain axis-aligned bounds
/// test. The fast path for identity rotations skips the trigonometry.
#[must_use]
pub fn hit_rotated_rect(p: Point, rect: UnitRect, rotation: Rotation) -> bool {
    if rotation.is_identity() {
        return rect.contains(p);
    }
    let pivot = rotation.pivot.resolve(rect);
    rect.contains(unrotate_point(p, pivot, rotation.angle_deg))
}

/// Axis-aligned envelope of a rectangle rotated about a pivot.
///
/// Used for canvas sizing and fit-to-window so rotated keys are not clipped.
#[must_use]
pub fn rotated_bbox(rect: UnitRect, rotation: Rotation) -> UnitRect {
    if rotation.is_identity() {
        return rect;
    }
    let pivot = rotation.pivot.resolve(rect);
    let corners = [
        Point::new(rect.x, rect.y),
        Point::new(rect.right(), rect.y),
        Point::new(rect.right(), rect.bottom()),
        Point::new(rect.x, rect.bottom()),
    ];
    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for corner in corners {
        let r = rotate_point(corner, pivot, rotation.angle_deg);
        min_x = min_x.min(r.x);
        min_y = min_y.min(r.y);
        max_x = max_x.max(r.x);
        max_y = max_y.max(r.y);
    }
    UnitRect::new(min_x, min_y, max_x - min_x, max_y - min_y)
}

/// New top-left for `rect` such that its rendered position is unchanged when
/// the rotation pivot moves to `new_pivot`.
///
/// The current center is rotated forward about the old pivot to find its true
/// on-screen position, then rotated backward about the new pivot to find
/// where the unrotated center must sit. With an identity rotation the
/// position is unchanged by definition.
#[must_use]
pub fn reposition_for_pivot(rect: UnitRect, rotation: Rotation, new_pivot: Point) -> Point {
    if rotation.is_identity() {
        return rect.origin();
    }
    let old_pivot = rotation.pivot.resolve(rect);
    let rendered_center = rotate_point(rect.center(), old_pivot, rotation.angle_deg);
    let new_center = unrotate_point(rendered_center, new_pivot, rotation.angle_deg);
    Point::new(
        new_center.x - rect.width / 2.0,
        new_center.y - rect.height / 2.0,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn assert_close(a: Point, b: Point, eps: f64) {
        assert!(
            (a.x - b.x).abs() < eps && (a.y - b.y).abs() < eps,
            "{a:?} != {b:?}"
        );
    }

    #[test]
    fn rotate_then_unrotate_is_identity() {
        let pivot = Point::new(2.5, -1.0);
        for angle in [0.0, 15.0, 45.0, 90.0, 180.0, 270.0, -37.5] {
            let p = Point::new(4.25, 3.0);
            let there = rotate_point(p, pivot, angle);
            let back = unrotate_point(there, pivot, angle);
            assert_close(back, p, EPS);
        }
    }

    #[test]
    fn rotate_quarter_turn() {
        let p = rotate_point(Point::new(1.0, 0.0), Point::ORIGIN, 90.0);
        assert_close(p, Point::new(0.0, 1.0), EPS);
    }

    #[test]
    fn rect_contains_edges() {
        let rect = UnitRect::new(1.0, 2.0, 2.0, 1.0);
        assert!(rect.contains(Point::new(1.0, 2.0)));
        assert!(rect.contains(Point::new(3.0, 3.0)));
        assert!(!rect.contains(Point::new(3.01, 3.0)));
    }

    #[test]
    fn hit_unrotated_fast_path() {
        let rect = UnitRect::new(0.0, 0.0, 2.0, 1.0);
        assert!(hit_rotated_rect(Point::new(1.0, 0.5), rect, Rotation::IDENTITY));
        assert!(!hit_rotated_rect(Point::new(2.5, 0.5), rect, Rotation::IDENTITY));
    }

    #[test]
    fn hit_rotated_center_always_hits() {
        let rect = UnitRect::new(3.0, 2.0, 2.0, 1.0);
        for angle in [0.0, 45.0, 90.0, 180.0] {
            for rotation in [
                Rotation::centered(angle),
                Rotation::about(angle, Point::new(1.0, 1.0)),
            ] {
                let pivot = rotation.pivot.resolve(rect);
                let rendered_center = rotate_point(rect.center(), pivot, angle);
                assert!(
                    hit_rotated_rect(rendered_center, rect, rotation),
                    "center missed at angle {angle} with {rotation:?}"
                );
            }
        }
    }

    #[test]
    fn hit_rotated_outside_envelope_misses() {
        let rect = UnitRect::new(0.0, 0.0, 2.0, 1.0);
        for angle in [45.0, 90.0, 180.0] {
            let rotation = Rotation::centered(angle);
            let envelope = rotated_bbox(rect, rotation);
            let outside = Point::new(envelope.right() + 0.05, envelope.bottom() + 0.05);
            assert!(!hit_rotated_rect(outside, rect, rotation));
        }
    }

    #[test]
    fn hit_rotated_corner_region() {
        // A 2x1 key rotated 45 deg about its center: the original corner
        // region of the AABB is now empty space.
        let rect = UnitRect::new(0.0, 0.0, 2.0, 1.0);
        let rotation = Rotation::centered(45.0);
        assert!(!hit_rotated_rect(Point::new(0.02, 0.02), rect, rotation));
        assert!(hit_rotated_rect(rect.center(), rect, rotation));
    }

    #[test]
    fn bbox_of_quarter_turn_swaps_dimensions() {
        let rect = UnitRect::new(0.0, 0.0, 2.0, 1.0);
        let bbox = rotated_bbox(rect, Rotation::centered(90.0));
        assert!((bbox.width - 1.0).abs() < EPS);
        assert!((bbox.height - 2.0).abs() < EPS);
        assert_close(bbox.center(), rect.center(), EPS);
    }

    #[test]
    fn bbox_about_explicit_pivot_moves() {
        let rect = UnitRect::new(2.0, 0.0, 1.0, 1.0);
        let bbox = rotated_bbox(rect, Rotation::about(90.0, Point::ORIGIN));
        // (2,0)-(3,1) rotated +90 about origin lands at (-1,2)-(0,3).
        assert!((bbox.x - -1.0).abs() < EPS);
        assert!((bbox.y - 2.0).abs() < EPS);
    }

    #[test]
    fn reposition_preserves_rendered_center() {
        let rect = UnitRect::new(4.0, 2.0, 1.5, 1.0);
        for angle in [30.0, 45.0, 90.0, 180.0] {
            for old in [
                Rotation::centered(angle),
                Rotation::about(angle, Point::new(1.0, 5.0)),
            ] {
                let new_pivot = Point::new(-2.0, 0.5);
                let old_rendered =
                    rotate_point(rect.center(), old.pivot.resolve(rect), angle);

                let origin = reposition_for_pivot(rect, old, new_pivot);
                let moved = UnitRect::new(origin.x, origin.y, rect.width, rect.height);
                let new_rendered = rotate_point(moved.center(), new_pivot, angle);

                assert_close(new_rendered, old_rendered, 1e-3);
            }
        }
    }

    #[test]
    fn reposition_is_noop_without_rotation() {
        let rect = UnitRect::new(4.0, 2.0, 1.5, 1.0);
        let origin = reposition_for_pivot(rect, Rotation::IDENTITY, Point::new(9.0, 9.0));
        assert_close(origin, rect.origin(), EPS);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn unrotate_inverts_rotate(
                px in -10.0..10.0f64,
                py in -10.0..10.0f64,
                qx in -10.0..10.0f64,
                qy in -10.0..10.0f64,
                angle in -360.0..360.0f64,
            ) {
                let pivot = Point::new(px, py);
                let p = Point::new(qx, qy);
                let back = unrotate_point(rotate_point(p, pivot, angle), pivot, angle);
                prop_assert!((back.x - p.x).abs() < 1e-6);
                prop_assert!((back.y - p.y).abs() < 1e-6);
            }

            #[test]
            fn bbox_contains_every_rotated_corner(
                x in -4.0..4.0f64,
                y in -4.0..4.0f64,
                w in 0.25..4.0f64,
                h in 0.25..4.0f64,
                angle in -360.0..360.0f64,
            ) {
                let rect = UnitRect::new(x, y, w, h);
                let rotation = Rotation::centered(angle);
                let bbox = rotated_bbox(rect, rotation);
                let pivot = rotation.pivot.resolve(rect);
                for corner in [
                    Point::new(rect.x, rect.y),
                    Point::new(rect.right(), rect.y),
                    Point::new(rect.right(), rect.bottom()),
                    Point::new(rect.x, rect.bottom()),
                ] {
                    let r = rotate_point(corner, pivot, angle);
                    prop_assert!(r.x >= bbox.x - 1e-9 && r.x <= bbox.right() + 1e-9);
                    prop_assert!(r.y >= bbox.y - 1e-9 && r.y <= bbox.bottom() + 1e-9);
                }
            }
        }
    }

    #[test]
    fn union_and_intersection_predicates() {
        let a = UnitRect::new(0.0, 0.0, 2.0, 2.0);
        let b = UnitRect::new(1.0, 1.0, 2.0, 2.0);
        let c = UnitRect::new(5.0, 5.0, 1.0, 1.0);
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
        assert!(a.encloses(&UnitRect::new(0.5, 0.5, 1.0, 1.0)));
        assert!(!a.encloses(&b));
        let u = a.union(&c);
        assert!((u.right() - 6.0).abs() < EPS);
        assert!((u.bottom() - 6.0).abs() < EPS);
    }
}
