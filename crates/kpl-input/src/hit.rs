#![forbid(unsafe_code)]

//! Rotation-aware hit testing over the key list.
//!
//! Keys are tested in reverse z-order (last added draws last, so it is
//! topmost) and the first hit wins. Unrotated keys take a plain bounds
//! check; rotated keys go through the inverse-rotation test, which exactly
//! inverts the renderer's forward transform.

use kpl_core::document::Keyboard;
use kpl_core::geometry::{Pivot, Point, Rotation, hit_rotated_rect};
use kpl_core::key::{Key, KeyId};
pub use kpl_core::stabilizer::stabilizer_points;

/// Whether a point (in units) lands on a key as rendered.
///
/// The pivot is resolved once against the primary rectangle and shared by
/// the secondary rectangle, matching the draw transform for compound keys.
#[must_use]
pub fn key_contains(key: &Key, point: Point) -> bool {
    let rotation = Rotation {
        angle_deg: key.rotation.angle_deg,
        pivot: Pivot::Explicit(key.resolved_pivot()),
    };
    if hit_rotated_rect(point, key.rect(), rotation) {
        return true;
    }
    key.second_rect()
        .is_some_and(|second| hit_rotated_rect(point, second, rotation))
}

/// Topmost key under a point, or `None` over empty canvas.
#[must_use]
pub fn hit_test(keyboard: &Keyboard, point: Point) -> Option<&Key> {
    keyboard.keys.iter().rev().find(|k| key_contains(k, point))
}

/// A stabilizer's absolute rendered position on a key.
#[derive(Debug, Clone, PartialEq)]
pub struct StabilizerHit {
    pub key: KeyId,
    pub position: Point,
}

/// Topmost stabilizer within `radius` units of a point.
#[must_use]
pub fn hit_stabilizer(keyboard: &Keyboard, point: Point, radius: f64) -> Option<StabilizerHit> {
    for key in keyboard.keys.iter().rev() {
        for position in stabilizer_points(key) {
            if position.distance(point) <= radius {
                return Some(StabilizerHit {
                    key: key.id.clone(),
                    position,
                });
            }
        }
    }
    None
}
