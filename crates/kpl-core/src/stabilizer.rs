#![forbid(unsafe_code)]

//! Stabilizer position table.
//!
//! Wide keys need physical support stabilizers under the cap; where they sit
//! is a layout-geometry fact independent of rendering style. Positions are
//! returned normalized to the key's unrotated bounding box (0-1 on both
//! axes), so callers can denormalize and apply the key's rotation with the
//! same transform the renderer uses.
//!
//! Stem spread per width band follows the standard plate-mount conventions:
//!
//! | width        | stem spread (units) |
//! |--------------|---------------------|
//! | >= 7u        | 6.0                 |
//! | >= 6.25u     | 5.25                |
//! | >= 6u        | 5.0                 |
//! | 3u - 6u      | 2.0                 |
//! | 2u - 3u      | 1.25                |
//!
//! L-shaped keys (ISO Enter, Big-Ass Enter, mini-ISO) get asymmetric
//! handling: the stabilizer sits on the long leg, offset from the bounding
//! box center toward that leg.

use smallvec::SmallVec;

use crate::geometry::{Point, rotate_point};
use crate::key::Key;

/// Stabilizer positions, normalized to the key's unrotated bounding box.
pub type StabPositions = SmallVec<[Point; 2]>;

/// Shape classification for stabilizer placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShapeClass {
    Rect,
    /// Tall narrow leg with a wider top row (secondary extends left/up).
    IsoEnter,
    /// Wide bottom leg below a narrower top (secondary extends down).
    BigAssEnter,
    /// ISO-like compound shorter than 2u; too small for a stabilizer.
    MiniIso,
}

fn classify(key: &Key) -> ShapeClass {
    let Some(second) = key.second else {
        return ShapeClass::Rect;
    };
    if second.y2 > 0.0 {
        ShapeClass::BigAssEnter
    } else if key.height >= 2.0 {
        ShapeClass::IsoEnter
    } else if second.width2 > key.width || second.height2 > key.height {
        ShapeClass::MiniIso
    } else {
        ShapeClass::Rect
    }
}

/// Stem spread in units for a straight key of the given width, or `None`
/// when the key is too narrow to need a stabilizer.
fn spread_for_width(width: f64) -> Option<f64> {
    if width >= 7.0 {
        Some(6.0)
    } else if width >= 6.25 {
        Some(5.25)
    } else if width >= 6.0 {
        Some(5.0)
    } else if width >= 3.0 {
        Some(2.0)
    } else if width >= 2.0 {
        Some(1.25)
    } else {
        None
    }
}

/// Expected stabilizer positions for a key, normalized to its unrotated
/// bounding box. Decals and ghost keys are non-physical and return none.
#[must_use]
pub fn stabilizer_positions(key: &Key) -> StabPositions {
    let mut out = StabPositions::new();
    if key.decal || key.ghost {
        return out;
    }

    let bounds = key.bounding_rect();
    match classify(key) {
        ShapeClass::Rect => {
            if let Some(spread) = spread_for_width(key.width) {
                let dx = spread / (2.0 * bounds.width);
                out.push(Point::new(0.5 - dx, 0.5));
                out.push(Point::new(0.5 + dx, 0.5));
            }
        }
        ShapeClass::IsoEnter => {
            // Vertical stabilizer on the tall (primary) leg: 2u-equivalent
            // spread along the height, x centered on the primary rect. The
            // x offset is asymmetric within the bounding box because the
            // short leg widens one side only.
            let spread = 1.25;
            let x = (key.x + key.width / 2.0 - bounds.x) / bounds.width;
            let dy = spread / (2.0 * bounds.height);
            out.push(Point::new(x, 0.5 - dy));
            out.push(Point::new(x, 0.5 + dy));
        }
        ShapeClass::BigAssEnter => {
            // Horizontal stabilizer along the wide bottom leg.
            if let Some(second) = key.second
                && let Some(spread) = spread_for_width(second.width2)
            {
                let center_x = key.x + second.x2 + second.width2 / 2.0;
                let center_y = key.y + second.y2 + second.height2 / 2.0;
                let x = (center_x - bounds.x) / bounds.width;
                let y = (center_y - bounds.y) / bounds.height;
                let dx = spread / (2.0 * bounds.width);
                out.push(Point::new(x - dx, y));
                out.push(Point::new(x + dx, y));
            }
        }
        ShapeClass::MiniIso => {}
    }
    out
}

/// Stabilizer positions in absolute units with the key's rotation applied,
/// matching the renderer's transform.
#[must_use]
pub fn stabilizer_points(key: &Key) -> StabPositions {
    let bounds = key.bounding_rect();
    let pivot = key.resolved_pivot();
    stabilizer_positions(key)
        .into_iter()
        .map(|n| {
            let p = Point::new(
                bounds.x + n.x * bounds.width,
                bounds.y + n.y * bounds.height,
            );
            rotate_point(p, pivot, key.rotation.angle_deg)
        })
        .collect()
}
