#![forbid(unsafe_code)]

//! Deterministic draw-command renderer.
//!
//! [`render`] is a pure function of (document, selection, hover, drag
//! offset, settings, cache) to an ordered [`Scene`] of draw commands. It
//! handles no input and touches no pixels; a draw backend replays the
//! commands.
//!
//! The rotation convention is the hit tester's, stated once: rotated keys
//! are bracketed by [`DrawCommand::PushRotation`] carrying the pivot
//! resolved against the primary rectangle and the key's angle, exactly the
//! transform `kpl_core::geometry::hit_rotated_rect` inverts. Identical
//! inputs produce identical command lists, which is what makes canvas
//! snapshots and golden tests meaningful.

use rustc_hash::FxHashSet;
use tracing::trace;

use kpl_core::document::Keyboard;
use kpl_core::geometry::{Point, UnitRect};
use kpl_core::key::{
    Color, Key, KeyId, LegendAlign, NUM_LEGENDS, RenderKind, text_size_to_points,
};
use kpl_core::key::DEFAULT_TEXT_SIZE;
use kpl_core::stabilizer::stabilizer_points;

use crate::assets::AssetCache;

/// Default legend ink.
pub const DEFAULT_LEGEND_COLOR: &str = "#000000";

/// Homing-nub style, from the front-legend text convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NubKind {
    Scoop,
    Bar,
}

/// One draw call, in key units. Ordering within a [`Scene`] is the paint
/// order.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    /// Begin rotated drawing: translate to `pivot`, rotate by `angle_deg`,
    /// translate back. Balanced by [`DrawCommand::PopRotation`].
    PushRotation { pivot: Point, angle_deg: f64 },
    PopRotation,
    /// Primary key body.
    KeyBody {
        rect: UnitRect,
        color: Color,
        ghost: bool,
    },
    /// Secondary body of a compound key, same fill as the primary.
    SecondaryBody {
        rect: UnitRect,
        color: Color,
        ghost: bool,
    },
    /// Stepped-cap shading over the primary rectangle.
    SteppedShade { rect: UnitRect },
    /// Homing nub indicator.
    HomingNub { center: Point, kind: NubKind },
    /// LED indicator pseudo-key.
    LedGlow { rect: UnitRect, color: Color },
    /// Rotary-encoder pseudo-key.
    EncoderKnob { center: Point, radius: f64 },
    /// One face legend.
    Legend {
        position: Point,
        text: String,
        color: Color,
        size_pt: u32,
        font_family: String,
    },
    /// One front-printed legend.
    FrontLegend {
        position: Point,
        text: String,
        color: Color,
    },
    /// The always-last-drawn overlay legend.
    CenterLegend {
        position: Point,
        text: String,
        color: Color,
    },
    /// Stabilizer stem marker.
    StabilizerMark { center: Point },
    SelectionOutline { rect: UnitRect },
    HoverOutline { rect: UnitRect },
    /// Preview of a selected key at the in-progress drag offset.
    DragGhost { rect: UnitRect },
    /// In-progress box-select rectangle.
    BoxSelect { rect: UnitRect },
}

/// Renderer settings.
#[derive(Debug, Clone)]
pub struct RenderSettings {
    /// Draw stabilizer stem markers on wide keys.
    pub show_stabilizers: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            show_stabilizers: false,
        }
    }
}

/// Everything a render pass reads.
#[derive(Debug)]
pub struct RenderInput<'a> {
    pub keyboard: &'a Keyboard,
    pub selection: &'a FxHashSet<KeyId>,
    pub hover: Option<&'a KeyId>,
    /// In-progress drag offset in units, applied to selected keys.
    pub drag_offset: Option<(f64, f64)>,
    /// In-progress box-select rectangle in units.
    pub box_select: Option<UnitRect>,
    pub settings: &'a RenderSettings,
}

/// An ordered list of draw commands plus the layout envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub commands: Vec<DrawCommand>,
    /// Rendered layout bounds, for canvas sizing and fit-to-window.
    pub bounds: UnitRect,
}

/// Render the document to draw commands.
#[must_use]
pub fn render(input: &RenderInput<'_>, assets: &AssetCache) -> Scene {
    let mut commands = Vec::with_capacity(input.keyboard.keys.len() * 4);

    for key in &input.keyboard.keys {
        emit_key(&mut commands, key, assets, input.settings);
    }

    // Overlays follow the key bodies, in document order for determinism.
    for key in &input.keyboard.keys {
        if input.selection.contains(&key.id) {
            commands.push(DrawCommand::SelectionOutline {
                rect: key.rendered_bounds(),
            });
        }
    }
    if let Some(hover) = input.hover
        && let Some(key) = input.keyboard.key(hover)
    {
        commands.push(DrawCommand::HoverOutline {
            rect: key.rendered_bounds(),
        });
    }
    if let Some((dx, dy)) = input.drag_offset {
        for key in &input.keyboard.keys {
            if input.selection.contains(&key.id) {
                commands.push(DrawCommand::DragGhost {
                    rect: key.rendered_bounds().translated(dx, dy),
                });
            }
        }
    }
    if let Some(rect) = input.box_select {
        commands.push(DrawCommand::BoxSelect { rect });
    }

    let bounds = input.keyboard.layout_bounds().unwrap_or_default();
    trace!(commands = commands.len(), "scene built");
    Scene { commands, bounds }
}

/// A stable fingerprint of a scene for golden/determinism tests.
#[must_use]
pub fn fingerprint(scene: &Scene) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    format!("{scene:?}").hash(&mut hasher);
    hasher.finish()
}

// ---------------------------------------------------------------------------
// Per-key emission
// ---------------------------------------------------------------------------

fn emit_key(
    commands: &mut Vec<DrawCommand>,
    key: &Key,
    assets: &AssetCache,
    settings: &RenderSettings,
) {
    let kind = key.render_kind();
    let rect = key.rect();
    let rotated = !key.rotation.is_identity();
    if rotated {
        commands.push(DrawCommand::PushRotation {
            pivot: key.resolved_pivot(),
            angle_deg: key.rotation.angle_deg,
        });
    }

    match kind {
        RenderKind::Decal => {
            // Label-only: no body at all.
            emit_legends(commands, key, assets);
        }
        RenderKind::Ghost => {
            commands.push(DrawCommand::KeyBody {
                rect,
                color: key.color.clone(),
                ghost: true,
            });
            if let Some(second) = key.second_rect() {
                commands.push(DrawCommand::SecondaryBody {
                    rect: second,
                    color: key.color.clone(),
                    ghost: true,
                });
            }
            emit_legends(commands, key, assets);
        }
        RenderKind::Led => {
            commands.push(DrawCommand::LedGlow {
                rect,
                color: key.color.clone(),
            });
            emit_legends(commands, key, assets);
        }
        RenderKind::Encoder => {
            commands.push(DrawCommand::EncoderKnob {
                center: rect.center(),
                radius: rect.width.min(rect.height) * 0.4,
            });
            emit_legends(commands, key, assets);
        }
        RenderKind::Compound | RenderKind::Normal => {
            commands.push(DrawCommand::KeyBody {
                rect,
                color: key.color.clone(),
                ghost: false,
            });
            if let Some(second) = key.second_rect() {
                commands.push(DrawCommand::SecondaryBody {
                    rect: second,
                    color: key.color.clone(),
                    ghost: false,
                });
            }
            if key.stepped {
                commands.push(DrawCommand::SteppedShade { rect });
            }
            if key.nub {
                commands.push(DrawCommand::HomingNub {
                    center: rect.center(),
                    kind: nub_kind(key),
                });
            }
            emit_legends(commands, key, assets);
        }
    }

    if rotated {
        commands.push(DrawCommand::PopRotation);
    }

    // Stabilizer marks carry their own rotated positions, so they sit
    // outside the rotation bracket.
    if settings.show_stabilizers {
        for center in stabilizer_points(key) {
            commands.push(DrawCommand::StabilizerMark { center });
        }
    }
}

fn nub_kind(key: &Key) -> NubKind {
    if key.front_legends.iter().any(|t| t == "Bar") {
        NubKind::Bar
    } else {
        NubKind::Scoop
    }
}

fn emit_legends(commands: &mut Vec<DrawCommand>, key: &Key, assets: &AssetCache) {
    let rect = key.rect();
    let font_family = assets.font_family_or_fallback(&key.font).to_string();

    for slot in 0..NUM_LEGENDS {
        // Slots 4-6 are the front-print overlaps, drawn from front_legends.
        if (4..=6).contains(&slot) {
            continue;
        }
        let text = &key.labels[slot];
        if text.is_empty() {
            continue;
        }
        let size = key.text_size[slot].unwrap_or(DEFAULT_TEXT_SIZE);
        commands.push(DrawCommand::Legend {
            position: legend_anchor(rect, slot, key.align),
            text: text.clone(),
            color: legend_color(key, slot),
            size_pt: text_size_to_points(size),
            font_family: font_family.clone(),
        });
    }

    for (i, text) in key.front_legends.iter().enumerate() {
        if text.is_empty() {
            continue;
        }
        commands.push(DrawCommand::FrontLegend {
            position: front_anchor(rect, i, key.align),
            text: text.clone(),
            color: legend_color(key, 4 + i),
        });
    }

    if !key.center_legend.is_empty() {
        commands.push(DrawCommand::CenterLegend {
            position: rect.center(),
            text: key.center_legend.clone(),
            color: legend_color(key, 0),
        });
    }
}

fn legend_color(key: &Key, slot: usize) -> Color {
    key.text_color[slot]
        .clone()
        .unwrap_or_else(|| Color::new(DEFAULT_LEGEND_COLOR))
}

const COL_FRACTIONS: [f64; 3] = [0.1, 0.5, 0.9];
const ROW_FRACTIONS: [f64; 4] = [0.2, 0.5, 0.8, 0.95];

fn legend_anchor(rect: UnitRect, slot: usize, align: LegendAlign) -> Point {
    let col = slot % 3;
    let row = slot / 3;
    let fx = if align.contains(LegendAlign::H_CENTER) {
        0.5
    } else {
        COL_FRACTIONS[col]
    };
    let fy = if align.contains(LegendAlign::V_CENTER) {
        0.5
    } else {
        ROW_FRACTIONS[row]
    };
    Point::new(rect.x + fx * rect.width, rect.y + fy * rect.height)
}

fn front_anchor(rect: UnitRect, index: usize, align: LegendAlign) -> Point {
    let fx = if align.contains(LegendAlign::FRONT_CENTER) {
        0.5
    } else {
        COL_FRACTIONS[index]
    };
    Point::new(rect.x + fx * rect.width, rect.bottom())
}
