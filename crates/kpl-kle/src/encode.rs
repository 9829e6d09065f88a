#![forbid(unsafe_code)]

//! KLE encode: [`Keyboard`] to row notation.
//!
//! The encoder is the decoder run in reverse: it drives the same
//! [`DecodeState`] machine, emitting for each key exactly the property
//! deltas that make the simulated cursor land on the key. Round-trips hold
//! by construction because both directions share one state machine.
//!
//! Emission rules that matter for interoperability:
//!
//! - Keys are sorted into rotation-then-position order; keys sharing an
//!   angle, pivot, and baseline become one row.
//! - The rotation triple `r`/`rx`/`ry` leads the first property object of a
//!   rotated row (field order in [`RawProps`] guarantees this).
//! - One-shot flags are emitted as `true` on every key that carries them,
//!   and explicitly re-emitted as `false` on the first following key that
//!   does not, so readers that treat them as persistent stay correct.

use serde_json::Value;
use tracing::debug;

use kpl_core::document::{Keyboard, Metadata};
use kpl_core::key::{Color, DEFAULT_TEXT_SIZE, Key, NUM_LEGENDS};

use crate::FormatError;
use crate::decode::{DecodeState, is_icon_label};
use crate::raw::{RawBackground, RawMetadata, RawProps};

const EPS: f64 = 1e-9;

/// Serialize a keyboard to KLE text (strict JSON, one top-level array).
pub fn serialize(keyboard: &Keyboard) -> Result<String, FormatError> {
    let value = serialize_value(keyboard)?;
    serde_json::to_string(&value).map_err(|e| FormatError::Syntax(e.to_string()))
}

/// Serialize a keyboard to the KLE JSON structure.
pub fn serialize_value(keyboard: &Keyboard) -> Result<Value, FormatError> {
    let mut entries: Vec<Value> = Vec::new();

    let meta = raw_metadata(&keyboard.meta);
    if meta != RawMetadata::default() {
        entries.push(
            serde_json::to_value(&meta).map_err(|e| FormatError::Syntax(e.to_string()))?,
        );
    }

    let mut keys: Vec<&Key> = keyboard.keys.iter().collect();
    keys.sort_by(|a, b| sort_key(a).partial_cmp(&sort_key(b)).unwrap_or(std::cmp::Ordering::Equal));

    let mut state = DecodeState::new();
    let mut edges = FlagEdges::default();
    let mut id_seq = 0u64;
    let mut row: Vec<Value> = Vec::new();
    let mut row_open = false;
    let mut current_sig: Option<(u64, u64, u64)> = None;

    for key in keys {
        let sig = rotation_signature(key);
        let needs_break = !row_open
            || current_sig != Some(sig)
            || (key.y - state.y).abs() > EPS
            || key.x + EPS < state.x;
        if needs_break {
            if row_open {
                entries.push(Value::Array(std::mem::take(&mut row)));
                state.end_row();
            }
            state.begin_row();
            row_open = true;
            current_sig = Some(sig);
        }

        let props = diff_props(key, &state, &mut edges);
        state.apply(&props, 0).map_err(|e| match e {
            FormatError::InvalidDimension { field, value, .. } => {
                FormatError::InvalidDimension { row: entries.len(), field, value }
            }
            other => other,
        })?;

        if !props.is_empty() {
            row.push(
                serde_json::to_value(&props)
                    .map_err(|e| FormatError::Syntax(e.to_string()))?,
            );
        }
        let label = wire_label(key);
        row.push(Value::String(label.clone()));

        // Advance the simulated cursor exactly the way the decoder will.
        let _ = state.build_key(&label, &mut id_seq);
    }
    if row_open {
        entries.push(Value::Array(row));
    }

    debug!(rows = entries.len(), "encoded layout");
    Ok(Value::Array(entries))
}

// ---------------------------------------------------------------------------
// Per-key diffing
// ---------------------------------------------------------------------------

/// Last key's one-shot flags, for falling-edge `false` re-emission.
#[derive(Debug, Clone, Copy, Default)]
struct FlagEdges {
    ghost: bool,
    nub: bool,
    stepped: bool,
    decal: bool,
}

fn diff_props(key: &Key, state: &DecodeState, edges: &mut FlagEdges) -> RawProps {
    let mut props = RawProps::default();

    let identity = key.rotation.is_identity();
    if identity {
        if state.angle != 0.0 {
            props.r = Some(0.0);
        }
    } else {
        let angle = key.rotation.angle_deg;
        let pivot = key.resolved_pivot();
        if state.angle != angle {
            props.r = Some(angle);
        }
        if state.px != Some(pivot.x) {
            props.rx = Some(pivot.x);
        }
        if state.py != Some(pivot.y) {
            props.ry = Some(pivot.y);
        }
    }

    // Emitting rx/ry re-homes the decoder cursor; predict where it lands so
    // the positional deltas come out right.
    let (sim_x, sim_y) = if props.rx.is_some() || props.ry.is_some() {
        (
            props.rx.unwrap_or(state.cluster_x),
            props.ry.unwrap_or(state.cluster_y),
        )
    } else {
        (state.x, state.y)
    };
    let dy = key.y - sim_y;
    if dy.abs() > EPS {
        props.y = Some(dy);
    }
    let dx = key.x - sim_x;
    if dx.abs() > EPS {
        props.x = Some(dx);
    }

    if (key.width - 1.0).abs() > EPS {
        props.w = Some(key.width);
    }
    if (key.height - 1.0).abs() > EPS {
        props.h = Some(key.height);
    }
    if let Some(second) = key.second {
        if second.x2.abs() > EPS {
            props.x2 = Some(second.x2);
        }
        if second.y2.abs() > EPS {
            props.y2 = Some(second.y2);
        }
        // Always emitted so the decoder sees a compound shape even when the
        // secondary rect matches the primary dimensions.
        props.w2 = Some(second.width2);
        props.h2 = Some(second.height2);
    }

    if key.color != state.color {
        props.c = Some(key.color.as_str().to_string());
    }
    let t_target = text_colors_wire(&key.text_color);
    if t_target != text_colors_wire(&state.text_colors) {
        props.t = Some(t_target);
    }
    if key.align != state.align {
        props.a = Some(key.align.bits());
    }
    let target_size = base_text_size(key).unwrap_or(DEFAULT_TEXT_SIZE);
    if target_size != state.default_size.unwrap_or(DEFAULT_TEXT_SIZE) {
        props.f = Some(target_size);
    }
    if key.profile != state.profile {
        props.p = Some(key.profile.as_wire().to_string());
    }

    // One-shot flags: `true` per flagged key, explicit `false` on the
    // falling edge for persistent-flag readers.
    if key.ghost {
        props.g = Some(true);
    } else if edges.ghost {
        props.g = Some(false);
    }
    if key.nub {
        props.n = Some(true);
    } else if edges.nub {
        props.n = Some(false);
    }
    if key.stepped {
        props.l = Some(true);
    } else if edges.stepped {
        props.l = Some(false);
    }
    if key.decal {
        props.d = Some(true);
    } else if edges.decal {
        props.d = Some(false);
    }
    *edges = FlagEdges {
        ghost: key.ghost,
        nub: key.nub,
        stepped: key.stepped,
        decal: key.decal,
    };

    props
}

/// Sort keys into encode order: rotation group, then reading order.
fn sort_key(key: &Key) -> (f64, f64, f64, f64, f64) {
    if key.rotation.is_identity() {
        (0.0, 0.0, 0.0, key.y, key.x)
    } else {
        let pivot = key.resolved_pivot();
        (key.rotation.angle_deg, pivot.x, pivot.y, key.y, key.x)
    }
}

fn rotation_signature(key: &Key) -> (u64, u64, u64) {
    if key.rotation.is_identity() {
        (0.0f64.to_bits(), 0.0f64.to_bits(), 0.0f64.to_bits())
    } else {
        let pivot = key.resolved_pivot();
        (
            key.rotation.angle_deg.to_bits(),
            pivot.x.to_bits(),
            pivot.y.to_bits(),
        )
    }
}

/// The key's base (non-icon) legend text size.
fn base_text_size(key: &Key) -> Option<u8> {
    for slot in 0..NUM_LEGENDS {
        if !is_icon_label(&key.labels[slot]) {
            return key.text_size[slot];
        }
    }
    None
}

fn text_colors_wire(colors: &[Option<Color>; NUM_LEGENDS]) -> String {
    let last = match colors.iter().rposition(Option::is_some) {
        Some(i) => i,
        None => return String::new(),
    };
    let mut lines: Vec<&str> = Vec::with_capacity(last + 1);
    for color in &colors[..=last] {
        lines.push(color.as_ref().map_or("", Color::as_str));
    }
    lines.join("\n")
}

/// The wire label: legend slots joined by newlines, with front-printed
/// legends written through their overlapping slots (4-6).
fn wire_label(key: &Key) -> String {
    let mut slots = key.labels.clone();
    for (i, front) in key.front_legends.iter().enumerate() {
        if !front.is_empty() {
            slots[4 + i] = front.clone();
        }
    }
    let last = match slots.iter().rposition(|s| !s.is_empty()) {
        Some(i) => i,
        None => return String::new(),
    };
    slots[..=last].join("\n")
}

fn raw_metadata(meta: &Metadata) -> RawMetadata {
    fn opt(s: &str) -> Option<String> {
        (!s.is_empty()).then(|| s.to_string())
    }
    RawMetadata {
        name: opt(&meta.name),
        author: opt(&meta.author),
        notes: opt(&meta.notes),
        background: meta.background.as_ref().map(|b| RawBackground {
            name: opt(&b.name),
            style: opt(&b.style),
        }),
        radii: opt(&meta.radii),
        switch_mount: opt(&meta.switch_mount),
        switch_brand: opt(&meta.switch_brand),
        switch_type: opt(&meta.switch_type),
        plate: meta.plate.then_some(true),
        pcb: meta.pcb.then_some(true),
        css: opt(&meta.css),
    }
}
