#![forbid(unsafe_code)]

//! KLE decode: row notation to [`Keyboard`].
//!
//! The format is stateful and order-dependent: a row is scanned left to
//! right, property objects mutate a running state record, and each label
//! string terminates a key built from that state. Property objects are
//! always deltas, never absolute resets.
//!
//! [`DecodeState`] is an explicit accumulator passed functionally rather
//! than closure-captured state, so decode stays reentrant and testable per
//! row. The encoder drives the same state machine in reverse, which is what
//! makes round-trips hold by construction.
//!
//! # Invariants
//!
//! 1. Positional `x`/`y` values are additive offsets on the cursor.
//! 2. Setting `rx`/`ry` resets the cursor to the rotation cluster origin and
//!    starts a fresh row-height count; an `x`/`y` delta in the same object
//!    applies after the reset.
//! 3. One-shot fields (`w`, `h`, secondary rect, `g`/`n`/`l`/`d`) reset
//!    after every key; persistent fields (color, text defaults, profile,
//!    alignment, rotation) carry to the next key.
//! 4. A row that pulls itself up with a negative `y` delta does not push the
//!    next row down by a full unit.
//! 5. Decode is all-or-nothing: any error leaves no partial document.

use serde_json::Value;
use tracing::debug;

use kpl_core::document::{Background, Keyboard, Metadata};
use kpl_core::geometry::{Point, Rotation};
use kpl_core::key::{
    Color, Key, KeyId, LegendAlign, NUM_LEGENDS, Profile, SecondRect,
};

use crate::FormatError;
use crate::raw::{RawMetadata, RawProps, parse_root, type_name};

/// Whether a legend slot holds webfont/icon markup rather than plain text.
///
/// Icon legends get their text size pinned so glyphs render at a legible
/// size regardless of the running default.
#[must_use]
pub(crate) fn is_icon_label(label: &str) -> bool {
    label.contains("<i ") || label.contains("<img")
}

/// Text size applied to icon legend slots.
pub(crate) const ICON_TEXT_SIZE: u8 = 9;

// ---------------------------------------------------------------------------
// Running state
// ---------------------------------------------------------------------------

/// The running state record carried across keys within a row-scanning pass.
#[derive(Debug, Clone)]
pub(crate) struct DecodeState {
    // Cursor.
    pub x: f64,
    pub y: f64,
    /// Rotation cluster origin; the x cursor returns here at row start.
    pub cluster_x: f64,
    pub cluster_y: f64,
    /// Baseline for the current row's vertical advance.
    pub row_y_base: f64,
    /// Most negative explicit `y` delta seen since the baseline was set.
    pub min_dy: f64,

    // One-shot (reset after each key).
    pub width: f64,
    pub height: f64,
    pub x2: f64,
    pub y2: f64,
    pub w2: Option<f64>,
    pub h2: Option<f64>,
    pub second_set: bool,
    pub ghost: bool,
    pub nub: bool,
    pub stepped: bool,
    pub decal: bool,

    // Persistent (until changed).
    pub angle: f64,
    pub px: Option<f64>,
    pub py: Option<f64>,
    pub color: Color,
    pub text_colors: [Option<Color>; NUM_LEGENDS],
    pub default_size: Option<u8>,
    pub profile: Profile,
    pub align: LegendAlign,
}

impl DecodeState {
    pub(crate) fn new() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            cluster_x: 0.0,
            cluster_y: 0.0,
            row_y_base: 0.0,
            min_dy: 0.0,
            width: 1.0,
            height: 1.0,
            x2: 0.0,
            y2: 0.0,
            w2: None,
            h2: None,
            second_set: false,
            ghost: false,
            nub: false,
            stepped: false,
            decal: false,
            angle: 0.0,
            px: None,
            py: None,
            color: Color::default(),
            text_colors: Default::default(),
            default_size: None,
            profile: Profile::default(),
            align: LegendAlign::empty(),
        }
    }

    /// Reset the x cursor to the cluster origin for a new row.
    pub(crate) fn begin_row(&mut self) {
        self.x = self.cluster_x;
    }

    /// Apply one property-delta object.
    pub(crate) fn apply(&mut self, props: &RawProps, row: usize) -> Result<(), FormatError> {
        if let Some(angle) = props.r {
            self.angle = angle;
        }
        // An explicit pivot re-homes the cursor and starts a fresh
        // row-height count; x/y deltas in the same object apply afterwards.
        if props.rx.is_some() || props.ry.is_some() {
            if let Some(rx) = props.rx {
                self.px = Some(rx);
                self.cluster_x = rx;
            }
            if let Some(ry) = props.ry {
                self.py = Some(ry);
                self.cluster_y = ry;
            }
            self.x = self.cluster_x;
            self.y = self.cluster_y;
            self.row_y_base = self.y;
            self.min_dy = 0.0;
        }
        if let Some(dy) = props.y {
            self.y += dy;
            self.min_dy = self.min_dy.min(dy);
        }
        if let Some(dx) = props.x {
            self.x += dx;
        }

        if let Some(w) = props.w {
            if w <= 0.0 {
                return Err(FormatError::InvalidDimension {
                    row,
                    field: "w",
                    value: w,
                });
            }
            self.width = w;
        }
        if let Some(h) = props.h {
            if h <= 0.0 {
                return Err(FormatError::InvalidDimension {
                    row,
                    field: "h",
                    value: h,
                });
            }
            self.height = h;
        }
        if let Some(x2) = props.x2 {
            self.x2 = x2;
            self.second_set = true;
        }
        if let Some(y2) = props.y2 {
            self.y2 = y2;
            self.second_set = true;
        }
        if let Some(w2) = props.w2 {
            if w2 <= 0.0 {
                return Err(FormatError::InvalidDimension {
                    row,
                    field: "w2",
                    value: w2,
                });
            }
            self.w2 = Some(w2);
            self.second_set = true;
        }
        if let Some(h2) = props.h2 {
            if h2 <= 0.0 {
                return Err(FormatError::InvalidDimension {
                    row,
                    field: "h2",
                    value: h2,
                });
            }
            self.h2 = Some(h2);
            self.second_set = true;
        }

        if let Some(ref c) = props.c {
            self.color = Color::new(c.clone());
        }
        if let Some(ref t) = props.t {
            self.text_colors = parse_text_colors(t);
        }
        if let Some(g) = props.g {
            self.ghost = g;
        }
        if let Some(a) = props.a {
            self.align = LegendAlign::from_bits_truncate(a);
        }
        if let Some(f) = props.f {
            self.default_size = Some(f.clamp(1, 9));
        }
        if let Some(ref p) = props.p {
            self.profile = Profile::parse(p);
        }
        if let Some(n) = props.n {
            self.nub = n;
        }
        if let Some(l) = props.l {
            self.stepped = l;
        }
        if let Some(d) = props.d {
            self.decal = d;
        }
        Ok(())
    }

    /// Terminate a key: build it from the accumulated state, advance the x
    /// cursor past it, and reset the one-shot fields.
    pub(crate) fn build_key(&mut self, label: &str, id_seq: &mut u64) -> Key {
        let id = KeyId::new(format!("k{}", *id_seq));
        *id_seq += 1;

        let mut key = Key::new(id).at(self.x, self.y).sized(self.width, self.height);

        for (slot, text) in label.splitn(NUM_LEGENDS, '\n').enumerate() {
            key.labels[slot] = text.to_string();
        }
        // Front-printed legends overlap label slots 4-6.
        for i in 0..key.front_legends.len() {
            key.front_legends[i] = key.labels[4 + i].clone();
        }

        if self.second_set {
            key.second = Some(SecondRect {
                x2: self.x2,
                y2: self.y2,
                width2: self.w2.unwrap_or(self.width),
                height2: self.h2.unwrap_or(self.height),
            });
        }

        key.rotation = if self.angle == 0.0 {
            Rotation::IDENTITY
        } else {
            match (self.px, self.py) {
                (None, None) => Rotation::centered(self.angle),
                (px, py) => Rotation::about(
                    self.angle,
                    Point::new(px.unwrap_or(0.0), py.unwrap_or(0.0)),
                ),
            }
        };

        key.color = self.color.clone();
        key.text_color = self.text_colors.clone();
        for slot in 0..NUM_LEGENDS {
            key.text_size[slot] = if is_icon_label(&key.labels[slot]) {
                Some(ICON_TEXT_SIZE)
            } else {
                self.default_size
            };
        }
        key.profile = self.profile.clone();
        key.align = self.align;
        key.ghost = self.ghost;
        key.nub = self.nub;
        key.stepped = self.stepped;
        key.decal = self.decal;

        // Advance past the key and reset the one-shot fields.
        self.x += self.width;
        self.width = 1.0;
        self.height = 1.0;
        self.x2 = 0.0;
        self.y2 = 0.0;
        self.w2 = None;
        self.h2 = None;
        self.second_set = false;
        self.ghost = false;
        self.nub = false;
        self.stepped = false;
        self.decal = false;

        key
    }

    /// Advance the vertical accumulator past the finished row.
    ///
    /// Normally one row-unit; a row that declared a negative `y` delta
    /// (a stepped/ISO continuation overlapping the previous row) advances by
    /// `max(0, 1 + min_dy)` so the overlap is not double-counted.
    pub(crate) fn end_row(&mut self) {
        let advance = (1.0 + self.min_dy.min(0.0)).max(0.0);
        self.y = self.row_y_base + advance;
        self.row_y_base = self.y;
        self.min_dy = 0.0;
        self.x = self.cluster_x;
    }
}

fn parse_text_colors(raw: &str) -> [Option<Color>; NUM_LEGENDS] {
    let mut colors: [Option<Color>; NUM_LEGENDS] = Default::default();
    if raw.is_empty() {
        return colors;
    }
    for (slot, line) in raw.splitn(NUM_LEGENDS, '\n').enumerate() {
        if !line.is_empty() {
            colors[slot] = Some(Color::new(line));
        }
    }
    colors
}

fn meta_from_raw(raw: RawMetadata) -> Metadata {
    Metadata {
        name: raw.name.unwrap_or_default(),
        author: raw.author.unwrap_or_default(),
        notes: raw.notes.unwrap_or_default(),
        background: raw.background.map(|b| Background {
            name: b.name.unwrap_or_default(),
            style: b.style.unwrap_or_default(),
        }),
        radii: raw.radii.unwrap_or_default(),
        switch_mount: raw.switch_mount.unwrap_or_default(),
        switch_brand: raw.switch_brand.unwrap_or_default(),
        switch_type: raw.switch_type.unwrap_or_default(),
        plate: raw.plate.unwrap_or_default(),
        pcb: raw.pcb.unwrap_or_default(),
        css: raw.css.unwrap_or_default(),
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Decode KLE text (strict or relaxed notation) into a keyboard.
pub fn parse(input: &str) -> Result<Keyboard, FormatError> {
    let entries = parse_root(input)?;
    decode_entries(&entries)
}

/// Decode pre-parsed top-level entries.
pub(crate) fn decode_entries(entries: &[Value]) -> Result<Keyboard, FormatError> {
    let mut keyboard = Keyboard::default();
    let mut state = DecodeState::new();
    let mut id_seq = 0u64;

    for (index, entry) in entries.iter().enumerate() {
        match entry {
            Value::Object(_) => {
                if index != 0 {
                    return Err(FormatError::MisplacedMetadata { index });
                }
                let raw: RawMetadata = serde_json::from_value(entry.clone())
                    .map_err(|e| FormatError::Metadata(e.to_string()))?;
                keyboard.meta = meta_from_raw(raw);
            }
            Value::Array(items) => {
                state.begin_row();
                for item in items {
                    match item {
                        Value::Object(_) => {
                            let props: RawProps = serde_json::from_value(item.clone())
                                .map_err(|e| FormatError::Props {
                                    row: index,
                                    cause: e.to_string(),
                                })?;
                            state.apply(&props, index)?;
                        }
                        Value::String(label) => {
                            let key = state.build_key(label, &mut id_seq);
                            keyboard.keys.push(key);
                        }
                        other => {
                            return Err(FormatError::InvalidRowItem {
                                row: index,
                                found: type_name(other),
                            });
                        }
                    }
                }
                state.end_row();
            }
            other => {
                return Err(FormatError::InvalidEntry {
                    index,
                    found: type_name(other),
                });
            }
        }
    }

    debug!(keys = keyboard.keys.len(), "decoded layout");
    Ok(keyboard)
}
