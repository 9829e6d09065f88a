#![forbid(unsafe_code)]

//! The layout document model: an ordered key list plus metadata, with
//! invariants enforced on every mutation.
//!
//! Mutations follow copy-on-write discipline: every entry point leaves the
//! document fully valid (no dangling selection references, no sub-minimum
//! key sizes), and batched updates apply against a single prior snapshot so
//! sibling-relative delta computations see a consistent "before" state.
//!
//! # Invariants
//!
//! 1. The selection set only ever references ids present in the key list.
//! 2. Key ids are minted by the document and never reused, including across
//!    deletes.
//! 3. A batch of updates either applies an entry fully or skips it; a bad id
//!    or invalid value in one entry never affects the others.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::{Rotation, UnitRect};
use crate::key::{
    Color, FontId, Key, KeyId, LegendAlign, MIN_KEY_SIZE, NUM_FRONT_LEGENDS, NUM_LEGENDS,
    Profile, SecondRect,
};

pub type Result<T> = std::result::Result<T, DocumentError>;

/// Errors from document mutations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DocumentError {
    /// The referenced key id is not in the document.
    #[error("key not found: {id}")]
    NotFound { id: KeyId },

    /// A proposed change would violate a key invariant.
    #[error("invalid {field} for key {id}: {value}")]
    Validation {
        id: KeyId,
        field: &'static str,
        value: f64,
    },
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

/// Document background reference (texture name plus CSS style passthrough).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Background {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub style: String,
}

/// Keyboard-level metadata. Everything beyond `name`/`author`/`notes` is a
/// passthrough for external tooling.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub background: Option<Background>,
    #[serde(default)]
    pub radii: String,
    #[serde(default)]
    pub switch_mount: String,
    #[serde(default)]
    pub switch_brand: String,
    #[serde(default)]
    pub switch_type: String,
    #[serde(default)]
    pub plate: bool,
    #[serde(default)]
    pub pcb: bool,
    #[serde(default)]
    pub css: String,
}

// ---------------------------------------------------------------------------
// Keyboard
// ---------------------------------------------------------------------------

/// A keyboard layout: metadata plus keys in insertion order.
///
/// Insertion order is not guaranteed to be spatial; the codec tolerates any
/// order on input and emits sorted order on output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Keyboard {
    pub meta: Metadata,
    pub keys: Vec<Key>,
}

impl Keyboard {
    /// Axis-aligned envelope of the rendered layout, for canvas sizing.
    ///
    /// Decal keys are label-only and excluded so they don't inflate the
    /// physical bounds.
    #[must_use]
    pub fn layout_bounds(&self) -> Option<UnitRect> {
        self.keys
            .iter()
            .filter(|k| !k.decal)
            .map(Key::rendered_bounds)
            .reduce(|acc, r| acc.union(&r))
    }

    /// Find a key by id.
    #[must_use]
    pub fn key(&self, id: &KeyId) -> Option<&Key> {
        self.keys.iter().find(|k| &k.id == id)
    }
}

// ---------------------------------------------------------------------------
// Patches
// ---------------------------------------------------------------------------

/// Partial changes to one key. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyChanges {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    /// `Some(None)` clears the secondary rectangle.
    pub second: Option<Option<SecondRect>>,
    pub rotation: Option<Rotation>,
    pub color: Option<Color>,
    pub profile: Option<Profile>,
    pub font: Option<FontId>,
    pub labels: Option<[String; NUM_LEGENDS]>,
    pub front_legends: Option<[String; NUM_FRONT_LEGENDS]>,
    pub center_legend: Option<String>,
    pub ghost: Option<bool>,
    pub decal: Option<bool>,
    pub stepped: Option<bool>,
    pub nub: Option<bool>,
    pub align: Option<LegendAlign>,
}

impl KeyChanges {
    /// Changes that set an absolute position.
    #[must_use]
    pub fn position(x: f64, y: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Self::default()
        }
    }

    /// Changes that set a size.
    #[must_use]
    pub fn size(width: f64, height: f64) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            ..Self::default()
        }
    }

    /// Changes that set a rotation.
    #[must_use]
    pub fn rotation(rotation: Rotation) -> Self {
        Self {
            rotation: Some(rotation),
            ..Self::default()
        }
    }
}

/// One entry of a batched update.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyPatch {
    pub id: KeyId,
    pub changes: KeyChanges,
}

impl KeyPatch {
    /// Pair an id with its changes.
    #[must_use]
    pub fn new(id: KeyId, changes: KeyChanges) -> Self {
        Self { id, changes }
    }
}

/// Outcome of a batched update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Entries applied in full.
    pub applied: usize,
    /// Entries skipped (unknown id or invalid value).
    pub skipped: usize,
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// The editable document: a [`Keyboard`] plus the current selection and the
/// id mint. Single-owner, single-writer; all mutations are synchronous and
/// atomic.
#[derive(Debug, Clone, Default)]
pub struct Document {
    keyboard: Keyboard,
    selection: FxHashSet<KeyId>,
    next_id: u64,
}

impl Document {
    /// Create an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adopt an existing keyboard (e.g. from a codec parse), keeping its key
    /// ids and seeding the id mint past them.
    #[must_use]
    pub fn from_keyboard(keyboard: Keyboard) -> Self {
        let mut doc = Self {
            keyboard,
            selection: FxHashSet::default(),
            next_id: 0,
        };
        doc.reseed_mint();
        doc
    }

    /// The current keyboard.
    #[inline]
    #[must_use]
    pub fn keyboard(&self) -> &Keyboard {
        &self.keyboard
    }

    /// The current selection set.
    #[inline]
    #[must_use]
    pub fn selection(&self) -> &FxHashSet<KeyId> {
        &self.selection
    }

    /// Selected ids in document (z) order, for deterministic batch building.
    #[must_use]
    pub fn selected_keys(&self) -> Vec<&Key> {
        self.keyboard
            .keys
            .iter()
            .filter(|k| self.selection.contains(&k.id))
            .collect()
    }

    /// Mint a fresh key id, never previously used in this document.
    pub fn mint_id(&mut self) -> KeyId {
        loop {
            let candidate = KeyId::new(format!("k{}", self.next_id));
            self.next_id += 1;
            if self.keyboard.key(&candidate).is_none() {
                return candidate;
            }
        }
    }

    fn reseed_mint(&mut self) {
        // Adopted ids may collide with the "k<n>" scheme; skip past them.
        let max_numeric = self
            .keyboard
            .keys
            .iter()
            .filter_map(|k| k.id.as_str().strip_prefix('k'))
            .filter_map(|n| n.parse::<u64>().ok())
            .max();
        self.next_id = max_numeric.map_or(0, |n| n + 1);
    }

    // -- Whole-document --

    /// Replace the whole keyboard. Selection entries that no longer resolve
    /// are dropped.
    pub fn replace(&mut self, keyboard: Keyboard) {
        let live: FxHashSet<&KeyId> = keyboard.keys.iter().map(|k| &k.id).collect();
        self.selection.retain(|id| live.contains(id));
        self.keyboard = keyboard;
        self.reseed_mint();
    }

    /// Restore a previous keyboard and selection together (undo/redo and
    /// gesture aborts).
    pub fn restore(&mut self, keyboard: Keyboard, selection: FxHashSet<KeyId>) {
        self.keyboard = keyboard;
        self.selection = selection;
        self.reseed_mint();
        // A restored selection may predate a delete in the other direction.
        let live: FxHashSet<KeyId> =
            self.keyboard.keys.iter().map(|k| k.id.clone()).collect();
        self.selection.retain(|id| live.contains(id));
    }

    // -- Keys --

    /// Append a key, assigning it a fresh id. Returns the id.
    pub fn add_key(&mut self, mut key: Key) -> KeyId {
        key.width = key.width.max(MIN_KEY_SIZE);
        key.height = key.height.max(MIN_KEY_SIZE);
        let id = self.mint_id();
        key.id = id.clone();
        self.keyboard.keys.push(key);
        id
    }

    /// Append several keys, assigning fresh ids. Returns the ids in order.
    pub fn add_keys(&mut self, keys: Vec<Key>) -> Vec<KeyId> {
        keys.into_iter().map(|k| self.add_key(k)).collect()
    }

    /// Delete keys by id, removing them from the selection as well.
    /// Unknown ids are ignored.
    pub fn delete_keys(&mut self, ids: &[KeyId]) {
        let doomed: FxHashSet<&KeyId> = ids.iter().collect();
        self.keyboard.keys.retain(|k| !doomed.contains(&k.id));
        self.selection.retain(|id| !doomed.contains(id));
    }

    /// Update a single key, surfacing a missing id as an error.
    pub fn update_key(&mut self, id: &KeyId, changes: KeyChanges) -> Result<()> {
        let index = self
            .keyboard
            .keys
            .iter()
            .position(|k| &k.id == id)
            .ok_or_else(|| DocumentError::NotFound { id: id.clone() })?;
        let patched = apply_changes(&self.keyboard.keys[index], &changes)?;
        self.keyboard.keys[index] = patched;
        Ok(())
    }

    /// Apply a batch of per-key patches atomically against the current
    /// state: every patch sees the same "before" snapshot, and entries with
    /// unknown ids or invalid values are skipped without affecting the rest.
    pub fn update_keys(&mut self, patches: &[KeyPatch]) -> BatchOutcome {
        let index: FxHashMap<&KeyId, usize> = self
            .keyboard
            .keys
            .iter()
            .enumerate()
            .map(|(i, k)| (&k.id, i))
            .collect();

        let mut next = self.keyboard.keys.clone();
        let mut outcome = BatchOutcome::default();
        for patch in patches {
            let Some(&i) = index.get(&patch.id) else {
                outcome.skipped += 1;
                continue;
            };
            // Validate against the pre-batch snapshot, not earlier entries'
            // output, so entries are order-independent per key.
            match apply_changes(&self.keyboard.keys[i], &patch.changes) {
                Ok(patched) => {
                    next[i] = patched;
                    outcome.applied += 1;
                }
                Err(_) => outcome.skipped += 1,
            }
        }
        self.keyboard.keys = next;
        outcome
    }

    // -- Selection --

    /// Add a key to the selection. Unknown ids are ignored.
    pub fn select(&mut self, id: &KeyId) {
        if self.keyboard.key(id).is_some() {
            self.selection.insert(id.clone());
        }
    }

    /// Replace the selection with a single key.
    pub fn select_only(&mut self, id: &KeyId) {
        self.selection.clear();
        self.select(id);
    }

    /// Replace the selection wholesale. Unknown ids are dropped.
    pub fn set_selection(&mut self, ids: impl IntoIterator<Item = KeyId>) {
        self.selection = ids
            .into_iter()
            .filter(|id| self.keyboard.key(id).is_some())
            .collect();
    }

    /// Remove a key from the selection.
    pub fn deselect(&mut self, id: &KeyId) {
        self.selection.remove(id);
    }

    /// Toggle a key's selection membership.
    pub fn toggle(&mut self, id: &KeyId) {
        if self.selection.contains(id) {
            self.selection.remove(id);
        } else {
            self.select(id);
        }
    }

    /// Clear the selection.
    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }
}

fn apply_changes(key: &Key, changes: &KeyChanges) -> Result<Key> {
    if let Some(width) = changes.width
        && width < MIN_KEY_SIZE
    {
        return Err(DocumentError::Validation {
            id: key.id.clone(),
            field: "width",
            value: width,
        });
    }
    if let Some(height) = changes.height
        && height < MIN_KEY_SIZE
    {
        return Err(DocumentError::Validation {
            id: key.id.clone(),
            field: "height",
            value: height,
        });
    }

    let mut next = key.clone();
    if let Some(x) = changes.x {
        next.x = x;
    }
    if let Some(y) = changes.y {
        next.y = y;
    }
    if let Some(width) = changes.width {
        next.width = width;
    }
    if let Some(height) = changes.height {
        next.height = height;
    }
    if let Some(second) = changes.second {
        next.second = second;
    }
    if let Some(rotation) = changes.rotation {
        next.rotation = rotation;
    }
    if let Some(ref color) = changes.color {
        next.color = color.clone();
    }
    if let Some(ref profile) = changes.profile {
        next.profile = profile.clone();
    }
    if let Some(ref font) = changes.font {
        next.font = font.clone();
    }
    if let Some(ref labels) = changes.labels {
        next.labels = labels.clone();
    }
    if let Some(ref front) = changes.front_legends {
        next.front_legends = front.clone();
    }
    if let Some(ref center) = changes.center_legend {
        next.center_legend = center.clone();
    }
    if let Some(ghost) = changes.ghost {
        next.ghost = ghost;
    }
    if let Some(decal) = changes.decal {
        next.decal = decal;
    }
    if let Some(stepped) = changes.stepped {
        next.stepped = stepped;
    }
    if let Some(nub) = changes.nub {
        next.nub = nub;
    }
    if let Some(align) = changes.align {
        next.align = align;
    }
    Ok(next)
}
