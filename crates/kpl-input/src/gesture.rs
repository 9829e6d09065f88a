#![forbid(unsafe_code)]

//! Pointer gesture engine: select, drag, duplicate-drag, box-select, and
//! rotation-pivot assignment over the document model.
//!
//! # State Machine
//!
//! `Idle -> { DraggingKeys | BoxSelecting | SettingRotationPoint } -> Idle`
//!
//! - **DraggingKeys**: press on a hit key. The pixel delta is tracked
//!   without touching the document; release converts it to unit space,
//!   snaps it, and applies one batched position update plus a history
//!   checkpoint. With Alt held at press time the gesture drags fresh
//!   clones instead (duplicate-drag).
//! - **BoxSelecting**: press on empty canvas. Selection updates live under
//!   the configured membership policy; Ctrl/Cmd unions with the prior
//!   selection.
//! - **SettingRotationPoint**: armed as a modal flag; the next press
//!   assigns an explicit pivot to every selected key, repositioned so
//!   nothing moves on screen, then the mode disarms itself.
//!
//! # Invariants
//!
//! 1. A release without net movement beyond the epsilon mutates nothing.
//! 2. Releasing Alt mid-duplicate-drag deletes the clones and restores the
//!    pre-gesture selection exactly; abort is a correctness property, not
//!    polish.
//! 3. Every committed gesture pushes exactly one history checkpoint,
//!    capturing the pre-gesture keyboard.

use bitflags::bitflags;
use rustc_hash::FxHashSet;
use tracing::debug;

use kpl_core::document::{Document, KeyChanges, KeyPatch};
use kpl_core::geometry::{Pivot, Point, Rotation, UnitRect, reposition_for_pivot};
use kpl_core::history::History;
use kpl_core::key::{KeyId, MIN_KEY_SIZE};

use crate::hit::hit_test;

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

bitflags! {
    /// Modifier keys held during a pointer or keyboard event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Modifiers: u8 {
        const SHIFT = 1;
        const CTRL = 1 << 1;
        const ALT = 1 << 2;
        const SUPER = 1 << 3;
    }
}

impl Modifiers {
    /// Ctrl on Linux/Windows, Cmd on macOS.
    #[inline]
    #[must_use]
    pub const fn is_command(self) -> bool {
        self.intersects(Self::CTRL.union(Self::SUPER))
    }
}

/// A pointer position in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

impl PixelPoint {
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Arrow-key direction for keyboard-driven nudges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NudgeDirection {
    Left,
    Right,
    Up,
    Down,
}

impl NudgeDirection {
    const fn delta(self) -> (f64, f64) {
        match self {
            Self::Left => (-1.0, 0.0),
            Self::Right => (1.0, 0.0),
            Self::Up => (0.0, -1.0),
            Self::Down => (0.0, 1.0),
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Box-select membership policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoxPolicy {
    /// Any overlap between key bounds and the selection rectangle.
    #[default]
    Touch,
    /// Key bounds fully contained in the selection rectangle.
    Enclose,
}

/// Thresholds and scales for the interaction engine.
#[derive(Debug, Clone)]
pub struct EditorConfig {
    /// Canvas pixels per key unit.
    pub pixels_per_unit: f64,
    /// Grid pitch for drag snapping, in units.
    pub grid_pitch: f64,
    /// Whether drags snap to the grid.
    pub snap_to_grid: bool,
    /// Net movement below this many units is a click, not a drag.
    pub drag_epsilon: f64,
    /// Box-select membership policy.
    pub box_policy: BoxPolicy,
    /// Arrow-key step in units.
    pub fine_step: f64,
    /// Shift+arrow step in units.
    pub coarse_step: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            pixels_per_unit: 54.0,
            grid_pitch: 0.25,
            snap_to_grid: true,
            drag_epsilon: 0.01,
            box_policy: BoxPolicy::Touch,
            fine_step: 0.25,
            coarse_step: 1.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Gesture state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct DragGesture {
    origin: PixelPoint,
    current: PixelPoint,
    /// Keyboard as it was when the gesture began (clones excluded).
    pre_keyboard: kpl_core::document::Keyboard,
    /// Selection as it was just before cloning (for duplicate aborts).
    pre_selection: FxHashSet<KeyId>,
    /// Whether the dragged keys are freshly minted clones.
    duplicate: bool,
}

#[derive(Debug, Clone)]
struct BoxGesture {
    origin: PixelPoint,
    current: PixelPoint,
    additive: bool,
    prior: FxHashSet<KeyId>,
}

#[derive(Debug, Clone, Default)]
enum GestureState {
    #[default]
    Idle,
    DraggingKeys(Box<DragGesture>),
    BoxSelecting(BoxGesture),
    SettingRotationPoint,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// The pointer gesture engine. One per canvas.
#[derive(Debug, Default)]
pub struct InteractionEngine {
    config: EditorConfig,
    state: GestureState,
    pivot_mode_armed: bool,
    hover: Option<KeyId>,
}

impl InteractionEngine {
    /// Create an engine with the given configuration.
    #[must_use]
    pub fn new(config: EditorConfig) -> Self {
        Self {
            config,
            state: GestureState::Idle,
            pivot_mode_armed: false,
            hover: None,
        }
    }

    /// Current configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Update the configuration.
    pub fn set_config(&mut self, config: EditorConfig) {
        self.config = config;
    }

    /// The key currently under the pointer, if idle over one.
    #[inline]
    #[must_use]
    pub fn hover(&self) -> Option<&KeyId> {
        self.hover.as_ref()
    }

    /// Whether a key drag is in progress.
    #[inline]
    #[must_use]
    pub fn is_dragging(&self) -> bool {
        matches!(self.state, GestureState::DraggingKeys(_))
    }

    /// The in-progress drag offset in units (snapped), for the renderer.
    #[must_use]
    pub fn drag_offset_units(&self) -> Option<(f64, f64)> {
        match &self.state {
            GestureState::DraggingKeys(g) => Some(self.delta_units(g.origin, g.current)),
            _ => None,
        }
    }

    /// The in-progress box-select rectangle in units, for the renderer.
    #[must_use]
    pub fn box_rect_units(&self) -> Option<UnitRect> {
        match &self.state {
            GestureState::BoxSelecting(g) => Some(self.pixel_span_to_rect(g.origin, g.current)),
            _ => None,
        }
    }

    /// Arm rotation-point mode: the next press assigns a pivot to the
    /// selection instead of starting a drag.
    pub fn arm_rotation_point(&mut self) {
        self.pivot_mode_armed = true;
    }

    /// Whether rotation-point mode is armed.
    #[inline]
    #[must_use]
    pub const fn rotation_point_armed(&self) -> bool {
        self.pivot_mode_armed
    }

    // -- Pointer events --

    /// Pointer press. Starts a drag, a box-select, or a pivot assignment.
    pub fn pointer_down(
        &mut self,
        doc: &mut Document,
        history: &mut History,
        pos: PixelPoint,
        mods: Modifiers,
    ) {
        if !matches!(self.state, GestureState::Idle) {
            return;
        }
        self.hover = None;

        if self.pivot_mode_armed {
            self.pivot_mode_armed = false;
            self.assign_rotation_point(doc, history, self.to_units(pos));
            self.state = GestureState::SettingRotationPoint;
            return;
        }

        let point = self.to_units(pos);
        if let Some(hit) = hit_test(doc.keyboard(), point) {
            let id = hit.id.clone();
            if mods.is_command() {
                doc.toggle(&id);
            } else if !doc.selection().contains(&id) {
                doc.select_only(&id);
            }
            if !doc.selection().contains(&id) {
                // Ctrl-click deselected; nothing left to drag from here.
                return;
            }

            let pre_keyboard = doc.keyboard().clone();
            let pre_selection = doc.selection().clone();
            let duplicate = mods.contains(Modifiers::ALT);
            if duplicate {
                let clones: Vec<_> = doc.selected_keys().into_iter().cloned().collect();
                let clone_ids = doc.add_keys(clones);
                doc.set_selection(clone_ids);
            }
            debug!(key = %id, duplicate, "drag start");
            self.state = GestureState::DraggingKeys(Box::new(DragGesture {
                origin: pos,
                current: pos,
                pre_keyboard,
                pre_selection,
                duplicate,
            }));
        } else {
            let additive = mods.is_command();
            let prior = doc.selection().clone();
            if !additive {
                doc.clear_selection();
            }
            debug!(additive, "box select start");
            self.state = GestureState::BoxSelecting(BoxGesture {
                origin: pos,
                current: pos,
                additive,
                prior,
            });
        }
    }

    /// Pointer motion. Updates hover when idle, tracks drags, and updates
    /// box-select membership live.
    pub fn pointer_move(&mut self, doc: &mut Document, pos: PixelPoint) {
        match &mut self.state {
            GestureState::Idle => {
                let point = self.to_units(pos);
                self.hover = hit_test(doc.keyboard(), point).map(|k| k.id.clone());
            }
            GestureState::DraggingKeys(g) => {
                g.current = pos;
            }
            GestureState::BoxSelecting(g) => {
                g.current = pos;
                let gesture = g.clone();
                self.apply_box_selection(doc, &gesture);
            }
            GestureState::SettingRotationPoint => {}
        }
    }

    /// Pointer release. Commits the gesture and returns to idle.
    pub fn pointer_up(&mut self, doc: &mut Document, history: &mut History, pos: PixelPoint) {
        let state = std::mem::take(&mut self.state);
        match state {
            GestureState::Idle => {}
            GestureState::DraggingKeys(mut g) => {
                g.current = pos;
                self.finish_drag(doc, history, &g);
            }
            GestureState::BoxSelecting(mut g) => {
                g.current = pos;
                self.apply_box_selection(doc, &g);
            }
            GestureState::SettingRotationPoint => {}
        }
    }

    /// Modifier changes mid-gesture. Releasing Alt during a duplicate-drag
    /// aborts it: clones are deleted and the pre-gesture selection restored.
    pub fn modifiers_changed(&mut self, doc: &mut Document, mods: Modifiers) {
        let aborting = !mods.contains(Modifiers::ALT)
            && matches!(&self.state, GestureState::DraggingKeys(g) if g.duplicate);
        if aborting
            && let GestureState::DraggingKeys(g) = std::mem::take(&mut self.state)
        {
            debug!("duplicate drag aborted");
            let DragGesture {
                pre_keyboard,
                pre_selection,
                ..
            } = *g;
            doc.restore(pre_keyboard, pre_selection);
        }
    }

    /// Abort any gesture in progress, restoring pre-gesture state.
    pub fn cancel(&mut self, doc: &mut Document) {
        match std::mem::take(&mut self.state) {
            GestureState::DraggingKeys(g) => {
                doc.restore(g.pre_keyboard, g.pre_selection);
            }
            GestureState::BoxSelecting(g) => {
                doc.set_selection(g.prior);
            }
            GestureState::Idle | GestureState::SettingRotationPoint => {}
        }
    }

    // -- Keyboard events --

    /// Arrow-key nudge: move the selection by a step (Shift = coarse), or
    /// resize it with Ctrl/Cmd held, clamped to the minimum key size.
    pub fn nudge(
        &mut self,
        doc: &mut Document,
        history: &mut History,
        direction: NudgeDirection,
        mods: Modifiers,
    ) {
        let selected = doc.selected_keys();
        if selected.is_empty() {
            return;
        }
        let step = if mods.contains(Modifiers::SHIFT) {
            self.config.coarse_step
        } else {
            self.config.fine_step
        };
        let (dx, dy) = direction.delta();

        let patches: Vec<KeyPatch> = if mods.is_command() {
            selected
                .iter()
                .map(|k| {
                    let width = (k.width + dx * step).max(MIN_KEY_SIZE);
                    let height = (k.height + dy * step).max(MIN_KEY_SIZE);
                    KeyPatch::new(k.id.clone(), KeyChanges::size(width, height))
                })
                .collect()
        } else {
            selected
                .iter()
                .map(|k| {
                    KeyPatch::new(
                        k.id.clone(),
                        KeyChanges::position(k.x + dx * step, k.y + dy * step),
                    )
                })
                .collect()
        };

        history.checkpoint(doc.keyboard());
        doc.update_keys(&patches);
    }

    /// Undo the last committed gesture.
    pub fn undo(&mut self, doc: &mut Document, history: &mut History) -> bool {
        match history.undo(doc.keyboard()) {
            Some(keyboard) => {
                doc.replace(keyboard);
                true
            }
            None => false,
        }
    }

    /// Redo the last undone gesture.
    pub fn redo(&mut self, doc: &mut Document, history: &mut History) -> bool {
        match history.redo(doc.keyboard()) {
            Some(keyboard) => {
                doc.replace(keyboard);
                true
            }
            None => false,
        }
    }

    // -- Internals --

    fn to_units(&self, pos: PixelPoint) -> Point {
        Point::new(
            pos.x / self.config.pixels_per_unit,
            pos.y / self.config.pixels_per_unit,
        )
    }

    fn snap(&self, v: f64) -> f64 {
        if self.config.snap_to_grid && self.config.grid_pitch > 0.0 {
            (v / self.config.grid_pitch).round() * self.config.grid_pitch
        } else {
            v
        }
    }

    fn delta_units(&self, origin: PixelPoint, current: PixelPoint) -> (f64, f64) {
        let dx = (current.x - origin.x) / self.config.pixels_per_unit;
        let dy = (current.y - origin.y) / self.config.pixels_per_unit;
        (self.snap(dx), self.snap(dy))
    }

    fn pixel_span_to_rect(&self, a: PixelPoint, b: PixelPoint) -> UnitRect {
        let pa = self.to_units(a);
        let pb = self.to_units(b);
        let x = pa.x.min(pb.x);
        let y = pa.y.min(pb.y);
        UnitRect::new(x, y, (pa.x - pb.x).abs(), (pa.y - pb.y).abs())
    }

    fn finish_drag(&mut self, doc: &mut Document, history: &mut History, g: &DragGesture) {
        let (dx, dy) = self.delta_units(g.origin, g.current);
        let moved = dx.abs() > self.config.drag_epsilon || dy.abs() > self.config.drag_epsilon;

        if !moved {
            if g.duplicate {
                // Clones were added at gesture start; committing them in
                // place is still a document change worth one checkpoint.
                history.checkpoint(&g.pre_keyboard);
            }
            return;
        }

        history.checkpoint(&g.pre_keyboard);
        let patches: Vec<KeyPatch> = doc
            .selected_keys()
            .iter()
            .map(|k| KeyPatch::new(k.id.clone(), KeyChanges::position(k.x + dx, k.y + dy)))
            .collect();
        let outcome = doc.update_keys(&patches);
        debug!(dx, dy, applied = outcome.applied, "drag committed");
    }

    fn apply_box_selection(&self, doc: &mut Document, g: &BoxGesture) {
        let rect = self.pixel_span_to_rect(g.origin, g.current);
        let mut members: FxHashSet<KeyId> = doc
            .keyboard()
            .keys
            .iter()
            .filter(|k| {
                let bounds = k.rendered_bounds();
                match self.config.box_policy {
                    BoxPolicy::Touch => rect.intersects(&bounds),
                    BoxPolicy::Enclose => rect.encloses(&bounds),
                }
            })
            .map(|k| k.id.clone())
            .collect();
        if g.additive {
            members.extend(g.prior.iter().cloned());
        }
        doc.set_selection(members);
    }

    fn assign_rotation_point(&self, doc: &mut Document, history: &mut History, pivot: Point) {
        let selected = doc.selected_keys();
        if selected.is_empty() {
            return;
        }
        let patches: Vec<KeyPatch> = selected
            .iter()
            .map(|k| {
                let origin = reposition_for_pivot(k.rect(), k.rotation, pivot);
                let rotation = Rotation {
                    angle_deg: k.rotation.angle_deg,
                    pivot: Pivot::Explicit(pivot),
                };
                let changes = KeyChanges {
                    x: Some(origin.x),
                    y: Some(origin.y),
                    rotation: Some(rotation),
                    ..KeyChanges::default()
                };
                KeyPatch::new(k.id.clone(), changes)
            })
            .collect();

        history.checkpoint(doc.keyboard());
        doc.update_keys(&patches);
        debug!(count = patches.len(), "rotation point assigned");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kpl_core::geometry::rotate_point;
    use kpl_core::key::Key;

    const PPU: f64 = 54.0;

    fn setup(n: usize) -> (InteractionEngine, Document, History) {
        let mut doc = Document::new();
        for i in 0..n {
            doc.add_key(Key::new(KeyId::new("t")).at(i as f64 * 2.0, 0.0));
        }
        (InteractionEngine::new(EditorConfig::default()), doc, History::new())
    }

    fn px(x_units: f64, y_units: f64) -> PixelPoint {
        PixelPoint::new(x_units * PPU, y_units * PPU)
    }

    fn id_at(doc: &Document, index: usize) -> KeyId {
        doc.keyboard().keys[index].id.clone()
    }

    #[test]
    fn click_selects_and_does_not_move() {
        let (mut engine, mut doc, mut history) = setup(2);
        engine.pointer_down(&mut doc, &mut history, px(0.5, 0.5), Modifiers::empty());
        assert!(engine.is_dragging());
        engine.pointer_up(&mut doc, &mut history, px(0.5, 0.5));
        assert!(doc.selection().contains(&id_at(&doc, 0)));
        assert_eq!(doc.keyboard().keys[0].x, 0.0);
        assert!(!history.can_undo(), "a pure click must not checkpoint");
    }

    #[test]
    fn sub_epsilon_drag_is_a_noop_on_position() {
        let (mut engine, mut doc, mut history) = setup(1);
        engine.pointer_down(&mut doc, &mut history, px(0.5, 0.5), Modifiers::empty());
        // ~0.004 units of travel: under the epsilon and under the snap.
        engine.pointer_move(&mut doc, px(0.504, 0.5));
        engine.pointer_up(&mut doc, &mut history, px(0.504, 0.5));
        assert_eq!(doc.keyboard().keys[0].x, 0.0);
        assert!(!history.can_undo());
    }

    #[test]
    fn drag_moves_all_selected_keys_in_one_batch() {
        let (mut engine, mut doc, mut history) = setup(3);
        let a = id_at(&doc, 0);
        let b = id_at(&doc, 1);
        doc.select(&a);
        doc.select(&b);

        engine.pointer_down(&mut doc, &mut history, px(0.5, 0.5), Modifiers::empty());
        engine.pointer_move(&mut doc, px(1.5, 1.0));
        assert_eq!(engine.drag_offset_units(), Some((1.0, 0.5)));
        // Nothing moves until release.
        assert_eq!(doc.keyboard().keys[0].x, 0.0);
        engine.pointer_up(&mut doc, &mut history, px(1.5, 1.0));

        assert_eq!(doc.keyboard().keys[0].x, 1.0);
        assert_eq!(doc.keyboard().keys[0].y, 0.5);
        assert_eq!(doc.keyboard().keys[1].x, 3.0);
        // Unselected key stays put.
        assert_eq!(doc.keyboard().keys[2].x, 4.0);
        assert!(history.can_undo());
    }

    #[test]
    fn drag_snaps_to_grid() {
        let (mut engine, mut doc, mut history) = setup(1);
        engine.pointer_down(&mut doc, &mut history, px(0.5, 0.5), Modifiers::empty());
        engine.pointer_up(&mut doc, &mut history, px(0.5 + 0.30, 0.5));
        // 0.30 units snaps to the 0.25 grid.
        assert_eq!(doc.keyboard().keys[0].x, 0.25);
    }

    #[test]
    fn undo_restores_pre_drag_positions() {
        let (mut engine, mut doc, mut history) = setup(1);
        engine.pointer_down(&mut doc, &mut history, px(0.5, 0.5), Modifiers::empty());
        engine.pointer_up(&mut doc, &mut history, px(2.5, 0.5));
        assert_eq!(doc.keyboard().keys[0].x, 2.0);
        assert!(engine.undo(&mut doc, &mut history));
        assert_eq!(doc.keyboard().keys[0].x, 0.0);
        assert!(engine.redo(&mut doc, &mut history));
        assert_eq!(doc.keyboard().keys[0].x, 2.0);
    }

    #[test]
    fn duplicate_drag_commits_clones() {
        let (mut engine, mut doc, mut history) = setup(1);
        let original = id_at(&doc, 0);
        doc.select(&original);

        engine.pointer_down(&mut doc, &mut history, px(0.5, 0.5), Modifiers::ALT);
        assert_eq!(doc.keyboard().keys.len(), 2, "clone minted at gesture start");
        engine.pointer_move(&mut doc, px(0.5, 2.5));
        engine.pointer_up(&mut doc, &mut history, px(0.5, 2.5));

        assert_eq!(doc.keyboard().keys.len(), 2);
        // Original untouched, clone moved and selected.
        assert_eq!(doc.keyboard().keys[0].y, 0.0);
        assert_eq!(doc.keyboard().keys[1].y, 2.0);
        assert!(!doc.selection().contains(&original));
        assert_eq!(doc.selection().len(), 1);
        // Undo removes the clone entirely.
        assert!(engine.undo(&mut doc, &mut history));
        assert_eq!(doc.keyboard().keys.len(), 1);
    }

    #[test]
    fn releasing_alt_mid_drag_aborts_and_restores() {
        let (mut engine, mut doc, mut history) = setup(2);
        let original = id_at(&doc, 0);
        doc.select(&original);
        let before = doc.keyboard().clone();

        engine.pointer_down(&mut doc, &mut history, px(0.5, 0.5), Modifiers::ALT);
        engine.pointer_move(&mut doc, px(3.5, 0.5));
        engine.modifiers_changed(&mut doc, Modifiers::empty());

        assert!(!engine.is_dragging());
        assert_eq!(doc.keyboard(), &before);
        assert!(doc.selection().contains(&original));
        assert_eq!(doc.selection().len(), 1);
        assert!(!history.can_undo(), "an aborted gesture leaves no checkpoint");
    }

    #[test]
    fn box_select_touch_policy() {
        let (mut engine, mut doc, mut history) = setup(3);
        // Keys at x 0, 2, 4. Start above the row, sweep over the last two.
        engine.pointer_down(&mut doc, &mut history, px(1.5, -0.5), Modifiers::empty());
        engine.pointer_move(&mut doc, px(4.5, 0.5));
        engine.pointer_up(&mut doc, &mut history, px(4.5, 0.5));
        assert_eq!(doc.selection().len(), 2);
        assert!(doc.selection().contains(&id_at(&doc, 1)));
        assert!(doc.selection().contains(&id_at(&doc, 2)));
    }

    #[test]
    fn box_select_enclose_policy() {
        let (mut engine, mut doc, mut history) = setup(3);
        engine.set_config(EditorConfig {
            box_policy: BoxPolicy::Enclose,
            ..EditorConfig::default()
        });
        // The span grazes the last key but only fully contains the middle one.
        engine.pointer_down(&mut doc, &mut history, px(1.9, -0.1), Modifiers::empty());
        engine.pointer_move(&mut doc, px(4.2, 1.1));
        engine.pointer_up(&mut doc, &mut history, px(4.2, 1.1));
        assert_eq!(doc.selection().len(), 1);
        assert!(doc.selection().contains(&id_at(&doc, 1)));
    }

    #[test]
    fn command_box_select_unions_with_existing() {
        let (mut engine, mut doc, mut history) = setup(3);
        let third = id_at(&doc, 2);
        doc.select(&third);
        engine.pointer_down(&mut doc, &mut history, px(1.5, 1.5), Modifiers::CTRL);
        engine.pointer_move(&mut doc, px(0.75, 0.75));
        engine.pointer_up(&mut doc, &mut history, px(0.75, 0.75));
        assert!(doc.selection().contains(&id_at(&doc, 0)));
        assert!(doc.selection().contains(&third));
        assert_eq!(doc.selection().len(), 2);
    }

    #[test]
    fn plain_box_select_replaces_existing() {
        let (mut engine, mut doc, mut history) = setup(3);
        let third = id_at(&doc, 2);
        doc.select(&third);
        // A drag over empty canvas away from every key.
        engine.pointer_down(&mut doc, &mut history, px(1.5, 3.0), Modifiers::empty());
        engine.pointer_up(&mut doc, &mut history, px(1.2, 2.5));
        assert!(doc.selection().is_empty());
    }

    #[test]
    fn nudge_moves_by_fine_and_coarse_steps() {
        let (mut engine, mut doc, mut history) = setup(1);
        let id = id_at(&doc, 0);
        doc.select(&id);
        engine.nudge(&mut doc, &mut history, NudgeDirection::Right, Modifiers::empty());
        assert_eq!(doc.keyboard().keys[0].x, 0.25);
        engine.nudge(&mut doc, &mut history, NudgeDirection::Down, Modifiers::SHIFT);
        assert_eq!(doc.keyboard().keys[0].y, 1.0);
    }

    #[test]
    fn command_nudge_resizes_with_clamp() {
        let (mut engine, mut doc, mut history) = setup(1);
        let id = id_at(&doc, 0);
        doc.select(&id);
        engine.nudge(&mut doc, &mut history, NudgeDirection::Right, Modifiers::CTRL);
        assert_eq!(doc.keyboard().keys[0].width, 1.25);
        for _ in 0..10 {
            engine.nudge(&mut doc, &mut history, NudgeDirection::Left, Modifiers::CTRL);
        }
        assert_eq!(doc.keyboard().keys[0].width, MIN_KEY_SIZE);
    }

    #[test]
    fn rotation_point_assignment_keeps_keys_visually_stationary() {
        let (mut engine, mut doc, mut history) = setup(0);
        let rotated = Key::new(KeyId::new("t"))
            .at(2.0, 2.0)
            .rotated(kpl_core::Rotation::centered(45.0));
        let id = doc.add_key(rotated);
        doc.select(&id);

        let key_before = doc.keyboard().keys[0].clone();
        let rendered_before = rotate_point(
            key_before.rect().center(),
            key_before.resolved_pivot(),
            key_before.rotation.angle_deg,
        );

        engine.arm_rotation_point();
        assert!(engine.rotation_point_armed());
        engine.pointer_down(&mut doc, &mut history, px(5.0, 5.0), Modifiers::empty());
        engine.pointer_up(&mut doc, &mut history, px(5.0, 5.0));
        assert!(!engine.rotation_point_armed(), "mode disarms after one click");

        let key_after = &doc.keyboard().keys[0];
        assert_eq!(key_after.rotation.pivot, Pivot::Explicit(Point::new(5.0, 5.0)));
        let rendered_after = rotate_point(
            key_after.rect().center(),
            key_after.resolved_pivot(),
            key_after.rotation.angle_deg,
        );
        assert!((rendered_after.x - rendered_before.x).abs() < 1e-3);
        assert!((rendered_after.y - rendered_before.y).abs() < 1e-3);
        assert!(history.can_undo());
    }

    #[test]
    fn armed_pivot_click_does_not_start_a_drag() {
        let (mut engine, mut doc, mut history) = setup(1);
        doc.select(&id_at(&doc, 0));
        engine.arm_rotation_point();
        engine.pointer_down(&mut doc, &mut history, px(0.5, 0.5), Modifiers::empty());
        assert!(!engine.is_dragging());
        engine.pointer_up(&mut doc, &mut history, px(3.0, 3.0));
        // The press-to-release travel is not interpreted as a drag.
        assert_eq!(doc.keyboard().keys[0].x, 0.0);
    }
}
