//! End-to-end editor flow over the whole stack: codec in, interaction,
//! render, codec out.

use rustc_hash::FxHashSet;

use keyplane::prelude::*;
use keyplane::{input, kle, render};

const LAYOUT: &str = r#"[
    ["Esc","Q","W",{"w":2},"Backspace"],
    [{"x":6,"w":1.25,"h":2,"x2":-0.25,"w2":1.5,"h2":1},"Enter"],
    [{"r":30,"rx":2,"ry":3},"R1"]
]"#;

fn units(engine: &InteractionEngine, x: f64, y: f64) -> PixelPoint {
    let ppu = engine.config().pixels_per_unit;
    PixelPoint::new(x * ppu, y * ppu)
}

#[test]
fn parse_edit_render_serialize() {
    let keyboard = kle::parse(LAYOUT).unwrap();
    assert_eq!(keyboard.keys.len(), 6);
    let mut doc = Document::from_keyboard(keyboard);
    let mut history = History::new();
    let mut engine = InteractionEngine::new(EditorConfig::default());

    // The rotated key hits at its rendered center, not its stored rect.
    let rotated = doc.keyboard().keys[5].clone();
    let pivot = rotated.resolved_pivot();
    let center = kpl_core::geometry::rotate_point(
        rotated.rect().center(),
        pivot,
        rotated.rotation.angle_deg,
    );
    let hit = input::hit_test(doc.keyboard(), center).expect("rendered center must hit");
    assert_eq!(hit.id, rotated.id);

    // Drag the backspace two units right.
    let backspace = doc.keyboard().keys[3].clone();
    engine.pointer_down(&mut doc, &mut history, units(&engine, 4.0, 0.5), Modifiers::empty());
    engine.pointer_up(&mut doc, &mut history, units(&engine, 6.0, 0.5));
    let moved = doc.keyboard().key(&backspace.id).unwrap();
    assert_eq!(moved.x, backspace.x + 2.0);

    // Render with the current selection; one outline per selected key.
    let settings = RenderSettings::default();
    let rin = RenderInput {
        keyboard: doc.keyboard(),
        selection: doc.selection(),
        hover: None,
        drag_offset: None,
        box_select: None,
        settings: &settings,
    };
    let scene = render::render(&rin, &AssetCache::new());
    let outlines = scene
        .commands
        .iter()
        .filter(|c| matches!(c, render::DrawCommand::SelectionOutline { .. }))
        .count();
    assert_eq!(outlines, doc.selection().len());

    // Undo returns the backspace to its parsed position.
    assert!(engine.undo(&mut doc, &mut history));
    assert_eq!(doc.keyboard().key(&backspace.id).unwrap().x, backspace.x);

    // What we serialize parses back with the same number of keys.
    let text = kle::serialize(doc.keyboard()).unwrap();
    let reparsed = kle::parse(&text).unwrap();
    assert_eq!(reparsed.keys.len(), doc.keyboard().keys.len());
}

#[test]
fn batched_update_with_bad_id_applies_the_rest() {
    let keyboard = kle::parse(r#"[["A","B","C","D"]]"#).unwrap();
    let mut doc = Document::from_keyboard(keyboard);
    let ids: Vec<KeyId> = doc.keyboard().keys.iter().map(|k| k.id.clone()).collect();

    let patches = vec![
        KeyPatch::new(ids[0].clone(), KeyChanges::position(0.0, 5.0)),
        KeyPatch::new(ids[1].clone(), KeyChanges::position(1.0, 5.0)),
        KeyPatch::new(KeyId::new("missing"), KeyChanges::position(9.0, 9.0)),
        KeyPatch::new(ids[3].clone(), KeyChanges::position(3.0, 5.0)),
    ];
    let outcome = doc.update_keys(&patches);
    assert_eq!(outcome.applied, 3);
    assert_eq!(outcome.skipped, 1);
    assert_eq!(doc.keyboard().keys[0].y, 5.0);
    assert_eq!(doc.keyboard().keys[2].y, 0.0);
    assert_eq!(doc.keyboard().keys[3].y, 5.0);
}

#[test]
fn duplicate_drag_roundtrips_through_the_codec() {
    let keyboard = kle::parse(r#"[["A","B"]]"#).unwrap();
    let mut doc = Document::from_keyboard(keyboard);
    let mut history = History::new();
    let mut engine = InteractionEngine::new(EditorConfig::default());
    let selection: FxHashSet<KeyId> =
        doc.keyboard().keys.iter().map(|k| k.id.clone()).collect();
    doc.set_selection(selection);

    engine.pointer_down(&mut doc, &mut history, units(&engine, 0.5, 0.5), Modifiers::ALT);
    engine.pointer_up(&mut doc, &mut history, units(&engine, 0.5, 2.5));

    assert_eq!(doc.keyboard().keys.len(), 4);
    let text = kle::serialize(doc.keyboard()).unwrap();
    let reparsed = kle::parse(&text).unwrap();
    assert_eq!(reparsed.keys.len(), 4);
}
