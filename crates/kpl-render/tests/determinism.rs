//! Render determinism: identical inputs must produce identical command
//! lists, including across a codec normalization pass.

use rustc_hash::FxHashSet;

use kpl_render::assets::AssetCache;
use kpl_render::scene::{RenderInput, RenderSettings, Scene, fingerprint, render};

const LAYOUT: &str = r##"[
    {"name":"det-fixture"},
    [{"a":4},"Esc","Q","W",{"w":2},"Backspace"],
    [{"w":1.5,"c":"#202020"},"Tab",{"x":8.5,"w":1.25,"h":2,"x2":-0.25,"w2":1.5,"h2":1},"Enter"],
    [{"r":15,"rx":4,"ry":4},"R1","R2"]
]"##;

fn render_board(kb: &kpl_core::Keyboard) -> Scene {
    let selection = FxHashSet::default();
    let settings = RenderSettings {
        show_stabilizers: true,
    };
    let input = RenderInput {
        keyboard: kb,
        selection: &selection,
        hover: None,
        drag_offset: None,
        box_select: None,
        settings: &settings,
    };
    render(&input, &AssetCache::new())
}

#[test]
fn same_text_renders_byte_identical_scenes() {
    let a = kpl_kle::parse(LAYOUT).unwrap();
    let b = kpl_kle::parse(LAYOUT).unwrap();
    let scene_a = render_board(&a);
    let scene_b = render_board(&b);
    assert_eq!(scene_a, scene_b);
    assert_eq!(fingerprint(&scene_a), fingerprint(&scene_b));
}

#[test]
fn codec_normalized_form_renders_deterministically() {
    let parsed = kpl_kle::parse(LAYOUT).unwrap();
    let normalized = kpl_kle::parse(&kpl_kle::serialize(&parsed).unwrap()).unwrap();
    let once = render_board(&normalized);
    let twice = render_board(&normalized);
    assert_eq!(fingerprint(&once), fingerprint(&twice));
    assert!(!once.commands.is_empty());
    // The envelope covers the rotated cluster.
    assert!(once.bounds.right() > 10.0);
}
