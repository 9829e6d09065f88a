#![forbid(unsafe_code)]

//! Keyplane: an interactive keyboard-layout editor core.
//!
//! This umbrella crate re-exports the member crates:
//!
//! - `core`: key/document model, rotation geometry, history.
//! - `kle`: the KLE codec (parse/serialize of the row notation).
//! - `input`: hit testing and the pointer gesture engine.
//! - `render`: deterministic draw-command renderer and asset cache.
//!
//! # Example
//!
//! ```
//! use keyplane::prelude::*;
//!
//! let keyboard = keyplane::kle::parse(r#"[[{"w":2},"Spacebar"]]"#).unwrap();
//! let mut doc = Document::from_keyboard(keyboard);
//! let mut history = History::new();
//! let mut engine = InteractionEngine::new(EditorConfig::default());
//!
//! // Click the spacebar and drag it one unit right.
//! let ppu = engine.config().pixels_per_unit;
//! engine.pointer_down(&mut doc, &mut history, PixelPoint::new(ppu, ppu * 0.5),
//!     Modifiers::empty());
//! engine.pointer_up(&mut doc, &mut history, PixelPoint::new(ppu * 2.0, ppu * 0.5));
//! assert_eq!(doc.keyboard().keys[0].x, 1.0);
//!
//! let text = keyplane::kle::serialize(doc.keyboard()).unwrap();
//! assert!(text.contains("Spacebar"));
//! ```

pub use kpl_core as core;
pub use kpl_input as input;
pub use kpl_kle as kle;
pub use kpl_render as render;

/// The types most callers need.
pub mod prelude {
    pub use kpl_core::{
        Document, History, Key, KeyChanges, KeyId, KeyPatch, Keyboard, Pivot, Point,
        Rotation, UnitRect,
    };
    pub use kpl_input::{
        BoxPolicy, EditorConfig, InteractionEngine, Modifiers, NudgeDirection, PixelPoint,
    };
    pub use kpl_kle::FormatError;
    pub use kpl_render::{AssetCache, RenderInput, RenderSettings, Scene};
}
