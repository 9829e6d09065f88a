#![forbid(unsafe_code)]

//! Interaction: hit testing and the pointer gesture engine.
//!
//! # Role in Keyplane
//! `kpl-input` turns pointer and arrow-key input into document mutations.
//! It owns the gesture state machine (drag, duplicate-drag, box-select,
//! rotation-point assignment) and the rotation-aware hit tester the canvas
//! shares with the renderer.
//!
//! # How it fits in the system
//! The engine mutates a [`Document`](kpl_core::Document) through its
//! batched, atomic entry points and records [`History`](kpl_core::History)
//! checkpoints per committed gesture. It never draws; the renderer reads
//! the engine's drag offset and box rectangle to show gestures in flight.

pub mod gesture;
pub mod hit;

pub use gesture::{
    BoxPolicy, EditorConfig, InteractionEngine, Modifiers, NudgeDirection, PixelPoint,
};
pub use hit::{StabilizerHit, hit_stabilizer, hit_test, key_contains, stabilizer_points};
