#![forbid(unsafe_code)]

//! Core: key data model, layout document, and rotation geometry.
//!
//! # Role in Keyplane
//! `kpl-core` is the shared foundation. It owns the [`Key`](key::Key) and
//! [`Keyboard`](document::Keyboard) data model, the document mutation entry
//! points with their invariants, and the rotation geometry every other crate
//! builds on.
//!
//! # Primary responsibilities
//! - **Geometry**: forward/inverse rotation transforms, rotated hit testing,
//!   rotated bounding envelopes, pivot repositioning.
//! - **Key model**: primary/secondary rectangles, rotation state, legends,
//!   appearance, and the derived render classification.
//! - **Document**: atomic batched mutation, selection consistency, id
//!   minting, undo/redo snapshots.
//! - **Stabilizers**: the width-band position table for wide keys.
//!
//! # How it fits in the system
//! The codec (`kpl-kle`) reads and writes the document model; the
//! interaction engine (`kpl-input`) and renderer (`kpl-render`) consume the
//! same geometry so hit testing can never desync from what is drawn.

pub mod document;
pub mod geometry;
pub mod history;
pub mod key;
pub mod stabilizer;

pub use document::{
    BatchOutcome, Document, DocumentError, Keyboard, KeyChanges, KeyPatch, Metadata,
};
pub use geometry::{Pivot, Point, Rotation, UnitRect};
pub use history::History;
pub use key::{Key, KeyId, RenderKind};
