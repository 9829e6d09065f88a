#![forbid(unsafe_code)]

//! Renderer: deterministic draw commands and the asset cache.
//!
//! # Role in Keyplane
//! `kpl-render` turns a document plus interaction state into an ordered
//! list of draw commands for a canvas backend to replay. It owns the font
//! and icon [`AssetCache`](assets::AssetCache); loads never block a render
//! pass, they fall back and re-render on completion.
//!
//! # How it fits in the system
//! The renderer applies the same rotation transform convention as the hit
//! tester in `kpl-input` (translate to pivot, rotate, translate back), so
//! what is drawn and what is hit can never drift apart. Determinism is a
//! contract: identical inputs produce identical scenes, which backs the
//! canvas-snapshot export path.

pub mod assets;
pub mod scene;

pub use assets::{AssetCache, AssetState, FontHandle, IconBitmap};
pub use scene::{DrawCommand, RenderInput, RenderSettings, Scene, fingerprint, render};
