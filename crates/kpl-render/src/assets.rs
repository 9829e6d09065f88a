#![forbid(unsafe_code)]

//! Renderer-owned asset cache: font handles and colorized icon bitmaps.
//!
//! Asset loading is the one asynchronous boundary near the core. The model
//! is: issue a load request (the entry goes `Pending`), register a ready
//! listener, re-render on completion. A render pass with unready assets
//! falls back to the system font or a placeholder glyph; nothing ever
//! blocks on a load.
//!
//! The cache is an explicit object passed by reference, not ambient global
//! state, and its lifetime is eviction-free: entries are cleared only by an
//! explicit asset reload.

use ahash::AHashMap;

use kpl_core::key::{Color, FontId};

/// Lifecycle of one cached asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetState<T> {
    /// Requested but not yet loaded; render with a fallback.
    Pending,
    Ready(T),
    /// Load failed; render with a fallback, do not retry automatically.
    Failed,
}

/// A loaded font, as much of it as the draw layer needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontHandle {
    /// Resolved family name handed to the draw backend.
    pub family: String,
}

/// A colorized icon bitmap, keyed by glyph name and fill color.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconBitmap {
    pub width: u32,
    pub height: u32,
    /// RGBA pixels, row-major.
    pub pixels: Vec<u8>,
}

/// Fallback font family used while a font is pending or failed.
pub const FALLBACK_FONT_FAMILY: &str = "sans-serif";

type ReadyListener = Box<dyn FnMut() + Send>;

/// Font and icon cache owned by the renderer.
#[derive(Default)]
pub struct AssetCache {
    fonts: AHashMap<FontId, AssetState<FontHandle>>,
    icons: AHashMap<(String, Color), AssetState<IconBitmap>>,
    on_ready: Option<ReadyListener>,
}

impl std::fmt::Debug for AssetCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetCache")
            .field("fonts", &self.fonts.len())
            .field("icons", &self.icons.len())
            .field("has_listener", &self.on_ready.is_some())
            .finish()
    }
}

impl AssetCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the completion listener (typically "schedule a re-render").
    pub fn set_ready_listener(&mut self, listener: ReadyListener) {
        self.on_ready = Some(listener);
    }

    /// Request a font. Idempotent: an entry already pending, ready, or
    /// failed is left alone.
    pub fn request_font(&mut self, id: &FontId) {
        self.fonts
            .entry(id.clone())
            .or_insert(AssetState::Pending);
    }

    /// Current state of a font, if it was ever requested.
    #[must_use]
    pub fn font(&self, id: &FontId) -> Option<&AssetState<FontHandle>> {
        self.fonts.get(id)
    }

    /// The family to draw with right now: the loaded family, or the
    /// fallback while the font is pending, failed, or never requested.
    #[must_use]
    pub fn font_family_or_fallback(&self, id: &FontId) -> &str {
        match self.fonts.get(id) {
            Some(AssetState::Ready(handle)) => &handle.family,
            _ => FALLBACK_FONT_FAMILY,
        }
    }

    /// Complete a font load and notify the listener.
    pub fn complete_font(&mut self, id: FontId, handle: FontHandle) {
        self.fonts.insert(id, AssetState::Ready(handle));
        self.notify();
    }

    /// Mark a font load as failed and notify the listener.
    pub fn fail_font(&mut self, id: FontId) {
        self.fonts.insert(id, AssetState::Failed);
        self.notify();
    }

    /// Request a colorized icon bitmap.
    pub fn request_icon(&mut self, name: &str, color: &Color) {
        self.icons
            .entry((name.to_string(), color.clone()))
            .or_insert(AssetState::Pending);
    }

    /// Current state of an icon, if it was ever requested.
    #[must_use]
    pub fn icon(&self, name: &str, color: &Color) -> Option<&AssetState<IconBitmap>> {
        self.icons.get(&(name.to_string(), color.clone()))
    }

    /// Complete an icon load and notify the listener.
    pub fn complete_icon(&mut self, name: String, color: Color, bitmap: IconBitmap) {
        self.icons.insert((name, color), AssetState::Ready(bitmap));
        self.notify();
    }

    /// Drop every cached asset. Only called on explicit asset reload.
    pub fn clear(&mut self) {
        self.fonts.clear();
        self.icons.clear();
    }

    fn notify(&mut self) {
        if let Some(listener) = self.on_ready.as_mut() {
            listener();
        }
    }
}
