#![forbid(unsafe_code)]

//! KLE codec: the run-length row notation to and from the document model.
//!
//! # Role in Keyplane
//! `kpl-kle` owns both directions of the de-facto Keyboard-Layout-Editor
//! JSON dialect: [`parse`] turns layout text (strict JSON or the relaxed
//! unquoted-key notation) into a [`Keyboard`](kpl_core::Keyboard), and
//! [`serialize`] emits the same notation with minimal property deltas.
//!
//! # Guarantees
//! - Decode is all-or-nothing: an error never yields a partial document.
//!   An all-metadata input legitimately decodes to zero keys; whether that
//!   is a usage error is the caller's call.
//! - `parse(serialize(kb))` is semantically equivalent to `kb` (same key
//!   count, geometry, flags, and legends) for any valid document,
//!   including rotated and compound keys.

use thiserror::Error;

pub mod decode;
pub mod encode;
pub mod raw;

pub use decode::parse;
pub use encode::{serialize, serialize_value};

/// Unparseable or structurally invalid KLE input.
///
/// Messages are meant to be surfaced to the user verbatim.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormatError {
    /// Input is neither strict JSON nor recoverable relaxed notation.
    #[error("layout is not valid JSON or relaxed JSON: {0}")]
    Syntax(String),

    /// The top level must be an array of rows.
    #[error("layout root must be an array of rows, got {found}")]
    NotAnArray { found: &'static str },

    /// A metadata object may only appear as the first element.
    #[error("metadata object must be the first element, found one at index {index}")]
    MisplacedMetadata { index: usize },

    /// The leading metadata object did not deserialize.
    #[error("invalid metadata object: {0}")]
    Metadata(String),

    /// A property-delta object did not deserialize.
    #[error("row {row}: invalid property object: {cause}")]
    Props { row: usize, cause: String },

    /// Rows may only contain property objects and label strings.
    #[error("row {row}: rows may only contain property objects and label strings, got {found}")]
    InvalidRowItem { row: usize, found: &'static str },

    /// A top-level entry that is neither metadata nor a row array.
    #[error("entry {index} must be a row array, got {found}")]
    InvalidEntry { index: usize, found: &'static str },

    /// A dimension property must be positive.
    #[error("row {row}: {field} must be positive, got {value}")]
    InvalidDimension {
        row: usize,
        field: &'static str,
        value: f64,
    },
}
