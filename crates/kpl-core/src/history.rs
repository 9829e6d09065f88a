#![forbid(unsafe_code)]

//! Undo/redo as a bounded snapshot stack.
//!
//! The document is copy-on-write, so a checkpoint is just a whole-keyboard
//! clone. Deliberately simple: two stacks, no deltas, no coalescing.

use crate::document::Keyboard;

/// Default maximum number of retained undo snapshots.
pub const DEFAULT_HISTORY_LIMIT: usize = 64;

/// Bounded undo/redo stack of keyboard snapshots.
#[derive(Debug, Clone, Default)]
pub struct History {
    undo: Vec<Keyboard>,
    redo: Vec<Keyboard>,
    limit: usize,
}

impl History {
    /// Create a history with the default snapshot limit.
    #[must_use]
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_HISTORY_LIMIT)
    }

    /// Create a history retaining at most `limit` undo snapshots.
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            undo: Vec::new(),
            redo: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Record the pre-mutation state. Clears the redo stack.
    pub fn checkpoint(&mut self, before: &Keyboard) {
        if self.undo.len() == self.limit {
            self.undo.remove(0);
        }
        self.undo.push(before.clone());
        self.redo.clear();
    }

    /// Pop the most recent snapshot, pushing `current` onto the redo stack.
    pub fn undo(&mut self, current: &Keyboard) -> Option<Keyboard> {
        let snapshot = self.undo.pop()?;
        self.redo.push(current.clone());
        Some(snapshot)
    }

    /// Inverse of [`undo`](History::undo).
    pub fn redo(&mut self, current: &Keyboard) -> Option<Keyboard> {
        let snapshot = self.redo.pop()?;
        self.undo.push(current.clone());
        Some(snapshot)
    }

    /// Whether an undo snapshot is available.
    #[inline]
    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    /// Whether a redo snapshot is available.
    #[inline]
    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }
}
