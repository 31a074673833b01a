//! Undo/Redo history.
//!
//! Every entry is a [`Snapshot`] of the scene taken *before* a mutation,
//! plus a short label. Undo pops the top entry, pushes a capture of the
//! live scene onto the redo stack, and replaces the live scene with a fresh
//! restore of the popped snapshot. Redo is symmetric.
//!
//! Drag gestures use snapshot batching: one capture when the gesture
//! starts, one entry when it ends, and only if the scene actually changed.
//! Undo or redo while a gesture is still open closes it first, so the
//! gesture's own entry is the one that gets undone.

use fizzle_core::error::CoreError;
use fizzle_core::model::SceneDocument;
use fizzle_core::snapshot::{self, Snapshot};

pub const DEFAULT_DEPTH: usize = 100;

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("nothing to undo")]
    NothingToUndo,

    #[error("nothing to redo")]
    NothingToRedo,

    /// The stored snapshot could not be restored. Scene and stacks are
    /// left as they were.
    #[error("could not restore snapshot: {0}")]
    Restore(#[from] CoreError),
}

/// Availability of undo/redo, derived from stack occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryState {
    Idle,
    CanUndoOnly,
    CanRedoOnly,
    CanBoth,
}

#[derive(Debug, Clone)]
struct Entry {
    snapshot: Snapshot,
    label: String,
}

/// Manages undo/redo stacks with batch grouping for drag gestures.
#[derive(Debug)]
pub struct History {
    undo_stack: Vec<Entry>,
    redo_stack: Vec<Entry>,
    /// Maximum undo depth.
    max_depth: usize,
    /// Batch nesting depth (0 = not batching).
    batch_depth: usize,
    /// Snapshot captured at the start of a batch.
    batch_snapshot: Option<Snapshot>,
    /// Whether any mutation was recorded during the current batch.
    batch_dirty: bool,
    /// Label of the last mutation recorded inside the batch.
    batch_label: Option<String>,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_DEPTH)
    }
}

impl History {
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo_stack: Vec::with_capacity(max_depth.min(DEFAULT_DEPTH)),
            redo_stack: Vec::new(),
            max_depth: max_depth.max(1),
            batch_depth: 0,
            batch_snapshot: None,
            batch_dirty: false,
            batch_label: None,
        }
    }

    /// Record the scene as it is *before* a mutation. Clears redo.
    pub fn record_mutation(&mut self, live: &SceneDocument, label: &str) {
        if self.batch_depth > 0 {
            self.mark_batch(label);
            return;
        }
        self.push_entry(snapshot::capture(live), label);
    }

    /// Record a snapshot that was captured before a mutation that has
    /// since succeeded. Inside a batch this only marks the batch dirty.
    pub fn record_snapshot(&mut self, before: Snapshot, label: &str) {
        if self.batch_depth > 0 {
            self.mark_batch(label);
            return;
        }
        self.push_entry(before, label);
    }

    fn mark_batch(&mut self, label: &str) {
        self.batch_dirty = true;
        match &self.batch_label {
            Some(prev) if prev == label => {}
            Some(prev) => {
                // Usually a gesture whose end was never delivered.
                log::warn!("`{label}` recorded inside an open `{prev}` batch");
                self.batch_label = Some(label.to_string());
            }
            None => self.batch_label = Some(label.to_string()),
        }
    }

    fn push_entry(&mut self, snapshot: Snapshot, label: &str) {
        self.undo_stack.push(Entry {
            snapshot,
            label: label.to_string(),
        });
        if self.undo_stack.len() > self.max_depth {
            self.undo_stack.remove(0);
        }
        // Clear redo stack on new action
        self.redo_stack.clear();
        log::debug!("recorded `{label}` (undo depth {})", self.undo_stack.len());
    }

    /// Start a batch group. Nested batches collapse into the outermost.
    pub fn begin_batch(&mut self, live: &SceneDocument) {
        if self.batch_depth == 0 {
            self.batch_snapshot = Some(snapshot::capture(live));
            self.batch_dirty = false;
            self.batch_label = None;
        }
        self.batch_depth += 1;
    }

    /// End a batch group. When the outermost batch closes and the scene
    /// changed, one entry is pushed. Returns true if an entry was pushed.
    pub fn end_batch(&mut self, live: &SceneDocument, label: &str) -> bool {
        if self.batch_depth == 0 {
            return false;
        }
        self.batch_depth -= 1;
        if self.batch_depth > 0 {
            return false;
        }

        self.batch_label = None;
        let before = self.batch_snapshot.take();
        let dirty = std::mem::take(&mut self.batch_dirty);
        match before {
            Some(before) if dirty && before != snapshot::capture(live) => {
                self.push_entry(before, label);
                true
            }
            _ => false,
        }
    }

    pub fn is_batching(&self) -> bool {
        self.batch_depth > 0
    }

    /// Close every open batch level at once, pushing the batch entry under
    /// the last recorded label when the scene changed. A later `end_batch`
    /// for the same gesture is then a no-op. Returns true if an entry was
    /// pushed.
    pub fn settle_batch(&mut self, live: &SceneDocument) -> bool {
        if self.batch_depth == 0 {
            return false;
        }
        let label = self.batch_label.clone().unwrap_or_else(|| "Edit".to_string());
        self.batch_depth = 1;
        self.end_batch(live, &label)
    }

    /// Undo the last entry. Returns its label.
    pub fn undo(&mut self, live: &mut SceneDocument) -> Result<String, HistoryError> {
        self.settle_batch(live);
        let entry = self.undo_stack.pop().ok_or(HistoryError::NothingToUndo)?;
        let restored = match snapshot::restore(&entry.snapshot) {
            Ok(scene) => scene,
            Err(e) => {
                self.undo_stack.push(entry);
                return Err(e.into());
            }
        };
        self.redo_stack.push(Entry {
            snapshot: snapshot::capture(live),
            label: entry.label.clone(),
        });
        *live = restored;
        log::debug!("undo `{}`", entry.label);
        Ok(entry.label)
    }

    /// Redo the last undone entry. Returns its label.
    pub fn redo(&mut self, live: &mut SceneDocument) -> Result<String, HistoryError> {
        self.settle_batch(live);
        let entry = self.redo_stack.pop().ok_or(HistoryError::NothingToRedo)?;
        let restored = match snapshot::restore(&entry.snapshot) {
            Ok(scene) => scene,
            Err(e) => {
                self.redo_stack.push(entry);
                return Err(e.into());
            }
        };
        self.undo_stack.push(Entry {
            snapshot: snapshot::capture(live),
            label: entry.label.clone(),
        });
        *live = restored;
        log::debug!("redo `{}`", entry.label);
        Ok(entry.label)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn state(&self) -> HistoryState {
        match (self.can_undo(), self.can_redo()) {
            (false, false) => HistoryState::Idle,
            (true, false) => HistoryState::CanUndoOnly,
            (false, true) => HistoryState::CanRedoOnly,
            (true, true) => HistoryState::CanBoth,
        }
    }

    pub fn undo_label(&self) -> Option<&str> {
        self.undo_stack.last().map(|e| e.label.as_str())
    }

    pub fn redo_label(&self) -> Option<&str> {
        self.redo_stack.last().map(|e| e.label.as_str())
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    /// Drop both stacks and any open batch.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.batch_depth = 0;
        self.batch_snapshot = None;
        self.batch_dirty = false;
        self.batch_label = None;
    }
}
