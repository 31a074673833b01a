//! Editor session: the single owner of the live scene.
//!
//! Hosts (the WASM bridge, the CLI, tests) hold one `Editor` and call into
//! it; nothing reaches the scene through ambient state. Every mutating
//! entry point captures the pre-mutation snapshot, mutates, records the
//! history entry, then tells the observer what changed.

use crate::commands::{Command, CommandError, Outcome, SelectionChange};
use crate::config::EditorConfig;
use crate::design_history::DesignHistory;
use crate::history::{History, HistoryError};
use crate::shortcuts::{ShortcutAction, ShortcutMap};
use fizzle_core::applier::{AppliedChange, ApplyOptions, PreparedDocument, prepare, prepare_text};
use fizzle_core::document::{ExportOptions, export_project_json, export_pure_json};
use fizzle_core::error::CoreError;
use fizzle_core::id::ObjectId;
use fizzle_core::model::{BackgroundImage, Paint, SceneDocument, SceneObject};
use fizzle_core::snapshot::{self, Snapshot};
use serde_json::Value;
use time::OffsetDateTime;

/// Notifications for the surrounding UI. Every method defaults to a no-op.
pub trait EditorObserver {
    fn canvas_resized(&mut self, _width: f64, _height: f64) {}
    fn history_changed(&mut self, _can_undo: bool, _can_redo: bool) {}
    /// The scene must be re-rendered. `epoch` increases on every change.
    fn scene_changed(&mut self, _epoch: u64) {}
    fn selection_changed(&mut self, _selection: Option<ObjectId>) {}
}

pub struct NoopObserver;

impl EditorObserver for NoopObserver {}

#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    History(#[from] HistoryError),
}

pub struct Editor {
    scene: SceneDocument,
    history: History,
    selection: Option<ObjectId>,
    designs: DesignHistory,
    config: EditorConfig,
    observer: Box<dyn EditorObserver>,
    epoch: u64,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl Editor {
    pub fn new(config: EditorConfig) -> Self {
        Self::with_observer(config, Box::new(NoopObserver))
    }

    pub fn with_observer(config: EditorConfig, observer: Box<dyn EditorObserver>) -> Self {
        let (width, height) = config.canvas_size;
        Self {
            scene: SceneDocument::new(width, height),
            history: History::new(config.history_depth),
            selection: None,
            designs: DesignHistory::new(),
            config,
            observer,
            epoch: 0,
        }
    }

    pub fn set_observer(&mut self, observer: Box<dyn EditorObserver>) {
        self.observer = observer;
    }

    pub fn scene(&self) -> &SceneDocument {
        &self.scene
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn designs(&self) -> &DesignHistory {
        &self.designs
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn selection(&self) -> Option<ObjectId> {
        self.selection
    }

    pub fn selected_object(&self) -> Option<&SceneObject> {
        self.selection.and_then(|id| self.scene.get(id))
    }

    // ─── Commands ────────────────────────────────────────────────────────

    /// Run a command. Nothing is recorded when it fails or changes nothing.
    pub fn execute(&mut self, command: Command) -> Result<Outcome, CommandError> {
        command.validate(&self.scene)?;
        let before = snapshot::capture(&self.scene);
        let outcome = command.apply(&mut self.scene, &self.config)?;
        if outcome.changed {
            self.commit(before, command.label());
        }
        self.apply_selection(outcome.selection);
        Ok(outcome)
    }

    /// Run a command built for the selected object.
    pub fn execute_on_selection(
        &mut self,
        build: impl FnOnce(ObjectId) -> Command,
    ) -> Result<Outcome, CommandError> {
        let id = self.selection.ok_or(CommandError::NoSelection)?;
        self.execute(build(id))
    }

    // ─── History ─────────────────────────────────────────────────────────

    pub fn undo(&mut self) -> Result<String, HistoryError> {
        self.settle_gesture();
        let size = (self.scene.width, self.scene.height);
        let label = self.history.undo(&mut self.scene)?;
        self.after_restore(size);
        Ok(label)
    }

    pub fn redo(&mut self) -> Result<String, HistoryError> {
        self.settle_gesture();
        let size = (self.scene.width, self.scene.height);
        let label = self.history.redo(&mut self.scene)?;
        self.after_restore(size);
        Ok(label)
    }

    /// Open a drag gesture: moves until [`end_gesture`](Self::end_gesture)
    /// undo as one step.
    pub fn begin_gesture(&mut self) {
        self.history.begin_batch(&self.scene);
    }

    /// Close a drag gesture. Returns true if a history entry was pushed.
    pub fn end_gesture(&mut self, label: &str) -> bool {
        let pushed = self.history.end_batch(&self.scene, label);
        if pushed {
            self.notify_history();
        }
        pushed
    }

    /// Undo and redo close an open gesture before touching the stacks.
    fn settle_gesture(&mut self) {
        if self.history.settle_batch(&self.scene) {
            self.notify_history();
        }
    }

    // ─── Documents ───────────────────────────────────────────────────────

    /// Import a wrapped or bare Scene Document. Invalid input leaves the
    /// scene untouched.
    pub fn import_json(
        &mut self,
        text: &str,
        opts: ApplyOptions,
        at: OffsetDateTime,
    ) -> Result<AppliedChange, CoreError> {
        let prepared = prepare_text(text, at)?;
        Ok(self.apply_prepared(prepared, opts, "Import"))
    }

    /// Apply a document that is already parsed (e.g. a generated design).
    pub fn apply_document(
        &mut self,
        document: Value,
        opts: ApplyOptions,
        at: OffsetDateTime,
    ) -> Result<AppliedChange, CoreError> {
        let prepared = prepare(document, at)?;
        Ok(self.apply_prepared(prepared, opts, "Apply Design"))
    }

    pub fn export_json(&self, opts: ExportOptions, at: OffsetDateTime) -> Result<String, CoreError> {
        export_project_json(&self.scene, opts, at)
    }

    pub fn export_pure(&self, opts: ExportOptions) -> Result<String, CoreError> {
        export_pure_json(&self.scene, opts)
    }

    fn apply_prepared(
        &mut self,
        prepared: PreparedDocument,
        opts: ApplyOptions,
        label: &str,
    ) -> AppliedChange {
        let before = snapshot::capture(&self.scene);
        let observer = &mut self.observer;
        let change = prepared.apply_to(&mut self.scene, opts, |width, height| {
            observer.canvas_resized(width, height)
        });
        log::debug!(
            "{label}: {} objects added, {} renamed",
            change.objects_added,
            change.renamed
        );
        if before != snapshot::capture(&self.scene) {
            self.commit(before, label);
        }
        if opts.clear {
            self.apply_selection(SelectionChange::Clear);
        }
        change
    }

    // ─── Canvas ──────────────────────────────────────────────────────────

    /// Resize the canvas. Returns false for a non-positive size or when the
    /// size is unchanged.
    pub fn resize_canvas(&mut self, width: f64, height: f64) -> bool {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if !valid(width) || !valid(height) {
            log::warn!("ignoring canvas size {width}x{height}");
            return false;
        }
        if (self.scene.width, self.scene.height) == (width, height) {
            return false;
        }
        let before = snapshot::capture(&self.scene);
        self.scene.width = width;
        self.scene.height = height;
        self.commit(before, "Resize Canvas");
        self.observer.canvas_resized(width, height);
        true
    }

    pub fn set_background_color(&mut self, color: Option<Paint>) -> bool {
        if self.scene.background.color == color {
            return false;
        }
        let before = snapshot::capture(&self.scene);
        self.scene.background.color = color;
        self.commit(before, "Background Color");
        true
    }

    pub fn set_background_image(&mut self, image: Option<BackgroundImage>) -> bool {
        if self.scene.background.image == image {
            return false;
        }
        let before = snapshot::capture(&self.scene);
        self.scene.background.image = image;
        self.commit(before, "Background Image");
        true
    }

    // ─── Selection ───────────────────────────────────────────────────────

    pub fn select(&mut self, id: ObjectId) -> Result<(), CommandError> {
        if !self.scene.contains(id) {
            return Err(CommandError::NotFound(id));
        }
        self.apply_selection(SelectionChange::Select(id));
        Ok(())
    }

    pub fn deselect(&mut self) {
        self.apply_selection(SelectionChange::Clear);
    }

    fn apply_selection(&mut self, change: SelectionChange) {
        let next = match change {
            SelectionChange::Keep => self.selection.filter(|id| self.scene.contains(*id)),
            SelectionChange::Select(id) => Some(id),
            SelectionChange::Clear => None,
        };
        if next != self.selection {
            self.selection = next;
            self.observer.selection_changed(next);
        }
    }

    // ─── Shortcuts ───────────────────────────────────────────────────────

    /// Resolve and run a key event. Returns the action that ran, or `None`
    /// when the key is unbound or needs a selection that is absent. Empty
    /// history stacks are not an error.
    pub fn handle_shortcut(
        &mut self,
        key: &str,
        ctrl: bool,
        shift: bool,
        alt: bool,
        meta: bool,
    ) -> Result<Option<ShortcutAction>, EditorError> {
        let Some(action) = ShortcutMap::resolve(key, ctrl, shift, alt, meta) else {
            return Ok(None);
        };
        if ShortcutMap::needs_selection(action) && self.selection.is_none() {
            return Ok(None);
        }

        match action {
            ShortcutAction::Undo => match self.undo() {
                Ok(_) | Err(HistoryError::NothingToUndo) => {}
                Err(e) => return Err(e.into()),
            },
            ShortcutAction::Redo => match self.redo() {
                Ok(_) | Err(HistoryError::NothingToRedo) => {}
                Err(e) => return Err(e.into()),
            },
            ShortcutAction::Deselect => self.deselect(),
            ShortcutAction::Duplicate => {
                self.execute_on_selection(Command::Duplicate)?;
            }
            ShortcutAction::Delete => {
                self.execute_on_selection(Command::Delete)?;
            }
            ShortcutAction::ToggleLock => {
                self.execute_on_selection(Command::ToggleLock)?;
            }
            ShortcutAction::BringForward => {
                self.execute_on_selection(Command::BringForward)?;
            }
            ShortcutAction::SendBackward => {
                self.execute_on_selection(Command::SendBackward)?;
            }
            ShortcutAction::BringToFront => {
                self.execute_on_selection(Command::BringToFront)?;
            }
            ShortcutAction::SendToBack => {
                self.execute_on_selection(Command::SendToBack)?;
            }
        }
        Ok(Some(action))
    }

    // ─── Design History ──────────────────────────────────────────────────

    /// Apply an accepted design and remember it for rollback. Returns the
    /// new Design History entry id. An invalid design is rejected before
    /// anything changes.
    pub fn accept_design(
        &mut self,
        document: Value,
        prompt: &str,
        at: OffsetDateTime,
    ) -> Result<String, CoreError> {
        let prepared = prepare(document.clone(), at)?;
        self.apply_prepared(prepared, ApplyOptions::default(), "Apply Design");
        Ok(self.designs.add(document, prompt, at).id.clone())
    }

    /// Re-apply a design from the Design History. Undoable like any other
    /// change.
    pub fn rollback_to(&mut self, id: &str, at: OffsetDateTime) -> Result<AppliedChange, CommandError> {
        let document = self
            .designs
            .get(id)
            .ok_or_else(|| CommandError::UnknownDesign(id.to_string()))?
            .document
            .clone();
        let prepared = prepare(document, at)?;
        Ok(self.apply_prepared(prepared, ApplyOptions::default(), "Restore Design"))
    }

    /// Back to a blank canvas: empties the scene, both history stacks and
    /// the Design History.
    pub fn reset(&mut self) {
        let (width, height) = self.config.canvas_size;
        let resized = (self.scene.width, self.scene.height) != (width, height);
        self.scene = SceneDocument::new(width, height);
        self.history.clear();
        self.designs.clear();
        self.apply_selection(SelectionChange::Clear);
        if resized {
            self.observer.canvas_resized(width, height);
        }
        self.touch();
        self.notify_history();
    }

    // ─── Bookkeeping ─────────────────────────────────────────────────────

    fn commit(&mut self, before: Snapshot, label: &str) {
        self.history.record_snapshot(before, label);
        self.touch();
        self.notify_history();
    }

    fn after_restore(&mut self, previous_size: (f64, f64)) {
        let size = (self.scene.width, self.scene.height);
        if size != previous_size {
            self.observer.canvas_resized(size.0, size.1);
        }
        self.apply_selection(SelectionChange::Keep);
        self.touch();
        self.notify_history();
    }

    fn touch(&mut self) {
        self.epoch += 1;
        self.observer.scene_changed(self.epoch);
    }

    fn notify_history(&mut self) {
        let (can_undo, can_redo) = (self.history.can_undo(), self.history.can_redo());
        self.observer.history_changed(can_undo, can_redo);
    }
}
