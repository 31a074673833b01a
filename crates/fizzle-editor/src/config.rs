//! Editor configuration.

use crate::history::DEFAULT_DEPTH;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EditorConfig {
    /// Undo entries kept before the oldest are dropped.
    pub history_depth: usize,
    /// Offset applied to duplicated objects.
    pub duplicate_offset: (f64, f64),
    /// Canvas size for a fresh or reset session.
    pub canvas_size: (f64, f64),
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_depth: DEFAULT_DEPTH,
            duplicate_offset: (20.0, 20.0),
            canvas_size: (650.0, 650.0),
        }
    }
}
