//! Error taxonomy for scene documents.

use crate::id::ObjectId;

/// Errors raised while reading, restoring or editing a scene document.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A snapshot or document is structurally invalid (missing object list).
    #[error("malformed document: {0}")]
    MalformedDocument(String),

    /// Imported or generated input has no canonical object list after
    /// normalization.
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// The input text is not JSON at all.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No object with this id exists in the scene.
    #[error("object not found: {0}")]
    ObjectNotFound(ObjectId),
}
