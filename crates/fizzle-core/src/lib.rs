pub mod applier;
pub mod document;
pub mod error;
pub mod export;
pub mod id;
pub mod model;
pub mod path;
pub mod presets;
pub mod shapes;
pub mod snapshot;
pub mod stream;

pub use applier::{AppliedChange, ApplyOptions, PreparedDocument, prepare, prepare_text};
pub use document::{ExportOptions, ProjectFile, export_project, export_pure_json, normalize};
pub use error::CoreError;
pub use export::{RasterError, RasterOptions, Rasterizer, export_raster, fit_preview, render_svg};
pub use id::ObjectId;
pub use model::*;
pub use shapes::{ShapeKind, ShapeProps, TextPreset, create_shape};
pub use snapshot::{Snapshot, capture, restore};
pub use stream::{AssistantReply, StreamDecoder, StreamParseError};

// Callers pass timestamps in; re-exported so they need no direct dependency.
pub use time::OffsetDateTime;
