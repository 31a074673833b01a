//! Scene Mutation Applier.
//!
//! Applying is split into a fallible, side-effect free [`prepare`] step and
//! an infallible [`PreparedDocument::apply_to`] step. Every validation
//! happens before the live scene is touched, so invalid input can never
//! leave the scene half-cleared.

use crate::document::{ProjectFile, normalize, parse_document};
use crate::error::CoreError;
use crate::model::SceneDocument;
use serde_json::Value;
use std::collections::HashSet;
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyOptions {
    /// Remove existing objects first. When false, incoming objects are
    /// appended on top of the current ones.
    pub clear: bool,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self { clear: true }
    }
}

/// What an apply changed, for the caller's notifications.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AppliedChange {
    /// New canvas size, if the document carried one.
    pub resized: Option<(f64, f64)>,
    pub objects_added: usize,
    /// Incoming objects whose ids collided and were re-issued.
    pub renamed: usize,
}

/// A document that passed validation and is ready to apply.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedDocument {
    file: ProjectFile,
}

/// Validate and normalize input from an import or a generated design.
pub fn prepare(value: Value, at: OffsetDateTime) -> Result<PreparedDocument, CoreError> {
    normalize(value, at).map(|file| PreparedDocument { file })
}

/// [`prepare`] from JSON text.
pub fn prepare_text(text: &str, at: OffsetDateTime) -> Result<PreparedDocument, CoreError> {
    parse_document(text, at).map(|file| PreparedDocument { file })
}

impl PreparedDocument {
    pub fn file(&self) -> &ProjectFile {
        &self.file
    }

    pub fn into_file(self) -> ProjectFile {
        self.file
    }

    /// Apply to the live scene. `on_resize` runs once, after the scene has
    /// been updated, when the document carried a valid canvas size.
    pub fn apply_to(
        self,
        live: &mut SceneDocument,
        opts: ApplyOptions,
        on_resize: impl FnOnce(f64, f64),
    ) -> AppliedChange {
        let ProjectFile { name, canvas, .. } = self.file;
        let mut change = AppliedChange {
            resized: canvas.size(),
            ..AppliedChange::default()
        };
        let background_color = canvas
            .background_color
            .as_ref()
            .map(|_| canvas.background_color());
        let background_image = canvas.background_image();

        if opts.clear {
            live.objects.clear();
            live.name = name;
        }
        if let Some((width, height)) = change.resized {
            live.width = width;
            live.height = height;
        }
        // A blank color clears the canvas color; an absent one keeps it.
        if let Some(color) = background_color {
            live.background.color = color;
        }
        if let Some(image) = background_image {
            live.background.image = Some(image);
        }

        let mut seen: HashSet<_> = live.objects.iter().map(|o| o.id).collect();
        for mut object in canvas.objects.unwrap_or_default() {
            if !seen.insert(object.id) {
                let fresh = live.fresh_id(object.kind.id_prefix());
                log::debug!("re-issuing colliding id {} as {fresh}", object.id);
                object.id = fresh;
                seen.insert(fresh);
                change.renamed += 1;
            }
            live.push(object);
            change.objects_added += 1;
        }

        if let Some((width, height)) = change.resized {
            on_resize(width, height);
        }
        change
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::ObjectId;
    use crate::model::{Color, ObjectKind, Paint, SceneObject};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn at() -> OffsetDateTime {
        OffsetDateTime::UNIX_EPOCH
    }

    fn live_scene() -> SceneDocument {
        let mut doc = SceneDocument::new(650.0, 650.0);
        doc.push(SceneObject::new(
            ObjectId::intern("existing"),
            ObjectKind::Circle { radius: 10.0 },
        ));
        doc
    }

    #[test]
    fn bare_import_replaces_scene_and_resizes() {
        let mut live = live_scene();
        let mut resized = None;
        let prepared = prepare(
            json!({
                "objects": [{"type": "rect", "left": 10, "top": 10, "width": 50, "height": 50, "fill": "#ff0000"}],
                "width": 200,
                "height": 200
            }),
            at(),
        )
        .unwrap();
        let change = prepared.apply_to(&mut live, ApplyOptions::default(), |w, h| {
            resized = Some((w, h))
        });

        assert_eq!(live.objects.len(), 1);
        assert_eq!((live.width, live.height), (200.0, 200.0));
        assert_eq!(resized, Some((200.0, 200.0)));
        assert_eq!(change.objects_added, 1);
        assert_eq!(live.objects[0].fill, Paint::Solid(Color::rgba(1.0, 0.0, 0.0, 1.0)));
    }

    #[test]
    fn invalid_input_never_touches_the_scene() {
        let live = live_scene();
        assert!(prepare(json!({"width": 10, "height": 10}), at()).is_err());
        assert_eq!(live, live_scene());
    }

    #[test]
    fn missing_or_zero_size_keeps_dimensions() {
        let mut live = live_scene();
        let mut called = false;
        prepare(json!({"objects": [], "width": 0, "height": 300}), at())
            .unwrap()
            .apply_to(&mut live, ApplyOptions::default(), |_, _| called = true);
        assert!(!called);
        assert_eq!((live.width, live.height), (650.0, 650.0));
    }

    #[test]
    fn merge_appends_and_reissues_colliding_ids() {
        let mut live = live_scene();
        let change = prepare(
            json!({"objects": [
                {"type": "rect", "name": "existing", "width": 5, "height": 5},
                {"type": "rect", "name": "fresh", "width": 5, "height": 5}
            ]}),
            at(),
        )
        .unwrap()
        .apply_to(&mut live, ApplyOptions { clear: false }, |_, _| {});

        assert_eq!(live.objects.len(), 3);
        assert_eq!(change.renamed, 1);
        assert_eq!(live.objects[0].id, ObjectId::intern("existing"));
        assert_ne!(live.objects[1].id, ObjectId::intern("existing"));
        assert_eq!(live.objects[2].id, ObjectId::intern("fresh"));
    }

    #[test]
    fn background_is_set_when_present() {
        let mut live = live_scene();
        prepare_text(
            r##"{"objects": [], "backgroundColor": "#000000",
                 "backgroundImage": {"src": "bg.png", "fit": "original"}}"##,
            at(),
        )
        .unwrap()
        .apply_to(&mut live, ApplyOptions::default(), |_, _| {});
        assert_eq!(live.background.color, Some(Paint::Solid(Color::BLACK)));
        assert_eq!(
            live.background.image.as_ref().map(|i| i.src.as_str()),
            Some("bg.png")
        );
    }

    #[test]
    fn blank_background_clears_and_absent_keeps() {
        let mut live = live_scene();
        prepare_text(r#"{"objects": []}"#, at())
            .unwrap()
            .apply_to(&mut live, ApplyOptions::default(), |_, _| {});
        assert_eq!(live.background.color, Some(Paint::Solid(Color::WHITE)));

        prepare_text(r#"{"objects": [], "backgroundColor": ""}"#, at())
            .unwrap()
            .apply_to(&mut live, ApplyOptions::default(), |_, _| {});
        assert_eq!(live.background.color, None);
        assert_eq!(
            crate::snapshot::restore(&crate::snapshot::capture(&live)).unwrap(),
            live
        );
    }
}
