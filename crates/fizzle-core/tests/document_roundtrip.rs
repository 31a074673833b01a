//! Integration tests: Scene Document import → export → re-import, and
//! snapshot capture → restore.
//!
//! Verifies that no objects, order or attributes are lost on the lossless
//! JSON path, and that snapshots are a total inverse for supported kinds.

use fizzle_core::document::{CanvasPayload, export_project_json, parse_document};
use fizzle_core::snapshot::PLACEHOLDER_KEY;
use fizzle_core::*;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

const POSTER: &str = include_str!("fixtures/poster.json");

fn at() -> OffsetDateTime {
    OffsetDateTime::UNIX_EPOCH
}

fn poster_scene() -> SceneDocument {
    parse_document(POSTER, at())
        .expect("fixture parses")
        .canvas
        .into_scene()
        .expect("fixture has objects")
}

fn ids(doc: &SceneDocument) -> Vec<&str> {
    doc.objects.iter().map(|o| o.id.as_str()).collect()
}

// ─── Import ──────────────────────────────────────────────────────────────

#[test]
fn wrapped_fixture_imports_every_object_in_order() {
    let doc = poster_scene();
    assert_eq!(
        ids(&doc),
        vec!["backdrop", "sun", "wave", "gull", "headline", "logo", "badge"]
    );
    assert_eq!((doc.width, doc.height), (1080.0, 1350.0));
    assert_eq!(doc.background.color, Some(Paint::parse("#fef3c7")));
    assert_eq!(
        doc.background.image.as_ref().map(|i| i.fit),
        Some(ImageFit::Contain)
    );
    assert!(doc.objects[0].is_locked());
    assert!(!doc.objects[1].is_locked());
}

#[test]
fn variants_are_decoded_once() {
    let doc = poster_scene();
    let kinds: Vec<&str> = doc.objects.iter().map(|o| o.kind.type_name()).collect();
    assert_eq!(
        kinds,
        vec!["rect", "circle", "polygon", "path", "textbox", "image", "Group"]
    );
    match &doc.objects[3].kind {
        ObjectKind::Path { data } => assert_eq!(data, "M 0 20 Q 20 0 40 20 Q 60 0 80 20"),
        other => panic!("expected path, got {other:?}"),
    }
    match &doc.objects[4].kind {
        ObjectKind::Text { font, align, content, .. } => {
            assert_eq!(content, "SUMMER\nFESTIVAL");
            assert_eq!(font.weight, 700);
            assert!(font.italic);
            assert_eq!(*align, TextAlign::Center);
        }
        other => panic!("expected text, got {other:?}"),
    }
}

#[test]
fn bounds_follow_kind_geometry() {
    let doc = poster_scene();
    let gull = doc.get(ObjectId::intern("gull")).unwrap().bounds();
    assert_eq!((gull.width, gull.height), (80.0, 20.0));
    let logo = doc.get(ObjectId::intern("logo")).unwrap().bounds();
    assert_eq!((logo.width, logo.height), (60.0, 60.0));
    let headline = doc.get(ObjectId::intern("headline")).unwrap().bounds();
    assert!((headline.height - 2.0 * 96.0 * 1.1).abs() < 1e-9);
}

// ─── Export → re-import ──────────────────────────────────────────────────

#[test]
fn export_then_import_is_lossless() {
    let doc = poster_scene();
    let json = export_project_json(&doc, ExportOptions::default(), at()).unwrap();
    let reimported = parse_document(&json, at()).unwrap().canvas.into_scene().unwrap();
    assert_eq!(reimported.objects, doc.objects);
    assert_eq!(reimported.background, doc.background);
}

#[test]
fn unknown_keys_survive_export() {
    let doc = poster_scene();
    let payload = CanvasPayload::from_scene(&doc, ExportOptions::default());
    let value = serde_json::to_value(&payload).unwrap();
    let objects = value["objects"].as_array().unwrap();
    assert_eq!(objects[0]["originX"], json!("left"));
    assert_eq!(objects[5]["crossOrigin"], json!("anonymous"));
    assert_eq!(objects[6]["type"], json!("Group"));
    assert_eq!(objects[6]["objects"].as_array().map(Vec::len), Some(1));
}

#[test]
fn export_options_drop_backgrounds() {
    let doc = poster_scene();
    let opts = ExportOptions {
        include_background: false,
        include_background_image: false,
    };
    let value: Value =
        serde_json::from_str(&export_pure_json(&doc, opts).unwrap()).unwrap();
    assert!(value.get("backgroundColor").is_none());
    assert!(value.get("backgroundImage").is_none());
    assert_eq!(value["width"], json!(1080.0));
}

#[test]
fn wrapped_export_carries_metadata() {
    let doc = poster_scene();
    let file = export_project(&doc, ExportOptions::default(), at());
    assert_eq!(file.metadata.total_objects, 7);
    assert_eq!(file.metadata.app, "Fizzle");
    assert_eq!(file.created_at, "1970-01-01T00:00:00Z");
    assert_eq!(file.canvas.version.as_deref(), Some("6.0.0"));
}

// ─── Snapshots ───────────────────────────────────────────────────────────

#[test]
fn snapshot_roundtrip_of_supported_kinds() {
    let mut doc = poster_scene();
    doc.objects.retain(|o| !matches!(o.kind, ObjectKind::Unsupported { .. }));
    let restored = restore(&capture(&doc)).unwrap();
    assert_eq!(restored, doc);
}

#[test]
fn snapshot_degrades_unsupported_kinds_in_place() {
    let doc = poster_scene();
    let restored = restore(&capture(&doc)).unwrap();
    assert_eq!(ids(&restored), ids(&doc));
    let badge = restored.get(ObjectId::intern("badge")).unwrap();
    assert_eq!(badge.extra.get(PLACEHOLDER_KEY), Some(&json!("Group")));
    assert_eq!(badge.bounds(), doc.get(ObjectId::intern("badge")).unwrap().bounds());
}

// ─── Applier ─────────────────────────────────────────────────────────────

#[test]
fn bare_document_scenario() {
    let mut live = SceneDocument::default();
    let bare = json!({
        "objects": [{"type": "rect", "left": 10, "top": 10, "width": 50, "height": 50, "fill": "#ff0000"}],
        "width": 200,
        "height": 200
    });
    let change = prepare(bare, at())
        .unwrap()
        .apply_to(&mut live, ApplyOptions::default(), |_, _| {});
    assert_eq!(live.objects.len(), 1);
    assert_eq!((live.width, live.height), (200.0, 200.0));
    assert_eq!(change.resized, Some((200.0, 200.0)));
}

#[test]
fn generated_list_uses_first_design() {
    let file = normalize(
        json!([
            {"objects": [{"type": "circle", "radius": 5}], "width": 300, "height": 300},
            {"objects": []}
        ]),
        at(),
    )
    .unwrap();
    assert_eq!(file.name, "AI Generated Design");
    assert_eq!(file.metadata.app, "Fizzle AI");
    assert_eq!(file.metadata.total_objects, 1);
}

#[test]
fn invalid_inputs_are_rejected_before_apply() {
    for input in [json!([]), json!("text"), json!({"canvas": {"width": 10}}), json!({})] {
        let err = prepare(input.clone(), at()).unwrap_err();
        assert!(
            matches!(err, CoreError::InvalidDocument(_)),
            "expected InvalidDocument for {input}, got {err:?}"
        );
    }
}
