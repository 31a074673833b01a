//! WASM bridge for Fizzle: exposes the editor session, the AI conversation
//! and the streaming decoder to the browser.
//!
//! Compiled via `wasm-pack build --target web`. The page owns rendering and
//! the network; this side owns every scene mutation and its history.

mod actions;

use actions::{action_to_name, parse_object_action, shape_props_from_json};
use fizzle_core::document::parse_document;
use fizzle_core::export::{ExportQuality, RasterError, RasterFormat, RasterOptions, Rasterizer};
use fizzle_core::{
    ApplyOptions, BackgroundImage, ExportOptions, ImageFit, ObjectId, OffsetDateTime, Paint,
    SceneDocument, ShapeKind, StreamDecoder, export_raster, fit_preview, render_svg,
};
use fizzle_editor::conversation::{MessageId, PreviewStatus};
use fizzle_editor::design_history::PROMPT_PREVIEW_CHARS;
use fizzle_editor::{Command, Conversation, Editor, EditorConfig, EditorObserver, RequestTicket};
use serde_json::{Value, json};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;

/// Forwards editor notifications to the page as `(event, payloadJson)`.
struct JsObserver {
    listener: Rc<RefCell<Option<js_sys::Function>>>,
}

impl JsObserver {
    fn emit(&self, event: &str, payload: Value) {
        let listener = self.listener.borrow();
        let Some(listener) = listener.as_ref() else {
            return;
        };
        let result = listener.call2(
            &JsValue::NULL,
            &JsValue::from_str(event),
            &JsValue::from_str(&payload.to_string()),
        );
        if let Err(e) = result {
            log::warn!("listener threw on {event}: {e:?}");
        }
    }
}

impl EditorObserver for JsObserver {
    fn canvas_resized(&mut self, width: f64, height: f64) {
        self.emit("canvasResized", json!({ "width": width, "height": height }));
    }

    fn history_changed(&mut self, can_undo: bool, can_redo: bool) {
        self.emit("historyChanged", json!({ "canUndo": can_undo, "canRedo": can_redo }));
    }

    fn scene_changed(&mut self, epoch: u64) {
        self.emit("sceneChanged", json!({ "epoch": epoch }));
    }

    fn selection_changed(&mut self, selection: Option<ObjectId>) {
        self.emit("selectionChanged", json!({ "id": selection }));
    }
}

/// The request currently streaming into the chat panel.
struct ActiveStream {
    ticket: RequestTicket,
    decoder: StreamDecoder,
}

/// The main WASM-facing editor controller.
///
/// Holds the editor session and the chat panel state. All interaction from
/// the page goes through this struct.
#[wasm_bindgen]
pub struct FizzleEditor {
    editor: Editor,
    chat: Conversation,
    stream: Option<ActiveStream>,
    listener: Rc<RefCell<Option<js_sys::Function>>>,
}

impl Default for FizzleEditor {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

#[wasm_bindgen]
impl FizzleEditor {
    /// Create an editor with a blank canvas. A non-positive size falls back
    /// to the default 650×650.
    #[wasm_bindgen(constructor)]
    pub fn new(width: f64, height: f64) -> Self {
        console_error_panic_hook_setup();

        let mut config = EditorConfig::default();
        if width > 0.0 && height > 0.0 {
            config.canvas_size = (width, height);
        }
        let listener = Rc::new(RefCell::new(None));
        let observer = JsObserver {
            listener: Rc::clone(&listener),
        };
        Self {
            editor: Editor::with_observer(config, Box::new(observer)),
            chat: Conversation::new(),
            stream: None,
            listener,
        }
    }

    /// Register `callback(event, payloadJson)` for `canvasResized`,
    /// `historyChanged`, `sceneChanged` and `selectionChanged`.
    pub fn set_listener(&mut self, callback: js_sys::Function) {
        *self.listener.borrow_mut() = Some(callback);
    }

    // ─── Document API ────────────────────────────────────────────────────

    /// Import a wrapped or bare Scene Document.
    /// Returns JSON `{"ok":true,"objects":n}` or `{"ok":false,"error":"..."}`.
    pub fn import_json(&mut self, text: &str, clear: bool) -> String {
        match self.editor.import_json(text, ApplyOptions { clear }, now()) {
            Ok(change) => json!({ "ok": true, "objects": change.objects_added }).to_string(),
            Err(e) => error_json(e),
        }
    }

    /// The project file JSON, or an empty string on failure.
    pub fn export_json(&self, include_background: bool, include_background_image: bool) -> String {
        let opts = ExportOptions {
            include_background,
            include_background_image,
        };
        self.editor.export_json(opts, now()).unwrap_or_else(|e| {
            log::error!("export failed: {e}");
            String::new()
        })
    }

    /// The bare `{objects, background, width, height}` form.
    pub fn export_pure(&self, include_background: bool, include_background_image: bool) -> String {
        let opts = ExportOptions {
            include_background,
            include_background_image,
        };
        self.editor.export_pure(opts).unwrap_or_else(|e| {
            log::error!("export failed: {e}");
            String::new()
        })
    }

    pub fn render_svg(&self) -> String {
        render_svg(self.editor.scene())
    }

    /// Rasterize through `render(svg, width, height, mime, quality)`, which
    /// must return a `Uint8Array` or throw. A thrown `SecurityError` counts
    /// as a tainted canvas and triggers the degraded fallbacks. Returns an
    /// empty array when every attempt fails.
    pub fn export_raster(&self, format: &str, high_quality: bool, render: js_sys::Function) -> Vec<u8> {
        let format = match format {
            "jpeg" | "jpg" => RasterFormat::Jpeg,
            _ => RasterFormat::Png,
        };
        let quality = if high_quality {
            ExportQuality::High
        } else {
            ExportQuality::Standard
        };
        let opts = RasterOptions::preset(format, quality);
        match export_raster(&mut JsRasterizer { render }, self.editor.scene(), &opts) {
            Ok(output) => {
                log::debug!("raster export from {:?} scene", output.source);
                output.bytes
            }
            Err(e) => {
                log::error!("raster export failed: {e}");
                Vec::new()
            }
        }
    }

    // ─── Object API ──────────────────────────────────────────────────────

    /// Create a shape by kind name (`rect`, `circle`, `heading`, `star`, ...).
    /// Returns the new object's id, or an empty string.
    pub fn add_shape(&mut self, kind: &str, props_json: &str) -> String {
        let Some(kind) = ShapeKind::parse(kind) else {
            log::warn!("unknown shape kind `{kind}`");
            return String::new();
        };
        let props = serde_json::from_str(props_json)
            .map(|v: Value| shape_props_from_json(&v))
            .unwrap_or_default();
        self.run(Command::Create { kind, props })
    }

    /// Add an image of natural size `width`×`height`. Returns its id.
    pub fn add_image(&mut self, src: &str, width: f64, height: f64) -> String {
        self.run(Command::AddImage {
            src: src.to_string(),
            width,
            height,
        })
    }

    /// Run a toolbar action on the selection. `value_json` is the control's
    /// value (`null` when it has none). Returns `true` if the scene changed.
    pub fn object_action(&mut self, action: &str, value_json: &str) -> bool {
        let value = serde_json::from_str(value_json).unwrap_or(Value::Null);
        let Some(action) = parse_object_action(action, &value) else {
            log::warn!("unknown or malformed action `{action}`");
            return false;
        };
        match self.editor.execute_on_selection(|id| action.into_command(id)) {
            Ok(outcome) => outcome.changed,
            Err(e) => {
                log::debug!("action rejected: {e}");
                false
            }
        }
    }

    /// Move the selection by a delta. Inside a drag, call between
    /// `begin_drag` and `end_drag` so the whole drag is one undo step.
    pub fn move_selected(&mut self, dx: f64, dy: f64) -> bool {
        self.editor
            .execute_on_selection(|id| Command::Move { id, dx, dy })
            .is_ok_and(|outcome| outcome.changed)
    }

    pub fn begin_drag(&mut self) {
        self.editor.begin_gesture();
    }

    /// Returns `true` if the drag recorded an undo step.
    pub fn end_drag(&mut self) -> bool {
        self.editor.end_gesture("Move")
    }

    // ─── Selection API ───────────────────────────────────────────────────

    pub fn select(&mut self, id: &str) -> bool {
        self.editor.select(ObjectId::intern(id)).is_ok()
    }

    pub fn deselect(&mut self) {
        self.editor.deselect();
    }

    /// Id of the selected object, or an empty string.
    pub fn get_selected_id(&self) -> String {
        self.editor
            .selection()
            .map(|id| id.as_str().to_string())
            .unwrap_or_default()
    }

    /// The selected object in its document form, or `null`.
    pub fn get_selected_json(&self) -> String {
        self.editor
            .selected_object()
            .and_then(|object| serde_json::to_string(object).ok())
            .unwrap_or_else(|| "null".to_string())
    }

    // ─── Canvas API ──────────────────────────────────────────────────────

    pub fn resize_canvas(&mut self, width: f64, height: f64) -> bool {
        self.editor.resize_canvas(width, height)
    }

    /// Resize to a named stage preset or a `WxH` string.
    pub fn resize_to_stage(&mut self, stage: &str) -> bool {
        match fizzle_core::presets::parse_stage(stage) {
            Some((width, height)) => self.editor.resize_canvas(width, height),
            None => false,
        }
    }

    /// An empty string removes the background color.
    pub fn set_background_color(&mut self, color: &str) -> bool {
        let paint = Paint::parse(color);
        let color = if paint.is_none() { None } else { Some(paint) };
        self.editor.set_background_color(color)
    }

    /// An empty `src` removes the background image.
    pub fn set_background_image(&mut self, src: &str, fit: &str) -> bool {
        let image = (!src.is_empty()).then(|| BackgroundImage {
            src: src.to_string(),
            fit: parse_fit(fit),
        });
        self.editor.set_background_image(image)
    }

    pub fn canvas_width(&self) -> f64 {
        self.editor.scene().width
    }

    pub fn canvas_height(&self) -> f64 {
        self.editor.scene().height
    }

    // ─── History API ─────────────────────────────────────────────────────

    pub fn undo(&mut self) -> bool {
        self.editor.undo().is_ok()
    }

    pub fn redo(&mut self) -> bool {
        self.editor.redo().is_ok()
    }

    pub fn can_undo(&self) -> bool {
        self.editor.history().can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.editor.history().can_redo()
    }

    // ─── Keyboard Shortcut API ───────────────────────────────────────────

    /// Handle a keydown. Returns JSON `{"handled":bool,"action":"..."}`.
    pub fn handle_key(&mut self, key: &str, ctrl: bool, shift: bool, alt: bool, meta: bool) -> String {
        match self.editor.handle_shortcut(key, ctrl, shift, alt, meta) {
            Ok(Some(action)) => {
                json!({ "handled": true, "action": action_to_name(action) }).to_string()
            }
            Ok(None) => r#"{"handled":false,"action":"none"}"#.to_string(),
            Err(e) => {
                log::warn!("shortcut failed: {e}");
                r#"{"handled":false,"action":"none"}"#.to_string()
            }
        }
    }

    // ─── Chat API ────────────────────────────────────────────────────────

    /// Start a chat request for `prompt`. The current canvas is attached as
    /// context. Returns JSON `{"ticket":n,"body":{"messages":[...]}}`; the
    /// page POSTs `body` and feeds the response through `stream_chunk`.
    pub fn send_prompt(&mut self, prompt: &str) -> String {
        let context = self
            .editor
            .export_pure(ExportOptions::default())
            .ok()
            .and_then(|text| serde_json::from_str::<Value>(&text).ok());
        let (ticket, wire) = self.chat.begin_request(prompt, context.as_ref());
        self.stream = Some(ActiveStream {
            ticket,
            decoder: StreamDecoder::new(),
        });
        json!({ "ticket": ticket.generation(), "body": { "messages": wire } }).to_string()
    }

    /// Feed response bytes. Returns the display text they completed, or an
    /// empty string (also for a superseded ticket).
    pub fn stream_chunk(&mut self, ticket: u64, bytes: &[u8]) -> String {
        let Some(stream) = self.active_stream(ticket) else {
            return String::new();
        };
        let fragments = stream.decoder.push(bytes);
        let ticket = stream.ticket;
        for fragment in &fragments {
            self.chat.push_fragment(ticket, fragment);
        }
        fragments.concat()
    }

    /// Everything displayed so far for the request in flight.
    pub fn streaming_text(&self) -> String {
        self.chat.streaming_text().unwrap_or_default().to_string()
    }

    /// The body ended. Parses the reply and appends the assistant message.
    /// Returns JSON `{"ok":true,"messageId":n,"hasDesign":bool}`, or
    /// `{"ok":false,...}` with the apology message id when parsing failed.
    pub fn finish_stream(&mut self, ticket: u64) -> String {
        let Some(ActiveStream { ticket, decoder }) = self
            .stream
            .take_if(|stream| stream.ticket.generation() == ticket)
        else {
            return r#"{"ok":false,"error":"stale request"}"#.to_string();
        };
        let (rest, reply) = decoder.finish();
        for fragment in &rest {
            self.chat.push_fragment(ticket, fragment);
        }
        match reply {
            Ok(reply) => {
                let has_design = reply.fabric_json.is_some();
                match self.chat.complete(ticket, reply) {
                    Some(id) => json!({ "ok": true, "messageId": id, "hasDesign": has_design })
                        .to_string(),
                    None => r#"{"ok":false,"error":"stale request"}"#.to_string(),
                }
            }
            Err(e) => {
                log::error!("{e}; raw payload: {}", e.raw);
                let id = self.chat.fail(ticket);
                json!({ "ok": false, "error": e.reason, "messageId": id }).to_string()
            }
        }
    }

    /// The request failed in transport. Appends the apology message.
    pub fn fail_request(&mut self, ticket: u64) -> bool {
        match self.take_stream(ticket) {
            Some(ticket) => self.chat.fail(ticket).is_some(),
            None => false,
        }
    }

    /// The user stopped the request; no reply is appended.
    pub fn cancel_request(&mut self, ticket: u64) -> bool {
        match self.take_stream(ticket) {
            Some(ticket) => self.chat.cancel(ticket),
            None => false,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.chat.is_busy()
    }

    pub fn messages_json(&self) -> String {
        serde_json::to_string(self.chat.messages()).unwrap_or_else(|_| "[]".to_string())
    }

    /// Apply the design previewed in an assistant message and record it in
    /// the Design History. Returns JSON `{"ok":true,"designId":"..."}`.
    pub fn accept_design(&mut self, message_id: f64) -> String {
        let id = message_id as MessageId;
        let document = match self.pending_document(id) {
            Some(document) => document,
            None => return error_json("no pending design in this message"),
        };
        let at = now();
        // Reject an invalid design before the preview is marked accepted.
        if let Err(e) = fizzle_core::normalize(document, at) {
            return error_json(e);
        }
        let (document, prompt) = match self.chat.accept(id) {
            Ok(accepted) => accepted,
            Err(e) => return error_json(e),
        };
        match self.editor.accept_design(document, &prompt, at) {
            Ok(design_id) => json!({ "ok": true, "designId": design_id }).to_string(),
            Err(e) => error_json(e),
        }
    }

    pub fn decline_design(&mut self, message_id: f64) -> bool {
        self.chat.decline(message_id as MessageId).is_ok()
    }

    /// Drop an assistant reply and return the prompt to send again through
    /// `send_prompt`, or an empty string.
    pub fn retry_message(&mut self, message_id: f64) -> String {
        self.chat.retry(message_id as MessageId).unwrap_or_default()
    }

    pub fn clear_chat(&mut self) {
        self.chat.clear();
        self.stream = None;
    }

    // ─── Design History API ──────────────────────────────────────────────

    /// Newest first: `[{"id","prompt","age","timestamp"}]`.
    pub fn design_history_json(&self) -> String {
        let at = now();
        let entries: Vec<Value> = self
            .editor
            .designs()
            .entries()
            .iter()
            .map(|entry| {
                json!({
                    "id": entry.id,
                    "prompt": entry.truncated_prompt(PROMPT_PREVIEW_CHARS),
                    "age": entry.age_label(at),
                    "timestamp": fizzle_core::document::timestamp(entry.created_at),
                })
            })
            .collect();
        Value::Array(entries).to_string()
    }

    /// Thumbnail SVG of a Design History entry, or an empty string.
    pub fn design_thumbnail_svg(&self, id: &str, width: f64, height: f64) -> String {
        self.editor
            .designs()
            .get(id)
            .map(|entry| preview_value(entry.document.clone(), width, height))
            .unwrap_or_default()
    }

    pub fn rollback_design(&mut self, id: &str) -> bool {
        match self.editor.rollback_to(id, now()) {
            Ok(_) => true,
            Err(e) => {
                log::warn!("rollback failed: {e}");
                false
            }
        }
    }

    /// Blank canvas, empty histories and an empty chat.
    pub fn reset(&mut self) {
        self.editor.reset();
        self.clear_chat();
    }
}

impl FizzleEditor {
    fn run(&mut self, command: Command) -> String {
        match self.editor.execute(command) {
            Ok(_) => self.get_selected_id(),
            Err(e) => {
                log::warn!("command rejected: {e}");
                String::new()
            }
        }
    }

    fn active_stream(&mut self, generation: u64) -> Option<&mut ActiveStream> {
        self.stream
            .as_mut()
            .filter(|stream| stream.ticket.generation() == generation)
    }

    fn take_stream(&mut self, generation: u64) -> Option<RequestTicket> {
        self.stream
            .take_if(|stream| stream.ticket.generation() == generation)
            .map(|stream| stream.ticket)
    }

    fn pending_document(&self, id: MessageId) -> Option<Value> {
        let preview = self.chat.get(id)?.design_preview.as_ref()?;
        (preview.status == PreviewStatus::Pending).then(|| preview.document.clone())
    }
}

/// Pixels come from the page: `render(svg, width, height, mime, quality)`.
struct JsRasterizer {
    render: js_sys::Function,
}

impl Rasterizer for JsRasterizer {
    fn rasterize(
        &mut self,
        scene: &SceneDocument,
        opts: &RasterOptions,
    ) -> Result<Vec<u8>, RasterError> {
        let (width, height) = opts.output_size(scene);
        let args = js_sys::Array::of5(
            &JsValue::from_str(&render_svg(scene)),
            &JsValue::from(width),
            &JsValue::from(height),
            &JsValue::from_str(opts.format.mime()),
            &JsValue::from(opts.quality),
        );
        match self.render.apply(&JsValue::NULL, &args) {
            Ok(bytes) => Ok(js_sys::Uint8Array::new(&bytes).to_vec()),
            Err(thrown) => {
                let name = js_sys::Reflect::get(&thrown, &JsValue::from_str("name"))
                    .ok()
                    .and_then(|n| n.as_string())
                    .unwrap_or_default();
                if name == "SecurityError" {
                    Err(RasterError::TaintedSource)
                } else {
                    Err(RasterError::Backend(format!("{thrown:?}")))
                }
            }
        }
    }
}

fn parse_fit(fit: &str) -> ImageFit {
    match fit {
        "contain" => ImageFit::Contain,
        "stretch" => ImageFit::Stretch,
        "original" => ImageFit::Original,
        _ => ImageFit::Cover,
    }
}

fn preview_value(document: Value, width: f64, height: f64) -> String {
    match fizzle_core::normalize(document, OffsetDateTime::UNIX_EPOCH)
        .and_then(|file| file.canvas.into_scene())
    {
        Ok(scene) => render_svg(&fit_preview(&scene, width, height)),
        Err(e) => {
            log::warn!("preview failed: {e}");
            String::new()
        }
    }
}

fn error_json(error: impl std::fmt::Display) -> String {
    json!({ "ok": false, "error": error.to_string() }).to_string()
}

fn now() -> OffsetDateTime {
    #[cfg(target_arch = "wasm32")]
    {
        let nanos = (js_sys::Date::now() * 1_000_000.0) as i128;
        OffsetDateTime::from_unix_timestamp_nanos(nanos).unwrap_or(OffsetDateTime::UNIX_EPOCH)
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        OffsetDateTime::now_utc()
    }
}

/// Set up a panic hook that logs to the browser console.
fn console_error_panic_hook_setup() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static SET_HOOK: Once = Once::new();
        SET_HOOK.call_once(|| {
            std::panic::set_hook(Box::new(|info| {
                let msg = format!("Fizzle WASM panic: {info}");
                web_sys::console::error_1(&msg.into());
            }));
        });
    }
}

// ─── Standalone functions (no editor needed) ─────────────────────────────

/// Validate a Scene Document. Returns JSON `{"ok":true,"objects":n}` or
/// `{"ok":false,"error":"..."}`.
#[wasm_bindgen]
pub fn validate(source: &str) -> String {
    match parse_document(source, OffsetDateTime::UNIX_EPOCH) {
        Ok(file) => json!({ "ok": true, "objects": file.objects().len() }).to_string(),
        Err(e) => error_json(e),
    }
}

/// Normalize any accepted input shape into the wrapped project file JSON.
/// Returns an empty string when the input is not a Scene Document.
#[wasm_bindgen]
pub fn normalize(source: &str) -> String {
    parse_document(source, now())
        .and_then(|file| serde_json::to_string(&file).map_err(Into::into))
        .unwrap_or_else(|e| {
            log::warn!("normalize failed: {e}");
            String::new()
        })
}

/// Thumbnail SVG for a design preview card.
#[wasm_bindgen]
pub fn preview_svg(source: &str, width: f64, height: f64) -> String {
    match serde_json::from_str(source) {
        Ok(document) => preview_value(document, width, height),
        Err(_) => String::new(),
    }
}

/// Standalone decoder for hosts that stream outside a `FizzleEditor`.
#[wasm_bindgen]
pub struct StreamSession {
    decoder: Option<StreamDecoder>,
}

impl Default for StreamSession {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl StreamSession {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            decoder: Some(StreamDecoder::new()),
        }
    }

    /// Feed bytes; returns the display text they completed.
    pub fn push(&mut self, bytes: &[u8]) -> String {
        self.decoder
            .as_mut()
            .map(|decoder| decoder.push(bytes).concat())
            .unwrap_or_default()
    }

    /// Finish the stream. Returns JSON
    /// `{"ok":true,"tail":"...","answer":"...","reasoning":...,"fabricJSON":...}`
    /// or `{"ok":false,"error":"...","raw":"..."}`. Later calls fail.
    pub fn finish(&mut self) -> String {
        let Some(decoder) = self.decoder.take() else {
            return error_json("stream already finished");
        };
        let (rest, reply) = decoder.finish();
        match reply {
            Ok(reply) => json!({
                "ok": true,
                "tail": rest.concat(),
                "answer": reply.answer,
                "reasoning": reply.reasoning,
                "fabricJSON": reply.fabric_json,
            })
            .to_string(),
            Err(e) => json!({ "ok": false, "error": e.reason, "raw": e.raw }).to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(text: &str) -> Value {
        serde_json::from_str(text).unwrap()
    }

    fn sse(reply: &Value) -> Vec<u8> {
        let text = reply.to_string();
        let (a, b) = text.split_at(text.len() / 2);
        format!(
            "data: {}\ndata: {}\ndata: [DONE]\n",
            json!({ "text": a }),
            json!({ "text": b })
        )
        .into_bytes()
    }

    #[test]
    fn shapes_selection_and_history() {
        let mut editor = FizzleEditor::default();
        let id = editor.add_shape("rect", r##"{"fill":"#ff0000"}"##);
        assert!(!id.is_empty());
        assert_eq!(editor.get_selected_id(), id);
        assert!(editor.object_action("opacity", "0.5"));
        assert_eq!(parse(&editor.get_selected_json())["opacity"], json!(0.5));

        assert!(editor.undo());
        assert!(editor.undo());
        assert!(!editor.can_undo());
        assert!(editor.can_redo());
        assert_eq!(editor.get_selected_id(), "");
        assert_eq!(editor.add_shape("hexagon", "{}"), "");
    }

    #[test]
    fn drag_is_one_step() {
        let mut editor = FizzleEditor::default();
        editor.add_shape("circle", "null");
        editor.begin_drag();
        assert!(editor.move_selected(5.0, 5.0));
        assert!(editor.move_selected(5.0, 5.0));
        assert!(editor.end_drag());
        assert!(editor.undo());
        assert!(editor.can_undo());
    }

    #[test]
    fn key_events_report_the_action() {
        let mut editor = FizzleEditor::default();
        editor.add_shape("star", "{}");
        assert_eq!(
            parse(&editor.handle_key("d", true, false, false, false)),
            json!({"handled": true, "action": "duplicate"})
        );
        editor.deselect();
        assert_eq!(
            parse(&editor.handle_key("Delete", false, false, false, false))["handled"],
            json!(false)
        );
    }

    #[test]
    fn import_failure_reports_error() {
        let mut editor = FizzleEditor::default();
        let result = parse(&editor.import_json("{\"objects\": 7}", true));
        assert_eq!(result["ok"], json!(false));
        let result = parse(&editor.import_json(r#"{"objects": [], "width": 300, "height": 200}"#, true));
        assert_eq!(result, json!({"ok": true, "objects": 0}));
        assert_eq!(editor.canvas_width(), 300.0);
    }

    #[test]
    fn streamed_design_can_be_accepted_and_rolled_back() {
        let mut editor = FizzleEditor::default();
        let start = parse(&editor.send_prompt("a poster"));
        let ticket = start["ticket"].as_u64().unwrap();
        assert_eq!(start["body"]["messages"][0]["role"], json!("user"));
        assert!(editor.is_busy());

        let reply = json!({
            "answer": "Here you go",
            "fabric_json": {"objects": [{"type": "circle", "radius": 20}], "width": 400, "height": 400}
        });
        let body = sse(&reply);
        let (head, tail) = body.split_at(body.len() / 3);
        let mut shown = editor.stream_chunk(ticket, head);
        shown.push_str(&editor.stream_chunk(ticket, tail));
        assert_eq!(shown, reply.to_string());

        let done = parse(&editor.finish_stream(ticket));
        assert_eq!(done["ok"], json!(true));
        assert_eq!(done["hasDesign"], json!(true));
        let message_id = done["messageId"].as_f64().unwrap();

        let accepted = parse(&editor.accept_design(message_id));
        assert_eq!(accepted["ok"], json!(true));
        assert_eq!(editor.canvas_width(), 400.0);
        assert_eq!(parse(&editor.accept_design(message_id))["ok"], json!(false));

        let history = parse(&editor.design_history_json());
        assert_eq!(history[0]["prompt"], json!("a poster"));
        assert_eq!(history[0]["age"], json!("Just now"));

        editor.add_shape("rect", "{}");
        let design_id = accepted["designId"].as_str().unwrap();
        assert!(editor.rollback_design(design_id));
        assert_eq!(parse(&editor.export_pure(true, true))["objects"].as_array().unwrap().len(), 1);
        assert!(editor.design_thumbnail_svg(design_id, 200.0, 150.0).starts_with("<svg"));
    }

    #[test]
    fn superseded_request_is_ignored() {
        let mut editor = FizzleEditor::default();
        let first = parse(&editor.send_prompt("one"))["ticket"].as_u64().unwrap();
        let second = parse(&editor.send_prompt("two"))["ticket"].as_u64().unwrap();
        assert_eq!(editor.stream_chunk(first, b"{\"text\":\"late\"}\n"), "");
        assert!(!editor.fail_request(first));
        assert!(editor.fail_request(second));
        let messages = parse(&editor.messages_json());
        assert_eq!(messages.as_array().unwrap().len(), 3);
        assert!(!editor.is_busy());
    }

    #[test]
    fn unparsable_stream_appends_apology() {
        let mut editor = FizzleEditor::default();
        let ticket = parse(&editor.send_prompt("x"))["ticket"].as_u64().unwrap();
        editor.stream_chunk(ticket, b"{\"text\":\"not json\"}\n");
        let done = parse(&editor.finish_stream(ticket));
        assert_eq!(done["ok"], json!(false));
        let retry = editor.retry_message(done["messageId"].as_f64().unwrap());
        assert_eq!(retry, "x");
    }

    #[test]
    fn standalone_functions() {
        assert_eq!(parse(&validate(r#"[{"objects": [{"type": "rect"}]}]"#))["ok"], json!(true));
        assert_eq!(parse(&validate("nope"))["ok"], json!(false));
        assert!(normalize("nope").is_empty());
        assert!(parse(&normalize(r#"{"objects": []}"#)).is_object());
        assert!(preview_svg(r#"{"objects": []}"#, 200.0, 150.0).starts_with("<svg"));

        let mut session = StreamSession::new();
        let shown = session.push(b"{\"text\":\"{\\\"answer\\\":\\\"hi\\\"}\"}\n");
        assert_eq!(shown, r#"{"answer":"hi"}"#);
        assert_eq!(parse(&session.finish())["answer"], json!("hi"));
        assert_eq!(parse(&session.finish())["ok"], json!(false));
    }
}
