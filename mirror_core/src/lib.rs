// mirror_core: smart mirror Rust/WASM engine for the live try-on overlay.
// All decisions live here; JS applies the returned commands and forwards
// events, catalog responses, timer wakeups and estimator results.

mod catalog;
mod controller;
mod error;
mod events;
mod host;
mod landmarks;
mod render;
mod session;
mod timer;
mod transform;
mod types;
mod web;

use log::debug;
use serde::Serialize;
use wasm_bindgen::prelude::*;

pub use catalog::{decode_response, CandidateCard, CatalogQuery, QueryId};
pub use controller::ModeController;
pub use error::EngineError;
pub use events::{RemoteEvent, TriggerPayload};
pub use host::{Catalog, CommandBuffer, Host, HostCommand, Preview, Surface};
pub use landmarks::{BodyPart, Landmark, PoseOutput, TorsoLandmarks};
pub use render::{paint_overlay, Canvas, DrawList, DrawOp};
pub use session::{FrameOutcome, FrameStats, SkipReason, TryOnSession};
pub use timer::SessionTimer;
pub use transform::{OverlayTransform, TorsoFrame};
pub use types::*;

/// Install the panic hook and the console logger.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();

    #[cfg(all(feature = "console_log", target_arch = "wasm32"))]
    if console_log::init_with_level(log::Level::Trace).is_err() {
        debug!("Console logger already installed");
    }
}

/// Result of one frame on the JSON path: what happened, the canvas calls to
/// replay, and whether to request another frame.
#[derive(Debug, Clone, Serialize)]
pub struct FrameReport {
    pub outcome: FrameOutcome,
    pub ops: Vec<DrawOp>,
    pub next_frame: bool,
}

/// Engine interface exposed to JavaScript.
/// Every mutating call returns the JSON array of commands the page must apply, in order.
#[wasm_bindgen]
pub struct Engine {
    controller: ModeController,
}

#[wasm_bindgen]
impl Engine {
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> Result<Engine, JsValue> {
        Ok(Engine::from_config(EngineConfig::from_json(config_json)?))
    }

    /// Apply one remote event (`trigger_tryon`, `try_on_selected_item`, `hide_tryon`, ...).
    /// Throws only for a payload that cannot be decoded.
    pub fn handle_event(&mut self, name: &str, payload_json: &str, now_ms: f64) -> Result<String, JsValue> {
        let commands = self.dispatch(name, payload_json, Timestamp::from_js_millis(now_ms))?;
        Ok(to_json(&commands)?)
    }

    /// Body of the catalog request issued by a `FetchCatalog` command.
    pub fn catalog_response(&mut self, query_id: u32, body_json: &str, now_ms: f64) -> Result<String, JsValue> {
        let commands = self.answer_query(
            QueryId::new(query_id),
            decode_response(body_json),
            Timestamp::from_js_millis(now_ms),
        );
        Ok(to_json(&commands)?)
    }

    /// The catalog request failed before a body was read.
    pub fn catalog_failed(&mut self, query_id: u32, message: &str, now_ms: f64) -> Result<String, JsValue> {
        let commands = self.answer_query(
            QueryId::new(query_id),
            Err(EngineError::CatalogQueryFailed(message.to_string())),
            Timestamp::from_js_millis(now_ms),
        );
        Ok(to_json(&commands)?)
    }

    /// Camera or pose estimator initialisation failed for the session named by
    /// the `StartCapture` command.
    pub fn capture_failed(&mut self, session_id: u32, message: &str, now_ms: f64) -> Result<String, JsValue> {
        let now = Timestamp::from_js_millis(now_ms);
        let session = SessionId::new(session_id);
        let commands = self.with_host(|ctl, host| ctl.on_capture_error(session, message, now, host));
        Ok(to_json(&commands)?)
    }

    /// Natural size of the overlay bitmap loaded from `url` for `LoadOverlay`.
    pub fn overlay_loaded(&mut self, url: &str, width: f64, height: f64) {
        self.controller.overlay_loaded(url, width, height);
    }

    /// Fire due timers.
    pub fn tick(&mut self, now_ms: f64) -> Result<String, JsValue> {
        let commands = self.advance(Timestamp::from_js_millis(now_ms));
        Ok(to_json(&commands)?)
    }

    /// When the next timer is due, in the same clock as `now_ms`.
    pub fn next_deadline_ms(&self) -> Option<f64> {
        self.controller.next_deadline().map(|t| t.as_millis())
    }

    /// Process one estimator result and return the `FrameReport` as JSON.
    /// Pixel keypoints are taken to be relative to a `width` x `height` frame.
    pub fn process_frame(&mut self, pose_json: &str, width: f64, height: f64) -> Result<String, JsValue> {
        let report = self.frame(pose_json, CanvasSize::new(width, height));
        Ok(to_json(&report)?)
    }

    pub fn mode(&self) -> String {
        self.controller.mode().as_str().to_string()
    }

    /// Page unload: release capture and restore the dashboard.
    pub fn shutdown(&mut self) -> Result<String, JsValue> {
        let commands = self.with_host(|ctl, host| ctl.shutdown(host));
        Ok(to_json(&commands)?)
    }
}

impl Engine {
    pub fn from_config(config: EngineConfig) -> Engine {
        log::set_max_level(config.log_level);
        Engine {
            controller: ModeController::new(config),
        }
    }

    pub fn controller(&self) -> &ModeController {
        &self.controller
    }

    pub fn dispatch(
        &mut self,
        name: &str,
        payload_json: &str,
        now: Timestamp,
    ) -> Result<Vec<HostCommand>, EngineError> {
        let event = RemoteEvent::decode(name, payload_json)?;
        Ok(self.with_host(|ctl, host| ctl.handle_event(event, now, host)))
    }

    pub fn answer_query(
        &mut self,
        id: QueryId,
        result: Result<Vec<TryOnCandidate>, EngineError>,
        now: Timestamp,
    ) -> Vec<HostCommand> {
        self.with_host(|ctl, host| ctl.on_catalog_response(id, result, now, host))
    }

    pub fn advance(&mut self, now: Timestamp) -> Vec<HostCommand> {
        self.with_host(|ctl, host| ctl.tick(now, host))
    }

    /// An undecodable estimator result counts as a frame without a person.
    pub fn frame(&mut self, pose_json: &str, size: CanvasSize) -> FrameReport {
        let pose = PoseOutput::from_json(pose_json).unwrap_or_else(|err| {
            debug!("Unreadable pose result: {}", err);
            PoseOutput::Empty
        });
        let mut canvas = DrawList::new();
        let outcome = self.controller.process_frame(&pose, size, size, &mut canvas);
        FrameReport {
            next_frame: outcome.reschedule(),
            outcome,
            ops: canvas.ops,
        }
    }

    fn with_host<F>(&mut self, f: F) -> Vec<HostCommand>
    where
        F: FnOnce(&mut ModeController, &mut CommandBuffer),
    {
        let mut host = CommandBuffer::new(self.controller.config().catalog.endpoint.clone());
        f(&mut self.controller, &mut host);
        host.into_commands()
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, EngineError> {
    Ok(serde_json::to_string(value)?)
}
