// Browser paint path: the estimator callback hands its results straight to the
// engine, which draws through the 2D context without a JSON display list.

use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlImageElement, HtmlVideoElement};

use crate::error::EngineError;
use crate::landmarks::PoseOutput;
use crate::render::Canvas;
use crate::types::CanvasSize;
use crate::Engine;

fn render_error(err: JsValue) -> EngineError {
    EngineError::Render(err.as_string().unwrap_or_else(|| format!("{:?}", err)))
}

/// `Canvas` over a browser 2D context, the camera `<video>` and the loaded overlay.
struct WebCanvas<'a> {
    ctx: &'a CanvasRenderingContext2d,
    frame: &'a HtmlVideoElement,
    overlay: Option<&'a HtmlImageElement>,
}

impl Canvas for WebCanvas<'_> {
    fn save(&mut self) {
        self.ctx.save();
    }

    fn restore(&mut self) {
        self.ctx.restore();
    }

    fn clear(&mut self, size: CanvasSize) {
        self.ctx.clear_rect(0.0, 0.0, size.width, size.height);
    }

    fn draw_camera_frame(&mut self, size: CanvasSize) -> Result<(), EngineError> {
        self.ctx
            .draw_image_with_html_video_element_and_dw_and_dh(self.frame, 0.0, 0.0, size.width, size.height)
            .map_err(render_error)
    }

    fn translate(&mut self, x: f64, y: f64) -> Result<(), EngineError> {
        self.ctx.translate(x, y).map_err(render_error)
    }

    fn rotate(&mut self, angle: f64) -> Result<(), EngineError> {
        self.ctx.rotate(angle).map_err(render_error)
    }

    fn draw_overlay(&mut self, x: f64, y: f64, width: f64, height: f64) -> Result<(), EngineError> {
        // Bitmap still decoding: skip the sprite for this frame.
        match self.overlay {
            Some(image) if image.complete() => self
                .ctx
                .draw_image_with_html_image_element_and_dw_and_dh(image, x, y, width, height)
                .map_err(render_error),
            _ => Ok(()),
        }
    }
}

#[wasm_bindgen]
impl Engine {
    /// Paint one estimator result onto `ctx` and return whether the host should
    /// request the next frame.
    pub fn render_pose_results(
        &mut self,
        results: &JsValue,
        ctx: &CanvasRenderingContext2d,
        frame: &HtmlVideoElement,
        overlay: Option<HtmlImageElement>,
    ) -> Result<bool, JsValue> {
        let json = js_sys::JSON::stringify(results)?
            .as_string()
            .unwrap_or_else(|| "null".to_string());
        let pose = PoseOutput::from_json(&json).unwrap_or(PoseOutput::Empty);

        let video = CanvasSize::new(frame.video_width() as f64, frame.video_height() as f64);
        let size = match ctx.canvas() {
            Some(canvas) => CanvasSize::new(canvas.width() as f64, canvas.height() as f64),
            None => video,
        };
        // Keypoints are in video pixels; before metadata loads the video reports 0x0.
        let source = if video.width > 0.0 && video.height > 0.0 {
            video
        } else {
            size
        };

        let mut canvas = WebCanvas {
            ctx,
            frame,
            overlay: overlay.as_ref(),
        };
        let outcome = self.controller.process_frame(&pose, source, size, &mut canvas);
        Ok(outcome.reschedule())
    }
}
